//! Suggested follow-up questions shown under the latest reply.

use crate::state::FollowUpQuestion;

pub const CAPTION: &str = "Suggested follow-up questions:";

/// Read-only view over the current follow-ups with a keyboard cursor
#[derive(Debug, Clone, Copy)]
pub struct SuggestedQuestions<'a> {
    questions: &'a [FollowUpQuestion],
}

impl<'a> SuggestedQuestions<'a> {
    pub fn new(questions: &'a [FollowUpQuestion]) -> Self {
        Self { questions }
    }

    /// Nothing is drawn for an empty list
    pub fn is_visible(&self) -> bool {
        !self.questions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn items(&self) -> impl Iterator<Item = &'a str> + 'a {
        self.questions.iter().map(|q| q.text.as_str())
    }

    /// The question activated at `index`, for the owner to act on
    pub fn click(&self, index: usize) -> Option<&'a FollowUpQuestion> {
        self.questions.get(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_list_hidden() {
        let view = SuggestedQuestions::new(&[]);
        assert!(!view.is_visible());
        assert!(view.click(0).is_none());
    }

    #[test]
    fn test_click_returns_question() {
        let questions = vec![
            FollowUpQuestion { id: "q1".into(), text: "First?".into() },
            FollowUpQuestion { id: "q2".into(), text: "Second?".into() },
        ];
        let view = SuggestedQuestions::new(&questions);
        assert!(view.is_visible());
        assert_eq!(view.items().collect::<Vec<_>>(), vec!["First?", "Second?"]);
        assert_eq!(view.click(1).map(|q| q.id.as_str()), Some("q2"));
    }
}
