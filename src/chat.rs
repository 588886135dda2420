//! Chat window: conversation history, the input box and the transient
//! follow-up/chart slots of the latest assistant turn.

use crate::api::ApiError;
use crate::chart::{ChartEvent, ChartPayload};
use crate::input::TextInput;
use crate::notify::Notifier;
use crate::state::{ChatMessage, ChatRequest, ChatResponse, ChatRole, FollowUpQuestion};

const CHAT_FALLBACK: &str = "Please try again.";

/// Extras rendered under the most recent assistant message
#[derive(Debug, Clone, Copy)]
pub struct Attachments<'a> {
    pub chart: Option<&'a ChartPayload>,
    pub follow_ups: &'a [FollowUpQuestion],
}

#[derive(Debug, Default)]
pub struct ChatWindow {
    messages: Vec<ChatMessage>,
    pub input: TextInput,
    waiting: bool,
    follow_ups: Vec<FollowUpQuestion>,
    chart: Option<ChartPayload>,
    input_focused: bool,
}

impl ChatWindow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn is_waiting(&self) -> bool {
        self.waiting
    }

    pub fn follow_ups(&self) -> &[FollowUpQuestion] {
        &self.follow_ups
    }

    pub fn chart(&self) -> Option<&ChartPayload> {
        self.chart.as_ref()
    }

    pub fn input_focused(&self) -> bool {
        self.input_focused
    }

    pub fn focus_input(&mut self) {
        self.input_focused = true;
    }

    pub fn blur_input(&mut self) {
        self.input_focused = false;
    }

    /// Whether the send action is currently available
    pub fn can_submit(&self) -> bool {
        !self.waiting && !self.input.is_blank()
    }

    /// Send the current input. Returns the request to issue, or `None` when
    /// the input is blank or a reply is still pending.
    pub fn submit(&mut self, now_ms: i64) -> Option<ChatRequest> {
        if !self.can_submit() {
            return None;
        }

        // History is the conversation as it stood before this turn
        let history = self.messages.clone();
        let text = self.input.take();

        self.messages.push(ChatMessage::user(text.clone(), now_ms));
        self.follow_ups.clear();
        self.chart = None;
        self.waiting = true;

        tracing::debug!(turns = history.len(), "sending chat message");
        Some(ChatRequest {
            message: text,
            history,
        })
    }

    pub fn receive(&mut self, result: Result<ChatResponse, ApiError>, notifier: &mut Notifier) {
        self.waiting = false;
        match result {
            Ok(response) => {
                self.messages.push(response.message);
                if let Some(questions) = response.follow_up_questions {
                    self.follow_ups = questions;
                }
                if let Some(chart) = response.chart_data {
                    self.chart = Some(chart);
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "chat request failed");
                notifier.error("Failed to get response", Some(e.user_message(CHAT_FALLBACK)));
            }
        }
    }

    /// Put a suggested question in the input box and focus it. Never sends.
    pub fn apply_follow_up(&mut self, question: &FollowUpQuestion) {
        self.input.set(&question.text);
        self.input_focused = true;
    }

    pub fn apply_chart_event(&mut self, event: ChartEvent) {
        match event {
            ChartEvent::Regenerated(payload) => self.chart = Some(payload),
        }
    }

    /// Chart and follow-ups belong under the last message only, and only
    /// when that message came from the assistant.
    pub fn attachments(&self) -> Option<Attachments<'_>> {
        let last = self.messages.last()?;
        if last.role != ChatRole::Assistant {
            return None;
        }
        Some(Attachments {
            chart: self.chart.as_ref(),
            follow_ups: &self.follow_ups,
        })
    }
}
