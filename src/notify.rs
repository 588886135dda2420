//! Toast-style notifications shown in the corner of the screen.

/// Number of 300ms ticks a toast stays visible
pub const DEFAULT_TTL_TICKS: u16 = 14;
/// Oldest toasts are dropped past this many
const MAX_VISIBLE: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Success,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub level: Level,
    pub title: String,
    pub description: Option<String>,
    ttl: u16,
}

#[derive(Debug)]
pub struct Notifier {
    items: Vec<Notification>,
    ttl_ticks: u16,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(DEFAULT_TTL_TICKS)
    }
}

impl Notifier {
    pub fn new(ttl_ticks: u16) -> Self {
        Self {
            items: Vec::new(),
            ttl_ticks,
        }
    }

    pub fn push(&mut self, level: Level, title: &str, description: Option<String>) {
        match level {
            Level::Warning => tracing::warn!(title, description = description.as_deref(), "notification"),
            Level::Error => tracing::error!(title, description = description.as_deref(), "notification"),
            _ => tracing::info!(title, description = description.as_deref(), "notification"),
        }

        self.items.push(Notification {
            level,
            title: title.to_string(),
            description,
            ttl: self.ttl_ticks,
        });
        if self.items.len() > MAX_VISIBLE {
            self.items.remove(0);
        }
    }

    pub fn success(&mut self, title: &str, description: Option<String>) {
        self.push(Level::Success, title, description);
    }

    pub fn info(&mut self, title: &str, description: Option<String>) {
        self.push(Level::Info, title, description);
    }

    pub fn warning(&mut self, title: &str, description: Option<String>) {
        self.push(Level::Warning, title, description);
    }

    pub fn error(&mut self, title: &str, description: Option<String>) {
        self.push(Level::Error, title, description);
    }

    /// Age every toast by one tick and drop the expired ones
    pub fn tick(&mut self) {
        for item in &mut self.items {
            item.ttl = item.ttl.saturating_sub(1);
        }
        self.items.retain(|n| n.ttl > 0);
    }

    pub fn dismiss_all(&mut self) {
        self.items.clear();
    }

    pub fn active(&self) -> &[Notification] {
        &self.items
    }

    pub fn latest(&self) -> Option<&Notification> {
        self.items.last()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_expires() {
        let mut notifier = Notifier::new(2);
        notifier.info("hello", None);
        notifier.tick();
        assert_eq!(notifier.active().len(), 1);
        notifier.tick();
        assert!(notifier.is_empty());
    }

    #[test]
    fn test_caps_visible_toasts() {
        let mut notifier = Notifier::default();
        for i in 0..6 {
            notifier.warning(&format!("w{}", i), None);
        }
        assert_eq!(notifier.active().len(), MAX_VISIBLE);
        assert_eq!(notifier.active()[0].title, "w2");
        assert_eq!(notifier.latest().unwrap().title, "w5");
    }
}
