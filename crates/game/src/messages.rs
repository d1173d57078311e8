//! On-screen message log, fed by weather notifications.

use disasters::{NoticeCategory, NoticePriority, Notifier};
use std::cell::RefCell;
use std::rc::Rc;

// ── Game Messages ──────────────────────────────────────────────────────────

/// One logged event.
pub struct GameMessage {
    pub text: String,
    pub color: [f32; 4],
    pub category: NoticeCategory,
    pub priority: NoticePriority,
    pub time_remaining: f32,
}

/// Manages the message log displayed over the game view.
pub struct GameMessages {
    pub messages: Vec<GameMessage>,
    pub max_visible: usize,
    default_duration: f32,
    total: u64,
}

impl GameMessages {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            max_visible: 12,
            default_duration: 6.0,
            total: 0,
        }
    }

    pub fn push(&mut self, text: impl Into<String>, color: [f32; 4], category: NoticeCategory, priority: NoticePriority) {
        // High priority stays up twice as long.
        let duration = match priority {
            NoticePriority::High => self.default_duration * 2.0,
            NoticePriority::Normal => self.default_duration,
            NoticePriority::Low => self.default_duration * 0.5,
        };
        self.messages.push(GameMessage { text: text.into(), color, category, priority, time_remaining: duration });
        self.total += 1;
        if self.messages.len() > 50 {
            self.messages.remove(0);
        }
    }

    pub fn update(&mut self, dt: f32) {
        for msg in &mut self.messages {
            msg.time_remaining -= dt;
        }
        self.messages.retain(|m| m.time_remaining > 0.0);
    }

    /// Newest messages first, at most `max_visible`.
    pub fn visible(&self) -> impl Iterator<Item = &GameMessage> {
        self.messages.iter().rev().take(self.max_visible)
    }

    /// Messages pushed since startup, including expired ones.
    pub fn total(&self) -> u64 {
        self.total
    }
}

impl Default for GameMessages {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared handle so the weather engine can write while the loop reads.
#[derive(Clone, Default)]
pub struct MessageLog(pub Rc<RefCell<GameMessages>>);

impl Notifier for MessageLog {
    fn notify(
        &mut self,
        message: &str,
        color: [f32; 4],
        category: NoticeCategory,
        priority: NoticePriority,
    ) -> anyhow::Result<()> {
        let mut messages = self.0.try_borrow_mut()?;
        if priority == NoticePriority::High {
            log::info!(">> {}", message);
        } else {
            log::debug!(">> {}", message);
        }
        messages.push(message, color, category, priority);
        Ok(())
    }
}
