//! Upstream bot context.
//!
//! The connector maintains exactly one upstream session; every OneBot-facing
//! service shares this context to stamp outgoing payloads with the bot's
//! identity and report its health.

use std::sync::atomic::{AtomicBool, Ordering};

/// Shared state of the single upstream bot session.
///
/// Cheap to share behind an `Arc`; all accessors take `&self`.
#[derive(Debug)]
pub struct BotContext {
    /// The bot's own account number, stamped into `self_id` fields.
    uin: i64,
    /// Whether the upstream session is currently established.
    online: AtomicBool,
}

impl BotContext {
    /// Creates a context for `uin`.
    ///
    /// The context starts online: the connector brings its OneBot services up
    /// only after the upstream session is established. The upstream layer
    /// flips the flag with [`set_online`](Self::set_online) on drops and
    /// re-logins.
    pub fn new(uin: i64) -> Self {
        Self {
            uin,
            online: AtomicBool::new(true),
        }
    }

    /// The bot's account number.
    pub fn uin(&self) -> i64 {
        self.uin
    }

    /// Whether the upstream session is currently established.
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::Relaxed)
    }

    /// Records an upstream session state change.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_online() {
        let bot = BotContext::new(987654321);
        assert_eq!(bot.uin(), 987654321);
        assert!(bot.is_online());
    }

    #[test]
    fn online_flag_round_trips() {
        let bot = BotContext::new(1);
        bot.set_online(false);
        assert!(!bot.is_online());
        bot.set_online(true);
        assert!(bot.is_online());
    }
}
