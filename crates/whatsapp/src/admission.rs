//! Admission gates applied before trigger evaluation.

use satele_channels::Whitelist;

/// Prefixes of messages the bridge or the backend authored.
const BOT_PREFIXES: [&str; 4] = ["🤖", "✅", "❌", "🎙"];
const BOT_TAG: &str = "[Bot]";

/// Why an event was not admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    NotWhitelisted,
    BotOutput,
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::NotWhitelisted => "sender not whitelisted",
            Self::BotOutput => "bot output",
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct AdmissionFilter {
    whitelist: Whitelist,
}

impl AdmissionFilter {
    pub fn new(whitelist: Whitelist) -> Self {
        Self { whitelist }
    }

    /// Self-authored events always pass; others need a whitelisted sender.
    pub fn check_sender(&self, sender: &str, from_me: bool) -> Result<(), Rejection> {
        if from_me || self.whitelist.contains(sender) {
            Ok(())
        } else {
            Err(Rejection::NotWhitelisted)
        }
    }

    /// Rejects text that would loop back into the backend.
    pub fn check_text(&self, text: &str) -> Result<(), Rejection> {
        if is_bot_output(text) {
            Err(Rejection::BotOutput)
        } else {
            Ok(())
        }
    }
}

/// Acknowledgments and backend replies echoed back through the session.
pub fn is_bot_output(text: &str) -> bool {
    BOT_PREFIXES.iter().any(|p| text.starts_with(p)) || text.contains(BOT_TAG)
}
