use std::sync::OnceLock;

use regex::Regex;

use crate::types::TextFragment;

// ── Compiled regex cache ─────────────────────────────────────────────────────

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

re!(re_ticket_number, r"(?i)No\.\s*(\d+)");

// ── Public extraction API ─────────────────────────────────────────────────────

/// The number printed after `No.` in one piece of text, if any.
/// A digit run too long for `u64` does not count as a match.
pub fn ticket_number(text: &str) -> Option<u64> {
    re_ticket_number()
        .captures_iter(text)
        .find_map(|c| c.get(1)?.as_str().parse().ok())
}

/// First match wins, scanning fragments in the order the engine returned them.
pub fn first_ticket_number(fragments: &[TextFragment]) -> Option<u64> {
    fragments.iter().find_map(|f| ticket_number(&f.text))
}
