//! Currency comparison for the loop-vs-finish decision.
//!
//! The balance readout is compared as a digit string, not a number: OCR can
//! misread a digit, and parsing a misread value would turn "unchanged" into
//! a bogus delta anyway. An unchanged string means the purchase spent
//! nothing, so the shop had nothing to sell and the engine should re-arm.

/// Keeps only the ASCII digits from an OCR reading, dropping separators and
/// stray characters.
pub fn extract_digits(text: &str) -> String {
    text.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// A digit-string balance reading taken at a known point in the cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CurrencySnapshot(pub String);

impl CurrencySnapshot {
    pub fn from_reading(text: &str) -> Self {
        Self(extract_digits(text))
    }
}

/// Decides whether to arm another cycle.
///
/// Returns true only when looping is enabled and the balance reading is
/// unchanged. Any difference, including one from a misread digit, counts as
/// money spent and ends the run.
pub fn continue_next(
    continue_enabled: bool,
    before: &CurrencySnapshot,
    after: &CurrencySnapshot,
) -> bool {
    continue_enabled && after == before
}
