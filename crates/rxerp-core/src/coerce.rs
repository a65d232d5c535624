//! # Numeric Coercion
//!
//! Canonicalizes raw keystroke text into well-formed numeric strings, and
//! types the "mid-entry" states that must survive a recalculation pass.
//!
//! ## Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  coerce("12a", decimal) ──► "12"     reject the last keystroke      │
//! │  coerce("12.3", decimal) ─► "12.3"   already well-formed            │
//! │  coerce("1.2.3", decimal) ► "1.2"    second point rejected          │
//! │  coerce("-5", unsigned) ──► "5"      sign not allowed here          │
//! │  coerce("", any) ─────────► ""       empty is a value, not an error │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Coercion never fails and never rounds: rounding to the 2-decimal commit
//! precision happens only when the text is parsed on blur/commit
//! ([`Money::parse`](crate::money::Money::parse) and friends), so a user
//! typing "12." is never fought mid-keystroke.
//!
//! A bare "-", "-." or "." is a legitimate transient: the user is mid-entry
//! of a (possibly negative) number. [`PercentEntry::Pending`] carries that
//! state through the document instead of a sentinel value.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Percent;

/// What a field accepts beyond plain digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CoerceOptions {
    /// Allow one decimal point.
    pub decimal: bool,
    /// Allow a leading minus sign.
    pub negative: bool,
}

impl CoerceOptions {
    /// Unsigned integer fields: quantities, pack sizes.
    pub const QUANTITY: CoerceOptions = CoerceOptions { decimal: false, negative: false };
    /// Unsigned 2-decimal fields: prices, amounts.
    pub const AMOUNT: CoerceOptions = CoerceOptions { decimal: true, negative: false };
    /// Signed 2-decimal fields: discount percentages (negative = surcharge).
    pub const SIGNED_PERCENT: CoerceOptions = CoerceOptions { decimal: true, negative: true };
}

/// Returns whether `raw` matches `^-?\d*\.?\d*$` under the given options.
fn is_well_formed(raw: &str, opts: CoerceOptions) -> bool {
    let mut seen_point = false;
    for (i, c) in raw.char_indices() {
        match c {
            '-' if opts.negative && i == 0 => {}
            '.' if opts.decimal && !seen_point => seen_point = true,
            '0'..='9' => {}
            _ => return false,
        }
    }
    true
}

/// Canonicalizes raw input text.
///
/// Mirrors the "reject the last keystroke" UX: if the text is not
/// well-formed, trailing characters are dropped until it is. The empty
/// string is a valid result and means "unset", which downstream code keeps
/// distinct from zero.
pub fn coerce(raw: &str, opts: CoerceOptions) -> String {
    let mut text = raw;
    while !is_well_formed(text, opts) {
        let mut chars = text.char_indices();
        let last = chars.next_back().map(|(i, _)| i).unwrap_or(0);
        text = &text[..last];
    }
    text.to_string()
}

/// Parses committed text from an unsigned integer field.
///
/// Returns `None` for empty text; quantities are never silently zeroed.
pub fn parse_quantity(raw: &str) -> Option<i64> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    // Saturate rather than wrap on absurd input lengths.
    let mut qty: i64 = 0;
    for b in raw.bytes() {
        qty = qty.saturating_mul(10).saturating_add((b - b'0') as i64);
    }
    Some(qty)
}

// =============================================================================
// Signed percentage entry
// =============================================================================

/// The committed state of a signed percentage field.
///
/// Three states, because two distinctions matter downstream:
/// - `Empty` vs `Value(0)`: an untouched discount field must not read as an
///   explicit 0% when the footer re-derives amounts.
/// - `Pending` vs anything else: the user has typed "-" or "-." and the
///   recalculation pass must neither clobber it nor send it to persistence.
///   (The upstream system shipped a literal "-0" string in this case; here
///   `Pending` normalizes to a definite zero only at payload time.)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum PercentEntry {
    /// Field has never held a value.
    #[default]
    Empty,
    /// Mid-entry sign: "-", "-." or ".".
    Pending,
    /// A committed percentage.
    Value(Percent),
}

impl PercentEntry {
    /// Classifies coerced text.
    pub fn from_raw(raw: &str) -> PercentEntry {
        if raw.is_empty() {
            return PercentEntry::Empty;
        }
        match Percent::parse(raw) {
            Some(p) => PercentEntry::Value(p),
            None => PercentEntry::Pending,
        }
    }

    /// The rate this entry contributes to arithmetic right now.
    ///
    /// `Empty` and `Pending` both compute as zero; the distinction is kept
    /// for display and payload normalization, not for math.
    pub fn effective(&self) -> Percent {
        match self {
            PercentEntry::Value(p) => *p,
            _ => Percent::zero(),
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, PercentEntry::Pending)
    }

    pub fn is_set(&self) -> bool {
        matches!(self, PercentEntry::Value(_))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
