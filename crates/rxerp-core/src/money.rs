//! # Money and Percent
//!
//! Integer-backed numeric types for every monetary and percentage field in
//! the engine.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                         │
//! │                                                                     │
//! │  The invoice screens this engine serves are edited one keystroke    │
//! │  at a time. With f64 math:                                          │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌                              │
//! │    and a footer recomputed 40 times drifts by a paisa.              │
//! │                                                                     │
//! │  OUR SOLUTION: integer paisa (1/100 rupee) and integer basis        │
//! │  points (1/100 percent). Both match the 2-decimal commit            │
//! │  precision of the forms exactly, so a recomputation pass is a       │
//! │  fixed point: running it twice never changes a value.               │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Rounding
//! Half away from zero, applied only at defined commit points (deriving a
//! unit price from a pack price, taking a percentage of an amount, parsing
//! user text). Intermediates widen to i128 so large invoices cannot
//! overflow.

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Divides with half-away-from-zero rounding. `d` must be positive.
#[inline]
fn div_round(n: i128, d: i128) -> i64 {
    debug_assert!(d > 0);
    let half = d / 2;
    let q = if n >= 0 { (n + half) / d } else { (n - half) / d };
    q as i64
}

// =============================================================================
// Money
// =============================================================================

/// A monetary value in paisa (1/100 rupee).
///
/// Signed: negative amounts appear transiently while a surcharge line or a
/// return is being typed, and the submit validators decide whether they are
/// acceptable. The engine itself never clamps.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from paisa (the smallest currency unit).
    #[inline]
    pub const fn from_paisa(paisa: i64) -> Self {
        Money(paisa)
    }

    /// Creates a Money value from whole rupees.
    #[inline]
    pub const fn from_rupees(rupees: i64) -> Self {
        Money(rupees * 100)
    }

    /// Returns the value in paisa.
    #[inline]
    pub const fn paisa(&self) -> i64 {
        self.0
    }

    /// Returns the whole-rupee portion (truncated toward zero).
    #[inline]
    pub const fn rupees(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the paisa portion (always 0-99).
    #[inline]
    pub const fn paisa_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Zero.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Takes a percentage of this amount, rounded half away from zero.
    ///
    /// The rate is signed: a negative rate (surcharge entered as a negative
    /// discount) yields a negative amount, which the caller subtracts and
    /// therefore adds.
    ///
    /// ## Example
    /// ```rust
    /// use rxerp_core::money::{Money, Percent};
    ///
    /// let gross = Money::from_rupees(100);
    /// let disc = gross.percent_of(Percent::from_bps(1000)); // 10%
    /// assert_eq!(disc.paisa(), 1000); // Rs 10.00
    /// ```
    pub fn percent_of(&self, rate: Percent) -> Money {
        Money(div_round(self.0 as i128 * rate.bps() as i128, 10_000))
    }

    /// Multiplies by an integral quantity.
    #[inline]
    pub const fn times(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Divides by an integral divisor, rounded half away from zero.
    ///
    /// Used to derive a unit price from a pack price. Callers must guard
    /// `divisor > 0`; a zero pack size never reaches this function.
    pub fn div_by(&self, divisor: i64) -> Money {
        Money(div_round(self.0 as i128, divisor as i128))
    }

    /// Parses committed user text into a Money value.
    ///
    /// Accepts the output of [`crate::coerce::coerce`]: optional sign,
    /// digits, at most one decimal point. Rounds to whole paisa half away
    /// from zero. Returns `None` for empty or sign-only ("-", "-.", ".")
    /// text, which the document model keeps distinct from zero.
    pub fn parse(raw: &str) -> Option<Money> {
        let (negative, body) = match raw.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, raw),
        };
        let (int_part, frac_part) = match body.split_once('.') {
            Some((i, f)) => (i, f),
            None => (body, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return None;
        }
        if !int_part.bytes().all(|b| b.is_ascii_digit())
            || !frac_part.bytes().all(|b| b.is_ascii_digit())
        {
            return None;
        }

        // Saturate rather than wrap on absurd input lengths.
        let mut paisa: i128 = 0;
        for b in int_part.bytes() {
            paisa = paisa.saturating_mul(10).saturating_add((b - b'0') as i128);
        }
        paisa = paisa.saturating_mul(100);

        let mut frac = frac_part.bytes();
        if let Some(d) = frac.next() {
            paisa += (d - b'0') as i128 * 10;
        }
        if let Some(d) = frac.next() {
            paisa += (d - b'0') as i128;
        }
        // Half away from zero on the third decimal digit: the tail beyond
        // it can never carry the remainder across the half-paisa line.
        if let Some(d) = frac.next() {
            if d >= b'5' {
                paisa += 1;
            }
        }

        let paisa = if negative { -paisa } else { paisa };
        Some(Money(paisa.clamp(i64::MIN as i128, i64::MAX as i128) as i64))
    }

    /// Renders as a plain 2-decimal string for persistence payloads.
    pub fn to_decimal_string(&self) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        format!("{}{}.{:02}", sign, self.rupees().abs(), self.paisa_part())
    }
}

/// Display is for logs and debugging. UI formatting (thousands separators,
/// locale) belongs to the frontend.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}Rs {}.{:02}", sign, self.rupees().abs(), self.paisa_part())
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Percent
// =============================================================================

/// A percentage in basis points (1 bp = 0.01%).
///
/// Signed: item and header discount percentages may be negative, which the
/// forms treat as a surcharge. 825 bps = 8.25%.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct Percent(i64);

impl Percent {
    /// Creates a percentage from basis points.
    #[inline]
    pub const fn from_bps(bps: i64) -> Self {
        Percent(bps)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> i64 {
        self.0
    }

    /// Returns the rate as a percentage, for display only.
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Percent(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// The percentage `part` is of `whole`, rounded half away from zero.
    ///
    /// Inverse of [`Money::percent_of`]; recovers a discount/tax percentage
    /// from a hand-edited amount. A zero `whole` yields zero rather than
    /// dividing.
    pub fn of_ratio(part: Money, whole: Money) -> Percent {
        if whole.is_zero() {
            return Percent::zero();
        }
        Percent(div_round(
            part.paisa() as i128 * 10_000,
            whole.paisa().abs() as i128,
        ))
    }

    /// Parses committed user text into a percentage.
    ///
    /// Same textual grammar and rounding as [`Money::parse`]; the two
    /// decimal places of a percentage land exactly on basis points.
    pub fn parse(raw: &str) -> Option<Percent> {
        Money::parse(raw).map(|m| Percent(m.paisa()))
    }

    /// Renders as a plain 2-decimal string for persistence payloads.
    pub fn to_decimal_string(&self) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        format!("{}{}.{:02}", sign, (self.0 / 100).abs(), (self.0 % 100).abs())
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.to_decimal_string())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
