//! # Footer Recalculator
//!
//! Aggregates item sub-totals into the header financial fields and keeps
//! each percentage/amount pair mutually consistent.
//!
//! ## Pair Mirroring
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  gross_amount = Σ item.sub_total                                    │
//! │                                                                     │
//! │  source = DiscountPercent ──► discount_amount  = gross × pct        │
//! │  source = DiscountAmount ───► discount_percent = amount / gross     │
//! │  source = TaxPercent ───────► tax_amount       = gross × pct        │
//! │  source = TaxAmount ────────► tax_percent      = amount / gross     │
//! │  source = Items ────────────► both amounts from existing percents   │
//! │                                                                     │
//! │  total_amount = gross − discount_amount + tax_amount                │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The field named as the source is NEVER written: a user mid-typing "12."
//! keeps exactly that text, because the engine only regenerates the other
//! member of the pair and the caller re-applies the raw string for display.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::coerce::PercentEntry;
use crate::money::{Money, Percent};
use crate::types::{InvoiceHeader, LineItem};

/// What triggered a footer pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum FooterSource {
    /// An item changed (edit, add, remove); header fields were not touched.
    Items,
    DiscountPercent,
    DiscountAmount,
    TaxPercent,
    TaxAmount,
}

/// Recomputes gross, the untouched half of each pair, and the total.
pub fn recalc_footer(
    header: &InvoiceHeader,
    items: &[LineItem],
    source: FooterSource,
) -> InvoiceHeader {
    let mut next = header.clone();
    next.gross_amount = items.iter().map(|i| i.sub_total).sum();
    let gross = next.gross_amount;

    match source {
        FooterSource::Items => {
            next.discount_amount = discount_from_percent(next.discount_percent, gross);
            next.tax_amount = next.tax_percent.map(|p| gross.percent_of(p));
        }
        FooterSource::DiscountPercent => {
            next.discount_amount = discount_from_percent(next.discount_percent, gross);
        }
        FooterSource::DiscountAmount => {
            next.discount_percent = match next.discount_amount {
                Some(amount) => PercentEntry::Value(Percent::of_ratio(amount, gross)),
                None => PercentEntry::Empty,
            };
        }
        FooterSource::TaxPercent => {
            next.tax_amount = next.tax_percent.map(|p| gross.percent_of(p));
        }
        FooterSource::TaxAmount => {
            next.tax_percent = next.tax_amount.map(|amount| Percent::of_ratio(amount, gross));
        }
    }

    next.total_amount = gross - next.discount_amount.unwrap_or(Money::zero())
        + next.tax_amount.unwrap_or(Money::zero());
    next
}

/// An `Empty` percentage clears the amount; a `Pending` "-" keeps whatever
/// amount was last derived, so the pass never fights the mid-entry sign.
fn discount_from_percent(entry: PercentEntry, gross: Money) -> Option<Money> {
    match entry {
        PercentEntry::Empty => None,
        PercentEntry::Pending => Some(Money::zero()),
        PercentEntry::Value(p) => Some(gross.percent_of(p)),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
