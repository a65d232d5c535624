//! # Payment Linkage
//!
//! Keeps the header settlement amount (total_paid on purchases,
//! total_receive on sales) mirrored to total_amount until the user takes it
//! over.
//!
//! ## Linkage States
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      LINKED (not overridden)                        │
//! │                                                                     │
//! │   debit:  settled_amount == total_amount   after every pass         │
//! │   credit: settled_amount == (empty)        after every pass         │
//! │                                                                     │
//! │        manual edit                    relink action                 │
//! │        debit→credit switch            blur with amount == total     │
//! │             │                               ▲      (debit)          │
//! │             ▼                               │                       │
//! │                      OVERRIDDEN ("touched")                         │
//! │                                                                     │
//! │   the amount holds whatever the user typed; total_amount moves      │
//! │   independently until relinked                                      │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The flag itself is the [`HeaderField::SettledAmount`] entry in the
//! document's override set. Range validation (0 ≤ amount ≤ total) is a
//! submit-time concern and lives in the submit module.

use std::collections::BTreeSet;

use crate::money::Money;
use crate::types::{HeaderField, InvoiceHeader, InvoiceType};

/// Whether the settlement field is currently user-owned.
#[inline]
pub fn is_touched(overrides: &BTreeSet<HeaderField>) -> bool {
    overrides.contains(&HeaderField::SettledAmount)
}

/// The linked value for the header's invoice type.
fn linked_value(header: &InvoiceHeader) -> Option<Money> {
    match header.invoice_type {
        InvoiceType::Debit => Some(header.total_amount),
        InvoiceType::Credit => None,
    }
}

/// Re-mirrors the settlement amount after a recalculation pass.
///
/// A no-op while overridden; otherwise the amount tracks total_amount
/// (debit) or stays empty (credit).
pub fn apply_linkage(header: &InvoiceHeader, overrides: &BTreeSet<HeaderField>) -> InvoiceHeader {
    if is_touched(overrides) {
        return header.clone();
    }
    let mut next = header.clone();
    next.settled_amount = linked_value(header);
    next
}

/// A manual edit to the settlement amount: stores the parsed value and
/// marks the field overridden.
pub fn edit_settlement(
    header: &InvoiceHeader,
    overrides: &BTreeSet<HeaderField>,
    amount: Option<Money>,
) -> (InvoiceHeader, BTreeSet<HeaderField>) {
    let mut next = header.clone();
    next.settled_amount = amount;
    let mut overrides = overrides.clone();
    overrides.insert(HeaderField::SettledAmount);
    (next, overrides)
}

/// Blur/commit on the settlement field.
///
/// On a debit invoice, a committed amount exactly equal to the normalized
/// total re-links the field (the user typed the linked value by hand, so
/// linkage costs them nothing). The credit linked state is "empty", which a
/// deliberate entry should not snap back to, so credit blurs never relink.
pub fn commit_settlement(
    header: &InvoiceHeader,
    overrides: &BTreeSet<HeaderField>,
) -> BTreeSet<HeaderField> {
    let mut overrides = overrides.clone();
    if header.invoice_type == InvoiceType::Debit
        && header.settled_amount == Some(header.total_amount)
    {
        overrides.remove(&HeaderField::SettledAmount);
    }
    overrides
}

/// The explicit relink action: clears the override and resyncs at once.
pub fn relink(
    header: &InvoiceHeader,
    overrides: &BTreeSet<HeaderField>,
) -> (InvoiceHeader, BTreeSet<HeaderField>) {
    let mut overrides = overrides.clone();
    overrides.remove(&HeaderField::SettledAmount);
    let mut next = header.clone();
    next.settled_amount = linked_value(header);
    (next, overrides)
}

/// Invoice-type switch rules.
///
/// - debit → credit: a pure credit document records nothing settled; the
///   amount empties and the field is marked overridden so later passes do
///   not refill it.
/// - credit → debit: resyncs to total_amount only if still untouched.
pub fn change_invoice_type(
    header: &InvoiceHeader,
    overrides: &BTreeSet<HeaderField>,
    new_type: InvoiceType,
) -> (InvoiceHeader, BTreeSet<HeaderField>) {
    if header.invoice_type == new_type {
        return (header.clone(), overrides.clone());
    }
    let mut next = header.clone();
    let mut overrides = overrides.clone();
    next.invoice_type = new_type;

    match new_type {
        InvoiceType::Credit => {
            next.settled_amount = None;
            overrides.insert(HeaderField::SettledAmount);
        }
        InvoiceType::Debit => {
            if !is_touched(&overrides) {
                next.settled_amount = Some(next.total_amount);
            }
        }
    }
    (next, overrides)
}

// =============================================================================
// Unit Tests
// =============================================================================
