//! # Row Guards
//!
//! Advisory checks run after every pipeline pass: duplicate (product,
//! batch) detection, stock availability, and the wholesale price floor.
//!
//! Advisory here means the checks flag, they do not block: a user may type
//! through an oversell warning, and only submit validation turns the same
//! conditions into hard errors.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{DocumentProfile, LineItem};

// =============================================================================
// Duplicate guard
// =============================================================================

/// Finds a row that already carries the candidate (product, batch) pair.
///
/// Two rows conflict when they name the same product AND the same
/// batch-presence-state: either both carry the same non-empty batch number,
/// or both carry no batch at all. Same product under two different batches
/// is legitimate (two lots of one drug on one invoice).
///
/// Returns the index of the conflicting row; the caller is responsible for
/// reverting the edited row and surfacing the index. The guard never
/// merges or drops data itself.
pub fn check_duplicate(
    items: &[LineItem],
    row: usize,
    candidate_product_id: &str,
    candidate_batch: Option<&str>,
) -> Option<usize> {
    let candidate_batch = candidate_batch.filter(|b| !b.is_empty());
    items.iter().enumerate().find_map(|(idx, other)| {
        if idx == row {
            return None;
        }
        if other.product_id() != Some(candidate_product_id) {
            return None;
        }
        let other_batch = other.batch_number.as_deref().filter(|b| !b.is_empty());
        (other_batch == candidate_batch).then_some(idx)
    })
}

// =============================================================================
// Availability
// =============================================================================

/// Outcome of a stock check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Availability {
    pub ok: bool,
    /// Units requested beyond what is available; 0 when ok.
    pub excess: i64,
}

/// Compares a requested quantity against available stock.
pub fn check_availability(requested_units: i64, available_units: i64) -> Availability {
    let excess = (requested_units - available_units).max(0);
    Availability { ok: excess == 0, excess }
}

/// Availability for one line, in the line's own terms.
///
/// `current_quantity` is the stock snapshot frozen at selection time;
/// `baseline_units` adds back what this document's persisted revision
/// already reserves, so re-saving an unchanged line in edit mode never
/// reads as oversell.
pub fn check_line_availability(item: &LineItem, profile: &DocumentProfile) -> Availability {
    check_availability(
        item.requested_units(profile),
        item.current_quantity + item.baseline_units,
    )
}

// =============================================================================
// Wholesale price floor
// =============================================================================

/// A wholesale sale price below purchase cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PriceFloorBreach {
    pub price: Money,
    pub floor: Money,
}

/// Rejects selling below cost on wholesale invoices.
///
/// The floor is the unit or pack purchase cost, matching the wholesale
/// mode's granularity. Retail sales and purchases have no floor; rows
/// missing either figure are not checked (submit validation owns missing
/// selections).
pub fn check_wholesale_floor(
    item: &LineItem,
    profile: &DocumentProfile,
) -> Option<PriceFloorBreach> {
    if !profile.is_wholesale() || !item.has_product() {
        return None;
    }
    let price = item.wholesale_price?;
    let floor = item.cost_floor(profile)?;
    (price < floor).then_some(PriceFloorBreach { price, floor })
}

// =============================================================================
// Unit Tests
// =============================================================================
