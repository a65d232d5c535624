//! # Stock Adjustment Valuation
//!
//! The parallel, simpler engine for inventory counts: each row compares
//! counted stock against book stock and prices the difference. No footer
//! pairs, no payment linkage.
//!
//! ```text
//! diff_qty       = actual_qty − available_qty          (signed)
//! worth_adjusted = |diff_qty| × unit_cost
//! total_worth    = Σ worth_adjusted
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::coerce::{coerce, parse_quantity, CoerceOptions};
use crate::money::Money;
use crate::types::ProductSnapshot;

/// One counted product on an adjustment document.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockAdjustmentItem {
    pub product: Option<ProductSnapshot>,
    /// Book stock at selection time.
    pub available_qty: i64,
    /// Counted stock; `None` until the user enters it.
    pub actual_qty: Option<i64>,
    /// Derived: actual − available. 0 while actual is unset.
    pub diff_qty: i64,
    /// Average unit cost at selection time; prices the difference.
    pub unit_cost: Money,
    /// Derived: |diff| × unit_cost.
    pub worth_adjusted: Money,
}

impl StockAdjustmentItem {
    pub fn empty() -> Self {
        StockAdjustmentItem::default()
    }

    pub fn product_id(&self) -> Option<&str> {
        self.product.as_ref().map(|p| p.id.as_str())
    }
}

/// Recomputes every row's difference and worth, returning the refreshed
/// rows and the document total.
pub fn recalc_adjustment(items: &[StockAdjustmentItem]) -> (Vec<StockAdjustmentItem>, Money) {
    let rows: Vec<StockAdjustmentItem> = items
        .iter()
        .map(|item| {
            let mut next = item.clone();
            next.diff_qty = match next.actual_qty {
                Some(actual) => actual - next.available_qty,
                None => 0,
            };
            next.worth_adjusted = next.unit_cost.times(next.diff_qty.abs());
            next
        })
        .collect();
    let total = rows.iter().map(|r| r.worth_adjusted).sum();
    (rows, total)
}

// =============================================================================
// Adjustment document
// =============================================================================

/// Edit events on an adjustment form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AdjustmentEvent {
    RowAdded,
    RowRemoved { row: usize },
    ProductPicked { row: usize, product: ProductSnapshot },
    ActualQuantityEdited { row: usize, raw: String },
}

/// An adjustment document plus the advisory result of the last pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockAdjustmentDocument {
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub items: Vec<StockAdjustmentItem>,
    pub total_worth: Money,
}

/// Result of applying one adjustment event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdjustmentOutcome {
    pub doc: StockAdjustmentDocument,
    /// Row index already holding the picked product; the edited row was
    /// reverted to empty.
    pub duplicate_of: Option<usize>,
}

impl StockAdjustmentDocument {
    /// Fresh document with one blank row.
    pub fn with_date(date: NaiveDate) -> Self {
        StockAdjustmentDocument {
            date,
            items: vec![StockAdjustmentItem::empty()],
            total_worth: Money::zero(),
        }
    }

    /// Pure reducer: applies one event and revalues the document.
    pub fn apply(&self, event: AdjustmentEvent) -> AdjustmentOutcome {
        let mut items = self.items.clone();
        let mut duplicate_of = None;

        match event {
            AdjustmentEvent::RowAdded => items.push(StockAdjustmentItem::empty()),
            AdjustmentEvent::RowRemoved { row } => {
                if row < items.len() {
                    items.remove(row);
                }
            }
            AdjustmentEvent::ProductPicked { row, product } => {
                if row < items.len() {
                    let conflict = items.iter().enumerate().find_map(|(idx, other)| {
                        (idx != row && other.product_id() == Some(product.id.as_str()))
                            .then_some(idx)
                    });
                    match conflict {
                        Some(idx) => {
                            duplicate_of = Some(idx);
                            items[row] = StockAdjustmentItem::empty();
                        }
                        None => {
                            let item = &mut items[row];
                            item.available_qty = product.available_units;
                            item.unit_cost = product.avg_price;
                            item.product = Some(product);
                        }
                    }
                }
            }
            AdjustmentEvent::ActualQuantityEdited { row, raw } => {
                if let Some(item) = items.get_mut(row) {
                    let raw = coerce(&raw, CoerceOptions::QUANTITY);
                    item.actual_qty = parse_quantity(&raw);
                }
            }
        }

        let (items, total_worth) = recalc_adjustment(&items);
        AdjustmentOutcome {
            doc: StockAdjustmentDocument { date: self.date, items, total_worth },
            duplicate_of,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
