//! # Costing Policy
//!
//! How a purchase line updates the product's average unit cost, and how the
//! margin percentage is derived from it.
//!
//! The exact weighting rule is business policy rather than engine logic
//! (different deployments reconcile it against their accountant's method),
//! so it is a configuration value carried on the document profile and
//! deserializable from the same settings file the host application loads.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::{Money, Percent};

/// Average-cost update rule applied when a purchase line changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CostingPolicy {
    /// Cost-weighted average of on-hand stock and the incoming quantity.
    #[default]
    WeightedAverage,
    /// The latest purchase cost replaces the average outright.
    LatestCost,
}

impl CostingPolicy {
    /// Computes the post-purchase average unit cost.
    ///
    /// ## WeightedAverage
    /// `(avg × on_hand + unit_cost × incoming) / (on_hand + incoming)`,
    /// rounded to whole paisa. With nothing on hand (or nothing incoming on
    /// an empty book) the incoming cost stands alone.
    pub fn blend(
        &self,
        avg_price: Money,
        on_hand_units: i64,
        unit_cost: Money,
        incoming_units: i64,
    ) -> Money {
        match self {
            CostingPolicy::LatestCost => unit_cost,
            CostingPolicy::WeightedAverage => {
                let on_hand = on_hand_units.max(0);
                let incoming = incoming_units.max(0);
                let pool = on_hand + incoming;
                if pool == 0 {
                    return unit_cost;
                }
                let weighted = avg_price.paisa() as i128 * on_hand as i128
                    + unit_cost.paisa() as i128 * incoming as i128;
                // Round half away from zero to whole paisa.
                let half = pool as i128 / 2;
                let rounded = if weighted >= 0 {
                    (weighted + half) / pool as i128
                } else {
                    (weighted - half) / pool as i128
                };
                Money::from_paisa(rounded as i64)
            }
        }
    }
}

/// Margin of a sale price over an average cost:
/// `(sale − avg) / sale × 100`, in basis points.
///
/// A non-positive sale price yields zero margin; submit validation is where
/// a missing margin becomes an error.
pub fn margin_over_cost(sale_price: Money, avg_price: Money) -> Percent {
    if !sale_price.is_positive() {
        return Percent::zero();
    }
    Percent::of_ratio(sale_price - avg_price, sale_price)
}

/// Sale price implied by a target margin over an average cost:
/// `avg / (1 − margin/100)`, in paisa.
///
/// The inverse of [`margin_over_cost`], used when the margin field itself is
/// edited. A margin at or above 100% has no finite sale price and returns
/// `None`.
pub fn sale_price_for_margin(avg_price: Money, margin: Percent) -> Option<Money> {
    let denominator = 10_000 - margin.bps();
    if denominator <= 0 {
        return None;
    }
    let n = avg_price.paisa() as i128 * 10_000;
    let d = denominator as i128;
    let half = d / 2;
    let paisa = if n >= 0 { (n + half) / d } else { (n - half) / d };
    Some(Money::from_paisa(paisa as i64))
}
