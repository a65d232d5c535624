//! # Item Recalculator
//!
//! Recomputes all derived fields of one line item from its raw inputs and
//! the name of the field just edited.
//!
//! ## Recalculation Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  edit event on one field                                            │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  1. Sync the changed field's counterpart                            │
//! │     pack_qty ↔ unit_qty      (via pack_size, loose units kept)      │
//! │     pack_price ↔ unit_price  (via pack_size)                        │
//! │     margin ──► sale price    (purchase only, back-derivation)       │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  2. Recompute costing        (purchase only: avg_price, margin%)    │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  3. sub_total = billed_qty × effective_price × (1 − discount/100)   │
//! │     ALWAYS the final step, for every changed field                  │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Pure functions throughout: the input item is never mutated, the caller
//! receives a replacement.
//!
//! ## Edge Cases
//! - pack_size 0 or absent never divides; unit fields become the sole
//!   source of truth and pack fields go inert.
//! - Values that would go out of range are kept exactly as the user typed
//!   them; submit validation owns rejection, recalculation never corrects.

use crate::money::Money;
use crate::policy::{margin_over_cost, sale_price_for_margin};
use crate::types::{BatchSnapshot, DocumentProfile, ItemField, LineItem, ProductSnapshot};

/// Seeds a row from a selected product.
///
/// Re-selecting the product already on the row preserves batch, expiry and
/// the stock snapshot; picking a different product resets them. Hand-edited
/// sale prices survive a same-product re-selection (`is_custom_price`), so
/// a master-data refresh cannot silently reprice the row.
pub fn select_product(
    item: &LineItem,
    product: ProductSnapshot,
    profile: &DocumentProfile,
) -> LineItem {
    let mut next = item.clone();
    let same_product = item.product_id() == Some(product.id.as_str());

    if !same_product {
        next.batch_number = None;
        next.expiry = None;
        next.is_custom_price = false;
        next.current_quantity = product.available_units;
    } else if item.batch_number.is_none() {
        next.current_quantity = product.available_units;
    }

    next.pack_size = product.pack_size;
    next.is_narcotic = product.is_narcotic;

    next.pack_purchase_price = Some(product.pack_purchase_price);
    next.unit_purchase_price = Some(derive_unit(
        product.unit_purchase_price,
        product.pack_purchase_price,
        product.pack_size,
    ));

    let keep_sale_prices = same_product && item.is_custom_price;
    if !keep_sale_prices {
        next.pack_sale_price = Some(product.pack_sale_price);
        next.unit_sale_price = Some(derive_unit(
            product.unit_sale_price,
            product.pack_sale_price,
            product.pack_size,
        ));
        next.wholesale_price = Some(if profile.is_pack_wholesale() {
            product.wholesale_pack_price
        } else {
            product.wholesale_unit_price
        });
    }

    next.margin = Some(product.margin);
    next.avg_price = Some(product.avg_price);

    preset_default_quantity(&mut next, profile);

    next.product = Some(product);
    recompute_costing(&mut next, profile);
    finish_sub_total(&mut next, profile);
    next
}

/// Applies a selected batch: expiry and stock snapshot only, quantity and
/// price fields untouched.
pub fn select_batch(item: &LineItem, batch: BatchSnapshot) -> LineItem {
    let mut next = item.clone();
    next.batch_number = Some(batch.batch_number);
    next.expiry = Some(batch.expiry);
    next.current_quantity = batch.available_units;
    next
}

/// Recomputes a line item after `changed` was edited.
///
/// The changed field itself already holds the parsed user value; this
/// function only regenerates what follows from it.
pub fn recalc_item(item: &LineItem, changed: ItemField, profile: &DocumentProfile) -> LineItem {
    let mut next = item.clone();

    match changed {
        ItemField::PackQuantity => {
            if next.pack_size > 0 {
                let loose = next.unit_quantity.unwrap_or(0) % next.pack_size;
                let packs = next.pack_quantity.unwrap_or(0);
                next.unit_quantity = Some(packs * next.pack_size + loose);
            }
            // pack_size 0: unit_quantity is the sole source of truth and a
            // pack edit carries no unit information.
        }
        ItemField::UnitQuantity => {
            if next.pack_size > 0 {
                let units = next.unit_quantity.unwrap_or(0);
                next.pack_quantity = Some(units / next.pack_size);
            }
        }
        ItemField::Quantity
        | ItemField::BonusPackQuantity
        | ItemField::BonusUnitQuantity
        | ItemField::DiscountPercent => {
            // No counterpart to sync; costing and sub_total below.
        }
        ItemField::PackPurchasePrice => {
            if next.pack_size > 0 {
                next.unit_purchase_price =
                    next.pack_purchase_price.map(|p| p.div_by(next.pack_size));
            }
        }
        ItemField::UnitPurchasePrice => {
            if next.pack_size > 0 {
                next.pack_purchase_price =
                    next.unit_purchase_price.map(|p| p.times(next.pack_size));
            }
        }
        ItemField::PackSalePrice => {
            if next.pack_size > 0 {
                next.unit_sale_price = next.pack_sale_price.map(|p| p.div_by(next.pack_size));
            }
            next.is_custom_price = true;
        }
        ItemField::UnitSalePrice => {
            if next.pack_size > 0 {
                next.pack_sale_price = next.unit_sale_price.map(|p| p.times(next.pack_size));
            }
            next.is_custom_price = true;
        }
        ItemField::WholesalePrice => {
            next.is_custom_price = true;
        }
        ItemField::Margin => {
            // Editing the margin back-derives the sale price from the
            // current average cost; costing itself is left alone.
            if profile.is_purchase() {
                if let (Some(avg), Some(margin)) = (next.avg_price, next.margin) {
                    if let Some(sale) = sale_price_for_margin(avg, margin) {
                        next.unit_sale_price = Some(sale);
                        if next.pack_size > 0 {
                            next.pack_sale_price = Some(sale.times(next.pack_size));
                        }
                        next.is_custom_price = true;
                    }
                }
            }
            finish_sub_total(&mut next, profile);
            return next;
        }
    }

    recompute_costing(&mut next, profile);
    finish_sub_total(&mut next, profile);
    next
}

/// Unit price from the master: explicit when supplied, otherwise pack
/// price ÷ pack_size, otherwise the pack price itself (pack of one).
fn derive_unit(unit: Option<Money>, pack: Money, pack_size: i64) -> Money {
    match unit {
        Some(u) => u,
        None if pack_size > 0 => pack.div_by(pack_size),
        None => pack,
    }
}

/// First selection on a bare row presets a quantity of one pack (purchase)
/// or one unit (sale). A row that already carries a quantity keeps it.
fn preset_default_quantity(item: &mut LineItem, profile: &DocumentProfile) {
    if profile.is_purchase() {
        if item.pack_quantity.is_none() && item.unit_quantity.is_none() {
            item.pack_quantity = Some(1);
            item.unit_quantity = Some(item.pack_size.max(1));
        }
    } else if item.quantity.is_none() {
        item.quantity = Some(1);
    }
}

/// Purchase-only: blends the incoming cost into the product's average and
/// re-derives the margin of the current sale price over it.
fn recompute_costing(item: &mut LineItem, profile: &DocumentProfile) {
    if !profile.is_purchase() {
        return;
    }
    let Some(product) = item.product.as_ref() else {
        return;
    };
    let Some(unit_cost) = item.unit_purchase_price else {
        return;
    };
    let incoming = item.unit_quantity.unwrap_or(0);
    let avg = profile
        .costing
        .blend(product.avg_price, product.available_units, unit_cost, incoming);
    item.avg_price = Some(avg);
    if let Some(sale) = item.unit_sale_price {
        item.margin = Some(margin_over_cost(sale, avg));
    }
}

/// The invariant final step of every item recalculation.
fn finish_sub_total(item: &mut LineItem, profile: &DocumentProfile) {
    let qty = item.billed_quantity(profile);
    let price = item.effective_price(profile).unwrap_or(Money::zero());
    let line = price.times(qty);
    item.sub_total = line - line.percent_of(item.discount_percent.effective());
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coerce::PercentEntry;
    use crate::money::Percent;
    use crate::types::WholesaleMode;
    use chrono::NaiveDate;

    fn product(id: &str, pack_size: i64) -> ProductSnapshot {
        ProductSnapshot {
            id: id.to_string(),
            name: format!("Product {id}"),
            pack_size,
            pack_purchase_price: Money::from_paisa(10_990),
            unit_purchase_price: None,
            pack_sale_price: Money::from_paisa(13_000),
            unit_sale_price: None,
            wholesale_unit_price: Money::from_paisa(1200),
            wholesale_pack_price: Money::from_paisa(12_000),
            margin: Percent::from_bps(1500),
            avg_price: Money::from_paisa(1000),
            is_narcotic: false,
            available_units: 200,
            has_batches: true,
        }
    }

    fn batch(number: &str, units: i64) -> BatchSnapshot {
        BatchSnapshot {
            batch_number: number.to_string(),
            expiry: NaiveDate::from_ymd_opt(2027, 6, 30).unwrap(),
            available_units: units,
        }
    }

    #[test]
    fn test_product_select_seeds_prices_and_default_quantity() {
        let profile = DocumentProfile::purchase();
        let item = select_product(&LineItem::empty(), product("p1", 10), &profile);

        assert_eq!(item.pack_size, 10);
        assert_eq!(item.pack_purchase_price, Some(Money::from_paisa(10_990)));
        // Unit price derived from pack ÷ pack_size: 109.90 / 10 = 10.99
        assert_eq!(item.unit_purchase_price, Some(Money::from_paisa(1099)));
        assert_eq!(item.pack_quantity, Some(1));
        assert_eq!(item.unit_quantity, Some(10));
        assert!(!item.is_custom_price);
        assert_eq!(item.current_quantity, 200);
    }

    #[test]
    fn test_product_select_keeps_existing_quantity() {
        let profile = DocumentProfile::purchase();
        let mut row = LineItem::empty();
        row.pack_quantity = Some(4);
        row.unit_quantity = Some(40);
        let item = select_product(&row, product("p1", 10), &profile);
        assert_eq!(item.pack_quantity, Some(4));
        assert_eq!(item.unit_quantity, Some(40));
    }

    #[test]
    fn test_reselect_same_product_preserves_batch() {
        let profile = DocumentProfile::purchase();
        let item = select_product(&LineItem::empty(), product("p1", 10), &profile);
        let item = select_batch(&item, batch("B-77", 60));
        assert_eq!(item.current_quantity, 60);

        let again = select_product(&item, product("p1", 10), &profile);
        assert_eq!(again.batch_number.as_deref(), Some("B-77"));
        assert!(again.expiry.is_some());
        assert_eq!(again.current_quantity, 60);

        let other = select_product(&item, product("p2", 10), &profile);
        assert_eq!(other.batch_number, None);
        assert_eq!(other.expiry, None);
        assert_eq!(other.current_quantity, 200);
    }

    #[test]
    fn test_batch_select_leaves_quantities_alone() {
        let profile = DocumentProfile::purchase();
        let mut item = select_product(&LineItem::empty(), product("p1", 10), &profile);
        item.pack_quantity = Some(3);
        item.unit_quantity = Some(30);

        let item = select_batch(&item, batch("B-1", 45));
        assert_eq!(item.pack_quantity, Some(3));
        assert_eq!(item.unit_quantity, Some(30));
        assert_eq!(item.current_quantity, 45);
        assert_eq!(item.batch_number.as_deref(), Some("B-1"));
    }

    #[test]
    fn test_pack_quantity_drives_unit_quantity() {
        let profile = DocumentProfile::purchase();
        let mut item = select_product(&LineItem::empty(), product("p1", 10), &profile);

        item.pack_quantity = Some(3);
        item.unit_quantity = Some(0);
        let item = recalc_item(&item, ItemField::PackQuantity, &profile);
        assert_eq!(item.unit_quantity, Some(30));
    }

    #[test]
    fn test_pack_quantity_preserves_loose_units() {
        let profile = DocumentProfile::purchase();
        let mut item = select_product(&LineItem::empty(), product("p1", 10), &profile);

        // 2 packs + 3 loose = 23 units; bumping packs to 5 keeps the 3.
        item.pack_quantity = Some(2);
        item.unit_quantity = Some(23);
        item.pack_quantity = Some(5);
        let item = recalc_item(&item, ItemField::PackQuantity, &profile);
        assert_eq!(item.unit_quantity, Some(53));
    }

    #[test]
    fn test_unit_quantity_refloors_pack_quantity() {
        let profile = DocumentProfile::purchase();
        let mut item = select_product(&LineItem::empty(), product("p1", 10), &profile);

        item.unit_quantity = Some(37);
        let item = recalc_item(&item, ItemField::UnitQuantity, &profile);
        assert_eq!(item.pack_quantity, Some(3));
    }

    #[test]
    fn test_zero_pack_size_never_divides() {
        let profile = DocumentProfile::purchase();
        let mut item = select_product(&LineItem::empty(), product("loose", 0), &profile);

        item.unit_quantity = Some(7);
        let item = recalc_item(&item, ItemField::UnitQuantity, &profile);
        // No pack derivation, no panic; unit stands alone.
        assert_eq!(item.unit_quantity, Some(7));

        let mut item = item;
        item.pack_purchase_price = Some(Money::from_paisa(500));
        let item = recalc_item(&item, ItemField::PackPurchasePrice, &profile);
        // Unit price untouched by an inert pack field.
        assert_eq!(item.unit_quantity, Some(7));
    }

    #[test]
    fn test_price_pair_sync_both_directions() {
        let profile = DocumentProfile::purchase();
        let mut item = select_product(&LineItem::empty(), product("p1", 10), &profile);

        item.unit_purchase_price = Some(Money::from_paisa(900));
        let item = recalc_item(&item, ItemField::UnitPurchasePrice, &profile);
        assert_eq!(item.pack_purchase_price, Some(Money::from_paisa(9000)));

        let mut item = item;
        item.pack_purchase_price = Some(Money::from_paisa(11_000));
        let item = recalc_item(&item, ItemField::PackPurchasePrice, &profile);
        assert_eq!(item.unit_purchase_price, Some(Money::from_paisa(1100)));
    }

    #[test]
    fn test_sale_price_edit_latches_custom_flag() {
        let profile = DocumentProfile::retail_sale();
        let mut item = select_product(&LineItem::empty(), product("p1", 10), &profile);
        assert!(!item.is_custom_price);

        item.unit_sale_price = Some(Money::from_paisa(1400));
        let item = recalc_item(&item, ItemField::UnitSalePrice, &profile);
        assert!(item.is_custom_price);

        // Re-selecting the same product must not reprice the row now.
        let reselected = select_product(&item, product("p1", 10), &profile);
        assert_eq!(reselected.unit_sale_price, Some(Money::from_paisa(1400)));

        // A different product reprices and clears the latch.
        let other = select_product(&item, product("p2", 10), &profile);
        assert!(!other.is_custom_price);
        assert_eq!(other.unit_sale_price, Some(Money::from_paisa(1300)));
    }

    #[test]
    fn test_sub_total_retail() {
        let profile = DocumentProfile::retail_sale();
        let mut item = select_product(&LineItem::empty(), product("p1", 10), &profile);

        item.quantity = Some(3);
        let item = recalc_item(&item, ItemField::Quantity, &profile);
        // unit sale 13.00 derived from pack 130.00; 3 × 13.00 = 39.00
        assert_eq!(item.sub_total, Money::from_paisa(3900));
    }

    #[test]
    fn test_sub_total_uses_unit_equivalent_price_for_packs() {
        // pack_size 10, 3 packs, no loose units: 30 units at the
        // unit-equivalent price, regardless of which granularity was typed.
        let profile = DocumentProfile::purchase();
        let mut item = select_product(&LineItem::empty(), product("p1", 10), &profile);

        item.pack_quantity = Some(3);
        item.unit_quantity = Some(0);
        let via_packs = recalc_item(&item, ItemField::PackQuantity, &profile);
        assert_eq!(via_packs.unit_quantity, Some(30));
        // 30 × 10.99 = 329.70 = 3 × 109.90
        assert_eq!(via_packs.sub_total, Money::from_paisa(32_970));

        let mut direct = via_packs.clone();
        direct.unit_quantity = Some(30);
        let via_units = recalc_item(&direct, ItemField::UnitQuantity, &profile);
        assert_eq!(via_units.sub_total, via_packs.sub_total);
    }

    #[test]
    fn test_item_discount_and_surcharge() {
        let profile = DocumentProfile::retail_sale();
        let mut item = select_product(&LineItem::empty(), product("p1", 10), &profile);
        item.quantity = Some(10);
        item.discount_percent = PercentEntry::Value(Percent::from_bps(1000));
        let item = recalc_item(&item, ItemField::DiscountPercent, &profile);
        // 10 × 13.00 = 130.00, less 10% = 117.00
        assert_eq!(item.sub_total, Money::from_paisa(11_700));

        let mut item = item;
        item.discount_percent = PercentEntry::Value(Percent::from_bps(-500));
        let item = recalc_item(&item, ItemField::DiscountPercent, &profile);
        // Negative discount is a surcharge: 130.00 + 5% = 136.50
        assert_eq!(item.sub_total, Money::from_paisa(13_650));
    }

    #[test]
    fn test_purchase_costing_weighted_average() {
        let profile = DocumentProfile::purchase();
        let mut item = select_product(&LineItem::empty(), product("p1", 10), &profile);

        // 200 on hand at avg 10.00, buying 100 units at 10.99:
        // (1000×200 + 1099×100) / 300 = 1033
        item.pack_quantity = Some(10);
        item.unit_quantity = Some(100);
        let item = recalc_item(&item, ItemField::UnitQuantity, &profile);
        assert_eq!(item.avg_price, Some(Money::from_paisa(1033)));
        // margin of unit sale 13.00 over avg 10.33: 2054 bps
        assert_eq!(item.margin, Some(Percent::from_bps(2054)));
    }

    #[test]
    fn test_margin_edit_back_derives_sale_price() {
        let profile = DocumentProfile::purchase();
        let mut item = select_product(&LineItem::empty(), product("p1", 10), &profile);
        item.avg_price = Some(Money::from_paisa(1000));
        item.margin = Some(Percent::from_bps(2000));

        let item = recalc_item(&item, ItemField::Margin, &profile);
        // avg 10.00 at 20% margin: sale 12.50, pack 125.00
        assert_eq!(item.unit_sale_price, Some(Money::from_paisa(1250)));
        assert_eq!(item.pack_sale_price, Some(Money::from_paisa(12_500)));
        assert!(item.is_custom_price);
        // avg untouched by a margin edit
        assert_eq!(item.avg_price, Some(Money::from_paisa(1000)));
    }

    #[test]
    fn test_wholesale_pack_mode_sub_total() {
        let profile = DocumentProfile::wholesale_sale(WholesaleMode::Pack);
        let mut item = select_product(&LineItem::empty(), product("p1", 10), &profile);
        assert_eq!(item.wholesale_price, Some(Money::from_paisa(12_000)));

        item.quantity = Some(2);
        let item = recalc_item(&item, ItemField::Quantity, &profile);
        // 2 packs × 120.00 = 240.00
        assert_eq!(item.sub_total, Money::from_paisa(24_000));
        // and the stock request converts to units
        assert_eq!(item.requested_units(&profile), 20);
    }

    #[test]
    fn test_recalc_is_idempotent() {
        let profile = DocumentProfile::purchase();
        let mut item = select_product(&LineItem::empty(), product("p1", 10), &profile);
        item.pack_quantity = Some(3);
        item.unit_quantity = Some(30);
        item.discount_percent = PercentEntry::Value(Percent::from_bps(250));

        let once = recalc_item(&item, ItemField::PackQuantity, &profile);
        let twice = recalc_item(&once, ItemField::PackQuantity, &profile);
        assert_eq!(once, twice);
    }
}
