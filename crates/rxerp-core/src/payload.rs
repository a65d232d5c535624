//! # Persistence Payloads
//!
//! The normalized document shapes handed to the persistence boundary.
//!
//! Normalization rules:
//! - every numeric field is definite: unset reads as zero, a pending "-"
//!   discount reads as zero (no sentinel strings ever leave the engine)
//! - blank placeholder rows are dropped
//! - wholesale pack quantities are converted to unit quantities, and the
//!   rate travels per unit
//! - `posted_number` is absent: the store assigns it at save time, never
//!   the client (two concurrently open forms must not collide)
//!
//! Callers run [`crate::submit::validate`] first; normalization itself
//! never fails.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::adjustment::StockAdjustmentDocument;
use crate::document::InvoiceDocument;
use crate::money::{Money, Percent};
use crate::submit::is_blank_row;
use crate::types::{DocumentKind, InvoiceType, SaleChannel, WholesaleMode};

/// One reconciled line, ready to persist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedItem {
    pub product_id: String,
    pub product_name: String,
    pub batch_number: Option<String>,
    #[ts(as = "Option<String>")]
    pub expiry: Option<NaiveDate>,
    pub pack_size: i64,
    /// Units, whatever granularity the form was edited in.
    pub quantity_units: i64,
    /// Bonus (free) units on purchases; 0 elsewhere.
    pub bonus_units: i64,
    /// Price per single unit.
    pub unit_rate: Money,
    pub discount_percent: Percent,
    pub margin: Percent,
    pub avg_price: Money,
    /// The reconciled line value; authoritative over qty × rate recompute.
    pub sub_total: Money,
    pub is_narcotic: bool,
    pub is_custom_price: bool,
}

/// A reconciled invoice, ready to persist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedInvoice {
    pub kind: DocumentKind,
    pub invoice_type: InvoiceType,
    pub channel: SaleChannel,
    pub wholesale_mode: WholesaleMode,
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub items: Vec<NormalizedItem>,
    pub gross_amount: Money,
    pub discount_percent: Percent,
    pub discount_amount: Money,
    pub tax_percent: Percent,
    pub tax_amount: Money,
    pub total_amount: Money,
    /// total_paid (purchase) / total_receive (sale); definite zero when
    /// empty (credit documents).
    pub settled_amount: Money,
    pub doctor_name: Option<String>,
    pub patient_name: Option<String>,
}

impl NormalizedInvoice {
    /// JSON form for stores that persist documents structurally.
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).expect("normalized invoice serializes")
    }
}

/// A reconciled stock adjustment, ready to persist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedAdjustment {
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub items: Vec<NormalizedAdjustmentItem>,
    pub total_worth: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedAdjustmentItem {
    pub product_id: String,
    pub product_name: String,
    pub available_qty: i64,
    pub actual_qty: i64,
    pub diff_qty: i64,
    pub unit_cost: Money,
    pub worth_adjusted: Money,
}

/// Normalizes an invoice document for transmission.
pub fn normalize(doc: &InvoiceDocument) -> NormalizedInvoice {
    let items = doc
        .items
        .iter()
        .filter(|item| !is_blank_row(item))
        .filter_map(|item| {
            let product = item.product.as_ref()?;
            let quantity_units = item.requested_units(&doc.profile);
            let unit_rate = match doc.profile.kind {
                DocumentKind::Purchase => item.unit_purchase_price,
                DocumentKind::Sale if doc.profile.is_pack_wholesale() => {
                    // pack rate to unit rate alongside the pack→unit
                    // quantity conversion
                    item.wholesale_price
                        .map(|p| if item.pack_size > 0 { p.div_by(item.pack_size) } else { p })
                }
                DocumentKind::Sale if doc.profile.is_wholesale() => item.wholesale_price,
                DocumentKind::Sale => item.unit_sale_price,
            }
            .unwrap_or(Money::zero());

            let bonus_units = item.bonus_pack_quantity.unwrap_or(0) * item.pack_size.max(0)
                + item.bonus_unit_quantity.unwrap_or(0);

            Some(NormalizedItem {
                product_id: product.id.clone(),
                product_name: product.name.clone(),
                batch_number: item.batch_number.clone(),
                expiry: item.expiry,
                pack_size: item.pack_size,
                quantity_units,
                bonus_units,
                unit_rate,
                discount_percent: item.discount_percent.effective(),
                margin: item.margin.unwrap_or(Percent::zero()),
                avg_price: item.avg_price.unwrap_or(Money::zero()),
                sub_total: item.sub_total,
                is_narcotic: item.is_narcotic,
                is_custom_price: item.is_custom_price,
            })
        })
        .collect();

    NormalizedInvoice {
        kind: doc.profile.kind,
        invoice_type: doc.header.invoice_type,
        channel: doc.profile.channel,
        wholesale_mode: doc.profile.wholesale_mode,
        date: doc.header.date,
        items,
        gross_amount: doc.header.gross_amount,
        discount_percent: doc.header.discount_percent.effective(),
        discount_amount: doc.header.discount_amount.unwrap_or(Money::zero()),
        tax_percent: doc.header.tax_percent.unwrap_or(Percent::zero()),
        tax_amount: doc.header.tax_amount.unwrap_or(Money::zero()),
        total_amount: doc.header.total_amount,
        settled_amount: doc.header.settled_amount.unwrap_or(Money::zero()),
        doctor_name: doc.header.doctor_name.clone(),
        patient_name: doc.header.patient_name.clone(),
    }
}

/// Normalizes an adjustment document for transmission.
pub fn normalize_adjustment(doc: &StockAdjustmentDocument) -> NormalizedAdjustment {
    let items = doc
        .items
        .iter()
        .filter_map(|item| {
            let product = item.product.as_ref()?;
            Some(NormalizedAdjustmentItem {
                product_id: product.id.clone(),
                product_name: product.name.clone(),
                available_qty: item.available_qty,
                actual_qty: item.actual_qty.unwrap_or(item.available_qty),
                diff_qty: item.diff_qty,
                unit_cost: item.unit_cost,
                worth_adjusted: item.worth_adjusted,
            })
        })
        .collect();

    NormalizedAdjustment { date: doc.date, items, total_worth: doc.total_worth }
}

// =============================================================================
// Unit Tests
// =============================================================================
