//! # Domain Types
//!
//! Core document types used throughout the reconciliation engine.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                        Document Types                               │
//! │                                                                     │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌──────────────────┐  │
//! │  │ ProductSnapshot │   │    LineItem     │   │  InvoiceHeader   │  │
//! │  │ ─────────────── │   │ ─────────────── │   │ ───────────────  │  │
//! │  │ master data     │──►│ quantities      │──►│ gross/disc/tax   │  │
//! │  │ frozen at       │   │ prices          │ Σ │ total, payment   │  │
//! │  │ selection time  │   │ sub_total       │   │ posted_number    │  │
//! │  └─────────────────┘   └─────────────────┘   └──────────────────┘  │
//! │                                                                     │
//! │  DocumentProfile: Purchase | Sale(Retail | Wholesale(Unit | Pack)) │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Pattern
//! A line item never reads live master data. Product and batch fields are
//! frozen into the item at selection time, so an open form stays
//! internally consistent even if the master record changes underneath it.
//! Refreshed master data re-enters only through a new selection event.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::coerce::PercentEntry;
use crate::money::{Money, Percent};
use crate::policy::CostingPolicy;

// =============================================================================
// Document profile
// =============================================================================

/// What kind of document a form is editing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    /// Goods bought from a supplier; quantities in packs plus loose units.
    Purchase,
    /// Goods sold to a customer; one quantity in the channel's granularity.
    Sale,
}

/// Debit settles now; credit is payable/receivable later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceType {
    #[default]
    Debit,
    Credit,
}

/// Sale pricing channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SaleChannel {
    #[default]
    Retail,
    Wholesale,
}

/// Whether wholesale quantities and prices are per unit or per pack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum WholesaleMode {
    #[default]
    Unit,
    Pack,
}

/// Static shape of a document: set when the form opens, never edited per
/// keystroke (switching sale channel or wholesale mode is a form-level
/// event that re-runs the pipeline).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DocumentProfile {
    pub kind: DocumentKind,
    pub channel: SaleChannel,
    pub wholesale_mode: WholesaleMode,
    pub costing: CostingPolicy,
}

impl DocumentProfile {
    pub fn purchase() -> Self {
        DocumentProfile {
            kind: DocumentKind::Purchase,
            channel: SaleChannel::Retail,
            wholesale_mode: WholesaleMode::Unit,
            costing: CostingPolicy::default(),
        }
    }

    pub fn retail_sale() -> Self {
        DocumentProfile {
            kind: DocumentKind::Sale,
            channel: SaleChannel::Retail,
            wholesale_mode: WholesaleMode::Unit,
            costing: CostingPolicy::default(),
        }
    }

    pub fn wholesale_sale(mode: WholesaleMode) -> Self {
        DocumentProfile {
            kind: DocumentKind::Sale,
            channel: SaleChannel::Wholesale,
            wholesale_mode: mode,
            costing: CostingPolicy::default(),
        }
    }

    #[inline]
    pub fn is_purchase(&self) -> bool {
        self.kind == DocumentKind::Purchase
    }

    #[inline]
    pub fn is_wholesale(&self) -> bool {
        self.kind == DocumentKind::Sale && self.channel == SaleChannel::Wholesale
    }

    /// Wholesale pack mode: quantities and prices are per pack.
    #[inline]
    pub fn is_pack_wholesale(&self) -> bool {
        self.is_wholesale() && self.wholesale_mode == WholesaleMode::Pack
    }
}

// =============================================================================
// Master-data snapshots
// =============================================================================

/// Product master data frozen into a line at selection time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductSnapshot {
    /// Opaque master-record identifier.
    pub id: String,
    pub name: String,
    /// Units per sealed pack; 0 when the product has no pack granularity.
    pub pack_size: i64,
    pub pack_purchase_price: Money,
    /// Absent when the master keeps only pack pricing; derived as
    /// pack ÷ pack_size on selection.
    pub unit_purchase_price: Option<Money>,
    pub pack_sale_price: Money,
    pub unit_sale_price: Option<Money>,
    /// Wholesale prices per unit and per pack; customer-specific overrides
    /// are applied by the caller before the snapshot reaches the engine.
    pub wholesale_unit_price: Money,
    pub wholesale_pack_price: Money,
    pub margin: Percent,
    pub avg_price: Money,
    pub is_narcotic: bool,
    /// Product-level stock, used when the product has no batches.
    pub available_units: i64,
    /// Whether any batches are registered; gates batch selection rules.
    pub has_batches: bool,
}

/// Batch master data frozen into a line at batch selection time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BatchSnapshot {
    pub batch_number: String,
    #[ts(as = "String")]
    pub expiry: NaiveDate,
    pub available_units: i64,
}

// =============================================================================
// Field keys
// =============================================================================

/// Editable numeric fields of a line item. The recalculator dispatches on
/// which one changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ItemField {
    PackQuantity,
    UnitQuantity,
    /// Sale-side single quantity (units, or packs in wholesale pack mode).
    Quantity,
    PackPurchasePrice,
    UnitPurchasePrice,
    PackSalePrice,
    UnitSalePrice,
    WholesalePrice,
    BonusPackQuantity,
    BonusUnitQuantity,
    DiscountPercent,
    Margin,
}

/// Editable header fields. Doubles as the key type of the document's
/// override set (a field present in the set is decoupled from automatic
/// derivation until explicitly relinked).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, TS,
)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum HeaderField {
    DiscountPercent,
    DiscountAmount,
    TaxPercent,
    TaxAmount,
    /// total_paid (purchase) / total_receive (sale).
    SettledAmount,
}

// =============================================================================
// Line item
// =============================================================================

/// One product row on an invoice.
///
/// All user-enterable numerics are `Option` (or [`PercentEntry`]): `None`
/// is the unset state and is never coerced to zero before payload
/// normalization. Derived fields (`sub_total`) are plain values.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineItem {
    pub product: Option<ProductSnapshot>,
    /// Absent for products without batch tracking.
    pub batch_number: Option<String>,
    #[ts(as = "Option<String>")]
    pub expiry: Option<NaiveDate>,
    /// Units per pack, copied from the product master; read-only on the row.
    pub pack_size: i64,

    // Purchase quantities: packs and total units (packs × pack_size + loose).
    pub pack_quantity: Option<i64>,
    pub unit_quantity: Option<i64>,
    // Sale quantity in the channel's granularity.
    pub quantity: Option<i64>,

    pub pack_purchase_price: Option<Money>,
    pub unit_purchase_price: Option<Money>,
    pub pack_sale_price: Option<Money>,
    pub unit_sale_price: Option<Money>,
    /// Per-unit or per-pack depending on the wholesale mode.
    pub wholesale_price: Option<Money>,

    // Purchase-only bonus (free) quantities; excluded from sub_total.
    pub bonus_pack_quantity: Option<i64>,
    pub bonus_unit_quantity: Option<i64>,

    /// Signed; negative is a surcharge.
    pub discount_percent: PercentEntry,

    // Purchase-only weighted-average costing outputs.
    pub margin: Option<Percent>,
    pub avg_price: Option<Money>,

    /// Derived: always recomputed as the last step of any item change.
    pub sub_total: Money,

    /// Available stock snapshot at selection time (batch-level when a batch
    /// is chosen, product-level otherwise).
    pub current_quantity: i64,
    /// Units this document's persisted revision already holds for this
    /// product/batch; 0 on new documents. Availability checks add it back
    /// so re-saving an unchanged line never reads as oversell.
    pub baseline_units: i64,

    pub is_narcotic: bool,
    /// Latched once a sale price is hand-edited; suppresses automatic
    /// repricing when master data refreshes.
    pub is_custom_price: bool,
}

impl LineItem {
    /// A blank row, as created by "add row" before any selection.
    pub fn empty() -> Self {
        LineItem::default()
    }

    #[inline]
    pub fn has_product(&self) -> bool {
        self.product.is_some()
    }

    pub fn product_id(&self) -> Option<&str> {
        self.product.as_ref().map(|p| p.id.as_str())
    }

    /// Quantity multiplied into `sub_total`, in the granularity the price
    /// field uses (units on purchase/retail, quantity-as-entered on
    /// wholesale).
    pub fn billed_quantity(&self, profile: &DocumentProfile) -> i64 {
        match profile.kind {
            DocumentKind::Purchase => self.unit_quantity.unwrap_or(0),
            DocumentKind::Sale => self.quantity.unwrap_or(0),
        }
    }

    /// Stock units this line consumes, for availability checks. Wholesale
    /// pack quantities convert through pack_size; bonus units count too on
    /// purchases (they arrive, they do not deplete).
    pub fn requested_units(&self, profile: &DocumentProfile) -> i64 {
        match profile.kind {
            DocumentKind::Purchase => self.unit_quantity.unwrap_or(0),
            DocumentKind::Sale => {
                let qty = self.quantity.unwrap_or(0);
                if profile.is_pack_wholesale() {
                    qty * self.pack_size.max(0)
                } else {
                    qty
                }
            }
        }
    }

    /// The price a billed quantity is multiplied by.
    pub fn effective_price(&self, profile: &DocumentProfile) -> Option<Money> {
        match profile.kind {
            DocumentKind::Purchase => self.unit_purchase_price,
            DocumentKind::Sale => {
                if profile.is_wholesale() {
                    self.wholesale_price
                } else {
                    self.unit_sale_price
                }
            }
        }
    }

    /// The purchase cost compared against a wholesale sale price by the
    /// price-floor check, in the wholesale mode's granularity.
    pub fn cost_floor(&self, profile: &DocumentProfile) -> Option<Money> {
        if profile.is_pack_wholesale() {
            self.pack_purchase_price
        } else {
            self.unit_purchase_price
        }
    }
}

// =============================================================================
// Invoice header
// =============================================================================

/// Header financials and identity of an invoice document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InvoiceHeader {
    pub invoice_type: InvoiceType,
    #[ts(as = "String")]
    pub date: NaiveDate,

    /// One of each pair is user-entered, the other derived; the footer
    /// recalculator keeps them mutually consistent against gross_amount.
    pub tax_percent: Option<Percent>,
    pub tax_amount: Option<Money>,
    pub discount_percent: PercentEntry,
    pub discount_amount: Option<Money>,

    /// Σ item.sub_total. Derived.
    pub gross_amount: Money,
    /// gross − discount + tax. Derived.
    pub total_amount: Money,

    /// total_paid (purchase) or total_receive (sale). Mirrors total_amount
    /// until the field is overridden; `None` is the credit-invoice empty
    /// state.
    pub settled_amount: Option<Money>,

    // Prescription fields, required when a narcotic line is present.
    pub doctor_name: Option<String>,
    pub patient_name: Option<String>,

    /// Server-assigned at save time. The engine never writes this; it is
    /// `Some` only on documents loaded back from persistence.
    pub posted_number: Option<i64>,
}

impl InvoiceHeader {
    /// Header defaults for a fresh form: given date, empty totals.
    pub fn new(date: NaiveDate) -> Self {
        InvoiceHeader {
            invoice_type: InvoiceType::default(),
            date,
            tax_percent: None,
            tax_amount: None,
            discount_percent: PercentEntry::Empty,
            discount_amount: None,
            gross_amount: Money::zero(),
            total_amount: Money::zero(),
            settled_amount: None,
            doctor_name: None,
            patient_name: None,
            posted_number: None,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
