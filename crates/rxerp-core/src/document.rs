//! # Invoice Document and Reducer
//!
//! The document is the single unit of state a form session owns. Every
//! edit is an event; applying an event is a pure call that returns the
//! next snapshot plus advisory flags.
//!
//! ## The Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │   (document, event) ──► document'                                   │
//! │                                                                     │
//! │   1. write the edited field        (parse raw text, typed)          │
//! │   2. ItemRecalculator              (if an item changed)             │
//! │   3. FooterRecalculator            (gross, pairs, total)            │
//! │   4. PaymentLinkage                (mirror unless overridden)       │
//! │   5. Guards                        (advisory flags only)            │
//! │                                                                     │
//! │   Strictly forward: no stage feeds back into an earlier one in      │
//! │   the same pass, so recalculation can never loop.                   │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Stage 5 never blocks an edit. The same conditions become hard errors
//! only in the submit module.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::coerce::{coerce, parse_quantity, CoerceOptions, PercentEntry};
use crate::footer::{recalc_footer, FooterSource};
use crate::guard::{
    check_duplicate, check_line_availability, check_wholesale_floor, PriceFloorBreach,
};
use crate::item::{recalc_item, select_batch, select_product};
use crate::money::{Money, Percent};
use crate::payment;
use crate::types::{
    BatchSnapshot, DocumentProfile, HeaderField, InvoiceHeader, InvoiceType, ItemField, LineItem,
    ProductSnapshot,
};
use crate::MAX_INVOICE_ITEMS;

// =============================================================================
// Events
// =============================================================================

/// One user action on an open invoice form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FormEvent {
    RowAdded,
    RowRemoved { row: usize },
    /// Product chosen from the picker (master data already fetched).
    ProductPicked { row: usize, product: ProductSnapshot },
    BatchPicked { row: usize, batch: BatchSnapshot },
    /// A keystroke-committed numeric item field; `raw` is coerced text.
    ItemEdited { row: usize, field: ItemField, raw: String },
    /// A header numeric field, including the settlement amount.
    HeaderEdited { field: HeaderField, raw: String },
    /// Blur on the settlement field (may re-link, see payment module).
    SettlementCommitted,
    /// The explicit "link back to total" action.
    SettlementRelinked,
    InvoiceTypeChanged { invoice_type: InvoiceType },
    PrescriptionEdited {
        doctor_name: Option<String>,
        patient_name: Option<String>,
    },
}

// =============================================================================
// Document
// =============================================================================

/// A complete invoice form state: one immutable snapshot per applied event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceDocument {
    pub profile: DocumentProfile,
    pub header: InvoiceHeader,
    pub items: Vec<LineItem>,
    /// Derived header fields the user has taken over; see the payment
    /// module for the settlement entry's lifecycle.
    pub overrides: BTreeSet<HeaderField>,
}

/// A duplicate (product, batch) insertion that was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateConflict {
    /// The row that was being edited (now reverted to empty).
    pub row: usize,
    /// The pre-existing row it collided with.
    pub conflicting_row: usize,
}

/// Per-row advisory flags from the last pass. Soft at keystroke time;
/// submit validation re-checks them as hard errors.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Advisories {
    pub duplicate: Option<DuplicateConflict>,
    /// Rows requesting more than available stock, with the excess units.
    pub oversold: Vec<(usize, i64)>,
    /// Wholesale rows priced below cost.
    pub under_floor: Vec<(usize, PriceFloorBreach)>,
}

/// Result of applying one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecalcOutcome {
    pub doc: InvoiceDocument,
    pub advisories: Advisories,
}

impl InvoiceDocument {
    /// A fresh form: given date, one blank row, empty totals.
    pub fn with_date(profile: DocumentProfile, date: NaiveDate) -> Self {
        InvoiceDocument {
            profile,
            header: InvoiceHeader::new(date),
            items: vec![LineItem::empty()],
            overrides: BTreeSet::new(),
        }
    }

    /// Applies one event and returns the next snapshot. Never mutates
    /// `self`, never loops: each stage runs at most once, in order.
    pub fn apply(&self, event: FormEvent) -> RecalcOutcome {
        let mut doc = self.clone();
        let mut duplicate = None;
        // Footer runs for anything that can move item sub-totals; header
        // pair edits name their own source.
        let mut footer_source = Some(FooterSource::Items);

        match event {
            FormEvent::RowAdded => {
                if doc.items.len() < MAX_INVOICE_ITEMS {
                    doc.items.push(LineItem::empty());
                }
                footer_source = None;
            }
            FormEvent::RowRemoved { row } => {
                if row < doc.items.len() {
                    doc.items.remove(row);
                }
            }
            FormEvent::ProductPicked { row, product } => {
                if let Some(item) = doc.items.get(row).cloned() {
                    // A same-product re-select keeps its batch, so the
                    // duplicate key is checked with the surviving batch.
                    let surviving_batch = if item.product_id() == Some(product.id.as_str()) {
                        item.batch_number.as_deref()
                    } else {
                        None
                    };
                    match check_duplicate(&doc.items, row, &product.id, surviving_batch) {
                        Some(conflicting_row) => {
                            duplicate = Some(DuplicateConflict { row, conflicting_row });
                            doc.items[row] = LineItem::empty();
                        }
                        None => {
                            doc.items[row] = select_product(&item, product, &doc.profile);
                        }
                    }
                }
            }
            FormEvent::BatchPicked { row, batch } => {
                if let Some(item) = doc.items.get(row).cloned() {
                    let product_id = item.product_id().map(str::to_string);
                    match product_id {
                        Some(product_id) => {
                            match check_duplicate(
                                &doc.items,
                                row,
                                &product_id,
                                Some(batch.batch_number.as_str()),
                            ) {
                                Some(conflicting_row) => {
                                    duplicate = Some(DuplicateConflict { row, conflicting_row });
                                    doc.items[row] = LineItem::empty();
                                }
                                None => {
                                    doc.items[row] = select_batch(&item, batch);
                                }
                            }
                        }
                        // A batch with no product is a UI ordering glitch;
                        // ignore rather than guess.
                        None => footer_source = None,
                    }
                }
            }
            FormEvent::ItemEdited { row, field, raw } => {
                if let Some(item) = doc.items.get(row) {
                    let mut edited = item.clone();
                    write_item_field(&mut edited, field, &raw);
                    doc.items[row] = recalc_item(&edited, field, &doc.profile);
                }
            }
            FormEvent::HeaderEdited { field, raw } => {
                footer_source = write_header_field(&mut doc, field, &raw);
            }
            FormEvent::SettlementCommitted => {
                doc.overrides = payment::commit_settlement(&doc.header, &doc.overrides);
                footer_source = None;
            }
            FormEvent::SettlementRelinked => {
                let (header, overrides) = payment::relink(&doc.header, &doc.overrides);
                doc.header = header;
                doc.overrides = overrides;
                footer_source = None;
            }
            FormEvent::InvoiceTypeChanged { invoice_type } => {
                let (header, overrides) =
                    payment::change_invoice_type(&doc.header, &doc.overrides, invoice_type);
                doc.header = header;
                doc.overrides = overrides;
                footer_source = None;
            }
            FormEvent::PrescriptionEdited { doctor_name, patient_name } => {
                doc.header.doctor_name = doctor_name;
                doc.header.patient_name = patient_name;
                footer_source = None;
            }
        }

        if let Some(source) = footer_source {
            doc.header = recalc_footer(&doc.header, &doc.items, source);
        }
        doc.header = payment::apply_linkage(&doc.header, &doc.overrides);

        let advisories = Advisories {
            duplicate,
            oversold: doc
                .items
                .iter()
                .enumerate()
                .filter(|(_, item)| item.has_product())
                .filter_map(|(idx, item)| {
                    let check = check_line_availability(item, &doc.profile);
                    (!check.ok).then_some((idx, check.excess))
                })
                .collect(),
            under_floor: doc
                .items
                .iter()
                .enumerate()
                .filter_map(|(idx, item)| {
                    check_wholesale_floor(item, &doc.profile).map(|b| (idx, b))
                })
                .collect(),
        };

        RecalcOutcome { doc, advisories }
    }
}

/// What an item field accepts; keystroke coercion re-runs here so the
/// engine holds the "reject the last keystroke" contract even for raw
/// text a host forgot to canonicalize.
fn item_field_options(field: ItemField) -> CoerceOptions {
    match field {
        ItemField::PackQuantity
        | ItemField::UnitQuantity
        | ItemField::Quantity
        | ItemField::BonusPackQuantity
        | ItemField::BonusUnitQuantity => CoerceOptions::QUANTITY,
        ItemField::DiscountPercent => CoerceOptions::SIGNED_PERCENT,
        _ => CoerceOptions::AMOUNT,
    }
}

/// Writes parsed raw text into the item field being edited. Empty text
/// clears the field (unset, not zero).
fn write_item_field(item: &mut LineItem, field: ItemField, raw: &str) {
    let raw = coerce(raw, item_field_options(field));
    let raw = raw.as_str();
    match field {
        ItemField::PackQuantity => item.pack_quantity = parse_quantity(raw),
        ItemField::UnitQuantity => item.unit_quantity = parse_quantity(raw),
        ItemField::Quantity => item.quantity = parse_quantity(raw),
        ItemField::PackPurchasePrice => item.pack_purchase_price = Money::parse(raw),
        ItemField::UnitPurchasePrice => item.unit_purchase_price = Money::parse(raw),
        ItemField::PackSalePrice => item.pack_sale_price = Money::parse(raw),
        ItemField::UnitSalePrice => item.unit_sale_price = Money::parse(raw),
        ItemField::WholesalePrice => item.wholesale_price = Money::parse(raw),
        ItemField::BonusPackQuantity => item.bonus_pack_quantity = parse_quantity(raw),
        ItemField::BonusUnitQuantity => item.bonus_unit_quantity = parse_quantity(raw),
        ItemField::DiscountPercent => item.discount_percent = PercentEntry::from_raw(raw),
        ItemField::Margin => item.margin = Percent::parse(raw),
    }
}

/// Writes a header field edit and names the footer source it implies.
/// Settlement edits go through the payment module and skip the footer
/// (they cannot move the totals).
fn write_header_field(doc: &mut InvoiceDocument, field: HeaderField, raw: &str) -> Option<FooterSource> {
    let opts = match field {
        HeaderField::DiscountPercent => CoerceOptions::SIGNED_PERCENT,
        _ => CoerceOptions::AMOUNT,
    };
    let raw = coerce(raw, opts);
    let raw = raw.as_str();
    match field {
        HeaderField::DiscountPercent => {
            doc.header.discount_percent = PercentEntry::from_raw(raw);
            Some(FooterSource::DiscountPercent)
        }
        HeaderField::DiscountAmount => {
            doc.header.discount_amount = Money::parse(raw);
            Some(FooterSource::DiscountAmount)
        }
        HeaderField::TaxPercent => {
            doc.header.tax_percent = Percent::parse(raw);
            Some(FooterSource::TaxPercent)
        }
        HeaderField::TaxAmount => {
            doc.header.tax_amount = Money::parse(raw);
            Some(FooterSource::TaxAmount)
        }
        HeaderField::SettledAmount => {
            let (header, overrides) =
                payment::edit_settlement(&doc.header, &doc.overrides, Money::parse(raw));
            doc.header = header;
            doc.overrides = overrides;
            None
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
