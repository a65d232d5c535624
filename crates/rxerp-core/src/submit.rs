//! # Submit Validation
//!
//! The hard gate between an open form and persistence.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  While typing:  guards flag, nothing blocks (guard module)          │
//! │  On submit:     THIS MODULE re-checks everything as hard errors     │
//! │  At the store:  server-side validation may still reject (422);      │
//! │                 those failures pass through untouched                │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Rows that are entirely blank (the trailing "add a row" placeholder) are
//! skipped here and dropped by payload normalization.

use crate::error::{SubmitError, SubmitErrorKind, SubmitRejection};
use crate::document::InvoiceDocument;
use crate::guard::{check_duplicate, check_line_availability, check_wholesale_floor};
use crate::money::Money;
use crate::types::LineItem;

/// A row the user never filled in: no product and no quantities.
pub(crate) fn is_blank_row(item: &LineItem) -> bool {
    !item.has_product()
        && item.pack_quantity.is_none()
        && item.unit_quantity.is_none()
        && item.quantity.is_none()
}

/// Validates a document for submission.
///
/// Collects every failure in one pass and returns them together; `Ok(())`
/// means the document may be normalized and sent to the store.
pub fn validate(doc: &InvoiceDocument) -> Result<(), SubmitRejection> {
    let mut errors = Vec::new();

    for (row, item) in doc.items.iter().enumerate() {
        if is_blank_row(item) {
            continue;
        }

        let Some(product) = item.product.as_ref() else {
            errors.push(SubmitError::on_row(
                row,
                SubmitErrorKind::MissingSelection { what: "product".to_string() },
            ));
            continue;
        };

        if product.has_batches && item.batch_number.is_none() {
            errors.push(SubmitError::on_row(
                row,
                SubmitErrorKind::MissingSelection { what: "batch".to_string() },
            ));
        }

        if let Some(conflicting_row) =
            check_duplicate(&doc.items, row, &product.id, item.batch_number.as_deref())
        {
            // Report on the later of the pair only.
            if conflicting_row < row {
                errors.push(SubmitError::on_row(
                    row,
                    SubmitErrorKind::DuplicateLine { conflicting_row },
                ));
            }
        }

        // Oversell is hard at submit time, and only for documents that
        // consume stock; purchases bring stock in.
        if !doc.profile.is_purchase() {
            let check = check_line_availability(item, &doc.profile);
            if !check.ok {
                errors.push(SubmitError::on_row(
                    row,
                    SubmitErrorKind::QuantityExceedsAvailable {
                        requested: item.requested_units(&doc.profile),
                        available: item.current_quantity + item.baseline_units,
                    },
                ));
            }
        }

        if doc.profile.is_purchase() {
            let margin_ok = item.margin.map(|m| m.bps() > 0).unwrap_or(false);
            if !margin_ok {
                errors.push(SubmitError::on_row(row, SubmitErrorKind::MarginNonPositive));
            }
        }

        if let Some(breach) = check_wholesale_floor(item, &doc.profile) {
            errors.push(SubmitError::on_row(
                row,
                SubmitErrorKind::PriceBelowCost { price: breach.price, floor: breach.floor },
            ));
        }
    }

    // Settlement range: 0 ≤ amount ≤ total. An empty amount is zero here.
    let settled = doc.header.settled_amount.unwrap_or(Money::zero());
    if settled.is_negative() || settled > doc.header.total_amount {
        errors.push(SubmitError::on_header(SubmitErrorKind::PaymentOutOfRange {
            max: doc.header.total_amount,
        }));
    }

    // Prescription fields gate the whole document once any narcotic line
    // is present.
    let has_narcotic = doc
        .items
        .iter()
        .any(|item| item.has_product() && item.is_narcotic);
    if has_narcotic {
        fn named(s: &Option<String>) -> Option<&str> {
            s.as_deref().map(str::trim).filter(|s| !s.is_empty())
        }
        if named(&doc.header.doctor_name).is_none() || named(&doc.header.patient_name).is_none() {
            errors.push(SubmitError::on_header(SubmitErrorKind::MissingPrescriptionFields));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(SubmitRejection { errors })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
