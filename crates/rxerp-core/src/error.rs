//! # Error Types
//!
//! The submit-time rejection taxonomy.
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Errors are enum variants carrying context, never bare strings
//! 3. Validation failures are values returned to the caller; the engine
//!    never panics on user input
//! 4. Every failure names the row/field it belongs to, so the form can
//!    paint the offending cell
//!
//! All of these are local and recoverable: the user fixes the field and
//! submits again. Keystroke-time advisories (see the guard module) reuse
//! the same conditions but never block.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::money::Money;

/// Why a document cannot be submitted as it stands.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SubmitErrorKind {
    /// A row carries values but no product, or no batch although the
    /// product tracks batches.
    #[error("{what} must be selected")]
    MissingSelection { what: String },

    /// Requested quantity exceeds available stock (after adding back the
    /// document's own pre-edit reservation in edit mode).
    #[error("requested {requested} units but only {available} available")]
    QuantityExceedsAvailable { requested: i64, available: i64 },

    /// Purchase items must be priced to sell above average cost.
    #[error("margin must be greater than zero")]
    MarginNonPositive,

    /// Settlement amount outside [0, total].
    #[error("amount must be between 0.00 and {max}")]
    PaymentOutOfRange { max: Money },

    /// Wholesale sale price below purchase cost.
    #[error("price {price} is below cost {floor}")]
    PriceBelowCost { price: Money, floor: Money },

    /// Same (product, batch) already present on another row.
    #[error("duplicate of row {conflicting_row}")]
    DuplicateLine { conflicting_row: usize },

    /// A narcotic line requires doctor and patient names on the header.
    #[error("doctor and patient names are required for narcotic items")]
    MissingPrescriptionFields,
}

/// One rejection, addressed to the offending row (or the header).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitError {
    /// `None` for header-level failures.
    pub row: Option<usize>,
    #[serde(flatten)]
    pub kind: SubmitErrorKind,
}

impl SubmitError {
    pub fn on_row(row: usize, kind: SubmitErrorKind) -> Self {
        SubmitError { row: Some(row), kind }
    }

    pub fn on_header(kind: SubmitErrorKind) -> Self {
        SubmitError { row: None, kind }
    }
}

/// The complete set of failures found in one validation pass.
///
/// Returned, not thrown: the engine reports everything at once so the form
/// can mark every offending cell in a single round.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("document failed validation with {} error(s)", errors.len())]
pub struct SubmitRejection {
    pub errors: Vec<SubmitError>,
}
