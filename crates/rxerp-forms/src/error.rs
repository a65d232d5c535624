//! # Form Error Type
//!
//! Unified error surface of a form session, mirroring how command layers
//! map engine and store failures into one machine-readable shape for the
//! frontend.

use rxerp_core::SubmitRejection;
use thiserror::Error;

use crate::store::StoreError;

/// Why a submit attempt did not produce a posted document.
#[derive(Debug, Error)]
pub enum FormError {
    /// The engine's own validation said no; carries every per-row/field
    /// failure at once.
    #[error(transparent)]
    Invalid(#[from] SubmitRejection),

    /// The persistence boundary failed or rejected the document.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl FormError {
    /// Machine-readable code for the frontend's error routing.
    pub fn code(&self) -> &'static str {
        match self {
            FormError::Invalid(_) => "VALIDATION_ERROR",
            FormError::Store(StoreError::Rejected(_)) => "REMOTE_REJECTION",
            FormError::Store(StoreError::Unavailable(_)) => "STORE_UNAVAILABLE",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::RemoteRejection;
    use rxerp_core::{SubmitError, SubmitErrorKind};

    #[test]
    fn test_codes() {
        let invalid = FormError::from(SubmitRejection {
            errors: vec![SubmitError::on_header(SubmitErrorKind::MissingPrescriptionFields)],
        });
        assert_eq!(invalid.code(), "VALIDATION_ERROR");

        let rejected = FormError::from(StoreError::Rejected(RemoteRejection {
            status: 422,
            field_errors: serde_json::json!({"items.0.quantity": ["out of stock"]}),
        }));
        assert_eq!(rejected.code(), "REMOTE_REJECTION");

        let down = FormError::from(StoreError::Unavailable("timeout".to_string()));
        assert_eq!(down.code(), "STORE_UNAVAILABLE");
    }
}
