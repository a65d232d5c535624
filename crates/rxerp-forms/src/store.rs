//! # Collaborator Traits
//!
//! The boundaries a form session talks through. Implementations live in
//! the host application (HTTP client, local database, test mocks); the
//! session only cares about the contract.
//!
//! ## Posted Numbers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  Two forms open at once must not collide on a document number:      │
//! │                                                                     │
//! │  Form A ──┐                                                         │
//! │           ├──► save(...) ──► store assigns 1041, 1042 atomically    │
//! │  Form B ──┘                                                         │
//! │                                                                     │
//! │  The client NEVER generates or caches a number; it is returned by   │
//! │  the save call and nothing else.                                    │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use rxerp_core::{BatchSnapshot, Money, NormalizedAdjustment, NormalizedInvoice, ProductSnapshot};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The sequential, store-assigned document identifier.
pub type PostedNumber = i64;

/// A server-side validation rejection (e.g. an HTTP 422), passed through
/// to the caller exactly as received so field-level messages can be
/// rendered without re-interpretation. Never retried automatically.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("store rejected the document (status {status})")]
pub struct RemoteRejection {
    pub status: u16,
    /// Whatever field-error payload the server sent, verbatim.
    pub field_errors: serde_json::Value,
}

/// Failures at the persistence boundary.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store understood the document and said no.
    #[error(transparent)]
    Rejected(#[from] RemoteRejection),

    /// Transport/infrastructure failure; the document is unharmed and the
    /// user may retry.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

// `async fn` in these traits is deliberate: implementations are selected
// statically (generics), never behind `dyn`.
#[allow(async_fn_in_trait)]
/// Persistence for invoice documents.
pub trait InvoiceStore {
    /// Persists a normalized invoice and returns the posted number the
    /// store assigned to it.
    async fn save_invoice(&self, invoice: &NormalizedInvoice) -> Result<PostedNumber, StoreError>;
}

#[allow(async_fn_in_trait)]
/// Persistence for stock-adjustment documents.
pub trait AdjustmentStore {
    async fn save_adjustment(
        &self,
        adjustment: &NormalizedAdjustment,
    ) -> Result<PostedNumber, StoreError>;
}

#[allow(async_fn_in_trait)]
/// Read access to master data, used by the host to service fetch tickets.
///
/// The wholesale override is the customer-specific price list: when it
/// yields a price, the caller writes it into the [`ProductSnapshot`]
/// before completing the fetch, so the engine only ever sees the price
/// that applies to this customer.
pub trait MasterSource {
    async fn product(&self, product_id: &str) -> Result<ProductSnapshot, StoreError>;

    async fn batches(&self, product_id: &str) -> Result<Vec<BatchSnapshot>, StoreError>;

    async fn wholesale_override(
        &self,
        customer_id: &str,
        product_id: &str,
    ) -> Result<Option<Money>, StoreError>;
}
