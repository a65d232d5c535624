//! # rxerp-forms: Form-Session Layer
//!
//! Sits between the invoice screens and the pure engine in `rxerp-core`.
//! Each open form owns exactly one [`session::InvoiceFormSession`] (or
//! [`session::AdjustmentFormSession`]); the session dispatches edit events
//! through the engine, tracks advisory flags, enforces the per-row
//! "last request wins" fetch discipline, and orchestrates submit against
//! the store traits.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  UI edit ──► session.dispatch(event) ──► rxerp-core pipeline        │
//! │  UI pick ──► begin_fetch ──► (host fetches) ──► complete_*_fetch    │
//! │  UI save ──► session.submit(store) ──► validate ─► normalize ─► save│
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything here is synchronous except the save path; the async
//! boundary (HTTP, database) is the host application's, reached through
//! the traits in [`store`].

pub mod error;
pub mod session;
pub mod store;

pub use error::FormError;
pub use session::{AdjustmentFormSession, FetchTicket, InvoiceFormSession};
pub use store::{
    AdjustmentStore, InvoiceStore, MasterSource, PostedNumber, RemoteRejection, StoreError,
};
