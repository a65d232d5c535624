//! # rxerp-core: Pure Invoice Reconciliation Engine
//!
//! This crate is the **heart** of the RxERP forms: the computation and
//! validation logic that keeps a multi-line purchase invoice, sale
//! invoice, or stock-adjustment document internally consistent as any
//! field changes. All of it is pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                       RxERP Architecture                            │
//! │                                                                     │
//! │  ┌─────────────────────────────────────────────────────────────┐   │
//! │  │                  Frontend (invoice screens)                 │   │
//! │  │   product picker ─► line grid ─► footer ─► save button      │   │
//! │  └──────────────────────────────┬──────────────────────────────┘   │
//! │                                 │ edit events                       │
//! │  ┌──────────────────────────────▼──────────────────────────────┐   │
//! │  │                 rxerp-forms (session layer)                 │   │
//! │  │   one document per open form, fetch discipline, stores      │   │
//! │  └──────────────────────────────┬──────────────────────────────┘   │
//! │                                 │                                   │
//! │  ┌──────────────────────────────▼──────────────────────────────┐   │
//! │  │              ★ rxerp-core (THIS CRATE) ★                    │   │
//! │  │                                                             │   │
//! │  │   coerce ─► item ─► footer ─► payment ─► guards ─► submit   │   │
//! │  │                                                             │   │
//! │  │   NO I/O • NO CLOCK • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - `Money` (integer paisa) and `Percent` (basis points)
//! - [`coerce`] - keystroke text canonicalization, mid-entry states
//! - [`types`] - document, line item, header, snapshot types
//! - [`policy`] - configurable average-cost / margin rules
//! - [`item`] - per-line recalculation
//! - [`footer`] - gross / discount / tax / total aggregation
//! - [`payment`] - settlement amount linkage
//! - [`guard`] - duplicate, availability, price-floor checks (advisory)
//! - [`adjustment`] - stock-count valuation
//! - [`document`] - the event reducer composing the pipeline
//! - [`submit`] - hard validation before persistence
//! - [`payload`] - normalized persistence payloads
//! - [`error`] - the submit rejection taxonomy
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: every recalculation is `(document, event) ->
//!    document'`; same input, same output
//! 2. **No I/O**: master data arrives as already-fetched snapshots; the
//!    session layer owns timing
//! 3. **Integer Numerics**: paisa and basis points, never floats
//! 4. **Forward-only Pipeline**: item → footer → payment → guards, no
//!    stage feeds an earlier one, so recalculation cannot loop
//! 5. **Unset ≠ Zero**: an empty field stays empty until payload
//!    normalization makes it a definite number

// =============================================================================
// Module Declarations
// =============================================================================

pub mod adjustment;
pub mod coerce;
pub mod document;
pub mod error;
pub mod footer;
pub mod guard;
pub mod item;
pub mod money;
pub mod payload;
pub mod payment;
pub mod policy;
pub mod submit;
pub mod types;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use rxerp_core::Money` instead of
// `use rxerp_core::money::Money`

pub use coerce::{coerce, CoerceOptions, PercentEntry};
pub use document::{Advisories, DuplicateConflict, FormEvent, InvoiceDocument, RecalcOutcome};
pub use error::{SubmitError, SubmitErrorKind, SubmitRejection};
pub use money::{Money, Percent};
pub use payload::{normalize, normalize_adjustment, NormalizedAdjustment, NormalizedInvoice};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum line items on a single invoice.
///
/// ## Business Reason
/// Prevents runaway documents; matches the largest supplier invoices seen
/// in the field with room to spare. Can be made configurable per-tenant.
pub const MAX_INVOICE_ITEMS: usize = 100;
