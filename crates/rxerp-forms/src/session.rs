//! # Form Sessions
//!
//! One session per open form. The session owns the document, feeds every
//! edit through the pure pipeline, and carries the two disciplines the
//! engine itself cannot enforce:
//!
//! ## Last Request Wins
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  User re-selects products quickly in one row:                       │
//! │                                                                     │
//! │  begin_fetch(row) ──► ticket #1 ──► (slow fetch...)                 │
//! │  begin_fetch(row) ──► ticket #2 ──► completes ──► applied           │
//! │                        ticket #1 ──► completes ──► DROPPED (stale)  │
//! │                                                                     │
//! │  Staleness is decided by ticket comparison, never by timing, and    │
//! │  tickets follow the ROW, so removing rows above cannot misroute a   │
//! │  late completion.                                                   │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Save-Time Numbering
//! The posted number comes back from the store's save call and is written
//! onto the document afterwards; the session never invents or caches one.

use chrono::Local;
use tracing::{debug, info, warn};
use uuid::Uuid;

use rxerp_core::adjustment::{AdjustmentEvent, StockAdjustmentDocument};
use rxerp_core::{
    normalize, normalize_adjustment, submit, Advisories, BatchSnapshot, DocumentProfile,
    FormEvent, InvoiceDocument, ProductSnapshot, MAX_INVOICE_ITEMS,
};

use crate::error::FormError;
use crate::store::{AdjustmentStore, InvoiceStore, PostedNumber};

// =============================================================================
// Fetch gate
// =============================================================================

/// Authorization to apply one master-data fetch to one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    key: u64,
    seq: u64,
}

/// Per-row fetch bookkeeping. Rows get stable keys so a completion can be
/// routed to the row's current index even after insertions and removals
/// above it.
#[derive(Debug)]
struct FetchGate {
    keys: Vec<u64>,
    seqs: Vec<u64>,
    next_key: u64,
}

impl FetchGate {
    fn new(rows: usize) -> Self {
        let mut gate = FetchGate { keys: Vec::new(), seqs: Vec::new(), next_key: 0 };
        for _ in 0..rows {
            gate.push_row();
        }
        gate
    }

    fn push_row(&mut self) {
        self.keys.push(self.next_key);
        self.seqs.push(0);
        self.next_key += 1;
    }

    fn remove_row(&mut self, row: usize) {
        if row < self.keys.len() {
            self.keys.remove(row);
            self.seqs.remove(row);
        }
    }

    /// Starts a fetch for the row and invalidates any fetch still in
    /// flight for it.
    fn begin(&mut self, row: usize) -> Option<FetchTicket> {
        let seq = self.seqs.get_mut(row)?;
        *seq += 1;
        Some(FetchTicket { key: self.keys[row], seq: *seq })
    }

    /// Resolves a completed fetch to the row's current index, or `None`
    /// when the ticket is stale or its row is gone.
    fn resolve(&self, ticket: FetchTicket) -> Option<usize> {
        let row = self.keys.iter().position(|&k| k == ticket.key)?;
        (self.seqs[row] == ticket.seq).then_some(row)
    }
}

// =============================================================================
// Invoice session
// =============================================================================

/// An open invoice form.
pub struct InvoiceFormSession {
    id: String,
    doc: InvoiceDocument,
    advisories: Advisories,
    gate: FetchGate,
}

impl InvoiceFormSession {
    /// A fresh form dated today.
    pub fn new(profile: DocumentProfile) -> Self {
        Self::open(InvoiceDocument::with_date(profile, Local::now().date_naive()))
    }

    /// Opens an existing document (edit mode: items should carry their
    /// `baseline_units` so availability checks do not double-count).
    pub fn open(doc: InvoiceDocument) -> Self {
        let id = Uuid::new_v4().to_string();
        let gate = FetchGate::new(doc.items.len());
        debug!(session = %id, items = doc.items.len(), "form session opened");
        InvoiceFormSession { id, doc, advisories: Advisories::default(), gate }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn document(&self) -> &InvoiceDocument {
        &self.doc
    }

    /// Advisory flags from the most recent pass.
    pub fn advisories(&self) -> &Advisories {
        &self.advisories
    }

    /// Applies one edit event through the pipeline.
    pub fn dispatch(&mut self, event: FormEvent) -> &Advisories {
        // Keep the fetch gate's row bookkeeping aligned with the document.
        match &event {
            FormEvent::RowAdded => {
                if self.doc.items.len() < MAX_INVOICE_ITEMS {
                    self.gate.push_row();
                }
            }
            FormEvent::RowRemoved { row } => self.gate.remove_row(*row),
            _ => {}
        }

        debug!(session = %self.id, event = event_label(&event), "dispatch");
        let outcome = self.doc.apply(event);
        self.doc = outcome.doc;
        self.advisories = outcome.advisories;

        if let Some(conflict) = &self.advisories.duplicate {
            warn!(
                session = %self.id,
                row = conflict.row,
                conflicting_row = conflict.conflicting_row,
                "duplicate line rejected"
            );
        }
        &self.advisories
    }

    /// Starts a product/batch fetch for a row. Any earlier ticket for the
    /// same row is invalidated immediately.
    pub fn begin_fetch(&mut self, row: usize) -> Option<FetchTicket> {
        self.gate.begin(row)
    }

    /// Applies a completed product fetch, unless a newer fetch superseded
    /// it. Returns whether the data was applied.
    pub fn complete_product_fetch(&mut self, ticket: FetchTicket, product: ProductSnapshot) -> bool {
        match self.gate.resolve(ticket) {
            Some(row) => {
                self.dispatch(FormEvent::ProductPicked { row, product });
                true
            }
            None => {
                debug!(session = %self.id, "stale product fetch dropped");
                false
            }
        }
    }

    /// Applies a completed batch fetch, same discipline as products.
    pub fn complete_batch_fetch(&mut self, ticket: FetchTicket, batch: BatchSnapshot) -> bool {
        match self.gate.resolve(ticket) {
            Some(row) => {
                self.dispatch(FormEvent::BatchPicked { row, batch });
                true
            }
            None => {
                debug!(session = %self.id, "stale batch fetch dropped");
                false
            }
        }
    }

    /// The explicit "link payment back to total" action.
    pub fn relink_settlement(&mut self) {
        self.dispatch(FormEvent::SettlementRelinked);
    }

    /// Validates, normalizes, and saves the document. On success the
    /// store-assigned posted number is written onto the header.
    pub async fn submit<S: InvoiceStore>(&mut self, store: &S) -> Result<PostedNumber, FormError> {
        submit::validate(&self.doc)?;
        let payload = normalize(&self.doc);
        let posted_number = store.save_invoice(&payload).await?;
        self.doc.header.posted_number = Some(posted_number);
        info!(session = %self.id, posted_number, "invoice saved");
        Ok(posted_number)
    }
}

fn event_label(event: &FormEvent) -> &'static str {
    match event {
        FormEvent::RowAdded => "row_added",
        FormEvent::RowRemoved { .. } => "row_removed",
        FormEvent::ProductPicked { .. } => "product_picked",
        FormEvent::BatchPicked { .. } => "batch_picked",
        FormEvent::ItemEdited { .. } => "item_edited",
        FormEvent::HeaderEdited { .. } => "header_edited",
        FormEvent::SettlementCommitted => "settlement_committed",
        FormEvent::SettlementRelinked => "settlement_relinked",
        FormEvent::InvoiceTypeChanged { .. } => "invoice_type_changed",
        FormEvent::PrescriptionEdited { .. } => "prescription_edited",
    }
}

// =============================================================================
// Adjustment session
// =============================================================================

/// An open stock-adjustment form.
pub struct AdjustmentFormSession {
    id: String,
    doc: StockAdjustmentDocument,
    /// Conflicting row of the last rejected product pick, if any.
    duplicate_of: Option<usize>,
    gate: FetchGate,
}

impl AdjustmentFormSession {
    pub fn new() -> Self {
        Self::open(StockAdjustmentDocument::with_date(Local::now().date_naive()))
    }

    pub fn open(doc: StockAdjustmentDocument) -> Self {
        let id = Uuid::new_v4().to_string();
        let gate = FetchGate::new(doc.items.len());
        debug!(session = %id, items = doc.items.len(), "adjustment session opened");
        AdjustmentFormSession { id, doc, duplicate_of: None, gate }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn document(&self) -> &StockAdjustmentDocument {
        &self.doc
    }

    pub fn duplicate_of(&self) -> Option<usize> {
        self.duplicate_of
    }

    pub fn dispatch(&mut self, event: AdjustmentEvent) -> Option<usize> {
        match &event {
            AdjustmentEvent::RowAdded => self.gate.push_row(),
            AdjustmentEvent::RowRemoved { row } => self.gate.remove_row(*row),
            _ => {}
        }
        let outcome = self.doc.apply(event);
        self.doc = outcome.doc;
        self.duplicate_of = outcome.duplicate_of;
        self.duplicate_of
    }

    pub fn begin_fetch(&mut self, row: usize) -> Option<FetchTicket> {
        self.gate.begin(row)
    }

    pub fn complete_product_fetch(&mut self, ticket: FetchTicket, product: ProductSnapshot) -> bool {
        match self.gate.resolve(ticket) {
            Some(row) => {
                self.dispatch(AdjustmentEvent::ProductPicked { row, product });
                true
            }
            None => {
                debug!(session = %self.id, "stale product fetch dropped");
                false
            }
        }
    }

    pub async fn submit<S: AdjustmentStore>(&mut self, store: &S) -> Result<PostedNumber, FormError> {
        let payload = normalize_adjustment(&self.doc);
        let posted_number = store.save_adjustment(&payload).await?;
        info!(session = %self.id, posted_number, "adjustment saved");
        Ok(posted_number)
    }
}

impl Default for AdjustmentFormSession {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::Mutex;

    use rxerp_core::{
        ItemField, Money, NormalizedInvoice, Percent, SaleChannel, SubmitErrorKind,
    };

    use crate::store::{RemoteRejection, StoreError};

    fn init_logs() {
        let _ = tracing_subscriber::fmt().with_env_filter("debug").try_init();
    }

    fn product(id: &str) -> ProductSnapshot {
        ProductSnapshot {
            id: id.to_string(),
            name: id.to_string(),
            pack_size: 10,
            pack_purchase_price: Money::from_paisa(8000),
            unit_purchase_price: Some(Money::from_paisa(800)),
            pack_sale_price: Money::from_paisa(10_000),
            unit_sale_price: Some(Money::from_paisa(1000)),
            wholesale_unit_price: Money::from_paisa(900),
            wholesale_pack_price: Money::from_paisa(9000),
            margin: Percent::from_bps(2000),
            avg_price: Money::from_paisa(800),
            is_narcotic: false,
            available_units: 100,
            has_batches: false,
        }
    }

    /// Store mock handing out sequential numbers from a shared counter,
    /// like the real endpoint does per tenant.
    struct MockStore {
        next: AtomicI64,
        saved: Mutex<Vec<NormalizedInvoice>>,
    }

    impl MockStore {
        fn new() -> Self {
            MockStore { next: AtomicI64::new(1041), saved: Mutex::new(Vec::new()) }
        }
    }

    impl InvoiceStore for MockStore {
        async fn save_invoice(
            &self,
            invoice: &NormalizedInvoice,
        ) -> Result<PostedNumber, StoreError> {
            self.saved.lock().unwrap().push(invoice.clone());
            Ok(self.next.fetch_add(1, Ordering::SeqCst))
        }
    }

    /// Store mock that always answers like a server-side 422.
    struct RejectingStore;

    impl InvoiceStore for RejectingStore {
        async fn save_invoice(&self, _: &NormalizedInvoice) -> Result<PostedNumber, StoreError> {
            Err(StoreError::Rejected(RemoteRejection {
                status: 422,
                field_errors: serde_json::json!({"items.0.batchNumber": ["batch expired"]}),
            }))
        }
    }

    fn filled_session() -> InvoiceFormSession {
        let mut session = InvoiceFormSession::new(DocumentProfile::retail_sale());
        let ticket = session.begin_fetch(0).unwrap();
        assert!(session.complete_product_fetch(ticket, product("p1")));
        session.dispatch(FormEvent::ItemEdited {
            row: 0,
            field: ItemField::Quantity,
            raw: "5".to_string(),
        });
        session
    }

    #[test]
    fn test_stale_fetch_is_dropped() {
        init_logs();
        let mut session = InvoiceFormSession::new(DocumentProfile::retail_sale());

        // Two fetches race on the same row; the earlier one loses even
        // though it completes last.
        let first = session.begin_fetch(0).unwrap();
        let second = session.begin_fetch(0).unwrap();

        assert!(session.complete_product_fetch(second, product("new")));
        assert!(!session.complete_product_fetch(first, product("old")));

        assert_eq!(session.document().items[0].product_id(), Some("new"));
    }

    #[test]
    fn test_fetch_follows_row_across_removal() {
        let mut session = InvoiceFormSession::new(DocumentProfile::retail_sale());
        session.dispatch(FormEvent::RowAdded);

        // Fetch starts for row 1, then row 0 is removed while in flight.
        let ticket = session.begin_fetch(1).unwrap();
        session.dispatch(FormEvent::RowRemoved { row: 0 });

        assert!(session.complete_product_fetch(ticket, product("p1")));
        assert_eq!(session.document().items[0].product_id(), Some("p1"));
    }

    #[test]
    fn test_fetch_for_removed_row_is_dropped() {
        let mut session = InvoiceFormSession::new(DocumentProfile::retail_sale());
        let ticket = session.begin_fetch(0).unwrap();
        session.dispatch(FormEvent::RowRemoved { row: 0 });
        assert!(!session.complete_product_fetch(ticket, product("p1")));
    }

    #[tokio::test]
    async fn test_submit_assigns_posted_number_from_store() {
        let store = MockStore::new();
        let mut session = filled_session();
        assert_eq!(session.document().header.posted_number, None);

        let number = session.submit(&store).await.unwrap();
        assert_eq!(number, 1041);
        assert_eq!(session.document().header.posted_number, Some(1041));

        let saved = store.saved.lock().unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].channel, SaleChannel::Retail);
        assert_eq!(saved[0].items[0].quantity_units, 5);
    }

    #[tokio::test]
    async fn test_concurrent_forms_get_distinct_numbers() {
        let store = MockStore::new();
        let mut a = filled_session();
        let mut b = filled_session();

        let n1 = a.submit(&store).await.unwrap();
        let n2 = b.submit(&store).await.unwrap();
        assert_ne!(n1, n2);
    }

    #[tokio::test]
    async fn test_invalid_document_never_reaches_store() {
        let store = MockStore::new();
        let mut session = InvoiceFormSession::new(DocumentProfile::retail_sale());
        // quantity with no product selected
        session.dispatch(FormEvent::ItemEdited {
            row: 0,
            field: ItemField::Quantity,
            raw: "3".to_string(),
        });

        let err = session.submit(&store).await.unwrap_err();
        match err {
            FormError::Invalid(rejection) => {
                assert!(matches!(
                    rejection.errors[0].kind,
                    SubmitErrorKind::MissingSelection { .. }
                ));
            }
            other => panic!("expected validation failure, got {other:?}"),
        }
        assert!(store.saved.lock().unwrap().is_empty());
        assert_eq!(session.document().header.posted_number, None);
    }

    #[tokio::test]
    async fn test_remote_rejection_passes_through_untouched() {
        let mut session = filled_session();
        let err = session.submit(&RejectingStore).await.unwrap_err();

        assert_eq!(err.code(), "REMOTE_REJECTION");
        match err {
            FormError::Store(StoreError::Rejected(rejection)) => {
                assert_eq!(rejection.status, 422);
                assert_eq!(
                    rejection.field_errors["items.0.batchNumber"][0],
                    "batch expired"
                );
            }
            other => panic!("expected remote rejection, got {other:?}"),
        }
        // no number was assigned
        assert_eq!(session.document().header.posted_number, None);
    }

    #[tokio::test]
    async fn test_adjustment_submit() {
        struct Store;
        impl AdjustmentStore for Store {
            async fn save_adjustment(
                &self,
                adjustment: &rxerp_core::NormalizedAdjustment,
            ) -> Result<PostedNumber, StoreError> {
                assert_eq!(adjustment.total_worth, Money::from_paisa(9600));
                Ok(7)
            }
        }

        let mut session = AdjustmentFormSession::new();
        let mut snap = product("p1");
        snap.available_units = 50;
        snap.avg_price = Money::from_paisa(1200);
        let ticket = session.begin_fetch(0).unwrap();
        assert!(session.complete_product_fetch(ticket, snap));
        session.dispatch(AdjustmentEvent::ActualQuantityEdited {
            row: 0,
            raw: "42".to_string(),
        });

        assert_eq!(session.submit(&Store).await.unwrap(), 7);
    }
}
