//! Property tests for the reconciliation pipeline.
//!
//! The inline unit tests pin the worked examples; these pin the structural
//! invariants over arbitrary edit sequences:
//!
//! - footer consistency: `total == gross − discount + tax` and
//!   `gross == Σ sub_total` after every pass, in any edit order
//! - untouched settlement always mirrors the total
//! - every event application is a fixed point when re-applied
//! - coercion is total and idempotent

use chrono::NaiveDate;
use proptest::prelude::*;

use rxerp_core::coerce::{coerce, CoerceOptions};
use rxerp_core::money::{Money, Percent};
use rxerp_core::{
    DocumentProfile, FormEvent, HeaderField, InvoiceDocument, ItemField, ProductSnapshot,
};

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()
}

fn product(id: u8) -> ProductSnapshot {
    let unit_sale = 500 + id as i64 * 37;
    ProductSnapshot {
        id: format!("prod-{id}"),
        name: format!("Product {id}"),
        pack_size: (id % 4) as i64 * 5, // includes pack_size 0
        pack_purchase_price: Money::from_paisa(unit_sale * 8 / 10 * 10),
        unit_purchase_price: Some(Money::from_paisa(unit_sale * 8 / 10)),
        pack_sale_price: Money::from_paisa(unit_sale * 10),
        unit_sale_price: Some(Money::from_paisa(unit_sale)),
        wholesale_unit_price: Money::from_paisa(unit_sale - 20),
        wholesale_pack_price: Money::from_paisa((unit_sale - 20) * 10),
        margin: Percent::from_bps(2000),
        avg_price: Money::from_paisa(unit_sale * 8 / 10),
        is_narcotic: false,
        available_units: 10_000,
        has_batches: false,
    }
}

/// A generatable edit step; indices are wrapped into range at apply time.
#[derive(Debug, Clone)]
enum Step {
    AddRow,
    RemoveRow(usize),
    Pick(usize, u8),
    Quantity(usize, String),
    ItemDiscount(usize, String),
    HeaderDiscountPercent(String),
    HeaderDiscountAmount(String),
    HeaderTaxPercent(String),
    HeaderTaxAmount(String),
}

fn arb_amount_text() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        (0u32..10_000u32, 0u32..100u32).prop_map(|(a, b)| format!("{a}.{b:02}")),
        (0u32..10_000u32).prop_map(|a| format!("{a}")),
        (0u32..100u32).prop_map(|a| format!("{a}.")),
    ]
}

fn arb_signed_text() -> impl Strategy<Value = String> {
    prop_oneof![
        arb_amount_text(),
        Just("-".to_string()),
        Just("-.".to_string()),
        (0u32..50u32, 0u32..100u32).prop_map(|(a, b)| format!("-{a}.{b:02}")),
    ]
}

fn arb_step() -> impl Strategy<Value = Step> {
    prop_oneof![
        Just(Step::AddRow),
        (0usize..6).prop_map(Step::RemoveRow),
        ((0usize..6), (0u8..5)).prop_map(|(r, p)| Step::Pick(r, p)),
        ((0usize..6), "[0-9]{0,4}").prop_map(|(r, q)| Step::Quantity(r, q)),
        ((0usize..6), arb_signed_text()).prop_map(|(r, d)| Step::ItemDiscount(r, d)),
        arb_signed_text().prop_map(Step::HeaderDiscountPercent),
        arb_amount_text().prop_map(Step::HeaderDiscountAmount),
        arb_amount_text().prop_map(Step::HeaderTaxPercent),
        arb_amount_text().prop_map(Step::HeaderTaxAmount),
    ]
}

fn to_event(doc: &InvoiceDocument, step: &Step) -> FormEvent {
    let wrap = |row: usize| row % doc.items.len().max(1);
    match step {
        Step::AddRow => FormEvent::RowAdded,
        Step::RemoveRow(row) => FormEvent::RowRemoved { row: wrap(*row) },
        Step::Pick(row, id) => FormEvent::ProductPicked { row: wrap(*row), product: product(*id) },
        Step::Quantity(row, raw) => FormEvent::ItemEdited {
            row: wrap(*row),
            field: ItemField::Quantity,
            raw: raw.clone(),
        },
        Step::ItemDiscount(row, raw) => FormEvent::ItemEdited {
            row: wrap(*row),
            field: ItemField::DiscountPercent,
            raw: raw.clone(),
        },
        Step::HeaderDiscountPercent(raw) => FormEvent::HeaderEdited {
            field: HeaderField::DiscountPercent,
            raw: raw.clone(),
        },
        Step::HeaderDiscountAmount(raw) => FormEvent::HeaderEdited {
            field: HeaderField::DiscountAmount,
            raw: raw.clone(),
        },
        Step::HeaderTaxPercent(raw) => {
            FormEvent::HeaderEdited { field: HeaderField::TaxPercent, raw: raw.clone() }
        }
        Step::HeaderTaxAmount(raw) => {
            FormEvent::HeaderEdited { field: HeaderField::TaxAmount, raw: raw.clone() }
        }
    }
}

proptest! {
    #[test]
    fn footer_invariant_holds_for_any_edit_sequence(
        steps in proptest::collection::vec(arb_step(), 1..40)
    ) {
        let mut doc = InvoiceDocument::with_date(DocumentProfile::retail_sale(), date());
        for step in &steps {
            doc = doc.apply(to_event(&doc, step)).doc;

            let gross: Money = doc.items.iter().map(|i| i.sub_total).sum();
            prop_assert_eq!(doc.header.gross_amount, gross);
            prop_assert_eq!(
                doc.header.total_amount,
                doc.header.gross_amount
                    - doc.header.discount_amount.unwrap_or(Money::zero())
                    + doc.header.tax_amount.unwrap_or(Money::zero())
            );
        }
    }

    #[test]
    fn untouched_settlement_always_mirrors_total(
        steps in proptest::collection::vec(arb_step(), 1..40)
    ) {
        // None of the generated steps touches the settlement field, so the
        // linkage must hold after every single pass.
        let mut doc = InvoiceDocument::with_date(DocumentProfile::retail_sale(), date());
        for step in &steps {
            doc = doc.apply(to_event(&doc, step)).doc;
            prop_assert_eq!(doc.header.settled_amount, Some(doc.header.total_amount));
        }
    }

    #[test]
    fn reapplying_the_last_event_is_a_fixed_point(
        steps in proptest::collection::vec(arb_step(), 1..20)
    ) {
        let mut doc = InvoiceDocument::with_date(DocumentProfile::retail_sale(), date());
        for step in &steps {
            let event = to_event(&doc, step);
            doc = doc.apply(event.clone()).doc;
            // Row mutations are not idempotent by nature; every
            // field-level recalculation must be.
            if !matches!(event, FormEvent::RowAdded | FormEvent::RowRemoved { .. }) {
                let again = doc.apply(event).doc;
                prop_assert_eq!(&again, &doc);
            }
        }
    }

    #[test]
    fn coerce_is_total_and_idempotent(
        raw in ".{0,24}",
        decimal in any::<bool>(),
        negative in any::<bool>(),
    ) {
        let opts = CoerceOptions { decimal, negative };
        let once = coerce(&raw, opts);
        // Idempotent: already-canonical text is untouched.
        prop_assert_eq!(&coerce(&once, opts), &once);
        // Canonical text parses or is a recognized mid-entry state.
        if !once.is_empty() && decimal && once != "-" && once != "." && once != "-." {
            prop_assert!(Money::parse(&once).is_some());
        }
    }
}
