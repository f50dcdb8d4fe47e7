//! Integration tests for batch generation from orders.

#![allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect

mod common;

use bakehouse_core::event::BATCH_CREATED;
use bakehouse_core::types::{BatchSource, BatchStage, OrderStatus};
use bakehouse_production::{NewBatch, ProductionError};
use bakehouse_testing::fixtures::{self, production_date, quantity};
use common::Harness;
use rust_decimal::Decimal;

#[tokio::test]
async fn orders_for_same_recipe_fold_into_one_batch() {
    let h = Harness::new();
    let bread = h.bread();
    let day = production_date();
    let first = fixtures::order(OrderStatus::Received, day, &[(bread.id, 5)]);
    let second = fixtures::order(OrderStatus::InProgress, day, &[(bread.id, 3)]);
    h.orders.insert(h.store_id, first.clone());
    h.orders.insert(h.store_id, second.clone());

    let batches = h.service.generate_batches(h.store_id, day).await.unwrap();

    assert_eq!(batches.len(), 1);
    let batch = &batches[0];
    assert_eq!(batch.quantity, Decimal::from(8));
    assert_eq!(batch.source, BatchSource::Auto);
    assert_eq!(batch.stage, BatchStage::ToPrep);
    assert_eq!(batch.recipe_name, "Country Loaf");
    assert_eq!(batch.production_date, day);

    let detail = h.service.get_batch(h.store_id, batch.id).await.unwrap();
    let provenance: Vec<_> = detail.contributions.iter().map(|c| c.provenance()).collect();
    assert_eq!(
        provenance,
        vec![(first.id, 0, Decimal::from(5)), (second.id, 0, Decimal::from(3))]
    );

    let mut prep: Vec<_> = detail
        .prep_items
        .iter()
        .map(|p| (p.ingredient_name.as_str(), p.required_quantity))
        .collect();
    prep.sort();
    assert_eq!(prep, vec![("Flour", Decimal::from(4)), ("Salt", quantity("0.08"))]);

    assert_eq!(h.events.event_names(), vec![BATCH_CREATED]);
}

#[tokio::test]
async fn each_recipe_gets_its_own_batch() {
    let h = Harness::new();
    let bread = h.bread();
    let rolls = h.add_recipe("Rolls", &[("Flour", "kg", "0.08")]);
    let day = production_date();
    h.orders.insert(
        h.store_id,
        fixtures::order(OrderStatus::Received, day, &[(bread.id, 2), (rolls.id, 12)]),
    );

    let batches = h.service.generate_batches(h.store_id, day).await.unwrap();

    let mut summary: Vec<_> = batches
        .iter()
        .map(|b| (b.recipe_name.as_str(), b.quantity))
        .collect();
    summary.sort();
    assert_eq!(
        summary,
        vec![("Country Loaf", Decimal::from(2)), ("Rolls", Decimal::from(12))]
    );
    assert_eq!(h.store.contribution_count(h.store_id), 2);
}

#[tokio::test]
async fn no_eligible_orders_creates_nothing() {
    let h = Harness::new();
    let bread = h.bread();
    let day = production_date();
    h.orders.insert(
        h.store_id,
        fixtures::order(OrderStatus::Cancelled, day, &[(bread.id, 10)]),
    );
    h.orders.insert(
        h.store_id,
        fixtures::order(OrderStatus::Delivered, day, &[(bread.id, 4)]),
    );

    let batches = h.service.generate_batches(h.store_id, day).await.unwrap();

    assert!(batches.is_empty());
    assert_eq!(h.store.commit_count(), 0);
    assert_eq!(h.store.batch_count(h.store_id), 0);
    assert!(h.events.events().is_empty());
}

#[tokio::test]
async fn orders_due_on_other_days_are_ignored() {
    let h = Harness::new();
    let bread = h.bread();
    let day = production_date();
    let tomorrow = day.succ_opt().unwrap();
    h.orders.insert(
        h.store_id,
        fixtures::order(OrderStatus::Received, tomorrow, &[(bread.id, 7)]),
    );

    assert!(h.service.generate_batches(h.store_id, day).await.unwrap().is_empty());
    assert_eq!(
        h.service.generate_batches(h.store_id, tomorrow).await.unwrap()[0].quantity,
        Decimal::from(7)
    );
}

#[tokio::test]
async fn missing_recipe_still_creates_batch() {
    let h = Harness::new();
    let ghost = fixtures::recipe("Ghost", &[("Flour", "kg", "1")]);
    let day = production_date();
    h.orders.insert(
        h.store_id,
        fixtures::order(OrderStatus::Received, day, &[(ghost.id, 6)]),
    );

    let batches = h.service.generate_batches(h.store_id, day).await.unwrap();

    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].recipe_name, "");
    assert_eq!(batches[0].quantity, Decimal::from(6));
    assert_eq!(h.store.prep_item_count(h.store_id), 0);
    assert_eq!(h.store.contribution_count(h.store_id), 1);
}

#[tokio::test]
async fn recipe_source_outage_degrades_instead_of_failing() {
    let h = Harness::new();
    let bread = h.bread();
    let day = production_date();
    h.orders.insert(
        h.store_id,
        fixtures::order(OrderStatus::Received, day, &[(bread.id, 2)]),
    );
    h.recipes.set_unavailable(true);

    let batches = h.service.generate_batches(h.store_id, day).await.unwrap();

    assert_eq!(batches[0].recipe_name, "");
    assert_eq!(h.store.prep_item_count(h.store_id), 0);
}

#[tokio::test]
async fn manual_batch_for_deleted_recipe_has_no_name_or_prep() {
    let h = Harness::new();
    let bread = h.bread();
    h.recipes.remove(h.store_id, bread.id);

    let batch = h
        .service
        .create_batch(h.store_id, NewBatch::new(bread.id, Decimal::from(3), production_date()))
        .await
        .unwrap();

    assert_eq!(batch.recipe_name, "");
    assert_eq!(batch.source, BatchSource::Manual);
    assert_eq!(h.store.batch_count(h.store_id), 1);
    assert_eq!(h.store.prep_item_count(h.store_id), 0);
}

#[tokio::test]
async fn manual_batch_during_recipe_outage_still_succeeds() {
    let h = Harness::new();
    let bread = h.bread();
    h.recipes.set_unavailable(true);

    let batch = h
        .service
        .create_batch(h.store_id, NewBatch::new(bread.id, Decimal::from(3), production_date()))
        .await
        .unwrap();

    assert_eq!(batch.recipe_name, "");
    assert_eq!(batch.quantity, Decimal::from(3));
    assert_eq!(h.store.prep_item_count(h.store_id), 0);
}

#[tokio::test]
async fn overflowing_order_line_is_left_out_of_the_batch() {
    let h = Harness::new();
    let bulk = h.add_recipe("Bulk Dough", &[("Flour", "kg", "1")]);
    let day = production_date();
    let mut first = fixtures::order(OrderStatus::Received, day, &[(bulk.id, 1)]);
    first.items[0].quantity = Decimal::MAX;
    let mut second = fixtures::order(OrderStatus::Received, day, &[(bulk.id, 1)]);
    second.items[0].quantity = Decimal::MAX;
    h.orders.insert(h.store_id, first);
    h.orders.insert(h.store_id, second);

    let batches = h.service.generate_batches(h.store_id, day).await.unwrap();

    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].quantity, Decimal::MAX);
    let report = h.service.check_provenance(h.store_id, batches[0].id).await.unwrap();
    assert!(report.balanced);
    assert_eq!(report.contribution_count, 1);
}

#[tokio::test]
async fn manual_batch_with_overflowing_prep_is_rejected() {
    let h = Harness::new();
    let baguette = h.add_recipe("Baguette", &[("Flour", "g", "1000")]);

    let error = h
        .service
        .create_batch(h.store_id, NewBatch::new(baguette.id, Decimal::MAX, production_date()))
        .await
        .unwrap_err();

    assert!(matches!(error, ProductionError::Validation(_)));
    assert_eq!(h.store.commit_count(), 0);
}

#[tokio::test]
async fn generating_twice_adds_new_batches() {
    let h = Harness::new();
    let bread = h.bread();
    let day = production_date();
    h.orders.insert(
        h.store_id,
        fixtures::order(OrderStatus::Received, day, &[(bread.id, 4)]),
    );

    let first = h.service.generate_batches(h.store_id, day).await.unwrap();
    let second = h.service.generate_batches(h.store_id, day).await.unwrap();

    assert_ne!(first[0].id, second[0].id);
    assert_eq!(h.store.batch_count(h.store_id), 2);
    assert_eq!(h.store.contribution_count(h.store_id), 2);
}

#[tokio::test]
async fn order_source_failure_propagates() {
    let h = Harness::new();
    h.orders.set_unavailable(true);

    let error = h
        .service
        .generate_batches(h.store_id, production_date())
        .await
        .unwrap_err();

    assert!(matches!(error, ProductionError::OrderSource(_)));
    assert!(error.is_retryable());
    assert_eq!(h.store.commit_count(), 0);
}

#[tokio::test]
async fn orders_of_other_stores_are_invisible() {
    let h = Harness::new();
    let bread = h.bread();
    let day = production_date();
    h.orders.insert(
        bakehouse_core::types::StoreId::new(),
        fixtures::order(OrderStatus::Received, day, &[(bread.id, 9)]),
    );

    assert!(h.service.generate_batches(h.store_id, day).await.unwrap().is_empty());
}

#[tokio::test]
async fn manual_batch_uses_recipe_name_and_derives_prep() {
    let h = Harness::new();
    let bread = h.bread();

    let batch = h
        .service
        .create_batch(
            h.store_id,
            NewBatch::new(bread.id, Decimal::from(10), production_date()).with_priority(3),
        )
        .await
        .unwrap();

    assert_eq!(batch.source, BatchSource::Manual);
    assert_eq!(batch.recipe_name, "Country Loaf");
    assert_eq!(batch.priority, 3);
    assert_eq!(h.store.prep_item_count(h.store_id), 2);
    assert_eq!(h.store.contribution_count(h.store_id), 0);
    assert_eq!(h.events.event_names(), vec![BATCH_CREATED]);
}

#[tokio::test]
async fn manual_batch_rejects_non_positive_quantity() {
    let h = Harness::new();
    let bread = h.bread();

    let error = h
        .service
        .create_batch(
            h.store_id,
            NewBatch::new(bread.id, Decimal::ZERO, production_date()),
        )
        .await
        .unwrap_err();

    assert!(matches!(error, ProductionError::Validation(_)));
    assert_eq!(h.recipes.lookup_count(), 0);
    assert_eq!(h.store.commit_count(), 0);
}
