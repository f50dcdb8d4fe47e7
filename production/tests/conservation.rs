//! Property tests: split and merge never create or lose quantity or provenance.

#![allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect

mod common;

use bakehouse_core::types::{BatchStage, OrderStatus};
use bakehouse_production::NewBatch;
use bakehouse_testing::fixtures::{self, production_date};
use bakehouse_testing::strategies::{batch_stage, positive_quantity, priority};
use common::Harness;
use proptest::prelude::*;
use rust_decimal::Decimal;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("test runtime")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn split_conserves_quantity(total in positive_quantity(), fraction in 1_u32..100) {
        let split = (total * Decimal::new(i64::from(fraction), 2)).round_dp(2);
        prop_assume!(split > Decimal::ZERO && split < total);

        runtime().block_on(async {
            let h = Harness::new();
            let bread = h.bread();
            let batch = h
                .service
                .create_batch(h.store_id, NewBatch::new(bread.id, total, production_date()))
                .await
                .unwrap();

            let outcome = h.service.split_batch(h.store_id, batch.id, split).await.unwrap();

            prop_assert_eq!(outcome.original.quantity + outcome.new_batch.quantity, total);
            prop_assert_eq!(outcome.new_batch.quantity, split);
            let listed: Decimal = h
                .service
                .list_batches(h.store_id, production_date())
                .await
                .unwrap()
                .iter()
                .map(|b| b.quantity)
                .sum();
            prop_assert_eq!(listed, total);
            Ok(())
        })?;
    }

    #[test]
    fn merge_conserves_quantity_and_provenance(
        lines in prop::collection::vec(1_i64..50, 1..5),
        extras in prop::collection::vec((positive_quantity(), batch_stage(), priority()), 1..4),
    ) {
        runtime().block_on(async {
            let h = Harness::new();
            let bread = h.bread();
            let day = production_date();
            for &qty in &lines {
                h.orders.insert(
                    h.store_id,
                    fixtures::order(OrderStatus::Received, day, &[(bread.id, qty)]),
                );
            }
            let generated = h.service.generate_batches(h.store_id, day).await.unwrap();
            let mut inputs = generated.clone();
            for (qty, stage, prio) in &extras {
                let batch = h
                    .service
                    .create_batch(
                        h.store_id,
                        NewBatch::new(bread.id, *qty, day).with_priority(*prio),
                    )
                    .await
                    .unwrap();
                inputs.push(h.service.update_stage(h.store_id, batch.id, *stage).await.unwrap());
            }

            let ids: Vec<_> = inputs.iter().map(|b| b.id).collect();
            let merged = h.service.merge_batches(h.store_id, &ids).await.unwrap();

            let total: Decimal = inputs.iter().map(|b| b.quantity).sum();
            let min_stage = inputs.iter().map(|b| b.stage).min().unwrap_or(BatchStage::ToPrep);
            let max_priority = inputs.iter().map(|b| b.priority).max().unwrap_or_default();
            prop_assert_eq!(merged.quantity, total);
            prop_assert_eq!(merged.stage, min_stage);
            prop_assert_eq!(merged.priority, max_priority);

            let report = h.service.check_provenance(h.store_id, merged.id).await.unwrap();
            prop_assert_eq!(report.contribution_count, lines.len());
            prop_assert_eq!(report.contributed_quantity, Decimal::from(lines.iter().sum::<i64>()));
            prop_assert_eq!(h.store.batch_count(h.store_id), 1);
            Ok(())
        })?;
    }
}
