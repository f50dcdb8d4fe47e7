//! proptest strategies for domain values.

use bakehouse_core::types::BatchStage;
use proptest::prelude::*;
use rust_decimal::Decimal;

/// Positive quantities with up to two decimal places, between 0.01 and 1000
pub fn positive_quantity() -> impl Strategy<Value = Decimal> {
    (1_i64..=100_000).prop_map(|hundredths| Decimal::new(hundredths, 2))
}

/// Any pipeline stage
pub fn batch_stage() -> impl Strategy<Value = BatchStage> {
    prop::sample::select(BatchStage::ALL.to_vec())
}

/// Batch priorities in a realistic band
pub fn priority() -> impl Strategy<Value = i32> {
    -5_i32..=10
}
