//! Row decoding and column lists.

use bakehouse_core::error::StoreError;
use bakehouse_core::types::{
    Batch, BatchId, BatchSource, BatchStage, ContributionId, IngredientId, OperatorId,
    OrderContribution, OrderId, PrepItem, PrepItemId, RecipeId, StoreId, Version,
};
use sqlx::Row;
use sqlx::postgres::PgRow;
use uuid::Uuid;

pub(crate) const BATCH_COLUMNS: &str = "id, store_id, recipe_id, recipe_name, quantity, stage, \
     production_date, priority, assigned_to, source, notes, version, created_at, updated_at";

pub(crate) const CONTRIBUTION_COLUMNS: &str =
    "id, batch_id, order_id, order_item_index, quantity_from_order";

pub(crate) const PREP_ITEM_COLUMNS: &str =
    "id, batch_id, ingredient_id, ingredient_name, required_quantity, unit, is_prepped";

pub(crate) fn db(e: sqlx::Error) -> StoreError {
    StoreError::Database(e.to_string())
}

pub(crate) fn version_to_db(version: Version) -> Result<i64, StoreError> {
    i64::try_from(version.value())
        .map_err(|_| StoreError::Serialization(format!("Version {version} exceeds BIGINT")))
}

pub(crate) fn version_from_db(value: i64) -> Result<Version, StoreError> {
    u64::try_from(value)
        .map(Version::new)
        .map_err(|_| StoreError::Serialization(format!("Invalid stored version: {value}")))
}

pub(crate) fn batch_from_row(row: &PgRow) -> Result<Batch, StoreError> {
    let stage: String = row.try_get("stage").map_err(db)?;
    let source: String = row.try_get("source").map_err(db)?;

    Ok(Batch {
        id: BatchId::from_uuid(row.try_get("id").map_err(db)?),
        store_id: StoreId::from_uuid(row.try_get("store_id").map_err(db)?),
        recipe_id: RecipeId::from_uuid(row.try_get("recipe_id").map_err(db)?),
        recipe_name: row.try_get("recipe_name").map_err(db)?,
        quantity: row.try_get("quantity").map_err(db)?,
        stage: stage
            .parse::<BatchStage>()
            .map_err(|e| StoreError::Serialization(e.to_string()))?,
        production_date: row.try_get("production_date").map_err(db)?,
        priority: row.try_get("priority").map_err(db)?,
        assigned_to: row
            .try_get::<Option<Uuid>, _>("assigned_to")
            .map_err(db)?
            .map(OperatorId::from_uuid),
        source: source
            .parse::<BatchSource>()
            .map_err(StoreError::Serialization)?,
        notes: row.try_get("notes").map_err(db)?,
        version: version_from_db(row.try_get("version").map_err(db)?)?,
        created_at: row.try_get("created_at").map_err(db)?,
        updated_at: row.try_get("updated_at").map_err(db)?,
    })
}

pub(crate) fn contribution_from_row(row: &PgRow) -> Result<OrderContribution, StoreError> {
    let index: i32 = row.try_get("order_item_index").map_err(db)?;
    Ok(OrderContribution {
        id: ContributionId::from_uuid(row.try_get("id").map_err(db)?),
        batch_id: BatchId::from_uuid(row.try_get("batch_id").map_err(db)?),
        order_id: OrderId::from_uuid(row.try_get("order_id").map_err(db)?),
        order_item_index: u32::try_from(index).map_err(|_| {
            StoreError::Serialization(format!("Invalid order item index: {index}"))
        })?,
        quantity_from_order: row.try_get("quantity_from_order").map_err(db)?,
    })
}

pub(crate) fn prep_item_from_row(row: &PgRow) -> Result<PrepItem, StoreError> {
    Ok(PrepItem {
        id: PrepItemId::from_uuid(row.try_get("id").map_err(db)?),
        batch_id: BatchId::from_uuid(row.try_get("batch_id").map_err(db)?),
        ingredient_id: IngredientId::from_uuid(row.try_get("ingredient_id").map_err(db)?),
        ingredient_name: row.try_get("ingredient_name").map_err(db)?,
        required_quantity: row.try_get("required_quantity").map_err(db)?,
        unit: row.try_get("unit").map_err(db)?,
        is_prepped: row.try_get("is_prepped").map_err(db)?,
    })
}

pub(crate) fn decode_all<T>(
    rows: &[PgRow],
    decode: fn(&PgRow) -> Result<T, StoreError>,
) -> Result<Vec<T>, StoreError> {
    rows.iter().map(decode).collect()
}
