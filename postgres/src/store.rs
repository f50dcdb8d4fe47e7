//! `PostgreSQL`-backed [`BatchStore`].

use crate::rows::{
    BATCH_COLUMNS, CONTRIBUTION_COLUMNS, PREP_ITEM_COLUMNS, batch_from_row, contribution_from_row,
    db, decode_all, prep_item_from_row, version_from_db, version_to_db,
};
use bakehouse_core::changeset::{ChangeSet, Mutation};
use bakehouse_core::error::StoreError;
use bakehouse_core::providers::BatchStore;
use bakehouse_core::types::{
    Batch, BatchId, DateRange, OrderContribution, PrepItem, PrepItemId, StoreId, Version,
};
use chrono::NaiveDate;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgConnection, PgPool, Row};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Batch store over a `PostgreSQL` connection pool.
///
/// Clones share the pool.
#[derive(Clone, Debug)]
pub struct PostgresBatchStore {
    pool: PgPool,
}

impl PostgresBatchStore {
    /// Connect a pool of at most `max_connections` connections.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the database cannot be reached
    /// within `connect_timeout`.
    pub async fn connect(
        url: &str,
        max_connections: u32,
        connect_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(connect_timeout)
            .connect(url)
            .await
            .map_err(db)?;
        tracing::info!(max_connections, "Connected to PostgreSQL");
        Ok(Self::from_pool(pool))
    }

    /// Use an existing pool
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply pending schema migrations.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Database(format!("Migration failed: {e}")))
    }

    async fn fetch_batches(
        &self,
        store_id: StoreId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Batch>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {BATCH_COLUMNS} FROM production_batches \
             WHERE store_id = $1 AND production_date BETWEEN $2 AND $3 \
             ORDER BY production_date, created_at, id"
        ))
        .bind(*store_id.as_uuid())
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(db)?;
        decode_all(&rows, batch_from_row)
    }

    async fn apply_all(&self, store_id: StoreId, changes: ChangeSet) -> Result<usize, StoreError> {
        let mut tx = self.pool.begin().await.map_err(db)?;
        let mut applied = 0;
        for mutation in changes.into_mutations() {
            let kind = mutation.kind();
            if let Err(error) = apply(&mut tx, store_id, mutation).await {
                tracing::debug!(mutation = kind, %error, "Mutation rejected, rolling back");
                return Err(error);
            }
            applied += 1;
        }
        tx.commit().await.map_err(db)?;
        Ok(applied)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Mutations
// ═══════════════════════════════════════════════════════════════════════

async fn apply(
    conn: &mut PgConnection,
    store_id: StoreId,
    mutation: Mutation,
) -> Result<(), StoreError> {
    match mutation {
        Mutation::InsertBatch(batch) => insert_batch(conn, store_id, &batch).await,
        Mutation::UpdateBatch {
            batch,
            expected_version,
        } => update_batch(conn, store_id, &batch, expected_version).await,
        Mutation::DeleteBatch {
            batch_id,
            expected_version,
        } => delete_batch(conn, store_id, batch_id, expected_version).await,
        Mutation::InsertContribution(contribution) => {
            insert_contribution(conn, store_id, &contribution).await
        }
        Mutation::ReparentContributions { from, to } => {
            require_batch(conn, store_id, to).await?;
            sqlx::query(
                "UPDATE order_contributions SET batch_id = $3 \
                 WHERE store_id = $1 AND batch_id = $2",
            )
            .bind(*store_id.as_uuid())
            .bind(*from.as_uuid())
            .bind(*to.as_uuid())
            .execute(&mut *conn)
            .await
            .map_err(db)?;
            Ok(())
        }
        Mutation::InsertPrepItem(item) => {
            require_batch(conn, store_id, item.batch_id).await?;
            insert_prep_item(conn, store_id, &item).await
        }
        Mutation::ReplacePrepItems { batch_id, items } => {
            require_batch(conn, store_id, batch_id).await?;
            sqlx::query("DELETE FROM prep_items WHERE store_id = $1 AND batch_id = $2")
                .bind(*store_id.as_uuid())
                .bind(*batch_id.as_uuid())
                .execute(&mut *conn)
                .await
                .map_err(db)?;
            for item in &items {
                insert_prep_item(conn, store_id, item).await?;
            }
            Ok(())
        }
    }
}

async fn insert_batch(
    conn: &mut PgConnection,
    store_id: StoreId,
    batch: &Batch,
) -> Result<(), StoreError> {
    let result = sqlx::query(
        "INSERT INTO production_batches (id, store_id, recipe_id, recipe_name, quantity, stage, \
         production_date, priority, assigned_to, source, notes, version, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
         ON CONFLICT (id) DO NOTHING",
    )
    .bind(*batch.id.as_uuid())
    .bind(*store_id.as_uuid())
    .bind(*batch.recipe_id.as_uuid())
    .bind(&batch.recipe_name)
    .bind(batch.quantity)
    .bind(batch.stage.as_str())
    .bind(batch.production_date)
    .bind(batch.priority)
    .bind(batch.assigned_to.map(|operator| *operator.as_uuid()))
    .bind(batch.source.as_str())
    .bind(&batch.notes)
    .bind(version_to_db(batch.version)?)
    .bind(batch.created_at)
    .bind(batch.updated_at)
    .execute(&mut *conn)
    .await
    .map_err(db)?;

    if result.rows_affected() == 0 {
        return Err(StoreError::Duplicate {
            entity: "batch",
            id: batch.id.to_string(),
        });
    }
    Ok(())
}

async fn update_batch(
    conn: &mut PgConnection,
    store_id: StoreId,
    batch: &Batch,
    expected: Version,
) -> Result<(), StoreError> {
    let result = sqlx::query(
        "UPDATE production_batches SET recipe_name = $4, quantity = $5, stage = $6, \
         production_date = $7, priority = $8, assigned_to = $9, notes = $10, version = $11, \
         updated_at = $12 \
         WHERE id = $1 AND store_id = $2 AND version = $3",
    )
    .bind(*batch.id.as_uuid())
    .bind(*store_id.as_uuid())
    .bind(version_to_db(expected)?)
    .bind(&batch.recipe_name)
    .bind(batch.quantity)
    .bind(batch.stage.as_str())
    .bind(batch.production_date)
    .bind(batch.priority)
    .bind(batch.assigned_to.map(|operator| *operator.as_uuid()))
    .bind(&batch.notes)
    .bind(version_to_db(batch.version)?)
    .bind(batch.updated_at)
    .execute(&mut *conn)
    .await
    .map_err(db)?;

    if result.rows_affected() == 0 {
        return Err(guard_failure(conn, store_id, batch.id, expected).await);
    }
    Ok(())
}

async fn delete_batch(
    conn: &mut PgConnection,
    store_id: StoreId,
    batch_id: BatchId,
    expected: Version,
) -> Result<(), StoreError> {
    // Children first; the FK cascade only backs this up. A failed guard below
    // rolls these deletes back with the rest of the transaction.
    for table in ["order_contributions", "prep_items"] {
        sqlx::query(&format!(
            "DELETE FROM {table} WHERE batch_id = $1 AND store_id = $2"
        ))
        .bind(*batch_id.as_uuid())
        .bind(*store_id.as_uuid())
        .execute(&mut *conn)
        .await
        .map_err(db)?;
    }

    let result = sqlx::query(
        "DELETE FROM production_batches WHERE id = $1 AND store_id = $2 AND version = $3",
    )
    .bind(*batch_id.as_uuid())
    .bind(*store_id.as_uuid())
    .bind(version_to_db(expected)?)
    .execute(&mut *conn)
    .await
    .map_err(db)?;

    if result.rows_affected() == 0 {
        return Err(guard_failure(conn, store_id, batch_id, expected).await);
    }
    Ok(())
}

/// Explain why a version-guarded statement matched no row.
async fn guard_failure(
    conn: &mut PgConnection,
    store_id: StoreId,
    batch_id: BatchId,
    expected: Version,
) -> StoreError {
    let current = sqlx::query(
        "SELECT version FROM production_batches WHERE id = $1 AND store_id = $2",
    )
    .bind(*batch_id.as_uuid())
    .bind(*store_id.as_uuid())
    .fetch_optional(&mut *conn)
    .await;

    match current {
        Ok(Some(row)) => match row.try_get::<i64, _>("version").map_err(db) {
            Ok(value) => match version_from_db(value) {
                Ok(actual) => {
                    metrics::counter!("bakehouse.store.version_conflicts").increment(1);
                    StoreError::VersionConflict {
                        batch_id,
                        expected,
                        actual,
                    }
                }
                Err(error) => error,
            },
            Err(error) => error,
        },
        Ok(None) => StoreError::batch_not_found(batch_id),
        Err(error) => db(error),
    }
}

async fn require_batch(
    conn: &mut PgConnection,
    store_id: StoreId,
    batch_id: BatchId,
) -> Result<(), StoreError> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM production_batches WHERE id = $1 AND store_id = $2)",
    )
    .bind(*batch_id.as_uuid())
    .bind(*store_id.as_uuid())
    .fetch_one(&mut *conn)
    .await
    .map_err(db)?;

    if exists {
        Ok(())
    } else {
        Err(StoreError::batch_not_found(batch_id))
    }
}

async fn insert_contribution(
    conn: &mut PgConnection,
    store_id: StoreId,
    contribution: &OrderContribution,
) -> Result<(), StoreError> {
    require_batch(conn, store_id, contribution.batch_id).await?;
    let index = i32::try_from(contribution.order_item_index).map_err(|_| {
        StoreError::Serialization(format!(
            "Order item index {} exceeds INTEGER",
            contribution.order_item_index
        ))
    })?;

    let result = sqlx::query(
        "INSERT INTO order_contributions \
         (id, store_id, batch_id, order_id, order_item_index, quantity_from_order) \
         VALUES ($1, $2, $3, $4, $5, $6) ON CONFLICT (id) DO NOTHING",
    )
    .bind(*contribution.id.as_uuid())
    .bind(*store_id.as_uuid())
    .bind(*contribution.batch_id.as_uuid())
    .bind(*contribution.order_id.as_uuid())
    .bind(index)
    .bind(contribution.quantity_from_order)
    .execute(&mut *conn)
    .await
    .map_err(db)?;

    if result.rows_affected() == 0 {
        return Err(StoreError::Duplicate {
            entity: "order contribution",
            id: contribution.id.to_string(),
        });
    }
    Ok(())
}

async fn insert_prep_item(
    conn: &mut PgConnection,
    store_id: StoreId,
    item: &PrepItem,
) -> Result<(), StoreError> {
    let result = sqlx::query(
        "INSERT INTO prep_items (id, store_id, batch_id, ingredient_id, ingredient_name, \
         required_quantity, unit, is_prepped) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) ON CONFLICT (id) DO NOTHING",
    )
    .bind(*item.id.as_uuid())
    .bind(*store_id.as_uuid())
    .bind(*item.batch_id.as_uuid())
    .bind(*item.ingredient_id.as_uuid())
    .bind(&item.ingredient_name)
    .bind(item.required_quantity)
    .bind(&item.unit)
    .bind(item.is_prepped)
    .execute(&mut *conn)
    .await
    .map_err(db)?;

    if result.rows_affected() == 0 {
        return Err(StoreError::Duplicate {
            entity: "prep item",
            id: item.id.to_string(),
        });
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════
// BatchStore
// ═══════════════════════════════════════════════════════════════════════

impl BatchStore for PostgresBatchStore {
    fn find_batch(
        &self,
        store_id: StoreId,
        batch_id: BatchId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Batch>, StoreError>> + Send + '_>> {
        Box::pin(async move {
            let row = sqlx::query(&format!(
                "SELECT {BATCH_COLUMNS} FROM production_batches WHERE id = $1 AND store_id = $2"
            ))
            .bind(*batch_id.as_uuid())
            .bind(*store_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db)?;
            row.as_ref().map(batch_from_row).transpose()
        })
    }

    fn find_batches_by_date(
        &self,
        store_id: StoreId,
        date: NaiveDate,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Batch>, StoreError>> + Send + '_>> {
        Box::pin(async move { self.fetch_batches(store_id, date, date).await })
    }

    fn find_batches_in_range(
        &self,
        store_id: StoreId,
        range: DateRange,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Batch>, StoreError>> + Send + '_>> {
        Box::pin(async move {
            self.fetch_batches(store_id, range.start(), range.end())
                .await
        })
    }

    fn order_contributions(
        &self,
        store_id: StoreId,
        batch_id: BatchId,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<OrderContribution>, StoreError>> + Send + '_>>
    {
        Box::pin(async move {
            let rows = sqlx::query(&format!(
                "SELECT {CONTRIBUTION_COLUMNS} FROM order_contributions \
                 WHERE store_id = $1 AND batch_id = $2 ORDER BY seq"
            ))
            .bind(*store_id.as_uuid())
            .bind(*batch_id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(db)?;
            decode_all(&rows, contribution_from_row)
        })
    }

    fn prep_items(
        &self,
        store_id: StoreId,
        batch_id: BatchId,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<PrepItem>, StoreError>> + Send + '_>> {
        Box::pin(async move {
            let rows = sqlx::query(&format!(
                "SELECT {PREP_ITEM_COLUMNS} FROM prep_items \
                 WHERE store_id = $1 AND batch_id = $2 ORDER BY seq"
            ))
            .bind(*store_id.as_uuid())
            .bind(*batch_id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(db)?;
            decode_all(&rows, prep_item_from_row)
        })
    }

    fn prep_items_by_date(
        &self,
        store_id: StoreId,
        date: NaiveDate,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<PrepItem>, StoreError>> + Send + '_>> {
        Box::pin(async move {
            let rows = sqlx::query(
                "SELECT p.id, p.batch_id, p.ingredient_id, p.ingredient_name, \
                 p.required_quantity, p.unit, p.is_prepped \
                 FROM prep_items p \
                 JOIN production_batches b ON b.id = p.batch_id AND b.store_id = p.store_id \
                 WHERE p.store_id = $1 AND b.production_date = $2 \
                 ORDER BY p.seq",
            )
            .bind(*store_id.as_uuid())
            .bind(date)
            .fetch_all(&self.pool)
            .await
            .map_err(db)?;
            decode_all(&rows, prep_item_from_row)
        })
    }

    fn set_prep_item_prepped(
        &self,
        store_id: StoreId,
        prep_item_id: PrepItemId,
        is_prepped: bool,
    ) -> Pin<Box<dyn Future<Output = Result<Option<PrepItem>, StoreError>> + Send + '_>> {
        Box::pin(async move {
            let row = sqlx::query(&format!(
                "UPDATE prep_items SET is_prepped = $3 WHERE id = $1 AND store_id = $2 \
                 RETURNING {PREP_ITEM_COLUMNS}"
            ))
            .bind(*prep_item_id.as_uuid())
            .bind(*store_id.as_uuid())
            .bind(is_prepped)
            .fetch_optional(&self.pool)
            .await
            .map_err(db)?;
            row.as_ref().map(prep_item_from_row).transpose()
        })
    }

    fn commit(
        &self,
        store_id: StoreId,
        changes: ChangeSet,
    ) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + '_>> {
        Box::pin(async move {
            if changes.is_empty() {
                return Ok(());
            }
            match self.apply_all(store_id, changes).await {
                Ok(mutations) => {
                    metrics::counter!("bakehouse.store.commits", "outcome" => "committed")
                        .increment(1);
                    tracing::debug!(%store_id, mutations, "Change set committed");
                    Ok(())
                }
                Err(error) => {
                    metrics::counter!("bakehouse.store.commits", "outcome" => "rolled_back")
                        .increment(1);
                    tracing::warn!(%store_id, %error, "Change set rolled back");
                    Err(error)
                }
            }
        })
    }
}
