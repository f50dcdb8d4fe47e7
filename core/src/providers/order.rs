//! Order source trait.

use crate::error::OrderSourceError;
use crate::types::{DateRange, Order, StoreId};
use std::future::Future;
use std::pin::Pin;

/// Read access to customer orders.
pub trait OrderSource: Send + Sync {
    /// Fetch every order of a store whose due date falls inside `range`,
    /// regardless of status.
    ///
    /// # Errors
    ///
    /// Returns [`OrderSourceError::Unavailable`] if the source could not answer.
    fn find_orders_by_date_range(
        &self,
        store_id: StoreId,
        range: DateRange,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Order>, OrderSourceError>> + Send + '_>>;
}
