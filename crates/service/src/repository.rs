use async_trait::async_trait;
use models::filter::{Filter, Where};
use models::CrudEntity;

use crate::errors::ServiceError;

/// Persistence contract for one collection keyed by a numeric `id`.
///
/// Filters passed in are expected to be normalized against `E`
/// (see `models::filter::typed::normalize`).
#[async_trait]
pub trait EntityRepository<E: CrudEntity>: Send + Sync {
    /// Store a new record; the id is assigned when the input has none.
    async fn create(&self, input: E::Input) -> Result<E::Model, ServiceError>;

    async fn count(&self, filter: Option<&Where>) -> Result<u64, ServiceError>;

    /// Matching records honoring `where`, `order`, `limit` and `skip`.
    /// `fields` and `include` are ignored here.
    async fn find(&self, filter: &Filter) -> Result<Vec<E::Model>, ServiceError>;

    async fn find_by_id(&self, id: i64) -> Result<E::Model, ServiceError>;

    /// Merge `patch` into every matching record; returns how many matched.
    async fn update_all(&self, patch: E::Patch, filter: Option<&Where>) -> Result<u64, ServiceError>;

    async fn update_by_id(&self, id: i64, patch: E::Patch) -> Result<(), ServiceError>;

    /// Overwrite every non-id field; fields missing from `input` become null.
    async fn replace_by_id(&self, id: i64, input: E::Input) -> Result<(), ServiceError>;

    async fn delete_by_id(&self, id: i64) -> Result<(), ServiceError>;
}
