//! Relations resolved on demand when a filter lists them under `include`.

use std::sync::Arc;

use async_trait::async_trait;
use models::filter::{typed, Filter, FilterError, Where};
use models::CrudEntity;
use serde_json::Value;

use crate::errors::ServiceError;
use crate::record::to_object;
use crate::repository::EntityRepository;

/// A named link from a source record to related data.
#[async_trait]
pub trait Relation: Send + Sync {
    fn name(&self) -> &str;

    /// Related data for the record with id `source_id`, shaped by `scope`.
    /// `None` when nothing is related.
    async fn resolve(&self, source_id: i64, scope: Option<&Filter>) -> Result<Option<Value>, ServiceError>;
}

/// At most one target record whose `key_to` column equals the source id.
pub struct HasOne<T: CrudEntity> {
    name: String,
    key_to: String,
    target: Arc<dyn EntityRepository<T>>,
}

impl<T: CrudEntity> HasOne<T> {
    /// Fails when `key_to` is not a column of `T`.
    pub fn new(
        name: impl Into<String>,
        key_to: impl Into<String>,
        target: Arc<dyn EntityRepository<T>>,
    ) -> Result<Self, FilterError> {
        let key_to = key_to.into();
        typed::column::<T>(&key_to)?;
        Ok(Self { name: name.into(), key_to, target })
    }
}

#[async_trait]
impl<T: CrudEntity> Relation for HasOne<T> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn resolve(&self, source_id: i64, scope: Option<&Filter>) -> Result<Option<Value>, ServiceError> {
        let scope = match scope {
            Some(s) => typed::normalize::<T>(s)?,
            None => Filter::default(),
        };
        if !scope.inclusions().is_empty() {
            return Err(FilterError::Malformed(format!("nested `include` under `{}` is not supported", self.name)).into());
        }
        let mut w = Where::eq(self.key_to.clone(), source_id);
        if let Some(extra) = scope.where_.clone() {
            w = w.and(extra);
        }
        let query = Filter { where_: Some(w), order: scope.order.clone(), limit: Some(1), ..Default::default() };
        let Some(found) = self.target.find(&query).await?.into_iter().next() else {
            return Ok(None);
        };
        let mut obj = to_object(&found)?;
        if let Some(fields) = &scope.fields {
            fields.apply(&mut obj);
        }
        Ok(Some(Value::Object(obj)))
    }
}
