//! What a collection needs to expose to be served over the CRUD routes.

use std::fmt::Debug;

use sea_orm::{ActiveModelBehavior, ActiveModelTrait, ActiveValue, EntityTrait, Value as DbValue};
use serde::{de::DeserializeOwned, Serialize};

use crate::errors::ModelError;

/// An entity with a numeric `id` plus the request shapes used to write it.
///
/// `Input` is the create/replace body: every field optional, `id` included.
/// `Patch` is the partial update body: every field optional, no `id`.
pub trait CrudEntity: EntityTrait<Model: Serialize + DeserializeOwned + Send + Sync> + 'static {
    /// Path segment and table name.
    const COLLECTION: &'static str;

    type Active: ActiveModelTrait<Entity = Self> + ActiveModelBehavior + Send + Sync + 'static;
    type Input: Serialize + DeserializeOwned + Clone + Debug + Send + Sync + 'static;
    type Patch: Serialize + DeserializeOwned + Clone + Debug + Default + Send + Sync + 'static;

    fn id_column() -> Self::Column;
    fn id_of(model: &Self::Model) -> i64;
    fn input_id(input: &Self::Input) -> Option<i64>;

    /// Every non-id column set; `id` set only when the input carries one.
    fn active_from_input(input: Self::Input) -> Self::Active;
    /// Only the columns present in the patch are set.
    fn active_from_patch(patch: Self::Patch) -> Self::Active;

    fn validate(input: &Self::Input) -> Result<(), ModelError> {
        match Self::input_id(input) {
            Some(id) if id <= 0 => Err(ModelError::Validation(format!("id must be positive, got {id}"))),
            _ => Ok(()),
        }
    }

    fn validate_patch(_patch: &Self::Patch) -> Result<(), ModelError> {
        Ok(())
    }
}

/// `Set(Some(v))` for present values, `NotSet` otherwise.
pub fn set_if_present<T>(v: Option<T>) -> ActiveValue<Option<T>>
where
    T: Into<DbValue>,
    Option<T>: Into<DbValue>,
{
    match v {
        Some(v) => ActiveValue::Set(Some(v)),
        None => ActiveValue::NotSet,
    }
}

/// `Set(id)` when given, `NotSet` so the database assigns one otherwise.
pub fn id_if_present(id: Option<i64>) -> ActiveValue<i64> {
    id.map_or(ActiveValue::NotSet, ActiveValue::Set)
}

pub(crate) fn check_email(field: &str, email: Option<&str>) -> Result<(), ModelError> {
    match email {
        Some(e) if !e.contains('@') => Err(ModelError::Validation(format!("{field}: invalid email `{e}`"))),
        _ => Ok(()),
    }
}
