use std::marker::PhantomData;

use async_trait::async_trait;
use models::filter::{sql, Filter, Where};
use models::CrudEntity;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DbBackend, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, Statement,
};
use tracing::debug;

use crate::errors::ServiceError;
use crate::repository::EntityRepository;

/// PostgreSQL-backed repository.
pub struct SeaOrmRepository<E> {
    db: DatabaseConnection,
    _entity: PhantomData<fn() -> E>,
}

impl<E> SeaOrmRepository<E> {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db, _entity: PhantomData }
    }
}

fn condition<E: CrudEntity>(filter: Option<&Where>) -> Result<Condition, ServiceError> {
    match filter {
        Some(w) => Ok(sql::condition::<E>(w)?),
        None => Ok(Condition::all()),
    }
}

impl<E: CrudEntity> SeaOrmRepository<E> {
    /// Move the id sequence past explicitly inserted ids.
    async fn sync_id_sequence(&self) -> Result<(), ServiceError> {
        let table = E::COLLECTION;
        let sql = format!(
            "SELECT setval(pg_get_serial_sequence('{table}', 'id'), GREATEST((SELECT MAX(id) FROM \"{table}\"), 1))"
        );
        self.db.execute(Statement::from_string(DbBackend::Postgres, sql)).await?;
        Ok(())
    }

    async fn exists(&self, id: i64) -> Result<bool, ServiceError> {
        let n = E::find().filter(E::id_column().eq(id)).count(&self.db).await?;
        Ok(n > 0)
    }
}

#[async_trait]
impl<E> EntityRepository<E> for SeaOrmRepository<E>
where
    E: CrudEntity,
    E::Model: IntoActiveModel<E::Active>,
{
    async fn create(&self, input: E::Input) -> Result<E::Model, ServiceError> {
        let explicit_id = E::input_id(&input).is_some();
        let model = E::active_from_input(input).insert(&self.db).await?;
        if explicit_id {
            self.sync_id_sequence().await?;
        }
        debug!(collection = E::COLLECTION, id = E::id_of(&model), "row inserted");
        Ok(model)
    }

    async fn count(&self, filter: Option<&Where>) -> Result<u64, ServiceError> {
        let n = E::find().filter(condition::<E>(filter)?).count(&self.db).await?;
        Ok(n)
    }

    async fn find(&self, filter: &Filter) -> Result<Vec<E::Model>, ServiceError> {
        let rows = sql::apply::<E>(E::find(), filter, E::id_column())?.all(&self.db).await?;
        Ok(rows)
    }

    async fn find_by_id(&self, id: i64) -> Result<E::Model, ServiceError> {
        E::find()
            .filter(E::id_column().eq(id))
            .one(&self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found(E::COLLECTION, id))
    }

    async fn update_all(&self, patch: E::Patch, filter: Option<&Where>) -> Result<u64, ServiceError> {
        let cond = condition::<E>(filter)?;
        let am = E::active_from_patch(patch);
        if !am.is_changed() {
            return Ok(E::find().filter(cond).count(&self.db).await?);
        }
        let res = E::update_many().set(am).filter(cond).exec(&self.db).await?;
        debug!(collection = E::COLLECTION, rows = res.rows_affected, "rows updated");
        Ok(res.rows_affected)
    }

    async fn update_by_id(&self, id: i64, patch: E::Patch) -> Result<(), ServiceError> {
        let am = E::active_from_patch(patch);
        if !am.is_changed() {
            return match self.exists(id).await? {
                true => Ok(()),
                false => Err(ServiceError::not_found(E::COLLECTION, id)),
            };
        }
        let res = E::update_many().set(am).filter(E::id_column().eq(id)).exec(&self.db).await?;
        if res.rows_affected == 0 {
            return Err(ServiceError::not_found(E::COLLECTION, id));
        }
        Ok(())
    }

    async fn replace_by_id(&self, id: i64, input: E::Input) -> Result<(), ServiceError> {
        let mut am = E::active_from_input(input);
        am.not_set(E::id_column());
        let res = E::update_many().set(am).filter(E::id_column().eq(id)).exec(&self.db).await?;
        if res.rows_affected == 0 {
            return Err(ServiceError::not_found(E::COLLECTION, id));
        }
        Ok(())
    }

    async fn delete_by_id(&self, id: i64) -> Result<(), ServiceError> {
        let res = E::delete_many().filter(E::id_column().eq(id)).exec(&self.db).await?;
        if res.rows_affected == 0 {
            return Err(ServiceError::not_found(E::COLLECTION, id));
        }
        debug!(collection = E::COLLECTION, id, "row deleted");
        Ok(())
    }
}
