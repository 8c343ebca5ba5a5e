use std::sync::Arc;

use models::filter::{typed, Filter, FilterError, Where};
use models::CrudEntity;
use serde_json::Value;
use tracing::{info, instrument};

use crate::errors::ServiceError;
use crate::record::to_object;
use crate::relations::Relation;
use crate::repository::EntityRepository;

/// CRUD facade for one collection, independent of the web framework.
///
/// Validates inputs and filters, delegates to the repository, then applies
/// `fields` projection and `include` on the way out.
///
/// # Examples
/// ```
/// use std::sync::Arc;
/// use models::user::{self, NewUser};
/// use service::{repo::MemoryRepository, CrudService};
///
/// let svc = CrudService::<user::Entity>::new(Arc::new(MemoryRepository::new()));
/// let created = tokio_test::block_on(svc.create(NewUser { firstname: Some("Ann".into()), ..Default::default() })).unwrap();
/// assert_eq!(created.id, 1);
/// let found = tokio_test::block_on(svc.find_by_id(1, None)).unwrap();
/// assert_eq!(found["firstname"], "Ann");
/// ```
pub struct CrudService<E: CrudEntity> {
    repo: Arc<dyn EntityRepository<E>>,
    relations: Vec<Arc<dyn Relation>>,
}

impl<E: CrudEntity> CrudService<E> {
    pub fn new(repo: Arc<dyn EntityRepository<E>>) -> Self {
        Self { repo, relations: Vec::new() }
    }

    pub fn with_relation(mut self, relation: impl Relation + 'static) -> Self {
        self.relations.push(Arc::new(relation));
        self
    }

    pub fn relation_names(&self) -> Vec<&str> {
        self.relations.iter().map(|r| r.name()).collect()
    }

    #[instrument(skip(self, input), fields(collection = E::COLLECTION))]
    pub async fn create(&self, input: E::Input) -> Result<E::Model, ServiceError> {
        E::validate(&input)?;
        let created = self.repo.create(input).await?;
        info!(id = E::id_of(&created), "record_created");
        Ok(created)
    }

    #[instrument(skip(self), fields(collection = E::COLLECTION))]
    pub async fn count(&self, filter: Option<&Where>) -> Result<u64, ServiceError> {
        let w = filter.map(typed::normalize_where::<E>).transpose()?;
        self.repo.count(w.as_ref()).await
    }

    #[instrument(skip(self), fields(collection = E::COLLECTION))]
    pub async fn find(&self, filter: &Filter) -> Result<Vec<Value>, ServiceError> {
        let filter = self.prepare(filter)?;
        let rows = self.repo.find(&filter).await?;
        let mut out = Vec::with_capacity(rows.len());
        for row in &rows {
            out.push(self.shape(row, &filter).await?);
        }
        Ok(out)
    }

    /// The filter's `where` is ignored; `fields` and `include` apply.
    #[instrument(skip(self), fields(collection = E::COLLECTION))]
    pub async fn find_by_id(&self, id: i64, filter: Option<&Filter>) -> Result<Value, ServiceError> {
        let mut filter = filter.cloned().unwrap_or_default();
        filter.where_ = None;
        let filter = self.prepare(&filter)?;
        let row = self.repo.find_by_id(id).await?;
        self.shape(&row, &filter).await
    }

    #[instrument(skip(self, patch), fields(collection = E::COLLECTION))]
    pub async fn update_all(&self, patch: E::Patch, filter: Option<&Where>) -> Result<u64, ServiceError> {
        E::validate_patch(&patch)?;
        let w = filter.map(typed::normalize_where::<E>).transpose()?;
        let n = self.repo.update_all(patch, w.as_ref()).await?;
        info!(count = n, "records_updated");
        Ok(n)
    }

    #[instrument(skip(self, patch), fields(collection = E::COLLECTION))]
    pub async fn update_by_id(&self, id: i64, patch: E::Patch) -> Result<(), ServiceError> {
        E::validate_patch(&patch)?;
        self.repo.update_by_id(id, patch).await
    }

    #[instrument(skip(self, input), fields(collection = E::COLLECTION))]
    pub async fn replace_by_id(&self, id: i64, input: E::Input) -> Result<(), ServiceError> {
        E::validate(&input)?;
        if let Some(body_id) = E::input_id(&input).filter(|b| *b != id) {
            return Err(ServiceError::Validation(format!("body id {body_id} does not match path id {id}")));
        }
        self.repo.replace_by_id(id, input).await
    }

    #[instrument(skip(self), fields(collection = E::COLLECTION))]
    pub async fn delete_by_id(&self, id: i64) -> Result<(), ServiceError> {
        self.repo.delete_by_id(id).await?;
        info!(id, "record_deleted");
        Ok(())
    }

    fn prepare(&self, filter: &Filter) -> Result<Filter, ServiceError> {
        let filter = typed::normalize::<E>(filter)?;
        for inc in filter.inclusions() {
            if self.relation(&inc.relation).is_none() {
                return Err(FilterError::UnknownRelation(inc.relation.clone()).into());
            }
        }
        Ok(filter)
    }

    fn relation(&self, name: &str) -> Option<&Arc<dyn Relation>> {
        self.relations.iter().find(|r| r.name() == name)
    }

    /// Project `fields`, then attach included relations.
    async fn shape(&self, row: &E::Model, filter: &Filter) -> Result<Value, ServiceError> {
        let mut obj = to_object(row)?;
        if let Some(fields) = &filter.fields {
            fields.apply(&mut obj);
        }
        let id = E::id_of(row);
        for inc in filter.inclusions() {
            let Some(relation) = self.relation(&inc.relation) else { continue };
            if let Some(related) = relation.resolve(id, inc.scope.as_deref()).await? {
                obj.insert(inc.relation.clone(), related);
            }
        }
        Ok(Value::Object(obj))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::memory_services;
    use models::user::{NewUser, UserPatch};
    use serde_json::json;

    fn filter(v: Value) -> Filter {
        Filter::try_from(v).unwrap()
    }

    #[tokio::test]
    async fn create_then_find_by_id_roundtrips() {
        let s = memory_services();
        let created = s
            .users
            .create(NewUser { firstname: Some("Ann".into()), lastname: Some("Lee".into()), ..Default::default() })
            .await
            .unwrap();
        let found = s.users.find_by_id(created.id, None).await.unwrap();
        assert_eq!(found, serde_json::to_value(&created).unwrap());
    }

    #[tokio::test]
    async fn find_by_id_ignores_where_but_applies_fields() {
        let s = memory_services();
        s.users.create(NewUser { firstname: Some("Ann".into()), ..Default::default() }).await.unwrap();
        let f = filter(json!({"where": {"firstname": "Bob"}, "fields": ["firstname"]}));
        assert_eq!(s.users.find_by_id(1, Some(&f)).await.unwrap(), json!({"firstname": "Ann"}));
    }

    #[tokio::test]
    async fn include_attaches_has_one_targets() {
        let s = memory_services();
        s.users.create(NewUser { firstname: Some("Ann".into()), ..Default::default() }).await.unwrap();
        s.users.create(NewUser { firstname: Some("Bob".into()), ..Default::default() }).await.unwrap();
        s.roles
            .create(models::role::NewRole { userid: Some(1), name: Some("admin".into()), ..Default::default() })
            .await
            .unwrap();

        let rows = s.users.find(&filter(json!({"include": ["role", "customer"], "fields": ["id"]}))).await.unwrap();
        assert_eq!(rows, vec![json!({"id": 1, "role": {"id": 1, "userid": 1, "name": "admin"}}), json!({"id": 2})]);
    }

    #[tokio::test]
    async fn unknown_relation_and_fields_are_invalid_filters() {
        let s = memory_services();
        let err = s.users.find(&filter(json!({"include": "orders"}))).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidFilter(FilterError::UnknownRelation(_))));
        let err = s.auths.find(&filter(json!({"include": "role"}))).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidFilter(FilterError::UnknownRelation(_))));
        let w = Where::try_from(json!({"nickname": "x"})).unwrap();
        assert!(matches!(s.users.count(Some(&w)).await, Err(ServiceError::InvalidFilter(_))));
    }

    #[tokio::test]
    async fn count_matches_find_len() {
        let s = memory_services();
        for name in ["Ann", "Bob", "Cy"] {
            s.users.create(NewUser { firstname: Some(name.into()), ..Default::default() }).await.unwrap();
        }
        let w = Where::try_from(json!({"id": {"gte": "2"}})).unwrap();
        let n = s.users.count(Some(&w)).await.unwrap();
        let rows = s.users.find(&Filter::default().with_where(w)).await.unwrap();
        assert_eq!(n, 2);
        assert_eq!(rows.len(), 2);
    }

    #[tokio::test]
    async fn replace_rejects_mismatched_body_id() {
        let s = memory_services();
        s.users.create(NewUser::default()).await.unwrap();
        let err = s.users.replace_by_id(1, NewUser { id: Some(2), ..Default::default() }).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        s.users.replace_by_id(1, NewUser { id: Some(1), ..Default::default() }).await.unwrap();
    }

    #[tokio::test]
    async fn validation_runs_before_persistence() {
        let s = memory_services();
        let err = s.users.create(NewUser { email: Some("nope".into()), ..Default::default() }).await.unwrap_err();
        assert!(matches!(err, ServiceError::Model(_)));
        assert_eq!(s.users.count(None).await.unwrap(), 0);
        let err = s.users.update_all(UserPatch { email: Some("nope".into()), ..Default::default() }, None).await;
        assert!(matches!(err, Err(ServiceError::Model(_))));
    }

    #[tokio::test]
    async fn delete_then_find_is_not_found() {
        let s = memory_services();
        s.users.create(NewUser::default()).await.unwrap();
        s.users.delete_by_id(1).await.unwrap();
        assert!(matches!(s.users.find_by_id(1, None).await, Err(ServiceError::NotFound(_))));
    }
}
