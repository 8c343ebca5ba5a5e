//! The four collections wired together for one storage backend.

use std::{path::Path, sync::Arc};

use models::{auth, customer, role, user, CrudEntity};
use sea_orm::DatabaseConnection;
use tracing::info;

use crate::crud::CrudService;
use crate::errors::ServiceError;
use crate::relations::HasOne;
use crate::repo::{MemoryRepository, SeaOrmRepository};
use crate::repository::EntityRepository;

#[derive(Clone)]
pub struct Services {
    pub users: Arc<CrudService<user::Entity>>,
    pub auths: Arc<CrudService<auth::Entity>>,
    pub roles: Arc<CrudService<role::Entity>>,
    pub customers: Arc<CrudService<customer::Entity>>,
}

impl Services {
    /// Wire services over the given repositories; `users` gets its
    /// `role` and `customer` has-one relations.
    pub fn from_repos(
        users: Arc<dyn EntityRepository<user::Entity>>,
        auths: Arc<dyn EntityRepository<auth::Entity>>,
        roles: Arc<dyn EntityRepository<role::Entity>>,
        customers: Arc<dyn EntityRepository<customer::Entity>>,
    ) -> Result<Self, ServiceError> {
        let user_svc = CrudService::new(users)
            .with_relation(HasOne::new("role", "userid", roles.clone())?)
            .with_relation(HasOne::new("customer", "userid", customers.clone())?);
        Ok(Self {
            users: Arc::new(user_svc),
            auths: Arc::new(CrudService::new(auths)),
            roles: Arc::new(CrudService::new(roles)),
            customers: Arc::new(CrudService::new(customers)),
        })
    }

    pub fn seaorm(db: DatabaseConnection) -> Result<Self, ServiceError> {
        Self::from_repos(
            Arc::new(SeaOrmRepository::new(db.clone())),
            Arc::new(SeaOrmRepository::new(db.clone())),
            Arc::new(SeaOrmRepository::new(db.clone())),
            Arc::new(SeaOrmRepository::new(db)),
        )
    }

    /// Volatile in-process storage.
    pub fn memory() -> Result<Self, ServiceError> {
        Self::from_repos(
            Arc::new(MemoryRepository::new()),
            Arc::new(MemoryRepository::new()),
            Arc::new(MemoryRepository::new()),
            Arc::new(MemoryRepository::new()),
        )
    }

    /// In-process storage persisted as `<dir>/<collection>.json`.
    pub async fn file(dir: &Path) -> Result<Self, ServiceError> {
        let users = open::<user::Entity>(dir).await?;
        let auths = open::<auth::Entity>(dir).await?;
        let roles = open::<role::Entity>(dir).await?;
        let customers = open::<customer::Entity>(dir).await?;
        info!(dir = %dir.display(), "file storage ready");
        Self::from_repos(users, auths, roles, customers)
    }
}

async fn open<E: CrudEntity>(dir: &Path) -> Result<Arc<dyn EntityRepository<E>>, ServiceError> {
    let repo = MemoryRepository::<E>::open(dir.join(format!("{}.json", E::COLLECTION))).await?;
    Ok(Arc::new(repo))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn users_expose_role_and_customer() {
        let s = Services::memory().unwrap();
        assert_eq!(s.users.relation_names(), vec!["role", "customer"]);
        assert!(s.auths.relation_names().is_empty());
    }

    #[tokio::test]
    async fn file_backend_writes_one_file_per_collection() -> Result<(), anyhow::Error> {
        let dir = std::env::temp_dir().join(format!("services_{}", uuid::Uuid::new_v4()));
        let s = Services::file(&dir).await?;
        s.auths.create(auth::NewAuth { username: Some("ann".into()), ..Default::default() }).await?;
        for name in ["users", "auths", "roles", "customers"] {
            assert!(dir.join(format!("{name}.json")).exists(), "{name}.json missing");
        }
        let reopened = Services::file(&dir).await?;
        assert_eq!(reopened.auths.count(None).await?, 1);
        let _ = tokio::fs::remove_dir_all(&dir).await;
        Ok(())
    }
}
