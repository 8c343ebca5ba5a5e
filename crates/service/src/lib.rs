//! Service layer exposing generic CRUD operations on top of models.
//! - `repository`: the persistence contract, with sea-orm and in-memory backends.
//! - `relations`: has-one lookups resolved on `include`.
//! - `crud`: the facade handlers call; validation, projection and inclusion.
//! - `registry`: wires the four collections for a chosen backend.

pub mod errors;
pub mod record;
pub mod repository;
pub mod repo;
pub mod relations;
pub mod crud;
pub mod registry;
#[cfg(test)]
pub mod test_support;

pub use crud::CrudService;
pub use errors::ServiceError;
pub use registry::Services;
pub use repository::EntityRepository;
