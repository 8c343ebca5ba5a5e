pub mod errors;
pub mod db;
pub mod filter;
pub mod crud;
pub mod user;
pub mod role;
pub mod customer;
pub mod auth;

pub use crud::CrudEntity;

#[cfg(test)]
mod tests;
