//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod in_memory_role_repository;
mod postgres_audit_repository;
mod postgres_role_catalog_repository;
mod postgres_role_membership_repository;
mod postgres_user_repository;

pub use in_memory_role_repository::{InMemoryAuditRepository, InMemoryRoleRepository};
pub use postgres_audit_repository::PostgresAuditRepository;
pub use postgres_role_catalog_repository::PostgresRoleCatalogRepository;
pub use postgres_role_membership_repository::PostgresRoleMembershipRepository;
pub use postgres_user_repository::PostgresUserRepository;
