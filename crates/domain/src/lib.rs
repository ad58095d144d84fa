//! Role hierarchy entities and authorization rules.
//!
//! Everything in this crate is pure: it works on rows that were already
//! loaded and never performs I/O.

#![forbid(unsafe_code)]

mod catalog;
mod rank;
mod role;
mod role_change;
mod security;
mod tree;
mod visibility;

pub use catalog::RoleCatalog;
pub use rank::{ActorRelation, RankEngine, RoleHoldings};
pub use role::{
    MachineName, NO_ROLE_SELECTION, Role, RoleCategory, RoleCategoryId, RoleId, RoleRank,
    RoleSelection,
};
pub use role_change::{
    RoleChangeDecision, RoleChangePlan, RoleChangePlanner, RoleChangeRecord, RoleChangeRejection,
    RoleChangeRequest, RoleChangeState,
};
pub use security::AuditAction;
pub use tree::{CategoryTree, TreeNode};
pub use visibility::{VisibilityTreeBuilder, VisibleCategory, VisibleRole};
