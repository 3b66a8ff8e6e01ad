//! Permtree - Hierarchical permission structures with power-level analysis
//!
//! A structure is a module → menu → card tree where every node may declare
//! grantable actions. Selections record which actions a role holds; the
//! engine aggregates them into tri-state views, rates their power, flags
//! conflicts and applies cascading toggles. Roles persist in LMDB.

pub mod audit;
pub mod config;
pub mod conflict;
pub mod constants;
pub mod error;
pub mod index;
pub mod legacy;
pub mod mutator;
pub mod power;
pub mod role;
pub mod selection;
pub mod snapshot;
pub mod structure;
pub mod tristate;

mod db;
mod read;
mod tx;
mod write;

// Re-exports
pub use audit::{system_power_analysis, RolePower, SystemPowerAnalysis};
pub use config::{EngineConfig, PowerBand, PowerBands, ViewMatcher};
pub use conflict::{Conflict, ConflictReport, Severity};
pub use error::{Error, ReferenceIssue, Result, UnresolvedReference};
pub use index::{composite_id, PermissionIndex, PermissionInfo};
pub use legacy::{Normalized, Selection};
pub use mutator::Command;
pub use power::{ChildCheck, ChildValidation, PermissionSummary, PowerAnalysis, PowerDistribution};
pub use role::{Role, StoredRole};
pub use selection::{PermissionItem, SelectionDiff, SelectionState};
pub use snapshot::{Catalog, JsonFileLoader, Snapshot, StaticLoader, StructureLoader};
pub use structure::{AllowedAction, NodeKind, RoleTemplate, StructureDocument, StructureMetadata, StructureNode, StructureTree};
pub use tristate::{FlatNode, SelectionStatus};

// Role store
pub use db::{clear_all, init, test_lock};
pub use read::{count_roles, get_meta, get_stored_role, list_role_ids, load_role, load_roles, LoadedRole};
pub use tx::{transact, Tx};
pub use write::{delete_role, delete_roles, save_role, save_roles};
