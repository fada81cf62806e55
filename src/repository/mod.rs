// Repository 抽象层（JSON 文件存储）
pub mod address_repository;
pub mod blacklist_repository;
pub mod role_repository;

pub use address_repository::{AddressRepository, InsertOutcome, JsonAddressRepository};
pub use blacklist_repository::{BlacklistEntries, JsonBlacklistRepository};
pub use role_repository::{AssignOutcome, JsonRoleRepository, RoleRepository};
