pub mod address_ledger; // 担保地址账本
pub mod address_service; // 地址提交编排
pub mod blacklist;
pub mod chain_prober; // 链上活动探测
pub mod chain_resolver; // 多链并发解析与决策
pub mod role_registry; // 角色先到先得

pub use address_ledger::{AddressLedger, EscrowSessionDirectory, LedgerError, LedgerOutcome};
pub use address_service::{AddressService, SessionAddressView, SubmissionError};
pub use blacklist::Blacklist;
pub use chain_prober::{ChainActivityProber, ExplorerProber, ProbeError, ProbeScope};
pub use chain_resolver::{ChainResolver, Decision};
pub use role_registry::{RoleError, RoleRegistry};
