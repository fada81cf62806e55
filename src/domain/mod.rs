//! 领域模型
//!
//! - chain: 地址族与具体链
//! - escrow: 担保会话、地址记录、角色

pub mod chain;
pub mod escrow;

pub use chain::{ChainFamily, ChainId, EVM_NEW_WALLET_LABEL, EVM_UNVERIFIED_LABEL};
pub use escrow::{
    AddressSubmission, ChainCandidateStat, ChainMatch, EscrowRole, Resolution,
    ResolvedAddressRecord, RoleAssignment, SessionAddresses, SessionRoles, SubmissionReceipt,
};
