//! 担保会话领域模型

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::chain::{ChainFamily, ChainId};

/// 担保角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EscrowRole {
    Buyer,
    Seller,
}

impl EscrowRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            EscrowRole::Buyer => "buyer",
            EscrowRole::Seller => "seller",
        }
    }

    /// 对手方角色
    pub fn opposite(&self) -> EscrowRole {
        match self {
            EscrowRole::Buyer => EscrowRole::Seller,
            EscrowRole::Seller => EscrowRole::Buyer,
        }
    }
}

impl fmt::Display for EscrowRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 地址提交（每次命令调用创建，不直接落库）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressSubmission {
    pub session_id: String,
    pub user_id: i64,
    pub role: EscrowRole,
    /// 用户原始输入，可能带首尾空白
    pub raw_address: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

/// 单链探测结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainCandidateStat {
    pub chain: ChainId,
    pub tx_count: u64,
    pub is_contract: bool,
    pub probe_succeeded: bool,
    pub balance: Option<Decimal>,
}

impl ChainCandidateStat {
    /// 探测失败（超时、非200、无法解析）统一结果
    pub fn failed(chain: ChainId) -> Self {
        Self {
            chain,
            tx_count: 0,
            is_contract: false,
            probe_succeeded: false,
            balance: None,
        }
    }
}

/// 链解析结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resolution {
    pub accepted: bool,
    pub family: ChainFamily,
    /// 面向用户的链标签，例如 "USDT (BEP20)"
    pub resolved_chain: String,
    /// 唯一确定的具体链；通用标签或未验证时为 None
    pub selected_chain: Option<ChainId>,
    /// 是否至少有一个探测成功
    pub verified: bool,
    pub warnings: Vec<String>,
    pub candidates: Vec<ChainCandidateStat>,
}

/// 已解析地址记录（持久化实体，创建后不可变）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedAddressRecord {
    pub session_id: String,
    pub role: EscrowRole,
    pub address: String,
    pub resolved_chain: String,
    pub family: ChainFamily,
    #[serde(default)]
    pub selected_chain: Option<ChainId>,
    pub owner_user_id: i64,
    #[serde(default)]
    pub owner_name: Option<String>,
    #[serde(default)]
    pub explorer_url: Option<String>,
    pub saved_at: DateTime<Utc>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

/// 会话内地址（按角色）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionAddresses {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buyer: Option<ResolvedAddressRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seller: Option<ResolvedAddressRecord>,
}

impl SessionAddresses {
    pub fn get(&self, role: EscrowRole) -> Option<&ResolvedAddressRecord> {
        match role {
            EscrowRole::Buyer => self.buyer.as_ref(),
            EscrowRole::Seller => self.seller.as_ref(),
        }
    }

    pub fn slot_mut(&mut self, role: EscrowRole) -> &mut Option<ResolvedAddressRecord> {
        match role {
            EscrowRole::Buyer => &mut self.buyer,
            EscrowRole::Seller => &mut self.seller,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.buyer.is_some() && self.seller.is_some()
    }
}

/// 角色分配
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub user_id: i64,
    pub role: EscrowRole,
    #[serde(default)]
    pub display_name: Option<String>,
    pub selected_at: DateTime<Utc>,
}

/// 会话角色视图（由会话目录提供）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionRoles {
    pub buyer: Option<i64>,
    pub seller: Option<i64>,
}

impl SessionRoles {
    pub fn holder(&self, role: EscrowRole) -> Option<i64> {
        match role {
            EscrowRole::Buyer => self.buyer,
            EscrowRole::Seller => self.seller,
        }
    }

    pub fn holds(&self, user_id: i64, role: EscrowRole) -> bool {
        self.holder(role) == Some(user_id)
    }

    pub fn holds_any(&self, user_id: i64) -> bool {
        self.holds(user_id, EscrowRole::Buyer) || self.holds(user_id, EscrowRole::Seller)
    }
}

/// 买卖双方链匹配结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainMatch {
    pub matched: bool,
    pub buyer_chain: String,
    pub seller_chain: String,
    pub notice: String,
}

/// 提交成功回执（返回给聊天层）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionReceipt {
    pub record: ResolvedAddressRecord,
    pub short_address: String,
    pub verified: bool,
    pub ready_for_chain_match: bool,
    pub chain_match: Option<ChainMatch>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_opposite() {
        assert_eq!(EscrowRole::Buyer.opposite(), EscrowRole::Seller);
        assert_eq!(EscrowRole::Seller.opposite(), EscrowRole::Buyer);
    }

    #[test]
    fn test_session_roles_holds() {
        let roles = SessionRoles {
            buyer: Some(1),
            seller: Some(2),
        };
        assert!(roles.holds(1, EscrowRole::Buyer));
        assert!(!roles.holds(1, EscrowRole::Seller));
        assert!(roles.holds_any(2));
        assert!(!roles.holds_any(3));
    }
}
