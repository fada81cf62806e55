//! 地址提交服务
//!
//! 串联黑名单、账本预检、格式识别、链解析、账本写入与链匹配。
//! 预检和格式识别都在链上探测之前完成，被拒绝的提交不会产生任何探测请求。

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;

use crate::{
    domain::{
        AddressSubmission, ChainFamily, ChainMatch, EscrowRole, ResolvedAddressRecord,
        SessionAddresses, SubmissionReceipt,
    },
    service::{
        address_ledger::{AddressLedger, LedgerError},
        blacklist::Blacklist,
        chain_resolver::ChainResolver,
    },
    utils::{detect, eip55_checksum_ok, short_address},
};

#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("Invalid address format. Supported: EVM (0x...), TRON (T...), BTC (1/3/bc1...), LTC (L/M/ltc1...), DOGE (D...), XRP (r...)")]
    UnrecognizedFormat,
    #[error("You don't have a role in this escrow session")]
    NoRoleAssigned,
    #[error("You are registered as {held}, use the {held} command instead of {requested}")]
    DuplicateRoleConflict {
        held: EscrowRole,
        requested: EscrowRole,
    },
    #[error("The {} address for this session is already set to {}", .0.role, .0.address)]
    AddressAlreadySet(Box<ResolvedAddressRecord>),
    #[error("Failed to save the address, please try again: {0}")]
    PersistenceFailure(String),
    #[error("You are not allowed to use this service: {0}")]
    Blacklisted(String),
    #[error("The address network could not be verified right now, please try again later")]
    VerificationUnavailable(Vec<String>),
}

impl SubmissionError {
    /// 指标标签
    pub fn reason(&self) -> &'static str {
        match self {
            SubmissionError::UnrecognizedFormat => "unrecognized_format",
            SubmissionError::NoRoleAssigned => "no_role_assigned",
            SubmissionError::DuplicateRoleConflict { .. } => "duplicate_role_conflict",
            SubmissionError::AddressAlreadySet(_) => "address_already_set",
            SubmissionError::PersistenceFailure(_) => "persistence_failure",
            SubmissionError::Blacklisted(_) => "blacklisted",
            SubmissionError::VerificationUnavailable(_) => "verification_unavailable",
        }
    }
}

impl From<LedgerError> for SubmissionError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::NoRoleAssigned => SubmissionError::NoRoleAssigned,
            LedgerError::DuplicateRoleConflict { held, requested } => {
                SubmissionError::DuplicateRoleConflict { held, requested }
            }
            LedgerError::AddressAlreadySet(existing) => SubmissionError::AddressAlreadySet(existing),
            LedgerError::Persistence(msg) => SubmissionError::PersistenceFailure(msg),
        }
    }
}

/// 会话地址视图
#[derive(Debug, Clone, Serialize)]
pub struct SessionAddressView {
    pub session_id: String,
    pub addresses: SessionAddresses,
    pub chain_match: Option<ChainMatch>,
}

const CHECKSUM_WARNING: &str =
    "Address checksum (EIP-55) does not match. Double-check the address for typos.";

pub struct AddressService {
    blacklist: Arc<Blacklist>,
    resolver: Arc<ChainResolver>,
    ledger: Arc<AddressLedger>,
}

impl AddressService {
    pub fn new(
        blacklist: Arc<Blacklist>,
        resolver: Arc<ChainResolver>,
        ledger: Arc<AddressLedger>,
    ) -> Self {
        Self {
            blacklist,
            resolver,
            ledger,
        }
    }

    /// 提交地址
    pub async fn submit_address(
        &self,
        submission: AddressSubmission,
    ) -> Result<SubmissionReceipt, SubmissionError> {
        let session_id = submission.session_id.clone();
        let role = submission.role;

        let result = self.submit_inner(submission).await;
        match &result {
            Ok(receipt) => {
                crate::metrics::inc_submission_accepted();
                tracing::info!(
                    session_id = %session_id,
                    role = %role,
                    resolved_chain = %receipt.record.resolved_chain,
                    verified = receipt.verified,
                    "Address submission accepted"
                );
            }
            Err(e) => {
                crate::metrics::inc_submission_rejected(e.reason());
                tracing::info!(
                    session_id = %session_id,
                    role = %role,
                    reason = e.reason(),
                    "Address submission rejected"
                );
            }
        }
        result
    }

    async fn submit_inner(
        &self,
        submission: AddressSubmission,
    ) -> Result<SubmissionReceipt, SubmissionError> {
        if let Some(reason) = self
            .blacklist
            .check(
                submission.user_id,
                submission.username.as_deref(),
                submission.display_name.as_deref(),
            )
            .await
        {
            return Err(SubmissionError::Blacklisted(reason));
        }

        self.ledger
            .check(&submission.session_id, submission.role, submission.user_id)
            .await?;

        let address = submission.raw_address.trim().to_string();
        let family = detect(&address);
        if family == ChainFamily::Unknown {
            return Err(SubmissionError::UnrecognizedFormat);
        }

        let resolution = self.resolver.resolve(&address, family).await;
        if !resolution.accepted {
            return Err(SubmissionError::VerificationUnavailable(resolution.warnings));
        }

        let mut warnings = resolution.warnings;
        if family == ChainFamily::Evm && !eip55_checksum_ok(&address) {
            warnings.push(CHECKSUM_WARNING.to_string());
        }

        let record = ResolvedAddressRecord {
            session_id: submission.session_id,
            role: submission.role,
            explorer_url: resolution
                .selected_chain
                .map(|chain| chain.explorer_url(&address)),
            address,
            resolved_chain: resolution.resolved_chain,
            family,
            selected_chain: resolution.selected_chain,
            owner_user_id: submission.user_id,
            owner_name: submission.display_name.or(submission.username),
            saved_at: Utc::now(),
            warnings,
        };

        let outcome = self.ledger.submit(record).await?;

        let chain_match = outcome.counterpart.as_ref().map(|counterpart| {
            let (buyer, seller) = match outcome.record.role {
                EscrowRole::Buyer => (&outcome.record, counterpart),
                EscrowRole::Seller => (counterpart, &outcome.record),
            };
            compare_chains(buyer, seller)
        });

        if let Some(m) = chain_match.as_ref().filter(|m| !m.matched) {
            tracing::warn!(
                session_id = %outcome.record.session_id,
                buyer_chain = %m.buyer_chain,
                seller_chain = %m.seller_chain,
                "Chain mismatch between buyer and seller"
            );
        }

        Ok(SubmissionReceipt {
            short_address: short_address(&outcome.record.address, 12, 6),
            verified: resolution.verified,
            ready_for_chain_match: outcome.ready_for_chain_match,
            chain_match,
            record: outcome.record,
        })
    }

    /// 查询会话地址与链匹配状态
    pub async fn session_addresses(&self, session_id: &str) -> anyhow::Result<SessionAddressView> {
        let addresses = self.ledger.session(session_id).await?;
        let chain_match = match (&addresses.buyer, &addresses.seller) {
            (Some(buyer), Some(seller)) => Some(compare_chains(buyer, seller)),
            _ => None,
        };

        Ok(SessionAddressView {
            session_id: session_id.to_string(),
            addresses,
            chain_match,
        })
    }
}

/// 按地址族比较买卖双方（不同族即不匹配，只提示不回滚）
pub fn compare_chains(buyer: &ResolvedAddressRecord, seller: &ResolvedAddressRecord) -> ChainMatch {
    let matched = buyer.family == seller.family;
    let notice = if matched {
        format!(
            "Both addresses are on the same blockchain network ({}). Escrow is ready.",
            buyer.family
        )
    } else {
        format!(
            "Chain mismatch detected. Buyer uses {}, seller uses {}. Both parties must use the same blockchain.",
            buyer.resolved_chain, seller.resolved_chain
        )
    };

    ChainMatch {
        matched,
        buyer_chain: buyer.resolved_chain.clone(),
        seller_chain: seller.resolved_chain.clone(),
        notice,
    }
}
