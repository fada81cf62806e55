//! 担保地址账本
//!
//! 每个 (session, role) 至多一条记录，创建后不可变。校验顺序：
//! 无角色 → 角色冲突 → 已有地址。检查与写入在会话级互斥锁内完成，
//! 锁只覆盖本地读写，不跨网络调用。

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use thiserror::Error;

use crate::{
    domain::{EscrowRole, ResolvedAddressRecord, SessionAddresses, SessionRoles},
    repository::{AddressRepository, InsertOutcome},
};

/// 会话角色目录（由角色登记服务提供）
#[async_trait]
pub trait EscrowSessionDirectory: Send + Sync {
    async fn session_roles(&self, session_id: &str) -> anyhow::Result<SessionRoles>;
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("user holds no role in this session")]
    NoRoleAssigned,
    #[error("user is registered as {held}, cannot submit the {requested} address")]
    DuplicateRoleConflict {
        held: EscrowRole,
        requested: EscrowRole,
    },
    #[error("{} address already set for this session", .0.role)]
    AddressAlreadySet(Box<ResolvedAddressRecord>),
    #[error("ledger storage failure: {0}")]
    Persistence(String),
}

/// 写入成功结果
#[derive(Debug, Clone)]
pub struct LedgerOutcome {
    pub record: ResolvedAddressRecord,
    /// 买卖双方地址均已登记
    pub ready_for_chain_match: bool,
    /// 对手方记录（双方齐全时）
    pub counterpart: Option<ResolvedAddressRecord>,
}

pub struct AddressLedger {
    repo: Arc<dyn AddressRepository>,
    directory: Arc<dyn EscrowSessionDirectory>,
    session_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl AddressLedger {
    pub fn new(
        repo: Arc<dyn AddressRepository>,
        directory: Arc<dyn EscrowSessionDirectory>,
    ) -> Self {
        Self {
            repo,
            directory,
            session_locks: Mutex::new(HashMap::new()),
        }
    }

    fn session_lock(&self, session_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = match self.session_locks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        locks
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// 释放无人等待的会话锁
    fn prune_locks(&self) {
        let mut locks = match self.session_locks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
    }

    /// 提交前检查（不加锁，不写入）
    ///
    /// 在发起链上探测之前调用，让注定失败的提交尽早返回。
    pub async fn check(
        &self,
        session_id: &str,
        role: EscrowRole,
        owner_user_id: i64,
    ) -> Result<(), LedgerError> {
        let roles = self
            .directory
            .session_roles(session_id)
            .await
            .map_err(|e| LedgerError::Persistence(e.to_string()))?;

        if !roles.holds_any(owner_user_id) {
            return Err(LedgerError::NoRoleAssigned);
        }
        if !roles.holds(owner_user_id, role) {
            return Err(LedgerError::DuplicateRoleConflict {
                held: role.opposite(),
                requested: role,
            });
        }

        let existing = self
            .repo
            .find_session(session_id)
            .await
            .map_err(|e| LedgerError::Persistence(e.to_string()))?;
        if let Some(record) = existing.get(role) {
            return Err(LedgerError::AddressAlreadySet(Box::new(record.clone())));
        }

        Ok(())
    }

    /// 登记地址
    pub async fn submit(&self, record: ResolvedAddressRecord) -> Result<LedgerOutcome, LedgerError> {
        let lock = self.session_lock(&record.session_id);
        let result = {
            let _guard = lock.lock().await;
            self.submit_locked(record).await
        };
        drop(lock);
        self.prune_locks();
        result
    }

    async fn submit_locked(
        &self,
        record: ResolvedAddressRecord,
    ) -> Result<LedgerOutcome, LedgerError> {
        let session_id = record.session_id.clone();
        let role = record.role;

        self.check(&session_id, role, record.owner_user_id).await?;

        match self.repo.insert(record.clone()).await {
            Ok(InsertOutcome::Inserted) => {}
            Ok(InsertOutcome::AlreadyExists(existing)) => {
                return Err(LedgerError::AddressAlreadySet(Box::new(existing)))
            }
            Err(e) => {
                tracing::error!(
                    session_id = %session_id,
                    role = %role,
                    error = ?e,
                    "Failed to persist address record"
                );
                return Err(LedgerError::Persistence(e.to_string()));
            }
        }

        tracing::info!(
            session_id = %session_id,
            role = %role,
            resolved_chain = %record.resolved_chain,
            "Address recorded"
        );

        // 记录已落盘，读取失败不影响本次结果
        let counterpart = match self.repo.find_session(&session_id).await {
            Ok(session) => session.get(role.opposite()).cloned(),
            Err(e) => {
                tracing::warn!(session_id = %session_id, error = ?e, "Failed to load counterpart record");
                None
            }
        };

        Ok(LedgerOutcome {
            record,
            ready_for_chain_match: counterpart.is_some(),
            counterpart,
        })
    }

    pub async fn session(&self, session_id: &str) -> anyhow::Result<SessionAddresses> {
        self.repo.find_session(session_id).await
    }
}
