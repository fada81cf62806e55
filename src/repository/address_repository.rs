// 地址记录 Repository（user_addresses.json）

use std::{collections::BTreeMap, path::Path};

use anyhow::Result;
use async_trait::async_trait;

use crate::{
    domain::{ResolvedAddressRecord, SessionAddresses},
    infrastructure::json_store::JsonStore,
};

/// 插入结果
#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome {
    Inserted,
    /// (session, role) 已有记录，原记录不变
    AlreadyExists(ResolvedAddressRecord),
}

// ============ Repository Trait ============

#[async_trait]
pub trait AddressRepository: Send + Sync {
    /// 查询会话内的地址（不存在时为空）
    async fn find_session(&self, session_id: &str) -> Result<SessionAddresses>;

    /// 插入记录，不覆盖已有记录
    async fn insert(&self, record: ResolvedAddressRecord) -> Result<InsertOutcome>;
}

// ============ JSON 实现 ============

/// session_id -> { buyer, seller }
type AddressBook = BTreeMap<String, SessionAddresses>;

pub struct JsonAddressRepository {
    store: JsonStore<AddressBook>,
}

impl JsonAddressRepository {
    pub const FILE_NAME: &'static str = "user_addresses.json";

    pub async fn open(data_dir: impl AsRef<Path>) -> Result<Self> {
        let store = JsonStore::open(data_dir.as_ref().join(Self::FILE_NAME)).await?;
        Ok(Self { store })
    }
}

#[async_trait]
impl AddressRepository for JsonAddressRepository {
    async fn find_session(&self, session_id: &str) -> Result<SessionAddresses> {
        Ok(self
            .store
            .read(|book| book.get(session_id).cloned().unwrap_or_default())
            .await)
    }

    async fn insert(&self, record: ResolvedAddressRecord) -> Result<InsertOutcome> {
        let outcome = self
            .store
            .try_update(|book| {
                let slot = book
                    .entry(record.session_id.clone())
                    .or_default()
                    .slot_mut(record.role);
                if let Some(existing) = slot.as_ref() {
                    return Err(existing.clone());
                }
                *slot = Some(record);
                Ok(())
            })
            .await?;

        Ok(match outcome {
            Ok(()) => InsertOutcome::Inserted,
            Err(existing) => InsertOutcome::AlreadyExists(existing),
        })
    }
}
