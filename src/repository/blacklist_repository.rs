// 黑名单 Repository（blacklist.json）

use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::infrastructure::json_store::JsonStore;

/// 黑名单文件结构
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlacklistEntries {
    #[serde(default)]
    pub users: Vec<i64>,
    /// 统一小写存储
    #[serde(default)]
    pub usernames: Vec<String>,
    /// 显示名包含即拦截（小写）
    #[serde(default)]
    pub name_fragments: Vec<String>,
}

pub struct JsonBlacklistRepository {
    store: JsonStore<BlacklistEntries>,
}

impl JsonBlacklistRepository {
    pub const FILE_NAME: &'static str = "blacklist.json";

    pub async fn open(data_dir: impl AsRef<Path>) -> Result<Self> {
        let store = JsonStore::open(data_dir.as_ref().join(Self::FILE_NAME)).await?;
        Ok(Self { store })
    }

    pub async fn read<R>(&self, f: impl FnOnce(&BlacklistEntries) -> R) -> R {
        self.store.read(f).await
    }

    /// 修改并落盘，返回是否有变化
    pub async fn modify(&self, f: impl FnOnce(&mut BlacklistEntries) -> bool) -> Result<bool> {
        let changed = self
            .store
            .try_update(|entries| if f(entries) { Ok(true) } else { Err(false) })
            .await?;
        Ok(changed.unwrap_or(false))
    }
}
