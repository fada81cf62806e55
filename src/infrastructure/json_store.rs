//! JSON 文件存储
//!
//! 整体状态常驻内存，写操作先落盘（临时文件 + rename）再提交内存。
//! 落盘失败时内存状态保持不变，调用方可安全重试。

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::RwLock;

pub struct JsonStore<T> {
    path: PathBuf,
    state: RwLock<T>,
}

impl<T> JsonStore<T>
where
    T: Serialize + DeserializeOwned + Default + Clone + Send + Sync,
{
    /// 打开存储文件，不存在则以默认值开始
    ///
    /// 文件存在但无法解析时返回错误，不会用空状态覆盖已有数据。
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("Failed to create data dir: {:?}", parent))?;
            }
        }

        let state = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.iter().all(|b| b.is_ascii_whitespace()) => T::default(),
            Ok(bytes) => serde_json::from_slice(&bytes)
                .with_context(|| format!("Failed to parse JSON store: {:?}", path))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => T::default(),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read JSON store: {:?}", path))
            }
        };

        tracing::debug!(path = %path.display(), "JSON store opened");

        Ok(Self {
            path,
            state: RwLock::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 只读访问
    pub async fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let guard = self.state.read().await;
        f(&guard)
    }

    /// 读-改-写
    ///
    /// 闭包返回 `Err` 时不落盘（业务拒绝）；外层 `Err` 表示落盘失败。
    pub async fn try_update<R, E>(
        &self,
        f: impl FnOnce(&mut T) -> std::result::Result<R, E>,
    ) -> Result<std::result::Result<R, E>> {
        let mut guard = self.state.write().await;
        let mut next = guard.clone();

        let value = match f(&mut next) {
            Ok(value) => value,
            Err(rejected) => return Ok(Err(rejected)),
        };

        self.persist(&next).await?;
        *guard = next;

        Ok(Ok(value))
    }

    async fn persist(&self, state: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(state).context("Failed to serialize JSON store")?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, &bytes)
            .await
            .with_context(|| format!("Failed to write {:?}", tmp))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("Failed to replace {:?}", self.path))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    type Store = JsonStore<BTreeMap<String, u32>>;

    #[tokio::test]
    async fn test_update_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("counts.json");

        let store = Store::open(&path).await.unwrap();
        let result: Result<Result<(), ()>> = store
            .try_update(|m| {
                m.insert("a".into(), 1);
                Ok(())
            })
            .await;
        assert!(matches!(result, Ok(Ok(()))));

        let reopened = Store::open(&path).await.unwrap();
        assert_eq!(reopened.read(|m| m.get("a").copied()).await, Some(1));
    }

    #[tokio::test]
    async fn test_rejected_update_is_not_applied() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("counts.json");
        let store = Store::open(&path).await.unwrap();

        let result = store
            .try_update(|m| {
                m.insert("a".into(), 1);
                Err::<(), _>("rejected")
            })
            .await
            .unwrap();
        assert_eq!(result, Err("rejected"));
        assert!(store.read(|m| m.is_empty()).await);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_write_failure_keeps_memory_state() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("gone");
        let path = sub.join("counts.json");
        let store = Store::open(&path).await.unwrap();

        std::fs::remove_dir_all(&sub).unwrap();

        let result = store
            .try_update(|m| {
                m.insert("a".into(), 1);
                Ok::<(), ()>(())
            })
            .await;
        assert!(result.is_err());
        assert!(store.read(|m| m.is_empty()).await);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("counts.json");
        std::fs::write(&path, b"{not json").unwrap();

        assert!(Store::open(&path).await.is_err());
    }
}
