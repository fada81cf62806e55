// 黑名单服务 - 按用户ID、用户名或显示名片段拦截

use crate::repository::JsonBlacklistRepository;

pub struct Blacklist {
    repo: JsonBlacklistRepository,
}

/// 用户名统一为小写、去掉前导 @
fn normalize_username(username: &str) -> String {
    username.trim().trim_start_matches('@').to_lowercase()
}

impl Blacklist {
    pub fn new(repo: JsonBlacklistRepository) -> Self {
        Self { repo }
    }

    /// 加入黑名单，返回是否有新增
    pub async fn add(
        &self,
        user_id: Option<i64>,
        username: Option<&str>,
        reason: &str,
    ) -> anyhow::Result<bool> {
        let username = username.map(normalize_username).filter(|u| !u.is_empty());

        let changed = self
            .repo
            .modify(|entries| {
                let mut changed = false;
                if let Some(id) = user_id {
                    if !entries.users.contains(&id) {
                        entries.users.push(id);
                        changed = true;
                    }
                }
                if let Some(name) = &username {
                    if !entries.usernames.contains(name) {
                        entries.usernames.push(name.clone());
                        changed = true;
                    }
                }
                changed
            })
            .await?;

        if changed {
            tracing::info!(user_id = ?user_id, username = ?username, reason = %reason, "Added to blacklist");
        }
        Ok(changed)
    }

    /// 移出黑名单，返回是否有删除
    pub async fn remove(&self, user_id: Option<i64>, username: Option<&str>) -> anyhow::Result<bool> {
        let username = username.map(normalize_username);

        let changed = self
            .repo
            .modify(|entries| {
                let before = entries.users.len() + entries.usernames.len();
                if let Some(id) = user_id {
                    entries.users.retain(|u| *u != id);
                }
                if let Some(name) = &username {
                    entries.usernames.retain(|u| u != name);
                }
                before != entries.users.len() + entries.usernames.len()
            })
            .await?;

        if changed {
            tracing::info!(user_id = ?user_id, username = ?username, "Removed from blacklist");
        }
        Ok(changed)
    }

    /// 检查用户，命中时返回原因
    pub async fn check(
        &self,
        user_id: i64,
        username: Option<&str>,
        display_name: Option<&str>,
    ) -> Option<String> {
        let username = username.map(normalize_username);
        let display_name = display_name.map(|n| n.to_lowercase());

        self.repo
            .read(|entries| {
                if entries.users.contains(&user_id) {
                    return Some("User ID is blacklisted".to_string());
                }
                if let Some(name) = &username {
                    if entries.usernames.contains(name) {
                        return Some(format!("Username @{} is blacklisted", name));
                    }
                }
                if let Some(display) = &display_name {
                    if let Some(fragment) = entries
                        .name_fragments
                        .iter()
                        .find(|f| !f.is_empty() && display.contains(&f.to_lowercase()))
                    {
                        return Some(format!("Known scammer name detected: {}", fragment));
                    }
                }
                None
            })
            .await
    }
}
