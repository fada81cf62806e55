// 角色分配 Repository（user_roles.json）

use std::{collections::BTreeMap, path::Path};

use anyhow::Result;
use async_trait::async_trait;

use crate::{
    domain::{EscrowRole, RoleAssignment, SessionRoles},
    infrastructure::json_store::JsonStore,
};

/// 角色分配结果
#[derive(Debug, Clone, PartialEq)]
pub enum AssignOutcome {
    Assigned(RoleAssignment),
    /// 用户在本会话已有角色
    AlreadyChosen(EscrowRole),
    /// 角色已被其他用户占用
    AlreadyTaken(i64),
}

#[async_trait]
pub trait RoleRepository: Send + Sync {
    /// 会话内全部角色分配（按 user_id）
    async fn assignments(&self, session_id: &str) -> Result<Vec<RoleAssignment>>;

    /// 先到先得：检查与写入在同一临界区内完成
    async fn try_assign(&self, session_id: &str, assignment: RoleAssignment)
        -> Result<AssignOutcome>;
}

/// session_id -> user_id -> assignment
type RoleBook = BTreeMap<String, BTreeMap<String, RoleAssignment>>;

pub struct JsonRoleRepository {
    store: JsonStore<RoleBook>,
}

impl JsonRoleRepository {
    pub const FILE_NAME: &'static str = "user_roles.json";

    pub async fn open(data_dir: impl AsRef<Path>) -> Result<Self> {
        let store = JsonStore::open(data_dir.as_ref().join(Self::FILE_NAME)).await?;
        Ok(Self { store })
    }
}

#[async_trait]
impl RoleRepository for JsonRoleRepository {
    async fn assignments(&self, session_id: &str) -> Result<Vec<RoleAssignment>> {
        Ok(self
            .store
            .read(|book| {
                book.get(session_id)
                    .map(|users| users.values().cloned().collect())
                    .unwrap_or_default()
            })
            .await)
    }

    async fn try_assign(
        &self,
        session_id: &str,
        assignment: RoleAssignment,
    ) -> Result<AssignOutcome> {
        let outcome = self
            .store
            .try_update(|book| {
                let users = book.entry(session_id.to_string()).or_default();

                if let Some(existing) = users.get(&assignment.user_id.to_string()) {
                    return Err(AssignOutcome::AlreadyChosen(existing.role));
                }
                if let Some(holder) = users.values().find(|a| a.role == assignment.role) {
                    return Err(AssignOutcome::AlreadyTaken(holder.user_id));
                }

                users.insert(assignment.user_id.to_string(), assignment.clone());
                Ok(AssignOutcome::Assigned(assignment))
            })
            .await?;

        Ok(outcome.unwrap_or_else(|rejected| rejected))
    }
}

/// 由分配列表构建会话角色视图
pub fn session_roles(assignments: &[RoleAssignment]) -> SessionRoles {
    let mut roles = SessionRoles::default();
    for a in assignments {
        match a.role {
            EscrowRole::Buyer => roles.buyer = Some(a.user_id),
            EscrowRole::Seller => roles.seller = Some(a.user_id),
        }
    }
    roles
}
