// 角色登记服务 - 先到先得选择买方/卖方

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;

use crate::{
    domain::{EscrowRole, RoleAssignment, SessionRoles},
    repository::{role_repository::session_roles, AssignOutcome, RoleRepository},
    service::address_ledger::EscrowSessionDirectory,
};

#[derive(Debug, Error)]
pub enum RoleError {
    #[error("You have already chosen the {0} role in this session")]
    RoleAlreadyChosen(EscrowRole),
    #[error("The {0} role has already been taken by another user")]
    RoleAlreadyTaken(EscrowRole),
    #[error("Failed to save role selection, please try again: {0}")]
    Persistence(String),
}

pub struct RoleRegistry {
    repo: Arc<dyn RoleRepository>,
}

impl RoleRegistry {
    pub fn new(repo: Arc<dyn RoleRepository>) -> Self {
        Self { repo }
    }

    /// 选择角色（先到先得）
    pub async fn select_role(
        &self,
        session_id: &str,
        user_id: i64,
        role: EscrowRole,
        display_name: Option<String>,
    ) -> Result<RoleAssignment, RoleError> {
        let assignment = RoleAssignment {
            user_id,
            role,
            display_name,
            selected_at: Utc::now(),
        };

        let outcome = self
            .repo
            .try_assign(session_id, assignment)
            .await
            .map_err(|e| {
                tracing::error!(session_id = %session_id, user_id, error = ?e, "Failed to persist role");
                RoleError::Persistence(e.to_string())
            })?;

        match outcome {
            AssignOutcome::Assigned(assignment) => {
                tracing::info!(session_id = %session_id, user_id, role = %role, "Role selected");
                Ok(assignment)
            }
            AssignOutcome::AlreadyChosen(held) => Err(RoleError::RoleAlreadyChosen(held)),
            AssignOutcome::AlreadyTaken(holder) => {
                tracing::debug!(session_id = %session_id, role = %role, holder, "Role already taken");
                Err(RoleError::RoleAlreadyTaken(role))
            }
        }
    }

    pub async fn assignments(&self, session_id: &str) -> anyhow::Result<Vec<RoleAssignment>> {
        self.repo.assignments(session_id).await
    }
}

#[async_trait]
impl EscrowSessionDirectory for RoleRegistry {
    async fn session_roles(&self, session_id: &str) -> anyhow::Result<SessionRoles> {
        let assignments = self.repo.assignments(session_id).await?;
        Ok(session_roles(&assignments))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::JsonRoleRepository;

    async fn registry() -> (RoleRegistry, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let repo = JsonRoleRepository::open(dir.path()).await.unwrap();
        (RoleRegistry::new(Arc::new(repo)), dir)
    }

    #[tokio::test]
    async fn test_select_role_first_come_first_served() {
        let (registry, _dir) = registry().await;

        registry
            .select_role("g1", 10, EscrowRole::Buyer, Some("alice".into()))
            .await
            .unwrap();

        let err = registry
            .select_role("g1", 11, EscrowRole::Buyer, None)
            .await
            .unwrap_err();
        assert!(matches!(err, RoleError::RoleAlreadyTaken(EscrowRole::Buyer)));

        let err = registry
            .select_role("g1", 10, EscrowRole::Seller, None)
            .await
            .unwrap_err();
        assert!(matches!(err, RoleError::RoleAlreadyChosen(EscrowRole::Buyer)));

        registry
            .select_role("g1", 11, EscrowRole::Seller, None)
            .await
            .unwrap();

        let roles = registry.session_roles("g1").await.unwrap();
        assert_eq!(roles.buyer, Some(10));
        assert_eq!(roles.seller, Some(11));
    }

    #[tokio::test]
    async fn test_sessions_are_independent() {
        let (registry, _dir) = registry().await;

        registry
            .select_role("g1", 10, EscrowRole::Buyer, None)
            .await
            .unwrap();
        registry
            .select_role("g2", 10, EscrowRole::Seller, None)
            .await
            .unwrap();

        assert_eq!(registry.session_roles("g2").await.unwrap().seller, Some(10));
        assert_eq!(registry.session_roles("g3").await.unwrap(), SessionRoles::default());
    }
}
