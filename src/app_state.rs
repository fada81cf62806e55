use std::sync::Arc;

use crate::{
    config::Config,
    repository::{JsonAddressRepository, JsonBlacklistRepository, JsonRoleRepository},
    service::{
        AddressLedger, AddressService, Blacklist, ChainActivityProber, ChainResolver,
        ExplorerProber, RoleRegistry,
    },
};

/// 应用状态
/// 包含所有共享服务，启动时构建一次
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub address_service: Arc<AddressService>,
    pub role_registry: Arc<RoleRegistry>,
    pub blacklist: Arc<Blacklist>,
}

impl AppState {
    /// 使用区块浏览器探测器创建应用状态
    pub async fn new(config: Arc<Config>) -> anyhow::Result<Self> {
        let prober = Arc::new(ExplorerProber::new(config.explorer.clone()));
        Self::with_prober(config, prober).await
    }

    /// 指定探测器（测试中注入固定结果）
    pub async fn with_prober(
        config: Arc<Config>,
        prober: Arc<dyn ChainActivityProber>,
    ) -> anyhow::Result<Self> {
        let data_dir = config.storage.data_dir.clone();

        let address_repo = Arc::new(JsonAddressRepository::open(&data_dir).await?);
        let role_repo = Arc::new(JsonRoleRepository::open(&data_dir).await?);
        let blacklist = Arc::new(Blacklist::new(
            JsonBlacklistRepository::open(&data_dir).await?,
        ));

        let role_registry = Arc::new(RoleRegistry::new(role_repo));
        let resolver = Arc::new(ChainResolver::new(prober, config.resolver.clone()));
        let ledger = Arc::new(AddressLedger::new(address_repo, role_registry.clone()));
        let address_service = Arc::new(AddressService::new(
            blacklist.clone(),
            resolver,
            ledger,
        ));

        tracing::info!(data_dir = %data_dir, "Application state initialized");

        Ok(Self {
            config,
            address_service,
            role_registry,
            blacklist,
        })
    }
}
