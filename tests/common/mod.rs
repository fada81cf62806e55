//! 测试辅助模块
//! 提供固定结果探测器、临时目录应用状态与请求工具

#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Method, Request},
    response::Response,
    Router,
};
use oneescrow::{
    api,
    app_state::AppState,
    config::{Config, UnreachablePolicy},
    domain::{ChainCandidateStat, ChainId},
    service::{ChainActivityProber, ProbeScope},
};
use serde_json::Value;

pub const EVM_ADDR: &str = "0x742d35cc6634c0532925a3b844bc9e7595f0beb6";
pub const TRON_ADDR: &str = "TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t";

/// 固定交易数的探测器；未配置的链视为探测失败
pub struct ScriptedProber {
    tx_counts: HashMap<ChainId, u64>,
    calls: AtomicUsize,
}

impl ScriptedProber {
    pub fn new(tx_counts: &[(ChainId, u64)]) -> Self {
        Self {
            tx_counts: tx_counts.iter().copied().collect(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChainActivityProber for ScriptedProber {
    async fn probe(&self, _scope: &ProbeScope, _address: &str, chain: ChainId) -> ChainCandidateStat {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.tx_counts.get(&chain) {
            Some(&tx_count) => ChainCandidateStat {
                chain,
                tx_count,
                is_contract: false,
                probe_succeeded: true,
                balance: None,
            },
            None => ChainCandidateStat::failed(chain),
        }
    }
}

/// 指向临时目录的测试配置
pub fn test_config(data_dir: &std::path::Path) -> Config {
    let mut config = Config::from_env().unwrap();
    config.storage.data_dir = data_dir.to_string_lossy().into_owned();
    config.resolver.candidates.evm = vec![ChainId::Eth, ChainId::Bsc];
    config.resolver.evm_tie_break_default = ChainId::Bsc;
    config.resolver.unreachable_policy = UnreachablePolicy::FailOpen;
    config.resolver.resolve_budget_ms = 2_000;
    config
}

pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub prober: Arc<ScriptedProber>,
    pub dir: tempfile::TempDir,
}

pub async fn create_test_app(tx_counts: &[(ChainId, u64)]) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    create_test_app_in(dir, tx_counts).await
}

pub async fn create_test_app_in(dir: tempfile::TempDir, tx_counts: &[(ChainId, u64)]) -> TestApp {
    let prober = Arc::new(ScriptedProber::new(tx_counts));
    let config = Arc::new(test_config(dir.path()));
    let state = Arc::new(AppState::with_prober(config, prober.clone()).await.unwrap());

    TestApp {
        router: api::routes(state.clone()),
        state,
        prober,
        dir,
    }
}

pub fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub async fn read_json(resp: Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
