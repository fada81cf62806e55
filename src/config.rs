//! 配置管理模块
//! 支持从环境变量和配置文件加载配置

use std::{path::Path, time::Duration};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{
    domain::{ChainFamily, ChainId},
    utils::chain_normalizer,
};

/// 应用配置结构体
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub explorer: ExplorerConfig,
    #[serde(default)]
    pub resolver: ResolverConfig,
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_addr: String,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "text"
}

/// 存储配置（JSON 文件目录）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
}

/// 区块浏览器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplorerConfig {
    /// Etherscan V2 多链接口（通过 chainid 区分 ETH / BSC / Polygon）
    pub etherscan_api_url: String,
    #[serde(default)]
    pub etherscan_api_key: Option<String>,
    pub trongrid_api_url: String,
    #[serde(default)]
    pub trongrid_api_key: Option<String>,
    /// Esplora 接口
    pub btc_api_url: String,
    pub ltc_api_url: String,
    /// BlockCypher 接口
    pub doge_api_url: String,
    /// rippled JSON-RPC
    pub xrp_rpc_url: String,
}

/// 全部探测失败时的策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnreachablePolicy {
    /// 仍然接受地址（标记为未验证）
    FailOpen,
    /// 拒绝地址，提示稍后重试
    FailClosed,
}

/// 各地址族的候选链
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateConfig {
    pub evm: Vec<ChainId>,
    pub tron: Vec<ChainId>,
    pub btc: Vec<ChainId>,
    pub ltc: Vec<ChainId>,
    pub doge: Vec<ChainId>,
    pub xrp: Vec<ChainId>,
}

/// 链解析配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// 单次查询超时
    pub probe_timeout_ms: u64,
    /// 一次解析中所有候选共享的时间预算
    pub resolve_budget_ms: u64,
    /// EVM 多链活动相同时的默认链
    pub evm_tie_break_default: ChainId,
    pub unreachable_policy: UnreachablePolicy,
    pub candidates: CandidateConfig,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: env_or("BIND_ADDR", "0.0.0.0:8088"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: env_or("LOG_LEVEL", "info"),
            format: env_or("LOG_FORMAT", "text"),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: env_or("DATA_DIR", "./data"),
        }
    }
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            etherscan_api_url: env_or("ETHERSCAN_API_URL", "https://api.etherscan.io/v2/api"),
            etherscan_api_key: std::env::var("ETHERSCAN_API_KEY").ok(),
            trongrid_api_url: env_or("TRONGRID_API_URL", "https://api.trongrid.io"),
            trongrid_api_key: std::env::var("TRONGRID_API_KEY").ok(),
            btc_api_url: env_or("BTC_API_URL", "https://blockstream.info/api"),
            ltc_api_url: env_or("LTC_API_URL", "https://litecoinspace.org/api"),
            doge_api_url: env_or("DOGE_API_URL", "https://api.blockcypher.com/v1/doge/main"),
            xrp_rpc_url: env_or("XRP_RPC_URL", "https://s1.ripple.com:51234/"),
        }
    }
}

impl Default for CandidateConfig {
    fn default() -> Self {
        let evm = match std::env::var("EVM_CANDIDATES") {
            Ok(raw) => match chain_normalizer::parse_chain_list(&raw) {
                Ok(chains) if !chains.is_empty() => chains,
                Ok(_) => ChainFamily::Evm.default_candidates(),
                Err(e) => {
                    tracing::warn!(error = %e, "Invalid EVM_CANDIDATES, using defaults");
                    ChainFamily::Evm.default_candidates()
                }
            },
            Err(_) => ChainFamily::Evm.default_candidates(),
        };

        Self {
            evm,
            tron: ChainFamily::Tron.default_candidates(),
            btc: ChainFamily::Btc.default_candidates(),
            ltc: ChainFamily::Ltc.default_candidates(),
            doge: ChainFamily::Doge.default_candidates(),
            xrp: ChainFamily::Xrp.default_candidates(),
        }
    }
}

impl CandidateConfig {
    /// 获取地址族的候选链（Unknown 为空）
    pub fn for_family(&self, family: ChainFamily) -> &[ChainId] {
        match family {
            ChainFamily::Evm => &self.evm,
            ChainFamily::Tron => &self.tron,
            ChainFamily::Btc => &self.btc,
            ChainFamily::Ltc => &self.ltc,
            ChainFamily::Doge => &self.doge,
            ChainFamily::Xrp => &self.xrp,
            ChainFamily::Unknown => &[],
        }
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        let evm_tie_break_default = std::env::var("EVM_TIE_BREAK_DEFAULT")
            .ok()
            .and_then(|raw| chain_normalizer::normalize_chain_identifier(&raw).ok())
            .unwrap_or(ChainId::Bsc);

        let unreachable_policy = match std::env::var("UNREACHABLE_POLICY").as_deref() {
            Ok("fail_closed") => UnreachablePolicy::FailClosed,
            _ => UnreachablePolicy::FailOpen,
        };

        Self {
            probe_timeout_ms: env_parse("PROBE_TIMEOUT_MS", 10_000),
            resolve_budget_ms: env_parse("RESOLVE_BUDGET_MS", 12_000),
            evm_tie_break_default,
            unreachable_policy,
            candidates: CandidateConfig::default(),
        }
    }
}

impl ResolverConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn resolve_budget(&self) -> Duration {
        Duration::from_millis(self.resolve_budget_ms)
    }
}

impl Config {
    /// 从环境变量加载配置
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
            storage: StorageConfig::default(),
            explorer: ExplorerConfig::default(),
            resolver: ResolverConfig::default(),
        })
    }

    /// 从配置文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: Config =
            toml::from_str(&content).with_context(|| "Failed to parse config file as TOML")?;

        Ok(config)
    }

    /// 从环境变量和配置文件合并加载（配置文件优先级更高，缺省段落回落到环境变量）
    pub fn from_env_and_file<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        let mut config = Self::from_env()?;

        if let Some(path) = path {
            if path.as_ref().exists() {
                config = Self::from_file(path)?;
            }
        }

        Ok(config)
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            anyhow::bail!("LOG_LEVEL must be one of: {:?}", valid_levels);
        }

        if self.logging.format != "json" && self.logging.format != "text" {
            anyhow::bail!("LOG_FORMAT must be 'json' or 'text'");
        }

        if self.resolver.probe_timeout_ms == 0 || self.resolver.resolve_budget_ms == 0 {
            anyhow::bail!("PROBE_TIMEOUT_MS and RESOLVE_BUDGET_MS must be greater than 0");
        }

        if self.resolver.evm_tie_break_default.family() != ChainFamily::Evm {
            anyhow::bail!(
                "EVM_TIE_BREAK_DEFAULT must be an EVM chain, got {}",
                self.resolver.evm_tie_break_default
            );
        }

        for family in ChainFamily::KNOWN {
            let candidates = self.resolver.candidates.for_family(family);
            if candidates.is_empty() {
                anyhow::bail!("No candidate chains configured for family {}", family);
            }
            if let Some(stray) = candidates.iter().find(|c| c.family() != family) {
                anyhow::bail!(
                    "Candidate chain {} does not belong to family {}",
                    stray,
                    family
                );
            }
        }

        if self.storage.data_dir.trim().is_empty() {
            anyhow::bail!("DATA_DIR must not be empty");
        }

        Ok(())
    }
}
