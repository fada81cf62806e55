// 链上活动探测 - 查询单条链上的地址活动
// 失败（超时、非200、无法解析）不向上抛错，统一折算为 probe_succeeded=false

use std::time::{Duration, Instant};

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Deserialize};
use thiserror::Error;

use crate::{
    config::ExplorerConfig,
    domain::{ChainCandidateStat, ChainId},
};

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("explorer request timed out")]
    Timeout,
    #[error("explorer unreachable: {0}")]
    Unreachable(String),
    #[error("explorer returned HTTP {0}")]
    BadStatus(u16),
    #[error("explorer response unparseable: {0}")]
    Unparseable(String),
}

impl From<reqwest::Error> for ProbeError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ProbeError::Timeout
        } else if e.is_decode() {
            ProbeError::Unparseable(e.to_string())
        } else {
            ProbeError::Unreachable(e.to_string())
        }
    }
}

/// 单次解析的 HTTP 作用域
///
/// 每次 resolve() 新建，随作用域一起释放，不跨请求复用连接。
pub struct ProbeScope {
    http: reqwest::Client,
}

impl ProbeScope {
    pub fn new(request_timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .connect_timeout(request_timeout)
            .user_agent(concat!("oneescrow/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Failed to build probe client, using defaults");
                reqwest::Client::new()
            });

        Self { http }
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }
}

/// 链上活动探测器
#[async_trait]
pub trait ChainActivityProber: Send + Sync {
    /// 查询地址在指定链上的活动；任何失败都返回 `ChainCandidateStat::failed`
    async fn probe(&self, scope: &ProbeScope, address: &str, chain: ChainId)
        -> ChainCandidateStat;
}

/// 基于公开区块浏览器接口的探测器
pub struct ExplorerProber {
    config: ExplorerConfig,
}

impl ExplorerProber {
    pub fn new(config: ExplorerConfig) -> Self {
        Self { config }
    }

    async fn fetch_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ProbeError> {
        let resp = request.send().await?;

        let status = resp.status();
        if status != reqwest::StatusCode::OK {
            return Err(ProbeError::BadStatus(status.as_u16()));
        }

        let body = resp.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| ProbeError::Unparseable(e.to_string()))
    }

    // ========== EVM ==========

    async fn etherscan_proxy(
        &self,
        scope: &ProbeScope,
        chain: ChainId,
        action: &str,
        address: &str,
    ) -> Result<String, ProbeError> {
        let chain_id = chain
            .evm_chain_id()
            .ok_or_else(|| ProbeError::Unparseable(format!("{} is not an EVM chain", chain)))?;

        let chain_id = chain_id.to_string();
        let mut params: Vec<(&str, &str)> = vec![
            ("chainid", chain_id.as_str()),
            ("module", "proxy"),
            ("action", action),
            ("address", address),
            ("tag", "latest"),
        ];
        if let Some(key) = self.config.etherscan_api_key.as_deref() {
            params.push(("apikey", key));
        }

        let request = scope
            .http()
            .get(&self.config.etherscan_api_url)
            .query(&params);
        let resp: EtherscanProxyResponse = self.fetch_json(request).await?;

        match resp.result {
            Some(serde_json::Value::String(s)) if s.starts_with("0x") => Ok(s),
            // 限流等错误时 result 是说明文字
            Some(other) => Err(ProbeError::Unparseable(format!(
                "unexpected proxy result: {}",
                other
            ))),
            None => Err(ProbeError::Unparseable(
                resp.error
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "missing result".to_string()),
            )),
        }
    }

    async fn probe_evm(
        &self,
        scope: &ProbeScope,
        address: &str,
        chain: ChainId,
    ) -> Result<ChainCandidateStat, ProbeError> {
        let (nonce, code) = tokio::join!(
            self.etherscan_proxy(scope, chain, "eth_getTransactionCount", address),
            self.etherscan_proxy(scope, chain, "eth_getCode", address),
        );

        let tx_count = parse_hex_u64(&nonce?)?;

        // 合约检测只用于提示，失败时不影响活动判断
        let is_contract = match code {
            Ok(code) => code.len() > 2,
            Err(e) => {
                tracing::debug!(chain = %chain, address = %address, error = %e, "eth_getCode failed");
                false
            }
        };

        Ok(ChainCandidateStat {
            chain,
            tx_count,
            is_contract,
            probe_succeeded: true,
            balance: None,
        })
    }

    // ========== TRON ==========

    async fn probe_tron(
        &self,
        scope: &ProbeScope,
        address: &str,
    ) -> Result<ChainCandidateStat, ProbeError> {
        let url = format!(
            "{}/v1/accounts/{}",
            self.config.trongrid_api_url.trim_end_matches('/'),
            address
        );
        let mut request = scope.http().get(url);
        if let Some(key) = self.config.trongrid_api_key.as_deref() {
            request = request.header("TRON-PRO-API-KEY", key);
        }

        let resp: TronAccountsResponse = self.fetch_json(request).await?;
        if resp.success == Some(false) {
            return Err(ProbeError::Unparseable("trongrid reported failure".into()));
        }

        // 未激活账户 data 为空；激活即视为有活动
        let account = resp.data.first();
        Ok(ChainCandidateStat {
            chain: ChainId::Tron,
            tx_count: u64::from(account.is_some()),
            is_contract: false,
            probe_succeeded: true,
            balance: account.and_then(|a| scaled(i128::from(a.balance), 6)),
        })
    }

    // ========== BTC / LTC (Esplora) ==========

    async fn probe_esplora(
        &self,
        scope: &ProbeScope,
        base_url: &str,
        address: &str,
        chain: ChainId,
    ) -> Result<ChainCandidateStat, ProbeError> {
        let url = format!("{}/address/{}", base_url.trim_end_matches('/'), address);
        let resp: EsploraAddress = self.fetch_json(scope.http().get(url)).await?;

        let tx_count = resp.chain_stats.tx_count + resp.mempool_stats.tx_count;
        let sats = resp.chain_stats.net() + resp.mempool_stats.net();

        Ok(ChainCandidateStat {
            chain,
            tx_count,
            is_contract: false,
            probe_succeeded: true,
            balance: scaled(sats, 8),
        })
    }

    // ========== DOGE (BlockCypher) ==========

    async fn probe_doge(
        &self,
        scope: &ProbeScope,
        address: &str,
    ) -> Result<ChainCandidateStat, ProbeError> {
        let url = format!(
            "{}/addrs/{}/balance",
            self.config.doge_api_url.trim_end_matches('/'),
            address
        );
        let resp: BlockCypherBalance = self.fetch_json(scope.http().get(url)).await?;

        Ok(ChainCandidateStat {
            chain: ChainId::Doge,
            tx_count: resp.n_tx + resp.unconfirmed_n_tx,
            is_contract: false,
            probe_succeeded: true,
            balance: scaled(i128::from(resp.final_balance), 8),
        })
    }

    // ========== XRP (rippled JSON-RPC) ==========

    async fn probe_xrp(
        &self,
        scope: &ProbeScope,
        address: &str,
    ) -> Result<ChainCandidateStat, ProbeError> {
        let body = serde_json::json!({
            "method": "account_info",
            "params": [{ "account": address, "ledger_index": "validated" }]
        });
        let request = scope.http().post(&self.config.xrp_rpc_url).json(&body);
        let resp: XrpRpcResponse = self.fetch_json(request).await?;

        if let Some(data) = resp.result.account_data {
            let drops = data
                .balance
                .parse::<i128>()
                .map_err(|e| ProbeError::Unparseable(format!("XRP balance: {}", e)))?;
            return Ok(ChainCandidateStat {
                chain: ChainId::Xrp,
                tx_count: 1,
                is_contract: false,
                probe_succeeded: true,
                balance: scaled(drops, 6),
            });
        }

        match resp.result.error.as_deref() {
            // 账户未激活是确定的"无活动"，不是失败
            Some("actNotFound") => Ok(ChainCandidateStat {
                chain: ChainId::Xrp,
                tx_count: 0,
                is_contract: false,
                probe_succeeded: true,
                balance: None,
            }),
            Some(other) => Err(ProbeError::Unparseable(format!("rippled error: {}", other))),
            None => Err(ProbeError::Unparseable("missing account_data".into())),
        }
    }
}

#[async_trait]
impl ChainActivityProber for ExplorerProber {
    async fn probe(
        &self,
        scope: &ProbeScope,
        address: &str,
        chain: ChainId,
    ) -> ChainCandidateStat {
        let started = Instant::now();

        let result = match chain {
            ChainId::Eth | ChainId::Bsc | ChainId::Polygon => {
                self.probe_evm(scope, address, chain).await
            }
            ChainId::Tron => self.probe_tron(scope, address).await,
            ChainId::Btc => {
                self.probe_esplora(scope, &self.config.btc_api_url, address, chain)
                    .await
            }
            ChainId::Ltc => {
                self.probe_esplora(scope, &self.config.ltc_api_url, address, chain)
                    .await
            }
            ChainId::Doge => self.probe_doge(scope, address).await,
            ChainId::Xrp => self.probe_xrp(scope, address).await,
        };

        let elapsed_ms = started.elapsed().as_millis();
        let stat = match result {
            Ok(stat) => {
                tracing::debug!(
                    chain = %chain,
                    address = %address,
                    tx_count = stat.tx_count,
                    is_contract = stat.is_contract,
                    elapsed_ms = elapsed_ms as u64,
                    "Chain probe succeeded"
                );
                stat
            }
            Err(e) => {
                tracing::warn!(
                    chain = %chain,
                    address = %address,
                    error = %e,
                    elapsed_ms = elapsed_ms as u64,
                    "Chain probe failed"
                );
                ChainCandidateStat::failed(chain)
            }
        };

        crate::metrics::observe_probe(chain.canonical_name(), stat.probe_succeeded, elapsed_ms);
        stat
    }
}

// ========== 响应结构 ==========

#[derive(Debug, Deserialize)]
struct EtherscanProxyResponse {
    #[serde(default)]
    result: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct TronAccountsResponse {
    #[serde(default)]
    data: Vec<TronAccount>,
    #[serde(default)]
    success: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct TronAccount {
    /// 单位 sun
    #[serde(default)]
    balance: u64,
}

#[derive(Debug, Deserialize)]
struct EsploraAddress {
    chain_stats: EsploraStats,
    #[serde(default)]
    mempool_stats: EsploraStats,
}

#[derive(Debug, Default, Deserialize)]
struct EsploraStats {
    #[serde(default)]
    tx_count: u64,
    #[serde(default)]
    funded_txo_sum: u64,
    #[serde(default)]
    spent_txo_sum: u64,
}

impl EsploraStats {
    fn net(&self) -> i128 {
        i128::from(self.funded_txo_sum) - i128::from(self.spent_txo_sum)
    }
}

#[derive(Debug, Deserialize)]
struct BlockCypherBalance {
    n_tx: u64,
    #[serde(default)]
    unconfirmed_n_tx: u64,
    #[serde(default)]
    final_balance: i64,
}

#[derive(Debug, Deserialize)]
struct XrpRpcResponse {
    result: XrpAccountInfo,
}

#[derive(Debug, Deserialize)]
struct XrpAccountInfo {
    #[serde(default)]
    account_data: Option<XrpAccountData>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct XrpAccountData {
    /// 单位 drops
    #[serde(rename = "Balance")]
    balance: String,
}

fn parse_hex_u64(raw: &str) -> Result<u64, ProbeError> {
    let digits = raw.trim_start_matches("0x");
    if digits.is_empty() {
        return Ok(0);
    }
    u64::from_str_radix(digits, 16)
        .map_err(|e| ProbeError::Unparseable(format!("invalid hex quantity {}: {}", raw, e)))
}

fn scaled(units: i128, scale: u32) -> Option<Decimal> {
    Decimal::try_from_i128_with_scale(units, scale).ok()
}
