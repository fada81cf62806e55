//! 链解析服务
//!
//! 对地址族的全部候选链并发探测（共享同一截止时间），再按固定策略选出链标签：
//!
//! 1. 恰好一个候选有交易：直接采用
//! 2. 多个候选有交易：交易数严格最多者胜出；并列时取配置的默认链（BSC），
//!    默认链不在并列集合中则取配置顺序的第一个。两种情况都附带说明
//! 3. 全部无交易且至少一个探测成功：多候选族返回通用标签并提示，单候选族直接返回链标签
//! 4. 全部探测失败：默认仍接受（未验证标签 + 不可达提示）；fail_closed 时拒绝
//!
//! 任一候选是合约地址时，合约提示排在最前。

use std::sync::Arc;

use futures::future::join_all;

use crate::{
    config::{ResolverConfig, UnreachablePolicy},
    domain::{ChainCandidateStat, ChainFamily, ChainId, Resolution},
    service::chain_prober::{ChainActivityProber, ProbeScope},
};

/// 解析决策分支（用于日志与指标）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    SingleActive,
    MostActive,
    TieBreak,
    Inactive,
    Unreachable,
    Rejected,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::SingleActive => "single_active",
            Decision::MostActive => "most_active",
            Decision::TieBreak => "tie_break",
            Decision::Inactive => "inactive",
            Decision::Unreachable => "unreachable",
            Decision::Rejected => "rejected",
        }
    }
}

pub struct ChainResolver {
    prober: Arc<dyn ChainActivityProber>,
    config: ResolverConfig,
}

impl ChainResolver {
    pub fn new(prober: Arc<dyn ChainActivityProber>, config: ResolverConfig) -> Self {
        Self { prober, config }
    }

    pub fn candidates(&self, family: ChainFamily) -> &[ChainId] {
        self.config.candidates.for_family(family)
    }

    /// 解析地址所属链
    ///
    /// `family` 为 Unknown 或没有候选时返回 `accepted=false`，不发起任何探测。
    pub async fn resolve(&self, address: &str, family: ChainFamily) -> Resolution {
        let address = address.trim();
        let candidates = self.candidates(family);

        if family == ChainFamily::Unknown || candidates.is_empty() {
            crate::metrics::inc_resolution(Decision::Rejected.as_str());
            return Resolution {
                accepted: false,
                family,
                resolved_chain: String::new(),
                selected_chain: None,
                verified: false,
                warnings: Vec::new(),
                candidates: Vec::new(),
            };
        }

        // HTTP 作用域随本次解析结束释放
        let scope = ProbeScope::new(self.config.probe_timeout());
        let deadline = tokio::time::Instant::now() + self.config.resolve_budget();

        let probes = candidates.iter().map(|&chain| {
            let scope = &scope;
            async move {
                match tokio::time::timeout_at(deadline, self.prober.probe(scope, address, chain))
                    .await
                {
                    Ok(stat) => stat,
                    Err(_) => {
                        tracing::warn!(
                            chain = %chain,
                            address = %address,
                            "Chain probe missed the resolve deadline"
                        );
                        ChainCandidateStat::failed(chain)
                    }
                }
            }
        });
        let stats = join_all(probes).await;
        drop(scope);

        let (resolution, decision) = decide(
            family,
            stats,
            self.config.evm_tie_break_default,
            self.config.unreachable_policy,
        );

        crate::metrics::inc_resolution(decision.as_str());
        tracing::info!(
            address = %address,
            family = %family,
            resolved_chain = %resolution.resolved_chain,
            decision = decision.as_str(),
            accepted = resolution.accepted,
            warnings = resolution.warnings.len(),
            "Chain resolved"
        );

        resolution
    }
}

/// 决策策略（纯函数）
///
/// `stats` 的顺序即配置中的候选顺序。
pub fn decide(
    family: ChainFamily,
    stats: Vec<ChainCandidateStat>,
    tie_break_default: ChainId,
    policy: UnreachablePolicy,
) -> (Resolution, Decision) {
    let chains: Vec<ChainId> = stats.iter().map(|s| s.chain).collect();
    let any_succeeded = stats.iter().any(|s| s.probe_succeeded);
    let active: Vec<&ChainCandidateStat> = stats.iter().filter(|s| s.tx_count > 0).collect();

    let mut warnings = Vec::new();
    let mut accepted = true;

    let (resolved_chain, selected_chain, decision) = match active.as_slice() {
        [only] => (
            only.chain.label().to_string(),
            Some(only.chain),
            Decision::SingleActive,
        ),
        [_, _, ..] => {
            let top = active.iter().map(|s| s.tx_count).max().unwrap_or(0);
            let tied: Vec<ChainId> = active
                .iter()
                .filter(|s| s.tx_count == top)
                .map(|s| s.chain)
                .collect();

            if let [winner] = tied.as_slice() {
                let others = active
                    .iter()
                    .filter(|s| s.chain != *winner)
                    .map(|s| format!("{} {}", s.chain, s.tx_count))
                    .collect::<Vec<_>>()
                    .join(", ");
                warnings.push(format!(
                    "Address is active on several networks. Selected {} with the most transactions ({} vs {}). Confirm the network with your counterparty.",
                    winner.label(),
                    top,
                    others
                ));
                (winner.label().to_string(), Some(*winner), Decision::MostActive)
            } else {
                let winner = if tied.contains(&tie_break_default) {
                    tie_break_default
                } else {
                    tied.first().copied().unwrap_or(tie_break_default)
                };
                warnings.push(format!(
                    "Address has equal activity on {}. Defaulted to {}. Confirm the network with your counterparty.",
                    join_symbols(&tied),
                    winner.label()
                ));
                (winner.label().to_string(), Some(winner), Decision::TieBreak)
            }
        }
        [] if any_succeeded => {
            let label = family.inactive_label(&chains);
            let selected = match chains.as_slice() {
                [single] => Some(*single),
                _ => {
                    warnings.push(format!(
                        "No transactions found on {}. This looks like a new wallet and is valid on each of these networks. Confirm the network with your counterparty.",
                        join_symbols(&chains)
                    ));
                    None
                }
            };
            (label, selected, Decision::Inactive)
        }
        [] => {
            warnings.push(
                "Blockchain explorers are unreachable. The address format is valid but the network could not be verified."
                    .to_string(),
            );
            if policy == UnreachablePolicy::FailClosed {
                accepted = false;
            }
            let selected = match chains.as_slice() {
                [single] => Some(*single),
                _ => None,
            };
            (family.unverified_label(&chains), selected, Decision::Unreachable)
        }
    };

    let contracts: Vec<ChainId> = stats
        .iter()
        .filter(|s| s.is_contract)
        .map(|s| s.chain)
        .collect();
    if !contracts.is_empty() {
        warnings.insert(
            0,
            format!(
                "This address is a smart contract on {}. Make sure it can receive and send funds before using it for escrow.",
                join_symbols(&contracts)
            ),
        );
    }

    let resolution = Resolution {
        accepted,
        family,
        resolved_chain,
        selected_chain,
        verified: any_succeeded,
        warnings,
        candidates: stats,
    };

    (resolution, decision)
}

fn join_symbols(chains: &[ChainId]) -> String {
    chains
        .iter()
        .map(|c| c.symbol())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashMap,
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    use async_trait::async_trait;

    use super::*;
    use crate::config::CandidateConfig;

    const EVM_ADDR: &str = "0x742d35cc6634c0532925a3b844bc9e7595f0beb6";

    fn ok(chain: ChainId, tx_count: u64) -> ChainCandidateStat {
        ChainCandidateStat {
            chain,
            tx_count,
            is_contract: false,
            probe_succeeded: true,
            balance: None,
        }
    }

    /// 固定结果探测器，可为单条链设置延迟
    struct ScriptedProber {
        stats: HashMap<ChainId, ChainCandidateStat>,
        delays: HashMap<ChainId, Duration>,
        calls: AtomicUsize,
    }

    impl ScriptedProber {
        fn new(stats: Vec<ChainCandidateStat>) -> Self {
            Self {
                stats: stats.into_iter().map(|s| (s.chain, s)).collect(),
                delays: HashMap::new(),
                calls: AtomicUsize::new(0),
            }
        }

        fn with_delay(mut self, chain: ChainId, delay: Duration) -> Self {
            self.delays.insert(chain, delay);
            self
        }
    }

    #[async_trait]
    impl ChainActivityProber for ScriptedProber {
        async fn probe(
            &self,
            _scope: &ProbeScope,
            _address: &str,
            chain: ChainId,
        ) -> ChainCandidateStat {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delays.get(&chain) {
                tokio::time::sleep(*delay).await;
            }
            self.stats
                .get(&chain)
                .cloned()
                .unwrap_or_else(|| ChainCandidateStat::failed(chain))
        }
    }

    fn resolver_with(prober: Arc<ScriptedProber>, config: ResolverConfig) -> ChainResolver {
        ChainResolver::new(prober, config)
    }

    fn test_config() -> ResolverConfig {
        ResolverConfig {
            probe_timeout_ms: 1_000,
            resolve_budget_ms: 1_000,
            evm_tie_break_default: ChainId::Bsc,
            unreachable_policy: UnreachablePolicy::FailOpen,
            candidates: CandidateConfig {
                evm: vec![ChainId::Eth, ChainId::Bsc],
                tron: vec![ChainId::Tron],
                btc: vec![ChainId::Btc],
                ltc: vec![ChainId::Ltc],
                doge: vec![ChainId::Doge],
                xrp: vec![ChainId::Xrp],
            },
        }
    }

    #[test]
    fn test_single_active_chain_is_accepted() {
        let (res, decision) = decide(
            ChainFamily::Evm,
            vec![ok(ChainId::Eth, 12), ok(ChainId::Bsc, 0)],
            ChainId::Bsc,
            UnreachablePolicy::FailOpen,
        );
        assert_eq!(decision, Decision::SingleActive);
        assert!(res.accepted);
        assert!(res.verified);
        assert_eq!(res.resolved_chain, "ETH (ERC20)");
        assert_eq!(res.selected_chain, Some(ChainId::Eth));
        assert!(res.warnings.is_empty());
    }

    #[test]
    fn test_higher_activity_wins_with_disclosure() {
        let (res, decision) = decide(
            ChainFamily::Evm,
            vec![ok(ChainId::Eth, 40), ok(ChainId::Bsc, 3)],
            ChainId::Bsc,
            UnreachablePolicy::FailOpen,
        );
        assert_eq!(decision, Decision::MostActive);
        assert_eq!(res.selected_chain, Some(ChainId::Eth));
        assert_eq!(res.warnings.len(), 1);
    }

    #[test]
    fn test_tie_break_is_deterministic() {
        for _ in 0..20 {
            let (res, decision) = decide(
                ChainFamily::Evm,
                vec![ok(ChainId::Eth, 7), ok(ChainId::Bsc, 7)],
                ChainId::Bsc,
                UnreachablePolicy::FailOpen,
            );
            assert_eq!(decision, Decision::TieBreak);
            assert_eq!(res.resolved_chain, "USDT (BEP20)");
            assert_eq!(res.warnings.len(), 1);
        }
    }

    #[test]
    fn test_tie_without_default_takes_first_in_order() {
        let (res, _) = decide(
            ChainFamily::Evm,
            vec![
                ok(ChainId::Polygon, 5),
                ok(ChainId::Eth, 5),
                ok(ChainId::Bsc, 1),
            ],
            ChainId::Bsc,
            UnreachablePolicy::FailOpen,
        );
        assert_eq!(res.selected_chain, Some(ChainId::Polygon));
    }

    #[test]
    fn test_all_inactive_evm_gets_generic_label() {
        let (res, decision) = decide(
            ChainFamily::Evm,
            vec![ok(ChainId::Eth, 0), ChainCandidateStat::failed(ChainId::Bsc)],
            ChainId::Bsc,
            UnreachablePolicy::FailOpen,
        );
        assert_eq!(decision, Decision::Inactive);
        assert!(res.accepted);
        assert_eq!(res.resolved_chain, "USDT (BEP20/ERC20)");
        assert_eq!(res.selected_chain, None);
        assert_eq!(res.warnings.len(), 1);
    }

    #[test]
    fn test_inactive_single_candidate_has_no_warning() {
        let (res, _) = decide(
            ChainFamily::Tron,
            vec![ok(ChainId::Tron, 0)],
            ChainId::Bsc,
            UnreachablePolicy::FailOpen,
        );
        assert!(res.accepted);
        assert_eq!(res.resolved_chain, "USDT (TRC20)");
        assert!(res.warnings.is_empty());
    }

    #[test]
    fn test_all_failed_is_fail_open_by_default() {
        let (res, decision) = decide(
            ChainFamily::Evm,
            vec![
                ChainCandidateStat::failed(ChainId::Eth),
                ChainCandidateStat::failed(ChainId::Bsc),
            ],
            ChainId::Bsc,
            UnreachablePolicy::FailOpen,
        );
        assert_eq!(decision, Decision::Unreachable);
        assert!(res.accepted);
        assert!(!res.verified);
        assert_eq!(res.resolved_chain, "EVM (unverified)");
        assert_eq!(res.warnings.len(), 1);

        let (res, _) = decide(
            ChainFamily::Btc,
            vec![ChainCandidateStat::failed(ChainId::Btc)],
            ChainId::Bsc,
            UnreachablePolicy::FailOpen,
        );
        assert!(res.accepted);
        assert_eq!(res.resolved_chain, "BTC");
        assert_eq!(res.warnings.len(), 1);
    }

    #[test]
    fn test_all_failed_fail_closed_rejects() {
        let (res, _) = decide(
            ChainFamily::Evm,
            vec![
                ChainCandidateStat::failed(ChainId::Eth),
                ChainCandidateStat::failed(ChainId::Bsc),
            ],
            ChainId::Bsc,
            UnreachablePolicy::FailClosed,
        );
        assert!(!res.accepted);
        assert_eq!(res.warnings.len(), 1);
    }

    #[test]
    fn test_contract_warning_is_first() {
        let mut eth = ok(ChainId::Eth, 9);
        eth.is_contract = true;
        let (res, _) = decide(
            ChainFamily::Evm,
            vec![eth, ok(ChainId::Bsc, 9)],
            ChainId::Bsc,
            UnreachablePolicy::FailOpen,
        );
        assert_eq!(res.warnings.len(), 2);
        assert!(res.warnings[0].contains("smart contract"));
    }

    #[tokio::test]
    async fn test_resolve_probes_every_candidate() {
        let prober = Arc::new(ScriptedProber::new(vec![
            ok(ChainId::Eth, 0),
            ok(ChainId::Bsc, 3),
        ]));
        let resolver = resolver_with(prober.clone(), test_config());

        let res = resolver.resolve(EVM_ADDR, ChainFamily::Evm).await;

        assert_eq!(prober.calls.load(Ordering::SeqCst), 2);
        assert_eq!(res.resolved_chain, "USDT (BEP20)");
        assert_eq!(res.candidates.len(), 2);
    }

    #[tokio::test]
    async fn test_resolve_unknown_makes_no_probe_calls() {
        let prober = Arc::new(ScriptedProber::new(vec![]));
        let resolver = resolver_with(prober.clone(), test_config());

        let res = resolver.resolve("hello", ChainFamily::Unknown).await;

        assert!(!res.accepted);
        assert_eq!(prober.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_slow_probe_counts_as_failed_at_deadline() {
        let prober = Arc::new(
            ScriptedProber::new(vec![ok(ChainId::Eth, 50), ok(ChainId::Bsc, 2)])
                .with_delay(ChainId::Eth, Duration::from_secs(5)),
        );
        let mut config = test_config();
        config.resolve_budget_ms = 150;
        let resolver = resolver_with(prober, config);

        let started = std::time::Instant::now();
        let res = resolver.resolve(EVM_ADDR, ChainFamily::Evm).await;

        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(res.selected_chain, Some(ChainId::Bsc));
        assert!(!res.candidates[0].probe_succeeded);
    }

    #[tokio::test]
    async fn test_probes_share_one_deadline() {
        // 两个慢探测并发等待，总耗时不应是两倍预算
        let prober = Arc::new(
            ScriptedProber::new(vec![])
                .with_delay(ChainId::Eth, Duration::from_secs(5))
                .with_delay(ChainId::Bsc, Duration::from_secs(5)),
        );
        let mut config = test_config();
        config.resolve_budget_ms = 200;
        let resolver = resolver_with(prober, config);

        let started = std::time::Instant::now();
        let res = resolver.resolve(EVM_ADDR, ChainFamily::Evm).await;

        assert!(started.elapsed() < Duration::from_millis(390));
        assert!(res.accepted);
        assert_eq!(res.resolved_chain, "EVM (unverified)");
    }
}
