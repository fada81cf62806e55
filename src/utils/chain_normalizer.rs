//! 链标识符标准化模块
//!
//! 统一配置文件、环境变量、API 请求中的链标识符写法

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::domain::ChainId;

/// 链别名
struct ChainAliases {
    chain: ChainId,
    aliases: &'static [&'static str],
}

/// 链标识符注册表（静态初始化，键为小写）
static CHAIN_REGISTRY: Lazy<HashMap<String, ChainId>> = Lazy::new(|| {
    let chains = vec![
        ChainAliases {
            chain: ChainId::Eth,
            aliases: &["eth", "ethereum", "erc20", "mainnet"],
        },
        ChainAliases {
            chain: ChainId::Bsc,
            aliases: &["bsc", "binance", "bnb", "bep20"],
        },
        ChainAliases {
            chain: ChainId::Polygon,
            aliases: &["polygon", "matic", "pol"],
        },
        ChainAliases {
            chain: ChainId::Tron,
            aliases: &["tron", "trx", "trc20"],
        },
        ChainAliases {
            chain: ChainId::Btc,
            aliases: &["bitcoin", "btc"],
        },
        ChainAliases {
            chain: ChainId::Ltc,
            aliases: &["litecoin", "ltc"],
        },
        ChainAliases {
            chain: ChainId::Doge,
            aliases: &["dogecoin", "doge"],
        },
        ChainAliases {
            chain: ChainId::Xrp,
            aliases: &["ripple", "xrp"],
        },
    ];

    let mut registry = HashMap::new();
    for entry in chains {
        registry.insert(entry.chain.canonical_name().to_string(), entry.chain);
        for alias in entry.aliases {
            registry.insert(alias.to_string(), entry.chain);
        }
        // EVM 链同时接受数字链ID
        if let Some(id) = entry.chain.evm_chain_id() {
            registry.insert(id.to_string(), entry.chain);
        }
    }

    registry
});

/// 标准化链标识符（大小写不敏感）
///
/// ```rust
/// # use oneescrow::utils::chain_normalizer::normalize_chain_identifier;
/// # use oneescrow::domain::ChainId;
/// assert_eq!(normalize_chain_identifier("ETH").unwrap(), ChainId::Eth);
/// assert_eq!(normalize_chain_identifier("56").unwrap(), ChainId::Bsc);
/// ```
pub fn normalize_chain_identifier(input: &str) -> anyhow::Result<ChainId> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        anyhow::bail!("Chain identifier cannot be empty");
    }

    CHAIN_REGISTRY
        .get(&trimmed.to_lowercase())
        .copied()
        .ok_or_else(|| anyhow::anyhow!("Unsupported chain identifier: {}", trimmed))
}

/// 解析逗号分隔的链列表，保持顺序并去重
pub fn parse_chain_list(input: &str) -> anyhow::Result<Vec<ChainId>> {
    let mut chains = Vec::new();
    for part in input.split(',').filter(|p| !p.trim().is_empty()) {
        let chain = normalize_chain_identifier(part)?;
        if !chains.contains(&chain) {
            chains.push(chain);
        }
    }
    Ok(chains)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_ethereum() {
        assert_eq!(normalize_chain_identifier("ETH").unwrap(), ChainId::Eth);
        assert_eq!(normalize_chain_identifier("eth").unwrap(), ChainId::Eth);
        assert_eq!(normalize_chain_identifier("Ethereum").unwrap(), ChainId::Eth);
        assert_eq!(normalize_chain_identifier("1").unwrap(), ChainId::Eth);
    }

    #[test]
    fn test_normalize_bsc() {
        assert_eq!(normalize_chain_identifier("BSC").unwrap(), ChainId::Bsc);
        assert_eq!(normalize_chain_identifier("binance").unwrap(), ChainId::Bsc);
        assert_eq!(normalize_chain_identifier(" BEP20 ").unwrap(), ChainId::Bsc);
        assert_eq!(normalize_chain_identifier("56").unwrap(), ChainId::Bsc);
    }

    #[test]
    fn test_parse_chain_list() {
        assert_eq!(
            parse_chain_list("eth, bsc ,matic,eth").unwrap(),
            vec![ChainId::Eth, ChainId::Bsc, ChainId::Polygon]
        );
        assert!(parse_chain_list("eth,solana").is_err());
        assert!(parse_chain_list("").unwrap().is_empty());
    }

    #[test]
    fn test_invalid_chain() {
        assert!(normalize_chain_identifier("invalid_chain").is_err());
        assert!(normalize_chain_identifier("").is_err());
    }
}
