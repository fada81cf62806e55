//! 链与地址族定义
//!
//! 地址族（ChainFamily）是格式层面的粗分类，具体链（ChainId）是探测与落库的最终归属。
//! EVM 地址在 ETH / BSC / Polygon 上格式完全相同，需要靠链上活动消歧。

use std::fmt;

use serde::{Deserialize, Serialize};

/// 地址族（粗分类）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChainFamily {
    Evm,
    Tron,
    Btc,
    Ltc,
    Doge,
    Xrp,
    Unknown,
}

impl ChainFamily {
    /// 全部已知地址族（不含 Unknown），顺序即格式识别优先级
    pub const KNOWN: [ChainFamily; 6] = [
        ChainFamily::Evm,
        ChainFamily::Tron,
        ChainFamily::Btc,
        ChainFamily::Ltc,
        ChainFamily::Doge,
        ChainFamily::Xrp,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChainFamily::Evm => "EVM",
            ChainFamily::Tron => "TRON",
            ChainFamily::Btc => "BTC",
            ChainFamily::Ltc => "LTC",
            ChainFamily::Doge => "DOGE",
            ChainFamily::Xrp => "XRP",
            ChainFamily::Unknown => "UNKNOWN",
        }
    }

    /// 默认候选链集合
    pub fn default_candidates(&self) -> Vec<ChainId> {
        match self {
            ChainFamily::Evm => vec![ChainId::Eth, ChainId::Bsc],
            ChainFamily::Tron => vec![ChainId::Tron],
            ChainFamily::Btc => vec![ChainId::Btc],
            ChainFamily::Ltc => vec![ChainId::Ltc],
            ChainFamily::Doge => vec![ChainId::Doge],
            ChainFamily::Xrp => vec![ChainId::Xrp],
            ChainFamily::Unknown => Vec::new(),
        }
    }

    /// 全部候选都没有活动时使用的标签
    ///
    /// 多候选族（EVM）不猜测具体链，返回通用标签；单候选族直接返回链标签。
    pub fn inactive_label(&self, candidates: &[ChainId]) -> String {
        match candidates {
            [single] => single.label().to_string(),
            _ if *self == ChainFamily::Evm => EVM_NEW_WALLET_LABEL.to_string(),
            _ => candidates
                .iter()
                .map(|c| c.symbol())
                .collect::<Vec<_>>()
                .join("/"),
        }
    }

    /// 全部探测失败时使用的标签
    pub fn unverified_label(&self, candidates: &[ChainId]) -> String {
        match candidates {
            [single] => single.label().to_string(),
            _ if *self == ChainFamily::Evm => EVM_UNVERIFIED_LABEL.to_string(),
            _ => format!("{} (unverified)", self.as_str()),
        }
    }
}

impl fmt::Display for ChainFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// EVM 新钱包（双链均无活动）通用标签
pub const EVM_NEW_WALLET_LABEL: &str = "USDT (BEP20/ERC20)";
/// EVM 网络不可达时的标签
pub const EVM_UNVERIFIED_LABEL: &str = "EVM (unverified)";

/// 具体链
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainId {
    Eth,
    Bsc,
    Polygon,
    Tron,
    Btc,
    Ltc,
    Doge,
    Xrp,
}

impl ChainId {
    pub const ALL: [ChainId; 8] = [
        ChainId::Eth,
        ChainId::Bsc,
        ChainId::Polygon,
        ChainId::Tron,
        ChainId::Btc,
        ChainId::Ltc,
        ChainId::Doge,
        ChainId::Xrp,
    ];

    /// 规范名称（小写，与 chain_normalizer 对齐）
    pub fn canonical_name(&self) -> &'static str {
        match self {
            ChainId::Eth => "ethereum",
            ChainId::Bsc => "bsc",
            ChainId::Polygon => "polygon",
            ChainId::Tron => "tron",
            ChainId::Btc => "bitcoin",
            ChainId::Ltc => "litecoin",
            ChainId::Doge => "dogecoin",
            ChainId::Xrp => "ripple",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            ChainId::Eth => "ETH",
            ChainId::Bsc => "BSC",
            ChainId::Polygon => "POLYGON",
            ChainId::Tron => "TRX",
            ChainId::Btc => "BTC",
            ChainId::Ltc => "LTC",
            ChainId::Doge => "DOGE",
            ChainId::Xrp => "XRP",
        }
    }

    /// 面向用户的链标签
    pub fn label(&self) -> &'static str {
        match self {
            ChainId::Eth => "ETH (ERC20)",
            ChainId::Bsc => "USDT (BEP20)",
            ChainId::Polygon => "USDT (Polygon)",
            ChainId::Tron => "USDT (TRC20)",
            ChainId::Btc => "BTC",
            ChainId::Ltc => "LTC",
            ChainId::Doge => "DOGE",
            ChainId::Xrp => "XRP",
        }
    }

    pub fn family(&self) -> ChainFamily {
        match self {
            ChainId::Eth | ChainId::Bsc | ChainId::Polygon => ChainFamily::Evm,
            ChainId::Tron => ChainFamily::Tron,
            ChainId::Btc => ChainFamily::Btc,
            ChainId::Ltc => ChainFamily::Ltc,
            ChainId::Doge => ChainFamily::Doge,
            ChainId::Xrp => ChainFamily::Xrp,
        }
    }

    /// EIP-155 链ID（仅 EVM）
    pub fn evm_chain_id(&self) -> Option<u64> {
        match self {
            ChainId::Eth => Some(1),
            ChainId::Bsc => Some(56),
            ChainId::Polygon => Some(137),
            _ => None,
        }
    }

    /// 区块浏览器地址页
    pub fn explorer_url(&self, address: &str) -> String {
        match self {
            ChainId::Eth => format!("https://etherscan.io/address/{}", address),
            ChainId::Bsc => format!("https://bscscan.com/address/{}", address),
            ChainId::Polygon => format!("https://polygonscan.com/address/{}", address),
            ChainId::Tron => format!("https://tronscan.org/#/address/{}", address),
            ChainId::Btc => format!("https://blockchain.com/explorer/addresses/btc/{}", address),
            ChainId::Ltc => format!("https://blockchair.com/litecoin/address/{}", address),
            ChainId::Doge => format!("https://blockchair.com/dogecoin/address/{}", address),
            ChainId::Xrp => format!("https://xrpscan.com/account/{}", address),
        }
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_chain_belongs_to_its_default_family() {
        for chain in ChainId::ALL {
            if chain == ChainId::Polygon {
                // Polygon 默认不在候选集中，需配置开启
                assert_eq!(chain.family(), ChainFamily::Evm);
                continue;
            }
            assert!(chain.family().default_candidates().contains(&chain));
        }
    }

    #[test]
    fn test_labels() {
        assert_eq!(ChainId::Eth.label(), "ETH (ERC20)");
        assert_eq!(ChainId::Bsc.label(), "USDT (BEP20)");
        assert_eq!(ChainId::Tron.label(), "USDT (TRC20)");
        assert_eq!(
            ChainFamily::Evm.inactive_label(&[ChainId::Eth, ChainId::Bsc]),
            EVM_NEW_WALLET_LABEL
        );
        assert_eq!(ChainFamily::Tron.inactive_label(&[ChainId::Tron]), "USDT (TRC20)");
        assert_eq!(ChainFamily::Btc.unverified_label(&[ChainId::Btc]), "BTC");
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(serde_json::to_string(&ChainFamily::Evm).unwrap(), "\"EVM\"");
        assert_eq!(serde_json::to_string(&ChainId::Bsc).unwrap(), "\"bsc\"");
    }
}
