//! 地址格式识别模块
//!
//! 按固定顺序匹配正则，返回第一个命中的地址族。纯函数，不访问网络。
//! 未命中返回 `ChainFamily::Unknown`，由调用方在解析前拒绝。

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::ChainFamily;

const BASE58: &str = "[1-9A-HJ-NP-Za-km-z]";
const BECH32: &str = "[02-9ac-hj-np-z]";

/// 地址族正则（顺序即优先级）
static FAMILY_PATTERNS: Lazy<Vec<(ChainFamily, Vec<Regex>)>> = Lazy::new(|| {
    let compile = |patterns: &[String]| -> Vec<Regex> {
        patterns
            .iter()
            .filter_map(|p| match Regex::new(p) {
                Ok(re) => Some(re),
                Err(e) => {
                    tracing::error!(pattern = %p, error = %e, "Invalid address pattern");
                    None
                }
            })
            .collect()
    };

    vec![
        (ChainFamily::Evm, compile(&["^0x[0-9a-fA-F]{40}$".to_string()])),
        (
            ChainFamily::Tron,
            compile(&[format!("^T{}{{33}}$", BASE58)]),
        ),
        (
            ChainFamily::Btc,
            compile(&[
                // Legacy P2PKH / P2SH
                format!("^[13]{}{{25,34}}$", BASE58),
                // Bech32 SegWit v0
                format!("^bc1q{}{{38,58}}$", BECH32),
                // Bech32m Taproot
                format!("^bc1p{}{{58}}$", BECH32),
            ]),
        ),
        (
            ChainFamily::Ltc,
            compile(&[
                format!("^[LM3]{}{{26,33}}$", BASE58),
                format!("^ltc1{}{{39,59}}$", BECH32),
            ]),
        ),
        (
            ChainFamily::Doge,
            compile(&[format!("^D[5-9A-HJ-NP-U]{}{{32}}$", BASE58)]),
        ),
        (
            ChainFamily::Xrp,
            compile(&[format!("^r{}{{24,34}}$", BASE58)]),
        ),
    ]
});

/// 识别地址族
pub fn detect(raw_address: &str) -> ChainFamily {
    let address = raw_address.trim();

    FAMILY_PATTERNS
        .iter()
        .find(|(_, patterns)| patterns.iter().any(|re| re.is_match(address)))
        .map(|(family, _)| *family)
        .unwrap_or(ChainFamily::Unknown)
}

/// 返回所有命中的地址族（用于校验各族正则互斥）
pub fn matching_families(raw_address: &str) -> Vec<ChainFamily> {
    let address = raw_address.trim();

    FAMILY_PATTERNS
        .iter()
        .filter(|(_, patterns)| patterns.iter().any(|re| re.is_match(address)))
        .map(|(family, _)| *family)
        .collect()
}

/// 验证EIP-55 Checksum
/// https://eips.ethereum.org/EIPS/eip-55
///
/// 全小写或全大写地址不携带校验信息，视为通过。
pub fn eip55_checksum_ok(address: &str) -> bool {
    use sha3::{Digest, Keccak256};

    let address = address.trim();
    let Some(hex_chars) = address.strip_prefix("0x") else {
        return false;
    };
    if hex_chars.len() != 40 || !hex_chars.chars().all(|c| c.is_ascii_hexdigit()) {
        return false;
    }

    let has_lower = hex_chars.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = hex_chars.chars().any(|c| c.is_ascii_uppercase());
    if !(has_lower && has_upper) {
        return true;
    }

    let addr_lower = hex_chars.to_lowercase();
    let mut hasher = Keccak256::new();
    hasher.update(addr_lower.as_bytes());
    let hash = hasher.finalize();

    for (i, ch) in hex_chars.chars().enumerate() {
        if ch.is_ascii_alphabetic() {
            let hash_byte = hash[i / 2];
            let hash_nibble = if i % 2 == 0 {
                hash_byte >> 4
            } else {
                hash_byte & 0x0f
            };

            let should_be_uppercase = hash_nibble >= 8;
            if ch.is_ascii_uppercase() != should_be_uppercase {
                return false;
            }
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, Rng, SeedableRng};

    use super::*;

    const BASE58_ALPHABET: &[u8] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";
    const BECH32_ALPHABET: &[u8] = b"qpzry9x8gf2tvdw0s3jn54khce6mua7l";
    const HEX_ALPHABET: &[u8] = b"0123456789abcdefABCDEF";

    fn random_from(rng: &mut StdRng, alphabet: &[u8], len: usize) -> String {
        (0..len)
            .map(|_| alphabet[rng.gen_range(0..alphabet.len())] as char)
            .collect()
    }

    fn generate(rng: &mut StdRng, family: ChainFamily) -> String {
        match family {
            ChainFamily::Evm => format!("0x{}", random_from(rng, HEX_ALPHABET, 40)),
            ChainFamily::Tron => format!("T{}", random_from(rng, BASE58_ALPHABET, 33)),
            ChainFamily::Btc => match rng.gen_range(0..3) {
                0 => {
                    // '3' 前缀与 LTC 重叠，单独在 test_ltc_p2sh_prefix_resolves_to_btc 覆盖
                    let len = rng.gen_range(25..=34);
                    format!("1{}", random_from(rng, BASE58_ALPHABET, len))
                }
                1 => {
                    let len = rng.gen_range(38..=58);
                    format!("bc1q{}", random_from(rng, BECH32_ALPHABET, len))
                }
                _ => format!("bc1p{}", random_from(rng, BECH32_ALPHABET, 58)),
            },
            ChainFamily::Ltc => {
                if rng.gen_bool(0.5) {
                    // '3' 前缀与 BTC P2SH 重叠，按优先级归 BTC，这里只生成 L/M
                    let prefix = if rng.gen_bool(0.5) { 'L' } else { 'M' };
                    let len = rng.gen_range(26..=33);
                    format!("{}{}", prefix, random_from(rng, BASE58_ALPHABET, len))
                } else {
                    let len = rng.gen_range(39..=59);
                    format!("ltc1{}", random_from(rng, BECH32_ALPHABET, len))
                }
            }
            ChainFamily::Doge => format!(
                "D{}{}",
                random_from(rng, b"56789ABCDEFGHJKLMNPQRSTU", 1),
                random_from(rng, BASE58_ALPHABET, 32)
            ),
            ChainFamily::Xrp => {
                let len = rng.gen_range(24..=34);
                format!("r{}", random_from(rng, BASE58_ALPHABET, len))
            }
            ChainFamily::Unknown => random_from(rng, b"-_.!not-an-address", 12),
        }
    }

    #[test]
    fn test_detect_known_addresses() {
        assert_eq!(
            detect("0x742d35cc6634c0532925a3b844bc9e7595f0beb6"),
            ChainFamily::Evm
        );
        assert_eq!(
            detect("TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t"),
            ChainFamily::Tron
        );
        assert_eq!(detect("1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa"), ChainFamily::Btc);
        assert_eq!(detect("3J98t1WpEZ73CNmYviecrnyiWrnqRhWNLy"), ChainFamily::Btc);
        assert_eq!(
            detect("bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq"),
            ChainFamily::Btc
        );
        assert_eq!(
            detect("bc1p5d7rjq7g6rdk2yhzks9smlaqtedr4dekq08ge8ztwac72sfr9rusxg3297"),
            ChainFamily::Btc
        );
        assert_eq!(detect("LaMT348PWRnrqeeWArpwQPbuanpXDZGEUz"), ChainFamily::Ltc);
        assert_eq!(
            detect("ltc1qg82tjkz7a9gvsxgdwq4x5rzr5t8ys0n8ghnqvm"),
            ChainFamily::Ltc
        );
        assert_eq!(detect("DH5yaieqoZN36fDVciNyRueRGvGLR3mr7L"), ChainFamily::Doge);
        assert_eq!(detect("rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh"), ChainFamily::Xrp);
    }

    #[test]
    fn test_detect_trims_whitespace() {
        assert_eq!(
            detect("  0x742d35cc6634c0532925a3b844bc9e7595f0beb6\n"),
            ChainFamily::Evm
        );
    }

    #[test]
    fn test_detect_unknown() {
        assert_eq!(detect("not-an-address"), ChainFamily::Unknown);
        assert_eq!(detect(""), ChainFamily::Unknown);
        assert_eq!(detect("0x123"), ChainFamily::Unknown);
        // 非十六进制字符
        assert_eq!(
            detect("0xGGGG35Cc6634C0532925a3b844Bc9e7595f0bEb6"),
            ChainFamily::Unknown
        );
        // 含歧义字符 0/O/I/l
        assert_eq!(detect("1A1zP1eP5QGefi2DMPTfTL5SLmv7Divf0O"), ChainFamily::Unknown);
        // 大小写敏感：大写前缀不识别
        assert_eq!(
            detect("BC1QAR0SRRR7XFKVY5L643LYDNW9RE59GTZZWF5MDQ"),
            ChainFamily::Unknown
        );
    }

    #[test]
    fn test_ltc_p2sh_prefix_resolves_to_btc() {
        // '3' 前缀两族皆可，按顺序归 BTC
        let addr = "3J98t1WpEZ73CNmYviecrnyiWrnqRhWNLy";
        assert_eq!(
            matching_families(addr),
            vec![ChainFamily::Btc, ChainFamily::Ltc]
        );
        assert_eq!(detect(addr), ChainFamily::Btc);
    }

    #[test]
    fn test_detect_is_idempotent() {
        let mut rng = StdRng::seed_from_u64(7);
        for family in ChainFamily::KNOWN.iter().chain([ChainFamily::Unknown].iter()) {
            for _ in 0..50 {
                let addr = generate(&mut rng, *family);
                assert_eq!(detect(&addr), detect(&addr));
            }
        }
    }

    #[test]
    fn test_family_patterns_are_mutually_exclusive() {
        let mut rng = StdRng::seed_from_u64(42);
        for family in ChainFamily::KNOWN {
            for _ in 0..500 {
                let addr = generate(&mut rng, family);
                let matches = matching_families(&addr);
                assert_eq!(
                    matches,
                    vec![family],
                    "address {} generated for {} matched {:?}",
                    addr,
                    family,
                    matches
                );
            }
        }
    }

    #[test]
    fn test_eip55_checksum() {
        // EIP-55 官方示例
        assert!(eip55_checksum_ok("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"));
        assert!(eip55_checksum_ok("0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359"));
        // 全小写不携带校验
        assert!(eip55_checksum_ok("0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed"));
        // 改动一位大小写
        assert!(!eip55_checksum_ok("0x5AAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"));
        assert!(!eip55_checksum_ok("not-an-address"));
    }
}
