//! 字符串工具模块
//! 提供字符串处理相关的工具函数

/// 地址缩写展示：前 `head` 位 + ... + 后 `tail` 位
///
/// 地址长度不足时原样返回。
pub fn short_address(address: &str, head: usize, tail: usize) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= head + tail {
        return address.to_string();
    }
    let prefix: String = chars[..head].iter().collect();
    let suffix: String = chars[chars.len() - tail..].iter().collect();
    format!("{}...{}", prefix, suffix)
}

/// 检查字符串是否为空或只包含空白字符
pub fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}
