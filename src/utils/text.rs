//! 文本工具模块
//!
//! 题源返回的题干经常带 HTML 标签和杂乱空白，
//! 去重键和日志显示都依赖这里的清洗函数

use std::sync::OnceLock;

use regex::Regex;

/// 去除 HTML 标签并整理空白
///
/// # 参数
/// - `html`: 可能含标签的原始文本
///
/// # 返回
/// 纯文本，连续空白折叠为单个空格
pub fn strip_html(html: &str) -> String {
    static TAG_RE: OnceLock<Regex> = OnceLock::new();
    let re = TAG_RE.get_or_init(|| Regex::new(r"<[^>]+>").expect("标签正则非法"));

    let text = re.replace_all(html, " ");
    let text = text
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'");

    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 规范化文本用于去重比较
///
/// 小写化、去掉非字母数字字符、折叠空白——
/// 让"近似相同"的题干落到同一个去重键上
pub fn normalize_for_dedup(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_html() {
        let html = "<p>Find <b>x</b> if&nbsp;2x = 10</p>";
        assert_eq!(strip_html(html), "Find x if 2x = 10");
    }

    #[test]
    fn test_normalize_for_dedup_merges_near_identical() {
        let a = normalize_for_dedup("Find the value of X, if 2x = 10.");
        let b = normalize_for_dedup("find the value of x if 2x = 10");
        assert_eq!(a, b);
    }

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("short", 10), "short");
        assert_eq!(truncate_text("abcdefghij", 4), "abcd...");
    }
}
