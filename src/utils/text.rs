//! 文本处理工具

use std::sync::LazyLock;

use regex::Regex;

static NUMBER_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\d+\. ").expect("static regex"));

/// 按字符数截断文本，保证不会截断在UTF-8字符中间
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// 移除每行开头形如 `1. ` 的编号
pub fn remove_number_prefix(paragraph: &str) -> String {
    NUMBER_PREFIX.replace_all(paragraph, "").into_owned()
}

/// 提取markdown中 `## {section}` 标题下、下一个 `##` 之前的内容
pub fn extract_section(content: &str, section: &str) -> Option<String> {
    let marker = format!("## {}", section);
    let (_, rest) = content.split_once(&marker)?;
    let body = rest.split("##").next().unwrap_or_default().trim();
    if body.is_empty() {
        None
    } else {
        Some(body.to_string())
    }
}

/// 去掉模型回复外层的 ```json 代码块包裹
pub fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_suffix("```").unwrap_or(inner);
    // 去掉语言标记行
    match inner.split_once('\n') {
        Some((lang, body)) if !lang.trim().contains(['{', '[']) => body.trim(),
        _ => inner.trim(),
    }
}
