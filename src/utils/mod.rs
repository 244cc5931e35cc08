pub mod text;

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

static ILLEGAL_PATH_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[<>:"/\\|?*]"#).expect("static regex"));

/// 清理后名称的最大字节数，为 `.pdf`、`_compressed.md` 等后缀留出余量（文件名上限255字节）
pub const MAX_FILE_STEM_BYTES: usize = 200;

/// 清理文件/文件夹名称：非法字符替换为下划线，超长部分在字符边界处截断
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned = ILLEGAL_PATH_CHARS.replace_all(name, "_");
    let mut end = cleaned.len().min(MAX_FILE_STEM_BYTES);
    while !cleaned.is_char_boundary(end) {
        end -= 1;
    }
    cleaned[..end].to_string()
}

/// 读取文本文件，失败时返回None
pub async fn read_text_file(path: &Path) -> Option<String> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Some(content),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "读取文件时发生错误");
            None
        }
    }
}

/// 从panic负载中取出消息文本
pub fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_replaces_every_illegal_char() {
        assert_eq!(
            sanitize_file_name(r#"a<b>c:d"e/f\g|h?i*j"#),
            "a_b_c_d_e_f_g_h_i_j"
        );
    }

    #[test]
    fn test_sanitize_keeps_regular_titles() {
        let title = "Pulsar Candidates Classification with Deep CNNs (2019)";
        assert_eq!(sanitize_file_name(title), title);
    }

    #[test]
    fn test_sanitize_caps_long_titles_on_char_boundary() {
        let title = "脉冲星".repeat(40);
        let cleaned = sanitize_file_name(&title);
        // 每个汉字3字节，200字节内最多66个
        assert_eq!(cleaned.len(), 198);
        assert_eq!(cleaned.chars().count(), 66);
        assert!(title.starts_with(&cleaned));

        let ascii = "a".repeat(300);
        assert_eq!(sanitize_file_name(&ascii).len(), MAX_FILE_STEM_BYTES);
    }

    #[test]
    fn test_sanitize_doi_like_names() {
        assert_eq!(
            sanitize_file_name("10.1088/1674-4527/19/9/133"),
            "10.1088_1674-4527_19_9_133"
        );
    }
}
