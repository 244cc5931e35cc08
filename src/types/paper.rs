use std::path::PathBuf;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// 检索得到的论文元数据
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
pub struct PaperRecord {
    /// 检索时使用的主题/关键词
    pub topic: String,
    pub title: String,
    /// 论文标识，优先DOI，否则为arXiv条目ID
    pub identifier: String,
    #[serde(default)]
    pub doi: Option<String>,
    #[serde(default)]
    pub pdf_url: Option<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub authors: Vec<String>,
    #[serde(default)]
    pub category: Option<String>,
    /// 发布日期（ISO格式）
    pub published: String,
    /// 压缩阶段生成的摘要文件
    #[schemars(skip)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compressed_file: Option<PathBuf>,
}

impl PaperRecord {
    /// 检索失败时使用的占位论文，保证下游阶段至少有一篇论文可用
    pub fn placeholder(keyword: &str) -> Self {
        Self {
            topic: keyword.to_string(),
            title: format!("关于{}的研究论文1", keyword),
            identifier: "placeholder".to_string(),
            doi: None,
            pdf_url: Some("https://example.com/paper1".to_string()),
            abstract_text: format!("这是一篇关于{}的研究论文摘要", keyword),
            authors: vec!["作者1".to_string(), "作者2".to_string()],
            category: None,
            published: "2024-01-01".to_string(),
            compressed_file: None,
        }
    }

    /// 返回附带压缩文件引用的新记录
    pub fn with_compressed_file(self, compressed_file: PathBuf) -> Self {
        Self {
            compressed_file: Some(compressed_file),
            ..self
        }
    }
}
