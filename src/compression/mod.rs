//! 论文压缩：下载PDF → 转换为文本 → 由模型压缩 → 写入 `{title}_compressed.md`

use std::path::PathBuf;
use std::sync::Arc;

use crate::acquisition::PdfAcquirer;
use crate::llm::TextGenerator;
use crate::types::PaperRecord;
use crate::utils::text::truncate_chars;
use crate::utils::{read_text_file, sanitize_file_name};

pub mod converter;

pub use converter::DocumentConverter;

const COMPRESSION_SYSTEM_PROMPT: &str =
    "You are a helpful assistant for academic paper compression.";

fn compression_prompt(content: &str) -> String {
    format!(
        r#"请将下面的学术论文压缩为一份结构化摘要，保留：
1. 研究问题与动机
2. 使用的数据、方法与关键参数
3. 主要结论及其数值结果
4. 作者指出的局限与未来工作

输出markdown，不要编造原文没有的信息。

论文全文：
{}"#,
        content
    )
}

pub struct PaperCompressor {
    acquirer: Arc<PdfAcquirer>,
    converter: Arc<dyn DocumentConverter>,
    generator: Arc<dyn TextGenerator>,
    max_chars: usize,
}

impl PaperCompressor {
    pub fn new(
        acquirer: Arc<PdfAcquirer>,
        converter: Arc<dyn DocumentConverter>,
        generator: Arc<dyn TextGenerator>,
        max_chars: usize,
    ) -> Self {
        Self {
            acquirer,
            converter,
            generator,
            max_chars,
        }
    }

    /// 压缩一篇论文，任一步骤失败都返回None
    pub async fn compress(&self, identifier: &str, title: &str, topic: &str) -> Option<PathBuf> {
        tracing::info!(title, "📦 开始压缩论文");

        let Some(pdf) = self
            .acquirer
            .acquire_all(identifier, title, topic)
            .await
            .into_iter()
            .next()
        else {
            tracing::warn!(title, "PDF下载失败");
            return None;
        };

        let topic_dir = self
            .acquirer
            .download_root()
            .join(sanitize_file_name(topic));

        let Some(converted) = self.converter.convert(&pdf, &topic_dir).await else {
            tracing::warn!(title, "PDF转换失败");
            return None;
        };

        let content = match read_text_file(&converted).await {
            Some(content) if !content.trim().is_empty() => content,
            _ => {
                tracing::warn!(title, "读取转换结果失败");
                return None;
            }
        };

        let input = truncate_chars(&content, self.max_chars);
        let compressed = match self
            .generator
            .generate(COMPRESSION_SYSTEM_PROMPT, &compression_prompt(input))
            .await
        {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => {
                tracing::warn!(title, "模型返回了空的压缩结果");
                return None;
            }
            Err(e) => {
                tracing::error!(title, error = %e, "调用模型压缩论文失败");
                return None;
            }
        };

        let output = topic_dir.join(format!("{}_compressed.md", sanitize_file_name(title)));
        if let Err(e) = tokio::fs::write(&output, compressed).await {
            tracing::error!(path = %output.display(), error = %e, "保存压缩结果失败");
            return None;
        }

        tracing::info!(path = %output.display(), "✅ 论文压缩完成");
        Some(output)
    }

    /// 压缩并返回附带 `compressed_file` 的新记录；失败时原样返回
    pub async fn compress_record(&self, paper: PaperRecord) -> PaperRecord {
        match self
            .compress(&paper.identifier, &paper.title, &paper.topic)
            .await
        {
            Some(path) => paper.with_compressed_file(path),
            None => paper,
        }
    }
}

#[cfg(test)]
mod tests;
