//! 文本生成能力：流水线各阶段只依赖 [`TextGenerator`]，具体模型由 [`client::LLMClient`] 提供

use anyhow::Result;
use async_trait::async_trait;
use schemars::{JsonSchema, schema_for};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::utils::text::strip_code_fence;

pub mod client;

/// 根据提示词生成文本
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// 自由文本生成
    async fn generate(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;

    /// 要求模型只输出JSON
    async fn generate_json(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let system_prompt = format!(
            "{}\n\n只输出一个合法的JSON值，不要输出任何解释、前后缀或markdown代码块。",
            system_prompt
        );
        self.generate(&system_prompt, user_prompt).await
    }
}

/// 结构化输出失败
#[derive(Debug, Error)]
pub enum StructuredOutputError {
    #[error(transparent)]
    Generation(#[from] anyhow::Error),

    #[error("模型输出无法解析为 {target}: {source}")]
    Parse {
        target: &'static str,
        raw: String,
        #[source]
        source: serde_json::Error,
    },
}

/// 生成并严格解析为类型 `T`。`T` 的JSON Schema会附加在系统提示词之后。
pub async fn generate_structured<T>(
    generator: &dyn TextGenerator,
    system_prompt: &str,
    user_prompt: &str,
) -> Result<T, StructuredOutputError>
where
    T: JsonSchema + DeserializeOwned,
{
    let schema = schema_for!(T);
    let schema_text = serde_json::to_string_pretty(&schema).unwrap_or_default();
    let system_prompt = format!(
        "{}\n\n输出必须符合以下JSON Schema：\n{}",
        system_prompt, schema_text
    );

    let raw = generator.generate_json(&system_prompt, user_prompt).await?;
    serde_json::from_str::<T>(strip_code_fence(&raw)).map_err(|source| {
        StructuredOutputError::Parse {
            target: std::any::type_name::<T>(),
            raw,
            source,
        }
    })
}
