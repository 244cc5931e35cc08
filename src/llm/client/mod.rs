//! LLM客户端 - 基于rig的多Provider文本生成

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

use crate::config::LLMConfig;
use crate::llm::TextGenerator;

mod providers;
pub mod utils;

use providers::ProviderClient;
use utils::evaluate_befitting_model;

/// LLM客户端
#[derive(Clone)]
pub struct LLMClient {
    config: LLMConfig,
    client: ProviderClient,
}

impl LLMClient {
    /// 创建新的LLM客户端
    pub fn new(config: LLMConfig) -> Result<Self> {
        let client = ProviderClient::new(&config)
            .with_context(|| format!("无法创建 {} 客户端", config.provider))?;
        Ok(Self { client, config })
    }

    /// 检查模型连接是否正常
    pub async fn check_connection(&self) -> Result<()> {
        tracing::info!("🔄 正在检查模型连接...");
        match self
            .prompt("You are a helpful assistant.", "Hello")
            .await
        {
            Ok(_) => {
                tracing::info!("✅ 模型连接正常");
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "❌ 模型连接失败");
                Err(e)
            }
        }
    }

    /// 固定间隔的重试
    async fn retry_with_backoff<T, F, Fut>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_retries = self.config.retry_attempts.max(1);
        let mut retries = 0;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(err) => {
                    retries += 1;
                    tracing::warn!(
                        attempt = retries,
                        max = max_retries,
                        error = %err,
                        "❌ 调用模型服务出错，重试中"
                    );
                    if retries >= max_retries {
                        return Err(err);
                    }
                    tokio::time::sleep(Duration::from_millis(self.config.retry_delay_ms)).await;
                }
            }
        }
    }

    /// 使用指定模型进行单轮对话
    async fn prompt_with_model(
        &self,
        model: &str,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String> {
        let agent = self
            .client
            .create_agent(model, system_prompt, &self.config)?;
        let timeout = Duration::from_secs(self.config.timeout_seconds);

        self.retry_with_backoff(|| async {
            tokio::time::timeout(timeout, agent.prompt(user_prompt))
                .await
                .with_context(|| format!("模型 {} 响应超时", model))?
        })
        .await
    }

    /// 单轮对话，首选模型多次失败后切换到兜底模型
    pub async fn prompt(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let (befitting_model, fallover_model) =
            evaluate_befitting_model(&self.config, system_prompt, user_prompt);

        match self
            .prompt_with_model(&befitting_model, system_prompt, user_prompt)
            .await
        {
            Ok(reply) => Ok(reply),
            Err(e) => match fallover_model {
                Some(model) => {
                    tracing::warn!(
                        model = %model,
                        error = %e,
                        "❌ 尝试 {} 次均失败，使用备选模型",
                        self.config.retry_attempts
                    );
                    self.prompt_with_model(&model, system_prompt, user_prompt)
                        .await
                }
                None => Err(e),
            },
        }
    }
}

#[async_trait]
impl TextGenerator for LLMClient {
    async fn generate(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        self.prompt(system_prompt, user_prompt).await
    }
}
