//! 研究计划生成的各个阶段

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use crate::generator::types::StageResult;
use crate::i18n::TargetLanguage;
use crate::llm::TextGenerator;

pub mod collaboration;
pub mod facts;
pub mod hypothesis;
pub mod idea;
pub mod moa;
pub mod technical;

pub use collaboration::HumanAiCollaboration;
pub use facts::FactExtraction;
pub use hypothesis::HypothesisGeneration;
pub use idea::InitialIdea;
pub use moa::MoaOptimization;
pub use technical::TechnicalOptimization;

/// 各阶段共享的生成能力
#[derive(Clone)]
pub struct StageContext {
    pub generator: Arc<dyn TextGenerator>,
    pub target_language: TargetLanguage,
}

impl StageContext {
    pub fn new(generator: Arc<dyn TextGenerator>, target_language: TargetLanguage) -> Self {
        Self {
            generator,
            target_language,
        }
    }

    /// 在系统提示词后追加语言要求
    pub fn system_prompt(&self, base: &str) -> String {
        format!("{}\n\n{}", base, self.target_language.prompt_instruction())
    }
}

/// 流水线中的一个阶段：只消费上一阶段的 payload 与关键词。
/// 生成失败或返回空文本时，降级为确定性的占位结果。
#[async_trait]
pub trait ResearchStage: Send + Sync {
    type Input: Send + Sync;
    type Output: Send + Sync;

    /// 阶段名称，用于日志
    fn name(&self) -> &'static str;

    fn system_prompt(&self) -> &'static str;

    async fn user_prompt(&self, keyword: &str, input: &Self::Input) -> String;

    fn from_generation(&self, text: String, input: &Self::Input) -> Self::Output;

    fn stub(&self, keyword: &str, input: &Self::Input) -> Self::Output;

    /// 默认单次调用生成；需要多次调用的阶段可以重写
    async fn generate(
        &self,
        context: &StageContext,
        keyword: &str,
        input: &Self::Input,
    ) -> Result<String> {
        let system_prompt = context.system_prompt(self.system_prompt());
        let user_prompt = self.user_prompt(keyword, input).await;
        context.generator.generate(&system_prompt, &user_prompt).await
    }

    async fn execute(
        &self,
        context: &StageContext,
        keyword: &str,
        input: &Self::Input,
    ) -> StageResult<Self::Output> {
        tracing::info!(stage = self.name(), "🚀 开始执行阶段");
        match self.generate(context, keyword, input).await {
            Ok(text) if !text.trim().is_empty() => {
                tracing::info!(stage = self.name(), "✅ 阶段执行完成");
                StageResult::live(keyword, self.from_generation(text, input))
            }
            Ok(_) => {
                tracing::warn!(stage = self.name(), "⚠️ 模型返回空内容，使用占位结果");
                StageResult::stub(keyword, self.stub(keyword, input))
            }
            Err(e) => {
                tracing::error!(stage = self.name(), error = %e, "❌ 阶段生成失败，使用占位结果");
                StageResult::stub(keyword, self.stub(keyword, input))
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::sync::Mutex;

    /// 记录每次调用，按调用序号决定成功或失败
    pub struct SequenceGenerator {
        pub replies: Mutex<Vec<Result<String, String>>>,
        pub calls: Mutex<Vec<(String, String)>>,
    }

    impl SequenceGenerator {
        pub fn new(replies: Vec<Result<&str, &str>>) -> Self {
            Self {
                replies: Mutex::new(
                    replies
                        .into_iter()
                        .rev()
                        .map(|r| r.map(str::to_string).map_err(str::to_string))
                        .collect(),
                ),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl TextGenerator for SequenceGenerator {
        async fn generate(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
            self.calls
                .lock()
                .unwrap()
                .push((system_prompt.to_string(), user_prompt.to_string()));
            match self.replies.lock().unwrap().pop() {
                Some(Ok(text)) => Ok(text),
                Some(Err(e)) => Err(anyhow::anyhow!(e)),
                None => Err(anyhow::anyhow!("no more replies")),
            }
        }
    }

    pub fn context(generator: Arc<SequenceGenerator>) -> StageContext {
        StageContext::new(generator, TargetLanguage::Chinese)
    }
}
