//! 多智能体（Mixture of Agents）优化：多个视角分别提出改进意见，再由聚合者整合

use anyhow::{Result, bail};
use async_trait::async_trait;

use super::{ResearchStage, StageContext};
use crate::generator::types::{MoaPayload, TechnicalPayload};

const AGGREGATOR_SYSTEM_PROMPT: &str =
    "你是研究方案的总编辑，需要综合多位专家的意见，输出一份统一、自洽的优化方案。";

pub struct MoaOptimization {
    perspectives: Vec<String>,
}

impl MoaOptimization {
    pub fn new(perspectives: Vec<String>) -> Self {
        Self { perspectives }
    }

    fn proposer_system_prompt(perspective: &str) -> String {
        format!("你是一名{}，请从你的专业视角审视并改进研究方案。", perspective)
    }

    fn aggregator_prompt(keyword: &str, idea: &str, proposals: &[(String, String)]) -> String {
        let mut prompt = format!("关键词: {}\n\n## 待优化的研究方案\n{}\n\n", keyword, idea);
        if proposals.is_empty() {
            prompt.push_str("请从理论、观测与数据分析等角度直接优化上述方案，输出优化后的完整研究方案。");
            return prompt;
        }
        prompt.push_str("## 专家意见\n");
        for (perspective, proposal) in proposals {
            prompt.push_str(&format!("### {}\n{}\n\n", perspective, proposal));
        }
        prompt.push_str("请整合上述意见，保留各方的有效建议并消除冲突，输出优化后的完整研究方案。");
        prompt
    }
}

#[async_trait]
impl ResearchStage for MoaOptimization {
    type Input = TechnicalPayload;
    type Output = MoaPayload;

    fn name(&self) -> &'static str {
        "MoA优化"
    }

    fn system_prompt(&self) -> &'static str {
        AGGREGATOR_SYSTEM_PROMPT
    }

    async fn user_prompt(&self, keyword: &str, technical: &TechnicalPayload) -> String {
        format!(
            r#"关键词: {}
研究方案: {}

请指出该方案最值得改进的3个方面，并给出具体的修改建议。"#,
            keyword, technical.optimized_idea
        )
    }

    /// 依次调用每个视角，失败的视角跳过；没有任何意见时整个阶段失败。
    /// 未配置视角时只调用一次聚合者。
    async fn generate(
        &self,
        context: &StageContext,
        keyword: &str,
        technical: &TechnicalPayload,
    ) -> Result<String> {
        if self.perspectives.is_empty() {
            tracing::warn!("未配置MoA视角，直接由聚合者优化");
            return context
                .generator
                .generate(
                    &context.system_prompt(AGGREGATOR_SYSTEM_PROMPT),
                    &Self::aggregator_prompt(keyword, &technical.optimized_idea, &[]),
                )
                .await;
        }

        let proposer_prompt = self.user_prompt(keyword, technical).await;

        let mut proposals = Vec::new();
        for perspective in &self.perspectives {
            let system_prompt = context.system_prompt(&Self::proposer_system_prompt(perspective));
            match context
                .generator
                .generate(&system_prompt, &proposer_prompt)
                .await
            {
                Ok(text) if !text.trim().is_empty() => {
                    tracing::debug!(perspective = %perspective, "MoA视角意见生成完成");
                    proposals.push((perspective.clone(), text));
                }
                Ok(_) => tracing::warn!(perspective = %perspective, "MoA视角返回空内容，跳过"),
                Err(e) => {
                    tracing::warn!(perspective = %perspective, error = %e, "MoA视角生成失败，跳过")
                }
            }
        }

        if proposals.is_empty() {
            bail!("所有MoA视角均未生成有效意见");
        }
        tracing::info!(
            proposals = proposals.len(),
            total = self.perspectives.len(),
            "🤝 聚合MoA意见"
        );

        context
            .generator
            .generate(
                &context.system_prompt(AGGREGATOR_SYSTEM_PROMPT),
                &Self::aggregator_prompt(keyword, &technical.optimized_idea, &proposals),
            )
            .await
    }

    fn from_generation(&self, text: String, _technical: &TechnicalPayload) -> MoaPayload {
        MoaPayload {
            moa_result: text,
            optimization_type: "moa".to_string(),
        }
    }

    fn stub(&self, keyword: &str, _technical: &TechnicalPayload) -> MoaPayload {
        MoaPayload {
            moa_result: format!("MoA优化后的关键词'{}'研究方案", keyword),
            optimization_type: "moa".to_string(),
        }
    }
}
