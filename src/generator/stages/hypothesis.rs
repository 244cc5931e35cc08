use async_trait::async_trait;

use super::ResearchStage;
use crate::generator::types::{FactsPayload, HypothesisPayload};

pub struct HypothesisGeneration;

#[async_trait]
impl ResearchStage for HypothesisGeneration {
    type Input = FactsPayload;
    type Output = HypothesisPayload;

    fn name(&self) -> &'static str {
        "假设生成"
    }

    fn system_prompt(&self) -> &'static str {
        "你是一名富有创造力且严谨的天文学研究者，负责提出可检验的科学假设。"
    }

    async fn user_prompt(&self, keyword: &str, facts: &FactsPayload) -> String {
        format!(
            r#"基于以下事实信息和研究背景，生成创新的研究假设：

关键词: {}
事实信息: {}

请生成：
1. 3-5个具体的研究假设
2. 每个假设的理论依据
3. 假设的可验证性分析
4. 预期的研究意义

确保假设具有创新性、可行性和科学价值。"#,
            keyword, facts.facts
        )
    }

    fn from_generation(&self, text: String, _facts: &FactsPayload) -> HypothesisPayload {
        HypothesisPayload {
            hypotheses: text,
            based_on_facts: true,
        }
    }

    fn stub(&self, keyword: &str, _facts: &FactsPayload) -> HypothesisPayload {
        HypothesisPayload {
            hypotheses: format!("基于关键词'{}'生成的研究假设", keyword),
            based_on_facts: true,
        }
    }
}
