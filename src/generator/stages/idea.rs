use async_trait::async_trait;

use super::ResearchStage;
use crate::generator::types::{HypothesisPayload, IdeaPayload};

/// 把假设发展为可执行的研究想法
pub struct InitialIdea;

#[async_trait]
impl ResearchStage for InitialIdea {
    type Input = HypothesisPayload;
    type Output = IdeaPayload;

    fn name(&self) -> &'static str {
        "初始想法生成"
    }

    fn system_prompt(&self) -> &'static str {
        "你是一名天文学课题设计专家，擅长把科学假设转化为具体的研究方案。"
    }

    async fn user_prompt(&self, keyword: &str, hypothesis: &HypothesisPayload) -> String {
        format!(
            r#"基于以下研究假设，发展具体的研究想法和实施方案：

关键词: {}
研究假设: {}

请提供：
1. 详细的研究方案
2. 实验设计思路
3. 数据收集策略
4. 分析方法选择
5. 预期结果和影响

确保方案具有可操作性和创新性。"#,
            keyword, hypothesis.hypotheses
        )
    }

    fn from_generation(&self, text: String, _hypothesis: &HypothesisPayload) -> IdeaPayload {
        IdeaPayload {
            research_idea: text,
            based_on_hypothesis: true,
        }
    }

    fn stub(&self, keyword: &str, _hypothesis: &HypothesisPayload) -> IdeaPayload {
        IdeaPayload {
            research_idea: format!("基于假设生成的关键词'{}'研究想法", keyword),
            based_on_hypothesis: true,
        }
    }
}
