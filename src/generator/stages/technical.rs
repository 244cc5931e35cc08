use async_trait::async_trait;

use super::ResearchStage;
use crate::generator::types::{IdeaPayload, TechnicalPayload};

pub struct TechnicalOptimization;

#[async_trait]
impl ResearchStage for TechnicalOptimization {
    type Input = IdeaPayload;
    type Output = TechnicalPayload;

    fn name(&self) -> &'static str {
        "技术优化"
    }

    fn system_prompt(&self) -> &'static str {
        "你是一名熟悉天文观测设备、数据处理管线与机器学习方法的技术专家。"
    }

    async fn user_prompt(&self, keyword: &str, idea: &IdeaPayload) -> String {
        format!(
            r#"对以下研究想法进行技术层面的优化和改进：

关键词: {}
研究想法: {}

请从以下角度优化：
1. 技术可行性分析
2. 方法学改进建议
3. 工具和技术选择
4. 实施难点和解决方案
5. 质量控制措施

提供具体的技术改进方案。"#,
            keyword, idea.research_idea
        )
    }

    fn from_generation(&self, text: String, _idea: &IdeaPayload) -> TechnicalPayload {
        TechnicalPayload {
            optimized_idea: text,
            optimization_type: "technical".to_string(),
        }
    }

    fn stub(&self, keyword: &str, _idea: &IdeaPayload) -> TechnicalPayload {
        TechnicalPayload {
            optimized_idea: format!("技术优化后的关键词'{}'研究方案", keyword),
            optimization_type: "technical".to_string(),
        }
    }
}
