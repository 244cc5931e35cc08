use async_trait::async_trait;

use super::ResearchStage;
use crate::generator::types::{FinalPlanPayload, MoaPayload};

/// 人机协作定稿，输出最终研究方案
pub struct HumanAiCollaboration;

#[async_trait]
impl ResearchStage for HumanAiCollaboration {
    type Input = MoaPayload;
    type Output = FinalPlanPayload;

    fn name(&self) -> &'static str {
        "人机协作优化"
    }

    fn system_prompt(&self) -> &'static str {
        "你是一名资深科研项目负责人，负责把多方意见整合为完整、可执行的研究计划。"
    }

    async fn user_prompt(&self, keyword: &str, moa: &MoaPayload) -> String {
        format!(
            r#"对以下MoA优化后的研究方案进行最终的人机协作优化：

关键词: {}
MoA优化结果: {}

请提供：
1. 最终的研究方案
2. 实施时间表
3. 资源需求分析
4. 风险评估和应对策略
5. 预期成果和影响

确保方案的完整性和可执行性。"#,
            keyword, moa.moa_result
        )
    }

    fn from_generation(&self, text: String, _moa: &MoaPayload) -> FinalPlanPayload {
        FinalPlanPayload {
            final_research_plan: text,
            optimization_complete: true,
        }
    }

    fn stub(&self, keyword: &str, _moa: &MoaPayload) -> FinalPlanPayload {
        FinalPlanPayload {
            final_research_plan: format!("人机协作优化后的关键词'{}'最终研究方案", keyword),
            optimization_complete: true,
        }
    }
}
