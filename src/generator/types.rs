use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::PaperRecord;

/// 阶段结果的来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    /// 模型实时生成
    Live,
    /// 生成失败后使用的确定性占位内容
    Stub,
}

/// 单个阶段的输出。创建后不再修改，下一阶段只读取其 payload 与关键词。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageResult<T> {
    pub keyword: String,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub payload: T,
    pub provenance: Provenance,
}

impl<T> StageResult<T> {
    pub fn live(keyword: &str, payload: T) -> Self {
        Self::new(keyword, payload, Provenance::Live)
    }

    pub fn stub(keyword: &str, payload: T) -> Self {
        Self::new(keyword, payload, Provenance::Stub)
    }

    fn new(keyword: &str, payload: T, provenance: Provenance) -> Self {
        Self {
            keyword: keyword.to_string(),
            timestamp: Utc::now(),
            payload,
            provenance,
        }
    }

    pub fn is_stub(&self) -> bool {
        self.provenance == Provenance::Stub
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchPayload {
    pub papers: Vec<PaperRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactsPayload {
    pub facts: String,
    pub source_papers_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HypothesisPayload {
    pub hypotheses: String,
    pub based_on_facts: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdeaPayload {
    pub research_idea: String,
    pub based_on_hypothesis: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicalPayload {
    pub optimized_idea: String,
    pub optimization_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoaPayload {
    pub moa_result: String,
    pub optimization_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalPlanPayload {
    pub final_research_plan: String,
    pub optimization_complete: bool,
}

/// 运行状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Processing,
    Completed,
    Failed,
}

/// 一次完整运行的结果，序列化后即保存的JSON文件内容
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchResult {
    pub keyword: String,
    pub search_paper_num: usize,
    pub started_at: DateTime<Utc>,
    pub status: RunStatus,
    pub papers_found: Option<usize>,
    pub search: Option<StageResult<SearchPayload>>,
    pub facts_extraction: Option<StageResult<FactsPayload>>,
    pub hypothesis_generation: Option<StageResult<HypothesisPayload>>,
    pub initial_idea: Option<StageResult<IdeaPayload>>,
    pub technical_optimization: Option<StageResult<TechnicalPayload>>,
    pub moa_optimization: Option<StageResult<MoaPayload>>,
    pub human_ai_collaboration: Option<StageResult<FinalPlanPayload>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub output_file: Option<String>,
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_at: Option<DateTime<Utc>>,
}

impl ResearchResult {
    pub fn new(keyword: &str, search_paper_num: usize) -> Self {
        Self {
            keyword: keyword.to_string(),
            search_paper_num,
            started_at: Utc::now(),
            status: RunStatus::Processing,
            papers_found: None,
            search: None,
            facts_extraction: None,
            hypothesis_generation: None,
            initial_idea: None,
            technical_optimization: None,
            moa_optimization: None,
            human_ai_collaboration: None,
            completed_at: None,
            output_file: None,
            error: None,
            failed_at: None,
        }
    }

    /// 标记为失败，已完成的阶段结果不保留
    pub fn failed(keyword: &str, search_paper_num: usize, error: String) -> Self {
        Self {
            status: RunStatus::Failed,
            error: Some(error),
            failed_at: Some(Utc::now()),
            ..Self::new(keyword, search_paper_num)
        }
    }

    /// 按阶段顺序列出每个阶段是否为占位结果
    pub fn stub_flags(&self) -> Vec<(&'static str, Option<bool>)> {
        vec![
            ("search", self.search.as_ref().map(StageResult::is_stub)),
            (
                "facts_extraction",
                self.facts_extraction.as_ref().map(StageResult::is_stub),
            ),
            (
                "hypothesis_generation",
                self.hypothesis_generation.as_ref().map(StageResult::is_stub),
            ),
            ("initial_idea", self.initial_idea.as_ref().map(StageResult::is_stub)),
            (
                "technical_optimization",
                self.technical_optimization.as_ref().map(StageResult::is_stub),
            ),
            (
                "moa_optimization",
                self.moa_optimization.as_ref().map(StageResult::is_stub),
            ),
            (
                "human_ai_collaboration",
                self.human_ai_collaboration.as_ref().map(StageResult::is_stub),
            ),
        ]
    }

    /// 最终研究方案文本
    pub fn final_plan(&self) -> Option<&str> {
        self.human_ai_collaboration
            .as_ref()
            .map(|r| r.payload.final_research_plan.as_str())
    }
}
