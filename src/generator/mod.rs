//! 研究计划生成：阶段定义、阶段结果类型与流程驱动

pub mod stages;
pub mod types;
pub mod workflow;

pub use types::{Provenance, ResearchResult, RunStatus, StageResult};
pub use workflow::{ResearchPlanGenerator, launch};
