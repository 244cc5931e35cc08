//! 关键词/实体相关性打分：模型给出的重要性与知识图谱中的出现频次加权组合

use anyhow::Result;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod neo4j;

pub use neo4j::Neo4jHttpOracle;

const WEIGHT_IMPORTANCE: f64 = 0.4;
const WEIGHT_COUNT: f64 = 0.6;
/// 批次内所有频次相同时使用的归一化值
const DEGENERATE_NORMALIZED_COUNT: f64 = 0.5;

/// 模型抽取出的候选实体
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct EntityCandidate {
    /// 实体名称
    pub entity: String,
    /// 重要性，0到1之间
    pub importance_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredEntity {
    pub entity: String,
    pub importance_score: f64,
    pub count: u64,
    pub composite_score: f64,
}

/// 外部结构化频次来源
#[async_trait]
pub trait StructuralOracle: Send + Sync {
    /// 实体在图谱中的出现频次，未收录时为0
    async fn count(&self, entity: &str) -> Result<u64>;
}

#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("查询实体 '{entity}' 的图谱频次失败: {message}")]
    Oracle { entity: String, message: String },
}

fn clamp_importance(score: f64) -> f64 {
    if score.is_nan() { 0.0 } else { score.clamp(0.0, 1.0) }
}

/// 计算综合得分并按得分稳定降序排列
pub fn rank(entities: Vec<(EntityCandidate, u64)>) -> Vec<ScoredEntity> {
    let Some(min_count) = entities.iter().map(|(_, c)| *c).min() else {
        return Vec::new();
    };
    let max_count = entities.iter().map(|(_, c)| *c).max().unwrap_or(min_count);

    let mut scored: Vec<ScoredEntity> = entities
        .into_iter()
        .map(|(candidate, count)| {
            let normalized = if max_count == min_count {
                DEGENERATE_NORMALIZED_COUNT
            } else {
                (count - min_count) as f64 / (max_count - min_count) as f64
            };
            let importance = clamp_importance(candidate.importance_score);
            ScoredEntity {
                entity: candidate.entity,
                importance_score: importance,
                count,
                composite_score: importance * WEIGHT_IMPORTANCE + normalized * WEIGHT_COUNT,
            }
        })
        .collect();

    // sort_by 是稳定排序，得分相同时保持输入顺序
    scored.sort_by(|a, b| b.composite_score.total_cmp(&a.composite_score));
    scored
}

/// 查询每个实体的频次并排序。图谱查询失败直接返回错误，不做降级。
pub async fn score(
    oracle: &dyn StructuralOracle,
    entities: Vec<EntityCandidate>,
) -> Result<Vec<ScoredEntity>, ScoringError> {
    tracing::info!(count = entities.len(), "计算关键词得分");

    let mut with_counts = Vec::with_capacity(entities.len());
    for candidate in entities {
        let count = oracle
            .count(&candidate.entity)
            .await
            .map_err(|e| ScoringError::Oracle {
                entity: candidate.entity.clone(),
                message: e.to_string(),
            })?;
        with_counts.push((candidate, count));
    }

    let ranked = rank(with_counts);
    tracing::debug!(?ranked, "关键词得分计算完成");
    Ok(ranked)
}
