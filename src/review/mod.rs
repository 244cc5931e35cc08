//! 草稿审阅辅助：章节抽取、实体抽取与打分、相关关键词、相关论文检索与审阅意见

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::compression::PaperCompressor;
use crate::config::Config;
use crate::generator::workflow::{build_compressor, connect};
use crate::llm::{StructuredOutputError, TextGenerator, generate_structured};
use crate::scoring::{
    self, EntityCandidate, Neo4jHttpOracle, ScoredEntity, ScoringError, StructuralOracle,
};
use crate::search::{ArxivSearchEngine, SourceAdapter};
use crate::types::PaperRecord;
use crate::utils::read_text_file;
use crate::utils::text::{extract_section, remove_number_prefix};

/// 审阅草稿时检索的相关论文数量
pub const REVIEW_PAPER_COUNT: usize = 3;

const ENTITY_SYSTEM_PROMPT: &str = "You are a helpful assistant for entity extraction.";
const TECH_ENTITY_SYSTEM_PROMPT: &str =
    "You are a helpful assistant for extracting technical entities.";
const KEYWORD_SYSTEM_PROMPT: &str = "You are a helpful assistant.";
const REVIEW_SYSTEM_PROMPT: &str = "You are a helpful assistant for academic review.";

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("无法读取草稿文件: {0}")]
    Unreadable(String),

    #[error("草稿中没有找到章节 '{0}'")]
    SectionNotFound(String),

    #[error(transparent)]
    Scoring(#[from] ScoringError),
}

/// 单个章节的审阅结果
#[derive(Debug, Clone, Serialize)]
pub struct MessageReview {
    pub message: String,
    pub entities: Vec<EntityCandidate>,
    pub scored_keywords: Vec<ScoredEntity>,
    pub related_keywords: Vec<String>,
}

fn entity_prompt(message: &str) -> String {
    format!(
        r#"从下面的研究内容中抽取最能代表其研究主题的实体（天体、观测设备、物理过程、方法、数据集等），
并为每个实体给出0到1之间的重要性评分。

研究内容：
{}"#,
        message
    )
}

fn technical_entity_prompt(message: &str) -> String {
    format!(
        r#"从下面的研究内容中抽取所有技术实体（算法、模型、软件、仪器、数据处理流程），
以字符串数组输出。

研究内容：
{}"#,
        message
    )
}

fn related_keyword_prompt(keyword: &str) -> String {
    format!(
        "给出与关键词 \"{}\" 密切相关、适合用于文献检索的5个英文关键词，以字符串数组输出。",
        keyword
    )
}

fn review_prompt(topic: &str, draft: &str, related_papers: &str) -> String {
    format!(
        r#"你是一名天文学领域的审稿人。请结合相关文献，审阅下面关于 "{}" 的研究草稿，指出：
1. 创新性与已有工作的重叠
2. 方法和数据上的漏洞
3. 可行性风险
4. 具体的修改建议

## 研究草稿
{}

## 相关文献
{}"#,
        topic, draft, related_papers
    )
}

/// 读取文件中指定章节并去掉编号前缀
pub async fn extract_message(file: &Path, section: &str) -> Option<String> {
    let content = read_text_file(file).await?;
    extract_section(&content, section).map(|body| remove_number_prefix(&body))
}

pub struct ReviewAssistant {
    generator: Arc<dyn TextGenerator>,
    oracle: Arc<dyn StructuralOracle>,
    adapter: Arc<SourceAdapter>,
    compressor: Option<Arc<PaperCompressor>>,
}

impl ReviewAssistant {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        oracle: Arc<dyn StructuralOracle>,
        adapter: Arc<SourceAdapter>,
        compressor: Option<Arc<PaperCompressor>>,
    ) -> Self {
        Self {
            generator,
            oracle,
            adapter,
            compressor,
        }
    }

    /// 结构化抽取实体；模型输出无法解析时返回空列表
    pub async fn extract_entities(&self, message: &str) -> Vec<EntityCandidate> {
        match generate_structured::<Vec<EntityCandidate>>(
            self.generator.as_ref(),
            ENTITY_SYSTEM_PROMPT,
            &entity_prompt(message),
        )
        .await
        {
            Ok(entities) => entities,
            Err(StructuredOutputError::Parse { raw, source, .. }) => {
                tracing::warn!(error = %source, raw = %raw, "解析实体列表失败");
                Vec::new()
            }
            Err(e) => {
                tracing::error!(error = %e, "实体抽取失败");
                Vec::new()
            }
        }
    }

    pub async fn extract_technical_entities(&self, message: &str) -> Vec<String> {
        match generate_structured::<Vec<String>>(
            self.generator.as_ref(),
            TECH_ENTITY_SYSTEM_PROMPT,
            &technical_entity_prompt(message),
        )
        .await
        {
            Ok(entities) => entities,
            Err(e) => {
                tracing::warn!(error = %e, "解析技术实体时发生错误");
                Vec::new()
            }
        }
    }

    /// 为关键词生成相关检索词
    pub async fn related_keywords(&self, keyword: &str) -> Vec<String> {
        match generate_structured::<Vec<String>>(
            self.generator.as_ref(),
            KEYWORD_SYSTEM_PROMPT,
            &related_keyword_prompt(keyword),
        )
        .await
        {
            Ok(keywords) => keywords
                .into_iter()
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
                .collect(),
            Err(e) => {
                tracing::warn!(keyword, error = %e, "生成相关关键词失败");
                Vec::new()
            }
        }
    }

    /// 抽取章节 → 实体打分 → 为得分最高的实体生成相关关键词。
    /// 图谱查询失败会直接返回错误。
    pub async fn extract_message_review(
        &self,
        file: &Path,
        section: &str,
    ) -> Result<MessageReview, ReviewError> {
        if !file.is_file() {
            return Err(ReviewError::Unreadable(file.display().to_string()));
        }
        let message = extract_message(file, section)
            .await
            .ok_or_else(|| ReviewError::SectionNotFound(section.to_string()))?;

        let entities = self.extract_entities(&message).await;
        let scored_keywords = scoring::score(self.oracle.as_ref(), entities.clone()).await?;

        let related_keywords = match scored_keywords.first() {
            Some(top) => self.related_keywords(&top.entity).await,
            None => Vec::new(),
        };

        tracing::info!(
            section,
            entities = entities.len(),
            related = related_keywords.len(),
            "✅ 章节审阅信息提取完成"
        );
        Ok(MessageReview {
            message,
            entities,
            scored_keywords,
            related_keywords,
        })
    }

    /// 检索相关论文；`compression` 为真时压缩同时具有DOI和标题的论文
    pub async fn search_related_papers(
        &self,
        topic: &str,
        max_papers: usize,
        compression: bool,
    ) -> Vec<PaperRecord> {
        let papers = match self.adapter.search_with_defaults(topic, max_papers).await {
            Ok(papers) => papers,
            Err(e) => {
                tracing::error!(topic, error = %e, "检索相关论文失败");
                return Vec::new();
            }
        };

        let Some(compressor) = self.compressor.as_ref().filter(|_| compression) else {
            return papers;
        };

        let mut result = Vec::with_capacity(papers.len());
        for paper in papers {
            if paper.doi.is_some() && !paper.title.trim().is_empty() {
                result.push(compressor.compress_record(paper).await);
            } else {
                result.push(paper);
            }
        }
        result
    }

    /// 结合相关文献给出草稿审阅意见
    pub async fn review_draft(&self, topic: &str, draft: &str) -> Result<String> {
        tracing::info!(topic, "🔍 开始审阅草稿");
        let papers = self
            .search_related_papers(topic, REVIEW_PAPER_COUNT, true)
            .await;

        let papers_info: String = papers
            .iter()
            .map(|p| format!("Title: {}\nAbstract: {}\n\n", p.title, p.abstract_text))
            .collect();

        let review = self
            .generator
            .generate(REVIEW_SYSTEM_PROMPT, &review_prompt(topic, draft, &papers_info))
            .await?;
        tracing::info!(topic, "✅ 草稿审阅完成");
        Ok(review)
    }
}

/// 使用配置中的检索、图谱与压缩组件构建审阅助手
pub async fn build_assistant(config: &Config) -> Result<ReviewAssistant> {
    let client = connect(config).await?;
    let engine = ArxivSearchEngine::new(
        config.search.api_base_url.clone(),
        Duration::from_secs(config.search.timeout_seconds),
    )?;
    let adapter = Arc::new(SourceAdapter::new(Arc::new(engine), config.search.clone()));
    let oracle = Arc::new(Neo4jHttpOracle::new(&config.scoring)?);
    let compressor = Arc::new(build_compressor(config, client.clone())?);

    Ok(ReviewAssistant::new(client, oracle, adapter, Some(compressor)))
}

/// 审阅草稿文件
pub async fn launch_review(config: &Config, topic: &str, draft_path: &Path) -> Result<String> {
    let draft = tokio::fs::read_to_string(draft_path)
        .await
        .with_context(|| format!("无法读取草稿文件 {}", draft_path.display()))?;

    build_assistant(config).await?.review_draft(topic, &draft).await
}

/// 抽取草稿中指定章节的实体，经图谱词频打分后给出相关关键词
pub async fn launch_message_review(
    config: &Config,
    draft_path: &Path,
    section: &str,
) -> Result<MessageReview> {
    let review = build_assistant(config)
        .await?
        .extract_message_review(draft_path, section)
        .await?;
    Ok(review)
}
