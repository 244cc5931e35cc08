use anyhow::{Context, Result};
use chrono::Utc;
use futures::FutureExt;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::acquisition::PdfAcquirer;
use crate::compression::{PaperCompressor, converter};
use crate::config::Config;
use crate::generator::stages::{
    FactExtraction, HumanAiCollaboration, HypothesisGeneration, InitialIdea, MoaOptimization,
    ResearchStage, StageContext, TechnicalOptimization,
};
use crate::generator::types::{ResearchResult, RunStatus, SearchPayload, StageResult};
use crate::llm::TextGenerator;
use crate::llm::client::LLMClient;
use crate::search::{ArxivSearchEngine, SourceAdapter};
use crate::types::PaperRecord;
use crate::utils::{panic_message, sanitize_file_name};

/// 时间跟踪作用域
pub struct TimingScope {
    start_time: Instant,
    phase_start_times: HashMap<&'static str, Instant>,
    phase_durations: Vec<(&'static str, Duration)>,
}

impl Default for TimingScope {
    fn default() -> Self {
        Self::new()
    }
}

impl TimingScope {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            phase_start_times: HashMap::new(),
            phase_durations: Vec::new(),
        }
    }

    /// 开始一个新的阶段计时
    pub fn start_phase(&mut self, phase_name: &'static str) {
        self.phase_start_times.insert(phase_name, Instant::now());
    }

    /// 结束一个阶段的计时
    pub fn end_phase(&mut self, phase_name: &'static str) -> Option<Duration> {
        let start_time = self.phase_start_times.remove(phase_name)?;
        let duration = start_time.elapsed();
        self.phase_durations.push((phase_name, duration));
        Some(duration)
    }

    pub fn phase_durations(&self) -> &[(&'static str, Duration)] {
        &self.phase_durations
    }

    /// 获取格式化的执行时间报告
    pub fn generate_timing_report(&self) -> String {
        let mut report = format!(
            "总执行时间: {:.2}秒\n",
            self.start_time.elapsed().as_secs_f64()
        );

        if !self.phase_durations.is_empty() {
            report.push_str("\n各阶段执行时间:\n");
            for (phase, duration) in &self.phase_durations {
                report.push_str(&format!("- {}: {:.3}秒\n", phase, duration.as_secs_f64()));
            }
        }

        report
    }
}

/// 时间跟踪常量
pub struct TimingKeys;

impl TimingKeys {
    pub const SEARCH: &'static str = "search";
    pub const COMPRESSION: &'static str = "compression";
    pub const FACTS: &'static str = "facts_extraction";
    pub const HYPOTHESIS: &'static str = "hypothesis_generation";
    pub const IDEA: &'static str = "initial_idea";
    pub const TECHNICAL: &'static str = "technical_optimization";
    pub const MOA: &'static str = "moa_optimization";
    pub const COLLABORATION: &'static str = "human_ai_collaboration";
}

/// 进度回调：(百分比, 说明)
pub type ProgressFn = Arc<dyn Fn(u8, &'static str) + Send + Sync>;

/// 研究计划生成器：检索 → 七个阶段依次执行 → 保存结果
pub struct ResearchPlanGenerator {
    stage_context: StageContext,
    adapter: Arc<SourceAdapter>,
    compressor: Option<Arc<PaperCompressor>>,
    moa_perspectives: Vec<String>,
    output_path: PathBuf,
}

impl ResearchPlanGenerator {
    pub fn new(
        stage_context: StageContext,
        adapter: Arc<SourceAdapter>,
        compressor: Option<Arc<PaperCompressor>>,
        moa_perspectives: Vec<String>,
        output_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            stage_context,
            adapter,
            compressor,
            moa_perspectives,
            output_path: output_path.into(),
        }
    }

    /// 按配置组装检索引擎、可选的论文压缩与各阶段
    pub fn from_config(config: &Config, generator: Arc<dyn TextGenerator>) -> Result<Self> {
        let engine = ArxivSearchEngine::new(
            config.search.api_base_url.clone(),
            Duration::from_secs(config.search.timeout_seconds),
        )?;
        let adapter = Arc::new(SourceAdapter::new(Arc::new(engine), config.search.clone()));

        let compressor = if config.pipeline.compress_papers {
            Some(Arc::new(build_compressor(config, generator.clone())?))
        } else {
            None
        };

        Ok(Self::new(
            StageContext::new(generator, config.target_language),
            adapter,
            compressor,
            config.pipeline.moa_perspectives.clone(),
            config.output_path.clone(),
        ))
    }

    pub async fn run(&self, keyword: &str, search_paper_num: usize) -> ResearchResult {
        self.run_with_progress(keyword, search_paper_num, None).await
    }

    /// 执行一次完整流程。阶段内部的失败会降级为占位结果，
    /// 只有逃逸出阶段处理的panic才会使状态变为 `failed`。
    pub async fn run_with_progress(
        &self,
        keyword: &str,
        search_paper_num: usize,
        progress: Option<ProgressFn>,
    ) -> ResearchResult {
        tracing::info!(keyword, search_paper_num, "🚀 开始执行研究计划生成流程");

        let outcome = AssertUnwindSafe(self.run_stages(keyword, search_paper_num, progress))
            .catch_unwind()
            .await;

        let mut result = match outcome {
            Ok(result) => result,
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                tracing::error!(keyword, panic = %message, "主流程执行异常");
                return ResearchResult::failed(keyword, search_paper_num, message);
            }
        };

        match self.save(&result).await {
            Ok(path) => result.output_file = Some(path.display().to_string()),
            Err(e) => tracing::warn!(error = %e, "保存结果文件失败"),
        }
        result
    }

    async fn run_stages(
        &self,
        keyword: &str,
        search_paper_num: usize,
        progress: Option<ProgressFn>,
    ) -> ResearchResult {
        let report = |percent: u8, status: &'static str| {
            if let Some(progress) = &progress {
                progress(percent, status);
            }
        };
        let context = &self.stage_context;
        let mut timing = TimingScope::new();
        let mut result = ResearchResult::new(keyword, search_paper_num);

        report(10, "开始搜索相关论文...");
        tracing::info!("步骤1: 搜索相关论文");
        timing.start_phase(TimingKeys::SEARCH);
        let mut search = self.search(keyword, search_paper_num).await;
        timing.end_phase(TimingKeys::SEARCH);

        if let Some(compressor) = &self.compressor {
            timing.start_phase(TimingKeys::COMPRESSION);
            search = Self::compress_papers(compressor, search).await;
            timing.end_phase(TimingKeys::COMPRESSION);
        }
        result.papers_found = Some(search.payload.papers.len());
        tracing::info!(count = search.payload.papers.len(), "找到相关论文");
        report(20, "正在提取事实信息...");

        tracing::info!("步骤2: 事实信息提取");
        timing.start_phase(TimingKeys::FACTS);
        let facts = FactExtraction::default()
            .execute(context, keyword, &search.payload.papers)
            .await;
        timing.end_phase(TimingKeys::FACTS);
        report(30, "正在生成研究假设...");

        tracing::info!("步骤3: 假设生成");
        timing.start_phase(TimingKeys::HYPOTHESIS);
        let hypothesis = HypothesisGeneration
            .execute(context, keyword, &facts.payload)
            .await;
        timing.end_phase(TimingKeys::HYPOTHESIS);

        tracing::info!("步骤4: 初始想法生成");
        timing.start_phase(TimingKeys::IDEA);
        let idea = InitialIdea.execute(context, keyword, &hypothesis.payload).await;
        timing.end_phase(TimingKeys::IDEA);

        tracing::info!("步骤5: 技术优化");
        timing.start_phase(TimingKeys::TECHNICAL);
        let technical = TechnicalOptimization
            .execute(context, keyword, &idea.payload)
            .await;
        timing.end_phase(TimingKeys::TECHNICAL);

        tracing::info!("步骤6: MoA优化");
        timing.start_phase(TimingKeys::MOA);
        let moa = MoaOptimization::new(self.moa_perspectives.clone())
            .execute(context, keyword, &technical.payload)
            .await;
        timing.end_phase(TimingKeys::MOA);

        tracing::info!("步骤7: 人机协作优化");
        timing.start_phase(TimingKeys::COLLABORATION);
        let final_plan = HumanAiCollaboration
            .execute(context, keyword, &moa.payload)
            .await;
        timing.end_phase(TimingKeys::COLLABORATION);
        report(90, "完成研究计划生成");

        result.search = Some(search);
        result.facts_extraction = Some(facts);
        result.hypothesis_generation = Some(hypothesis);
        result.initial_idea = Some(idea);
        result.technical_optimization = Some(technical);
        result.moa_optimization = Some(moa);
        result.human_ai_collaboration = Some(final_plan);
        result.completed_at = Some(Utc::now());
        result.status = RunStatus::Completed;

        tracing::info!("✅ 研究计划生成流程完成\n{}", timing.generate_timing_report());
        result
    }

    /// 检索失败时使用一篇占位论文，结果标记为占位
    async fn search(&self, keyword: &str, search_paper_num: usize) -> StageResult<SearchPayload> {
        match self
            .adapter
            .search_with_defaults(keyword, search_paper_num)
            .await
        {
            Ok(papers) => StageResult::live(keyword, SearchPayload { papers }),
            Err(e) => {
                tracing::error!(keyword, error = %e, "论文搜索失败，使用占位论文");
                StageResult::stub(
                    keyword,
                    SearchPayload {
                        papers: vec![PaperRecord::placeholder(keyword)],
                    },
                )
            }
        }
    }

    async fn compress_papers(
        compressor: &PaperCompressor,
        search: StageResult<SearchPayload>,
    ) -> StageResult<SearchPayload> {
        let StageResult {
            keyword,
            timestamp,
            payload,
            provenance,
        } = search;

        let mut papers = Vec::with_capacity(payload.papers.len());
        for paper in payload.papers {
            papers.push(compressor.compress_record(paper).await);
        }
        tracing::info!(
            compressed = papers.iter().filter(|p| p.compressed_file.is_some()).count(),
            total = papers.len(),
            "📦 论文压缩完成"
        );

        StageResult {
            keyword,
            timestamp,
            payload: SearchPayload { papers },
            provenance,
        }
    }

    async fn save(&self, result: &ResearchResult) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.output_path)
            .await
            .with_context(|| format!("无法创建输出目录 {}", self.output_path.display()))?;
        let path = result_file_path(&self.output_path, &result.keyword);
        let json = serde_json::to_string_pretty(result)?;
        tokio::fs::write(&path, json)
            .await
            .with_context(|| format!("无法写入 {}", path.display()))?;
        tracing::info!(path = %path.display(), "💾 结果已保存");
        Ok(path)
    }
}

/// `{output_path}/research_result_{keyword}_{YYYYmmdd_HHMMSS}.json`
pub fn result_file_path(output_path: &Path, keyword: &str) -> PathBuf {
    output_path.join(format!(
        "research_result_{}_{}.json",
        sanitize_file_name(keyword),
        Utc::now().format("%Y%m%d_%H%M%S")
    ))
}

/// 论文压缩组件：下载链 + 转换器 + 生成模型
pub fn build_compressor(
    config: &Config,
    generator: Arc<dyn TextGenerator>,
) -> Result<PaperCompressor> {
    let acquirer = Arc::new(PdfAcquirer::from_config(&config.acquisition)?);
    let converter = converter::from_config(&config.converter)?;
    Ok(PaperCompressor::new(
        acquirer,
        converter,
        generator,
        config.pipeline.max_compression_chars,
    ))
}

/// 创建LLM客户端并检查连接
pub async fn connect(config: &Config) -> Result<Arc<LLMClient>> {
    let client = LLMClient::new(config.llm.clone())?;
    client.check_connection().await?;
    Ok(Arc::new(client))
}

/// 启动一次研究计划生成
pub async fn launch(config: &Config, keyword: &str, search_paper_num: usize) -> Result<ResearchResult> {
    let client = connect(config).await?;
    let generator = ResearchPlanGenerator::from_config(config, client)?;
    Ok(generator.run(keyword, search_paper_num).await)
}

#[cfg(test)]
mod tests;
