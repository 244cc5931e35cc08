use super::*;
use crate::config::SearchConfig;
use crate::generator::types::Provenance;
use crate::i18n::TargetLanguage;
use crate::search::PaperSearchEngine;
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

struct FixedEngine {
    available: usize,
}

#[async_trait]
impl PaperSearchEngine for FixedEngine {
    async fn fetch_page(
        &self,
        query: &str,
        start: usize,
        page_size: usize,
    ) -> Result<Vec<PaperRecord>> {
        let end = (start + page_size).min(self.available);
        Ok((start..end)
            .map(|n| {
                let mut paper = PaperRecord::placeholder(query);
                paper.title = format!("{} study {}", query, n);
                paper
            })
            .collect())
    }
}

struct DownEngine;

#[async_trait]
impl PaperSearchEngine for DownEngine {
    async fn fetch_page(&self, _: &str, _: usize, _: usize) -> Result<Vec<PaperRecord>> {
        anyhow::bail!("arXiv unreachable")
    }
}

/// 指定序号（从1开始）的调用失败，其余返回固定文本
struct FailingCalls {
    failing: Vec<usize>,
    calls: AtomicUsize,
}

impl FailingCalls {
    fn new(failing: Vec<usize>) -> Self {
        Self {
            failing,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl TextGenerator for FailingCalls {
    async fn generate(&self, _system_prompt: &str, _user_prompt: &str) -> Result<String> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.failing.contains(&call) {
            anyhow::bail!("generation failed on call {}", call);
        }
        Ok(format!("generated text {}", call))
    }
}

struct Exploding;

#[async_trait]
impl TextGenerator for Exploding {
    async fn generate(&self, _system_prompt: &str, _user_prompt: &str) -> Result<String> {
        panic!("generator exploded");
    }
}

fn search_config() -> SearchConfig {
    SearchConfig {
        fetch_delay_ms: 0,
        max_retries: 1,
        ..SearchConfig::default()
    }
}

fn pipeline(
    engine: Arc<dyn PaperSearchEngine>,
    generator: Arc<dyn TextGenerator>,
    output_path: &Path,
) -> ResearchPlanGenerator {
    ResearchPlanGenerator::new(
        StageContext::new(generator, TargetLanguage::Chinese),
        Arc::new(SourceAdapter::new(engine, search_config())),
        None,
        vec!["理论天体物理学家".to_string(), "观测天文学家".to_string()],
        output_path,
    )
}

fn key_set(result: &ResearchResult) -> BTreeSet<String> {
    fn collect(prefix: &str, value: &serde_json::Value, keys: &mut BTreeSet<String>) {
        if let serde_json::Value::Object(map) = value {
            for (key, child) in map {
                let path = format!("{}/{}", prefix, key);
                // 论文列表长度可能不同，只比较对象键
                if key != "papers" {
                    collect(&path, child, keys);
                }
                keys.insert(path);
            }
        }
    }
    let mut keys = BTreeSet::new();
    collect("", &serde_json::to_value(result).unwrap(), &mut keys);
    keys
}

#[tokio::test]
async fn test_two_runs_have_identical_shape() {
    let dir = TempDir::new().unwrap();
    let first = pipeline(
        Arc::new(FixedEngine { available: 3 }),
        Arc::new(FailingCalls::new(vec![2])),
        dir.path(),
    )
    .run("black holes", 3)
    .await;
    let second = pipeline(
        Arc::new(FixedEngine { available: 3 }),
        Arc::new(FailingCalls::new(vec![2])),
        dir.path(),
    )
    .run("black holes", 3)
    .await;

    assert_eq!(first.status, RunStatus::Completed);
    assert_eq!(key_set(&first), key_set(&second));
    assert_eq!(first.stub_flags(), second.stub_flags());
    assert_eq!(
        first.stub_flags(),
        vec![
            ("search", Some(false)),
            ("facts_extraction", Some(false)),
            ("hypothesis_generation", Some(true)),
            ("initial_idea", Some(false)),
            ("technical_optimization", Some(false)),
            ("moa_optimization", Some(false)),
            ("human_ai_collaboration", Some(false)),
        ]
    );
}

#[tokio::test]
async fn test_fact_extraction_failure_degrades_and_pipeline_continues() {
    let dir = TempDir::new().unwrap();
    let result = pipeline(
        Arc::new(FixedEngine { available: 4 }),
        Arc::new(FailingCalls::new(vec![1])),
        dir.path(),
    )
    .run("exoplanets", 4)
    .await;

    let facts = result.facts_extraction.as_ref().unwrap();
    assert_eq!(facts.provenance, Provenance::Stub);
    assert_eq!(facts.payload.facts, "基于4篇论文提取的关键词'exoplanets'相关事实信息");

    let hypothesis = result.hypothesis_generation.as_ref().unwrap();
    assert_eq!(hypothesis.provenance, Provenance::Live);
    assert_eq!(hypothesis.payload.hypotheses, "generated text 2");
    assert_eq!(result.status, RunStatus::Completed);
}

#[tokio::test]
async fn test_search_failure_uses_placeholder_paper() {
    let dir = TempDir::new().unwrap();
    let result = pipeline(
        Arc::new(DownEngine),
        Arc::new(FailingCalls::new(Vec::new())),
        dir.path(),
    )
    .run("magnetars", 5)
    .await;

    let search = result.search.as_ref().unwrap();
    assert!(search.is_stub());
    assert_eq!(search.payload.papers.len(), 1);
    assert_eq!(search.payload.papers[0].title, "关于magnetars的研究论文1");
    assert_eq!(result.papers_found, Some(1));
    assert!(!result.facts_extraction.as_ref().unwrap().is_stub());
}

#[tokio::test]
async fn test_result_is_saved_as_json() {
    let dir = TempDir::new().unwrap();
    let result = pipeline(
        Arc::new(FixedEngine { available: 2 }),
        Arc::new(FailingCalls::new(Vec::new())),
        dir.path(),
    )
    .run("fast radio bursts", 2)
    .await;

    let output_file = PathBuf::from(result.output_file.clone().unwrap());
    let name = output_file.file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("research_result_fast radio bursts_"));
    assert!(name.ends_with(".json"));

    let saved: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&output_file).unwrap()).unwrap();
    assert_eq!(saved["status"], "completed");
    assert_eq!(saved["papers_found"], 2);
    assert_eq!(saved["human_ai_collaboration"]["optimization_complete"], true);
}

#[tokio::test]
async fn test_save_failure_is_not_a_run_failure() {
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("not_a_dir");
    std::fs::write(&blocker, "file").unwrap();

    let result = pipeline(
        Arc::new(FixedEngine { available: 1 }),
        Arc::new(FailingCalls::new(Vec::new())),
        &blocker,
    )
    .run("nebulae", 1)
    .await;

    assert_eq!(result.status, RunStatus::Completed);
    assert!(result.output_file.is_none());
}

#[tokio::test]
async fn test_escaping_panic_marks_run_failed() {
    let dir = TempDir::new().unwrap();
    let result = pipeline(
        Arc::new(FixedEngine { available: 1 }),
        Arc::new(Exploding),
        dir.path(),
    )
    .run("cosmic rays", 1)
    .await;

    assert_eq!(result.status, RunStatus::Failed);
    assert!(result.error.as_deref().unwrap().contains("generator exploded"));
    assert!(result.failed_at.is_some());
    assert!(result.output_file.is_none());
}

#[tokio::test]
async fn test_progress_checkpoints_in_order() {
    let dir = TempDir::new().unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let progress: ProgressFn = Arc::new(move |percent, _| sink.lock().unwrap().push(percent));

    pipeline(
        Arc::new(FixedEngine { available: 1 }),
        Arc::new(FailingCalls::new(Vec::new())),
        dir.path(),
    )
    .run_with_progress("galaxies", 1, Some(progress))
    .await;

    assert_eq!(*seen.lock().unwrap(), vec![10, 20, 30, 90]);
}

#[test]
fn test_timing_report_lists_phases() {
    let mut timing = TimingScope::new();
    timing.start_phase(TimingKeys::SEARCH);
    assert!(timing.end_phase(TimingKeys::SEARCH).is_some());
    assert!(timing.end_phase(TimingKeys::MOA).is_none());

    let report = timing.generate_timing_report();
    assert!(report.contains("总执行时间"));
    assert!(report.contains("- search:"));
    assert_eq!(timing.phase_durations().len(), 1);
}
