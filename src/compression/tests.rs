use super::*;
use crate::acquisition::{AcquisitionError, PdfStrategy};
use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Mutex;
use tempfile::TempDir;

struct WritesPdf;

#[async_trait]
impl PdfStrategy for WritesPdf {
    fn name(&self) -> &'static str {
        "fixture"
    }

    async fn attempt(
        &self,
        identifier: &str,
        title: &str,
        output_dir: &Path,
    ) -> Result<PathBuf, AcquisitionError> {
        if identifier == "missing" {
            return Err(AcquisitionError::NoPdfLink);
        }
        let path = output_dir.join(format!("{}.pdf", title));
        tokio::fs::write(&path, "%PDF-1.4").await?;
        Ok(path)
    }
}

/// 把固定文本写到 `{stem}.md`
struct FixedConverter(&'static str);

#[async_trait]
impl DocumentConverter for FixedConverter {
    async fn convert(&self, pdf_path: &Path, output_dir: &Path) -> Option<PathBuf> {
        let stem = pdf_path.file_stem()?.to_string_lossy().to_string();
        let path = output_dir.join(format!("{}.md", stem));
        tokio::fs::write(&path, self.0).await.ok()?;
        Some(path)
    }
}

struct Recorder {
    reply: Result<String, String>,
    prompts: Mutex<Vec<String>>,
}

impl Recorder {
    fn ok(reply: &str) -> Self {
        Self {
            reply: Ok(reply.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn failing() -> Self {
        Self {
            reply: Err("quota exceeded".to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl TextGenerator for Recorder {
    async fn generate(&self, _system_prompt: &str, user_prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(user_prompt.to_string());
        self.reply.clone().map_err(anyhow::Error::msg)
    }
}

fn compressor(
    root: &Path,
    converter: Arc<dyn DocumentConverter>,
    generator: Arc<Recorder>,
    max_chars: usize,
) -> PaperCompressor {
    let acquirer = Arc::new(PdfAcquirer::new(vec![Box::new(WritesPdf)], root));
    PaperCompressor::new(acquirer, converter, generator, max_chars)
}

#[tokio::test]
async fn test_compress_writes_sibling_file() {
    let dir = TempDir::new().unwrap();
    let generator = Arc::new(Recorder::ok("## 摘要\n脉冲星候选体分类"));
    let compressor = compressor(
        dir.path(),
        Arc::new(FixedConverter("# Full text\nlots of words")),
        generator.clone(),
        1000,
    );

    let path = compressor
        .compress("10.1000/p", "Pulsar: CNN", "pulsar classification")
        .await
        .unwrap();

    assert_eq!(
        path,
        dir.path()
            .join("pulsar classification")
            .join("Pulsar_ CNN_compressed.md")
    );
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "## 摘要\n脉冲星候选体分类");
    assert!(generator.prompts.lock().unwrap()[0].contains("lots of words"));
}

#[tokio::test]
async fn test_long_title_compressed_file_fits_name_limit() {
    let dir = TempDir::new().unwrap();
    let compressor = compressor(
        dir.path(),
        Arc::new(FixedConverter("# Full text")),
        Arc::new(Recorder::ok("condensed")),
        1000,
    );
    let title = "引力波背景的脉冲星计时阵列探测".repeat(7);
    assert!(title.len() > 255);

    let path = compressor.compress("10.1000/pta", &title, "pta").await.unwrap();

    let file_name = path.file_name().unwrap().to_str().unwrap();
    assert!(file_name.len() <= 255);
    assert!(file_name.ends_with("_compressed.md"));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "condensed");
}

#[tokio::test]
async fn test_failed_acquisition_short_circuits() {
    let dir = TempDir::new().unwrap();
    let generator = Arc::new(Recorder::ok("unused"));
    let compressor = compressor(dir.path(), Arc::new(FixedConverter("text")), generator.clone(), 1000);

    assert!(compressor.compress("missing", "Gone", "topic").await.is_none());
    assert!(generator.prompts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_empty_conversion_short_circuits() {
    let dir = TempDir::new().unwrap();
    let generator = Arc::new(Recorder::ok("unused"));
    let compressor = compressor(dir.path(), Arc::new(FixedConverter("   \n")), generator.clone(), 1000);

    assert!(compressor.compress("10.1000/e", "Empty", "topic").await.is_none());
    assert!(generator.prompts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_generation_failure_yields_none_without_file() {
    let dir = TempDir::new().unwrap();
    let compressor = compressor(
        dir.path(),
        Arc::new(FixedConverter("text")),
        Arc::new(Recorder::failing()),
        1000,
    );

    assert!(compressor.compress("10.1000/f", "Fails", "topic").await.is_none());
    assert!(!dir.path().join("topic").join("Fails_compressed.md").exists());
}

#[tokio::test]
async fn test_input_is_truncated_to_budget() {
    let dir = TempDir::new().unwrap();
    let generator = Arc::new(Recorder::ok("short"));
    let compressor = compressor(
        dir.path(),
        Arc::new(FixedConverter("黑洞黑洞黑洞TAIL-SHOULD-NOT-APPEAR")),
        generator.clone(),
        6,
    );

    compressor.compress("10.1000/t", "Trunc", "topic").await.unwrap();

    let prompt = generator.prompts.lock().unwrap()[0].clone();
    assert!(prompt.contains("黑洞黑洞黑洞"));
    assert!(!prompt.contains("TAIL"));
}

#[tokio::test]
async fn test_compress_record_attaches_file_only_on_success() {
    let dir = TempDir::new().unwrap();
    let compressor = compressor(
        dir.path(),
        Arc::new(FixedConverter("text")),
        Arc::new(Recorder::ok("condensed")),
        1000,
    );

    let mut paper = PaperRecord::placeholder("quasars");
    paper.identifier = "10.1000/q".to_string();
    let compressed = compressor.compress_record(paper.clone()).await;
    assert!(compressed.compressed_file.is_some());

    paper.identifier = "missing".to_string();
    let untouched = compressor.compress_record(paper.clone()).await;
    assert_eq!(untouched, paper);
}
