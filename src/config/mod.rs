use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::i18n::TargetLanguage;

/// 未指定 `--config` 时尝试加载的默认配置文件
pub const DEFAULT_CONFIG_FILE: &str = "astroinsight.toml";

/// LLM Provider类型
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub enum LLMProvider {
    #[serde(rename = "openai")]
    #[default]
    OpenAI,
    #[serde(rename = "moonshot")]
    Moonshot,
    #[serde(rename = "deepseek")]
    DeepSeek,
    #[serde(rename = "mistral")]
    Mistral,
    #[serde(rename = "openrouter")]
    OpenRouter,
    #[serde(rename = "anthropic")]
    Anthropic,
    #[serde(rename = "gemini")]
    Gemini,
    #[serde(rename = "ollama")]
    Ollama,
}

impl std::fmt::Display for LLMProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LLMProvider::OpenAI => "openai",
            LLMProvider::Moonshot => "moonshot",
            LLMProvider::DeepSeek => "deepseek",
            LLMProvider::Mistral => "mistral",
            LLMProvider::OpenRouter => "openrouter",
            LLMProvider::Anthropic => "anthropic",
            LLMProvider::Gemini => "gemini",
            LLMProvider::Ollama => "ollama",
        };
        write!(f, "{}", name)
    }
}

impl std::str::FromStr for LLMProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(LLMProvider::OpenAI),
            "moonshot" => Ok(LLMProvider::Moonshot),
            "deepseek" => Ok(LLMProvider::DeepSeek),
            "mistral" => Ok(LLMProvider::Mistral),
            "openrouter" => Ok(LLMProvider::OpenRouter),
            "anthropic" => Ok(LLMProvider::Anthropic),
            "gemini" => Ok(LLMProvider::Gemini),
            "ollama" => Ok(LLMProvider::Ollama),
            _ => Err(format!("Unknown provider: {}", s)),
        }
    }
}

/// 文档转换服务类型
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConverterKind {
    /// MinerU 远程转换服务
    #[default]
    Mineru,
    /// 本地提取PDF文本层
    Local,
}

impl std::str::FromStr for ConverterKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mineru" => Ok(ConverterKind::Mineru),
            "local" => Ok(ConverterKind::Local),
            _ => Err(format!("Unknown converter: {}", s)),
        }
    }
}

/// 应用程序配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct Config {
    /// 研究结果输出路径
    pub output_path: PathBuf,

    /// 目标语言
    pub target_language: TargetLanguage,

    /// LLM模型配置
    pub llm: LLMConfig,

    /// 论文检索配置
    pub search: SearchConfig,

    /// PDF获取配置
    pub acquisition: AcquisitionConfig,

    /// 文档转换配置
    pub converter: ConverterConfig,

    /// 关键词打分（知识图谱）配置
    pub scoring: ScoringConfig,

    /// 流水线配置
    pub pipeline: PipelineConfig,

    /// 是否启用详细日志
    pub verbose: bool,
}

/// LLM模型配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LLMConfig {
    /// LLM Provider类型
    pub provider: LLMProvider,

    /// LLM API KEY
    pub api_key: String,

    /// LLM API基地址
    pub api_base_url: String,

    /// 高能效模型，用于常规生成任务
    pub model_efficient: String,

    /// 高质量模型，用于长上下文生成，以及作为efficient失效情况下的兜底
    pub model_powerful: String,

    /// 最大tokens
    pub max_tokens: u32,

    /// 温度
    pub temperature: f64,

    /// 重试次数
    pub retry_attempts: u32,

    /// 重试间隔（毫秒）
    pub retry_delay_ms: u64,

    /// 超时时间（秒）
    pub timeout_seconds: u64,
}

/// 论文检索配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct SearchConfig {
    /// arXiv API 地址
    pub api_base_url: String,

    /// 单次检索的总超时（秒）
    pub timeout_seconds: u64,

    /// 最大尝试次数
    pub max_retries: u32,

    /// 线性退避的时间单位（毫秒），第N次失败后等待 N*单位
    pub backoff_unit_ms: u64,

    /// 相邻两条结果之间的间隔（毫秒）
    pub fetch_delay_ms: u64,

    /// 每次请求的分页大小
    pub page_size: usize,
}

/// PDF获取配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct AcquisitionConfig {
    /// 论文下载根目录，按主题划分子目录
    pub download_root: PathBuf,

    /// 单个HTTP请求超时（秒）
    pub request_timeout_seconds: u64,

    pub user_agent: String,

    /// Unpaywall 要求提供的联系邮箱
    pub unpaywall_email: String,

    pub unpaywall_base_url: String,
    pub arxiv_base_url: String,
    pub arxiv_api_url: String,
    pub scholar_base_url: String,
    pub scihub_base_url: String,
    pub crossref_base_url: String,
    pub giiisp_base_url: String,
}

/// 文档转换配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ConverterConfig {
    pub kind: ConverterKind,

    /// MinerU 服务地址
    pub api_url: String,

    pub api_key: String,

    /// 轮询间隔（秒）
    pub poll_interval_seconds: u64,

    /// 最大轮询次数，None 表示一直等待直到完成或失败
    pub max_poll_attempts: Option<u32>,
}

/// Neo4j HTTP 接口配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ScoringConfig {
    pub neo4j_url: String,
    pub database: String,
    pub user: String,
    pub password: String,
}

/// 流水线配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct PipelineConfig {
    /// 事实提取前是否先下载并压缩论文全文
    pub compress_papers: bool,

    /// MoA优化阶段的提议者视角
    pub moa_perspectives: Vec<String>,

    /// 送入压缩模型的最大字符数
    pub max_compression_chars: usize,
}

impl Config {
    /// 从文件加载配置
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }

    /// 加载配置：显式指定的文件 > 当前目录下的默认文件 > 内置默认值
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }
        let default_path = Path::new(DEFAULT_CONFIG_FILE);
        if default_path.exists() {
            return Self::from_file(default_path);
        }
        Ok(Self::default())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from("./temp"),
            target_language: TargetLanguage::default(),
            llm: LLMConfig::default(),
            search: SearchConfig::default(),
            acquisition: AcquisitionConfig::default(),
            converter: ConverterConfig::default(),
            scoring: ScoringConfig::default(),
            pipeline: PipelineConfig::default(),
            verbose: false,
        }
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: LLMProvider::default(),
            api_key: std::env::var("ASTRO_LLM_API_KEY").unwrap_or_default(),
            api_base_url: String::from("https://api-inference.modelscope.cn/v1"),
            model_efficient: String::from("Qwen/Qwen3-Next-80B-A3B-Instruct"),
            model_powerful: String::from("Qwen/Qwen3-235B-A22B-Instruct-2507"),
            max_tokens: 8192,
            temperature: 0.7,
            retry_attempts: 3,
            retry_delay_ms: 3000,
            timeout_seconds: 300,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_base_url: String::from("https://export.arxiv.org/api/query"),
            timeout_seconds: 30,
            max_retries: 3,
            backoff_unit_ms: 2000,
            fetch_delay_ms: 100,
            page_size: 100,
        }
    }
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            download_root: PathBuf::from("./papers"),
            request_timeout_seconds: 30,
            user_agent: String::from(
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
            ),
            unpaywall_email: String::from("astroinsight@example.com"),
            unpaywall_base_url: String::from("https://api.unpaywall.org/v2"),
            arxiv_base_url: String::from("https://arxiv.org"),
            arxiv_api_url: String::from("https://export.arxiv.org/api/query"),
            scholar_base_url: String::from("https://scholar.google.com"),
            scihub_base_url: String::from("https://sci-hub.se"),
            crossref_base_url: String::from("https://api.crossref.org"),
            giiisp_base_url: String::from("https://api.giiisp.com"),
        }
    }
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            kind: ConverterKind::default(),
            api_url: String::from("http://localhost:8888"),
            api_key: std::env::var("ASTRO_MINERU_API_KEY").unwrap_or_default(),
            poll_interval_seconds: 5,
            max_poll_attempts: None,
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            neo4j_url: String::from("http://localhost:7474"),
            database: String::from("neo4j"),
            user: String::from("neo4j"),
            password: std::env::var("ASTRO_NEO4J_PASSWORD").unwrap_or_default(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            compress_papers: false,
            moa_perspectives: vec![
                String::from("理论天体物理学家"),
                String::from("观测天文学家"),
                String::from("数据科学与机器学习专家"),
            ],
            max_compression_chars: 60_000,
        }
    }
}
