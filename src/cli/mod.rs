use crate::config::{Config, ConverterKind, LLMProvider};
use crate::i18n::TargetLanguage;
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use thiserror::Error;

/// AstroInsight-RS - 由Rust与大模型驱动的天文研究计划生成引擎
#[derive(Parser, Debug)]
#[command(name = "astroinsight-rs")]
#[command(
    about = "Research-plan generation engine: retrieves papers for a keyword, condenses them and drives a fixed chain of LLM stages to a final research plan."
)]
#[command(version)]
pub struct Args {
    /// 研究关键词
    #[arg(short, long)]
    pub keyword: String,

    /// 检索论文数量
    #[arg(short = 'n', long, default_value_t = 5, value_parser = clap::value_parser!(u16).range(1..=20))]
    pub paper_num: u16,

    /// 配置文件路径
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 结果输出路径
    #[arg(short, long)]
    pub output_path: Option<PathBuf>,

    /// PDF下载根目录
    #[arg(long)]
    pub download_root: Option<PathBuf>,

    /// 是否在事实提取前下载并压缩论文全文
    #[arg(long)]
    pub compress_papers: bool,

    /// PDF转换方式 (mineru, local)
    #[arg(long)]
    pub converter: Option<String>,

    /// 审阅指定的研究草稿文件，而不是生成新的研究计划
    #[arg(long)]
    pub review_draft: Option<PathBuf>,

    /// 只抽取草稿中该章节的实体并打分，需要同时指定 --review-draft
    #[arg(long, requires = "review_draft")]
    pub review_section: Option<String>,

    /// 是否启用详细日志
    #[arg(short, long)]
    pub verbose: bool,

    /// 高能效模型，用于较短的提示词
    #[arg(long)]
    pub model_efficient: Option<String>,

    /// 高质量模型，用于长提示词，以及efficient失效情况下的兜底
    #[arg(long)]
    pub model_powerful: Option<String>,

    /// LLM API基地址
    #[arg(long)]
    pub llm_api_base_url: Option<String>,

    /// LLM API KEY
    #[arg(long)]
    pub llm_api_key: Option<String>,

    /// 最大tokens数
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// 温度参数
    #[arg(long)]
    pub temperature: Option<f64>,

    /// LLM Provider (openai, moonshot, deepseek, mistral, openrouter, anthropic, gemini, ollama)
    #[arg(long)]
    pub llm_provider: Option<String>,

    /// 目标语言 (zh, en, ja)
    #[arg(long)]
    pub target_language: Option<String>,
}

/// 无法识别、因而被忽略的命令行取值
#[derive(Debug, Error, PartialEq)]
pub enum IgnoredOverride {
    #[error("⚠️ 未知的转换方式 '{0}'，使用配置中的设置")]
    Converter(String),

    #[error("⚠️ 未知的provider '{0}'，使用配置中的provider")]
    Provider(String),

    #[error("⚠️ 未知的目标语言 '{0}'，使用配置中的语言")]
    TargetLanguage(String),
}

impl Args {
    /// 加载配置文件并用命令行参数覆盖。
    /// 被忽略的取值随配置一起返回，由调用方在日志初始化之后输出。
    pub fn load_config(&self) -> Result<(Config, Vec<IgnoredOverride>)> {
        let mut config = Config::load(self.config.as_deref())?;
        let ignored = self.apply_overrides(&mut config);
        Ok((config, ignored))
    }

    fn apply_overrides(&self, config: &mut Config) -> Vec<IgnoredOverride> {
        let mut ignored = Vec::new();
        if let Some(output_path) = &self.output_path {
            config.output_path = output_path.clone();
        }
        if let Some(download_root) = &self.download_root {
            config.acquisition.download_root = download_root.clone();
        }
        if self.compress_papers {
            config.pipeline.compress_papers = true;
        }
        if let Some(converter) = &self.converter {
            match converter.parse::<ConverterKind>() {
                Ok(kind) => config.converter.kind = kind,
                Err(_) => ignored.push(IgnoredOverride::Converter(converter.clone())),
            }
        }

        // 覆盖LLM配置
        if let Some(provider_str) = &self.llm_provider {
            match provider_str.parse::<LLMProvider>() {
                Ok(provider) => config.llm.provider = provider,
                Err(_) => ignored.push(IgnoredOverride::Provider(provider_str.clone())),
            }
        }
        if let Some(llm_api_base_url) = &self.llm_api_base_url {
            config.llm.api_base_url = llm_api_base_url.clone();
        }
        if let Some(llm_api_key) = &self.llm_api_key {
            config.llm.api_key = llm_api_key.clone();
        }
        if let Some(model_efficient) = &self.model_efficient {
            config.llm.model_efficient = model_efficient.clone();
        }
        if let Some(model_powerful) = &self.model_powerful {
            config.llm.model_powerful = model_powerful.clone();
        }
        if let Some(max_tokens) = self.max_tokens {
            config.llm.max_tokens = max_tokens;
        }
        if let Some(temperature) = self.temperature {
            config.llm.temperature = temperature;
        }

        // 目标语言配置
        if let Some(target_language_str) = &self.target_language {
            match target_language_str.parse::<TargetLanguage>() {
                Ok(target_language) => config.target_language = target_language,
                Err(_) => ignored.push(IgnoredOverride::TargetLanguage(target_language_str.clone())),
            }
        }

        config.verbose = config.verbose || self.verbose;
        ignored
    }
}

#[cfg(test)]
mod tests;
