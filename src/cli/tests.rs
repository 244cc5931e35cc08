#[cfg(test)]
mod tests {
    use crate::cli::{Args, IgnoredOverride};
    use crate::config::{ConverterKind, LLMProvider};
    use crate::i18n::TargetLanguage;
    use clap::Parser;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_args_default_values() {
        let args = Args::try_parse_from(["astroinsight-rs", "--keyword", "pulsar"]).unwrap();

        assert_eq!(args.keyword, "pulsar");
        assert_eq!(args.paper_num, 5);
        assert!(args.config.is_none());
        assert!(args.output_path.is_none());
        assert!(!args.compress_papers);
        assert!(args.review_draft.is_none());
        assert!(args.review_section.is_none());
        assert!(!args.verbose);
    }

    #[test]
    fn test_keyword_is_required() {
        assert!(Args::try_parse_from(["astroinsight-rs"]).is_err());
    }

    #[test]
    fn test_paper_num_range() {
        assert!(Args::try_parse_from(["astroinsight-rs", "-k", "x", "-n", "0"]).is_err());
        assert!(Args::try_parse_from(["astroinsight-rs", "-k", "x", "-n", "21"]).is_err());
        let args = Args::try_parse_from(["astroinsight-rs", "-k", "x", "-n", "20"]).unwrap();
        assert_eq!(args.paper_num, 20);
    }

    #[test]
    fn test_short_options() {
        let args = Args::try_parse_from([
            "astroinsight-rs",
            "-k",
            "dark energy",
            "-n",
            "8",
            "-o",
            "/tmp/results",
            "-v",
        ])
        .unwrap();

        assert_eq!(args.keyword, "dark energy");
        assert_eq!(args.paper_num, 8);
        assert_eq!(args.output_path, Some(PathBuf::from("/tmp/results")));
        assert!(args.verbose);
    }

    #[test]
    fn test_overrides_apply_on_top_of_config_file() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("astroinsight.toml");
        std::fs::write(
            &config_path,
            r#"
output_path = "./from_file"

[llm]
provider = "deepseek"
model_efficient = "deepseek-chat"
temperature = 0.2

[pipeline]
compress_papers = false
"#,
        )
        .unwrap();

        let args = Args::try_parse_from([
            "astroinsight-rs",
            "-k",
            "quasars",
            "--config",
            config_path.to_str().unwrap(),
            "--download-root",
            "/data/papers",
            "--compress-papers",
            "--converter",
            "local",
            "--llm-provider",
            "moonshot",
            "--temperature",
            "0.9",
            "--target-language",
            "en",
        ])
        .unwrap();
        let (config, ignored) = args.load_config().unwrap();

        assert!(ignored.is_empty());
        assert_eq!(config.output_path, PathBuf::from("./from_file"));
        assert_eq!(config.acquisition.download_root, PathBuf::from("/data/papers"));
        assert!(config.pipeline.compress_papers);
        assert_eq!(config.converter.kind, ConverterKind::Local);
        assert_eq!(config.llm.provider, LLMProvider::Moonshot);
        assert_eq!(config.llm.model_efficient, "deepseek-chat");
        assert_eq!(config.llm.temperature, 0.9);
        assert_eq!(config.target_language, TargetLanguage::English);
    }

    #[test]
    fn test_unknown_values_keep_configured_ones() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("empty.toml");
        std::fs::write(&config_path, "").unwrap();

        let args = Args::try_parse_from([
            "astroinsight-rs",
            "-k",
            "x",
            "-c",
            config_path.to_str().unwrap(),
            "--llm-provider",
            "skynet",
            "--target-language",
            "klingon",
            "--converter",
            "ocr-robot",
        ])
        .unwrap();
        let (config, ignored) = args.load_config().unwrap();

        assert_eq!(config.llm.provider, LLMProvider::default());
        assert_eq!(config.target_language, TargetLanguage::Chinese);
        assert_eq!(config.converter.kind, ConverterKind::default());
        assert_eq!(
            ignored,
            vec![
                IgnoredOverride::Converter("ocr-robot".to_string()),
                IgnoredOverride::Provider("skynet".to_string()),
                IgnoredOverride::TargetLanguage("klingon".to_string()),
            ]
        );
        assert!(ignored[1].to_string().contains("未知的provider 'skynet'"));
    }

    #[test]
    fn test_review_section_requires_draft() {
        assert!(
            Args::try_parse_from(["astroinsight-rs", "-k", "x", "--review-section", "Method"]).is_err()
        );
        let args = Args::try_parse_from([
            "astroinsight-rs",
            "-k",
            "x",
            "--review-draft",
            "draft.md",
            "--review-section",
            "Method",
        ])
        .unwrap();
        assert_eq!(args.review_section.as_deref(), Some("Method"));
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let args = Args::try_parse_from([
            "astroinsight-rs",
            "-k",
            "x",
            "--config",
            "/definitely/not/here.toml",
        ])
        .unwrap();
        assert!(args.load_config().is_err());
    }
}
