use anyhow::Result;
use astroinsight_rs::generator::RunStatus;
use astroinsight_rs::{cli, launch, logging, review};
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Args::parse();
    let (config, ignored) = args.load_config()?;
    logging::init(config.verbose);
    for flag in &ignored {
        tracing::warn!("{}", flag);
    }

    if let Some(draft_path) = &args.review_draft {
        match &args.review_section {
            Some(section) => {
                let review = review::launch_message_review(&config, draft_path, section).await?;
                println!("📝 章节: {}", section);
                for scored in &review.scored_keywords {
                    println!(
                        "   {:.3}  {} (重要性 {:.2}, 词频 {})",
                        scored.composite_score, scored.entity, scored.importance_score, scored.count
                    );
                }
                if !review.related_keywords.is_empty() {
                    println!("🔗 相关关键词: {}", review.related_keywords.join(", "));
                }
            }
            None => {
                let review = review::launch_review(&config, &args.keyword, draft_path).await?;
                println!("{}", review);
            }
        }
        return Ok(());
    }

    let result = launch(&config, &args.keyword, usize::from(args.paper_num)).await?;

    println!("🔑 关键词: {}", result.keyword);
    println!("📚 检索论文: {}", result.papers_found.unwrap_or_default());
    for (stage, stub) in result.stub_flags() {
        if let Some(stub) = stub {
            println!("   {} {}", if stub { "⚠️" } else { "✅" }, stage);
        }
    }
    if let Some(output_file) = &result.output_file {
        println!("💾 结果文件: {}", output_file);
    }

    match result.status {
        RunStatus::Failed => {
            anyhow::bail!(
                "研究计划生成失败: {}",
                result.error.unwrap_or_else(|| "unknown error".to_string())
            )
        }
        _ => {
            if let Some(plan) = result.final_plan() {
                println!("\n{}", plan);
            }
            Ok(())
        }
    }
}
