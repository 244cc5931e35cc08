use async_trait::async_trait;

use super::ResearchStage;
use crate::generator::types::FactsPayload;
use crate::types::PaperRecord;
use crate::utils::read_text_file;
use crate::utils::text::truncate_chars;

/// 事实信息提取：唯一读取论文的阶段
pub struct FactExtraction {
    /// 每篇压缩稿进入提示词的最大字符数
    pub max_compressed_chars: usize,
}

impl Default for FactExtraction {
    fn default() -> Self {
        Self {
            max_compressed_chars: 8000,
        }
    }
}

#[async_trait]
impl ResearchStage for FactExtraction {
    type Input = Vec<PaperRecord>;
    type Output = FactsPayload;

    fn name(&self) -> &'static str {
        "事实信息提取"
    }

    fn system_prompt(&self) -> &'static str {
        "你是一名天文学研究助理，擅长从论文中提炼可靠的事实信息。"
    }

    async fn user_prompt(&self, keyword: &str, papers: &Vec<PaperRecord>) -> String {
        let mut papers_text = String::new();
        for (i, paper) in papers.iter().enumerate() {
            papers_text.push_str(&format!("论文{}: {}\n", i + 1, paper.title));
            papers_text.push_str(&format!("摘要: {}\n", paper.abstract_text));
            if let Some(path) = &paper.compressed_file
                && let Some(content) = read_text_file(path).await
            {
                papers_text.push_str(&format!(
                    "压缩全文:\n{}\n",
                    truncate_chars(&content, self.max_compressed_chars)
                ));
            }
            papers_text.push('\n');
        }

        format!(
            r#"基于以下论文信息，提取与关键词"{}"相关的关键事实信息：

{}
请提取：
1. 核心概念和定义
2. 主要研究方法
3. 重要发现和结论
4. 技术细节和参数
5. 研究局限性和挑战

请以结构化的方式组织这些信息。"#,
            keyword, papers_text
        )
    }

    fn from_generation(&self, text: String, papers: &Vec<PaperRecord>) -> FactsPayload {
        FactsPayload {
            facts: text,
            source_papers_count: papers.len(),
        }
    }

    fn stub(&self, keyword: &str, papers: &Vec<PaperRecord>) -> FactsPayload {
        FactsPayload {
            facts: format!("基于{}篇论文提取的关键词'{}'相关事实信息", papers.len(), keyword),
            source_papers_count: papers.len(),
        }
    }
}
