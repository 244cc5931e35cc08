//! arXiv Atom API 检索引擎

use anyhow::{Context, Result};
use async_trait::async_trait;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::time::Duration;

use super::PaperSearchEngine;
use crate::types::PaperRecord;

pub struct ArxivSearchEngine {
    http: reqwest::Client,
    api_url: String,
}

impl ArxivSearchEngine {
    pub fn new(api_url: impl Into<String>, request_timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .context("无法创建arXiv HTTP客户端")?;
        Ok(Self::with_client(http, api_url))
    }

    /// 复用已有的HTTP客户端
    pub fn with_client(http: reqwest::Client, api_url: impl Into<String>) -> Self {
        Self {
            http,
            api_url: api_url.into(),
        }
    }
}

/// 从 `http://arxiv.org/abs/1906.07403v1` 或 `.../pdf/...` 中取出arXiv ID
pub fn arxiv_id_from_url(url: &str) -> &str {
    url.split_once("/abs/")
        .or_else(|| url.split_once("/pdf/"))
        .map(|(_, id)| id)
        .unwrap_or_else(|| url.rsplit('/').next().unwrap_or(url))
        .trim_end_matches(".pdf")
}

#[async_trait]
impl PaperSearchEngine for ArxivSearchEngine {
    async fn fetch_page(
        &self,
        query: &str,
        start: usize,
        page_size: usize,
    ) -> Result<Vec<PaperRecord>> {
        let body = self
            .http
            .get(&self.api_url)
            .query(&[
                ("search_query", query.to_string()),
                ("start", start.to_string()),
                ("max_results", page_size.to_string()),
                ("sortBy", "relevance".to_string()),
                ("sortOrder", "descending".to_string()),
            ])
            .send()
            .await
            .context("arXiv请求失败")?
            .error_for_status()
            .context("arXiv返回错误状态")?
            .text()
            .await?;

        parse_atom_feed(&body, query)
    }
}

#[derive(Default)]
struct EntryAccum {
    id: String,
    title: String,
    summary: String,
    published: String,
    doi: String,
    category: Option<String>,
    authors: Vec<String>,
    pdf_url: Option<String>,
}

impl EntryAccum {
    fn push_text(&mut self, tag: &[u8], text: &str, in_author: bool) {
        match tag {
            b"id" => self.id.push_str(text),
            b"title" => self.title.push_str(text),
            b"summary" => self.summary.push_str(text),
            b"published" => self.published.push_str(text),
            b"arxiv:doi" => self.doi.push_str(text),
            b"name" if in_author => self.authors.push(text.trim().to_string()),
            _ => {}
        }
    }

    fn absorb_attributes(&mut self, e: &BytesStart<'_>) {
        match e.name().as_ref() {
            b"link" => {
                let mut href = None;
                let mut is_pdf = false;
                for attr in e.attributes().flatten() {
                    let value = String::from_utf8_lossy(&attr.value).to_string();
                    match attr.key.as_ref() {
                        b"href" => href = Some(value),
                        b"title" if value == "pdf" => is_pdf = true,
                        _ => {}
                    }
                }
                if is_pdf {
                    self.pdf_url = href;
                }
            }
            b"arxiv:primary_category" => {
                self.category = e
                    .attributes()
                    .flatten()
                    .find(|a| a.key.as_ref() == b"term")
                    .map(|a| String::from_utf8_lossy(&a.value).to_string());
            }
            _ => {}
        }
    }

    fn into_record(self, topic: &str) -> Option<PaperRecord> {
        let entry_id = self.id.trim().to_string();
        let title = normalize_whitespace(&self.title);
        if entry_id.is_empty() || title.is_empty() {
            return None;
        }
        let doi = Some(self.doi.trim().to_string()).filter(|d| !d.is_empty());
        let pdf_url = self
            .pdf_url
            .or_else(|| Some(entry_id.replacen("/abs/", "/pdf/", 1)));
        Some(PaperRecord {
            topic: topic.to_string(),
            title,
            identifier: doi.clone().unwrap_or_else(|| entry_id.clone()),
            doi,
            pdf_url,
            abstract_text: normalize_whitespace(&self.summary),
            authors: self.authors,
            category: self.category,
            published: self.published.trim().chars().take(10).collect(),
            compressed_file: None,
        })
    }
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 解析arXiv Atom响应
pub fn parse_atom_feed(xml: &str, topic: &str) -> Result<Vec<PaperRecord>> {
    let mut reader = Reader::from_str(xml);
    let mut records = Vec::new();
    let mut accum = EntryAccum::default();
    let mut current_tag: Vec<u8> = Vec::new();
    let mut in_entry = false;
    let mut in_author = false;

    loop {
        match reader.read_event().context("arXiv响应不是合法的Atom XML")? {
            Event::Start(e) => {
                let name = e.name().as_ref().to_vec();
                match name.as_slice() {
                    b"entry" => {
                        in_entry = true;
                        accum = EntryAccum::default();
                    }
                    b"author" if in_entry => in_author = true,
                    _ if in_entry => {
                        accum.absorb_attributes(&e);
                        current_tag = name;
                    }
                    _ => {}
                }
            }
            Event::Empty(e) if in_entry => accum.absorb_attributes(&e),
            Event::Text(e) if in_entry => {
                let text = e.unescape().unwrap_or_default();
                accum.push_text(&current_tag, &text, in_author);
            }
            Event::End(e) => match e.name().as_ref() {
                b"entry" => {
                    if let Some(record) = std::mem::take(&mut accum).into_record(topic) {
                        records.push(record);
                    }
                    in_entry = false;
                    current_tag.clear();
                }
                b"author" => in_author = false,
                _ => current_tag.clear(),
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom" xmlns:arxiv="http://arxiv.org/schemas/atom">
  <title>ArXiv Query</title>
  <entry>
    <id>http://arxiv.org/abs/1906.07403v1</id>
    <published>2019-06-18T07:12:25Z</published>
    <title>Pulsar Candidate Identification
      with Deep Learning</title>
    <summary>We apply convolutional networks
to pulsar candidates &amp; RFI.</summary>
    <author><name>Jane Doe</name></author>
    <author><name>John Roe</name></author>
    <arxiv:doi>10.1088/1674-4527/19/9/133</arxiv:doi>
    <link href="http://arxiv.org/abs/1906.07403v1" rel="alternate" type="text/html"/>
    <link title="pdf" href="http://arxiv.org/pdf/1906.07403v1" rel="related" type="application/pdf"/>
    <arxiv:primary_category term="astro-ph.IM" scheme="http://arxiv.org/schemas/atom"/>
  </entry>
  <entry>
    <id>http://arxiv.org/abs/2101.00001v2</id>
    <published>2021-01-01T00:00:00Z</published>
    <title>Fast Radio Bursts</title>
    <summary>FRB survey.</summary>
    <author><name>Ann Smith</name></author>
  </entry>
</feed>"#;

    #[test]
    fn test_parse_feed_normalizes_entries() {
        let records = parse_atom_feed(FEED, "pulsar").unwrap();
        assert_eq!(records.len(), 2);

        let first = &records[0];
        assert_eq!(first.topic, "pulsar");
        assert_eq!(first.title, "Pulsar Candidate Identification with Deep Learning");
        assert_eq!(first.identifier, "10.1088/1674-4527/19/9/133");
        assert_eq!(first.doi.as_deref(), Some("10.1088/1674-4527/19/9/133"));
        assert_eq!(first.pdf_url.as_deref(), Some("http://arxiv.org/pdf/1906.07403v1"));
        assert_eq!(
            first.abstract_text,
            "We apply convolutional networks to pulsar candidates & RFI."
        );
        assert_eq!(first.authors, vec!["Jane Doe", "John Roe"]);
        assert_eq!(first.category.as_deref(), Some("astro-ph.IM"));
        assert_eq!(first.published, "2019-06-18");
    }

    #[test]
    fn test_entry_without_doi_uses_entry_id() {
        let records = parse_atom_feed(FEED, "frb").unwrap();
        let second = &records[1];
        assert!(second.doi.is_none());
        assert_eq!(second.identifier, "http://arxiv.org/abs/2101.00001v2");
        assert_eq!(
            second.pdf_url.as_deref(),
            Some("http://arxiv.org/pdf/2101.00001v2")
        );
    }

    #[test]
    fn test_arxiv_id_from_url() {
        assert_eq!(arxiv_id_from_url("http://arxiv.org/abs/1906.07403v1"), "1906.07403v1");
        assert_eq!(arxiv_id_from_url("http://arxiv.org/pdf/1906.07403v1.pdf"), "1906.07403v1");
        assert_eq!(
            arxiv_id_from_url("http://arxiv.org/abs/astro-ph/0601001v1"),
            "astro-ph/0601001v1"
        );
        assert_eq!(arxiv_id_from_url("1906.07403"), "1906.07403");
    }

    #[test]
    fn test_empty_feed_yields_no_records() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom"><title>empty</title></feed>"#;
        assert!(parse_atom_feed(xml, "none").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_page_sends_relevance_query() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/query")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("search_query".into(), "pulsar".into()),
                Matcher::UrlEncoded("start".into(), "0".into()),
                Matcher::UrlEncoded("max_results".into(), "2".into()),
                Matcher::UrlEncoded("sortBy".into(), "relevance".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/atom+xml")
            .with_body(FEED)
            .expect(1)
            .create_async()
            .await;

        let engine = ArxivSearchEngine::new(
            format!("{}/api/query", server.url()),
            Duration::from_secs(5),
        )
        .unwrap();
        let records = engine.fetch_page("pulsar", 0, 2).await.unwrap();

        assert_eq!(records.len(), 2);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_page_http_error_is_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/query")
            .match_query(Matcher::Any)
            .with_status(503)
            .create_async()
            .await;

        let engine = ArxivSearchEngine::new(
            format!("{}/api/query", server.url()),
            Duration::from_secs(5),
        )
        .unwrap();
        assert!(engine.fetch_page("pulsar", 0, 2).await.is_err());
    }
}
