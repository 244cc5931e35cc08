//! 通过Neo4j HTTP事务接口查询词频

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;

use super::StructuralOracle;
use crate::config::ScoringConfig;

const COUNT_QUERY: &str = "MATCH (n:Words) \
WHERE n.other CONTAINS $quoted OR n.name = $entity \
RETURN n.count \
ORDER BY n.count DESC \
LIMIT 1";

pub struct Neo4jHttpOracle {
    http: reqwest::Client,
    commit_url: String,
    user: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct CommitResponse {
    #[serde(default)]
    results: Vec<StatementResult>,
    #[serde(default)]
    errors: Vec<Neo4jError>,
}

#[derive(Debug, Deserialize)]
struct StatementResult {
    #[serde(default)]
    data: Vec<Row>,
}

#[derive(Debug, Deserialize)]
struct Row {
    row: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct Neo4jError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

impl Neo4jHttpOracle {
    pub fn new(config: &ScoringConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("无法创建Neo4j HTTP客户端")?;
        Ok(Self {
            http,
            commit_url: format!(
                "{}/db/{}/tx/commit",
                config.neo4j_url.trim_end_matches('/'),
                config.database
            ),
            user: config.user.clone(),
            password: config.password.clone(),
        })
    }
}

#[async_trait]
impl StructuralOracle for Neo4jHttpOracle {
    async fn count(&self, entity: &str) -> Result<u64> {
        let body = json!({
            "statements": [{
                "statement": COUNT_QUERY,
                "parameters": {"entity": entity, "quoted": format!("'{}'", entity)}
            }]
        });

        let response: CommitResponse = self
            .http
            .post(&self.commit_url)
            .basic_auth(&self.user, Some(&self.password))
            .json(&body)
            .send()
            .await
            .context("Neo4j请求失败")?
            .error_for_status()?
            .json()
            .await
            .context("Neo4j响应解析失败")?;

        if let Some(error) = response.errors.first() {
            bail!("Neo4j错误 {}: {}", error.code, error.message);
        }

        let value = response
            .results
            .first()
            .and_then(|r| r.data.first())
            .and_then(|row| row.row.first());

        Ok(match value {
            Some(Value::Number(n)) => n
                .as_u64()
                .or_else(|| n.as_f64().map(|f| f.max(0.0) as u64))
                .unwrap_or(0),
            _ => 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    fn oracle(url: &str) -> Neo4jHttpOracle {
        Neo4jHttpOracle::new(&ScoringConfig {
            neo4j_url: url.to_string(),
            database: "neo4j".to_string(),
            user: "neo4j".to_string(),
            password: "pw".to_string(),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_count_is_read_from_first_row() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/db/neo4j/tx/commit")
            .match_body(Matcher::PartialJson(json!({
                "statements": [{"parameters": {"entity": "pulsar", "quoted": "'pulsar'"}}]
            })))
            .with_status(200)
            .with_body(
                json!({"results": [{"columns": ["n.count"], "data": [{"row": [42], "meta": [null]}]}], "errors": []})
                    .to_string(),
            )
            .create_async()
            .await;

        assert_eq!(oracle(&server.url()).count("pulsar").await.unwrap(), 42);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_unknown_entity_counts_zero() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/db/neo4j/tx/commit")
            .with_status(200)
            .with_body(json!({"results": [{"columns": ["n.count"], "data": []}], "errors": []}).to_string())
            .create_async()
            .await;

        assert_eq!(oracle(&server.url()).count("nothing").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_cypher_error_is_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/db/neo4j/tx/commit")
            .with_status(200)
            .with_body(
                json!({"results": [], "errors": [{"code": "Neo.ClientError.Security.Unauthorized", "message": "bad credentials"}]})
                    .to_string(),
            )
            .create_async()
            .await;

        let err = oracle(&server.url()).count("x").await.unwrap_err();
        assert!(err.to_string().contains("Unauthorized"));
    }
}
