//! Retrievers over HTTP JSON endpoints.
//!
//! Both shapes send the query as a `query` parameter in a GET request.
//! A frame endpoint replies with a JSON array of row-objects; a text
//! endpoint replies with `{"answer": "..."}`. A 404 status or an empty
//! body is "no data", not an error.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;

use crate::annotation::TextAnswer;
use crate::error::RetrieverError;
use crate::frame::DataFrame;

use super::traits::{DataFrameRetriever, TextRetriever};

fn build_client(timeout: Duration) -> Result<Client, RetrieverError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| RetrieverError::Connection(format!("failed to create HTTP client: {}", e)))
}

fn classify(e: reqwest::Error) -> RetrieverError {
    if e.is_timeout() {
        RetrieverError::Timeout
    } else if e.is_connect() {
        RetrieverError::Connection(e.to_string())
    } else {
        RetrieverError::Api(e.to_string())
    }
}

async fn get_json(
    client: &Client,
    url: &str,
    query: &str,
) -> Result<Option<Value>, RetrieverError> {
    let response = client
        .get(url)
        .query(&[("query", query)])
        .send()
        .await
        .map_err(classify)?;

    if response.status() == StatusCode::NOT_FOUND {
        return Ok(None);
    }

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(RetrieverError::Api(format!("HTTP {}: {}", status, body)));
    }

    let value = response
        .json()
        .await
        .map_err(|e| RetrieverError::Decode(e.to_string()))?;
    Ok(Some(value))
}

/// A dataframe retriever over an HTTP records endpoint.
pub struct HttpDataFrameRetriever {
    name: String,
    client: Client,
    url: String,
    join_compatible: bool,
}

impl HttpDataFrameRetriever {
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, RetrieverError> {
        Ok(Self {
            name: name.into(),
            client: build_client(timeout)?,
            url: url.into(),
            join_compatible: false,
        })
    }

    pub fn with_join_compatible(mut self, join_compatible: bool) -> Self {
        self.join_compatible = join_compatible;
        self
    }
}

#[async_trait]
impl DataFrameRetriever for HttpDataFrameRetriever {
    fn name(&self) -> &str {
        &self.name
    }

    fn join_compatible(&self) -> bool {
        self.join_compatible
    }

    async fn fetch(&self, query: &str) -> Result<Option<DataFrame>, RetrieverError> {
        let Some(body) = get_json(&self.client, &self.url, query).await? else {
            return Ok(None);
        };

        let records = body
            .as_array()
            .ok_or_else(|| RetrieverError::Decode("expected a JSON array of records".to_string()))?;
        if records.is_empty() {
            return Ok(None);
        }

        let frame = DataFrame::from_records(records)
            .map_err(|e| RetrieverError::Decode(e.to_string()))?;
        Ok(Some(frame))
    }
}

/// A text retriever over an HTTP answer endpoint.
pub struct HttpTextRetriever {
    name: String,
    client: Client,
    url: String,
}

#[derive(Debug, Deserialize)]
struct AnswerBody {
    answer: Option<String>,
}

impl HttpTextRetriever {
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, RetrieverError> {
        Ok(Self {
            name: name.into(),
            client: build_client(timeout)?,
            url: url.into(),
        })
    }
}

#[async_trait]
impl TextRetriever for HttpTextRetriever {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, query: &str) -> Result<Option<TextAnswer>, RetrieverError> {
        let Some(body) = get_json(&self.client, &self.url, query).await? else {
            return Ok(None);
        };

        let parsed: AnswerBody = serde_json::from_value(body)
            .map_err(|e| RetrieverError::Decode(e.to_string()))?;

        Ok(parsed
            .answer
            .filter(|text| !text.trim().is_empty())
            .map(TextAnswer::new))
    }
}
