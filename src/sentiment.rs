//! Sentiment scoring delegated to an external text-analysis service
//!
//! The HTTP analyzer speaks the `documents:analyzeSentiment` dialect of the
//! Google Cloud Natural Language API.

use async_trait::async_trait;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::ServerConfig;
use crate::error::{HubError, Result};

const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(10);

/// Sentiment of one piece of text
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentScore {
    /// Overall polarity in [-1, 1]
    pub score: f32,
    /// Overall strength, never negative
    pub magnitude: f32,
}

impl SentimentScore {
    /// Clamp upstream values into their documented ranges
    pub fn normalized(score: f32, magnitude: f32) -> Self {
        let score = if score.is_nan() { 0.0 } else { score.clamp(-1.0, 1.0) };
        let magnitude = if magnitude.is_nan() { 0.0 } else { magnitude.max(0.0) };
        Self { score, magnitude }
    }
}

#[async_trait]
pub trait SentimentAnalyzer: Send + Sync {
    async fn analyze(&self, text: &str) -> Result<SentimentScore>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeRequest<'a> {
    document: Document<'a>,
    encoding_type: &'static str,
}

#[derive(Serialize)]
struct Document<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeResponse {
    document_sentiment: Option<UpstreamSentiment>,
}

#[derive(Deserialize)]
struct UpstreamSentiment {
    #[serde(default)]
    score: f32,
    #[serde(default)]
    magnitude: f32,
}

/// Analyzer backed by an HTTP text-analysis endpoint
pub struct HttpSentimentAnalyzer {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpSentimentAnalyzer {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(UPSTREAM_TIMEOUT)
            .build()
            .map_err(|e| HubError::SystemError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key,
        })
    }

    /// Build the analyzer when an endpoint is configured
    pub fn from_config(config: &ServerConfig) -> Result<Option<Self>> {
        match &config.sentiment_url {
            Some(url) => Self::new(url.clone(), config.sentiment_api_key.clone()).map(Some),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl SentimentAnalyzer for HttpSentimentAnalyzer {
    async fn analyze(&self, text: &str) -> Result<SentimentScore> {
        let body = AnalyzeRequest {
            document: Document {
                kind: "PLAIN_TEXT",
                content: text,
            },
            encoding_type: "UTF8",
        };

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(ref key) = self.api_key {
            request = request.query(&[("key", key)]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| HubError::UpstreamError(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            warn!("Sentiment service answered {}", status);
            return Err(HubError::UpstreamError(format!("status {}", status)));
        }

        let parsed: AnalyzeResponse = response
            .json()
            .await
            .map_err(|e| HubError::UpstreamError(format!("invalid response body: {}", e)))?;

        let sentiment = parsed.document_sentiment.ok_or_else(|| {
            HubError::UpstreamError("response carries no documentSentiment".to_string())
        })?;

        debug!(
            "Sentiment for {} chars: score={} magnitude={}",
            text.len(),
            sentiment.score,
            sentiment.magnitude
        );
        Ok(SentimentScore::normalized(sentiment.score, sentiment.magnitude))
    }
}
