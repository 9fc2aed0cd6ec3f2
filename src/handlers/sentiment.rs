//! Sentiment scoring endpoint

use std::convert::Infallible;
use std::sync::Arc;

use log::warn;
use serde::Deserialize;
use serde_json::json;
use warp::http::StatusCode;
use warp::reply::{Json, WithStatus};

use crate::sentiment::SentimentAnalyzer;

#[derive(Debug, Deserialize)]
pub struct SentimentRequest {
    pub text: String,
}

/// Score `request.text`; any upstream problem is answered with 400
pub async fn handle_sentiment(
    request: SentimentRequest,
    analyzer: Option<Arc<dyn SentimentAnalyzer>>,
) -> Result<WithStatus<Json>, Infallible> {
    let analyzer = match analyzer {
        Some(analyzer) => analyzer,
        None => {
            return Ok(warp::reply::with_status(
                warp::reply::json(&json!({ "error": "Sentiment analysis is not configured" })),
                StatusCode::BAD_REQUEST,
            ))
        }
    };

    if request.text.trim().is_empty() {
        return Ok(warp::reply::with_status(
            warp::reply::json(&json!({ "error": "Text must not be empty" })),
            StatusCode::BAD_REQUEST,
        ));
    }

    match analyzer.analyze(&request.text).await {
        Ok(score) => Ok(warp::reply::with_status(
            warp::reply::json(&score),
            StatusCode::OK,
        )),
        Err(e) => {
            warn!("Sentiment analysis failed: {}", e);
            Ok(warp::reply::with_status(
                warp::reply::json(&json!({ "error": e.to_string() })),
                StatusCode::BAD_REQUEST,
            ))
        }
    }
}
