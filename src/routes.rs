//! Warp filter tree for the hub endpoint and its HTTP neighbours

use std::convert::Infallible;
use std::path::PathBuf;
use std::sync::Arc;

use log::{info, warn};
use warp::path::FullPath;
use warp::{Filter, Reply};

use crate::auth::token::TokenManager;
use crate::config::ServerConfig;
use crate::constants::{CHAT_PATH, UPLOADS_PATH};
use crate::core::hub::{ChatHub, SharedHub};
use crate::error::Result;
use crate::handlers::{handle_rejection, handle_sentiment, handle_upload, handle_ws_client};
use crate::security::access::{with_access_control, AccessPolicy};
use crate::sentiment::{HttpSentimentAnalyzer, SentimentAnalyzer};
use crate::storage::uploads::UploadStore;

const SENTIMENT_BODY_LIMIT: u64 = 64 * 1024;

/// Everything the filters need, built once at startup
#[derive(Clone)]
pub struct AppState {
    pub hub: SharedHub,
    pub uploads: Arc<UploadStore>,
    pub analyzer: Option<Arc<dyn SentimentAnalyzer>>,
    pub access: Arc<AccessPolicy>,
    pub allowed_origins: Vec<String>,
    pub max_upload_bytes: u64,
}

impl AppState {
    pub fn from_config(config: &ServerConfig) -> Result<Self> {
        let analyzer: Option<Arc<dyn SentimentAnalyzer>> =
            match HttpSentimentAnalyzer::from_config(config)? {
                Some(analyzer) => Some(Arc::new(analyzer) as Arc<dyn SentimentAnalyzer>),
                None => {
                    warn!("No sentiment endpoint configured; scoring requests will be refused");
                    None
                }
            };

        Ok(Self {
            hub: Arc::new(ChatHub::from_config(config)),
            uploads: Arc::new(UploadStore::new(
                config.upload_dir.clone(),
                config.public_base_url.clone(),
            )),
            analyzer,
            access: Arc::new(AccessPolicy::new(
                &config.permit_urls,
                config.jwt_secret.as_deref().map(TokenManager::new),
            )),
            allowed_origins: config.allowed_origins.clone(),
            max_upload_bytes: config.max_upload_bytes,
        })
    }
}

// Helper function to include the hub in a request
fn with_hub(hub: SharedHub) -> impl Filter<Extract = (SharedHub,), Error = Infallible> + Clone {
    warp::any().map(move || hub.clone())
}

fn with_uploads(
    uploads: Arc<UploadStore>,
) -> impl Filter<Extract = (Arc<UploadStore>,), Error = Infallible> + Clone {
    warp::any().map(move || uploads.clone())
}

fn with_analyzer(
    analyzer: Option<Arc<dyn SentimentAnalyzer>>,
) -> impl Filter<Extract = (Option<Arc<dyn SentimentAnalyzer>>,), Error = Infallible> + Clone {
    warp::any().map(move || analyzer.clone())
}

fn optional_raw_query() -> impl Filter<Extract = (Option<String>,), Error = Infallible> + Clone {
    warp::query::raw()
        .map(Some)
        .or(warp::any().map(|| None))
        .unify()
}

fn cors(origins: &[String]) -> warp::cors::Builder {
    // warp panics on malformed origins, so only pass well-formed ones along
    let valid: Vec<&str> = origins
        .iter()
        .map(String::as_str)
        .filter(|o| {
            let parsed = url::Url::parse(o);
            let ok = parsed.map(|u| u.has_host()).unwrap_or(false) && !o.ends_with('/');
            if !ok {
                warn!("Ignoring malformed CORS origin '{}'", o);
            }
            ok
        })
        .collect();

    warp::cors()
        .allow_origins(valid)
        .allow_methods(vec!["GET", "POST"])
        .allow_headers(vec!["content-type", "authorization"])
}

/// The complete filter tree served by the binary
pub fn routes(state: AppState) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let chat = warp::path(CHAT_PATH)
        .and(warp::path::end())
        .and(warp::ws())
        .and(warp::path::full())
        .and(optional_raw_query())
        .and(with_hub(state.hub.clone()))
        .map(
            |ws: warp::ws::Ws, path: FullPath, query: Option<String>, hub: SharedHub| {
                let uri = match query {
                    Some(query) => format!("{}?{}", path.as_str(), query),
                    None => path.as_str().to_string(),
                };
                info!("New websocket connection: {}", uri);
                ws.on_upgrade(move |socket| handle_ws_client(socket, uri, hub))
            },
        );

    let upload = warp::path(UPLOADS_PATH)
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::multipart::form().max_length(state.max_upload_bytes))
        .and(with_uploads(state.uploads.clone()))
        .and_then(handle_upload);

    let upload_dir: PathBuf = state.uploads.dir().to_path_buf();
    let uploaded_files = warp::path(UPLOADS_PATH)
        .and(warp::get())
        .and(warp::fs::dir(upload_dir));

    let sentiment = warp::path!("diary" / "get-diary-score")
        .and(warp::post())
        .and(warp::body::content_length_limit(SENTIMENT_BODY_LIMIT))
        .and(warp::body::json())
        .and(with_analyzer(state.analyzer.clone()))
        .and_then(handle_sentiment);

    // Create health check route
    let health = warp::path("health").and(warp::path::end()).map(|| "OK");

    // Browsers may open the socket from any origin; the HTTP API is origin-restricted
    let http_api = upload
        .or(uploaded_files)
        .or(sentiment)
        .with(cors(&state.allowed_origins));

    with_access_control(state.access.clone())
        .and(chat.or(http_api).or(health))
        .recover(handle_rejection)
}
