//! HTTP-backed vision analyzer client.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use crate::analyzer::VisionAnalyzer;
use crate::error::{VisionError, VisionResult};
use crate::types::{DescribeResult, Frame, ModelCard, OcrResult};

/// Configuration for the HTTP vision analyzer.
#[derive(Debug, Clone)]
pub struct HttpVisionConfig {
    pub base_url: String,
    pub model_name: String,
    pub model_version: String,
    pub request_timeout: Duration,
}

impl HttpVisionConfig {
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("VISION_SERVICE_URL")
                .unwrap_or_else(|_| "http://localhost:8800".to_string()),
            model_name: std::env::var("VISION_MODEL_NAME")
                .unwrap_or_else(|_| "default-vision".to_string()),
            model_version: std::env::var("VISION_MODEL_VERSION")
                .unwrap_or_else(|_| "1".to_string()),
            request_timeout: Duration::from_secs(
                std::env::var("VISION_REQUEST_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(60),
            ),
        }
    }
}

#[derive(Serialize)]
struct FramePathRequest<'a> {
    path: &'a str,
}

/// Vision analyzer backed by an external HTTP service.
///
/// The service is treated as a pure function per asset frame; this client
/// owns only the request/response plumbing.
pub struct HttpVisionAnalyzer {
    client: reqwest::Client,
    config: HttpVisionConfig,
}

impl HttpVisionAnalyzer {
    pub fn new(config: HttpVisionConfig) -> VisionResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { client, config })
    }

    pub fn from_env() -> VisionResult<Self> {
        Self::new(HttpVisionConfig::from_env())
    }

    async fn post<T: serde::de::DeserializeOwned>(
        &self,
        path_suffix: &str,
        frame: &Frame,
    ) -> VisionResult<T> {
        let url = format!("{}/{}", self.config.base_url.trim_end_matches('/'), path_suffix);
        let body = FramePathRequest {
            path: frame
                .path
                .to_str()
                .ok_or_else(|| VisionError::FrameNotFound(frame.path.display().to_string()))?,
        };

        debug!(url = %url, "Calling vision service");

        let resp = self.client.post(&url).json(&body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(VisionError::BadResponse {
                status: status.as_u16(),
                body,
            });
        }

        Ok(resp.json::<T>().await?)
    }
}

#[async_trait]
impl VisionAnalyzer for HttpVisionAnalyzer {
    async fn describe(&self, frame: &Frame) -> VisionResult<DescribeResult> {
        self.post("describe", frame).await
    }

    async fn ocr(&self, frame: &Frame) -> VisionResult<OcrResult> {
        self.post("ocr", frame).await
    }

    fn model_card(&self) -> ModelCard {
        ModelCard {
            name: self.config.model_name.clone(),
            version: self.config.model_version.clone(),
        }
    }
}
