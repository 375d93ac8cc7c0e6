use anyhow::Context;
use async_trait::async_trait;
use serde::Serialize;

/// Remote object-detection service.
#[async_trait]
pub trait Detector: Send + Sync {
    /// Runs `model` over the image at `image_url` and returns the service's JSON as-is.
    async fn detect(&self, image_url: &str, model: &str) -> anyhow::Result<serde_json::Value>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DetectBody<'a> {
    image_url: &'a str,
    model: &'a str,
}

pub struct HttpDetector {
    client: reqwest::Client,
    detect_url: String,
}

impl HttpDetector {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            detect_url: format!("{}/detect", base_url.trim_end_matches('/')),
        }
    }
}

#[async_trait]
impl Detector for HttpDetector {
    async fn detect(&self, image_url: &str, model: &str) -> anyhow::Result<serde_json::Value> {
        let res = self
            .client
            .post(&self.detect_url)
            .json(&DetectBody { image_url, model })
            .send()
            .await
            .with_context(|| format!("POST {}", self.detect_url))?
            .error_for_status()
            .context("detection service rejected request")?;
        res.json().await.context("decode detection response")
    }
}
