use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::AppError;

/// Turns a CSV timetable into a distributable document (PDF). Rendering
/// runs out of process; callers must treat a failure as the loss of the
/// attachment, never of the data being rendered.
#[async_trait]
pub trait ArtifactRenderer: Send + Sync {
    async fn render(&self, csv: &[u8]) -> Result<Vec<u8>, AppError>;
}

pub struct HttpRenderer {
    client: Client,
    base_url: String,
}

impl HttpRenderer {
    pub fn new(base_url: impl Into<String>) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| AppError::Render(format!("Failed to build http client: {}", e)))?;
        let base_url = base_url.into();
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ArtifactRenderer for HttpRenderer {
    async fn render(&self, csv: &[u8]) -> Result<Vec<u8>, AppError> {
        let url = format!("{}/render", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "text/csv")
            .body(csv.to_vec())
            .send()
            .await
            .map_err(|e| AppError::Render(format!("Renderer request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Render(format!("Renderer error {}: {}", status, body)));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AppError::Render(format!("Failed to read rendered document: {}", e)))?;
        Ok(bytes.to_vec())
    }
}

/// Wired in when no renderer is configured; version snapshots absorb the
/// error and store no artifact.
pub struct NoopRenderer;

#[async_trait]
impl ArtifactRenderer for NoopRenderer {
    async fn render(&self, _csv: &[u8]) -> Result<Vec<u8>, AppError> {
        Err(AppError::Render("renderer not configured".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httptest::{Expectation, Server, matchers::*, responders::*};

    #[tokio::test]
    async fn test_http_renderer_posts_csv_and_returns_bytes() {
        let server = Server::run();
        server.expect(
            Expectation::matching(all_of![
                request::method_path("POST", "/render"),
                request::headers(contains(("content-type", "text/csv"))),
                request::body("course_code,day\nCS101,Monday\n"),
            ])
            .respond_with(status_code(200).body("%PDF-1.4 rendered")),
        );

        let renderer = HttpRenderer::new(server.url_str("")).expect("Failed to build renderer");
        let bytes = renderer
            .render(b"course_code,day\nCS101,Monday\n")
            .await
            .expect("Render failed");
        assert_eq!(bytes, b"%PDF-1.4 rendered");
    }

    #[tokio::test]
    async fn test_http_renderer_error_status_becomes_render_error() {
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("POST", "/render"))
                .respond_with(status_code(500).body("renderer exploded")),
        );

        let renderer = HttpRenderer::new(server.url_str("")).expect("Failed to build renderer");
        let err = renderer.render(b"x").await.expect_err("Expected an error");
        assert!(matches!(err, AppError::Render(_)));
    }

    #[tokio::test]
    async fn test_noop_renderer_always_fails() {
        let err = NoopRenderer.render(b"x").await.expect_err("Expected an error");
        assert!(matches!(err, AppError::Render(_)));
    }
}
