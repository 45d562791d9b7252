use anyhow::{Context, Result};
use reqwest::multipart;
use reqwest::Client;
use serde::Serialize;

use crate::models::{ChunkResponse, HealthResponse, QueryResponse, UploadResponse};

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }

    pub async fn upload_document(&self, filename: &str, bytes: Vec<u8>) -> Result<UploadResponse> {
        let part = multipart::Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str("application/pdf")
            .context("failed to build upload form part")?;
        let form = multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(format!("{}/upload", self.base_url))
            .multipart(form)
            .send()
            .await
            .context("failed to call upload endpoint")?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!(error_payload_message(&body, "Failed to upload PDF"));
        }

        response
            .json::<UploadResponse>()
            .await
            .context("failed to decode upload response")
    }

    pub async fn submit_query(&self, query: &str) -> Result<QueryResponse> {
        #[derive(Serialize)]
        struct QueryReq<'a> {
            query: &'a str,
        }

        let response = self
            .client
            .post(format!("{}/query", self.base_url))
            .json(&QueryReq { query })
            .send()
            .await
            .context("failed to call query endpoint")?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!(error_payload_message(&body, "Failed to query document"));
        }

        response
            .json::<QueryResponse>()
            .await
            .context("failed to decode query response")
    }

    pub async fn fetch_chunk(&self, chunk_id: u32) -> Result<ChunkResponse> {
        let response = self
            .client
            .get(format!("{}/chunk/{chunk_id}", self.base_url))
            .send()
            .await
            .context("failed to call chunk endpoint")?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!(error_payload_message(&body, "Failed to fetch chunk"));
        }

        response
            .json::<ChunkResponse>()
            .await
            .context("failed to decode chunk response")
    }

    pub async fn reset(&self) -> Result<()> {
        let response = self
            .client
            .post(format!("{}/reset", self.base_url))
            .send()
            .await
            .context("failed to call reset endpoint")?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!(error_payload_message(&body, "Failed to reset session"));
        }

        Ok(())
    }

    pub async fn health(&self) -> Result<HealthResponse> {
        let response = self
            .client
            .get(format!("{}/health", self.base_url))
            .send()
            .await
            .context("failed to call health endpoint")?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!(error_payload_message(&body, "Failed to check backend health"));
        }

        response
            .json::<HealthResponse>()
            .await
            .context("failed to decode health response")
    }
}

// Backend failures arrive as {"error": "..."} payloads. Pull that message
// out when present; anything else gets the caller's fallback.
fn error_payload_message(body: &str, fallback: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return fallback.to_string();
    }

    if let Ok(json) = serde_json::from_str::<serde_json::Value>(trimmed) {
        if let Some(err) = json.get("error").and_then(|v| v.as_str()) {
            return err.to_string();
        }
    }

    fallback.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_payload_message_prefers_the_error_field() {
        let body = r#"{"error": "No document uploaded. Please upload a PDF first."}"#;
        assert_eq!(
            error_payload_message(body, "Failed to query document"),
            "No document uploaded. Please upload a PDF first."
        );
    }

    #[test]
    fn missing_error_field_falls_back() {
        let body = r#"{"detail": "something else"}"#;
        assert_eq!(
            error_payload_message(body, "Failed to upload PDF"),
            "Failed to upload PDF"
        );
    }

    #[test]
    fn non_json_body_falls_back() {
        assert_eq!(
            error_payload_message("<html>502 Bad Gateway</html>", "Failed to fetch chunk"),
            "Failed to fetch chunk"
        );
    }

    #[test]
    fn empty_body_falls_back() {
        assert_eq!(
            error_payload_message("   ", "Failed to reset session"),
            "Failed to reset session"
        );
    }

    #[test]
    fn non_string_error_value_falls_back() {
        let body = r#"{"error": 500}"#;
        assert_eq!(
            error_payload_message(body, "Failed to upload PDF"),
            "Failed to upload PDF"
        );
    }
}
