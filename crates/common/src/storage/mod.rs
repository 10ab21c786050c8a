//! Blob-store reference checks
//!
//! Papers are uploaded to the external blob store by the client; this
//! service only receives the resulting `pdf_url`. Before accepting a
//! submission, the gateway can HEAD that reference to confirm it exists,
//! is a PDF, and is within the size limit the portal advertises.

use std::time::Duration;

use crate::config::UploadConfig;
use crate::errors::{AppError, Result};

/// Verifies submitted pdf_url references against the blob store
pub struct UploadVerifier {
    client: reqwest::Client,
    max_pdf_bytes: u64,
    enabled: bool,
}

impl UploadVerifier {
    pub fn new(config: &UploadConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.verify_timeout_secs))
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("Failed to build upload verifier client: {}", e),
            })?;

        Ok(Self {
            client,
            max_pdf_bytes: config.max_pdf_bytes,
            enabled: config.verify_references,
        })
    }

    /// Check a submitted reference. A disabled verifier accepts anything
    /// that parses as an http(s) URL.
    pub async fn verify(&self, pdf_url: &str) -> Result<()> {
        let url: reqwest::Url = pdf_url.parse().map_err(|_| AppError::Validation {
            message: format!("pdf_url '{}' is not a valid URL", pdf_url),
            field: Some("pdf_url".to_string()),
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(AppError::Validation {
                message: "pdf_url must be an http(s) reference".to_string(),
                field: Some("pdf_url".to_string()),
            });
        }

        if !self.enabled {
            return Ok(());
        }

        let response = self
            .client
            .head(url)
            .send()
            .await
            .map_err(|e| AppError::Validation {
                message: format!("pdf_url is not reachable: {}", e),
                field: Some("pdf_url".to_string()),
            })?;

        if !response.status().is_success() {
            return Err(AppError::Validation {
                message: format!("pdf_url returned status {}", response.status()),
                field: Some("pdf_url".to_string()),
            });
        }

        if let Some(content_type) = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
        {
            if !content_type.starts_with("application/pdf") {
                return Err(AppError::Validation {
                    message: format!("pdf_url is not a PDF (content type '{}')", content_type),
                    field: Some("pdf_url".to_string()),
                });
            }
        }

        if let Some(length) = response.content_length() {
            if length > self.max_pdf_bytes {
                return Err(AppError::Validation {
                    message: format!(
                        "PDF is {} bytes, limit is {} bytes",
                        length, self.max_pdf_bytes
                    ),
                    field: Some("pdf_url".to_string()),
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UploadConfig;

    fn disabled_verifier() -> UploadVerifier {
        UploadVerifier::new(&UploadConfig {
            verify_references: false,
            ..UploadConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_rejects_non_url() {
        let verifier = disabled_verifier();
        assert!(verifier.verify("not a url").await.is_err());
    }

    #[tokio::test]
    async fn test_rejects_non_http_scheme() {
        let verifier = disabled_verifier();
        assert!(verifier.verify("ftp://blobs.example/p.pdf").await.is_err());
    }

    #[tokio::test]
    async fn test_disabled_accepts_https() {
        let verifier = disabled_verifier();
        assert!(verifier
            .verify("https://blobs.example/papers/p.pdf")
            .await
            .is_ok());
    }
}
