//! Client for the resume API's image upload endpoint

use crate::packager::PackagedFile;
use crate::{Error, Result};
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Path of the upload endpoint for one resume
pub fn upload_images_path(resume_id: &str) -> String {
    format!("/api/resume/{}/upload-images", resume_id)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub thumbnail_link: Option<String>,
    #[serde(default)]
    pub profile_preview_url: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UploadClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl UploadClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, token, Duration::from_secs(30))
    }

    pub fn with_timeout(base_url: impl Into<String>, token: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::ConfigError(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    fn part(file: &PackagedFile) -> Result<Part> {
        Ok(Part::bytes(file.bytes.clone())
            .file_name(file.name.clone())
            .mime_str(&file.mime)?)
    }

    /// Send the thumbnail and/or profile image of `resume_id`
    pub async fn upload_resume_images(
        &self,
        resume_id: &str,
        thumbnail: Option<&PackagedFile>,
        profile_image: Option<&PackagedFile>,
    ) -> Result<UploadResponse> {
        if thumbnail.is_none() && profile_image.is_none() {
            return Err(Error::InvalidInput("nothing to upload".into()));
        }
        let mut form = Form::new();
        if let Some(f) = thumbnail {
            form = form.part("thumbnail", Self::part(f)?);
        }
        if let Some(f) = profile_image {
            form = form.part("profileImage", Self::part(f)?);
        }

        let url = format!("{}{}", self.base_url, upload_images_path(resume_id));
        log::debug!("PUT {}", url);
        let resp = self
            .client
            .put(&url)
            .bearer_auth(&self.token)
            .multipart(form)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.message.or(b.error))
                .unwrap_or(body);
            return Err(Error::UploadError {
                status: status.as_u16(),
                message,
            });
        }
        let parsed: UploadResponse = serde_json::from_str(&body)
            .map_err(|e| Error::NetworkError(format!("unexpected upload response: {}", e)))?;
        log::info!("uploaded images for resume {}", resume_id);
        Ok(parsed)
    }
}
