use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{error, info};

use crate::domain::{
    repositories::storage::ImageStorageClient, value_objects::images::ImageUpload,
};

const UPLOAD_TRANSFORMATION: &str = "c_limit,h_800,q_auto,w_800";

#[derive(Debug, Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    pub folder: String,
    pub timeout_secs: u64,
}

pub struct CloudinaryStorageClient {
    http: reqwest::Client,
    upload_url: String,
    api_key: String,
    api_secret: String,
    folder: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: Option<String>,
}

impl CloudinaryStorageClient {
    pub fn new(config: CloudinaryConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build Cloudinary http client")?;

        Ok(Self {
            http,
            upload_url: format!(
                "https://api.cloudinary.com/v1_1/{}/image/upload",
                config.cloud_name
            ),
            api_key: config.api_key,
            api_secret: config.api_secret,
            folder: config.folder,
        })
    }
}

/// Signs upload parameters: `k=v` pairs sorted by key, joined with `&`,
/// followed by the API secret, hashed with SHA-256.
/// https://cloudinary.com/documentation/authentication_signatures
pub fn sign_params(params: &[(&str, String)], api_secret: &str) -> String {
    let mut sorted: Vec<&(&str, String)> = params.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let to_sign = sorted
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

#[async_trait]
impl ImageStorageClient for CloudinaryStorageClient {
    async fn upload_image(&self, image: ImageUpload) -> Result<String> {
        let timestamp = Utc::now().timestamp().to_string();
        let signed: Vec<(&str, String)> = vec![
            ("folder", self.folder.clone()),
            ("timestamp", timestamp),
            ("transformation", UPLOAD_TRANSFORMATION.to_string()),
        ];
        let signature = sign_params(&signed, &self.api_secret);

        let mime = image.mime_type();
        let size = image.bytes.len();
        let part = Part::bytes(image.bytes)
            .file_name(image.file_name.clone())
            .mime_str(&mime)?;

        let mut form = Form::new()
            .part("file", part)
            .text("api_key", self.api_key.clone())
            .text("signature", signature)
            .text("signature_algorithm", "sha256");
        for (key, value) in signed {
            form = form.text(key, value);
        }

        let resp = self
            .http
            .post(&self.upload_url)
            .multipart(form)
            .send()
            .await
            .context("failed to reach Cloudinary")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            let preview = body.chars().take(512).collect::<String>();
            error!(
                status = %status,
                file_name = %image.file_name,
                response_body = %preview,
                "cloudinary: upload failed"
            );
            anyhow::bail!("Cloudinary upload failed (status {})", status);
        }

        let parsed: UploadResponse = resp.json().await?;
        info!(
            file_name = %image.file_name,
            size_bytes = size,
            public_id = ?parsed.public_id,
            "cloudinary: image uploaded"
        );

        Ok(parsed.secure_url)
    }
}
