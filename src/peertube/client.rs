// src/peertube/client.rs

use std::fmt;
use std::path::Path;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::{Body, Response, StatusCode};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::config::PeerTubeSection;

use super::model::{ClientCredentials, TokenResponse, UploadResponse, video_mime};
use super::{ClientFuture, PeerTubeError, UploadClient, UploadedVideo, VideoAttributes};

/// `reqwest`-backed PeerTube API client using the OAuth password grant.
pub struct PeerTubeClient {
    base_url: String,
    username: String,
    password: String,
    http: reqwest::Client,
    token: RwLock<Option<String>>,
}

impl fmt::Debug for PeerTubeClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeerTubeClient")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl PeerTubeClient {
    pub fn new(
        base_url: &str,
        username: impl Into<String>,
        password: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, PeerTubeError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            username: username.into(),
            password: password.into(),
            http,
            token: RwLock::new(None),
        })
    }

    pub fn from_config(cfg: &PeerTubeSection) -> Result<Self, PeerTubeError> {
        Self::new(
            &cfg.url,
            cfg.username.clone(),
            cfg.password.clone(),
            Duration::from_secs(cfg.timeout_secs),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn fetch_token(&self) -> Result<String, PeerTubeError> {
        let url = format!("{}/api/v1/oauth-clients/local", self.base_url);
        let resp = expect_success(self.http.get(url).send().await?, "oauth clients request failed")
            .await?;
        let creds: ClientCredentials = resp.json().await?;

        let url = format!("{}/api/v1/users/token", self.base_url);
        let form = [
            ("client_id", creds.client_id.as_str()),
            ("client_secret", creds.client_secret.as_str()),
            ("grant_type", "password"),
            ("response_type", "code"),
            ("username", self.username.as_str()),
            ("password", self.password.as_str()),
        ];
        let resp = expect_success(
            self.http.post(url).form(&form).send().await?,
            "authentication failed",
        )
        .await?;
        let token: TokenResponse = resp.json().await?;

        Ok(token.access_token)
    }

    async fn authenticate_inner(&self) -> Result<(), PeerTubeError> {
        let token = self.fetch_token().await?;
        *self.token.write().await = Some(token);
        debug!(url = %self.base_url, "obtained access token");
        Ok(())
    }

    async fn current_token(&self) -> Result<String, PeerTubeError> {
        if let Some(token) = self.token.read().await.clone() {
            return Ok(token);
        }
        self.authenticate_inner().await?;
        self.token
            .read()
            .await
            .clone()
            .ok_or_else(|| PeerTubeError::Rejected("no access token after authentication".into()))
    }

    async fn upload_inner(
        &self,
        path: &Path,
        attrs: &VideoAttributes,
    ) -> Result<UploadedVideo, PeerTubeError> {
        let token = self.current_token().await?;

        let file_err = |source| PeerTubeError::File {
            path: path.to_path_buf(),
            source,
        };
        let file = tokio::fs::File::open(path).await.map_err(file_err)?;
        let len = file.metadata().await.map_err(file_err)?.len();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| attrs.name.clone());

        let part = Part::stream_with_length(Body::from(file), len)
            .file_name(file_name)
            .mime_str(video_mime(path))?;

        let form = attrs
            .form_fields()
            .into_iter()
            .fold(Form::new().part("videofile", part), |form, (key, value)| {
                form.text(key, value)
            });

        info!(path = %path.display(), bytes = len, "uploading video");

        let url = format!("{}/api/v1/videos/upload", self.base_url);
        let resp = self
            .http
            .post(url)
            .bearer_auth(&token)
            .multipart(form)
            .send()
            .await?;

        if resp.status() == StatusCode::UNAUTHORIZED {
            // Force a fresh login on the next attempt.
            *self.token.write().await = None;
        }

        let resp = expect_success(resp, "upload failed").await?;
        let mut video = resp.json::<UploadResponse>().await?.video;
        if video.name.is_empty() {
            video.name = attrs.name.clone();
        }
        Ok(video)
    }
}

impl UploadClient for PeerTubeClient {
    fn authenticate(&self) -> ClientFuture<'_, ()> {
        Box::pin(self.authenticate_inner())
    }

    fn upload<'a>(
        &'a self,
        path: &'a Path,
        attrs: &'a VideoAttributes,
    ) -> ClientFuture<'a, UploadedVideo> {
        Box::pin(self.upload_inner(path, attrs))
    }
}

async fn expect_success(resp: Response, context: &'static str) -> Result<Response, PeerTubeError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(PeerTubeError::Status {
        context,
        status,
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_trailing_slash_from_base_url() {
        let client = PeerTubeClient::new(
            "https://videos.example.org/",
            "u",
            "p",
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(client.base_url(), "https://videos.example.org");
    }

    #[test]
    fn debug_output_hides_password() {
        let client =
            PeerTubeClient::new("https://videos.example.org", "u", "s3cret", Duration::from_secs(5))
                .unwrap();
        assert!(!format!("{client:?}").contains("s3cret"));
    }
}
