// src/peertube/model.rs

use std::path::Path;

use serde::Deserialize;

use crate::config::VideoDefaults;
use crate::watch::filter::split_extension;

/// Metadata sent along with an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoAttributes {
    pub name: String,
    pub category: u32,
    pub licence: u32,
    pub language: String,
    pub privacy: u32,
    pub description: String,
    pub tags: Vec<String>,
    pub download_enabled: bool,
    pub comments_enabled: bool,
    pub wait_transcoding: bool,
    pub nsfw: bool,
}

impl VideoAttributes {
    /// Attributes for `path`: the title is the file name without its
    /// extension, everything else comes from the configured defaults.
    pub fn for_file(path: &Path, defaults: &VideoDefaults) -> Self {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let (title, _) = split_extension(&file_name);

        Self {
            name: title.to_string(),
            category: defaults.category,
            licence: defaults.licence,
            language: defaults.language.clone(),
            privacy: defaults.privacy,
            description: defaults.description.clone(),
            tags: defaults.tags.clone(),
            download_enabled: defaults.download_enabled,
            comments_enabled: defaults.comments_enabled,
            wait_transcoding: defaults.wait_transcoding,
            nsfw: defaults.nsfw,
        }
    }

    /// Text fields of the multipart upload form, in submission order.
    ///
    /// `description` is only sent when non-empty, disabled comments map to
    /// `commentsPolicy = 2`, and each tag becomes its own `tags[]` field.
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("name", self.name.clone()),
            ("category", self.category.to_string()),
            ("licence", self.licence.to_string()),
            ("language", self.language.clone()),
            ("privacy", self.privacy.to_string()),
            ("downloadEnabled", self.download_enabled.to_string()),
            ("waitTranscoding", self.wait_transcoding.to_string()),
            ("nsfw", self.nsfw.to_string()),
        ];
        if !self.description.is_empty() {
            fields.push(("description", self.description.clone()));
        }
        if !self.comments_enabled {
            fields.push(("commentsPolicy", COMMENTS_POLICY_DISABLED.to_string()));
        }
        fields.extend(self.tags.iter().map(|t| ("tags[]", t.clone())));
        fields
    }
}

const COMMENTS_POLICY_DISABLED: u8 = 2;

/// What the server reports back for a finished upload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadedVideo {
    pub id: u64,
    pub uuid: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UploadResponse {
    pub video: UploadedVideo,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
}

/// Best-effort MIME type for the file part, keyed on extension.
pub fn video_mime(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("mp4") | Some("m4v") => "video/mp4",
        Some("webm") => "video/webm",
        Some("mkv") => "video/x-matroska",
        Some("avi") => "video/x-msvideo",
        Some("mov") => "video/quicktime",
        Some("flv") => "video/x-flv",
        Some("ogv") => "video/ogg",
        _ => "application/octet-stream",
    }
}
