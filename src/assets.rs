// src/assets.rs
//! Audio and video object stores, looked up by a file name containing the session id.
//! Used only when bundling; every lookup and fetch is a single, time-bounded attempt.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::AssetSource;
use crate::error::{StudioError, StudioResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Audio,
    Video,
}

impl AssetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::Audio => "audio",
            AssetKind::Video => "video",
        }
    }

    /// Folder name used inside the bundle.
    pub fn bundle_dir(&self) -> &'static str {
        match self {
            AssetKind::Audio => "voiceover",
            AssetKind::Video => "video",
        }
    }
}

/// A located asset: its stored name and where it can be reached from outside.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssetRef {
    pub name: String,
    pub location: String,
}

#[async_trait]
pub trait AssetStore: Send + Sync {
    fn kind(&self) -> AssetKind;

    /// First asset whose name contains `session_id`, if any.
    async fn locate(&self, session_id: &str) -> StudioResult<Option<AssetRef>>;

    async fn fetch(&self, asset: &AssetRef) -> StudioResult<Vec<u8>>;
}

/// Builds the store for a configured source. `None` when the source is disabled.
pub fn from_source(
    kind: AssetKind,
    source: &AssetSource,
    timeout: Duration,
) -> StudioResult<Option<Box<dyn AssetStore>>> {
    let store: Box<dyn AssetStore> = match source {
        AssetSource::Directory(root) => Box::new(DirAssetStore::new(kind, root.clone(), timeout)),
        AssetSource::Bucket { base_url, bucket, api_key } => Box::new(HttpAssetStore::new(
            kind,
            base_url.clone(),
            bucket.clone(),
            api_key.clone(),
            timeout,
        )?),
        AssetSource::Disabled => return Ok(None),
    };
    Ok(Some(store))
}

// ============================================================================
// LOCAL DIRECTORY
// ============================================================================

pub struct DirAssetStore {
    kind: AssetKind,
    root: PathBuf,
    timeout: Duration,
}

impl DirAssetStore {
    pub fn new(kind: AssetKind, root: PathBuf, timeout: Duration) -> Self {
        Self { kind, root, timeout }
    }

    async fn scan(&self, session_id: &str) -> StudioResult<Option<AssetRef>> {
        if !tokio::fs::try_exists(&self.root).await? {
            tracing::debug!("{} asset directory {} does not exist", self.kind.as_str(), self.root.display());
            return Ok(None);
        }

        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if name.contains(session_id) {
                names.push(name);
            }
        }

        // read_dir order is platform-defined
        names.sort();
        Ok(names.into_iter().next().map(|name| AssetRef {
            location: self.root.join(&name).display().to_string(),
            name,
        }))
    }
}

#[async_trait]
impl AssetStore for DirAssetStore {
    fn kind(&self) -> AssetKind {
        self.kind
    }

    async fn locate(&self, session_id: &str) -> StudioResult<Option<AssetRef>> {
        tokio::time::timeout(self.timeout, self.scan(session_id))
            .await
            .map_err(|_| StudioError::Unavailable(format!("{} asset lookup timed out", self.kind.as_str())))?
    }

    async fn fetch(&self, asset: &AssetRef) -> StudioResult<Vec<u8>> {
        tokio::time::timeout(self.timeout, tokio::fs::read(self.root.join(&asset.name)))
            .await
            .map_err(|_| StudioError::Unavailable(format!("reading {} timed out", asset.name)))?
            .map_err(StudioError::from)
    }
}

// ============================================================================
// HTTP OBJECT STORAGE BUCKET
// ============================================================================

#[derive(Deserialize, Debug)]
struct ListedObject {
    name: String,
}

pub struct HttpAssetStore {
    kind: AssetKind,
    client: Client,
    base_url: String,
    bucket: String,
    api_key: Option<String>,
}

impl HttpAssetStore {
    pub fn new(
        kind: AssetKind,
        base_url: String,
        bucket: String,
        api_key: Option<String>,
        timeout: Duration,
    ) -> StudioResult<Self> {
        Ok(Self {
            kind,
            client: Client::builder().timeout(timeout).build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            bucket,
            api_key,
        })
    }

    pub fn public_url(&self, name: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url,
            self.bucket,
            urlencoding::encode(name)
        )
    }
}

#[async_trait]
impl AssetStore for HttpAssetStore {
    fn kind(&self) -> AssetKind {
        self.kind
    }

    async fn locate(&self, session_id: &str) -> StudioResult<Option<AssetRef>> {
        let url = format!("{}/storage/v1/object/list/{}", self.base_url, self.bucket);
        let mut call = self
            .client
            .post(&url)
            .json(&json!({ "prefix": "", "search": session_id, "limit": 1 }));

        if let Some(ref key) = self.api_key {
            call = call.header("apikey", key).bearer_auth(key);
        }

        let response = call.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(StudioError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        let objects: Vec<ListedObject> = response
            .json()
            .await
            .map_err(|e| StudioError::MalformedResponse(format!("bucket listing: {}", e)))?;

        Ok(objects
            .into_iter()
            .find(|o| o.name.contains(session_id))
            .map(|o| AssetRef {
                location: self.public_url(&o.name),
                name: o.name,
            }))
    }

    async fn fetch(&self, asset: &AssetRef) -> StudioResult<Vec<u8>> {
        let response = self.client.get(&asset.location).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(StudioError::Upstream {
                status: status.as_u16(),
                message: format!("download of {} failed", asset.name),
            });
        }
        Ok(response.bytes().await?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_directory_lookup_matches_session_substring() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("voiceover-abc123.mp3"), b"ID3audio").unwrap();
        std::fs::write(dir.path().join("voiceover-zzz.mp3"), b"other").unwrap();

        let store = DirAssetStore::new(AssetKind::Audio, dir.path().to_path_buf(), Duration::from_secs(5));
        let asset = store.locate("abc123").await.unwrap().unwrap();
        assert_eq!(asset.name, "voiceover-abc123.mp3");
        assert_eq!(store.fetch(&asset).await.unwrap(), b"ID3audio".to_vec());

        assert!(store.locate("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_directory_is_a_lookup_miss() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirAssetStore::new(AssetKind::Video, dir.path().join("nope"), Duration::from_secs(5));
        assert!(store.locate("abc").await.unwrap().is_none());
    }

    #[test]
    fn test_public_url_encodes_name() {
        let store = HttpAssetStore::new(
            AssetKind::Video,
            "https://project.example.co/".to_string(),
            "video-assets".to_string(),
            None,
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(
            store.public_url("ad s1.mp4"),
            "https://project.example.co/storage/v1/object/public/video-assets/ad%20s1.mp4"
        );
    }

    #[test]
    fn test_disabled_source_builds_no_store() {
        let store = from_source(AssetKind::Audio, &AssetSource::Disabled, Duration::from_secs(1)).unwrap();
        assert!(store.is_none());
    }
}
