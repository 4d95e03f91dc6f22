// src/config.rs
//! Environment-driven configuration, loaded once at startup after `dotenvy::dotenv()`.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{StudioError, StudioResult};

/// Default hold time per stage in simulated mode (ms).
pub const DEFAULT_STAGE_DURATIONS_MS: [u64; 5] = [3200, 4000, 5500, 3800, 2800];

pub const DEFAULT_POLL_MAX_ATTEMPTS: u32 = 90;

/// How stages 3–5 advance.
#[derive(Debug, Clone, PartialEq)]
pub enum DriveMode {
    /// Every stage is held active for a fixed duration.
    Simulated,
    /// Visuals, audio and export poll the status store until a terminal status.
    Polled {
        interval: Duration,
        max_attempts: u32,
    },
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub mode: DriveMode,
    pub stage_durations: Vec<Duration>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            mode: DriveMode::Simulated,
            stage_durations: DEFAULT_STAGE_DURATIONS_MS
                .iter()
                .map(|ms| Duration::from_millis(*ms))
                .collect(),
        }
    }
}

impl PipelineConfig {
    pub fn stage_duration(&self, index: usize) -> Duration {
        self.stage_durations
            .get(index)
            .copied()
            .unwrap_or_else(|| Duration::from_millis(DEFAULT_STAGE_DURATIONS_MS[index.min(4)]))
    }
}

/// Where an asset store lives.
#[derive(Debug, Clone, PartialEq)]
pub enum AssetSource {
    Directory(PathBuf),
    Bucket {
        base_url: String,
        bucket: String,
        api_key: Option<String>,
    },
    Disabled,
}

#[derive(Debug, Clone)]
pub struct StudioConfig {
    pub bind_addr: String,
    pub brief_analysis_url: Option<String>,
    pub voiceover_url: Option<String>,
    pub functions_api_key: Option<String>,
    pub database_url: Option<String>,
    pub pipeline: PipelineConfig,
    pub audio_assets: AssetSource,
    pub video_assets: AssetSource,
    pub http_timeout: Duration,
    pub asset_fetch_timeout: Duration,
}

impl StudioConfig {
    pub fn from_env() -> StudioResult<Self> {
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let stage_durations = match non_empty("STAGE_DURATIONS_MS") {
            Some(raw) => parse_durations(&raw)?,
            None => PipelineConfig::default().stage_durations,
        };

        let mode = match non_empty("PIPELINE_MODE").as_deref() {
            None | Some("simulated") => DriveMode::Simulated,
            Some("polled") => DriveMode::Polled {
                interval: Duration::from_millis(parse_number("POLL_INTERVAL_MS", 2000)?),
                max_attempts: match non_empty("POLL_MAX_ATTEMPTS") {
                    Some(raw) => parse_poll_attempts(&raw)?,
                    None => DEFAULT_POLL_MAX_ATTEMPTS,
                },
            },
            Some(other) => {
                return Err(StudioError::Config(format!(
                    "PIPELINE_MODE must be 'simulated' or 'polled', got '{}'",
                    other
                )))
            }
        };

        let storage_url = non_empty("STORAGE_URL");
        let storage_key = non_empty("STORAGE_API_KEY");

        Ok(Self {
            bind_addr,
            brief_analysis_url: non_empty("BRIEF_ANALYSIS_URL"),
            voiceover_url: non_empty("VOICEOVER_URL"),
            functions_api_key: non_empty("FUNCTIONS_API_KEY"),
            database_url: non_empty("DATABASE_URL"),
            pipeline: PipelineConfig { mode, stage_durations },
            audio_assets: asset_source("AUDIO_ASSETS_DIR", "AUDIO_BUCKET", "audio-assets", &storage_url, &storage_key),
            video_assets: asset_source("VIDEO_ASSETS_DIR", "VIDEO_BUCKET", "video-assets", &storage_url, &storage_key),
            http_timeout: Duration::from_secs(parse_number("HTTP_TIMEOUT_SECS", 60)?),
            asset_fetch_timeout: Duration::from_secs(parse_number("ASSET_FETCH_TIMEOUT_SECS", 30)?),
        })
    }
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_number(key: &str, default: u64) -> StudioResult<u64> {
    match non_empty(key) {
        Some(raw) => raw
            .parse::<u64>()
            .map_err(|_| StudioError::Config(format!("{} must be a positive integer, got '{}'", key, raw))),
        None => Ok(default),
    }
}

/// Parses the polling bound; at least one status check must be allowed.
pub fn parse_poll_attempts(raw: &str) -> StudioResult<u32> {
    match raw.trim().parse::<u32>() {
        Ok(0) | Err(_) => Err(StudioError::Config(format!(
            "POLL_MAX_ATTEMPTS must be between 1 and {}, got '{}'",
            u32::MAX,
            raw.trim()
        ))),
        Ok(attempts) => Ok(attempts),
    }
}

/// Parses a comma-separated list of five millisecond values.
pub fn parse_durations(raw: &str) -> StudioResult<Vec<Duration>> {
    let durations = raw
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| StudioError::Config(format!("invalid stage duration '{}'", part.trim())))
        })
        .collect::<StudioResult<Vec<_>>>()?;

    if durations.len() != DEFAULT_STAGE_DURATIONS_MS.len() {
        return Err(StudioError::Config(format!(
            "STAGE_DURATIONS_MS needs {} values, got {}",
            DEFAULT_STAGE_DURATIONS_MS.len(),
            durations.len()
        )));
    }
    Ok(durations)
}

fn asset_source(
    dir_key: &str,
    bucket_key: &str,
    default_bucket: &str,
    storage_url: &Option<String>,
    storage_key: &Option<String>,
) -> AssetSource {
    if let Some(dir) = non_empty(dir_key) {
        return AssetSource::Directory(PathBuf::from(dir));
    }
    match storage_url {
        Some(base_url) => AssetSource::Bucket {
            base_url: base_url.trim_end_matches('/').to_string(),
            bucket: non_empty(bucket_key).unwrap_or_else(|| default_bucket.to_string()),
            api_key: storage_key.clone(),
        },
        None => AssetSource::Disabled,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_parse_durations() {
        let durations = parse_durations("100, 200,300,400,500").unwrap();
        assert_eq!(durations[1], Duration::from_millis(200));
        assert_eq!(durations.len(), 5);

        assert!(parse_durations("100,200").is_err());
        assert!(parse_durations("100,abc,300,400,500").is_err());
    }

    #[test]
    fn test_poll_attempts_must_allow_a_check() {
        assert_eq!(parse_poll_attempts("90").unwrap(), 90);
        assert_eq!(parse_poll_attempts(" 1 ").unwrap(), 1);

        assert_matches!(parse_poll_attempts("0"), Err(StudioError::Config(_)));
        assert_matches!(parse_poll_attempts("4294967296"), Err(StudioError::Config(_)));
        assert_matches!(parse_poll_attempts("-3"), Err(StudioError::Config(_)));
    }

    #[test]
    fn test_default_pipeline_uses_studio_timings() {
        let config = PipelineConfig::default();
        assert_eq!(config.mode, DriveMode::Simulated);
        assert_eq!(config.stage_duration(2), Duration::from_millis(5500));
        assert_eq!(config.stage_duration(4), Duration::from_millis(2800));
    }
}
