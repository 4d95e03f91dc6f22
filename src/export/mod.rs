// src/export/mod.rs
//! Downloadable asset bundle: manifest, transcript and script PDF, plus the
//! voiceover and rendered video when their stores have them.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::assets::{AssetKind, AssetRef, AssetStore};
use crate::error::{StudioError, StudioResult};
use crate::store::SessionRecord;
use crate::types::{AdScript, ExtractedInfo, Segment, SessionStatus};

pub mod pdf;

use pdf::PdfDocument;

/// What a bundle is built from.
#[derive(Debug, Clone)]
pub struct BundleInput {
    pub session_id: String,
    pub extracted_info: Option<ExtractedInfo>,
    pub script: AdScript,
    pub generated_at: DateTime<Utc>,
}

impl BundleInput {
    /// Only completed sessions with a script can be bundled.
    pub fn from_record(record: &SessionRecord) -> StudioResult<Self> {
        if record.status != SessionStatus::Completed {
            return Err(StudioError::InvalidInput(format!(
                "session {} is {:?}, only completed sessions can be exported",
                record.session_id, record.status
            )));
        }
        let script = record.ad_script.clone().ok_or_else(|| {
            StudioError::InvalidInput(format!("session {} has no script yet", record.session_id))
        })?;
        Ok(Self {
            session_id: record.session_id.clone(),
            extracted_info: record.extracted_info.clone(),
            script,
            generated_at: Utc::now(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetStatus {
    /// Bytes are in the bundle.
    Included,
    /// Located but not fetched; the bundle holds a pointer instead.
    Linked,
    Missing,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetEntry {
    pub kind: AssetKind,
    pub status: AssetStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TimingEntry<'a> {
    segment: Segment,
    label: &'static str,
    window: String,
    start_seconds: u32,
    end_seconds: u32,
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Manifest<'a> {
    session_id: &'a str,
    generated_at: DateTime<Utc>,
    extracted_info: Option<&'a ExtractedInfo>,
    script: &'a AdScript,
    timing: Vec<TimingEntry<'a>>,
    assets: &'a [AssetEntry],
}

pub struct Bundle {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub assets: Vec<AssetEntry>,
}

enum Media {
    Fetched { asset: AssetRef, bytes: Vec<u8> },
    Unfetched { asset: AssetRef },
    Missing,
}

pub struct BundleAssembler {
    audio: Option<Box<dyn AssetStore>>,
    video: Option<Box<dyn AssetStore>>,
}

impl BundleAssembler {
    pub fn new(audio: Option<Box<dyn AssetStore>>, video: Option<Box<dyn AssetStore>>) -> Self {
        Self { audio, video }
    }

    pub async fn assemble(&self, input: &BundleInput) -> StudioResult<Bundle> {
        tracing::info!("📦 Assembling bundle for session {}", input.session_id);

        let audio = resolve(self.audio.as_deref(), &input.session_id).await;
        let video = resolve(self.video.as_deref(), &input.session_id).await;

        let mut assets = Vec::with_capacity(2);
        let mut media_entries: Vec<(String, Vec<u8>)> = Vec::new();
        for (kind, media) in [(AssetKind::Audio, audio), (AssetKind::Video, video)] {
            match media {
                Media::Fetched { asset, bytes } => {
                    let entry = format!("{}/{}", kind.bundle_dir(), asset.name);
                    assets.push(AssetEntry {
                        kind,
                        status: AssetStatus::Included,
                        entry: Some(entry.clone()),
                        location: Some(asset.location),
                    });
                    media_entries.push((entry, bytes));
                }
                Media::Unfetched { asset } => {
                    let entry = format!("{}-link.txt", kind.as_str());
                    let pointer = format!("{}\n{}\n", asset.name, asset.location);
                    assets.push(AssetEntry {
                        kind,
                        status: AssetStatus::Linked,
                        entry: Some(entry.clone()),
                        location: Some(asset.location),
                    });
                    media_entries.push((entry, pointer.into_bytes()));
                }
                Media::Missing => assets.push(AssetEntry {
                    kind,
                    status: AssetStatus::Missing,
                    entry: None,
                    location: None,
                }),
            }
        }

        let manifest = Manifest {
            session_id: &input.session_id,
            generated_at: input.generated_at,
            extracted_info: input.extracted_info.as_ref(),
            script: &input.script,
            timing: timing(&input.script),
            assets: &assets,
        };

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        zip.start_file("manifest.json", options)?;
        zip.write_all(&serde_json::to_vec_pretty(&manifest)?)?;

        zip.start_file("transcript.txt", options)?;
        zip.write_all(transcript(&input.script).as_bytes())?;

        zip.start_file("ad-script.pdf", options)?;
        zip.write_all(&script_document(input))?;

        for (name, bytes) in media_entries {
            zip.start_file(name, options)?;
            zip.write_all(&bytes)?;
        }

        let bytes = zip.finish()?.into_inner();
        tracing::info!(
            "✅ Bundle for session {} ready ({} bytes)",
            input.session_id,
            bytes.len()
        );

        Ok(Bundle {
            file_name: format!("ad-bundle-{}.zip", input.session_id),
            bytes,
            assets,
        })
    }
}

async fn resolve(store: Option<&dyn AssetStore>, session_id: &str) -> Media {
    let Some(store) = store else {
        return Media::Missing;
    };
    let kind = store.kind().as_str();

    let asset = match store.locate(session_id).await {
        Ok(Some(asset)) => asset,
        Ok(None) => {
            tracing::info!("No {} asset for session {}", kind, session_id);
            return Media::Missing;
        }
        Err(e) => {
            tracing::warn!("⚠️ {} lookup for session {} failed: {}", kind, session_id, e);
            return Media::Missing;
        }
    };

    match store.fetch(&asset).await {
        Ok(bytes) => Media::Fetched { asset, bytes },
        Err(e) => {
            tracing::warn!("⚠️ Could not fetch {} asset {}: {}", kind, asset.name, e);
            Media::Unfetched { asset }
        }
    }
}

fn timing(script: &AdScript) -> Vec<TimingEntry<'_>> {
    Segment::ALL
        .iter()
        .map(|segment| {
            let (start, end) = segment.window();
            TimingEntry {
                segment: *segment,
                label: segment.label(),
                window: segment.timing_label(),
                start_seconds: start,
                end_seconds: end,
                text: script.segment(*segment),
            }
        })
        .collect()
}

/// Scene-by-scene transcript, one block per segment.
pub fn transcript(script: &AdScript) -> String {
    Segment::ALL
        .iter()
        .enumerate()
        .map(|(i, segment)| {
            format!(
                "Scene {} — {} ({})\n{}\n",
                i + 1,
                segment.label(),
                segment.timing_label(),
                script.segment(*segment)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn script_document(input: &BundleInput) -> Vec<u8> {
    let mut doc = PdfDocument::new();
    let title = input
        .extracted_info
        .as_ref()
        .map(|info| format!("{} — Ad Script", info.product_name))
        .unwrap_or_else(|| "Ad Script".to_string());

    doc.heading(&title, 20.0).spacer(6.0);
    doc.labeled("Session", &input.session_id, 10.0);
    doc.labeled("Generated", &input.generated_at.to_rfc3339(), 10.0);
    if let Some(info) = &input.extracted_info {
        doc.labeled("Audience", &info.audience, 10.0)
            .labeled("Tone", &info.tone, 10.0)
            .labeled("Duration", &info.duration, 10.0);
    }

    for segment in Segment::ALL {
        doc.spacer(14.0).heading(
            &format!(
                "{} · {} ({})",
                segment.label(),
                segment.description(),
                segment.timing_label()
            ),
            13.0,
        );
        doc.spacer(2.0).paragraph(input.script.segment(segment), 11.0);
    }

    doc.render()
}
