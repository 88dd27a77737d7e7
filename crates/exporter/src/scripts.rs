use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::ExportError;
use crate::media::is_image;
use crate::messages::MessageManager;
use crate::params::build_for_settings;
use crate::params::common::audio_input;
use crate::settings::{CodecSettings, ExportSettings, OutputFormat};
use crate::staging::{Stream, Workspace};
use crate::transcoder::Transcoder;

/// Media family stated in an extracted file's MIME type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractKind {
    Video,
    Audio,
}

impl ExtractKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ExtractKind::Video => "video",
            ExtractKind::Audio => "audio",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExportOutput {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub command: Vec<String>,
    pub report: ExportReport,
}

/// Record of one finished export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportReport {
    pub id: String,
    pub output_format: OutputFormat,
    pub mime_type: String,
    pub inputs: Vec<String>,
    pub command: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub output_bytes: u64,
}

/// Mux `video` with an optional `sound` track into an MP4 or WebM file.
///
/// A looped MP4 image only ends with its sound track or a trim range, so an
/// image with neither fails with `UnboundedImage` before anything is staged.
pub async fn merge(
    transcoder: &Transcoder,
    workspace: &mut Workspace,
    video: &Stream,
    sound: Option<&Stream>,
    settings: &ExportSettings,
    messages: &mut MessageManager,
) -> Result<ExportOutput> {
    ensure_bounded(video, sound, settings)?;

    if audio_input(sound, settings.remove_audio).is_some() {
        messages.log("Merging video and audio...");
    }
    let mime_type = format!("video/{}", settings.output_format().extension());
    run_export(transcoder, workspace, video, sound, settings, messages, mime_type).await
}

/// Transcode a single input, typically pulling its audio out as OGG
pub async fn extract(
    transcoder: &Transcoder,
    workspace: &mut Workspace,
    video: &Stream,
    settings: &ExportSettings,
    messages: &mut MessageManager,
    kind: ExtractKind,
) -> Result<ExportOutput> {
    let mime_type = format!("{}/{}", kind.as_str(), settings.output_format().extension());
    run_export(transcoder, workspace, video, None, settings, messages, mime_type).await
}

fn ensure_bounded(
    video: &Stream,
    sound: Option<&Stream>,
    settings: &ExportSettings,
) -> Result<(), ExportError> {
    let loops_image = matches!(settings.codec, CodecSettings::Mp4(_)) && is_image(&video.name);
    let has_end = settings.trim.is_some() || audio_input(sound, settings.remove_audio).is_some();

    if loops_image && !has_end {
        Err(ExportError::UnboundedImage(video.name.clone()))
    } else {
        Ok(())
    }
}

async fn run_export(
    transcoder: &Transcoder,
    workspace: &mut Workspace,
    video: &Stream,
    sound: Option<&Stream>,
    settings: &ExportSettings,
    messages: &mut MessageManager,
    mime_type: String,
) -> Result<ExportOutput> {
    let format = settings.output_format();
    transcoder.ensure_supports(format)?;
    let started_at = Utc::now();

    messages.log("Writing input files to ffmpeg...");
    let mut inputs = vec![video.name.clone()];
    workspace.stage(video).await?;
    if let Some(sound) = sound {
        workspace.stage(sound).await?;
        inputs.push(sound.name.clone());
    }

    let command = build_for_settings(settings, video, sound);
    messages.log(format!("ffmpeg {}", command.join(" ")));

    let expected_duration = settings.trim.map(|t| t.duration());
    let (tx, mut rx) = mpsc::unbounded_channel();
    let result = {
        let exec = transcoder.exec(&command, workspace.path(), expected_duration, tx);
        tokio::pin!(exec);

        loop {
            tokio::select! {
                res = &mut exec => break res,
                Some(event) = rx.recv() => messages.record(&event),
            }
        }
    };
    while let Ok(event) = rx.try_recv() {
        messages.record(&event);
    }
    messages.bump_ffmpeg_process_id();
    result?;

    messages.log("Reading output...");
    let bytes = workspace.read_output(format).await?;

    let report = ExportReport {
        id: Uuid::new_v4().to_string(),
        output_format: format,
        mime_type: mime_type.clone(),
        inputs,
        command: command.clone(),
        started_at,
        finished_at: Utc::now(),
        output_bytes: bytes.len() as u64,
    };
    debug!("Export {} produced {} bytes", report.id, report.output_bytes);

    Ok(ExportOutput {
        bytes,
        mime_type,
        command,
        report,
    })
}

pub fn save_report(report: &ExportReport, report_dir: &Path) -> Result<PathBuf> {
    use std::fs;
    use std::io::Write;

    fs::create_dir_all(report_dir)?;

    let json = serde_json::to_string_pretty(report)?;

    // Write atomically using a temporary file
    let report_file = report_dir.join(format!("{}.json", report.id));
    let temp_file = report_dir.join(format!("{}.json.tmp", report.id));

    let mut file = fs::File::create(&temp_file)?;
    file.write_all(json.as_bytes())?;
    file.sync_all()?;
    drop(file);

    fs::rename(&temp_file, &report_file)?;

    Ok(report_file)
}

/// Load every saved report, oldest first. Unreadable files are skipped.
pub fn load_reports(report_dir: &Path) -> Result<Vec<ExportReport>> {
    use std::fs;

    if !report_dir.exists() {
        return Ok(vec![]);
    }

    let mut reports = Vec::new();

    for entry in fs::read_dir(report_dir)? {
        let path = entry?.path();

        if !path.is_file() || path.extension().map_or(true, |ext| ext != "json") {
            continue;
        }

        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<ExportReport>(&contents) {
                Ok(report) => reports.push(report),
                Err(e) => warn!("Failed to parse report file {:?}: {}", path, e),
            },
            Err(e) => warn!("Failed to read report file {:?}: {}", path, e),
        }
    }

    reports.sort_by_key(|r| r.started_at);
    Ok(reports)
}
