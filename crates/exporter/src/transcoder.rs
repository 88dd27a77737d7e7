use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, info, warn};

use crate::config::ExporterConfig;
use crate::error::ExportError;
use crate::settings::OutputFormat;
use crate::startup::{check_ffmpeg_version, detect_available_encoders, missing_encoders};
use crate::timefmt::parse_out_time;

/// Stderr lines kept for the failure message
const STDERR_TAIL_LINES: usize = 40;

/// Output observed while ffmpeg runs
#[derive(Debug, Clone, PartialEq)]
pub enum TranscodeEvent {
    /// One stderr line
    Log(String),
    /// One `-progress` block
    Progress {
        out_time_secs: f64,
        /// Share of the expected duration done, when the duration is known
        ratio: Option<f64>,
        speed: Option<f64>,
    },
}

/// Handle on the ffmpeg binary. Only one job runs at a time.
#[derive(Debug)]
pub struct Transcoder {
    ffmpeg_path: PathBuf,
    version: Option<(u32, u32, u32)>,
    encoders: Vec<String>,
    gate: Arc<Semaphore>,
}

impl Transcoder {
    /// Wrap an ffmpeg binary without probing it
    pub fn new(ffmpeg_path: impl Into<PathBuf>, encoders: Vec<String>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            version: None,
            encoders,
            gate: Arc::new(Semaphore::new(1)),
        }
    }

    /// Probe the configured ffmpeg for its version and encoders
    pub fn load(config: &ExporterConfig) -> Result<Self> {
        let version = check_ffmpeg_version(&config.ffmpeg_path)?;
        match version {
            Some((major, minor, patch)) => info!("FFmpeg version: {}.{}.{}", major, minor, patch),
            None => info!("FFmpeg version: unknown (development build)"),
        }

        let encoders = detect_available_encoders(&config.ffmpeg_path)?;
        info!("Available encoders: {:?}", encoders);

        for format in OutputFormat::ALL {
            let missing = missing_encoders(&encoders, format);
            if !missing.is_empty() {
                warn!("{} exports unavailable, missing encoders: {:?}", format, missing);
            }
        }

        let mut transcoder = Transcoder::new(config.ffmpeg_path.clone(), encoders);
        transcoder.version = version;
        Ok(transcoder)
    }

    pub fn ffmpeg_path(&self) -> &Path {
        &self.ffmpeg_path
    }

    pub fn version(&self) -> Option<(u32, u32, u32)> {
        self.version
    }

    pub fn encoders(&self) -> &[String] {
        &self.encoders
    }

    pub fn supports(&self, format: OutputFormat) -> bool {
        missing_encoders(&self.encoders, format).is_empty()
    }

    pub fn ensure_supports(&self, format: OutputFormat) -> Result<(), ExportError> {
        match missing_encoders(&self.encoders, format).first() {
            Some(&encoder) => Err(ExportError::EncoderUnavailable { format, encoder }),
            None => Ok(()),
        }
    }

    /// True while a job holds the transcoder
    pub fn is_busy(&self) -> bool {
        self.gate.available_permits() == 0
    }

    /// Run `job_fn` once no other job holds the transcoder
    pub async fn run_exclusive<F, Fut, T>(&self, job_fn: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let _permit = self
            .gate
            .acquire()
            .await
            .map_err(|e| anyhow!("Failed to acquire transcoder: {}", e))?;

        job_fn().await
    }

    /// Execute ffmpeg with `args` inside `workdir`, waiting for the
    /// transcoder to be free first.
    ///
    /// `expected_duration` (seconds) turns progress times into ratios.
    pub async fn exec(
        &self,
        args: &[String],
        workdir: &Path,
        expected_duration: Option<f64>,
        events: mpsc::UnboundedSender<TranscodeEvent>,
    ) -> Result<()> {
        self.run_exclusive(|| self.spawn_and_wait(args, workdir, expected_duration, events))
            .await
    }

    async fn spawn_and_wait(
        &self,
        args: &[String],
        workdir: &Path,
        expected_duration: Option<f64>,
        events: mpsc::UnboundedSender<TranscodeEvent>,
    ) -> Result<()> {
        let mut cmd = Command::new(&self.ffmpeg_path);
        cmd.current_dir(workdir)
            .args(["-hide_banner", "-y", "-nostats", "-progress", "pipe:1"])
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|e| anyhow!("Failed to spawn ffmpeg: {}", e))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow!("Failed to capture stdout"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| anyhow!("Failed to capture stderr"))?;

        // Forward stderr as log events, keeping a tail for diagnostics
        let log_events = events.clone();
        let stderr_task = tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            let mut tail: Vec<String> = Vec::new();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!("ffmpeg: {}", line);
                let _ = log_events.send(TranscodeEvent::Log(line.clone()));
                if tail.len() == STDERR_TAIL_LINES {
                    tail.remove(0);
                }
                tail.push(line);
            }
            tail
        });

        let mut reader = BufReader::new(stdout).lines();
        let mut progress = ProgressBlock::default();
        while let Some(line) = reader.next_line().await? {
            if let Some(event) = progress.feed(&line, expected_duration) {
                let _ = events.send(event);
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| anyhow!("Failed to wait for ffmpeg: {}", e))?;

        let stderr_tail = stderr_task
            .await
            .map_err(|e| anyhow!("Failed to read stderr: {}", e))?;

        if !status.success() {
            return Err(ExportError::TranscodeFailed {
                code: status.code(),
                stderr: stderr_tail.join("\n"),
            }
            .into());
        }

        Ok(())
    }
}

/// Accumulates `key=value` lines of one ffmpeg `-progress` block
#[derive(Debug, Default)]
pub struct ProgressBlock {
    out_time_secs: Option<f64>,
    speed: Option<f64>,
}

impl ProgressBlock {
    /// Feed one line; returns an event when the block's `progress=` line arrives
    pub fn feed(&mut self, line: &str, expected_duration: Option<f64>) -> Option<TranscodeEvent> {
        let (key, value) = line.trim().split_once('=')?;
        match key {
            // Despite the name, ffmpeg reports microseconds here
            "out_time_ms" | "out_time_us" => {
                if let Ok(us) = value.parse::<u64>() {
                    self.out_time_secs = Some(us as f64 / 1_000_000.0);
                }
            }
            "out_time" => {
                if self.out_time_secs.is_none() {
                    self.out_time_secs = parse_out_time(value);
                }
            }
            "speed" => {
                self.speed = value.trim().trim_end_matches('x').parse::<f64>().ok();
            }
            "progress" => {
                let out_time_secs = self.out_time_secs.take().unwrap_or(0.0);
                let ratio = expected_duration
                    .filter(|d| *d > 0.0)
                    .map(|d| (out_time_secs / d).clamp(0.0, 1.0))
                    .map(|r| if value == "end" { 1.0 } else { r });
                return Some(TranscodeEvent::Progress {
                    out_time_secs,
                    ratio,
                    speed: self.speed.take(),
                });
            }
            _ => {}
        }
        None
    }
}
