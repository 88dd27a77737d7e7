use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use clipcut_exporter::config::{load_config, ExporterConfig};
use clipcut_exporter::fetch::fetch_tagged_sound;
use clipcut_exporter::media::{classify, display_name, extension, sound_url};
use clipcut_exporter::messages::MessageManager;
use clipcut_exporter::scripts::{self, ExportOutput, ExtractKind};
use clipcut_exporter::settings::{CodecRequest, CropSettings, TrimSettings, X264Preset, X264Tune};
use clipcut_exporter::{
    build_for_settings, ExportRequest, ExportSettings, OutputFormat, Stream, Transcoder, Workspace,
};

#[derive(Parser, Debug)]
#[command(name = "clipcut")]
#[command(about = "Crop, trim and re-encode clips with ffmpeg", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the ffmpeg arguments an export would use, without running it
    Args {
        #[arg(long, value_name = "FILE")]
        video: String,
        #[arg(long, value_name = "FILE")]
        audio: Option<String>,
        #[command(flatten)]
        export: ExportArgs,
    },
    /// Encode a video or image, optionally muxed with a separate audio track
    Merge {
        #[arg(long, value_name = "FILE")]
        video: PathBuf,
        #[arg(long, value_name = "FILE")]
        audio: Option<PathBuf>,
        /// Do not download the track named by a `[sound=<url>]` tag
        #[arg(long)]
        ignore_sound_tag: bool,
        /// Output file, defaults to <output_dir>/<display name>.<ext>
        #[arg(short, long, value_name = "FILE")]
        out: Option<PathBuf>,
        #[command(flatten)]
        export: ExportArgs,
    },
    /// Pull a single stream out of a file, by default its audio as OGG
    Extract {
        #[arg(long, value_name = "FILE")]
        video: PathBuf,
        #[arg(short, long, value_name = "FILE")]
        out: Option<PathBuf>,
        /// Media family reported in the output MIME type
        #[arg(long, value_enum, default_value = "audio")]
        kind: KindArg,
        #[command(flatten)]
        export: ExportArgs,
    },
    /// Show how a file name is classified
    Inspect { file: String },
    /// Show the ffmpeg version and which output formats it can encode
    Check,
    /// List saved export reports
    Reports,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum KindArg {
    Video,
    Audio,
}

impl From<KindArg> for ExtractKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Video => ExtractKind::Video,
            KindArg::Audio => ExtractKind::Audio,
        }
    }
}

/// Export settings shared by every encoding subcommand.
///
/// Flags override values read from `--settings`.
#[derive(Args, Debug, Default)]
struct ExportArgs {
    /// JSON or TOML export request
    #[arg(long, value_name = "FILE")]
    settings: Option<PathBuf>,
    /// mp4, webm or ogg
    #[arg(short, long)]
    format: Option<String>,
    #[arg(long)]
    preset: Option<X264Preset>,
    #[arg(long)]
    tune: Option<X264Tune>,
    /// Video bitrate in kbit/s
    #[arg(long)]
    bitrate: Option<u32>,
    /// Crop rectangle as W:H:X:Y
    #[arg(long, value_name = "W:H:X:Y")]
    crop: Option<CropSettings>,
    /// Time range in seconds as START:END
    #[arg(long, value_name = "START:END")]
    trim: Option<TrimSettings>,
    #[arg(long)]
    remove_audio: bool,
    #[arg(long)]
    scale_down: bool,
}

impl ExportArgs {
    /// Combine the settings file, flags and config defaults into one request
    fn to_request(&self, config: &ExporterConfig, fallback_format: &str) -> Result<ExportRequest> {
        let mut request = match &self.settings {
            Some(path) => read_request(path)?,
            None => ExportRequest::default(),
        };

        if let Some(format) = &self.format {
            request.output_format = format.clone();
        }
        if request.output_format.is_empty() {
            request.output_format = fallback_format.to_string();
        }

        let mut codec = request.settings.unwrap_or_default();
        codec.preset = self.preset.or(codec.preset);
        codec.tune = self.tune.or(codec.tune);
        codec.bitrate = self.bitrate.or(codec.bitrate);

        // Config defaults only fill fields the format actually takes
        match request.output_format.parse::<OutputFormat>() {
            Ok(OutputFormat::Mp4) => {
                codec.preset = codec.preset.or(Some(config.default_preset));
                codec.tune = codec.tune.or(Some(config.default_tune));
            }
            Ok(OutputFormat::Webm) => {
                codec.bitrate = codec.bitrate.or(Some(config.default_bitrate_kbps));
            }
            Ok(OutputFormat::Ogg) | Err(_) => {}
        }
        request.settings = (codec != CodecRequest::default()).then_some(codec);

        if self.crop.is_some() {
            request.crop = self.crop;
        }
        if self.trim.is_some() {
            request.trim = self.trim;
        }
        if self.remove_audio {
            request.remove_audio = Some(true);
        }
        if self.scale_down {
            request.scale_down = Some(true);
        }

        Ok(request)
    }
}

fn read_request(path: &Path) -> Result<ExportRequest> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings file {}", path.display()))?;

    let is_toml = path.extension().map_or(false, |ext| ext == "toml");
    if is_toml {
        toml::from_str(&contents).map_err(|e| anyhow::anyhow!("Failed to parse TOML settings: {}", e))
    } else {
        serde_json::from_str(&contents)
            .map_err(|e| anyhow::anyhow!("Failed to parse JSON settings: {}", e))
    }
}

/// File input, renamed if its name would collide with the transcoder output
fn input_stream(path: &Path) -> Result<Stream> {
    let stream = Stream::from_path(path)?;
    let original = stream.name.clone();
    let stream = stream.clear_of_outputs();
    if stream.name != original {
        info!("Staging {} as {}", original, stream.name);
    }
    Ok(stream)
}

fn default_output_path(config: &ExporterConfig, input_name: &str, format: OutputFormat) -> PathBuf {
    let mut stem = display_name(input_name);
    if stem.is_empty() {
        stem = "output".to_string();
    }
    config
        .output_dir
        .join(format!("{}.{}", stem, format.extension()))
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries command output, logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .init();

    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e);
        }
    };

    match cli.command {
        Command::Args {
            video,
            audio,
            export,
        } => {
            let request = export.to_request(&config, "mp4")?;
            let settings = ExportSettings::try_from(&request)?;
            let video = Stream::from_bytes(video, Vec::new());
            let audio = audio.map(|a| Stream::from_bytes(a, Vec::new()));
            let args = build_for_settings(&settings, &video, audio.as_ref());
            println!("{}", serde_json::to_string_pretty(&args)?);
        }
        Command::Merge {
            video,
            audio,
            ignore_sound_tag,
            out,
            export,
        } => {
            let request = export.to_request(&config, "mp4")?;
            let settings = ExportSettings::try_from(&request)?;
            let video = input_stream(&video)?;

            let mut session = Session::open(&config, &settings, &video)?;
            let audio = match audio {
                Some(path) => Some(input_stream(&path)?),
                None if ignore_sound_tag => None,
                None => fetch_tagged_sound(&video.name, &mut session.messages).await?,
            };
            let result = scripts::merge(
                &session.transcoder,
                &mut session.workspace,
                &video,
                audio.as_ref(),
                &settings,
                &mut session.messages,
            )
            .await;
            let output = session.close(result)?;
            finish(&config, output, out, &video.name, settings.output_format())?;
        }
        Command::Extract {
            video,
            out,
            kind,
            export,
        } => {
            let request = export.to_request(&config, "ogg")?;
            let settings = ExportSettings::try_from(&request)?;
            let video = input_stream(&video)?;

            let mut session = Session::open(&config, &settings, &video)?;
            let result = scripts::extract(
                &session.transcoder,
                &mut session.workspace,
                &video,
                &settings,
                &mut session.messages,
                kind.into(),
            )
            .await;
            let output = session.close(result)?;
            finish(&config, output, out, &video.name, settings.output_format())?;
        }
        Command::Inspect { file } => {
            println!("Media type:   {:?}", classify(&file));
            println!("Display name: {}", display_name(&file));
            println!(
                "Extension:    {}",
                extension(&file).unwrap_or_else(|| "-".to_string())
            );
            println!(
                "Sound URL:    {}",
                sound_url(&file).unwrap_or_else(|| "-".to_string())
            );
        }
        Command::Check => {
            let transcoder = Transcoder::load(&config)?;
            match transcoder.version() {
                Some((major, minor, patch)) => {
                    println!("ffmpeg {}.{}.{}", major, minor, patch)
                }
                None => println!("ffmpeg (unknown version)"),
            }
            println!("Encoders: {}", transcoder.encoders().join(", "));
            for format in OutputFormat::ALL {
                let status = if transcoder.supports(format) {
                    "available"
                } else {
                    "unavailable"
                };
                println!("  {:<5} {}", format.as_str(), status);
            }
        }
        Command::Reports => {
            let reports = scripts::load_reports(&config.output_dir.join("reports"))?;
            if reports.is_empty() {
                println!("No reports");
            }
            for report in reports {
                println!(
                    "{}  {}  {:<5} {:>10} bytes  {}",
                    report.started_at.format("%Y-%m-%d %H:%M:%S"),
                    report.id,
                    report.output_format.as_str(),
                    report.output_bytes,
                    report.inputs.join(" + ")
                );
            }
        }
    }

    Ok(())
}

/// Probed transcoder plus scratch state for one export
struct Session {
    transcoder: Transcoder,
    workspace: Workspace,
    messages: MessageManager,
    keep_work_dir: bool,
}

impl Session {
    fn open(config: &ExporterConfig, settings: &ExportSettings, video: &Stream) -> Result<Self> {
        info!("Exporting {} as {}", video.name, settings.output_format());

        let transcoder = Transcoder::load(config)?;
        let mut workspace = Workspace::create(&config.work_dir)?;
        workspace.set_keep(config.keep_work_dir);

        Ok(Self {
            transcoder,
            workspace,
            messages: MessageManager::new(),
            keep_work_dir: config.keep_work_dir,
        })
    }

    /// Tear down the workspace and pass the export result through
    fn close(self, result: Result<ExportOutput>) -> Result<ExportOutput> {
        if let Err(e) = &result {
            error!("Export failed: {:#}", e);
            if let Some(last) = self.messages.messages().last() {
                error!("Last message: {}", last);
            }
        }

        if self.keep_work_dir {
            info!("Staging directory kept at {:?}", self.workspace.path());
        } else {
            self.workspace.cleanup()?;
        }
        result
    }
}

fn finish(
    config: &ExporterConfig,
    output: ExportOutput,
    out: Option<PathBuf>,
    input_name: &str,
    format: OutputFormat,
) -> Result<()> {
    let dest = out.unwrap_or_else(|| default_output_path(config, input_name, format));
    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&dest, &output.bytes)
        .with_context(|| format!("Failed to write {}", dest.display()))?;
    info!(
        "Wrote {} ({}, {} bytes)",
        dest.display(),
        output.mime_type,
        output.bytes.len()
    );

    if config.write_reports {
        let path = scripts::save_report(&output.report, &config.output_dir.join("reports"))?;
        info!("Report saved to {:?}", path);
    }

    println!("{}", dest.display());
    Ok(())
}
