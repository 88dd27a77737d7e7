use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{ExportError, ExportResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Mp4,
    Webm,
    Ogg,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 3] = [OutputFormat::Mp4, OutputFormat::Webm, OutputFormat::Ogg];

    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Mp4 => "mp4",
            OutputFormat::Webm => "webm",
            OutputFormat::Ogg => "ogg",
        }
    }

    /// File extension of the fixed output name (`output.<ext>`)
    pub fn extension(self) -> &'static str {
        self.as_str()
    }

    /// Name of the file ffmpeg writes inside the staging directory
    pub fn output_file_name(self) -> String {
        format!("output.{}", self.extension())
    }

    /// Encoders the ffmpeg build must provide for this format
    pub fn required_encoders(self) -> &'static [&'static str] {
        match self {
            OutputFormat::Mp4 => &["libx264"],
            OutputFormat::Webm => &["libvpx", "libvorbis"],
            OutputFormat::Ogg => &["libvorbis"],
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mp4" => Ok(OutputFormat::Mp4),
            "webm" => Ok(OutputFormat::Webm),
            "ogg" => Ok(OutputFormat::Ogg),
            other => Err(ExportError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// x264 speed/quality presets, fastest first
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum X264Preset {
    UltraFast,
    SuperFast,
    VeryFast,
    Faster,
    Fast,
    #[default]
    Medium,
    Slow,
    Slower,
    VerySlow,
}

impl X264Preset {
    pub const ALL: [X264Preset; 9] = [
        X264Preset::UltraFast,
        X264Preset::SuperFast,
        X264Preset::VeryFast,
        X264Preset::Faster,
        X264Preset::Fast,
        X264Preset::Medium,
        X264Preset::Slow,
        X264Preset::Slower,
        X264Preset::VerySlow,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            X264Preset::UltraFast => "ultrafast",
            X264Preset::SuperFast => "superfast",
            X264Preset::VeryFast => "veryfast",
            X264Preset::Faster => "faster",
            X264Preset::Fast => "fast",
            X264Preset::Medium => "medium",
            X264Preset::Slow => "slow",
            X264Preset::Slower => "slower",
            X264Preset::VerySlow => "veryslow",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            X264Preset::UltraFast => "Ultra Fast",
            X264Preset::SuperFast => "Super Fast",
            X264Preset::VeryFast => "Very Fast",
            X264Preset::Faster => "Faster",
            X264Preset::Fast => "Fast",
            X264Preset::Medium => "Medium",
            X264Preset::Slow => "Slow",
            X264Preset::Slower => "Slower",
            X264Preset::VerySlow => "Very Slow",
        }
    }
}

impl fmt::Display for X264Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for X264Preset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        X264Preset::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| format!("unknown x264 preset `{}`", s))
    }
}

/// x264 content-type hints; `None` emits no `-tune` flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum X264Tune {
    #[default]
    None,
    Film,
    Animation,
    StillImage,
    ZeroLatency,
}

impl X264Tune {
    pub const ALL: [X264Tune; 5] = [
        X264Tune::None,
        X264Tune::Film,
        X264Tune::Animation,
        X264Tune::StillImage,
        X264Tune::ZeroLatency,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            X264Tune::None => "none",
            X264Tune::Film => "film",
            X264Tune::Animation => "animation",
            X264Tune::StillImage => "stillimage",
            X264Tune::ZeroLatency => "zerolatency",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            X264Tune::None => "None",
            X264Tune::Film => "Film",
            X264Tune::Animation => "Animation",
            X264Tune::StillImage => "Still Image",
            X264Tune::ZeroLatency => "Zero Latency",
        }
    }
}

impl fmt::Display for X264Tune {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for X264Tune {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        X264Tune::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown x264 tune `{}`", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct X264Settings {
    pub preset: X264Preset,
    pub tune: X264Tune,
    pub bitrate_kbps: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vp8Settings {
    pub bitrate_kbps: u32,
}

/// Codec parameters, one variant per output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecSettings {
    Mp4(X264Settings),
    Webm(Vp8Settings),
    /// Vorbis bitrate is fixed, nothing to configure
    Ogg,
}

impl CodecSettings {
    pub fn output_format(&self) -> OutputFormat {
        match self {
            CodecSettings::Mp4(_) => OutputFormat::Mp4,
            CodecSettings::Webm(_) => OutputFormat::Webm,
            CodecSettings::Ogg => OutputFormat::Ogg,
        }
    }
}

/// Pixel rectangle in source coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CropSettings {
    pub enabled: bool,
    pub width: u32,
    pub height: u32,
    pub x: u32,
    pub y: u32,
}

impl CropSettings {
    pub fn new(width: u32, height: u32, x: u32, y: u32) -> Self {
        Self {
            enabled: true,
            width,
            height,
            x,
            y,
        }
    }

    /// Crop only applies when enabled and both dimensions are positive
    pub fn is_active(&self) -> bool {
        self.enabled && self.width > 0 && self.height > 0
    }

    pub fn filter(&self) -> String {
        format!("crop={}:{}:{}:{}", self.width, self.height, self.x, self.y)
    }
}

impl FromStr for CropSettings {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<u32> = s
            .split(':')
            .map(|p| p.trim().parse::<u32>())
            .collect::<Result<_, _>>()
            .map_err(|_| ExportError::InvalidCrop(s.to_string()))?;

        match parts.as_slice() {
            [width, height, x, y] => Ok(CropSettings::new(*width, *height, *x, *y)),
            _ => Err(ExportError::InvalidCrop(s.to_string())),
        }
    }
}

/// Time range in seconds; `start < end` is the caller's responsibility
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrimSettings {
    pub start: f64,
    pub end: f64,
}

impl TrimSettings {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

impl FromStr for TrimSettings {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ExportError::InvalidTrim(s.to_string());
        let (start, end) = s.split_once(':').ok_or_else(invalid)?;
        let start: f64 = start.trim().parse().map_err(|_| invalid())?;
        let end: f64 = end.trim().parse().map_err(|_| invalid())?;

        if !start.is_finite() || !end.is_finite() || start < 0.0 || end <= start {
            return Err(invalid());
        }

        Ok(TrimSettings { start, end })
    }
}

/// Fully typed intent for one export
#[derive(Debug, Clone, PartialEq)]
pub struct ExportSettings {
    pub codec: CodecSettings,
    pub crop: CropSettings,
    pub trim: Option<TrimSettings>,
    pub remove_audio: bool,
    pub scale_down: bool,
}

impl ExportSettings {
    pub fn new(codec: CodecSettings) -> Self {
        Self {
            codec,
            crop: CropSettings::default(),
            trim: None,
            remove_audio: false,
            scale_down: false,
        }
    }

    pub fn output_format(&self) -> OutputFormat {
        self.codec.output_format()
    }

    pub fn with_crop(mut self, crop: CropSettings) -> Self {
        self.crop = crop;
        self
    }

    pub fn with_trim(mut self, trim: TrimSettings) -> Self {
        self.trim = Some(trim);
        self
    }

    pub fn with_remove_audio(mut self, remove_audio: bool) -> Self {
        self.remove_audio = remove_audio;
        self
    }

    pub fn with_scale_down(mut self, scale_down: bool) -> Self {
        self.scale_down = scale_down;
        self
    }

    /// Narrow a loosely-typed request to the settings variant of its format
    pub fn from_request(request: &ExportRequest) -> ExportResult<Self> {
        let format: OutputFormat = request.output_format.parse()?;
        let codec_request = request.settings.unwrap_or_default();

        let codec = match format {
            OutputFormat::Mp4 => {
                let preset = codec_request.preset.ok_or(ExportError::MissingCodecSettings {
                    format,
                    field: "preset",
                })?;
                CodecSettings::Mp4(X264Settings {
                    preset,
                    tune: codec_request.tune.unwrap_or_default(),
                    bitrate_kbps: codec_request.bitrate,
                })
            }
            OutputFormat::Webm => {
                reject_field(format, "preset", codec_request.preset.is_some())?;
                reject_field(format, "tune", codec_request.tune.is_some())?;
                let bitrate_kbps = codec_request.bitrate.ok_or(ExportError::MissingCodecSettings {
                    format,
                    field: "bitrate",
                })?;
                CodecSettings::Webm(Vp8Settings { bitrate_kbps })
            }
            OutputFormat::Ogg => {
                reject_field(format, "preset", codec_request.preset.is_some())?;
                reject_field(format, "tune", codec_request.tune.is_some())?;
                reject_field(format, "bitrate", codec_request.bitrate.is_some())?;
                CodecSettings::Ogg
            }
        };

        Ok(ExportSettings {
            codec,
            crop: request.crop.unwrap_or_default(),
            trim: request.trim,
            remove_audio: request.remove_audio.unwrap_or(false),
            scale_down: request.scale_down.unwrap_or(false),
        })
    }
}

fn reject_field(format: OutputFormat, field: &'static str, present: bool) -> ExportResult<()> {
    if present {
        Err(ExportError::MismatchedSettings { format, field })
    } else {
        Ok(())
    }
}

impl TryFrom<&ExportRequest> for ExportSettings {
    type Error = ExportError;

    fn try_from(request: &ExportRequest) -> Result<Self, Self::Error> {
        ExportSettings::from_request(request)
    }
}

impl TryFrom<ExportRequest> for ExportSettings {
    type Error = ExportError;

    fn try_from(request: ExportRequest) -> Result<Self, Self::Error> {
        ExportSettings::from_request(&request)
    }
}

/// Export request as it arrives from a settings file or UI layer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportRequest {
    pub output_format: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<CodecRequest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crop: Option<CropSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trim: Option<TrimSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remove_audio: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale_down: Option<bool>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preset: Option<X264Preset>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tune: Option<X264Tune>,
    /// Always kbit/s
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bitrate: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mp4_request() -> ExportRequest {
        ExportRequest {
            output_format: "mp4".to_string(),
            settings: Some(CodecRequest {
                preset: Some(X264Preset::Fast),
                tune: Some(X264Tune::Film),
                bitrate: Some(4000),
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_mp4_request_narrows_to_x264() {
        let settings = ExportSettings::from_request(&mp4_request()).unwrap();
        assert_eq!(
            settings.codec,
            CodecSettings::Mp4(X264Settings {
                preset: X264Preset::Fast,
                tune: X264Tune::Film,
                bitrate_kbps: Some(4000),
            })
        );
        assert!(!settings.remove_audio);
        assert!(!settings.scale_down);
        assert!(!settings.crop.is_active());
    }

    #[test]
    fn test_mp4_tune_defaults_to_none() {
        let mut request = mp4_request();
        request.settings = Some(CodecRequest {
            preset: Some(X264Preset::Slow),
            tune: None,
            bitrate: None,
        });
        let settings = ExportSettings::try_from(request).unwrap();
        match settings.codec {
            CodecSettings::Mp4(x264) => {
                assert_eq!(x264.tune, X264Tune::None);
                assert_eq!(x264.bitrate_kbps, None);
            }
            other => panic!("expected mp4 settings, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_format_is_unsupported() {
        let request = ExportRequest {
            output_format: "avi".to_string(),
            ..Default::default()
        };
        let err = ExportSettings::from_request(&request).unwrap_err();
        assert!(matches!(err, ExportError::UnsupportedFormat(f) if f == "avi"));
    }

    #[test]
    fn test_format_is_case_sensitive() {
        assert!(matches!(
            "MP4".parse::<OutputFormat>(),
            Err(ExportError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_mp4_without_preset_is_rejected() {
        let request = ExportRequest {
            output_format: "mp4".to_string(),
            ..Default::default()
        };
        let err = ExportSettings::from_request(&request).unwrap_err();
        assert!(matches!(
            err,
            ExportError::MissingCodecSettings {
                format: OutputFormat::Mp4,
                field: "preset"
            }
        ));
    }

    #[test]
    fn test_webm_with_preset_is_mismatched() {
        let mut request = mp4_request();
        request.output_format = "webm".to_string();
        let err = ExportSettings::from_request(&request).unwrap_err();
        assert!(matches!(
            err,
            ExportError::MismatchedSettings {
                format: OutputFormat::Webm,
                field: "preset"
            }
        ));
    }

    #[test]
    fn test_webm_requires_bitrate() {
        let request = ExportRequest {
            output_format: "webm".to_string(),
            settings: Some(CodecRequest::default()),
            ..Default::default()
        };
        assert!(matches!(
            ExportSettings::from_request(&request),
            Err(ExportError::MissingCodecSettings { field: "bitrate", .. })
        ));
    }

    #[test]
    fn test_ogg_rejects_codec_settings() {
        let request = ExportRequest {
            output_format: "ogg".to_string(),
            settings: Some(CodecRequest {
                bitrate: Some(128),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(matches!(
            ExportSettings::from_request(&request),
            Err(ExportError::MismatchedSettings { field: "bitrate", .. })
        ));

        let bare = ExportRequest {
            output_format: "ogg".to_string(),
            ..Default::default()
        };
        let settings = ExportSettings::from_request(&bare).unwrap();
        assert_eq!(settings.codec, CodecSettings::Ogg);
    }

    #[test]
    fn test_request_from_json() {
        let json = r#"{
            "output_format": "webm",
            "settings": { "bitrate": 1000 },
            "crop": { "enabled": true, "width": 640, "height": 360, "x": 10, "y": 20 },
            "trim": { "start": 1.5, "end": 4.0 },
            "remove_audio": true
        }"#;
        let request: ExportRequest = serde_json::from_str(json).unwrap();
        let settings = ExportSettings::try_from(&request).unwrap();
        assert_eq!(settings.codec, CodecSettings::Webm(Vp8Settings { bitrate_kbps: 1000 }));
        assert_eq!(settings.crop, CropSettings::new(640, 360, 10, 20));
        assert_eq!(settings.trim, Some(TrimSettings::new(1.5, 4.0)));
        assert!(settings.remove_audio);
        assert!(!settings.scale_down);
    }

    #[test]
    fn test_request_from_toml() {
        let source = r#"
output_format = "mp4"
scale_down = true

[settings]
preset = "veryslow"
tune = "stillimage"
"#;
        let request: ExportRequest = toml::from_str(source).unwrap();
        let settings = ExportSettings::try_from(request).unwrap();
        assert!(settings.scale_down);
        assert_eq!(
            settings.codec,
            CodecSettings::Mp4(X264Settings {
                preset: X264Preset::VerySlow,
                tune: X264Tune::StillImage,
                bitrate_kbps: None,
            })
        );
    }

    #[test]
    fn test_crop_parsing() {
        let crop: CropSettings = "100:50:4:8".parse().unwrap();
        assert_eq!(crop, CropSettings::new(100, 50, 4, 8));
        assert!(crop.is_active());
        assert_eq!(crop.filter(), "crop=100:50:4:8");

        assert!("100:50:4".parse::<CropSettings>().is_err());
        assert!("a:b:c:d".parse::<CropSettings>().is_err());
        assert!("-1:50:0:0".parse::<CropSettings>().is_err());
    }

    #[test]
    fn test_crop_zero_dimension_is_inactive() {
        assert!(!CropSettings::new(0, 50, 0, 0).is_active());
        assert!(!CropSettings::new(50, 0, 0, 0).is_active());
        let disabled = CropSettings {
            enabled: false,
            ..CropSettings::new(50, 50, 0, 0)
        };
        assert!(!disabled.is_active());
    }

    #[test]
    fn test_trim_parsing() {
        let trim: TrimSettings = "12.3:45.6".parse().unwrap();
        assert_eq!(trim, TrimSettings::new(12.3, 45.6));
        assert!((trim.duration() - 33.3).abs() < 1e-9);

        assert!("5:5".parse::<TrimSettings>().is_err());
        assert!("10:2".parse::<TrimSettings>().is_err());
        assert!("abc".parse::<TrimSettings>().is_err());
        assert!("-1:2".parse::<TrimSettings>().is_err());
    }

    #[test]
    fn test_preset_order_and_names() {
        let names: Vec<&str> = X264Preset::ALL.iter().map(|p| p.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "ultrafast", "superfast", "veryfast", "faster", "fast", "medium", "slow",
                "slower", "veryslow"
            ]
        );
        assert!(X264Preset::UltraFast < X264Preset::VerySlow);
        assert_eq!("slower".parse::<X264Preset>().unwrap(), X264Preset::Slower);
        assert_eq!(X264Preset::VeryFast.label(), "Very Fast");
    }

    #[test]
    fn test_tune_names() {
        for tune in X264Tune::ALL {
            assert_eq!(tune.as_str().parse::<X264Tune>().unwrap(), tune);
        }
        assert_eq!(X264Tune::StillImage.label(), "Still Image");
        assert!("grain".parse::<X264Tune>().is_err());
    }

    #[test]
    fn test_required_encoders() {
        assert_eq!(OutputFormat::Mp4.required_encoders(), &["libx264"]);
        assert_eq!(OutputFormat::Webm.required_encoders(), &["libvpx", "libvorbis"]);
        assert_eq!(OutputFormat::Ogg.output_file_name(), "output.ogg");
    }
}
