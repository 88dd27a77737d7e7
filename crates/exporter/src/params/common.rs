// Shared FFmpeg argument stages

use crate::media::is_image;
use crate::settings::{CropSettings, TrimSettings};
use crate::staging::Stream;
use crate::timefmt::format_ffmpeg_time;

/// Even-dimension padding; libx264 rejects odd width/height for 4:2:0 output
pub const EVEN_PAD_FILTER: &str = "pad=ceil(iw/2)*2:ceil(ih/2)*2";

/// Fit inside a 2048x2048 box, keeping aspect ratio and even dimensions
pub const SCALE_DOWN_FILTER: &str =
    "scale=w=2048:h=2048:force_original_aspect_ratio=decrease:force_divisible_by=2";

/// Fixed Vorbis audio encoding, used by every format that carries audio
pub const VORBIS_AUDIO_FLAGS: [&str; 4] = ["-c:a", "libvorbis", "-b:a", "256k"];

/// Share of the trim start covered by the fast input-level seek
const FAST_SKIP_RATIO: f64 = 0.9;

/// Arguments placed around an inner token sequence.
///
/// `before` lands in front of the inner tokens (input options), `after`
/// right behind them (output options).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stage {
    pub before: Vec<String>,
    pub after: Vec<String>,
}

impl Stage {
    pub fn wrap(self, inner: Vec<String>) -> Vec<String> {
        let mut tokens = self.before;
        tokens.extend(inner);
        tokens.extend(self.after);
        tokens
    }
}

pub fn tokens<const N: usize>(items: [&str; N]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Two-stage seek plus clip duration.
///
/// Seeks 90% of the way (whole seconds) on the input, which is fast but
/// keyframe-aligned, then seeks the remainder frame-accurately on the output.
pub fn trim_stage(trim: Option<&TrimSettings>) -> Stage {
    let Some(trim) = trim else {
        return Stage::default();
    };

    let fast_skip = (FAST_SKIP_RATIO * trim.start).floor();
    let exact_remainder = trim.start - fast_skip;

    Stage {
        before: vec!["-ss".to_string(), format_ffmpeg_time(fast_skip, true)],
        after: vec![
            "-ss".to_string(),
            format_ffmpeg_time(exact_remainder, true),
            "-t".to_string(),
            format_ffmpeg_time(trim.duration(), true),
        ],
    }
}

/// Loop a still image at 1 fps until the shortest stream (the audio) ends
pub fn image_input_stage(video_input: &Stream) -> Stage {
    if is_image(&video_input.name) {
        Stage {
            before: tokens(["-loop", "1", "-r", "1"]),
            after: tokens(["-shortest", "-r", "1"]),
        }
    } else {
        Stage::default()
    }
}

pub fn crop_filter(crop: &CropSettings) -> Vec<String> {
    if crop.is_active() {
        vec!["-vf".to_string(), crop.filter()]
    } else {
        Vec::new()
    }
}

/// Exactly one `-vf` chain: crop wins over scale-down, which wins over padding
pub fn mp4_video_filter(crop: &CropSettings, scale_down: bool) -> Vec<String> {
    if crop.is_active() {
        crop_filter(crop)
    } else if scale_down {
        tokens(["-vf", SCALE_DOWN_FILTER])
    } else {
        tokens(["-vf", EVEN_PAD_FILTER])
    }
}

/// Second input to mux in, unless audio removal was requested
pub fn audio_input(audio: Option<&Stream>, remove_audio: bool) -> Option<&Stream> {
    audio.filter(|_| !remove_audio)
}
