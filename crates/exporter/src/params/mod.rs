pub mod common;
pub mod mp4;
pub mod ogg;
pub mod webm;

use crate::error::ExportResult;
use crate::settings::{CodecSettings, ExportRequest, ExportSettings};
use crate::staging::Stream;

/// Build the ffmpeg argument vector for a loosely-typed export request.
///
/// Fails with `UnsupportedFormat` when `output_format` is not one of `mp4`,
/// `webm` or `ogg`, and with a settings error when the codec settings do not
/// fit the format. Nothing is returned on failure.
pub fn build_parameters(
    request: &ExportRequest,
    video_input: &Stream,
    audio_input: Option<&Stream>,
) -> ExportResult<Vec<String>> {
    let settings = ExportSettings::from_request(request)?;
    Ok(build_for_settings(&settings, video_input, audio_input))
}

/// Build the ffmpeg argument vector for already-typed settings.
///
/// Pure: identical inputs always produce identical tokens. The ogg builder
/// only reads `video_input` and ignores any audio stream.
pub fn build_for_settings(
    settings: &ExportSettings,
    video_input: &Stream,
    audio_input: Option<&Stream>,
) -> Vec<String> {
    match &settings.codec {
        CodecSettings::Mp4(x264) => {
            mp4::build_mp4_parameters(settings, x264, video_input, audio_input)
        }
        CodecSettings::Webm(vp8) => {
            webm::build_webm_parameters(settings, vp8, video_input, audio_input)
        }
        CodecSettings::Ogg => ogg::build_ogg_parameters(settings, video_input),
    }
}
