// Vorbis audio extraction argument builder

use super::common::{tokens, trim_stage, VORBIS_AUDIO_FLAGS};
use crate::settings::ExportSettings;
use crate::staging::Stream;

/// Extract the first audio stream of `video_input` into `output.ogg`
pub fn build_ogg_parameters(settings: &ExportSettings, video_input: &Stream) -> Vec<String> {
    let base = vec![
        "-i".to_string(),
        video_input.name.clone(),
        "-map".to_string(),
        "0:a:0".to_string(),
    ];

    let mut command = trim_stage(settings.trim.as_ref()).wrap(base);
    command.extend(tokens(VORBIS_AUDIO_FLAGS));
    command.push("output.ogg".to_string());
    command
}
