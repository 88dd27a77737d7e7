// libx264 MP4 argument builder

use super::common::{audio_input, image_input_stage, mp4_video_filter, tokens, trim_stage};
use crate::settings::{ExportSettings, X264Settings, X264Tune};
use crate::staging::Stream;

pub fn build_mp4_parameters(
    settings: &ExportSettings,
    x264: &X264Settings,
    video_input: &Stream,
    audio: Option<&Stream>,
) -> Vec<String> {
    let base = base_command(video_input, audio_input(audio, settings.remove_audio));

    // Trim's input seek ends up outermost, in front of the image loop flags
    let mut command = trim_stage(settings.trim.as_ref())
        .wrap(image_input_stage(video_input).wrap(base));

    command.extend(video_codec_flags(x264));
    command.extend(mp4_video_filter(&settings.crop, settings.scale_down));
    command.extend(tokens(["-pix_fmt:v", "yuv420p", "output.mp4"]));
    command
}

fn base_command(video_input: &Stream, audio: Option<&Stream>) -> Vec<String> {
    let mut command = vec!["-i".to_string(), video_input.name.clone()];
    if let Some(audio) = audio {
        command.extend(["-i".to_string(), audio.name.clone()]);
        command.extend(tokens(["-map", "1:a:0"]));
    }
    command.extend(tokens(["-map", "0:v:0"]));
    command
}

fn video_codec_flags(x264: &X264Settings) -> Vec<String> {
    let mut flags = tokens(["-c:v", "libx264", "-preset", x264.preset.as_str()]);

    if x264.tune != X264Tune::None {
        flags.extend(tokens(["-tune", x264.tune.as_str()]));
    }

    if let Some(kbps) = x264.bitrate_kbps {
        flags.push("-b:v".to_string());
        flags.push(format!("{}k", kbps));
    }

    flags
}
