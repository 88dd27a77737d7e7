// libvpx WebM argument builder

use super::common::{audio_input, crop_filter, tokens, trim_stage, VORBIS_AUDIO_FLAGS};
use crate::settings::{ExportSettings, Vp8Settings};
use crate::staging::Stream;

pub fn build_webm_parameters(
    settings: &ExportSettings,
    vp8: &Vp8Settings,
    video_input: &Stream,
    audio: Option<&Stream>,
) -> Vec<String> {
    let audio = audio_input(audio, settings.remove_audio);

    let mut command = trim_stage(settings.trim.as_ref()).wrap(base_command(video_input, audio));

    // VP8 accepts odd dimensions, so there is no padding fallback
    command.extend(crop_filter(&settings.crop));

    command.extend(tokens(["-c:v", "libvpx", "-crf", "10", "-b:v"]));
    command.push(format!("{}k", vp8.bitrate_kbps));

    if audio.is_some() {
        command.extend(tokens(VORBIS_AUDIO_FLAGS));
    }

    command.push("output.webm".to_string());
    command
}

// Every `-i` comes before the `-map` flags; ffmpeg rejects an output option
// that precedes a later input.
fn base_command(video_input: &Stream, audio: Option<&Stream>) -> Vec<String> {
    let mut command = vec!["-i".to_string(), video_input.name.clone()];
    if let Some(audio) = audio {
        command.extend(["-i".to_string(), audio.name.clone()]);
    }
    command.extend(tokens(["-map", "0:v:0"]));
    if audio.is_some() {
        command.extend(tokens(["-map", "1:a:0"]));
    }
    command
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{CodecSettings, CropSettings, TrimSettings};

    fn settings() -> ExportSettings {
        ExportSettings::new(CodecSettings::Webm(Vp8Settings { bitrate_kbps: 1000 }))
    }

    fn build(settings: &ExportSettings, audio: Option<&str>) -> Vec<String> {
        let video = Stream::from_bytes("clip.mp4", Vec::new());
        let audio = audio.map(|name| Stream::from_bytes(name, Vec::new()));
        build_webm_parameters(
            settings,
            &Vp8Settings { bitrate_kbps: 1000 },
            &video,
            audio.as_ref(),
        )
    }

    #[test]
    fn test_with_audio() {
        assert_eq!(
            build(&settings(), Some("voice.ogg")),
            tokens([
                "-i", "clip.mp4", "-i", "voice.ogg", "-map", "0:v:0", "-map", "1:a:0", "-c:v",
                "libvpx", "-crf", "10", "-b:v", "1000k", "-c:a", "libvorbis", "-b:a", "256k",
                "output.webm",
            ])
        );
    }

    #[test]
    fn test_without_audio() {
        assert_eq!(
            build(&settings(), None),
            tokens([
                "-i", "clip.mp4", "-map", "0:v:0", "-c:v", "libvpx", "-crf", "10", "-b:v",
                "1000k", "output.webm",
            ])
        );
    }

    #[test]
    fn test_remove_audio_drops_every_audio_token() {
        let command = build(&settings().with_remove_audio(true), Some("voice.ogg"));
        assert!(!command.contains(&"voice.ogg".to_string()));
        assert!(!command.contains(&"1:a:0".to_string()));
        assert!(!command.contains(&"-c:a".to_string()));
        assert_eq!(command.iter().filter(|t| *t == "-i").count(), 1);
    }

    #[test]
    fn test_crop_and_trim() {
        let command = build(
            &settings()
                .with_crop(CropSettings::new(300, 301, 1, 1))
                .with_trim(TrimSettings::new(100.0, 130.5)),
            None,
        );
        assert_eq!(&command[..2], &tokens(["-ss", "00:01:30.000"])[..]);
        let joined = command.join(" ");
        assert!(joined.contains("-map 0:v:0 -ss 00:00:10.000 -t 00:00:30.500 -vf crop=300:301:1:1"));
    }

    #[test]
    fn test_no_filter_without_crop() {
        let command = build(&settings().with_scale_down(true), None);
        assert!(!command.contains(&"-vf".to_string()));
    }
}
