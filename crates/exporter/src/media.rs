use percent_encoding::percent_decode_str;
use regex::Regex;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Image,
    Video,
    Audio,
    Unknown,
}

const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "gif"];
const VIDEO_EXTENSIONS: [&str; 3] = ["mp4", "webm", "mkv"];
const AUDIO_EXTENSIONS: [&str; 3] = ["mp3", "wav", "ogg"];

/// Classify a file by its extension alone. Contents are never sniffed, so a
/// misnamed file is misclassified.
pub fn classify(file_name: &str) -> MediaType {
    let Some(ext) = extension(file_name) else {
        return MediaType::Unknown;
    };

    if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        MediaType::Image
    } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        MediaType::Video
    } else if AUDIO_EXTENSIONS.contains(&ext.as_str()) {
        MediaType::Audio
    } else {
        MediaType::Unknown
    }
}

pub fn is_image(file_name: &str) -> bool {
    classify(file_name) == MediaType::Image
}

/// Lowercased extension, only when the name actually contains a dot
pub fn extension(file_name: &str) -> Option<String> {
    let (_, ext) = file_name.rsplit_once('.')?;
    if ext.is_empty() {
        None
    } else {
        Some(ext.to_lowercase())
    }
}

fn sound_tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[sound=(?P<url>.*)\]").unwrap())
}

fn any_tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[.+?\]").unwrap())
}

/// Human-facing name: bracket tags removed, cut at the first dot, trimmed.
///
/// `"clip [sound=example.com/a.mp3].png"` becomes `"clip"`.
pub fn display_name(file_name: &str) -> String {
    let untagged = any_tag_re().replace_all(file_name, "");
    let stem = untagged.split('.').next().unwrap_or_default();
    stem.trim().to_string()
}

/// URL carried in a `[sound=<url>]` file name tag.
///
/// The value is percent-decoded and given an `https://` scheme when it does
/// not already start with `http`.
pub fn sound_url(file_name: &str) -> Option<String> {
    let caps = sound_tag_re().captures(file_name)?;
    let raw = caps.name("url")?.as_str();
    if raw.is_empty() {
        return None;
    }

    let url = percent_decode_str(raw).decode_utf8_lossy().into_owned();
    if url.starts_with("http") {
        Some(url)
    } else {
        Some(format!("https://{}", url))
    }
}
