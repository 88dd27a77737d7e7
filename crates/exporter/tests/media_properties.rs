use clipcut_exporter::media::{classify, display_name, extension, is_image, sound_url, MediaType};
use proptest::prelude::*;

fn arb_extension() -> impl Strategy<Value = (&'static str, MediaType)> {
    prop::sample::select(vec![
        ("png", MediaType::Image),
        ("JPEG", MediaType::Image),
        ("gif", MediaType::Image),
        ("Mp4", MediaType::Video),
        ("mkv", MediaType::Video),
        ("webm", MediaType::Video),
        ("wav", MediaType::Audio),
        ("OGG", MediaType::Audio),
        ("txt", MediaType::Unknown),
    ])
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Only the last extension decides the media type, in any case
    #[test]
    fn prop_classify_by_last_extension(
        stem in "[a-z ]{1,12}(\\.[a-z]{1,4})?",
        (ext, expected) in arb_extension(),
    ) {
        let name = format!("{}.{}", stem, ext);
        prop_assert_eq!(classify(&name), expected);
        prop_assert_eq!(is_image(&name), expected == MediaType::Image);
        prop_assert_eq!(extension(&name), Some(ext.to_lowercase()));
    }

    /// Display names never keep tags or extensions
    #[test]
    fn prop_display_name_strips_tags(stem in "[a-zA-Z0-9_-]{1,12}", tag in "[a-z=/.]{0,16}") {
        let name = format!("  {} [{}x].png", stem, tag);
        prop_assert_eq!(display_name(&name), stem);
    }
}

#[test]
fn test_no_extension() {
    assert_eq!(extension("README"), None);
    assert_eq!(extension("archive."), None);
    assert_eq!(classify("notes.txt"), MediaType::Unknown);
}

#[test]
fn test_sound_url_forms() {
    assert_eq!(
        sound_url("cover [sound=example.com/song.mp3].png").as_deref(),
        Some("https://example.com/song.mp3")
    );
    assert_eq!(
        sound_url("cover [sound=http://example.com/a%20b.mp3].jpg").as_deref(),
        Some("http://example.com/a b.mp3")
    );
    assert_eq!(sound_url("cover [sound=].png"), None);
    assert_eq!(sound_url("cover.png"), None);
}

#[test]
fn test_display_name_cuts_at_first_dot() {
    assert_eq!(display_name("holiday.final.mp4"), "holiday");
    assert_eq!(display_name("[tag] clip [sound=a.com/b.mp3].gif"), "clip");
}
