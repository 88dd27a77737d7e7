use anyhow::{anyhow, Context, Result};
use regex::Regex;
use std::path::Path;
use std::process::Command;

use crate::settings::OutputFormat;

/// Oldest ffmpeg major version whose libx264/libvpx options we rely on
pub const MIN_FFMPEG_MAJOR: u32 = 4;

/// Encoders any supported output format may need
pub const KNOWN_ENCODERS: [&str; 3] = ["libx264", "libvpx", "libvorbis"];

/// Run `ffmpeg -version` and parse the release number.
///
/// Git snapshot builds (`ffmpeg version N-11234-g...`) carry no release
/// number; those yield `Ok(None)` and are accepted.
pub fn check_ffmpeg_version(ffmpeg_path: &Path) -> Result<Option<(u32, u32, u32)>> {
    let output = Command::new(ffmpeg_path)
        .arg("-version")
        .output()
        .with_context(|| {
            format!(
                "Failed to execute {} -version. Is ffmpeg installed and in PATH?",
                ffmpeg_path.display()
            )
        })?;

    if !output.status.success() {
        return Err(anyhow!("ffmpeg -version command failed"));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let Some(version) = parse_ffmpeg_version(&stdout) else {
        tracing::warn!("Could not parse ffmpeg version, assuming a development build");
        return Ok(None);
    };

    if version.0 < MIN_FFMPEG_MAJOR {
        return Err(anyhow!(
            "FFmpeg version {}.{}.{} is too old. Version {}.0 or higher is required.",
            version.0,
            version.1,
            version.2,
            MIN_FFMPEG_MAJOR
        ));
    }

    Ok(Some(version))
}

/// Parse `ffmpeg version 6.1.1`, `ffmpeg version n7.0` and similar banners
pub fn parse_ffmpeg_version(banner: &str) -> Option<(u32, u32, u32)> {
    let re = Regex::new(r"ffmpeg version[^\d]*?(\d+)\.(\d+)(?:\.(\d+))?").ok()?;
    let caps = re.captures(banner)?;
    let major = caps.get(1)?.as_str().parse().ok()?;
    let minor = caps.get(2)?.as_str().parse().ok()?;
    let patch = match caps.get(3) {
        Some(m) => m.as_str().parse().ok()?,
        None => 0,
    };
    Some((major, minor, patch))
}

/// List which of the known encoders this ffmpeg build provides
pub fn detect_available_encoders(ffmpeg_path: &Path) -> Result<Vec<String>> {
    let output = Command::new(ffmpeg_path)
        .arg("-hide_banner")
        .arg("-encoders")
        .output()
        .context("Failed to execute ffmpeg -encoders")?;

    if !output.status.success() {
        return Err(anyhow!("ffmpeg -encoders command failed"));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(parse_encoder_list(&stdout))
}

/// Pick known encoder names out of `ffmpeg -encoders` output.
///
/// Names are matched exactly on the second column so `libvpx-vp9` does not
/// count as `libvpx`.
pub fn parse_encoder_list(listing: &str) -> Vec<String> {
    let mut available = Vec::new();
    for line in listing.lines() {
        let mut columns = line.split_whitespace();
        let (Some(_flags), Some(name)) = (columns.next(), columns.next()) else {
            continue;
        };
        if KNOWN_ENCODERS.contains(&name) && !available.iter().any(|a| a == name) {
            available.push(name.to_string());
        }
    }
    available
}

/// Encoders `format` needs that are absent from `available`
pub fn missing_encoders(available: &[String], format: OutputFormat) -> Vec<&'static str> {
    format
        .required_encoders()
        .iter()
        .copied()
        .filter(|needed| !available.iter().any(|a| a == needed))
        .collect()
}
