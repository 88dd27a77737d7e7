use anyhow::{anyhow, Result};
use tracing::info;

use crate::media::sound_url;
use crate::messages::MessageManager;
use crate::staging::Stream;

/// Message id of the download progress line
const DOWNLOAD_MESSAGE_ID: &str = "download";

/// Download the track named by a `[sound=<url>]` tag in `file_name`.
///
/// Returns `Ok(None)` when the name carries no sound tag.
pub async fn fetch_tagged_sound(
    file_name: &str,
    messages: &mut MessageManager,
) -> Result<Option<Stream>> {
    let Some(url) = sound_url(file_name) else {
        return Ok(None);
    };
    fetch_sound(&url, messages).await.map(Some)
}

/// Download `url` chunk by chunk, keeping one progress line up to date
pub async fn fetch_sound(url: &str, messages: &mut MessageManager) -> Result<Stream> {
    info!("Fetching sound from {}", url);

    let mut response = reqwest::Client::new()
        .get(url)
        .send()
        .await
        .map_err(|e| anyhow!("Failed to fetch sound: {}", e))?;

    if !response.status().is_success() {
        return Err(anyhow!("Failed to fetch sound: HTTP {}", response.status()));
    }

    let total = response.content_length();
    let mut data = Vec::with_capacity(total.unwrap_or(0) as usize);
    messages.add(DOWNLOAD_MESSAGE_ID, download_progress(0, total));

    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| anyhow!("Failed to read sound data: {}", e))?
    {
        data.extend_from_slice(&chunk);
        messages.add(DOWNLOAD_MESSAGE_ID, download_progress(data.len() as u64, total));
    }

    info!("Fetched {} bytes of sound", data.len());
    Ok(Stream::from_bytes(sound_file_name(url), data))
}

/// Progress line text; a missing or zero `Content-Length` shows bytes only
pub fn download_progress(received: u64, total: Option<u64>) -> String {
    match total.filter(|t| *t > 0) {
        Some(total) => format!(
            "Downloading sound: {:.1}%",
            (received as f64 / total as f64 * 100.0).min(100.0)
        ),
        None => format!("Downloading sound: {} bytes", received),
    }
}

/// Staged name for a downloaded track, `sound-` plus the URL's last path
/// segment so it cannot clash with the video input.
pub fn sound_file_name(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let path = path.split_once("://").map_or(path, |(_, rest)| rest);

    match path.split_once('/').map(|(_, p)| p.rsplit('/').next().unwrap_or_default()) {
        Some(segment) if !segment.is_empty() && segment != "." && segment != ".." => {
            format!("sound-{}", segment)
        }
        _ => "sound".to_string(),
    }
}
