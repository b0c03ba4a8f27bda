use std::time::Duration;

use anyhow::{anyhow, Result};
use url::Url;

pub const FALLBACK_TITLE: &str = "Unknown Track";

const OEMBED_TIMEOUT: Duration = Duration::from_secs(8);

/// Pull the 11-character video ID out of anything a user might paste:
/// a raw ID, youtu.be short links, watch/embed/shorts//v/ URLs and
/// music.youtube.com, with or without scheme and `www.`.
pub fn extract_video_id(input: &str) -> Option<String> {
    let input = input.trim();
    if is_video_id(input) {
        return Some(input.to_owned());
    }
    let candidate = if input.contains("://") {
        input.to_owned()
    } else {
        format!("https://{}", input)
    };
    let url = Url::parse(&candidate).ok()?;
    let host = url.host_str()?;
    let host = host.strip_prefix("www.").unwrap_or(host);

    let mut segments = url.path_segments()?.filter(|s| !s.is_empty());
    let id = match host {
        "youtu.be" => segments.next().map(str::to_owned),
        "youtube.com" => match segments.next() {
            Some("watch") => query_v(&url),
            Some("embed") | Some("shorts") | Some("v") => segments.next().map(str::to_owned),
            _ => None,
        },
        "music.youtube.com" => match segments.next() {
            Some("watch") => query_v(&url),
            _ => None,
        },
        _ => None,
    }?;
    is_video_id(&id).then(|| id)
}

fn query_v(url: &Url) -> Option<String> {
    url.query_pairs()
        .find(|(key, _)| key == "v")
        .map(|(_, value)| value.into_owned())
}

fn is_video_id(s: &str) -> bool {
    s.len() == 11
        && s.bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// Thumbnails are derived, never fetched.
pub fn thumbnail_url(youtube_id: &str) -> String {
    format!("https://img.youtube.com/vi/{}/mqdefault.jpg", youtube_id)
}

#[derive(Debug, Clone)]
pub struct VideoMetadata {
    pub title: String,
    pub thumbnail: String,
}

/// Look a title up via YouTube's oEmbed endpoint. Lookup failure is a
/// degradation, not an error: the track is still added under a fallback
/// title.
pub async fn fetch_metadata(client: &reqwest::Client, youtube_id: &str) -> VideoMetadata {
    let title = match fetch_title(client, youtube_id).await {
        Ok(title) => title,
        Err(e) => {
            log::debug!("oEmbed lookup failed for {}: {}", youtube_id, e);
            FALLBACK_TITLE.to_owned()
        }
    };
    VideoMetadata {
        title,
        thumbnail: thumbnail_url(youtube_id),
    }
}

async fn fetch_title(client: &reqwest::Client, youtube_id: &str) -> Result<String> {
    let oembed = format!(
        "https://www.youtube.com/oembed?url=https://www.youtube.com/watch?v={}&format=json",
        youtube_id
    );
    let body: serde_json::Value = client
        .get(&oembed)
        .timeout(OEMBED_TIMEOUT)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    body.get("title")
        .and_then(|t| t.as_str())
        .map(str::to_owned)
        .ok_or_else(|| anyhow!("oEmbed response has no title"))
}
