use std::path::Path;

use tracing::info;

use crate::errors::AppResult;
use crate::models::Candidate;

pub const PLAYLIST_HEADER: &str = "#EXTM3U";
/// Comment line prefix announcing the label of the following channels
pub const SOURCE_COMMENT_PREFIX: &str = "# Source: ";

/// Render the aggregated channels as extended-M3U text.
///
/// Channels are written in the given order. A `# Source:` comment precedes
/// every run of channels sharing a label, separated from the previous run by
/// a blank line.
pub fn generate_m3u_content(channels: &[Candidate]) -> String {
    let mut m3u = String::from(PLAYLIST_HEADER);
    m3u.push('\n');

    let mut current_label: Option<&str> = None;

    for channel in channels {
        if current_label != Some(channel.source_label.as_str()) {
            if current_label.is_some() {
                m3u.push('\n');
            }
            current_label = Some(channel.source_label.as_str());
            m3u.push_str(&format!("{SOURCE_COMMENT_PREFIX}{}\n", channel.source_label));
        }

        m3u.push_str(&format!(
            "#EXTINF:-1 tvg-logo=\"{}\" group-title=\"{}\",{}\n",
            channel.logo, channel.group, channel.channel_name
        ));
        m3u.push_str(&format!("{}\n", channel.url));
    }

    m3u
}

/// Write the playlist to `path`, replacing any existing file
pub async fn save_m3u_file(path: impl AsRef<Path>, channels: &[Candidate]) -> AppResult<()> {
    let path = path.as_ref();
    let content = generate_m3u_content(channels);
    tokio::fs::write(path, content).await?;

    info!(
        "Combined playlist written to {} with {} channels.",
        path.display(),
        channels.len()
    );
    Ok(())
}
