//! Video file discovery.

use std::path::Path;

use tokio::fs;
use tracing::{debug, info, warn};
use url::Url;
use vinfer_models::VideoRef;

use crate::error::{PipelineError, PipelineResult};

/// Recognized video extensions, compared case-insensitively.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv", "flv", "wmv"];

/// True when the path ends in one of [`VIDEO_EXTENSIONS`].
pub fn has_video_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_lowercase();
            VIDEO_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Parse the base URL videos are served from. Only http(s) is accepted.
pub fn parse_base_url(base: &str) -> PipelineResult<Url> {
    let url = Url::parse(base.trim()).map_err(|_| PipelineError::InvalidBaseUrl(base.to_string()))?;
    match url.scheme() {
        "http" | "https" if url.has_host() => Ok(url),
        _ => Err(PipelineError::InvalidBaseUrl(base.to_string())),
    }
}

/// List video files in `dir`, sorted by file name, each resolved against `base_url`.
///
/// An existing directory without videos yields an empty list; a missing or
/// unreadable directory is an error.
pub async fn discover_videos(dir: &Path, base_url: &Url) -> PipelineResult<Vec<VideoRef>> {
    let videos_dir_error = |source| PipelineError::VideosDir {
        path: dir.to_path_buf(),
        source,
    };

    let mut entries = fs::read_dir(dir).await.map_err(videos_dir_error)?;
    let mut videos = Vec::new();

    while let Some(entry) = entries.next_entry().await.map_err(videos_dir_error)? {
        let path = entry.path();
        if !has_video_extension(&path) {
            continue;
        }

        // Follows symlinks
        match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => continue,
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                continue;
            }
        }

        match VideoRef::resolve(&path, base_url) {
            Some(video) => {
                debug!("Discovered {} -> {}", video.filename, video.resolved_url);
                videos.push(video);
            }
            None => warn!("Skipping {}: file name is not valid UTF-8", path.display()),
        }
    }

    videos.sort_by(|a, b| a.filename.cmp(&b.filename));
    info!("Found {} video file(s) in {}", videos.len(), dir.display());
    Ok(videos)
}
