//! Video references.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use url::Url;

/// A local video file and the URL the model servers fetch it from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoRef {
    /// File name, e.g. `a.mp4`
    pub filename: String,
    /// Local path of the file
    pub path: PathBuf,
    /// `{base_url}/{filename}`
    pub resolved_url: String,
}

impl VideoRef {
    /// Build a reference by appending the file name of `path` to `base_url`.
    ///
    /// Returns `None` when the path has no UTF-8 file name or the base URL
    /// cannot carry a path (e.g. `mailto:`).
    pub fn resolve(path: impl Into<PathBuf>, base_url: &Url) -> Option<Self> {
        let path = path.into();
        let filename = path.file_name()?.to_str()?.to_string();

        let mut url = base_url.clone();
        url.path_segments_mut()
            .ok()?
            .pop_if_empty()
            .push(&filename);

        Some(Self {
            filename,
            path,
            resolved_url: url.to_string(),
        })
    }
}

impl fmt::Display for VideoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.filename)
    }
}
