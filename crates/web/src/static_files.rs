//! Static file loading and the cache-header helpers that go with it.

use std::io;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use mime::Mime;
use tracing::trace;

/// Maps a file extension to its MIME type; unknown extensions fall back to
/// `application/octet-stream`.
pub fn mime_for_extension(ext: &str) -> Mime {
    match ext {
        "html" => mime::TEXT_HTML,
        "css" => mime::TEXT_CSS,
        "js" => mime::TEXT_JAVASCRIPT,
        "json" => mime::APPLICATION_JSON,
        "png" => mime::IMAGE_PNG,
        "jpg" | "jpeg" => mime::IMAGE_JPEG,
        "gif" => mime::IMAGE_GIF,
        "svg" => mime::IMAGE_SVG,
        "pdf" => mime::APPLICATION_PDF,
        "ico" => "image/x-icon".parse().unwrap(),
        "zip" => "application/zip".parse().unwrap(),
        "tar" => "application/x-tar".parse().unwrap(),
        "gz" => "application/gzip".parse().unwrap(),
        "bz2" => "application/x-bzip2".parse().unwrap(),
        "mp3" => "audio/mpeg".parse().unwrap(),
        "wav" => "audio/wav".parse().unwrap(),
        "mp4" => "video/mp4".parse().unwrap(),
        "webm" => "video/webm".parse().unwrap(),
        "ogg" => "video/ogg".parse().unwrap(),
        _ => mime::APPLICATION_OCTET_STREAM,
    }
}

/// Builds a strong validator from modification time and length:
/// `"hex(mtime)-len"`.
pub fn etag(modified: SystemTime, len: usize) -> String {
    let secs = modified.duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or_default();
    format!("\"{secs:x}-{len}\"")
}

/// A static file loaded from disk, ready to be written into a response.
#[derive(Debug)]
pub struct StaticFile {
    pub content: Bytes,
    pub mime: Mime,
    pub modified: SystemTime,
    pub etag: String,
}

/// The directory static files are served from.
#[derive(Debug, Clone)]
pub struct StaticDir {
    root: PathBuf,
}

impl StaticDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Loads the file at the request path, relative to the root.
    ///
    /// Returns `Ok(None)` when no such file exists (the caller answers
    /// 404); paths trying to climb out of the root are treated the same.
    pub fn load(&self, path: &str) -> io::Result<Option<StaticFile>> {
        if path.split('/').any(|segment| segment == "..") {
            return Ok(None);
        }

        let file_path = self.root.join(path.trim_start_matches('/'));
        trace!(file = %file_path.display(), "loading static file");

        let metadata = match std::fs::metadata(&file_path) {
            Ok(metadata) if metadata.is_file() => metadata,
            Ok(_) => return Ok(None),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };

        let content = std::fs::read(&file_path)?;
        let modified = metadata.modified().unwrap_or(UNIX_EPOCH);

        let ext = file_path.extension().and_then(|e| e.to_str()).unwrap_or_default();

        Ok(Some(StaticFile {
            etag: etag(modified, content.len()),
            mime: mime_for_extension(ext),
            modified,
            content: Bytes::from(content),
        }))
    }
}
