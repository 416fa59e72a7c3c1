//! Static file serving.
//!
//! Request paths are cleaned lexically before they touch the filesystem, so
//! `..` segments can never climb above the served directory.

use std::path::{Component, Path, PathBuf};
use log::debug;

use crate::server::error::Error;
use crate::server::response::StatusCode;
use crate::server::writer::ResponseWriter;

const INDEX_FILE: &str = "index.html";

/// Normalize a URL path.
///
/// The result is always rooted, has no empty, `.` or `..` segments, and keeps
/// a trailing slash if the input had one. `..` at the root is dropped.
pub fn clean_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    let mut cleaned = format!("/{}", segments.join("/"));
    if path.ends_with('/') && cleaned.len() > 1 {
        cleaned.push('/');
    }
    cleaned
}

/// Map a cleaned URL path to a file under `root`.
///
/// Returns `None` if any component would leave `root`.
fn resolve(root: &Path, request_path: &str) -> Option<PathBuf> {
    let cleaned = clean_path(request_path);
    let relative = Path::new(cleaned.trim_start_matches('/'));

    let mut resolved = root.to_path_buf();
    for component in relative.components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    resolved.starts_with(root).then_some(resolved)
}

/// Get a content type for a file extension.
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    match ext.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" | "mjs" => "text/javascript; charset=utf-8",
        "json" => "application/json",
        "xml" => "application/xml",
        "txt" | "rs" | "go" | "md" => "text/plain; charset=utf-8",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "wasm" => "application/wasm",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}

/// Serve the file named by `request_path` from `root`.
///
/// Directories are answered with their `index.html` when present. Missing
/// files get `404`, and paths that escape `root` get `403`.
pub async fn serve_file(root: &Path, request_path: &str, w: &ResponseWriter) -> Result<(), Error> {
    let Some(mut file_path) = resolve(root, request_path) else {
        debug!("Refusing to serve {request_path}: outside {}", root.display());
        w.error(StatusCode::Forbidden, "403 forbidden");
        return Ok(());
    };

    let metadata = match tokio::fs::metadata(&file_path).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            w.error(StatusCode::NotFound, "404 page not found");
            return Ok(());
        }
        Err(e) => return Err(Error::IoError(e)),
    };

    if metadata.is_dir() {
        file_path.push(INDEX_FILE);
        if !tokio::fs::try_exists(&file_path).await? {
            w.error(StatusCode::NotFound, "404 page not found");
            return Ok(());
        }
    }

    let contents = tokio::fs::read(&file_path).await?;
    debug!("Serving {} ({} bytes)", file_path.display(), contents.len());

    w.set_header("Content-Type", content_type_for(&file_path));
    w.write_status(StatusCode::Ok);
    w.write(&contents);
    Ok(())
}
