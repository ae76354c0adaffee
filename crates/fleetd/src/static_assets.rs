//! Static asset serving + SPA fallback (spec §6.3).
//!
//! `index.html` and any unmatched non-API path resolve to `index.html`
//! with `Cache-Control: no-cache`. Hashed assets (`app-a1b2c3d4e5.js`) get
//! a year-long immutable cache; everything else gets a day. Any request
//! path that escapes the configured root is rejected before touching the
//! filesystem, never served index.html as a fallback.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use axum::extract::State;
use axum::http::{header, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::state::AppState;

fn hashed_asset_pattern() -> &'static regex::Regex {
    static PATTERN: OnceLock<regex::Regex> = OnceLock::new();
    PATTERN.get_or_init(|| regex::Regex::new(r"[.-][A-Za-z0-9]{8,}\.\w+$").unwrap())
}

pub async fn static_handler(State(state): State<AppState>, uri: Uri) -> Response {
    let Some(root) = state.config.static_dir.clone() else {
        return not_found();
    };

    let Some(relative) = sanitize_relative(uri.path()) else {
        return not_found();
    };

    let candidate = root.join(&relative);
    if candidate.is_file() {
        return serve_file(&candidate).await;
    }

    let index = root.join("index.html");
    if index.is_file() {
        return serve_file(&index).await;
    }

    not_found()
}

/// Reject any path containing `..` or an absolute/prefix component,
/// regardless of whether the target exists — traversal is rejected
/// structurally, not by canonicalizing and comparing afterward.
fn sanitize_relative(request_path: &str) -> Option<PathBuf> {
    let mut buf = PathBuf::new();
    for component in Path::new(request_path.trim_start_matches('/')).components() {
        match component {
            std::path::Component::Normal(segment) => buf.push(segment),
            std::path::Component::CurDir => {}
            _ => return None,
        }
    }
    Some(buf)
}

async fn serve_file(path: &Path) -> Response {
    let Ok(bytes) = tokio::fs::read(path).await else {
        return not_found();
    };

    let content_type = content_type_for(path);
    let cache_control = cache_control_for(path);

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type),
            (header::CACHE_CONTROL, cache_control),
        ],
        bytes,
    )
        .into_response()
}

fn cache_control_for(path: &Path) -> &'static str {
    let is_index = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(|n| n == "index.html")
        .unwrap_or(false);

    if is_index {
        "no-cache"
    } else if path
        .file_name()
        .and_then(|n| n.to_str())
        .map(|n| hashed_asset_pattern().is_match(n))
        .unwrap_or(false)
    {
        "public, max-age=31536000, immutable"
    } else {
        "public, max-age=86400"
    }
}

fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html") => "text/html; charset=utf-8",
        Some("js" | "mjs") => "text/javascript; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("json") => "application/json",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("ico") => "image/x-icon",
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("map") => "application/json",
        _ => "application/octet-stream",
    }
}

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": "Not found" })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_parent_dir_components() {
        assert!(sanitize_relative("../../etc/passwd").is_none());
        assert!(sanitize_relative("/assets/../../etc/passwd").is_none());
    }

    #[test]
    fn accepts_plain_relative_paths() {
        assert_eq!(
            sanitize_relative("/assets/app.js"),
            Some(PathBuf::from("assets/app.js"))
        );
    }

    #[test]
    fn hashed_assets_get_immutable_cache_control() {
        assert_eq!(
            cache_control_for(Path::new("/dist/app-a1b2c3d4e5.js")),
            "public, max-age=31536000, immutable"
        );
    }

    #[test]
    fn plain_assets_get_a_day_of_cache() {
        assert_eq!(
            cache_control_for(Path::new("/dist/favicon.ico")),
            "public, max-age=86400"
        );
    }

    #[test]
    fn index_html_is_never_cached() {
        assert_eq!(cache_control_for(Path::new("/dist/index.html")), "no-cache");
    }
}
