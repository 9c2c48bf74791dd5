//! Fallback for everything outside `/api/`: static assets with SPA routing.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use crate::api::decode_path;
use crate::error::{ApiError, ApiResult};
use crate::http::mime;
use crate::http::request::Method;
use crate::http::response::{Response, ResponseBuilder, StatusCode};
use crate::router::Context;

pub fn serve(ctx: &Context<'_>) -> ApiResult<Response> {
    let request = ctx.request;

    if request.path == "/api" || request.path.starts_with("/api/") {
        return Err(ApiError::not_found(format!(
            "No route for {} {}",
            request.method, request.path
        )));
    }

    if !matches!(request.method, Method::GET | Method::HEAD) {
        return Err(ApiError::MethodNotAllowed(format!(
            "{} is not allowed on {}",
            request.method, request.path
        )));
    }

    let Some(cfg) = &ctx.state.config.static_files else {
        return Err(ApiError::not_found("No static content is configured"));
    };

    let relative = safe_relative_path(&decode_path(request.path.trim_start_matches('/'))?)?;

    let index = cfg.root.join(&cfg.index);
    let candidate = if relative.as_os_str().is_empty() {
        index.clone()
    } else {
        cfg.root.join(&relative)
    };
    // Unknown paths belong to the client-side router.
    let file = if candidate.is_file() { candidate } else { index };
    ensure_within_root(&cfg.root, &file)?;

    let content = read_file(&file)?;
    let content_type = mime::content_type(&file);

    // HEAD keeps the body so the writer can announce its length.
    Ok(ResponseBuilder::new(StatusCode::Ok)
        .header("Content-Type", content_type)
        .body(content)
        .build())
}

/// Keeps only plain name components of a decoded request path. Absolute
/// paths, drive prefixes and `..` are refused; `.` is dropped.
fn safe_relative_path(decoded: &str) -> ApiResult<PathBuf> {
    let mut relative = PathBuf::new();
    // Backslashes count as separators on every platform.
    for component in Path::new(&decoded.replace('\\', "/")).components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(ApiError::forbidden("Path traversal is not allowed"));
            }
        }
    }
    Ok(relative)
}

/// Rejects files that resolve (through symlinks) outside the static root.
fn ensure_within_root(root: &Path, file: &Path) -> ApiResult<()> {
    let (Ok(root), Ok(file)) = (root.canonicalize(), file.canonicalize()) else {
        // Missing files are reported by the read.
        return Ok(());
    };
    if !file.starts_with(&root) {
        tracing::warn!(path = %file.display(), "Static path escapes the root");
        return Err(ApiError::forbidden("Path traversal is not allowed"));
    }
    Ok(())
}

fn read_file(path: &Path) -> ApiResult<Vec<u8>> {
    std::fs::read(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => ApiError::not_found("File not found"),
        _ => ApiError::internal(format!("failed to read {}: {e}", path.display())),
    })
}
