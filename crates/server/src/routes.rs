use std::fs;
use std::path::{Component, Path, PathBuf};

use inkfolio_core::{ApiError, ImageList};

use crate::Site;
use crate::http::{HttpRequest, HttpResponse, percent_decode};

pub const IMAGES_ROUTE: &str = "/api/images";

pub fn route(req: &HttpRequest, site: &Site) -> HttpResponse {
    if req.method != "GET" && req.method != "HEAD" {
        return HttpResponse::json(
            404,
            &ApiError {
                error: "not_found".to_string(),
            },
        );
    }

    match req.route_path() {
        IMAGES_ROUTE => list_images(site),
        "/" => index(site),
        path => gallery_file(site, path)
            .or_else(|| static_file(site, path))
            .unwrap_or_else(|| HttpResponse::redirect("/")),
    }
}

fn list_images(site: &Site) -> HttpResponse {
    match site.lister.list() {
        Ok(images) => HttpResponse::json(200, &ImageList { images }),
        Err(err) => {
            log::error!("error reading images directory: {err:#}");
            HttpResponse::json(
                500,
                &ApiError {
                    error: "Failed to load images".to_string(),
                },
            )
        }
    }
}

fn index(site: &Site) -> HttpResponse {
    let path = site.root.join("index.html");
    match fs::read(&path) {
        Ok(body) => HttpResponse::new(200, content_type(&path), body),
        Err(err) => {
            log::warn!("cannot serve {}: {err}", path.display());
            HttpResponse::new(404, "text/plain; charset=utf-8", b"index.html not found".to_vec())
        }
    }
}

/// Serves `<public_prefix>/<file>` from the gallery directory, which need not
/// live under the site root.
fn gallery_file(site: &Site, request_path: &str) -> Option<HttpResponse> {
    let prefix = site.lister.public_prefix().trim_end_matches('/');
    let rest = request_path.strip_prefix(prefix)?;
    if !rest.starts_with('/') {
        return None;
    }
    read_file(resolve_static(site.lister.dir(), rest)?)
}

fn static_file(site: &Site, request_path: &str) -> Option<HttpResponse> {
    read_file(resolve_static(&site.root, request_path)?)
}

fn read_file(path: PathBuf) -> Option<HttpResponse> {
    if !path.is_file() {
        return None;
    }
    match fs::read(&path) {
        Ok(body) => Some(HttpResponse::new(200, content_type(&path), body)),
        Err(err) => {
            log::warn!("cannot read {}: {err}", path.display());
            None
        }
    }
}

/// Maps a URL path onto a file under `root`, refusing anything that would
/// leave it.
pub fn resolve_static(root: &Path, request_path: &str) -> Option<PathBuf> {
    let decoded = percent_decode(request_path)?;
    if decoded.contains(['\\', '\0']) {
        return None;
    }
    let relative = Path::new(decoded.trim_start_matches('/'));
    let mut resolved = root.to_path_buf();
    for component in relative.components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(resolved)
}

pub fn content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" | "mjs" => "text/javascript; charset=utf-8",
        "json" => "application/json",
        "txt" => "text/plain; charset=utf-8",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "woff2" => "font/woff2",
        _ => "application/octet-stream",
    }
}
