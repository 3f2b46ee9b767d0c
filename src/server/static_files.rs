use std::path::Path;

use axum::extract::Request;
use axum::http::{header, HeaderValue};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::Router;
use tower_http::services::ServeDir;

/// Paths served with no-cache headers in dev mode.
fn is_frontend_source(path: &str) -> bool {
    path == "/" || path.ends_with(".html") || path.ends_with(".css") || path.ends_with(".js")
}

async fn no_cache_headers(request: Request, next: Next) -> Response {
    let revalidate = is_frontend_source(request.uri().path());
    let mut response = next.run(request).await;

    if revalidate {
        let headers = response.headers_mut();
        headers.insert(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-cache, no-store, must-revalidate"),
        );
        headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
        headers.insert(header::EXPIRES, HeaderValue::from_static("0"));
    }
    response
}

/// The front-end bundle served from `public_dir`.
pub(super) fn frontend(public_dir: &Path, dev_mode: bool) -> Router {
    let router = Router::new().fallback_service(ServeDir::new(public_dir));
    if dev_mode {
        router.layer(middleware::from_fn(no_cache_headers))
    } else {
        router
    }
}
