use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path as UrlPath, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use bytes::Bytes;
use serde::Deserialize;
use tower_http::timeout::TimeoutLayer;
use tracing::{debug, warn};

use crate::error::ReadError;
use crate::extract::{FastExtractor, LineExtractor};
use crate::reader;

/// Builds the serving router: `GET /{file}?lines={n}`,
/// `GET /{file}?filter={s}`, or both together (either parameter order).
///
/// Every failure (unknown file, malformed arguments, a read dying
/// mid-scan) collapses to a generic 404; clients get no distinction.
pub fn router(base_dir: PathBuf, timeout: Duration) -> Router {
    Router::new()
        .route("/{file}", get(serve_tail))
        .layer(TimeoutLayer::new(timeout))
        .with_state(Arc::new(base_dir))
}

#[derive(Debug, Deserialize)]
struct TailQuery {
    lines: Option<String>,
    filter: Option<String>,
}

enum Plan {
    LastN(u64),
    Matching(String),
    LastNMatching(u64, String),
}

fn plan(query: TailQuery) -> Option<Plan> {
    match (query.lines, query.filter) {
        (Some(lines), Some(filter)) => Some(Plan::LastNMatching(lines.parse().ok()?, filter)),
        (Some(lines), None) => Some(Plan::LastN(lines.parse().ok()?)),
        (None, Some(filter)) => Some(Plan::Matching(filter)),
        (None, None) => None,
    }
}

fn run_plan(path: &Path, plan: Plan) -> Result<Bytes, ReadError> {
    match plan {
        Plan::LastN(n) => reader::read_last_n_lines(path, n),
        Plan::Matching(needle) => reader::read_lines_matching(path, &needle),
        Plan::LastNMatching(n, needle) => {
            // Limit then filter: the filter re-scans the in-memory
            // last-n span, which is a private immutable copy.
            let limited = reader::read_last_n_lines(path, n)?;
            FastExtractor::new(&limited).matching(&needle)
        }
    }
}

async fn serve_tail(
    State(base_dir): State<Arc<PathBuf>>,
    UrlPath(file): UrlPath<String>,
    Query(query): Query<TailQuery>,
) -> Response {
    let Some(plan) = plan(query) else {
        return not_found();
    };

    let path = base_dir.join(&file);
    match tokio::task::spawn_blocking(move || run_plan(&path, plan)).await {
        Ok(Ok(body)) => body.into_response(),
        Ok(Err(err)) => {
            debug!(file, %err, "tail read failed");
            not_found()
        }
        Err(join_err) => {
            warn!(file, %join_err, "tail read worker died");
            not_found()
        }
    }
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "404 page not found\n").into_response()
}
