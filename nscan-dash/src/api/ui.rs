//! UI serving routes
//!
//! Serves the single dashboard page and its static assets.

use axum::{
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};

use crate::AppState;

const INDEX_HTML: &str = include_str!("../ui/index.html");
const DASHBOARD_JS: &str = include_str!("../ui/dashboard.js");
const DASHBOARD_CSS: &str = include_str!("../ui/dashboard.css");

/// Build UI routes
pub fn ui_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(serve_index))
        .route("/static/dashboard.js", get(serve_dashboard_js))
        .route("/static/dashboard.css", get(serve_dashboard_css))
}

/// GET /
pub async fn serve_index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// GET /static/dashboard.js
pub async fn serve_dashboard_js() -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/javascript")],
        DASHBOARD_JS,
    )
        .into_response()
}

/// GET /static/dashboard.css
pub async fn serve_dashboard_css() -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/css")],
        DASHBOARD_CSS,
    )
        .into_response()
}
