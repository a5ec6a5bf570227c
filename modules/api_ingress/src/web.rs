use std::sync::Arc;

use axum::{
    http::Uri,
    response::{Html, Json},
    Extension,
};
use serde_json::{json, Value};
use utoipa::openapi::OpenApi;

use crate::problem::{self, ProblemResponse};

pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

pub async fn openapi_json(Extension(doc): Extension<Arc<OpenApi>>) -> Json<OpenApi> {
    Json(doc.as_ref().clone())
}

pub async fn serve_docs() -> Html<&'static str> {
    Html(
        r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8"/>
  <title>Foodgram API Docs</title>
  <script src="https://unpkg.com/@stoplight/elements@latest/web-components.min.js"></script>
  <link rel="stylesheet" href="https://unpkg.com/@stoplight/elements@latest/styles.min.css">
</head>
<body>
  <elements-api apiDescriptionUrl="/openapi.json" router="hash" layout="sidebar"></elements-api>
</body>
</html>"#,
    )
}

/// Unknown routes answer with a problem document like every other error.
pub async fn fallback(uri: Uri) -> ProblemResponse {
    let mut resp = problem::not_found(format!("No route for {}", uri.path()));
    resp.0.instance = uri.path().to_string();
    resp
}
