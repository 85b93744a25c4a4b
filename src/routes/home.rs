use askama::Template;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::error::AppResult;
use crate::extractors::MaybeUser;

#[derive(Template)]
#[template(path = "pages/index.html")]
pub struct IndexTemplate {
    pub username: Option<String>,
}

/// Wrapper to render askama templates as axum responses
pub struct Html<T: Template>(pub T);

impl<T: Template> IntoResponse for Html<T> {
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(body) => (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
                body,
            )
                .into_response(),
            Err(e) => {
                tracing::error!("Template render error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Template error").into_response()
            }
        }
    }
}

/// Front page. The feed itself is fetched client-side from /posts.
pub async fn index(maybe_user: MaybeUser) -> AppResult<Response> {
    let template = IndexTemplate {
        username: maybe_user.0.map(|u| u.username),
    };
    Ok(Html(template).into_response())
}
