use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::extractors::{CurrentUser, MaybeUser};
use crate::posts::pagination::{Paginator, PAGE_SIZE};
use crate::posts::repository::FeedFilter;
use crate::posts::view::{to_view, FeedPage};
use crate::state::AppState;
use crate::users;

#[derive(Deserialize)]
pub struct FeedQuery {
    feed: Option<String>,
    username: Option<String>,
    // Raw string: garbage values clamp to page 1 instead of erroring
    page: Option<String>,
}

#[derive(Deserialize)]
pub struct PostBody {
    post: String,
}

/// POST /new_post
async fn new_post(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(body): Json<PostBody>,
) -> AppResult<impl IntoResponse> {
    let content = body.post.trim();
    if content.is_empty() {
        return Err(AppError::BadRequest("Post must have content.".into()));
    }

    let created = state.posts.create(&user.id, content).await?;
    let record = state
        .posts
        .record(created.id, Some(&user.id))
        .await?
        .ok_or(AppError::NotFound)?;

    Ok((StatusCode::CREATED, Json(to_view(&record, Some(&user.id)))))
}

/// GET /posts?feed=&username=&page=
async fn get_posts(
    State(state): State<AppState>,
    maybe_user: MaybeUser,
    Query(query): Query<FeedQuery>,
) -> AppResult<Json<FeedPage>> {
    let viewer = maybe_user.0;
    let feed_type = query.feed.as_deref().unwrap_or("all").to_string();

    // Resolve the filter; unknown feed values (and a profile feed without a
    // username) fall back to the all feed.
    let author_id;
    let viewer_id;
    let filter = match (feed_type.as_str(), query.username.as_deref()) {
        ("following", _) => {
            let user = viewer.as_ref().ok_or(AppError::Unauthorized)?;
            viewer_id = user.id.clone();
            FeedFilter::Following {
                viewer_id: &viewer_id,
            }
        }
        ("profile", Some(username)) if !username.is_empty() => {
            let user = users::find_by_username(&state.db, username)?.ok_or(AppError::NotFound)?;
            author_id = user.id;
            FeedFilter::Author {
                author_id: &author_id,
            }
        }
        _ => FeedFilter::All,
    };

    let page = feed_page(&state, filter, viewer.as_ref(), query.page.as_deref(), feed_type).await?;
    Ok(Json(page))
}

/// GET /following — the following feed, auth required.
async fn following_page(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<FeedQuery>,
) -> AppResult<Json<FeedPage>> {
    let filter = FeedFilter::Following { viewer_id: &user.id };
    let page = feed_page(
        &state,
        filter,
        Some(&user),
        query.page.as_deref(),
        "following".to_string(),
    )
    .await?;
    Ok(Json(page))
}

/// Shared feed assembly: count, clamp the page window, load, project.
async fn feed_page(
    state: &AppState,
    filter: FeedFilter<'_>,
    viewer: Option<&CurrentUser>,
    requested_page: Option<&str>,
    feed_type: String,
) -> AppResult<FeedPage> {
    let viewer_id = viewer.map(|u| u.id.as_str());

    let total = state.posts.count(filter).await?;
    let page = Paginator::new(total, PAGE_SIZE).get_page(requested_page);

    let records = state
        .posts
        .page(filter, viewer_id, page.limit(), page.offset())
        .await?;
    let posts = records.iter().map(|r| to_view(r, viewer_id)).collect();

    Ok(FeedPage {
        posts,
        has_next: page.has_next(),
        has_previous: page.has_previous(),
        page_number: page.number,
        num_pages: page.num_pages,
        current_page: page.number,
        is_authenticated: viewer.is_some(),
        feed_type,
    })
}

/// POST /like/{post_id}
async fn like_post(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(post_id): Path<i64>,
) -> AppResult<Json<serde_json::Value>> {
    let like = state.posts.toggle_like(post_id, &user.id).await?;
    Ok(Json(serde_json::json!({
        "likes": like.likes,
        "liked": like.liked,
    })))
}

/// PUT|POST /edit/{post_id}
async fn edit_post(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(post_id): Path<i64>,
    Json(body): Json<PostBody>,
) -> AppResult<Json<crate::posts::view::PostView>> {
    let post = state.posts.get(post_id).await?.ok_or(AppError::NotFound)?;
    if post.author_id != user.id {
        return Err(AppError::Forbidden("User must be author of post".into()));
    }

    let content = body.post.trim();
    if content.is_empty() {
        return Err(AppError::BadRequest("Post must have content.".into()));
    }

    state.posts.update_content(post_id, content).await?;
    let record = state
        .posts
        .record(post_id, Some(&user.id))
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(to_view(&record, Some(&user.id))))
}

/// DELETE /delete/{post_id}
async fn delete_post(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(post_id): Path<i64>,
) -> AppResult<Json<serde_json::Value>> {
    let post = state.posts.get(post_id).await?.ok_or(AppError::NotFound)?;
    if post.author_id != user.id {
        return Err(AppError::Forbidden("User must be author of post".into()));
    }

    state.posts.delete(post_id).await?;
    Ok(Json(serde_json::json!({
        "message": "Post deleted successfully."
    })))
}

/// Any verb other than DELETE on /delete/{post_id}.
async fn delete_method_required() -> AppError {
    AppError::MethodNotAllowed("DELETE method required".into())
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/new_post", post(new_post))
        .route("/posts", get(get_posts))
        .route("/following", get(following_page))
        .route("/like/{post_id}", post(like_post))
        .route("/edit/{post_id}", put(edit_post).post(edit_post))
        .route(
            "/delete/{post_id}",
            delete(delete_post).fallback(delete_method_required),
        )
}
