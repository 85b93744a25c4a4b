use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::follow::repository::FollowState;
use crate::posts::pagination::{Paginator, PAGE_SIZE};
use crate::posts::repository::FeedFilter;
use crate::posts::view::{to_view, PostView};
use crate::state::AppState;
use crate::users;

#[derive(Deserialize)]
pub struct PageQuery {
    page: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProfilePage {
    pub posts: Vec<PostView>,
    pub is_following: bool,
    pub followers_count: i64,
    pub following_count: i64,
    pub has_next: bool,
    pub has_previous: bool,
    pub page_number: usize,
    pub num_pages: usize,
    pub current_page: usize,
    pub profile_username: String,
    pub is_authenticated: bool,
}

/// GET /profile/{username}
async fn profile(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<ProfilePage>> {
    let target = users::find_by_username(&state.db, &username)?.ok_or(AppError::NotFound)?;

    let filter = FeedFilter::Author {
        author_id: &target.id,
    };
    let total = state.posts.count(filter).await?;
    let page = Paginator::new(total, PAGE_SIZE).get_page(query.page.as_deref());

    let records = state
        .posts
        .page(filter, Some(&user.id), page.limit(), page.offset())
        .await?;
    let posts = records.iter().map(|r| to_view(r, Some(&user.id))).collect();

    Ok(Json(ProfilePage {
        posts,
        is_following: state.follows.is_following(&user.id, &target.id).await?,
        followers_count: state.follows.count_followers(&target.id).await?,
        following_count: state.follows.count_following(&target.id).await?,
        has_next: page.has_next(),
        has_previous: page.has_previous(),
        page_number: page.number,
        num_pages: page.num_pages,
        current_page: page.number,
        profile_username: target.username,
        is_authenticated: true,
    }))
}

/// POST /follow/{username} — follow if not following, unfollow otherwise.
async fn toggle_follow(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(username): Path<String>,
) -> AppResult<Json<FollowState>> {
    let target = users::find_by_username(&state.db, &username)?.ok_or(AppError::NotFound)?;
    let follow = state.follows.toggle(&user.id, &target.id).await?;
    Ok(Json(follow))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/profile/{username}", get(profile))
        .route("/follow/{username}", post(toggle_follow))
}
