use serde::Serialize;

use crate::posts::repository::PostRecord;

/// Wire projection of a post, relative to one viewer.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PostView {
    pub id: i64,
    pub content: String,
    pub created_at: String,
    pub edited_at: String,
    pub author: String,
    pub likes: i64,
    pub liked: bool,
    pub is_author: bool,
}

/// Pure projection: everything viewer-relative comes in through the
/// arguments, nothing is read from ambient request state.
pub fn to_view(record: &PostRecord, viewer_id: Option<&str>) -> PostView {
    PostView {
        id: record.post.id,
        content: record.post.content.clone(),
        created_at: record.post.created_at.clone(),
        edited_at: record.post.edited_at.clone(),
        author: record.author_username.clone(),
        likes: record.likes,
        liked: record.liked,
        is_author: viewer_id == Some(record.post.author_id.as_str()),
    }
}

/// Standard feed response envelope.
#[derive(Debug, Serialize)]
pub struct FeedPage {
    pub posts: Vec<PostView>,
    pub has_next: bool,
    pub has_previous: bool,
    pub page_number: usize,
    pub num_pages: usize,
    pub current_page: usize,
    pub is_authenticated: bool,
    pub feed_type: String,
}
