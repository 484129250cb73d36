//! Board, discussions, reviews, recaps, gallery and comments.

use actix_web::web;
use bc_core::models::{CommentableType, NewDiscussion, NewRecap, NewReview};
use bc_services::community::NewBoardPost;
use serde::Deserialize;
use uuid::Uuid;

use super::{created, ok, success, AppState, CommentBody};
use crate::error::ApiResult;
use crate::extract::Caller;

#[derive(Debug, Deserialize)]
pub struct BookFilter {
    pub book_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct CommentTarget {
    #[serde(rename = "type")]
    pub kind: CommentableType,
    pub id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct NewComment {
    pub commentable_type: CommentableType,
    pub commentable_id: Uuid,
    pub content: String,
}

// ── Board ───────────────────────────────────────────────────────────────────

pub async fn list_board(data: web::Data<AppState>, Caller(me): Caller) -> ApiResult {
    Ok(ok(data.services.community.list_board_posts(&me).await?))
}

pub async fn create_board_post(
    data: web::Data<AppState>,
    Caller(me): Caller,
    body: web::Json<NewBoardPost>,
) -> ApiResult {
    Ok(created(
        data.services.community.create_board_post(&me, body.into_inner()).await?,
    ))
}

pub async fn board_post(data: web::Data<AppState>, Caller(me): Caller, path: web::Path<Uuid>) -> ApiResult {
    Ok(ok(data.services.community.board_post_detail(&me, path.into_inner()).await?))
}

pub async fn delete_board_post(
    data: web::Data<AppState>,
    Caller(me): Caller,
    path: web::Path<Uuid>,
) -> ApiResult {
    data.services.community.delete_board_post(&me, path.into_inner()).await?;
    Ok(success())
}

pub async fn add_board_comment(
    data: web::Data<AppState>,
    Caller(me): Caller,
    path: web::Path<Uuid>,
    body: web::Json<CommentBody>,
) -> ApiResult {
    let comment = data
        .services
        .community
        .add_board_comment(&me, path.into_inner(), &body.content)
        .await?;
    Ok(created(comment))
}

// ── Discussions ─────────────────────────────────────────────────────────────

pub async fn list_discussions(
    data: web::Data<AppState>,
    Caller(me): Caller,
    query: web::Query<BookFilter>,
) -> ApiResult {
    Ok(ok(data.services.community.list_discussions(&me, query.book_id).await?))
}

pub async fn create_discussion(
    data: web::Data<AppState>,
    Caller(me): Caller,
    body: web::Json<NewDiscussion>,
) -> ApiResult {
    Ok(created(
        data.services.community.create_discussion(&me, body.into_inner()).await?,
    ))
}

pub async fn discussion(data: web::Data<AppState>, Caller(me): Caller, path: web::Path<Uuid>) -> ApiResult {
    Ok(ok(data.services.community.discussion_detail(&me, path.into_inner()).await?))
}

pub async fn delete_discussion(
    data: web::Data<AppState>,
    Caller(me): Caller,
    path: web::Path<Uuid>,
) -> ApiResult {
    data.services
        .community
        .delete_content(&me, CommentableType::Discussion, path.into_inner())
        .await?;
    Ok(success())
}

// ── Reviews ─────────────────────────────────────────────────────────────────

pub async fn list_reviews(
    data: web::Data<AppState>,
    Caller(me): Caller,
    query: web::Query<BookFilter>,
) -> ApiResult {
    Ok(ok(data.services.community.list_reviews(&me, query.book_id).await?))
}

pub async fn create_review(
    data: web::Data<AppState>,
    Caller(me): Caller,
    body: web::Json<NewReview>,
) -> ApiResult {
    Ok(created(data.services.community.create_review(&me, body.into_inner()).await?))
}

pub async fn review(data: web::Data<AppState>, Caller(me): Caller, path: web::Path<Uuid>) -> ApiResult {
    Ok(ok(data.services.community.review_detail(&me, path.into_inner()).await?))
}

pub async fn delete_review(data: web::Data<AppState>, Caller(me): Caller, path: web::Path<Uuid>) -> ApiResult {
    data.services
        .community
        .delete_content(&me, CommentableType::Review, path.into_inner())
        .await?;
    Ok(success())
}

// ── Recaps ──────────────────────────────────────────────────────────────────

pub async fn list_recaps(data: web::Data<AppState>, Caller(me): Caller) -> ApiResult {
    Ok(ok(data.services.community.list_recaps(&me).await?))
}

pub async fn create_recap(
    data: web::Data<AppState>,
    Caller(me): Caller,
    body: web::Json<NewRecap>,
) -> ApiResult {
    Ok(created(data.services.community.create_recap(&me, body.into_inner()).await?))
}

pub async fn recap(data: web::Data<AppState>, Caller(me): Caller, path: web::Path<Uuid>) -> ApiResult {
    Ok(ok(data.services.community.recap_detail(&me, path.into_inner()).await?))
}

pub async fn delete_recap(data: web::Data<AppState>, Caller(me): Caller, path: web::Path<Uuid>) -> ApiResult {
    data.services
        .community
        .delete_content(&me, CommentableType::Recap, path.into_inner())
        .await?;
    Ok(success())
}

pub async fn gallery(data: web::Data<AppState>, Caller(me): Caller) -> ApiResult {
    Ok(ok(data.services.community.gallery(&me).await?))
}

// ── Comments ────────────────────────────────────────────────────────────────

/// `?type=discussion|review|recap&id=<uuid>`
pub async fn list_comments(
    data: web::Data<AppState>,
    Caller(me): Caller,
    query: web::Query<CommentTarget>,
) -> ApiResult {
    Ok(ok(data
        .services
        .community
        .list_comments(&me, query.kind, query.id)
        .await?))
}

pub async fn add_comment(
    data: web::Data<AppState>,
    Caller(me): Caller,
    body: web::Json<NewComment>,
) -> ApiResult {
    let comment = data
        .services
        .community
        .add_comment(&me, body.commentable_type, body.commentable_id, &body.content)
        .await?;
    Ok(created(comment))
}

pub async fn delete_comment(data: web::Data<AppState>, Caller(me): Caller, path: web::Path<Uuid>) -> ApiResult {
    data.services.community.delete_comment(&me, path.into_inner()).await?;
    Ok(success())
}
