//! Submissions, reveal and meeting chat.

use actix_web::web;
use bc_services::meetings::SubmissionInput;
use serde::Deserialize;
use uuid::Uuid;

use super::{created, ok, AppState, CommentBody};
use crate::error::ApiResult;
use crate::extract::Caller;

#[derive(Debug, Deserialize)]
pub struct StarClick {
    pub star: u8,
}

pub async fn list_meetings(data: web::Data<AppState>, Caller(me): Caller) -> ApiResult {
    Ok(ok(data.services.meetings.list_meetings(&me).await?))
}

pub async fn meeting_detail(
    data: web::Data<AppState>,
    Caller(me): Caller,
    path: web::Path<Uuid>,
) -> ApiResult {
    Ok(ok(data.services.meetings.meeting_detail(&me, path.into_inner()).await?))
}

pub async fn reveal(data: web::Data<AppState>, Caller(me): Caller, path: web::Path<Uuid>) -> ApiResult {
    Ok(ok(data.services.meetings.reveal(&me, path.into_inner()).await?))
}

pub async fn upsert_submission(
    data: web::Data<AppState>,
    Caller(me): Caller,
    path: web::Path<Uuid>,
    body: web::Json<SubmissionInput>,
) -> ApiResult {
    let submission = data
        .services
        .meetings
        .upsert_submission(&me, path.into_inner(), body.into_inner())
        .await?;
    Ok(ok(submission))
}

pub async fn click_star(
    data: web::Data<AppState>,
    Caller(me): Caller,
    path: web::Path<Uuid>,
    body: web::Json<StarClick>,
) -> ApiResult {
    let submission = data
        .services
        .meetings
        .click_star(&me, path.into_inner(), body.star)
        .await?;
    Ok(ok(submission))
}

pub async fn list_meeting_comments(
    data: web::Data<AppState>,
    Caller(me): Caller,
    path: web::Path<Uuid>,
) -> ApiResult {
    Ok(ok(data
        .services
        .meetings
        .list_meeting_comments(&me, path.into_inner())
        .await?))
}

pub async fn add_meeting_comment(
    data: web::Data<AppState>,
    Caller(me): Caller,
    path: web::Path<Uuid>,
    body: web::Json<CommentBody>,
) -> ApiResult {
    let comment = data
        .services
        .meetings
        .add_meeting_comment(&me, path.into_inner(), &body.content)
        .await?;
    Ok(created(comment))
}

pub async fn add_submission_comment(
    data: web::Data<AppState>,
    Caller(me): Caller,
    path: web::Path<Uuid>,
    body: web::Json<CommentBody>,
) -> ApiResult {
    let comment = data
        .services
        .meetings
        .add_submission_comment(&me, path.into_inner(), &body.content)
        .await?;
    Ok(created(comment))
}
