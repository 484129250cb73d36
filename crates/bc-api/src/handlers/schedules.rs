//! Date votes, schedules, candidates and attendance.

use actix_web::web;
use bc_core::models::AttendanceStatus;
use bc_services::scheduling::{ConfirmSchedule, ScheduleDetails};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::{created, ok, success, AppState};
use crate::error::ApiResult;
use crate::extract::Caller;

#[derive(Debug, Deserialize)]
pub struct MonthQuery {
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct DateVoteRequest {
    pub date: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct BookChoice {
    pub book_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct AttendanceRequest {
    pub status: AttendanceStatus,
}

/// The month around `?date=`, or the current month.
pub async fn month_overview(
    data: web::Data<AppState>,
    Caller(me): Caller,
    query: web::Query<MonthQuery>,
) -> ApiResult {
    let date = query.date.unwrap_or_else(|| Utc::now().date_naive());
    Ok(ok(data.services.dates.month_overview(&me, date).await?))
}

pub async fn cast_date_vote(
    data: web::Data<AppState>,
    Caller(me): Caller,
    body: web::Json<DateVoteRequest>,
) -> ApiResult {
    let created = data.services.dates.cast(&me, body.date).await?;
    Ok(ok(json!({ "success": true, "created": created })))
}

pub async fn retract_date_vote(
    data: web::Data<AppState>,
    Caller(me): Caller,
    path: web::Path<NaiveDate>,
) -> ApiResult {
    data.services.dates.retract(&me, path.into_inner()).await?;
    Ok(success())
}

pub async fn confirm(
    data: web::Data<AppState>,
    Caller(me): Caller,
    body: web::Json<ConfirmSchedule>,
) -> ApiResult {
    let schedule = data.services.scheduling.confirm(&me, body.into_inner()).await?;
    Ok(created(schedule))
}

pub async fn update_details(
    data: web::Data<AppState>,
    Caller(me): Caller,
    path: web::Path<Uuid>,
    body: web::Json<ScheduleDetails>,
) -> ApiResult {
    let schedule = data
        .services
        .scheduling
        .update_details(&me, path.into_inner(), body.into_inner())
        .await?;
    Ok(ok(schedule))
}

pub async fn cancel(data: web::Data<AppState>, Caller(me): Caller, path: web::Path<Uuid>) -> ApiResult {
    data.services.scheduling.cancel(&me, path.into_inner()).await?;
    Ok(success())
}

pub async fn tally(data: web::Data<AppState>, Caller(me): Caller, path: web::Path<Uuid>) -> ApiResult {
    Ok(ok(data.services.candidates.tally(&me, path.into_inner()).await?))
}

pub async fn add_candidate(
    data: web::Data<AppState>,
    Caller(me): Caller,
    path: web::Path<Uuid>,
    body: web::Json<BookChoice>,
) -> ApiResult {
    let candidate = data
        .services
        .candidates
        .add_candidate(&me, path.into_inner(), body.book_id)
        .await?;
    Ok(created(candidate))
}

pub async fn remove_candidate(
    data: web::Data<AppState>,
    Caller(me): Caller,
    path: web::Path<(Uuid, Uuid)>,
) -> ApiResult {
    let (schedule_id, candidate_id) = path.into_inner();
    data.services
        .candidates
        .remove_candidate(&me, schedule_id, candidate_id)
        .await?;
    Ok(success())
}

pub async fn vote_book(
    data: web::Data<AppState>,
    Caller(me): Caller,
    path: web::Path<(Uuid, Uuid)>,
) -> ApiResult {
    let (schedule_id, book_id) = path.into_inner();
    let created = data.services.candidates.vote(&me, schedule_id, book_id).await?;
    Ok(ok(json!({ "success": true, "created": created })))
}

pub async fn unvote_book(
    data: web::Data<AppState>,
    Caller(me): Caller,
    path: web::Path<(Uuid, Uuid)>,
) -> ApiResult {
    let (schedule_id, book_id) = path.into_inner();
    data.services.candidates.unvote(&me, schedule_id, book_id).await?;
    Ok(success())
}

pub async fn select_book(
    data: web::Data<AppState>,
    Caller(me): Caller,
    path: web::Path<Uuid>,
    body: web::Json<BookChoice>,
) -> ApiResult {
    let schedule = data
        .services
        .candidates
        .select_final_book(&me, path.into_inner(), body.book_id)
        .await?;
    Ok(ok(schedule))
}

pub async fn list_attendance(
    data: web::Data<AppState>,
    Caller(me): Caller,
    path: web::Path<Uuid>,
) -> ApiResult {
    Ok(ok(data.services.attendance.list_attendance(&me, path.into_inner()).await?))
}

pub async fn set_attendance(
    data: web::Data<AppState>,
    Caller(me): Caller,
    path: web::Path<Uuid>,
    body: web::Json<AttendanceRequest>,
) -> ApiResult {
    let list = data
        .services
        .attendance
        .set_status(&me, path.into_inner(), body.status)
        .await?;
    Ok(ok(list))
}
