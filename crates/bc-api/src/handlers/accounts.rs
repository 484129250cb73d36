use actix_web::cookie::{Cookie, SameSite};
use actix_web::{web, HttpRequest};
use bc_core::models::Role;
use bc_services::accounts::{Credentials, ProfileUpdate, SignUp};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use super::{created, ok, success, AppState};
use crate::error::{ApiError, ApiResult};
use crate::extract::{Caller, MaybeCaller};
use crate::middleware::{session_token, SESSION_COOKIE};

#[derive(Debug, Deserialize)]
pub struct RoleChange {
    pub role: Role,
}

fn session_cookie(value: String) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, value)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .finish()
}

pub async fn sign_up(data: web::Data<AppState>, body: web::Json<SignUp>) -> ApiResult {
    let member = data.services.accounts.sign_up(body.into_inner()).await?;
    Ok(created(member))
}

/// Answers `{token, member}` and also sets the session cookie.
pub async fn sign_in(data: web::Data<AppState>, body: web::Json<Credentials>) -> ApiResult {
    let signed_in = data.services.accounts.sign_in(body.into_inner()).await?;
    let mut response = ok(&signed_in);
    response
        .add_cookie(&session_cookie(signed_in.token.clone()))
        .map_err(|e| ApiError::internal(e.to_string()))?;
    Ok(response)
}

pub async fn sign_out(data: web::Data<AppState>, caller: MaybeCaller, req: HttpRequest) -> ApiResult {
    if let Some(token) = session_token(&req) {
        data.services.accounts.sign_out(&token).await?;
    }
    if let MaybeCaller(Some(session)) = caller {
        info!(member_id = %session.member_id, "signed out");
    }

    let mut response = success();
    response
        .add_removal_cookie(&session_cookie(String::new()))
        .map_err(|e| ApiError::internal(e.to_string()))?;
    Ok(response)
}

pub async fn profile(data: web::Data<AppState>, Caller(me): Caller) -> ApiResult {
    Ok(ok(data.services.accounts.profile(&me).await?))
}

pub async fn update_profile(
    data: web::Data<AppState>,
    Caller(me): Caller,
    body: web::Json<ProfileUpdate>,
) -> ApiResult {
    Ok(ok(data.services.accounts.update_profile(&me, body.into_inner()).await?))
}

pub async fn admin_overview(data: web::Data<AppState>, Caller(me): Caller) -> ApiResult {
    Ok(ok(data.services.accounts.admin_overview(&me).await?))
}

pub async fn set_role(
    data: web::Data<AppState>,
    Caller(me): Caller,
    path: web::Path<Uuid>,
    body: web::Json<RoleChange>,
) -> ApiResult {
    let member = data
        .services
        .accounts
        .set_role(&me, path.into_inner(), body.role)
        .await?;
    Ok(ok(member))
}

pub async fn reject(data: web::Data<AppState>, Caller(me): Caller, path: web::Path<Uuid>) -> ApiResult {
    data.services.accounts.reject(&me, path.into_inner()).await?;
    Ok(success())
}

pub async fn health(data: web::Data<AppState>) -> ApiResult {
    Ok(ok(data.services.accounts.health().await?))
}
