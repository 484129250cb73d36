use actix_web::web;
use bc_core::models::NewBook;
use uuid::Uuid;

use super::{created, ok, AppState};
use crate::error::ApiResult;
use crate::extract::Caller;

pub async fn list_books(data: web::Data<AppState>, Caller(me): Caller) -> ApiResult {
    Ok(ok(data.services.catalog.list_books(&me).await?))
}

pub async fn create_book(
    data: web::Data<AppState>,
    Caller(me): Caller,
    body: web::Json<NewBook>,
) -> ApiResult {
    Ok(created(data.services.catalog.create_book(&me, body.into_inner()).await?))
}

pub async fn book_detail(data: web::Data<AppState>, Caller(me): Caller, path: web::Path<Uuid>) -> ApiResult {
    Ok(ok(data.services.catalog.book_detail(&me, path.into_inner()).await?))
}
