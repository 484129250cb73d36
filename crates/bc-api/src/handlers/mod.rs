//! # bc-api Handlers
//!
//! Thin adapters between HTTP requests and the services: extract, call,
//! serialize. All rules live in `bc-services`.

pub mod accounts;
pub mod catalog;
pub mod community;
pub mod meetings;
pub mod schedules;
pub mod uploads;

use actix_web::HttpResponse;
use bc_services::AppServices;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// State shared across all Actix-web workers.
pub struct AppState {
    pub services: AppServices,
}

impl AppState {
    pub fn new(services: AppServices) -> Self {
        Self { services }
    }
}

/// Body of every comment-creating request.
#[derive(Debug, Deserialize)]
pub struct CommentBody {
    pub content: String,
}

pub(crate) fn ok<T: Serialize>(body: T) -> HttpResponse {
    HttpResponse::Ok().json(body)
}

pub(crate) fn created<T: Serialize>(body: T) -> HttpResponse {
    HttpResponse::Created().json(body)
}

pub(crate) fn success() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "success": true }))
}
