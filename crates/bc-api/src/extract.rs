//! Extractors for the caller resolved by [`crate::middleware::resolve_session`].

use std::future::{ready, Ready};

use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpMessage, HttpRequest};
use bc_core::policy::Session;

use crate::error::ApiError;

/// A signed-in caller; 401 otherwise.
#[derive(Debug, Clone)]
pub struct Caller(pub Session);

impl FromRequest for Caller {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let session = req.extensions().get::<Session>().cloned();
        ready(session.map(Caller).ok_or_else(ApiError::unauthorized))
    }
}

/// The caller if there is one.
#[derive(Debug, Clone)]
pub struct MaybeCaller(pub Option<Session>);

impl FromRequest for MaybeCaller {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(Ok(MaybeCaller(req.extensions().get::<Session>().cloned())))
    }
}
