//! # bc-api
//!
//! The JSON HTTP layer of the book club.

pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;

use actix_web::{middleware::from_fn, web};

use crate::error::ApiError;
use crate::handlers::{accounts, catalog, community, meetings, schedules, uploads};

pub use handlers::AppState;

/// Configures every route under `/api`.
///
/// Sessions are resolved inside the scope, so the binary only needs to
/// register [`AppState`] and any outer middleware.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _| ApiError::invalid(err.to_string()).into()))
        .app_data(web::PathConfig::default().error_handler(|err, _| ApiError::invalid(err.to_string()).into()))
        .app_data(web::QueryConfig::default().error_handler(|err, _| ApiError::invalid(err.to_string()).into()));

    cfg.service(
        web::scope("/api")
            .wrap(from_fn(middleware::resolve_session))
            .route("/health", web::get().to(accounts::health))
            // Accounts
            .route("/auth/signup", web::post().to(accounts::sign_up))
            .route("/auth/signin", web::post().to(accounts::sign_in))
            .route("/auth/signout", web::post().to(accounts::sign_out))
            .route("/profile", web::get().to(accounts::profile))
            .route("/profile", web::patch().to(accounts::update_profile))
            .route("/admin", web::get().to(accounts::admin_overview))
            .route("/admin/members/{id}", web::patch().to(accounts::set_role))
            .route("/admin/members/{id}", web::delete().to(accounts::reject))
            // Catalog
            .route("/books", web::get().to(catalog::list_books))
            .route("/books", web::post().to(catalog::create_book))
            .route("/books/{id}", web::get().to(catalog::book_detail))
            // Date votes and schedules
            .route("/schedule", web::get().to(schedules::month_overview))
            .route("/schedule/votes", web::post().to(schedules::cast_date_vote))
            .route("/schedule/votes/{date}", web::delete().to(schedules::retract_date_vote))
            .route("/schedules", web::post().to(schedules::confirm))
            .route("/schedules/{id}", web::patch().to(schedules::update_details))
            .route("/schedules/{id}", web::delete().to(schedules::cancel))
            .route("/schedules/{id}/candidates", web::get().to(schedules::tally))
            .route("/schedules/{id}/candidates", web::post().to(schedules::add_candidate))
            .route(
                "/schedules/{id}/candidates/{candidate_id}",
                web::delete().to(schedules::remove_candidate),
            )
            .route("/schedules/{id}/books/{book_id}/vote", web::post().to(schedules::vote_book))
            .route("/schedules/{id}/books/{book_id}/vote", web::delete().to(schedules::unvote_book))
            .route("/schedules/{id}/selection", web::post().to(schedules::select_book))
            .route("/schedules/{id}/attendance", web::get().to(schedules::list_attendance))
            .route("/schedules/{id}/attendance", web::put().to(schedules::set_attendance))
            // Meetings
            .route("/meetings", web::get().to(meetings::list_meetings))
            .route("/meetings/{id}", web::get().to(meetings::meeting_detail))
            .route("/meetings/{id}/reveal", web::post().to(meetings::reveal))
            .route("/meetings/{id}/submission", web::put().to(meetings::upsert_submission))
            .route("/meetings/{id}/submission/stars", web::post().to(meetings::click_star))
            .route("/meetings/{id}/comments", web::get().to(meetings::list_meeting_comments))
            .route("/meetings/{id}/comments", web::post().to(meetings::add_meeting_comment))
            .route("/submissions/{id}/comments", web::post().to(meetings::add_submission_comment))
            // Community
            .route("/board", web::get().to(community::list_board))
            .route("/board", web::post().to(community::create_board_post))
            .route("/board/{id}", web::get().to(community::board_post))
            .route("/board/{id}", web::delete().to(community::delete_board_post))
            .route("/board/{id}/comments", web::post().to(community::add_board_comment))
            .route("/discussions", web::get().to(community::list_discussions))
            .route("/discussions", web::post().to(community::create_discussion))
            .route("/discussions/{id}", web::get().to(community::discussion))
            .route("/discussions/{id}", web::delete().to(community::delete_discussion))
            .route("/reviews", web::get().to(community::list_reviews))
            .route("/reviews", web::post().to(community::create_review))
            .route("/reviews/{id}", web::get().to(community::review))
            .route("/reviews/{id}", web::delete().to(community::delete_review))
            .route("/recaps", web::get().to(community::list_recaps))
            .route("/recaps", web::post().to(community::create_recap))
            .route("/recaps/{id}", web::get().to(community::recap))
            .route("/recaps/{id}", web::delete().to(community::delete_recap))
            .route("/gallery", web::get().to(community::gallery))
            .route("/comments", web::get().to(community::list_comments))
            .route("/comments", web::post().to(community::add_comment))
            .route("/comments/{id}", web::delete().to(community::delete_comment))
            // Uploads
            .route("/upload", web::post().to(uploads::upload)),
    );
}
