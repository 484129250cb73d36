//! The whole meeting lifecycle over HTTP: date votes, confirmation,
//! candidates, book votes, selection, private submissions and reveal.

use actix_web::http::StatusCode;
use actix_web::{test, App};
use bc_core::models::Role;
use bc_services::ServiceLimits;
use chrono::NaiveDate;
use integration_tests::{club, club_with};
use serde_json::{json, Value};

#[actix_web::test]
async fn test_meeting_lifecycle() {
    let club = club().await;
    let admin = club.account("Ada", Role::Admin).await;
    let presenter = club.account("Pia", Role::Member).await;
    let m1 = club.account("Max", Role::Member).await;
    let m2 = club.account("Mia", Role::Member).await;
    let app = test::init_service(
        App::new()
            .app_data(club.state.clone())
            .configure(bc_api::configure_routes),
    )
    .await;

    // m1 is available on the 10th
    let req = test::TestRequest::post()
        .uri("/api/schedule/votes")
        .insert_header(m1.bearer())
        .set_json(json!({ "date": "2025-03-10" }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["created"], true);

    let req = test::TestRequest::get()
        .uri("/api/schedule?date=2025-03-01")
        .insert_header(m2.bearer())
        .to_request();
    let month: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(month["tallies"][0]["count"], 1);
    assert_eq!(month["tallies"][0]["voters"], json!(["Max"]));

    // A member cannot confirm; the admin can
    let confirm = json!({ "date": "2025-03-10", "presenter_id": presenter.id });
    let req = test::TestRequest::post()
        .uri("/api/schedules")
        .insert_header(m1.bearer())
        .set_json(&confirm)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::post()
        .uri("/api/schedules")
        .insert_header(admin.bearer())
        .set_json(&confirm)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let schedule: Value = test::read_body_json(resp).await;
    let schedule_id = schedule["id"].as_str().unwrap().to_string();
    assert_eq!(schedule["title"], "March 10 meeting");
    assert_eq!(schedule["is_revealed"], false);

    let req = test::TestRequest::get()
        .uri("/api/schedule?date=2025-03-10")
        .insert_header(m2.bearer())
        .to_request();
    let month: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(month["tallies"], json!([]));
    assert_eq!(month["schedules"][0]["presenter_name"], "Pia");

    // Second confirmation of the same date conflicts
    let req = test::TestRequest::post()
        .uri("/api/schedules")
        .insert_header(admin.bearer())
        .set_json(&confirm)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    // Presenter registers two books and nominates both
    let mut book_ids = Vec::new();
    for title in ["Book A", "Book B"] {
        let req = test::TestRequest::post()
            .uri("/api/books")
            .insert_header(presenter.bearer())
            .set_json(json!({ "title": title, "author": "Someone" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let book: Value = test::read_body_json(resp).await;
        let book_id = book["id"].as_str().unwrap().to_string();

        let req = test::TestRequest::post()
            .uri(&format!("/api/schedules/{schedule_id}/candidates"))
            .insert_header(presenter.bearer())
            .set_json(json!({ "book_id": book_id }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        book_ids.push(book_id);
    }
    let book_a = &book_ids[0];

    for voter in [&m1, &m2] {
        let req = test::TestRequest::post()
            .uri(&format!("/api/schedules/{schedule_id}/books/{book_a}/vote"))
            .insert_header(voter.bearer())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let req = test::TestRequest::get()
        .uri(&format!("/api/schedules/{schedule_id}/candidates"))
        .insert_header(m1.bearer())
        .to_request();
    let tally: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(tally.as_array().unwrap().len(), 2);
    assert_eq!(tally[0]["book"]["id"], book_a.as_str());
    assert_eq!(tally[0]["votes"], 2);
    assert_eq!(tally[0]["has_my_vote"], true);

    let req = test::TestRequest::post()
        .uri(&format!("/api/schedules/{schedule_id}/selection"))
        .insert_header(presenter.bearer())
        .set_json(json!({ "book_id": book_a }))
        .to_request();
    let schedule: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(schedule["selected_book_id"], book_a.as_str());

    // Private submission
    let req = test::TestRequest::put()
        .uri(&format!("/api/meetings/{schedule_id}/submission"))
        .insert_header(m1.bearer())
        .set_json(json!({ "discussion": ["topic1", "  "], "rating": 4.0 }))
        .to_request();
    let submission: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(submission["discussion"], json!(["topic1"]));
    assert_eq!(submission["rating"], 4.0);

    let req = test::TestRequest::get()
        .uri(&format!("/api/meetings/{schedule_id}"))
        .insert_header(m2.bearer())
        .to_request();
    let detail: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(detail["submissions"], json!([]));
    let max_row = detail["roster"]
        .as_array()
        .unwrap()
        .iter()
        .find(|row| row["name"] == "Max")
        .unwrap();
    assert_eq!(max_row["submitted"], true);
    assert_eq!(max_row["char_count"], 6);
    assert!(max_row.get("discussion").is_none());

    // Only the presenter or an admin may reveal
    let req = test::TestRequest::post()
        .uri(&format!("/api/meetings/{schedule_id}/reveal"))
        .insert_header(m2.bearer())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::post()
        .uri(&format!("/api/meetings/{schedule_id}/reveal"))
        .insert_header(presenter.bearer())
        .to_request();
    let revealed: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(revealed["is_revealed"], true);

    let req = test::TestRequest::get()
        .uri(&format!("/api/meetings/{schedule_id}"))
        .insert_header(m2.bearer())
        .to_request();
    let detail: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(detail["phase"], "revealed");
    assert_eq!(detail["submissions"][0]["discussion"], json!(["topic1"]));
    assert_eq!(detail["submissions"][0]["member_name"], "Max");

    let req = test::TestRequest::get()
        .uri(&format!("/api/books/{book_a}"))
        .insert_header(m2.bearer())
        .to_request();
    let book: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(book["status"], "completed");

    // Locked after reveal
    let req = test::TestRequest::put()
        .uri(&format!("/api/meetings/{schedule_id}/submission"))
        .insert_header(m2.bearer())
        .set_json(json!({ "discussion": ["late"] }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // Meeting chat opens
    let req = test::TestRequest::post()
        .uri(&format!("/api/meetings/{schedule_id}/comments"))
        .insert_header(m2.bearer())
        .set_json(json!({ "content": "great meeting" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let req = test::TestRequest::get()
        .uri(&format!("/api/meetings/{schedule_id}/comments"))
        .insert_header(m1.bearer())
        .to_request();
    let comments: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(comments[0]["member_name"], "Mia");
}

#[actix_web::test]
async fn test_reveal_before_meeting_date_is_rejected() {
    let club = club_with(NaiveDate::from_ymd_opt(2025, 3, 9).unwrap(), ServiceLimits::default()).await;
    let admin = club.account("Ada", Role::Admin).await;
    let app = test::init_service(
        App::new()
            .app_data(club.state.clone())
            .configure(bc_api::configure_routes),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/schedules")
        .insert_header(admin.bearer())
        .set_json(json!({ "date": "2025-03-10", "presenter_id": admin.id, "title": "Spring" }))
        .to_request();
    let schedule: Value = test::call_and_read_body_json(&app, req).await;
    let schedule_id = schedule["id"].as_str().unwrap().to_string();

    let req = test::TestRequest::post()
        .uri(&format!("/api/meetings/{schedule_id}/reveal"))
        .insert_header(admin.bearer())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::get()
        .uri("/api/meetings")
        .insert_header(admin.bearer())
        .to_request();
    let meetings: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(meetings["upcoming"][0]["title"], "Spring");
    assert_eq!(meetings["upcoming"][0]["is_revealed"], false);
}

#[actix_web::test]
async fn test_star_clicks_and_attendance() {
    let club = club().await;
    let admin = club.account("Ada", Role::Admin).await;
    let app = test::init_service(
        App::new()
            .app_data(club.state.clone())
            .configure(bc_api::configure_routes),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/schedules")
        .insert_header(admin.bearer())
        .set_json(json!({ "date": "2025-03-10", "presenter_id": admin.id }))
        .to_request();
    let schedule: Value = test::call_and_read_body_json(&app, req).await;
    let schedule_id = schedule["id"].as_str().unwrap().to_string();

    let mut ratings = Vec::new();
    for _ in 0..2 {
        let req = test::TestRequest::post()
            .uri(&format!("/api/meetings/{schedule_id}/submission/stars"))
            .insert_header(admin.bearer())
            .set_json(json!({ "star": 4 }))
            .to_request();
        let submission: Value = test::call_and_read_body_json(&app, req).await;
        ratings.push(submission["rating"].as_f64().unwrap());
    }
    assert_eq!(ratings, vec![4.0, 3.5]);

    let req = test::TestRequest::put()
        .uri(&format!("/api/schedules/{schedule_id}/attendance"))
        .insert_header(admin.bearer())
        .set_json(json!({ "status": "not_attending" }))
        .to_request();
    let list: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(list[0]["status"], "not_attending");
    assert_eq!(list[0]["member_name"], "Ada");

    let req = test::TestRequest::delete()
        .uri(&format!("/api/schedules/{schedule_id}"))
        .insert_header(admin.bearer())
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body, json!({ "success": true }));

    let req = test::TestRequest::get()
        .uri(&format!("/api/meetings/{schedule_id}"))
        .insert_header(admin.bearer())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
