use actix_web::http::StatusCode;
use actix_web::{test, App};
use bc_core::models::Role;
use integration_tests::club;
use serde_json::{json, Value};

#[actix_web::test]
async fn test_board_and_comment_ownership() {
    let club = club().await;
    let ann = club.account("Ann", Role::Member).await;
    let bob = club.account("Bob", Role::Member).await;
    let vic = club.account("Vic", Role::Visitor).await;
    let app = test::init_service(
        App::new()
            .app_data(club.state.clone())
            .configure(bc_api::configure_routes),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/board")
        .insert_header(vic.bearer())
        .set_json(json!({ "title": "Hi", "content": "Hello" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::post()
        .uri("/api/board")
        .insert_header(ann.bearer())
        .set_json(json!({ "title": "Snacks", "content": "Who brings snacks?" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let post: Value = test::read_body_json(resp).await;
    let post_id = post["id"].as_str().unwrap().to_string();
    assert_eq!(post["author_name"], "Ann");

    let req = test::TestRequest::post()
        .uri(&format!("/api/board/{post_id}/comments"))
        .insert_header(bob.bearer())
        .set_json(json!({ "content": "me!" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let req = test::TestRequest::get()
        .uri(&format!("/api/board/{post_id}"))
        .insert_header(vic.bearer())
        .to_request();
    let detail: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(detail["comments"][0]["author_name"], "Bob");

    let req = test::TestRequest::delete()
        .uri(&format!("/api/board/{post_id}"))
        .insert_header(bob.bearer())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/board/{post_id}"))
        .insert_header(ann.bearer())
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body, json!({ "success": true }));

    let req = test::TestRequest::get()
        .uri(&format!("/api/board/{post_id}"))
        .insert_header(ann.bearer())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_reviews_and_generic_comments() {
    let club = club().await;
    let ann = club.account("Ann", Role::Member).await;
    let ada = club.account("Ada", Role::Admin).await;
    let app = test::init_service(
        App::new()
            .app_data(club.state.clone())
            .configure(bc_api::configure_routes),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/books")
        .insert_header(ann.bearer())
        .set_json(json!({ "title": "Dune", "author": "Frank Herbert" }))
        .to_request();
    let book: Value = test::call_and_read_body_json(&app, req).await;
    let book_id = book["id"].as_str().unwrap().to_string();

    let req = test::TestRequest::post()
        .uri("/api/reviews")
        .insert_header(ann.bearer())
        .set_json(json!({ "book_id": book_id, "title": "Spice", "content": "Must read", "rating": 9 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::post()
        .uri("/api/reviews")
        .insert_header(ann.bearer())
        .set_json(json!({ "book_id": book_id, "title": "Spice", "content": "Must read", "rating": 5 }))
        .to_request();
    let review: Value = test::call_and_read_body_json(&app, req).await;
    let review_id = review["id"].as_str().unwrap().to_string();
    assert_eq!(review["book_title"], "Dune");

    let req = test::TestRequest::post()
        .uri("/api/comments")
        .insert_header(ada.bearer())
        .set_json(json!({ "commentable_type": "review", "commentable_id": review_id, "content": "Agreed" }))
        .to_request();
    let comment: Value = test::call_and_read_body_json(&app, req).await;
    let comment_id = comment["id"].as_str().unwrap().to_string();

    let req = test::TestRequest::get()
        .uri(&format!("/api/comments?type=review&id={review_id}"))
        .insert_header(ann.bearer())
        .to_request();
    let comments: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(comments[0]["author_name"], "Ada");

    let req = test::TestRequest::delete()
        .uri(&format!("/api/comments/{comment_id}"))
        .insert_header(ann.bearer())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::get()
        .uri(&format!("/api/books/{book_id}"))
        .insert_header(ann.bearer())
        .to_request();
    let detail: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(detail["reviews"][0]["rating"], 5);

    // The admin removes the review along with its thread
    let req = test::TestRequest::delete()
        .uri(&format!("/api/reviews/{review_id}"))
        .insert_header(ada.bearer())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri(&format!("/api/comments?type=review&id={review_id}"))
        .insert_header(ann.bearer())
        .to_request();
    let comments: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(comments, json!([]));
}

#[actix_web::test]
async fn test_recaps_feed_the_gallery() {
    let club = club().await;
    let ann = club.account("Ann", Role::Member).await;
    let app = test::init_service(
        App::new()
            .app_data(club.state.clone())
            .configure(bc_api::configure_routes),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/recaps")
        .insert_header(ann.bearer())
        .set_json(json!({ "title": "No photos", "photos": [] }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::post()
        .uri("/api/recaps")
        .insert_header(ann.bearer())
        .set_json(json!({
            "title": "Spring meetup",
            "content": "Lovely evening",
            "photos": ["/static/uploads/a.png", "/static/uploads/b.png"]
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let req = test::TestRequest::get()
        .uri("/api/gallery")
        .insert_header(ann.bearer())
        .to_request();
    let gallery: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(gallery.as_array().unwrap().len(), 2);
    assert_eq!(gallery[0]["title"], "Spring meetup");
    assert_eq!(gallery[0]["author"], "Ann");
}
