use axum::http::{Method, StatusCode};
use serde_json::json;
use storefront_contracts::{app, call};

#[tokio::test]
async fn health_reports_collection_counts() {
    let (app, _state, _kv) = app().await;
    call(&app, Method::POST, "/cart", Some(json!({ "id": 1, "name": "Kayak", "price": 1000 }))).await;

    let (status, body) = call(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["build_id"], "ephemeral");
    assert_eq!(body["storage"], "memory");
    assert_eq!(body["encrypted"], false);
    assert_eq!(body["collections"]["cart"], 1);
    assert_eq!(body["collections"]["likes"], 0);
}

#[tokio::test]
async fn likes_toggle_round_trip() {
    let (app, _state, _kv) = app().await;

    let (_, body) = call(&app, Method::POST, "/likes/5/toggle", None).await;
    assert_eq!(body, json!({ "product_id": 5, "liked": true }));
    let (_, body) = call(&app, Method::GET, "/likes", None).await;
    assert_eq!(body["ids"], json!([5]));

    let (_, body) = call(&app, Method::POST, "/likes/5/toggle", None).await;
    assert_eq!(body["liked"], false);
    let (_, body) = call(&app, Method::GET, "/likes", None).await;
    assert_eq!(body["ids"], json!([]));
}

#[tokio::test]
async fn chat_threads_and_validation() {
    let (app, _state, _kv) = app().await;

    let (status, sent) = call(&app, Method::POST, "/chat/7", Some(json!({ "text": "Is it available?" }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(sent["sender"], "me");

    let (status, _) = call(
        &app,
        Method::POST,
        "/chat/7",
        Some(json!({ "text": "Yes", "from_counterparty": true })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = call(&app, Method::POST, "/chat/7", Some(json!({ "text": "   " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (_, thread) = call(&app, Method::GET, "/chat/7", None).await;
    assert_eq!(thread.as_array().map(Vec::len), Some(2));
    let (_, conversations) = call(&app, Method::GET, "/chat", None).await;
    assert_eq!(conversations[0]["message_count"], 2);

    let uri = format!("/chat/messages/{}", sent["id"]);
    let (status, _) = call(&app, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = call(&app, Method::DELETE, "/chat/7", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = call(&app, Method::DELETE, "/chat/7", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn reviews_for_product_include_average() {
    let (app, _state, _kv) = app().await;

    let (status, first) = call(
        &app,
        Method::POST,
        "/reviews/product/3",
        Some(json!({ "author": "ana", "rating": 4, "comment": "solid" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(first["id"], 1);

    let (_, second) = call(
        &app,
        Method::POST,
        "/reviews/product/3",
        Some(json!({ "author": "bo", "rating": 9 })),
    )
    .await;
    assert_eq!(second["id"], 2);
    assert_eq!(second["rating"], 5);

    let (_, body) = call(&app, Method::GET, "/reviews/product/3", None).await;
    assert_eq!(body["reviews"].as_array().map(Vec::len), Some(2));
    assert_eq!(body["average_rating"], 4.5);

    let (status, _) = call(&app, Method::DELETE, "/reviews/1", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = call(&app, Method::DELETE, "/reviews/1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, all) = call(&app, Method::GET, "/reviews", None).await;
    assert_eq!(all.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn blank_review_author_is_rejected() {
    let (app, _state, _kv) = app().await;
    let (status, _) = call(
        &app,
        Method::POST,
        "/reviews/product/3",
        Some(json!({ "author": " ", "rating": 3 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn search_history_keeps_most_recent_first() {
    let (app, _state, _kv) = app().await;
    for query in ["kayak", "tent", "kayak"] {
        call(&app, Method::POST, "/search-history", Some(json!({ "query": query }))).await;
    }

    let (_, body) = call(&app, Method::GET, "/search-history", None).await;
    assert_eq!(body["queries"], json!(["kayak", "tent"]));

    let (status, _) = call(&app, Method::DELETE, "/search-history?query=tent", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, body) = call(&app, Method::GET, "/search-history", None).await;
    assert_eq!(body["queries"], json!(["kayak"]));

    call(&app, Method::DELETE, "/search-history", None).await;
    let (_, body) = call(&app, Method::GET, "/search-history", None).await;
    assert_eq!(body["queries"], json!([]));
}

#[tokio::test]
async fn logout_clears_everything() {
    let (app, _state, kv) = app().await;
    call(&app, Method::POST, "/cart", Some(json!({ "id": 1, "name": "Kayak", "price": 1000 }))).await;
    call(&app, Method::POST, "/likes/1/toggle", None).await;
    call(&app, Method::POST, "/chat/2", Some(json!({ "text": "hi" }))).await;
    call(&app, Method::POST, "/search-history", Some(json!({ "query": "kayak" }))).await;

    let (status, _) = call(&app, Method::POST, "/session/logout", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    assert!(kv.is_empty().await);
    let (_, cart) = call(&app, Method::GET, "/cart", None).await;
    assert_eq!(cart["entries"], json!([]));
    let (_, chat) = call(&app, Method::GET, "/chat", None).await;
    assert_eq!(chat, json!([]));
}
