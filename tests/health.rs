mod common;

use axum::{extract::State, http::StatusCode};
use jewelry_store_api::routes::health::health_check;

#[tokio::test]
async fn health_check_reports_database_up() {
    let Some(state) = common::setup().await else {
        return;
    };

    let (code, response) = health_check(State(state)).await;
    assert_eq!(code, StatusCode::OK);
    assert_eq!(response.0.message, "Health check");
    assert!(response.0.data.is_some());
}
