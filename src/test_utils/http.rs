use axum::{body::Body, response::Response};

use super::html::response_text;

#[track_caller]
pub(crate) fn assert_hx_redirect(response: &Response<Body>, endpoint: &str) {
    let location = response
        .headers()
        .get("hx-redirect")
        .unwrap_or_else(|| panic!("want an hx-redirect header to {endpoint}"))
        .to_str()
        .expect("hx-redirect header was not valid text");

    assert_eq!(location, endpoint);
}

pub(crate) async fn parse_json(response: Response<Body>) -> serde_json::Value {
    let text = response_text(response).await;

    serde_json::from_str(&text).unwrap_or_else(|error| panic!("Invalid JSON {text:?}: {error}"))
}
