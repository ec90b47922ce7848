use axum::{body::Body, response::Response};
use scraper::Html;

/// Collect the whole response body as text.
pub(crate) async fn response_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Could not read the response body");

    String::from_utf8(bytes.to_vec()).expect("Response body was not valid UTF-8")
}

/// Parse a full page, e.g. the dashboard or the log-in page.
pub(crate) async fn parse_html_document(response: Response<Body>) -> Html {
    Html::parse_document(&response_text(response).await)
}

/// Parse an HTMX partial, e.g. a re-rendered form.
pub(crate) async fn parse_html_fragment(response: Response<Body>) -> Html {
    Html::parse_fragment(&response_text(response).await)
}

#[track_caller]
pub(crate) fn assert_valid_html(html: &Html) {
    let errors = html.errors.join("; ");

    assert!(errors.is_empty(), "HTML did not parse cleanly: {errors}");
}
