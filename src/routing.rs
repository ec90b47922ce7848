//! Application router configuration with protected and unprotected route definitions.

use axum::{
    Router, middleware,
    response::Redirect,
    routing::{get, post},
};

use crate::{
    AppState,
    auth::{
        api_auth_guard, auth_guard, auth_guard_hx, get_log_in_page, get_log_out,
        get_register_page, post_log_in, post_log_in_api, post_register, post_register_api,
    },
    dashboard::get_dashboard_page,
    endpoints,
    internal_server_error::get_internal_server_error_page,
    not_found::get_404_not_found,
    transaction::{
        create_transaction_api, create_transaction_endpoint, get_report_api, get_summary_api,
        list_transactions_api,
    },
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let unprotected_routes = Router::new()
        .route(endpoints::ROOT, get(get_index_page))
        .route(endpoints::LOG_IN_VIEW, get(get_log_in_page))
        .route(endpoints::LOG_IN, post(post_log_in))
        .route(endpoints::LOG_OUT, get(get_log_out))
        .route(endpoints::REGISTER_VIEW, get(get_register_page))
        .route(endpoints::USERS, post(post_register))
        .route(endpoints::REGISTER_API, post(post_register_api))
        .route(endpoints::LOG_IN_API, post(post_log_in_api))
        .route(
            endpoints::INTERNAL_ERROR_VIEW,
            get(get_internal_server_error_page),
        );

    let protected_routes = Router::new()
        .route(endpoints::DASHBOARD_VIEW, get(get_dashboard_page))
        .layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    // Form submissions need to use the HX-REDIRECT header for auth redirects to work properly for HTMX requests.
    let protected_routes = protected_routes.merge(
        Router::new()
            .route(endpoints::TRANSACTIONS, post(create_transaction_endpoint))
            .layer(middleware::from_fn_with_state(state.clone(), auth_guard_hx)),
    );

    let api_routes = Router::new()
        .route(
            endpoints::TRANSACTIONS_API,
            post(create_transaction_api).get(list_transactions_api),
        )
        .route(endpoints::TRANSACTIONS_SUMMARY_API, get(get_summary_api))
        .route(endpoints::TRANSACTIONS_REPORT_API, get(get_report_api))
        .layer(middleware::from_fn_with_state(state.clone(), api_auth_guard));

    protected_routes
        .merge(api_routes)
        .merge(unprotected_routes)
        .fallback(get_404_not_found)
        .with_state(state)
}

/// The root path '/' redirects to the dashboard page.
async fn get_index_page() -> Redirect {
    Redirect::to(endpoints::DASHBOARD_VIEW)
}


#[cfg(test)]
mod router_tests {
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use serde_json::{Value, json};

    use crate::{
        auth::cookie::COOKIE_SESSION,
        endpoints,
        test_utils::{TEST_PASSWORD, get_test_app_state},
    };

    use super::build_router;

    fn get_test_server() -> TestServer {
        TestServer::new(build_router(get_test_app_state()))
    }

    fn form_body(fields: &[(&str, &str)]) -> String {
        serde_html_form::to_string(fields).expect("Could not encode form")
    }

    #[tokio::test]
    async fn dashboard_redirects_to_log_in_without_session() {
        let server = get_test_server();

        let response = server.get(endpoints::DASHBOARD_VIEW).await;

        response.assert_status_see_other();
        response.assert_header("location", "/login?redirect_url=%2Fdashboard");
    }

    #[tokio::test]
    async fn transaction_form_gets_hx_redirect_without_session() {
        let server = get_test_server();

        let response = server
            .post(endpoints::TRANSACTIONS)
            .add_header("HX-Request", "true")
            .add_header("HX-Current-URL", "http://localhost/dashboard")
            .text(form_body(&[("amount", "1"), ("type", "expense"), ("category", "Misc")]))
            .content_type("application/x-www-form-urlencoded")
            .await;

        response.assert_status_ok();
        response.assert_header("hx-redirect", "/login?redirect_url=%2Fdashboard");
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let server = get_test_server();

        server
            .get("/definitely/not/a/page")
            .await
            .assert_status_not_found();
    }

    #[tokio::test]
    async fn error_page_is_served() {
        let server = get_test_server();

        server
            .get(endpoints::INTERNAL_ERROR_VIEW)
            .await
            .assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn register_log_in_and_view_dashboard() {
        let server = get_test_server();

        server
            .post(endpoints::USERS)
            .text(form_body(&[
                ("username", "alice"),
                ("email", "alice@example.com"),
                ("password", TEST_PASSWORD),
                ("confirm_password", TEST_PASSWORD),
            ]))
            .content_type("application/x-www-form-urlencoded")
            .await
            .assert_status_see_other();

        let response = server
            .post(endpoints::LOG_IN)
            .text(form_body(&[("username", "alice"), ("password", TEST_PASSWORD)]))
            .content_type("application/x-www-form-urlencoded")
            .await;
        response.assert_status_see_other();
        response.assert_header("hx-redirect", endpoints::DASHBOARD_VIEW);
        let session_cookie = response.cookie(COOKIE_SESSION);

        let response = server
            .get(endpoints::DASHBOARD_VIEW)
            .add_cookie(session_cookie.clone())
            .await;
        response.assert_status_ok();
        assert!(response.text().contains("Nothing here yet..."));

        server
            .post(endpoints::TRANSACTIONS)
            .add_cookie(session_cookie.clone())
            .text(form_body(&[
                ("amount", "12.50"),
                ("type", "expense"),
                ("category", "Food"),
                ("description", ""),
                ("date", ""),
            ]))
            .content_type("application/x-www-form-urlencoded")
            .await
            .assert_status_see_other();

        let response = server
            .get(endpoints::TRANSACTIONS_SUMMARY_API)
            .add_cookie(session_cookie)
            .await;
        response.assert_status_ok();
        response.assert_json(&json!({
            "total_income": 0.0,
            "total_expense": 12.5,
            "balance": -12.5,
        }));
    }

    #[tokio::test]
    async fn api_register_log_in_and_create_transaction() {
        let server = get_test_server();

        server
            .post(endpoints::REGISTER_API)
            .json(&json!({
                "username": "bob",
                "email": "bob@example.com",
                "password": TEST_PASSWORD,
            }))
            .await
            .assert_status(StatusCode::CREATED);

        let body: Value = server
            .post(endpoints::LOG_IN_API)
            .json(&json!({ "username": "bob", "password": TEST_PASSWORD }))
            .await
            .json();
        let token = body["token"].as_str().unwrap().to_owned();

        server
            .post(endpoints::TRANSACTIONS_API)
            .add_header("Authorization", token.clone())
            .json(&json!({ "amount": 2500.0, "type": "income", "category": "Salary" }))
            .await
            .assert_status(StatusCode::CREATED);

        let transactions: Vec<Value> = server
            .get(endpoints::TRANSACTIONS_API)
            .authorization_bearer(&token)
            .await
            .json();
        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0]["category"], "Salary");
    }

    #[tokio::test]
    async fn api_rejects_invalid_token() {
        let server = get_test_server();

        let response = server
            .get(endpoints::TRANSACTIONS_REPORT_API)
            .authorization_bearer("not-a-token")
            .await;

        response.assert_status_unauthorized();
        response.assert_json(&json!({ "error": "Invalid token" }));
    }
}
