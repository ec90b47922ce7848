//! The dashboard's "Add transaction" form and the endpoint it posts to.
use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
// Must use axum_extra's Form since that parses an empty string as None instead
// of crashing like axum::Form.
use axum_extra::extract::Form;
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    AppState, Error,
    auth::Session,
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, ERROR_MESSAGE_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE,
        loading_spinner,
    },
    transaction::core::{
        MAX_CATEGORY_LENGTH, NewTransaction, TransactionInput, TransactionType, create_transaction,
    },
};

/// The state needed to create a transaction from the dashboard.
#[derive(Debug, Clone)]
pub struct CreateTransactionState {
    /// The database connection for managing transactions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CreateTransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The raw values of the "Add transaction" form.
///
/// Every field is kept as text so that the form can be shown again with
/// exactly what the user typed when validation fails.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionFormValues {
    /// The amount as typed by the user.
    pub amount: String,
    /// Either "income" or "expense".
    #[serde(rename = "type")]
    pub type_: String,
    /// The category label.
    pub category: String,
    /// Text detailing the transaction.
    #[serde(default)]
    pub description: Option<String>,
    /// The date of the transaction as "YYYY-MM-DD", today if omitted.
    #[serde(default)]
    pub date: Option<String>,
}

impl TransactionFormValues {
    fn parse(&self, now: OffsetDateTime) -> Result<NewTransaction, String> {
        let amount = self
            .amount
            .trim()
            .parse::<f64>()
            .map_err(|_| "Amount must be a number".to_owned())?;

        NewTransaction::parse(
            TransactionInput {
                amount,
                type_: self.type_.clone(),
                category: self.category.clone(),
                description: self.description.clone(),
                date: self.date.clone(),
            },
            now,
        )
        .map_err(|error| error.to_string())
    }
}

/// Render the "Add transaction" form with `values` and an optional error message.
pub fn transaction_form(values: &TransactionFormValues, error_message: Option<&str>) -> Markup {
    let type_options = [TransactionType::Expense, TransactionType::Income];
    let selected_type = if values.type_.is_empty() {
        TransactionType::Expense.as_str()
    } else {
        values.type_.as_str()
    };

    html! {
        form
            id="transaction-form"
            hx-post=(endpoints::TRANSACTIONS)
            hx-swap="outerHTML"
            hx-indicator="#transaction-indicator"
            hx-disabled-elt="#transaction-submit-button"
            class="grid grid-cols-1 md:grid-cols-2 gap-4"
        {
            div
            {
                label for="amount" class=(FORM_LABEL_STYLE) { "Amount" }
                input
                    type="number"
                    name="amount"
                    id="amount"
                    step="0.01"
                    min="0"
                    required
                    class=(FORM_TEXT_INPUT_STYLE)
                    value=(values.amount);
            }

            div
            {
                label for="type" class=(FORM_LABEL_STYLE) { "Type" }
                select name="type" id="type" class=(FORM_TEXT_INPUT_STYLE)
                {
                    @for type_ in type_options {
                        option value=(type_.as_str()) selected[type_.as_str() == selected_type]
                        {
                            (type_.as_str())
                        }
                    }
                }
            }

            div
            {
                label for="category" class=(FORM_LABEL_STYLE) { "Category" }
                input
                    type="text"
                    name="category"
                    id="category"
                    required
                    maxlength=(MAX_CATEGORY_LENGTH)
                    placeholder="e.g. Groceries"
                    class=(FORM_TEXT_INPUT_STYLE)
                    value=(values.category);
            }

            div
            {
                label for="date" class=(FORM_LABEL_STYLE) { "Date (optional)" }
                input
                    type="date"
                    name="date"
                    id="date"
                    class=(FORM_TEXT_INPUT_STYLE)
                    value=(values.date.as_deref().unwrap_or_default());
            }

            div class="md:col-span-2"
            {
                label for="description" class=(FORM_LABEL_STYLE) { "Description" }
                input
                    type="text"
                    name="description"
                    id="description"
                    class=(FORM_TEXT_INPUT_STYLE)
                    value=(values.description.as_deref().unwrap_or_default());
            }

            @if let Some(error_message) = error_message {
                p class=(ERROR_MESSAGE_STYLE) { (error_message) }
            }

            div class="md:col-span-2"
            {
                button
                    type="submit"
                    id="transaction-submit-button"
                    tabindex="0"
                    class=(BUTTON_PRIMARY_STYLE)
                {
                    span class="inline htmx-indicator" id="transaction-indicator"
                    {
                        (loading_spinner())
                    }
                    "Add transaction"
                }
            }
        }
    }
}

/// A route handler for creating a new transaction from the dashboard form.
///
/// Redirects to the dashboard on success. Invalid input returns the form with
/// an error message, and unexpected failures return an alert.
pub async fn create_transaction_endpoint(
    State(state): State<CreateTransactionState>,
    Extension(session): Extension<Session>,
    Form(form): Form<TransactionFormValues>,
) -> Response {
    let transaction = match form.parse(OffsetDateTime::now_utc()) {
        Ok(transaction) => transaction,
        Err(error_message) => {
            return transaction_form(&form, Some(&error_message)).into_response();
        }
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    if let Err(error) = create_transaction(session.user_id, transaction, &connection) {
        tracing::error!("could not create transaction: {error}");

        return error.into_alert_response();
    }

    (
        HxRedirect(endpoints::DASHBOARD_VIEW.to_owned()),
        StatusCode::SEE_OTHER,
    )
        .into_response()
}

#[cfg(test)]
mod transaction_form_tests {
    use axum::{
        Extension,
        extract::{FromRef, State},
        http::StatusCode,
    };
    use axum_extra::extract::Form;
    use time::{Duration, OffsetDateTime};

    use crate::{
        auth::Session,
        endpoints,
        test_utils::{
            assert_form_error_message, assert_form_input, assert_hx_endpoint, assert_hx_redirect,
            get_test_app_state, insert_test_user, must_get_form, parse_html_fragment,
        },
        transaction::{TransactionType, list_transactions},
    };

    use super::{
        CreateTransactionState, TransactionFormValues, create_transaction_endpoint,
        transaction_form,
    };

    fn form_values(amount: &str, type_: &str, category: &str) -> TransactionFormValues {
        TransactionFormValues {
            amount: amount.to_owned(),
            type_: type_.to_owned(),
            category: category.to_owned(),
            description: Some("Weekly shop".to_owned()),
            date: None,
        }
    }

    #[test]
    fn form_has_expected_inputs() {
        let html = transaction_form(&TransactionFormValues::default(), None).into_string();
        let fragment = scraper::Html::parse_fragment(&html);
        let form = must_get_form(&fragment);

        assert_hx_endpoint(&form, endpoints::TRANSACTIONS, "hx-post");
        assert_form_input(&form, "amount", "number");
        assert_form_input(&form, "category", "text");
        assert_form_input(&form, "description", "text");
        assert_form_input(&form, "date", "date");

        let select = scraper::Selector::parse("select[name=type] option").unwrap();
        let options = form
            .select(&select)
            .filter_map(|option| option.value().attr("value"))
            .collect::<Vec<_>>();
        assert_eq!(options, ["expense", "income"]);
    }

    #[tokio::test]
    async fn creates_transaction_and_redirects_to_dashboard() {
        let state = get_test_app_state();
        let user = insert_test_user(&state, "alice");
        let session = Session {
            user_id: user.id,
            username: user.username.clone(),
            expires_at: OffsetDateTime::now_utc() + Duration::minutes(5),
        };

        let response = create_transaction_endpoint(
            State(CreateTransactionState::from_ref(&state)),
            Extension(session),
            Form(form_values("12.30", "expense", "Groceries")),
        )
        .await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_hx_redirect(&response, endpoints::DASHBOARD_VIEW);

        let connection = state.db_connection.lock().unwrap();
        let transactions = list_transactions(user.id, &connection).unwrap();
        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0].amount, 12.3);
        assert_eq!(transactions[0].type_, TransactionType::Expense);
        assert_eq!(transactions[0].category, "Groceries");
        assert_eq!(transactions[0].description, "Weekly shop");
    }

    #[tokio::test]
    async fn invalid_amount_returns_form_with_error() {
        let state = get_test_app_state();
        let user = insert_test_user(&state, "alice");
        let session = Session {
            user_id: user.id,
            username: user.username,
            expires_at: OffsetDateTime::now_utc() + Duration::minutes(5),
        };

        let response = create_transaction_endpoint(
            State(CreateTransactionState::from_ref(&state)),
            Extension(session),
            Form(form_values("twelve", "expense", "Groceries")),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let fragment = parse_html_fragment(response).await;
        let form = must_get_form(&fragment);
        assert_form_error_message(&form, "Amount must be a number");

        let category = scraper::Selector::parse("input[name=category]").unwrap();
        assert_eq!(
            form.select(&category).next().unwrap().value().attr("value"),
            Some("Groceries"),
            "want the submitted values to be kept"
        );
    }

    #[tokio::test]
    async fn blank_category_returns_form_with_error() {
        let state = get_test_app_state();
        let user = insert_test_user(&state, "alice");
        let session = Session {
            user_id: user.id,
            username: user.username,
            expires_at: OffsetDateTime::now_utc() + Duration::minutes(5),
        };

        let response = create_transaction_endpoint(
            State(CreateTransactionState::from_ref(&state)),
            Extension(session),
            Form(form_values("5", "income", "   ")),
        )
        .await;

        let fragment = parse_html_fragment(response).await;
        assert_form_error_message(&must_get_form(&fragment), "Category cannot be empty");
    }
}
