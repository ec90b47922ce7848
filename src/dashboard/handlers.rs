//! Dashboard HTTP handler and view rendering.
//!
//! This module contains:
//! - The route handler for displaying the dashboard
//! - HTML view functions for rendering the dashboard UI

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    aggregation::Report,
    auth::Session,
    dashboard::{
        cards::summary_cards_view,
        charts::{DashboardChart, category_chart, charts_script, charts_view, monthly_chart},
        tables::recent_transactions_table,
    },
    endpoints,
    html::{ECHARTS_SCRIPT_URL, HeadElement, PAGE_CONTAINER_STYLE, base},
    navigation::NavBar,
    timezone::get_local_offset_or_error,
    transaction::{
        Summary, Transaction, TransactionFormValues, get_summary, list_transaction_records,
        list_transactions, transaction_form,
    },
};

/// The state needed for displaying the dashboard page.
#[derive(Debug, Clone)]
pub struct DashboardState {
    /// The database connection for reading transactions.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for DashboardState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// Holds all the data needed to render the dashboard.
struct DashboardData {
    summary: Summary,
    transactions: Vec<Transaction>,
    report: Report,
}

/// Display a page with an overview of the user's transactions.
pub async fn get_dashboard_page(
    State(state): State<DashboardState>,
    Extension(session): Extension<Session>,
) -> Result<Response, Error> {
    let local_offset = get_local_offset_or_error(&state.local_timezone)?;

    let data = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        load_dashboard_data(&session, &connection)?
    };

    let nav_bar = NavBar::new(endpoints::DASHBOARD_VIEW, &session.username);

    if data.transactions.is_empty() {
        return Ok(dashboard_no_data_view(nav_bar).into_response());
    }

    let charts = [
        DashboardChart {
            id: "monthly-chart",
            options: monthly_chart(&data.report.monthly).to_string(),
        },
        DashboardChart {
            id: "category-chart",
            options: category_chart(&data.report.categories).to_string(),
        },
    ];

    let content = html! {
        (summary_cards_view(&data.summary))
        (charts_view(&charts))
        (recent_transactions_table(&data.transactions, local_offset))
        (add_transaction_section())
    };

    let scripts = [
        HeadElement::ScriptLink(ECHARTS_SCRIPT_URL.to_owned()),
        charts_script(&charts),
    ];

    Ok(dashboard_view(nav_bar, &scripts, &content).into_response())
}

fn load_dashboard_data(session: &Session, connection: &Connection) -> Result<DashboardData, Error> {
    let summary = get_summary(session.user_id, connection)
        .inspect_err(|error| tracing::error!("could not get transaction summary: {error}"))?;
    let transactions = list_transactions(session.user_id, connection)
        .inspect_err(|error| tracing::error!("could not get transactions: {error}"))?;
    let records = list_transaction_records(session.user_id, connection)
        .inspect_err(|error| tracing::error!("could not get transaction records: {error}"))?;

    Ok(DashboardData {
        summary,
        transactions,
        report: Report::from_records(&records),
    })
}

fn add_transaction_section() -> Markup {
    html! {
        section id="add-transaction" class="w-full mb-8"
        {
            h3 class="text-xl font-semibold mb-4" { "Add Transaction" }

            div class="bg-white dark:bg-gray-800 rounded-lg shadow-md p-4"
            {
                (transaction_form(&TransactionFormValues::default(), None))
            }
        }
    }
}

fn dashboard_view(nav_bar: NavBar, head_elements: &[HeadElement], content: &Markup) -> Markup {
    let content = html! {
        (nav_bar.into_html())

        div
            id="dashboard-content"
            class={(PAGE_CONTAINER_STYLE) " max-w-screen-xl"}
        {
            (content)
        }
    };

    base("Dashboard", head_elements, &content)
}

/// Renders the dashboard page when the user has no transactions.
fn dashboard_no_data_view(nav_bar: NavBar) -> Markup {
    let content = html!(
        div class="flex flex-col items-center mb-8"
        {
            h2 class="text-xl font-bold"
            {
                "Nothing here yet..."
            }

            p
            {
                "Your balance, charts and recent transactions will show up here
                once you add a transaction using the form below."
            }
        }

        (add_transaction_section())
    );

    dashboard_view(nav_bar, &[], &content)
}
