//! Summary cards showing the balance, total income and total expenses.

use maud::{Markup, html};

use crate::{html::format_currency, transaction::Summary};

const CARD_STYLE: &str = "bg-white dark:bg-gray-800 border border-gray-200 \
    dark:border-gray-700 rounded-lg p-4 shadow-md flex flex-col gap-1";
const GREEN_TEXT_STYLE: &str = "text-green-600 dark:text-green-400";
const RED_TEXT_STYLE: &str = "text-red-600 dark:text-red-400";

fn card(id: &str, title: &str, amount: f64, amount_style: &str) -> Markup {
    html! {
        div id=(id) class=(CARD_STYLE)
        {
            h3 class="text-sm font-medium text-gray-600 dark:text-gray-400" { (title) }
            p class={"text-3xl font-bold " (amount_style)} { (format_currency(amount)) }
        }
    }
}

/// Renders the balance, total income and total expenses as three cards.
///
/// The balance is green when it is zero or more and red otherwise.
pub(super) fn summary_cards_view(summary: &Summary) -> Markup {
    let balance_style = if summary.balance >= 0.0 {
        GREEN_TEXT_STYLE
    } else {
        RED_TEXT_STYLE
    };

    html! {
        section id="summary-cards" class="w-full grid grid-cols-1 md:grid-cols-3 gap-4 mb-8"
        {
            (card("balance-card", "Balance", summary.balance, balance_style))
            (card("income-card", "Total Income", summary.total_income, GREEN_TEXT_STYLE))
            (card("expenses-card", "Total Expenses", summary.total_expense, RED_TEXT_STYLE))
        }
    }
}

#[cfg(test)]
mod summary_cards_tests {
    use scraper::{Html, Selector};

    use crate::transaction::Summary;

    use super::summary_cards_view;

    #[track_caller]
    fn card_text(html: &Html, id: &str) -> (String, String) {
        let card = html
            .select(&Selector::parse(&format!("#{id}")).unwrap())
            .next()
            .unwrap_or_else(|| panic!("no card with id {id}"));
        let amount = card
            .select(&Selector::parse("p").unwrap())
            .next()
            .unwrap();

        (
            amount.text().collect::<String>(),
            amount.value().attr("class").unwrap_or_default().to_owned(),
        )
    }

    #[test]
    fn shows_formatted_totals() {
        let summary = Summary {
            total_income: 234.5,
            total_expense: 34.5,
            balance: 200.0,
        };

        let html = Html::parse_fragment(&summary_cards_view(&summary).into_string());

        assert_eq!(card_text(&html, "balance-card").0, "$200.00");
        assert_eq!(card_text(&html, "income-card").0, "$234.50");
        assert_eq!(card_text(&html, "expenses-card").0, "$34.50");
    }

    #[test]
    fn negative_balance_is_red() {
        let summary = Summary {
            total_income: 10.0,
            total_expense: 25.0,
            balance: -15.0,
        };

        let html = Html::parse_fragment(&summary_cards_view(&summary).into_string());
        let (text, class) = card_text(&html, "balance-card");

        assert_eq!(text, "-$15.00");
        assert!(class.contains("text-red-600"), "got class {class:?}");
    }
}
