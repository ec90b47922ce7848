//! The table of recent transactions shown on the dashboard.

use maud::{Markup, html};
use time::{UtcOffset, format_description::BorrowedFormatItem, macros::format_description};

use crate::{
    html::{TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE, format_currency},
    transaction::{Transaction, TransactionType},
};

/// The number of transactions shown in the recent transactions table.
pub(super) const RECENT_TRANSACTION_COUNT: usize = 10;

const DATE_FORMAT: &[BorrowedFormatItem] = format_description!("[year]-[month]-[day]");

const BADGE_STYLE: &str = "inline-flex items-center px-2.5 py-0.5 text-xs font-semibold rounded-full";
const CATEGORY_BADGE_STYLE: &str = "text-blue-800 bg-blue-100 dark:bg-blue-900 dark:text-blue-300";
const INCOME_STYLE: &str = "text-green-600 dark:text-green-400";
const EXPENSE_STYLE: &str = "text-red-600 dark:text-red-400";
const INCOME_BADGE_STYLE: &str = "text-green-800 bg-green-100 dark:bg-green-900 dark:text-green-300";
const EXPENSE_BADGE_STYLE: &str = "text-red-800 bg-red-100 dark:bg-red-900 dark:text-red-300";

fn transaction_row(transaction: &Transaction, local_offset: UtcOffset) -> Markup {
    let date = transaction
        .date
        .to_offset(local_offset)
        .format(DATE_FORMAT)
        .unwrap_or_else(|error| {
            tracing::error!("Could not format date {}: {error}", transaction.date);
            transaction.date.date().to_string()
        });

    let (amount_style, badge_style, sign) = match transaction.type_ {
        TransactionType::Income => (INCOME_STYLE, INCOME_BADGE_STYLE, "+"),
        TransactionType::Expense => (EXPENSE_STYLE, EXPENSE_BADGE_STYLE, "-"),
    };

    html! {
        tr class=(TABLE_ROW_STYLE)
        {
            td class={(TABLE_CELL_STYLE) " whitespace-nowrap"} { (date) }
            td class=(TABLE_CELL_STYLE) { (transaction.description) }
            td class=(TABLE_CELL_STYLE)
            {
                span class={(BADGE_STYLE) " " (CATEGORY_BADGE_STYLE)} { (transaction.category) }
            }
            td class=(TABLE_CELL_STYLE)
            {
                span class={(BADGE_STYLE) " " (badge_style)} { (transaction.type_.as_str()) }
            }
            td class={(TABLE_CELL_STYLE) " text-right font-medium " (amount_style)}
            {
                (sign) (format_currency(transaction.amount))
            }
        }
    }
}

/// Renders the most recent transactions as a table.
///
/// `transactions` should be sorted newest first, only the first
/// [RECENT_TRANSACTION_COUNT] are shown. Dates are shown in `local_offset`.
pub(super) fn recent_transactions_table(
    transactions: &[Transaction],
    local_offset: UtcOffset,
) -> Markup {
    html! {
        section id="recent-transactions" class="w-full mb-8"
        {
            h3 class="text-xl font-semibold mb-4" { "Recent Transactions" }

            div class="overflow-x-auto rounded-lg shadow"
            {
                table class="w-full text-sm text-left text-gray-500 dark:text-gray-400"
                {
                    thead class=(TABLE_HEADER_STYLE)
                    {
                        tr
                        {
                            th scope="col" class=(TABLE_CELL_STYLE) { "Date" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Description" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Category" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Type" }
                            th scope="col" class={(TABLE_CELL_STYLE) " text-right"} { "Amount" }
                        }
                    }

                    tbody
                    {
                        @for transaction in transactions.iter().take(RECENT_TRANSACTION_COUNT) {
                            (transaction_row(transaction, local_offset))
                        }
                    }
                }
            }
        }
    }
}
