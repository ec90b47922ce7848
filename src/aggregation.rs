//! Transaction aggregation for reports and charts.
//!
//! Groups transactions into calendar-month buckets (income and expenses per
//! month) and category buckets (total amount per category). The functions
//! here are pure: they keep no state and return freshly built buckets on
//! every call.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, UtcOffset};

use crate::transaction::{Transaction, TransactionType, parse_date};

/// A read-only view of a transaction used as input to the aggregation functions.
///
/// Deserializes from the JSON returned by the transactions API. A missing or
/// unparseable `date` is kept as `None` instead of failing the whole input.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TransactionRecord {
    /// When the transaction happened, if the date could be parsed.
    #[serde(default, deserialize_with = "lenient_date::deserialize")]
    pub date: Option<OffsetDateTime>,
    /// Free-form text describing the transaction.
    #[serde(default)]
    pub description: String,
    /// The category label, compared as-is.
    pub category: String,
    /// Whether the transaction is income or an expense.
    #[serde(rename = "type")]
    pub type_: TransactionType,
    /// The non-negative magnitude of the transaction.
    pub amount: f64,
}

impl From<&Transaction> for TransactionRecord {
    fn from(transaction: &Transaction) -> Self {
        Self {
            date: Some(transaction.date),
            description: transaction.description.clone(),
            category: transaction.category.clone(),
            type_: transaction.type_,
            amount: transaction.amount,
        }
    }
}

mod lenient_date {
    //! Accepts RFC 3339 date-times and plain `YYYY-MM-DD` dates, and maps
    //! anything else (including non-string values) to `None`.
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;
    use time::OffsetDateTime;

    use super::parse_date;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<OffsetDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;

        Ok(value.as_ref().and_then(Value::as_str).and_then(parse_date))
    }
}

/// Income and expense totals for one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyBucket {
    /// The month formatted as "YYYY-MM".
    pub label: String,
    /// The sum of income amounts in the month.
    pub income: f64,
    /// The sum of expense amounts in the month.
    pub expenses: f64,
}

/// The total amount for one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryBucket {
    /// The category name exactly as it appears on the transactions.
    pub label: String,
    /// The sum of amounts in the category, regardless of transaction type.
    pub total: f64,
}

/// Both aggregate views computed from the same set of transactions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    /// Monthly income and expenses in chronological order.
    pub monthly: Vec<MonthlyBucket>,
    /// Category totals from largest to smallest.
    pub categories: Vec<CategoryBucket>,
}

impl Report {
    /// Aggregate `records` by month and by category.
    pub fn from_records(records: &[TransactionRecord]) -> Self {
        Self {
            monthly: aggregate_by_month(records),
            categories: aggregate_by_category(records),
        }
    }
}

/// Sums income and expenses for each calendar month, in UTC.
///
/// Months are returned in ascending order and only months that contain at
/// least one transaction are included. Records without a valid date are
/// skipped.
pub fn aggregate_by_month(records: &[TransactionRecord]) -> Vec<MonthlyBucket> {
    let mut months: BTreeMap<(i32, u8), MonthlyBucket> = BTreeMap::new();
    let mut skipped = 0;

    for record in records {
        let Some(date) = record.date else {
            skipped += 1;
            continue;
        };

        let date = date.to_offset(UtcOffset::UTC);
        let (year, month) = (date.year(), u8::from(date.month()));

        let bucket = months
            .entry((year, month))
            .or_insert_with(|| MonthlyBucket {
                label: format!("{year:04}-{month:02}"),
                income: 0.0,
                expenses: 0.0,
            });

        match record.type_ {
            TransactionType::Income => bucket.income += record.amount,
            TransactionType::Expense => bucket.expenses += record.amount,
        }
    }

    if skipped > 0 {
        tracing::warn!("Skipped {skipped} transactions without a valid date");
    }

    months.into_values().collect()
}

/// Sums amounts for each distinct category.
///
/// Categories are compared with exact string equality, so "Food" and "food"
/// are separate groups and an empty category is a group of its own. The
/// result is sorted by descending total, with ties kept in the order the
/// categories first appear. Dates are ignored.
pub fn aggregate_by_category(records: &[TransactionRecord]) -> Vec<CategoryBucket> {
    let mut buckets: Vec<CategoryBucket> = Vec::new();
    let mut index_by_label: HashMap<&str, usize> = HashMap::new();

    for record in records {
        match index_by_label.get(record.category.as_str()) {
            Some(&index) => buckets[index].total += record.amount,
            None => {
                index_by_label.insert(&record.category, buckets.len());
                buckets.push(CategoryBucket {
                    label: record.category.clone(),
                    total: record.amount,
                });
            }
        }
    }

    // `sort_by` is stable, which keeps first-seen order for equal totals.
    buckets.sort_by(|a, b| b.total.total_cmp(&a.total));

    buckets
}

#[cfg(test)]
mod tests {
    use time::{OffsetDateTime, macros::datetime};

    use crate::transaction::TransactionType;

    use super::{
        CategoryBucket, MonthlyBucket, Report, TransactionRecord, aggregate_by_category,
        aggregate_by_month,
    };

    fn record(
        date: Option<OffsetDateTime>,
        category: &str,
        type_: TransactionType,
        amount: f64,
    ) -> TransactionRecord {
        TransactionRecord {
            date,
            description: String::new(),
            category: category.to_owned(),
            type_,
            amount,
        }
    }

    fn income(date: OffsetDateTime, amount: f64) -> TransactionRecord {
        record(Some(date), "Salary", TransactionType::Income, amount)
    }

    fn expense(date: OffsetDateTime, category: &str, amount: f64) -> TransactionRecord {
        record(Some(date), category, TransactionType::Expense, amount)
    }

    #[test]
    fn empty_input_gives_empty_buckets() {
        let report = Report::from_records(&[]);

        assert!(report.monthly.is_empty());
        assert!(report.categories.is_empty());
    }

    #[test]
    fn groups_income_and_expenses_by_month() {
        let records = [
            income(datetime!(2024-01-15 00:00 UTC), 1000.0),
            expense(datetime!(2024-01-20 00:00 UTC), "Food", 200.0),
            income(datetime!(2024-02-01 00:00 UTC), 500.0),
        ];

        let got = aggregate_by_month(&records);

        assert_eq!(
            got,
            vec![
                MonthlyBucket {
                    label: "2024-01".to_owned(),
                    income: 1000.0,
                    expenses: 200.0,
                },
                MonthlyBucket {
                    label: "2024-02".to_owned(),
                    income: 500.0,
                    expenses: 0.0,
                },
            ]
        );
    }

    #[test]
    fn months_are_ascending_and_unique() {
        let records = [
            expense(datetime!(2025-03-02 00:00 UTC), "Rent", 10.0),
            income(datetime!(2023-12-31 23:59 UTC), 1.0),
            expense(datetime!(2024-11-05 00:00 UTC), "Rent", 10.0),
            income(datetime!(2025-03-30 00:00 UTC), 1.0),
            expense(datetime!(2024-02-05 00:00 UTC), "Rent", 10.0),
        ];

        let labels: Vec<_> = aggregate_by_month(&records)
            .into_iter()
            .map(|bucket| bucket.label)
            .collect();

        assert_eq!(labels, ["2023-12", "2024-02", "2024-11", "2025-03"]);
    }

    #[test]
    fn months_are_bucketed_in_utc() {
        // Midday on the 1st of February in New Zealand is still January in UTC.
        let records = [income(datetime!(2024-02-01 09:00 +13:00), 100.0)];

        let got = aggregate_by_month(&records);

        assert_eq!(got.len(), 1);
        assert_eq!(got[0].label, "2024-01");
    }

    #[test]
    fn invalid_dates_are_skipped_without_affecting_other_months() {
        let valid = [
            income(datetime!(2024-01-15 00:00 UTC), 1000.0),
            expense(datetime!(2024-02-20 00:00 UTC), "Food", 200.0),
        ];
        let mut with_invalid = valid.to_vec();
        with_invalid.insert(1, record(None, "Food", TransactionType::Expense, 75.0));

        assert_eq!(aggregate_by_month(&with_invalid), aggregate_by_month(&valid));
    }

    #[test]
    fn monthly_sums_match_input_sums() {
        let records = [
            income(datetime!(2024-01-15 00:00 UTC), 1000.25),
            income(datetime!(2024-03-15 00:00 UTC), 20.5),
            expense(datetime!(2024-01-20 00:00 UTC), "Food", 200.0),
            expense(datetime!(2024-03-01 00:00 UTC), "Rent", 42.0),
            record(None, "Food", TransactionType::Expense, 99.0),
        ];

        let monthly = aggregate_by_month(&records);

        let income_total: f64 = monthly.iter().map(|bucket| bucket.income).sum();
        let expense_total: f64 = monthly.iter().map(|bucket| bucket.expenses).sum();
        assert_eq!(income_total, 1020.75);
        assert_eq!(expense_total, 242.0);
    }

    #[test]
    fn groups_by_category_sorted_by_total() {
        let date = datetime!(2024-01-01 00:00 UTC);
        let records = [
            expense(date, "food", 50.0),
            expense(date, "food", 30.0),
            expense(date, "rent", 1000.0),
        ];

        let got = aggregate_by_category(&records);

        assert_eq!(
            got,
            vec![
                CategoryBucket {
                    label: "rent".to_owned(),
                    total: 1000.0,
                },
                CategoryBucket {
                    label: "food".to_owned(),
                    total: 80.0,
                },
            ]
        );
    }

    #[test]
    fn category_ties_keep_first_seen_order() {
        let date = datetime!(2024-01-01 00:00 UTC);
        let records = [
            expense(date, "b", 10.0),
            expense(date, "a", 10.0),
            expense(date, "c", 20.0),
            expense(date, "d", 10.0),
        ];

        let labels: Vec<_> = aggregate_by_category(&records)
            .into_iter()
            .map(|bucket| bucket.label)
            .collect();

        assert_eq!(labels, ["c", "b", "a", "d"]);
    }

    #[test]
    fn categories_are_case_sensitive_and_keep_empty_labels() {
        let date = datetime!(2024-01-01 00:00 UTC);
        let records = [
            expense(date, "Food", 1.0),
            expense(date, "food", 2.0),
            expense(date, "", 3.0),
        ];

        let labels: Vec<_> = aggregate_by_category(&records)
            .into_iter()
            .map(|bucket| bucket.label)
            .collect();

        assert_eq!(labels, ["", "food", "Food"]);
    }

    #[test]
    fn category_totals_include_income_and_invalid_dates() {
        let records = [
            income(datetime!(2024-01-15 00:00 UTC), 100.0),
            record(None, "Salary", TransactionType::Income, 50.0),
            expense(datetime!(2024-01-20 00:00 UTC), "Food", 25.0),
        ];

        let categories = aggregate_by_category(&records);

        let category_sum: f64 = categories.iter().map(|bucket| bucket.total).sum();
        let input_sum: f64 = records.iter().map(|record| record.amount).sum();
        assert_eq!(category_sum, input_sum);
        assert_eq!(categories[0].label, "Salary");
        assert_eq!(categories[0].total, 150.0);
    }

    #[test]
    fn deserializes_records_with_lenient_dates() {
        let json = r#"[
            {"date": "2024-01-15T10:30:00Z", "description": "Pay", "category": "Salary", "type": "income", "amount": 1000},
            {"date": "2024-01-20", "category": "Food", "type": "expense", "amount": 12.5},
            {"date": "not a date", "category": "Food", "type": "expense", "amount": 1},
            {"date": 20240101, "category": "Food", "type": "expense", "amount": 1},
            {"category": "Food", "type": "expense", "amount": 1}
        ]"#;

        let records: Vec<TransactionRecord> = serde_json::from_str(json).unwrap();

        assert_eq!(records[0].date, Some(datetime!(2024-01-15 10:30 UTC)));
        assert_eq!(records[0].description, "Pay");
        assert_eq!(records[1].date, Some(datetime!(2024-01-20 00:00 UTC)));
        assert_eq!(records[1].description, "");
        assert_eq!(records[2].date, None);
        assert_eq!(records[3].date, None);
        assert_eq!(records[4].date, None);
    }

    #[test]
    fn report_serializes_both_views() {
        let records = [expense(datetime!(2024-05-05 00:00 UTC), "Fuel", 60.0)];

        let json = serde_json::to_value(Report::from_records(&records)).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "monthly": [{"label": "2024-05", "income": 0.0, "expenses": 60.0}],
                "categories": [{"label": "Fuel", "total": 60.0}],
            })
        );
    }
}
