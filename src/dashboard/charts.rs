//! Chart generation and rendering for the dashboard.
//!
//! This module creates ECharts visualizations for the aggregated transactions:
//! - **Monthly Chart**: income and expenses per calendar month
//! - **Category Chart**: a doughnut of the total amount per category
//!
//! Each chart is generated as JSON configuration for the ECharts library and
//! rendered with corresponding HTML containers and JavaScript initialization code.

use charming::{
    Chart,
    component::{Axis, Grid, Legend, Title},
    element::{
        AxisLabel, AxisPointer, AxisPointerType, AxisType, Color, ItemStyle, JsFunction,
        LineStyle, Tooltip, Trigger,
    },
    series::{Line, Pie},
};
use maud::{Markup, PreEscaped, html};

use crate::{
    aggregation::{CategoryBucket, MonthlyBucket},
    html::HeadElement,
};

const INCOME_COLOR: &str = "#198754";
const EXPENSES_COLOR: &str = "#dc3545";
const CATEGORY_PALETTE: [&str; 8] = [
    "#0d6efd", "#6610f2", "#6f42c1", "#d63384", "#dc3545", "#fd7e14", "#ffc107", "#198754",
];

/// A dashboard chart with its HTML container ID and ECharts configuration.
pub(super) struct DashboardChart {
    /// The HTML element ID to use for the chart (kebab-case)
    pub id: &'static str,
    /// The ECharts configuration as a JSON string
    pub options: String,
}

/// Renders the HTML containers for dashboard charts.
pub(super) fn charts_view(charts: &[DashboardChart]) -> Markup {
    html!(
        section
            id="charts"
            class="w-full mx-auto mb-8"
        {
            div class="grid grid-cols-1 xl:grid-cols-2 gap-4"
            {
                @for chart in charts {
                    div
                        id=(chart.id)
                        class="min-h-[380px] rounded bg-white dark:bg-gray-800 shadow-md"
                    {}
                }
            }
        }
    )
}

/// Generates JavaScript initialization code for dashboard charts.
///
/// The charts follow the browser's dark mode setting and resize with the window.
pub(super) fn charts_script(charts: &[DashboardChart]) -> HeadElement {
    let script_content = charts
        .iter()
        .map(|chart| {
            format!(
                r#"(function() {{
                    const chartDom = document.getElementById("{}");
                    const option = {};
                    const darkModeMediaQuery = window.matchMedia('(prefers-color-scheme: dark)');
                    let chart = null;

                    const render = () => {{
                        if (chart) {{
                            chart.dispose();
                        }}
                        chart = echarts.init(chartDom, darkModeMediaQuery.matches ? 'dark' : null);
                        chart.setOption(option);
                    }};

                    window.addEventListener('resize', () => chart && chart.resize());
                    darkModeMediaQuery.addEventListener('change', render);
                    render();
                }})();"#,
                chart.id,
                escape_script_json(&chart.options)
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let wrapped_script = format!(
        "document.addEventListener('DOMContentLoaded', function() {{\n{}\n}});",
        script_content
    );

    HeadElement::ScriptSource(PreEscaped(wrapped_script))
}

/// Escape `<` so that user text in the chart options cannot close the
/// surrounding `<script>` element. Inside a JS string `\u003c` still reads as `<`.
fn escape_script_json(options: &str) -> String {
    options.replace('<', "\\u003c")
}

/// A line chart of income and expenses per month.
pub(super) fn monthly_chart(monthly: &[MonthlyBucket]) -> Chart {
    let labels = monthly
        .iter()
        .map(|bucket| bucket.label.clone())
        .collect::<Vec<_>>();
    let income = monthly.iter().map(|bucket| bucket.income).collect::<Vec<_>>();
    let expenses = monthly
        .iter()
        .map(|bucket| bucket.expenses)
        .collect::<Vec<_>>();

    Chart::new()
        .title(Title::new().text("Income & Expenses").subtext("Per month"))
        .tooltip(currency_tooltip())
        .legend(Legend::new().top("1%").right("4%"))
        .grid(
            Grid::new()
                .left("3%")
                .right("4%")
                .bottom("3%")
                .top(80)
                .contain_label(true),
        )
        .x_axis(Axis::new().type_(AxisType::Category).data(labels))
        .y_axis(
            Axis::new()
                .type_(AxisType::Value)
                .axis_label(AxisLabel::new().formatter(currency_formatter())),
        )
        .series(
            Line::new()
                .name("Income")
                .item_style(ItemStyle::new().color(INCOME_COLOR))
                .line_style(LineStyle::new().color(INCOME_COLOR))
                .data(income),
        )
        .series(
            Line::new()
                .name("Expenses")
                .item_style(ItemStyle::new().color(EXPENSES_COLOR))
                .line_style(LineStyle::new().color(EXPENSES_COLOR))
                .data(expenses),
        )
}

/// A doughnut chart of the total amount per category.
pub(super) fn category_chart(categories: &[CategoryBucket]) -> Chart {
    let data = categories
        .iter()
        .map(|bucket| (bucket.total, bucket.label.as_str()))
        .collect::<Vec<_>>();

    Chart::new()
        .title(Title::new().text("Categories").subtext("Total amount"))
        .color(CATEGORY_PALETTE.iter().map(|&color| Color::from(color)).collect())
        .tooltip(
            Tooltip::new()
                .trigger(Trigger::Item)
                .value_formatter(currency_formatter()),
        )
        .legend(Legend::new().bottom("1%"))
        .series(
            Pie::new()
                .name("Categories")
                .radius(vec!["40%", "70%"])
                .avoid_label_overlap(true)
                .data(data),
        )
}

#[inline]
fn currency_formatter() -> JsFunction {
    JsFunction::new_with_args(
        "number",
        "const currencyFormatter = new Intl.NumberFormat('en-US', {
              style: 'currency',
              currency: 'USD'
            });
            return (number) ? currencyFormatter.format(number) : \"-\";",
    )
}

/// Creates a tooltip configuration for currency values
fn currency_tooltip() -> Tooltip {
    Tooltip::new()
        .trigger(Trigger::Axis)
        .value_formatter(currency_formatter())
        .axis_pointer(AxisPointer::new().type_(AxisPointerType::Shadow))
}
