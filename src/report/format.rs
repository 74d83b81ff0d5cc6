//! Formatted terminal output for `sales report`.
//!
//! We keep formatting code in one place so:
//! - aggregation code stays free of presentation concerns
//! - output changes are localized (the TUI reuses the number formatters)

use crate::domain::{Breakdown, Dashboard, FilterSet};
use crate::plot::{hbar, render_monthly_plot};

const PLOT_WIDTH: usize = 72;
const PLOT_HEIGHT: usize = 12;
const BAR_WIDTH: usize = 24;
const KEY_WIDTH: usize = 36;

/// Format the whole dashboard as plain text.
pub fn format_dashboard(d: &Dashboard) -> String {
    let mut out = String::new();

    out.push_str("=== Sales Dashboard ===\n");
    out.push_str(&format!(
        "Loaded rows: {} | In view: {}\n",
        fmt_count(d.loaded_rows),
        fmt_count(d.filtered_rows)
    ));
    out.push_str(&format!("Filters: {}\n\n", describe_filters(&d.filters)));

    out.push_str(&format!(
        "{:<16} {:>10} {:>12} {:>10}\n",
        "Revenue", "Orders", "Avg Basket", "Customers"
    ));
    out.push_str(&format!(
        "{:<16} {:>10} {:>12} {:>10}\n",
        fmt_currency(d.kpis.total_revenue, 0),
        fmt_count(d.kpis.orders),
        fmt_currency(d.kpis.avg_basket, 2),
        fmt_count(d.kpis.customers)
    ));

    out.push_str("\nRevenue by month:\n");
    match d.revenue_by_month.rows_or_message() {
        Ok(rows) => {
            out.push_str(&render_monthly_plot(rows, PLOT_WIDTH, PLOT_HEIGHT));
            out.push_str(&format_breakdown_table("month", &d.revenue_by_month));
        }
        Err(msg) => {
            out.push_str(msg);
            out.push('\n');
        }
    }

    out.push_str("\nTop products:\n");
    out.push_str(&format_breakdown_table("description", &d.top_products));

    out.push_str("\nTop countries:\n");
    out.push_str(&format_breakdown_table("country", &d.top_countries));

    out
}

fn describe_filters(f: &FilterSet) -> String {
    let list = |set: &std::collections::BTreeSet<String>| {
        if set.is_empty() {
            "all".to_string()
        } else {
            set.iter().cloned().collect::<Vec<_>>().join(", ")
        }
    };
    format!(
        "countries=[{}] | months=[{}] | returns={}",
        list(&f.countries),
        list(&f.months),
        if f.include_returns { "included" } else { "excluded" }
    )
}

/// Key / revenue / bar table, or the breakdown's "no data" message.
pub fn format_breakdown_table(key_label: &str, breakdown: &Breakdown) -> String {
    let rows = match breakdown.rows_or_message() {
        Ok(rows) => rows,
        Err(msg) => return format!("{msg}\n"),
    };

    let mut out = String::new();
    out.push_str(format!("{:<KEY_WIDTH$} {:>14} {}", key_label, "revenue", "").trim_end());
    out.push('\n');
    out.push_str(format!("{:-<KEY_WIDTH$} {:-<14} {:-<BAR_WIDTH$}", "", "", "").trim_end());
    out.push('\n');

    let max = rows.iter().map(|g| g.revenue).fold(0.0_f64, f64::max);
    for g in rows {
        out.push_str(
            format!(
                "{:<KEY_WIDTH$} {:>14} {}",
                truncate(&g.key, KEY_WIDTH),
                fmt_currency(g.revenue, 2),
                hbar(g.revenue, max, BAR_WIDTH)
            )
            .trim_end(),
        );
        out.push('\n');
    }
    out
}

/// `$1,234` / `$12.34` style; negatives as `-$5.00`.
pub fn fmt_currency(v: f64, decimals: usize) -> String {
    let body = format!("{:.*}", decimals, v.abs());
    let (int_part, frac_part) = match body.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (body.as_str(), None),
    };

    let is_zero = body.chars().all(|c| c == '0' || c == '.');
    let sign = if v < 0.0 && !is_zero { "-" } else { "" };

    let mut out = format!("{sign}${}", group_thousands(int_part));
    if let Some(f) = frac_part {
        out.push('.');
        out.push_str(f);
    }
    out
}

/// Integer with thousands separators.
pub fn fmt_count(n: usize) -> String {
    group_thousands(&n.to_string())
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Shorten `s` to `max` characters, marking the cut with `.`.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{GroupTotal, Kpis};

    fn breakdown(rows: Vec<(&str, f64)>, empty_message: &'static str) -> Breakdown {
        Breakdown {
            rows: rows
                .into_iter()
                .map(|(k, v)| GroupTotal {
                    key: k.to_string(),
                    revenue: v,
                })
                .collect(),
            empty_message,
        }
    }

    #[test]
    fn currency_formats() {
        assert_eq!(fmt_currency(1234.4, 0), "$1,234");
        assert_eq!(fmt_currency(12.346, 2), "$12.35");
        assert_eq!(fmt_currency(1_234_567.891, 2), "$1,234,567.89");
        assert_eq!(fmt_currency(-15.0, 2), "-$15.00");
        assert_eq!(fmt_currency(-0.0, 0), "$0");
        assert_eq!(fmt_currency(0.0, 2), "$0.00");
    }

    #[test]
    fn counts_are_grouped() {
        assert_eq!(fmt_count(0), "0");
        assert_eq!(fmt_count(999), "999");
        assert_eq!(fmt_count(1000), "1,000");
        assert_eq!(fmt_count(1_067_371), "1,067,371");
    }

    #[test]
    fn truncate_marks_cut() {
        assert_eq!(truncate("SHORT", 10), "SHORT");
        assert_eq!(truncate("WHITE HANGING HEART", 8), "WHITE H.");
    }

    #[test]
    fn breakdown_table_has_rows_and_bars() {
        let b = breakdown(vec![("France", 200.0), ("Spain", 100.0)], "none");
        let txt = format_breakdown_table("country", &b);
        let lines: Vec<&str> = txt.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[2].starts_with("France"));
        assert!(lines[2].ends_with(&"#".repeat(BAR_WIDTH)));
        assert!(lines[3].ends_with(&"#".repeat(BAR_WIDTH / 2)));
        assert!(lines[3].contains("$100.00"));
    }

    #[test]
    fn empty_breakdowns_print_their_message() {
        let d = Dashboard {
            filters: FilterSet::default(),
            loaded_rows: 1200,
            filtered_rows: 0,
            kpis: Kpis::default(),
            revenue_by_month: breakdown(vec![], "No data for the current filter selection."),
            top_products: breakdown(vec![], "No products match the current filters."),
            top_countries: breakdown(vec![], "No countries match the current filters."),
        };
        let txt = format_dashboard(&d);
        assert!(txt.contains("Loaded rows: 1,200 | In view: 0"));
        assert!(txt.contains("returns=included"));
        assert!(txt.contains("No data for the current filter selection."));
        assert!(txt.contains("No products match the current filters."));
        assert!(txt.contains("No countries match the current filters."));
        assert!(!txt.contains("Plot:"));
    }
}
