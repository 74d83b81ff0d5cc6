//! Reporting utilities: KPIs and grouped revenue breakdowns.
//!
//! Every aggregate is computed from scratch over a [`FilteredView`]; nothing
//! is cached between filter changes.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::domain::{
    Breakdown, CleanedRecord, Column, Dashboard, FilterSet, FilteredView, GroupTotal, Kpis, TOP_N,
};

pub mod format;

pub use format::*;

pub const NO_DATA_MSG: &str = "No data for the current filter selection.";
pub const NO_PRODUCTS_MSG: &str = "No products match the current filters.";
pub const NO_COUNTRIES_MSG: &str = "No countries match the current filters.";

/// Headline metrics for the view.
///
/// Orders and customers count distinct non-missing values; a column the
/// table does not carry counts as zero.
pub fn compute_kpis(view: &FilteredView<'_>) -> Kpis {
    let total_revenue: f64 = view.records.iter().map(|r| r.revenue).sum();
    let orders = distinct_count(view, Column::Invoice, |r| r.invoice.as_deref());
    let customers = distinct_count(view, Column::CustomerId, |r| r.customer_id.as_deref());
    let avg_basket = if orders > 0 {
        total_revenue / orders as f64
    } else {
        0.0
    };

    Kpis {
        total_revenue,
        orders,
        customers,
        avg_basket,
    }
}

fn distinct_count(
    view: &FilteredView<'_>,
    column: Column,
    key: impl Fn(&CleanedRecord) -> Option<&str>,
) -> usize {
    if !view.has_column(column) {
        return 0;
    }
    view.records
        .iter()
        .filter_map(|r| key(r))
        .collect::<HashSet<&str>>()
        .len()
}

/// Revenue per month, ascending by month label.
pub fn revenue_by_month(view: &FilteredView<'_>) -> Breakdown {
    let mut sums: BTreeMap<&str, f64> = BTreeMap::new();
    for r in &view.records {
        *sums.entry(r.month.as_str()).or_insert(0.0) += r.revenue;
    }
    Breakdown {
        rows: sums
            .into_iter()
            .map(|(key, revenue)| GroupTotal {
                key: key.to_string(),
                revenue,
            })
            .collect(),
        empty_message: NO_DATA_MSG,
    }
}

/// Top products by revenue (grouped by Description).
pub fn top_products(view: &FilteredView<'_>) -> Breakdown {
    Breakdown {
        rows: top_groups(view, |r| r.description.as_deref(), TOP_N),
        empty_message: NO_PRODUCTS_MSG,
    }
}

/// Top countries by revenue.
pub fn top_countries(view: &FilteredView<'_>) -> Breakdown {
    Breakdown {
        rows: top_groups(view, |r| r.country.as_deref(), TOP_N),
        empty_message: NO_COUNTRIES_MSG,
    }
}

/// Sum revenue by `key`, sort descending, keep `limit` rows.
///
/// Groups are accumulated in first-seen order and sorted stably, so equal
/// totals keep that order. Records with a missing key are not grouped.
fn top_groups(
    view: &FilteredView<'_>,
    key: impl Fn(&CleanedRecord) -> Option<&str>,
    limit: usize,
) -> Vec<GroupTotal> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<GroupTotal> = Vec::new();
    for r in &view.records {
        let Some(k) = key(r) else {
            continue;
        };
        match index.get(k) {
            Some(&i) => groups[i].revenue += r.revenue,
            None => {
                index.insert(k, groups.len());
                groups.push(GroupTotal {
                    key: k.to_string(),
                    revenue: r.revenue,
                });
            }
        }
    }

    groups.sort_by(|a, b| b.revenue.partial_cmp(&a.revenue).unwrap_or(std::cmp::Ordering::Equal));
    groups.truncate(limit);
    groups
}

/// Full dashboard state for one filter selection.
pub fn build_dashboard(view: &FilteredView<'_>, filters: &FilterSet, loaded_rows: usize) -> Dashboard {
    Dashboard {
        filters: filters.clone(),
        loaded_rows,
        filtered_rows: view.len(),
        kpis: compute_kpis(view),
        revenue_by_month: revenue_by_month(view),
        top_products: top_products(view),
        top_countries: top_countries(view),
    }
}
