//! Dashboard summaries and chart series.
//!
//! Everything here is aggregated from arrays the upstream already returned;
//! no figure is persisted. Month buckets are labelled `YYYY-MM` and sorted
//! ascending so charts can plot them directly.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{round_cents, Card, CardStatus, Commission, CommissionStatus, Order, OrderStatus, PromoCode, Promoter, User};

const TOP_PROMOTERS: usize = 5;
const RECENT_ORDERS: usize = 5;

/// Labels and values for one chart line.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartSeries {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

impl ChartSeries {
    fn from_buckets(buckets: BTreeMap<String, f64>) -> Self {
        let (labels, values) = buckets.into_iter().map(|(label, value)| (label, round_cents(value))).unzip();
        Self { labels, values }
    }
}

/// Inclusive date window from the report query string.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn validate(&self) -> AppResult<()> {
        match (self.from, self.to) {
            (Some(from), Some(to)) if from > to => Err(AppError::BadRequest(
                "'from' must not be after 'to'".to_string(),
            )),
            _ => Ok(()),
        }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        let day = at.date_naive();
        self.from.map_or(true, |from| day >= from) && self.to.map_or(true, |to| day <= to)
    }
}

fn month_key(at: DateTime<Utc>) -> String {
    at.format("%Y-%m").to_string()
}

// ============================================================================
// Regional admin report
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromoterRank {
    pub id: Uuid,
    pub name: String,
    pub total_sales: f64,
    pub total_commission: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminReport {
    pub total_revenue: f64,
    pub order_count: usize,
    pub average_order_value: f64,
    pub orders_by_status: BTreeMap<String, usize>,
    pub revenue_by_month: ChartSeries,
    pub orders_by_month: ChartSeries,
    pub cards_by_status: BTreeMap<String, usize>,
    pub total_scans: u64,
    pub total_reviews: u64,
    pub new_users_by_month: ChartSeries,
    pub top_promoters: Vec<PromoterRank>,
}

pub fn admin_report(
    orders: &[Order],
    cards: &[Card],
    users: &[User],
    promoters: &[Promoter],
    range: &DateRange,
) -> AdminReport {
    let orders: Vec<&Order> = orders.iter().filter(|o| range.contains(o.created_at)).collect();

    let mut orders_by_status: BTreeMap<String, usize> =
        OrderStatus::ALL.iter().map(|s| (s.as_str().to_string(), 0)).collect();
    let mut revenue_by_month = BTreeMap::new();
    let mut orders_by_month = BTreeMap::new();
    let mut total_revenue = 0.0;
    let mut paid_orders = 0usize;

    for order in &orders {
        *orders_by_status.entry(order.status.as_str().to_string()).or_default() += 1;
        *orders_by_month.entry(month_key(order.created_at)).or_insert(0.0) += 1.0;
        if order.status.counts_as_revenue() {
            total_revenue += order.total;
            paid_orders += 1;
            *revenue_by_month.entry(month_key(order.created_at)).or_insert(0.0) += order.total;
        }
    }

    let average_order_value = if paid_orders == 0 {
        0.0
    } else {
        round_cents(total_revenue / paid_orders as f64)
    };

    let (cards_by_status, total_scans, total_reviews) = card_totals(cards);

    let mut new_users_by_month = BTreeMap::new();
    for user in users.iter().filter(|u| range.contains(u.created_at)) {
        *new_users_by_month.entry(month_key(user.created_at)).or_insert(0.0) += 1.0;
    }

    let mut ranked: Vec<&Promoter> = promoters.iter().collect();
    ranked.sort_by(|a, b| b.total_sales.partial_cmp(&a.total_sales).unwrap_or(std::cmp::Ordering::Equal));
    let top_promoters = ranked
        .into_iter()
        .take(TOP_PROMOTERS)
        .map(|p| PromoterRank {
            id: p.id,
            name: p.name.clone(),
            total_sales: p.total_sales,
            total_commission: p.total_commission,
        })
        .collect();

    AdminReport {
        total_revenue: round_cents(total_revenue),
        order_count: orders.len(),
        average_order_value,
        orders_by_status,
        revenue_by_month: ChartSeries::from_buckets(revenue_by_month),
        orders_by_month: ChartSeries::from_buckets(orders_by_month),
        cards_by_status,
        total_scans,
        total_reviews,
        new_users_by_month: ChartSeries::from_buckets(new_users_by_month),
        top_promoters,
    }
}

fn card_totals(cards: &[Card]) -> (BTreeMap<String, usize>, u64, u64) {
    let mut by_status: BTreeMap<String, usize> = [CardStatus::Active, CardStatus::Inactive, CardStatus::Pending]
        .iter()
        .map(|s| (s.as_str().to_string(), 0))
        .collect();
    let mut scans = 0;
    let mut reviews = 0;
    for card in cards {
        *by_status.entry(card.status.as_str().to_string()).or_default() += 1;
        scans += card.scan_count;
        reviews += card.review_count;
    }
    (by_status, scans, reviews)
}

// ============================================================================
// Promoter dashboard
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeUsage {
    pub code: String,
    pub usage: u32,
    pub max_usage: Option<u32>,
    pub active: bool,
    pub redeemable: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromoterDashboard {
    pub commissions_by_status: BTreeMap<String, f64>,
    pub pending_total: f64,
    pub paid_total: f64,
    pub earnings_by_month: ChartSeries,
    pub codes: Vec<CodeUsage>,
}

pub fn promoter_dashboard(commissions: &[Commission], codes: &[PromoCode], now: DateTime<Utc>) -> PromoterDashboard {
    let mut by_status: BTreeMap<String, f64> =
        CommissionStatus::ALL.iter().map(|s| (s.as_str().to_string(), 0.0)).collect();
    let mut earnings = BTreeMap::new();

    for commission in commissions {
        *by_status.entry(commission.status.as_str().to_string()).or_insert(0.0) += commission.amount;
        if commission.status != CommissionStatus::Cancelled {
            *earnings.entry(month_key(commission.created_at)).or_insert(0.0) += commission.amount;
        }
    }

    for total in by_status.values_mut() {
        *total = round_cents(*total);
    }

    let codes = codes
        .iter()
        .map(|c| CodeUsage {
            code: c.code.clone(),
            usage: c.usage,
            max_usage: c.max_usage,
            active: c.active,
            redeemable: c.is_redeemable(now),
        })
        .collect();

    PromoterDashboard {
        pending_total: by_status.get(CommissionStatus::Pending.as_str()).copied().unwrap_or_default(),
        paid_total: by_status.get(CommissionStatus::Paid.as_str()).copied().unwrap_or_default(),
        commissions_by_status: by_status,
        earnings_by_month: ChartSeries::from_buckets(earnings),
        codes,
    }
}

// ============================================================================
// Customer dashboard
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountDashboard {
    pub cards_by_status: BTreeMap<String, usize>,
    pub total_scans: u64,
    pub total_reviews: u64,
    pub recent_orders: Vec<Order>,
}

pub fn account_dashboard(cards: &[Card], mut orders: Vec<Order>) -> AccountDashboard {
    let (cards_by_status, total_scans, total_reviews) = card_totals(cards);
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    orders.truncate(RECENT_ORDERS);

    AccountDashboard {
        cards_by_status,
        total_scans,
        total_reviews,
        recent_orders: orders,
    }
}
