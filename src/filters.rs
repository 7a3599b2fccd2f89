//! Table filtering, sorting and pagination for the console list pages.
//!
//! The upstream list endpoints return whole arrays; the gateway narrows them
//! per request from the table query string
//! (`?search=&status=&region=&sort=&order=&page=&perPage=`).

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::models::{Card, Commission, Order, PromoCode, Promoter, Region, User};

pub const DEFAULT_PER_PAGE: u32 = 20;
pub const MAX_PER_PAGE: u32 = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableQuery {
    pub search: Option<String>,
    pub status: Option<String>,
    pub region: Option<String>,
    pub sort: Option<String>,
    #[serde(default)]
    pub order: SortOrder,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl TableQuery {
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn per_page(&self) -> u32 {
        self.per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: u32,
    pub per_page: u32,
    pub total_pages: u32,
}

/// A value a table column can be sorted by.
#[derive(Debug, Clone, PartialEq)]
pub enum SortValue {
    Text(String),
    Number(f64),
    Time(DateTime<Utc>),
}

impl SortValue {
    fn compare(&self, other: &SortValue) -> Ordering {
        match (self, other) {
            (SortValue::Text(a), SortValue::Text(b)) => a.to_lowercase().cmp(&b.to_lowercase()),
            (SortValue::Number(a), SortValue::Number(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            (SortValue::Time(a), SortValue::Time(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }
}

/// A row type that can be shown in a console table.
pub trait Tabular {
    /// Columns the `sort` parameter accepts.
    const SORT_KEYS: &'static [&'static str];

    /// Fields the free-text search looks at.
    fn search_fields(&self) -> Vec<&str>;

    fn status_key(&self) -> &str;

    fn region_key(&self) -> Option<&str>;

    fn sort_value(&self, key: &str) -> SortValue;
}

/// Filter, sort and paginate `items` according to `query`.
pub fn apply<T: Tabular>(items: Vec<T>, query: &TableQuery) -> AppResult<Page<T>> {
    let sort_key = match query.sort.as_deref() {
        Some(key) if T::SORT_KEYS.contains(&key) => Some(key),
        Some(key) => {
            return Err(AppError::BadRequest(format!(
                "cannot sort by '{}', expected one of: {}",
                key,
                T::SORT_KEYS.join(", ")
            )))
        }
        None => None,
    };

    let needle = query
        .search
        .as_deref()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty());

    let mut rows: Vec<T> = items
        .into_iter()
        .filter(|row| match &needle {
            Some(needle) => row.search_fields().iter().any(|f| f.to_lowercase().contains(needle)),
            None => true,
        })
        .filter(|row| match query.status.as_deref() {
            Some(status) if !status.is_empty() => row.status_key() == status,
            _ => true,
        })
        .filter(|row| match query.region.as_deref() {
            Some(region) if !region.is_empty() => row.region_key() == Some(region),
            _ => true,
        })
        .collect();

    if let Some(key) = sort_key {
        rows.sort_by(|a, b| {
            let ordering = a.sort_value(key).compare(&b.sort_value(key));
            match query.order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });
    }

    let total = rows.len();
    let page = query.page();
    let per_page = query.per_page();
    let total_pages = total.div_ceil(per_page as usize) as u32;
    let start = (page as usize - 1).saturating_mul(per_page as usize);

    let items = rows.into_iter().skip(start).take(per_page as usize).collect();

    Ok(Page {
        items,
        total,
        page,
        per_page,
        total_pages,
    })
}

// ============================================================================
// Row implementations
// ============================================================================

impl Tabular for User {
    const SORT_KEYS: &'static [&'static str] = &["name", "email", "role", "createdAt"];

    fn search_fields(&self) -> Vec<&str> {
        vec![self.name.as_str(), self.email.as_str()]
    }

    fn status_key(&self) -> &str {
        self.status.as_str()
    }

    fn region_key(&self) -> Option<&str> {
        self.region.as_deref()
    }

    fn sort_value(&self, key: &str) -> SortValue {
        match key {
            "email" => SortValue::Text(self.email.clone()),
            "role" => SortValue::Text(self.role.as_str().to_string()),
            "createdAt" => SortValue::Time(self.created_at),
            _ => SortValue::Text(self.name.clone()),
        }
    }
}

impl Tabular for Card {
    const SORT_KEYS: &'static [&'static str] = &["businessName", "uid", "scanCount", "reviewCount", "createdAt"];

    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.uid.as_str(), self.business_name.as_str()];
        if let Some(owner) = &self.owner {
            fields.push(&owner.name);
        }
        fields
    }

    fn status_key(&self) -> &str {
        self.status.as_str()
    }

    fn region_key(&self) -> Option<&str> {
        self.region.as_deref()
    }

    fn sort_value(&self, key: &str) -> SortValue {
        match key {
            "uid" => SortValue::Text(self.uid.clone()),
            "scanCount" => SortValue::Number(self.scan_count as f64),
            "reviewCount" => SortValue::Number(self.review_count as f64),
            "createdAt" => SortValue::Time(self.created_at),
            _ => SortValue::Text(self.business_name.clone()),
        }
    }
}

impl Tabular for Order {
    const SORT_KEYS: &'static [&'static str] = &["createdAt", "orderNumber", "total"];

    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.order_number.as_str(), self.package.plan_name.as_str()];
        if let Some(customer) = &self.customer {
            fields.push(&customer.name);
            fields.push(&customer.email);
        }
        fields
    }

    fn status_key(&self) -> &str {
        self.status.as_str()
    }

    fn region_key(&self) -> Option<&str> {
        self.region.as_deref()
    }

    fn sort_value(&self, key: &str) -> SortValue {
        match key {
            "orderNumber" => SortValue::Text(self.order_number.clone()),
            "total" => SortValue::Number(self.total),
            _ => SortValue::Time(self.created_at),
        }
    }
}

impl Tabular for Promoter {
    const SORT_KEYS: &'static [&'static str] = &["name", "totalSales", "totalCommission", "codeCount"];

    fn search_fields(&self) -> Vec<&str> {
        vec![self.name.as_str(), self.email.as_str()]
    }

    fn status_key(&self) -> &str {
        self.status.as_str()
    }

    fn region_key(&self) -> Option<&str> {
        self.region.as_deref()
    }

    fn sort_value(&self, key: &str) -> SortValue {
        match key {
            "totalSales" => SortValue::Number(self.total_sales),
            "totalCommission" => SortValue::Number(self.total_commission),
            "codeCount" => SortValue::Number(self.code_count as f64),
            _ => SortValue::Text(self.name.clone()),
        }
    }
}

impl Tabular for Region {
    const SORT_KEYS: &'static [&'static str] = &["name", "code"];

    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.name.as_str(), self.code.as_str()];
        if let Some(admin) = &self.admin_name {
            fields.push(admin);
        }
        fields
    }

    fn status_key(&self) -> &str {
        if self.active {
            "active"
        } else {
            "inactive"
        }
    }

    fn region_key(&self) -> Option<&str> {
        Some(self.code.as_str())
    }

    fn sort_value(&self, key: &str) -> SortValue {
        match key {
            "code" => SortValue::Text(self.code.clone()),
            _ => SortValue::Text(self.name.clone()),
        }
    }
}

impl Tabular for Commission {
    const SORT_KEYS: &'static [&'static str] = &["createdAt", "amount"];

    fn search_fields(&self) -> Vec<&str> {
        self.order_number.as_deref().into_iter().collect()
    }

    fn status_key(&self) -> &str {
        self.status.as_str()
    }

    fn region_key(&self) -> Option<&str> {
        self.region.as_deref()
    }

    fn sort_value(&self, key: &str) -> SortValue {
        match key {
            "amount" => SortValue::Number(self.amount),
            _ => SortValue::Time(self.created_at),
        }
    }
}

impl Tabular for PromoCode {
    const SORT_KEYS: &'static [&'static str] = &["code", "usage"];

    fn search_fields(&self) -> Vec<&str> {
        vec![self.code.as_str()]
    }

    fn status_key(&self) -> &str {
        if self.active {
            "active"
        } else {
            "inactive"
        }
    }

    fn region_key(&self) -> Option<&str> {
        None
    }

    fn sort_value(&self, key: &str) -> SortValue {
        match key {
            "usage" => SortValue::Number(self.usage as f64),
            _ => SortValue::Text(self.code.clone()),
        }
    }
}
