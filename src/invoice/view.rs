use serde::{Deserialize, Serialize};

use super::{DisplayStatus, Invoice};

pub const PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Paid,
    Pending,
    Overdue,
}

impl StatusFilter {
    fn matches(&self, invoice: &Invoice) -> bool {
        match self {
            Self::All => true,
            Self::Paid => invoice.display_status() == DisplayStatus::Paid,
            Self::Pending => invoice.display_status() == DisplayStatus::Pending,
            Self::Overdue => invoice.display_status() == DisplayStatus::Overdue,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum SortKey {
    #[default]
    #[serde(rename = "date-desc")]
    DateDesc,
    #[serde(rename = "date-asc")]
    DateAsc,
    #[serde(rename = "amount-desc")]
    AmountDesc,
    #[serde(rename = "amount-asc")]
    AmountAsc,
}

/// The list controls as the dashboard holds them. Defaults: no search, all
/// statuses, newest first, page 1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub status: StatusFilter,
    #[serde(default)]
    pub sort: SortKey,
    #[serde(default = "default_page")]
    pub page: usize,
}

fn default_page() -> usize {
    1
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            search: String::new(),
            status: StatusFilter::All,
            sort: SortKey::DateDesc,
            page: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPage {
    pub invoices: Vec<Invoice>,
    pub total: usize,
    pub page: usize,
    pub total_pages: usize,
    pub per_page: usize,
}

/// Read-only projection of the collection: filter, sort, then slice out one
/// page. Never mutates its input; safe to recompute on every render.
pub fn derive_page(invoices: &[Invoice], query: &ListQuery) -> ListPage {
    let needle = query.search.to_lowercase();
    let mut filtered: Vec<Invoice> = invoices
        .iter()
        .filter(|inv| {
            let matches_search = inv.id.to_lowercase().contains(&needle)
                || inv.client.to_lowercase().contains(&needle);
            matches_search && query.status.matches(inv)
        })
        .cloned()
        .collect();

    match query.sort {
        SortKey::DateDesc => filtered.sort_by(|a, b| b.date.cmp(&a.date)),
        SortKey::DateAsc => filtered.sort_by(|a, b| a.date.cmp(&b.date)),
        SortKey::AmountDesc => filtered.sort_by(|a, b| b.amount.total_cmp(&a.amount)),
        SortKey::AmountAsc => filtered.sort_by(|a, b| a.amount.total_cmp(&b.amount)),
    }

    let total = filtered.len();
    let total_pages = total.div_ceil(PAGE_SIZE).max(1);
    let page = query.page.clamp(1, total_pages);
    let start = (page - 1) * PAGE_SIZE;
    let invoices = filtered
        .into_iter()
        .skip(start)
        .take(PAGE_SIZE)
        .collect();

    ListPage {
        invoices,
        total,
        page,
        total_pages,
        per_page: PAGE_SIZE,
    }
}
