use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub mod form;
pub mod store;
pub mod view;

/// Flat tax applied on top of the line-item subtotal. Fixed, not configurable.
pub const TAX_RATE: f64 = 0.16;

/// Lowest numeric suffix the generator will hand out is BASE + 1.
const INVOICE_NUMBER_BASE: u64 = 2044;

const INVOICE_PREFIX: &str = "QP";

static INVOICE_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^QP-(\d+)$").expect("invoice id regex"));

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Draft,
    Pending,
    PendingPayment,
    Paid,
    Overdue,
    Processing,
    Failed,
}

/// Three-state projection used by the list UI. Canonical mapping: everything
/// in flight counts as `Pending`, terminal failures surface as `Overdue`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DisplayStatus {
    Paid,
    Pending,
    Overdue,
}

impl InvoiceStatus {
    pub fn display(&self) -> DisplayStatus {
        match self {
            Self::Paid => DisplayStatus::Paid,
            Self::Draft | Self::Pending | Self::PendingPayment | Self::Processing => {
                DisplayStatus::Pending
            }
            Self::Overdue | Self::Failed => DisplayStatus::Overdue,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceLineItem {
    pub description: String,
    pub quantity: f64,
    pub unit_price: f64,
}

impl InvoiceLineItem {
    pub fn new(description: impl Into<String>, quantity: f64, unit_price: f64) -> Self {
        Self {
            description: description.into(),
            quantity,
            unit_price,
        }
    }

    pub fn line_total(&self) -> f64 {
        self.quantity * self.unit_price
    }

    /// A row survives a save only with a description, a positive quantity and
    /// a non-negative unit price.
    pub fn is_valid(&self) -> bool {
        !self.description.is_empty() && self.quantity > 0.0 && self.unit_price >= 0.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: String,
    pub client: String,
    pub amount: f64,
    pub status: InvoiceStatus,
    pub date: NaiveDate,
    pub due_date: NaiveDate,
    pub items: Vec<InvoiceLineItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_initiated_at: Option<DateTime<Utc>>,
}

impl Invoice {
    pub fn display_status(&self) -> DisplayStatus {
        self.status.display()
    }
}

/// Validated form output handed to the store; never carries an id, status or
/// timestamps.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceDraft {
    pub client: String,
    pub items: Vec<InvoiceLineItem>,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum InvoiceError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Payment error: {0}")]
    Payment(String),
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn subtotal(items: &[InvoiceLineItem]) -> f64 {
    items.iter().map(InvoiceLineItem::line_total).sum()
}

pub fn tax(items: &[InvoiceLineItem]) -> f64 {
    subtotal(items) * TAX_RATE
}

/// Tax-inclusive total, rounded to 2 decimal places. Empty input yields 0.
pub fn compute_total(items: &[InvoiceLineItem]) -> f64 {
    let subtotal = subtotal(items);
    round2(subtotal + subtotal * TAX_RATE)
}

/// Next id in the `QP-<n>` sequence: one past the highest numeric suffix in
/// the collection, never below QP-2045. Ids that do not match the pattern are
/// ignored.
pub fn next_invoice_id(existing: &[Invoice]) -> String {
    let max = existing
        .iter()
        .filter_map(|inv| {
            INVOICE_ID_RE
                .captures(&inv.id)
                .and_then(|c| c.get(1))
                .and_then(|m| m.as_str().parse::<u64>().ok())
        })
        .fold(INVOICE_NUMBER_BASE, u64::max);
    format!("{}-{}", INVOICE_PREFIX, max + 1)
}

/// `KSh 1,240.00` display form used in notification copy.
pub fn format_kes(amount: f64) -> String {
    let rounded = round2(amount);
    let whole = rounded.trunc().abs() as u64;
    let cents = (rounded.fract().abs() * 100.0).round() as u64;
    let mut grouped = String::new();
    let digits = whole.to_string();
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if rounded < 0.0 { "-" } else { "" };
    format!("KSh {}{}.{:02}", sign, grouped, cents)
}

/// Starter dataset matching what the dashboard ships with.
pub fn seed_invoices() -> Vec<Invoice> {
    let mut invoices = vec![
        seed(
            "QP-2045",
            "Acme Ltd",
            1240.00,
            InvoiceStatus::Paid,
            "2026-01-10",
            "2026-02-10",
            vec![
                InvoiceLineItem::new("Website Redesign", 1.0, 1000.0),
                InvoiceLineItem::new("Hosting (1 year)", 1.0, 240.0),
            ],
        ),
        seed(
            "QP-2046",
            "BlueTech",
            620.00,
            InvoiceStatus::Pending,
            "2026-01-12",
            "2026-02-12",
            vec![
                InvoiceLineItem::new("Mobile App Development", 1.0, 500.0),
                InvoiceLineItem::new("API Integration", 1.0, 120.0),
            ],
        ),
        seed(
            "QP-2047",
            "Nova Corp",
            980.00,
            InvoiceStatus::Overdue,
            "2026-01-14",
            "2026-01-31",
            vec![
                InvoiceLineItem::new("E-commerce Setup", 1.0, 800.0),
                InvoiceLineItem::new("Payment Gateway", 1.0, 180.0),
            ],
        ),
    ];

    let statuses = [
        InvoiceStatus::Paid,
        InvoiceStatus::Pending,
        InvoiceStatus::Overdue,
    ];
    for i in 0..15u32 {
        let day = 15 + (i % 15);
        // Day 29 overflows February; roll into March like the source data did.
        let due = NaiveDate::from_ymd_opt(2026, 2, day)
            .unwrap_or_else(|| NaiveDate::from_ymd_opt(2026, 3, 1).expect("seed due date"));
        invoices.push(seed_with_dates(
            &format!("QP-{}", 2048 + i),
            &format!("Client {}", i + 1),
            500.0 + f64::from(i) * 100.0,
            statuses[(i % 3) as usize],
            NaiveDate::from_ymd_opt(2026, 1, day).expect("seed date"),
            due,
            vec![
                InvoiceLineItem::new(
                    format!("Service {}", i + 1),
                    1.0,
                    400.0 + f64::from(i) * 50.0,
                ),
                InvoiceLineItem::new(
                    format!("Additional Service {}", i + 1),
                    1.0,
                    100.0 + f64::from(i) * 10.0,
                ),
            ],
        ));
    }
    invoices
}

fn seed(
    id: &str,
    client: &str,
    amount: f64,
    status: InvoiceStatus,
    date: &str,
    due_date: &str,
    items: Vec<InvoiceLineItem>,
) -> Invoice {
    seed_with_dates(
        id,
        client,
        amount,
        status,
        date.parse().expect("seed date"),
        due_date.parse().expect("seed due date"),
        items,
    )
}

fn seed_with_dates(
    id: &str,
    client: &str,
    amount: f64,
    status: InvoiceStatus,
    date: NaiveDate,
    due_date: NaiveDate,
    items: Vec<InvoiceLineItem>,
) -> Invoice {
    Invoice {
        id: id.to_string(),
        client: client.to_string(),
        amount,
        status,
        date,
        due_date,
        items,
        notes: None,
        created_at: None,
        updated_at: None,
        paid_at: None,
        payment_initiated_at: None,
    }
}

/// Aggregates for the dashboard header cards.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceStats {
    pub total_invoices: usize,
    pub total_revenue: f64,
    pub pending_amount: f64,
    pub overdue_amount: f64,
    pub paid_count: usize,
    pub pending_count: usize,
    pub overdue_count: usize,
}

pub fn compute_stats(invoices: &[Invoice]) -> InvoiceStats {
    let mut stats = InvoiceStats {
        total_invoices: invoices.len(),
        total_revenue: 0.0,
        pending_amount: 0.0,
        overdue_amount: 0.0,
        paid_count: 0,
        pending_count: 0,
        overdue_count: 0,
    };
    for invoice in invoices {
        match invoice.display_status() {
            DisplayStatus::Paid => {
                stats.paid_count += 1;
                stats.total_revenue += invoice.amount;
            }
            DisplayStatus::Pending => {
                stats.pending_count += 1;
                stats.pending_amount += invoice.amount;
            }
            DisplayStatus::Overdue => {
                stats.overdue_count += 1;
                stats.overdue_amount += invoice.amount;
            }
        }
    }
    stats.total_revenue = round2(stats.total_revenue);
    stats.pending_amount = round2(stats.pending_amount);
    stats.overdue_amount = round2(stats.overdue_amount);
    stats
}
