use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use tokio::sync::RwLock;

use super::view::{derive_page, ListPage, ListQuery, SortKey, StatusFilter};
use super::{
    compute_stats, compute_total, next_invoice_id, Invoice, InvoiceDraft, InvoiceError,
    InvoiceLineItem, InvoiceStats, InvoiceStatus,
};
use crate::payments::stk::{StkClient, StkPushRequest, StkPushResponse};

/// Partial update accepted by `InvoiceStore::update`. `amount` is absent on
/// purpose: it is derived state and gets recomputed whenever `items` change.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoicePatch {
    pub client: Option<String>,
    pub items: Option<Vec<InvoiceLineItem>>,
    pub due_date: Option<NaiveDate>,
    pub status: Option<InvoiceStatus>,
    pub notes: Option<String>,
}

impl InvoicePatch {
    fn is_empty(&self) -> bool {
        self.client.is_none()
            && self.items.is_none()
            && self.due_date.is_none()
            && self.status.is_none()
            && self.notes.is_none()
    }
}

/// Records the state a payment transition started from so the failure path
/// has an explicit compensating action instead of an ad-hoc overwrite.
#[derive(Debug, Clone)]
struct PaymentGuard {
    invoice_id: String,
    prior_status: InvoiceStatus,
}

#[derive(Debug)]
struct StoreState {
    invoices: Vec<Invoice>,
    selected: Option<Invoice>,
    payment_target: Option<Invoice>,
    query: ListQuery,
    loading: bool,
    error: Option<String>,
}

/// Single source of truth for the invoice collection and every view derived
/// from it. Consumers get snapshots; the store refreshes its own copies
/// (selection, payment target) on each mutation.
pub struct InvoiceStore {
    stk: StkClient,
    state: RwLock<StoreState>,
}

impl InvoiceStore {
    pub fn new(stk: StkClient) -> Self {
        Self::with_invoices(stk, Vec::new())
    }

    pub fn with_invoices(stk: StkClient, invoices: Vec<Invoice>) -> Self {
        Self {
            stk,
            state: RwLock::new(StoreState {
                invoices,
                selected: None,
                payment_target: None,
                query: ListQuery::default(),
                loading: false,
                error: None,
            }),
        }
    }

    pub async fn invoices(&self) -> Vec<Invoice> {
        self.state.read().await.invoices.clone()
    }

    pub async fn get(&self, id: &str) -> Option<Invoice> {
        let state = self.state.read().await;
        state.invoices.iter().find(|inv| inv.id == id).cloned()
    }

    pub async fn selected(&self) -> Option<Invoice> {
        self.state.read().await.selected.clone()
    }

    pub async fn payment_target(&self) -> Option<Invoice> {
        self.state.read().await.payment_target.clone()
    }

    pub async fn loading(&self) -> bool {
        self.state.read().await.loading
    }

    pub async fn last_error(&self) -> Option<String> {
        self.state.read().await.error.clone()
    }

    pub async fn stats(&self) -> InvoiceStats {
        compute_stats(&self.state.read().await.invoices)
    }

    /// Validates the draft, assigns the next id and prepends the invoice to
    /// the collection. New invoices always start out pending, dated today.
    pub async fn create(&self, draft: InvoiceDraft) -> Result<Invoice, InvoiceError> {
        let today = Utc::now().date_naive();
        if draft.due_date < today {
            return Err(InvoiceError::Validation(
                "Due date cannot be in the past".to_string(),
            ));
        }
        let items: Vec<InvoiceLineItem> = draft
            .items
            .into_iter()
            .filter(|item| item.is_valid())
            .collect();
        if items.is_empty() {
            return Err(InvoiceError::Validation(
                "Invoice needs at least one valid item".to_string(),
            ));
        }
        if draft.client.trim().is_empty() {
            return Err(InvoiceError::Validation(
                "Client name is required".to_string(),
            ));
        }

        let mut state = self.state.write().await;
        let now = Utc::now();
        let invoice = Invoice {
            id: next_invoice_id(&state.invoices),
            client: draft.client.trim().to_string(),
            amount: compute_total(&items),
            status: InvoiceStatus::Pending,
            date: today,
            due_date: draft.due_date,
            items,
            notes: draft.notes,
            created_at: Some(now),
            updated_at: Some(now),
            paid_at: None,
            payment_initiated_at: None,
        };
        state.invoices.insert(0, invoice.clone());
        state.query.page = 1;
        Ok(invoice)
    }

    /// Merges the patch into the stored invoice. Changing `items` recomputes
    /// `amount`; every update restamps `updated_at` and refreshes any views
    /// holding a copy of this invoice.
    pub async fn update(&self, id: &str, patch: InvoicePatch) -> Result<Invoice, InvoiceError> {
        let mut state = self.state.write().await;
        let Some(index) = state.invoices.iter().position(|inv| inv.id == id) else {
            let message = format!("Invoice {id} not found");
            state.error = Some(message.clone());
            return Err(InvoiceError::NotFound(message));
        };
        if patch.is_empty() {
            return Ok(state.invoices[index].clone());
        }

        let invoice = &mut state.invoices[index];
        if let Some(client) = patch.client {
            invoice.client = client;
        }
        if let Some(items) = patch.items {
            invoice.amount = compute_total(&items);
            invoice.items = items;
        }
        if let Some(due_date) = patch.due_date {
            invoice.due_date = due_date;
        }
        if let Some(status) = patch.status {
            invoice.status = status;
        }
        if let Some(notes) = patch.notes {
            invoice.notes = if notes.is_empty() { None } else { Some(notes) };
        }
        invoice.updated_at = Some(Utc::now());

        let updated = invoice.clone();
        Self::refresh_views(&mut state, &updated);
        Ok(updated)
    }

    /// Removes the invoice and clears every view that referenced it; the
    /// list jumps back to the first page.
    pub async fn delete(&self, id: &str) -> Result<(), InvoiceError> {
        let mut state = self.state.write().await;
        let before = state.invoices.len();
        state.invoices.retain(|inv| inv.id != id);
        if state.invoices.len() == before {
            let message = format!("Invoice {id} not found");
            state.error = Some(message.clone());
            return Err(InvoiceError::NotFound(message));
        }
        if state.selected.as_ref().is_some_and(|inv| inv.id == id) {
            state.selected = None;
        }
        if state.payment_target.as_ref().is_some_and(|inv| inv.id == id) {
            state.payment_target = None;
        }
        state.query.page = 1;
        Ok(())
    }

    pub async fn select(&self, invoice: Option<Invoice>) {
        self.state.write().await.selected = invoice;
    }

    /// Opens the payment modal for a non-paid invoice.
    pub async fn open_payment(&self, id: &str) -> Result<Invoice, InvoiceError> {
        let mut state = self.state.write().await;
        let Some(invoice) = state.invoices.iter().find(|inv| inv.id == id).cloned() else {
            return Err(InvoiceError::NotFound(format!("Invoice {id} not found")));
        };
        if invoice.status == InvoiceStatus::Paid {
            return Err(InvoiceError::Payment(
                "Invoice is already paid".to_string(),
            ));
        }
        state.payment_target = Some(invoice.clone());
        Ok(invoice)
    }

    pub async fn close_payment(&self) {
        self.state.write().await.payment_target = None;
    }

    // --- list controls -----------------------------------------------------

    pub async fn set_search(&self, search: impl Into<String>) {
        let mut state = self.state.write().await;
        state.query.search = search.into();
        state.query.page = 1;
    }

    pub async fn set_status_filter(&self, status: StatusFilter) {
        let mut state = self.state.write().await;
        state.query.status = status;
        state.query.page = 1;
    }

    pub async fn set_sort(&self, sort: SortKey) {
        self.state.write().await.query.sort = sort;
    }

    pub async fn set_page(&self, page: usize) {
        self.state.write().await.query.page = page.max(1);
    }

    pub async fn query(&self) -> ListQuery {
        self.state.read().await.query.clone()
    }

    /// Current page of the list under the stored controls.
    pub async fn page(&self) -> ListPage {
        let state = self.state.read().await;
        derive_page(&state.invoices, &state.query)
    }

    /// One-off derivation under caller-supplied controls; leaves the stored
    /// query untouched.
    pub async fn page_for(&self, query: &ListQuery) -> ListPage {
        derive_page(&self.state.read().await.invoices, query)
    }

    // --- payment orchestration ---------------------------------------------

    /// Initiates collection on an invoice. The invoice moves to `processing`
    /// before the gateway call; on acknowledgement it parks in
    /// `pending_payment` until the out-of-band confirmation arrives, and on
    /// any failure the guard's compensating transition marks it `failed`.
    pub async fn process_payment(
        &self,
        id: &str,
        phone: Option<&str>,
    ) -> Result<StkPushResponse, InvoiceError> {
        let (guard, request) = {
            let mut state = self.state.write().await;
            state.loading = true;
            state.error = None;
            let Some(index) = state.invoices.iter().position(|inv| inv.id == id) else {
                let message = format!("Invoice {id} not found");
                state.error = Some(message.clone());
                state.loading = false;
                return Err(InvoiceError::NotFound(message));
            };
            if state.invoices[index].status == InvoiceStatus::Paid {
                state.loading = false;
                return Err(InvoiceError::Payment(
                    "Invoice is already paid".to_string(),
                ));
            }
            let guard = PaymentGuard {
                invoice_id: id.to_string(),
                prior_status: state.invoices[index].status,
            };
            let invoice = &mut state.invoices[index];
            invoice.status = InvoiceStatus::Processing;
            invoice.updated_at = Some(Utc::now());
            let request = StkPushRequest {
                invoice_id: invoice.id.clone(),
                amount: invoice.amount,
                phone: phone.map(str::to_string),
                account: None,
            };
            let updated = state.invoices[index].clone();
            Self::refresh_views(&mut state, &updated);
            (guard, request)
        };

        match self.stk.initiate(&request).await {
            Ok(ack) => {
                let mut state = self.state.write().await;
                if let Some(invoice) =
                    state.invoices.iter_mut().find(|inv| inv.id == guard.invoice_id)
                {
                    let now = Utc::now();
                    invoice.status = InvoiceStatus::PendingPayment;
                    invoice.payment_initiated_at = Some(now);
                    invoice.updated_at = Some(now);
                    let updated = invoice.clone();
                    Self::refresh_views(&mut state, &updated);
                }
                state.loading = false;
                Ok(ack)
            }
            Err(err) => {
                let message = err.to_string();
                self.fail_payment(&guard, &message).await;
                Err(InvoiceError::Payment(message))
            }
        }
    }

    /// Out-of-band confirmation hook: funds arrived, the invoice is settled.
    pub async fn mark_paid(&self, id: &str) -> Result<Invoice, InvoiceError> {
        let mut state = self.state.write().await;
        let Some(invoice) = state.invoices.iter_mut().find(|inv| inv.id == id) else {
            return Err(InvoiceError::NotFound(format!("Invoice {id} not found")));
        };
        let now = Utc::now();
        invoice.status = InvoiceStatus::Paid;
        invoice.paid_at = Some(now);
        invoice.updated_at = Some(now);
        let updated = invoice.clone();
        Self::refresh_views(&mut state, &updated);
        Ok(updated)
    }

    /// Compensating transition for a payment that did not go through. The
    /// invoice may have been deleted while the call was in flight; that case
    /// is a defensive no-op.
    async fn fail_payment(&self, guard: &PaymentGuard, message: &str) {
        let mut state = self.state.write().await;
        log::warn!(
            "payment for {} failed (was {:?}): {}",
            guard.invoice_id,
            guard.prior_status,
            message
        );
        if let Some(invoice) = state
            .invoices
            .iter_mut()
            .find(|inv| inv.id == guard.invoice_id)
        {
            invoice.status = InvoiceStatus::Failed;
            invoice.updated_at = Some(Utc::now());
            let updated = invoice.clone();
            Self::refresh_views(&mut state, &updated);
        }
        state.error = Some(message.to_string());
        state.loading = false;
    }

    /// Views hold copies, not live references; sync them after any mutation.
    fn refresh_views(state: &mut StoreState, updated: &Invoice) {
        if state
            .selected
            .as_ref()
            .is_some_and(|inv| inv.id == updated.id)
        {
            state.selected = Some(updated.clone());
        }
        if state
            .payment_target
            .as_ref()
            .is_some_and(|inv| inv.id == updated.id)
        {
            state.payment_target = Some(updated.clone());
        }
    }
}
