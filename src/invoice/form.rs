use chrono::{NaiveDate, Utc};

use super::{compute_total, round2, subtotal, Invoice, InvoiceDraft, InvoiceLineItem, TAX_RATE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormStep {
    Details,
    Preview,
}

#[derive(Debug, thiserror::Error)]
pub enum FormError {
    #[error("Client name is required")]
    ClientRequired,
    #[error("Due date is required")]
    DueDateRequired,
    #[error("Due date cannot be in the past")]
    DueDateInPast,
    #[error("Invoice needs at least one valid item")]
    NoValidItems,
    #[error("Invoice must be reviewed before saving")]
    NotReviewed,
}

/// Two-step invoice editor: collect details, review the computed totals, then
/// produce a draft. Dropping the form discards everything.
#[derive(Debug, Clone)]
pub struct InvoiceForm {
    pub client_name: String,
    pub due_date: Option<NaiveDate>,
    pub items: Vec<InvoiceLineItem>,
    pub notes: String,
    step: FormStep,
}

impl Default for InvoiceForm {
    fn default() -> Self {
        Self::new()
    }
}

impl InvoiceForm {
    pub fn new() -> Self {
        Self {
            client_name: String::new(),
            due_date: None,
            items: vec![InvoiceLineItem::new("", 1.0, 0.0)],
            notes: String::new(),
            step: FormStep::Details,
        }
    }

    /// Pre-populates every field from an existing invoice for editing.
    pub fn for_invoice(invoice: &Invoice) -> Self {
        let items = if invoice.items.is_empty() {
            vec![InvoiceLineItem::new("", 1.0, 0.0)]
        } else {
            invoice.items.clone()
        };
        Self {
            client_name: invoice.client.clone(),
            due_date: Some(invoice.due_date),
            items,
            notes: invoice.notes.clone().unwrap_or_default(),
            step: FormStep::Details,
        }
    }

    pub fn step(&self) -> FormStep {
        self.step
    }

    pub fn add_item(&mut self) {
        self.items.push(InvoiceLineItem::new("", 1.0, 0.0));
    }

    /// Removing the last remaining row is a no-op; the form always keeps at
    /// least one row on screen.
    pub fn remove_item(&mut self, index: usize) {
        if self.items.len() > 1 && index < self.items.len() {
            self.items.remove(index);
        }
    }

    pub fn set_item(&mut self, index: usize, item: InvoiceLineItem) {
        if let Some(slot) = self.items.get_mut(index) {
            *slot = item;
        }
    }

    pub fn subtotal(&self) -> f64 {
        subtotal(&self.items)
    }

    pub fn tax(&self) -> f64 {
        round2(self.subtotal() * TAX_RATE)
    }

    pub fn total(&self) -> f64 {
        compute_total(&self.items)
    }

    /// Required-field validation only; cross-field checks stay out of the
    /// details step.
    pub fn continue_to_preview(&mut self) -> Result<(), FormError> {
        if self.client_name.trim().is_empty() {
            return Err(FormError::ClientRequired);
        }
        let due_date = self.due_date.ok_or(FormError::DueDateRequired)?;
        if due_date < Utc::now().date_naive() {
            return Err(FormError::DueDateInPast);
        }
        self.step = FormStep::Preview;
        Ok(())
    }

    /// Back to editing with all entered state intact.
    pub fn back_to_details(&mut self) {
        self.step = FormStep::Details;
    }

    /// Finishes the wizard. Only rows with a description, positive quantity
    /// and non-negative price make it into the draft; a save that would end
    /// up with zero items is rejected outright.
    pub fn finish(&self) -> Result<InvoiceDraft, FormError> {
        if self.step != FormStep::Preview {
            return Err(FormError::NotReviewed);
        }
        let items: Vec<InvoiceLineItem> = self
            .items
            .iter()
            .filter(|item| item.is_valid())
            .cloned()
            .collect();
        if items.is_empty() {
            return Err(FormError::NoValidItems);
        }
        let notes = self.notes.trim();
        Ok(InvoiceDraft {
            client: self.client_name.trim().to_string(),
            items,
            due_date: self.due_date.ok_or(FormError::DueDateRequired)?,
            notes: if notes.is_empty() {
                None
            } else {
                Some(notes.to_string())
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn tomorrow() -> NaiveDate {
        Utc::now().date_naive() + Duration::days(1)
    }

    fn filled_form() -> InvoiceForm {
        let mut form = InvoiceForm::new();
        form.client_name = "Acme Ltd".to_string();
        form.due_date = Some(tomorrow());
        form.set_item(0, InvoiceLineItem::new("Design work", 2.0, 100.0));
        form
    }

    #[test]
    fn test_new_form_has_one_empty_row() {
        let form = InvoiceForm::new();
        assert_eq!(form.items.len(), 1);
        assert_eq!(form.step(), FormStep::Details);
    }

    #[test]
    fn test_remove_item_noop_when_single_row() {
        let mut form = InvoiceForm::new();
        form.remove_item(0);
        assert_eq!(form.items.len(), 1);

        form.add_item();
        form.remove_item(0);
        assert_eq!(form.items.len(), 1);
    }

    #[test]
    fn test_continue_requires_client_and_due_date() {
        let mut form = InvoiceForm::new();
        assert!(matches!(
            form.continue_to_preview(),
            Err(FormError::ClientRequired)
        ));

        form.client_name = "Acme Ltd".to_string();
        assert!(matches!(
            form.continue_to_preview(),
            Err(FormError::DueDateRequired)
        ));

        form.due_date = Some(Utc::now().date_naive() - Duration::days(1));
        assert!(matches!(
            form.continue_to_preview(),
            Err(FormError::DueDateInPast)
        ));

        form.due_date = Some(tomorrow());
        assert!(form.continue_to_preview().is_ok());
        assert_eq!(form.step(), FormStep::Preview);
    }

    #[test]
    fn test_due_today_is_allowed() {
        let mut form = filled_form();
        form.due_date = Some(Utc::now().date_naive());
        assert!(form.continue_to_preview().is_ok());
    }

    #[test]
    fn test_finish_requires_preview_step() {
        let form = filled_form();
        assert!(matches!(form.finish(), Err(FormError::NotReviewed)));
    }

    #[test]
    fn test_back_preserves_entered_state() {
        let mut form = filled_form();
        form.notes = "net 30".to_string();
        form.continue_to_preview().unwrap();
        form.back_to_details();
        assert_eq!(form.step(), FormStep::Details);
        assert_eq!(form.client_name, "Acme Ltd");
        assert_eq!(form.notes, "net 30");
        assert_eq!(form.items.len(), 1);
    }

    #[test]
    fn test_finish_filters_invalid_rows() {
        let mut form = filled_form();
        form.add_item();
        form.set_item(1, InvoiceLineItem::new("", 1.0, 50.0));
        form.add_item();
        form.set_item(2, InvoiceLineItem::new("Zero qty", 0.0, 50.0));
        form.continue_to_preview().unwrap();

        let draft = form.finish().unwrap();
        assert_eq!(draft.items.len(), 1);
        assert_eq!(draft.items[0].description, "Design work");
    }

    #[test]
    fn test_finish_rejects_when_all_rows_invalid() {
        let mut form = InvoiceForm::new();
        form.client_name = "Acme Ltd".to_string();
        form.due_date = Some(tomorrow());
        form.continue_to_preview().unwrap();
        assert!(matches!(form.finish(), Err(FormError::NoValidItems)));
    }

    #[test]
    fn test_preview_totals() {
        let form = filled_form();
        assert_eq!(form.subtotal(), 200.0);
        assert_eq!(form.tax(), 32.0);
        assert_eq!(form.total(), 232.0);
    }

    #[test]
    fn test_for_invoice_prefills_fields() {
        let invoice = &crate::invoice::seed_invoices()[0];
        let form = InvoiceForm::for_invoice(invoice);
        assert_eq!(form.client_name, "Acme Ltd");
        assert_eq!(form.due_date, Some(invoice.due_date));
        assert_eq!(form.items.len(), 2);
    }

    #[test]
    fn test_finish_trims_and_drops_empty_notes() {
        let mut form = filled_form();
        form.notes = "   ".to_string();
        form.continue_to_preview().unwrap();
        assert_eq!(form.finish().unwrap().notes, None);

        form.notes = " urgent ".to_string();
        assert_eq!(form.finish().unwrap().notes.as_deref(), Some("urgent"));
    }
}
