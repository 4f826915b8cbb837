use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub mod stk;

/// Simulated gateway latency used by the demo settle path.
const MOCK_PROCESSING_DELAY: Duration = Duration::from_secs(2);

/// Share of demo payments that succeed.
const MOCK_SUCCESS_RATE: f64 = 0.8;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Card,
    Mpesa,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStage {
    Method,
    Details,
    Processing,
    Success,
    Error,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardDetails {
    pub number: String,
    pub name: String,
    pub expiry: String,
    pub cvv: String,
}

#[derive(Debug, thiserror::Error)]
pub enum PaymentFlowError {
    #[error("Select a payment method first")]
    NoMethodSelected,
    #[error("Payment details are incomplete")]
    IncompleteDetails,
    #[error("Payment is not being processed")]
    NotProcessing,
}

/// Modal-side state machine for collecting payment details. The store owns
/// the authoritative status transition; this type only walks the user
/// through method selection, detail entry and the terminal screens.
#[derive(Debug, Clone)]
pub struct PaymentFlow {
    pub invoice_id: String,
    pub amount: f64,
    stage: PaymentStage,
    method: Option<PaymentMethod>,
    pub card: CardDetails,
    pub phone: String,
}

impl PaymentFlow {
    pub fn new(invoice_id: impl Into<String>, amount: f64) -> Self {
        Self {
            invoice_id: invoice_id.into(),
            amount,
            stage: PaymentStage::Method,
            method: None,
            card: CardDetails::default(),
            phone: String::new(),
        }
    }

    pub fn stage(&self) -> PaymentStage {
        self.stage
    }

    pub fn method(&self) -> Option<PaymentMethod> {
        self.method
    }

    pub fn select_method(&mut self, method: PaymentMethod) {
        self.method = Some(method);
    }

    pub fn continue_to_details(&mut self) -> Result<(), PaymentFlowError> {
        if self.method.is_none() {
            return Err(PaymentFlowError::NoMethodSelected);
        }
        self.stage = PaymentStage::Details;
        Ok(())
    }

    pub fn back_to_method(&mut self) {
        self.stage = PaymentStage::Method;
    }

    pub fn set_card_number(&mut self, raw: &str) {
        self.card.number = format_card_number(raw);
    }

    pub fn set_card_expiry(&mut self, raw: &str) {
        self.card.expiry = format_expiry(raw);
    }

    pub fn set_phone(&mut self, raw: &str) {
        self.phone = normalize_phone(raw);
    }

    /// Moves to the processing screen once the selected method has the
    /// details it needs.
    pub fn submit(&mut self) -> Result<(), PaymentFlowError> {
        let complete = match self.method {
            Some(PaymentMethod::Mpesa) => !self.phone.is_empty(),
            Some(PaymentMethod::Card) => {
                !self.card.number.is_empty()
                    && !self.card.name.is_empty()
                    && !self.card.expiry.is_empty()
                    && !self.card.cvv.is_empty()
            }
            None => return Err(PaymentFlowError::NoMethodSelected),
        };
        if !complete {
            return Err(PaymentFlowError::IncompleteDetails);
        }
        self.stage = PaymentStage::Processing;
        Ok(())
    }

    pub fn resolve(&mut self, success: bool) -> Result<(), PaymentFlowError> {
        if self.stage != PaymentStage::Processing {
            return Err(PaymentFlowError::NotProcessing);
        }
        self.stage = if success {
            PaymentStage::Success
        } else {
            PaymentStage::Error
        };
        Ok(())
    }

    /// "Try again" from the failure screen restarts at method selection.
    pub fn retry(&mut self) {
        self.stage = PaymentStage::Method;
    }

    /// Demo settle used by the invoice-list modal: fixed delay, then roughly
    /// four out of five attempts succeed. Not the authoritative flow and
    /// never touches the gateway.
    pub async fn settle_mock<R: Rng>(&mut self, rng: &mut R) -> Result<bool, PaymentFlowError> {
        if self.stage != PaymentStage::Processing {
            return Err(PaymentFlowError::NotProcessing);
        }
        tokio::time::sleep(MOCK_PROCESSING_DELAY).await;
        let success = rng.gen::<f64>() < MOCK_SUCCESS_RATE;
        self.resolve(success)?;
        Ok(success)
    }
}

/// Digits grouped in fours, capped at 19 characters (16 digits + 3 spaces).
pub fn format_card_number(raw: &str) -> String {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    let mut out = String::new();
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && i % 4 == 0 {
            out.push(' ');
        }
        out.push(ch);
    }
    out.truncate(19);
    out
}

/// `MMYY` digits forced into `MM/YY`.
pub fn format_expiry(raw: &str) -> String {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    let mut out = String::new();
    for (i, ch) in digits.chars().enumerate() {
        if i == 2 {
            out.push('/');
        }
        out.push(ch);
    }
    out.truncate(5);
    out
}

/// Normalizes Kenyan MSISDNs to the `254...` form the gateway expects.
/// Leading `0` or bare `7` numbers get the country code prepended.
pub fn normalize_phone(raw: &str) -> String {
    let digits: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit())
        .take(12)
        .collect();
    if let Some(rest) = digits.strip_prefix('0') {
        format!("254{rest}")
    } else if digits.starts_with('7') {
        format!("254{digits}")
    } else {
        digits
    }
}
