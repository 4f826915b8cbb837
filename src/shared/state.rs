use crate::account::AccountService;
use crate::clients::ClientContact;
use crate::config::AppConfig;
use crate::invoice::store::InvoiceStore;
use crate::invoice::{seed_invoices, Invoice};
use crate::payments::stk::StkClient;

/// Everything the handlers need, injected once at startup. No globals: the
/// whole application state travels through the router as an `Arc<AppState>`.
pub struct AppState {
    pub config: AppConfig,
    pub store: InvoiceStore,
    pub account: AccountService,
    pub client_contacts: Vec<ClientContact>,
}

impl AppState {
    /// Production wiring: seeded collection, gateway client pointed at the
    /// configured STK base URL.
    pub fn new(config: AppConfig) -> Self {
        let stk = StkClient::new(config.payments.stk_base_url.clone());
        Self {
            store: InvoiceStore::with_invoices(stk, seed_invoices()),
            account: AccountService::new(),
            client_contacts: crate::clients::seed_contacts(),
            config,
        }
    }

    /// Test wiring with explicit invoices and gateway URL.
    pub fn with_invoices(config: AppConfig, stk_base_url: &str, invoices: Vec<Invoice>) -> Self {
        Self {
            store: InvoiceStore::with_invoices(StkClient::new(stk_base_url), invoices),
            account: AccountService::new(),
            client_contacts: crate::clients::seed_contacts(),
            config,
        }
    }
}
