use serde::{Deserialize, Serialize};

use crate::invoice::Invoice;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClientContact {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientRecord {
    pub name: String,
    pub email: Option<String>,
    pub total_invoices: usize,
}

pub fn seed_contacts() -> Vec<ClientContact> {
    vec![
        contact("Acme Ltd", "contact@acme.com"),
        contact("BlueTech", "hello@bluetech.com"),
        contact("Nova Corp", "info@nova.com"),
    ]
}

fn contact(name: &str, email: &str) -> ClientContact {
    ClientContact {
        name: name.to_string(),
        email: email.to_string(),
    }
}

/// Known contacts first, then any client that only exists on invoices.
/// Counts always come from the live collection.
pub fn directory(contacts: &[ClientContact], invoices: &[Invoice]) -> Vec<ClientRecord> {
    let mut records: Vec<ClientRecord> = contacts
        .iter()
        .map(|c| ClientRecord {
            name: c.name.clone(),
            email: Some(c.email.clone()),
            total_invoices: invoices.iter().filter(|inv| inv.client == c.name).count(),
        })
        .collect();

    for invoice in invoices {
        if !records.iter().any(|r| r.name == invoice.client) {
            records.push(ClientRecord {
                name: invoice.client.clone(),
                email: None,
                total_invoices: invoices
                    .iter()
                    .filter(|inv| inv.client == invoice.client)
                    .count(),
            });
        }
    }
    records
}
