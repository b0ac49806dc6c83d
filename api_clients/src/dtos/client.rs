use api_invoices::dtos::invoice::InvoiceView;
use db::models::client::Client;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct CreateClientRequest {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct ClientDetail {
    #[serde(flatten)]
    pub client: Client,
    pub invoices: Vec<InvoiceView>,
}
