use api_invoices::dtos::invoice::InvoiceView;
use chrono::Utc;
use common::error::{AppError, Res};
use db::{
    dtos::{client::ClientCreateRequest, invoice::InvoiceFilter},
    models::client::{Client, ClientWithCount},
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::dtos::client::{ClientDetail, CreateClientRequest};

/// Trims the form and lowercases the email. Fails on a blank name or an
/// unparseable address.
pub fn validate_client(req: &CreateClientRequest) -> Res<(String, String)> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("Client name is required".to_string()));
    }
    let email = req.email.trim().to_lowercase();
    email
        .parse::<lettre::Address>()
        .map_err(|_| AppError::BadRequest("A valid client email is required".to_string()))?;
    Ok((name.to_string(), email))
}

pub async fn create_client(pool: &PgPool, user_id: Uuid, req: &CreateClientRequest) -> Res<Client> {
    let (name, email) = validate_client(req)?;
    let client = db::client::insert_client(pool, ClientCreateRequest { user_id, name, email }).await?;
    log::info!("Created client {} for user {}", client.id, user_id);
    Ok(client)
}

pub async fn list_clients(pool: &PgPool, user_id: Uuid) -> Res<Vec<ClientWithCount>> {
    db::client::get_clients_with_counts(pool, user_id).await
}

pub async fn get_client_detail(pool: &PgPool, user_id: Uuid, client_id: Uuid) -> Res<ClientDetail> {
    let client = db::client::get_client_for_user(pool, user_id, client_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Client not found".to_string()))?;
    let invoices = db::invoice::get_invoices_for_user(
        pool,
        user_id,
        InvoiceFilter {
            client_id: Some(client_id),
            limit: None,
        },
    )
    .await?;

    let now = Utc::now().naive_utc();
    Ok(ClientDetail {
        client,
        invoices: invoices.iter().map(|i| InvoiceView::new(i, now)).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(name: &str, email: &str) -> CreateClientRequest {
        CreateClientRequest {
            name: name.to_string(),
            email: email.to_string(),
        }
    }

    #[test]
    fn client_form_is_trimmed_and_normalized() {
        let (name, email) = validate_client(&req("  Acme Corp ", " Billing@Acme.TEST ")).unwrap();
        assert_eq!(name, "Acme Corp");
        assert_eq!(email, "billing@acme.test");
    }

    #[test]
    fn blank_name_is_rejected() {
        assert!(matches!(
            validate_client(&req("   ", "billing@acme.test")),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn malformed_email_is_rejected() {
        assert!(validate_client(&req("Acme", "billing-at-acme")).is_err());
        assert!(validate_client(&req("Acme", "")).is_err());
    }
}
