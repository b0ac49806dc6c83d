//! Query-level checks against a live Postgres.
//!
//! Run with `DATABASE_URL=postgres://… cargo test -p db -- --ignored`.

use chrono::{Duration, Utc};
use common::misc::EmailSendOption;
use db::{
    dtos::{client::ClientCreateRequest, invoice::InvoiceCreateRequest, user::UserCreateRequest},
    models::{client::Client, invoice::Invoice, user::User},
};
use sqlx::PgPool;

async fn seed_user(pool: &PgPool, email: &str) -> User {
    db::user::insert_user(
        pool,
        UserCreateRequest {
            name: "Freelancer".to_string(),
            email: email.to_string(),
        },
    )
    .await
    .unwrap()
}

async fn seed_client(pool: &PgPool, user: &User) -> Client {
    db::client::insert_client(
        pool,
        ClientCreateRequest {
            user_id: user.id,
            name: "Acme".to_string(),
            email: "billing@acme.test".to_string(),
        },
    )
    .await
    .unwrap()
}

async fn seed_invoice(pool: &PgPool, user: &User, client: &Client) -> Invoice {
    let now = Utc::now().naive_utc();
    db::invoice::insert_invoice(
        pool,
        InvoiceCreateRequest {
            user_id: user.id,
            client_id: client.id,
            amount: 100.0,
            due_date: now + Duration::days(14),
            notes: None,
            logo: None,
            line_items: None,
            tax_rate: 0.0,
            discount: 0.0,
            shipping: 0.0,
            email_send_option: EmailSendOption::Schedule,
            email_scheduled_at: Some(now - Duration::minutes(1)),
        },
    )
    .await
    .unwrap()
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn invoices_are_invisible_to_other_users(pool: PgPool) {
    let owner = seed_user(&pool, "owner@example.com").await;
    let intruder = seed_user(&pool, "intruder@example.com").await;
    let client = seed_client(&pool, &owner).await;
    let invoice = seed_invoice(&pool, &owner, &client).await;

    let seen = db::invoice::get_invoice_for_user(&pool, intruder.id, invoice.id)
        .await
        .unwrap();
    assert!(seen.is_none());

    let listed = db::invoice::get_invoices_for_user(&pool, intruder.id, Default::default())
        .await
        .unwrap();
    assert!(listed.is_empty());

    let client_seen = db::client::get_client_for_user(&pool, intruder.id, client.id)
        .await
        .unwrap();
    assert!(client_seen.is_none());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn other_users_cannot_mark_an_invoice_paid(pool: PgPool) {
    let owner = seed_user(&pool, "owner@example.com").await;
    let intruder = seed_user(&pool, "intruder@example.com").await;
    let client = seed_client(&pool, &owner).await;
    let invoice = seed_invoice(&pool, &owner, &client).await;
    let now = Utc::now().naive_utc();

    let updated = db::invoice::mark_invoice_paid(&pool, intruder.id, invoice.id, now)
        .await
        .unwrap();
    assert!(updated.is_none());

    let stored = db::invoice::get_invoice_for_user(&pool, owner.id, invoice.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, "UNPAID");
    assert!(stored.paid_at.is_none());

    let paid = db::invoice::mark_invoice_paid(&pool, owner.id, invoice.id, now)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(paid.status, "PAID");
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn scheduled_email_can_only_be_claimed_once(pool: PgPool) {
    let owner = seed_user(&pool, "owner@example.com").await;
    let client = seed_client(&pool, &owner).await;
    let invoice = seed_invoice(&pool, &owner, &client).await;
    let now = Utc::now().naive_utc();

    let due = db::invoice::get_due_scheduled_emails(&pool, now).await.unwrap();
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].client_email, "billing@acme.test");

    assert!(db::invoice::claim_scheduled_email(&pool, invoice.id, now).await.unwrap());
    assert!(!db::invoice::claim_scheduled_email(&pool, invoice.id, now).await.unwrap());
    assert!(db::invoice::get_due_scheduled_emails(&pool, now).await.unwrap().is_empty());

    db::invoice::release_scheduled_email(&pool, invoice.id).await.unwrap();
    assert_eq!(db::invoice::get_due_scheduled_emails(&pool, now).await.unwrap().len(), 1);
}
