//! Run with `DATABASE_URL=postgres://… cargo test -p api_invoices -- --ignored`.

use api_invoices::{
    dtos::invoice::{CreateInvoiceRequest, DateInput},
    services::invoice::create_invoice,
};
use chrono::{Duration, Utc};
use common::{error::AppError, misc::EmailSendOption};
use db::dtos::{client::ClientCreateRequest, user::UserCreateRequest};
use sqlx::PgPool;
use uuid::Uuid;

fn request(client_id: Uuid) -> CreateInvoiceRequest {
    CreateInvoiceRequest {
        client_id,
        amount: Some(50.0),
        due_date: DateInput::Local(Utc::now().naive_utc() + Duration::days(30)),
        notes: None,
        logo: None,
        line_items: vec![],
        tax_rate: 0.0,
        discount: 0.0,
        shipping: 0.0,
        email_send_option: EmailSendOption::SaveOnly,
        email_scheduled_at: None,
    }
}

#[sqlx::test(migrations = "../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn free_plan_stops_at_one_thousand_invoices(pool: PgPool) {
    let user = db::user::insert_user(
        &pool,
        UserCreateRequest {
            name: "Freelancer".to_string(),
            email: "busy@example.com".to_string(),
        },
    )
    .await
    .unwrap();
    let client = db::client::insert_client(
        &pool,
        ClientCreateRequest {
            user_id: user.id,
            name: "Acme".to_string(),
            email: "billing@acme.test".to_string(),
        },
    )
    .await
    .unwrap();

    sqlx::query(
        r#"
        INSERT INTO invoices (user_id, client_id, amount, due_date)
        SELECT $1, $2, 10, NOW() AT TIME ZONE 'utc'
        FROM generate_series(1, 999)
        "#,
    )
    .bind(user.id)
    .bind(client.id)
    .execute(&pool)
    .await
    .unwrap();

    // the 1000th still fits
    create_invoice(&pool, user.id, &request(client.id)).await.unwrap();
    assert_eq!(db::invoice::count_invoices_by_user(&pool, user.id).await.unwrap(), 1000);

    let err = create_invoice(&pool, user.id, &request(client.id)).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(ref msg) if msg.contains("Free plan limit reached")));
    assert_eq!(db::invoice::count_invoices_by_user(&pool, user.id).await.unwrap(), 1000);

    sqlx::query("UPDATE users SET plan = 'PRO' WHERE id = $1")
        .bind(user.id)
        .execute(&pool)
        .await
        .unwrap();
    create_invoice(&pool, user.id, &request(client.id)).await.unwrap();
    assert_eq!(db::invoice::count_invoices_by_user(&pool, user.id).await.unwrap(), 1001);
}

#[sqlx::test(migrations = "../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn invoice_for_a_foreign_client_is_not_created(pool: PgPool) {
    let owner = db::user::insert_user(
        &pool,
        UserCreateRequest {
            name: "Owner".to_string(),
            email: "owner@example.com".to_string(),
        },
    )
    .await
    .unwrap();
    let intruder = db::user::insert_user(
        &pool,
        UserCreateRequest {
            name: "Intruder".to_string(),
            email: "intruder@example.com".to_string(),
        },
    )
    .await
    .unwrap();
    let client = db::client::insert_client(
        &pool,
        ClientCreateRequest {
            user_id: owner.id,
            name: "Acme".to_string(),
            email: "billing@acme.test".to_string(),
        },
    )
    .await
    .unwrap();

    let err = create_invoice(&pool, intruder.id, &request(client.id)).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    assert_eq!(db::invoice::count_invoices_by_user(&pool, intruder.id).await.unwrap(), 0);
}
