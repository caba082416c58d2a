//! Repository tests against a live Postgres.
//!
//! Run with `DATABASE_URL=... cargo test -- --ignored`.

use axum::http::StatusCode;
use chrono::NaiveDate;
use rentdesk::{
    PostgresRepository,
    models::{
        CancellationFeeState, Category, City, CreateCategoryRequest, CreateCustomerRequest,
        CreatePaymentRequest, CreateSubCategoryRequest, CreateVehicleRequest, Customer, Order,
        OrderPayment, OrderState, PaymentState, SubCategory, User, Vehicle,
    },
    repository::{Repository, ReservationFilter},
};
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

async fn repo() -> PostgresRepository {
    dotenv::dotenv().ok();
    let db_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for ignored tests");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&db_url)
        .await
        .expect("Failed to connect to Postgres in tests");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate test database");

    PostgresRepository::new(pool)
}

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn suffix() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

/// Seeds an isolated city/category/sub-category/vehicle/customer set; names carry a random suffix.
async fn seed(repo: &PostgresRepository) -> (Vehicle, Customer, User) {
    let tag = suffix();

    let city = City::new(format!("City {tag}"));
    repo.create_city(&city).await.unwrap();

    let category = Category::new(CreateCategoryRequest {
        name: format!("Category {tag}"),
        description: None,
    });
    repo.create_category(&category).await.unwrap();

    let sub_category = SubCategory::new(CreateSubCategoryRequest {
        category_id: category.id,
        name: "Compact".to_string(),
        price_per_day: Decimal::new(4000, 2),
    })
    .unwrap();
    repo.create_sub_category(&sub_category).await.unwrap();

    let vehicle = Vehicle::new(CreateVehicleRequest {
        sub_category_id: sub_category.id,
        city_id: city.id,
        plate_number: format!("P{tag}"),
        brand: "Seat".to_string(),
        model: "Ibiza".to_string(),
        year: 2023,
        color: "Red".to_string(),
    });
    repo.create_vehicle(&vehicle).await.unwrap();

    let customer = Customer::new(CreateCustomerRequest {
        first_name: "Pg".to_string(),
        last_name: "Tester".to_string(),
        email: format!("pg-{tag}@example.com"),
        phone: "+351930000000".to_string(),
        national_id: tag.clone(),
        city_id: city.id,
    });
    repo.create_customer(&customer).await.unwrap();

    let clerk = User::new(
        format!("clerk-{tag}@rentdesk.test"),
        "Clerk".to_string(),
        "hash".to_string(),
        "employee".to_string(),
    );
    repo.create_user(&clerk).await.unwrap();

    (vehicle, customer, clerk)
}

fn order(vehicle: &Vehicle, customer: &Customer, clerk: &User, start: NaiveDate, end: NaiveDate) -> Order {
    Order::new(customer.id, vehicle.id, start, end, Decimal::new(4000, 2), clerk.id).unwrap()
}

#[tokio::test]
#[ignore]
async fn test_double_booking_is_blocked_by_the_database() {
    let repo = repo().await;
    let (vehicle, customer, clerk) = seed(&repo).await;

    let first = order(&vehicle, &customer, &clerk, day(2032, 1, 1), day(2032, 1, 3));
    repo.create_order(&first, &first.reservations()).await.unwrap();

    let clash = order(&vehicle, &customer, &clerk, day(2032, 1, 3), day(2032, 1, 4));
    let err = repo.create_order(&clash, &clash.reservations()).await.unwrap_err();
    let (status, _, message) = err.status_and_code();
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(message, "Vehicle is already reserved for the selected dates");

    // The failed insert left nothing behind.
    assert!(repo.get_order(clash.id).await.unwrap().is_none());
}

#[tokio::test]
#[ignore]
async fn test_cancel_releases_reservations_and_records_fee() {
    let repo = repo().await;
    let (vehicle, customer, clerk) = seed(&repo).await;

    let mut booked = order(&vehicle, &customer, &clerk, day(2032, 2, 1), day(2032, 2, 2));
    repo.create_order(&booked, &booked.reservations()).await.unwrap();
    booked.confirm().unwrap();
    assert!(repo.update_order(&booked, OrderState::Pending).await.unwrap());

    let fee = booked.cancel(Decimal::TEN).unwrap().unwrap();
    assert!(
        repo.cancel_order(&booked, OrderState::Confirmed, Some(&fee))
            .await
            .unwrap()
    );

    let stored = repo.get_order(booked.id).await.unwrap().unwrap();
    assert_eq!(stored.state, OrderState::Cancelled);

    let live = repo
        .reserved_days(&ReservationFilter {
            vehicle_id: Some(vehicle.id),
            sub_category_id: None,
            from: day(2032, 2, 1),
            to: day(2032, 2, 2),
        })
        .await
        .unwrap();
    assert!(live.is_empty());

    let stored_fee = repo.get_order_cancellation_fee(booked.id).await.unwrap().unwrap();
    assert_eq!(stored_fee.amount, Decimal::new(800, 2));

    // Released days are bookable again.
    let again = order(&vehicle, &customer, &clerk, day(2032, 2, 1), day(2032, 2, 1));
    repo.create_order(&again, &again.reservations()).await.unwrap();
}

#[tokio::test]
#[ignore]
async fn test_treasury_balance_follows_settlements() {
    let repo = repo().await;
    let (vehicle, customer, clerk) = seed(&repo).await;
    let before = repo.treasury_balance().await.unwrap();

    let booked = order(&vehicle, &customer, &clerk, day(2032, 3, 1), day(2032, 3, 1));
    repo.create_order(&booked, &booked.reservations()).await.unwrap();

    let mut payment = OrderPayment::new(
        &booked,
        Decimal::ZERO,
        CreatePaymentRequest {
            amount: Decimal::new(4000, 2),
            method: "card".to_string(),
        },
    )
    .unwrap();
    repo.create_payment(&payment).await.unwrap();
    let credit = payment.confirm().unwrap();
    assert!(
        repo.settle_payment(&payment, PaymentState::Pending, &credit)
            .await
            .unwrap()
    );

    let after = repo.treasury_balance().await.unwrap();
    assert_eq!(after.balance - before.balance, Decimal::new(4000, 2));
    assert_eq!(after.entry_count - before.entry_count, 1);
}

#[tokio::test]
#[ignore]
async fn test_payment_settles_once_when_two_requests_race() {
    let repo = repo().await;
    let (vehicle, customer, clerk) = seed(&repo).await;

    let booked = order(&vehicle, &customer, &clerk, day(2032, 4, 1), day(2032, 4, 1));
    repo.create_order(&booked, &booked.reservations()).await.unwrap();
    let pending = OrderPayment::new(
        &booked,
        Decimal::ZERO,
        CreatePaymentRequest {
            amount: Decimal::new(4000, 2),
            method: "card".to_string(),
        },
    )
    .unwrap();
    repo.create_payment(&pending).await.unwrap();
    let before = repo.treasury_balance().await.unwrap();

    // Both requests read the payment while it was still pending.
    let mut first = pending.clone();
    let mut second = pending;
    let first_credit = first.confirm().unwrap();
    let second_credit = second.confirm().unwrap();

    assert!(
        repo.settle_payment(&first, PaymentState::Pending, &first_credit)
            .await
            .unwrap()
    );
    assert!(
        !repo
            .settle_payment(&second, PaymentState::Pending, &second_credit)
            .await
            .unwrap()
    );

    let after = repo.treasury_balance().await.unwrap();
    assert_eq!(after.balance - before.balance, Decimal::new(4000, 2));
    assert_eq!(after.entry_count - before.entry_count, 1);
}

#[tokio::test]
#[ignore]
async fn test_stale_order_transition_writes_nothing() {
    let repo = repo().await;
    let (vehicle, customer, clerk) = seed(&repo).await;

    let mut booked = order(&vehicle, &customer, &clerk, day(2032, 5, 1), day(2032, 5, 2));
    repo.create_order(&booked, &booked.reservations()).await.unwrap();
    booked.confirm().unwrap();
    assert!(repo.update_order(&booked, OrderState::Pending).await.unwrap());

    let mut stale = booked.clone();
    booked.start().unwrap();
    assert!(repo.update_order(&booked, OrderState::Confirmed).await.unwrap());

    // A cancel that read the order before pick-up must not release its days.
    assert!(stale.cancel(Decimal::TEN).unwrap().is_some());
    assert!(
        !repo
            .cancel_order(&stale, OrderState::Confirmed, None)
            .await
            .unwrap()
    );

    let stored = repo.get_order(booked.id).await.unwrap().unwrap();
    assert_eq!(stored.state, OrderState::InProgress);
    let live = repo
        .reserved_days(&ReservationFilter {
            vehicle_id: Some(vehicle.id),
            sub_category_id: None,
            from: day(2032, 5, 1),
            to: day(2032, 5, 2),
        })
        .await
        .unwrap();
    assert_eq!(live.len(), 2);
}

#[tokio::test]
#[ignore]
async fn test_cancellation_fee_settles_once() {
    let repo = repo().await;
    let (vehicle, customer, clerk) = seed(&repo).await;

    let mut booked = order(&vehicle, &customer, &clerk, day(2032, 6, 1), day(2032, 6, 1));
    repo.create_order(&booked, &booked.reservations()).await.unwrap();
    booked.confirm().unwrap();
    assert!(repo.update_order(&booked, OrderState::Pending).await.unwrap());
    let fee = booked.cancel(Decimal::TEN).unwrap().unwrap();
    assert!(
        repo.cancel_order(&booked, OrderState::Confirmed, Some(&fee))
            .await
            .unwrap()
    );
    let before = repo.treasury_balance().await.unwrap();

    let mut waived = fee.clone();
    waived.waive().unwrap();
    assert!(repo.settle_cancellation_fee(&waived, None).await.unwrap());

    let mut paid = fee;
    let credit = paid.pay().unwrap();
    assert!(!repo.settle_cancellation_fee(&paid, Some(&credit)).await.unwrap());

    let after = repo.treasury_balance().await.unwrap();
    assert_eq!(after.entry_count, before.entry_count);
    let stored = repo.get_order_cancellation_fee(booked.id).await.unwrap().unwrap();
    assert_eq!(stored.state, CancellationFeeState::Waived);
}

#[tokio::test]
#[ignore]
async fn test_soft_deleted_users_are_hidden() {
    let repo = repo().await;
    let (_, _, clerk) = seed(&repo).await;

    assert!(repo.soft_delete_user(clerk.id).await.unwrap());
    assert!(repo.get_user(clerk.id).await.unwrap().is_none());
    assert!(repo.get_user_by_email(&clerk.email).await.unwrap().is_none());
    assert!(!repo.soft_delete_user(clerk.id).await.unwrap());

    // The address stays reserved by the deleted account.
    assert!(repo.user_email_taken(&clerk.email.to_uppercase()).await.unwrap());
}
