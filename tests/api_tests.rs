mod common;

use common::*;
use rentdesk::{AppState, create_router};
use rust_decimal::Decimal;
use serde_json::{Value, json};
use tokio::net::TcpListener;

pub struct TestApp {
    pub address: String,
    pub state: AppState,
}

async fn spawn_app() -> TestApp {
    let state = test_state();
    let router = create_router(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestApp { address, state }
}

fn dec(value: &Value) -> Decimal {
    match value {
        Value::String(raw) => raw.parse().unwrap(),
        other => other.to_string().parse().unwrap(),
    }
}

/// Thin authenticated client: every call carries the caller's bearer token.
struct Session {
    client: reqwest::Client,
    address: String,
    token: String,
}

impl Session {
    async fn login(app: &TestApp, email: &str) -> Self {
        let client = reqwest::Client::new();
        let response = client
            .post(format!("{}/auth/login", app.address))
            .json(&json!({ "email": email, "password": TEST_PASSWORD }))
            .send()
            .await
            .expect("Failed to execute request.");
        assert_eq!(response.status().as_u16(), 200);
        let pair: Value = response.json().await.unwrap();

        Self {
            client,
            address: app.address.clone(),
            token: pair["access_token"].as_str().unwrap().to_string(),
        }
    }

    async fn get(&self, path: &str) -> (u16, Value) {
        let response = self
            .client
            .get(format!("{}{}", self.address, path))
            .bearer_auth(&self.token)
            .send()
            .await
            .expect("Failed to execute request.");
        let status = response.status().as_u16();
        (status, response.json().await.unwrap_or(Value::Null))
    }

    async fn post(&self, path: &str, body: Value) -> (u16, Value) {
        let response = self
            .client
            .post(format!("{}{}", self.address, path))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request.");
        let status = response.status().as_u16();
        (status, response.json().await.unwrap_or(Value::Null))
    }
}

#[tokio::test]
async fn test_health_check() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let response = client
        .get(format!("{}/health", app.address))
        .send()
        .await
        .expect("Failed to execute request.");

    assert!(response.status().is_success());
    assert_eq!(response.text().await.unwrap(), "ok");
}

#[tokio::test]
async fn test_bad_login_returns_error_body() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let response = client
        .post(format!("{}/auth/login", app.address))
        .json(&json!({ "email": "ghost@rentdesk.test", "password": "whatever" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 401);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["succeeded"], false);
    assert_eq!(body["message"], "Invalid email or password");
}

#[tokio::test]
async fn test_rental_desk_end_to_end() {
    let app = spawn_app().await;
    seed_admin(&app.state).await;
    seed_employee(&app.state).await;

    let desk = Session::login(&app, "desk@rentdesk.test").await;
    let admin = Session::login(&app, "admin@rentdesk.test").await;

    // Catalog and fleet.
    let (status, city) = desk.post("/cities", json!({ "name": "Porto" })).await;
    assert_eq!(status, 201);
    let (status, _) = desk.post("/cities", json!({ "name": "porto" })).await;
    assert_eq!(status, 409);

    let (_, category) = desk.post("/categories", json!({ "name": "Vans" })).await;
    let (status, sub_category) = desk
        .post(
            "/sub-categories",
            json!({ "category_id": category["id"], "name": "Cargo", "price_per_day": "80.00" }),
        )
        .await;
    assert_eq!(status, 201);

    let (status, vehicle) = desk
        .post(
            "/vehicles",
            json!({
                "sub_category_id": sub_category["id"],
                "city_id": city["id"],
                "plate_number": "cc-22-cc",
                "brand": "Ford",
                "model": "Transit",
                "year": 2021,
                "color": "White"
            }),
        )
        .await;
    assert_eq!(status, 201);
    let vehicle_id = vehicle["id"].as_str().unwrap().to_string();

    // Customer must be activated before booking.
    let (_, customer) = desk
        .post(
            "/customers",
            json!({
                "first_name": "Rui",
                "last_name": "Costa",
                "email": "rui@example.com",
                "phone": "+351920000000",
                "national_id": "87654321",
                "city_id": city["id"]
            }),
        )
        .await;
    let customer_id = customer["id"].as_str().unwrap().to_string();

    let booking = json!({
        "customer_id": customer_id,
        "vehicle_id": vehicle_id,
        "start_date": "2031-04-01",
        "end_date": "2031-04-05"
    });
    let (status, body) = desk.post("/orders", booking.clone()).await;
    assert_eq!(status, 422);
    assert_eq!(body["message"], "Customer is not active");

    let (status, _) = desk.post(&format!("/customers/{customer_id}/activate"), json!({})).await;
    assert_eq!(status, 200);

    let (status, order) = desk.post("/orders", booking.clone()).await;
    assert_eq!(status, 201);
    assert_eq!(dec(&order["total_amount"]), "400".parse::<Decimal>().unwrap());
    let order_id = order["id"].as_str().unwrap().to_string();

    let (status, _) = desk.post("/orders", booking).await;
    assert_eq!(status, 409);

    let (status, grid) = desk
        .get(&format!(
            "/reservations?sub_category_id={}&from=2031-04-04&to=2031-04-10",
            sub_category["id"].as_str().unwrap()
        ))
        .await;
    assert_eq!(status, 200);
    assert_eq!(grid[0]["booked_days"], json!(["2031-04-04", "2031-04-05"]));

    // Confirm, then cancel: 10% fee.
    let (status, _) = desk.post(&format!("/orders/{order_id}/confirm"), json!({})).await;
    assert_eq!(status, 200);
    let (status, details) = desk.post(&format!("/orders/{order_id}/cancel"), json!({})).await;
    assert_eq!(status, 200);
    assert_eq!(details["order"]["state"], json!("Cancelled"));
    let fee_id = details["cancellation_fee"]["id"].as_str().unwrap().to_string();
    assert_eq!(dec(&details["cancellation_fee"]["amount"]), "40".parse::<Decimal>().unwrap());

    let (status, _) = desk.post(&format!("/cancellation-fees/{fee_id}/pay"), json!({})).await;
    assert_eq!(status, 200);

    // Treasury is admin-only.
    let (status, _) = desk.get("/admin/treasury/balance").await;
    assert_eq!(status, 403);
    let (status, balance) = admin.get("/admin/treasury/balance").await;
    assert_eq!(status, 200);
    assert_eq!(dec(&balance["balance"]), "40".parse::<Decimal>().unwrap());
    assert_eq!(balance["entry_count"], 1);
}
