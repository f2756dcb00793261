// tests/api_tests.rs
//
// Drives the router in-process with tower's oneshot.

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use voltledger_core::api::{router, Collaborators};
use voltledger_core::test_utils::fixtures::{app_state, seed, Seeded, TEST_PASSWORD};
use voltledger_core::Error;

struct TestApp {
    router: Router,
    seeded: Seeded,
}

impl TestApp {
    async fn new() -> Result<Self, Error> {
        let seeded = seed().await?;
        let router = router(app_state(&seeded, Collaborators::default()));
        Ok(Self { router, seeded })
    }

    async fn call(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("x-forwarded-for", "203.0.113.7");
        if let Some(t) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", t));
        }
        let request = match body {
            Some(b) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(b.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn login(&self, email: &str) -> String {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({ "email": email, "password": TEST_PASSWORD })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        body["data"]["tokens"]["accessToken"].as_str().unwrap().to_string()
    }
}

#[tokio::test]
async fn register_then_duplicate_is_conflict() -> Result<(), Error> {
    let app = TestApp::new().await?;
    let payload = json!({
        "email": "chidi@example.com",
        "password": "super-secret-1",
        "firstName": "Chidi",
        "lastName": "Eze",
        "phone": "+2348012345678",
    });

    let (status, body) = app.call(Method::POST, "/api/auth/register", None, Some(payload.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["email"], "chidi@example.com");
    assert!(body["data"].get("passwordHash").is_none());

    let (status, body) = app.call(Method::POST, "/api/auth/register", None, Some(payload)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "User with this email already exists");
    Ok(())
}

#[tokio::test]
async fn invalid_registration_lists_field_errors() -> Result<(), Error> {
    let app = TestApp::new().await?;
    let (status, body) = app
        .call(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({
                "email": "not-an-email",
                "password": "short",
                "firstName": "Chidi",
                "lastName": "Eze",
                "phone": "08012345678",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    let fields: Vec<&str> = body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|e| e["field"].as_str())
        .collect();
    assert!(fields.contains(&"email"));
    assert!(fields.contains(&"password"));
    assert!(fields.contains(&"phone"));
    Ok(())
}

#[tokio::test]
async fn protected_routes_need_a_token() -> Result<(), Error> {
    let app = TestApp::new().await?;

    let (status, body) = app.call(Method::GET, "/api/wallet", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Access token required");

    let (status, _) = app.call(Method::GET, "/api/wallet", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let token = app.login("customer@example.com").await;
    let (status, body) = app.call(Method::GET, "/api/wallet", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["userId"], app.seeded.customer.id.to_string());
    Ok(())
}

#[tokio::test]
async fn admin_routes_reject_customers() -> Result<(), Error> {
    let app = TestApp::new().await?;

    let customer = app.login("customer@example.com").await;
    let (status, body) = app.call(Method::GET, "/api/users", Some(&customer), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Insufficient permissions");

    let admin = app.login("admin@example.com").await;
    let (status, body) = app.call(Method::GET, "/api/users", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 2);
    Ok(())
}

#[tokio::test]
async fn usage_earns_credits_that_can_be_sold() -> Result<(), Error> {
    let app = TestApp::new().await?;
    let token = app.login("customer@example.com").await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/usage",
            Some(&token),
            Some(json!({ "tokenId": app.seeded.renewable.id, "amount": 50 })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let (status, body) = app.call(Method::GET, "/api/carbon-credits", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let credits = body["data"]["credits"].as_array().unwrap().clone();
    assert_eq!(credits.len(), 1);
    assert_eq!(body["data"]["stats"]["creditsAvailable"].as_f64(), Some(5.0));

    let (status, body) = app
        .call(
            Method::POST,
            "/api/carbon-credits",
            Some(&token),
            Some(json!({ "creditIds": [credits[0]["id"]], "action": "melt" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid action specified");

    let (status, body) = app
        .call(
            Method::POST,
            "/api/carbon-credits",
            Some(&token),
            Some(json!({ "creditIds": [credits[0]["id"]], "action": "sell_to_cash" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["amount"].as_f64(), Some(3750.0));
    assert_eq!(body["data"]["action"], "sold_to_cash");

    let (_, body) = app.call(Method::GET, "/api/wallet", Some(&token), None).await;
    assert_eq!(body["data"]["cashBalance"].as_f64(), Some(3750.0));

    let (_, body) = app.call(Method::GET, "/api/usage?period=daily", Some(&token), None).await;
    assert_eq!(body["data"]["totalUsage"].as_f64(), Some(50.0));
    assert_eq!(body["data"]["carbonSaved"].as_f64(), Some(25.0));

    let (status, _) = app.call(Method::GET, "/api/usage?period=yearly", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn admin_lists_every_users_credits() -> Result<(), Error> {
    let app = TestApp::new().await?;
    let customer = app.login("customer@example.com").await;
    for amount in [50, 30] {
        let (status, body) = app
            .call(
                Method::POST,
                "/api/usage",
                Some(&customer),
                Some(json!({ "tokenId": app.seeded.renewable.id, "amount": amount })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
    }

    let admin = app.login("admin@example.com").await;
    let (status, body) = app
        .call(Method::GET, "/api/carbon-credits?all=true&limit=1", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 2);
    assert_eq!(body["data"]["totalPages"], 2);
    let items = body["data"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["amount"].as_f64(), Some(3.0));

    // Customers asking for everything still get only their own portfolio.
    let (_, body) = app
        .call(Method::GET, "/api/carbon-credits?all=true", Some(&customer), None)
        .await;
    assert_eq!(body["data"]["credits"].as_array().unwrap().len(), 2);
    assert!(body["data"].get("total").is_none());
    Ok(())
}

#[tokio::test]
async fn notifications_can_be_marked_read() -> Result<(), Error> {
    let app = TestApp::new().await?;
    let token = app.login("customer@example.com").await;

    app.call(
        Method::POST,
        "/api/usage",
        Some(&token),
        Some(json!({ "tokenId": app.seeded.grid.id, "amount": 19 })),
    )
    .await;

    let (_, body) = app.call(Method::GET, "/api/notifications?unreadOnly=true", Some(&token), None).await;
    let items = body["data"].as_array().unwrap().clone();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["type"], "usage_alert");

    let id = items[0]["id"].as_str().unwrap();
    let (status, _) = app
        .call(Method::POST, &format!("/api/notifications/{id}/read"), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app.call(Method::GET, "/api/notifications?unreadOnly=true", Some(&token), None).await;
    assert!(body["data"].as_array().unwrap().is_empty());
    Ok(())
}

#[tokio::test]
async fn auth_endpoints_are_rate_limited() -> Result<(), Error> {
    let app = TestApp::new().await?;
    let wrong = json!({ "email": "customer@example.com", "password": "wrong-password" });

    for _ in 0..5 {
        let (status, _) = app.call(Method::POST, "/api/auth/login", None, Some(wrong.clone())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
    let (status, body) = app.call(Method::POST, "/api/auth/login", None, Some(wrong)).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["code"], "RATE_LIMIT_EXCEEDED");
    Ok(())
}

#[tokio::test]
async fn logout_revokes_the_access_token() -> Result<(), Error> {
    let app = TestApp::new().await?;
    let token = app.login("customer@example.com").await;

    let (status, _) = app.call(Method::POST, "/api/auth/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.call(Method::GET, "/api/users/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn purchases_need_a_configured_gateway() -> Result<(), Error> {
    let app = TestApp::new().await?;
    let token = app.login("customer@example.com").await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/tokens/purchase",
            Some(&token),
            Some(json!({
                "tokenId": app.seeded.renewable.id,
                "quantity": 2,
                "amount": 150,
                "paymentMethod": "paystack",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "Payment service is not configured");
    Ok(())
}

#[tokio::test]
async fn health_reports_memory_backend() -> Result<(), Error> {
    let app = TestApp::new().await?;
    let (status, body) = app.call(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["database"], "memory");
    assert_eq!(body["data"]["environment"], "test");
    Ok(())
}
