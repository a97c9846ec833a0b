//! End-to-end tests for the assembled router.

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    extract::ConnectInfo,
    http::{Request, StatusCode, header},
    response::Response,
};
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use contact_gateway::{
    AdmissionGuard, ClientRegistry, ExemptList, RatePolicy, build_router,
    email::{EmailError, EmailSender, OutgoingEmail},
    middleware::RateLimitEnforcer,
    state::AppState,
};

/// Records every message instead of delivering it.
#[derive(Default)]
struct RecordingMailer {
    sent: parking_lot::Mutex<Vec<OutgoingEmail>>,
    fail: bool,
}

#[async_trait]
impl EmailSender for RecordingMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<String, EmailError> {
        if self.fail {
            return Err(EmailError::Rejected {
                status: 403,
                body: "domain not verified".into(),
            });
        }
        let mut sent = self.sent.lock();
        sent.push(email.clone());
        Ok(format!("msg-{}", sent.len()))
    }
}

struct TestApp {
    router: Router,
    mailer: Arc<RecordingMailer>,
    registry: Arc<ClientRegistry>,
}

fn test_app(max_requests: u32, mailer: Option<RecordingMailer>, trust_proxy: bool) -> TestApp {
    let registry = Arc::new(ClientRegistry::default());
    let guard = AdmissionGuard::new(
        registry.clone(),
        RatePolicy::new("contact", max_requests, Duration::from_secs(60)),
        Arc::new(ExemptList::default()),
    );
    let limiter = Arc::new(RateLimitEnforcer::new(guard, trust_proxy));

    let mailer = mailer.map(Arc::new);
    let state = Arc::new(AppState {
        mailer: mailer.clone().map(|m| m as Arc<dyn EmailSender>),
        sender: "Contact Form <noreply@example.com>".to_string(),
    });

    TestApp {
        router: build_router(state, limiter, &["*".to_string()]),
        mailer: mailer.unwrap_or_default(),
        registry,
    }
}

fn valid_body() -> Value {
    json!({
        "name": "Ada",
        "email": "ada@example.com",
        "message": "Hello\nthere",
        "recipient_email": "owner@example.org"
    })
}

fn contact_request(peer: &str, body: &Value) -> Request<Body> {
    let mut req = Request::builder()
        .method("POST")
        .uri("/api/contact")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let addr: SocketAddr = peer.parse().unwrap();
    req.extensions_mut().insert(ConnectInfo(addr));
    req
}

async fn json_body(res: Response) -> Value {
    let bytes = to_bytes(res.into_body(), 64 * 1024).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_contact_sends_email() {
    let app = test_app(10, Some(RecordingMailer::default()), false);

    let res = app
        .router
        .clone()
        .oneshot(contact_request("203.0.113.1:5000", &valid_body()))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body = json_body(res).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Email sent successfully");
    assert_eq!(body["id"], "msg-1");

    let sent = app.mailer.sent.lock();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, vec!["owner@example.org".to_string()]);
    assert_eq!(sent[0].from, "Contact Form <noreply@example.com>");
    assert_eq!(sent[0].subject, "New contact form submission from Ada");
    assert!(sent[0].html.contains("Hello<br>there"));
}

#[tokio::test]
async fn test_angle_brackets_reach_recipient_escaped() {
    let app = test_app(10, Some(RecordingMailer::default()), false);
    let mut body = valid_body();
    body["message"] = json!("Budget is < 5k, please call me back tomorrow");

    let res = app
        .router
        .clone()
        .oneshot(contact_request("203.0.113.9:1", &body))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let sent = app.mailer.sent.lock();
    assert!(
        sent[0]
            .html
            .contains("Budget is &lt; 5k, please call me back tomorrow")
    );
}

#[tokio::test]
async fn test_rate_limit_short_circuits_before_email() {
    let app = test_app(2, Some(RecordingMailer::default()), false);

    for _ in 0..2 {
        let res = app
            .router
            .clone()
            .oneshot(contact_request("198.51.100.4:1000", &valid_body()))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    let res = app
        .router
        .clone()
        .oneshot(contact_request("198.51.100.4:1001", &valid_body()))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        res.headers().get("x-content-type-options").unwrap(),
        "nosniff"
    );
    let body = json_body(res).await;
    assert_eq!(body["error"], "Rate limit exceeded");
    assert_eq!(
        body["message"],
        "Maximum of 2 requests per 60 seconds allowed."
    );

    assert_eq!(app.mailer.sent.lock().len(), 2);
    assert_eq!(app.registry.history_len("198.51.100.4"), Some(2));
}

#[tokio::test]
async fn test_clients_limited_independently() {
    let app = test_app(1, Some(RecordingMailer::default()), false);

    let first = app
        .router
        .clone()
        .oneshot(contact_request("192.0.2.1:1", &valid_body()))
        .await
        .unwrap();
    let again = app
        .router
        .clone()
        .oneshot(contact_request("192.0.2.1:2", &valid_body()))
        .await
        .unwrap();
    let other = app
        .router
        .clone()
        .oneshot(contact_request("192.0.2.2:1", &valid_body()))
        .await
        .unwrap();

    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(again.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(other.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_loopback_is_exempt() {
    let app = test_app(1, Some(RecordingMailer::default()), false);

    for _ in 0..5 {
        let res = app
            .router
            .clone()
            .oneshot(contact_request("127.0.0.1:9999", &valid_body()))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }
    assert!(app.registry.is_empty());
}

#[tokio::test]
async fn test_forwarded_client_when_proxy_trusted() {
    let app = test_app(1, Some(RecordingMailer::default()), true);

    let mut limited = 0;
    for client in ["198.51.100.10", "198.51.100.10", "198.51.100.11"] {
        let mut req = contact_request("10.0.0.1:80", &valid_body());
        req.headers_mut()
            .insert("x-forwarded-for", client.parse().unwrap());
        let res = app.router.clone().oneshot(req).await.unwrap();
        if res.status() == StatusCode::TOO_MANY_REQUESTS {
            limited += 1;
        }
    }

    assert_eq!(limited, 1);
    assert_eq!(app.registry.history_len("10.0.0.1"), None);
}

#[tokio::test]
async fn test_missing_field_is_bad_request() {
    let app = test_app(10, Some(RecordingMailer::default()), false);
    let mut body = valid_body();
    body.as_object_mut().unwrap().remove("message");

    let res = app
        .router
        .clone()
        .oneshot(contact_request("203.0.113.2:1", &body))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(res).await["error"],
        "Missing required field: message"
    );
    assert!(app.mailer.sent.lock().is_empty());
}

#[tokio::test]
async fn test_invalid_sender_email() {
    let app = test_app(10, Some(RecordingMailer::default()), false);
    let mut body = valid_body();
    body["email"] = json!("ada at example");

    let res = app
        .router
        .clone()
        .oneshot(contact_request("203.0.113.3:1", &body))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(res).await["error"], "Invalid sender email format");
}

#[tokio::test]
async fn test_non_object_body_is_invalid_format() {
    let app = test_app(10, Some(RecordingMailer::default()), false);

    let res = app
        .router
        .clone()
        .oneshot(contact_request("203.0.113.4:1", &json!("just a string")))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(res).await["error"], "Invalid data format");
}

#[tokio::test]
async fn test_missing_provider_is_configuration_error() {
    let app = test_app(10, None, false);

    let res = app
        .router
        .clone()
        .oneshot(contact_request("203.0.113.5:1", &valid_body()))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(res).await["error"], "API configuration error");
}

#[tokio::test]
async fn test_provider_failure_is_server_error() {
    let mailer = RecordingMailer {
        fail: true,
        ..Default::default()
    };
    let app = test_app(10, Some(mailer), false);

    let res = app
        .router
        .clone()
        .oneshot(contact_request("203.0.113.6:1", &valid_body()))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let error = json_body(res).await["error"].as_str().unwrap().to_string();
    assert!(error.contains("domain not verified"));
}

#[tokio::test]
async fn test_health_is_never_limited() {
    let app = test_app(0, None, false);

    for _ in 0..20 {
        let mut req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        req.extensions_mut()
            .insert(ConnectInfo("203.0.113.7:1".parse::<SocketAddr>().unwrap()));
        let res = app.router.clone().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(
            res.headers().get(header::X_FRAME_OPTIONS).unwrap(),
            "SAMEORIGIN"
        );
        let body = json_body(res).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }
    assert!(app.registry.is_empty());
}

#[tokio::test]
async fn test_metrics_exposed() {
    let app = test_app(1, Some(RecordingMailer::default()), false);
    for _ in 0..2 {
        app.router
            .clone()
            .oneshot(contact_request("203.0.113.8:1", &valid_body()))
            .await
            .unwrap();
    }

    let res = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let bytes = to_bytes(res.into_body(), 1024 * 1024).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("contact_rate_limited_total"));
    assert!(text.contains("contact_tracked_clients"));
}

#[tokio::test]
async fn test_concurrent_submissions_admit_exactly_limit() {
    let app = test_app(10, Some(RecordingMailer::default()), false);

    let handles: Vec<_> = (0..100)
        .map(|i| {
            let router = app.router.clone();
            tokio::spawn(async move {
                let peer = format!("198.51.100.50:{}", 1000 + i);
                router
                    .oneshot(contact_request(&peer, &valid_body()))
                    .await
                    .unwrap()
                    .status()
            })
        })
        .collect();

    let mut ok = 0;
    let mut limited = 0;
    for handle in handles {
        match handle.await.unwrap() {
            StatusCode::OK => ok += 1,
            StatusCode::TOO_MANY_REQUESTS => limited += 1,
            other => panic!("unexpected status {other}"),
        }
    }

    assert_eq!(ok, 10);
    assert_eq!(limited, 90);
    assert_eq!(app.mailer.sent.lock().len(), 10);
}
