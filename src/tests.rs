//! Integration tests for the FarmProtect backend.

use std::time::Duration;

use reqwest::Client;
use serde_json::{json, Value};
use tempfile::TempDir;

use crate::config::Config;
use crate::notify::NotificationPolicy;
use crate::storage::{init_database, KvStore, ALERTS_KEY, CAMERAS_KEY};
use crate::video::VideoServiceKind;
use crate::{create_router, AppState};

const DEMO_EMAIL: &str = "demo@farmprotect.com";
const DEMO_PASSWORD: &str = "password123";

/// Test fixture for integration tests.
struct TestFixture {
    client: Client,
    base_url: String,
    state: AppState,
    kv: KvStore,
    _temp_dir: TempDir,
}

impl TestFixture {
    async fn new() -> Self {
        Self::with_options(NotificationPolicy::Prompt, VideoServiceKind::Passthrough).await
    }

    async fn with_options(notifications: NotificationPolicy, video: VideoServiceKind) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.sqlite");

        let pool = init_database(&db_path).await.expect("Failed to init DB");
        let kv = KvStore::new(pool);

        let config = Config {
            db_path,
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            log_level: "warn".to_string(),
            simulated_delay: Duration::ZERO,
            alert_interval: Duration::from_secs(30),
            alert_probability: 0.1,
            notifications,
            video_service: video,
        };

        let state = AppState::new(config, kv.clone());
        let app = create_router(state.clone());

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get addr");
        let base_url = format!("http://{}", addr);

        // Spawn server
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait for server to start
        tokio::time::sleep(Duration::from_millis(100)).await;

        TestFixture {
            client: Client::new(),
            base_url,
            state,
            kv,
            _temp_dir: temp_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn login(&self) -> Value {
        let resp = self
            .client
            .post(self.url("/api/auth/login"))
            .json(&json!({ "email": DEMO_EMAIL, "password": DEMO_PASSWORD }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        resp.json().await.unwrap()
    }

    async fn add_camera(&self, name: &str, location: &str) -> Value {
        let resp = self
            .client
            .post(self.url("/api/cameras"))
            .json(&json!({ "name": name, "location": location }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        body["data"].clone()
    }
}

#[tokio::test]
async fn test_health_check() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_protected_routes_require_session() {
    let fixture = TestFixture::new().await;

    for path in ["/api/cameras", "/api/alerts", "/api/dashboard"] {
        let resp = fixture.client.get(fixture.url(path)).send().await.unwrap();
        assert_eq!(resp.status(), 401, "{}", path);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    }
}

#[tokio::test]
async fn test_login_success_and_session() {
    let fixture = TestFixture::new().await;

    let body = fixture.login().await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["email"], DEMO_EMAIL);
    assert_eq!(body["data"]["name"], "Demo User");
    assert!(body["data"].get("password").is_none());

    let resp = fixture
        .client
        .get(fixture.url("/api/auth/session"))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["isAuthenticated"], true);
    assert_eq!(body["data"]["user"]["id"], "1");
}

#[tokio::test]
async fn test_login_invalid_credentials() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .post(fixture.url("/api/auth/login"))
        .json(&json!({ "email": DEMO_EMAIL, "password": "nope" }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "INVALID_CREDENTIALS");
    assert_eq!(body["error"]["message"], "Invalid email or password");
}

#[tokio::test]
async fn test_register_flow() {
    let fixture = TestFixture::new().await;

    // Existing email
    let resp = fixture
        .client
        .post(fixture.url("/api/auth/register"))
        .json(&json!({
            "name": "Demo Again",
            "email": DEMO_EMAIL,
            "password": "secret1",
            "confirmPassword": "secret1"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["message"], "User already exists");

    // Form validation happens first
    let resp = fixture
        .client
        .post(fixture.url("/api/auth/register"))
        .json(&json!({
            "name": "Jane",
            "email": "jane@farm.test",
            "password": "secret1",
            "confirmPassword": "secret2"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["message"], "Passwords do not match");

    // New email signs in straight away
    let resp = fixture
        .client
        .post(fixture.url("/api/auth/register"))
        .json(&json!({
            "name": "Jane",
            "email": "jane@farm.test",
            "password": "secret1",
            "confirmPassword": "secret1"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["id"], "2");

    let resp = fixture
        .client
        .get(fixture.url("/api/cameras"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    // ...but cannot sign back in after logging out
    fixture
        .client
        .post(fixture.url("/api/auth/logout"))
        .send()
        .await
        .unwrap();
    let resp = fixture
        .client
        .post(fixture.url("/api/auth/login"))
        .json(&json!({ "email": "jane@farm.test", "password": "secret1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn test_camera_crud() {
    let fixture = TestFixture::new().await;
    fixture.login().await;

    // Create forces online status
    let resp = fixture
        .client
        .post(fixture.url("/api/cameras"))
        .json(&json!({
            "name": "North Field Camera",
            "location": "North Boundary",
            "status": "offline"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["status"], "online");
    let camera_id = body["data"]["id"].as_str().unwrap().to_string();

    // Get
    let resp = fixture
        .client
        .get(fixture.url(&format!("/api/cameras/{}", camera_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["name"], "North Field Camera");

    // Update
    let resp = fixture
        .client
        .put(fixture.url(&format!("/api/cameras/{}", camera_id)))
        .json(&json!({ "status": "offline" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["status"], "offline");
    assert_eq!(body["data"]["location"], "North Boundary");

    // Persisted
    let raw = fixture.kv.get_item(CAMERAS_KEY).await.unwrap().unwrap();
    let stored: Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(stored["version"], 1);
    assert_eq!(stored["data"][0]["status"], "offline");

    // Delete
    let resp = fixture
        .client
        .delete(fixture.url(&format!("/api/cameras/{}", camera_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = fixture
        .client
        .get(fixture.url(&format!("/api/cameras/{}", camera_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_camera_validation() {
    let fixture = TestFixture::new().await;
    fixture.login().await;

    let resp = fixture
        .client
        .post(fixture.url("/api/cameras"))
        .json(&json!({ "name": "Gate" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(body["error"]["message"], "Please fill in all fields");
}

#[tokio::test]
async fn test_camera_filters() {
    let fixture = TestFixture::new().await;
    fixture.login().await;

    fixture.add_camera("North Field Camera", "North Boundary").await;
    let barn = fixture.add_camera("Barn Area", "Barn").await;
    fixture
        .client
        .put(fixture.url(&format!("/api/cameras/{}", barn["id"].as_str().unwrap())))
        .json(&json!({ "status": "offline" }))
        .send()
        .await
        .unwrap();

    let list = |query: &'static str| {
        let client = fixture.client.clone();
        let url = fixture.url(&format!("/api/cameras{}", query));
        async move {
            let body: Value = client.get(url).send().await.unwrap().json().await.unwrap();
            body["data"].as_array().unwrap().clone()
        }
    };

    assert_eq!(list("").await.len(), 2);
    assert_eq!(list("?q=NORTH").await.len(), 1);
    assert_eq!(list("?q=barn").await.len(), 1);
    assert_eq!(list("?status=online").await.len(), 1);
    assert_eq!(list("?q=barn&status=online").await.len(), 0);
    assert_eq!(list("?q=barn&status=offline").await.len(), 1);
}

#[tokio::test]
async fn test_alerts_seeded_and_marked_read() {
    let fixture = TestFixture::new().await;
    fixture.login().await;

    let resp = fixture
        .client
        .get(fixture.url("/api/alerts"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["total"], 3);
    assert_eq!(body["data"]["unreadCount"], 1);
    assert_eq!(body["data"]["alerts"][0]["type"], "person");
    assert!(fixture.kv.get_item(ALERTS_KEY).await.unwrap().is_some());

    let resp = fixture
        .client
        .post(fixture.url("/api/alerts/1/read"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["viewed"], true);

    let resp = fixture
        .client
        .get(fixture.url("/api/alerts/unread-count"))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["unreadCount"], 0);
    assert_eq!(body["data"]["total"], 3);

    let resp = fixture
        .client
        .post(fixture.url("/api/alerts/missing/read"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

async fn mark_all(fixture: &TestFixture) -> u64 {
    let body: Value = fixture
        .client
        .post(fixture.url("/api/alerts/read-all"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    body["data"]["changed"].as_u64().unwrap()
}

#[tokio::test]
async fn test_mark_all_read_idempotent() {
    let fixture = TestFixture::new().await;
    fixture.login().await;

    assert_eq!(mark_all(&fixture).await, 1);
    let after_once = fixture.state.alerts.list().await;
    assert_eq!(mark_all(&fixture).await, 0);
    assert_eq!(fixture.state.alerts.list().await, after_once);
}

#[tokio::test]
async fn test_alert_filters() {
    let fixture = TestFixture::new().await;
    fixture.login().await;

    let count = |query: &'static str| {
        let client = fixture.client.clone();
        let url = fixture.url(&format!("/api/alerts{}", query));
        async move {
            let body: Value = client.get(url).send().await.unwrap().json().await.unwrap();
            body["data"]["total"].as_u64().unwrap()
        }
    };

    assert_eq!(count("?q=BARN").await, 1);
    assert_eq!(count("?q=north%20field").await, 2);
    assert_eq!(count("?status=unread").await, 1);
    assert_eq!(count("?status=read&type=vehicle").await, 1);
    assert_eq!(count("?type=all").await, 3);
    assert_eq!(count("?q=north&type=animal").await, 0);
}

#[tokio::test]
async fn test_generated_alert_visible_through_api() {
    let fixture = TestFixture::new().await;
    fixture.login().await;
    let camera = fixture.add_camera("Gate Camera", "East Gate").await;

    // Drive one trial by hand with a source that always fires
    use crate::alerts::{AlertGenerator, SyntheticAlertSource};
    use rand::{rngs::StdRng, SeedableRng};
    let generator = AlertGenerator::new(
        fixture.state.auth.clone(),
        fixture.state.cameras.clone(),
        fixture.state.alerts.clone(),
        Box::new(SyntheticAlertSource::new(StdRng::seed_from_u64(1), 1.0)),
    );
    let alert = generator.tick().await.unwrap().unwrap();

    let body: Value = fixture
        .client
        .get(fixture.url("/api/alerts?status=unread&q=east%20gate"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["alerts"][0]["id"], alert.id.as_str());
    assert_eq!(body["data"]["alerts"][0]["cameraId"], camera["id"]);

    let body: Value = fixture
        .client
        .get(fixture.url(&format!("/api/cameras/{}", camera["id"].as_str().unwrap())))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["lastAlert"], alert.timestamp.as_str());
}

#[tokio::test]
async fn test_dashboard_summary() {
    let fixture = TestFixture::new().await;
    fixture.login().await;
    fixture.add_camera("North Field Camera", "North Boundary").await;

    let resp = fixture
        .client
        .get(fixture.url("/api/dashboard"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let data = &body["data"];
    assert_eq!(data["stats"]["activeCameras"], 1);
    assert_eq!(data["stats"]["percentOnline"], 100);
    assert_eq!(data["stats"]["recentAlerts"], 3);
    assert_eq!(data["stats"]["unreadAlerts"], 1);
    assert_eq!(data["recentAlerts"].as_array().unwrap().len(), 3);
    assert!(data["recentAlerts"][0]["timeAgo"]
        .as_str()
        .unwrap()
        .ends_with("ago"));
    assert_eq!(data["cameraSummary"]["total"], 1);
}

#[tokio::test]
async fn test_logout_clears_session_data() {
    let fixture = TestFixture::new().await;
    fixture.login().await;
    fixture.add_camera("Gate", "East Gate").await;

    let resp = fixture
        .client
        .post(fixture.url("/api/auth/logout"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    assert!(fixture.state.cameras.list().await.is_empty());
    assert!(fixture.state.alerts.list().await.is_empty());
    let resp = fixture
        .client
        .get(fixture.url("/api/cameras"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    // Storage still holds the data for the next session
    fixture.login().await;
    assert_eq!(fixture.state.cameras.list().await.len(), 1);
    assert_eq!(fixture.state.alerts.list().await.len(), 3);
}

#[tokio::test]
async fn test_notification_permission() {
    let fixture = TestFixture::new().await;

    let body: Value = fixture
        .client
        .get(fixture.url("/api/notifications/permission"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["permission"], "default");

    let body: Value = fixture
        .client
        .post(fixture.url("/api/notifications/permission"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["permission"], "granted");

    let denied =
        TestFixture::with_options(NotificationPolicy::Denied, VideoServiceKind::Passthrough)
            .await;
    let resp = denied
        .client
        .post(denied.url("/api/notifications/permission"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "PERMISSION_DENIED");
}

#[tokio::test]
async fn test_video_processing() {
    let fixture = TestFixture::new().await;
    fixture.login().await;

    let resp = fixture
        .client
        .post(fixture.url("/api/video/process"))
        .body(vec![0u8, 1, 2, 3])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.bytes().await.unwrap().to_vec(), vec![0u8, 1, 2, 3]);

    let unavailable =
        TestFixture::with_options(NotificationPolicy::Prompt, VideoServiceKind::Unavailable)
            .await;
    unavailable.login().await;
    let resp = unavailable
        .client
        .post(unavailable.url("/api/video/process"))
        .body(vec![0u8])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 503);
}
