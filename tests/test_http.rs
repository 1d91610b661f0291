//! End-to-end tests of the HTTP surface
//!
//! Requests run through the full warp filter tree with an in-memory store and
//! mocked reCAPTCHA and routing APIs.

use mapsite::ajax::{AjaxResponse, AjaxResult};
use mapsite::config::AppConfig;
use mapsite::directions::RETRIEVAL_FAILED;
use mapsite::forms::INVALID_LOGIN;
use mapsite::server::{routes, AppState};
use mapsite::store::ProfileStore;
use mapsite::testing::{MockCaptchaVerifier, MockRoutingApi};
use serde_json::Value;
use std::sync::Arc;
use warp::http::StatusCode;

const PASSWORD: &str = "Tr4vel-Maps-2024";

type TestResponse = warp::http::Response<warp::hyper::body::Bytes>;

fn test_config() -> AppConfig {
    AppConfig::from_toml(
        r#"
[server]
success_redirect = "/account"

[recaptcha]
site_key = "site"
secret_key_env = "RECAPTCHA_PRIVATE_KEY"
min_score = 0.5

[maps]
api_key_env = "GOOGLE_API_KEY"
"#,
    )
    .unwrap()
}

struct Harness {
    state: Arc<AppState>,
    captcha: Arc<MockCaptchaVerifier>,
    routing: Arc<MockRoutingApi>,
}

impl Harness {
    fn new(captcha: MockCaptchaVerifier, routing: MockRoutingApi) -> Self {
        let captcha = Arc::new(captcha);
        let routing = Arc::new(routing);
        let state = Arc::new(AppState::new(
            test_config(),
            ProfileStore::open_in_memory().unwrap(),
            captcha.clone(),
            routing.clone(),
        ));
        Self {
            state,
            captcha,
            routing,
        }
    }

    fn standard() -> Self {
        Self::new(MockCaptchaVerifier::passing(0.9), MockRoutingApi::two_legs())
    }

    async fn post(
        &self,
        path: &str,
        body: &str,
        ajax: bool,
        cookie: Option<&str>,
    ) -> TestResponse {
        let mut request = warp::test::request()
            .method("POST")
            .path(path)
            .header("content-type", "application/x-www-form-urlencoded")
            .body(body.to_string());
        if ajax {
            request = request.header("x-requested-with", "XMLHttpRequest");
        }
        if let Some(cookie) = cookie {
            request = request.header("cookie", cookie);
        }
        request.reply(&routes(self.state.clone())).await
    }

    async fn get(&self, path: &str, cookie: Option<&str>) -> TestResponse {
        let mut request = warp::test::request().method("GET").path(path);
        if let Some(cookie) = cookie {
            request = request.header("cookie", cookie);
        }
        request.reply(&routes(self.state.clone())).await
    }

    /// Sign up over AJAX and return the `Cookie` header value for the session
    async fn sign_up(&self, username: &str) -> String {
        let response = self.post("/sign-up", &signup_body(username), true, None).await;
        assert_eq!(response.status(), StatusCode::OK);
        session_cookie(&response)
    }
}

fn signup_body(username: &str) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .append_pair("first_name", "Ada")
        .append_pair("last_name", "Lovelace")
        .append_pair("username", username)
        .append_pair("password1", PASSWORD)
        .append_pair("password2", PASSWORD)
        .append_pair("token", "captcha-token")
        .finish()
}

fn login_body(username: &str, password: &str) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .append_pair("username", username)
        .append_pair("password", password)
        .finish()
}

fn session_cookie(response: &TestResponse) -> String {
    let header = response
        .headers()
        .get("set-cookie")
        .expect("response should set a session cookie")
        .to_str()
        .unwrap();
    header.split(';').next().unwrap().to_string()
}

fn location(response: &TestResponse) -> &str {
    response.headers()["location"].to_str().unwrap()
}

fn envelope(response: &TestResponse) -> AjaxResponse {
    serde_json::from_slice(response.body()).unwrap()
}

fn json(response: &TestResponse) -> Value {
    serde_json::from_slice(response.body()).unwrap()
}

const ROUTE_QUERY: &str = "lat_a=51.5074&long_a=-0.1278&lat_b=51.752&long_b=-1.2577";

#[tokio::test]
async fn test_ajax_signup_creates_user_and_session() {
    let harness = Harness::standard();

    let response = harness
        .post("/sign-up", &signup_body("ada@example.com"), true, None)
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        envelope(&response),
        AjaxResponse::success("Thank you for signing up")
    );
    assert!(session_cookie(&response).starts_with("sessionid="));

    let user = harness
        .state
        .store
        .find_user_by_username("ada@example.com")
        .unwrap()
        .expect("user should exist");
    assert_eq!(user.email, "ada@example.com");
    assert_eq!(user.first_name, "Ada");

    let profile = harness.state.store.get_profile(user.id).unwrap().unwrap();
    assert_eq!(profile.captcha_score, 0.9);
    assert!(!profile.has_profile);
    assert_eq!(harness.captcha.get_seen_tokens().await, vec!["captcha-token"]);
}

#[tokio::test]
async fn test_plain_signup_redirects_on_success() {
    let harness = Harness::standard();

    let response = harness
        .post("/sign-up", &signup_body("ada@example.com"), false, None)
        .await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/account");
}

#[tokio::test]
async fn test_invalid_signup_reports_field_errors_without_verifying() {
    let harness = Harness::standard();

    let response = harness
        .post("/sign-up", "first_name=Ada&username=not-an-email", true, None)
        .await;

    let envelope = envelope(&response);
    assert_eq!(envelope.result, AjaxResult::Error);
    assert!(envelope.message.contains("* last_name\n  * This field is required."));
    assert!(envelope.message.contains("* username\n  * Enter a valid email address."));
    assert!(harness.captcha.get_seen_tokens().await.is_empty());
}

#[tokio::test]
async fn test_duplicate_username_is_rejected() {
    let harness = Harness::standard();
    harness.sign_up("ada@example.com").await;

    let response = harness
        .post("/sign-up", &signup_body("ada@example.com"), true, None)
        .await;

    let envelope = envelope(&response);
    assert_eq!(envelope.result, AjaxResult::Error);
    assert!(envelope
        .message
        .contains("A user with that username already exists."));
}

#[tokio::test]
async fn test_failed_captcha_creates_no_user() {
    let harness = Harness::new(MockCaptchaVerifier::failing(), MockRoutingApi::two_legs());

    let response = harness
        .post("/sign-up", &signup_body("bot@example.com"), true, None)
        .await;

    assert_eq!(
        envelope(&response),
        AjaxResponse::error("There was an error, please try again")
    );
    assert!(response.headers().get("set-cookie").is_none());
    assert!(harness
        .state
        .store
        .find_user_by_username("bot@example.com")
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_low_captcha_score_is_rejected() {
    let harness = Harness::new(MockCaptchaVerifier::passing(0.2), MockRoutingApi::two_legs());

    let response = harness
        .post("/sign-up", &signup_body("bot@example.com"), true, None)
        .await;

    assert_eq!(envelope(&response).result, AjaxResult::Error);
}

#[tokio::test]
async fn test_unreachable_captcha_service_fails_signup() {
    let harness = Harness::new(MockCaptchaVerifier::unavailable(), MockRoutingApi::two_legs());

    let response = harness
        .post("/sign-up", &signup_body("ada@example.com"), false, None)
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response.body().as_ref(), b"There was an error, please try again");
}

#[tokio::test]
async fn test_sign_in_checks_password() {
    let harness = Harness::standard();
    harness.sign_up("ada@example.com").await;

    let wrong = harness
        .post("/sign-in", &login_body("ada@example.com", "nope"), true, None)
        .await;
    let envelope_wrong = envelope(&wrong);
    assert_eq!(envelope_wrong.result, AjaxResult::Error);
    assert!(envelope_wrong.message.contains(INVALID_LOGIN));
    assert!(wrong.headers().get("set-cookie").is_none());

    let right = harness
        .post("/sign-in", &login_body("ada@example.com", PASSWORD), true, None)
        .await;
    assert_eq!(envelope(&right), AjaxResponse::success(""));
    assert!(session_cookie(&right).starts_with("sessionid="));
}

#[tokio::test]
async fn test_account_requires_login() {
    let harness = Harness::standard();

    let response = harness.get("/account", None).await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/sign-in?next=%2Faccount");
}

#[tokio::test]
async fn test_account_update_is_visible_on_account_page() {
    let harness = Harness::standard();
    let cookie = harness.sign_up("ada@example.com").await;

    let body = "address=12+St+James%27s+Square&town=London&county=Greater+London&post_code=SW1Y+4LB\
&country=United+Kingdom&longitude=-0.1357&latitude=51.5074";
    let response = harness.post("/account", body, true, Some(&cookie)).await;
    assert_eq!(envelope(&response), AjaxResponse::success(""));

    let response = harness.get("/account", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let account = json(&response);
    assert_eq!(account["user"]["username"], "ada@example.com");
    assert!(account["user"].get("password_hash").is_none());
    assert_eq!(account["profile"]["address"], "12 St James's Square");
    assert_eq!(account["profile"]["post_code"], "SW1Y 4LB");
    assert_eq!(account["profile"]["has_profile"], true);
}

#[tokio::test]
async fn test_account_update_enforces_field_lengths() {
    let harness = Harness::standard();
    let cookie = harness.sign_up("ada@example.com").await;

    let response = harness
        .post("/account", "post_code=ABCDEFGHIJ", true, Some(&cookie))
        .await;

    let envelope = envelope(&response);
    assert_eq!(envelope.result, AjaxResult::Error);
    assert!(envelope.message.contains("* post_code"));
}

#[tokio::test]
async fn test_sign_out_ends_session() {
    let harness = Harness::standard();
    let cookie = harness.sign_up("ada@example.com").await;

    let response = harness.get("/sign-out", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert!(response.headers()["set-cookie"]
        .to_str()
        .unwrap()
        .contains("Max-Age=0"));

    let response = harness.get("/account", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::FOUND);
}

#[tokio::test]
async fn test_route_form_redirects_to_map() {
    let harness = Harness::standard();
    let cookie = harness.sign_up("ada@example.com").await;

    let response = harness
        .post("/route", ROUTE_QUERY, false, Some(&cookie))
        .await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), format!("/map?{ROUTE_QUERY}"));
}

#[tokio::test]
async fn test_map_returns_directions_summary() {
    let harness = Harness::standard();
    let cookie = harness.sign_up("ada@example.com").await;

    let response = harness
        .get(&format!("/map?{ROUTE_QUERY}&lat_c=51.6&long_c=-0.7"), Some(&cookie))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let summary = json(&response);
    assert_eq!(summary["origin"], "51.5074, -0.1278");
    assert_eq!(summary["destination"], "51.752, -1.2577");
    assert_eq!(summary["distance"], "15.00 Km");
    assert_eq!(summary["duration"], "20 minutes");
    assert_eq!(summary["route"].as_array().unwrap().len(), 2);

    let queries = harness.routing.get_queries().await;
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0].waypoints_param().as_deref(), Some("51.6, -0.7"));
}

#[tokio::test]
async fn test_map_reports_retrieval_failure() {
    let harness = Harness::new(MockCaptchaVerifier::passing(0.9), MockRoutingApi::denied());
    let cookie = harness.sign_up("ada@example.com").await;

    let response = harness
        .get(&format!("/map?{ROUTE_QUERY}"), Some(&cookie))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json(&response), serde_json::json!({ "error": RETRIEVAL_FAILED }));
}

#[tokio::test]
async fn test_map_rejects_bad_coordinates() {
    let harness = Harness::standard();
    let cookie = harness.sign_up("ada@example.com").await;

    let response = harness
        .get("/map?lat_a=north&long_a=-0.1&lat_b=51.7&long_b=-1.2", Some(&cookie))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(harness.routing.get_queries().await.is_empty());
}

#[tokio::test]
async fn test_map_requires_login_and_remembers_query() {
    let harness = Harness::standard();

    let response = harness.get(&format!("/map?{ROUTE_QUERY}"), None).await;

    assert_eq!(response.status(), StatusCode::FOUND);
    let next = location(&response);
    assert!(next.starts_with("/sign-in?next=%2Fmap%3F"));
    assert!(next.contains("lat_a%3D51.5074"));
}

#[tokio::test]
async fn test_health_and_liveness() {
    let harness = Harness::standard();

    let response = harness.get("/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let health = json(&response);
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["checks"]["database"]["status"], "healthy");

    let response = harness.get("/live", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json(&response)["alive"], true);
}

#[tokio::test]
async fn test_unknown_path_is_not_found() {
    let harness = Harness::standard();

    let response = harness.get("/nowhere", None).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json(&response)["error"], "Not found");
}

#[tokio::test]
async fn test_requested_with_header_selects_json_envelope() {
    let harness = Harness::standard();

    let xhr = harness.post("/sign-in", "username=ada", true, None).await;
    assert_eq!(xhr.status(), StatusCode::OK);
    assert_eq!(envelope(&xhr).result, AjaxResult::Error);

    let plain = harness.post("/sign-in", "username=ada", false, None).await;
    assert_eq!(plain.status(), StatusCode::BAD_REQUEST);
    assert!(std::str::from_utf8(plain.body())
        .unwrap()
        .contains("* username"));
}

#[tokio::test]
async fn test_route_requires_login_and_points_next_at_map() {
    let harness = Harness::standard();

    let response = harness.post("/route", ROUTE_QUERY, false, None).await;

    assert_eq!(response.status(), StatusCode::FOUND);
    let next = location(&response);
    assert!(next.starts_with("/sign-in?next=%2Fmap%3F"));
    assert!(next.contains("lat_a%3D51.5074"));
    assert!(!next.contains("%2Froute"));
}

#[tokio::test]
async fn test_submitted_coordinates_are_echoed_unchanged() {
    let harness = Harness::standard();
    let cookie = harness.sign_up("ada@example.com").await;
    let query = "lat_a=51.50&long_a=-0.10&lat_b=52.0&long_b=1";

    let response = harness.post("/route", query, false, Some(&cookie)).await;
    assert_eq!(location(&response), format!("/map?{query}"));

    let response = harness.get(&format!("/map?{query}"), Some(&cookie)).await;
    let summary = json(&response);
    assert_eq!(summary["origin"], "51.50, -0.10");
    assert_eq!(summary["destination"], "52.0, 1");
}
