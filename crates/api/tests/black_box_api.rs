use reqwest::StatusCode;
use serde_json::{Value, json};

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn(jwt_secret: &str) -> Self {
        // Build app (same router as prod), but bind to an ephemeral port.
        let app = reqtrack_api::app::build_app(jwt_secret.to_string()).await;
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

const ADMIN_EMAIL: &str = "admin@reqtrack.local";
const ADMIN_PASSWORD: &str = "change-me-admin";

/// Log in, retrying briefly: the user directory is projection-fed, so a
/// freshly created account becomes visible a beat after the command commits.
async fn login(client: &reqwest::Client, base_url: &str, email: &str, password: &str) -> Value {
    for _ in 0..100 {
        let res = client
            .post(format!("{}/auth/login", base_url))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .unwrap();

        if res.status() == StatusCode::OK {
            return res.json().await.unwrap();
        }

        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }

    panic!("login for {email} did not succeed within timeout");
}

async fn access_token(client: &reqwest::Client, base_url: &str, email: &str, password: &str) -> String {
    let tokens = login(client, base_url, email, password).await;
    tokens["access_token"].as_str().unwrap().to_string()
}

async fn create_user(
    client: &reqwest::Client,
    base_url: &str,
    admin_token: &str,
    email: &str,
    password: &str,
    roles: &[&str],
) -> String {
    let res = client
        .post(format!("{}/users", base_url))
        .bearer_auth(admin_token)
        .json(&json!({
            "email": email,
            "display_name": "Test User",
            "password": password,
            "roles": roles,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await.unwrap();
    body["id"].as_str().unwrap().to_string()
}

fn requirement_body() -> Value {
    json!({
        "position_title": "Senior Backend Engineer",
        "department_id": uuid::Uuid::now_v7(),
        "job_level_id": uuid::Uuid::now_v7(),
        "location_id": uuid::Uuid::now_v7(),
        "kind": "new",
        "employment_type": "full_time",
        "work_mode": "hybrid",
        "position_count": 2,
        "priority": "high",
        "job_description": "Own the requisition platform backend.",
        "key_responsibilities": null,
        "required_qualifications": "5+ years building distributed systems.",
        "preferred_qualifications": null,
        "required_skills": ["rust", "postgres"],
        "compensation": { "min": 14_000_000u64, "max": 18_000_000u64, "currency": "USD" },
        "target_start_date": null,
        "expected_closure_date": null,
        "justification": "Team is under-staffed for the roadmap."
    })
}

async fn get_requirement_eventually(
    client: &reqwest::Client,
    base_url: &str,
    token: &str,
    id: &str,
    expected_status: &str,
) -> Value {
    // The API is intentionally eventual-consistent (command path vs
    // projection update). Poll briefly until the projection catches up.
    for _ in 0..100 {
        let res = client
            .get(format!("{}/requirements/{}", base_url, id))
            .bearer_auth(token)
            .send()
            .await
            .unwrap();

        if res.status() == StatusCode::OK {
            let body: Value = res.json().await.unwrap();
            if body["status"] == expected_status {
                return body;
            }
        }

        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }

    panic!("requirement {id} did not reach status {expected_status} within timeout");
}

#[tokio::test]
async fn health_is_public_but_api_requires_auth() {
    let srv = TestServer::spawn("test-secret").await;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/health", srv.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .get(format!("{}/requirements", srv.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client
        .get(format!("{}/requirements", srv.base_url))
        .bearer_auth("not-a-token")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_refresh_and_identity() {
    let srv = TestServer::spawn("test-secret").await;
    let client = reqwest::Client::new();

    let tokens = login(&client, &srv.base_url, ADMIN_EMAIL, ADMIN_PASSWORD).await;
    let access = tokens["access_token"].as_str().unwrap();
    let refresh = tokens["refresh_token"].as_str().unwrap();

    let res = client
        .get(format!("{}/auth/me", srv.base_url))
        .bearer_auth(access)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let me: Value = res.json().await.unwrap();
    assert_eq!(me["email"], ADMIN_EMAIL);
    assert!(me["roles"].as_array().unwrap().iter().any(|r| r == "admin"));
    assert_eq!(me["superuser"], true);

    // A refresh token is not an access token.
    let res = client
        .get(format!("{}/auth/me", srv.base_url))
        .bearer_auth(refresh)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    // But it mints a fresh pair.
    let res = client
        .post(format!("{}/auth/refresh", srv.base_url))
        .json(&json!({ "refresh_token": refresh }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let refreshed: Value = res.json().await.unwrap();

    let res = client
        .get(format!("{}/auth/me", srv.base_url))
        .bearer_auth(refreshed["access_token"].as_str().unwrap())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .post(format!("{}/auth/login", srv.base_url))
        .json(&json!({ "email": ADMIN_EMAIL, "password": "wrong-password" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn full_requisition_lifecycle() {
    let srv = TestServer::spawn("test-secret").await;
    let client = reqwest::Client::new();

    let admin_token = access_token(&client, &srv.base_url, ADMIN_EMAIL, ADMIN_PASSWORD).await;

    create_user(
        &client,
        &srv.base_url,
        &admin_token,
        "hm@example.com",
        "hm-password-1",
        &["hiring_manager"],
    )
    .await;
    let recruiter_id = create_user(
        &client,
        &srv.base_url,
        &admin_token,
        "recruiter@example.com",
        "rec-password-1",
        &["recruiter"],
    )
    .await;

    let hm_token = access_token(&client, &srv.base_url, "hm@example.com", "hm-password-1").await;

    // Create: DRAFT with the first requisition number.
    let res = client
        .post(format!("{}/requirements", srv.base_url))
        .bearer_auth(&hm_token)
        .json(&requirement_body())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let created: Value = res.json().await.unwrap();
    let id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["requirement_number"], "REQ-00001");
    assert_eq!(created["status"], "DRAFT");

    // Submit: SUBMITTED, approval created for the bootstrap admin (the only
    // admin/approver in the directory).
    let res = client
        .post(format!("{}/requirements/{}/submit", srv.base_url, id))
        .bearer_auth(&hm_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    get_requirement_eventually(&client, &srv.base_url, &hm_token, &id, "SUBMITTED").await;

    // The approver sees it in their inbox with requirement context.
    let mut inbox_items = Vec::new();
    for _ in 0..100 {
        let res = client
            .get(format!("{}/approvals/pending", srv.base_url))
            .bearer_auth(&admin_token)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let inbox: Value = res.json().await.unwrap();
        inbox_items = inbox["items"].as_array().unwrap().clone();
        if !inbox_items.is_empty() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert_eq!(inbox_items.len(), 1);
    assert_eq!(inbox_items[0]["position_title"], "Senior Backend Engineer");
    assert_eq!(inbox_items[0]["requirement_number"], "REQ-00001");
    assert_eq!(inbox_items[0]["status"], "PENDING");

    // Approve: APPROVED with approved_at stamped.
    let res = client
        .post(format!("{}/requirements/{}/approve", srv.base_url, id))
        .bearer_auth(&admin_token)
        .json(&json!({ "comments": "Looks good" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let approved = get_requirement_eventually(&client, &srv.base_url, &hm_token, &id, "APPROVED").await;
    assert!(!approved["approved_at"].is_null());

    // Logging in as the recruiter first also guarantees the directory
    // projection has caught up before the assignment resolves the target.
    let recruiter_token =
        access_token(&client, &srv.base_url, "recruiter@example.com", "rec-password-1").await;

    // Assign recruiter: status unchanged, assignment recorded.
    let res = client
        .post(format!(
            "{}/requirements/{}/assign-recruiter/{}",
            srv.base_url, id, recruiter_id
        ))
        .bearer_auth(&hm_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let assigned = get_requirement_eventually(&client, &srv.base_url, &hm_token, &id, "APPROVED").await;
    assert_eq!(assigned["assigned_recruiter_id"], recruiter_id);

    // Activate as the assigned recruiter: ACTIVE.
    let res = client
        .post(format!("{}/requirements/{}/activate", srv.base_url, id))
        .bearer_auth(&recruiter_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    get_requirement_eventually(&client, &srv.base_url, &hm_token, &id, "ACTIVE").await;

    // Approval history shows the resolved decision.
    let res = client
        .get(format!("{}/requirements/{}/approvals", srv.base_url, id))
        .bearer_auth(&hm_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let history: Value = res.json().await.unwrap();
    let items = history["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["status"], "APPROVED");
    assert_eq!(items[0]["comments"], "Looks good");
}

#[tokio::test]
async fn rejection_flow_and_comment_validation() {
    let srv = TestServer::spawn("test-secret").await;
    let client = reqwest::Client::new();

    let admin_token = access_token(&client, &srv.base_url, ADMIN_EMAIL, ADMIN_PASSWORD).await;
    create_user(
        &client,
        &srv.base_url,
        &admin_token,
        "hm@example.com",
        "hm-password-1",
        &["hiring_manager"],
    )
    .await;
    let hm_token = access_token(&client, &srv.base_url, "hm@example.com", "hm-password-1").await;

    let res = client
        .post(format!("{}/requirements", srv.base_url))
        .bearer_auth(&hm_token)
        .json(&requirement_body())
        .send()
        .await
        .unwrap();
    let id = res.json::<Value>().await.unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string();

    let res = client
        .post(format!("{}/requirements/{}/submit", srv.base_url, id))
        .bearer_auth(&hm_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // Short rejection comments are refused and nothing moves.
    let res = client
        .post(format!("{}/requirements/{}/reject", srv.base_url, id))
        .bearer_auth(&admin_token)
        .json(&json!({ "comments": "too short" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    get_requirement_eventually(&client, &srv.base_url, &hm_token, &id, "SUBMITTED").await;

    let res = client
        .post(format!("{}/requirements/{}/reject", srv.base_url, id))
        .bearer_auth(&admin_token)
        .json(&json!({ "comments": "Budget not available this quarter" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let rejected = get_requirement_eventually(&client, &srv.base_url, &hm_token, &id, "REJECTED").await;
    assert!(rejected["approved_at"].is_null());

    // REJECTED is terminal: no resubmission.
    let res = client
        .post(format!("{}/requirements/{}/submit", srv.base_url, id))
        .bearer_auth(&hm_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn double_submit_names_current_status() {
    let srv = TestServer::spawn("test-secret").await;
    let client = reqwest::Client::new();

    let admin_token = access_token(&client, &srv.base_url, ADMIN_EMAIL, ADMIN_PASSWORD).await;
    create_user(
        &client,
        &srv.base_url,
        &admin_token,
        "hm@example.com",
        "hm-password-1",
        &["hiring_manager"],
    )
    .await;
    let hm_token = access_token(&client, &srv.base_url, "hm@example.com", "hm-password-1").await;

    let res = client
        .post(format!("{}/requirements", srv.base_url))
        .bearer_auth(&hm_token)
        .json(&requirement_body())
        .send()
        .await
        .unwrap();
    let id = res.json::<Value>().await.unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string();

    let res = client
        .post(format!("{}/requirements/{}/submit", srv.base_url, id))
        .bearer_auth(&hm_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .post(format!("{}/requirements/{}/submit", srv.base_url, id))
        .bearer_auth(&hm_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_transition");
    assert!(body["message"].as_str().unwrap().contains("SUBMITTED"));
}

#[tokio::test]
async fn rbac_denials() {
    let srv = TestServer::spawn("test-secret").await;
    let client = reqwest::Client::new();

    let admin_token = access_token(&client, &srv.base_url, ADMIN_EMAIL, ADMIN_PASSWORD).await;
    create_user(
        &client,
        &srv.base_url,
        &admin_token,
        "hm@example.com",
        "hm-password-1",
        &["hiring_manager"],
    )
    .await;
    create_user(
        &client,
        &srv.base_url,
        &admin_token,
        "viewer@example.com",
        "view-password-1",
        &["viewer"],
    )
    .await;
    let assigned_id = create_user(
        &client,
        &srv.base_url,
        &admin_token,
        "assigned@example.com",
        "rec-password-1",
        &["recruiter"],
    )
    .await;
    create_user(
        &client,
        &srv.base_url,
        &admin_token,
        "other@example.com",
        "rec-password-2",
        &["recruiter"],
    )
    .await;

    // A viewer may read but not create.
    let viewer_token =
        access_token(&client, &srv.base_url, "viewer@example.com", "view-password-1").await;
    let res = client
        .get(format!("{}/requirements", srv.base_url))
        .bearer_auth(&viewer_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let res = client
        .post(format!("{}/requirements", srv.base_url))
        .bearer_auth(&viewer_token)
        .json(&requirement_body())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    // Drive a requisition to APPROVED with an assigned recruiter.
    let hm_token = access_token(&client, &srv.base_url, "hm@example.com", "hm-password-1").await;
    let res = client
        .post(format!("{}/requirements", srv.base_url))
        .bearer_auth(&hm_token)
        .json(&requirement_body())
        .send()
        .await
        .unwrap();
    let id = res.json::<Value>().await.unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string();
    client
        .post(format!("{}/requirements/{}/submit", srv.base_url, id))
        .bearer_auth(&hm_token)
        .send()
        .await
        .unwrap();
    client
        .post(format!("{}/requirements/{}/approve", srv.base_url, id))
        .bearer_auth(&admin_token)
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    get_requirement_eventually(&client, &srv.base_url, &hm_token, &id, "APPROVED").await;

    // Logging in as the assignee first guarantees the directory projection
    // can resolve them when the assignment lands.
    let _assigned_token =
        access_token(&client, &srv.base_url, "assigned@example.com", "rec-password-1").await;
    let res = client
        .post(format!(
            "{}/requirements/{}/assign-recruiter/{}",
            srv.base_url, id, assigned_id
        ))
        .bearer_auth(&hm_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // A recruiter who holds the role but is not the assignee cannot activate.
    let other_token =
        access_token(&client, &srv.base_url, "other@example.com", "rec-password-2").await;
    let res = client
        .post(format!("{}/requirements/{}/activate", srv.base_url, id))
        .bearer_auth(&other_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    // Approving without a pending approval row is refused outright.
    let res = client
        .post(format!("{}/requirements/{}/approve", srv.base_url, id))
        .bearer_auth(&viewer_token)
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert!(
        res.status() == StatusCode::FORBIDDEN || res.status() == StatusCode::CONFLICT,
        "unexpected status {}",
        res.status()
    );
}

#[tokio::test]
async fn externally_minted_token_is_accepted() {
    use chrono::{Duration as ChronoDuration, Utc};
    use jsonwebtoken::{Algorithm, EncodingKey, Header};
    use reqtrack_auth::{JwtClaims, Role, TokenType};
    use reqtrack_core::UserId;

    let jwt_secret = "test-secret";
    let srv = TestServer::spawn(jwt_secret).await;
    let client = reqwest::Client::new();

    // Tokens issued by an external identity provider sharing the secret are
    // honored; roles come from the claims.
    let now = Utc::now();
    let claims = JwtClaims {
        sub: UserId::new(),
        roles: vec![Role::new("viewer")],
        superuser: false,
        token_type: TokenType::Access,
        issued_at: now,
        expires_at: now + ChronoDuration::minutes(10),
    };
    let token = jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_bytes()),
    )
    .expect("failed to encode jwt");

    let res = client
        .get(format!("{}/requirements", srv.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // A viewer token cannot create requirements.
    let res = client
        .post(format!("{}/requirements", srv.base_url))
        .bearer_auth(&token)
        .json(&requirement_body())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}
