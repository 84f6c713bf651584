use chrono::{Duration as ChronoDuration, Utc};
use estore_auth::{JwtClaims, Role};
use estore_core::UserId;
use estore_infra::AppConfig;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{Value, json};

const SECRET: &str = "test-secret";

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod with in-memory backends, on an ephemeral port.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let config = AppConfig {
            jwt_secret: Some(SECRET.to_string()),
            public_storage_url: format!("{base_url}/storage"),
            ..AppConfig::default()
        };
        let app = estore_api::app::build_app(config).await.expect("in-memory app");

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt_for(secret: &str, email: &str, role: Role) -> String {
    let now = Utc::now();
    let claims = JwtClaims {
        sub: UserId::new(),
        email: email.to_string(),
        role,
        issued_at: now,
        expires_at: now + ChronoDuration::minutes(10),
    };

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("failed to encode jwt")
}

fn mint_jwt(role: Role) -> String {
    mint_jwt_for(SECRET, &format!("{}@example.com", role.as_str().to_lowercase()), role)
}

async fn create_item(client: &reqwest::Client, srv: &TestServer, token: &str, material: &str, qty: f64) -> Value {
    let res = client
        .post(srv.url("/inventory/items"))
        .bearer_auth(token)
        .json(&json!({
            "material_no": material,
            "sloc": "WH01",
            "name": format!("Item {material}"),
            "quantity": qty,
            "uom": "PCS",
            "min_stock": 2
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    res.json().await.unwrap()
}

#[tokio::test]
async fn protected_routes_require_a_valid_token() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client.get(srv.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client.get(srv.url("/whoami")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let forged = mint_jwt_for("other-secret", "x@example.com", Role::Admin);
    let res = client.get(srv.url("/whoami")).bearer_auth(forged).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn whoami_reports_role_and_navigation() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let body: Value = client
        .get(srv.url("/whoami"))
        .bearer_auth(mint_jwt(Role::Staff))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["role"], "STAFF");
    let modules: Vec<&str> = body["allowed_modules"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m.as_str().unwrap())
        .collect();
    assert_eq!(
        modules,
        ["dashboard", "inventory", "purchase", "opname", "transactions", "profile"]
    );

    let perms: Value = client
        .get(srv.url("/permissions"))
        .bearer_auth(mint_jwt(Role::User))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let inventory = perms["modules"]
        .as_array()
        .unwrap()
        .iter()
        .find(|m| m["module"] == "inventory")
        .unwrap();
    assert_eq!(inventory["actions"], json!(["read"]));
}

#[tokio::test]
async fn read_only_role_cannot_create() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = mint_jwt(Role::User);

    let res = client
        .post(srv.url("/inventory/items"))
        .bearer_auth(&token)
        .json(&json!({"material_no": "M-1", "sloc": "WH01", "name": "Bolt"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "forbidden");

    let res = client.get(srv.url("/purchases")).bearer_auth(&token).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client.get(srv.url("/inventory/items")).bearer_auth(&token).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn stock_movements_update_quantity_and_ledger() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let admin = mint_jwt(Role::Admin);
    let staff = mint_jwt(Role::Staff);

    let created = create_item(&client, &srv, &admin, "M-100", 10.0).await;
    assert_eq!(created["id"], "M-100:::WH01");
    assert_eq!(created["history"][0]["action"], "CREATED");

    let res = client
        .post(srv.url("/transactions/inbound"))
        .bearer_auth(&staff)
        .json(&json!({"material_no": "M-100", "sloc": "WH01", "quantity": 5, "gr_number": "GR-7", "po": "PO-1"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let receipt: Value = res.json().await.unwrap();
    assert_eq!(receipt["document_number"], "GR-7");
    assert_eq!(receipt["item"]["quantity"], 15.0);

    let res = client
        .post(srv.url("/transactions/outbound"))
        .bearer_auth(&staff)
        .json(&json!({"material_no": "M-100", "sloc": "WH01", "quantity": 20}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "insufficient_stock");
    assert_eq!(body["available"], 15.0);
    assert_eq!(body["requested"], 20.0);

    for qty in [6, 9] {
        let res = client
            .post(srv.url("/transactions/outbound"))
            .bearer_auth(&staff)
            .json(&json!({
                "material_no": "M-100", "sloc": "WH01", "quantity": qty,
                "issue_number": "ISS-1", "receiver": "Maintenance", "wbs": "WBS-9"
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
    }

    let page: Value = client
        .get(srv.url("/transactions?direction=OUT"))
        .bearer_auth(&staff)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(page["total_items"], 1);
    let group = &page["items"][0];
    assert_eq!(group["group_key"], "ISS-1");
    assert_eq!(group["total_qty"], 15.0);
    assert_eq!(group["item_count"], 2);
    assert_eq!(group["receiver"], "Maintenance");
    assert_eq!(group["secondary_info"], "WBS-9");

    let inbound: Value = client
        .get(srv.url("/transactions?direction=IN&search=gr-7"))
        .bearer_auth(&staff)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(inbound["total_items"], 1);
    assert_eq!(inbound["items"][0]["secondary_info"], "PO-1");

    let item: Value = client
        .get(srv.url("/inventory/items/M-100:::WH01"))
        .bearer_auth(&staff)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(item["quantity"], 0.0);
    assert_eq!(item["low_stock"], true);
    assert_eq!(item["history"].as_array().unwrap().len(), 4);
    assert_eq!(item["history"][0]["action"], "OUTBOUND");

    let ledger: Value = client
        .get(srv.url("/transactions/ledger?material_no=M-100"))
        .bearer_auth(&staff)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(ledger.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn duplicate_item_and_bad_id_are_rejected() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let admin = mint_jwt(Role::Admin);

    create_item(&client, &srv, &admin, "D-1", 1.0).await;
    let res = client
        .post(srv.url("/inventory/items"))
        .bearer_auth(&admin)
        .json(&json!({"material_no": "D-1", "sloc": "WH01", "name": "Again"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = client
        .get(srv.url("/inventory/items/no-separator"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .delete(srv.url("/inventory/items/NOPE:::WH01"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn item_image_is_stored_and_served() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let admin = mint_jwt(Role::Admin);
    create_item(&client, &srv, &admin, "IMG-1", 1.0).await;

    let res = client
        .put(srv.url("/inventory/items/IMG-1:::WH01/image?filename=photo.png"))
        .bearer_auth(&admin)
        .header("content-type", "text/plain")
        .body(vec![1u8, 2, 3])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .put(srv.url("/inventory/items/IMG-1:::WH01/image?filename=photo.png"))
        .bearer_auth(&admin)
        .header("content-type", "image/png")
        .body(vec![1u8, 2, 3])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let item: Value = res.json().await.unwrap();
    let url = item["image_url"].as_str().unwrap().to_string();
    assert!(url.contains("/storage/inventory-images/items/IMG-1-"));

    let res = client.get(&url).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["content-type"], "image/png");
    assert_eq!(res.bytes().await.unwrap().to_vec(), vec![1u8, 2, 3]);

    let res = client
        .delete(srv.url("/inventory/items/IMG-1:::WH01/image"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let res = client.get(&url).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn opname_session_flow() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let staff = mint_jwt(Role::Staff);
    create_item(&client, &srv, &staff, "OP-1", 10.0).await;
    create_item(&client, &srv, &staff, "OP-2", 4.0).await;

    let res = client
        .post(srv.url("/opname/sessions"))
        .bearer_auth(&staff)
        .json(&json!({"title": "Monthly count"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let session: Value = res.json().await.unwrap();
    assert_eq!(session["status"], "OPEN");
    assert_eq!(session["total_items"], 2);
    let sid = session["id"].as_str().unwrap().to_string();

    let page: Value = client
        .get(srv.url(&format!("/opname/sessions/{sid}/items?page=1&page_size=1")))
        .bearer_auth(&staff)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(page["total_items"], 2);
    assert_eq!(page["total_pages"], 2);
    assert_eq!(page["items"][0]["material_no"], "OP-1");
    let line_id = page["items"][0]["id"].as_str().unwrap().to_string();

    let line: Value = client
        .post(srv.url(&format!("/opname/items/{line_id}/count")))
        .bearer_auth(&staff)
        .json(&json!({"physical_qty": 7}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(line["variance"], -3.0);

    let stats: Value = client
        .get(srv.url(&format!("/opname/sessions/{sid}/stats")))
        .bearer_auth(&staff)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats, json!({"total": 2, "counted": 1, "matched": 0, "variance": 1}));

    let done: Value = client
        .post(srv.url(&format!("/opname/sessions/{sid}/finalize")))
        .bearer_auth(&staff)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(done["status"], "COMPLETED");

    let item: Value = client
        .get(srv.url("/inventory/items/OP-1:::WH01"))
        .bearer_auth(&staff)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(item["quantity"], 7.0);
    assert_eq!(item["history"][0]["action"], "OPNAME");

    let res = client
        .post(srv.url(&format!("/opname/items/{line_id}/count")))
        .bearer_auth(&staff)
        .json(&json!({"physical_qty": 1}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn purchase_order_status_is_one_way() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let staff = mint_jwt(Role::Staff);

    let res = client
        .post(srv.url("/purchases"))
        .bearer_auth(&staff)
        .json(&json!({
            "material_no": "M-5", "sloc": "WH01", "item_name": "Filter",
            "quantity": 3, "supplier": "ACME", "total_cost": 90
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let order: Value = res.json().await.unwrap();
    assert_eq!(order["status"], "ORDERED");
    let id = order["id"].as_str().unwrap().to_string();

    let res = client
        .post(srv.url(&format!("/purchases/{id}/status")))
        .bearer_auth(&staff)
        .json(&json!({"status": "RECEIVED"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .post(srv.url(&format!("/purchases/{id}/status")))
        .bearer_auth(&staff)
        .json(&json!({"status": "CANCELLED"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn users_and_profile() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let admin = mint_jwt(Role::Admin);

    let res = client
        .post(srv.url("/users"))
        .bearer_auth(&admin)
        .json(&json!({"name": "Dewi", "email": "Dewi@Example.com", "role": "STAFF"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let user: Value = res.json().await.unwrap();
    assert_eq!(user["email"], "dewi@example.com");

    let res = client
        .post(srv.url("/users"))
        .bearer_auth(&admin)
        .json(&json!({"name": "Dewi 2", "email": "dewi@example.com", "role": "USER"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let staff = mint_jwt_for(SECRET, "dewi@example.com", Role::Staff);
    let res = client.get(srv.url("/users")).bearer_auth(&staff).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let profile: Value = client
        .put(srv.url("/profile"))
        .bearer_auth(&staff)
        .json(&json!({"name": "Dewi S"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(profile["name"], "Dewi S");
    assert_eq!(profile["id"], user["id"]);

    let res = client
        .post(srv.url("/profile/password"))
        .bearer_auth(&staff)
        .json(&json!({"new_password": "secret123", "confirm_password": "secret12"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "validation_error");

    let res = client
        .post(srv.url("/profile/password"))
        .bearer_auth(&staff)
        .json(&json!({"new_password": "secret123", "confirm_password": "secret123"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["strength"], "Medium");
}
