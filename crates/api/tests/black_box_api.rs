use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use livebase_auth::{JwtClaims, Role};
use livebase_core::{TenantId, UserId};
use livebase_infra::AppConfig;
use reqwest::StatusCode;
use serde_json::{json, Value};

const JWT_SECRET: &str = "test-secret";

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
    _uploads: tempfile::TempDir,
}

impl TestServer {
    async fn spawn() -> Self {
        let uploads = tempfile::tempdir().expect("failed to create upload dir");
        let mut config = AppConfig::default();
        config.auth.jwt_secret = JWT_SECRET.to_string();
        config.cleanup.enabled = false;
        config.storage.local_root = uploads.path().to_path_buf();

        // Same router as prod (in-memory store), bound to an ephemeral port.
        let app = livebase_api::app::build_app(config)
            .await
            .expect("failed to build app");
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            handle,
            _uploads: uploads,
        }
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

fn mint_jwt(sub: UserId, tenant_id: TenantId, roles: &[&'static str]) -> String {
    let now = Utc::now();
    let claims = JwtClaims {
        sub,
        tenant_id,
        roles: roles.iter().map(|r| Role::new(*r)).collect(),
        issued_at: now - ChronoDuration::seconds(5),
        expires_at: now + ChronoDuration::minutes(10),
    };

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("failed to encode jwt")
}

fn admin_token(tenant_id: TenantId) -> String {
    mint_jwt(UserId::new(), tenant_id, &["admin"])
}

async fn send_json(
    client: &reqwest::Client,
    method: reqwest::Method,
    url: String,
    token: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut req = client.request(method, url).bearer_auth(token);
    if let Some(body) = body {
        req = req.json(&body);
    }
    let res = req.send().await.unwrap();
    let status = res.status();
    let body = res.json().await.unwrap_or(Value::Null);
    (status, body)
}

async fn post(client: &reqwest::Client, url: String, token: &str, body: Value) -> (StatusCode, Value) {
    send_json(client, reqwest::Method::POST, url, token, Some(body)).await
}

async fn get(client: &reqwest::Client, url: String, token: &str) -> (StatusCode, Value) {
    send_json(client, reqwest::Method::GET, url, token, None).await
}

/// Create a base, a warehouse location, one goods and one supplier.
struct Fixture {
    base_id: String,
    location_id: String,
    goods_id: String,
    supplier_id: String,
}

async fn seed(client: &reqwest::Client, srv: &TestServer, token: &str) -> Fixture {
    let (status, base) = post(
        client,
        srv.url("/bases"),
        token,
        json!({ "code": "sh01", "name": "Shanghai studio", "kind": "live_stream", "currency": "CNY" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{base}");
    assert_eq!(base["data"]["code"], "SH01");
    let base_id = base["data"]["id"].as_str().unwrap().to_string();

    let (status, location) = post(
        client,
        srv.url("/locations"),
        token,
        json!({ "base_id": base_id, "code": "WH1", "name": "Main warehouse", "kind": "warehouse" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{location}");

    let (status, goods) = post(
        client,
        srv.url("/goods"),
        token,
        json!({
            "code": "TEA-01",
            "name": "Green tea",
            "unit": "box",
            "purchase_price": 1200,
            "retail_price": 2000,
            "currency": "CNY"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{goods}");

    let (status, supplier) = post(
        client,
        srv.url("/parties"),
        token,
        json!({ "kind": "supplier", "name": "Hangzhou Tea Co" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{supplier}");

    Fixture {
        base_id,
        location_id: location["data"]["id"].as_str().unwrap().to_string(),
        goods_id: goods["data"]["id"].as_str().unwrap().to_string(),
        supplier_id: supplier["data"]["id"].as_str().unwrap().to_string(),
    }
}

#[tokio::test]
async fn health_is_public() {
    let srv = TestServer::spawn().await;
    let res = reqwest::get(srv.url("/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["data"]["status"], "ok");
}

#[tokio::test]
async fn auth_required_for_protected_endpoints() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client.get(srv.url("/whoami")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], false);

    let res = client
        .get(srv.url("/whoami"))
        .bearer_auth("not-a-jwt")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn tenant_context_is_derived_from_token() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let tenant_id = TenantId::new();

    let (status, body) = get(&client, srv.url("/whoami"), &admin_token(tenant_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["tenant_id"].as_str().unwrap(), tenant_id.to_string());
    assert_eq!(body["data"]["is_admin"], true);
    assert!(body["data"]["roles"].as_array().unwrap().iter().any(|r| r == "admin"));
}

#[tokio::test]
async fn arrival_books_stock_and_payable() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = admin_token(TenantId::new());
    let fx = seed(&client, &srv, &token).await;

    let (status, order) = post(
        &client,
        srv.url("/purchases"),
        &token,
        json!({
            "base_id": fx.base_id,
            "supplier_id": fx.supplier_id,
            "lines": [{ "goods_id": fx.goods_id, "quantity": 10, "unit_price": 1200 }]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{order}");
    assert_eq!(order["data"]["status"], "pending");
    assert_eq!(order["data"]["currency"], "CNY");
    let order_id = order["data"]["id"].as_str().unwrap().to_string();

    let (status, arrival) = post(
        &client,
        srv.url("/arrivals"),
        &token,
        json!({
            "purchase_order_id": order_id,
            "location_id": fx.location_id,
            "lines": [{ "goods_id": fx.goods_id, "quantity": 4 }]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{arrival}");

    let (status, order) = get(&client, srv.url(&format!("/purchases/{order_id}")), &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["data"]["status"], "partially_arrived");

    let (status, levels) = get(
        &client,
        srv.url(&format!("/inventory/levels?goods_id={}", fx.goods_id)),
        &token,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{levels}");
    assert_eq!(levels["total"], 1);
    assert_eq!(levels["data"][0]["on_hand"], 4);

    let (status, payable) = get(&client, srv.url(&format!("/payables/{order_id}")), &token).await;
    assert_eq!(status, StatusCode::OK, "{payable}");
    assert_eq!(payable["data"]["amount"], 4800);
    assert_eq!(payable["data"]["outstanding"], 4800);

    let (status, payable) = post(
        &client,
        srv.url(&format!("/payables/{order_id}/payments")),
        &token,
        json!({ "amount": 800 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{payable}");
    assert_eq!(payable["data"]["outstanding"], 4000);

    // Arriving more than remains on the order is rejected.
    let (status, body) = post(
        &client,
        srv.url("/arrivals"),
        &token,
        json!({
            "purchase_order_id": order_id,
            "location_id": fx.location_id,
            "lines": [{ "goods_id": fx.goods_id, "quantity": 7 }]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{body}");
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn viewer_is_read_only_and_sees_no_purchase_prices() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let tenant_id = TenantId::new();
    let token = admin_token(tenant_id);
    let fx = seed(&client, &srv, &token).await;

    let viewer_id = UserId::new();
    let (status, user) = post(
        &client,
        srv.url("/users"),
        &token,
        json!({
            "id": viewer_id,
            "username": "viewer1",
            "display_name": "Viewer One",
            "roles": ["viewer"],
            "base_ids": [fx.base_id]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{user}");
    let viewer = mint_jwt(viewer_id, tenant_id, &["viewer"]);

    let (status, goods) = get(&client, srv.url(&format!("/goods/{}", fx.goods_id)), &viewer).await;
    assert_eq!(status, StatusCode::OK, "{goods}");
    assert_eq!(goods["data"]["retail_price"], 2000);
    assert!(goods["data"].get("purchase_price").is_none());

    let (status, _) = post(
        &client,
        srv.url("/goods"),
        &viewer,
        json!({ "code": "TEA-02", "name": "Black tea", "unit": "box", "currency": "CNY" }),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, whoami) = get(&client, srv.url("/whoami"), &viewer).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(whoami["data"]["base_ids"], json!([fx.base_id]));

    // Disabling the account revokes access even with a valid token.
    let (status, _) = post(
        &client,
        srv.url(&format!("/users/{viewer_id}/disable")),
        &token,
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = get(&client, srv.url("/whoami"), &viewer).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn tenant_isolation_blocks_cross_tenant_reads() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token1 = admin_token(TenantId::new());
    let token2 = admin_token(TenantId::new());
    let fx = seed(&client, &srv, &token1).await;

    let (status, _) = get(&client, srv.url(&format!("/goods/{}", fx.goods_id)), &token2).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, bases) = get(&client, srv.url("/bases"), &token2).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(bases["total"], 0);

    // Codes are unique per tenant only.
    let fx2 = seed(&client, &srv, &token2).await;
    assert_ne!(fx.goods_id, fx2.goods_id);
}

#[tokio::test]
async fn uploads_accept_images_only() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = admin_token(TenantId::new());

    let res = client
        .put(srv.url("/uploads/logo.png"))
        .bearer_auth(&token)
        .header("content-type", "image/png")
        .body(vec![0x89, b'P', b'N', b'G'])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    let url = body["data"]["url"].as_str().unwrap().to_string();
    assert!(url.starts_with("/files/"), "{url}");
    assert!(body["data"]["key"].as_str().unwrap().ends_with("-logo.png"));

    let res = client.get(srv.url(&url)).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.bytes().await.unwrap().as_ref(), &[0x89, b'P', b'N', b'G']);

    let res = client
        .put(srv.url("/uploads/report.pdf"))
        .bearer_auth(&token)
        .header("content-type", "application/pdf")
        .body(vec![1, 2, 3])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

    // SVG can carry script and is refused even though it is an image type.
    let res = client
        .put(srv.url("/uploads/logo.svg"))
        .bearer_auth(&token)
        .header("content-type", "image/svg+xml")
        .body(r#"<svg xmlns="http://www.w3.org/2000/svg"><script>alert(1)</script></svg>"#)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

    // GIF is raster but outside the seeded tenant list.
    let res = client
        .put(srv.url("/uploads/anim.gif"))
        .bearer_auth(&token)
        .header("content-type", "image/gif")
        .body(vec![b'G', b'I', b'F'])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

fn id_of(body: &Value) -> String {
    body["data"]["id"].as_str().unwrap().to_string()
}

async fn put(client: &reqwest::Client, url: String, token: &str, body: Value) -> (StatusCode, Value) {
    send_json(client, reqwest::Method::PUT, url, token, Some(body)).await
}

/// Order `ordered` units of the fixture goods and receive `arrived` of them.
async fn receive_stock(
    client: &reqwest::Client,
    srv: &TestServer,
    token: &str,
    fx: &Fixture,
    ordered: i64,
    arrived: i64,
) -> (String, String) {
    let (status, order) = post(
        client,
        srv.url("/purchases"),
        token,
        json!({
            "base_id": fx.base_id,
            "supplier_id": fx.supplier_id,
            "lines": [{ "goods_id": fx.goods_id, "quantity": ordered, "unit_price": 1200 }]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{order}");
    let order_id = id_of(&order);
    let arrival_id = arrive(client, srv, token, fx, &order_id, arrived).await;
    (order_id, arrival_id)
}

async fn arrive(
    client: &reqwest::Client,
    srv: &TestServer,
    token: &str,
    fx: &Fixture,
    order_id: &str,
    quantity: i64,
) -> String {
    let (status, arrival) = post(
        client,
        srv.url("/arrivals"),
        token,
        json!({
            "purchase_order_id": order_id,
            "location_id": fx.location_id,
            "lines": [{ "goods_id": fx.goods_id, "quantity": quantity }]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{arrival}");
    id_of(&arrival)
}

async fn on_hand(client: &reqwest::Client, srv: &TestServer, token: &str, location_id: &str, goods_id: &str) -> i64 {
    let (status, levels) = get(
        client,
        srv.url(&format!("/inventory/levels?location_id={location_id}&goods_id={goods_id}")),
        token,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{levels}");
    levels["data"][0]["on_hand"].as_i64().unwrap_or(0)
}

async fn second_base(client: &reqwest::Client, srv: &TestServer, token: &str) -> (String, String) {
    let (status, base) = post(
        client,
        srv.url("/bases"),
        token,
        json!({ "code": "bj01", "name": "Beijing studio", "kind": "live_stream", "currency": "CNY" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{base}");
    let base_id = id_of(&base);
    let (status, location) = post(
        client,
        srv.url("/locations"),
        token,
        json!({ "base_id": base_id, "code": "WH2", "name": "North warehouse", "kind": "warehouse" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{location}");
    (base_id, id_of(&location))
}

#[tokio::test]
async fn voiding_an_arrival_reverses_order_stock_and_payable() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = admin_token(TenantId::new());
    let fx = seed(&client, &srv, &token).await;
    let (order_id, arrival_id) = receive_stock(&client, &srv, &token, &fx, 10, 4).await;

    let (status, arrival) = post(&client, srv.url(&format!("/arrivals/{arrival_id}/void")), &token, json!({})).await;
    assert_eq!(status, StatusCode::OK, "{arrival}");
    assert_eq!(arrival["data"]["status"], "voided");

    let (_, order) = get(&client, srv.url(&format!("/purchases/{order_id}")), &token).await;
    assert_eq!(order["data"]["status"], "pending");
    assert_eq!(on_hand(&client, &srv, &token, &fx.location_id, &fx.goods_id).await, 0);
    let (_, payable) = get(&client, srv.url(&format!("/payables/{order_id}")), &token).await;
    assert_eq!(payable["data"]["amount"], 0);
    assert_eq!(payable["data"]["outstanding"], 0);

    let (_, movements) = get(
        &client,
        srv.url(&format!("/inventory/movements?goods_id={}&reason=arrival_void", fx.goods_id)),
        &token,
    )
    .await;
    assert_eq!(movements["total"], 1);
    assert_eq!(movements["data"][0]["quantity"], -4);

    let (status, _) = post(&client, srv.url(&format!("/arrivals/{arrival_id}/void")), &token, json!({})).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn arrival_void_is_refused_once_stock_or_payment_depends_on_it() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = admin_token(TenantId::new());
    let fx = seed(&client, &srv, &token).await;

    // Stock already shipped out.
    let (order_id, arrival_id) = receive_stock(&client, &srv, &token, &fx, 10, 4).await;
    let (status, stock_out) = post(
        &client,
        srv.url("/stock-outs"),
        &token,
        json!({
            "location_id": fx.location_id,
            "category": { "type": "manual", "reason": "damaged in transit" },
            "lines": [{ "goods_id": fx.goods_id, "quantity": 2 }]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{stock_out}");
    let (status, body) = post(&client, srv.url(&format!("/arrivals/{arrival_id}/void")), &token, json!({})).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{body}");
    assert_eq!(on_hand(&client, &srv, &token, &fx.location_id, &fx.goods_id).await, 2);
    let (_, order) = get(&client, srv.url(&format!("/purchases/{order_id}")), &token).await;
    assert_eq!(order["data"]["status"], "partially_arrived");

    // Payment exceeds what would remain owed.
    let second = arrive(&client, &srv, &token, &fx, &order_id, 2).await;
    let (status, _) = post(
        &client,
        srv.url(&format!("/payables/{order_id}/payments")),
        &token,
        json!({ "amount": 6000 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = post(&client, srv.url(&format!("/arrivals/{second}/void")), &token, json!({})).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{body}");

    let (_, payable) = get(&client, srv.url(&format!("/payables/{order_id}")), &token).await;
    assert_eq!(payable["data"]["amount"], 7200);
    assert_eq!(payable["data"]["paid"], 6000);
    assert_eq!(on_hand(&client, &srv, &token, &fx.location_id, &fx.goods_id).await, 4);
}

#[tokio::test]
async fn point_order_stock_out_fulfils_the_order() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = admin_token(TenantId::new());
    let fx = seed(&client, &srv, &token).await;
    receive_stock(&client, &srv, &token, &fx, 10, 10).await;

    let (status, point) = post(
        &client,
        srv.url("/points"),
        &token,
        json!({ "base_id": fx.base_id, "code": "p-01", "name": "Corner store", "owner_name": "Wang" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{point}");
    let (status, order) = post(
        &client,
        srv.url("/point-orders"),
        &token,
        json!({
            "point_id": id_of(&point),
            "lines": [{ "goods_id": fx.goods_id, "quantity": 3, "unit_price": 2000 }]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{order}");
    let order_id = id_of(&order);

    let stock_out = |quantity: i64| {
        json!({
            "location_id": fx.location_id,
            "category": { "type": "point_order", "point_order_id": order_id },
            "lines": [{ "goods_id": fx.goods_id, "quantity": quantity }]
        })
    };

    let (status, body) = post(&client, srv.url("/stock-outs"), &token, stock_out(2)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{body}");
    assert_eq!(on_hand(&client, &srv, &token, &fx.location_id, &fx.goods_id).await, 10);
    let (_, order) = get(&client, srv.url(&format!("/point-orders/{order_id}")), &token).await;
    assert_eq!(order["data"]["status"], "pending");

    let (status, body) = post(&client, srv.url("/stock-outs"), &token, stock_out(3)).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let code = body["data"]["code"].clone();
    assert_eq!(on_hand(&client, &srv, &token, &fx.location_id, &fx.goods_id).await, 7);
    let (_, order) = get(&client, srv.url(&format!("/point-orders/{order_id}")), &token).await;
    assert_eq!(order["data"]["status"], "fulfilled");
    assert_eq!(order["data"]["stock_out_code"], code);

    let (status, order) = post(&client, srv.url(&format!("/point-orders/{order_id}/complete")), &token, json!({})).await;
    assert_eq!(status, StatusCode::OK, "{order}");
    assert_eq!(order["data"]["status"], "completed");
}

#[tokio::test]
async fn transfer_moves_stock_into_the_target_base() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = admin_token(TenantId::new());
    let fx = seed(&client, &srv, &token).await;
    receive_stock(&client, &srv, &token, &fx, 10, 10).await;
    let (target_base, target_location) = second_base(&client, &srv, &token).await;

    let (status, body) = post(
        &client,
        srv.url("/stock-outs"),
        &token,
        json!({
            "location_id": fx.location_id,
            "category": { "type": "transfer", "target_base_id": target_base, "target_location_id": target_location },
            "lines": [{ "goods_id": fx.goods_id, "quantity": 6 }]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    assert_eq!(on_hand(&client, &srv, &token, &fx.location_id, &fx.goods_id).await, 4);
    assert_eq!(on_hand(&client, &srv, &token, &target_location, &fx.goods_id).await, 6);
    let (_, levels) = get(
        &client,
        srv.url(&format!("/inventory/levels?base_id={target_base}&goods_id={}", fx.goods_id)),
        &token,
    )
    .await;
    assert_eq!(levels["total"], 1);
    let (_, movements) = get(&client, srv.url("/inventory/movements?reason=transfer_in"), &token).await;
    assert_eq!(movements["data"][0]["base_id"].as_str().unwrap(), target_base);
    assert_eq!(movements["data"][0]["quantity"], 6);
}

#[tokio::test]
async fn shipping_a_distribution_order_deducts_stock_as_sale() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = admin_token(TenantId::new());
    let fx = seed(&client, &srv, &token).await;
    receive_stock(&client, &srv, &token, &fx, 10, 10).await;

    let (status, customer) = post(
        &client,
        srv.url("/parties"),
        &token,
        json!({ "kind": "customer", "name": "Suzhou Tea House" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{customer}");
    let (status, order) = post(
        &client,
        srv.url("/sales"),
        &token,
        json!({
            "base_id": fx.base_id,
            "customer_id": id_of(&customer),
            "location_id": fx.location_id,
            "lines": [{ "goods_id": fx.goods_id, "quantity": 4, "unit_price": 1800 }]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{order}");
    assert_eq!(order["data"]["total_amount"], 7200);
    let order_id = id_of(&order);

    let (status, _) = post(&client, srv.url(&format!("/sales/{order_id}/confirm")), &token, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    let (status, order) = post(&client, srv.url(&format!("/sales/{order_id}/ship")), &token, json!({})).await;
    assert_eq!(status, StatusCode::OK, "{order}");
    assert_eq!(order["data"]["status"], "shipped");

    assert_eq!(on_hand(&client, &srv, &token, &fx.location_id, &fx.goods_id).await, 6);
    let (_, movements) = get(
        &client,
        srv.url(&format!("/inventory/movements?goods_id={}&reason=sale", fx.goods_id)),
        &token,
    )
    .await;
    assert_eq!(movements["total"], 1);
    assert_eq!(movements["data"][0]["quantity"], -4);
    assert_eq!(movements["data"][0]["balance_after"], 6);
}

#[tokio::test]
async fn translation_writes_refresh_the_cached_bundle() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = admin_token(TenantId::new());

    let save = |value: &str| json!({ "locale": "en", "namespace": "common", "key": "save", "value": value });
    let (status, _) = post(&client, srv.url("/translations"), &token, save("Save")).await;
    assert_eq!(status, StatusCode::OK);
    let (status, bundle) = get(&client, srv.url("/translations/bundle/en"), &token).await;
    assert_eq!(status, StatusCode::OK, "{bundle}");
    assert_eq!(bundle["data"]["common"]["save"], "Save");

    let (status, _) = post(&client, srv.url("/translations"), &token, save("Save now")).await;
    assert_eq!(status, StatusCode::OK);
    let (_, bundle) = get(&client, srv.url("/translations/bundle/en"), &token).await;
    assert_eq!(bundle["data"]["common"]["save"], "Save now");

    let (status, _) = post(
        &client,
        srv.url("/translations/bulk"),
        &token,
        json!([{ "locale": "en", "namespace": "common", "key": "cancel", "value": "Cancel" }]),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (_, bundle) = get(&client, srv.url("/translations/bundle/en"), &token).await;
    assert_eq!(bundle["data"]["common"]["cancel"], "Cancel");
}

#[tokio::test]
async fn base_scoped_users_only_see_their_bases() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let tenant_id = TenantId::new();
    let token = admin_token(tenant_id);
    let fx = seed(&client, &srv, &token).await;
    let (own_order, _) = receive_stock(&client, &srv, &token, &fx, 5, 1).await;

    let (other_base, _) = second_base(&client, &srv, &token).await;
    let (status, other) = post(
        &client,
        srv.url("/purchases"),
        &token,
        json!({
            "base_id": other_base,
            "supplier_id": fx.supplier_id,
            "lines": [{ "goods_id": fx.goods_id, "quantity": 3, "unit_price": 1200 }]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{other}");
    let other_order = id_of(&other);

    let purchaser_id = UserId::new();
    let (status, user) = post(
        &client,
        srv.url("/users"),
        &token,
        json!({
            "id": purchaser_id,
            "username": "buyer1",
            "display_name": "Buyer One",
            "roles": ["purchaser"],
            "base_ids": [fx.base_id]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{user}");
    let purchaser = mint_jwt(purchaser_id, tenant_id, &["purchaser"]);

    let (status, list) = get(&client, srv.url("/purchases"), &purchaser).await;
    assert_eq!(status, StatusCode::OK, "{list}");
    assert_eq!(list["total"], 1);
    assert_eq!(list["data"][0]["id"].as_str().unwrap(), own_order);

    let (status, _) = get(&client, srv.url(&format!("/purchases/{other_order}")), &purchaser).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = get(&client, srv.url(&format!("/purchases/{own_order}")), &purchaser).await;
    assert_eq!(status, StatusCode::OK);

    // Asking for another base narrows to nothing rather than leaking it.
    let (_, list) = get(&client, srv.url(&format!("/purchases?base_id={other_base}")), &purchaser).await;
    assert_eq!(list["total"], 0);
}

#[tokio::test]
async fn delegated_admins_cannot_widen_their_own_access() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let tenant_id = TenantId::new();
    let token = admin_token(tenant_id);
    let fx = seed(&client, &srv, &token).await;

    let (status, role) = post(
        &client,
        srv.url("/roles"),
        &token,
        json!({
            "name": "local_admin",
            "display_name": "Local admin",
            "permissions": ["users.*", "roles.*", "goods.read"],
            "data_scope": "assigned_bases",
            "hidden_fields": { "goods": ["purchase_price"] }
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{role}");

    let local_id = UserId::new();
    let (status, user) = post(
        &client,
        srv.url("/users"),
        &token,
        json!({
            "id": local_id,
            "username": "local1",
            "display_name": "Local One",
            "roles": ["local_admin"],
            "base_ids": [fx.base_id]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{user}");
    let local = mint_jwt(local_id, tenant_id, &["local_admin"]);

    // Tenant-wide scope is wider than the actor's.
    let (status, body) = post(
        &client,
        srv.url("/roles"),
        &local,
        json!({
            "name": "wide",
            "display_name": "Wide",
            "permissions": ["users.read"],
            "data_scope": "all",
            "hidden_fields": { "goods": ["purchase_price"] }
        }),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN, "{body}");

    // A role that would show purchase prices the actor cannot see.
    let reader = |hidden: Value| {
        json!({
            "name": "goods_reader",
            "display_name": "Goods reader",
            "permissions": ["goods.read"],
            "data_scope": "assigned_bases",
            "hidden_fields": hidden
        })
    };
    let (status, body) = post(&client, srv.url("/roles"), &local, reader(json!({}))).await;
    assert_eq!(status, StatusCode::FORBIDDEN, "{body}");
    let (status, body) = post(
        &client,
        srv.url("/roles"),
        &local,
        reader(json!({ "goods": ["purchase_price"] })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    // Even a grantable role cannot be added to the actor's own account.
    let (status, body) = put(
        &client,
        srv.url(&format!("/users/{local_id}")),
        &local,
        json!({ "roles": ["local_admin", "goods_reader"] }),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN, "{body}");
    let (status, body) = put(
        &client,
        srv.url(&format!("/users/{local_id}")),
        &local,
        json!({ "display_name": "Local Admin One" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    // Assigning it to someone else inside the actor's bases still works.
    let (status, body) = post(
        &client,
        srv.url("/users"),
        &local,
        json!({
            "username": "reader1",
            "display_name": "Reader One",
            "roles": ["goods_reader"],
            "base_ids": [fx.base_id]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let (_, whoami) = get(&client, srv.url("/whoami"), &local).await;
    assert_eq!(whoami["data"]["scope"]["kind"], "bases");
    assert_eq!(whoami["data"]["roles"], json!(["local_admin"]));
}

#[tokio::test]
async fn currency_conversion_rounds_decimal_rates_half_away_from_zero() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = admin_token(TenantId::new());

    let (status, rate) = post(
        &client,
        srv.url("/currency-rates"),
        &token,
        json!({ "base_currency": "USD", "quote_currency": "EUR", "rate": "0.29", "effective_on": "2024-01-01" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{rate}");
    assert_eq!(rate["data"]["rate"], "0.29");

    let (status, conversion) = get(
        &client,
        srv.url("/currency-rates/convert?amount=50&from=USD&to=EUR&on=2024-06-01"),
        &token,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{conversion}");
    assert_eq!(conversion["data"]["converted"], 15);
}
