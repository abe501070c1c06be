use std::{collections::HashMap, net::SocketAddr, time::Duration};

use actix_web::{cookie::Cookie, get, post, web, App, HttpRequest, HttpResponse, HttpServer};
use device_activator::activation::{HttpRemoteApi, RemoteApi, RemoteError, RemoteRequest};
use reqwest::Method;
use serde_json::{json, Value};

#[post("/auth/v1/login")]
async fn fake_login(form: web::Form<HashMap<String, String>>) -> HttpResponse {
    let mut cookie = Cookie::new("sid", "abc123");
    cookie.set_path("/");
    HttpResponse::Ok()
        .cookie(cookie)
        .json(json!({ "accessToken": "tok", "clientId": form.get("clientId") }))
}

#[get("/app/v1/properties")]
async fn fake_properties(
    req: HttpRequest,
    query: web::Query<HashMap<String, String>>,
) -> HttpResponse {
    let sid = req.cookie("sid").map(|c| c.value().to_string());
    let auth = req
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    HttpResponse::Ok().json(json!({
        "sid": sid,
        "authorization": auth,
        "deviceId": query.get("deviceId"),
    }))
}

#[post("/device/v1/blocklist")]
async fn fake_blocklist() -> HttpResponse {
    HttpResponse::ServiceUnavailable().body("maintenance")
}

#[post("/device/v1/db-update")]
async fn fake_db_update() -> HttpResponse {
    HttpResponse::Ok().finish()
}

#[post("/dealer/v1/oracle-lookup")]
async fn fake_oracle() -> HttpResponse {
    HttpResponse::Ok().body("<html>not json</html>")
}

fn spawn_fake_api() -> SocketAddr {
    let server = HttpServer::new(|| {
        App::new()
            .service(fake_login)
            .service(fake_properties)
            .service(fake_blocklist)
            .service(fake_db_update)
            .service(fake_oracle)
    })
    .workers(1)
    .bind(("127.0.0.1", 0))
    .unwrap();
    let addr = server.addrs()[0];
    actix_web::rt::spawn(server.run());
    addr
}

fn request(method: Method, path: &str, form: &[(&str, &str)]) -> RemoteRequest {
    RemoteRequest {
        method,
        path: path.to_string(),
        headers: vec![("Authorization".to_string(), "Bearer tok".to_string())],
        form: form
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    }
}

#[actix_web::test]
async fn test_session_keeps_cookies_between_calls() {
    let addr = spawn_fake_api();
    let api = HttpRemoteApi::new(format!("http://{}/", addr), Duration::from_secs(5));
    assert_eq!(api.base_url(), format!("http://{}", addr));
    let session = api.open_session().unwrap();

    let login = session
        .send(request(
            Method::POST,
            "/auth/v1/login",
            &[("clientId", "0123abcd")],
        ))
        .await
        .unwrap();
    assert_eq!(login["accessToken"], "tok");
    assert_eq!(login["clientId"], "0123abcd");

    let props: Value = session
        .send(request(
            Method::GET,
            "/app/v1/properties",
            &[("deviceId", "H55EU0R5")],
        ))
        .await
        .unwrap();
    assert_eq!(props["sid"], "abc123");
    assert_eq!(props["authorization"], "Bearer tok");
    assert_eq!(props["deviceId"], "H55EU0R5");

    // a fresh session starts without the cookie
    let other = api.open_session().unwrap();
    let props = other
        .send(request(Method::GET, "/app/v1/properties", &[]))
        .await
        .unwrap();
    assert_eq!(props["sid"], Value::Null);
}

#[actix_web::test]
async fn test_session_maps_failures() {
    let addr = spawn_fake_api();
    let session = HttpRemoteApi::new(format!("http://{}", addr), Duration::from_secs(5))
        .open_session()
        .unwrap();

    let err = session
        .send(request(Method::POST, "/device/v1/blocklist", &[]))
        .await
        .unwrap_err();
    match err {
        RemoteError::Status { status, body } => {
            assert_eq!(status, 503);
            assert_eq!(body, "maintenance");
        }
        other => panic!("unexpected error: {:?}", other),
    }

    let empty = session
        .send(request(Method::POST, "/device/v1/db-update", &[]))
        .await
        .unwrap();
    assert_eq!(empty, Value::Null);

    let err = session
        .send(request(Method::POST, "/dealer/v1/oracle-lookup", &[]))
        .await
        .unwrap_err();
    assert!(matches!(err, RemoteError::MalformedBody(_)));
}

#[actix_web::test]
async fn test_unreachable_api_is_a_request_error() {
    // bind then drop to get a port nobody listens on
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let session = HttpRemoteApi::new(format!("http://127.0.0.1:{}", port), Duration::from_secs(2))
        .open_session()
        .unwrap();

    let err = session
        .send(request(Method::POST, "/auth/v1/login", &[]))
        .await
        .unwrap_err();
    assert!(matches!(err, RemoteError::Request(_) | RemoteError::Timeout));
}
