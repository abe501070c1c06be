use std::time::Duration;

use actix_web::{
    delete, get,
    http::{header, StatusCode},
    post, web, HttpRequest, HttpResponse, HttpServer, ResponseError,
};
use log::info;
use serde::Deserialize;
use serde_json::json;

use crate::{
    auth::{AuthError, Session, SessionGate},
    config::ServerConfig,
    dispatcher::{ActivationDispatcher, DispatchError},
    store::{IdentifierStore, StoreError},
};

/// How often expired sessions are swept
const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Auth(AuthError::Forbidden(_)) => StatusCode::FORBIDDEN,
            ApiError::Auth(_) => StatusCode::UNAUTHORIZED,
            ApiError::Store(StoreError::DuplicateIdentifier { .. }) => StatusCode::CONFLICT,
            ApiError::Store(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Store(StoreError::Protected) => StatusCode::FORBIDDEN,
            ApiError::Store(StoreError::InvalidInput(_)) => StatusCode::BAD_REQUEST,
            ApiError::Store(StoreError::Io(_) | StoreError::Serialization(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::Dispatch(DispatchError::MissingRadioId) => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}

#[derive(Debug)]
pub struct AppState {
    pub dispatcher: ActivationDispatcher,
    pub store: IdentifierStore,
    pub gate: SessionGate,
}

impl AppState {
    pub fn new(dispatcher: ActivationDispatcher, store: IdentifierStore, gate: SessionGate) -> Self {
        Self {
            dispatcher,
            store,
            gate,
        }
    }

    pub fn from_config(config: &ServerConfig) -> anyhow::Result<Self> {
        let dispatcher = ActivationDispatcher::from_config(&config.activation)?;
        let store = match &config.store_path {
            Some(path) => IdentifierStore::open(path)?,
            None => IdentifierStore::in_memory(),
        };
        let stats = store.stats();
        info!(
            "Radio IDs loaded: total {}, built-in {}, user added {}",
            stats.total, stats.builtin, stats.user_added
        );
        let gate = SessionGate::new(config.users.clone(), config.session_timeout);
        Ok(Self::new(dispatcher, store, gate))
    }

    fn session(&self, req: &HttpRequest) -> Result<Session, AuthError> {
        self.gate.validate(bearer_token(req)?)
    }

    fn admin_session(&self, req: &HttpRequest) -> Result<Session, AuthError> {
        self.gate.require_admin(bearer_token(req)?)
    }
}

fn bearer_token(req: &HttpRequest) -> Result<&str, AuthError> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::Unauthenticated)
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct AddRadioRequest {
    pub name: String,
    pub radio_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ActivateRequest {
    #[serde(default)]
    pub radio_id: Option<String>,
}

#[get("/health")]
pub async fn health(_req: HttpRequest) -> HttpResponse {
    HttpResponse::Ok().body("Ok")
}

#[post("/api/login")]
pub async fn login(
    body: web::Json<LoginRequest>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let (token, session) = app_state.gate.login(&body.username, &body.password)?;
    Ok(HttpResponse::Ok().json(json!({
        "token": token,
        "username": session.username,
        "role": session.role,
        "login_at": session.login_at,
    })))
}

#[post("/api/logout")]
pub async fn logout(
    req: HttpRequest,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let token = bearer_token(&req)?;
    app_state.gate.logout(token);
    Ok(HttpResponse::NoContent().finish())
}

#[get("/api/radios")]
pub async fn list_radios(
    req: HttpRequest,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    app_state.session(&req)?;
    Ok(HttpResponse::Ok().json(app_state.store.list()))
}

#[get("/api/radios/stats")]
pub async fn radio_stats(
    req: HttpRequest,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    app_state.session(&req)?;
    Ok(HttpResponse::Ok().json(app_state.store.stats()))
}

#[post("/api/radios")]
pub async fn add_radio(
    req: HttpRequest,
    body: web::Json<AddRadioRequest>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let session = app_state.admin_session(&req)?;
    let record = app_state.store.add(&body.name, &body.radio_id)?;
    info!("{} added radio {}", session.username, record.radio_id);
    Ok(HttpResponse::Created().json(record))
}

#[delete("/api/radios/{radio_id}")]
pub async fn delete_radio(
    req: HttpRequest,
    path: web::Path<String>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let session = app_state.admin_session(&req)?;
    let record = app_state.store.delete(&path.into_inner())?;
    info!("{} deleted radio {}", session.username, record.radio_id);
    Ok(HttpResponse::Ok().json(record))
}

#[post("/api/activate")]
pub async fn activate(
    req: HttpRequest,
    body: web::Json<ActivateRequest>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let session = app_state.session(&req)?;
    let radio_id = body.radio_id.as_deref().unwrap_or_default();
    let accepted = app_state.dispatcher.start(radio_id)?;
    info!(
        "{} started activation of {}",
        session.username, accepted.radio_id
    );
    Ok(HttpResponse::Accepted().json(accepted))
}

#[get("/api/status")]
pub async fn status(
    req: HttpRequest,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    app_state.session(&req)?;
    Ok(HttpResponse::Ok().json(app_state.dispatcher.status()))
}

/// Register every route on an app
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(health)
        .service(login)
        .service(logout)
        .service(radio_stats)
        .service(list_radios)
        .service(add_radio)
        .service(delete_radio)
        .service(activate)
        .service(status);
}

pub async fn session_janitor(app_state: web::Data<AppState>) {
    let mut ticker = tokio::time::interval(SESSION_SWEEP_INTERVAL);
    loop {
        ticker.tick().await;
        let purged = app_state.gate.purge_expired();
        if purged > 0 {
            info!("Purged {} expired session(s)", purged);
        }
    }
}

pub async fn startup(config: ServerConfig, app_state: web::Data<AppState>) -> std::io::Result<()> {
    info!(
        "Starting server at {}:{} ({} activation steps)",
        config.host,
        config.port,
        app_state.dispatcher.step_count()
    );

    let server_state = app_state.clone();
    HttpServer::new(move || {
        actix_web::App::new()
            .wrap(actix_web::middleware::Logger::default())
            .app_data(server_state.clone())
            .configure(configure)
    })
    .bind((config.host, config.port))?
    .run()
    .await
}
