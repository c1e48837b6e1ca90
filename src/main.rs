// src/main.rs
use actix_web::{App, HttpResponse, HttpServer, middleware, web};
use anyhow::Context;
use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;

mod config;
mod data_url;
mod errors;
mod handlers;
mod models;
mod services;
mod styles;
mod workflow;

use crate::config::Config;
use crate::handlers::{
    apply_edit, create_session, discard_photo, download_result, end_session, generate_headshot,
    get_session, list_styles, list_suggestions, reset_session, select_style, set_edit_prompt,
    upload_photo,
};
use crate::services::{GeminiTransformClient, ImageTransformer, SessionStore};
use crate::styles::{APP_NAME, StyleCatalog};

#[derive(Clone)]
pub struct AppState {
    sessions: Arc<SessionStore>,
    transformer: Arc<dyn ImageTransformer>,
    catalog: Arc<StyleCatalog>,
    max_upload_bytes: usize,
    transform_timeout: Duration,
}

pub fn configure_api(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .route("/styles", web::get().to(list_styles))
            .route("/suggestions", web::get().to(list_suggestions))
            .route("/sessions", web::post().to(create_session))
            .route("/sessions/{session_id}", web::get().to(get_session))
            .route("/sessions/{session_id}", web::delete().to(end_session))
            .route("/sessions/{session_id}/upload", web::post().to(upload_photo))
            .route("/sessions/{session_id}/upload", web::delete().to(discard_photo))
            .route("/sessions/{session_id}/style", web::put().to(select_style))
            .route(
                "/sessions/{session_id}/generate",
                web::post().to(generate_headshot),
            )
            .route(
                "/sessions/{session_id}/edit-prompt",
                web::put().to(set_edit_prompt),
            )
            .route("/sessions/{session_id}/edit", web::post().to(apply_edit))
            .route("/sessions/{session_id}/reset", web::post().to(reset_session))
            .route(
                "/sessions/{session_id}/result",
                web::get().to(download_result),
            ),
    )
    .route("/health", web::get().to(health_check));
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    info!("Starting {} headshot studio...", APP_NAME);

    let config = Config::from_env().context("Invalid configuration")?;

    let catalog = Arc::new(match &config.styles_path {
        Some(path) => StyleCatalog::from_file(path).context("Failed to load style catalog")?,
        None => StyleCatalog::builtin(),
    });
    let transformer: Arc<dyn ImageTransformer> = Arc::new(
        GeminiTransformClient::new(
            config.gemini_api_key.clone(),
            config.gemini_image_model.clone(),
            config.gemini_base_url.clone(),
            config.transform_timeout,
        )
        .context("Failed to create image transform client")?,
    );

    let app_state = AppState {
        sessions: Arc::new(SessionStore::new(catalog.clone(), config.session_ttl)),
        transformer,
        catalog,
        max_upload_bytes: config.max_upload_bytes,
        transform_timeout: config.transform_timeout,
    };

    let static_dir = config.static_dir.clone();
    if !static_dir.is_dir() {
        warn!(
            "Static directory {} not found; serving the API only",
            static_dir.display()
        );
    }

    info!(
        "Starting HTTP server on {} (model {})",
        config.bind_addr, config.gemini_image_model
    );

    HttpServer::new(move || {
        let app = App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(middleware::Logger::default())
            .configure(configure_api);

        if static_dir.is_dir() {
            app.service(actix_files::Files::new("/", &static_dir).index_file("index.html"))
        } else {
            app
        }
    })
    .bind(&config.bind_addr)
    .with_context(|| format!("Failed to bind {}", config.bind_addr))?
    .run()
    .await?;

    Ok(())
}

async fn health_check(data: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "persona-headshots",
        "version": env!("CARGO_PKG_VERSION"),
        "active_sessions": data.sessions.len()
    }))
}
