// src/main.rs

use axum::{
    response::Redirect,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tracing_subscriber::fmt::init as tracing_init;

mod config;
mod db;
mod email;
mod token;
mod validators;

mod handlers;
use handlers::{
    checklist::{router as checklist_router, ChecklistState},
    leads::{post_lead, LeadsState},
};
use token::LinkSigner;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_init();

    // ==== Config & DB ====
    let cfg = config::Config::from_env()?;
    let pool = db::new_pool(&cfg.database_url).await?;

    // One signer for the whole process; the secret never changes at runtime.
    let signer = LinkSigner::new(cfg.link_secret.clone(), cfg.link_max_age_ms);

    // ==== Static files (/public) ====
    let static_service = ServeDir::new(&cfg.public_dir).append_index_html_on_directories(true);

    let static_router = Router::new()
        .route("/", get(|| async { Redirect::to("/public/") }))
        .route("/health", get(|| async { "ok" }))
        .nest_service("/public", static_service);

    // ===== Lead capture (mints checklist links) =====
    let leads_router = Router::new()
        .route("/api/leads", post(post_lead))
        .with_state(LeadsState {
            pool: pool.clone(),
            cfg: cfg.clone(),
            signer: signer.clone(),
        });

    // ===== Gated gear checklist (link-only, no login) =====
    let checklist_router = checklist_router(ChecklistState { signer });

    let app = static_router.merge(leads_router).merge(checklist_router);

    // ==== Start server ====
    let addr = cfg.bind.clone();
    let listener = TcpListener::bind(&addr).await?;
    println!("listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
