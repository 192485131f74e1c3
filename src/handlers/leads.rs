// src/handlers/leads.rs
use axum::{extract::State, response::IntoResponse, Form, Json};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::Config;
use crate::token::LinkSigner;
use crate::{email, validators};

#[derive(Clone)]
pub struct LeadsState {
    pub pool: PgPool,
    pub cfg: Config,
    pub signer: LinkSigner,
}

#[derive(Deserialize)]
pub struct LeadForm {
    pub name: String,
    pub email: String,
    pub trip: Option<String>,
}

/// POST /api/leads
///
/// Marketing form: store the lead, mint a signed checklist link and send
/// it to the address they left.
pub async fn post_lead(State(st): State<LeadsState>, Form(f): Form<LeadForm>) -> impl IntoResponse {
    let name = f.name.trim();
    let email_lc = f.email.trim().to_ascii_lowercase();
    if name.is_empty() {
        return Json(json!({"ok": false, "error": "name required"}));
    }
    if !validators::valid_email(&email_lc) {
        return Json(json!({"ok": false, "error": "invalid email"}));
    }

    let id = Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();

    let res = sqlx::query(
        r#"
        INSERT INTO leads (id, name, email, trip, created_at)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(&id)
    .bind(name)
    .bind(&email_lc)
    .bind(f.trip.as_deref())
    .bind(&now)
    .execute(&st.pool)
    .await;
    if let Err(e) = res {
        return Json(json!({"ok": false, "error": format!("db error: {e}")}));
    }

    let token = st.signer.encode(&format!("lead:{email_lc}"));
    let url = format!("{}/gear-checklist?token={}", st.cfg.public_base_url, token);
    email::send_checklist_link(&email_lc, &url).await;

    Json(json!({"ok": true, "lead_id": id}))
}
