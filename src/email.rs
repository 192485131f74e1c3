// src/email.rs

use tracing::info;

/// Demo email sender: logs the checklist link to the console instead of
/// talking to a provider.
pub async fn send_checklist_link(email: &str, url: &str) {
    info!(%email, "Gear checklist link (demo): {url}");
}
