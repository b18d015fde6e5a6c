use crate::cli::actions::Action;
use crate::crypto::{keys::KeyRing, session::SessionIssuer};
use crate::prunto::new;
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

/// Handle the server action
pub async fn handle(action: Action) -> Result<()> {
    match action {
        Action::Server {
            port,
            dsn,
            keys_dir,
            session_secret,
            session_ttl,
        } => {
            let keys = KeyRing::load_or_generate(&keys_dir)
                .with_context(|| format!("Failed to load RSA keys from {}", keys_dir.display()))?;

            info!("RSA key pair ready in {}", keys_dir.display());

            let sessions = SessionIssuer::new(&session_secret, session_ttl);

            new(port, dsn, Arc::new(keys), Arc::new(sessions)).await?;
        }
    }

    Ok(())
}
