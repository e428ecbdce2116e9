use std::path::Path;
use anyhow::Context;

use crate::db::{CreateUser, Database, UserStatus};
use crate::identity::{generate_token, Role};

pub const BOOTSTRAP_ADMIN_EMAIL: &str = "admin@localhost";

/// Make sure at least one active admin exists.
///
/// When none is active, the bootstrap admin is created with `token` (or a
/// generated one), or re-enabled with a fresh token if it was disabled. The
/// token is written to `token_path`. Returns the admin's id, or `None` when
/// an active admin was already present.
pub fn ensure_admin(db: &Database, token: Option<String>, token_path: &Path) -> anyhow::Result<Option<String>> {
    if db.has_admin()? {
        tracing::debug!("Admin already present, skipping bootstrap");
        return Ok(None);
    }

    let token = token.unwrap_or_else(generate_token);

    let admin_id = match db.get_user_by_email(BOOTSTRAP_ADMIN_EMAIL)? {
        Some(existing) if existing.role == Role::Admin => {
            db.set_user_status(&existing.id, UserStatus::Active)?;
            db.set_api_token(&existing.id, &token)?;
            tracing::info!("Re-enabled bootstrap admin {} with a new token", existing.id);
            existing.id
        }
        Some(existing) => {
            anyhow::bail!(
                "{} is registered as {}, cannot use it as the bootstrap admin",
                BOOTSTRAP_ADMIN_EMAIL,
                existing.role
            );
        }
        None => {
            let admin = db.create_user(&CreateUser {
                name: "Administrator".to_string(),
                email: BOOTSTRAP_ADMIN_EMAIL.to_string(),
                role: Role::Admin,
                api_token: token.clone(),
            })?;
            tracing::info!("Created bootstrap admin {}", admin.id);
            admin.id
        }
    };

    if let Some(parent) = token_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(token_path, &token)
        .with_context(|| format!("failed to write admin token to {}", token_path.display()))?;

    tracing::info!("Admin token written to {}", token_path.display());
    Ok(Some(admin_id))
}
