use rusqlite::OptionalExtension;
use crate::db::{Database, DbError, parse_datetime};
use crate::db::models::{CreateUser, User, UserStatus};
use crate::identity::{hash_token, Actor, Role};

const USER_COLUMNS: &str = "id, name, email, role, status, created_at";

impl Database {
    pub fn create_user(&self, user: &CreateUser) -> Result<User, DbError> {
        let name = user.name.trim();
        let email = user.email.trim().to_lowercase();
        if name.is_empty() {
            return Err(DbError::Validation("name is required".to_string()));
        }
        if !email.contains('@') {
            return Err(DbError::Validation(format!("invalid email: {}", user.email)));
        }

        self.with_conn(|conn| {
            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM users WHERE email = ?)",
                [&email],
                |row| row.get(0),
            )?;
            if exists {
                return Err(DbError::Conflict(format!("User {} already exists", email)));
            }

            let user_id = uuid::Uuid::new_v4().to_string();
            let now = chrono::Utc::now();

            conn.execute(
                r#"INSERT INTO users (id, name, email, role, status, api_token_hash, created_at)
                   VALUES (?, ?, ?, ?, ?, ?, ?)"#,
                rusqlite::params![
                    user_id,
                    name,
                    email,
                    user.role.as_str(),
                    UserStatus::Active.as_str(),
                    hash_token(&user.api_token),
                    now.to_rfc3339(),
                ],
            )?;

            Ok(User {
                id: user_id,
                name: name.to_string(),
                email,
                role: user.role,
                status: UserStatus::Active,
                created_at: now,
            })
        })
    }

    pub fn get_user(&self, user_id: &str) -> Result<User, DbError> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS),
                [user_id],
                Self::map_user_row,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => {
                    DbError::NotFound(format!("User {}", user_id))
                }
                other => DbError::Sqlite(other),
            })
        })
    }

    pub fn get_users_by_role(&self, role: Role) -> Result<Vec<User>, DbError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM users WHERE role = ? ORDER BY name",
                USER_COLUMNS
            ))?;
            let users = stmt
                .query_map([role.as_str()], Self::map_user_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(users)
        })
    }

    /// True only for an active identity whose role is engineer.
    pub fn is_active_engineer(&self, user_id: &str) -> Result<bool, DbError> {
        self.with_conn(|conn| {
            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM users WHERE id = ? AND role = 'engineer' AND status = 'active')",
                [user_id],
                |row| row.get(0),
            )?;
            Ok(exists)
        })
    }

    pub fn has_admin(&self) -> Result<bool, DbError> {
        self.with_conn(|conn| {
            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM users WHERE role = 'admin' AND status = 'active')",
                [],
                |row| row.get(0),
            )?;
            Ok(exists)
        })
    }

    /// Look up the active identity that owns `token`.
    ///
    /// Returns `None` for unknown tokens, disabled identities, and rows whose
    /// stored role is not one of the known roles.
    pub fn find_actor_by_token(&self, token: &str) -> Result<Option<Actor>, DbError> {
        self.with_conn(|conn| {
            let row: Option<(String, String, String)> = conn
                .query_row(
                    "SELECT id, role, status FROM users WHERE api_token_hash = ?",
                    [hash_token(token)],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                )
                .optional()?;

            let Some((id, role, status)) = row else {
                return Ok(None);
            };

            if UserStatus::parse(&status) != Some(UserStatus::Active) {
                tracing::debug!("Rejecting token for inactive user {}", id);
                return Ok(None);
            }

            match Role::parse(&role) {
                Some(role) => Ok(Some(Actor::new(id, role))),
                None => {
                    tracing::warn!("User {} has unrecognized role '{}'", id, role);
                    Ok(None)
                }
            }
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<User>, DbError> {
        let email = email.trim().to_lowercase();
        self.with_conn(|conn| {
            let user = conn
                .query_row(
                    &format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS),
                    [&email],
                    Self::map_user_row,
                )
                .optional()?;
            Ok(user)
        })
    }

    pub fn set_user_status(&self, user_id: &str, status: UserStatus) -> Result<User, DbError> {
        self.with_conn(|conn| {
            let affected = conn.execute(
                "UPDATE users SET status = ? WHERE id = ?",
                rusqlite::params![status.as_str(), user_id],
            )?;
            if affected == 0 {
                return Err(DbError::NotFound(format!("User {}", user_id)));
            }
            Ok(())
        })?;
        self.get_user(user_id)
    }

    pub fn update_user_name(&self, user_id: &str, name: &str) -> Result<User, DbError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DbError::Validation("name is required".to_string()));
        }

        self.with_conn(|conn| {
            let affected = conn.execute(
                "UPDATE users SET name = ? WHERE id = ?",
                rusqlite::params![name, user_id],
            )?;
            if affected == 0 {
                return Err(DbError::NotFound(format!("User {}", user_id)));
            }
            Ok(())
        })?;
        self.get_user(user_id)
    }

    /// Replace the user's bearer token. The previous token stops working.
    pub fn set_api_token(&self, user_id: &str, token: &str) -> Result<(), DbError> {
        self.with_conn(|conn| {
            let affected = conn.execute(
                "UPDATE users SET api_token_hash = ? WHERE id = ?",
                rusqlite::params![hash_token(token), user_id],
            )?;
            if affected == 0 {
                return Err(DbError::NotFound(format!("User {}", user_id)));
            }
            Ok(())
        })
    }

    fn map_user_row(row: &rusqlite::Row) -> rusqlite::Result<User> {
        let role_str: String = row.get(3)?;
        let status_str: String = row.get(4)?;

        let role = Role::parse(&role_str).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                3,
                rusqlite::types::Type::Text,
                format!("unknown role '{}'", role_str).into(),
            )
        })?;

        Ok(User {
            id: row.get(0)?,
            name: row.get(1)?,
            email: row.get(2)?,
            role,
            status: UserStatus::parse(&status_str).unwrap_or(UserStatus::Disabled),
            created_at: parse_datetime(row.get(5)?),
        })
    }
}
