//! # User Repository
//!
//! Back-office accounts with argon2-hashed passwords.
//!
//! ## Deletion Rules
//! ```text
//! actor \ target │ super-admin │ admin │ cashier │ self
//! ───────────────┼─────────────┼───────┼─────────┼──────
//! super-admin    │     yes     │  yes  │   yes   │  no
//! admin          │     no      │  no   │   yes   │  no
//! cashier        │     no      │  no   │   no    │  no
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};

use super::generate_id;
use crate::error::{DbError, DbResult};
use crate::password::hash_password;
use kasir_core::validation::{validate_new_user, validate_user_update};
use kasir_core::{CoreError, NewUser, User, UserRole, UserUpdate};

const USER_COLUMNS: &str = "id, name, username, password_hash, role, created_at, updated_at";

/// Repository for user accounts.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Creates a new UserRepository.
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Lists all users ordered by name.
    pub async fn list(&self) -> DbResult<Vec<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY name");
        let users = sqlx::query_as::<_, User>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(users)
    }

    /// Gets a user by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Gets a user by username.
    pub async fn find_by_username(&self, username: &str) -> DbResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Creates a user, hashing the password.
    ///
    /// ## Returns
    /// * `Ok(User)` - The inserted user
    /// * `Err(DbError::UniqueViolation)` - Username already taken
    pub async fn create(&self, input: &NewUser) -> DbResult<User> {
        validate_new_user(input)?;

        let now = Utc::now();
        let user = User {
            id: generate_id(),
            name: input.name.trim().to_string(),
            username: input.username.clone(),
            password_hash: hash_password(&input.password)?,
            role: input.role,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO users (id, name, username, password_hash, role, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
            "#,
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(user.role)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::duplicate(field, &input.username),
            other => other,
        })?;

        info!(id = %user.id, username = %user.username, role = user.role.as_str(), "User created");
        Ok(user)
    }

    /// Updates a user. The password hash is replaced only when a non-empty
    /// password is given.
    pub async fn update(&self, id: &str, input: &UserUpdate) -> DbResult<User> {
        validate_user_update(input)?;
        debug!(id = %id, "Updating user");

        let mut user = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("User", id))?;

        if let Some(password) = input.password.as_deref().filter(|p| !p.is_empty()) {
            user.password_hash = hash_password(password)?;
        }
        user.name = input.name.trim().to_string();
        user.username = input.username.clone();
        user.role = input.role;
        user.updated_at = Utc::now();

        sqlx::query(
            r#"
            UPDATE users SET
                name = ?2,
                username = ?3,
                password_hash = ?4,
                role = ?5,
                updated_at = ?6
            WHERE id = ?1
            "#,
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(user.role)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::duplicate(field, &input.username),
            other => other,
        })?;

        Ok(user)
    }

    /// Deletes `target_id` on behalf of `actor`.
    ///
    /// ## Returns
    /// * `Ok(())` - User deleted
    /// * `Err(DbError::Business(Forbidden))` - Role rules or self-deletion
    /// * `Err(DbError::ForeignKeyViolation)` - The user still owns transactions
    pub async fn delete(&self, actor: &User, target_id: &str) -> DbResult<()> {
        let target = self
            .get_by_id(target_id)
            .await?
            .ok_or_else(|| DbError::not_found("User", target_id))?;

        if !actor.role.can_delete(target.role) {
            return Err(CoreError::Forbidden("Unauthorized action.".into()).into());
        }
        if actor.id == target.id {
            return Err(CoreError::Forbidden("You cannot delete your own account.".into()).into());
        }

        sqlx::query("DELETE FROM users WHERE id = ?1")
            .bind(target_id)
            .execute(&self.pool)
            .await?;

        info!(actor = %actor.id, target = %target.id, "User deleted");
        Ok(())
    }

    /// Counts users holding `role`.
    pub async fn count_by_role(&self, role: UserRole) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = ?1")
            .bind(role)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::password::verify_password;
    use crate::{Database, DbConfig};

    fn new_user(username: &str, role: UserRole) -> NewUser {
        NewUser {
            name: format!("User {}", username),
            username: username.to_string(),
            password: "secret1".to_string(),
            role,
        }
    }

    #[tokio::test]
    async fn test_create_hashes_password() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let user = db.users().create(&new_user("kasir1", UserRole::Cashier)).await.unwrap();

        assert_ne!(user.password_hash, "secret1");
        assert!(verify_password("secret1", &user.password_hash));

        let found = db.users().find_by_username("kasir1").await.unwrap().unwrap();
        assert_eq!(found.id, user.id);
        assert_eq!(found.role, UserRole::Cashier);
    }

    #[tokio::test]
    async fn test_duplicate_username() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.users().create(&new_user("kasir1", UserRole::Cashier)).await.unwrap();

        let result = db.users().create(&new_user("kasir1", UserRole::Admin)).await;
        assert!(matches!(result, Err(DbError::UniqueViolation { .. })));
    }

    #[tokio::test]
    async fn test_update_keeps_password_when_absent() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let user = db.users().create(&new_user("kasir1", UserRole::Cashier)).await.unwrap();

        let updated = db
            .users()
            .update(
                &user.id,
                &UserUpdate {
                    name: "Kasir Pagi".into(),
                    username: "kasir1".into(),
                    password: None,
                    role: UserRole::Admin,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Kasir Pagi");
        assert_eq!(updated.role, UserRole::Admin);
        assert!(verify_password("secret1", &updated.password_hash));

        let updated = db
            .users()
            .update(
                &user.id,
                &UserUpdate {
                    name: "Kasir Pagi".into(),
                    username: "kasir1".into(),
                    password: Some("rahasia2".into()),
                    role: UserRole::Admin,
                },
            )
            .await
            .unwrap();
        assert!(verify_password("rahasia2", &updated.password_hash));
    }

    #[tokio::test]
    async fn test_delete_rules() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.users();
        let root = repo.create(&new_user("root", UserRole::SuperAdmin)).await.unwrap();
        let admin = repo.create(&new_user("admin1", UserRole::Admin)).await.unwrap();
        let admin2 = repo.create(&new_user("admin2", UserRole::Admin)).await.unwrap();
        let cashier = repo.create(&new_user("kasir1", UserRole::Cashier)).await.unwrap();

        assert!(matches!(
            repo.delete(&admin, &admin2.id).await,
            Err(DbError::Business(CoreError::Forbidden(_)))
        ));
        assert!(matches!(
            repo.delete(&root, &root.id).await,
            Err(DbError::Business(CoreError::Forbidden(_)))
        ));
        assert!(matches!(
            repo.delete(&cashier, &cashier.id).await,
            Err(DbError::Business(CoreError::Forbidden(_)))
        ));

        repo.delete(&admin, &cashier.id).await.unwrap();
        repo.delete(&root, &admin2.id).await.unwrap();
        assert_eq!(repo.list().await.unwrap().len(), 2);
        assert_eq!(repo.count_by_role(UserRole::Admin).await.unwrap(), 1);
    }
}
