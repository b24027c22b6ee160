use crate::models::users;

use sqlx::PgPool;

use super::StoreError;

#[derive(Clone)]
pub struct UserRepository {
    conn: PgPool,
}

impl UserRepository {
    pub fn new(conn: PgPool) -> Self {
        Self { conn }
    }

    pub async fn upsert_user(&self, user: &users::NewUser) -> Result<users::User, StoreError> {
        let user = sqlx::query_as::<_, users::User>(
            r#"
                INSERT INTO users (id, name, email)
                VALUES ($1, $2, $3)
                ON CONFLICT (id) DO UPDATE
                SET name = EXCLUDED.name, email = EXCLUDED.email, updated_at = CURRENT_TIMESTAMP
                RETURNING *
            "#,
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.email)
        .fetch_one(&self.conn)
        .await?;

        Ok(user)
    }

    pub async fn get_user_by_id(&self, user_id: &str) -> Result<Option<users::User>, StoreError> {
        let user = sqlx::query_as::<_, users::User>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.conn)
            .await?;

        Ok(user)
    }

    pub async fn get_leaderboard(&self, limit: usize) -> Result<Vec<users::User>, StoreError> {
        let users = sqlx::query_as::<_, users::User>(
            "SELECT * FROM users ORDER BY points DESC, seq ASC LIMIT $1",
        )
        .bind(limit as i64)
        .fetch_all(&self.conn)
        .await?;

        Ok(users)
    }

    pub async fn count_users(&self) -> Result<i64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM users")
            .fetch_one(&self.conn)
            .await?;

        Ok(count)
    }
}
