//! Test database helper utilities
//!
//! Postgres tests run only when `TEST_DATABASE_URL` points at a disposable
//! database; otherwise they return early.

use eventhub::config::DatabaseConfig;
use eventhub::database::{create_pool, run_migrations, DatabasePool, DatabaseService};
use eventhub::models::{NewUser, Role, User};

/// Test database helper that manages PostgreSQL test database setup
pub struct TestDatabase {
    pub pool: DatabasePool,
    pub service: DatabaseService,
}

impl TestDatabase {
    /// Connect and migrate, or `None` when no test database is configured
    pub async fn from_env() -> Option<Self> {
        let url = std::env::var("TEST_DATABASE_URL").ok()?;
        let config = DatabaseConfig { url, max_connections: 5, min_connections: 1 };

        let pool = create_pool(&config).await.expect("Failed to connect to TEST_DATABASE_URL");
        run_migrations(&pool).await.expect("Failed to run migrations");

        let db = Self { service: DatabaseService::new(pool.clone()), pool };
        db.cleanup().await;
        Some(db)
    }

    /// Remove all rows written by a test
    pub async fn cleanup(&self) {
        sqlx::query("TRUNCATE event_attendees, calendar_tokens, events, users CASCADE")
            .execute(&self.pool)
            .await
            .expect("Failed to truncate tables");
    }

    pub async fn create_user(&self, role: Role) -> User {
        let id = uuid::Uuid::new_v4().simple().to_string();
        self.service
            .users
            .create(NewUser {
                name: format!("User {}", &id[..6]),
                email: format!("{}@example.com", id),
                password_hash: "not-a-real-hash".to_string(),
                role,
            })
            .await
            .expect("Failed to create user")
    }

    pub async fn count_records(&self, table: &str) -> i64 {
        sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(&self.pool)
            .await
            .expect("Failed to count records")
    }
}
