//! Database service layer
//!
//! This module bundles the stores behind trait objects so that services do not
//! care whether they run against Postgres or the in-process store.

use std::sync::Arc;
use crate::config::DatabaseConfig;
use crate::database::memory::MemoryStore;
use crate::database::repositories::{
    CalendarTokenRepository, CalendarTokenStore, EventRepository, EventStore, UserRepository, UserStore,
};
use crate::database::{connection, DatabasePool};
use crate::utils::errors::Result;

#[derive(Clone)]
pub struct DatabaseService {
    pub events: Arc<dyn EventStore>,
    pub users: Arc<dyn UserStore>,
    pub calendar_tokens: Arc<dyn CalendarTokenStore>,
    pool: Option<DatabasePool>,
}

impl DatabaseService {
    /// Postgres-backed stores sharing one pool
    pub fn new(pool: DatabasePool) -> Self {
        Self {
            events: Arc::new(EventRepository::new(pool.clone())),
            users: Arc::new(UserRepository::new(pool.clone())),
            calendar_tokens: Arc::new(CalendarTokenRepository::new(pool.clone())),
            pool: Some(pool),
        }
    }

    /// All stores backed by one shared in-process state
    pub fn in_memory() -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            events: store.clone(),
            users: store.clone(),
            calendar_tokens: store,
            pool: None,
        }
    }

    /// Build the service described by the configuration, running migrations
    /// when a Postgres URL is given
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        if config.is_in_memory() {
            tracing::warn!("Using in-memory store; data will not survive a restart");
            return Ok(Self::in_memory());
        }

        let pool = connection::create_pool(config).await?;
        connection::run_migrations(&pool).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> Option<&DatabasePool> {
        self.pool.as_ref()
    }

    pub async fn health_check(&self) -> Result<()> {
        match &self.pool {
            Some(pool) => connection::health_check(pool).await,
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewUser, Role};

    #[tokio::test]
    async fn test_in_memory_service_shares_state() {
        let db = DatabaseService::in_memory();
        let user = db
            .users
            .create(NewUser {
                name: "Ada".into(),
                email: "ada@example.com".into(),
                password_hash: "hash".into(),
                role: Role::Staff,
            })
            .await
            .unwrap();

        let cloned = db.clone();
        assert!(cloned.users.find_by_id(user.id).await.unwrap().is_some());
        assert!(db.pool().is_none());
        assert!(db.health_check().await.is_ok());
    }

    #[tokio::test]
    async fn test_connect_with_memory_url() {
        let config = DatabaseConfig {
            url: "memory://".to_string(),
            max_connections: 1,
            min_connections: 0,
        };
        let db = DatabaseService::connect(&config).await.unwrap();
        assert!(db.pool().is_none());
    }
}
