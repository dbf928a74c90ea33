pub mod auth;
pub mod config;
pub mod error;
pub mod rest;
pub mod storage;
pub mod tasks;
pub mod ws;

use std::sync::Arc;

use auth::token::{self, TokenKeys};
use auth::AuthService;
use config::ServerConfig;
use storage::Storage;
use tasks::{TaskService, TaskStorage};
use ws::ConnectionRegistry;

/// Shared application state passed to every HTTP handler and WebSocket
/// connection task.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub storage: Arc<Storage>,
    pub auth: Arc<AuthService>,
    pub tasks: Arc<TaskStorage>,
    pub task_service: Arc<TaskService>,
    pub registry: Arc<ConnectionRegistry>,
    pub started_at: std::time::Instant,
}

impl AppContext {
    /// Open storage, load or create the JWT secret, and wire the services
    /// together. All dependency injection happens here — services hold
    /// `Arc`s handed to them at construction and nothing reaches for
    /// globals.
    pub async fn init(config: ServerConfig) -> anyhow::Result<Arc<Self>> {
        let storage = Arc::new(Storage::new(&config.data_dir).await?);

        let secret = match &config.jwt_secret {
            Some(secret) => secret.clone(),
            None => token::get_or_create_secret(&config.data_dir)?,
        };
        let keys = TokenKeys::new(&secret, config.token_ttl_days);
        let auth = Arc::new(AuthService::new(storage.clone(), keys));

        let registry = Arc::new(ConnectionRegistry::new());
        let tasks = Arc::new(TaskStorage::new(storage.pool()));
        let task_service = Arc::new(TaskService::new(
            tasks.clone(),
            storage.clone(),
            registry.clone(),
        ));

        Ok(Arc::new(Self {
            config: Arc::new(config),
            storage,
            auth,
            tasks,
            task_service,
            registry,
            started_at: std::time::Instant::now(),
        }))
    }
}
