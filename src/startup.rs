//! Application Startup
//!
//! Wires settings into connection pools, repositories, services, and the
//! HTTP server.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use redis::aio::ConnectionManager;
use sqlx::PgPool;
use tokio::net::TcpListener;

use crate::application::services::{ChatService, ModerationGate, SessionResolver};
use crate::config::Settings;
use crate::gateway::{Gateway, PresenceTracker, RoomRouter};
use crate::infrastructure::cache::CachedSessionRepository;
use crate::infrastructure::repositories::{
    PgMessageRepository, PgModerationRepository, PgNotificationRepository,
    PgPrivateMessageRepository, PgReactionRepository, PgReadStateRepository, PgRoomRepository,
    PgSessionRepository, PgUserRepository,
};
use crate::infrastructure::{cache, database};
use crate::presentation::http::routes;
use crate::presentation::middleware::{cors, logging};
use crate::shared::snowflake::SnowflakeGenerator;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub redis: ConnectionManager,
    pub gateway: Arc<Gateway>,
    pub presence: Arc<PresenceTracker>,
    pub router: Arc<RoomRouter>,
    pub chat: Arc<ChatService>,
    pub resolver: Arc<SessionResolver>,
    pub settings: Arc<Settings>,
}

/// Application instance
pub struct Application {
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application from settings
    pub async fn build(settings: Settings) -> Result<Self> {
        let db = database::create_pool(&settings.database).await?;
        tracing::info!("Database connection pool created");

        database::run_migrations(&db).await?;
        tracing::info!("Database migrations applied");

        let redis = cache::create_redis_client(&settings.redis).await?;

        let snowflake = Arc::new(SnowflakeGenerator::new(settings.snowflake.machine_id as u64));

        let gateway = Arc::new(Gateway::new());
        let presence = Arc::new(PresenceTracker::new());
        let room_router = Arc::new(RoomRouter::new());

        let users = Arc::new(PgUserRepository::new(db.clone()));
        let sessions = Arc::new(CachedSessionRepository::new(
            Arc::new(PgSessionRepository::new(db.clone())),
            redis.clone(),
            settings.redis.session_cache_ttl,
        ));

        let resolver = Arc::new(SessionResolver::new(
            users.clone(),
            sessions,
            settings.auth.token_secret.clone(),
        ));

        let gate = ModerationGate::new(Arc::new(PgModerationRepository::new(db.clone())));

        let chat = Arc::new(ChatService::new(
            Arc::new(PgMessageRepository::new(db.clone())),
            Arc::new(PgPrivateMessageRepository::new(db.clone())),
            Arc::new(PgReactionRepository::new(db.clone())),
            Arc::new(PgRoomRepository::new(db.clone())),
            users,
            Arc::new(PgNotificationRepository::new(db.clone())),
            Arc::new(PgReadStateRepository::new(db.clone())),
            gate,
            gateway.clone(),
            room_router.clone(),
            presence.clone(),
            snowflake,
            settings.chat.history_limit,
        ));

        let state = AppState {
            db,
            redis,
            gateway,
            presence,
            router: room_router,
            chat,
            resolver,
            settings: Arc::new(settings.clone()),
        };

        let router = routes::create_router(state)
            .layer(logging::create_trace_layer())
            .layer(cors::create_cors_layer(&settings.cors));

        let addr: SocketAddr = settings.server_addr().parse()?;
        let listener = TcpListener::bind(addr).await?;
        tracing::info!("Listening on {}", addr);

        Ok(Self { listener, router })
    }

    /// Run the server until stopped
    pub async fn run_until_stopped(self) -> Result<()> {
        axum::serve(self.listener, self.router).await?;
        Ok(())
    }

    /// Get the bound address
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}
