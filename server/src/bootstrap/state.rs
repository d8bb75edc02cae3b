use sqlx::{PgPool, postgres::PgPoolOptions};
use std::sync::Arc;
use tracing::info;

use wornshot_adapters::outgoing::{
    generation_reqwest::{echo_generator::EchoImageGenerator, http_generator::HttpImageGenerator},
    memory_dashmap::{ledger_memory::MemoryLedger, user_store_memory::MemoryUserStore},
    passwords::argon2::Argon2PasswordHasher,
    postgres_sqlx::{
        profile_store_postgres::PostgresProfileStoreAdapter,
        reservation_store_postgres::PostgresReservationStoreAdapter,
        user_store_postgres::PostgresUserStoreAdapter,
    },
};
use wornshot_adapters::shared::app_state::AppState as AdaptersAppState;
use wornshot_application::{
    auth::service::AuthService,
    config::CreditSettings,
    credits::service::CreditService,
    error::AppError,
    generation::service::GenerationService,
    infrastructure_config::{Config, GenerationBackend, StorageBackend},
    ports::incoming::{
        auth::AuthUseCase, credits::CreditsUseCase, generation::GenerationUseCase,
        reservations::ReservationReconcileUseCase,
    },
    ports::outgoing::{
        image_generation::DynImageGenerationPort, password_hasher::DynPasswordHasherPort,
        profile_store::DynProfileStorePort, reservation_store::DynReservationStorePort,
        user_store::DynUserStorePort,
    },
    reservations::service::ReservationReconciler,
};

/// Storage ports for the configured backend.
struct Stores {
    profiles: DynProfileStorePort,
    reservations: DynReservationStorePort,
    users: DynUserStorePort,
    db_pool: Option<PgPool>,
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    db_pool: Option<PgPool>,
    user_store: DynUserStorePort,
    password_hasher: DynPasswordHasherPort,
    pub credits_service: Arc<dyn CreditsUseCase + Send + Sync>,
    pub generation_service: Arc<dyn GenerationUseCase + Send + Sync>,
    pub auth_service: Arc<dyn AuthUseCase + Send + Sync>,
    pub reconciler: Arc<dyn ReservationReconcileUseCase + Send + Sync>,
}

impl AppState {
    pub async fn new(config: Config) -> Result<Self, AppError> {
        let config = Arc::new(config);
        let settings = CreditSettings::from_config(&config)?;

        let stores = Self::create_stores(&config).await?;
        let generator = Self::create_generator(&config)?;
        let password_hasher: DynPasswordHasherPort = Arc::new(
            Argon2PasswordHasher::from_config_or_default(&config.auth.argon2),
        );

        let credits_service = Arc::new(CreditService::new(
            Arc::clone(&stores.profiles),
            settings.pricing,
        ));
        let generation_service = Arc::new(GenerationService::new(
            Arc::clone(&stores.profiles),
            Arc::clone(&stores.reservations),
            generator,
            settings.clone(),
        ));
        let auth_service = Arc::new(AuthService::new(
            Arc::clone(&stores.users),
            Arc::clone(&password_hasher),
            Arc::clone(&stores.profiles),
            settings.pricing,
        ));
        let reconciler = Arc::new(ReservationReconciler::new(
            Arc::clone(&stores.reservations),
            settings.reconcile_batch_size,
        ));

        Ok(Self {
            config,
            db_pool: stores.db_pool,
            user_store: stores.users,
            password_hasher,
            credits_service,
            generation_service,
            auth_service,
            reconciler,
        })
    }

    async fn create_stores(config: &Config) -> Result<Stores, AppError> {
        match config.storage.backend {
            StorageBackend::Memory => {
                info!("Storage backend: in-memory (state is lost on restart)");
                let ledger = Arc::new(MemoryLedger::new());
                Ok(Stores {
                    profiles: Arc::clone(&ledger) as DynProfileStorePort,
                    reservations: ledger,
                    users: Arc::new(MemoryUserStore::new()),
                    db_pool: None,
                })
            }
            StorageBackend::Postgres => {
                let db_pool = Self::create_database_pool(config).await?;
                let timeout_secs = config.credits.operation_timeout_secs;
                info!("Storage backend: postgres");
                Ok(Stores {
                    profiles: Arc::new(PostgresProfileStoreAdapter::new(
                        db_pool.clone(),
                        timeout_secs,
                    )),
                    reservations: Arc::new(PostgresReservationStoreAdapter::new(
                        db_pool.clone(),
                        timeout_secs,
                    )),
                    users: Arc::new(PostgresUserStoreAdapter::new(db_pool.clone(), timeout_secs)),
                    db_pool: Some(db_pool),
                })
            }
        }
    }

    async fn create_database_pool(config: &Config) -> Result<PgPool, AppError> {
        let db_pool = PgPoolOptions::new()
            .max_connections(config.db.pool_size)
            .connect(config.db.database_url())
            .await
            .map_err(|e| AppError::DatabaseError {
                message: format!("Failed to connect to database: {e}"),
            })?;

        if config.db.run_migrations {
            sqlx::migrate!("../migrations")
                .run(&db_pool)
                .await
                .map_err(|e| AppError::DatabaseError {
                    message: format!("Failed to run migrations: {e}"),
                })?;
            info!("Database migrations applied");
        }

        Ok(db_pool)
    }

    fn create_generator(config: &Config) -> Result<DynImageGenerationPort, AppError> {
        match config.generation.backend {
            GenerationBackend::Echo => {
                info!("Image generation backend: echo");
                Ok(Arc::new(EchoImageGenerator))
            }
            GenerationBackend::Http => {
                info!(endpoint = %config.generation.endpoint_url, "Image generation backend: http");
                Ok(Arc::new(HttpImageGenerator::from_config(&config.generation)?))
            }
        }
    }

    pub fn db_pool(&self) -> Option<&PgPool> {
        self.db_pool.as_ref()
    }

    pub fn to_adapters_state(&self) -> (AdaptersAppState, DynUserStorePort, DynPasswordHasherPort) {
        let adapters_state = AdaptersAppState::new(
            Arc::clone(&self.config),
            Arc::clone(&self.credits_service),
            Arc::clone(&self.generation_service),
            Arc::clone(&self.auth_service),
        );

        (
            adapters_state,
            Arc::clone(&self.user_store),
            Arc::clone(&self.password_hasher),
        )
    }
}
