// Router assembly, store wiring and tracing setup shared by the binary and tests
use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::{DefaultBodyLimit, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Json},
    routing::{delete, get, post},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::auth::KeyDeriver;
use crate::config::{AppConfig, StorageConfig, StoreBackend};
use crate::database::{DatabaseManager, PgDirectoryStore};
use crate::handlers::{admin, public};
use crate::services::DirectoryService;
use crate::sheets;
use crate::store::{DirectoryStore, MemoryStore, MirroredStore, StoreError};

const DEFAULT_LOG_FILTER: &str = "member_directory=info,tower_http=info";

/// Shared handler state. Cloned per request; the service itself is shared.
#[derive(Clone)]
pub struct AppState {
    pub directory: Arc<DirectoryService>,
}

impl AppState {
    pub fn new(directory: DirectoryService) -> Self {
        Self {
            directory: Arc::new(directory),
        }
    }
}

/// Install the global tracing subscriber. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    // A second call (tests) leaves the first subscriber in place
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Build the configured store, wrap it with the spreadsheet mirror when enabled
/// and make sure the seed groups exist.
pub async fn build_store(config: &StorageConfig) -> anyhow::Result<Arc<dyn DirectoryStore>> {
    let primary: Arc<dyn DirectoryStore> = match config.backend {
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
        StoreBackend::Sheets => Arc::new(
            sheets::store_from_config(&config.sheets).context("failed to configure spreadsheet store")?,
        ),
        StoreBackend::Postgres => {
            let pool = DatabaseManager::connect(config)
                .await
                .context("failed to connect to database")?;
            DatabaseManager::ensure_schema(&pool)
                .await
                .context("failed to create directory tables")?;
            Arc::new(PgDirectoryStore::new(pool))
        }
    };

    let store: Arc<dyn DirectoryStore> = match (config.sheet_mirror, config.backend) {
        (true, StoreBackend::Sheets) | (false, _) => primary,
        (true, _) if config.sheets.spreadsheet_id.is_none() => {
            warn!("SHEET_MIRROR is enabled but SHEET_ID is not set; mirroring disabled");
            primary
        }
        (true, _) => {
            let mirror = sheets::store_from_config(&config.sheets).context("failed to configure spreadsheet mirror")?;
            info!("Mirroring member writes to spreadsheet");
            Arc::new(MirroredStore::new(primary, Arc::new(mirror)))
        }
    };

    seed_groups(store.as_ref(), &config.seed_groups).await?;
    info!(backend = store.backend(), "Directory store ready");
    Ok(store)
}

async fn seed_groups(store: &dyn DirectoryStore, names: &[String]) -> anyhow::Result<()> {
    if names.is_empty() {
        return Ok(());
    }
    let existing = store.list_groups().await.context("failed to list groups")?;
    for name in names {
        if existing.iter().any(|g| &g.name == name) {
            continue;
        }
        match store.create_group(name).await {
            Ok(_) | Err(StoreError::Conflict(_)) => info!(group = %name, "Seeded group"),
            Err(e) => return Err(e).with_context(|| format!("failed to seed group '{}'", name)),
        }
    }
    Ok(())
}

/// Wire the store and secret from `config` into a ready `AppState`.
pub async fn build_state(config: &AppConfig) -> anyhow::Result<AppState> {
    let deriver = KeyDeriver::from_config(config.security.mod_link_secret.as_deref())
        .context("MOD_LINK_SECRET must be set")?;
    let store = build_store(&config.storage).await?;
    Ok(AppState::new(DirectoryService::new(store, deriver, config.links.clone())))
}

pub fn app(state: AppState, config: &AppConfig) -> Router {
    let layers = ServiceBuilder::new()
        .layer(cors_layer(&config.security.cors_origins))
        .layer(DefaultBodyLimit::max(config.server.max_request_size_bytes));

    let mut router = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .nest("/api", api_routes())
        .layer(layers);

    if config.server.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }

    router.with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        // Modify form
        .route("/getModLink", post(public::get_mod_link))
        .route("/getUserByKey", get(public::get_user_by_key))
        .route("/modifyUser", post(public::modify_user))
        .route("/getGroups", get(public::get_groups))
        // Admin panel
        .route("/users", get(admin::list_users))
        .route("/createUser", post(admin::create_user))
        .route("/groups", get(admin::group_list).post(admin::group_create))
        .route("/groups/rename", post(admin::group_rename))
        .route("/groups/:name", delete(admin::group_delete))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::permissive().allow_origin(AllowOrigin::list(allowed))
}

async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "Member Directory API",
            "version": version,
            "description": "Member directory with per-member modification links",
            "endpoints": {
                "health": "/health",
                "form": "/api/getModLink, /api/getUserByKey, /api/modifyUser, /api/getGroups",
                "admin": "/api/users, /api/createUser, /api/groups[/:name], /api/groups/rename",
            }
        }
    }))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();
    let store = state.directory.store();

    match store.health_check().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "store": store.backend()
                }
            })),
        ),
        Err(e) => {
            warn!("Store health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "store unavailable",
                    "data": {
                        "status": "degraded",
                        "timestamp": now,
                        "store": store.backend()
                    }
                })),
            )
        }
    }
}
