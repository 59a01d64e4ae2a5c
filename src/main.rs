use actix_cors::Cors;
use actix_web::{web, App, HttpServer, HttpResponse, middleware, error, http::StatusCode};
use pitch_match::config::{LoggingSettings, PoolKind, Settings};
use pitch_match::core::{Matcher, OrchestratorConfig, ScoringOrchestrator, SemanticScorer};
use pitch_match::routes::{self, matches::AppState};
use pitch_match::services::{
    CandidatePool, ChatCompletionsGenerator, HttpCandidatePool, InMemoryCandidatePool, PgCandidatePool,
    ScoreCache, TracingSink,
};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// JSON error response for JSON payload errors
#[derive(Debug, serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

impl std::fmt::Display for JsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for JsonError {}

impl error::ResponseError for JsonError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::BAD_REQUEST))
            .json(self)
    }
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &actix_web::HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    JsonError {
        error: "invalid_json".to_string(),
        message: format!("Invalid JSON: {}", err),
        status_code: 400,
    }
    .into()
}

/// Handle query payload errors
pub fn handle_query_payload_error(err: error::QueryPayloadError, _req: &actix_web::HttpRequest) -> actix_web::Error {
    JsonError {
        error: "invalid_query".to_string(),
        message: format!("Invalid query: {}", err),
        status_code: 400,
    }
    .into()
}

/// LOG_LEVEL / LOG_FORMAT win over the configured values
fn init_tracing(logging: &LoggingSettings) {
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| logging.level.clone());
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| logging.format.clone());

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(log_level))
        .with_target(false)
        .with_level(true);

    if log_format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.init();
    }
}

fn startup_error(context: &str, err: impl std::fmt::Display) -> io::Error {
    tracing::error!("{}: {}", context, err);
    io::Error::new(io::ErrorKind::Other, format!("{}: {}", context, err))
}

async fn build_pool(settings: &Settings) -> io::Result<Arc<dyn CandidatePool>> {
    let pool = &settings.pool;

    let pool: Arc<dyn CandidatePool> = match pool.kind {
        PoolKind::Memory => {
            let candidates = if pool.url.is_empty() {
                warn!("No candidate file configured, starting with an empty pool");
                InMemoryCandidatePool::default()
            } else {
                let json = tokio::fs::read_to_string(&pool.url)
                    .await
                    .map_err(|e| startup_error("Failed to read candidate file", e))?;
                InMemoryCandidatePool::from_json(&json)
                    .map_err(|e| startup_error("Failed to parse candidate file", e))?
            };
            info!("In-memory candidate pool loaded ({} candidates)", candidates.len());
            Arc::new(candidates)
        }
        PoolKind::Http => {
            let client = HttpCandidatePool::new(
                pool.url.clone(),
                pool.api_key.clone(),
                pool.project_id.clone(),
                pool.database_id.clone(),
                pool.collection.clone(),
                pool.limit,
                Duration::from_secs(30),
            )
            .map_err(|e| startup_error("Failed to build document store client", e))?;
            info!("Document store candidate pool initialized ({})", pool.url);
            Arc::new(client)
        }
        PoolKind::Postgres => {
            let max_conn = pool.max_connections.unwrap_or(10);
            let min_conn = pool.min_connections.unwrap_or(1);
            let pg = PgCandidatePool::new(&pool.url, max_conn, min_conn, pool.limit)
                .await
                .map_err(|e| startup_error("Failed to connect to PostgreSQL", e))?;
            if let Err(e) = pg.health_check().await {
                warn!("PostgreSQL health check failed: {}", e);
            }
            info!("PostgreSQL candidate pool initialized (max: {} connections)", max_conn);
            Arc::new(pg)
        }
    };

    Ok(pool)
}

fn build_orchestrator(settings: &Settings) -> io::Result<ScoringOrchestrator> {
    let scorer = &settings.scorer;

    let Some(endpoint) = scorer.endpoint.clone() else {
        info!("No scorer endpoint configured, running fallback-only");
        return Ok(ScoringOrchestrator::fallback_only());
    };

    let timeout = Duration::from_secs(scorer.timeout_secs);
    let generator = ChatCompletionsGenerator::new(
        endpoint.clone(),
        scorer.api_key.clone(),
        scorer.model.clone(),
        scorer.temperature,
        scorer.max_tokens,
        timeout,
    )
    .map_err(|e| startup_error("Failed to build scorer client", e))?;

    let mut semantic = SemanticScorer::new(Arc::new(generator), timeout);

    if settings.cache.enabled {
        let cache = ScoreCache::new(settings.cache.capacity, settings.cache.ttl_secs);
        let stats = cache.stats();
        info!(
            "Score cache enabled (capacity: {}, TTL: {}s)",
            settings.cache.capacity, stats.ttl_secs
        );
        semantic = semantic.with_cache(Arc::new(cache));
    }

    info!("Semantic scorer initialized ({} via {})", scorer.model, endpoint);

    Ok(ScoringOrchestrator::new(
        semantic,
        OrchestratorConfig {
            max_concurrency: scorer.max_concurrency.max(1),
            failure_ratio: settings.matching.failure_ratio,
        },
    ))
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = Settings::load()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, format!("Configuration error: {}", e)))?;

    init_tracing(&settings.logging);

    info!("Starting Pitch Match service...");

    let pool = build_pool(&settings).await?;
    let orchestrator = build_orchestrator(&settings)?;

    let matcher = Matcher::new(pool, orchestrator).with_sink(Arc::new(TracingSink));

    let app_state = AppState {
        matcher,
        matching: settings.matching.clone(),
    };

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .app_data(web::QueryConfig::default().error_handler(handle_query_payload_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
