use actix_web::{web, HttpResponse, Responder};
use validator::Validate;

use crate::config::MatchingSettings;
use crate::core::{MatchOptions, Matcher};
use crate::models::{ErrorResponse, FindMatchesRequest, FindMatchesResponse, HealthResponse, PreferenceProfile};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub matcher: Matcher,
    pub matching: MatchingSettings,
}

/// Configure all match-related routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/matches/find", web::post().to(find_matches));
}

/// Health check endpoint
async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Find matches endpoint
///
/// POST /api/v1/matches/find
///
/// Request body:
/// ```json
/// {
///   "industries": ["fintech"],
///   "stages": ["seed"],
///   "min_funding": 50000,
///   "max_funding": 500000,
///   "geographic_preferences": ["Europe"],
///   "risk_tolerance": "medium",
///   "investment_timeline": "12_months",
///   "top_k": 10,
///   "min_score": 0.6
/// }
/// ```
async fn find_matches(
    state: web::Data<AppState>,
    req: web::Json<FindMatchesRequest>,
) -> impl Responder {
    // Validate request
    if let Err(errors) = req.validate() {
        tracing::info!("Validation failed for find_matches request: {:?}", errors);
        return HttpResponse::BadRequest().json(ErrorResponse {
            error: "Validation failed".to_string(),
            message: errors.to_string(),
            status_code: 400,
        });
    }

    let profile = match PreferenceProfile::try_from(&*req) {
        Ok(profile) => profile,
        Err(e) => {
            return HttpResponse::BadRequest().json(ErrorResponse {
                error: "Invalid preferences".to_string(),
                message: e.to_string(),
                status_code: 400,
            });
        }
    };

    let options = match_options(&req, &state.matching);

    tracing::info!(
        "Finding matches: industries={:?}, stages={:?}, top_k={}, min_score={}",
        profile.industries,
        profile.stages,
        options.top_k,
        options.min_score
    );

    let result = state.matcher.find_matches(&profile, options).await;

    HttpResponse::Ok().json(FindMatchesResponse {
        matches: result.matches,
        statistics: result.statistics,
    })
}

/// Resolve request options against configured defaults, capping `top_k`
fn match_options(req: &FindMatchesRequest, settings: &MatchingSettings) -> MatchOptions {
    MatchOptions {
        top_k: req
            .top_k
            .unwrap_or(settings.default_top_k)
            .min(settings.max_top_k),
        min_score: req.min_score.unwrap_or(settings.default_min_score),
    }
}
