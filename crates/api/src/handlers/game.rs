//! Game endpoints.
//!
//! Players are identified only by the name they send; there are no accounts.
//! Every write goes through the per-player rate limiter first.
//!
//! Endpoints:
//! - POST /register-hit - One manual click, +1 score
//! - POST /build-auto-feeder - Buy an auto-feeder if the score allows it
//! - GET /top-scorers - Leaderboard, best first
//! - GET /auto-feeders - The auto-feeder catalog
//! - GET /players/{name} - A player's score and owned auto-feeders

use axum::{
    Json, Router, debug_handler,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use garde::Validate;
use shared::api::{
    AutoFeederInfo, BuildAutoFeederPayload, BuildAutoFeederResponse, FeedPayload, FeedResponse,
    MAX_PLAYER_NAME_LEN, PlayerResponse, ScoreBoardEntry, ScoreBoardResponse,
};

use crate::{
    error::AppError,
    game::PurchaseOutcome,
    state::AppState,
    stores::SortOrder,
};

/// Rate limit action for manual clicks.
pub const FEED_ACTION: &str = "/game/feed";
/// Rate limit action for auto-feeder purchases.
pub const BUILD_ACTION: &str = "/game/build-auto-feeder";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register-hit", post(feed))
        .route("/build-auto-feeder", post(build_auto_feeder))
        .route("/top-scorers", get(top_scorers))
        .route("/auto-feeders", get(list_auto_feeders))
        .route("/players/{name}", get(get_player))
}

async fn enforce_rate_limit(state: &AppState, player: &str, action: &str) -> Result<(), AppError> {
    let result = state.rate_limiter.check(player, action).await?;
    if result.is_allowed() {
        return Ok(());
    }

    tracing::info!(player, action, result = ?result, "rate-limit exceeded");
    Err(AppError::External(
        StatusCode::TOO_MANY_REQUESTS,
        "rate-limit exceeded",
    ))
}

#[debug_handler]
async fn feed(
    State(state): State<AppState>,
    Json(payload): Json<FeedPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    enforce_rate_limit(&state, &payload.user, FEED_ACTION).await?;

    let score = state.leaderboard.increment(&payload.user, 1.0).await?;

    Ok(Json(FeedResponse { score }))
}

/// Buys one auto-feeder. Not having enough score is not an error: the
/// response says `purchased: false` and nothing is recorded.
#[debug_handler]
async fn build_auto_feeder(
    State(state): State<AppState>,
    Json(payload): Json<BuildAutoFeederPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    enforce_rate_limit(&state, &payload.user, BUILD_ACTION).await?;

    let outcome = state
        .economy
        .purchase(&payload.user, payload.feeder_type)
        .await
        .map_err(AppError::from_purchase)?;

    let response = match outcome {
        PurchaseOutcome::Purchased {
            feeder_id,
            cost,
            score,
            owned,
            spent,
        } => BuildAutoFeederResponse {
            purchased: true,
            feeder_type: feeder_id,
            cost,
            score,
            owned: Some(owned),
            spent: Some(spent.saturating_neg()),
        },
        PurchaseOutcome::InsufficientScore {
            feeder_id,
            cost,
            score,
        } => BuildAutoFeederResponse {
            purchased: false,
            feeder_type: feeder_id,
            cost,
            score,
            owned: None,
            spent: None,
        },
    };

    Ok(Json(response))
}

#[debug_handler]
async fn top_scorers(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let entries = state
        .leaderboard
        .top(state.config.leaderboard_fetch_count, SortOrder::Descending)
        .await?;

    let elements = entries
        .into_iter()
        .map(|e| ScoreBoardEntry {
            rank: e.rank,
            name: e.player,
            value: e.score,
        })
        .collect();

    Ok(Json(ScoreBoardResponse { elements }))
}

#[debug_handler]
async fn list_auto_feeders(State(state): State<AppState>) -> Json<Vec<AutoFeederInfo>> {
    Json(state.economy.catalog().iter().map(AutoFeederInfo::from).collect())
}

#[debug_handler]
async fn get_player(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    if name.len() > MAX_PLAYER_NAME_LEN {
        return Err(AppError::Validation(format!(
            "name: length is greater than {MAX_PLAYER_NAME_LEN}"
        )));
    }

    let score = state.leaderboard.score(&name).await?;
    let holdings = state.economy.holdings(&name).await?;

    Ok(Json(PlayerResponse {
        name,
        score,
        auto_feeders: holdings.into_inner(),
    }))
}
