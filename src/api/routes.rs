use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::aggregator::{flatten_legs, group_by_match, MatchEntry};
use crate::api::admin;
use crate::api::health::HealthState;
use crate::api::viewer::ViewerIdentity;
use crate::db::TipStore;
use crate::entitlement::{expand_to_entries, is_entry_unlocked, plan_purchase, PurchasePlan, Viewer};
use crate::error::AppError;
use crate::state::TierStatsCache;
use crate::stats::{project, Headline, Stats, StatsOptions};
use crate::tier::PricingTier;
use crate::time_window::{is_today, is_yesterday};
use crate::types::{Role, Tip, TipStatus};

#[derive(Clone)]
pub struct ApiState {
    pub store: TipStore,
    /// Reference zone for calendar days.
    pub tz: Tz,
    pub stats_cache: Arc<TierStatsCache>,
    pub health: Arc<HealthState>,
    /// Whether `/stats?augment=true` is honored.
    pub allow_augmentation: bool,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(get_health))
        .route("/tips", get(get_tips))
        .route("/tips/mine", get(get_my_tips))
        .route("/stats", get(get_stats))
        .route("/purchases", post(post_purchases))
        .merge(admin::routes())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Query param structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayFilter {
    Today,
    Yesterday,
}

#[derive(Deserialize)]
pub struct TipsQuery {
    /// Tier label, e.g. `40 PLN`.
    pub tier: Option<String>,
    pub day: Option<DayFilter>,
}

#[derive(Deserialize)]
pub struct StatsQuery {
    #[serde(default)]
    pub headline: Headline,
    #[serde(default)]
    pub augment: bool,
}

#[derive(Deserialize)]
pub struct PurchaseRequest {
    pub tip_ids: Vec<String>,
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// One entry of the tip feed. Locked entries keep their header (teams, odds,
/// tier) but carry no pick, legs or analysis.
#[derive(Debug, Serialize)]
pub struct TipView {
    pub id: String,
    /// Raw tip ids behind this entry; the ids a purchase refers to.
    pub constituent_ids: Vec<String>,
    pub match_date: Option<DateTime<Utc>>,
    pub home_team: String,
    pub away_team: String,
    pub league: String,
    pub pick: Option<String>,
    pub legs: Option<Vec<String>>,
    pub odds: f64,
    pub units: f64,
    pub pricing_tier: PricingTier,
    pub price: u32,
    pub status: TipStatus,
    pub analysis: Option<String>,
    pub is_bet_builder: bool,
    pub proof_image_url: Option<String>,
    pub settled_at: Option<DateTime<Utc>>,
    pub unlocked: bool,
}

impl TipView {
    pub fn from_entry(entry: &MatchEntry, viewer: &Viewer) -> Self {
        let unlocked = is_entry_unlocked(entry, viewer);
        let mut view = Self::from_tip(entry.tip(), unlocked);
        view.constituent_ids = entry.constituent_ids();
        view
    }

    pub fn from_tip(tip: &Tip, unlocked: bool) -> Self {
        Self {
            id: tip.id.clone(),
            constituent_ids: vec![tip.id.clone()],
            match_date: tip.match_date,
            home_team: tip.home_team.clone(),
            away_team: tip.away_team.clone(),
            league: tip.league.clone(),
            pick: unlocked.then(|| tip.pick.clone()),
            legs: unlocked.then(|| flatten_legs(&tip.pick).map(str::to_string).collect()),
            odds: tip.odds,
            units: tip.units(),
            pricing_tier: tip.pricing_tier,
            price: tip.pricing_tier.price(),
            status: tip.status,
            analysis: if unlocked { tip.analysis.clone() } else { None },
            is_bet_builder: tip.is_bet_builder,
            proof_image_url: tip.proof_image_url.clone(),
            settled_at: tip.settled_at,
            unlocked,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub stats: Stats,
    pub win_rate_label: String,
    pub headline_label: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub last_stats_refresh_ms: u64,
    pub stats_refreshes: u64,
    pub cached_tiers: usize,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn get_health(State(state): State<ApiState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        last_stats_refresh_ms: state.health.last_stats_refresh_ms(),
        stats_refreshes: state.health.stats_refreshes(),
        cached_tiers: state.stats_cache.snapshot().len(),
    })
}

async fn get_tips(
    State(state): State<ApiState>,
    identity: ViewerIdentity,
    Query(params): Query<TipsQuery>,
) -> Result<Json<Vec<TipView>>, AppError> {
    let tier = params
        .tier
        .as_deref()
        .map(|label| {
            label
                .parse::<PricingTier>()
                .map_err(|_| AppError::BadRequest(format!("unknown tier {label:?}")))
        })
        .transpose()?;

    let now = Utc::now();
    let tips = state.store.all_tips().await?;
    let viewer = state
        .store
        .viewer_context(identity.user_id.as_deref(), identity.role, now)
        .await?;

    let views = group_by_match(&tips, &state.tz)
        .iter()
        .filter(|entry| tier.map_or(true, |t| entry.tip().pricing_tier == t))
        .filter(|entry| match (params.day, entry.tip().match_date) {
            (None, _) => true,
            (Some(DayFilter::Today), Some(d)) => is_today(d, now, &state.tz),
            (Some(DayFilter::Yesterday), Some(d)) => is_yesterday(d, now, &state.tz),
            (Some(_), None) => false,
        })
        .map(|entry| TipView::from_entry(entry, &viewer))
        .collect();

    Ok(Json(views))
}

async fn get_my_tips(
    State(state): State<ApiState>,
    identity: ViewerIdentity,
) -> Result<Json<Vec<TipView>>, AppError> {
    let user_id = identity.require_user()?;
    let ids = state.store.purchased_ids(user_id).await?;
    let tips = state.store.tips_by_ids(&ids).await?;
    Ok(Json(tips.iter().map(|t| TipView::from_tip(t, true)).collect()))
}

async fn get_stats(
    State(state): State<ApiState>,
    Query(params): Query<StatsQuery>,
) -> Result<Json<StatsResponse>, AppError> {
    if params.augment && !state.allow_augmentation {
        return Err(AppError::BadRequest("stats augmentation is disabled".to_string()));
    }
    let settled = state.store.settled_tips().await?;
    let stats = project(
        &settled,
        StatsOptions {
            display_augmentation: params.augment,
            headline: params.headline,
        },
    );
    Ok(Json(StatsResponse {
        win_rate_label: stats.win_rate_label(),
        headline_label: stats.headline_label(),
        stats,
    }))
}

async fn post_purchases(
    State(state): State<ApiState>,
    identity: ViewerIdentity,
    Json(body): Json<PurchaseRequest>,
) -> Result<Json<PurchasePlan>, AppError> {
    if identity.role != Role::User {
        return Err(AppError::Forbidden("only users can purchase tips".to_string()));
    }
    let user_id = identity.require_user()?;

    let now = Utc::now();
    let tips = state.store.all_tips().await?;
    let entries = group_by_match(&tips, &state.tz);
    let legs = expand_to_entries(&entries, &body.tip_ids)?;
    let viewer = state
        .store
        .viewer_context(Some(user_id), identity.role, now)
        .await?;

    let plan = plan_purchase(&legs, &viewer);
    if !plan.is_empty() {
        state
            .store
            .record_purchases(&plan.purchases(user_id), now)
            .await?;
    }
    info!(
        user_id,
        bought = plan.to_buy.len(),
        skipped = plan.already_owned.len(),
        amount = plan.amount,
        "[PURCHASE] {} leg(s) for {} PLN",
        plan.to_buy.len(),
        plan.amount
    );
    Ok(Json(plan))
}
