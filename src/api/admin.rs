//! Operator surface: tip CRUD, settlement, tier grants and the per-tier
//! breakdown. Every handler starts with `require_admin`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use tracing::info;

use crate::api::routes::ApiState;
use crate::api::viewer::ViewerIdentity;
use crate::config::RECENT_SETTLED_LIMIT;
use crate::db::models::NewTip;
use crate::entitlement::issue_grant;
use crate::error::AppError;
use crate::stats::{refresh_tier_stats, TierStat};
use crate::tier::PricingTier;
use crate::types::{Tip, TierGrant, TipStatus};

pub fn routes() -> Router<ApiState> {
    Router::new()
        .route("/admin/tips", get(list_tips).post(create_tip))
        .route("/admin/tips/recent-settled", get(recent_settled))
        .route("/admin/tips/:id", put(update_tip).delete(delete_tip))
        .route("/admin/tips/:id/settle", post(settle_tip))
        .route("/admin/tips/:id/unsettle", post(unsettle_tip))
        .route("/admin/stats/tiers", get(tier_stats))
        .route("/admin/grants", get(list_grants).post(create_grant))
        .route("/admin/grants/:id", delete(revoke_grant))
}

#[derive(Deserialize)]
pub struct SettleRequest {
    pub status: TipStatus,
    #[serde(default)]
    pub proof_image_url: Option<String>,
}

#[derive(Deserialize)]
pub struct GrantRequest {
    pub user_id: String,
    pub pricing_tier: PricingTier,
}

// ---------------------------------------------------------------------------
// Tips
// ---------------------------------------------------------------------------

async fn list_tips(
    State(state): State<ApiState>,
    identity: ViewerIdentity,
) -> Result<Json<Vec<Tip>>, AppError> {
    identity.require_admin()?;
    Ok(Json(state.store.tips_by_creation().await?))
}

async fn create_tip(
    State(state): State<ApiState>,
    identity: ViewerIdentity,
    Json(body): Json<NewTip>,
) -> Result<(StatusCode, Json<Tip>), AppError> {
    identity.require_admin()?;
    let tip = state.store.create_tip(body, Utc::now()).await?;
    refresh_tier_stats(&state.store, &state.stats_cache).await?;
    Ok((StatusCode::CREATED, Json(tip)))
}

async fn update_tip(
    State(state): State<ApiState>,
    identity: ViewerIdentity,
    Path(id): Path<String>,
    Json(body): Json<NewTip>,
) -> Result<Json<Tip>, AppError> {
    identity.require_admin()?;
    let tip = state.store.update_tip(&id, &body).await?;
    refresh_tier_stats(&state.store, &state.stats_cache).await?;
    Ok(Json(tip))
}

async fn settle_tip(
    State(state): State<ApiState>,
    identity: ViewerIdentity,
    Path(id): Path<String>,
    Json(body): Json<SettleRequest>,
) -> Result<Json<Tip>, AppError> {
    identity.require_admin()?;
    let proof = body
        .proof_image_url
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty());
    let tip = state
        .store
        .settle_tip(&id, body.status, proof, Utc::now())
        .await?;
    refresh_tier_stats(&state.store, &state.stats_cache).await?;
    Ok(Json(tip))
}

async fn unsettle_tip(
    State(state): State<ApiState>,
    identity: ViewerIdentity,
    Path(id): Path<String>,
) -> Result<Json<Tip>, AppError> {
    identity.require_admin()?;
    let tip = state.store.unsettle_tip(&id).await?;
    refresh_tier_stats(&state.store, &state.stats_cache).await?;
    Ok(Json(tip))
}

async fn delete_tip(
    State(state): State<ApiState>,
    identity: ViewerIdentity,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    identity.require_admin()?;
    state.store.delete_tip(&id).await?;
    refresh_tier_stats(&state.store, &state.stats_cache).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn recent_settled(
    State(state): State<ApiState>,
    identity: ViewerIdentity,
) -> Result<Json<Vec<Tip>>, AppError> {
    identity.require_admin()?;
    Ok(Json(state.store.recent_settled(RECENT_SETTLED_LIMIT).await?))
}

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Served from the cache. Tip edits recompute it right away; the refresher
/// covers everything else.
async fn tier_stats(
    State(state): State<ApiState>,
    identity: ViewerIdentity,
) -> Result<Json<Vec<TierStat>>, AppError> {
    identity.require_admin()?;
    if state.stats_cache.is_empty() {
        refresh_tier_stats(&state.store, &state.stats_cache).await?;
    }
    Ok(Json(state.stats_cache.snapshot()))
}

// ---------------------------------------------------------------------------
// Grants
// ---------------------------------------------------------------------------

async fn list_grants(
    State(state): State<ApiState>,
    identity: ViewerIdentity,
) -> Result<Json<Vec<TierGrant>>, AppError> {
    identity.require_admin()?;
    Ok(Json(state.store.all_grants().await?))
}

async fn create_grant(
    State(state): State<ApiState>,
    identity: ViewerIdentity,
    Json(body): Json<GrantRequest>,
) -> Result<Json<TierGrant>, AppError> {
    let admin_id = identity.require_admin()?;
    let grant = issue_grant(
        body.user_id.trim(),
        body.pricing_tier,
        Some(admin_id),
        Utc::now(),
        &state.tz,
    )?;
    let stored = state.store.upsert_grant(&grant).await?;
    info!(
        user_id = %stored.user_id,
        tier = %stored.pricing_tier,
        expires_at = %stored.expires_at,
        granted_by = admin_id,
        "[GRANT] {} unlocked for {} until {}",
        stored.pricing_tier,
        stored.user_id,
        stored.expires_at
    );
    Ok(Json(stored))
}

async fn revoke_grant(
    State(state): State<ApiState>,
    identity: ViewerIdentity,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    identity.require_admin()?;
    state.store.revoke_grant(&id).await?;
    info!(grant_id = %id, "[GRANT] revoked");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use crate::api::testing::{send, test_state};
    use crate::api::viewer::{VIEWER_ID_HEADER, VIEWER_ROLE_HEADER};
    use axum::http::{Method, StatusCode};
    use serde_json::{json, Value};

    const ADMIN: &[(&str, &str)] = &[(VIEWER_ID_HEADER, "root"), (VIEWER_ROLE_HEADER, "admin")];
    const USER: &[(&str, &str)] = &[(VIEWER_ID_HEADER, "u1"), (VIEWER_ROLE_HEADER, "user")];

    fn new_tip(tier: &str) -> Value {
        json!({
            "home_team": "Lech",
            "away_team": "Legia",
            "league": "Ekstraklasa",
            "picks": ["1", "BTTS"],
            "odds": 2.4,
            "pricing_tier": tier,
            "analysis": "home form"
        })
    }

    #[tokio::test]
    async fn non_admins_are_forbidden() {
        let (app, _) = test_state(false).await;
        for headers in [USER, &[][..]] {
            let (status, _) = send(&app, Method::GET, "/admin/tips", headers, None).await;
            assert_eq!(status, StatusCode::FORBIDDEN);
            let (status, _) = send(
                &app,
                Method::POST,
                "/admin/grants",
                headers,
                Some(json!({ "user_id": "u1", "pricing_tier": "40 PLN" })),
            )
            .await;
            assert_eq!(status, StatusCode::FORBIDDEN);
        }
    }

    #[tokio::test]
    async fn tip_lifecycle() {
        let (app, _) = test_state(false).await;

        let (status, created) =
            send(&app, Method::POST, "/admin/tips", ADMIN, Some(new_tip("40 PLN"))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["pick"], "1 | BTTS");
        assert_eq!(created["status"], "Pending");
        let id = created["id"].as_str().unwrap().to_string();

        let (status, settled) = send(
            &app,
            Method::POST,
            &format!("/admin/tips/{id}/settle"),
            ADMIN,
            Some(json!({ "status": "Won", "proof_image_url": "https://img/proof.png" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(settled["status"], "Won");
        assert!(!settled["settled_at"].is_null());
        assert_eq!(settled["proof_image_url"], "https://img/proof.png");

        let (_, recent) = send(&app, Method::GET, "/admin/tips/recent-settled", ADMIN, None).await;
        assert_eq!(recent.as_array().unwrap().len(), 1);

        let (_, reverted) = send(
            &app,
            Method::POST,
            &format!("/admin/tips/{id}/unsettle"),
            ADMIN,
            None,
        )
        .await;
        assert_eq!(reverted["status"], "Pending");
        assert!(reverted["settled_at"].is_null());
        assert!(reverted["proof_image_url"].is_null());

        let (status, edited) = send(
            &app,
            Method::PUT,
            &format!("/admin/tips/{id}"),
            ADMIN,
            Some(new_tip("75 PLN")),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(edited["pricing_tier"], "75 PLN");

        let (status, _) =
            send(&app, Method::DELETE, &format!("/admin/tips/{id}"), ADMIN, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (_, all) = send(&app, Method::GET, "/admin/tips", ADMIN, None).await;
        assert!(all.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn invalid_tip_input_is_rejected() {
        let (app, _) = test_state(false).await;
        let mut low_odds = new_tip("10 PLN");
        low_odds["odds"] = json!(1.0);
        let (status, _) = send(&app, Method::POST, "/admin/tips", ADMIN, Some(low_odds)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &app,
            Method::POST,
            "/admin/tips/missing/settle",
            ADMIN,
            Some(json!({ "status": "Lost" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn grant_unlocks_tier_for_the_day() {
        let (app, _) = test_state(false).await;
        send(&app, Method::POST, "/admin/tips", ADMIN, Some(new_tip("40 PLN"))).await;

        let (_, feed) = send(&app, Method::GET, "/tips", USER, None).await;
        assert_eq!(feed[0]["unlocked"], false);

        let (status, grant) = send(
            &app,
            Method::POST,
            "/admin/grants",
            ADMIN,
            Some(json!({ "user_id": "u1", "pricing_tier": "40 PLN" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(grant["granted_by"], "root");

        let (_, feed) = send(&app, Method::GET, "/tips", USER, None).await;
        assert_eq!(feed[0]["unlocked"], true);
        assert_eq!(feed[0]["analysis"], "home form");

        let (_, again) = send(
            &app,
            Method::POST,
            "/admin/grants",
            ADMIN,
            Some(json!({ "user_id": "u1", "pricing_tier": "40 PLN" })),
        )
        .await;
        assert_eq!(again["id"], grant["id"]);
        let (_, grants) = send(&app, Method::GET, "/admin/grants", ADMIN, None).await;
        assert_eq!(grants.as_array().unwrap().len(), 1);

        let (status, _) = send(
            &app,
            Method::POST,
            "/admin/grants",
            ADMIN,
            Some(json!({ "user_id": "u1", "pricing_tier": "Free" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let grant_id = grant["id"].as_str().unwrap();
        let (status, _) = send(
            &app,
            Method::DELETE,
            &format!("/admin/grants/{grant_id}"),
            ADMIN,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (_, feed) = send(&app, Method::GET, "/tips", USER, None).await;
        assert_eq!(feed[0]["unlocked"], false);
    }

    #[tokio::test]
    async fn tier_stats_computed_when_cache_is_cold() {
        let (app, state) = test_state(false).await;
        assert!(state.stats_cache.is_empty());
        send(&app, Method::POST, "/admin/tips", ADMIN, Some(new_tip("20 PLN"))).await;

        let (status, rows) = send(&app, Method::GET, "/admin/stats/tiers", ADMIN, None).await;
        assert_eq!(status, StatusCode::OK);
        let rows = rows.as_array().unwrap();
        assert_eq!(rows.len(), 6);
        assert_eq!(rows[2]["tier"], "20 PLN");
        assert_eq!(rows[2]["total"], 1);
        assert!(!state.stats_cache.is_empty());
    }

    #[tokio::test]
    async fn tier_stats_follow_settlement() {
        let (app, _) = test_state(false).await;
        let (_, created) =
            send(&app, Method::POST, "/admin/tips", ADMIN, Some(new_tip("20 PLN"))).await;
        let id = created["id"].as_str().unwrap().to_string();

        let (_, before) = send(&app, Method::GET, "/admin/stats/tiers", ADMIN, None).await;
        assert_eq!(before[2]["won"], 0);

        send(
            &app,
            Method::POST,
            &format!("/admin/tips/{id}/settle"),
            ADMIN,
            Some(json!({ "status": "Won" })),
        )
        .await;
        let (_, after) = send(&app, Method::GET, "/admin/stats/tiers", ADMIN, None).await;
        assert_eq!(after[2]["won"], 1);
        assert_eq!(after[2]["win_rate"], 100.0);

        send(&app, Method::DELETE, &format!("/admin/tips/{id}"), ADMIN, None).await;
        let (_, gone) = send(&app, Method::GET, "/admin/stats/tiers", ADMIN, None).await;
        assert_eq!(gone[2]["total"], 0);
    }
}
