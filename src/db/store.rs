use std::collections::HashSet;

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::db::models::{GrantRow, NewTip, TipRow};
use crate::entitlement::Viewer;
use crate::error::{AppError, Result};
use crate::types::{Purchase, Role, Tip, TierGrant, TipStatus};

const TIP_COLUMNS: &str = "id, match_date, home_team, away_team, league, pick, odds, stake, \
     pricing_tier, status, analysis, is_bet_builder, proof_image_url, settled_at, created_at";

/// Feed order. Same-match legs keep insertion order, which decides leg order
/// and the base tip on a tier tie when grouped.
const FEED_ORDER: &str = "match_date DESC, created_at ASC, id ASC";

const GRANT_COLUMNS: &str = "id, user_id, pricing_tier, expires_at, granted_at, granted_by";

/// Persistence collaborator. Hands out plain snapshots; nothing above it ever
/// holds a live query.
#[derive(Clone)]
pub struct TipStore {
    pool: SqlitePool,
}

impl TipStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // -----------------------------------------------------------------------
    // Tips
    // -----------------------------------------------------------------------

    pub async fn all_tips(&self) -> Result<Vec<Tip>> {
        let sql = format!("SELECT {TIP_COLUMNS} FROM tips ORDER BY {FEED_ORDER}");
        let rows = sqlx::query_as::<_, TipRow>(&sql).fetch_all(&self.pool).await?;
        rows.into_iter().map(Tip::try_from).collect()
    }

    /// Admin listing, newest insert first.
    pub async fn tips_by_creation(&self) -> Result<Vec<Tip>> {
        let sql = format!("SELECT {TIP_COLUMNS} FROM tips ORDER BY created_at DESC, id ASC");
        let rows = sqlx::query_as::<_, TipRow>(&sql).fetch_all(&self.pool).await?;
        rows.into_iter().map(Tip::try_from).collect()
    }

    pub async fn settled_tips(&self) -> Result<Vec<Tip>> {
        let sql = format!("SELECT {TIP_COLUMNS} FROM tips WHERE status != 'Pending'");
        let rows = sqlx::query_as::<_, TipRow>(&sql).fetch_all(&self.pool).await?;
        rows.into_iter().map(Tip::try_from).collect()
    }

    pub async fn recent_settled(&self, limit: i64) -> Result<Vec<Tip>> {
        let sql = format!(
            "SELECT {TIP_COLUMNS} FROM tips WHERE status != 'Pending' ORDER BY settled_at DESC LIMIT ?"
        );
        let rows = sqlx::query_as::<_, TipRow>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Tip::try_from).collect()
    }

    pub async fn tips_by_ids(&self, ids: &[String]) -> Result<Vec<Tip>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {TIP_COLUMNS} FROM tips WHERE id IN ("));
        let mut separated = qb.separated(", ");
        for id in ids {
            separated.push_bind(id.clone());
        }
        separated.push_unseparated(format!(") ORDER BY {FEED_ORDER}"));

        let rows = qb.build_query_as::<TipRow>().fetch_all(&self.pool).await?;
        rows.into_iter().map(Tip::try_from).collect()
    }

    pub async fn get_tip(&self, id: &str) -> Result<Tip> {
        let sql = format!("SELECT {TIP_COLUMNS} FROM tips WHERE id = ?");
        let row = sqlx::query_as::<_, TipRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("tip {id}")))?;
        Tip::try_from(row)
    }

    /// Store an admin-authored tip as Pending under a fresh UUID.
    pub async fn create_tip(&self, new: NewTip, now: DateTime<Utc>) -> Result<Tip> {
        let tip = new.into_tip(Uuid::new_v4().to_string(), now)?;
        self.insert_tip(&tip).await?;
        info!(tip_id = %tip.id, tier = %tip.pricing_tier, "[TIPS] created");
        Ok(tip)
    }

    pub(crate) async fn insert_tip(&self, tip: &Tip) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO tips (
                id, match_date, home_team, away_team, league, pick, odds, stake,
                pricing_tier, status, analysis, is_bet_builder, proof_image_url,
                settled_at, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&tip.id)
        .bind(tip.match_date)
        .bind(&tip.home_team)
        .bind(&tip.away_team)
        .bind(&tip.league)
        .bind(&tip.pick)
        .bind(tip.odds)
        .bind(tip.stake)
        .bind(tip.pricing_tier.label())
        .bind(tip.status.to_string())
        .bind(&tip.analysis)
        .bind(tip.is_bet_builder)
        .bind(&tip.proof_image_url)
        .bind(tip.settled_at)
        .bind(tip.created_at)
        .execute(&self.pool)
        .await?;
        debug!(tip_id = %tip.id, tier = %tip.pricing_tier, "[TIPS] inserted");
        Ok(())
    }

    /// Overwrite the editable fields. Status and settlement stay as they are.
    pub async fn update_tip(&self, id: &str, edit: &NewTip) -> Result<Tip> {
        edit.validate()?;
        let result = sqlx::query(
            r#"
            UPDATE tips SET
                home_team = ?, away_team = ?, league = ?, pick = ?, odds = ?,
                pricing_tier = ?, analysis = ?, is_bet_builder = ?,
                match_date = COALESCE(?, match_date),
                stake = COALESCE(?, stake)
            WHERE id = ?
            "#,
        )
        .bind(edit.home_team.trim())
        .bind(edit.away_team.trim())
        .bind(edit.league.trim())
        .bind(edit.joined_pick())
        .bind(edit.odds)
        .bind(edit.pricing_tier.label())
        .bind(edit.cleaned_analysis())
        .bind(edit.is_bet_builder)
        .bind(edit.match_date)
        .bind(edit.stake)
        .bind(id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("tip {id}")));
        }
        self.get_tip(id).await
    }

    /// Move a tip out of Pending. The proof screenshot sticks only to wins.
    pub async fn settle_tip(
        &self,
        id: &str,
        status: TipStatus,
        proof_image_url: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Tip> {
        if !status.is_settled() {
            return Err(AppError::BadRequest("settle needs Won, Lost or Void".to_string()));
        }
        let proof = if status == TipStatus::Won { proof_image_url } else { None };
        let result = sqlx::query(
            "UPDATE tips SET status = ?, settled_at = ?, proof_image_url = ? WHERE id = ?",
        )
        .bind(status.to_string())
        .bind(now)
        .bind(proof)
        .bind(id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("tip {id}")));
        }
        info!(tip_id = %id, %status, "[TIPS] settled");
        self.get_tip(id).await
    }

    pub async fn unsettle_tip(&self, id: &str) -> Result<Tip> {
        if !self.get_tip(id).await?.is_settled() {
            return Err(AppError::BadRequest(format!("tip {id} is not settled")));
        }
        let result = sqlx::query(
            "UPDATE tips SET status = 'Pending', settled_at = NULL, proof_image_url = NULL WHERE id = ?",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("tip {id}")));
        }
        info!(tip_id = %id, "[TIPS] settlement reverted");
        self.get_tip(id).await
    }

    pub async fn delete_tip(&self, id: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM purchases WHERE tip_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM tips WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("tip {id}")));
        }
        tx.commit().await?;
        info!(tip_id = %id, "[TIPS] deleted");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Purchases
    // -----------------------------------------------------------------------

    pub async fn purchased_ids(&self, user_id: &str) -> Result<Vec<String>> {
        let ids = sqlx::query_scalar::<_, String>("SELECT tip_id FROM purchases WHERE user_id = ?")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }

    /// Rows that already exist are left alone. Returns how many were new.
    pub async fn record_purchases(&self, purchases: &[Purchase], now: DateTime<Utc>) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;
        for purchase in purchases {
            let result = sqlx::query(
                "INSERT OR IGNORE INTO purchases (user_id, tip_id, amount_paid, created_at) VALUES (?, ?, ?, ?)",
            )
            .bind(&purchase.user_id)
            .bind(&purchase.tip_id)
            .bind(purchase.amount_paid)
            .bind(now)
            .execute(&mut *tx)
            .await?;
            inserted += result.rows_affected();
        }
        tx.commit().await?;
        Ok(inserted)
    }

    // -----------------------------------------------------------------------
    // Tier grants
    // -----------------------------------------------------------------------

    pub async fn grants_for(&self, user_id: &str) -> Result<Vec<TierGrant>> {
        let sql = format!("SELECT {GRANT_COLUMNS} FROM tier_grants WHERE user_id = ?");
        let rows = sqlx::query_as::<_, GrantRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(TierGrant::try_from).collect()
    }

    pub async fn all_grants(&self) -> Result<Vec<TierGrant>> {
        let sql = format!("SELECT {GRANT_COLUMNS} FROM tier_grants ORDER BY expires_at DESC");
        let rows = sqlx::query_as::<_, GrantRow>(&sql).fetch_all(&self.pool).await?;
        rows.into_iter().map(TierGrant::try_from).collect()
    }

    /// Insert, or move `expires_at`/`granted_by` on the existing
    /// `(user_id, pricing_tier)` row. Returns the stored row.
    pub async fn upsert_grant(&self, grant: &TierGrant) -> Result<TierGrant> {
        let sql = format!(
            r#"
            INSERT INTO tier_grants ({GRANT_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id, pricing_tier) DO UPDATE SET
                expires_at = excluded.expires_at,
                granted_by = excluded.granted_by
            RETURNING {GRANT_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, GrantRow>(&sql)
            .bind(&grant.id)
            .bind(&grant.user_id)
            .bind(grant.pricing_tier.label())
            .bind(grant.expires_at)
            .bind(grant.granted_at)
            .bind(&grant.granted_by)
            .fetch_one(&self.pool)
            .await?;
        TierGrant::try_from(row)
    }

    pub async fn revoke_grant(&self, id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM tier_grants WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("grant {id}")));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Viewer snapshot
    // -----------------------------------------------------------------------

    /// Pre-fetch purchases and grants so the resolver can run without I/O.
    pub async fn viewer_context(&self, user_id: Option<&str>, role: Role, now: DateTime<Utc>) -> Result<Viewer> {
        let Some(user_id) = user_id else {
            return Ok(Viewer::new(None, role, HashSet::new(), HashSet::new()));
        };
        if role == Role::Anonymous {
            return Ok(Viewer::anonymous());
        }
        let purchases = self.purchased_ids(user_id).await?;
        let grants = self.grants_for(user_id).await?;
        Ok(Viewer::from_grants(
            Some(user_id.to_string()),
            role,
            purchases,
            &grants,
            now,
        ))
    }
}
