use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, OptionalExtension};
use serde::Serialize;
use tracing::info;

use crate::db::RegistryDb;
use crate::error::{RegistryError, Result};
use crate::risk;
use crate::types::{
    is_valid_wallet_address, Evidence, NewReport, PatternTag, ReportStatus, Verification,
    VerifyUpdate, WalletReport,
};

/// Hard cap on list page size, regardless of what the caller asks for.
pub const MAX_LIST_LIMIT: u32 = 500;

/// Listing parameters for the public feed. Sort keys use the wire-side
/// camelCase names with an optional leading `-` for descending.
#[derive(Debug, Clone)]
pub struct ListQuery {
    pub status: ReportStatus,
    pub limit: u32,
    pub sort: String,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            status: ReportStatus::Verified,
            limit: 50,
            sort: "-riskScore".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusBreakdown {
    pub status: ReportStatus,
    pub count: i64,
    pub total_victims_loss: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryStats {
    pub stats: Vec<StatusBreakdown>,
    pub total_verified: i64,
    pub high_risk: i64,
    pub total_victims_loss: f64,
}

/// CRUD layer over `wallet_reports`.
///
/// Every operation is one `db.call` closure; multi-statement operations run
/// inside a single rusqlite transaction. Case-number allocation is race-safe
/// because the background connection thread executes closures one at a time
/// and the allocating SELECT shares a transaction with the INSERT; the
/// UNIQUE constraint on `case_number` is the backstop.
pub struct ReportStore {
    db: Arc<RegistryDb>,
}

impl ReportStore {
    pub fn new(db: Arc<RegistryDb>) -> Self {
        Self { db }
    }

    /// Submit a report. Idempotent-with-counting per address: a novel
    /// address inserts a pending row with the next case number, a known one
    /// (active or not) increments `report_count` instead. The bool is true
    /// when a new case was opened.
    pub async fn submit(&self, new: NewReport) -> Result<(WalletReport, bool)> {
        if !is_valid_wallet_address(&new.wallet_address) {
            return Err(RegistryError::InvalidAddress(new.wallet_address));
        }

        let now = now_rfc3339();
        let (report, created) = self
            .db
            .call(move |conn| {
                let tx = conn.transaction()?;

                let existing: Option<i64> = tx
                    .query_row(
                        "SELECT id FROM wallet_reports WHERE wallet_address = ?1",
                        [new.wallet_address.as_str()],
                        |row| row.get(0),
                    )
                    .optional()?;

                let (id, created) = if let Some(id) = existing {
                    tx.execute(
                        "UPDATE wallet_reports
                         SET report_count = report_count + 1, last_updated = ?1
                         WHERE id = ?2",
                        params![now, id],
                    )?;
                    (id, false)
                } else {
                    let next_case: i64 = tx.query_row(
                        "SELECT COALESCE(MAX(case_number), 0) + 1 FROM wallet_reports",
                        [],
                        |row| row.get(0),
                    )?;
                    let evidence = new.evidence.unwrap_or_default();
                    tx.execute(
                        "INSERT INTO wallet_reports
                            (wallet_address, case_number, status, project_name, token_address,
                             evidence_tx_hash, evidence_solscan_link, evidence_description,
                             evidence_submitted_at, first_seen, last_updated)
                         VALUES (?1, ?2, 'pending', ?3, ?4, ?5, ?6, ?7, ?8, ?8, ?8)",
                        params![
                            new.wallet_address,
                            next_case,
                            new.project_name,
                            new.token_address,
                            evidence.tx_hash,
                            evidence.solscan_link,
                            evidence.description,
                            now,
                        ],
                    )?;
                    (tx.last_insert_rowid(), true)
                };

                let report =
                    fetch_report(&tx, id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)?;
                tx.commit()?;
                Ok((report, created))
            })
            .await?;

        if created {
            info!(
                case_number = report.case_number,
                wallet = %report.wallet_address,
                "new wallet report opened"
            );
        }
        Ok((report, created))
    }

    /// Count one more submission against an existing case. `NotFound` when
    /// the address has never been reported; callers that want the
    /// create-or-count dispatch should use [`Self::submit`].
    pub async fn record_duplicate(&self, address: &str) -> Result<WalletReport> {
        let addr = address.to_string();
        let now = now_rfc3339();
        self.db
            .call(move |conn| {
                let tx = conn.transaction()?;
                let updated = tx.execute(
                    "UPDATE wallet_reports
                     SET report_count = report_count + 1, last_updated = ?1
                     WHERE wallet_address = ?2",
                    params![now, addr],
                )?;
                let report = if updated == 0 {
                    None
                } else {
                    fetch_report_by_address(&tx, &addr)?
                };
                tx.commit()?;
                Ok(report)
            })
            .await?
            .ok_or_else(|| RegistryError::NotFound(address.to_string()))
    }

    /// Apply a moderation update: merge the supplied verification fields
    /// over the stored ones (field-by-field, presence-based), stamp
    /// `verified_at`/`solscan_checked`, recompute the risk score, persist.
    pub async fn verify(&self, id: i64, update: VerifyUpdate) -> Result<WalletReport> {
        let now = Utc::now();
        let now_s = now.to_rfc3339_opts(SecondsFormat::Millis, true);

        self.db
            .call(move |conn| {
                let tx = conn.transaction()?;
                let Some(mut report) = fetch_report(&tx, id)? else {
                    return Ok(None);
                };

                if let Some(status) = update.status {
                    report.status = status;
                }

                let v = &mut report.verification;
                v.verified_by = Some(update.verified_by.unwrap_or_else(|| "admin".to_string()));
                v.verified_at = Some(now);
                v.solscan_checked = true;
                if let Some(notes) = update.notes {
                    v.notes = Some(notes);
                }
                // Option-ness, not truthiness: Some(false) must overwrite.
                if let Some(locked) = update.liquidity_locked {
                    v.liquidity_locked = Some(locked);
                }
                if let Some(amount) = update.liquidity_amount {
                    v.liquidity_amount = Some(amount);
                }
                if let Some(loss) = update.victims_loss {
                    v.victims_loss = Some(loss);
                }
                if let Some(tags) = update.pattern_found {
                    v.pattern_found = tags;
                }

                report.risk_score = risk::risk_score(report.status, &report.verification);
                report.last_updated = now;

                let pattern_json = serde_json::to_string(&report.verification.pattern_found)
                    .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
                tx.execute(
                    "UPDATE wallet_reports SET
                        status = ?1, risk_score = ?2, verified_by = ?3, verified_at = ?4,
                        verification_notes = ?5, solscan_checked = 1, liquidity_locked = ?6,
                        liquidity_amount = ?7, victims_loss = ?8, pattern_found = ?9,
                        last_updated = ?10
                     WHERE id = ?11",
                    params![
                        report.status.to_string(),
                        report.risk_score,
                        report.verification.verified_by,
                        now_s,
                        report.verification.notes,
                        report.verification.liquidity_locked,
                        report.verification.liquidity_amount,
                        report.verification.victims_loss,
                        pattern_json,
                        now_s,
                        id,
                    ],
                )?;
                tx.commit()?;
                Ok(Some(report))
            })
            .await?
            .ok_or_else(|| RegistryError::NotFound(format!("id {id}")))
    }

    /// Soft delete: the row stays addressable by exact lookup but drops out
    /// of public listings and aggregates. The only delete path.
    pub async fn deactivate(&self, id: i64) -> Result<WalletReport> {
        let now = now_rfc3339();
        self.db
            .call(move |conn| {
                let tx = conn.transaction()?;
                let updated = tx.execute(
                    "UPDATE wallet_reports SET is_active = 0, last_updated = ?1 WHERE id = ?2",
                    params![now, id],
                )?;
                let report = if updated == 0 {
                    None
                } else {
                    fetch_report(&tx, id)?
                };
                tx.commit()?;
                Ok(report)
            })
            .await?
            .ok_or_else(|| RegistryError::NotFound(format!("id {id}")))
    }

    /// Active reports with the given status, sorted and capped. Public feed.
    pub async fn list(&self, query: ListQuery) -> Result<Vec<WalletReport>> {
        let order_by = sort_clause(&query.sort);
        let status = query.status.to_string();
        let limit = query.limit.min(MAX_LIST_LIMIT);

        let reports = self
            .db
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {REPORT_COLUMNS} FROM wallet_reports
                     WHERE status = ?1 AND is_active = 1
                     ORDER BY {order_by}
                     LIMIT ?2"
                ))?;
                let rows = stmt
                    .query_map(params![status, limit], report_from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await?;
        Ok(reports)
    }

    /// Exact natural-key lookup. Deliberately ignores `is_active`:
    /// moderators and auditors need to see deactivated cases.
    pub async fn get_by_address(&self, address: &str) -> Result<WalletReport> {
        let addr = address.to_string();
        self.db
            .call(move |conn| fetch_report_by_address(conn, &addr))
            .await?
            .ok_or_else(|| RegistryError::NotFound(address.to_string()))
    }

    /// Lookup by internal id, `is_active` ignored as above.
    pub async fn get_by_id(&self, id: i64) -> Result<WalletReport> {
        self.db
            .call(move |conn| fetch_report(conn, id))
            .await?
            .ok_or_else(|| RegistryError::NotFound(format!("id {id}")))
    }

    /// Aggregates over active rows only.
    pub async fn summary_stats(&self) -> Result<SummaryStats> {
        let threshold = i64::from(risk::HIGH_RISK_THRESHOLD);
        let stats = self
            .db
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT status, COUNT(*), COALESCE(SUM(victims_loss), 0.0)
                     FROM wallet_reports
                     WHERE is_active = 1
                     GROUP BY status
                     ORDER BY status",
                )?;
                let breakdown = stmt
                    .query_map([], |row| {
                        Ok(StatusBreakdown {
                            status: parse_status(0, row.get(0)?)?,
                            count: row.get(1)?,
                            total_victims_loss: row.get(2)?,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;

                let total_verified: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM wallet_reports
                     WHERE status = 'verified' AND is_active = 1",
                    [],
                    |row| row.get(0),
                )?;
                let high_risk: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM wallet_reports
                     WHERE status = 'verified' AND risk_score >= ?1 AND is_active = 1",
                    [threshold],
                    |row| row.get(0),
                )?;
                let total_victims_loss: f64 = conn.query_row(
                    "SELECT COALESCE(SUM(victims_loss), 0.0) FROM wallet_reports
                     WHERE is_active = 1",
                    [],
                    |row| row.get(0),
                )?;

                Ok(SummaryStats {
                    stats: breakdown,
                    total_verified,
                    high_risk,
                    total_victims_loss,
                })
            })
            .await?;
        Ok(stats)
    }
}

const REPORT_COLUMNS: &str = "id, wallet_address, case_number, status, risk_score, \
     project_name, token_address, evidence_tx_hash, evidence_solscan_link, \
     evidence_description, evidence_submitted_at, verified_by, verified_at, \
     verification_notes, solscan_checked, liquidity_locked, liquidity_amount, \
     victims_loss, pattern_found, first_seen, last_updated, report_count, is_active";

fn fetch_report(conn: &rusqlite::Connection, id: i64) -> rusqlite::Result<Option<WalletReport>> {
    conn.query_row(
        &format!("SELECT {REPORT_COLUMNS} FROM wallet_reports WHERE id = ?1"),
        [id],
        report_from_row,
    )
    .optional()
}

fn fetch_report_by_address(
    conn: &rusqlite::Connection,
    address: &str,
) -> rusqlite::Result<Option<WalletReport>> {
    conn.query_row(
        &format!("SELECT {REPORT_COLUMNS} FROM wallet_reports WHERE wallet_address = ?1"),
        [address],
        report_from_row,
    )
    .optional()
}

fn report_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<WalletReport> {
    let pattern_raw: String = row.get(18)?;
    let pattern_found: Vec<PatternTag> = serde_json::from_str(&pattern_raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(18, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(WalletReport {
        id: row.get(0)?,
        wallet_address: row.get(1)?,
        case_number: row.get(2)?,
        status: parse_status(3, row.get(3)?)?,
        risk_score: row.get(4)?,
        project_name: row.get(5)?,
        token_address: row.get(6)?,
        evidence: Evidence {
            tx_hash: row.get(7)?,
            solscan_link: row.get(8)?,
            description: row.get(9)?,
            submitted_at: Some(parse_ts(10, row.get(10)?)?),
        },
        verification: Verification {
            verified_by: row.get(11)?,
            verified_at: parse_opt_ts(12, row.get(12)?)?,
            notes: row.get(13)?,
            solscan_checked: row.get(14)?,
            liquidity_locked: row.get(15)?,
            liquidity_amount: row.get(16)?,
            victims_loss: row.get(17)?,
            pattern_found,
        },
        first_seen: parse_ts(19, row.get(19)?)?,
        last_updated: parse_ts(20, row.get(20)?)?,
        report_count: row.get(21)?,
        is_active: row.get(22)?,
    })
}

fn parse_status(idx: usize, raw: String) -> rusqlite::Result<ReportStatus> {
    ReportStatus::from_str_loose(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("unknown report status: {raw}").into(),
        )
    })
}

fn parse_ts(idx: usize, raw: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                idx,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })
}

fn parse_opt_ts(idx: usize, raw: Option<String>) -> rusqlite::Result<Option<DateTime<Utc>>> {
    raw.map(|s| parse_ts(idx, s)).transpose()
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Whitelist wire sort keys onto columns; anything unknown falls back to
/// the default ordering. Keeps user input out of the SQL text.
fn sort_clause(sort: &str) -> String {
    let (key, desc) = match sort.strip_prefix('-') {
        Some(rest) => (rest, true),
        None => (sort, false),
    };
    let column = match key {
        "riskScore" => "risk_score",
        "caseNumber" => "case_number",
        "reportCount" => "report_count",
        "lastUpdated" => "last_updated",
        "firstSeen" => "first_seen",
        "victimsLoss" => "victims_loss",
        _ => return "risk_score DESC".to_string(),
    };
    format!("{column} {}", if desc { "DESC" } else { "ASC" })
}
