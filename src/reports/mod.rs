//! Daily performance reports: one row per representative per calendar
//! date, an idempotent natural-key upsert, and a rolling-window summary
//! averaged over submitted reports rather than calendar days.

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::shared::error::{found_or_404, ApiError};
use crate::shared::schema::daily_reports;
use crate::shared::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = daily_reports)]
pub struct DailyReport {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub report_date: NaiveDate,
    pub new_leads: i32,
    pub initial_contacts: i32,
    pub deep_nurturing: i32,
    pub high_intents: i32,
    pub joined_groups: i32,
    pub opened_accounts: i32,
    pub deposited: i32,
    pub total_interactions: i32,
    pub conversions: i32,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitReportRequest {
    pub owner_id: Uuid,
    // Required by validation, Option so a missing date reports 400
    // instead of failing extraction.
    pub report_date: Option<NaiveDate>,
    #[serde(default)]
    pub new_leads: i32,
    #[serde(default)]
    pub initial_contacts: i32,
    #[serde(default)]
    pub deep_nurturing: i32,
    #[serde(default)]
    pub high_intents: i32,
    #[serde(default)]
    pub joined_groups: i32,
    #[serde(default)]
    pub opened_accounts: i32,
    #[serde(default)]
    pub deposited: i32,
    #[serde(default)]
    pub total_interactions: i32,
    #[serde(default)]
    pub conversions: i32,
    pub notes: Option<String>,
}

impl SubmitReportRequest {
    fn counters(&self) -> [i32; 9] {
        [
            self.new_leads,
            self.initial_contacts,
            self.deep_nurturing,
            self.high_intents,
            self.joined_groups,
            self.opened_accounts,
            self.deposited,
            self.total_interactions,
            self.conversions,
        ]
    }

    /// Check the submission and hand back its date.
    pub fn validate(&self) -> Result<NaiveDate, ApiError> {
        let report_date = self
            .report_date
            .ok_or_else(|| ApiError::Validation("report_date is required".to_string()))?;
        if self.counters().iter().any(|&c| c < 0) {
            return Err(ApiError::Validation(
                "report counters cannot be negative".to_string(),
            ));
        }
        Ok(report_date)
    }
}

/// Decide what the upsert stores: an overwrite of the existing row
/// (id and created_at survive) or a fresh insert. Returns the row and
/// whether it updates in place.
pub fn plan_submission(
    existing: Option<DailyReport>,
    req: &SubmitReportRequest,
    report_date: NaiveDate,
    now: DateTime<Utc>,
) -> (DailyReport, bool) {
    let (id, created_at, updated) = match &existing {
        Some(prev) => (prev.id, prev.created_at, true),
        None => (Uuid::new_v4(), now, false),
    };
    (
        DailyReport {
            id,
            owner_id: req.owner_id,
            report_date,
            new_leads: req.new_leads,
            initial_contacts: req.initial_contacts,
            deep_nurturing: req.deep_nurturing,
            high_intents: req.high_intents,
            joined_groups: req.joined_groups,
            opened_accounts: req.opened_accounts,
            deposited: req.deposited,
            total_interactions: req.total_interactions,
            conversions: req.conversions,
            notes: req.notes.clone(),
            created_at,
            updated_at: now,
        },
        updated,
    )
}

/// Overwrites every counter and the notes in place; id and created_at
/// survive resubmission.
#[derive(AsChangeset)]
#[diesel(table_name = daily_reports, treat_none_as_null = true)]
struct ReportChanges {
    new_leads: i32,
    initial_contacts: i32,
    deep_nurturing: i32,
    high_intents: i32,
    joined_groups: i32,
    opened_accounts: i32,
    deposited: i32,
    total_interactions: i32,
    conversions: i32,
    notes: Option<String>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct SubmitReportResponse {
    pub id: Uuid,
    pub updated: bool,
}

#[derive(Debug, Deserialize)]
pub struct ListReportsQuery {
    pub owner_id: Uuid,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ReportsResponse {
    pub reports: Vec<DailyReport>,
}

#[derive(Debug, Serialize)]
pub struct ReportResponse {
    pub report: DailyReport,
}

#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    pub owner_id: Uuid,
    pub window_days: Option<i64>,
}

#[derive(Debug, PartialEq, Serialize)]
pub struct ReportAggregate {
    pub total_new_leads: i64,
    pub total_initial_contacts: i64,
    pub total_deep_nurturing: i64,
    pub total_high_intents: i64,
    pub total_joined_groups: i64,
    pub total_opened_accounts: i64,
    pub total_deposited: i64,
    pub total_interactions: i64,
    pub total_conversions: i64,
    /// Averages divide by the number of submitted reports, not by the
    /// window length, so sparse weeks do not dilute them. None when the
    /// window holds no reports.
    pub avg_new_leads: Option<f64>,
    pub avg_total_interactions: Option<f64>,
    pub avg_conversions: Option<f64>,
    pub total_reports: i64,
}

#[derive(Debug, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub aggregate: ReportAggregate,
    pub today_report: Option<DailyReport>,
    pub date_range: DateRange,
}

pub fn summarize(reports: &[DailyReport]) -> ReportAggregate {
    let n = reports.len() as i64;
    let sum = |f: fn(&DailyReport) -> i32| reports.iter().map(|r| f(r) as i64).sum::<i64>();

    let total_new_leads = sum(|r| r.new_leads);
    let total_interactions = sum(|r| r.total_interactions);
    let total_conversions = sum(|r| r.conversions);
    let avg = |total: i64| {
        if n == 0 {
            None
        } else {
            Some(total as f64 / n as f64)
        }
    };

    ReportAggregate {
        total_new_leads,
        total_initial_contacts: sum(|r| r.initial_contacts),
        total_deep_nurturing: sum(|r| r.deep_nurturing),
        total_high_intents: sum(|r| r.high_intents),
        total_joined_groups: sum(|r| r.joined_groups),
        total_opened_accounts: sum(|r| r.opened_accounts),
        total_deposited: sum(|r| r.deposited),
        total_interactions,
        total_conversions,
        avg_new_leads: avg(total_new_leads),
        avg_total_interactions: avg(total_interactions),
        avg_conversions: avg(total_conversions),
        total_reports: n,
    }
}

pub async fn submit_report(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SubmitReportRequest>,
) -> Result<Json<SubmitReportResponse>, ApiError> {
    let report_date = req.validate()?;

    let now = Utc::now();
    let mut conn = state.conn.get()?;

    // Read-modify-write under a row lock on the natural key; the unique
    // constraint on (owner_id, report_date) is the backstop for the
    // insert race, surfaced as a retryable error.
    let response = conn.transaction::<_, ApiError, _>(|conn| {
        let existing: Option<DailyReport> = daily_reports::table
            .filter(daily_reports::owner_id.eq(req.owner_id))
            .filter(daily_reports::report_date.eq(report_date))
            .for_update()
            .first(conn)
            .optional()?;

        let (row, updated) = plan_submission(existing, &req, report_date, now);

        if updated {
            let changes = ReportChanges {
                new_leads: row.new_leads,
                initial_contacts: row.initial_contacts,
                deep_nurturing: row.deep_nurturing,
                high_intents: row.high_intents,
                joined_groups: row.joined_groups,
                opened_accounts: row.opened_accounts,
                deposited: row.deposited,
                total_interactions: row.total_interactions,
                conversions: row.conversions,
                notes: row.notes.clone(),
                updated_at: row.updated_at,
            };
            diesel::update(daily_reports::table.find(row.id))
                .set(&changes)
                .execute(conn)?;
        } else {
            diesel::insert_into(daily_reports::table)
                .values(&row)
                .execute(conn)?;
        }

        Ok(SubmitReportResponse {
            id: row.id,
            updated,
        })
    })?;

    Ok(Json(response))
}

pub async fn get_report(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ReportResponse>, ApiError> {
    let mut conn = state.conn.get()?;

    let report: Option<DailyReport> = daily_reports::table.find(id).first(&mut conn).optional()?;
    let report = found_or_404(report, "Report")?;

    Ok(Json(ReportResponse { report }))
}

pub async fn list_reports(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListReportsQuery>,
) -> Result<Json<ReportsResponse>, ApiError> {
    let limit = query.limit.unwrap_or(30).max(0);
    let mut conn = state.conn.get()?;

    let mut q = daily_reports::table
        .filter(daily_reports::owner_id.eq(query.owner_id))
        .into_boxed();

    if let Some(start) = query.start_date {
        q = q.filter(daily_reports::report_date.ge(start));
    }
    if let Some(end) = query.end_date {
        q = q.filter(daily_reports::report_date.le(end));
    }

    let reports: Vec<DailyReport> = q
        .order(daily_reports::report_date.desc())
        .limit(limit)
        .load(&mut conn)?;

    Ok(Json(ReportsResponse { reports }))
}

pub async fn get_summary(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<SummaryResponse>, ApiError> {
    let window_days = query.window_days.unwrap_or(7);
    if window_days < 0 {
        return Err(ApiError::Validation(
            "window_days cannot be negative".to_string(),
        ));
    }

    let today = Utc::now().date_naive();
    let start = today - Duration::days(window_days);
    let mut conn = state.conn.get()?;

    let reports: Vec<DailyReport> = daily_reports::table
        .filter(daily_reports::owner_id.eq(query.owner_id))
        .filter(daily_reports::report_date.ge(start))
        .filter(daily_reports::report_date.le(today))
        .order(daily_reports::report_date.desc())
        .load(&mut conn)?;

    let today_report = reports.iter().find(|r| r.report_date == today).cloned();
    let aggregate = summarize(&reports);

    Ok(Json(SummaryResponse {
        aggregate,
        today_report,
        date_range: DateRange { start, end: today },
    }))
}

pub fn configure_reports_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/reports", get(list_reports).post(submit_report))
        .route("/api/reports/summary", get(get_summary))
        .route("/api/reports/:id", get(get_report))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(date: NaiveDate, new_leads: i32, total_interactions: i32, conversions: i32) -> DailyReport {
        let now = Utc::now();
        DailyReport {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            report_date: date,
            new_leads,
            initial_contacts: 2,
            deep_nurturing: 1,
            high_intents: 0,
            joined_groups: 0,
            opened_accounts: 0,
            deposited: 0,
            total_interactions,
            conversions,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn submission(owner_id: Uuid, date: NaiveDate, new_leads: i32) -> SubmitReportRequest {
        SubmitReportRequest {
            owner_id,
            report_date: Some(date),
            new_leads,
            initial_contacts: 0,
            deep_nurturing: 0,
            high_intents: 0,
            joined_groups: 0,
            opened_accounts: 0,
            deposited: 0,
            total_interactions: 0,
            conversions: 0,
            notes: None,
        }
    }

    #[test]
    fn averages_divide_by_submitted_reports_not_window_days() {
        // Three reports inside a 7-day window: averages use 3.
        let reports = vec![
            report(date("2026-08-20"), 5, 10, 1),
            report(date("2026-08-22"), 3, 8, 0),
            report(date("2026-08-25"), 4, 12, 2),
        ];
        let agg = summarize(&reports);
        assert_eq!(agg.total_new_leads, 12);
        assert_eq!(agg.avg_new_leads, Some(4.0));
        assert_eq!(agg.total_interactions, 30);
        assert_eq!(agg.avg_total_interactions, Some(10.0));
        assert_eq!(agg.avg_conversions, Some(1.0));
        assert_eq!(agg.total_reports, 3);
    }

    #[test]
    fn empty_window_yields_zero_totals_and_null_averages() {
        let agg = summarize(&[]);
        assert_eq!(agg.total_new_leads, 0);
        assert_eq!(agg.total_interactions, 0);
        assert_eq!(agg.avg_new_leads, None);
        assert_eq!(agg.avg_total_interactions, None);
        assert_eq!(agg.avg_conversions, None);
        assert_eq!(agg.total_reports, 0);
    }

    #[test]
    fn every_counter_is_totalled() {
        let mut r = report(date("2026-08-20"), 1, 1, 1);
        r.initial_contacts = 7;
        r.deep_nurturing = 6;
        r.high_intents = 5;
        r.joined_groups = 4;
        r.opened_accounts = 3;
        r.deposited = 2;
        let agg = summarize(&[r]);
        assert_eq!(agg.total_initial_contacts, 7);
        assert_eq!(agg.total_deep_nurturing, 6);
        assert_eq!(agg.total_high_intents, 5);
        assert_eq!(agg.total_joined_groups, 4);
        assert_eq!(agg.total_opened_accounts, 3);
        assert_eq!(agg.total_deposited, 2);
    }

    #[test]
    fn missing_report_date_is_a_validation_error() {
        let mut req = submission(Uuid::new_v4(), date("2026-08-25"), 5);
        req.report_date = None;
        assert!(matches!(req.validate(), Err(ApiError::Validation(_))));
    }

    #[test]
    fn negative_counters_are_rejected() {
        let mut req = submission(Uuid::new_v4(), date("2026-08-25"), 5);
        req.conversions = -1;
        assert!(matches!(req.validate(), Err(ApiError::Validation(_))));
    }

    #[test]
    fn resubmission_overwrites_in_place() {
        let owner = Uuid::new_v4();
        let day = date("2026-08-25");
        let t1 = Utc::now();
        let t2 = t1 + chrono::Duration::hours(2);

        let first_req = submission(owner, day, 5);
        let (first, updated) = plan_submission(None, &first_req, day, t1);
        assert!(!updated);
        assert_eq!(first.new_leads, 5);
        assert_eq!(first.created_at, t1);

        let mut second_req = submission(owner, day, 9);
        second_req.notes = Some("strong day".to_string());
        let (second, updated) = plan_submission(Some(first.clone()), &second_req, day, t2);
        assert!(updated);
        // Same row: id and created_at survive, counters and notes are
        // the second submission's, updated_at moves.
        assert_eq!(second.id, first.id);
        assert_eq!(second.created_at, first.created_at);
        assert_eq!(second.new_leads, 9);
        assert_eq!(second.notes.as_deref(), Some("strong day"));
        assert_eq!(second.updated_at, t2);
    }

    #[test]
    fn null_averages_serialize_as_json_null() {
        let value = serde_json::to_value(summarize(&[])).unwrap();
        assert!(value["avg_new_leads"].is_null());
        assert_eq!(value["total_new_leads"], 0);
    }
}
