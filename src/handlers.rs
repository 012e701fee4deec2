use crate::errors::AppError;
use crate::models::{
    DashboardQuery, DashboardResponse, DateRange, FilterCriteria, FilterOptionsResponse,
    LoadReport, Selector,
};
use crate::state::AppState;
use crate::stats::{build_dashboard, filter_options};
use crate::storage::load_snapshot;
use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{Local, NaiveDate};
use tracing::{debug, info};

pub async fn health() -> &'static str {
    "ok"
}

pub async fn get_dashboard(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<DashboardResponse>, AppError> {
    let today = match non_blank(query.today.as_deref()) {
        Some(value) => parse_day("today", value)?,
        None => Local::now().date_naive(),
    };
    let criteria = criteria_from_query(&query)?;
    debug!(?criteria, %today, "dashboard query");

    let snapshot = state.snapshot().await;
    Ok(Json(build_dashboard(&snapshot, &criteria, today)))
}

pub async fn get_filters(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> Json<FilterOptionsResponse> {
    let manager = Selector::parse(query.manager.as_deref());
    let snapshot = state.snapshot().await;
    Json(filter_options(&snapshot, &manager))
}

pub async fn reload(State(state): State<AppState>) -> Result<Json<LoadReport>, AppError> {
    let (records, report) = load_snapshot(&state.data_path).await?;
    state.replace(records).await;
    info!("snapshot replaced with {} records", report.loaded_rows);
    Ok(Json(report))
}

pub fn criteria_from_query(query: &DashboardQuery) -> Result<FilterCriteria, AppError> {
    let start = non_blank(query.start.as_deref())
        .map(|v| parse_day("start", v))
        .transpose()?;
    let end = non_blank(query.end.as_deref())
        .map(|v| parse_day("end", v))
        .transpose()?;
    let last_n_days = non_blank(query.last_n_days.as_deref())
        .map(|v| {
            v.parse::<u32>().map_err(|_| {
                AppError::bad_request("last_n_days must be a non-negative integer")
            })
        })
        .transpose()?;

    Ok(FilterCriteria {
        date_range: DateRange {
            start,
            end,
            last_n_days,
        },
        client: Selector::parse(query.client.as_deref()),
        manager: Selector::parse(query.manager.as_deref()),
    })
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_day(field: &str, value: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| AppError::bad_request(format!("{field} must be a YYYY-MM-DD date")))
}
