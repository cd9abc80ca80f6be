// src/api.rs
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::accounts::{self, NewAccount};
use crate::attendance::{self, MonthPeriod};
use crate::config::AppConfig;
use crate::dashboard;
use crate::employees::{self, EmployeeForm, EmployeeQuery, HistoryRecord};
use crate::error::AppError;
use crate::leave::{self, LeaveDecision, LeaveForm, LeaveQuery};
use crate::master_data::{self, PangkatForm, PositionForm, UnitForm};
use crate::models::*;
use crate::org_tree::build_org_chart;
use crate::session::{AdminSession, UserSession};
use crate::store::{RecordStore, StoreCommand};

// --- State ---

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Mutex<RecordStore>>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(store: RecordStore, config: AppConfig) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            config: Arc::new(config),
        }
    }
}

// --- Routes ---

pub fn router(state: AppState) -> Router {
    let admin_routes = Router::new()
        .route("/dashboard", get(handle_admin_dashboard))
        .route("/employees", get(handle_list_employees).post(handle_add_employee))
        .route(
            "/employees/{id}",
            get(handle_employee_detail)
                .put(handle_edit_employee)
                .delete(handle_delete_employee),
        )
        .route("/employees/{id}/education", post(handle_add_history::<Education>))
        .route(
            "/employees/{id}/education/{item}",
            put(handle_update_history::<Education>).delete(handle_delete_history::<Education>),
        )
        .route("/employees/{id}/work", post(handle_add_history::<WorkHistory>))
        .route(
            "/employees/{id}/work/{item}",
            put(handle_update_history::<WorkHistory>).delete(handle_delete_history::<WorkHistory>),
        )
        .route("/employees/{id}/rank", post(handle_add_history::<RankHistory>))
        .route(
            "/employees/{id}/rank/{item}",
            put(handle_update_history::<RankHistory>).delete(handle_delete_history::<RankHistory>),
        )
        .route("/employees/{id}/career", post(handle_add_history::<CareerHistory>))
        .route(
            "/employees/{id}/career/{item}",
            put(handle_update_history::<CareerHistory>).delete(handle_delete_history::<CareerHistory>),
        )
        // Documents are add/delete only
        .route("/employees/{id}/documents", post(handle_add_history::<Document>))
        .route(
            "/employees/{id}/documents/{item}",
            delete(handle_delete_history::<Document>),
        )
        .route("/positions", get(handle_list_positions).post(handle_add_position))
        .route(
            "/positions/{id}",
            put(handle_edit_position).delete(handle_delete_position),
        )
        .route("/units", get(handle_list_units).post(handle_add_unit))
        .route("/units/{id}", put(handle_edit_unit).delete(handle_delete_unit))
        .route("/pangkats", get(handle_list_pangkats).post(handle_add_pangkat))
        .route(
            "/pangkats/{id}",
            put(handle_edit_pangkat).delete(handle_delete_pangkat),
        )
        .route("/org-chart", get(handle_org_chart))
        .route("/presences", get(handle_daily_roster).put(handle_record_presence))
        .route("/presences/report", get(handle_monthly_report))
        .route("/presences/report.csv", get(handle_monthly_report_csv))
        .route("/accounts", get(handle_list_accounts).post(handle_add_account))
        .route("/accounts/available-employees", get(handle_available_employees))
        .route("/accounts/{role}/{id}", delete(handle_delete_account))
        .route("/leave", get(handle_list_leave))
        .route("/leave/{id}", put(handle_decide_leave));

    let user_routes = Router::new()
        .route("/dashboard", get(handle_user_dashboard))
        .route("/profile", get(handle_user_profile))
        .route("/presences", get(handle_own_presences))
        .route("/leave", get(handle_own_leave).post(handle_submit_leave));

    Router::new()
        .route("/health", get(handle_health))
        .nest("/api/admin", admin_routes)
        .nest("/api/me", user_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn handle_health(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "tls": state.config.tls_paths().is_some(),
    }))
}

// --- Admin: dashboard and employees ---

async fn handle_admin_dashboard(_admin: AdminSession, State(state): State<AppState>) -> impl IntoResponse {
    let store = state.store.lock().await;
    Json(dashboard::admin_dashboard(store.read(), store.clock().today()))
}

async fn handle_list_employees(
    _admin: AdminSession,
    State(state): State<AppState>,
    Query(query): Query<EmployeeQuery>,
) -> impl IntoResponse {
    let store = state.store.lock().await;
    Json(employees::list_employees(store.read(), &query))
}

async fn handle_employee_detail(
    _admin: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let store = state.store.lock().await;
    Ok(Json(employees::employee_detail(store.read(), &id)?))
}

async fn handle_add_employee(
    _admin: AdminSession,
    State(state): State<AppState>,
    Json(form): Json<EmployeeForm>,
) -> Result<impl IntoResponse, AppError> {
    let mut store = state.store.lock().await;
    let detail = employees::add_employee(&mut store, form)?;
    Ok((StatusCode::CREATED, Json(detail)))
}

async fn handle_edit_employee(
    _admin: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(form): Json<EmployeeForm>,
) -> Result<impl IntoResponse, AppError> {
    let mut store = state.store.lock().await;
    Ok(Json(employees::edit_employee(&mut store, &id, form)?))
}

async fn handle_delete_employee(
    _admin: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let mut store = state.store.lock().await;
    employees::delete_employee(&mut store, &id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn handle_add_history<R: HistoryRecord>(
    _admin: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(record): Json<R>,
) -> Result<(StatusCode, Json<R>), AppError> {
    let mut store = state.store.lock().await;
    let added = employees::add_history(&mut store, &id, record)?;
    Ok((StatusCode::CREATED, Json(added)))
}

async fn handle_update_history<R: HistoryRecord>(
    _admin: AdminSession,
    State(state): State<AppState>,
    Path((id, item)): Path<(String, String)>,
    Json(record): Json<R>,
) -> Result<Json<R>, AppError> {
    let mut store = state.store.lock().await;
    Ok(Json(employees::update_history(&mut store, &id, &item, record)?))
}

async fn handle_delete_history<R: HistoryRecord>(
    _admin: AdminSession,
    State(state): State<AppState>,
    Path((id, item)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    let mut store = state.store.lock().await;
    employees::delete_history::<R>(&mut store, &id, &item)?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Admin: master data ---

async fn handle_list_positions(_admin: AdminSession, State(state): State<AppState>) -> impl IntoResponse {
    let store = state.store.lock().await;
    Json(master_data::list_positions(store.read()))
}

async fn handle_add_position(
    _admin: AdminSession,
    State(state): State<AppState>,
    Json(form): Json<PositionForm>,
) -> Result<impl IntoResponse, AppError> {
    let mut store = state.store.lock().await;
    let position = master_data::add_position(&mut store, form)?;
    Ok((StatusCode::CREATED, Json(position)))
}

async fn handle_edit_position(
    _admin: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(form): Json<PositionForm>,
) -> Result<impl IntoResponse, AppError> {
    let mut store = state.store.lock().await;
    Ok(Json(master_data::edit_position(&mut store, &id, form)?))
}

async fn handle_delete_position(
    _admin: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let mut store = state.store.lock().await;
    master_data::delete_position(&mut store, &id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn handle_list_units(_admin: AdminSession, State(state): State<AppState>) -> impl IntoResponse {
    let store = state.store.lock().await;
    Json(master_data::list_units(store.read()))
}

async fn handle_add_unit(
    _admin: AdminSession,
    State(state): State<AppState>,
    Json(form): Json<UnitForm>,
) -> Result<impl IntoResponse, AppError> {
    let mut store = state.store.lock().await;
    let unit = master_data::add_unit(&mut store, form)?;
    Ok((StatusCode::CREATED, Json(unit)))
}

async fn handle_edit_unit(
    _admin: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(form): Json<UnitForm>,
) -> Result<impl IntoResponse, AppError> {
    let mut store = state.store.lock().await;
    Ok(Json(master_data::edit_unit(&mut store, &id, form)?))
}

async fn handle_delete_unit(
    _admin: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let mut store = state.store.lock().await;
    master_data::delete_unit(&mut store, &id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn handle_list_pangkats(_admin: AdminSession, State(state): State<AppState>) -> impl IntoResponse {
    let store = state.store.lock().await;
    Json(store.read().pangkats.clone())
}

async fn handle_add_pangkat(
    _admin: AdminSession,
    State(state): State<AppState>,
    Json(form): Json<PangkatForm>,
) -> Result<impl IntoResponse, AppError> {
    let mut store = state.store.lock().await;
    let pangkat = master_data::add_pangkat(&mut store, form)?;
    Ok((StatusCode::CREATED, Json(pangkat)))
}

async fn handle_edit_pangkat(
    _admin: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(form): Json<PangkatForm>,
) -> Result<impl IntoResponse, AppError> {
    let mut store = state.store.lock().await;
    Ok(Json(master_data::edit_pangkat(&mut store, &id, form)?))
}

async fn handle_delete_pangkat(
    _admin: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let mut store = state.store.lock().await;
    master_data::delete_pangkat(&mut store, &id)?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Admin: organization chart ---

#[derive(Debug, Deserialize)]
struct OrgChartQuery {
    format: Option<String>,
}

async fn handle_org_chart(
    _admin: AdminSession,
    State(state): State<AppState>,
    Query(query): Query<OrgChartQuery>,
) -> Response {
    let store = state.store.lock().await;
    let db = store.read();
    let chart = build_org_chart(&db.positions, &db.employees, &db.units);

    if query.format.as_deref() == Some("outline") {
        (
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            chart.render_outline(),
        )
            .into_response()
    } else {
        Json(chart.to_forest()).into_response()
    }
}

// --- Admin: attendance ---

#[derive(Debug, Deserialize)]
struct RosterQuery {
    date: Option<NaiveDate>,
    search: Option<String>,
}

async fn handle_daily_roster(
    _admin: AdminSession,
    State(state): State<AppState>,
    Query(query): Query<RosterQuery>,
) -> impl IntoResponse {
    let store = state.store.lock().await;
    let date = query.date.unwrap_or_else(|| store.clock().today());
    Json(json!({
        "date": date,
        "rows": attendance::daily_roster(store.read(), date, query.search.as_deref()),
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PresenceUpdate {
    employee_id: String,
    date: Option<NaiveDate>,
    status: PresenceStatus,
}

async fn handle_record_presence(
    _admin: AdminSession,
    State(state): State<AppState>,
    Json(update): Json<PresenceUpdate>,
) -> Result<impl IntoResponse, AppError> {
    let mut store = state.store.lock().await;
    let clock = store.clock().clone();
    let date = update.date.unwrap_or_else(|| clock.today());
    let (presences, record) =
        attendance::record_presence(store.read(), &clock, &update.employee_id, date, update.status)?;
    store.replace(StoreCommand::ReplacePresences(presences))?;
    Ok(Json(record))
}

#[derive(Debug, Deserialize)]
struct MonthQuery {
    month: Option<String>,
}

fn resolve_month(query: &MonthQuery, today: NaiveDate) -> Result<MonthPeriod, AppError> {
    match query.month.as_deref() {
        Some(month) => Ok(MonthPeriod::parse(month)?),
        None => Ok(MonthPeriod::containing(today)),
    }
}

async fn handle_monthly_report(
    _admin: AdminSession,
    State(state): State<AppState>,
    Query(query): Query<MonthQuery>,
) -> Result<impl IntoResponse, AppError> {
    let store = state.store.lock().await;
    let period = resolve_month(&query, store.clock().today())?;
    Ok(Json(json!({
        "month": period.to_string(),
        "rows": attendance::monthly_summary(store.read(), period),
    })))
}

async fn handle_monthly_report_csv(
    _admin: AdminSession,
    State(state): State<AppState>,
    Query(query): Query<MonthQuery>,
) -> Result<Response, AppError> {
    let store = state.store.lock().await;
    let period = resolve_month(&query, store.clock().today())?;
    let rows = attendance::monthly_summary(store.read(), period);
    let body = attendance::summary_csv_string(&rows)?;
    info!("Exported attendance report for {} ({} rows)", period, rows.len());

    let disposition = format!("attachment; filename=\"laporan-presensi-{}.csv\"", period);
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

// --- Admin: accounts and leave ---

async fn handle_list_accounts(_admin: AdminSession, State(state): State<AppState>) -> impl IntoResponse {
    let store = state.store.lock().await;
    Json(accounts::list_accounts(store.read()))
}

async fn handle_available_employees(_admin: AdminSession, State(state): State<AppState>) -> impl IntoResponse {
    let store = state.store.lock().await;
    Json(accounts::available_employees(store.read()))
}

async fn handle_add_account(
    _admin: AdminSession,
    State(state): State<AppState>,
    Json(request): Json<NewAccount>,
) -> Result<impl IntoResponse, AppError> {
    let mut store = state.store.lock().await;
    let account = accounts::add_account(&mut store, request)?;
    Ok((StatusCode::CREATED, Json(account)))
}

async fn handle_delete_account(
    _admin: AdminSession,
    State(state): State<AppState>,
    Path((role, id)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    let role = Role::parse(&role).ok_or_else(|| AppError::not_found("Account role", &role))?;
    let mut store = state.store.lock().await;
    accounts::delete_account(&mut store, role, &id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn handle_list_leave(
    _admin: AdminSession,
    State(state): State<AppState>,
    Query(query): Query<LeaveQuery>,
) -> impl IntoResponse {
    let store = state.store.lock().await;
    Json(leave::list_leave(store.read(), &query))
}

async fn handle_decide_leave(
    _admin: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(decision): Json<LeaveDecision>,
) -> Result<impl IntoResponse, AppError> {
    let mut store = state.store.lock().await;
    Ok(Json(leave::decide_leave(&mut store, &id, decision)?))
}

// --- Self-service portal ---

async fn handle_user_dashboard(
    UserSession(user): UserSession,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let store = state.store.lock().await;
    Ok(Json(dashboard::user_dashboard(
        store.read(),
        &user.employee_id,
        store.clock().today(),
    )?))
}

async fn handle_user_profile(
    UserSession(user): UserSession,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let store = state.store.lock().await;
    Ok(Json(employees::employee_detail(store.read(), &user.employee_id)?))
}

async fn handle_own_presences(
    UserSession(user): UserSession,
    State(state): State<AppState>,
    Query(query): Query<MonthQuery>,
) -> Result<impl IntoResponse, AppError> {
    let store = state.store.lock().await;
    let period = resolve_month(&query, store.clock().today())?;
    Ok(Json(json!({
        "month": period.to_string(),
        "records": attendance::own_presences(store.read(), &user.employee_id, period),
    })))
}

async fn handle_own_leave(UserSession(user): UserSession, State(state): State<AppState>) -> impl IntoResponse {
    let store = state.store.lock().await;
    Json(leave::own_leave(store.read(), &user.employee_id))
}

async fn handle_submit_leave(
    UserSession(user): UserSession,
    State(state): State<AppState>,
    Json(form): Json<LeaveForm>,
) -> Result<impl IntoResponse, AppError> {
    let mut store = state.store.lock().await;
    let request = leave::submit_leave(&mut store, &user.employee_id, form)?;
    Ok((StatusCode::CREATED, Json(request)))
}
