// src/leave.rs
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::AppError;
use crate::models::*;
use crate::store::{Database, RecordStore, StoreCommand};
use crate::validation::{required, Validator};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveForm {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub reason: Option<String>,
}

/// Files a pending leave request for the employee.
pub fn submit_leave(store: &mut RecordStore, employee_id: &str, form: LeaveForm) -> Result<CutiRequest, AppError> {
    let mut v = Validator::new();
    v.require("startDate", &form.start_date);
    v.require("endDate", &form.end_date);
    v.require_text("reason", &form.reason);
    if let (Some(start), Some(end)) = (form.start_date, form.end_date) {
        v.check("endDate", start <= end, "must not be before startDate");
    }
    v.finish()?;

    let db = store.read();
    if db.employee(employee_id).is_none() {
        return Err(AppError::not_found("Employee", employee_id));
    }
    let request = CutiRequest {
        id: store
            .clock()
            .generate_id("c", db.cuti_requests.iter().map(|c| c.id.as_str())),
        employee_id: employee_id.to_string(),
        start_date: required(form.start_date, "startDate")?,
        end_date: required(form.end_date, "endDate")?,
        reason: form.reason.unwrap_or_default().trim().to_string(),
        status: CutiStatus::Pending,
    };

    let mut requests = db.cuti_requests.clone();
    requests.push(request.clone());
    store.replace(StoreCommand::ReplaceCutiRequests(requests))?;
    info!(
        "Leave request {} filed by {} ({} to {})",
        request.id, employee_id, request.start_date, request.end_date
    );
    Ok(request)
}

/// The employee's own requests, newest start date first.
pub fn own_leave(db: &Database, employee_id: &str) -> Vec<CutiRequest> {
    let mut requests: Vec<CutiRequest> = db
        .cuti_requests
        .iter()
        .filter(|c| c.employee_id == employee_id)
        .cloned()
        .collect();
    requests.sort_by(|a, b| b.start_date.cmp(&a.start_date));
    requests
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveRow {
    #[serde(flatten)]
    pub request: CutiRequest,
    pub employee_name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeaveQuery {
    pub status: Option<CutiStatus>,
}

pub fn list_leave(db: &Database, query: &LeaveQuery) -> Vec<LeaveRow> {
    db.cuti_requests
        .iter()
        .filter(|c| query.status.map_or(true, |s| c.status == s))
        .map(|c| LeaveRow {
            request: c.clone(),
            employee_name: db
                .employee(&c.employee_id)
                .map(|e| e.name.clone())
                .unwrap_or_else(|| EMPLOYEE_NOT_FOUND.to_string()),
        })
        .collect()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeaveDecision {
    pub status: Option<CutiStatus>,
}

/// Approves or rejects a request.
pub fn decide_leave(store: &mut RecordStore, id: &str, decision: LeaveDecision) -> Result<CutiRequest, AppError> {
    let mut v = Validator::new();
    v.require("status", &decision.status);
    v.check(
        "status",
        decision.status != Some(CutiStatus::Pending),
        "must be Disetujui or Ditolak",
    );
    v.finish()?;
    let status = required(decision.status, "status")?;

    let mut requests = store.read().cuti_requests.clone();
    let request = requests
        .iter_mut()
        .find(|c| c.id == id)
        .ok_or_else(|| AppError::not_found("Leave request", id))?;
    request.status = status;
    let decided = request.clone();

    store.replace(StoreCommand::ReplaceCutiRequests(requests))?;
    info!("Leave request {} set to {:?}", id, status);
    Ok(decided)
}
