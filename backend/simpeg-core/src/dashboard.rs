// src/dashboard.rs
use chrono::NaiveDate;
use serde::Serialize;

use crate::attendance::{find_presence, month_totals, MonthPeriod, StatusCounts};
use crate::error::AppError;
use crate::models::*;
use crate::store::Database;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminDashboard {
    pub total_employees: usize,
    pub total_positions: usize,
    pub total_units: usize,
    pub pending_leave_requests: usize,
    pub month: String,
    pub attendance_this_month: StatusCounts,
}

pub fn admin_dashboard(db: &Database, today: NaiveDate) -> AdminDashboard {
    let period = MonthPeriod::containing(today);
    AdminDashboard {
        total_employees: db.employees.len(),
        total_positions: db.positions.len(),
        total_units: db.units.len(),
        pending_leave_requests: db
            .cuti_requests
            .iter()
            .filter(|c| c.status == CutiStatus::Pending)
            .count(),
        month: period.to_string(),
        attendance_this_month: month_totals(db, period),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveSummary {
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDashboard {
    pub employee: Employee,
    pub position_name: String,
    pub unit_name: String,
    pub today: NaiveDate,
    /// `None` until a presence is recorded for today.
    pub today_status: Option<PresenceStatus>,
    pub leave: LeaveSummary,
}

pub fn user_dashboard(db: &Database, employee_id: &str, today: NaiveDate) -> Result<UserDashboard, AppError> {
    let employee = db
        .employee(employee_id)
        .ok_or_else(|| AppError::not_found("Employee", employee_id))?;

    let mut leave = LeaveSummary::default();
    for request in db.cuti_requests.iter().filter(|c| c.employee_id == employee_id) {
        match request.status {
            CutiStatus::Pending => leave.pending += 1,
            CutiStatus::Disetujui => leave.approved += 1,
            CutiStatus::Ditolak => leave.rejected += 1,
        }
    }

    Ok(UserDashboard {
        employee: employee.clone(),
        position_name: db.position_name(&employee.position_id),
        unit_name: db.unit_name(&employee.unit_id),
        today,
        today_status: find_presence(db, employee_id, today).map(|p| p.status),
        leave,
    })
}
