// src/attendance.rs
use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::io::Write;
use thiserror::Error;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::models::{Presence, PresenceStatus, NOT_AVAILABLE};
use crate::store::Database;

#[derive(Error, Debug)]
pub enum AttendanceError {
    #[error("Invalid month '{0}', expected YYYY-MM")]
    InvalidMonth(String),

    #[error("Employee not found: {0}")]
    UnknownEmployee(String),

    #[error("CSV export failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error during export: {0}")]
    Io(#[from] std::io::Error),
}

// --- Month period ---

/// A calendar month, covering its first through last day inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthPeriod {
    first_day: NaiveDate,
}

impl MonthPeriod {
    /// Parses `YYYY-MM`.
    pub fn parse(value: &str) -> Result<Self, AttendanceError> {
        let invalid = || AttendanceError::InvalidMonth(value.to_string());
        let (year, month) = value.trim().split_once('-').ok_or_else(invalid)?;
        let digits = |part: &str| part.bytes().all(|c| c.is_ascii_digit());
        if year.len() != 4 || month.len() != 2 || !digits(year) || !digits(month) {
            return Err(invalid());
        }
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        let first_day = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
        Ok(Self { first_day })
    }

    pub fn containing(date: NaiveDate) -> Self {
        Self {
            first_day: date.with_day(1).unwrap_or(date),
        }
    }

    pub fn first_day(&self) -> NaiveDate {
        self.first_day
    }

    /// First day of the next month minus one day.
    pub fn last_day(&self) -> NaiveDate {
        self.first_day
            .checked_add_months(Months::new(1))
            .and_then(|next| next.pred_opt())
            .unwrap_or(NaiveDate::MAX)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.first_day() && date <= self.last_day()
    }
}

impl fmt::Display for MonthPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.first_day.year(), self.first_day.month())
    }
}

// --- Daily lookup ---

/// Recorded statuses for one day, keyed by employee ID. Employees without a
/// record are absent from the map; see [`status_on`].
pub fn daily_statuses(db: &Database, date: NaiveDate) -> HashMap<&str, PresenceStatus> {
    db.presences
        .iter()
        .filter(|p| p.date == date)
        .map(|p| (p.employee_id.as_str(), p.status))
        .collect()
}

/// Status for one employee on one day. No record reads as `Alpha`; nothing is
/// written.
pub fn status_on(db: &Database, employee_id: &str, date: NaiveDate) -> PresenceStatus {
    find_presence(db, employee_id, date)
        .map(|p| p.status)
        .unwrap_or(PresenceStatus::Alpha)
}

pub fn find_presence<'a>(db: &'a Database, employee_id: &str, date: NaiveDate) -> Option<&'a Presence> {
    db.presences
        .iter()
        .find(|p| p.employee_id == employee_id && p.date == date)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyRosterRow {
    pub employee_id: String,
    pub name: String,
    pub nik: String,
    pub photo_url: String,
    pub position_name: String,
    pub status: PresenceStatus,
    pub recorded: bool,
}

/// Every employee with their status for `date`, optionally filtered by a
/// case-insensitive name match or a NIK substring.
pub fn daily_roster(db: &Database, date: NaiveDate, search: Option<&str>) -> Vec<DailyRosterRow> {
    let statuses = daily_statuses(db, date);
    let needle = search.map(str::trim).filter(|s| !s.is_empty());

    db.employees
        .iter()
        .filter(|e| match needle {
            Some(term) => e.name.to_lowercase().contains(&term.to_lowercase()) || e.nik.contains(term),
            None => true,
        })
        .map(|e| {
            let recorded = statuses.get(e.id.as_str()).copied();
            DailyRosterRow {
                employee_id: e.id.clone(),
                name: e.name.clone(),
                nik: e.nik.clone(),
                photo_url: e.photo_url.clone(),
                position_name: db
                    .position(&e.position_id)
                    .map(|p| p.name.clone())
                    .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
                status: recorded.unwrap_or(PresenceStatus::Alpha),
                recorded: recorded.is_some(),
            }
        })
        .collect()
}

// --- Recording ---

/// Sets the status for (employee, date). An existing record is updated in
/// place; otherwise a new one is appended. Returns the full presence
/// collection to store plus the affected record.
pub fn record_presence(
    db: &Database,
    clock: &Clock,
    employee_id: &str,
    date: NaiveDate,
    status: PresenceStatus,
) -> Result<(Vec<Presence>, Presence), AttendanceError> {
    if db.employee(employee_id).is_none() {
        return Err(AttendanceError::UnknownEmployee(employee_id.to_string()));
    }

    let mut presences = db.presences.clone();
    let existing = presences
        .iter_mut()
        .find(|p| p.employee_id == employee_id && p.date == date);

    let record = match existing {
        Some(presence) => {
            debug!(
                "Updating presence {} for {} on {}: {:?} -> {:?}",
                presence.id, employee_id, date, presence.status, status
            );
            presence.status = status;
            presence.clone()
        }
        None => {
            let id = clock.generate_id("pr", db.presences.iter().map(|p| p.id.as_str()));
            let presence = Presence {
                id,
                employee_id: employee_id.to_string(),
                date,
                status,
            };
            info!("Recording presence {} for {} on {}: {:?}", presence.id, employee_id, date, status);
            presences.push(presence.clone());
            presence
        }
    };

    Ok((presences, record))
}

// --- Monthly summary ---

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    #[serde(rename = "Hadir")]
    pub hadir: u32,
    #[serde(rename = "Sakit")]
    pub sakit: u32,
    #[serde(rename = "Izin")]
    pub izin: u32,
    #[serde(rename = "Cuti")]
    pub cuti: u32,
    #[serde(rename = "Alpha")]
    pub alpha: u32,
}

impl StatusCounts {
    pub fn add(&mut self, status: PresenceStatus) {
        match status {
            PresenceStatus::Hadir => self.hadir += 1,
            PresenceStatus::Sakit => self.sakit += 1,
            PresenceStatus::Izin => self.izin += 1,
            PresenceStatus::Cuti => self.cuti += 1,
            PresenceStatus::Alpha => self.alpha += 1,
        }
    }

    pub fn get(&self, status: PresenceStatus) -> u32 {
        match status {
            PresenceStatus::Hadir => self.hadir,
            PresenceStatus::Sakit => self.sakit,
            PresenceStatus::Izin => self.izin,
            PresenceStatus::Cuti => self.cuti,
            PresenceStatus::Alpha => self.alpha,
        }
    }

    pub fn total(&self) -> u32 {
        PresenceStatus::ALL.iter().map(|s| self.get(*s)).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlySummaryRow {
    pub employee_id: String,
    pub name: String,
    #[serde(flatten)]
    pub counts: StatusCounts,
}

/// Per-employee status counts for the month, in employee order. Employees
/// with no records in the month get all-zero counts.
pub fn monthly_summary(db: &Database, period: MonthPeriod) -> Vec<MonthlySummaryRow> {
    let mut per_employee: HashMap<&str, StatusCounts> = HashMap::new();
    for presence in db.presences.iter().filter(|p| period.contains(p.date)) {
        per_employee
            .entry(presence.employee_id.as_str())
            .or_default()
            .add(presence.status);
    }

    db.employees
        .iter()
        .map(|e| MonthlySummaryRow {
            employee_id: e.id.clone(),
            name: e.name.clone(),
            counts: per_employee.get(e.id.as_str()).copied().unwrap_or_default(),
        })
        .collect()
}

/// Status counts over every record in the month, employees or not.
pub fn month_totals(db: &Database, period: MonthPeriod) -> StatusCounts {
    let mut totals = StatusCounts::default();
    for presence in db.presences.iter().filter(|p| period.contains(p.date)) {
        totals.add(presence.status);
    }
    totals
}

/// One employee's records within the month, oldest first.
pub fn own_presences(db: &Database, employee_id: &str, period: MonthPeriod) -> Vec<Presence> {
    let mut records: Vec<Presence> = db
        .presences
        .iter()
        .filter(|p| p.employee_id == employee_id && period.contains(p.date))
        .cloned()
        .collect();
    records.sort_by_key(|p| p.date);
    records
}

// --- CSV export ---

pub const CSV_HEADER: [&str; 6] = ["Nama Pegawai", "Hadir", "Sakit", "Izin", "Cuti", "Alpha"];

pub fn write_summary_csv<W: Write>(rows: &[MonthlySummaryRow], writer: W) -> Result<(), AttendanceError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(CSV_HEADER)?;
    for row in rows {
        let mut record = vec![row.name.clone()];
        record.extend(PresenceStatus::ALL.iter().map(|s| row.counts.get(*s).to_string()));
        csv_writer.write_record(&record)?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn summary_csv_string(rows: &[MonthlySummaryRow]) -> Result<String, AttendanceError> {
    let mut buffer = Vec::new();
    write_summary_csv(rows, &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}
