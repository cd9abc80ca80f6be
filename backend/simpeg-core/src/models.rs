// src/models.rs
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

// Placeholders shown instead of a dangling reference
pub const NOT_AVAILABLE: &str = "N/A";
pub const NO_PARENT: &str = "-";
pub const VACANT_POSITION: &str = "Jabatan Kosong";
pub const EMPLOYEE_NOT_FOUND: &str = "Pegawai Tidak Ditemukan";

pub const PENSION_AGE_YEARS: i32 = 65;

// --- Enumerations ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EmploymentStatus {
    Tetap,
    Kontrak,
    Harian,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EmployeeStatus {
    Aktif,
    #[serde(rename = "Tidak Aktif")]
    TidakAktif,
    Pensiun,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    #[serde(rename = "Laki-laki")]
    LakiLaki,
    Perempuan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitStatus {
    Aktif,
    #[serde(rename = "Non Aktif")]
    NonAktif,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "admin" => Some(Role::Admin),
            "user" => Some(Role::User),
            _ => None,
        }
    }
}

/// Attendance state for one employee on one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PresenceStatus {
    Hadir,
    Sakit,
    Izin,
    Cuti,
    Alpha,
}

impl PresenceStatus {
    /// Display and report column order.
    pub const ALL: [PresenceStatus; 5] = [
        PresenceStatus::Hadir,
        PresenceStatus::Sakit,
        PresenceStatus::Izin,
        PresenceStatus::Cuti,
        PresenceStatus::Alpha,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            PresenceStatus::Hadir => "Hadir",
            PresenceStatus::Sakit => "Sakit",
            PresenceStatus::Izin => "Izin",
            PresenceStatus::Cuti => "Cuti",
            PresenceStatus::Alpha => "Alpha",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CutiStatus {
    Pending,
    Disetujui,
    Ditolak,
}

// --- Employee and embedded history ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Education {
    #[serde(default)]
    pub id: String,
    pub level: String,
    pub institution: String,
    #[serde(default)]
    pub major: String,
    pub year: String,
    #[serde(default)]
    pub ijazah_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkHistory {
    #[serde(default)]
    pub id: String,
    pub company: String,
    pub position: String,
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankHistory {
    #[serde(default)]
    pub id: String,
    pub rank: String,
    pub tmt: String,
    pub sk_number: String,
    #[serde(default)]
    pub sk_document_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CareerHistory {
    #[serde(default)]
    pub id: String,
    pub position: String,
    pub unit: String,
    pub tmt: String,
    #[serde(default)]
    pub sk_document: String,
    #[serde(default)]
    pub sk_document_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub file_url: String,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: String,
    pub nik: String,
    pub name: String,
    #[serde(default)]
    pub photo_url: String,
    pub position_id: String,
    pub unit_id: String,
    pub employment_status: EmploymentStatus,
    pub status: EmployeeStatus,
    pub birth_place: String,
    pub birth_date: NaiveDate,
    pub gender: Gender,
    #[serde(default)]
    pub last_education: String,
    pub email: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub phone: String,
    pub tmt: NaiveDate,
    #[serde(default)]
    pub pension_date: Option<NaiveDate>,
    #[serde(default)]
    pub education_history: Vec<Education>,
    #[serde(default)]
    pub work_history: Vec<WorkHistory>,
    #[serde(default)]
    pub rank_history: Vec<RankHistory>,
    #[serde(default)]
    pub career_history: Vec<CareerHistory>,
    #[serde(default)]
    pub documents: Vec<Document>,
}

/// Birth date plus the pension age. A 29 February birthday lands on 1 March
/// when the pension year is not a leap year.
pub fn pension_date_for(birth_date: NaiveDate) -> Option<NaiveDate> {
    let year = birth_date.year() + PENSION_AGE_YEARS;
    birth_date
        .with_year(year)
        .or_else(|| NaiveDate::from_ymd_opt(year, 3, 1))
}

// --- Organization ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub id: String,
    pub name: String,
    pub level: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_position_id: Option<String>,
    pub unit_id: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    pub id: String,
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub description: String,
    pub head_id: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub address: String,
    pub status: UnitStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pangkat {
    pub id: String,
    pub name: String,
}

// --- Accounts ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Admin {
    pub id: String,
    pub username: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub employee_id: String,
    pub email: String,
    pub role: Role,
}

// --- Attendance and leave ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Presence {
    pub id: String,
    pub employee_id: String,
    pub date: NaiveDate,
    pub status: PresenceStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CutiRequest {
    pub id: String,
    pub employee_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub reason: String,
    pub status: CutiStatus,
}
