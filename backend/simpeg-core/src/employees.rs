// src/employees.rs
use chrono::NaiveDate;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::info;

use crate::error::AppError;
use crate::models::*;
use crate::store::{Database, RecordStore, StoreCommand};
use crate::validation::{is_valid_email, is_valid_nik, required, trimmed, ValidationErrors, Validator};

// --- Listing ---

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeQuery {
    pub search: Option<String>,
    pub unit_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeRow {
    pub id: String,
    pub nik: String,
    pub name: String,
    pub photo_url: String,
    pub position_id: String,
    pub position_name: String,
    pub unit_id: String,
    pub unit_name: String,
    pub employment_status: EmploymentStatus,
    pub status: EmployeeStatus,
}

/// Employees matching the search term (name or position name, case-insensitive;
/// NIK as a substring) and the unit filter.
pub fn list_employees(db: &Database, query: &EmployeeQuery) -> Vec<EmployeeRow> {
    let term = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let unit = query.unit_id.as_deref().filter(|s| !s.is_empty());

    db.employees
        .iter()
        .filter(|e| match term {
            Some(term) => {
                let lower = term.to_lowercase();
                e.name.to_lowercase().contains(&lower)
                    || e.nik.contains(term)
                    || db
                        .position(&e.position_id)
                        .map_or(false, |p| p.name.to_lowercase().contains(&lower))
            }
            None => true,
        })
        .filter(|e| unit.map_or(true, |u| e.unit_id == u))
        .map(|e| EmployeeRow {
            id: e.id.clone(),
            nik: e.nik.clone(),
            name: e.name.clone(),
            photo_url: e.photo_url.clone(),
            position_id: e.position_id.clone(),
            position_name: db.position_name(&e.position_id),
            unit_id: e.unit_id.clone(),
            unit_name: db.unit_name(&e.unit_id),
            employment_status: e.employment_status,
            status: e.status,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeDetail {
    #[serde(flatten)]
    pub employee: Employee,
    pub position_name: String,
    pub unit_name: String,
}

pub fn employee_detail(db: &Database, id: &str) -> Result<EmployeeDetail, AppError> {
    let employee = db
        .employee(id)
        .ok_or_else(|| AppError::not_found("Employee", id))?;
    Ok(EmployeeDetail {
        employee: employee.clone(),
        position_name: db.position_name(&employee.position_id),
        unit_name: db.unit_name(&employee.unit_id),
    })
}

// --- Add / edit / delete ---

/// Submitted employee fields. Absent fields keep their current value on edit.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeForm {
    pub nik: Option<String>,
    pub name: Option<String>,
    pub photo_url: Option<String>,
    pub position_id: Option<String>,
    pub unit_id: Option<String>,
    pub employment_status: Option<EmploymentStatus>,
    pub status: Option<EmployeeStatus>,
    pub birth_place: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub last_education: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub tmt: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy)]
struct FormatChecks {
    nik: bool,
    email: bool,
}

impl FormatChecks {
    const ALL: FormatChecks = FormatChecks { nik: true, email: true };

    /// Stored values are taken as they are; only submitted ones are checked.
    fn for_patch(patch: &EmployeeForm) -> Self {
        Self {
            nik: patch.nik.is_some(),
            email: patch.email.is_some(),
        }
    }
}

struct ValidEmployee {
    nik: String,
    name: String,
    photo_url: Option<String>,
    position_id: String,
    unit_id: String,
    employment_status: EmploymentStatus,
    status: EmployeeStatus,
    birth_place: String,
    birth_date: NaiveDate,
    gender: Gender,
    last_education: String,
    email: String,
    address: String,
    phone: String,
    tmt: NaiveDate,
}

impl EmployeeForm {
    fn from_employee(e: &Employee) -> Self {
        Self {
            nik: Some(e.nik.clone()),
            name: Some(e.name.clone()),
            photo_url: Some(e.photo_url.clone()),
            position_id: Some(e.position_id.clone()),
            unit_id: Some(e.unit_id.clone()),
            employment_status: Some(e.employment_status),
            status: Some(e.status),
            birth_place: Some(e.birth_place.clone()),
            birth_date: Some(e.birth_date),
            gender: Some(e.gender),
            last_education: Some(e.last_education.clone()),
            email: Some(e.email.clone()),
            address: Some(e.address.clone()),
            phone: Some(e.phone.clone()),
            tmt: Some(e.tmt),
        }
    }

    /// Fields present in `patch` win.
    fn overlay(self, patch: EmployeeForm) -> Self {
        Self {
            nik: patch.nik.or(self.nik),
            name: patch.name.or(self.name),
            photo_url: patch.photo_url.or(self.photo_url),
            position_id: patch.position_id.or(self.position_id),
            unit_id: patch.unit_id.or(self.unit_id),
            employment_status: patch.employment_status.or(self.employment_status),
            status: patch.status.or(self.status),
            birth_place: patch.birth_place.or(self.birth_place),
            birth_date: patch.birth_date.or(self.birth_date),
            gender: patch.gender.or(self.gender),
            last_education: patch.last_education.or(self.last_education),
            email: patch.email.or(self.email),
            address: patch.address.or(self.address),
            phone: patch.phone.or(self.phone),
            tmt: patch.tmt.or(self.tmt),
        }
    }

    /// `formats` says which of NIK and email get the strict format checks.
    fn validate(self, formats: FormatChecks) -> Result<ValidEmployee, ValidationErrors> {
        let mut v = Validator::new();
        v.require_text("name", &self.name);
        v.require_text("nik", &self.nik);
        v.require_text("email", &self.email);
        v.require_text("positionId", &self.position_id);
        v.require_text("unitId", &self.unit_id);
        v.require("tmt", &self.tmt);
        v.require("employmentStatus", &self.employment_status);
        v.require("status", &self.status);
        v.require_text("birthPlace", &self.birth_place);
        v.require("birthDate", &self.birth_date);
        v.require("gender", &self.gender);
        if let Some(nik) = self.nik.as_deref().map(str::trim).filter(|s| formats.nik && !s.is_empty()) {
            v.check("nik", is_valid_nik(nik), "must be 16 digits");
        }
        if let Some(email) = self.email.as_deref().map(str::trim).filter(|s| formats.email && !s.is_empty()) {
            v.check("email", is_valid_email(email), "is not a valid email address");
        }
        v.finish()?;

        Ok(ValidEmployee {
            nik: trimmed(self.nik),
            name: trimmed(self.name),
            photo_url: self.photo_url.map(|p| p.trim().to_string()).filter(|p| !p.is_empty()),
            position_id: trimmed(self.position_id),
            unit_id: trimmed(self.unit_id),
            employment_status: required(self.employment_status, "employmentStatus")?,
            status: required(self.status, "status")?,
            birth_place: trimmed(self.birth_place),
            birth_date: required(self.birth_date, "birthDate")?,
            gender: required(self.gender, "gender")?,
            last_education: trimmed(self.last_education),
            email: trimmed(self.email),
            address: trimmed(self.address),
            phone: trimmed(self.phone),
            tmt: required(self.tmt, "tmt")?,
        })
    }
}

impl ValidEmployee {
    fn apply_to(self, e: &mut Employee) {
        e.nik = self.nik;
        e.name = self.name;
        if let Some(photo) = self.photo_url {
            e.photo_url = photo;
        }
        e.position_id = self.position_id;
        e.unit_id = self.unit_id;
        e.employment_status = self.employment_status;
        e.status = self.status;
        e.birth_place = self.birth_place;
        e.birth_date = self.birth_date;
        e.gender = self.gender;
        e.last_education = self.last_education;
        e.email = self.email;
        e.address = self.address;
        e.phone = self.phone;
        e.tmt = self.tmt;
        e.pension_date = pension_date_for(self.birth_date);
    }
}

/// Adds an employee together with a login account for them, in one write.
pub fn add_employee(store: &mut RecordStore, form: EmployeeForm) -> Result<EmployeeDetail, AppError> {
    let valid = form.validate(FormatChecks::ALL)?;
    let clock = store.clock().clone();
    let db = store.read();

    let id = clock.generate_id("e", db.employees.iter().map(|e| e.id.as_str()));
    let mut employee = Employee {
        id: id.clone(),
        nik: String::new(),
        name: String::new(),
        photo_url: format!("https://picsum.photos/seed/{}/200/200", clock.now_millis()),
        position_id: String::new(),
        unit_id: String::new(),
        employment_status: valid.employment_status,
        status: valid.status,
        birth_place: String::new(),
        birth_date: valid.birth_date,
        gender: valid.gender,
        last_education: String::new(),
        email: String::new(),
        address: String::new(),
        phone: String::new(),
        tmt: valid.tmt,
        pension_date: None,
        education_history: Vec::new(),
        work_history: Vec::new(),
        rank_history: Vec::new(),
        career_history: Vec::new(),
        documents: Vec::new(),
    };
    valid.apply_to(&mut employee);

    let user = User {
        id: clock.generate_id("usr", db.users.iter().map(|u| u.id.as_str())),
        employee_id: id.clone(),
        email: employee.email.clone(),
        role: Role::User,
    };

    let mut employees = db.employees.clone();
    employees.push(employee);
    let mut users = db.users.clone();
    users.push(user);

    store.apply(vec![
        StoreCommand::ReplaceEmployees(employees),
        StoreCommand::ReplaceUsers(users),
    ])?;
    info!("Added employee {}", id);
    employee_detail(store.read(), &id)
}

pub fn edit_employee(store: &mut RecordStore, id: &str, patch: EmployeeForm) -> Result<EmployeeDetail, AppError> {
    let db = store.read();
    let current = db
        .employee(id)
        .ok_or_else(|| AppError::not_found("Employee", id))?;
    let formats = FormatChecks::for_patch(&patch);
    let valid = EmployeeForm::from_employee(current).overlay(patch).validate(formats)?;

    let mut employees = db.employees.clone();
    if let Some(e) = employees.iter_mut().find(|e| e.id == id) {
        valid.apply_to(e);
    }
    store.replace(StoreCommand::ReplaceEmployees(employees))?;
    info!("Updated employee {}", id);
    employee_detail(store.read(), id)
}

/// Removes the employee and every login account linked to them.
pub fn delete_employee(store: &mut RecordStore, id: &str) -> Result<(), AppError> {
    let db = store.read();
    if db.employee(id).is_none() {
        return Err(AppError::not_found("Employee", id));
    }
    let employees = db.employees.iter().filter(|e| e.id != id).cloned().collect();
    let users: Vec<User> = db.users.iter().filter(|u| u.employee_id != id).cloned().collect();
    let removed_users = db.users.len() - users.len();

    store.apply(vec![
        StoreCommand::ReplaceEmployees(employees),
        StoreCommand::ReplaceUsers(users),
    ])?;
    info!("Deleted employee {} and {} linked account(s)", id, removed_users);
    Ok(())
}

// --- Embedded history ---

/// A list embedded in an employee record, edited one item at a time.
pub trait HistoryRecord: Clone + Serialize + DeserializeOwned + Send + 'static {
    const KIND: &'static str;
    const ID_PREFIX: &'static str;

    fn id(&self) -> &str;
    fn set_id(&mut self, id: String);
    fn validate(&self) -> Result<(), ValidationErrors>;
    fn items(employee: &Employee) -> &[Self];
    fn items_mut(employee: &mut Employee) -> &mut Vec<Self>;
}

fn require_all(fields: &[(&str, &str)]) -> Result<(), ValidationErrors> {
    let mut v = Validator::new();
    for (field, value) in fields {
        v.check(field, !value.trim().is_empty(), "is required");
    }
    v.finish()
}

impl HistoryRecord for Education {
    const KIND: &'static str = "education";
    const ID_PREFIX: &'static str = "edu";

    fn id(&self) -> &str {
        &self.id
    }
    fn set_id(&mut self, id: String) {
        self.id = id;
    }
    fn validate(&self) -> Result<(), ValidationErrors> {
        require_all(&[
            ("level", &self.level),
            ("institution", &self.institution),
            ("major", &self.major),
            ("year", &self.year),
        ])
    }
    fn items(employee: &Employee) -> &[Self] {
        &employee.education_history
    }
    fn items_mut(employee: &mut Employee) -> &mut Vec<Self> {
        &mut employee.education_history
    }
}

impl HistoryRecord for WorkHistory {
    const KIND: &'static str = "work";
    const ID_PREFIX: &'static str = "work";

    fn id(&self) -> &str {
        &self.id
    }
    fn set_id(&mut self, id: String) {
        self.id = id;
    }
    fn validate(&self) -> Result<(), ValidationErrors> {
        require_all(&[
            ("company", &self.company),
            ("position", &self.position),
            ("startDate", &self.start_date),
            ("endDate", &self.end_date),
        ])
    }
    fn items(employee: &Employee) -> &[Self] {
        &employee.work_history
    }
    fn items_mut(employee: &mut Employee) -> &mut Vec<Self> {
        &mut employee.work_history
    }
}

impl HistoryRecord for RankHistory {
    const KIND: &'static str = "rank";
    const ID_PREFIX: &'static str = "rank";

    fn id(&self) -> &str {
        &self.id
    }
    fn set_id(&mut self, id: String) {
        self.id = id;
    }
    fn validate(&self) -> Result<(), ValidationErrors> {
        require_all(&[
            ("rank", &self.rank),
            ("tmt", &self.tmt),
            ("skNumber", &self.sk_number),
        ])
    }
    fn items(employee: &Employee) -> &[Self] {
        &employee.rank_history
    }
    fn items_mut(employee: &mut Employee) -> &mut Vec<Self> {
        &mut employee.rank_history
    }
}

impl HistoryRecord for CareerHistory {
    const KIND: &'static str = "career";
    const ID_PREFIX: &'static str = "career";

    fn id(&self) -> &str {
        &self.id
    }
    fn set_id(&mut self, id: String) {
        self.id = id;
    }
    fn validate(&self) -> Result<(), ValidationErrors> {
        require_all(&[
            ("position", &self.position),
            ("unit", &self.unit),
            ("tmt", &self.tmt),
            ("skDocument", &self.sk_document),
        ])
    }
    fn items(employee: &Employee) -> &[Self] {
        &employee.career_history
    }
    fn items_mut(employee: &mut Employee) -> &mut Vec<Self> {
        &mut employee.career_history
    }
}

impl HistoryRecord for Document {
    const KIND: &'static str = "documents";
    const ID_PREFIX: &'static str = "doc";

    fn id(&self) -> &str {
        &self.id
    }
    fn set_id(&mut self, id: String) {
        self.id = id;
    }
    fn validate(&self) -> Result<(), ValidationErrors> {
        require_all(&[("name", &self.name), ("fileUrl", &self.file_url)])
    }
    fn items(employee: &Employee) -> &[Self] {
        &employee.documents
    }
    fn items_mut(employee: &mut Employee) -> &mut Vec<Self> {
        &mut employee.documents
    }
}

/// Runs `change` on a copy of the employee's record and stores the result.
fn update_employee_record<T>(
    store: &mut RecordStore,
    employee_id: &str,
    change: impl FnOnce(&mut Employee) -> Result<T, AppError>,
) -> Result<T, AppError> {
    let mut employees = store.read().employees.clone();
    let employee = employees
        .iter_mut()
        .find(|e| e.id == employee_id)
        .ok_or_else(|| AppError::not_found("Employee", employee_id))?;
    let result = change(employee)?;
    store.replace(StoreCommand::ReplaceEmployees(employees))?;
    Ok(result)
}

pub fn add_history<R: HistoryRecord>(store: &mut RecordStore, employee_id: &str, mut record: R) -> Result<R, AppError> {
    record.validate()?;
    let clock = store.clock().clone();
    let added = update_employee_record(store, employee_id, |employee| {
        let id = clock.generate_id(R::ID_PREFIX, R::items(employee).iter().map(|r| r.id()));
        record.set_id(id);
        R::items_mut(employee).push(record.clone());
        Ok(record)
    })?;
    info!("Added {} entry {} for employee {}", R::KIND, added.id(), employee_id);
    Ok(added)
}

pub fn update_history<R: HistoryRecord>(
    store: &mut RecordStore,
    employee_id: &str,
    item_id: &str,
    mut record: R,
) -> Result<R, AppError> {
    record.validate()?;
    let updated = update_employee_record(store, employee_id, |employee| {
        let slot = R::items_mut(employee)
            .iter_mut()
            .find(|r| r.id() == item_id)
            .ok_or_else(|| AppError::not_found("History entry", item_id))?;
        record.set_id(item_id.to_string());
        *slot = record.clone();
        Ok(record)
    })?;
    info!("Updated {} entry {} for employee {}", R::KIND, item_id, employee_id);
    Ok(updated)
}

pub fn delete_history<R: HistoryRecord>(store: &mut RecordStore, employee_id: &str, item_id: &str) -> Result<(), AppError> {
    update_employee_record(store, employee_id, |employee| {
        let items = R::items_mut(employee);
        let before = items.len();
        items.retain(|r| r.id() != item_id);
        if items.len() == before {
            return Err(AppError::not_found("History entry", item_id));
        }
        Ok(())
    })?;
    info!("Deleted {} entry {} for employee {}", R::KIND, item_id, employee_id);
    Ok(())
}
