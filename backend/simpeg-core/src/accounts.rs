// src/accounts.rs
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::AppError;
use crate::models::*;
use crate::store::{Database, RecordStore, StoreCommand};
use crate::validation::{ValidationErrors, Validator};

/// One row of the combined login list. Admins are identified by username,
/// users by email.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginAccount {
    pub id: String,
    pub identifier: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee_name: Option<String>,
}

pub fn list_accounts(db: &Database) -> Vec<LoginAccount> {
    let admins = db.admins.iter().map(|a| LoginAccount {
        id: a.id.clone(),
        identifier: a.username.clone(),
        role: Role::Admin,
        employee_name: None,
    });
    let users = db.users.iter().map(|u| LoginAccount {
        id: u.id.clone(),
        identifier: u.email.clone(),
        role: Role::User,
        employee_name: Some(
            db.employee(&u.employee_id)
                .map(|e| e.name.clone())
                .unwrap_or_else(|| EMPLOYEE_NOT_FOUND.to_string()),
        ),
    });
    admins.chain(users).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeOption {
    pub id: String,
    pub name: String,
    pub nik: String,
}

/// Employees that have no user account yet.
pub fn available_employees(db: &Database) -> Vec<EmployeeOption> {
    db.employees
        .iter()
        .filter(|e| !db.users.iter().any(|u| u.employee_id == e.id))
        .map(|e| EmployeeOption {
            id: e.id.clone(),
            name: e.name.clone(),
            nik: e.nik.clone(),
        })
        .collect()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum NewAccount {
    Admin {
        username: Option<String>,
    },
    User {
        #[serde(rename = "employeeId")]
        employee_id: Option<String>,
    },
}

pub fn add_account(store: &mut RecordStore, request: NewAccount) -> Result<LoginAccount, AppError> {
    let clock = store.clock().clone();
    let db = store.read();

    match request {
        NewAccount::Admin { username } => {
            let username = require_value("username", username)?;
            if db.admins.iter().any(|a| a.username == username) {
                return Err(AppError::Conflict(format!("Admin '{}' already exists", username)));
            }
            let admin = Admin {
                id: clock.generate_id("a", db.admins.iter().map(|a| a.id.as_str())),
                username,
                role: Role::Admin,
            };
            let mut admins = db.admins.clone();
            admins.push(admin.clone());
            store.replace(StoreCommand::ReplaceAdmins(admins))?;
            info!("Added admin account {} ({})", admin.id, admin.username);
            Ok(LoginAccount {
                id: admin.id,
                identifier: admin.username,
                role: Role::Admin,
                employee_name: None,
            })
        }
        NewAccount::User { employee_id } => {
            let employee_id = require_value("employeeId", employee_id)?;
            let employee = db
                .employee(&employee_id)
                .ok_or_else(|| AppError::not_found("Employee", &employee_id))?;
            if db.users.iter().any(|u| u.employee_id == employee_id) {
                return Err(AppError::Conflict(format!(
                    "Employee {} already has a login account",
                    employee_id
                )));
            }
            let user = User {
                id: clock.generate_id("usr", db.users.iter().map(|u| u.id.as_str())),
                employee_id: employee_id.clone(),
                email: employee.email.clone(),
                role: Role::User,
            };
            let employee_name = employee.name.clone();
            let mut users = db.users.clone();
            users.push(user.clone());
            store.replace(StoreCommand::ReplaceUsers(users))?;
            info!("Added user account {} for employee {}", user.id, employee_id);
            Ok(LoginAccount {
                id: user.id,
                identifier: user.email,
                role: Role::User,
                employee_name: Some(employee_name),
            })
        }
    }
}

fn require_value(field: &str, value: Option<String>) -> Result<String, ValidationErrors> {
    let value = value.map(|v| v.trim().to_string());
    let mut v = Validator::new();
    v.require_text(field, &value);
    v.finish()?;
    Ok(value.unwrap_or_default())
}

pub fn delete_account(store: &mut RecordStore, role: Role, id: &str) -> Result<(), AppError> {
    let db = store.read();
    match role {
        Role::Admin => {
            if !db.admins.iter().any(|a| a.id == id) {
                return Err(AppError::not_found("Admin account", id));
            }
            let admins = db.admins.iter().filter(|a| a.id != id).cloned().collect();
            store.replace(StoreCommand::ReplaceAdmins(admins))?;
        }
        Role::User => {
            if !db.users.iter().any(|u| u.id == id) {
                return Err(AppError::not_found("User account", id));
            }
            let users = db.users.iter().filter(|u| u.id != id).cloned().collect();
            store.replace(StoreCommand::ReplaceUsers(users))?;
        }
    }
    info!("Deleted {} account {}", role.as_str(), id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::Clock;
    use crate::storage::MemoryStorage;
    use std::sync::Arc;

    fn open_store() -> RecordStore {
        RecordStore::open(
            Arc::new(MemoryStorage::new()),
            Clock::fixed("2024-05-20 09:00:00").unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn combined_list_puts_admins_first_and_flags_orphans() {
        let mut store = open_store();
        let employees = store
            .read()
            .employees
            .iter()
            .filter(|e| e.id != "e2")
            .cloned()
            .collect();
        store.replace(StoreCommand::ReplaceEmployees(employees)).unwrap();

        let accounts = list_accounts(store.read());
        assert_eq!(accounts.len(), 3);
        assert_eq!(accounts[0].identifier, "admin");
        assert_eq!(accounts[0].role, Role::Admin);
        assert_eq!(accounts[1].employee_name.as_deref(), Some("Budi Santoso"));
        assert_eq!(accounts[2].employee_name.as_deref(), Some(EMPLOYEE_NOT_FOUND));
    }

    #[test]
    fn available_employees_excludes_those_with_accounts() {
        let mut store = open_store();
        assert!(available_employees(store.read()).is_empty());

        delete_account(&mut store, Role::User, "usr2").unwrap();
        let available = available_employees(store.read());
        assert_eq!(available.len(), 1);
        assert_eq!(available[0].id, "e2");
    }

    #[test]
    fn user_account_copies_employee_email() {
        let mut store = open_store();
        delete_account(&mut store, Role::User, "usr1").unwrap();

        let account = add_account(
            &mut store,
            NewAccount::User {
                employee_id: Some("e1".into()),
            },
        )
        .unwrap();
        assert_eq!(account.identifier, "budi.santoso@example.com");
        assert!(account.id.starts_with("usr_"));
    }

    #[test]
    fn second_account_for_same_employee_conflicts() {
        let mut store = open_store();
        let err = add_account(
            &mut store,
            NewAccount::User {
                employee_id: Some("e1".into()),
            },
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(store.read().users.len(), 2);
    }

    #[test]
    fn unknown_employee_and_blank_username_are_rejected() {
        let mut store = open_store();
        let unknown = add_account(
            &mut store,
            NewAccount::User {
                employee_id: Some("e404".into()),
            },
        );
        assert!(matches!(unknown, Err(AppError::NotFound { .. })));

        let blank = add_account(&mut store, NewAccount::Admin { username: Some("  ".into()) });
        assert!(matches!(blank, Err(AppError::Validation(_))));
    }

    #[test]
    fn admin_accounts_can_be_added_and_removed() {
        let mut store = open_store();
        let account = add_account(
            &mut store,
            NewAccount::Admin {
                username: Some("operator".into()),
            },
        )
        .unwrap();
        assert_eq!(store.read().admins.len(), 2);

        delete_account(&mut store, Role::Admin, &account.id).unwrap();
        assert_eq!(store.read().admins.len(), 1);
        assert!(matches!(
            delete_account(&mut store, Role::Admin, &account.id),
            Err(AppError::NotFound { .. })
        ));
    }

    #[test]
    fn new_account_request_parses_role_tag() {
        let admin: NewAccount = serde_json::from_str(r#"{"role":"admin","username":"op"}"#).unwrap();
        assert!(matches!(admin, NewAccount::Admin { username: Some(ref u) } if u == "op"));

        let user: NewAccount = serde_json::from_str(r#"{"role":"user","employeeId":"e1"}"#).unwrap();
        assert!(matches!(user, NewAccount::User { employee_id: Some(ref id) } if id == "e1"));
    }
}
