// src/store.rs
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::clock::Clock;
use crate::models::*;
use crate::seed::initial_data;
use crate::storage::{KeyValueStorage, StorageError};

/// Key the whole snapshot is persisted under.
pub const DB_KEY: &str = "simpegdam_db";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("JSON serialization/deserialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

// --- Snapshot ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Database {
    pub employees: Vec<Employee>,
    pub positions: Vec<Position>,
    pub units: Vec<Unit>,
    pub pangkats: Vec<Pangkat>,
    pub admins: Vec<Admin>,
    pub users: Vec<User>,
    pub cuti_requests: Vec<CutiRequest>,
    pub presences: Vec<Presence>,
}

impl Database {
    pub fn employee(&self, id: &str) -> Option<&Employee> {
        self.employees.iter().find(|e| e.id == id)
    }

    pub fn position(&self, id: &str) -> Option<&Position> {
        self.positions.iter().find(|p| p.id == id)
    }

    pub fn unit(&self, id: &str) -> Option<&Unit> {
        self.units.iter().find(|u| u.id == id)
    }

    pub fn position_name(&self, id: &str) -> String {
        self.position(id)
            .map(|p| p.name.clone())
            .unwrap_or_else(|| NOT_AVAILABLE.to_string())
    }

    pub fn unit_name(&self, id: &str) -> String {
        self.unit(id)
            .map(|u| u.name.clone())
            .unwrap_or_else(|| NOT_AVAILABLE.to_string())
    }

    pub fn employee_name(&self, id: &str) -> String {
        self.employee(id)
            .map(|e| e.name.clone())
            .unwrap_or_else(|| NOT_AVAILABLE.to_string())
    }
}

// --- Commands ---

/// Replaces one collection wholesale. Collections not named in a batch are
/// left untouched.
#[derive(Debug, Clone)]
pub enum StoreCommand {
    ReplaceEmployees(Vec<Employee>),
    ReplacePositions(Vec<Position>),
    ReplaceUnits(Vec<Unit>),
    ReplacePangkats(Vec<Pangkat>),
    ReplaceAdmins(Vec<Admin>),
    ReplaceUsers(Vec<User>),
    ReplaceCutiRequests(Vec<CutiRequest>),
    ReplacePresences(Vec<Presence>),
}

impl StoreCommand {
    pub fn collection(&self) -> &'static str {
        match self {
            StoreCommand::ReplaceEmployees(_) => "employees",
            StoreCommand::ReplacePositions(_) => "positions",
            StoreCommand::ReplaceUnits(_) => "units",
            StoreCommand::ReplacePangkats(_) => "pangkats",
            StoreCommand::ReplaceAdmins(_) => "admins",
            StoreCommand::ReplaceUsers(_) => "users",
            StoreCommand::ReplaceCutiRequests(_) => "cutiRequests",
            StoreCommand::ReplacePresences(_) => "presences",
        }
    }

    fn apply_to(self, db: &mut Database) {
        match self {
            StoreCommand::ReplaceEmployees(v) => db.employees = v,
            StoreCommand::ReplacePositions(v) => db.positions = v,
            StoreCommand::ReplaceUnits(v) => db.units = v,
            StoreCommand::ReplacePangkats(v) => db.pangkats = v,
            StoreCommand::ReplaceAdmins(v) => db.admins = v,
            StoreCommand::ReplaceUsers(v) => db.users = v,
            StoreCommand::ReplaceCutiRequests(v) => db.cuti_requests = v,
            StoreCommand::ReplacePresences(v) => db.presences = v,
        }
    }
}

// --- Loading ---

#[derive(Debug)]
pub enum LoadOutcome {
    Loaded(Database),
    Missing,
    Discarded,
}

/// Reads the persisted snapshot. A snapshot that cannot be read or parsed is
/// removed and reported as `Discarded`.
pub fn load_snapshot(storage: &dyn KeyValueStorage) -> LoadOutcome {
    let raw = match storage.get_item(DB_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return LoadOutcome::Missing,
        Err(e) => {
            warn!("Failed to read snapshot from {}: {}", storage.describe(), e);
            discard(storage);
            return LoadOutcome::Discarded;
        }
    };

    match serde_json::from_str::<Database>(&raw) {
        Ok(db) => LoadOutcome::Loaded(db),
        Err(e) => {
            warn!(
                "Failed to parse snapshot from {}: {}. Removing corrupt snapshot.",
                storage.describe(),
                e
            );
            discard(storage);
            LoadOutcome::Discarded
        }
    }
}

fn discard(storage: &dyn KeyValueStorage) {
    if let Err(remove_err) = storage.remove_item(DB_KEY) {
        error!("Failed to remove corrupt snapshot: {}", remove_err);
    }
}

// --- Store ---

pub struct RecordStore {
    db: Database,
    storage: Arc<dyn KeyValueStorage>,
    clock: Clock,
}

impl RecordStore {
    /// Loads the persisted snapshot, falling back to the seed data (which is
    /// then persisted) when none is usable.
    pub fn open(storage: Arc<dyn KeyValueStorage>, clock: Clock) -> Result<Self, StoreError> {
        let db = match load_snapshot(storage.as_ref()) {
            LoadOutcome::Loaded(db) => {
                info!(
                    "Loaded snapshot from {} ({} employees, {} positions, {} presences)",
                    storage.describe(),
                    db.employees.len(),
                    db.positions.len(),
                    db.presences.len()
                );
                db
            }
            outcome => {
                info!("No usable snapshot ({:?}); starting from seed data", outcome);
                let seed = initial_data(&clock);
                persist(storage.as_ref(), &seed)?;
                seed
            }
        };

        Ok(Self { db, storage, clock })
    }

    pub fn read(&self) -> &Database {
        &self.db
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /// Applies a batch of collection replacements and persists the resulting
    /// snapshot. If persisting fails the previous snapshot stays current.
    pub fn apply(&mut self, commands: Vec<StoreCommand>) -> Result<(), StoreError> {
        if commands.is_empty() {
            return Ok(());
        }
        let names: Vec<&'static str> = commands.iter().map(|c| c.collection()).collect();

        let mut next = self.db.clone();
        for command in commands {
            command.apply_to(&mut next);
        }

        if let Err(e) = persist(self.storage.as_ref(), &next) {
            error!("Failed to persist update of {:?}: {}", names, e);
            return Err(e);
        }
        self.db = next;
        info!("Replaced collections {:?}", names);
        Ok(())
    }

    pub fn replace(&mut self, command: StoreCommand) -> Result<(), StoreError> {
        self.apply(vec![command])
    }

    pub fn reset_to_seed(&mut self) -> Result<(), StoreError> {
        let seed = initial_data(&self.clock);
        persist(self.storage.as_ref(), &seed)?;
        self.db = seed;
        warn!("Store reset to seed data");
        Ok(())
    }
}

fn persist(storage: &dyn KeyValueStorage, db: &Database) -> Result<(), StoreError> {
    let json = serde_json::to_string(db)?;
    storage.set_item(DB_KEY, &json)?;
    Ok(())
}
