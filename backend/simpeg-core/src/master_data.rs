// src/master_data.rs
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::info;

use crate::error::AppError;
use crate::models::*;
use crate::store::{Database, RecordStore, StoreCommand};
use crate::validation::{trimmed, ValidationErrors, Validator};

fn blank_to_none(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

// --- Positions ---

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionRow {
    #[serde(flatten)]
    pub position: Position,
    pub parent_name: String,
    pub unit_name: String,
}

pub fn list_positions(db: &Database) -> Vec<PositionRow> {
    db.positions
        .iter()
        .map(|p| PositionRow {
            position: p.clone(),
            parent_name: p
                .parent_position_id
                .as_deref()
                .and_then(|id| db.position(id))
                .map(|parent| parent.name.clone())
                .unwrap_or_else(|| NO_PARENT.to_string()),
            unit_name: db.unit_name(&p.unit_id),
        })
        .collect()
}

/// Submitted position fields. On edit, absent fields keep their value and an
/// empty `parentPositionId` clears the parent.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionForm {
    pub name: Option<String>,
    pub level: Option<String>,
    pub parent_position_id: Option<String>,
    pub unit_id: Option<String>,
    pub description: Option<String>,
}

impl PositionForm {
    fn overlay_on(self, current: &Position) -> PositionForm {
        PositionForm {
            name: self.name.or_else(|| Some(current.name.clone())),
            level: self.level.or_else(|| Some(current.level.clone())),
            parent_position_id: self
                .parent_position_id
                .or_else(|| current.parent_position_id.clone()),
            unit_id: self.unit_id.or_else(|| Some(current.unit_id.clone())),
            description: self.description.or_else(|| Some(current.description.clone())),
        }
    }

    /// The parent is only checked when it differs from `stored_parent`.
    fn into_position(
        self,
        id: String,
        positions: &[Position],
        stored_parent: Option<&str>,
    ) -> Result<Position, ValidationErrors> {
        let mut v = Validator::new();
        v.require_text("name", &self.name);
        v.require_text("level", &self.level);
        v.require_text("unitId", &self.unit_id);

        let parent = blank_to_none(self.parent_position_id);
        let changed = parent.as_deref() != stored_parent;
        if let Some(parent_id) = parent.as_ref().filter(|_| changed) {
            if *parent_id == id {
                v.add("parentPositionId", "cannot be the position itself");
            } else if !positions.iter().any(|p| p.id == *parent_id) {
                v.add("parentPositionId", "does not reference an existing position");
            } else if ancestors_include(positions, parent_id, &id) {
                v.add("parentPositionId", "would create a loop in the hierarchy");
            }
        }
        v.finish()?;

        Ok(Position {
            id,
            name: trimmed(self.name),
            level: trimmed(self.level),
            parent_position_id: parent,
            unit_id: trimmed(self.unit_id),
            description: self.description.unwrap_or_default(),
        })
    }
}

/// Whether walking up from `start` reaches `target`. Stops at loops already
/// present in the data.
fn ancestors_include(positions: &[Position], start: &str, target: &str) -> bool {
    let mut seen = HashSet::new();
    let mut current = Some(start.to_string());
    while let Some(id) = current {
        if id == target {
            return true;
        }
        if !seen.insert(id.clone()) {
            return false;
        }
        current = positions
            .iter()
            .find(|p| p.id == id)
            .and_then(|p| p.parent_position_id.clone());
    }
    false
}

pub fn add_position(store: &mut RecordStore, form: PositionForm) -> Result<Position, AppError> {
    let db = store.read();
    let id = store
        .clock()
        .generate_id("p", db.positions.iter().map(|p| p.id.as_str()));
    let position = form.into_position(id, &db.positions, None)?;

    let mut positions = db.positions.clone();
    positions.push(position.clone());
    store.replace(StoreCommand::ReplacePositions(positions))?;
    info!("Added position {} ({})", position.id, position.name);
    Ok(position)
}

pub fn edit_position(store: &mut RecordStore, id: &str, form: PositionForm) -> Result<Position, AppError> {
    let db = store.read();
    let current = db
        .position(id)
        .ok_or_else(|| AppError::not_found("Position", id))?;
    let updated = form.overlay_on(current).into_position(
        id.to_string(),
        &db.positions,
        current.parent_position_id.as_deref(),
    )?;

    let positions = db
        .positions
        .iter()
        .map(|p| if p.id == id { updated.clone() } else { p.clone() })
        .collect();
    store.replace(StoreCommand::ReplacePositions(positions))?;
    info!("Updated position {}", id);
    Ok(updated)
}

/// Employees and child positions that referenced it keep the dangling ID.
pub fn delete_position(store: &mut RecordStore, id: &str) -> Result<(), AppError> {
    let db = store.read();
    if db.position(id).is_none() {
        return Err(AppError::not_found("Position", id));
    }
    let positions = db.positions.iter().filter(|p| p.id != id).cloned().collect();
    store.replace(StoreCommand::ReplacePositions(positions))?;
    info!("Deleted position {}", id);
    Ok(())
}

// --- Units ---

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitRow {
    #[serde(flatten)]
    pub unit: Unit,
    pub head_name: String,
}

pub fn list_units(db: &Database) -> Vec<UnitRow> {
    db.units
        .iter()
        .map(|u| UnitRow {
            unit: u.clone(),
            head_name: db.employee_name(&u.head_id),
        })
        .collect()
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitForm {
    pub name: Option<String>,
    pub code: Option<String>,
    pub description: Option<String>,
    pub head_id: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub status: Option<UnitStatus>,
}

impl UnitForm {
    fn overlay_on(self, current: &Unit) -> UnitForm {
        UnitForm {
            name: self.name.or_else(|| Some(current.name.clone())),
            code: self.code.or_else(|| Some(current.code.clone())),
            description: self.description.or_else(|| Some(current.description.clone())),
            head_id: self.head_id.or_else(|| Some(current.head_id.clone())),
            phone: self.phone.or_else(|| Some(current.phone.clone())),
            email: self.email.or_else(|| Some(current.email.clone())),
            address: self.address.or_else(|| Some(current.address.clone())),
            status: self.status.or(Some(current.status)),
        }
    }

    fn into_unit(self, id: String) -> Result<Unit, ValidationErrors> {
        let mut v = Validator::new();
        v.require_text("name", &self.name);
        v.require_text("code", &self.code);
        v.require_text("headId", &self.head_id);
        v.finish()?;

        Ok(Unit {
            id,
            name: trimmed(self.name),
            code: trimmed(self.code),
            description: self.description.unwrap_or_default(),
            head_id: trimmed(self.head_id),
            phone: trimmed(self.phone),
            email: trimmed(self.email),
            address: self.address.unwrap_or_default(),
            // New units start active
            status: self.status.unwrap_or(UnitStatus::Aktif),
        })
    }
}

pub fn add_unit(store: &mut RecordStore, form: UnitForm) -> Result<Unit, AppError> {
    let db = store.read();
    let id = store
        .clock()
        .generate_id("u", db.units.iter().map(|u| u.id.as_str()));
    let unit = form.into_unit(id)?;

    let mut units = db.units.clone();
    units.push(unit.clone());
    store.replace(StoreCommand::ReplaceUnits(units))?;
    info!("Added unit {} ({})", unit.id, unit.name);
    Ok(unit)
}

pub fn edit_unit(store: &mut RecordStore, id: &str, form: UnitForm) -> Result<Unit, AppError> {
    let db = store.read();
    let current = db.unit(id).ok_or_else(|| AppError::not_found("Unit", id))?;
    let updated = form.overlay_on(current).into_unit(id.to_string())?;

    let units = db
        .units
        .iter()
        .map(|u| if u.id == id { updated.clone() } else { u.clone() })
        .collect();
    store.replace(StoreCommand::ReplaceUnits(units))?;
    info!("Updated unit {}", id);
    Ok(updated)
}

pub fn delete_unit(store: &mut RecordStore, id: &str) -> Result<(), AppError> {
    let db = store.read();
    if db.unit(id).is_none() {
        return Err(AppError::not_found("Unit", id));
    }
    let units = db.units.iter().filter(|u| u.id != id).cloned().collect();
    store.replace(StoreCommand::ReplaceUnits(units))?;
    info!("Deleted unit {}", id);
    Ok(())
}

// --- Pangkats ---

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PangkatForm {
    pub name: Option<String>,
}

fn pangkat_from_form(id: String, form: PangkatForm) -> Result<Pangkat, ValidationErrors> {
    let mut v = Validator::new();
    v.require_text("name", &form.name);
    v.finish()?;
    Ok(Pangkat {
        id,
        name: trimmed(form.name),
    })
}

pub fn add_pangkat(store: &mut RecordStore, form: PangkatForm) -> Result<Pangkat, AppError> {
    let db = store.read();
    let id = store
        .clock()
        .generate_id("g", db.pangkats.iter().map(|g| g.id.as_str()));
    let pangkat = pangkat_from_form(id, form)?;

    let mut pangkats = db.pangkats.clone();
    pangkats.push(pangkat.clone());
    store.replace(StoreCommand::ReplacePangkats(pangkats))?;
    info!("Added pangkat {} ({})", pangkat.id, pangkat.name);
    Ok(pangkat)
}

pub fn edit_pangkat(store: &mut RecordStore, id: &str, form: PangkatForm) -> Result<Pangkat, AppError> {
    let db = store.read();
    if !db.pangkats.iter().any(|g| g.id == id) {
        return Err(AppError::not_found("Pangkat", id));
    }
    let updated = pangkat_from_form(id.to_string(), form)?;

    let pangkats = db
        .pangkats
        .iter()
        .map(|g| if g.id == id { updated.clone() } else { g.clone() })
        .collect();
    store.replace(StoreCommand::ReplacePangkats(pangkats))?;
    info!("Updated pangkat {}", id);
    Ok(updated)
}

pub fn delete_pangkat(store: &mut RecordStore, id: &str) -> Result<(), AppError> {
    let db = store.read();
    if !db.pangkats.iter().any(|g| g.id == id) {
        return Err(AppError::not_found("Pangkat", id));
    }
    let pangkats = db.pangkats.iter().filter(|g| g.id != id).cloned().collect();
    store.replace(StoreCommand::ReplacePangkats(pangkats))?;
    info!("Deleted pangkat {}", id);
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

    fn field_error(err: AppError, field: &str) -> bool {
        matches!(err, AppError::Validation(ref e) if e.has_field(field))
    }

    #[test]
    fn position_list_resolves_parent_and_unit_placeholders() {
        let mut store = open_store();
        delete_unit(&mut store, "u2").unwrap();
        delete_position(&mut store, "p1").unwrap();

        let rows = list_positions(store.read());
        let p2 = rows.iter().find(|r| r.position.id == "p2").unwrap();
        assert_eq!(p2.parent_name, NO_PARENT);
        assert_eq!(p2.unit_name, "Teknik");
        let p4 = rows.iter().find(|r| r.position.id == "p4").unwrap();
        assert_eq!(p4.unit_name, NOT_AVAILABLE);

        let p3 = rows.iter().find(|r| r.position.id == "p3").unwrap();
        assert_eq!(p3.parent_name, "Manajer Teknik");
    }

    #[test]
    fn add_position_requires_name_level_and_unit() {
        let mut store = open_store();
        let err = add_position(&mut store, PositionForm::default()).unwrap_err();
        match err {
            AppError::Validation(e) => {
                assert!(e.has_field("name") && e.has_field("level") && e.has_field("unitId"));
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let added = add_position(
            &mut store,
            PositionForm {
                name: Some("Staff Humas".into()),
                level: Some("Staff".into()),
                parent_position_id: Some(String::new()),
                unit_id: Some("u3".into()),
                description: None,
            },
        )
        .unwrap();
        assert!(added.id.starts_with("p_"));
        assert!(added.parent_position_id.is_none());
        assert_eq!(store.read().positions.len(), 6);
    }

    #[test]
    fn position_cannot_become_its_own_ancestor() {
        let mut store = open_store();

        let self_parent = edit_position(
            &mut store,
            "p2",
            PositionForm {
                parent_position_id: Some("p2".into()),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(field_error(self_parent, "parentPositionId"));

        // p3 sits under p2, so p2 under p3 would close a loop
        let loop_edit = edit_position(
            &mut store,
            "p2",
            PositionForm {
                parent_position_id: Some("p3".into()),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(field_error(loop_edit, "parentPositionId"));
        assert_eq!(
            store.read().position("p2").unwrap().parent_position_id.as_deref(),
            Some("p1")
        );
    }

    #[test]
    fn edit_position_can_move_and_clear_parent() {
        let mut store = open_store();
        let moved = edit_position(
            &mut store,
            "p3",
            PositionForm {
                parent_position_id: Some("p1".into()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(moved.parent_position_id.as_deref(), Some("p1"));
        assert_eq!(moved.name, "Staff IT");

        let cleared = edit_position(
            &mut store,
            "p3",
            PositionForm {
                parent_position_id: Some(String::new()),
                ..Default::default()
            },
        )
        .unwrap();
        assert!(cleared.parent_position_id.is_none());
    }

    #[test]
    fn dangling_parent_does_not_block_other_edits() {
        let mut store = open_store();
        delete_position(&mut store, "p2").unwrap();

        let renamed = edit_position(
            &mut store,
            "p3",
            PositionForm {
                name: Some("Staff IT Senior".into()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(renamed.name, "Staff IT Senior");
        assert_eq!(renamed.parent_position_id.as_deref(), Some("p2"));

        // Pointing at another missing position is still rejected
        let err = edit_position(
            &mut store,
            "p3",
            PositionForm {
                parent_position_id: Some("p9".into()),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(field_error(err, "parentPositionId"));
    }

    #[test]
    fn stored_parent_loop_does_not_block_other_edits() {
        let mut store = open_store();
        let mut positions = store.read().positions.clone();
        for p in positions.iter_mut() {
            if p.id == "p1" {
                p.parent_position_id = Some("p2".into());
            }
        }
        store.replace(StoreCommand::ReplacePositions(positions)).unwrap();

        let edited = edit_position(
            &mut store,
            "p1",
            PositionForm {
                description: Some("Pimpinan".into()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(edited.description, "Pimpinan");
    }

    #[test]
    fn unit_head_name_falls_back_when_employee_is_gone() {
        let mut store = open_store();
        let db = store.read().clone();
        let employees = db.employees.into_iter().filter(|e| e.id != "e2").collect();
        store.replace(StoreCommand::ReplaceEmployees(employees)).unwrap();

        let rows = list_units(store.read());
        assert_eq!(rows[0].head_name, "Budi Santoso");
        assert_eq!(rows[1].head_name, NOT_AVAILABLE);
    }

    #[test]
    fn unit_crud_round_trip() {
        let mut store = open_store();
        let unit = add_unit(
            &mut store,
            UnitForm {
                name: Some("Perencanaan".into()),
                code: Some("REN".into()),
                head_id: Some("e2".into()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(unit.status, UnitStatus::Aktif);

        let edited = edit_unit(
            &mut store,
            &unit.id,
            UnitForm {
                status: Some(UnitStatus::NonAktif),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(edited.code, "REN");
        assert_eq!(edited.status, UnitStatus::NonAktif);

        delete_unit(&mut store, &unit.id).unwrap();
        assert!(store.read().unit(&unit.id).is_none());
        assert!(matches!(
            delete_unit(&mut store, &unit.id),
            Err(AppError::NotFound { .. })
        ));
    }

    #[test]
    fn unit_requires_code_and_head() {
        let mut store = open_store();
        let err = add_unit(
            &mut store,
            UnitForm {
                name: Some("Perencanaan".into()),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(matches!(&err, AppError::Validation(e) if e.has_field("code") && e.has_field("headId")));
    }

    #[test]
    fn pangkat_crud() {
        let mut store = open_store();
        let added = add_pangkat(
            &mut store,
            PangkatForm {
                name: Some("Golongan IV/a".into()),
            },
        )
        .unwrap();
        let renamed = edit_pangkat(
            &mut store,
            &added.id,
            PangkatForm {
                name: Some("Golongan IV/b".into()),
            },
        )
        .unwrap();
        assert_eq!(renamed.name, "Golongan IV/b");

        let blank = edit_pangkat(&mut store, &added.id, PangkatForm { name: Some(" ".into()) });
        assert!(matches!(blank, Err(AppError::Validation(_))));

        delete_pangkat(&mut store, "g1").unwrap();
        let names: Vec<&str> = store.read().pangkats.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["Golongan II/a", "Golongan III/a", "Golongan IV/b"]);
    }
}
