//! Variable cells and function-block instance records.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::error::RuntimeError;
use crate::value::{CellType, Value};

/// Opaque id of a function-block instance record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstanceId(pub u32);

/// One typed variable cell.
#[derive(Debug, Clone)]
pub struct Cell {
    /// Declared type, fixed at allocation.
    pub ty: CellType,
    /// Current value.
    pub value: Value,
}

/// A function-block instance record; persists between cycles.
#[derive(Debug, Clone)]
pub struct FbInstance {
    /// Dispatch key, upper-cased FB type name.
    pub fb_type: SmolStr,
    /// Instance variables (`Q`, `ET`, internal state).
    pub vars: IndexMap<SmolStr, Value>,
}

/// The runtime's variable table.
///
/// Owned by the scan loop; external readers get snapshots, external writers
/// go through the engine's command queue. A write journal records the
/// intra-tick write order for the event stream.
#[derive(Debug, Default)]
pub struct Cells {
    cells: IndexMap<SmolStr, Cell>,
    instances: Vec<FbInstance>,
    journal: Vec<(SmolStr, Value)>,
    journaling: bool,
}

impl Cells {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a cell, replacing any existing cell of the same name.
    pub fn allocate(&mut self, name: SmolStr, ty: CellType, value: Value) {
        self.cells.insert(name, Cell { ty, value });
    }

    /// Allocate a function-block instance and return its id.
    pub fn allocate_instance(&mut self, fb_type: SmolStr) -> InstanceId {
        let id = InstanceId(self.instances.len() as u32);
        let mut vars = IndexMap::new();
        vars.insert(SmolStr::new_static("Q"), Value::Bool(false));
        vars.insert(SmolStr::new_static("ET"), Value::Time(0));
        self.instances.push(FbInstance { fb_type, vars });
        id
    }

    /// Read a cell value by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.cells.get(name).map(|cell| &cell.value)
    }

    /// Declared type of a cell.
    #[must_use]
    pub fn cell_type(&self, name: &str) -> Option<&CellType> {
        self.cells.get(name).map(|cell| &cell.ty)
    }

    /// True when a cell of this name exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.cells.contains_key(name)
    }

    /// Write a value, coercing to the cell's declared type.
    pub fn set(&mut self, name: &str, value: Value) -> Result<(), RuntimeError> {
        let cell = self
            .cells
            .get_mut(name)
            .ok_or_else(|| RuntimeError::UndefinedVariable(name.into()))?;
        let coerced = cell.ty.coerce(value);
        let changed = cell.value != coerced;
        cell.value = coerced.clone();
        if self.journaling && changed {
            self.journal.push((name.into(), coerced));
        }
        Ok(())
    }

    /// Write into an array slot.
    pub fn set_element(&mut self, name: &str, index: i64, value: Value) -> Result<(), RuntimeError> {
        let cell = self
            .cells
            .get_mut(name)
            .ok_or_else(|| RuntimeError::UndefinedVariable(name.into()))?;
        let base = match &cell.ty {
            CellType::Array { base, .. } => (**base).clone(),
            _ => return Err(RuntimeError::TypeMismatch),
        };
        let Value::Array(array) = &mut cell.value else {
            return Err(RuntimeError::TypeMismatch);
        };
        let offset = array.offset(index)?;
        array.elements[offset] = base.coerce(value);
        if self.journaling {
            self.journal
                .push((name.into(), cell.value.clone()));
        }
        Ok(())
    }

    /// Access an instance record.
    #[must_use]
    pub fn instance(&self, id: InstanceId) -> Option<&FbInstance> {
        self.instances.get(id.0 as usize)
    }

    /// Mutable access to an instance record.
    pub fn instance_mut(&mut self, id: InstanceId) -> Option<&mut FbInstance> {
        self.instances.get_mut(id.0 as usize)
    }

    /// Read an instance variable.
    #[must_use]
    pub fn instance_var(&self, id: InstanceId, name: &str) -> Option<&Value> {
        self.instance(id).and_then(|fb| fb.vars.get(name))
    }

    /// Write an instance variable.
    pub fn set_instance_var(&mut self, id: InstanceId, name: &str, value: Value) {
        if let Some(fb) = self.instance_mut(id) {
            fb.vars.insert(name.into(), value);
        }
    }

    /// Iterate cell names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &SmolStr> {
        self.cells.keys()
    }

    /// Snapshot all scalar cell values (instances surface their `Q`/`ET`).
    #[must_use]
    pub fn snapshot(&self) -> IndexMap<SmolStr, Value> {
        self.cells
            .iter()
            .map(|(name, cell)| (name.clone(), cell.value.clone()))
            .collect()
    }

    /// Enable the write journal for the current tick.
    pub fn begin_journal(&mut self) {
        self.journaling = true;
        self.journal.clear();
    }

    /// Disable the journal and drain recorded writes in order.
    pub fn end_journal(&mut self) -> Vec<(SmolStr, Value)> {
        self.journaling = false;
        std::mem::take(&mut self.journal)
    }

    /// Drop every cell and instance. Used by engine reset.
    pub fn clear(&mut self) {
        self.cells.clear();
        self.instances.clear();
        self.journal.clear();
    }
}
