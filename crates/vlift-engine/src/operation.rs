/*!
 * Per-shuttle, per-mode operation records.
 *
 * An operation is the working record behind one task screen (pick, put or
 * inventory) of one shuttle. Exactly one instance exists per
 * (shuttle, mode) pair; it is created lazily on first use and reused
 * across repeated screen opens.
 */
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use vlift_core::types::Id;
use vlift_hardware::tray::TrayCell;

use crate::shuttle::ShuttleMode;

/// Transient scan/target state of an operation
#[derive(Debug, Clone, Default)]
pub struct OperationState {
    /// The last barcode routed to this operation
    pub last_barcode: Option<String>,
    /// The tray currently targeted, if any
    pub target_tray: Option<String>,
    /// The cell currently targeted within the tray, if any
    pub target_cell: Option<TrayCell>,
}

/// The working record of one (shuttle, mode) task screen
#[derive(Debug)]
pub struct Operation {
    id: Id,
    shuttle_id: Id,
    mode: ShuttleMode,
    state: Mutex<OperationState>,
}

impl Operation {
    fn new(shuttle_id: Id, mode: ShuttleMode) -> Self {
        Self {
            id: Id::new(),
            shuttle_id,
            mode,
            state: Mutex::new(OperationState::default()),
        }
    }

    /// The operation's own identifier (used as session holder)
    pub fn id(&self) -> &Id {
        &self.id
    }

    /// The shuttle this operation belongs to
    pub fn shuttle_id(&self) -> &Id {
        &self.shuttle_id
    }

    /// The mode this operation serves
    pub fn mode(&self) -> ShuttleMode {
        self.mode
    }

    fn lock_state(&self) -> MutexGuard<'_, OperationState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Reset transient state when the task screen is (re)opened
    pub fn on_screen_open(&self) {
        let mut state = self.lock_state();
        *state = OperationState::default();
    }

    /// Record a scanned barcode on this operation
    pub fn on_barcode_scanned(&self, barcode: &str) {
        debug!(operation = %self.id, mode = %self.mode, barcode, "barcode scanned");
        self.lock_state().last_barcode = Some(barcode.to_string());
    }

    /// Record the tray (and optionally cell) this operation targets
    pub fn set_target<S: Into<String>>(&self, tray: S, cell: Option<TrayCell>) {
        let mut state = self.lock_state();
        state.target_tray = Some(tray.into());
        state.target_cell = cell;
    }

    /// Snapshot of the transient state
    pub fn state(&self) -> OperationState {
        self.lock_state().clone()
    }
}

/// Registry resolving the unique operation per (shuttle, mode)
///
/// Resolution and creation happen under one lock, so concurrent first
/// access cannot create duplicates.
#[derive(Debug, Default)]
pub struct OperationRegistry {
    operations: Mutex<HashMap<(Id, ShuttleMode), Arc<Operation>>>,
}

impl OperationRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the operation for (shuttle, mode), creating it on first use
    pub fn resolve(&self, shuttle_id: &Id, mode: ShuttleMode) -> Arc<Operation> {
        let mut operations = match self.operations.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        operations
            .entry((shuttle_id.clone(), mode))
            .or_insert_with(|| {
                debug!(shuttle = %shuttle_id, mode = %mode, "creating operation record");
                Arc::new(Operation::new(shuttle_id.clone(), mode))
            })
            .clone()
    }

    /// Number of materialized operations
    pub fn count(&self) -> usize {
        match self.operations.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }
}

/// Route a scanned barcode to the active record
///
/// The caller passes the record that is active in its context; an absent
/// record makes the scan a no-op, not a failure.
pub fn route_barcode(target: Option<&Operation>, barcode: &str) {
    match target {
        Some(operation) => operation.on_barcode_scanned(barcode),
        None => debug!(barcode, "no active record for scanned barcode"),
    }
}
