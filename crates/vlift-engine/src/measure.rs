/*!
 * Measuring device workflow.
 *
 * A measuring device (dimension/weight scanner) must be exclusively held
 * while an operator measures a package. Selection is a two-phase protocol:
 * `select_for_measure` claims the device for a measurement line and fails
 * softly (a user-facing notice, no state change) when the line has no
 * packaging bound or the device is busy; `select_for_measure_cancel` is the
 * inverse and is idempotent.
 */
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use vlift_core::config::DeviceConfig;
use vlift_core::types::Id;
use vlift_hardware::session::SessionManager;

/// A product packaging whose dimensions are to be measured
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Packaging {
    /// Packaging key
    pub id: Id,
    /// Packaging name
    pub name: String,
    /// GTIN barcode, if known
    pub barcode: Option<String>,
    /// Maximum weight in kg
    pub max_weight: f64,
    /// Length in mm
    pub length: u32,
    /// Width in mm
    pub width: u32,
    /// Height in mm
    pub height: u32,
}

impl Packaging {
    /// Volume in cubic metres
    pub fn volume(&self) -> f64 {
        f64::from(self.length) * f64::from(self.width) * f64::from(self.height) / 1000.0_f64.powi(3)
    }
}

/// One measurement line presented to the operator
#[derive(Debug)]
pub struct MeasureLine {
    id: Id,
    qty: f64,
    packaging: Option<Packaging>,
    scan_requested: AtomicBool,
}

impl MeasureLine {
    /// Create a measurement line
    pub fn new(id: Id, qty: f64, packaging: Option<Packaging>) -> Self {
        Self {
            id,
            qty,
            packaging,
            scan_requested: AtomicBool::new(false),
        }
    }

    /// The line identifier (used as session holder)
    pub fn id(&self) -> &Id {
        &self.id
    }

    /// Quantity per packaging
    pub fn qty(&self) -> f64 {
        self.qty
    }

    /// The packaging bound to this line, if any
    pub fn packaging(&self) -> Option<&Packaging> {
        self.packaging.as_ref()
    }

    /// Whether a scan has been requested for this line
    pub fn scan_requested(&self) -> bool {
        self.scan_requested.load(Ordering::SeqCst)
    }

    fn set_scan_requested(&self, requested: bool) {
        self.scan_requested.store(requested, Ordering::SeqCst);
    }
}

/// User-facing notice for a soft selection failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    /// The line has no packaging bound
    PackagingNotSet,
    /// The device is held by another line
    DeviceInUse,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::PackagingNotSet => write!(f, "No packaging set on this line"),
            Notice::DeviceInUse => write!(f, "The measuring device is already in use"),
        }
    }
}

/// Result of a selection attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectOutcome {
    /// The device was claimed for the line
    Selected,
    /// The selection was refused; nothing changed
    Rejected(Notice),
}

impl SelectOutcome {
    /// Whether the device was claimed
    pub fn is_selected(&self) -> bool {
        matches!(self, SelectOutcome::Selected)
    }
}

/// A measuring device and its exclusive-use bookkeeping
#[derive(Debug)]
pub struct MeasuringDevice {
    device: DeviceConfig,
    sessions: Arc<SessionManager>,
}

impl MeasuringDevice {
    /// Create a measuring device over its configuration entry
    pub fn new(device: DeviceConfig, sessions: Arc<SessionManager>) -> Self {
        Self { device, sessions }
    }

    /// The stable device key
    pub fn id(&self) -> &Id {
        &self.device.id
    }

    /// Whether the device is currently assigned to a line
    pub fn is_busy(&self) -> bool {
        self.sessions.is_busy(&self.device.id)
    }

    /// The line currently assigned to the device, if any
    pub fn assigned_line(&self) -> Option<Id> {
        self.sessions.active_holder(&self.device.id)
    }

    /// Claim the device so the operator can measure the line's packaging
    ///
    /// Fails softly when the line has no packaging bound or the device is
    /// busy: the outcome carries a user-facing notice and no state is
    /// mutated. On success the line becomes the device's active assignment
    /// and its scan flag is raised; the claim is held until
    /// [`select_for_measure_cancel`](Self::select_for_measure_cancel) (the
    /// scan workflow spans several operator steps).
    pub fn select_for_measure(&self, line: &MeasureLine) -> SelectOutcome {
        if line.packaging().is_none() {
            info!(line = %line.id(), "{}", Notice::PackagingNotSet);
            return SelectOutcome::Rejected(Notice::PackagingNotSet);
        }
        if self.sessions.is_busy(&self.device.id) {
            info!(device = %self.device.id, line = %line.id(), "{}", Notice::DeviceInUse);
            return SelectOutcome::Rejected(Notice::DeviceInUse);
        }
        match self.sessions.acquire(&self.device.id, line.id()) {
            Ok(_) => {
                line.set_scan_requested(true);
                SelectOutcome::Selected
            }
            // lost a race between the busy check and the claim
            Err(_) => SelectOutcome::Rejected(Notice::DeviceInUse),
        }
    }

    /// Undo a selection: clear the line's scan flag and free the device
    ///
    /// Unconditional and idempotent, even when nothing was held.
    pub fn select_for_measure_cancel(&self, line: &MeasureLine) {
        line.set_scan_requested(false);
        self.sessions.release(&self.device.id);
    }
}
