/*!
 * Shuttle dispatcher.
 *
 * A shuttle operates in one of three modes (pick, put, inventory). The
 * dispatcher resolves the operation record for the active mode, claims the
 * device session, and drives the protocol driver when the operator requests
 * a tray. Switching mode never implicitly releases a held device session;
 * callers release explicitly.
 */
use std::fmt;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tracing::info;

use vlift_core::config::DeviceConfig;
use vlift_core::types::Id;
use vlift_hardware::driver::{Command, CommandKind, CommandOutcome, DriverRegistry};
use vlift_hardware::session::{SessionGuard, SessionManager};
use vlift_hardware::transport::{ConnectOptions, Endpoint};
use vlift_hardware::tray::{Tray, TrayCell};

use crate::error::Result;
use crate::operation::{Operation, OperationRegistry};

/// Operating mode of a shuttle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShuttleMode {
    /// Goods leave the shuttle
    Pick,
    /// Goods enter the shuttle
    Put,
    /// Stock counting on shuttle trays
    Inventory,
}

impl ShuttleMode {
    /// The hardware command kind for this mode
    pub fn command_kind(&self) -> CommandKind {
        match self {
            ShuttleMode::Pick => CommandKind::Pick,
            ShuttleMode::Put => CommandKind::Put,
            ShuttleMode::Inventory => CommandKind::Inventory,
        }
    }

    /// Convert to string
    pub fn as_str(&self) -> &'static str {
        match self {
            ShuttleMode::Pick => "pick",
            ShuttleMode::Put => "put",
            ShuttleMode::Inventory => "inventory",
        }
    }
}

impl fmt::Display for ShuttleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A vertical lift shuttle and its dispatcher state
#[derive(Debug)]
pub struct Shuttle {
    device: DeviceConfig,
    mode: RwLock<ShuttleMode>,
    drivers: Arc<DriverRegistry>,
    sessions: Arc<SessionManager>,
    operations: Arc<OperationRegistry>,
    options: ConnectOptions,
}

impl Shuttle {
    /// Create a shuttle over its device configuration
    ///
    /// New shuttles start in pick mode.
    pub fn new(
        device: DeviceConfig,
        drivers: Arc<DriverRegistry>,
        sessions: Arc<SessionManager>,
        operations: Arc<OperationRegistry>,
        options: ConnectOptions,
    ) -> Self {
        Self {
            device,
            mode: RwLock::new(ShuttleMode::Pick),
            drivers,
            sessions,
            operations,
            options,
        }
    }

    /// The stable shuttle key (also the hardware address field)
    pub fn id(&self) -> &Id {
        &self.device.id
    }

    /// The device configuration this shuttle talks through
    pub fn device(&self) -> &DeviceConfig {
        &self.device
    }

    /// The active mode
    pub fn mode(&self) -> ShuttleMode {
        match self.mode.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Whether the shuttle's device is currently held by a session
    pub fn is_busy(&self) -> bool {
        self.sessions.is_busy(&self.device.id)
    }

    /// Switch to pick mode and open the pick screen
    pub fn switch_pick(&self) -> Arc<Operation> {
        self.switch_to(ShuttleMode::Pick)
    }

    /// Switch to put mode and open the put screen
    pub fn switch_put(&self) -> Arc<Operation> {
        self.switch_to(ShuttleMode::Put)
    }

    /// Switch to inventory mode and open the inventory screen
    pub fn switch_inventory(&self) -> Arc<Operation> {
        self.switch_to(ShuttleMode::Inventory)
    }

    fn switch_to(&self, mode: ShuttleMode) -> Arc<Operation> {
        {
            let mut current = match self.mode.write() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            *current = mode;
        }
        info!(shuttle = %self.device.id, mode = %mode, "mode switched");
        self.open_screen()
    }

    /// Resolve the operation for the active mode and (re)open its screen
    pub fn open_screen(&self) -> Arc<Operation> {
        let operation = self.operations.resolve(&self.device.id, self.mode());
        operation.on_screen_open();
        operation
    }

    /// Resolve the operation for the active mode without resetting it
    pub fn operation(&self) -> Arc<Operation> {
        self.operations.resolve(&self.device.id, self.mode())
    }

    /// Ask the hardware to fetch/open a tray, optionally pointing at a cell
    ///
    /// Claims the device session for the duration of the exchange (the
    /// session is released on every exit path) and sends the
    /// mode-appropriate command through the configured driver.
    pub async fn open_tray(&self, tray: &Tray, cell: Option<&TrayCell>) -> Result<CommandOutcome> {
        let driver = self.drivers.get(self.device.kind)?;
        let operation = self.operation();

        // claim first: a busy device must abort without mutating the operation
        let session = self.sessions.acquire(&self.device.id, operation.id())?;
        let _guard = SessionGuard::new(self.sessions.clone(), session);
        operation.set_target(tray.name.clone(), cell.copied());

        let mut command =
            Command::new(self.mode().command_kind(), self.device.id.as_str()).with_carrier(&tray.name);
        if let Some(cell) = cell {
            let (x, y) = tray.tray_type.cell_center(cell);
            command = command.with_cell_center(x, y);
        }

        let outcome = driver
            .send_command(&Endpoint::from_device(&self.device), &self.options, &command)
            .await?;
        Ok(outcome)
    }

    /// Send the keep-alive/menu command, which is not tied to a
    /// mode-specific operation
    ///
    /// Still claims the device session: only one command sequence may be
    /// active per device.
    pub async fn ping(&self) -> Result<CommandOutcome> {
        let driver = self.drivers.get(self.device.kind)?;
        let session = self.sessions.acquire(&self.device.id, &self.device.id)?;
        let _guard = SessionGuard::new(self.sessions.clone(), session);

        let command = Command::new(CommandKind::Ping, self.device.id.as_str());
        let outcome = driver
            .send_command(&Endpoint::from_device(&self.device), &self.options, &command)
            .await?;
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vlift_core::types::HardwareKind;
    use vlift_hardware::error::HardwareError;
    use vlift_hardware::tray::TrayType;

    fn simulation_shuttle(sessions: Arc<SessionManager>) -> Shuttle {
        let device = DeviceConfig {
            id: "SH1".into(),
            kind: HardwareKind::Simulation,
            host: String::new(),
            port: 0,
            use_tls: false,
        };
        Shuttle::new(
            device,
            Arc::new(DriverRegistry::with_builtin_drivers()),
            sessions,
            Arc::new(OperationRegistry::new()),
            ConnectOptions::default(),
        )
    }

    fn tray() -> Tray {
        Tray {
            name: "TRAY7".to_string(),
            tray_type: TrayType {
                width_per_cell: 50,
                depth_per_cell: 30,
            },
        }
    }

    #[test]
    fn test_mode_serde_names() {
        assert_eq!(serde_json::to_string(&ShuttleMode::Pick).unwrap(), "\"pick\"");
        let mode: ShuttleMode = serde_json::from_str("\"inventory\"").unwrap();
        assert_eq!(mode, ShuttleMode::Inventory);
    }

    #[test]
    fn test_mode_switch_reuses_operations() {
        let shuttle = simulation_shuttle(Arc::new(SessionManager::new()));
        assert_eq!(shuttle.mode(), ShuttleMode::Pick);

        let put = shuttle.switch_put();
        assert_eq!(shuttle.mode(), ShuttleMode::Put);
        assert_eq!(put.mode(), ShuttleMode::Put);

        let pick = shuttle.switch_pick();
        let pick_again = shuttle.switch_pick();
        assert!(Arc::ptr_eq(&pick, &pick_again));
    }

    #[test]
    fn test_mode_switch_keeps_held_sessions() {
        let sessions = Arc::new(SessionManager::new());
        let shuttle = simulation_shuttle(sessions.clone());

        sessions
            .acquire(shuttle.id(), &"line-1".into())
            .unwrap();
        shuttle.switch_inventory();
        // switching mode must not release the held session
        assert!(shuttle.is_busy());
    }

    #[tokio::test]
    async fn test_open_tray_sends_mode_command_and_releases() {
        let sessions = Arc::new(SessionManager::new());
        let shuttle = simulation_shuttle(sessions.clone());
        shuttle.switch_put();

        let outcome = shuttle.open_tray(&tray(), None).await.unwrap();
        assert!(outcome.success);
        assert_eq!(&outcome.payload[..], b"2|odoo|SH1|TRAY7||||||||\r\n");
        assert!(!shuttle.is_busy());

        // the targeted tray is recorded on the operation
        let state = shuttle.operation().state();
        assert_eq!(state.target_tray.as_deref(), Some("TRAY7"));
    }

    #[tokio::test]
    async fn test_open_tray_with_cell_carries_center() {
        let shuttle = simulation_shuttle(Arc::new(SessionManager::new()));

        let outcome = shuttle
            .open_tray(&tray(), Some(&TrayCell { posx: 3, posy: 2 }))
            .await
            .unwrap();
        assert_eq!(&outcome.payload[..], b"1|odoo|SH1|TRAY7||125|45||||||\r\n");
    }

    #[tokio::test]
    async fn test_open_tray_fails_softly_when_device_held() {
        let sessions = Arc::new(SessionManager::new());
        let shuttle = simulation_shuttle(sessions.clone());

        sessions.acquire(shuttle.id(), &"someone-else".into()).unwrap();
        let result = shuttle.open_tray(&tray(), None).await;
        assert!(matches!(
            result,
            Err(crate::error::Error::Hardware(HardwareError::AlreadyLocked(_)))
        ));
        // the loser must not have cleared the winner's session
        assert!(shuttle.is_busy());
        // and must not have touched the operation's target state
        assert!(shuttle.operation().state().target_tray.is_none());
    }

    #[tokio::test]
    async fn test_ping_uses_idle_code() {
        let shuttle = simulation_shuttle(Arc::new(SessionManager::new()));
        let outcome = shuttle.ping().await.unwrap();
        assert_eq!(&outcome.payload[..], b"61|odoo|SH1|||||||||\r\n");
        assert!(!shuttle.is_busy());
    }
}
