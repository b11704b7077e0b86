/*!
 * Protocol driver abstractions.
 *
 * A hardware driver frames the outbound payload for a command, defines how
 * to recognize that a response is complete, and validates the response
 * against the request. One driver exists per hardware family, selected
 * through the [`DriverRegistry`] by the `HardwareKind` of the target
 * device.
 */
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, warn};

use vlift_core::types::HardwareKind;

use crate::error::{HardwareError, Result};
use crate::transport::{self, ConnectOptions, Endpoint, TlsCustomizer};

/// The command sent to a vertical lift or measuring device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    /// Fetch a tray for picking
    Pick,
    /// Fetch a tray for putting goods away
    Put,
    /// Fetch a tray for inventory counting
    Inventory,
    /// Keep-alive / menu command, not tied to a mode-specific operation
    Ping,
}

impl CommandKind {
    /// Wire code of the command
    pub fn code(&self) -> &'static str {
        match self {
            CommandKind::Pick => "1",
            CommandKind::Put => "2",
            CommandKind::Inventory => "5",
            CommandKind::Ping => "61",
        }
    }
}

/// A single outbound command
///
/// Stateless, single-use value built from the active operation, the target
/// device and an optional target cell. The optional descriptive fields are
/// only rendered by vendors whose record format carries them.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    /// What the hardware should do
    pub kind: CommandKind,
    /// Shuttle (or device) address the hardware knows itself by
    pub shuttle: String,
    /// Tray to fetch / open (carrier field), empty for ping
    pub carrier: String,
    /// Centre of the target cell in mm from the tray's bottom-left,
    /// when a cell is targeted
    pub cell_center: Option<(f64, f64)>,
    /// Box type field
    pub box_type: String,
    /// Quantity field
    pub quantity: String,
    /// Order reference field
    pub order: String,
    /// Part number field
    pub part: String,
    /// Free-form description field
    pub description: String,
}

impl Command {
    /// Create a command for a shuttle with all optional fields empty
    pub fn new<S: Into<String>>(kind: CommandKind, shuttle: S) -> Self {
        Self {
            kind,
            shuttle: shuttle.into(),
            carrier: String::new(),
            cell_center: None,
            box_type: String::new(),
            quantity: String::new(),
            order: String::new(),
            part: String::new(),
            description: String::new(),
        }
    }

    /// Set the carrier (tray) field
    pub fn with_carrier<S: Into<String>>(mut self, carrier: S) -> Self {
        self.carrier = carrier.into();
        self
    }

    /// Target a cell by its centre coordinates in mm
    pub fn with_cell_center(mut self, x: f64, y: f64) -> Self {
        self.cell_center = Some((x, y));
        self
    }

    /// Set the description field
    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = description.into();
        self
    }
}

/// Result of one hardware exchange
///
/// Validation failure is not an error: the outcome keeps both byte strings
/// so the caller (and the log) can diagnose the vendor conversation.
#[derive(Debug, Clone)]
pub struct CommandOutcome {
    /// Whether the response passed protocol validation
    pub success: bool,
    /// The payload that was sent
    pub payload: Bytes,
    /// The raw response that was received
    pub response: Bytes,
}

/// A protocol driver for one hardware family
///
/// Implementations provide the framing capability set; `send_command`
/// composes it with the transport and normally keeps its default body.
#[async_trait]
pub trait HardwareDriver: Send + Sync + Debug {
    /// The hardware family this driver speaks for
    fn kind(&self) -> HardwareKind;

    /// Render the outbound payload for the command
    fn build_payload(&self, command: &Command) -> Result<Bytes>;

    /// Report whether the accumulated bytes form a complete response
    ///
    /// The default never reports completion, which makes the transport
    /// accumulate until the peer closes the connection. Vendors with
    /// fixed-length or sentinel-terminated frames override this.
    fn is_response_complete(&self, _buffer: &[u8]) -> bool {
        false
    }

    /// Check the response against the payload that was sent
    ///
    /// The default accepts any response. This is a placeholder, not
    /// load-bearing logic: a vendor driver must override it with real
    /// acknowledgement parsing to get failure reporting.
    fn validate(&self, _payload: &[u8], _response: &[u8]) -> bool {
        true
    }

    /// TLS configuration hook, e.g. to attach a client certificate
    fn customize_tls(&self) -> Option<TlsCustomizer> {
        None
    }

    /// Send one command to the device and return the outcome
    ///
    /// Composes build, connect, send (looping over partial writes),
    /// receive-until-complete and validate. The connection is released on
    /// every exit path. Within one call the send happens strictly before
    /// the receive; there is no pipelining.
    async fn send_command(
        &self,
        endpoint: &Endpoint,
        options: &ConnectOptions,
        command: &Command,
    ) -> Result<CommandOutcome> {
        let payload = self.build_payload(command)?;
        debug!(device = %endpoint.authority(), payload = ?payload, "send");

        let mut options = options.clone();
        if options.tls.is_none() {
            options.tls = self.customize_tls();
        }

        let mut conn = transport::connect(endpoint, &options).await?;
        let exchanged = async {
            conn.send_all(&payload).await?;
            conn.receive_until(options.read_timeout, |buffer| self.is_response_complete(buffer))
                .await
        }
        .await;
        if let Err(e) = conn.release().await {
            warn!(device = %endpoint.authority(), error = %e, "failed to close connection");
        }

        let response = exchanged?;
        debug!(device = %endpoint.authority(), response = ?response, "recv");

        let success = self.validate(&payload, &response);
        if !success {
            warn!(
                device = %endpoint.authority(),
                payload = ?payload,
                response = ?response,
                "hardware response failed validation"
            );
        }
        Ok(CommandOutcome {
            success,
            payload,
            response,
        })
    }
}

/// Lookup table of protocol drivers keyed by hardware kind
#[derive(Debug)]
pub struct DriverRegistry {
    drivers: RwLock<HashMap<HardwareKind, Arc<dyn HardwareDriver>>>,
}

impl DriverRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            drivers: RwLock::new(HashMap::new()),
        }
    }

    /// Create a registry with the built-in drivers registered
    pub fn with_builtin_drivers() -> Self {
        let registry = Self::new();
        registry.register(Arc::new(crate::drivers::SimulationDriver::default()));
        registry.register(Arc::new(crate::drivers::KardexDriver::default()));
        registry
    }

    /// Register a driver for its hardware kind, replacing any previous one
    pub fn register(&self, driver: Arc<dyn HardwareDriver>) {
        let kind = driver.kind();
        let mut drivers = match self.drivers.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        drivers.insert(kind, driver);
        debug!(kind = %kind, "registered hardware driver");
    }

    /// Get the driver for a hardware kind
    pub fn get(&self, kind: HardwareKind) -> Result<Arc<dyn HardwareDriver>> {
        let drivers = match self.drivers.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        drivers
            .get(&kind)
            .cloned()
            .ok_or(HardwareError::UnsupportedHardware(kind))
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::with_builtin_drivers()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_codes() {
        assert_eq!(CommandKind::Pick.code(), "1");
        assert_eq!(CommandKind::Put.code(), "2");
        assert_eq!(CommandKind::Inventory.code(), "5");
        assert_eq!(CommandKind::Ping.code(), "61");
    }

    #[test]
    fn test_registry_lookup() {
        let registry = DriverRegistry::with_builtin_drivers();
        assert_eq!(
            registry.get(HardwareKind::Simulation).unwrap().kind(),
            HardwareKind::Simulation
        );
        assert_eq!(
            registry.get(HardwareKind::Kardex).unwrap().kind(),
            HardwareKind::Kardex
        );
    }

    #[test]
    fn test_registry_unknown_kind() {
        let registry = DriverRegistry::new();
        let result = registry.get(HardwareKind::Kardex);
        assert!(matches!(result, Err(HardwareError::UnsupportedHardware(_))));
    }
}
