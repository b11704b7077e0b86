/*!
 * Simulation driver.
 *
 * Used when no hardware is attached: commands are reported to the operator
 * through the log instead of being transmitted, and always succeed. This is
 * the default hardware kind for newly configured devices.
 */
use async_trait::async_trait;
use bytes::Bytes;
use tracing::info;

use vlift_core::types::HardwareKind;

use crate::driver::{Command, CommandOutcome, HardwareDriver};
use crate::error::Result;
use crate::transport::{ConnectOptions, Endpoint};

use super::{encode_latin1_lossy, format_record};

/// Driver that surfaces payloads to the operator instead of hardware
#[derive(Debug, Default)]
pub struct SimulationDriver;

#[async_trait]
impl HardwareDriver for SimulationDriver {
    fn kind(&self) -> HardwareKind {
        HardwareKind::Simulation
    }

    fn build_payload(&self, command: &Command) -> Result<Bytes> {
        // Render the same record a real driver would send, so the operator
        // sees the exact bytes the hardware would have received.
        Ok(Bytes::from(encode_latin1_lossy(&format_record(command))))
    }

    async fn send_command(
        &self,
        _endpoint: &Endpoint,
        _options: &ConnectOptions,
        command: &Command,
    ) -> Result<CommandOutcome> {
        let payload = self.build_payload(command)?;
        info!(payload = %String::from_utf8_lossy(&payload).trim_end(), "lift simulation");
        Ok(CommandOutcome {
            success: true,
            payload,
            response: Bytes::new(),
        })
    }
}
