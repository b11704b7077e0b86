use std::sync::Arc;

use vlift_core::config::DeviceConfig;
use vlift_core::types::HardwareKind;
use vlift_engine::measure::{MeasureLine, MeasuringDevice, Packaging};
use vlift_engine::operation::{route_barcode, OperationRegistry};
use vlift_engine::shuttle::Shuttle;
use vlift_hardware::driver::DriverRegistry;
use vlift_hardware::session::SessionManager;
use vlift_hardware::transport::ConnectOptions;
use vlift_hardware::tray::{Tray, TrayCell, TrayType};

use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize the logger
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::DEBUG)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Shared infrastructure: drivers, device sessions, operation records
    let drivers = Arc::new(DriverRegistry::with_builtin_drivers());
    let sessions = Arc::new(SessionManager::new());
    let operations = Arc::new(OperationRegistry::new());

    // A shuttle driven by the simulation hardware kind
    let shuttle = Shuttle::new(
        DeviceConfig {
            id: "SH1".into(),
            kind: HardwareKind::Simulation,
            host: String::new(),
            port: 0,
            use_tls: false,
        },
        drivers,
        sessions.clone(),
        operations,
        ConnectOptions::default(),
    );

    // Open the put screen and ask the lift for a tray, pointing at a cell
    let operation = shuttle.switch_put();
    info!("operation {} opened in {} mode", operation.id(), operation.mode());

    let tray = Tray {
        name: "TRAY7".to_string(),
        tray_type: TrayType {
            width_per_cell: 50,
            depth_per_cell: 30,
        },
    };
    let outcome = shuttle
        .open_tray(&tray, Some(&TrayCell { posx: 3, posy: 2 }))
        .await?;
    info!(success = outcome.success, "tray requested");

    // Route a scanned barcode to the active operation
    route_barcode(Some(&operation), "05412345000013");

    // Exclusive use of a measuring device for one line
    let zippcube = MeasuringDevice::new(
        DeviceConfig {
            id: "zippcube-0".into(),
            kind: HardwareKind::Simulation,
            host: String::new(),
            port: 0,
            use_tls: false,
        },
        sessions,
    );
    let line = MeasureLine::new(
        "line-1".into(),
        1.0,
        Some(Packaging {
            id: "pkg-1".into(),
            name: "Box 40".to_string(),
            barcode: Some("05412345000013".to_string()),
            max_weight: 12.0,
            length: 400,
            width: 300,
            height: 200,
        }),
    );

    let selected = zippcube.select_for_measure(&line);
    info!(?selected, busy = zippcube.is_busy(), "device selected for measure");

    zippcube.select_for_measure_cancel(&line);
    info!(busy = zippcube.is_busy(), "measure cancelled");

    Ok(())
}
