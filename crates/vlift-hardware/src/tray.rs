/*!
 * Tray and cell geometry.
 *
 * A shuttle-managed tray is subdivided into addressable cells. Vendor
 * protocols that can highlight a cell (e.g. with a laser pointer) need the
 * centre of the cell in millimetres from the bottom-left of the tray.
 */
use serde::{Deserialize, Serialize};

/// Kind of tray, defining the cell grid dimensions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrayType {
    /// Width of one cell in mm
    pub width_per_cell: u32,
    /// Depth of one cell in mm
    pub depth_per_cell: u32,
}

/// A cell position within a tray; coordinates are 1-indexed from the
/// bottom-left corner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrayCell {
    /// Column, counted from the left
    pub posx: u32,
    /// Row, counted from the bottom
    pub posy: u32,
}

/// A tray held by a shuttle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tray {
    /// Tray name, sent to the hardware as the carrier field
    pub name: String,
    /// The kind of tray
    pub tray_type: TrayType,
}

impl TrayType {
    /// Central position of a cell in mm from the bottom-left of the tray
    /// (distance from left, distance from bottom)
    pub fn cell_center(&self, cell: &TrayCell) -> (f64, f64) {
        let width = f64::from(self.width_per_cell);
        let depth = f64::from(self.depth_per_cell);
        let from_left = f64::from(cell.posx.saturating_sub(1)) * width + width / 2.0;
        let from_bottom = f64::from(cell.posy.saturating_sub(1)) * depth + depth / 2.0;
        (from_left, from_bottom)
    }
}
