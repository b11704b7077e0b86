/*!
 * Built-in protocol drivers.
 */
pub mod kardex;
pub mod simulation;

pub use kardex::KardexDriver;
pub use simulation::SimulationDriver;

use crate::driver::Command;

/// Constant identifying the calling system in vendor payloads
pub(crate) const HOST_ID: &str = "odoo";

/// Render the pipe-delimited CR-LF record shared by the lift protocols
///
/// Field order is fixed:
/// `code|hostId|addr|carrier|carrierNext|x|y|boxType|Q|order|part|desc|`
/// terminated by CR-LF. Untargeted coordinates render as empty fields.
pub(crate) fn format_record(command: &Command) -> String {
    let (x, y) = match command.cell_center {
        Some((x, y)) => (format_coord(x), format_coord(y)),
        None => (String::new(), String::new()),
    };
    format!(
        "{code}|{host_id}|{addr}|{carrier}|{carrier_next}|{x}|{y}|{box_type}|{q}|{order}|{part}|{desc}|\r\n",
        code = command.kind.code(),
        host_id = HOST_ID,
        addr = command.shuttle,
        carrier = command.carrier,
        carrier_next = "",
        x = x,
        y = y,
        box_type = command.box_type,
        q = command.quantity,
        order = command.order,
        part = command.part,
        desc = command.description,
    )
}

/// Format a millimetre coordinate, dropping a trailing `.0`
fn format_coord(mm: f64) -> String {
    format!("{}", mm)
}

/// Encode with the legacy single-byte Latin character set, replacing
/// unencodable characters instead of failing
pub(crate) fn encode_latin1_lossy(s: &str) -> Vec<u8> {
    s.chars()
        .map(|c| {
            let code_point = c as u32;
            if code_point <= 0xFF {
                code_point as u8
            } else {
                b'?'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::CommandKind;

    #[test]
    fn test_format_record_without_cell() {
        let command = Command::new(CommandKind::Pick, "SH1").with_carrier("TRAY7");
        assert_eq!(format_record(&command), "1|odoo|SH1|TRAY7||||||||\r\n");
    }

    #[test]
    fn test_format_record_with_cell() {
        let command = Command::new(CommandKind::Put, "SH1")
            .with_carrier("TRAY7")
            .with_cell_center(125.0, 37.5);
        assert_eq!(format_record(&command), "2|odoo|SH1|TRAY7||125|37.5||||||\r\n");
    }

    #[test]
    fn test_encode_latin1_lossy_passthrough() {
        assert_eq!(encode_latin1_lossy("TRAY7"), b"TRAY7".to_vec());
    }

    #[test]
    fn test_encode_latin1_lossy_accented() {
        // è is U+00E8 and encodes directly in Latin-1
        assert_eq!(encode_latin1_lossy("pièce"), vec![b'p', b'i', 0xE8, b'c', b'e']);
    }

    #[test]
    fn test_encode_latin1_lossy_replaces_unencodable() {
        // the euro sign has no Latin-1 code point
        assert_eq!(encode_latin1_lossy("10€"), vec![b'1', b'0', b'?']);
    }
}
