/*!
 * Kardex vertical lift driver.
 *
 * Frames the pipe-delimited CR-LF record the Kardex host interface expects,
 * encoded in Latin-1 with lossy replacement. The record must stay bit-exact
 * for interoperability with the vendor:
 *
 * `{code}|{hostId}|{addr}|{carrier}|{carrierNext}|{x}|{y}|{boxType}|{Q}|{order}|{part}|{desc}|\r\n`
 *
 * The hardware closes the connection after one reply, so the default
 * read-until-EOF termination rule applies. Response validation is still the
 * accept-everything default; the acknowledgement grammar is not published,
 * so failures surface through logged payload/response pairs instead.
 */
use async_trait::async_trait;
use bytes::Bytes;

use vlift_core::types::HardwareKind;

use crate::driver::{Command, HardwareDriver};
use crate::error::Result;

use super::{encode_latin1_lossy, format_record};

/// Driver for the Kardex host interface
#[derive(Debug, Default)]
pub struct KardexDriver;

#[async_trait]
impl HardwareDriver for KardexDriver {
    fn kind(&self) -> HardwareKind {
        HardwareKind::Kardex
    }

    fn build_payload(&self, command: &Command) -> Result<Bytes> {
        Ok(Bytes::from(encode_latin1_lossy(&format_record(command))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{CommandKind, CommandOutcome};
    use crate::transport::{ConnectOptions, Endpoint};
    use crate::tray::{TrayCell, TrayType};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[test]
    fn test_pick_payload_is_bit_exact() {
        let driver = KardexDriver::default();
        let command = Command::new(CommandKind::Pick, "SH1").with_carrier("TRAY7");
        let payload = driver.build_payload(&command).unwrap();
        assert_eq!(&payload[..], b"1|odoo|SH1|TRAY7||||||||\r\n");
    }

    #[test]
    fn test_codes_per_command_kind() {
        let driver = KardexDriver::default();
        for (kind, code) in [
            (CommandKind::Put, b'2'),
            (CommandKind::Inventory, b'5'),
        ] {
            let command = Command::new(kind, "SH1").with_carrier("TRAY7");
            let payload = driver.build_payload(&command).unwrap();
            assert_eq!(payload[0], code);
        }

        let ping = Command::new(CommandKind::Ping, "SH1");
        let payload = driver.build_payload(&ping).unwrap();
        assert_eq!(&payload[..], b"61|odoo|SH1|||||||||\r\n");
    }

    #[test]
    fn test_payload_carries_cell_center() {
        let tray_type = TrayType {
            width_per_cell: 50,
            depth_per_cell: 30,
        };
        let (x, y) = tray_type.cell_center(&TrayCell { posx: 3, posy: 2 });
        let driver = KardexDriver::default();
        let command = Command::new(CommandKind::Pick, "SH1")
            .with_carrier("TRAY7")
            .with_cell_center(x, y);
        let payload = driver.build_payload(&command).unwrap();
        assert_eq!(&payload[..], b"1|odoo|SH1|TRAY7||125|45||||||\r\n");
    }

    #[test]
    fn test_description_encodes_latin1_with_replacement() {
        let driver = KardexDriver::default();
        let command = Command::new(CommandKind::Put, "SH1")
            .with_carrier("TRAY7")
            .with_description("pièce 10€");
        let payload = driver.build_payload(&command).unwrap();
        let expected: Vec<u8> = [
            &b"2|odoo|SH1|TRAY7||||||||pi"[..],
            &[0xE8u8][..],
            &b"ce 10?|\r\n"[..],
        ]
        .concat();
        assert_eq!(&payload[..], &expected[..]);
    }

    #[tokio::test]
    async fn test_send_command_roundtrip_and_release() {
        // The peer reads the command, answers, and closes; the driver must
        // deliver the full payload, accumulate the reply until EOF and
        // report success (validation is the accept-everything default).
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut received = Vec::new();
            let mut buf = [0u8; 256];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                received.extend_from_slice(&buf[..n]);
                if received.ends_with(b"\r\n") {
                    break;
                }
            }
            socket.write_all(b"0|ok|\r\n").await.unwrap();
            socket.shutdown().await.unwrap();
            received
        });

        let endpoint = Endpoint {
            host: "127.0.0.1".to_string(),
            port,
            use_tls: false,
        };
        let driver = KardexDriver::default();
        let command = Command::new(CommandKind::Inventory, "SH2").with_carrier("TRAY1");
        let outcome: CommandOutcome = driver
            .send_command(&endpoint, &ConnectOptions::default(), &command)
            .await
            .unwrap();

        assert!(outcome.success);
        assert_eq!(&outcome.response[..], b"0|ok|\r\n");
        let received = server.await.unwrap();
        assert_eq!(received, b"5|odoo|SH2|TRAY1||||||||\r\n".to_vec());
    }
}
