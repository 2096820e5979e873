use std::io::Read;
use std::net::TcpStream;
use std::time::Duration;

use assetpipe::events::{AssetEventService, AssetEventSink};
use assetpipe_test_utils::wait_until;

/// Read one length-prefixed frame and return (kind, path).
fn read_frame(stream: &mut TcpStream) -> (u32, String) {
    let mut len = [0u8; 4];
    stream.read_exact(&mut len).expect("reading frame length");
    let len = u32::from_le_bytes(len) as usize;

    let mut body = vec![0u8; len];
    stream.read_exact(&mut body).expect("reading frame body");

    let kind = u32::from_le_bytes(body[0..4].try_into().unwrap());
    let str_len = u32::from_le_bytes(body[4..8].try_into().unwrap()) as usize;
    assert_eq!(len, 8 + str_len + 1, "frame length accounts for NUL");
    assert_eq!(body[8 + str_len], 0, "path is NUL-terminated");

    let path = String::from_utf8(body[8..8 + str_len].to_vec()).expect("utf-8 path");
    (kind, path)
}

fn connect(port: u16) -> TcpStream {
    let mut stream = None;
    assert!(
        wait_until(Duration::from_secs(5), || {
            match TcpStream::connect(("127.0.0.1", port)) {
                Ok(s) => {
                    stream = Some(s);
                    true
                }
                Err(_) => false,
            }
        }),
        "service did not accept a connection"
    );
    let stream = stream.unwrap();
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();
    stream
}

#[test]
fn backlog_is_delivered_in_order_to_a_late_consumer() {
    let service = AssetEventService::spawn(49371);

    // Queue notifications with nobody listening.
    service.notify_asset_compiled("a.dat");
    service.notify_asset_compiled("b/c.dat");
    service.notify_asset_compiled("d.dat");

    let mut stream = connect(49371);
    for expected in ["a.dat", "b/c.dat", "d.dat"] {
        let (kind, path) = read_frame(&mut stream);
        assert_eq!(kind, 1);
        assert_eq!(path, expected);
    }
}

#[test]
fn live_notifications_follow_the_backlog() {
    let service = AssetEventService::spawn(49372);
    service.notify_asset_compiled("first.dat");

    let mut stream = connect(49372);
    let (_, path) = read_frame(&mut stream);
    assert_eq!(path, "first.dat");

    service.notify_asset_compiled("second.dat");
    let (_, path) = read_frame(&mut stream);
    assert_eq!(path, "second.dat");
}

#[test]
fn shutdown_joins_without_a_consumer() {
    let service = AssetEventService::spawn(49373);
    service.notify_asset_compiled("never-delivered.dat");
    // Dropping must not hang even though nothing ever connected.
    drop(service);
}

#[test]
fn frames_carry_exact_wire_layout() {
    let service = AssetEventService::spawn(49374);
    service.notify_asset_compiled("x.dat");

    let mut stream = connect(49374);
    let mut raw = [0u8; 18];
    stream.read_exact(&mut raw).expect("reading raw frame");

    // length counts kind (4) + string length (4) + "x.dat" (5) + NUL (1)
    assert_eq!(&raw[0..4], &14u32.to_le_bytes(), "frame length");
    assert_eq!(&raw[4..8], &1u32.to_le_bytes(), "message kind");
    assert_eq!(&raw[8..12], &5u32.to_le_bytes(), "string length");
    assert_eq!(&raw[12..17], b"x.dat");
    assert_eq!(raw[17], 0, "NUL terminator");
}
