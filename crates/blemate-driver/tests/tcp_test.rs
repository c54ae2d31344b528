//! Driver over a real TCP socket, with a minimal module emulator on the far
//! end. Uses the system clock, so timings are kept short.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;

use blemate_driver::{BleMate, Channel, DriverConfig, Outcome, TcpChannel};

/// Answer commands the way a module would, until the host hangs up.
fn emulate(mut stream: TcpStream) {
    let mut line = Vec::new();
    let mut byte = [0u8; 1];
    while let Ok(1) = stream.read(&mut byte) {
        if byte[0] != b'\r' {
            line.push(byte[0]);
            continue;
        }
        let reply: &[u8] = match line.as_slice() {
            b"" => b"ERR\n\r",
            b"VER" => b"Melody Smart v2.6.0\n\rBluetooth Address 20FABB012345\n\rOK\n\r",
            b"STS" => b"STS P 1 0\n\rOK\n\r",
            b"WRT" => b"OK\n\r",
            cmd if cmd.starts_with(b"SND ") => b"OK\n\r",
            _ => b"",
        };
        line.clear();
        if stream.write_all(reply).is_err() {
            return;
        }
    }
}

fn connect() -> BleMate<TcpChannel> {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        emulate(stream);
    });

    let config = DriverConfig {
        resync_idle_ms: 500,
        command_timeout_ms: 300,
        ..DriverConfig::default()
    };
    BleMate::new(TcpChannel::connect(addr).unwrap()).with_config(config)
}

#[test]
fn test_own_address_over_tcp() {
    let mut ble = connect();
    assert_eq!(ble.own_address().unwrap(), "20FABB012345");
    ble.write_config().unwrap();
}

#[test]
fn test_send_over_tcp() {
    let mut ble = connect();
    ble.send_str("hello over tcp").unwrap();
}

#[test]
fn test_unanswered_command_over_tcp_times_out() {
    let mut ble = connect();
    assert_eq!(Outcome::of(&ble.restore()), Outcome::Timeout);
}

#[test]
fn test_channel_endpoint_labels_driver() {
    let ble = connect();
    assert!(ble.channel().endpoint().starts_with("tcp://"));
}
