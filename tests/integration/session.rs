//! Full-session tests: the real controller and transfer engine against the
//! emulated device.

use bytes::Bytes;

use fpglink_core::controller::ControllerError;
use fpglink_core::transfer::TransferError;
use fpglink_core::{Controller, MemoryRange, Output, SessionState};

use crate::device::{EmulatedDevice, RunProgram};

const PING: &[u8] = b"UART";

fn patterned(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 + 7) as u8).collect()
}

fn drain(session: &mut Controller<crate::device::DeviceHandle>) -> Vec<u8> {
    let mut out = Vec::new();
    loop {
        match session.poll_output().unwrap() {
            Some(Output::Byte(b)) => out.push(b),
            Some(Output::End) => return out,
            None => panic!("emulated device produced no more output"),
        }
    }
}

#[test]
fn full_session_load_verify_run() {
    let dev = EmulatedDevice::new(RunProgram::UppercaseInput);
    let mut session = Controller::new(dev.clone());

    let text = patterned(2048);
    let ranges = vec![
        MemoryRange::with_content(0x1000, Bytes::from(text.clone())).unwrap(),
        MemoryRange::zeroed(0x2000, 0x2200).unwrap(),
    ];

    session.link(PING).unwrap();
    session.load(&ranges, b"hello device").unwrap();
    assert_eq!(session.state(), SessionState::Loaded);

    // the image landed byte-for-byte, zero-fill included
    assert_eq!(dev.state().ram_slice(0x1000, 2048), text);
    assert_eq!(dev.state().ram_slice(0x2000, 0x200), vec![0u8; 0x200]);
    assert_eq!(dev.state().input(), b"hello device");

    session.start().unwrap();
    assert!(dev.state().running);
    assert_eq!(drain(&mut session), b"HELLO DEVICE");
}

#[test]
fn upload_chunks_at_the_ram_stride() {
    // 2048 bytes at 0x1000 with a 1024 stride: exactly two packets, at
    // 0x1000 and 0x1400, 1024 bytes each.
    let dev = EmulatedDevice::new(RunProgram::Script(Vec::new()));
    let mut session = Controller::new(dev.clone());
    let ranges = vec![MemoryRange::with_content(0x1000, Bytes::from(patterned(2048))).unwrap()];

    session.link(PING).unwrap();
    session.upload_image(&ranges).unwrap();

    assert_eq!(dev.state().ram_writes, vec![(0x1000, 1024), (0x1400, 1024)]);
}

#[test]
fn verify_reports_the_failing_block() {
    let dev = EmulatedDevice::new(RunProgram::Script(Vec::new()));
    let mut session = Controller::new(dev.clone());
    let ranges = vec![MemoryRange::with_content(0x1000, Bytes::from(patterned(2048))).unwrap()];

    session.link(PING).unwrap();
    session.upload_image(&ranges).unwrap();
    session.verify_image(&ranges).unwrap();
    assert_eq!(session.state(), SessionState::Loaded);

    // flip one byte at offset 1500 — inside the second 1024-byte block
    dev.state().flip_ram(0x1000 + 1500);
    let err = session.verify_image(&ranges).unwrap_err();
    match err {
        ControllerError::Transfer(TransferError::VerifyMismatch { start, end, .. }) => {
            assert_eq!(start, 0x1400);
            assert_eq!(end, 0x1800);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(session.state(), SessionState::Linked);
}

#[test]
fn zero_fill_verify_catches_stray_byte() {
    let dev = EmulatedDevice::new(RunProgram::Script(Vec::new()));
    let mut session = Controller::new(dev.clone());
    let ranges = vec![MemoryRange::zeroed(0x4000, 0x4000 + 1500).unwrap()];

    session.link(PING).unwrap();
    session.load(&ranges, &[]).unwrap();

    dev.state().flip_ram(0x4000 + 1100); // second block
    let err = session.verify_image(&ranges).unwrap_err();
    match err {
        ControllerError::Transfer(TransferError::VerifyMismatch { start, end, .. }) => {
            assert_eq!(start, 0x4400);
            assert_eq!(end, 0x4000 + 1500);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn mangled_ping_is_fatal() {
    let dev = EmulatedDevice::new(RunProgram::Script(Vec::new()));
    dev.state().mangle_ping = true;
    let mut session = Controller::new(dev);

    let err = session.link(PING).unwrap_err();
    assert!(matches!(err, ControllerError::Liveness(_)));
    assert_eq!(session.state(), SessionState::Disconnected);

    // a dead link rejects everything else without traffic
    assert!(matches!(
        session.start().unwrap_err(),
        ControllerError::InvalidState { .. }
    ));
}

#[test]
fn input_arrives_in_64_byte_packets() {
    let dev = EmulatedDevice::new(RunProgram::Script(Vec::new()));
    let mut session = Controller::new(dev.clone());
    let input = patterned(130);

    session.link(PING).unwrap();
    session.push_input(&input).unwrap();

    assert_eq!(dev.state().input_writes, vec![64, 64, 2]);
    assert_eq!(dev.state().input(), input);
}

#[test]
fn pc_read_round_trip() {
    let dev = EmulatedDevice::new(RunProgram::Script(Vec::new()));
    let mut session = Controller::new(dev.clone());

    session.link(PING).unwrap();
    dev.state().pc = 0x0000_13f4;
    assert_eq!(session.read_pc().unwrap(), 0x13f4);
}

#[test]
fn pause_and_resume_reach_the_device() {
    let dev = EmulatedDevice::new(RunProgram::Script(b"out".to_vec()));
    let mut session = Controller::new(dev.clone());
    let ranges = vec![MemoryRange::zeroed(0, 16).unwrap()];

    session.link(PING).unwrap();
    session.load(&ranges, &[]).unwrap();

    session.start().unwrap();
    assert!(dev.state().running);
    session.pause().unwrap();
    assert!(!dev.state().running);
    session.start().unwrap();
    assert!(dev.state().running);
}

#[test]
fn peek_reads_back_what_was_loaded() {
    let dev = EmulatedDevice::new(RunProgram::Script(Vec::new()));
    let mut session = Controller::new(dev.clone());
    let text = patterned(1500);
    let ranges = vec![MemoryRange::with_content(0x8000, Bytes::from(text.clone())).unwrap()];

    session.link(PING).unwrap();
    session.load(&ranges, &[]).unwrap();

    assert_eq!(session.read_ram(0x8000, 1500).unwrap(), text);
    assert_eq!(session.read_ram(0x8000 + 4, 8).unwrap(), &text[4..12]);
}
