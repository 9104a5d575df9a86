//! Loopback scenarios through the umbrella API, on the dummy backend.

use std::thread;
use std::time::{Duration, Instant};

use midiport::prelude::*;
use midiport::{CallbackRegistry, Error};
use serial_test::serial;

fn poll_until_message(input: &mut InputSession) -> MidiMessage {
    let deadline = Instant::now() + Duration::from_secs(2);
    loop {
        let message = input.message().unwrap();
        if !message.is_empty() {
            return message;
        }
        assert!(Instant::now() < deadline, "timed out waiting for MIDI input");
        thread::sleep(Duration::from_millis(2));
    }
}

fn open_pair(name: &str) -> midiport::Result<(OutputSession, InputSession)> {
    let mut output = OutputSession::builder().api(Api::Dummy).build()?;
    output.open_virtual_port(name)?;
    let mut input = InputSession::builder().api(Api::Dummy).build()?;
    input.open_port_by_name(name, "T")?;
    Ok((output, input))
}

#[test]
#[serial]
fn test_sysex_is_filtered_until_allowed() {
    let (mut output, mut input) = open_pair("scenario sysex").unwrap();
    let sysex: [u8; 4] = [0xF0, 0x7D, 0x01, 0xF7];

    input.ignore_types(IgnoreTypes::new(true, true, true)).unwrap();
    output.send_message(&sysex).unwrap();
    thread::sleep(Duration::from_millis(20));
    assert!(input.message().unwrap().is_empty());

    input.ignore_types(IgnoreTypes::new(false, true, true)).unwrap();
    output.send_message(&sysex).unwrap();
    let message = poll_until_message(&mut input);
    assert_eq!(message.bytes(), &sysex);
    assert!(message.timestamp() >= 0.0);
}

#[test]
#[serial]
fn test_repeated_set_callback_keeps_one_registration() {
    let (_output, mut input) = open_pair("scenario callbacks").unwrap();
    input.set_callback(Box::new(|_, _| {})).unwrap();
    input.set_callback(Box::new(|_, _| {})).unwrap();
    assert_eq!(CallbackRegistry::global().registrations_for(input.id()), 1);

    input.destroy();
    assert_eq!(CallbackRegistry::global().registrations_for(input.id()), 0);
}

#[test]
#[serial]
fn test_session_errors_convert_into_umbrella_error() {
    let mut output = OutputSession::builder().api(Api::Dummy).build().unwrap();
    let result: midiport::Result<()> = output.send_message(&[0x90, 1, 1]).map_err(Error::from);
    match result {
        Err(Error::Session(e)) => assert_eq!(e.message(), "no MIDI port is open"),
        other => panic!("unexpected {:?}", other),
    }
}
