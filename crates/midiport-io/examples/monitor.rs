//! Prints every message arriving on an input port.
//!
//!   cargo run -p midiport-io --example monitor -- [port name]
//!
//! Without a port name the first input port is used.

use std::time::Duration;

use midiport_io::{IgnoreTypes, Input, InputSession, Port};

fn main() {
    tracing_subscriber::fmt::init();

    let mut input = InputSession::builder()
        .client_name("midiport monitor")
        .ignore(IgnoreTypes::new(false, true, true))
        .build()
        .unwrap();

    match std::env::args().nth(1) {
        Some(name) => input.open_port_by_name(&name, "monitor").unwrap(),
        None => {
            if input.port_count().unwrap() == 0 {
                eprintln!("No MIDI input ports available");
                return;
            }
            input.open_port(0, "monitor").unwrap();
        }
    }

    input
        .set_callback(Box::new(|bytes, delta| {
            println!("{:>10.6}s  {:02X?}", delta, bytes);
        }))
        .unwrap();

    println!("Listening, press Ctrl-C to quit");
    loop {
        std::thread::sleep(Duration::from_secs(1));
    }
}
