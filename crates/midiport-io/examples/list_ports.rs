use midiport_io::{compiled_apis, version, InputSession, OutputSession, Port};

fn main() {
    tracing_subscriber::fmt::init();

    println!("midiport engine {}", version());
    let apis: Vec<_> = compiled_apis().iter().map(|api| api.display_name()).collect();
    println!("Compiled backends: {}", apis.join(", "));

    let input = InputSession::new().unwrap();
    println!(
        "\n=== MIDI Input Ports ({}) ===",
        input.api().unwrap().display_name()
    );
    let ports = input.ports().unwrap();
    if ports.is_empty() {
        println!("  (none found)");
    }
    for port in &ports {
        println!("  [{}] {}", port.index, port.name);
    }

    let output = OutputSession::new().unwrap();
    println!(
        "\n=== MIDI Output Ports ({}) ===",
        output.api().unwrap().display_name()
    );
    let ports = output.ports().unwrap();
    if ports.is_empty() {
        println!("  (none found)");
    }
    for port in &ports {
        println!("  [{}] {}", port.index, port.name);
    }
}
