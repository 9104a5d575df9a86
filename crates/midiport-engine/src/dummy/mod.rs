//! Software backend with no OS dependency.
//!
//! Ports exist only inside this process: an output's virtual port shows up
//! as an input port and vice versa, so the whole I/O stack can be exercised
//! without hardware.

mod bus;
mod input;
mod output;

pub use input::DummyInput;
pub use output::DummyOutput;
