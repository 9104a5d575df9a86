/// One inbound MIDI message with its delta timestamp.
///
/// `timestamp` is the time in seconds since the previous message on the same
/// session (`0.0` for the first). An empty message means nothing was queued.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MidiMessage {
    bytes: Vec<u8>,
    timestamp: f64,
}

impl MidiMessage {
    pub fn new(bytes: Vec<u8>, timestamp: f64) -> Self {
        Self { bytes, timestamp }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}
