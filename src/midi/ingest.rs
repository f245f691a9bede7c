use super::MidiMessage;
use crate::error::MidiInputError;
use midir::{Ignore, MidiInput, MidiInputConnection};
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MidiConfig {
    /// Client name announced to the MIDI driver.
    pub client_name: String,
    /// Index of the input port to open.
    pub port_index: usize,
}

impl Default for MidiConfig {
    fn default() -> Self {
        Self {
            client_name: "noodle".to_string(),
            port_index: 0,
        }
    }
}

/// Messages decoded on the driver thread, waiting to be picked up by the control thread.
#[derive(Clone, Default)]
pub struct MidiQueue {
    messages: Arc<Mutex<Vec<MidiMessage>>>,
}

impl MidiQueue {
    pub fn new() -> Self {
        Default::default()
    }

    /// Decodes a raw frame and queues it. Malformed frames are discarded.
    pub fn push_raw(&self, bytes: &[u8]) {
        match MidiMessage::decode(bytes) {
            Ok(message) => self.push(message),
            Err(err) => log::debug!("Discarding MIDI frame {:02x?}: {}", bytes, err),
        }
    }

    pub fn push(&self, message: MidiMessage) {
        self.messages.lock().push(message);
    }

    /// Moves every queued message into `scratch`, replacing its previous contents.
    ///
    /// The lock is only held for a swap, so the driver thread is never kept waiting on dispatch.
    pub fn drain_into(&self, scratch: &mut Vec<MidiMessage>) {
        scratch.clear();
        std::mem::swap(&mut *self.messages.lock(), scratch);
    }
}

/// An open MIDI input port feeding a [`MidiQueue`].
pub struct MidiIngest {
    queue: MidiQueue,
    /// Holds the connection to keep it alive
    connection: Option<MidiInputConnection<()>>,
}

impl MidiIngest {
    /// Opens the configured input port.
    ///
    /// If there is no such port a warning is logged and the ingest never produces messages.
    pub fn open(config: &MidiConfig) -> Self {
        let queue = MidiQueue::new();
        match connect(config, queue.clone()) {
            Ok(connection) => Self {
                queue,
                connection: Some(connection),
            },
            Err(err) => {
                log::warn!("MIDI input unavailable: {}", err);
                Self::disconnected(queue)
            }
        }
    }

    /// An ingest that is not attached to any port. Messages can still be pushed into its queue.
    pub fn disconnected(queue: MidiQueue) -> Self {
        Self {
            queue,
            connection: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    pub fn queue(&self) -> &MidiQueue {
        &self.queue
    }

    pub fn drain_into(&self, scratch: &mut Vec<MidiMessage>) {
        self.queue.drain_into(scratch);
    }

    /// Closes the port, if one is open.
    pub fn close(&mut self) {
        if let Some(connection) = self.connection.take() {
            connection.close();
            log::info!("MIDI input closed");
        }
    }
}

impl Drop for MidiIngest {
    fn drop(&mut self) {
        self.close();
    }
}

fn connect(config: &MidiConfig, queue: MidiQueue) -> Result<MidiInputConnection<()>, MidiInputError> {
    let mut midi_in = MidiInput::new(&config.client_name)?;
    midi_in.ignore(Ignore::ActiveSense);

    let ports = midi_in.ports();
    if ports.is_empty() {
        return Err(MidiInputError::NoPorts);
    }
    let port = ports
        .get(config.port_index)
        .ok_or(MidiInputError::NoSuchPort(config.port_index))?;
    let port_name = midi_in.port_name(port).unwrap_or_else(|_| "<unnamed>".to_string());

    // Runs on the driver's thread: decode and queue, nothing else
    let callback = move |_, bytes: &[u8], _: &mut ()| queue.push_raw(bytes);

    let connection = midi_in
        .connect(port, "noodle-input", callback, ())
        .map_err(|err| MidiInputError::Connect(err.to_string()))?;
    log::info!("Opened MIDI input port \"{}\"", port_name);
    Ok(connection)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_queue_drains_in_order() {
        let queue = MidiQueue::new();
        queue.push_raw(&[0x90, 60, 100]);
        queue.push_raw(&[0x80, 60, 0]);
        queue.push_raw(&[0x90]);

        let mut scratch = vec![MidiMessage::default(); 4];
        queue.drain_into(&mut scratch);
        assert_eq!(scratch.len(), 2);
        assert_eq!(scratch[0].status, 0x90);
        assert_eq!(scratch[1].status, 0x80);

        queue.drain_into(&mut scratch);
        assert!(scratch.is_empty());
    }

    #[test]
    fn test_queue_is_shared_across_threads() {
        let queue = MidiQueue::new();
        let producer = queue.clone();
        let thread = std::thread::spawn(move || {
            for key in 0..100u8 {
                producer.push_raw(&[0x90, key, 100]);
            }
        });
        thread.join().unwrap();

        let mut scratch = vec![];
        queue.drain_into(&mut scratch);
        assert_eq!(scratch.len(), 100);
        assert!(scratch.iter().enumerate().all(|(i, m)| m.data1 == i as u8));
    }

    #[test]
    fn test_disconnected_ingest() {
        let ingest = MidiIngest::disconnected(MidiQueue::new());
        assert!(!ingest.is_connected());
        ingest.queue().push_raw(&[0xb0, 123, 0]);
        let mut scratch = vec![];
        ingest.drain_into(&mut scratch);
        assert_eq!(scratch.len(), 1);
    }
}
