//! MIDI port plumbing (midir)
//!
//! Opens the device ports and the sequencer-facing port, and adapts midir
//! connections to [`MidiSink`] and [`FrameHandler`].

use anyhow::{anyhow, Context, Result};
use midir::{Ignore, MidiIO, MidiInput, MidiInputConnection, MidiOutput, MidiOutputConnection};
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::bridge::FrameHandler;
use crate::sink::MidiSink;

/// Client name shown to the OS MIDI layer
const CLIENT_NAME: &str = "Anyma Pal";

/// Find a port by case-insensitive substring match (Windows-friendly)
pub fn find_port_by_substring<T: MidiIO>(io: &T, pattern: &str) -> Option<(T::Port, String)> {
    let needle = pattern.to_lowercase();
    io.ports().into_iter().find_map(|port| {
        let name = io.port_name(&port).ok()?;
        if name.to_lowercase().contains(&needle) {
            debug!("Found port '{}' matching pattern '{}'", name, pattern);
            Some((port, name))
        } else {
            None
        }
    })
}

fn port_names<T: MidiIO>(io: &T) -> Vec<String> {
    io.ports()
        .iter()
        .filter_map(|port| io.port_name(port).ok())
        .collect()
}

/// List available MIDI input ports
pub fn list_input_ports() -> Result<Vec<String>> {
    let midi_in = MidiInput::new(CLIENT_NAME).context("Failed to create MIDI input")?;
    Ok(port_names(&midi_in))
}

/// List available MIDI output ports
pub fn list_output_ports() -> Result<Vec<String>> {
    let midi_out = MidiOutput::new(CLIENT_NAME).context("Failed to create MIDI output")?;
    Ok(port_names(&midi_out))
}

/// An open midir output connection
pub struct MidirOutput {
    name: String,
    conn: Mutex<MidiOutputConnection>,
}

impl MidiSink for MidirOutput {
    fn name(&self) -> &str {
        &self.name
    }

    fn send(&self, data: &[u8]) -> Result<()> {
        self.conn
            .lock()
            .send(data)
            .map_err(|e| anyhow!("MIDI send to '{}' failed: {}", self.name, e))
    }
}

/// Open an existing output port by substring match
pub fn open_output(pattern: &str) -> Result<MidirOutput> {
    let midi_out = MidiOutput::new(CLIENT_NAME).context("Failed to create MIDI output")?;

    let (port, name) = find_port_by_substring(&midi_out, pattern)
        .ok_or_else(|| anyhow!("Output port '{}' not found", pattern))?;

    let conn = midi_out
        .connect(&port, "anyma-pal-out")
        .map_err(|e| anyhow!("Failed to connect to output port '{}': {}", name, e))?;

    info!("Output port opened: {}", name);
    Ok(MidirOutput {
        name,
        conn: Mutex::new(conn),
    })
}

/// Create the port the sequencer records from.
///
/// On unix this is a virtual port with the given name; elsewhere an existing
/// port (e.g. a loopback driver) is matched by name instead.
#[cfg(unix)]
pub fn open_sequencer_output(name: &str) -> Result<MidirOutput> {
    use midir::os::unix::VirtualOutput;

    let midi_out = MidiOutput::new(CLIENT_NAME).context("Failed to create MIDI output")?;
    let conn = midi_out
        .create_virtual(name)
        .map_err(|e| anyhow!("Failed to create virtual port '{}': {}", name, e))?;

    info!("Virtual sequencer port created: {}", name);
    Ok(MidirOutput {
        name: name.to_string(),
        conn: Mutex::new(conn),
    })
}

#[cfg(not(unix))]
pub fn open_sequencer_output(name: &str) -> Result<MidirOutput> {
    open_output(name)
}

/// Device input with a single registered frame handler.
///
/// Rebinding closes the current connection (if any) before connecting the new
/// port, so at most one callback is ever registered.
pub struct InputPort {
    current: Mutex<Option<(String, MidiInputConnection<()>)>>,
}

impl InputPort {
    pub fn new() -> Self {
        Self {
            current: Mutex::new(None),
        }
    }

    /// Connect `handler` to the first input port matching `pattern`.
    ///
    /// Returns the full name of the connected port. On failure the input is
    /// left unbound.
    pub fn bind(&self, pattern: &str, handler: FrameHandler) -> Result<String> {
        self.unbind();

        let mut midi_in = MidiInput::new(CLIENT_NAME).context("Failed to create MIDI input")?;
        // SysEx is filtered by default on some backends
        midi_in.ignore(Ignore::None);

        let (port, name) = find_port_by_substring(&midi_in, pattern)
            .ok_or_else(|| anyhow!("Input port '{}' not found", pattern))?;

        let conn = midi_in
            .connect(
                &port,
                "anyma-pal-in",
                move |_timestamp, data, _| handler(data),
                (),
            )
            .map_err(|e| anyhow!("Failed to connect to input port '{}': {}", name, e))?;

        info!("Input port opened: {}", name);
        *self.current.lock() = Some((name.clone(), conn));
        Ok(name)
    }

    /// Close the current connection, if any
    pub fn unbind(&self) {
        if let Some((name, conn)) = self.current.lock().take() {
            conn.close();
            info!("Input port closed: {}", name);
        }
    }

    pub fn bound_port(&self) -> Option<String> {
        self.current.lock().as_ref().map(|(name, _)| name.clone())
    }
}

impl Default for InputPort {
    fn default() -> Self {
        Self::new()
    }
}
