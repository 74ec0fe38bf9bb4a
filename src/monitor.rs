//! Frame monitor for debugging and protocol exploration
//!
//! Prints every frame received from the device together with how the bridge
//! classifies it, without starting a session or sending anything.

use anyhow::Result;
use colored::*;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::info;

use crate::anyma::{classify, controller_for, Classification};
use crate::midi::{format_hex, MidiMessage};
use crate::transport::{self, InputPort};

/// Frame captured by the monitor
#[derive(Debug, Clone)]
struct MonitorEvent {
    timestamp_ms: u64,
    data: Vec<u8>,
}

/// Describe how a frame is classified and what the sequencer would receive
pub fn describe_frame(data: &[u8]) -> String {
    match classify(data) {
        Classification::LargeDump(frame) => format!("patch dump ({} bytes) => forward", frame.len()),
        Classification::ParamState(param) => match controller_for(&param) {
            Some(cc) => format!("{} => CC{} v:{}", param, cc, param.value),
            None => format!("{} => unmapped", param),
        },
        Classification::Unrecognized => "unrecognized SysEx".to_string(),
        Classification::Ignore => MidiMessage::parse(data)
            .map(|m| m.to_string())
            .unwrap_or_else(|| "ignored".to_string()),
    }
}

/// Format one monitor line: `[timestamp] HEX => description`
pub fn format_line(timestamp_ms: u64, data: &[u8]) -> String {
    let hex = if data.len() > 24 {
        format!("{} ...", format_hex(&data[..24]))
    } else {
        format_hex(data)
    };
    format!("[{:08}ms] {} | {}", timestamp_ms, hex, describe_frame(data))
}

/// Monitor the device input until Ctrl+C
pub async fn run_monitor(pattern: &str) -> Result<()> {
    println!("{}", "=== Anyma Frame Monitor ===".bold().cyan());
    println!("Press Ctrl+C to exit\n");

    let (event_tx, mut event_rx) = mpsc::channel::<MonitorEvent>(1000);
    let start_time = Instant::now();

    let input = InputPort::new();
    let port_name = input.bind(
        pattern,
        Arc::new(move |data: &[u8]| {
            let event = MonitorEvent {
                timestamp_ms: start_time.elapsed().as_millis() as u64,
                data: data.to_vec(),
            };
            // never block the MIDI callback
            let _ = event_tx.try_send(event);
        }),
    )?;

    info!("Monitoring: {}", port_name);
    println!("{}", "Format: [timestamp] HEX | CLASSIFICATION".dimmed());
    println!("{}\n", "─".repeat(80).dimmed());

    loop {
        tokio::select! {
            Some(event) = event_rx.recv() => {
                let line = format_line(event.timestamp_ms, &event.data);
                match classify(&event.data) {
                    Classification::ParamState(_) => println!("{}", line.green()),
                    Classification::LargeDump(_) => println!("{}", line.yellow()),
                    _ => println!("{}", line.dimmed()),
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    input.unbind();
    Ok(())
}

/// Print available ports
pub fn list_ports_formatted() {
    println!("\n{}", "=== Available MIDI Ports ===".bold().cyan());

    print_port_list("Input Ports:", transport::list_input_ports());
    print_port_list("Output Ports:", transport::list_output_ports());
}

fn print_port_list(title: &str, ports: Result<Vec<String>>) {
    println!("\n{}", title.bold());
    match ports {
        Ok(ports) if ports.is_empty() => println!("  {}", "No ports found".dimmed()),
        Ok(ports) => {
            for (index, name) in ports.iter().enumerate() {
                let marker = if name.to_lowercase().contains("anyma") {
                    "[ANYMA]".green()
                } else {
                    "       ".normal()
                };
                println!("  {} {:>2}: {}", marker, index, name);
            }
        }
        Err(e) => println!("  {}", format!("Unavailable: {}", e).red()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_param_frames() {
        assert_eq!(
            describe_frame(&[0xF0, 0x71, 0x00, 0x02, 0x45, 0xF7]),
            "system[2]=69 => CC23 v:69"
        );
        assert_eq!(
            describe_frame(&[0xF0, 0x71, 0x07, 0x0E, 0x01, 0xF7]),
            "alt[14]=1 => unmapped"
        );
    }

    #[test]
    fn test_describe_other_frames() {
        assert_eq!(describe_frame(&[0xF0, 0x71, 0xF7]), "unrecognized SysEx");
        assert_eq!(describe_frame(&[0x90, 60, 100]), "NoteOn ch:1 n:60 v:100");
        assert_eq!(describe_frame(&[0xF8]), "ignored");

        let mut dump = vec![0xF0];
        dump.extend(std::iter::repeat(0x10).take(256));
        dump.push(0xF7);
        assert_eq!(describe_frame(&dump), "patch dump (258 bytes) => forward");
    }

    #[test]
    fn test_format_line_truncates_long_frames() {
        let line = format_line(42, &[0x10; 40]);
        assert!(line.starts_with("[00000042ms] 10 10"));
        assert!(line.contains(" ... | "));
    }
}
