//! Arduino port discovery.
//!
//! Ports are matched on their human-readable description, not on USB VID/PID:
//! boards show up as "Arduino Uno", "USB Serial Port (COM5)" or a CH340 bridge
//! depending on the OS and the clone.

use log::{debug, info};

use crate::port::{PortInfo, SerialBackend};

/// Description substrings that identify an Arduino-style USB serial adapter.
///
/// Matching is case-sensitive.
pub const DESCRIPTION_MARKERS: &[&str] = &["Arduino", "CH340", "USB Serial"];

/// Whether a port description looks like an Arduino adapter.
pub fn is_arduino_description(description: &str) -> bool {
    DESCRIPTION_MARKERS
        .iter()
        .any(|marker| description.contains(marker))
}

/// Pick the first matching port, in enumeration order.
pub fn select_arduino_port(ports: &[PortInfo]) -> Option<&PortInfo> {
    ports
        .iter()
        .find(|p| is_arduino_description(&p.description))
}

/// Enumerate ports, tolerating enumeration failure.
pub fn detect_ports(backend: &dyn SerialBackend) -> Vec<PortInfo> {
    match backend.list_ports() {
        Ok(ports) => ports,
        Err(e) => {
            debug!("Failed to enumerate serial ports: {e}");
            Vec::new()
        },
    }
}

/// Scan the host for an Arduino port.
///
/// Returns `None` when nothing matches or no ports exist. Opens nothing.
pub fn find_arduino_port(backend: &dyn SerialBackend) -> Option<PortInfo> {
    let ports = detect_ports(backend);
    for port in &ports {
        info!("Found port: {} - {}", port.name, port.description);
    }

    let selected = select_arduino_port(&ports).cloned();
    if let Some(ref port) = selected {
        info!("Selected Arduino port: {}", port.name);
    }
    selected
}

/// Format a list of ports for display, marking Arduino matches.
pub fn format_port_list(ports: &[PortInfo]) -> Vec<String> {
    ports
        .iter()
        .map(|port| {
            let marker = if is_arduino_description(&port.description) {
                " [Arduino]"
            } else {
                ""
            };
            let ids = match (port.vid, port.pid) {
                (Some(vid), Some(pid)) => format!(" (VID:{vid:04X} PID:{pid:04X})"),
                _ => String::new(),
            };
            format!("{} - {}{ids}{marker}", port.name, port.description)
        })
        .collect()
}
