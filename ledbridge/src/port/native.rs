//! Native serial port implementation using the `serialport` crate.
//!
//! This module provides the serial port implementation for native platforms
//! (Linux, macOS, Windows, FreeBSD, etc.).

use {
    crate::{
        error::{Error, Result},
        port::{Port, PortInfo, SerialBackend, SerialConfig},
    },
    log::trace,
    serialport::{DataBits, FlowControl, Parity, SerialPortType, StopBits},
    std::io::{Read, Write},
};

/// Description pyserial-style tools report for ports without USB metadata.
const NO_DESCRIPTION: &str = "n/a";

/// Native serial port implementation.
pub struct NativePort {
    port: Option<Box<dyn serialport::SerialPort>>,
    name: String,
}

impl NativePort {
    /// Open a serial port with the given configuration (8N1, no flow control).
    pub fn open(config: &SerialConfig) -> Result<Self> {
        let port = serialport::new(&config.port_name, config.baud_rate)
            .timeout(config.timeout)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .open()?;

        Ok(Self {
            port: Some(port),
            name: config
                .port_name
                .clone(),
        })
    }

    fn closed_error() -> std::io::Error {
        std::io::Error::new(std::io::ErrorKind::NotConnected, "port closed")
    }
}

impl Port for NativePort {
    fn name(&self) -> &str {
        &self.name
    }

    fn bytes_to_read(&self) -> Result<u32> {
        match self.port {
            Some(ref p) => p
                .bytes_to_read()
                .map_err(Error::Serial),
            None => Err(Error::Io(Self::closed_error())),
        }
    }

    fn close(&mut self) -> Result<()> {
        // Dropping the handle closes the OS port
        if self
            .port
            .take()
            .is_some()
        {
            trace!("Closed {}", self.name);
        }
        Ok(())
    }
}

impl Read for NativePort {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.port
            .as_mut()
            .ok_or_else(Self::closed_error)
            .and_then(|p| p.read(buf))
    }
}

impl Write for NativePort {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.port
            .as_mut()
            .ok_or_else(Self::closed_error)
            .and_then(|p| p.write(buf))
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.port
            .as_mut()
            .ok_or_else(Self::closed_error)
            .and_then(std::io::Write::flush)
    }
}

/// Backend over the host's real serial ports.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeBackend;

impl SerialBackend for NativeBackend {
    fn list_ports(&self) -> Result<Vec<PortInfo>> {
        let ports = serialport::available_ports().map_err(Error::Serial)?;

        Ok(ports
            .into_iter()
            .map(port_info_from_native)
            .collect())
    }

    fn open(&self, config: &SerialConfig) -> Result<Box<dyn Port>> {
        Ok(Box::new(NativePort::open(config)?))
    }
}

fn port_info_from_native(p: serialport::SerialPortInfo) -> PortInfo {
    match p.port_type {
        SerialPortType::UsbPort(info) => {
            let description = info
                .product
                .clone()
                .or_else(|| {
                    info.manufacturer
                        .clone()
                })
                .unwrap_or_else(|| NO_DESCRIPTION.to_string());

            trace!(
                "USB port {} (VID: {:04X}, PID: {:04X}): {description}",
                p.port_name, info.vid, info.pid
            );

            PortInfo {
                name: p.port_name,
                description,
                vid: Some(info.vid),
                pid: Some(info.pid),
                manufacturer: info.manufacturer,
                serial_number: info.serial_number,
            }
        },
        _ => PortInfo::new(p.port_name, NO_DESCRIPTION),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serialport::{SerialPortInfo, UsbPortInfo};

    #[test]
    fn test_list_ports() {
        // This test just verifies that list_ports doesn't panic
        let _ = NativeBackend.list_ports();
    }

    #[test]
    fn test_usb_port_description_prefers_product() {
        let info = port_info_from_native(SerialPortInfo {
            port_name: "/dev/ttyACM0".to_string(),
            port_type: SerialPortType::UsbPort(UsbPortInfo {
                vid: 0x2341,
                pid: 0x0043,
                serial_number: Some("7573".to_string()),
                manufacturer: Some("Arduino (www.arduino.cc)".to_string()),
                product: Some("Arduino Uno".to_string()),
            }),
        });

        assert_eq!(info.name, "/dev/ttyACM0");
        assert_eq!(info.description, "Arduino Uno");
        assert_eq!(info.vid, Some(0x2341));
        assert_eq!(info.serial_number.as_deref(), Some("7573"));
    }

    #[test]
    fn test_usb_port_description_falls_back_to_manufacturer() {
        let info = port_info_from_native(SerialPortInfo {
            port_name: "/dev/ttyUSB0".to_string(),
            port_type: SerialPortType::UsbPort(UsbPortInfo {
                vid: 0x1A86,
                pid: 0x7523,
                serial_number: None,
                manufacturer: Some("QinHeng CH340".to_string()),
                product: None,
            }),
        });

        assert_eq!(info.description, "QinHeng CH340");
    }

    #[test]
    fn test_non_usb_port_has_placeholder_description() {
        let info = port_info_from_native(SerialPortInfo {
            port_name: "/dev/ttyS0".to_string(),
            port_type: SerialPortType::Unknown,
        });

        assert_eq!(info.description, "n/a");
        assert!(info.vid.is_none());
    }
}
