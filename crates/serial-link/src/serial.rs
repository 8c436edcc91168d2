//! System serial ports via the `serialport` crate.
//!
//! Feature-gated behind the `serial` Cargo feature (enabled by default).

use std::time::Duration;

use tracing::debug;

use crate::{
    LinkError, LinkStreams, PortProvider, SerialDataBits, SerialLink, SerialParity,
    SerialSettings, SerialStopBits,
};

/// Enumerates and opens the host's serial ports.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemPorts;

impl SystemPorts {
    /// Create a provider over the host's ports.
    pub fn new() -> Self {
        Self
    }
}

impl PortProvider for SystemPorts {
    /// **Note:** built with `serialport`'s default features disabled (no
    /// `libudev`). Enumeration on Linux falls back to sysfs and may return
    /// fewer details, but port names are always present.
    fn list_ports(&self) -> Vec<String> {
        serialport::available_ports()
            .unwrap_or_default()
            .into_iter()
            .map(|p| p.port_name)
            .collect()
    }

    fn open(&self, name: &str, timeout: Duration) -> Result<Box<dyn SerialLink>, LinkError> {
        let settings = SerialSettings::zwave();
        match serialport::new(name, settings.baud_rate).timeout(timeout).open() {
            Ok(port) => {
                debug!(port = name, "serial port opened");
                Ok(Box::new(SystemLink {
                    name: name.to_string(),
                    port: Some(port),
                }))
            }
            Err(e) => {
                let listed = self.list_ports().iter().any(|p| p == name);
                Err(classify_open_error(name, &e, listed))
            }
        }
    }
}

/// Map a driver error from `open` onto the console's availability errors.
fn classify_open_error(name: &str, e: &serialport::Error, listed: bool) -> LinkError {
    use serialport::ErrorKind;
    use std::io::ErrorKind as Io;

    let port = name.to_string();
    match e.kind() {
        ErrorKind::NoDevice | ErrorKind::Io(Io::NotFound) if !listed => {
            LinkError::PortNotFound { port }
        }
        ErrorKind::Io(Io::PermissionDenied) | ErrorKind::Io(Io::ResourceBusy) => {
            LinkError::PortBusy { port }
        }
        _ if e.description.to_ascii_lowercase().contains("busy") => LinkError::PortBusy { port },
        _ if !listed => LinkError::PortNotFound { port },
        _ => LinkError::OpenFailed {
            port,
            reason: e.to_string(),
        },
    }
}

/// An opened host serial port.
pub struct SystemLink {
    name: String,
    /// The underlying handle; `None` once closed.
    port: Option<Box<dyn serialport::SerialPort>>,
}

impl SystemLink {
    fn port_mut(&mut self) -> Result<&mut Box<dyn serialport::SerialPort>, LinkError> {
        match self.port.as_mut() {
            Some(port) => Ok(port),
            None => Err(LinkError::Closed {
                port: self.name.clone(),
            }),
        }
    }

    fn configure_failed(&self, e: serialport::Error) -> LinkError {
        LinkError::ConfigureFailed {
            port: self.name.clone(),
            reason: e.to_string(),
        }
    }
}

impl SerialLink for SystemLink {
    fn name(&self) -> &str {
        &self.name
    }

    fn configure(&mut self, settings: &SerialSettings) -> Result<(), LinkError> {
        let data_bits = match settings.data_bits {
            SerialDataBits::Seven => serialport::DataBits::Seven,
            SerialDataBits::Eight => serialport::DataBits::Eight,
        };
        let stop_bits = match settings.stop_bits {
            SerialStopBits::One => serialport::StopBits::One,
            SerialStopBits::Two => serialport::StopBits::Two,
        };
        let parity = match settings.parity {
            SerialParity::None => serialport::Parity::None,
            SerialParity::Odd => serialport::Parity::Odd,
            SerialParity::Even => serialport::Parity::Even,
        };

        let port = self.port_mut()?;
        let applied = port
            .set_baud_rate(settings.baud_rate)
            .and_then(|()| port.set_data_bits(data_bits))
            .and_then(|()| port.set_stop_bits(stop_bits))
            .and_then(|()| port.set_parity(parity))
            .and_then(|()| port.set_flow_control(serialport::FlowControl::None));
        applied.map_err(|e| self.configure_failed(e))
    }

    fn set_receive_timeout(&mut self, timeout: Duration) -> Result<(), LinkError> {
        let port = self.port_mut()?;
        let applied = port.set_timeout(timeout);
        applied.map_err(|e| self.configure_failed(e))
    }

    /// Both halves are cloned handles of the same device; they keep their
    /// own descriptors until the controller drops them.
    fn split(&mut self) -> Result<LinkStreams, LinkError> {
        let port = self.port_mut()?;
        let reader = port.try_clone();
        let writer = port.try_clone();
        match (reader, writer) {
            (Ok(reader), Ok(writer)) => Ok(LinkStreams {
                reader: Box::new(reader),
                writer: Box::new(writer),
            }),
            (Err(e), _) | (_, Err(e)) => Err(self.configure_failed(e)),
        }
    }

    fn close(&mut self) {
        if self.port.take().is_some() {
            debug!(port = %self.name, "serial port closed");
        }
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }
}

impl Drop for SystemLink {
    fn drop(&mut self) {
        self.close();
    }
}
