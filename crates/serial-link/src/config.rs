//! Line settings and timeouts for the controller link.

use std::time::Duration;

/// Number of data bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerialDataBits {
    /// 7 data bits.
    Seven,
    /// 8 data bits.
    Eight,
}

/// Number of stop bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerialStopBits {
    /// One stop bit.
    One,
    /// Two stop bits.
    Two,
}

/// Parity checking mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerialParity {
    /// No parity bit.
    None,
    /// Odd parity.
    Odd,
    /// Even parity.
    Even,
}

/// Serial line framing.
///
/// Z-Wave controllers speak 115200 8N1; [`SerialSettings::zwave`] returns
/// exactly that and is what the console always applies.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialSettings {
    /// Baud rate.
    pub baud_rate: u32,
    /// Data bits per character.
    pub data_bits: SerialDataBits,
    /// Stop bits.
    pub stop_bits: SerialStopBits,
    /// Parity.
    pub parity: SerialParity,
}

impl SerialSettings {
    /// 115200 baud, 8 data bits, 1 stop bit, no parity.
    pub fn zwave() -> Self {
        Self {
            baud_rate: 115_200,
            data_bits: SerialDataBits::Eight,
            stop_bits: SerialStopBits::One,
            parity: SerialParity::None,
        }
    }
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self::zwave()
    }
}

impl std::fmt::Display for SerialSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let bits = match self.data_bits {
            SerialDataBits::Seven => 7,
            SerialDataBits::Eight => 8,
        };
        let parity = match self.parity {
            SerialParity::None => 'N',
            SerialParity::Odd => 'O',
            SerialParity::Even => 'E',
        };
        let stop = match self.stop_bits {
            SerialStopBits::One => 1,
            SerialStopBits::Two => 2,
        };
        write!(f, "{} {bits}{parity}{stop}", self.baud_rate)
    }
}

/// Timeout settings for the controller link.
///
/// - `open`: 2 s to acquire the port
/// - `receive`: 500 s per blocking read; the controller is mostly silent
///   between unsolicited reports, so reads are allowed to idle for a long time
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkTimeouts {
    /// Maximum time to wait for the port to open.
    pub open: Duration,
    /// Maximum time a single read may block.
    pub receive: Duration,
}

impl Default for LinkTimeouts {
    fn default() -> Self {
        Self {
            open: Duration::from_millis(2000),
            receive: Duration::from_millis(500_000),
        }
    }
}
