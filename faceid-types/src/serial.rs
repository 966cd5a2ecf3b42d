//! Serial port configuration

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default camera port for the current platform
#[cfg(windows)]
pub const DEFAULT_CAMERA_PORT: &str = "COM9";

/// Default camera port for the current platform
#[cfg(not(windows))]
pub const DEFAULT_CAMERA_PORT: &str = "/dev/ttyACM0";

/// Serial connection to the camera
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialConfig {
    /// Port name (`COM9`, `/dev/ttyACM0`, ...)
    pub port: String,
}

impl SerialConfig {
    pub fn new(port: impl Into<String>) -> Self {
        Self { port: port.into() }
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self::new(DEFAULT_CAMERA_PORT)
    }
}

impl fmt::Display for SerialConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.port)
    }
}

/// Parity bit setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Parity {
    None,
    Even,
    Odd,
}

/// Character framing, written in the conventional `8N1` shorthand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Framing {
    pub data_bits: u8,
    pub parity: Parity,
    pub stop_bits: u8,
}

impl Framing {
    /// 8 data bits, no parity, 1 stop bit
    pub const EIGHT_N_ONE: Self = Self {
        data_bits: 8,
        parity: Parity::None,
        stop_bits: 1,
    };
}

impl Default for Framing {
    fn default() -> Self {
        Self::EIGHT_N_ONE
    }
}

impl std::str::FromStr for Framing {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = s.as_bytes();
        if bytes.len() != 3 {
            return Err(Error::Parse(format!("framing must look like 8N1, got {s:?}")));
        }

        let data_bits = match bytes[0] {
            b @ b'5'..=b'8' => b - b'0',
            _ => return Err(Error::Parse(format!("invalid data bits in {s:?}"))),
        };
        let parity = match bytes[1].to_ascii_uppercase() {
            b'N' => Parity::None,
            b'E' => Parity::Even,
            b'O' => Parity::Odd,
            _ => return Err(Error::Parse(format!("invalid parity in {s:?}"))),
        };
        let stop_bits = match bytes[2] {
            b'1' => 1,
            b'2' => 2,
            _ => return Err(Error::Parse(format!("invalid stop bits in {s:?}"))),
        };

        Ok(Self {
            data_bits,
            parity,
            stop_bits,
        })
    }
}

impl TryFrom<String> for Framing {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Framing> for String {
    fn from(framing: Framing) -> String {
        framing.to_string()
    }
}

impl fmt::Display for Framing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parity = match self.parity {
            Parity::None => 'N',
            Parity::Even => 'E',
            Parity::Odd => 'O',
        };
        write!(f, "{}{}{}", self.data_bits, parity, self.stop_bits)
    }
}
