//! Relay output over the Linux sysfs GPIO interface
//!
//! The pin is exported when opened and unexported when dropped. Writes go
//! through `/sys/class/gpio/gpioN/{direction,value}`.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Default sysfs GPIO root
pub const SYSFS_GPIO_ROOT: &str = "/sys/class/gpio";

/// Pin direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    In,
    Out,
}

impl Direction {
    fn as_sysfs(self) -> &'static str {
        match self {
            Self::In => "in",
            Self::Out => "out",
        }
    }
}

/// Output level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    High,
    Low,
}

impl Level {
    fn as_sysfs(self) -> &'static str {
        match self {
            Self::High => "1",
            Self::Low => "0",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::High => f.write_str("high"),
            Self::Low => f.write_str("low"),
        }
    }
}

/// A digital output driving the relay
#[cfg_attr(test, mockall::automock)]
pub trait OutputPin: Send {
    fn set_direction(&mut self, direction: Direction) -> Result<()>;

    fn set_level(&mut self, level: Level) -> Result<()>;
}

/// Linear pin number of `index` on GPIO bank `chip` (banks count from 1).
///
/// `None` when the bank is too large for a `u32` pin number.
pub const fn pin_number(chip: u32, index: u32) -> Option<u32> {
    match chip.saturating_sub(1).checked_mul(32) {
        Some(base) => base.checked_add(index & 31),
        None => None,
    }
}

/// Exported sysfs GPIO pin
#[derive(Debug)]
pub struct Gpio {
    root: PathBuf,
    pin: u32,
}

impl Gpio {
    /// Export pin `index` of bank `chip`
    pub fn open(chip: u32, index: u32) -> Result<Self> {
        Self::open_at(SYSFS_GPIO_ROOT, chip, index)
    }

    /// Export a pin under a different sysfs root
    pub fn open_at(root: impl AsRef<Path>, chip: u32, index: u32) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let pin = pin_number(chip, index).ok_or(Error::InvalidPin { chip, index })?;

        debug!(chip, index, pin, "Exporting GPIO");
        write_attr(&root.join("export"), &pin.to_string())
            .map_err(|source| Error::Gpio { pin, source })?;

        Ok(Self { root, pin })
    }

    pub fn pin(&self) -> u32 {
        self.pin
    }

    fn attr(&self, name: &str) -> PathBuf {
        self.root.join(format!("gpio{}", self.pin)).join(name)
    }

    fn write(&self, name: &str, value: &str) -> Result<()> {
        write_attr(&self.attr(name), value).map_err(|source| Error::Gpio {
            pin: self.pin,
            source,
        })
    }
}

impl OutputPin for Gpio {
    fn set_direction(&mut self, direction: Direction) -> Result<()> {
        debug!(pin = self.pin, ?direction, "GPIO direction");
        self.write("direction", direction.as_sysfs())
    }

    fn set_level(&mut self, level: Level) -> Result<()> {
        debug!(pin = self.pin, %level, "GPIO level");
        self.write("value", level.as_sysfs())
    }
}

impl Drop for Gpio {
    fn drop(&mut self) {
        if let Err(e) = write_attr(&self.root.join("unexport"), &self.pin.to_string()) {
            warn!(pin = self.pin, "Failed to unexport GPIO: {}", e);
        }
    }
}

fn write_attr(path: &Path, value: &str) -> io::Result<()> {
    fs::write(path, value)
}
