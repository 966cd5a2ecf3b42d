//! Serial port transport
//!
//! Opens a tty device through `tokio-serial` with the requested baud rate and
//! framing. `receive` waits for the first chunk of data or until its timeout
//! expires.

use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::timeout;
use tokio_serial::{
    DataBits, FlowControl, Parity as SerialParity, SerialPortBuilderExt, SerialStream, StopBits,
};
use tracing::{debug, trace, warn};

use faceid_types::{Framing, Parity};

use crate::{error::*, Transport};

/// Default baud rate of auxiliary boards
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

const READ_CHUNK: usize = 4096;

/// Serial transport over a tty device
pub struct SerialTransport {
    path: String,
    baud_rate: u32,
    framing: Framing,
    stream: Option<SerialStream>,
}

impl SerialTransport {
    /// Create new serial transport (115200 8N1)
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            baud_rate: DEFAULT_BAUD_RATE,
            framing: Framing::EIGHT_N_ONE,
            stream: None,
        }
    }

    /// Set baud rate
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Set character framing
    pub fn with_framing(mut self, framing: Framing) -> Self {
        self.framing = framing;
        self
    }

    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    pub fn framing(&self) -> Framing {
        self.framing
    }
}

#[async_trait]
impl Transport for SerialTransport {
    async fn connect(&mut self) -> Result<()> {
        if self.is_connected() {
            return Err(Error::AlreadyConnected);
        }

        if self.path.is_empty() {
            return Err(Error::InvalidPort("empty port name".into()));
        }

        debug!(
            "Opening {} at {} {}...",
            self.path, self.baud_rate, self.framing
        );

        let baud_rate = check_baud_rate(self.baud_rate)?;

        let stream = tokio_serial::new(&self.path, baud_rate)
            .data_bits(data_bits(self.framing))
            .parity(parity(self.framing))
            .stop_bits(stop_bits(self.framing))
            .flow_control(FlowControl::None)
            .open_native_async()
            .map_err(|e| {
                warn!("Can not open {}: {}", self.path, e);
                Error::Io(e.into())
            })?;

        debug!("Opened {}", self.path);

        self.stream = Some(stream);
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        if let Some(mut stream) = self.stream.take() {
            debug!("Closing {}...", self.path);
            let _ = stream.flush().await;
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    async fn send(&mut self, data: &[u8]) -> Result<()> {
        let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;

        trace!("Sending {} bytes: {}", data.len(), hex::encode(data));

        stream.write_all(data).await?;
        stream.flush().await?;

        Ok(())
    }

    async fn receive(&mut self, limit: Duration) -> Result<BytesMut> {
        let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;

        let mut buf = BytesMut::with_capacity(READ_CHUNK);

        let n = match timeout(limit, stream.read_buf(&mut buf)).await {
            Ok(read) => read?,
            Err(_) => return Err(Error::ReadTimeout),
        };

        if n == 0 {
            debug!("{} closed", self.path);
            return Err(Error::ConnectionClosed);
        }

        trace!("Received {} bytes: {}", n, hex::encode(&buf[..n]));
        Ok(buf)
    }

    fn port_name(&self) -> String {
        self.path.clone()
    }
}

impl Drop for SerialTransport {
    fn drop(&mut self) {
        if self.is_connected() {
            debug!("Serial transport {} dropped while open", self.path);
        }
    }
}

/// Check that `baud_rate` is one of the standard tty speeds
pub fn check_baud_rate(baud_rate: u32) -> Result<u32> {
    match baud_rate {
        1200 | 2400 | 4800 | 9600 | 19200 | 38400 | 57600 | 115200 | 230400 => Ok(baud_rate),
        other => Err(Error::UnsupportedBaudRate(other)),
    }
}

fn data_bits(framing: Framing) -> DataBits {
    match framing.data_bits {
        5 => DataBits::Five,
        6 => DataBits::Six,
        7 => DataBits::Seven,
        _ => DataBits::Eight,
    }
}

fn parity(framing: Framing) -> SerialParity {
    match framing.parity {
        Parity::None => SerialParity::None,
        Parity::Even => SerialParity::Even,
        Parity::Odd => SerialParity::Odd,
    }
}

fn stop_bits(framing: Framing) -> StopBits {
    if framing.stop_bits == 2 {
        StopBits::Two
    } else {
        StopBits::One
    }
}
