use std::time::Duration;

use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tokio_util::codec::{Decoder, Framed};

use crate::source::SourceError;

/// Splits the incoming byte stream into lines.
pub(crate) mod lines;

/// Serial transport parameters, supplied at startup and fixed for the
/// process lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialSettings {
    /// Path to the device, e.g. `/dev/ttyUSB0`.
    pub device: String,

    /// Baud rate. The controller speaks 9600.
    pub baud: u32,

    /// How long the driver may block on a single read.
    pub read_timeout: Duration,
}

impl SerialSettings {
    /// The open-handshake message published to the log.
    pub(crate) fn greeting(&self) -> String {
        format!(
            "Using serial device {} at {} baud, read timeout {:?}",
            self.device, self.baud, self.read_timeout
        )
    }
}

/// Open the device and frame it by lines.
///
/// The controller speaks 8N1 without flow control.
pub(crate) fn open(
    settings: &SerialSettings,
) -> Result<Framed<SerialStream, lines::LinesCodec>, SourceError> {
    let stream = tokio_serial::new(&settings.device, settings.baud)
        .data_bits(tokio_serial::DataBits::Eight)
        .parity(tokio_serial::Parity::None)
        .stop_bits(tokio_serial::StopBits::One)
        .flow_control(tokio_serial::FlowControl::None)
        .timeout(settings.read_timeout)
        .open_native_async()?;

    Ok(lines::LinesCodec::default().framed(stream))
}
