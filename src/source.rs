use futures::StreamExt;
use thiserror::Error;
use tokio_serial::SerialStream;
use tokio_util::codec::Framed;

use crate::{
    mock::MockDevice,
    serial::{self, lines::LinesCodec, SerialSettings},
};

/// Failures a line source can report.
///
/// All of them mean the same thing to the supervisor: tear the
/// connection down and retry later.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Underlying IO problem.
    #[error("Underlying IO problem: {0}")]
    Io(#[from] std::io::Error),

    /// Problem reported by the serial driver.
    #[error("Serial device problem: {0}")]
    Serial(#[from] tokio_serial::Error),

    /// The line source went away mid-stream.
    #[error("Line source disconnected")]
    Disconnected,

    /// A scripted failure from a mock device.
    #[error("Mock device problem: {0}")]
    Mock(String),
}

/// Where lines come from.
#[derive(Debug, Clone)]
pub enum LineSource {
    /// A serial-attached device.
    Serial(SerialSettings),

    /// A scripted in-memory device.
    Mock(MockDevice),
}

impl LineSource {
    /// Attempt to open the source.
    ///
    /// On success, also yields the open-handshake messages the
    /// supervisor publishes to the log.
    pub(crate) fn open(&self) -> Result<(Connection, Vec<String>), SourceError> {
        match self {
            LineSource::Serial(settings) => {
                let framed = serial::open(settings)?;
                Ok((Connection::Serial(framed), vec![settings.greeting()]))
            }
            LineSource::Mock(device) => {
                device.try_open()?;
                Ok((Connection::Mock(device.clone()), vec![device.greeting()]))
            }
        }
    }
}

/// An open line source. Dropping it closes the underlying handle;
/// closing cannot fail observably.
pub(crate) enum Connection {
    Serial(Framed<SerialStream, LinesCodec>),
    Mock(MockDevice),
}

impl Connection {
    /// The next line off the wire, terminator stripped.
    pub(crate) async fn next_line(&mut self) -> Result<String, SourceError> {
        match self {
            Connection::Serial(framed) => match framed.next().await {
                Some(result) => result,
                None => Err(SourceError::Disconnected),
            },
            Connection::Mock(device) => device.next_line().await,
        }
    }
}
