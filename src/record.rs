use chrono::{DateTime, Utc};

/// The field delimiter used by the controller, kept in the canonical
/// rendering as well.
pub const FIELD_DELIMITER: &str = ";";

/// One parsed serial record plus its ingest time.
///
/// A record is a set of `;`-separated field values.
/// Whitespace around fields is stripped.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Record {
    received_at: DateTime<Utc>,
    fields: Vec<String>,
}

impl Record {
    /// Parse one raw line into a record.
    ///
    /// Returns `None` for lines carrying no reading: empty lines, and
    /// lines starting with a NUL byte (the controller emits those on a
    /// device glitch). That is not an error, just noise.
    pub fn parse(line: &str, received_at: DateTime<Utc>) -> Option<Self> {
        if line.is_empty() || line.starts_with('\0') {
            return None;
        }

        let line = line.trim_end();
        if line.is_empty() {
            return None;
        }

        let fields = line
            .split(FIELD_DELIMITER)
            .map(|field| field.trim().to_string())
            .collect();

        Some(Self {
            received_at,
            fields,
        })
    }

    /// When the record was read off the wire.
    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }

    /// The individual trimmed field values, in wire order.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// The record as one canonical delimited string.
    pub fn canonical(&self) -> String {
        self.fields.join(FIELD_DELIMITER)
    }

    /// The canonical string prefixed with the ingest timestamp,
    /// e.g. `1651246965;12.5;98.3;1`.
    pub fn composite(&self) -> String {
        format!("{};{}", self.received_at.timestamp(), self.canonical())
    }

    /// The name the record's history entry is published under:
    /// the ingest time as a decimal Unix timestamp.
    pub fn name(&self) -> String {
        self.received_at.timestamp().to_string()
    }
}
