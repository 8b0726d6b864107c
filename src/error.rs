use thiserror::Error;

/// Errors that may occur in this library.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// No entry with the given name is currently published.
    #[error("No entry at `{0}`")]
    NoSuchEntry(String),

    /// The configuration is not usable.
    #[error("Bad configuration. Problem: `{0}`")]
    BadConfig(String),

    /// A line in the projections file does not have the
    /// `name=expression` shape.
    #[error("Bad projection rule `{0}`, expected `name=expression`")]
    BadRule(String),

    /// A projection expression could not be evaluated against the
    /// current batch.
    #[error("Projection `{name}` failed: {problem}")]
    Projection {
        /// The rule's name.
        name: String,

        /// What went wrong during evaluation.
        problem: String,
    },
}

impl Error {
    /// Borrow the no-such-entry name, if that is the variant.
    pub fn as_no_such_entry(&self) -> Option<&String> {
        if let Self::NoSuchEntry(v) = self {
            Some(v)
        } else {
            None
        }
    }

    /// Extract the bad-config message, else get self back.
    pub fn try_into_bad_config(self) -> Result<String, Self> {
        if let Self::BadConfig(v) = self {
            Ok(v)
        } else {
            Err(self)
        }
    }
}
