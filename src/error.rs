use std::{error, fmt};

// -------------------------------------------------------------------------------------------------

/// Provides an enumeration of all possible errors reported by granulite.
#[derive(Debug)]
pub enum Error {
    /// The rolling audio store would overflow its pre-allocated maximum duration.
    /// Fatal for the stream: the caller must bound the session length or construct
    /// the engine with a larger capacity up-front.
    CapacityExceeded { watermark: usize, capacity: usize },
    /// An invalid engine configuration or parameter value got rejected.
    ParameterError(String),
}

impl error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CapacityExceeded {
                watermark,
                capacity,
            } => {
                write!(
                    f,
                    "Rolling audio store capacity exceeded ({watermark} of {capacity} samples used)"
                )
            }
            Self::ParameterError(str) => write!(f, "Invalid parameter: {str}"),
        }
    }
}
