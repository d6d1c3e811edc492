// Error taxonomy shared by the whole crate.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("location out of range: lat {lat}, lng {lng}")]
    InvalidLocation { lat: f64, lng: f64 },

    #[error("network failure after {attempts} attempts: {last}")]
    Network { attempts: u32, last: String },

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("malformed response payload: {0}")]
    Parse(String),

    #[error("no usable route returned by the provider")]
    RouteGeneration,

    #[error("{operation} requires {required}")]
    State {
        operation: &'static str,
        required: &'static str,
    },
}

impl Error {
    // Non-2xx responses and transport failures are retried; everything else
    // aborts the attempt loop immediately.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Http { .. } | Error::Network { .. })
    }
}
