mod orbit;

pub use orbit::{ApiErrorBody, ApiErrorObject, OrbitError};

pub trait IsRetryable {
    fn is_retryable(&self) -> bool;
}
