//! Request id generation.

use uuid::Uuid;

use crate::context::RequestId;
use crate::error::Error;

/// Source of fresh request ids.
///
/// Generated ids must be unique and should sort by creation time so that
/// log lines can be ordered by id alone.
pub trait IdGenerator: Send + Sync + 'static {
    /// Produces a new request id.
    fn generate(&self) -> Result<RequestId, Error>;
}

/// Generates time-ordered UUID v7 ids.
///
/// The `uuid` crate keeps a process-wide counter inside the millisecond, so
/// ids created in quick succession still sort in creation order.
///
/// # Example
///
/// ```
/// use hermes_core::{IdGenerator, UuidV7Generator};
///
/// let first = UuidV7Generator.generate().unwrap();
/// let second = UuidV7Generator.generate().unwrap();
/// assert!(first.as_str() < second.as_str());
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidV7Generator;

impl IdGenerator for UuidV7Generator {
    fn generate(&self) -> Result<RequestId, Error> {
        Ok(RequestId::new(Uuid::now_v7().to_string()))
    }
}
