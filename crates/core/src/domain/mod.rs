pub mod activity;
pub mod catalog;
pub mod commerce;

use uuid::Uuid;

/// Anything addressable by a stable entity id. Cursors and join-back keys
/// are both built on this.
pub trait Identified {
    fn id(&self) -> Uuid;
}

/// Parses a path or query id.
pub fn parse_id(raw: &str) -> Result<Uuid, crate::error::CoreError> {
    Uuid::parse_str(raw.trim()).map_err(|_| crate::error::CoreError::InvalidId(raw.to_string()))
}
