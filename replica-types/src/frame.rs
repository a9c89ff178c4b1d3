//! Length-prefixed framing.
//!
//! Each message is preceded by a 4-byte big-endian length. The reader checks
//! the announced length against its limit before allocating.

use crate::ReplicaError;

/// Size of the length prefix in bytes.
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Default maximum message size (16MB).
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Prefix `payload` with its length.
pub fn encode_frame(payload: &[u8], limit: usize) -> Result<Vec<u8>, ReplicaError> {
    if payload.len() > limit || payload.len() > u32::MAX as usize {
        return Err(ReplicaError::MessageTooLarge {
            size: payload.len(),
            limit,
        });
    }

    let mut frame = Vec::with_capacity(LENGTH_PREFIX_SIZE + payload.len());
    frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    frame.extend_from_slice(payload);
    Ok(frame)
}

/// Parse a length prefix and validate it against `limit`.
pub fn decode_length(
    header: [u8; LENGTH_PREFIX_SIZE],
    limit: usize,
) -> Result<usize, ReplicaError> {
    let len = u32::from_be_bytes(header) as usize;
    if len > limit {
        return Err(ReplicaError::MessageTooLarge { size: len, limit });
    }
    Ok(len)
}
