//! Entropy gathering for security bring-up.
//!
//! The logging pipeline does not consume entropy; this collaborator seeds
//! the secure random source during system initialization. Exhaustion is a
//! hard failure propagated to the caller; there is no silent fallback to a
//! weaker source.

use thiserror::Error;

/// Seed length handed to the secure random source.
pub const SEED_LEN: usize = 64;

/// Largest byte count a single gather request may ask for.
const MAX_REQUEST: usize = u16::MAX as usize;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EntropyError {
    /// The underlying source reported a non-recoverable status.
    #[error("entropy source failed with status {0}")]
    SourceFailed(i32),
    /// The source stopped producing bytes before the request was satisfied.
    #[error("entropy source exhausted before {requested} bytes were produced")]
    Exhausted { requested: usize },
    /// Request larger than the supported maximum.
    #[error("entropy request of {0} bytes exceeds the supported maximum")]
    RequestTooLarge(usize),
}

/// Low-level entropy source (hardware TRNG, OS pool, ...).
pub trait EntropySource {
    /// Fill up to `buf.len()` bytes, returning how many were produced.
    /// A short fill is normal; the caller polls again.
    fn poll(&mut self, buf: &mut [u8]) -> Result<usize, EntropyError>;
}

/// Fill `buf` completely, polling the source as often as needed.
///
/// A poll that makes no progress means the source is exhausted; that is
/// propagated rather than padded over.
pub fn gather<S: EntropySource>(source: &mut S, buf: &mut [u8]) -> Result<(), EntropyError> {
    let requested = buf.len();
    if requested > MAX_REQUEST {
        return Err(EntropyError::RequestTooLarge(requested));
    }

    let mut filled = 0;
    while filled < requested {
        let produced = source.poll(&mut buf[filled..])?;
        if produced == 0 {
            return Err(EntropyError::Exhausted { requested });
        }
        filled += produced;
    }
    Ok(())
}

/// Gather the seed material for the secure random source. The general
/// purpose PRNG is then seeded from that source by the caller.
pub fn seed_material<S: EntropySource>(source: &mut S) -> Result<[u8; SEED_LEN], EntropyError> {
    let mut seed = [0u8; SEED_LEN];
    gather(source, &mut seed)?;
    Ok(seed)
}
