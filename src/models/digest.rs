//! Record digest computation
//!
//! Staging datasets carry a precomputed digest column. This helper produces the
//! same SHA-256 digest for callers that populate staging themselves.

use sha2::{Digest, Sha256};

use super::types::Literal;

/// Field separator; keeps `("ab", "c")` and `("a", "bc")` apart
const SEPARATOR: u8 = 0x1f;

/// Compute a hex SHA-256 digest over ordered business values
///
/// # Example
///
/// ```rust
/// use data_persistence_sdk::models::{compute_digest, Literal};
///
/// let a = compute_digest(&[Literal::Integer(1), Literal::from("ANDY")]);
/// let b = compute_digest(&[Literal::Integer(1), Literal::from("ANDY")]);
/// assert_eq!(a, b);
/// assert_eq!(a.len(), 64);
/// ```
pub fn compute_digest(values: &[Literal]) -> String {
    let mut hasher = Sha256::new();
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            hasher.update([SEPARATOR]);
        }
        hasher.update(value.to_string().as_bytes());
    }
    format!("{:x}", hasher.finalize())
}
