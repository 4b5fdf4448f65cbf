//! BLAKE3 digests used for cache keys.

/// Length in hex characters of [`digest_hex`] output.
pub const DIGEST_HEX_LEN: usize = 64;

/// Returns the full 256-bit BLAKE3 digest of `input` as lowercase hex.
///
/// # Collision Probability
///
/// Search keys are built from an unbounded filter space, so the digest is kept at the full
/// 256 bits rather than truncated. With ~128 bits of collision resistance, two distinct
/// canonical filter strings sharing a digest is computationally infeasible; tests treat it
/// as impossible.
#[inline]
pub fn digest_hex(input: &str) -> String {
    blake3::hash(input.as_bytes()).to_hex().to_string()
}

/// Digest of several parts joined with `|`, without building the joined string.
pub fn digest_parts_hex<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    let mut hasher = blake3::Hasher::new();
    for (i, part) in parts.into_iter().enumerate() {
        if i > 0 {
            hasher.update(b"|");
        }
        hasher.update(part.as_bytes());
    }
    hasher.finalize().to_hex().to_string()
}
