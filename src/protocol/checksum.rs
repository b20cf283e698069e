//! Adler-32 rolling checksum, as carried in the `CHECKSUM` field of every frame.
//!
//! The board computes the value over the ASCII bytes of the payload and sends it
//! in decimal. Output matches zlib's `adler32` with the standard initial value of 1.

/// Compute the Adler-32 checksum of `data`.
pub fn adler32(data: &[u8]) -> u32 {
    let mut hasher = adler2::Adler32::new();
    hasher.write_slice(data);
    hasher.checksum()
}
