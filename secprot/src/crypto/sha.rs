/// The size of a SHA-256 hash, which is always 32 bytes.
pub const SHA256_HASH_SIZE: usize = 32;
/// The size of an HMAC-SHA1 output, which is always 20 bytes.
pub const SHA1_HMAC_SIZE: usize = 20;

/// A SHA-256 implementation.
///
/// Used for GTK hashes and for hashing EUI-64 addresses into RADIUS station identifiers.
/// Does not need to be threadsafe.
pub trait Sha256Hash {
    /// Create a new instance of SHA-256 for streaming data to.
    fn new() -> Self;
    /// Update the instance of SHA-256 with input `data`.
    fn update(&mut self, data: &[u8]);
    /// Finish streaming input and output the final hash.
    ///
    /// This instance should be reset so that a new, independent hash can be generated.
    fn finish_and_reset(&mut self, output: &mut [u8; SHA256_HASH_SIZE]);
}

/// An HMAC-SHA1 implementation, used for EAPOL key frame MICs (truncated to 128 bits).
pub trait HmacSha1 {
    /// Allocate space for repeated Hmac invocations.
    fn new() -> Self;
    /// Pure function for computing a single HMAC.
    fn hash(&mut self, key: &[u8], full_input: &[u8], output: &mut [u8; SHA1_HMAC_SIZE]);
}
