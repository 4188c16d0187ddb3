/// The size of an MD5 digest, which is always 16 bytes.
pub const MD5_HASH_SIZE: usize = 16;

/// An MD5 implementation.
///
/// RADIUS uses MD5 for the Response-Authenticator and for the MS-MPPE key encryption stream.
/// Does not need to be threadsafe.
pub trait Md5Hash {
    /// Create a new instance of MD5 for streaming data to.
    fn new() -> Self;
    /// Update the instance of MD5 with input `data`.
    /// This must update the state of MD5 as if `data` was appended to the previous input.
    fn update(&mut self, data: &[u8]);
    /// Finish streaming input and output the final hash.
    ///
    /// This instance should be reset so that a new, independent hash can be generated.
    fn finish_and_reset(&mut self, output: &mut [u8; MD5_HASH_SIZE]);
}

/// An HMAC-MD5 implementation, used for the RADIUS Message-Authenticator attribute.
pub trait HmacMd5 {
    /// Allocate space for repeated Hmac invocations.
    fn new() -> Self;
    /// Pure function for computing a single HMAC. Repeat invocations of this function should
    /// have no effect on each other.
    fn hash(&mut self, key: &[u8], full_input: &[u8], output: &mut [u8; MD5_HASH_SIZE]);
}
