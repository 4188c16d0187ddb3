use hmac::{Hmac, Mac};

use crate::crypto::*;

/// An alias for the SHA-256 type from the sha2 crate.
#[cfg(feature = "sha2")]
pub type CrateSha256 = sha2::Sha256;
#[cfg(feature = "sha2")]
impl Sha256Hash for CrateSha256 {
    fn new() -> Self {
        sha2::Digest::new()
    }

    fn update(&mut self, data: &[u8]) {
        sha2::Digest::update(self, data)
    }

    fn finish_and_reset(&mut self, output: &mut [u8; SHA256_HASH_SIZE]) {
        *output = sha2::Digest::finalize_reset(self).into();
    }
}

/// HMAC-SHA1 built from the sha1 and hmac crates.
#[cfg(feature = "sha1")]
pub struct CrateHmacSha1;
#[cfg(feature = "sha1")]
impl HmacSha1 for CrateHmacSha1 {
    fn new() -> Self {
        Self
    }

    fn hash(&mut self, key: &[u8], full_input: &[u8], output: &mut [u8; SHA1_HMAC_SIZE]) {
        let mut hm = Hmac::<sha1::Sha1>::new_from_slice(key).expect("HMAC accepts keys of any length");
        hm.update(full_input);
        *output = hm.finalize().into_bytes().into();
    }
}
