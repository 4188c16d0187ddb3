use hmac::{Hmac, Mac};
use md5::{Digest, Md5};

use crate::crypto::*;

/// An alias for the MD5 type from the md-5 crate.
pub type CrateMd5 = Md5;
impl Md5Hash for CrateMd5 {
    fn new() -> Self {
        Digest::new()
    }

    fn update(&mut self, data: &[u8]) {
        Digest::update(self, data)
    }

    fn finish_and_reset(&mut self, output: &mut [u8; MD5_HASH_SIZE]) {
        *output = self.finalize_reset().into();
    }
}

/// HMAC-MD5 built from the md-5 and hmac crates.
pub struct CrateHmacMd5;
impl HmacMd5 for CrateHmacMd5 {
    fn new() -> Self {
        Self
    }

    fn hash(&mut self, key: &[u8], full_input: &[u8], output: &mut [u8; MD5_HASH_SIZE]) {
        let mut hm = Hmac::<Md5>::new_from_slice(key).expect("HMAC accepts keys of any length");
        hm.update(full_input);
        *output = hm.finalize().into_bytes().into();
    }
}
