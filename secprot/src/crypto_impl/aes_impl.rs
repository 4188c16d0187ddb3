use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use aes::Aes128;

use crate::crypto::*;

/// An alias for the AES-128 type from the aes crate.
pub type CrateAes128 = Aes128;
impl Aes128Enc for CrateAes128 {
    fn new(key: &[u8; AES_128_KEY_SIZE]) -> Self {
        KeyInit::new(key.into())
    }

    fn encrypt_in_place(&self, block: &mut [u8; AES_BLOCK_SIZE]) {
        self.encrypt_block(block.into())
    }
}
impl Aes128Dec for CrateAes128 {
    fn new(key: &[u8; AES_128_KEY_SIZE]) -> Self {
        KeyInit::new(key.into())
    }

    fn decrypt_in_place(&self, block: &mut [u8; AES_BLOCK_SIZE]) {
        self.decrypt_block(block.into())
    }
}
