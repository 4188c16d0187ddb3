/// The specified size of an AES-128 key.
pub const AES_128_KEY_SIZE: usize = 16;
/// The specified size of an AES block.
pub const AES_BLOCK_SIZE: usize = 16;

/// A trait for encrypting individual blocks of plaintext using AES-128.
/// It is used to wrap key data inside EAPOL key frames with the KEK.
///
/// Instances must securely delete their keys when dropped.
pub trait Aes128Enc: Sized {
    /// Create a new instance of this trait that uses the given key for encryption.
    fn new(key: &[u8; AES_128_KEY_SIZE]) -> Self;

    /// Encrypt the given `block` of plaintext directly using the AES block cipher.
    /// The ciphertext should be written directly back to `block`.
    fn encrypt_in_place(&self, block: &mut [u8; AES_BLOCK_SIZE]);
}

/// A trait for decrypting individual blocks of ciphertext using AES-128.
///
/// Instances must securely delete their keys when dropped.
pub trait Aes128Dec: Sized {
    /// Create a new instance of this trait that uses the given key for decryption.
    fn new(key: &[u8; AES_128_KEY_SIZE]) -> Self;

    /// Decrypt the given `block` of ciphertext directly using the AES block cipher.
    /// The plaintext should be written directly back out to `block`.
    fn decrypt_in_place(&self, block: &mut [u8; AES_BLOCK_SIZE]);
}
