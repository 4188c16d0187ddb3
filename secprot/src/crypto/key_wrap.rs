use super::{Aes128Dec, Aes128Enc, AES_128_KEY_SIZE, AES_BLOCK_SIZE};

/// Length added to the plaintext by AES key wrap.
pub const KEY_WRAP_OVERHEAD: usize = 8;

const KEY_WRAP_IV: [u8; 8] = [0xa6; 8];

/// RFC 3394 AES key wrap of `plaintext` under `kek`.
///
/// The plaintext must be a multiple of 8 bytes and at least 16 bytes long, otherwise `None`
/// is returned. The output is 8 bytes longer than the input.
pub fn aes_key_wrap<E: Aes128Enc>(kek: &[u8; AES_128_KEY_SIZE], plaintext: &[u8]) -> Option<Vec<u8>> {
    if plaintext.len() % 8 != 0 || plaintext.len() < 16 {
        return None;
    }
    let n = plaintext.len() / 8;
    let aes = E::new(kek);
    let mut a = KEY_WRAP_IV;
    let mut r = plaintext.to_vec();
    let mut block = [0u8; AES_BLOCK_SIZE];
    for j in 0..6 {
        for i in 0..n {
            block[..8].copy_from_slice(&a);
            block[8..].copy_from_slice(&r[i * 8..i * 8 + 8]);
            aes.encrypt_in_place(&mut block);
            let t = (n * j + i + 1) as u64;
            a.copy_from_slice(&block[..8]);
            for (a, t) in a.iter_mut().zip(t.to_be_bytes()) {
                *a ^= t;
            }
            r[i * 8..i * 8 + 8].copy_from_slice(&block[8..]);
        }
    }
    let mut out = Vec::with_capacity(plaintext.len() + KEY_WRAP_OVERHEAD);
    out.extend_from_slice(&a);
    out.extend_from_slice(&r);
    Some(out)
}

/// RFC 3394 AES key unwrap of `ciphertext` under `kek`.
///
/// Returns `None` if the length is invalid or the integrity check value does not match.
pub fn aes_key_unwrap<D: Aes128Dec>(kek: &[u8; AES_128_KEY_SIZE], ciphertext: &[u8]) -> Option<Vec<u8>> {
    if ciphertext.len() % 8 != 0 || ciphertext.len() < 24 {
        return None;
    }
    let n = ciphertext.len() / 8 - 1;
    let aes = D::new(kek);
    let mut a = [0u8; 8];
    a.copy_from_slice(&ciphertext[..8]);
    let mut r = ciphertext[8..].to_vec();
    let mut block = [0u8; AES_BLOCK_SIZE];
    for j in (0..6).rev() {
        for i in (0..n).rev() {
            let t = (n * j + i + 1) as u64;
            for (a, t) in a.iter_mut().zip(t.to_be_bytes()) {
                *a ^= t;
            }
            block[..8].copy_from_slice(&a);
            block[8..].copy_from_slice(&r[i * 8..i * 8 + 8]);
            aes.decrypt_in_place(&mut block);
            a.copy_from_slice(&block[..8]);
            r[i * 8..i * 8 + 8].copy_from_slice(&block[8..]);
        }
    }
    block.fill(0);
    if super::secure_eq(&a, &KEY_WRAP_IV) {
        Some(r)
    } else {
        None
    }
}
