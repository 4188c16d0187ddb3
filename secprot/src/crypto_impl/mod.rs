/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 *
 * (c) ZeroTier, Inc.
 * https://www.zerotier.com/
 */
#[cfg(feature = "md-5")]
mod md5_impl;
#[cfg(feature = "md-5")]
pub use md5;
#[cfg(feature = "md-5")]
pub use md5_impl::*;

#[cfg(any(feature = "sha2", feature = "sha1"))]
mod sha_impl;
#[cfg(any(feature = "sha2", feature = "sha1", feature = "md-5"))]
pub use hmac;
#[cfg(feature = "sha1")]
pub use sha1;
#[cfg(feature = "sha2")]
pub use sha2;
#[cfg(any(feature = "sha2", feature = "sha1"))]
pub use sha_impl::*;

#[cfg(feature = "aes")]
mod aes_impl;
#[cfg(feature = "aes")]
pub use aes;
#[cfg(feature = "aes")]
pub use aes_impl::*;

/// Implement this trait to get a `CryptoLayer` built from the default crate backed
/// implementations, choosing only the random number generator.
#[cfg(feature = "default-crypto")]
pub trait DefaultCrypto {
    type Rng: rand_core::CryptoRng + rand_core::RngCore;
}
#[cfg(feature = "default-crypto")]
impl<C: DefaultCrypto> crate::application::CryptoLayer for C {
    type Rng = C::Rng;
    type Md5 = CrateMd5;
    type HmacMd5 = CrateHmacMd5;
    type Sha256 = CrateSha256;
    type HmacSha1 = CrateHmacSha1;
    type AesEnc = CrateAes128;
    type AesDec = CrateAes128;
}
