use arrayvec::ArrayString;
use rand_core::RngCore;
use zeroize::Zeroizing;

use crate::crypto::{Sha256Hash, SHA256_HASH_SIZE};
use crate::proto::*;

/// Connection parameters of the RADIUS server.
pub struct RadiusConfig {
    pub secret: Zeroizing<Vec<u8>>,
    /// Sent as NAS-IPv6-Address when set.
    pub nas_ipv6_address: Option<[u8; NAS_IPV6_ADDRESS_LEN]>,
}

impl RadiusConfig {
    pub fn new(secret: &[u8], nas_ipv6_address: Option<[u8; NAS_IPV6_ADDRESS_LEN]>) -> Self {
        Self { secret: Zeroizing::new(secret.to_vec()), nas_ipv6_address }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct IdRange {
    in_use: bool,
    /// Seconds until an unused claimed range is taken back.
    expiry: u16,
    /// Seconds until a released range may be handed out again.
    cooldown: u16,
    next: u8,
    generation: u32,
}

/// A claimed identifier range. It goes stale once the range expires or is released, so a
/// holder can never take identifiers from the range's next owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RadiusIdRange {
    pub index: usize,
    generation: u32,
}

/// The RADIUS identifier space split into ranges, one range per RADIUS client instance.
///
/// A claimed range expires `RADIUS_ID_TIMEOUT` seconds after its last identifier was handed
/// out. Identifiers of a released or expired range are not reused until a late response to
/// them can no longer arrive.
#[derive(Debug, Clone)]
pub struct RadiusIdPool {
    ranges: [IdRange; RADIUS_ID_RANGE_NUM],
    generation: u32,
    ticks: u32,
}

impl Default for RadiusIdPool {
    fn default() -> Self {
        Self { ranges: [IdRange::default(); RADIUS_ID_RANGE_NUM], generation: 0, ticks: 0 }
    }
}

impl RadiusIdPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims a free range. None when every range is in use or cooling down.
    pub fn range_allocate(&mut self) -> Option<RadiusIdRange> {
        let index = self.ranges.iter().position(|r| !r.in_use && r.cooldown == 0)?;
        self.generation = self.generation.wrapping_add(1);
        self.ranges[index] = IdRange { in_use: true, expiry: RADIUS_ID_TIMEOUT, cooldown: 0, next: 0, generation: self.generation };
        Some(RadiusIdRange { index, generation: self.generation })
    }

    fn held_mut(&mut self, range: RadiusIdRange) -> Option<&mut IdRange> {
        self.ranges.get_mut(range.index).filter(|r| r.in_use && r.generation == range.generation)
    }

    pub fn is_held(&self, range: RadiusIdRange) -> bool {
        self.ranges.get(range.index).map_or(false, |r| r.in_use && r.generation == range.generation)
    }

    /// Next identifier of a claimed range, None once its identifiers are used up or the range
    /// is no longer held. Restarts the range's expiry timer.
    pub fn id_allocate(&mut self, range: RadiusIdRange) -> Option<u8> {
        let r = self.held_mut(range)?;
        if r.next as usize >= RADIUS_ID_RANGE_SIZE {
            return None;
        }
        let id = range.index * RADIUS_ID_RANGE_SIZE + r.next as usize;
        r.next += 1;
        r.expiry = RADIUS_ID_TIMEOUT;
        Some(id as u8)
    }

    pub fn range_release(&mut self, range: RadiusIdRange) {
        if let Some(r) = self.held_mut(range) {
            r.in_use = false;
            r.cooldown = RADIUS_ID_TIMEOUT / 5;
        }
    }

    pub fn timer_timeout(&mut self, ticks: u16) {
        self.ticks += ticks as u32;
        let seconds = self.ticks / SECONDS_TICKS;
        if seconds == 0 {
            return;
        }
        self.ticks %= SECONDS_TICKS;
        let seconds = seconds.min(u16::MAX as u32) as u16;
        for (index, r) in self.ranges.iter_mut().enumerate() {
            if !r.in_use {
                r.cooldown = r.cooldown.saturating_sub(seconds);
            } else if r.expiry > seconds {
                r.expiry -= seconds;
            } else {
                tracing::debug!("RADIUS identifier range {} expired", index);
                r.in_use = false;
                r.expiry = 0;
                r.cooldown = RADIUS_ID_TIMEOUT / 5;
            }
        }
    }

    pub fn in_use_count(&self) -> usize {
        self.ranges.iter().filter(|r| r.in_use).count()
    }
}

/// RADIUS state shared by all sessions of an interface.
pub struct RadiusShared {
    pub config: Option<RadiusConfig>,
    /// Salt hashed with EUI-64 addresses into station identifiers.
    pub salt: [u8; RADIUS_SALT_LEN],
    pub pool: RadiusIdPool,
}

impl RadiusShared {
    pub fn new<R: RngCore>(rng: &mut R) -> Self {
        let mut salt = [0u8; RADIUS_SALT_LEN];
        rng.fill_bytes(&mut salt);
        Self { config: None, salt, pool: RadiusIdPool::new() }
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_some()
    }
}

/// Station identifier for an EUI-64: the first 8 bytes of SHA-256(EUI-64 || salt) as
/// hyphenated uppercase hex, such as `0A-1B-2C-3D-4E-5F-60-71`.
pub fn station_id<H: Sha256Hash>(eui64: &[u8; EUI64_LEN], salt: &[u8]) -> ArrayString<STATION_ID_LEN> {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    let mut hash = [0u8; SHA256_HASH_SIZE];
    let mut sha = H::new();
    sha.update(eui64);
    sha.update(salt);
    sha.finish_and_reset(&mut hash);

    let mut out = ArrayString::new();
    for (i, b) in hash[..EUI64_LEN].iter().enumerate() {
        if i > 0 {
            out.push('-');
        }
        out.push(HEX[(b >> 4) as usize] as char);
        out.push(HEX[(b & 0xf) as usize] as char);
    }
    out
}
