use zeroize::Zeroizing;

use crate::crypto::{Sha256Hash, SHA256_HASH_SIZE};
use crate::proto::*;

/// Life cycle of a GTK slot. Keys move forward only: a key that has been active is never
/// made fresh again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GtkStatus {
    #[default]
    New,
    Fresh,
    Active,
    Old,
}

/// Result of comparing the GTK hash list heard from the network with the local keys.
/// Ordered by severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GtkMismatch {
    NoMismatch,
    LifetimeMismatch,
    HashMismatch,
}

#[derive(Default)]
struct GtkSlot {
    key: Zeroizing<[u8; GTK_LEN]>,
    set: bool,
    lifetime: u32,
    status: GtkStatus,
    install_order: u8,
}

/// The GTKs of an interface.
///
/// The authenticator owns one table for all of its supplicants, a supplicant owns the table
/// it learns through group key handshakes.
#[derive(Default)]
pub struct SecProtGtkKeys {
    gtk: [GtkSlot; GTK_NUM],
    updated: bool,
}

/// Truncate-64(SHA-256(GTK)).
pub fn gtk_hash_generate<H: Sha256Hash>(gtk: &[u8; GTK_LEN]) -> [u8; GTK_HASH_LEN] {
    let mut h = H::new();
    h.update(gtk);
    let mut full = [0u8; SHA256_HASH_SIZE];
    h.finish_and_reset(&mut full);
    let mut hash = [0u8; GTK_HASH_LEN];
    hash.copy_from_slice(&full[..GTK_HASH_LEN]);
    hash
}

/// An all zero GTK is not a valid key.
pub fn gtk_valid_check(gtk: &[u8; GTK_LEN]) -> bool {
    gtk.iter().any(|b| *b != 0)
}

impl SecProtGtkKeys {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        for index in 0..GTK_NUM as u8 {
            self.gtk_clear(index);
        }
        self.updated = false;
    }

    pub fn is_updated(&self) -> bool {
        self.updated
    }

    pub fn updated_set(&mut self) {
        self.updated = true;
    }

    pub fn updated_reset(&mut self) {
        self.updated = false;
    }

    fn slot(&self, index: u8) -> Option<&GtkSlot> {
        self.gtk.get(index as usize)
    }

    pub fn gtk_is_set(&self, index: u8) -> bool {
        self.slot(index).map_or(false, |s| s.set)
    }

    pub fn gtk_get(&self, index: u8) -> Option<&[u8; GTK_LEN]> {
        self.slot(index).filter(|s| s.set).map(|s| &*s.key)
    }

    pub fn gtk_count(&self) -> usize {
        self.gtk.iter().filter(|s| s.set).count()
    }

    /// Installs a GTK. Returns false, and changes nothing, if the index is invalid, the key is
    /// all zeros, or the same key is already installed at the index.
    pub fn gtk_set(&mut self, index: u8, gtk: &[u8; GTK_LEN], lifetime: u32) -> bool {
        if index as usize >= GTK_NUM || !gtk_valid_check(gtk) {
            return false;
        }
        let slot = &self.gtk[index as usize];
        if slot.set && *slot.key == *gtk {
            return false;
        }
        self.gtk_clear(index);
        let install_order = self.gtk_count() as u8;
        let slot = &mut self.gtk[index as usize];
        slot.key.copy_from_slice(gtk);
        slot.set = true;
        slot.lifetime = lifetime;
        slot.status = GtkStatus::New;
        slot.install_order = install_order;
        self.updated = true;
        true
    }

    /// Clears a slot, keeping the install order of the remaining keys dense.
    pub fn gtk_clear(&mut self, index: u8) -> bool {
        let Some(slot) = self.gtk.get_mut(index as usize) else {
            return false;
        };
        if !slot.set {
            return false;
        }
        let order = slot.install_order;
        *slot = GtkSlot::default();
        for s in self.gtk.iter_mut().filter(|s| s.set && s.install_order > order) {
            s.install_order -= 1;
        }
        self.updated = true;
        true
    }

    pub fn gtk_lifetime_get(&self, index: u8) -> u32 {
        self.slot(index).map_or(0, |s| s.lifetime)
    }

    /// Decrements the lifetime of a key. Returns the remaining lifetime, zero when expired.
    pub fn gtk_lifetime_decrement(&mut self, index: u8, seconds: u32) -> u32 {
        match self.gtk.get_mut(index as usize) {
            Some(slot) if slot.set => {
                slot.lifetime = slot.lifetime.saturating_sub(seconds);
                slot.lifetime
            }
            _ => 0,
        }
    }

    pub fn gtk_status_get(&self, index: u8) -> GtkStatus {
        self.slot(index).map_or(GtkStatus::New, |s| s.status)
    }

    pub fn gtk_status_fresh_set(&mut self, index: u8) {
        if let Some(slot) = self.gtk.get_mut(index as usize) {
            if slot.set && slot.status == GtkStatus::New {
                slot.status = GtkStatus::Fresh;
            }
        }
    }

    pub fn gtk_status_all_fresh_set(&mut self) {
        for index in 0..GTK_NUM as u8 {
            self.gtk_status_fresh_set(index);
        }
    }

    /// Activates a fresh key. A previously active key becomes old.
    pub fn gtk_status_active_set(&mut self, index: u8) -> bool {
        match self.slot(index) {
            Some(s) if s.set && s.status == GtkStatus::Fresh => {}
            _ => return false,
        }
        for slot in self.gtk.iter_mut().filter(|s| s.status == GtkStatus::Active) {
            slot.status = GtkStatus::Old;
        }
        self.gtk[index as usize].status = GtkStatus::Active;
        true
    }

    pub fn gtk_status_active_get(&self) -> Option<u8> {
        self.gtk.iter().position(|s| s.set && s.status == GtkStatus::Active).map(|i| i as u8)
    }

    /// Fresh and active keys are the ones advertised to peers.
    pub fn gtk_status_is_live(&self, index: u8) -> bool {
        self.gtk_is_set(index) && matches!(self.gtk_status_get(index), GtkStatus::Fresh | GtkStatus::Active)
    }

    fn gtk_install_order_get(&self, order: u8) -> Option<u8> {
        self.gtk.iter().position(|s| s.set && s.install_order == order).map(|i| i as u8)
    }

    /// Index of the oldest installed key.
    pub fn gtk_install_order_first_get(&self) -> Option<u8> {
        self.gtk_install_order_get(0)
    }

    pub fn gtk_install_order_second_get(&self) -> Option<u8> {
        self.gtk_install_order_get(1)
    }

    /// Index of the newest installed key.
    pub fn gtk_install_order_last_get(&self) -> Option<u8> {
        self.gtk_install_order_get(self.gtk_count().checked_sub(1)? as u8)
    }

    /// Slot for the next new key: the first free slot, else the oldest key.
    pub fn gtk_install_index_get(&self) -> Option<u8> {
        match self.gtk.iter().position(|s| !s.set) {
            Some(i) => Some(i as u8),
            None => self.gtk_install_order_first_get(),
        }
    }

    /// Hash list of all slots, an unset slot hashes to zeros.
    pub fn gtks_hash_generate<H: Sha256Hash>(&self) -> [u8; GTK_ALL_HASHES_LEN] {
        let mut hashes = [0u8; GTK_ALL_HASHES_LEN];
        for (slot, hash) in self.gtk.iter().zip(hashes.chunks_exact_mut(GTK_HASH_LEN)) {
            if slot.set {
                hash.copy_from_slice(&gtk_hash_generate::<H>(&slot.key));
            }
        }
        hashes
    }

    /// Reconciles the keys with a hash list heard from the network.
    ///
    /// A zero hash clears the slot; if the key still had more than `GTK_EXPIRE_MISMATCH_TIME`
    /// left this is a lifetime mismatch. A non zero hash that does not match the local key
    /// (or names a slot without a key) clears the slot and is a hash mismatch. The most severe
    /// mismatch seen is returned.
    pub fn gtks_hash_update<H: Sha256Hash>(&mut self, hashes: &[u8; GTK_ALL_HASHES_LEN]) -> GtkMismatch {
        let mut mismatch = GtkMismatch::NoMismatch;
        for (index, hash) in hashes.chunks_exact(GTK_HASH_LEN).enumerate() {
            let index = index as u8;
            let set = self.gtk_is_set(index);
            if hash.iter().all(|b| *b == 0) {
                if set {
                    if self.gtk_lifetime_get(index) > GTK_EXPIRE_MISMATCH_TIME {
                        mismatch = mismatch.max(GtkMismatch::LifetimeMismatch);
                    }
                    tracing::info!("GTK {} removed from network, lifetime {}", index, self.gtk_lifetime_get(index));
                    self.gtk_clear(index);
                }
            } else if let Some(gtk) = self.gtk_get(index) {
                if gtk_hash_generate::<H>(gtk) != hash {
                    tracing::warn!("GTK {} hash mismatch", index);
                    self.gtk_clear(index);
                    mismatch = GtkMismatch::HashMismatch;
                }
            } else {
                mismatch = GtkMismatch::HashMismatch;
            }
        }
        mismatch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::TestSha256;

    fn key(b: u8) -> [u8; GTK_LEN] {
        [b; GTK_LEN]
    }

    #[test]
    fn set_is_idempotent_and_orders_installs() {
        let mut gtks = SecProtGtkKeys::new();
        assert!(gtks.gtk_set(0, &key(1), 1000));
        assert!(gtks.gtk_set(2, &key(2), 1000));
        gtks.updated_reset();
        assert!(!gtks.gtk_set(2, &key(2), 1000));
        assert!(!gtks.is_updated());
        assert!(!gtks.gtk_set(1, &key(0), 1000));
        assert!(!gtks.gtk_set(4, &key(1), 1000));

        assert_eq!(gtks.gtk_install_order_first_get(), Some(0));
        assert_eq!(gtks.gtk_install_order_last_get(), Some(2));
        assert_eq!(gtks.gtk_install_index_get(), Some(1));

        // Replacing a key makes it the newest.
        assert!(gtks.gtk_set(0, &key(3), 1000));
        assert_eq!(gtks.gtk_install_order_first_get(), Some(2));
        assert_eq!(gtks.gtk_install_order_last_get(), Some(0));
        assert_eq!(gtks.gtk_status_get(0), GtkStatus::New);

        assert!(gtks.gtk_set(1, &key(4), 1000));
        assert!(gtks.gtk_set(3, &key(5), 1000));
        assert_eq!(gtks.gtk_install_index_get(), Some(2));
        gtks.gtk_clear(2);
        let mut orders: Vec<_> = (0..4).filter(|i| gtks.gtk_is_set(*i)).map(|i| gtks.gtk[i as usize].install_order).collect();
        orders.sort();
        assert_eq!(orders, [0, 1, 2]);
        assert_eq!(gtks.gtk_status_get(2), GtkStatus::New);
    }

    #[test]
    fn single_active_key() {
        let mut gtks = SecProtGtkKeys::new();
        gtks.gtk_set(0, &key(1), 1000);
        gtks.gtk_set(1, &key(2), 1000);
        assert!(!gtks.gtk_status_active_set(0));
        gtks.gtk_status_all_fresh_set();
        assert!(gtks.gtk_status_active_set(0));
        assert!(gtks.gtk_status_active_set(1));
        assert_eq!(gtks.gtk_status_get(0), GtkStatus::Old);
        assert_eq!(gtks.gtk_status_active_get(), Some(1));
        // Old keys are never reused.
        assert!(!gtks.gtk_status_active_set(0));
        gtks.gtk_status_fresh_set(0);
        assert_eq!(gtks.gtk_status_get(0), GtkStatus::Old);
    }

    #[test]
    fn hash_update_severity() {
        let mut gtks = SecProtGtkKeys::new();
        gtks.gtk_set(0, &key(1), GTK_EXPIRE_MISMATCH_TIME + 100);
        gtks.gtk_set(1, &key(2), GTK_EXPIRE_MISMATCH_TIME);
        gtks.gtk_set(2, &key(3), 5000);
        gtks.gtk_set(3, &key(4), 5000);
        gtks.gtk_status_all_fresh_set();

        let mut table = [0u8; GTK_ALL_HASHES_LEN];
        table[16..24].copy_from_slice(&gtk_hash_generate::<TestSha256>(&key(9)));
        table[24..32].copy_from_slice(&gtk_hash_generate::<TestSha256>(&key(4)));

        assert_eq!(gtks.gtks_hash_update::<TestSha256>(&table), GtkMismatch::HashMismatch);
        assert!(!gtks.gtk_is_set(0));
        assert!(!gtks.gtk_is_set(1));
        assert!(!gtks.gtk_is_set(2));
        assert!(gtks.gtk_is_set(3));
        assert_eq!(gtks.gtk_status_get(3), GtkStatus::Fresh);
        assert_eq!(gtks.gtk_install_order_first_get(), Some(3));
    }

    #[test]
    fn hash_update_lifetime_and_expected_expiry() {
        let mut gtks = SecProtGtkKeys::new();
        gtks.gtk_set(0, &key(1), GTK_EXPIRE_MISMATCH_TIME + 1);
        let table = gtks.gtks_hash_generate::<TestSha256>();
        assert_eq!(gtks.gtks_hash_update::<TestSha256>(&table), GtkMismatch::NoMismatch);
        assert_eq!(gtks.gtks_hash_update::<TestSha256>(&[0; GTK_ALL_HASHES_LEN]), GtkMismatch::LifetimeMismatch);

        gtks.gtk_set(1, &key(2), 10);
        assert_eq!(gtks.gtks_hash_update::<TestSha256>(&[0; GTK_ALL_HASHES_LEN]), GtkMismatch::NoMismatch);
        assert_eq!(gtks.gtk_count(), 0);
    }
}
