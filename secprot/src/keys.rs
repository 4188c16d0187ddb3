use zeroize::Zeroizing;

use crate::crypto::Sha256Hash;
use crate::gtks::{gtk_hash_generate, SecProtGtkKeys};
use crate::proto::*;

/// Key material of one authentication session.
///
/// The authenticator keeps one instance per supplicant, a supplicant one for its
/// authenticator. Protocol instances never own it; it is lent to the instance being driven
/// for the duration of each call.
pub struct SecProtKeys {
    pmk: Zeroizing<[u8; PMK_LEN]>,
    pmk_set: bool,
    pmk_lifetime: u32,
    pmk_key_replay_cnt: u64,
    pmk_key_replay_cnt_set: bool,
    pmk_mismatch: bool,
    ptk: Zeroizing<[u8; PTK_LEN]>,
    ptk_set: bool,
    ptk_lifetime: u32,
    ptk_eui_64: [u8; EUI64_LEN],
    ptk_eui_64_set: bool,
    ptk_mismatch: bool,
    gtkl: u8,
    gtk_set_index: Option<u8>,
    ins_gtk_hash: [[u8; GTK_HASH_LEN]; GTK_NUM],
    ins_gtk_hash_set: u8,
    updated: bool,
}

impl Default for SecProtKeys {
    fn default() -> Self {
        Self::new()
    }
}

impl SecProtKeys {
    pub fn new() -> Self {
        Self {
            pmk: Zeroizing::new([0; PMK_LEN]),
            pmk_set: false,
            pmk_lifetime: 0,
            pmk_key_replay_cnt: 0,
            pmk_key_replay_cnt_set: false,
            pmk_mismatch: false,
            ptk: Zeroizing::new([0; PTK_LEN]),
            ptk_set: false,
            ptk_lifetime: 0,
            ptk_eui_64: [0; EUI64_LEN],
            ptk_eui_64_set: false,
            ptk_mismatch: false,
            gtkl: 0,
            gtk_set_index: None,
            ins_gtk_hash: [[0; GTK_HASH_LEN]; GTK_NUM],
            ins_gtk_hash_set: 0,
            updated: false,
        }
    }

    pub fn is_updated(&self) -> bool {
        self.updated
    }

    pub fn updated_reset(&mut self) {
        self.updated = false;
    }

    /* PMK */

    /// Installs a new PMK. The replay counter starts over and the lifetime is the install
    /// sentinel until the first decrement.
    pub fn pmk_write(&mut self, pmk: &[u8; PMK_LEN]) {
        self.pmk.copy_from_slice(pmk);
        self.pmk_set = true;
        self.pmk_lifetime = PMK_LIFETIME_INSTALL;
        self.pmk_key_replay_cnt = 0;
        self.pmk_key_replay_cnt_set = false;
        self.pmk_mismatch = false;
        self.updated = true;
    }

    pub fn pmk_delete(&mut self) {
        if self.pmk_set || self.pmk_key_replay_cnt_set {
            self.updated = true;
        }
        *self.pmk = [0; PMK_LEN];
        self.pmk_set = false;
        self.pmk_lifetime = 0;
        self.pmk_key_replay_cnt = 0;
        self.pmk_key_replay_cnt_set = false;
    }

    pub fn pmk_get(&self) -> Option<&[u8; PMK_LEN]> {
        self.pmk_set.then_some(&*self.pmk)
    }

    pub fn pmk_is_set(&self) -> bool {
        self.pmk_set
    }

    pub fn pmk_lifetime_get(&self) -> u32 {
        self.pmk_lifetime
    }

    /// Decrements the PMK lifetime. On expiry the PTK and then the PMK are deleted and true
    /// is returned.
    pub fn pmk_lifetime_decrement(&mut self, default_lifetime: u32, seconds: u32) -> bool {
        if !self.pmk_set {
            return false;
        }
        if self.pmk_lifetime == PMK_LIFETIME_INSTALL {
            self.pmk_lifetime = default_lifetime;
        }
        if self.pmk_lifetime > seconds {
            self.pmk_lifetime -= seconds;
            return false;
        }
        tracing::info!("PMK expired");
        self.ptk_delete();
        self.pmk_delete();
        true
    }

    pub fn pmk_replay_cnt_get(&self) -> u64 {
        self.pmk_key_replay_cnt
    }

    pub fn pmk_replay_cnt_set(&mut self, counter: u64) {
        self.pmk_key_replay_cnt = counter;
        self.pmk_key_replay_cnt_set = true;
    }

    /// The first increment after a PMK install yields zero.
    pub fn pmk_replay_cnt_increment(&mut self) -> u64 {
        if self.pmk_key_replay_cnt_set {
            self.pmk_key_replay_cnt = self.pmk_key_replay_cnt.wrapping_add(1);
        } else {
            self.pmk_key_replay_cnt_set = true;
        }
        self.pmk_key_replay_cnt
    }

    /// Checks a received replay counter. Until a counter has been stored any value is
    /// accepted, after that only strictly larger values.
    pub fn pmk_replay_cnt_compare(&self, received_counter: u64) -> bool {
        !self.pmk_key_replay_cnt_set || received_counter > self.pmk_key_replay_cnt
    }

    pub fn pmk_mismatch_set(&mut self) {
        self.pmk_mismatch = true;
        self.updated = true;
    }

    pub fn pmk_mismatch_reset(&mut self) {
        self.pmk_mismatch = false;
    }

    pub fn pmk_mismatch_is_set(&self) -> bool {
        self.pmk_mismatch
    }

    /* PTK */

    /// Installs a new PTK; hashes of GTKs installed with the previous PTK are forgotten.
    pub fn ptk_write(&mut self, ptk: &[u8; PTK_LEN]) {
        self.ptk.copy_from_slice(ptk);
        self.ptk_set = true;
        self.ptk_lifetime = PTK_LIFETIME_INSTALL;
        self.ptk_mismatch = false;
        self.ptk_installed_gtk_hash_clear_all();
        self.updated = true;
    }

    pub fn ptk_delete(&mut self) {
        if self.ptk_set {
            self.updated = true;
        }
        *self.ptk = [0; PTK_LEN];
        self.ptk_set = false;
        self.ptk_lifetime = 0;
        self.ptk_installed_gtk_hash_clear_all();
    }

    pub fn ptk_get(&self) -> Option<&[u8; PTK_LEN]> {
        self.ptk_set.then_some(&*self.ptk)
    }

    pub fn ptk_is_set(&self) -> bool {
        self.ptk_set
    }

    pub fn kck_get(&self) -> Option<&[u8; KCK_LEN]> {
        self.ptk_get().and_then(|ptk| <&[u8; KCK_LEN]>::try_from(&ptk[KCK_INDEX..KCK_INDEX + KCK_LEN]).ok())
    }

    pub fn kek_get(&self) -> Option<&[u8; KEK_LEN]> {
        self.ptk_get().and_then(|ptk| <&[u8; KEK_LEN]>::try_from(&ptk[KEK_INDEX..KEK_INDEX + KEK_LEN]).ok())
    }

    pub fn ptk_lifetime_get(&self) -> u32 {
        self.ptk_lifetime
    }

    /// Decrements the PTK lifetime, deleting the PTK and returning true on expiry.
    pub fn ptk_lifetime_decrement(&mut self, default_lifetime: u32, seconds: u32) -> bool {
        if !self.ptk_set {
            return false;
        }
        if self.ptk_lifetime == PTK_LIFETIME_INSTALL {
            self.ptk_lifetime = default_lifetime;
        }
        if self.ptk_lifetime > seconds {
            self.ptk_lifetime -= seconds;
            return false;
        }
        tracing::info!("PTK expired");
        self.ptk_delete();
        true
    }

    pub fn ptk_eui_64_write(&mut self, eui_64: &[u8; EUI64_LEN]) {
        self.ptk_eui_64 = *eui_64;
        self.ptk_eui_64_set = true;
        self.updated = true;
    }

    pub fn ptk_eui_64_get(&self) -> Option<&[u8; EUI64_LEN]> {
        self.ptk_eui_64_set.then_some(&self.ptk_eui_64)
    }

    pub fn ptk_eui_64_delete(&mut self) {
        self.ptk_eui_64 = [0; EUI64_LEN];
        self.ptk_eui_64_set = false;
        self.updated = true;
    }

    pub fn ptk_mismatch_set(&mut self) {
        self.ptk_mismatch = true;
        self.updated = true;
    }

    pub fn ptk_mismatch_reset(&mut self) {
        self.ptk_mismatch = false;
    }

    pub fn ptk_mismatch_is_set(&self) -> bool {
        self.ptk_mismatch
    }

    /* GTK liveness */

    pub fn gtkl_get(&self) -> u8 {
        self.gtkl
    }

    pub fn gtkl_set(&mut self, gtkl: u8) {
        self.gtkl = gtkl;
    }

    pub fn gtkl_gtk_is_live(&self, index: u8) -> bool {
        (index as usize) < GTK_NUM && self.gtkl & (1 << index) != 0
    }

    pub fn gtkl_gtk_live_set(&mut self, index: u8) {
        if (index as usize) < GTK_NUM {
            self.gtkl |= 1 << index;
        }
    }

    /* GTK insertion */

    pub fn gtk_insert_index_set(&mut self, index: u8) {
        if (index as usize) < GTK_NUM {
            self.gtk_set_index = Some(index);
        }
    }

    pub fn gtk_insert_index_get(&self) -> Option<u8> {
        self.gtk_set_index
    }

    pub fn gtk_insert_index_clear(&mut self) {
        self.gtk_set_index = None;
    }

    /// Picks the key to send to a peer whose GTKL does not show it live: the active key if
    /// needed, else any other fresh or active key. The choice is stored as the insert index.
    pub fn gtk_insert_index_from_gtkl_get(&mut self, gtks: &SecProtGtkKeys) -> Option<u8> {
        if let Some(active) = gtks.gtk_status_active_get() {
            if !self.gtkl_gtk_is_live(active) {
                self.gtk_set_index = Some(active);
                return self.gtk_set_index;
            }
        }
        let index = (0..GTK_NUM as u8).find(|i| gtks.gtk_status_is_live(*i) && !self.gtkl_gtk_is_live(*i))?;
        self.gtk_set_index = Some(index);
        self.gtk_set_index
    }

    /// Key and index of the GTK selected for insertion.
    pub fn gtk_get_for_insert<'a>(&self, gtks: &'a SecProtGtkKeys) -> Option<(u8, &'a [u8; GTK_LEN])> {
        let index = self.gtk_set_index?;
        gtks.gtk_get(index).map(|gtk| (index, gtk))
    }

    /* Installed GTK hashes */

    /// Records the hash of the GTK about to be installed with this PTK.
    pub fn ptk_installed_gtk_hash_set<H: Sha256Hash>(&mut self, gtks: &SecProtGtkKeys) {
        if let Some((index, gtk)) = self.gtk_get_for_insert(gtks) {
            self.ins_gtk_hash[index as usize] = gtk_hash_generate::<H>(gtk);
            self.ins_gtk_hash_set |= 1 << index;
        }
    }

    pub fn ptk_installed_gtk_hash_clear_all(&mut self) {
        self.ins_gtk_hash = [[0; GTK_HASH_LEN]; GTK_NUM];
        self.ins_gtk_hash_set = 0;
    }

    /// True if this PTK already installed a different GTK to the slot, i.e. the PTK would be
    /// reused for a second key in the same slot.
    pub fn ptk_installed_gtk_hash_mismatch_check<H: Sha256Hash>(&self, gtks: &SecProtGtkKeys, index: u8) -> bool {
        if index as usize >= GTK_NUM || self.ins_gtk_hash_set & (1 << index) == 0 {
            return false;
        }
        match gtks.gtk_get(index) {
            Some(gtk) => gtk_hash_generate::<H>(gtk) != self.ins_gtk_hash[index as usize],
            None => false,
        }
    }
}
