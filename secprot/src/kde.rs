//! Key data encapsulations carried in the key data of EAPOL key frames.
/*
KDE:
    [0]      type, 0xdd
    [1]      length of the rest of the element
    [2..5]   OUI
    [5]      data type
    [6..]    data
*/

use crate::proto::*;
use crate::result::DecodeError;

/// GTK KDE contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GtkKde {
    pub index: u8,
    pub tx: bool,
    pub gtk: [u8; GTK_LEN],
}

/// KDEs recognized in key data. Unknown elements are skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KdeSet {
    pub gtk: Option<GtkKde>,
    pub lifetime: Option<u32>,
    pub gtkl: Option<u8>,
    pub pmkid: Option<[u8; PMKID_LEN]>,
}

fn header_write(out: &mut Vec<u8>, oui: [u8; 3], data_type: u8, data_len: usize) {
    out.push(KDE_TYPE);
    out.push((KDE_HEADER_LEN - 2 + data_len) as u8);
    out.extend_from_slice(&oui);
    out.push(data_type);
}

pub fn gtk_write(out: &mut Vec<u8>, index: u8, tx: bool, gtk: &[u8; GTK_LEN]) {
    header_write(out, IEEE_802_11_OUI, KDE_GTK, 2 + GTK_LEN);
    out.push((index & 0x03) | if tx { 0x04 } else { 0 });
    out.push(0);
    out.extend_from_slice(gtk);
}

pub fn lifetime_write(out: &mut Vec<u8>, lifetime: u32) {
    header_write(out, IEEE_802_11_OUI, KDE_LIFETIME, 4);
    out.extend_from_slice(&lifetime.to_be_bytes());
}

pub fn gtkl_write(out: &mut Vec<u8>, gtkl: u8) {
    header_write(out, WISUN_OUI, KDE_GTKL, 1);
    out.push(gtkl);
}

pub fn pmkid_write(out: &mut Vec<u8>, pmkid: &[u8; PMKID_LEN]) {
    header_write(out, IEEE_802_11_OUI, KDE_PMKID, PMKID_LEN);
    out.extend_from_slice(pmkid);
}

/// Length of `len` bytes of key data after padding for AES key wrap.
pub fn padded_length(len: usize) -> usize {
    let len = len.max(KEY_WRAP_MIN_LEN);
    (len + KEY_WRAP_BLOCK_LEN - 1) / KEY_WRAP_BLOCK_LEN * KEY_WRAP_BLOCK_LEN
}

/// Pads key data with 0xdd followed by zeros, as required before AES key wrap.
pub fn pad(out: &mut Vec<u8>) {
    let target = padded_length(out.len());
    if target > out.len() {
        out.push(KDE_TYPE);
        out.resize(target, 0);
    }
}

/// Walks the KDE list in decrypted key data.
pub fn parse(mut data: &[u8]) -> Result<KdeSet, DecodeError> {
    let mut set = KdeSet::default();
    while data.len() >= 2 {
        let (kind, len) = (data[0], data[1] as usize);
        if kind == 0 || (kind == KDE_TYPE && len == 0) {
            // Padding.
            break;
        }
        let element = data.get(2..2 + len).ok_or(DecodeError::InvalidAttribute)?;
        data = &data[2 + len..];
        if kind != KDE_TYPE || len < 4 {
            continue;
        }
        let oui = [element[0], element[1], element[2]];
        let value = &element[4..];
        match (oui, element[3]) {
            (IEEE_802_11_OUI, KDE_GTK) => {
                if value.len() != 2 + GTK_LEN {
                    return Err(DecodeError::InvalidAttribute);
                }
                let mut gtk = [0u8; GTK_LEN];
                gtk.copy_from_slice(&value[2..]);
                set.gtk = Some(GtkKde { index: value[0] & 0x03, tx: value[0] & 0x04 != 0, gtk });
            }
            (IEEE_802_11_OUI, KDE_LIFETIME) => {
                let v: [u8; 4] = value.try_into().map_err(|_| DecodeError::InvalidAttribute)?;
                set.lifetime = Some(u32::from_be_bytes(v));
            }
            (IEEE_802_11_OUI, KDE_PMKID) => {
                set.pmkid = Some(value.try_into().map_err(|_| DecodeError::InvalidAttribute)?);
            }
            (WISUN_OUI, KDE_GTKL) => {
                if value.len() != 1 {
                    return Err(DecodeError::InvalidAttribute);
                }
                set.gtkl = Some(value[0]);
            }
            _ => {}
        }
    }
    Ok(set)
}
