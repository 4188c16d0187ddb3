/* EAPOL constants */
/*
EAPOL header:
    [0]      protocol version
    [1]      packet type
    [2..4]   packet body length (big endian)
*/
pub const EAPOL_PROTOCOL_VERSION: u8 = 3;
pub const EAPOL_BASE_LENGTH: usize = 4;

pub const EAPOL_EAP_TYPE: u8 = 0;
pub const EAPOL_START_TYPE: u8 = 1;
pub const EAPOL_LOGOFF_TYPE: u8 = 2;
pub const EAPOL_KEY_TYPE: u8 = 3;

/*
EAPOL key frame body:
    [0]        key descriptor type
    [1..3]     key information
    [3..5]     key length
    [5..13]    replay counter
    [13..45]   key nonce
    [45..61]   EAPOL key IV
    [61..69]   key RSC
    [69..77]   reserved
    [77..93]   key MIC
    [93..95]   key data length
    [95..]     key data
*/
pub const EAPOL_KEY_FRAME_BASE_SIZE: usize = 95;
pub const EAPOL_RSN_KEY_DESCRIPTION: u8 = 2;
/// HMAC-SHA1-128 MIC with AES key wrap of the key data.
pub const KEY_DESCRIPTION_HMAC_SHA1_MIC_AES_ENC: u8 = 2;

pub const KEY_NONCE_LEN: usize = 32;
pub const KEY_IV_LEN: usize = 16;
pub const KEY_RSC_LEN: usize = 8;
pub const KEY_RESERVED_LEN: usize = 8;
pub const KEY_MIC_LEN: usize = 16;

/// Offset of the key MIC inside a complete EAPOL key frame, header included.
pub const EAPOL_KEY_MIC_OFFSET: usize = EAPOL_BASE_LENGTH + 1 + 2 + 2 + 8 + KEY_NONCE_LEN + KEY_IV_LEN + KEY_RSC_LEN + KEY_RESERVED_LEN;

/* Key information bits */

pub(crate) const KEY_INFO_VERSION_MASK: u16 = 0x0007;
pub(crate) const KEY_INFO_KEY_TYPE: u16 = 0x0008;
pub(crate) const KEY_INFO_INSTALL: u16 = 0x0040;
pub(crate) const KEY_INFO_KEY_ACK: u16 = 0x0080;
pub(crate) const KEY_INFO_KEY_MIC: u16 = 0x0100;
pub(crate) const KEY_INFO_SECURED_KEY_FRAME: u16 = 0x0200;
pub(crate) const KEY_INFO_ERROR: u16 = 0x0400;
pub(crate) const KEY_INFO_REQUEST: u16 = 0x0800;
pub(crate) const KEY_INFO_ENCRYPTED_KEY_DATA: u16 = 0x1000;
pub(crate) const KEY_INFO_SMK_MESSAGE: u16 = 0x2000;

/* EAP constants */

pub const EAP_HEADER_LEN: usize = 4;

pub const EAP_REQ: u8 = 1;
pub const EAP_RESPONSE: u8 = 2;
pub const EAP_SUCCESS: u8 = 3;
pub const EAP_FAILURE: u8 = 4;

pub const EAP_IDENTITY: u8 = 1;
pub const EAP_TLS: u8 = 13;

/// Identity the supplicant answers an EAP identity request with.
pub const EAP_ANONYMOUS_IDENTITY: &[u8] = b"Anonymous";

/* EAP-TLS constants */
/*
EAP-TLS payload:
    [0]      flags
    [1..5]   TLS message length, only when the length flag is set
    [..]     TLS data
*/
pub const EAP_TLS_START: u8 = 0x20;
pub const EAP_TLS_MORE_FRAGMENTS: u8 = 0x40;
pub const EAP_TLS_FRAGMENT_LENGTH: u8 = 0x80;

/// Largest amount of TLS data carried in one EAP-TLS fragment.
pub const EAP_TLS_FRAGMENT_LEN: usize = 600;
/// Head room reserved in front of TLS data for the flags byte and the length field.
pub const TLS_HEAD_LEN: usize = 5;
/// Largest TLS message that is accepted for reassembly.
pub const TLS_MESSAGE_MAX_LEN: usize = 65535;

/* Key material */

pub const EUI64_LEN: usize = 8;
pub const PMK_LEN: usize = 32;
pub const PMKID_LEN: usize = 16;
pub const PTK_LEN: usize = 48;
pub const KCK_LEN: usize = 16;
pub const KEK_LEN: usize = 16;
pub const TK_LEN: usize = 16;
pub const KCK_INDEX: usize = 0;
pub const KEK_INDEX: usize = 16;
pub const TK_INDEX: usize = 32;

pub const GTK_NUM: usize = 4;
pub const GTK_LEN: usize = 16;
pub const GTK_HASH_LEN: usize = 8;
pub const GTK_ALL_HASHES_LEN: usize = GTK_NUM * GTK_HASH_LEN;

/// Lifetime value meaning "key was just installed, start the default lifetime on first decrement".
pub const PMK_LIFETIME_INSTALL: u32 = 0xFFFFF;
pub const PTK_LIFETIME_INSTALL: u32 = 0xFFFFF;

/// A GTK that disappears from the network hash list while it still has more than this many
/// seconds of lifetime left is reported as a lifetime mismatch.
pub const GTK_EXPIRE_MISMATCH_TIME: u32 = 60;

/* KDE constants */

pub const KDE_TYPE: u8 = 0xdd;
pub const KDE_HEADER_LEN: usize = 6;
pub const IEEE_802_11_OUI: [u8; 3] = [0x00, 0x0f, 0xac];
pub const WISUN_OUI: [u8; 3] = [0x0c, 0x5a, 0x9e];
pub const KDE_GTK: u8 = 1;
pub const KDE_PMKID: u8 = 4;
pub const KDE_LIFETIME: u8 = 7;
pub const KDE_GTKL: u8 = 2;

pub const KDE_GTK_LEN: usize = KDE_HEADER_LEN + 2 + GTK_LEN;
pub const KDE_LIFETIME_LEN: usize = KDE_HEADER_LEN + 4;
pub const KDE_GTKL_LEN: usize = KDE_HEADER_LEN + 1;
pub const KDE_PMKID_LEN: usize = KDE_HEADER_LEN + PMKID_LEN;

/// AES key wrap works on 8 byte blocks and needs at least two of them.
pub const KEY_WRAP_BLOCK_LEN: usize = 8;
pub const KEY_WRAP_MIN_LEN: usize = 16;

/* Wi-SUN KMP identifiers */

pub const KMP_ID_8021X: u8 = 1;
pub const KMP_ID_80211_GKH: u8 = 7;

/* RADIUS constants */
/*
RADIUS header:
    [0]      code
    [1]      identifier
    [2..4]   length (big endian)
    [4..20]  authenticator
*/
pub const RADIUS_HEADER_LEN: usize = 20;
pub const RADIUS_AUTHENTICATOR_LEN: usize = 16;
pub const RADIUS_AUTHENTICATOR_OFFSET: usize = 4;
pub const RADIUS_MAX_LEN: usize = 4096;

pub const RADIUS_ACCESS_REQUEST: u8 = 1;
pub const RADIUS_ACCESS_ACCEPT: u8 = 2;
pub const RADIUS_ACCESS_REJECT: u8 = 3;
pub const RADIUS_ACCESS_CHALLENGE: u8 = 11;

pub const AVP_HEADER_LEN: usize = 2;
pub const AVP_VALUE_MAX_LEN: usize = 253;

pub const AVP_TYPE_USER_NAME: u8 = 1;
pub const AVP_TYPE_NAS_PORT: u8 = 5;
pub const AVP_TYPE_FRAMED_MTU: u8 = 12;
pub const AVP_TYPE_STATE: u8 = 24;
pub const AVP_TYPE_VENDOR_SPECIFIC: u8 = 26;
pub const AVP_TYPE_CALLED_STATION_ID: u8 = 30;
pub const AVP_TYPE_CALLING_STATION_ID: u8 = 31;
pub const AVP_TYPE_NAS_IDENTIFIER: u8 = 32;
pub const AVP_TYPE_NAS_PORT_TYPE: u8 = 61;
pub const AVP_TYPE_EAP_MESSAGE: u8 = 79;
pub const AVP_TYPE_MESSAGE_AUTHENTICATOR: u8 = 80;
pub const AVP_TYPE_NAS_IPV6_ADDRESS: u8 = 95;

pub const MESSAGE_AUTHENTICATOR_LEN: usize = 16;
pub const NAS_IPV6_ADDRESS_LEN: usize = 16;

/// NAS-Port-Type "Wireless - IEEE 802.11".
pub const NAS_PORT_TYPE_WIRELESS_802_11: u32 = 19;
pub const NAS_PORT: u32 = 0;
pub const FRAMED_MTU: u32 = 1400;
pub const NAS_IDENTIFIER: &[u8] = b"Wi-SUN";

pub const VENDOR_ID_MICROSOFT: u32 = 311;
pub const VENDOR_TYPE_MS_MPPE_RECV_KEY: u8 = 17;
pub const MPPE_SALT_LEN: usize = 2;

/// Station identifier: eight hashed EUI-64 bytes as hyphen separated hex.
pub const STATION_ID_LEN: usize = EUI64_LEN * 3 - 1;
pub const RADIUS_SALT_LEN: usize = 16;

pub const RADIUS_ID_RANGE_SIZE: usize = 10;
pub const RADIUS_ID_RANGE_NUM: usize = 25;
/// Lifetime of an identifier in seconds. A released range cools down for a fifth of it.
pub const RADIUS_ID_TIMEOUT: u16 = 60;

/* Timers */

/// Length of one security protocol timer tick.
pub const SEC_PROT_TIMER_TICK_MS: u32 = 100;
/// Ticks per second.
pub const SECONDS_TICKS: u32 = 1000 / SEC_PROT_TIMER_TICK_MS;
/// Ticks during which a supplicant ignores repeats of an already handled EAP request.
pub const BURST_FILTER_TIMER_TIMEOUT: u16 = 5 * SECONDS_TICKS as u16;
