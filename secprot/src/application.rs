use rand_core::{CryptoRng, RngCore};

use crate::common::SecProtResult;
use crate::crypto::*;
use crate::keys::SecProtKeys;
use crate::sec_prot::ProtocolKind;
use crate::tls_bridge::TlsEngine;
use crate::trickle::TrickleParams;

/// Size class of the Wi-SUN network, selecting a timing profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NetworkSize {
    Small,
    Medium,
    Large,
}

/// Timing and lifetime settings shared by all security protocols of an interface.
///
/// Timer values are in ticks of `SEC_PROT_TIMER_TICK_MS` milliseconds, lifetimes in seconds.
/// A profile is selected once, when the interface `Context` is created, and is never re-read
/// while a protocol is running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Trickle parameters for the initial EAP-TLS requests sent by the authenticator.
    pub sec_prot_trickle: TrickleParams,
    /// Overall timeout of an EAP-TLS or group key handshake negotiation.
    pub sec_prot_timeout: u32,
    /// Overall timeout of an EAP-TLS negotiation relayed to a RADIUS server.
    /// Longer than `sec_prot_timeout` to cover the RADIUS round trips.
    pub radius_eap_tls_timeout: u32,
    /// Minimum delay before an Access-Request is retransmitted.
    pub radius_retry_imin: u16,
    /// Maximum delay before an Access-Request is retransmitted.
    pub radius_retry_imax: u16,
    /// Number of Access-Request retransmissions before the RADIUS client gives up.
    pub radius_retry_count: u8,
    /// Interval between group key handshake Message 1 retransmissions.
    pub gkh_retry_timeout: u16,
    /// Number of group key handshake Message 1 retransmissions.
    pub gkh_retry_count: u8,
    /// Window during which a supplicant ignores repeats of the same EAP request.
    pub burst_filter_timeout: u16,
    /// Default PMK lifetime, applied on the first lifetime decrement after install.
    pub pmk_lifetime: u32,
    /// Default PTK lifetime, applied on the first lifetime decrement after install.
    pub ptk_lifetime: u32,
    /// Lifetime of GTKs learned without a lifetime KDE.
    pub gtk_lifetime: u32,
}

impl Settings {
    /// Default PMK lifetime: 4 months in seconds.
    pub const PMK_LIFETIME_S: u32 = 120 * 24 * 3600;
    /// Default PTK lifetime: 2 months in seconds.
    pub const PTK_LIFETIME_S: u32 = 60 * 24 * 3600;
    /// Default GTK lifetime: 1 month in seconds.
    pub const GTK_LIFETIME_S: u32 = 30 * 24 * 3600;

    const fn profile(imin: u16, imax: u16, timeout: u32) -> Self {
        Self {
            sec_prot_trickle: TrickleParams { imin, imax, k: 0, timer_expirations: 2 },
            sec_prot_timeout: timeout,
            radius_eap_tls_timeout: timeout + 1500,
            radius_retry_imin: 20,
            radius_retry_imax: 30,
            radius_retry_count: 3,
            gkh_retry_timeout: imin,
            gkh_retry_count: 2,
            burst_filter_timeout: crate::proto::BURST_FILTER_TIMER_TIMEOUT,
            pmk_lifetime: Self::PMK_LIFETIME_S,
            ptk_lifetime: Self::PTK_LIFETIME_S,
            gtk_lifetime: Self::GTK_LIFETIME_S,
        }
    }

    /// Small networks: first retry after 30 to 90 seconds, 7.5 minute negotiation timeout.
    pub const fn small() -> Self {
        Self::profile(300, 900, 4500)
    }

    /// Medium networks: first retry after 60 to 180 seconds, 10 minute negotiation timeout.
    pub const fn medium() -> Self {
        Self::profile(600, 1800, 6000)
    }

    /// Large networks: first retry after 60 to 240 seconds, 12.5 minute negotiation timeout.
    pub const fn large() -> Self {
        Self::profile(600, 2400, 7500)
    }

    pub const fn for_network_size(size: NetworkSize) -> Self {
        match size {
            NetworkSize::Small => Self::small(),
            NetworkSize::Medium => Self::medium(),
            NetworkSize::Large => Self::large(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::medium()
    }
}

/// The cryptographic primitives used by the security protocols.
///
/// With the `default-crypto` feature, implement `crypto_impl::DefaultCrypto` instead to get
/// implementations backed by the `md-5`, `sha1`, `sha2`, `hmac` and `aes` crates.
pub trait CryptoLayer: Sized {
    /// The random number generator used for EAP identifiers, RADIUS request authenticators,
    /// station identifier salts and retry jitter. Must be cryptographically secure.
    type Rng: CryptoRng + RngCore;

    /// MD5, used for the RADIUS Response-Authenticator and MS-MPPE key decryption.
    type Md5: Md5Hash;
    /// HMAC-MD5, used for the RADIUS Message-Authenticator.
    type HmacMd5: HmacMd5;
    /// SHA-256, used for GTK hashes and station identifiers.
    type Sha256: Sha256Hash;
    /// HMAC-SHA1, used for EAPOL key frame MICs.
    type HmacSha1: HmacSha1;
    /// AES-128 block encryption for AES key wrap.
    type AesEnc: Aes128Enc;
    /// AES-128 block decryption for AES key unwrap.
    type AesDec: Aes128Dec;
}

/// Trait to implement to integrate the security protocols into a Wi-SUN stack.
///
/// All calls are made from the single execution context that drives `KmpSession`.
pub trait ApplicationLayer<C: CryptoLayer>: Sized {
    /// The TLS engine used by local EAP-TLS authenticators and supplicants.
    type Tls: TlsEngine + 'static;

    /// Send an EAPOL PDU to the peer with the given EUI-64, tagged with its KMP id.
    ///
    /// A KMP id of zero with an empty PDU is a message from the message protocol to the
    /// lower layer, not a frame for the air.
    fn send(&mut self, peer: &[u8; 8], kmp_id: u8, pdu: &[u8]) -> Result<(), crate::result::SendError>;

    /// Send a RADIUS message to the configured RADIUS server over UDP.
    fn radius_send(&mut self, message: &[u8]) -> Result<(), crate::result::SendError>;

    /// A protocol was created at the request of the local node and has started.
    #[allow(unused)]
    fn create_confirm(&mut self, peer: &[u8; 8], kind: ProtocolKind, result: SecProtResult) {}

    /// A peer started a protocol. Returning false refuses it.
    #[allow(unused)]
    fn create_indication(&mut self, peer: &[u8; 8], kind: ProtocolKind) -> bool {
        true
    }

    /// A protocol completed. `keys` holds the key material of the session after the protocol.
    fn finished_indication(&mut self, peer: &[u8; 8], kind: ProtocolKind, result: SecProtResult, keys: &SecProtKeys);

    /// A protocol instance was torn down.
    #[allow(unused)]
    fn finished(&mut self, peer: &[u8; 8], kind: ProtocolKind) {}

    /// Create a TLS engine for one EAP-TLS negotiation, with the certificates of this node.
    /// Returning `None` fails the negotiation with a configuration error.
    fn tls_create(&mut self, peer: &[u8; 8], is_server: bool) -> Option<Self::Tls>;

    /// Receives a stream of events that occur during protocol execution.
    /// These are provided for debugging, logging or metrics purposes, and must be used for
    /// nothing else. Do not base protocol-level decisions upon the events passed to this function.
    #[cfg(feature = "logging")]
    #[allow(unused)]
    fn event_log(&mut self, event: crate::LogEvent<'_>) {}
}
