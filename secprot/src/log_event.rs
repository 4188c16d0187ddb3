use std::fmt;

use crate::common::SecProtResult;
use crate::sec_prot::ProtocolKind;
use crate::tls_bridge::TlsProcess;

/// Macro to turn off logging at compile time.
macro_rules! log {
    ($app:expr, $event:expr) => {
        #[cfg(feature = "logging")]
        $app.event_log($event);
    };
}
pub(crate) use log;

/// Security protocol events that might be interesting to log or aggregate into metrics.
///
/// The `[u8; 8]` references are peer EUI-64 addresses.
#[allow(missing_docs)]
pub enum LogEvent<'a> {
    Created(&'a [u8; 8], ProtocolKind),
    Finished(&'a [u8; 8], ProtocolKind, SecProtResult),
    Resent(&'a [u8; 8], ProtocolKind),
    TimedOut(&'a [u8; 8], ProtocolKind),
    ReceivedEapIdentity(&'a [u8; 8]),
    /// `(peer, eap_id_seq)`
    BurstFiltered(&'a [u8; 8], u8),
    TlsHandshakeOver(&'a [u8; 8]),
    TlsFailed(&'a [u8; 8], TlsProcess),
    /// `(identifier)`
    RadiusAccessRequestSent(u8),
    /// `(code, identifier)`
    RadiusResponseAccepted(u8, u8),
    RadiusIdentifiersExhausted,
    /// `(peer, gtk_index, replay_counter)`
    GkhMessage1Sent(&'a [u8; 8], u8, u64),
    /// `(peer, replay_counter)`
    GkhMessage2Ignored(&'a [u8; 8], u64),
    /// `(peer, gtk_index)`
    GtkInstalled(&'a [u8; 8], u8),
    /// `(peer, gtk_index)`
    PtkInstalledGtkMismatch(&'a [u8; 8], u8),
}

struct Eui64<'a>(&'a [u8; 8]);

impl<'a> fmt::Debug for Eui64<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, b) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(":")?;
            }
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

impl<'a> fmt::Debug for LogEvent<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created(p, k) => f.debug_tuple("Created").field(&Eui64(p)).field(k).finish(),
            Self::Finished(p, k, r) => f.debug_tuple("Finished").field(&Eui64(p)).field(k).field(r).finish(),
            Self::Resent(p, k) => f.debug_tuple("Resent").field(&Eui64(p)).field(k).finish(),
            Self::TimedOut(p, k) => f.debug_tuple("TimedOut").field(&Eui64(p)).field(k).finish(),
            Self::ReceivedEapIdentity(p) => f.debug_tuple("ReceivedEapIdentity").field(&Eui64(p)).finish(),
            Self::BurstFiltered(p, id) => f.debug_tuple("BurstFiltered").field(&Eui64(p)).field(id).finish(),
            Self::TlsHandshakeOver(p) => f.debug_tuple("TlsHandshakeOver").field(&Eui64(p)).finish(),
            Self::TlsFailed(p, r) => f.debug_tuple("TlsFailed").field(&Eui64(p)).field(r).finish(),
            Self::RadiusAccessRequestSent(id) => f.debug_tuple("RadiusAccessRequestSent").field(id).finish(),
            Self::RadiusResponseAccepted(code, id) => {
                f.debug_tuple("RadiusResponseAccepted").field(code).field(id).finish()
            }
            Self::RadiusIdentifiersExhausted => write!(f, "RadiusIdentifiersExhausted"),
            Self::GkhMessage1Sent(p, index, counter) => f
                .debug_tuple("GkhMessage1Sent")
                .field(&Eui64(p))
                .field(index)
                .field(counter)
                .finish(),
            Self::GkhMessage2Ignored(p, counter) => {
                f.debug_tuple("GkhMessage2Ignored").field(&Eui64(p)).field(counter).finish()
            }
            Self::GtkInstalled(p, index) => f.debug_tuple("GtkInstalled").field(&Eui64(p)).field(index).finish(),
            Self::PtkInstalledGtkMismatch(p, index) => {
                f.debug_tuple("PtkInstalledGtkMismatch").field(&Eui64(p)).field(index).finish()
            }
        }
    }
}
