use std::fmt;

/// Why an EAPOL, EAP-TLS or RADIUS message failed to decode.
///
/// Decode errors are always fail closed: the message is dropped, no state changes and nothing
/// is sent in response.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum DecodeError {
    /// The buffer ended before a field that had to be present.
    TooShort,
    /// The EAPOL protocol version is not supported.
    UnsupportedVersion,
    /// The EAPOL packet type is unknown.
    UnknownPacketType,
    /// A declared length does not match the data that is present.
    LengthMismatch,
    /// The key descriptor type is not the RSN descriptor.
    UnsupportedKeyDescription,
    /// The key descriptor version is not HMAC-SHA1-128 with AES key wrap.
    UnsupportedKeyVersion,
    /// An EAP code outside request, response, success and failure.
    UnknownEapCode,
    /// A RADIUS code this client does not handle.
    UnknownRadiusCode,
    /// A key data encapsulation or RADIUS attribute was malformed.
    InvalidAttribute,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::TooShort => "message too short",
            Self::UnsupportedVersion => "unsupported EAPOL version",
            Self::UnknownPacketType => "unknown EAPOL packet type",
            Self::LengthMismatch => "declared length does not match data",
            Self::UnsupportedKeyDescription => "unsupported key descriptor",
            Self::UnsupportedKeyVersion => "unsupported key descriptor version",
            Self::UnknownEapCode => "unknown EAP code",
            Self::UnknownRadiusCode => "unknown RADIUS code",
            Self::InvalidAttribute => "malformed attribute",
        };
        f.write_str(s)
    }
}

impl std::error::Error for DecodeError {}

/// An error that can occur when attempting to send a message to a peer or to the RADIUS server.
#[derive(Debug, PartialEq, Eq, Clone, Hash)]
pub enum SendError {
    /// The lower layer refused the message.
    LowerLayer,
    /// A send or receive buffer could not be allocated.
    OutOfMemory,
    /// The message does not fit the wire format, e.g. a RADIUS message longer than 4096 bytes.
    DataTooLarge,
}

impl fmt::Display for SendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LowerLayer => f.write_str("lower layer refused message"),
            Self::OutOfMemory => f.write_str("out of memory"),
            Self::DataTooLarge => f.write_str("message too large"),
        }
    }
}

impl std::error::Error for SendError {}

/// A type of fault occurred because we received a bad packet.
///
/// An unauthenticated attacker can intentionally trigger any of these, so it is best to
/// treat these as raw user input that needs to be sanitized.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum FaultType {
    /// The received packet was not well formed.
    InvalidPacket,
    /// A MIC, Response-Authenticator or Message-Authenticator check failed.
    FailedAuth,
    /// The replay counter was not larger than the last accepted one, or did not match the
    /// counter of the outstanding request.
    ExpiredCounter,
    /// The packet is valid but not expected in the current protocol state.
    OutOfSequence,
    /// A RADIUS response identifier that does not belong to the outstanding request.
    UnknownIdentifier,
}

/// An error that occurred during the receipt of a given packet.
#[derive(Debug)]
pub enum ReceiveError {
    /// A type of fault that can occur because a remote peer sent us a bad packet.
    /// Such packets are ignored by the protocol instance.
    ByzantineFault {
        /// The type of fault that has occurred. Be cautious if you choose to read this
        /// value, as an attacker has control over it.
        error: FaultType,
        /// False for faults that also happen between two well behaved peers on a lossy radio
        /// link, such as a retransmitted frame arriving after its answer.
        unnatural: bool,
        /// The file from which this error was generated.
        #[cfg(feature = "debug")]
        file: &'static str,
        /// The line from which this error was generated.
        #[cfg(feature = "debug")]
        line: u32,
    },
    /// The message could not be decoded.
    Decode(DecodeError),
    /// A buffer for the message could not be allocated.
    OutOfMemory,
    /// No protocol instance accepts this message.
    Unassociated,
}

impl fmt::Display for ReceiveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ByzantineFault { error, unnatural, .. } => {
                write!(f, "byzantine fault {:?} (unnatural: {})", error, unnatural)
            }
            Self::Decode(e) => write!(f, "decode error: {}", e),
            Self::OutOfMemory => f.write_str("out of memory"),
            Self::Unassociated => f.write_str("no protocol for message"),
        }
    }
}

impl std::error::Error for ReceiveError {}

impl From<DecodeError> for ReceiveError {
    fn from(e: DecodeError) -> Self {
        Self::Decode(e)
    }
}

macro_rules! fault {
    ($name:expr, $unnatural:expr) => {
        $crate::result::ReceiveError::ByzantineFault {
            #[cfg(feature = "debug")]
            file: file!(),
            #[cfg(feature = "debug")]
            line: line!(),
            error: $name,
            unnatural: $unnatural,
        }
    };
}
pub(crate) use fault;
