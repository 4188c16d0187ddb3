//! EAPOL PDU encoding and decoding.
//!
//! Parsing is the boundary between the radio and the protocol state machines: anything that is
//! not exactly one supported frame layout is rejected here and never reaches them.

use crate::proto::*;
use crate::result::{DecodeError, SendError};

/// A decoded EAPOL PDU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EapolPdu {
    Eap(EapFrame),
    Key(KeyFrame),
    Start,
    Logoff,
}

/// An EAP packet. Success and failure packets have no type and no data, for them `eap_type`
/// is zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EapFrame {
    pub code: u8,
    pub id_seq: u8,
    pub eap_type: u8,
    pub data: Vec<u8>,
}

/// The key information field of a key frame, unpacked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyInformation {
    pub description_version: u8,
    pub pairwise_key: bool,
    pub install: bool,
    pub key_ack: bool,
    pub key_mic: bool,
    pub secured_key_frame: bool,
    pub error: bool,
    pub request: bool,
    pub encrypted_key_data: bool,
    pub smk_handshake: bool,
}

/// An EAPOL RSN key frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyFrame {
    pub key_description: u8,
    pub key_information: KeyInformation,
    pub key_length: u16,
    pub replay_counter: u64,
    pub key_nonce: [u8; KEY_NONCE_LEN],
    pub key_iv: [u8; KEY_IV_LEN],
    pub key_rsc: [u8; KEY_RSC_LEN],
    pub key_mic: [u8; KEY_MIC_LEN],
    pub key_data: Vec<u8>,
}

impl KeyInformation {
    pub fn pack(&self) -> u16 {
        let mut v = (self.description_version as u16) & KEY_INFO_VERSION_MASK;
        let bits = [
            (self.pairwise_key, KEY_INFO_KEY_TYPE),
            (self.install, KEY_INFO_INSTALL),
            (self.key_ack, KEY_INFO_KEY_ACK),
            (self.key_mic, KEY_INFO_KEY_MIC),
            (self.secured_key_frame, KEY_INFO_SECURED_KEY_FRAME),
            (self.error, KEY_INFO_ERROR),
            (self.request, KEY_INFO_REQUEST),
            (self.encrypted_key_data, KEY_INFO_ENCRYPTED_KEY_DATA),
            (self.smk_handshake, KEY_INFO_SMK_MESSAGE),
        ];
        for (set, bit) in bits {
            if set {
                v |= bit;
            }
        }
        v
    }

    pub fn unpack(v: u16) -> Self {
        Self {
            description_version: (v & KEY_INFO_VERSION_MASK) as u8,
            pairwise_key: v & KEY_INFO_KEY_TYPE != 0,
            install: v & KEY_INFO_INSTALL != 0,
            key_ack: v & KEY_INFO_KEY_ACK != 0,
            key_mic: v & KEY_INFO_KEY_MIC != 0,
            secured_key_frame: v & KEY_INFO_SECURED_KEY_FRAME != 0,
            error: v & KEY_INFO_ERROR != 0,
            request: v & KEY_INFO_REQUEST != 0,
            encrypted_key_data: v & KEY_INFO_ENCRYPTED_KEY_DATA != 0,
            smk_handshake: v & KEY_INFO_SMK_MESSAGE != 0,
        }
    }
}

impl EapFrame {
    pub fn new(code: u8, id_seq: u8, eap_type: u8, data: Vec<u8>) -> Self {
        Self { code, id_seq, eap_type, data }
    }

    /// EAP success or failure.
    pub fn result(code: u8, id_seq: u8) -> Self {
        Self { code, id_seq, eap_type: 0, data: Vec::new() }
    }

    fn has_type(&self) -> bool {
        matches!(self.code, EAP_REQ | EAP_RESPONSE)
    }

    /// Length of the EAP packet as carried in its own length field.
    pub fn len(&self) -> usize {
        if self.has_type() {
            EAP_HEADER_LEN + 1 + self.data.len()
        } else {
            EAP_HEADER_LEN
        }
    }

    /// Decode a bare EAP packet, as carried inside EAPOL or RADIUS EAP-Message attributes.
    /// The EAP length field must cover `data` exactly.
    pub fn parse(data: &[u8]) -> Result<Self, DecodeError> {
        if data.len() < EAP_HEADER_LEN {
            return Err(DecodeError::TooShort);
        }
        let code = data[0];
        let id_seq = data[1];
        let length = u16::from_be_bytes([data[2], data[3]]) as usize;
        if length != data.len() {
            return Err(DecodeError::LengthMismatch);
        }
        match code {
            EAP_REQ | EAP_RESPONSE => {
                if length < EAP_HEADER_LEN + 1 {
                    return Err(DecodeError::TooShort);
                }
                Ok(Self { code, id_seq, eap_type: data[4], data: data[5..].to_vec() })
            }
            EAP_SUCCESS | EAP_FAILURE => {
                if length != EAP_HEADER_LEN {
                    return Err(DecodeError::LengthMismatch);
                }
                Ok(Self::result(code, id_seq))
            }
            _ => Err(DecodeError::UnknownEapCode),
        }
    }

    pub fn write_to(&self, out: &mut Vec<u8>) -> Result<(), SendError> {
        let length = u16::try_from(self.len()).map_err(|_| SendError::DataTooLarge)?;
        out.push(self.code);
        out.push(self.id_seq);
        out.extend_from_slice(&length.to_be_bytes());
        if self.has_type() {
            out.push(self.eap_type);
            out.extend_from_slice(&self.data);
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, SendError> {
        let mut out = Vec::with_capacity(self.len());
        self.write_to(&mut out)?;
        Ok(out)
    }
}

impl KeyFrame {
    /// A key frame with the supported descriptor and all optional fields zeroed.
    pub fn new(key_information: KeyInformation, replay_counter: u64, key_data: Vec<u8>) -> Self {
        Self {
            key_description: EAPOL_RSN_KEY_DESCRIPTION,
            key_information,
            key_length: 0,
            replay_counter,
            key_nonce: [0; KEY_NONCE_LEN],
            key_iv: [0; KEY_IV_LEN],
            key_rsc: [0; KEY_RSC_LEN],
            key_mic: [0; KEY_MIC_LEN],
            key_data,
        }
    }

    pub fn len(&self) -> usize {
        EAPOL_KEY_FRAME_BASE_SIZE + self.key_data.len()
    }

    fn parse(body: &[u8]) -> Result<Self, DecodeError> {
        if body.len() < EAPOL_KEY_FRAME_BASE_SIZE {
            return Err(DecodeError::TooShort);
        }
        let key_description = body[0];
        if key_description != EAPOL_RSN_KEY_DESCRIPTION {
            return Err(DecodeError::UnsupportedKeyDescription);
        }
        let key_information = KeyInformation::unpack(u16::from_be_bytes([body[1], body[2]]));
        if key_information.description_version != KEY_DESCRIPTION_HMAC_SHA1_MIC_AES_ENC {
            return Err(DecodeError::UnsupportedKeyVersion);
        }
        let mut frame = Self::new(key_information, 0, Vec::new());
        frame.key_length = u16::from_be_bytes([body[3], body[4]]);
        let mut counter = [0u8; 8];
        counter.copy_from_slice(&body[5..13]);
        frame.replay_counter = u64::from_be_bytes(counter);
        frame.key_nonce.copy_from_slice(&body[13..45]);
        frame.key_iv.copy_from_slice(&body[45..61]);
        frame.key_rsc.copy_from_slice(&body[61..69]);
        // [69..77] reserved
        frame.key_mic.copy_from_slice(&body[77..93]);
        let key_data_length = u16::from_be_bytes([body[93], body[94]]) as usize;
        if EAPOL_KEY_FRAME_BASE_SIZE + key_data_length != body.len() {
            return Err(DecodeError::LengthMismatch);
        }
        frame.key_data = body[EAPOL_KEY_FRAME_BASE_SIZE..].to_vec();
        Ok(frame)
    }

    fn write_to(&self, out: &mut Vec<u8>) -> Result<(), SendError> {
        let key_data_length = u16::try_from(self.key_data.len()).map_err(|_| SendError::DataTooLarge)?;
        out.push(self.key_description);
        out.extend_from_slice(&self.key_information.pack().to_be_bytes());
        out.extend_from_slice(&self.key_length.to_be_bytes());
        out.extend_from_slice(&self.replay_counter.to_be_bytes());
        out.extend_from_slice(&self.key_nonce);
        out.extend_from_slice(&self.key_iv);
        out.extend_from_slice(&self.key_rsc);
        out.extend_from_slice(&[0u8; KEY_RESERVED_LEN]);
        out.extend_from_slice(&self.key_mic);
        out.extend_from_slice(&key_data_length.to_be_bytes());
        out.extend_from_slice(&self.key_data);
        Ok(())
    }
}

impl EapolPdu {
    /// Decode one EAPOL PDU. Bytes after the declared packet body are ignored.
    pub fn parse(data: &[u8]) -> Result<Self, DecodeError> {
        if data.len() < EAPOL_BASE_LENGTH {
            return Err(DecodeError::TooShort);
        }
        if data[0] != EAPOL_PROTOCOL_VERSION {
            return Err(DecodeError::UnsupportedVersion);
        }
        let packet_type = data[1];
        let packet_length = u16::from_be_bytes([data[2], data[3]]) as usize;
        let body = data
            .get(EAPOL_BASE_LENGTH..EAPOL_BASE_LENGTH + packet_length)
            .ok_or(DecodeError::LengthMismatch)?;
        match packet_type {
            EAPOL_EAP_TYPE => Ok(Self::Eap(EapFrame::parse(body)?)),
            EAPOL_KEY_TYPE => Ok(Self::Key(KeyFrame::parse(body)?)),
            EAPOL_START_TYPE if packet_length == 0 => Ok(Self::Start),
            EAPOL_LOGOFF_TYPE if packet_length == 0 => Ok(Self::Logoff),
            EAPOL_START_TYPE | EAPOL_LOGOFF_TYPE => Err(DecodeError::LengthMismatch),
            _ => Err(DecodeError::UnknownPacketType),
        }
    }

    pub fn packet_type(&self) -> u8 {
        match self {
            Self::Eap(_) => EAPOL_EAP_TYPE,
            Self::Key(_) => EAPOL_KEY_TYPE,
            Self::Start => EAPOL_START_TYPE,
            Self::Logoff => EAPOL_LOGOFF_TYPE,
        }
    }

    /// Length of the packet body, the value of the header length field.
    pub fn packet_length(&self) -> usize {
        match self {
            Self::Eap(eap) => eap.len(),
            Self::Key(key) => key.len(),
            Self::Start | Self::Logoff => 0,
        }
    }

    /// Appends the encoded PDU. Fails without writing anything when a length does not fit
    /// its 16-bit field.
    pub fn write_to(&self, out: &mut Vec<u8>) -> Result<(), SendError> {
        let packet_length = u16::try_from(self.packet_length()).map_err(|_| SendError::DataTooLarge)?;
        out.push(EAPOL_PROTOCOL_VERSION);
        out.push(self.packet_type());
        out.extend_from_slice(&packet_length.to_be_bytes());
        match self {
            Self::Eap(eap) => eap.write_to(out),
            Self::Key(key) => key.write_to(out),
            Self::Start | Self::Logoff => Ok(()),
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, SendError> {
        let mut out = Vec::with_capacity(EAPOL_BASE_LENGTH + self.packet_length());
        self.write_to(&mut out)?;
        Ok(out)
    }
}
