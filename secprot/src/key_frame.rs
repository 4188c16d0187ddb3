//! EAPOL-Key MIC and message classification shared by the handshakes that use key frames.

use crate::crypto::{secure_eq, HmacSha1, SHA1_HMAC_SIZE};
use crate::eapol::{EapolPdu, KeyFrame, KeyInformation};
use crate::proto::*;
use crate::result::SendError;

/// Key information flags that identify a handshake message.
pub const KEY_MASK_INSTALL: u16 = KEY_INFO_INSTALL;
pub const KEY_MASK_ACK: u16 = KEY_INFO_KEY_ACK;
pub const KEY_MASK_MIC: u16 = KEY_INFO_KEY_MIC;
pub const KEY_MASK_SECURED: u16 = KEY_INFO_SECURED_KEY_FRAME;
pub const KEY_MASK_ENCRYPTED: u16 = KEY_INFO_ENCRYPTED_KEY_DATA;

/// The message identifying flags of a key frame, other bits cleared.
pub fn key_mask(info: &KeyInformation) -> u16 {
    info.pack() & (KEY_MASK_INSTALL | KEY_MASK_ACK | KEY_MASK_MIC | KEY_MASK_SECURED | KEY_MASK_ENCRYPTED)
}

/// HMAC-SHA1-128 over an EAPOL frame whose MIC field is zero.
pub fn mic_calculate<H: HmacSha1>(kck: &[u8; KCK_LEN], eapol: &[u8]) -> [u8; KEY_MIC_LEN] {
    let mut hmac = [0u8; SHA1_HMAC_SIZE];
    H::new().hash(kck, eapol, &mut hmac);
    let mut mic = [0u8; KEY_MIC_LEN];
    mic.copy_from_slice(&hmac[..KEY_MIC_LEN]);
    mic
}

/// Serializes the frame as an EAPOL PDU with its MIC filled in.
pub fn frame_build<H: HmacSha1>(kck: &[u8; KCK_LEN], frame: KeyFrame) -> Result<Vec<u8>, SendError> {
    let mut frame = frame;
    frame.key_mic = [0; KEY_MIC_LEN];
    let mut eapol = EapolPdu::Key(frame).to_bytes()?;
    let mic = mic_calculate::<H>(kck, &eapol);
    eapol[EAPOL_KEY_MIC_OFFSET..EAPOL_KEY_MIC_OFFSET + KEY_MIC_LEN].copy_from_slice(&mic);
    Ok(eapol)
}

/// Checks the MIC of a received EAPOL key PDU. `eapol` must be exactly the PDU, without
/// trailing bytes.
pub fn mic_verify<H: HmacSha1>(kck: &[u8; KCK_LEN], eapol: &[u8]) -> bool {
    let Some(received) = eapol.get(EAPOL_KEY_MIC_OFFSET..EAPOL_KEY_MIC_OFFSET + KEY_MIC_LEN) else {
        return false;
    };
    let mut zeroed = eapol.to_vec();
    zeroed[EAPOL_KEY_MIC_OFFSET..EAPOL_KEY_MIC_OFFSET + KEY_MIC_LEN].fill(0);
    secure_eq(&mic_calculate::<H>(kck, &zeroed), received)
}

/// The bytes of a received PDU covered by its header length, trailing padding removed.
pub fn pdu_bytes(data: &[u8], pdu: &EapolPdu) -> Option<usize> {
    let len = EAPOL_BASE_LENGTH + pdu.packet_length();
    (len <= data.len()).then_some(len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto_impl::CrateHmacSha1;

    fn frame() -> KeyFrame {
        let info = KeyInformation {
            description_version: KEY_DESCRIPTION_HMAC_SHA1_MIC_AES_ENC,
            key_mic: true,
            secured_key_frame: true,
            ..Default::default()
        };
        KeyFrame::new(info, 42, Vec::new())
    }

    #[test]
    fn mic_covers_the_whole_frame() {
        let kck = [3u8; KCK_LEN];
        let mut eapol = frame_build::<CrateHmacSha1>(&kck, frame()).unwrap();
        assert!(mic_verify::<CrateHmacSha1>(&kck, &eapol));
        assert!(!mic_verify::<CrateHmacSha1>(&[4u8; KCK_LEN], &eapol));
        // Replay counter
        eapol[16] ^= 1;
        assert!(!mic_verify::<CrateHmacSha1>(&kck, &eapol));
        assert!(!mic_verify::<CrateHmacSha1>(&kck, &eapol[..40]));
    }

    #[test]
    fn mask_ignores_version_and_pairwise() {
        let mut f = frame();
        f.key_information.pairwise_key = true;
        f.key_information.request = true;
        assert_eq!(key_mask(&f.key_information), KEY_MASK_MIC | KEY_MASK_SECURED);
    }
}
