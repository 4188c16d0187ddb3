use zeroize::Zeroizing;

use crate::application::CryptoLayer;
use crate::crypto::{secure_eq, HmacMd5, Md5Hash, MD5_HASH_SIZE};
use crate::proto::*;
use crate::result::{fault, DecodeError, FaultType, ReceiveError, SendError};

/// The attributes of an Access-Request, in the order they are written.
pub struct AccessRequest<'a> {
    pub identifier: u8,
    pub authenticator: [u8; RADIUS_AUTHENTICATOR_LEN],
    pub user_name: &'a [u8],
    pub nas_ipv6_address: Option<&'a [u8; NAS_IPV6_ADDRESS_LEN]>,
    pub called_station_id: &'a str,
    pub calling_station_id: &'a str,
    pub state: Option<&'a [u8]>,
    pub eap: &'a [u8],
}

fn avp_write(out: &mut Vec<u8>, avp_type: u8, value: &[u8]) -> Result<(), SendError> {
    if value.len() > AVP_VALUE_MAX_LEN {
        return Err(SendError::DataTooLarge);
    }
    out.push(avp_type);
    out.push((value.len() + AVP_HEADER_LEN) as u8);
    out.extend_from_slice(value);
    Ok(())
}

/// Writes a Message-Authenticator attribute holding zeros and returns the offset of its value.
fn message_authenticator_reserve(out: &mut Vec<u8>) -> Result<usize, SendError> {
    avp_write(out, AVP_TYPE_MESSAGE_AUTHENTICATOR, &[0u8; MESSAGE_AUTHENTICATOR_LEN])?;
    Ok(out.len() - MESSAGE_AUTHENTICATOR_LEN)
}

fn length_set(out: &mut [u8]) -> Result<(), SendError> {
    if out.len() > RADIUS_MAX_LEN {
        return Err(SendError::DataTooLarge);
    }
    let len = (out.len() as u16).to_be_bytes();
    out[2..4].copy_from_slice(&len);
    Ok(())
}

fn message_authenticator_calculate<H: HmacMd5>(secret: &[u8], message: &[u8]) -> [u8; MD5_HASH_SIZE] {
    let mut mac = [0u8; MD5_HASH_SIZE];
    H::new().hash(secret, message, &mut mac);
    mac
}

fn response_authenticator_calculate<M: Md5Hash>(
    secret: &[u8],
    message: &[u8],
    request_authenticator: &[u8; RADIUS_AUTHENTICATOR_LEN],
) -> [u8; MD5_HASH_SIZE] {
    let mut md5 = M::new();
    md5.update(&message[..RADIUS_AUTHENTICATOR_OFFSET]);
    md5.update(request_authenticator);
    md5.update(&message[RADIUS_HEADER_LEN..]);
    md5.update(secret);
    let mut out = [0u8; MD5_HASH_SIZE];
    md5.finish_and_reset(&mut out);
    out
}

impl<'a> AccessRequest<'a> {
    /// Encodes the request. The Message-Authenticator is computed over the finished message.
    pub fn build<H: HmacMd5>(&self, secret: &[u8]) -> Result<Vec<u8>, SendError> {
        let mut out = Vec::with_capacity(RADIUS_HEADER_LEN + 128 + self.eap.len());
        out.push(RADIUS_ACCESS_REQUEST);
        out.push(self.identifier);
        out.extend_from_slice(&[0, 0]);
        out.extend_from_slice(&self.authenticator);

        avp_write(&mut out, AVP_TYPE_USER_NAME, self.user_name)?;
        if let Some(address) = self.nas_ipv6_address {
            avp_write(&mut out, AVP_TYPE_NAS_IPV6_ADDRESS, address)?;
        }
        avp_write(&mut out, AVP_TYPE_CALLED_STATION_ID, self.called_station_id.as_bytes())?;
        avp_write(&mut out, AVP_TYPE_CALLING_STATION_ID, self.calling_station_id.as_bytes())?;
        avp_write(&mut out, AVP_TYPE_NAS_IDENTIFIER, NAS_IDENTIFIER)?;
        avp_write(&mut out, AVP_TYPE_NAS_PORT, &NAS_PORT.to_be_bytes())?;
        avp_write(&mut out, AVP_TYPE_NAS_PORT_TYPE, &NAS_PORT_TYPE_WIRELESS_802_11.to_be_bytes())?;
        avp_write(&mut out, AVP_TYPE_FRAMED_MTU, &FRAMED_MTU.to_be_bytes())?;
        if let Some(state) = self.state {
            avp_write(&mut out, AVP_TYPE_STATE, state)?;
        }
        for chunk in self.eap.chunks(AVP_VALUE_MAX_LEN) {
            avp_write(&mut out, AVP_TYPE_EAP_MESSAGE, chunk)?;
        }
        let ma = message_authenticator_reserve(&mut out)?;
        length_set(&mut out)?;

        let mac = message_authenticator_calculate::<H>(secret, &out);
        out[ma..ma + MESSAGE_AUTHENTICATOR_LEN].copy_from_slice(&mac);
        Ok(out)
    }
}

/// A validated Access-Accept, Access-Reject or Access-Challenge.
#[derive(Debug)]
pub struct RadiusResponse {
    pub code: u8,
    pub identifier: u8,
    /// The EAP-Message attributes joined into one EAP packet.
    pub eap: Vec<u8>,
    pub state: Option<Vec<u8>>,
    /// The decrypted MS-MPPE-Recv-Key.
    pub recv_key: Option<Zeroizing<Vec<u8>>>,
}

/// Identifier of a RADIUS message, used to find the request it answers.
pub fn identifier_get(data: &[u8]) -> Option<u8> {
    (data.len() >= RADIUS_HEADER_LEN).then(|| data[1])
}

/// RFC 2548 MS-MPPE key decryption. `value` is the salt followed by the encrypted string.
fn mppe_key_decrypt<M: Md5Hash>(
    value: &[u8],
    secret: &[u8],
    request_authenticator: &[u8; RADIUS_AUTHENTICATOR_LEN],
) -> Option<Zeroizing<Vec<u8>>> {
    if value.len() < MPPE_SALT_LEN {
        return None;
    }
    let (salt, cipher) = value.split_at(MPPE_SALT_LEN);
    if cipher.is_empty() || cipher.len() % MD5_HASH_SIZE != 0 || salt[0] & 0x80 == 0 {
        return None;
    }
    let mut plain = Zeroizing::new(Vec::with_capacity(cipher.len()));
    let mut md5 = M::new();
    let mut b = Zeroizing::new([0u8; MD5_HASH_SIZE]);
    let mut previous: &[u8] = &[];
    for block in cipher.chunks(MD5_HASH_SIZE) {
        md5.update(secret);
        if previous.is_empty() {
            md5.update(request_authenticator);
            md5.update(salt);
        } else {
            md5.update(previous);
        }
        md5.finish_and_reset(&mut b);
        plain.extend(block.iter().zip(b.iter()).map(|(c, k)| c ^ k));
        previous = block;
    }
    let key_len = plain[0] as usize;
    if key_len < PMK_LEN || key_len + 1 > plain.len() {
        return None;
    }
    Some(Zeroizing::new(plain[1..1 + key_len].to_vec()))
}

/// RFC 2548 MS-MPPE key encryption, the server side of `mppe_key_decrypt`.
#[cfg(any(test, feature = "radius-server"))]
pub fn mppe_key_encrypt<M: Md5Hash>(
    key: &[u8],
    salt: [u8; MPPE_SALT_LEN],
    secret: &[u8],
    request_authenticator: &[u8; RADIUS_AUTHENTICATOR_LEN],
) -> Vec<u8> {
    let mut plain = Zeroizing::new(Vec::with_capacity(key.len() + MD5_HASH_SIZE));
    plain.push(key.len() as u8);
    plain.extend_from_slice(key);
    let padded = plain.len().div_ceil(MD5_HASH_SIZE) * MD5_HASH_SIZE;
    plain.resize(padded, 0);

    let mut out = salt.to_vec();
    let mut md5 = M::new();
    let mut b = [0u8; MD5_HASH_SIZE];
    for (i, block) in plain.chunks(MD5_HASH_SIZE).enumerate() {
        md5.update(secret);
        if i == 0 {
            md5.update(request_authenticator);
            md5.update(&salt);
        } else {
            let start = MPPE_SALT_LEN + (i - 1) * MD5_HASH_SIZE;
            md5.update(&out[start..start + MD5_HASH_SIZE]);
        }
        md5.finish_and_reset(&mut b);
        let cipher: Vec<u8> = block.iter().zip(b.iter()).map(|(p, k)| p ^ k).collect();
        out.extend_from_slice(&cipher);
    }
    out
}

/// Checks a response against the outstanding request and decodes it.
///
/// Rejects any message whose Response-Authenticator or Message-Authenticator does not verify
/// with the shared secret.
pub fn response_validate<C: CryptoLayer>(
    data: &[u8],
    identifier: u8,
    request_authenticator: &[u8; RADIUS_AUTHENTICATOR_LEN],
    secret: &[u8],
) -> Result<RadiusResponse, ReceiveError> {
    if data.len() < RADIUS_HEADER_LEN {
        return Err(DecodeError::TooShort.into());
    }
    let len = u16::from_be_bytes([data[2], data[3]]) as usize;
    if len < RADIUS_HEADER_LEN || len > data.len() || len > RADIUS_MAX_LEN {
        return Err(DecodeError::LengthMismatch.into());
    }
    let message = &data[..len];
    let code = message[0];
    if message[1] != identifier {
        return Err(fault!(FaultType::UnknownIdentifier, true));
    }
    if !matches!(code, RADIUS_ACCESS_ACCEPT | RADIUS_ACCESS_REJECT | RADIUS_ACCESS_CHALLENGE) {
        return Err(DecodeError::UnknownRadiusCode.into());
    }
    let expected = response_authenticator_calculate::<C::Md5>(secret, message, request_authenticator);
    if !secure_eq(&expected, &message[RADIUS_AUTHENTICATOR_OFFSET..RADIUS_HEADER_LEN]) {
        return Err(fault!(FaultType::FailedAuth, true));
    }

    let mut response = RadiusResponse { code, identifier, eap: Vec::new(), state: None, recv_key: None };
    let mut message_authenticator = None;
    let mut recv_key = None;
    let mut offset = RADIUS_HEADER_LEN;
    while offset < len {
        let header = message.get(offset..offset + AVP_HEADER_LEN).ok_or(DecodeError::InvalidAttribute)?;
        let (avp_type, avp_len) = (header[0], header[1] as usize);
        if avp_len < AVP_HEADER_LEN || offset + avp_len > len {
            return Err(DecodeError::InvalidAttribute.into());
        }
        let value = &message[offset + AVP_HEADER_LEN..offset + avp_len];
        match avp_type {
            AVP_TYPE_EAP_MESSAGE => response.eap.extend_from_slice(value),
            AVP_TYPE_STATE => response.state = Some(value.to_vec()),
            AVP_TYPE_MESSAGE_AUTHENTICATOR => {
                if value.len() != MESSAGE_AUTHENTICATOR_LEN {
                    return Err(DecodeError::InvalidAttribute.into());
                }
                message_authenticator = Some(offset + AVP_HEADER_LEN);
            }
            AVP_TYPE_VENDOR_SPECIFIC => {
                // vendor id (4), vendor type (1), vendor length (1), value
                if value.len() >= 6
                    && u32::from_be_bytes([value[0], value[1], value[2], value[3]]) == VENDOR_ID_MICROSOFT
                    && value[4] == VENDOR_TYPE_MS_MPPE_RECV_KEY
                    && value[5] as usize == value.len() - 4
                {
                    recv_key = Some(&value[6..]);
                }
            }
            _ => {}
        }
        offset += avp_len;
    }

    if let Some(ma) = message_authenticator {
        let mut copy = message.to_vec();
        copy[RADIUS_AUTHENTICATOR_OFFSET..RADIUS_HEADER_LEN].copy_from_slice(request_authenticator);
        copy[ma..ma + MESSAGE_AUTHENTICATOR_LEN].fill(0);
        let expected = message_authenticator_calculate::<C::HmacMd5>(secret, &copy);
        if !secure_eq(&expected, &message[ma..ma + MESSAGE_AUTHENTICATOR_LEN]) {
            return Err(fault!(FaultType::FailedAuth, true));
        }
    }

    if code == RADIUS_ACCESS_ACCEPT {
        if let Some(value) = recv_key {
            response.recv_key = mppe_key_decrypt::<C::Md5>(value, secret, request_authenticator);
            if response.recv_key.is_none() {
                return Err(DecodeError::InvalidAttribute.into());
            }
        }
    }
    Ok(response)
}

/// Encodes a response the way a RADIUS server does: EAP-Message, State, MS-MPPE-Recv-Key,
/// Message-Authenticator, then the Response-Authenticator over the result.
#[cfg(any(test, feature = "radius-server"))]
pub fn response_build<C: CryptoLayer>(
    code: u8,
    identifier: u8,
    request_authenticator: &[u8; RADIUS_AUTHENTICATOR_LEN],
    secret: &[u8],
    eap: &[u8],
    state: Option<&[u8]>,
    recv_key: Option<(&[u8], [u8; MPPE_SALT_LEN])>,
) -> Result<Vec<u8>, SendError> {
    let mut out = vec![code, identifier, 0, 0];
    out.extend_from_slice(request_authenticator);
    for chunk in eap.chunks(AVP_VALUE_MAX_LEN) {
        avp_write(&mut out, AVP_TYPE_EAP_MESSAGE, chunk)?;
    }
    if let Some(state) = state {
        avp_write(&mut out, AVP_TYPE_STATE, state)?;
    }
    if let Some((key, salt)) = recv_key {
        let encrypted = mppe_key_encrypt::<C::Md5>(key, salt, secret, request_authenticator);
        let mut vsa = VENDOR_ID_MICROSOFT.to_be_bytes().to_vec();
        vsa.push(VENDOR_TYPE_MS_MPPE_RECV_KEY);
        vsa.push((encrypted.len() + 2) as u8);
        vsa.extend_from_slice(&encrypted);
        avp_write(&mut out, AVP_TYPE_VENDOR_SPECIFIC, &vsa)?;
    }
    let ma = message_authenticator_reserve(&mut out)?;
    length_set(&mut out)?;
    let mac = message_authenticator_calculate::<C::HmacMd5>(secret, &out);
    out[ma..ma + MESSAGE_AUTHENTICATOR_LEN].copy_from_slice(&mac);
    let auth = response_authenticator_calculate::<C::Md5>(secret, &out, request_authenticator);
    out[RADIUS_AUTHENTICATOR_OFFSET..RADIUS_HEADER_LEN].copy_from_slice(&auth);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto_impl::CrateHmacMd5;
    use crate::test_util::TestCrypto;

    const SECRET: &[u8] = b"testing123";
    const REQ_AUTH: [u8; 16] = [0x21; 16];

    fn accept(eap: &[u8]) -> Vec<u8> {
        let key: Vec<u8> = (0..32).collect();
        response_build::<TestCrypto>(RADIUS_ACCESS_ACCEPT, 7, &REQ_AUTH, SECRET, eap, None, Some((&key, [0x81, 0x02])))
            .unwrap()
    }

    #[test]
    fn access_request_layout() {
        let eap = vec![0x55u8; 300];
        let request = AccessRequest {
            identifier: 9,
            authenticator: REQ_AUTH,
            user_name: b"Anonymous",
            nas_ipv6_address: None,
            called_station_id: "00-11-22-33-44-55-66-77",
            calling_station_id: "88-99-AA-BB-CC-DD-EE-FF",
            state: Some(b"st"),
            eap: &eap,
        };
        let msg = request.build::<CrateHmacMd5>(SECRET).unwrap();
        assert_eq!(msg[0], RADIUS_ACCESS_REQUEST);
        assert_eq!(msg[1], 9);
        assert_eq!(u16::from_be_bytes([msg[2], msg[3]]) as usize, msg.len());
        assert_eq!(msg[RADIUS_HEADER_LEN], AVP_TYPE_USER_NAME);

        let mut types = Vec::new();
        let mut offset = RADIUS_HEADER_LEN;
        let mut eap_joined = Vec::new();
        while offset < msg.len() {
            let (t, l) = (msg[offset], msg[offset + 1] as usize);
            if t == AVP_TYPE_EAP_MESSAGE {
                eap_joined.extend_from_slice(&msg[offset + 2..offset + l]);
            }
            types.push(t);
            offset += l;
        }
        assert_eq!(
            types,
            [
                AVP_TYPE_USER_NAME,
                AVP_TYPE_CALLED_STATION_ID,
                AVP_TYPE_CALLING_STATION_ID,
                AVP_TYPE_NAS_IDENTIFIER,
                AVP_TYPE_NAS_PORT,
                AVP_TYPE_NAS_PORT_TYPE,
                AVP_TYPE_FRAMED_MTU,
                AVP_TYPE_STATE,
                AVP_TYPE_EAP_MESSAGE,
                AVP_TYPE_EAP_MESSAGE,
                AVP_TYPE_MESSAGE_AUTHENTICATOR,
            ]
        );
        assert_eq!(eap_joined, eap);

        // The Message-Authenticator verifies with the value zeroed.
        let ma = msg.len() - MESSAGE_AUTHENTICATOR_LEN;
        let mut zeroed = msg.clone();
        zeroed[ma..].fill(0);
        assert_eq!(message_authenticator_calculate::<CrateHmacMd5>(SECRET, &zeroed), msg[ma..]);
    }

    #[test]
    fn untampered_response_is_accepted() {
        let eap = [EAP_SUCCESS, 4, 0, 4];
        let response = response_validate::<TestCrypto>(&accept(&eap), 7, &REQ_AUTH, SECRET).unwrap();
        assert_eq!(response.code, RADIUS_ACCESS_ACCEPT);
        assert_eq!(response.eap, eap);
        assert_eq!(response.recv_key.as_deref().map(|k| k.as_slice()), Some(&(0..32).collect::<Vec<u8>>()[..]));
    }

    #[test]
    fn tampered_response_is_rejected() {
        let msg = accept(&[EAP_SUCCESS, 4, 0, 4]);
        for i in [1, 5, RADIUS_HEADER_LEN + 2, msg.len() - 1] {
            let mut tampered = msg.clone();
            tampered[i] ^= 0x01;
            assert!(response_validate::<TestCrypto>(&tampered, 7, &REQ_AUTH, SECRET).is_err(), "byte {}", i);
        }
        assert!(response_validate::<TestCrypto>(&msg, 7, &REQ_AUTH, b"wrong").is_err());
        assert!(response_validate::<TestCrypto>(&msg, 7, &[0x22; 16], SECRET).is_err());
        assert!(matches!(
            response_validate::<TestCrypto>(&msg, 8, &REQ_AUTH, SECRET),
            Err(ReceiveError::ByzantineFault { error: FaultType::UnknownIdentifier, .. })
        ));
    }

    #[test]
    fn message_authenticator_is_checked_independently() {
        // Recompute the Response-Authenticator after breaking the Message-Authenticator so only
        // the latter fails.
        let mut msg = accept(&[EAP_SUCCESS, 4, 0, 4]);
        let last = msg.len() - 1;
        msg[last] ^= 0x80;
        let auth = response_authenticator_calculate::<<TestCrypto as CryptoLayer>::Md5>(SECRET, &msg, &REQ_AUTH);
        msg[RADIUS_AUTHENTICATOR_OFFSET..RADIUS_HEADER_LEN].copy_from_slice(&auth);
        assert!(matches!(
            response_validate::<TestCrypto>(&msg, 7, &REQ_AUTH, SECRET),
            Err(ReceiveError::ByzantineFault { error: FaultType::FailedAuth, .. })
        ));
    }

    #[test]
    fn malformed_responses() {
        assert!(matches!(
            response_validate::<TestCrypto>(&[2, 7, 0], 7, &REQ_AUTH, SECRET),
            Err(ReceiveError::Decode(DecodeError::TooShort))
        ));
        let mut msg = accept(&[]);
        msg[3] = msg[3].wrapping_add(1);
        assert!(matches!(
            response_validate::<TestCrypto>(&msg, 7, &REQ_AUTH, SECRET),
            Err(ReceiveError::Decode(DecodeError::LengthMismatch))
        ));
    }

    #[test]
    fn short_mppe_key_is_rejected() {
        let short = mppe_key_encrypt::<<TestCrypto as CryptoLayer>::Md5>(&[1; 16], [0x80, 0], SECRET, &REQ_AUTH);
        assert!(mppe_key_decrypt::<<TestCrypto as CryptoLayer>::Md5>(&short, SECRET, &REQ_AUTH).is_none());
        let no_high_bit = mppe_key_encrypt::<<TestCrypto as CryptoLayer>::Md5>(&[1; 32], [0x00, 0], SECRET, &REQ_AUTH);
        assert!(mppe_key_decrypt::<<TestCrypto as CryptoLayer>::Md5>(&no_high_bit, SECRET, &REQ_AUTH).is_none());
    }
}
