//! EAP-TLS fragmentation and reassembly shared by all EAP-TLS roles.

use crate::eapol::EapFrame;
use crate::proto::*;
use crate::tls_data::TlsData;

/// Outcome of handling one inbound EAP-TLS message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EapTlsMsg {
    /// The peer (re)started the TLS exchange.
    Start,
    /// Not a new sequence; nothing was stored.
    Duplicate,
    /// The peer acknowledged a non-final fragment of ours, send the next one.
    Continue,
    /// A non-final fragment was stored, acknowledge it with an empty message.
    MoreFrag,
    /// The peer acknowledged our final fragment, or had nothing to send. Send buffer freed.
    SendDone,
    /// A complete TLS message is in the receive buffer.
    ReceiveDone,
    /// A receive buffer could not be allocated.
    Fail,
    /// The fragment framing is invalid. The receive buffer is freed.
    DecodeError,
}

/// Decodes an inbound EAP-TLS payload, `data` starting at the flags byte.
pub fn message_handle(data: &[u8], new_seq: bool, send: &mut TlsData, recv: &mut TlsData) -> EapTlsMsg {
    let Some((&flags, mut payload)) = data.split_first() else {
        return EapTlsMsg::DecodeError;
    };
    if flags & EAP_TLS_START != 0 {
        return EapTlsMsg::Start;
    }
    if !new_seq {
        return EapTlsMsg::Duplicate;
    }
    let more = flags & EAP_TLS_MORE_FRAGMENTS != 0;

    if flags & EAP_TLS_FRAGMENT_LENGTH != 0 {
        let Some(len) = payload.get(..4) else {
            return EapTlsMsg::DecodeError;
        };
        let total_len = u32::from_be_bytes([len[0], len[1], len[2], len[3]]) as usize;
        payload = &payload[4..];
        // Only the first fragment's length counts.
        if recv.is_empty() {
            if total_len == 0 || total_len > TLS_MESSAGE_MAX_LEN {
                return EapTlsMsg::DecodeError;
            }
            if !recv.allocate(TLS_HEAD_LEN, total_len) {
                return EapTlsMsg::Fail;
            }
        }
    }

    if payload.is_empty() && !more {
        if !send.is_empty() && send.remaining() > EAP_TLS_FRAGMENT_LEN {
            send.handled_advance(EAP_TLS_FRAGMENT_LEN);
            return EapTlsMsg::Continue;
        }
        send.free();
        return EapTlsMsg::SendDone;
    }

    // The peer sends data only after it has all of ours.
    if !send.is_empty() {
        if send.remaining() > EAP_TLS_FRAGMENT_LEN {
            recv.free();
            return EapTlsMsg::DecodeError;
        }
        send.free();
    }

    if recv.is_empty() {
        if more {
            return EapTlsMsg::DecodeError;
        }
        if !recv.allocate(TLS_HEAD_LEN, payload.len()) {
            return EapTlsMsg::Fail;
        }
    }
    if !recv.receive(payload) {
        recv.free();
        return EapTlsMsg::DecodeError;
    }
    if more {
        EapTlsMsg::MoreFrag
    } else if recv.is_complete() {
        EapTlsMsg::ReceiveDone
    } else {
        recv.free();
        EapTlsMsg::DecodeError
    }
}

/// Builds the next outbound fragment of `send` as an EAP-TLS packet.
///
/// `flags` are extra flags such as `EAP_TLS_START`. An empty send buffer yields a message with
/// only the flags byte, which is also how fragments are acknowledged. Building does not
/// advance the buffer; that happens when the peer acknowledges the fragment, so a resend
/// rebuilds the same fragment.
pub fn message_build(code: u8, id_seq: u8, flags: u8, send: &mut TlsData) -> EapFrame {
    let mut flags = flags;
    let mut data = Vec::new();
    if send.is_empty() || send.total_len() == 0 {
        data.push(flags);
        return EapFrame::new(code, id_seq, EAP_TLS, data);
    }
    let start = send.handled_len();
    let remaining = send.remaining();
    let frag_len = remaining.min(EAP_TLS_FRAGMENT_LEN);
    let mut head = 1;
    if remaining > EAP_TLS_FRAGMENT_LEN {
        flags |= EAP_TLS_MORE_FRAGMENTS;
        if start == 0 {
            flags |= EAP_TLS_FRAGMENT_LENGTH;
            head += 4;
        }
    }
    let total_len = send.total_len() as u32;
    // Frame the header in the reserved head room.
    let header = send.header_mut();
    let header_start = header.len().saturating_sub(head);
    if let Some(h) = header.get_mut(header_start..) {
        if let Some((f, len)) = h.split_first_mut() {
            *f = flags;
            if len.len() == 4 {
                len.copy_from_slice(&total_len.to_be_bytes());
            }
        }
        data.reserve(head + frag_len);
        data.extend_from_slice(h);
    }
    data.extend_from_slice(&send.payload()[start..start + frag_len]);
    EapFrame::new(code, id_seq, EAP_TLS, data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transfer(len: usize) -> (Vec<u8>, usize) {
        let message: Vec<u8> = (0..len).map(|i| (i * 7 + 3) as u8).collect();
        let mut send = TlsData::new();
        if len > 0 {
            assert!(send.append(TLS_HEAD_LEN, &message));
        }
        let mut peer_send = TlsData::new();
        let mut peer_recv = TlsData::new();
        let mut own_recv = TlsData::new();
        let mut fragments = 0;
        loop {
            let frame = message_build(EAP_REQ, fragments as u8, 0, &mut send);
            fragments += 1;
            match message_handle(&frame.data, true, &mut peer_send, &mut peer_recv) {
                EapTlsMsg::MoreFrag => {
                    let ack = message_build(EAP_RESPONSE, frame.id_seq, 0, &mut peer_send);
                    assert_eq!(ack.data, [0]);
                    assert_eq!(message_handle(&ack.data, true, &mut send, &mut own_recv), EapTlsMsg::Continue);
                }
                EapTlsMsg::ReceiveDone => return (peer_recv.take_payload(), fragments),
                EapTlsMsg::SendDone => {
                    assert_eq!(len, 0);
                    return (peer_recv.take_payload(), fragments);
                }
                other => panic!("unexpected {:?}", other),
            }
        }
    }

    #[test]
    fn fragmentation_reassembles_any_length() {
        let f = EAP_TLS_FRAGMENT_LEN;
        for (len, frags) in [(0, 1), (1, 1), (f - 1, 1), (f, 1), (f + 1, 2), (10 * f, 10)] {
            let (received, fragments) = transfer(len);
            let expected: Vec<u8> = (0..len).map(|i| (i * 7 + 3) as u8).collect();
            assert_eq!(received, expected, "length {}", len);
            assert_eq!(fragments, frags, "length {}", len);
        }
    }

    #[test]
    fn fragment_flags() {
        let mut send = TlsData::new();
        send.append(TLS_HEAD_LEN, &[0xab; 2 * EAP_TLS_FRAGMENT_LEN + 10]);
        let first = message_build(EAP_REQ, 1, 0, &mut send);
        assert_eq!(first.data[0], EAP_TLS_MORE_FRAGMENTS | EAP_TLS_FRAGMENT_LENGTH);
        assert_eq!(&first.data[1..5], &((2 * EAP_TLS_FRAGMENT_LEN + 10) as u32).to_be_bytes());
        assert_eq!(first.data.len(), 5 + EAP_TLS_FRAGMENT_LEN);
        // A resend before the ack is identical.
        assert_eq!(message_build(EAP_REQ, 1, 0, &mut send), first);

        send.handled_advance(EAP_TLS_FRAGMENT_LEN);
        let middle = message_build(EAP_REQ, 2, 0, &mut send);
        assert_eq!(middle.data[0], EAP_TLS_MORE_FRAGMENTS);
        assert_eq!(middle.data.len(), 1 + EAP_TLS_FRAGMENT_LEN);

        send.handled_advance(EAP_TLS_FRAGMENT_LEN);
        let last = message_build(EAP_REQ, 3, 0, &mut send);
        assert_eq!(last.data[0], 0);
        assert_eq!(last.data.len(), 11);

        let start = message_build(EAP_REQ, 4, EAP_TLS_START, &mut TlsData::new());
        assert_eq!(start.data, [EAP_TLS_START]);
    }

    #[test]
    fn overflowing_fragment_is_rejected() {
        let mut send = TlsData::new();
        let mut recv = TlsData::new();
        let mut first = vec![EAP_TLS_MORE_FRAGMENTS | EAP_TLS_FRAGMENT_LENGTH];
        first.extend_from_slice(&10u32.to_be_bytes());
        first.extend_from_slice(&[1; 8]);
        assert_eq!(message_handle(&first, true, &mut send, &mut recv), EapTlsMsg::MoreFrag);
        assert_eq!(recv.handled_len(), 8);

        let mut second = vec![0u8];
        second.extend_from_slice(&[2; 5]);
        assert_eq!(message_handle(&second, true, &mut send, &mut recv), EapTlsMsg::DecodeError);
        assert!(recv.is_empty());
    }

    #[test]
    fn short_final_fragment_and_bad_lengths() {
        let mut send = TlsData::new();
        let mut recv = TlsData::new();
        let mut first = vec![EAP_TLS_MORE_FRAGMENTS | EAP_TLS_FRAGMENT_LENGTH];
        first.extend_from_slice(&10u32.to_be_bytes());
        first.extend_from_slice(&[1; 4]);
        assert_eq!(message_handle(&first, true, &mut send, &mut recv), EapTlsMsg::MoreFrag);
        assert_eq!(message_handle(&[0, 2, 2], true, &mut send, &mut recv), EapTlsMsg::DecodeError);

        assert_eq!(message_handle(&[EAP_TLS_FRAGMENT_LENGTH, 0, 0], true, &mut send, &mut recv), EapTlsMsg::DecodeError);
        let mut huge = vec![EAP_TLS_FRAGMENT_LENGTH | EAP_TLS_MORE_FRAGMENTS];
        huge.extend_from_slice(&(TLS_MESSAGE_MAX_LEN as u32 + 1).to_be_bytes());
        huge.push(0);
        assert_eq!(message_handle(&huge, true, &mut send, &mut recv), EapTlsMsg::DecodeError);
        // More fragments without a length on the first fragment.
        assert_eq!(message_handle(&[EAP_TLS_MORE_FRAGMENTS, 1], true, &mut send, &mut recv), EapTlsMsg::DecodeError);
        assert_eq!(message_handle(&[], true, &mut send, &mut recv), EapTlsMsg::DecodeError);
    }

    #[test]
    fn start_and_duplicates() {
        let mut send = TlsData::new();
        let mut recv = TlsData::new();
        assert_eq!(message_handle(&[EAP_TLS_START], false, &mut send, &mut recv), EapTlsMsg::Start);
        assert_eq!(message_handle(&[0, 1, 2, 3], false, &mut send, &mut recv), EapTlsMsg::Duplicate);
        assert!(recv.is_empty());
    }
}
