use std::collections::VecDeque;

use rand_core::{CryptoRng, RngCore};

use crate::application::{ApplicationLayer, CryptoLayer, Settings};
use crate::common::SecProtResult;
use crate::eapol::{EapFrame, EapolPdu, KeyFrame};
use crate::gtks::SecProtGtkKeys;
use crate::keys::SecProtKeys;
use crate::radius::RadiusShared;
use crate::result::SendError;
use crate::sec_prot::{KmpEvent, ProtocolKind, SecProtContext};
use crate::tls_bridge::{TlsEngine, TlsIo, TlsProcess};

pub type TestSha256 = crate::crypto_impl::CrateSha256;

/// Deterministic xorshift64* generator. Not secure; tests only.
pub struct XorShiftRng(u64);

impl XorShiftRng {
    pub fn new(seed: u64) -> Self {
        Self(seed.wrapping_mul(0x9e37_79b9_7f4a_7c15) | 1)
    }
}

impl RngCore for XorShiftRng {
    fn next_u32(&mut self) -> u32 {
        (self.next_u64() >> 32) as u32
    }

    fn next_u64(&mut self) -> u64 {
        self.0 ^= self.0 >> 12;
        self.0 ^= self.0 << 25;
        self.0 ^= self.0 >> 27;
        self.0.wrapping_mul(0x2545_f491_4f6c_dd1d)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(8) {
            let v = self.next_u64().to_le_bytes();
            chunk.copy_from_slice(&v[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand_core::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl CryptoRng for XorShiftRng {}

pub struct TestCrypto;

impl crate::crypto_impl::DefaultCrypto for TestCrypto {
    type Rng = XorShiftRng;
}

/// One scripted step of `MockTls`.
pub struct MockStep {
    output: Vec<u8>,
    keys: Option<Vec<u8>>,
    result: TlsProcess,
    calculating: u8,
}

impl MockStep {
    pub fn send(output: &[u8], result: TlsProcess) -> Self {
        Self { output: output.to_vec(), keys: None, result, calculating: 0 }
    }

    /// Sends the last flight, exports key material and reports the handshake over.
    pub fn finish(output: &[u8], keys: &[u8]) -> Self {
        Self { output: output.to_vec(), keys: Some(keys.to_vec()), result: TlsProcess::HandshakeOver, calculating: 0 }
    }

    /// Report `Calculating` this many times before running the step.
    pub fn calculating(mut self, times: u8) -> Self {
        self.calculating = times;
        self
    }
}

/// TLS engine that plays back a script, one step per `process` call.
pub struct MockTls {
    script: VecDeque<MockStep>,
    pub received: Vec<u8>,
}

impl MockTls {
    pub fn new(script: Vec<MockStep>) -> Self {
        Self { script: script.into(), received: Vec::new() }
    }
}

impl TlsEngine for MockTls {
    fn connect(&mut self, _is_server: bool) -> TlsProcess {
        TlsProcess::Continue
    }

    fn process(&mut self, io: &mut dyn TlsIo) -> TlsProcess {
        let mut buf = [0u8; 256];
        loop {
            let n = io.receive(&mut buf);
            if n == 0 {
                break;
            }
            self.received.extend_from_slice(&buf[..n]);
        }
        let Some(step) = self.script.front_mut() else {
            return TlsProcess::Error;
        };
        if step.calculating > 0 {
            step.calculating -= 1;
            return TlsProcess::Calculating;
        }
        let Some(step) = self.script.pop_front() else {
            return TlsProcess::Error;
        };
        if !step.output.is_empty() {
            io.send(&step.output);
        }
        if let Some(keys) = &step.keys {
            io.export_keys(keys);
        }
        step.result
    }
}

/// Application that records everything the protocols hand to it.
#[derive(Default)]
pub struct TestApp {
    pub sent: Vec<([u8; 8], u8, Vec<u8>)>,
    pub radius_sent: Vec<Vec<u8>>,
    pub confirms: Vec<(ProtocolKind, SecProtResult)>,
    pub indications: Vec<ProtocolKind>,
    pub finished_ind: Vec<(ProtocolKind, SecProtResult)>,
    pub finished: Vec<ProtocolKind>,
    pub tls: VecDeque<MockTls>,
    pub tls_created: usize,
    pub refuse: bool,
}

impl TestApp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tls(script: Vec<MockStep>) -> Self {
        let mut app = Self::new();
        app.tls.push_back(MockTls::new(script));
        app
    }

    /// Removes and decodes the last EAPOL PDU sent.
    pub fn take_pdu(&mut self) -> EapolPdu {
        let (_, _, pdu) = self.sent.pop().expect("nothing sent");
        EapolPdu::parse(&pdu).expect("sent PDU does not decode")
    }

    pub fn take_eap(&mut self) -> EapFrame {
        match self.take_pdu() {
            EapolPdu::Eap(eap) => eap,
            other => panic!("expected EAP, got {:?}", other),
        }
    }

    pub fn take_key(&mut self) -> (KeyFrame, Vec<u8>) {
        let (_, _, pdu) = self.sent.pop().expect("nothing sent");
        match EapolPdu::parse(&pdu).expect("sent PDU does not decode") {
            EapolPdu::Key(key) => (key, pdu),
            other => panic!("expected key frame, got {:?}", other),
        }
    }
}

impl<C: CryptoLayer> ApplicationLayer<C> for TestApp {
    type Tls = MockTls;

    fn send(&mut self, peer: &[u8; 8], kmp_id: u8, pdu: &[u8]) -> Result<(), SendError> {
        self.sent.push((*peer, kmp_id, pdu.to_vec()));
        Ok(())
    }

    fn radius_send(&mut self, message: &[u8]) -> Result<(), SendError> {
        self.radius_sent.push(message.to_vec());
        Ok(())
    }

    fn create_confirm(&mut self, _: &[u8; 8], kind: ProtocolKind, result: SecProtResult) {
        self.confirms.push((kind, result));
    }

    fn create_indication(&mut self, _: &[u8; 8], kind: ProtocolKind) -> bool {
        self.indications.push(kind);
        !self.refuse
    }

    fn finished_indication(&mut self, _: &[u8; 8], kind: ProtocolKind, result: SecProtResult, _: &SecProtKeys) {
        self.finished_ind.push((kind, result));
    }

    fn finished(&mut self, _: &[u8; 8], kind: ProtocolKind) {
        self.finished.push(kind);
    }

    fn tls_create(&mut self, _: &[u8; 8], _: bool) -> Option<MockTls> {
        self.tls_created += 1;
        self.tls.pop_front()
    }
}

/// An EAPOL-EAP PDU.
pub fn eap_pdu(code: u8, id_seq: u8, eap_type: u8, data: &[u8]) -> Vec<u8> {
    EapolPdu::Eap(EapFrame::new(code, id_seq, eap_type, data.to_vec())).to_bytes().unwrap()
}

pub const LOCAL_EUI64: [u8; 8] = [0x02, 0, 0, 0, 0, 0, 0, 0x01];
pub const REMOTE_EUI64: [u8; 8] = [0x02, 0, 0, 0, 0, 0, 0, 0x02];

/// Everything a protocol instance borrows during a call, owned in one place.
pub struct Harness {
    pub app: TestApp,
    pub rng: XorShiftRng,
    pub settings: Settings,
    pub keys: SecProtKeys,
    pub gtks: SecProtGtkKeys,
    pub radius: RadiusShared,
    pub events: Vec<KmpEvent>,
}

impl Harness {
    pub fn new(app: TestApp) -> Self {
        let mut rng = XorShiftRng::new(0x5eed);
        let radius = RadiusShared::new(&mut rng);
        Self {
            app,
            rng,
            settings: Settings::default(),
            keys: SecProtKeys::new(),
            gtks: SecProtGtkKeys::new(),
            radius,
            events: Vec::new(),
        }
    }

    pub fn run<R>(&mut self, f: impl FnOnce(&mut SecProtContext<'_, TestCrypto, TestApp>) -> R) -> R {
        let mut ctx = SecProtContext {
            app: &mut self.app,
            rng: &mut self.rng,
            settings: &self.settings,
            keys: &mut self.keys,
            gtks: &mut self.gtks,
            radius: &mut self.radius,
            local_eui64: &LOCAL_EUI64,
            remote_eui64: &REMOTE_EUI64,
            events: &mut self.events,
        };
        f(&mut ctx)
    }
}
