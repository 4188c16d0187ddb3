//! Adapter between the EAP-TLS state machines and an external TLS engine.

use zeroize::Zeroizing;

use crate::proto::{PMK_LEN, SEC_PROT_TIMER_TICK_MS, TLS_HEAD_LEN};
use crate::tls_data::TlsData;

/// Result of running the TLS engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TlsProcess {
    /// Waiting for the next message from the peer.
    Continue,
    /// The engine is in the middle of a long computation and must be run again before it
    /// reads more input.
    Calculating,
    /// The handshake completed.
    HandshakeOver,
    /// The handshake failed.
    Error,
    /// The handshake cannot run with the configured certificates or keys.
    ConfError,
}

/// Callbacks the TLS engine uses for I/O, key export and timers.
pub trait TlsIo {
    /// Queue a TLS record for the peer.
    fn send(&mut self, data: &[u8]);
    /// Read bytes received from the peer. Returns the number of bytes read, zero if none are
    /// pending.
    fn receive(&mut self, buf: &mut [u8]) -> usize;
    /// Hand over the exported EAP-TLS key material. Its first 32 bytes become the PMK.
    fn export_keys(&mut self, key_material: &[u8]);
    /// Arm the intermediate and final timers, in milliseconds. A final delay of zero cancels
    /// the timers.
    fn set_timer(&mut self, intermediate_ms: u32, final_ms: u32);
    /// -1 if cancelled, 0 if no delay expired, 1 if the intermediate and 2 if the final delay
    /// expired.
    fn get_timer(&self) -> i32;
}

/// An external TLS engine with the certificates of this node.
pub trait TlsEngine {
    /// Prepare a handshake as server or client.
    fn connect(&mut self, is_server: bool) -> TlsProcess;
    /// Run the handshake as far as the available input allows.
    fn process(&mut self, io: &mut dyn TlsIo) -> TlsProcess;
}

#[derive(Default)]
struct BridgeIo {
    incoming: Vec<u8>,
    incoming_read: usize,
    outgoing: TlsData,
    pmk: Option<Zeroizing<[u8; PMK_LEN]>>,
    intermediate_ms: u32,
    final_ms: u32,
    elapsed_ms: u32,
}

impl TlsIo for BridgeIo {
    fn send(&mut self, data: &[u8]) {
        if !self.outgoing.append(TLS_HEAD_LEN, data) {
            tracing::warn!("TLS send buffer allocation failed");
        }
    }

    fn receive(&mut self, buf: &mut [u8]) -> usize {
        let pending = &self.incoming[self.incoming_read..];
        let len = pending.len().min(buf.len());
        buf[..len].copy_from_slice(&pending[..len]);
        self.incoming_read += len;
        if self.incoming_read == self.incoming.len() {
            self.incoming.clear();
            self.incoming_read = 0;
        }
        len
    }

    fn export_keys(&mut self, key_material: &[u8]) {
        if let Some(pmk) = key_material.get(..PMK_LEN) {
            let mut key = Zeroizing::new([0u8; PMK_LEN]);
            key.copy_from_slice(pmk);
            self.pmk = Some(key);
        }
    }

    fn set_timer(&mut self, intermediate_ms: u32, final_ms: u32) {
        self.intermediate_ms = intermediate_ms;
        self.final_ms = final_ms;
        self.elapsed_ms = 0;
    }

    fn get_timer(&self) -> i32 {
        if self.final_ms == 0 {
            -1
        } else if self.elapsed_ms >= self.final_ms {
            2
        } else if self.elapsed_ms >= self.intermediate_ms {
            1
        } else {
            0
        }
    }
}

/// A TLS engine plus the buffers and timers it runs against.
///
/// Dropping the bridge terminates the TLS session.
pub struct TlsBridge<T: TlsEngine> {
    engine: T,
    io: BridgeIo,
    last: TlsProcess,
}

impl<T: TlsEngine> TlsBridge<T> {
    pub fn new(engine: T) -> Self {
        Self { engine, io: BridgeIo::default(), last: TlsProcess::Continue }
    }

    /// Starts the handshake. A client produces its first flight right away.
    pub fn start(&mut self, is_server: bool) -> TlsProcess {
        self.last = self.engine.connect(is_server);
        if self.last == TlsProcess::Continue && !is_server {
            return self.process(None);
        }
        self.last
    }

    /// Feeds a complete TLS message from the peer, if any, and runs the engine.
    pub fn process(&mut self, incoming: Option<Vec<u8>>) -> TlsProcess {
        if let Some(data) = incoming {
            self.io.incoming.extend_from_slice(&data);
        }
        self.last = self.engine.process(&mut self.io);
        self.last
    }

    /// Advances the engine timers. Returns the result of running the engine again if it was
    /// calculating or one of its timers expired.
    pub fn timer_timeout(&mut self, ticks: u16) -> Option<TlsProcess> {
        if self.io.final_ms > 0 {
            self.io.elapsed_ms = self.io.elapsed_ms.saturating_add(ticks as u32 * SEC_PROT_TIMER_TICK_MS);
        }
        if self.last == TlsProcess::Calculating || self.io.get_timer() > 0 {
            Some(self.process(None))
        } else {
            None
        }
    }

    pub fn is_calculating(&self) -> bool {
        self.last == TlsProcess::Calculating
    }

    /// Moves the records queued by the engine out of the bridge.
    pub fn take_outgoing(&mut self) -> TlsData {
        std::mem::take(&mut self.io.outgoing)
    }

    pub fn take_pmk(&mut self) -> Option<Zeroizing<[u8; PMK_LEN]>> {
        self.io.pmk.take()
    }
}
