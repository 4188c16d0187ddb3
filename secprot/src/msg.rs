use crate::application::{ApplicationLayer, CryptoLayer};
use crate::common::{SecProtCommon, SecProtResult};
use crate::result::{fault, FaultType, ReceiveError};
use crate::sec_prot::{ProtocolKind, SecProt, SecProtContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Init,
    Finish,
    Finished,
}

/// Signals the lower layer about a peer, such as an authenticator rejecting a supplicant.
///
/// The signal is an empty send with KMP id zero. The protocol never talks to the remote
/// peer and finishes as soon as the signal has been handed over.
pub struct MsgSecProt {
    common: SecProtCommon<State>,
}

impl MsgSecProt {
    pub fn new() -> Self {
        Self { common: SecProtCommon::new(State::Init) }
    }
}

impl Default for MsgSecProt {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: CryptoLayer, App: ApplicationLayer<C>> SecProt<C, App> for MsgSecProt {
    fn kind(&self) -> ProtocolKind {
        ProtocolKind::Msg
    }

    fn create_request(&mut self, ctx: &mut SecProtContext<'_, C, App>) {
        if self.common.state() != State::Init {
            return;
        }
        ctx.create_confirm(ProtocolKind::Msg, SecProtResult::Ok);
        let result = if ctx.send_bytes(ProtocolKind::Msg, &[]) { SecProtResult::Ok } else { SecProtResult::Error };
        self.common.result_set(result);
        self.common.state_set(State::Finish);
        ctx.finished_indication(ProtocolKind::Msg, result);
    }

    fn receive(&mut self, _: &mut SecProtContext<'_, C, App>, _: &[u8]) -> Result<(), ReceiveError> {
        Err(fault!(FaultType::OutOfSequence, true))
    }

    fn timer_timeout(&mut self, _: &mut SecProtContext<'_, C, App>, _: u16) {}

    fn finished_send(&mut self, _: &mut SecProtContext<'_, C, App>) {
        self.common.state_set(State::Finished);
    }

    fn is_finished(&self) -> bool {
        self.common.state() == State::Finished
    }

    fn result(&self) -> SecProtResult {
        self.common.result()
    }
}
