use rand_core::RngCore;

use crate::trickle::{Trickle, TrickleParams};

/// Outcome of a security protocol run, reported through the finished indication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SecProtResult {
    #[default]
    None,
    Ok,
    Error,
    Timeout,
    ConfError,
    Ignore,
}

/// What a timer tick means for the owning state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    None,
    /// The last message should be sent again.
    Retry,
    /// Retries ran out or the protocol timeout expired.
    Timeout,
}

#[derive(Debug, Clone)]
enum RetryTimer {
    Stopped,
    Trickle(Trickle, TrickleParams),
    Fixed { interval: u16, remaining: u16, retries_left: u8 },
}

/// State, result and timers shared by every protocol instance.
///
/// `S` is the state enum of the owning state machine.
#[derive(Debug, Clone)]
pub struct SecProtCommon<S> {
    state: S,
    result: SecProtResult,
    ticks: u32,
    retry: RetryTimer,
}

impl<S: Copy + PartialEq> SecProtCommon<S> {
    pub fn new(state: S) -> Self {
        Self { state, result: SecProtResult::None, ticks: 0, retry: RetryTimer::Stopped }
    }

    pub fn state(&self) -> S {
        self.state
    }

    pub fn state_set(&mut self, state: S) {
        self.state = state;
    }

    pub fn result(&self) -> SecProtResult {
        self.result
    }

    pub fn result_set(&mut self, result: SecProtResult) {
        self.result = result;
    }

    /// Arms the protocol timeout, in ticks. Zero disables it.
    pub fn timeout_set(&mut self, ticks: u32) {
        self.ticks = ticks;
    }

    pub fn trickle_start<R: RngCore>(&mut self, params: &TrickleParams, rng: &mut R) {
        let mut trickle = Trickle::new();
        trickle.start(params, rng);
        self.retry = RetryTimer::Trickle(trickle, *params);
    }

    /// Arms a retry every `interval` ticks, at most `retries` times.
    pub fn fixed_retry_start(&mut self, interval: u16, retries: u8) {
        let interval = interval.max(1);
        self.retry = RetryTimer::Fixed { interval, remaining: interval, retries_left: retries };
    }

    pub fn retry_stop(&mut self) {
        self.retry = RetryTimer::Stopped;
    }

    pub fn retry_running(&self) -> bool {
        match &self.retry {
            RetryTimer::Stopped => false,
            RetryTimer::Trickle(t, _) => t.running(),
            RetryTimer::Fixed { .. } => true,
        }
    }

    pub fn timers_stop(&mut self) {
        self.ticks = 0;
        self.retry = RetryTimer::Stopped;
    }

    /// Advances the timers by `ticks`.
    pub fn timer_timeout<R: RngCore>(&mut self, ticks: u16, rng: &mut R) -> TimerEvent {
        if self.ticks > 0 {
            if self.ticks > ticks as u32 {
                self.ticks -= ticks as u32;
            } else {
                self.ticks = 0;
                self.retry = RetryTimer::Stopped;
                return TimerEvent::Timeout;
            }
        }
        match &mut self.retry {
            RetryTimer::Stopped => TimerEvent::None,
            RetryTimer::Trickle(trickle, params) => {
                if trickle.timer(params, ticks, rng) {
                    TimerEvent::Retry
                } else if !trickle.running() {
                    self.retry = RetryTimer::Stopped;
                    TimerEvent::Timeout
                } else {
                    TimerEvent::None
                }
            }
            RetryTimer::Fixed { interval, remaining, retries_left } => {
                if *remaining > ticks {
                    *remaining -= ticks;
                    TimerEvent::None
                } else if *retries_left > 0 {
                    *retries_left -= 1;
                    *remaining = *interval;
                    TimerEvent::Retry
                } else {
                    self.retry = RetryTimer::Stopped;
                    TimerEvent::Timeout
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::XorShiftRng;

    #[derive(Clone, Copy, PartialEq, Debug)]
    enum State {
        Init,
    }

    #[test]
    fn fixed_retry_then_timeout() {
        let mut rng = XorShiftRng::new(3);
        let mut common = SecProtCommon::new(State::Init);
        common.fixed_retry_start(10, 2);
        let events: Vec<_> = (0..4).map(|_| common.timer_timeout(10, &mut rng)).collect();
        assert_eq!(events, [TimerEvent::Retry, TimerEvent::Retry, TimerEvent::Timeout, TimerEvent::None]);
        assert!(!common.retry_running());
    }

    #[test]
    fn protocol_timeout_wins_over_retry() {
        let mut rng = XorShiftRng::new(3);
        let mut common = SecProtCommon::new(State::Init);
        common.timeout_set(15);
        common.fixed_retry_start(10, 5);
        assert_eq!(common.timer_timeout(10, &mut rng), TimerEvent::Retry);
        assert_eq!(common.timer_timeout(10, &mut rng), TimerEvent::Timeout);
        assert_eq!(common.timer_timeout(10, &mut rng), TimerEvent::None);
        assert_eq!(common.state(), State::Init);
    }

    #[test]
    fn trickle_retries_then_times_out() {
        let mut rng = XorShiftRng::new(9);
        let mut common = SecProtCommon::new(State::Init);
        let params = TrickleParams { imin: 4, imax: 8, k: 0, timer_expirations: 2 };
        common.trickle_start(&params, &mut rng);
        let mut retries = 0;
        loop {
            match common.timer_timeout(1, &mut rng) {
                TimerEvent::Retry => retries += 1,
                TimerEvent::Timeout => break,
                TimerEvent::None => {}
            }
        }
        assert_eq!(retries, 2);
    }
}
