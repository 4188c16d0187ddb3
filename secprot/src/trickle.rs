use rand_core::RngCore;

/// Trickle timer parameters, all in timer ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrickleParams {
    /// Minimum interval size.
    pub imin: u16,
    /// Maximum interval size.
    pub imax: u16,
    /// Redundancy constant, zero means transmit in every interval.
    pub k: u8,
    /// Number of intervals after which the timer stops, zero means never.
    pub timer_expirations: u8,
}

/// RFC 6206 trickle timer, used for the retransmission of initial contact messages.
#[derive(Debug, Clone, Default)]
pub struct Trickle {
    i: u16,
    t: u16,
    now: u16,
    c: u8,
    expirations: u8,
    transmitted: bool,
    running: bool,
}

impl Trickle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start<R: RngCore>(&mut self, params: &TrickleParams, rng: &mut R) {
        self.i = params.imin.max(1);
        self.expirations = 0;
        self.running = true;
        self.interval_begin(rng);
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn running(&self) -> bool {
        self.running
    }

    /// A consistent transmission was heard in the current interval.
    pub fn consistent(&mut self) {
        self.c = self.c.saturating_add(1);
    }

    /// Current interval size, in ticks.
    pub fn interval(&self) -> u16 {
        self.i
    }

    fn interval_begin<R: RngCore>(&mut self, rng: &mut R) {
        let half = self.i / 2;
        self.t = half + (rng.next_u32() % (self.i - half).max(1) as u32) as u16;
        self.now = 0;
        self.c = 0;
        self.transmitted = false;
    }

    /// Advances the timer. Returns true when a transmission should be made.
    pub fn timer<R: RngCore>(&mut self, params: &TrickleParams, ticks: u16, rng: &mut R) -> bool {
        if !self.running {
            return false;
        }
        let mut transmit = false;
        self.now = self.now.saturating_add(ticks);
        if !self.transmitted && self.now >= self.t {
            self.transmitted = true;
            transmit = params.k == 0 || self.c < params.k;
        }
        if self.now >= self.i {
            self.expirations = self.expirations.saturating_add(1);
            if params.timer_expirations != 0 && self.expirations >= params.timer_expirations {
                self.running = false;
            } else {
                self.i = self.i.saturating_mul(2).min(params.imax.max(params.imin));
                self.interval_begin(rng);
            }
        }
        transmit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::XorShiftRng;

    #[test]
    fn transmits_once_per_interval_and_expires() {
        let params = TrickleParams { imin: 20, imax: 80, k: 0, timer_expirations: 3 };
        let mut rng = XorShiftRng::new(1);
        let mut trickle = Trickle::new();
        trickle.start(&params, &mut rng);
        let mut sent = 0;
        let mut ticks = 0;
        while trickle.running() {
            if trickle.timer(&params, 1, &mut rng) {
                sent += 1;
            }
            ticks += 1;
            assert!(ticks < 1000);
        }
        assert_eq!(sent, 3);
        // Intervals 20, 40 and 80 ticks.
        assert_eq!(ticks, 140);
    }

    #[test]
    fn redundancy_suppresses() {
        let params = TrickleParams { imin: 10, imax: 10, k: 1, timer_expirations: 0 };
        let mut rng = XorShiftRng::new(5);
        let mut trickle = Trickle::new();
        trickle.start(&params, &mut rng);
        trickle.consistent();
        let sent = (0..10).filter(|_| trickle.timer(&params, 1, &mut rng)).count();
        assert_eq!(sent, 0);
        assert!(trickle.running());
    }
}
