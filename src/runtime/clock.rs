//! Step clock with lookahead.
//!
//! The clock does not sleep or spawn timers. The owner polls it with the
//! current time and a lookahead window, and gets back every tick whose
//! scheduled time falls inside `now + lookahead`, each stamped with its exact
//! grid time. A poll that comes in more than a whole step late is an overrun:
//! the late tick is played immediately and the grid re-anchors from there.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockTick {
    /// Scheduled time on the backend clock
    pub at: f64,
    /// The poll arrived more than one step after this tick was due
    pub overrun: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TickClock {
    step_duration: f64,
    next_at: f64,
}

impl TickClock {
    /// First tick due at `start`
    pub fn new(step_duration: f64, start: f64) -> Self {
        Self {
            step_duration,
            next_at: start,
        }
    }

    pub fn step_duration(&self) -> f64 {
        self.step_duration
    }

    pub fn next_at(&self) -> f64 {
        self.next_at
    }

    /// Collect the ticks due by `now + lookahead`
    pub fn due(&mut self, now: f64, lookahead: f64, out: &mut Vec<ClockTick>) {
        if self.step_duration <= 0.0 || !self.step_duration.is_finite() {
            return;
        }
        if now - self.next_at > self.step_duration {
            out.push(ClockTick { at: now, overrun: true });
            self.next_at = now + self.step_duration;
        }
        let horizon = now + lookahead.max(0.0);
        while self.next_at <= horizon {
            out.push(ClockTick { at: self.next_at, overrun: false });
            self.next_at += self.step_duration;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn poll(clock: &mut TickClock, now: f64, lookahead: f64) -> Vec<ClockTick> {
        let mut out = Vec::new();
        clock.due(now, lookahead, &mut out);
        out
    }

    #[test]
    fn first_tick_is_immediate() {
        let mut clock = TickClock::new(0.125, 1.0);
        let ticks = poll(&mut clock, 1.0, 0.0);
        assert_eq!(ticks, [ClockTick { at: 1.0, overrun: false }]);
        assert!(poll(&mut clock, 1.1, 0.0).is_empty());
        assert_eq!(poll(&mut clock, 1.125, 0.0).len(), 1);
    }

    #[test]
    fn lookahead_schedules_ahead() {
        let mut clock = TickClock::new(0.125, 0.0);
        let ticks = poll(&mut clock, 0.0, 0.3);
        let at: Vec<f64> = ticks.iter().map(|t| t.at).collect();
        assert_eq!(at, [0.0, 0.125, 0.25]);
        // Already scheduled ticks are not repeated
        assert!(poll(&mut clock, 0.05, 0.3).is_empty());
    }

    #[test]
    fn late_poll_is_flagged_and_reanchors() {
        let mut clock = TickClock::new(0.125, 0.0);
        poll(&mut clock, 0.0, 0.0);
        // Next was due at 0.125; polling at 0.5 is far more than a step late
        let ticks = poll(&mut clock, 0.5, 0.0);
        assert_eq!(ticks, [ClockTick { at: 0.5, overrun: true }]);
        assert_eq!(clock.next_at(), 0.625);
    }

    #[test]
    fn slightly_late_poll_catches_up() {
        let mut clock = TickClock::new(0.125, 0.0);
        poll(&mut clock, 0.0, 0.0);
        let ticks = poll(&mut clock, 0.2, 0.0);
        assert_eq!(ticks, [ClockTick { at: 0.125, overrun: false }]);
    }
}
