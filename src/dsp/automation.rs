//! Timestamped parameter automation.
//!
//! A lane is a list of events on an absolute clock (seconds). Its value at
//! any time follows the usual audio-parameter rules:
//!
//! - `Set(v) @ t` jumps to `v` at `t`.
//! - `Linear(v) @ t` ramps linearly from the previous event's value and time,
//!   reaching `v` exactly at `t`.
//! - `Exponential(v) @ t` does the same along an exponential curve. Both
//!   endpoints must be non-zero and of the same sign, otherwise the lane holds
//!   the previous value until `t` and then jumps.
//!
//! Before the first event the lane holds its default value.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ramp {
    Set,
    Linear,
    Exponential,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutomationPoint {
    pub ramp: Ramp,
    pub value: f32,
    /// Seconds on the lane's clock
    pub at: f64,
}

#[derive(Debug, Clone, Default)]
pub struct AutomationLane {
    default: f32,
    points: Vec<AutomationPoint>,
}

impl AutomationLane {
    pub fn new(default: f32) -> Self {
        Self {
            default,
            points: Vec::new(),
        }
    }

    /// Insert keeping time order. Events at the same time keep insertion order.
    pub fn push(&mut self, point: AutomationPoint) {
        let idx = self.points.partition_point(|p| p.at <= point.at);
        self.points.insert(idx, point);
    }

    pub fn points(&self) -> &[AutomationPoint] {
        &self.points
    }

    pub fn value_at(&self, t: f64) -> f32 {
        // Index of the first event strictly after t
        let next = self.points.partition_point(|p| p.at <= t);
        let (prev_value, prev_at) = match next.checked_sub(1) {
            Some(i) => (self.points[i].value, self.points[i].at),
            None => (self.default, f64::NEG_INFINITY),
        };

        let Some(target) = self.points.get(next) else {
            return prev_value;
        };

        if !prev_at.is_finite() || target.at <= prev_at {
            return prev_value;
        }
        let frac = ((t - prev_at) / (target.at - prev_at)) as f32;

        match target.ramp {
            Ramp::Set => prev_value,
            Ramp::Linear => prev_value + (target.value - prev_value) * frac,
            Ramp::Exponential => {
                if prev_value == 0.0 || target.value == 0.0 || prev_value.signum() != target.value.signum() {
                    prev_value
                } else {
                    prev_value * (target.value / prev_value).powf(frac)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn lane(points: &[(Ramp, f32, f64)]) -> AutomationLane {
        let mut lane = AutomationLane::new(0.0);
        for &(ramp, value, at) in points {
            lane.push(AutomationPoint { ramp, value, at });
        }
        lane
    }

    #[test]
    fn holds_default_before_first_event() {
        let lane = lane(&[(Ramp::Set, 5.0, 1.0)]);
        assert_eq!(lane.value_at(0.5), 0.0);
        assert_eq!(lane.value_at(1.0), 5.0);
        assert_eq!(lane.value_at(9.0), 5.0);
    }

    #[test]
    fn linear_ramp_from_previous_event() {
        let lane = lane(&[(Ramp::Set, 100.0, 1.0), (Ramp::Linear, 200.0, 2.0)]);
        assert_relative_eq!(lane.value_at(1.5), 150.0);
        assert_relative_eq!(lane.value_at(2.0), 200.0);
        assert_relative_eq!(lane.value_at(3.0), 200.0);
    }

    #[test]
    fn exponential_ramp_midpoint_is_geometric_mean() {
        let lane = lane(&[(Ramp::Set, 4000.0, 0.0), (Ramp::Exponential, 1000.0, 1.0)]);
        assert_relative_eq!(lane.value_at(0.5), 2000.0, max_relative = 1e-5);
        assert_relative_eq!(lane.value_at(1.0), 1000.0);
    }

    #[test]
    fn exponential_to_zero_holds_then_jumps() {
        let lane = lane(&[(Ramp::Set, 1.0, 0.0), (Ramp::Exponential, 0.0, 1.0)]);
        assert_eq!(lane.value_at(0.5), 1.0);
        assert_eq!(lane.value_at(1.0), 0.0);
    }

    #[test]
    fn set_at_same_time_overrides_in_order() {
        let lane = lane(&[(Ramp::Set, 1.0, 1.0), (Ramp::Set, 2.0, 1.0)]);
        assert_eq!(lane.value_at(1.0), 2.0);
    }

    #[test]
    fn events_sorted_on_insert() {
        let lane = lane(&[(Ramp::Linear, 10.0, 2.0), (Ramp::Set, 0.0, 1.0)]);
        assert_relative_eq!(lane.value_at(1.5), 5.0);
        assert_eq!(lane.points().last().map(|p| p.at), Some(2.0));
    }
}
