/// Musical note duration represented as a rational fraction of a whole note.
///
/// The step grid is a sixteenth-note grid, so the interesting values are
/// `SIXTEENTH` (one step) and multiples of it (a chain spanning n steps).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Duration {
    /// Numerator: how many parts
    pub numerator: u32,
    /// Denominator: of what size (4 = quarter, 16 = sixteenth)
    pub denominator: u32,
}

/// MIDI export resolution (pulses per quarter note)
pub const PPQ: u32 = 480;

impl Duration {
    pub const WHOLE: Duration = Duration {
        numerator: 1,
        denominator: 1,
    };
    pub const QUARTER: Duration = Duration {
        numerator: 1,
        denominator: 4,
    };
    /// One sequencer step
    pub const SIXTEENTH: Duration = Duration {
        numerator: 1,
        denominator: 16,
    };

    /// `n` sequencer steps
    pub const fn steps(n: u32) -> Self {
        Duration {
            numerator: n,
            denominator: 16,
        }
        .reduce()
    }

    /// Reduce the fraction to lowest terms using GCD
    pub const fn reduce(self) -> Self {
        let gcd = const_gcd(self.numerator, self.denominator);
        if gcd == 0 {
            return self;
        }
        Duration {
            numerator: self.numerator / gcd,
            denominator: self.denominator / gcd,
        }
    }

    /// Convert this duration to integer ticks
    /// Formula: ticks = (numerator * 4 * ppq) / denominator
    pub fn to_ticks(&self, ppq: u32) -> u32 {
        (self.numerator * 4 * ppq) / self.denominator
    }

    /// Length in seconds at a tempo in quarter-note beats per minute
    ///
    /// A sixteenth at 120 BPM is (60 / 120) / 4 = 0.125 s.
    pub fn to_seconds(&self, bpm: f64) -> f64 {
        let quarter = 60.0 / bpm;
        quarter * 4.0 * self.numerator as f64 / self.denominator as f64
    }
}

/// Greatest common divisor (Euclidean algorithm)
const fn const_gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        let temp = b;
        b = a % b;
        a = temp;
    }
    a
}
