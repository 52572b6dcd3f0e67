//! Distortion / Waveshaping
//!
//! A waveshaper applies a transfer function to each sample. The bass voice
//! uses the classic "k-curve" shaper:
//!
//!   f(x) = (3 + k) * x * 20° / (π + k * |x|)
//!
//! with x clamped to -1..1 and k the drive amount (0..100). Small k is close
//! to linear (slightly quieter than the input), large k flattens into a hard
//! saturated square.
//!
//! Soft clip is used on the master bus so that several overlapping voices
//! never wrap the output:
//!
//!   f(x) = x / (1 + |x|)

use std::f32::consts::PI;

const DEG: f32 = PI / 180.0;

/// Drive curve used ahead of the bass voice's VCA
#[inline]
pub fn drive_curve(sample: f32, drive: f32) -> f32 {
    let k = drive.round().clamp(0.0, 100.0);
    let x = sample.clamp(-1.0, 1.0);
    ((3.0 + k) * x * 20.0 * DEG) / (PI + k * x.abs())
}

/// Soft clipping using x / (1 + |x|) transfer function.
#[inline]
pub fn soft_clip(sample: f32, drive: f32) -> f32 {
    let x = sample * drive;
    x / (1.0 + x.abs())
}

/// Apply the drive curve to an entire buffer in place.
pub fn drive_buffer(buffer: &mut [f32], drive: f32) {
    for sample in buffer.iter_mut() {
        *sample = drive_curve(*sample, drive);
    }
}

/// Apply soft clipping to an entire buffer in place.
pub fn soft_clip_buffer(buffer: &mut [f32], drive: f32) {
    for sample in buffer.iter_mut() {
        *sample = soft_clip(*sample, drive);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_drive_curve_is_odd_and_bounded() {
        for drive in [0.0, 10.0, 50.0, 100.0] {
            for i in -20..=20 {
                let x = i as f32 / 10.0;
                let y = drive_curve(x, drive);
                assert_relative_eq!(y, -drive_curve(-x, drive), epsilon = 1e-6);
                assert!(y.abs() <= 1.0);
            }
        }
    }

    #[test]
    fn test_drive_curve_full_scale() {
        // x = 1: (3 + k) * 20° / (π + k)
        let y = drive_curve(1.0, 100.0);
        assert_relative_eq!(y, 103.0 * 20.0 * DEG / (PI + 100.0), epsilon = 1e-6);
        // Heavier drive saturates earlier
        assert!(drive_curve(0.1, 100.0) / drive_curve(1.0, 100.0) > drive_curve(0.1, 1.0) / drive_curve(1.0, 1.0));
    }

    #[test]
    fn test_drive_curve_clamps_input() {
        assert_eq!(drive_curve(4.0, 30.0), drive_curve(1.0, 30.0));
    }

    #[test]
    fn test_soft_clip_unity_drive() {
        // f(0.1) = 0.1 / 1.1
        assert_relative_eq!(soft_clip(0.1, 1.0), 0.1 / 1.1, epsilon = 1e-6);
    }

    #[test]
    fn test_soft_clip_high_drive() {
        let output = soft_clip(1.0, 10.0);
        assert!(output > 0.9 && output < 1.0);
    }

    #[test]
    fn test_buffers() {
        let mut buf = [0.5, -0.5, 2.0];
        soft_clip_buffer(&mut buf, 1.0);
        assert!(buf.iter().all(|s| s.abs() < 1.0));
        let mut buf = [0.5, -0.5];
        drive_buffer(&mut buf, 20.0);
        assert_relative_eq!(buf[0], -buf[1]);
    }
}
