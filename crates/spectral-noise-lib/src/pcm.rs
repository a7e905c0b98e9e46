// SPDX-License-Identifier: LGPL-3.0-or-later

//! Float to 16-bit PCM conversion.

use multiversion::multiversion;

/// Scale `x` by `height`, saturate to the `i16` range and round half away
/// from zero.
///
/// NaN maps to 0.
#[inline]
pub fn to_i16(x: f32, height: f32) -> i16 {
    (height * x).clamp(i16::MIN as f32, i16::MAX as f32).round() as i16
}

/// Multiply every sample by `gain` in place, with saturation.
#[multiversion(targets("x86_64+avx2+fma", "x86_64+avx", "x86_64+sse4.1", "aarch64+neon",))]
pub fn scale_i16(buf: &mut [i16], gain: f32) {
    for v in buf.iter_mut() {
        *v = to_i16(*v as f32, gain);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_i16_rounding() {
        assert_eq!(to_i16(0.5, 1.0), 1);
        assert_eq!(to_i16(-0.5, 1.0), -1);
        assert_eq!(to_i16(0.49, 1.0), 0);
        assert_eq!(to_i16(1.0, 4096.0), 4096);
        assert_eq!(to_i16(-0.25, 16384.0), -4096);
    }

    #[test]
    fn test_to_i16_saturates() {
        assert_eq!(to_i16(100.0, 4096.0), i16::MAX);
        assert_eq!(to_i16(-100.0, 4096.0), i16::MIN);
        assert_eq!(to_i16(f32::INFINITY, 1.0), i16::MAX);
        assert_eq!(to_i16(f32::NAN, 1.0), 0);
    }

    #[test]
    fn test_scale_in_place() {
        let mut buf = [1000i16, -1000, 30000, -30000, 0];
        scale_i16(&mut buf, 2.0);
        assert_eq!(buf, [2000, -2000, i16::MAX, i16::MIN, 0]);

        let mut buf = [1001i16, -3];
        scale_i16(&mut buf, 0.5);
        assert_eq!(buf, [501, -2]);
    }
}
