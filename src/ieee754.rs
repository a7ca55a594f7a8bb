//! Half-precision conversion and exactness checks for float narrowing.
//!
//! Writers narrow a double only when the narrower form decodes back to the
//! identical value; these helpers are the single place that decides it.

/// Decodes IEEE-754 binary16 bits.
///
/// ```rust
/// use valuestream::ieee754::f16_bits_to_f64;
///
/// assert_eq!(f16_bits_to_f64(0x3c00), 1.0);
/// assert_eq!(f16_bits_to_f64(0xc000), -2.0);
/// assert_eq!(f16_bits_to_f64(0x7c00), f64::INFINITY);
/// assert_eq!(f16_bits_to_f64(0x0001), 2f64.powi(-24));
/// ```
#[must_use]
pub fn f16_bits_to_f64(bits: u16) -> f64 {
    let sign = if bits & 0x8000 != 0 { -1.0 } else { 1.0 };
    let exp = i32::from((bits >> 10) & 0x1f);
    let mant = f64::from(bits & 0x3ff);
    let magnitude = match exp {
        0 => mant * 2f64.powi(-24),
        0x1f if mant == 0.0 => f64::INFINITY,
        0x1f => f64::NAN,
        _ => (1.0 + mant / 1024.0) * 2f64.powi(exp - 15),
    };
    sign * magnitude
}

/// Encodes `value` as binary16 bits if that is exact, including NaN and
/// the infinities.
#[must_use]
pub fn f64_to_f16_bits(value: f64) -> Option<u16> {
    if value.is_nan() {
        return Some(0x7e00);
    }
    let sign: u16 = if value.is_sign_negative() { 0x8000 } else { 0 };
    let magnitude = value.abs();
    if magnitude == 0.0 {
        return Some(sign);
    }
    if magnitude.is_infinite() {
        return Some(sign | 0x7c00);
    }
    // exponent range of normal and subnormal halves
    if !(2f64.powi(-24)..65520.0).contains(&magnitude) {
        return None;
    }
    let bits = if magnitude < 2f64.powi(-14) {
        let mant = magnitude / 2f64.powi(-24);
        if mant.fract() != 0.0 {
            return None;
        }
        mant as u16
    } else {
        let exp = magnitude.log2().floor() as i32;
        let mant = (magnitude / 2f64.powi(exp) - 1.0) * 1024.0;
        if mant.fract() != 0.0 || !(-14..=15).contains(&exp) {
            return None;
        }
        (((exp + 15) as u16) << 10) | mant as u16
    };
    let encoded = sign | bits;
    // log2 can be off by one near powers of two
    (f16_bits_to_f64(encoded) == value).then_some(encoded)
}

/// Whether `value` survives a round trip through `f32`. NaN counts as exact.
#[must_use]
pub fn fits_f32(value: f64) -> bool {
    value.is_nan() || f64::from(value as f32) == value
}

#[must_use]
pub fn fits_f16(value: f64) -> bool {
    f64_to_f16_bits(value).is_some()
}
