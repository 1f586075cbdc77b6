use std::f64::consts::PI;

/// Applies a Hamming window in place.
///
/// Sample `i` of `n` is scaled by `0.54 - 0.46 * cos(2*pi*i / (n - 1))`.
/// Buffers shorter than two samples are left untouched.
pub fn hamming(buffer: &mut [f64]) {
    let n = buffer.len();
    if n < 2 {
        return;
    }
    let span = (n - 1) as f64;
    for (i, value) in buffer.iter_mut().enumerate() {
        *value *= 0.54 - 0.46 * (2.0 * PI * i as f64 / span).cos();
    }
}
