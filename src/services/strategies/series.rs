//! Numeric helpers shared by the detectors.

use super::Candle;

/// Simple moving average aligned with `values`.
///
/// Bars before the window is full get the mean of everything seen so far, so
/// index 0 is always `values[0]`. From index `length` on the result is the
/// trailing mean of the last `length` values.
pub fn moving_average(values: &[f64], length: usize) -> Vec<f64> {
    let length = length.max(1);
    let mut out = Vec::with_capacity(values.len());
    let mut sum = 0.0;
    for (i, &v) in values.iter().enumerate() {
        sum += v;
        if i >= length {
            sum -= values[i - length];
            out.push(sum / length as f64);
        } else {
            out.push(sum / (i + 1) as f64);
        }
    }
    out
}

/// Running total of signed candle volume (CVD), one point per candle.
pub fn cumulative_volume_delta(candles: &[Candle]) -> Vec<f64> {
    candles
        .iter()
        .scan(0.0, |acc, c| {
            *acc += c.signed_volume();
            Some(*acc)
        })
        .collect()
}
