use std::cmp::Ordering;

/// Replace a zero divisor by one, so empty statistics
/// give a degenerate result instead of NaN.
#[inline]
pub fn safe_divisor(d: f64) -> f64 {
    if d == 0.0 {
        1.0
    } else {
        d
    }
}

/// Index of the largest value, ties go to the lowest index.
pub fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate().skip(1) {
        if v.partial_cmp(&values[best]) == Some(Ordering::Greater) {
            best = i;
        }
    }
    best
}

/// Sum of the squared residuals of a group from its
/// sufficient statistics (count, sum, sum of squares).
#[inline]
pub fn sum_squared_error(count: f64, sum: f64, sum_sq: f64) -> f64 {
    sum_sq - sum * sum / safe_divisor(count)
}

/// Shortest representation that parses back to the same `f64`.
pub fn fmt_float(v: f64) -> String {
    if v.is_nan() {
        return String::from("nan");
    }
    format!("{}", v)
}

/// Add `src` scaled by `weight` onto `dst`.
#[inline]
pub fn add_scaled(dst: &mut [f64], src: &[f64], weight: f64) {
    for (d, s) in dst.iter_mut().zip(src) {
        *d += weight * s;
    }
}

#[inline]
pub fn precision_round(n: f64, precision: i32) -> f64 {
    let p = (10.0_f64).powi(precision);
    (n * p).round() / p
}
