//! kernel.rs
//! Element-wise arithmetic over household columns, four lanes at a time.

use wide::f64x4;

#[inline(always)]
fn lanes(chunk: &[f64]) -> f64x4 {
    f64x4::from([chunk[0], chunk[1], chunk[2], chunk[3]])
}

fn zip_with(a: &[f64], b: &[f64], simd: impl Fn(f64x4, f64x4) -> f64x4, scalar: impl Fn(f64, f64) -> f64) -> Vec<f64> {
    let n = a.len().min(b.len());
    let (a, b) = (&a[..n], &b[..n]);
    let mut out = Vec::with_capacity(n);

    let mut ca = a.chunks_exact(4);
    let mut cb = b.chunks_exact(4);
    for (x, y) in (&mut ca).zip(&mut cb) {
        out.extend_from_slice(&simd(lanes(x), lanes(y)).to_array());
    }
    for (&x, &y) in ca.remainder().iter().zip(cb.remainder()) {
        out.push(scalar(x, y));
    }
    out
}

pub fn add(a: &[f64], b: &[f64]) -> Vec<f64> { zip_with(a, b, |x, y| x + y, |x, y| x + y) }
pub fn sub(a: &[f64], b: &[f64]) -> Vec<f64> { zip_with(a, b, |x, y| x - y, |x, y| x - y) }
pub fn mul(a: &[f64], b: &[f64]) -> Vec<f64> { zip_with(a, b, |x, y| x * y, |x, y| x * y) }

/// Plain IEEE division; callers sanitize the result where zero denominators can occur.
pub fn div(a: &[f64], b: &[f64]) -> Vec<f64> { zip_with(a, b, |x, y| x / y, |x, y| x / y) }

pub fn scale(a: &[f64], factor: f64) -> Vec<f64> {
    let f = f64x4::splat(factor);
    let mut out = Vec::with_capacity(a.len());
    let mut chunks = a.chunks_exact(4);
    for x in &mut chunks {
        out.extend_from_slice(&(lanes(x) * f).to_array());
    }
    out.extend(chunks.remainder().iter().map(|&x| x * factor));
    out
}

/// Sum of several columns of equal length, added left to right.
pub fn sum(columns: &[&[f64]]) -> Vec<f64> {
    match columns.split_first() {
        None => Vec::new(),
        Some((first, rest)) => rest.iter().fold(first.to_vec(), |acc, col| add(&acc, col)),
    }
}

/// NaN and infinities become zero.
pub fn sanitize(values: &mut [f64]) {
    for v in values.iter_mut() {
        if !v.is_finite() {
            *v = 0.0;
        }
    }
}

/// `a / b`, with zero wherever the quotient is not finite.
pub fn safe_div(a: &[f64], b: &[f64]) -> Vec<f64> {
    let mut out = div(a, b);
    sanitize(&mut out);
    out
}

pub fn weighted_sum(values: &[f64], weights: &[f64]) -> f64 {
    let n = values.len().min(weights.len());
    let mut acc = f64x4::ZERO;
    let mut cv = values[..n].chunks_exact(4);
    let mut cw = weights[..n].chunks_exact(4);
    for (v, w) in (&mut cv).zip(&mut cw) {
        acc += lanes(v) * lanes(w);
    }
    let tail: f64 = cv.remainder().iter().zip(cw.remainder()).map(|(v, w)| v * w).sum();
    acc.reduce_add() + tail
}

pub fn where_else(condition: &[bool], then: &[f64], otherwise: &[f64]) -> Vec<f64> {
    condition.iter().zip(then.iter().zip(otherwise)).map(|(&c, (&t, &o))| if c { t } else { o }).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(vec![1.0, 2.0, 3.0, 4.0, 5.0], vec![10.0, 20.0, 30.0, 40.0, 50.0])]
    #[case(vec![0.5], vec![1.5])]
    #[case(vec![], vec![])]
    fn test_add_matches_scalar_loop(#[case] a: Vec<f64>, #[case] b: Vec<f64>) {
        let expected: Vec<f64> = a.iter().zip(&b).map(|(x, y)| x + y).collect();
        assert_eq!(add(&a, &b), expected);
    }

    #[test]
    fn test_safe_div_zeroes_non_finite() {
        let out = safe_div(&[1.0, 0.0, 6.0, -1.0, 8.0], &[0.0, 0.0, 3.0, 0.0, 2.0]);
        assert_eq!(out, vec![0.0, 0.0, 2.0, 0.0, 4.0]);
    }

    #[test]
    fn test_weighted_sum_with_tail() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let weights = [2.0, 2.0, 2.0, 2.0, 1.0, 1.0];
        assert_eq!(weighted_sum(&values, &weights), 31.0);
    }

    #[test]
    fn test_sum_and_scale() {
        let a = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let b = vec![1.0; 5];
        assert_eq!(sum(&[a.as_slice(), b.as_slice(), b.as_slice()]), vec![3.0, 4.0, 5.0, 6.0, 7.0]);
        assert_eq!(scale(&a, 0.5), vec![0.5, 1.0, 1.5, 2.0, 2.5]);
        assert_eq!(where_else(&[true, false], &[1.0, 2.0], &[9.0, 9.0]), vec![1.0, 9.0]);
    }
}
