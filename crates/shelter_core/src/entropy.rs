/// Entropy (bits per byte) above which a payload is reported as likely
/// encrypted or otherwise incompressible. Advisory only.
pub const LIKELY_ENCRYPTED_THRESHOLD: f64 = 7.5;

/// Shannon entropy over the byte alphabet, in `[0, 8]`. Empty input is `0.0`.
pub fn shannon_entropy(data: &[u8]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }

    let mut counts = [0usize; 256];
    for &b in data {
        counts[b as usize] += 1;
    }

    let len = data.len() as f64;
    let entropy: f64 = counts
        .iter()
        .filter(|&&count| count > 0)
        .map(|&count| {
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum();

    // float rounding can overshoot 8 by an ulp on uniform input
    entropy.clamp(0.0, 8.0)
}

pub fn is_likely_encrypted(entropy: f64) -> bool {
    entropy > LIKELY_ENCRYPTED_THRESHOLD
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn empty_input_has_zero_entropy() {
        assert_eq!(shannon_entropy(b""), 0.0);
    }

    #[test]
    fn repeated_byte_has_zero_entropy() {
        assert_eq!(shannon_entropy(&[0x41; 1000]), 0.0);
    }

    #[test]
    fn uniform_distribution_has_eight_bits() {
        let data: Vec<u8> = (0..=255u8).cycle().take(256 * 4).collect();
        assert!((shannon_entropy(&data) - 8.0).abs() < 1e-9);
    }

    #[test]
    fn two_symbols_have_one_bit() {
        assert!((shannon_entropy(b"abababab") - 1.0).abs() < 1e-9);
    }

    #[test]
    fn threshold_is_strict() {
        assert!(!is_likely_encrypted(7.5));
        assert!(is_likely_encrypted(7.51));
    }

    proptest! {
        #[test]
        fn entropy_stays_in_bounds(bytes in proptest::collection::vec(any::<u8>(), 1..2048)) {
            let e = shannon_entropy(&bytes);
            prop_assert!((0.0..=8.0).contains(&e));
        }
    }
}
