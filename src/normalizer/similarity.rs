//! Fuzzy string similarity on a 0-100 scale

use strsim::normalized_levenshtein;

/// Plain similarity of two strings (0-100).
pub fn ratio(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    normalized_levenshtein(a, b) * 100.0
}

/// Substring-tolerant similarity (0-100).
///
/// Slides the shorter string over the longer one and keeps the best window,
/// so "acme" against "acme co" scores 100.
pub fn partial_ratio(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let (short, long) = if a_chars.len() <= b_chars.len() {
        (a_chars, b_chars)
    } else {
        (b_chars, a_chars)
    };

    if short.len() == long.len() {
        return ratio(a, b);
    }

    let needle: String = short.iter().collect();
    let width = short.len();
    let mut best = 0.0_f64;

    for start in 0..=(long.len() - width) {
        let window: String = long[start..start + width].iter().collect();
        let score = normalized_levenshtein(&needle, &window);
        if score > best {
            best = score;
            if best >= 1.0 {
                break;
            }
        }
    }

    best * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_ratio_substring() {
        assert!((partial_ratio("acme", "acme co") - 100.0).abs() < 1e-9);
        assert!((partial_ratio("acme co", "acme") - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_partial_ratio_ordering() {
        let close = partial_ratio("coca cola", "coca-cola company");
        let far = partial_ratio("coca cola", "nestle");
        assert!(close > far);
        assert!(close > 80.0);
    }

    #[test]
    fn test_partial_ratio_empty() {
        assert_eq!(partial_ratio("", "acme"), 0.0);
        assert_eq!(partial_ratio("acme", ""), 0.0);
    }

    #[test]
    fn test_ratio_bounds() {
        assert!((ratio("same", "same") - 100.0).abs() < 1e-9);
        assert!(ratio("abc", "xyz") < 1e-9);
    }
}
