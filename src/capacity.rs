//! Human-readable capacity strings ("1.5G", "900M") to gigabytes.

use std::sync::OnceLock;

use regex::Regex;

static CAPACITY_RE: OnceLock<Regex> = OnceLock::new();

/// Parse a df-style capacity string into gigabytes.
///
/// Accepts a decimal number followed by a unit letter (K, M, G, T, P,
/// either case), an optional binary-prefix `i` and an optional trailing
/// `B`. Binary multipliers, 1024 per step. `None` for anything else —
/// a missing or garbled field is a normal miss, not an error.
pub fn parse_capacity_gb(text: &str) -> Option<f64> {
    let re = CAPACITY_RE.get_or_init(|| {
        Regex::new(r"^([0-9]*\.?[0-9]+)\s*([KMGTPkmgtp])([iI]?)[bB]?$").unwrap()
    });

    let caps = re.captures(text.trim())?;
    let value: f64 = caps[1].parse().ok()?;

    let factor = match caps[2].to_ascii_uppercase().as_str() {
        "K" => 1.0 / (1024.0 * 1024.0),
        "M" => 1.0 / 1024.0,
        "G" => 1.0,
        "T" => 1024.0,
        "P" => 1024.0 * 1024.0,
        _ => return None,
    };

    Some(value * factor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_gigabytes() {
        assert_eq!(parse_capacity_gb("1.5G"), Some(1.5));
        assert_eq!(parse_capacity_gb("850G"), Some(850.0));
    }

    #[test]
    fn test_parse_megabytes() {
        let gb = parse_capacity_gb("900M").unwrap();
        assert!((gb - 900.0 / 1024.0).abs() < 1e-9);
    }

    #[test]
    fn test_parse_kilobytes_and_terabytes() {
        let kb = parse_capacity_gb("512K").unwrap();
        assert!((kb - 512.0 / (1024.0 * 1024.0)).abs() < 1e-12);
        assert_eq!(parse_capacity_gb("2T"), Some(2048.0));
        assert_eq!(parse_capacity_gb("1P"), Some(1024.0 * 1024.0));
    }

    #[test]
    fn test_parse_suffix_variants() {
        assert_eq!(parse_capacity_gb("1.5GiB"), Some(1.5));
        assert_eq!(parse_capacity_gb("1.5GB"), Some(1.5));
        assert_eq!(parse_capacity_gb("800g"), Some(800.0));
        assert_eq!(parse_capacity_gb(" 800G "), Some(800.0));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert_eq!(parse_capacity_gb("garbage"), None);
        assert_eq!(parse_capacity_gb(""), None);
        assert_eq!(parse_capacity_gb("G15"), None);
        assert_eq!(parse_capacity_gb("1.5X"), None);
        assert_eq!(parse_capacity_gb("1.5"), None);
    }
}
