//! SPICE engineering-notation values.
//!
//! Times in the configuration (`800p`, `1.4n`) are written into the netlist
//! verbatim; they are parsed here only so that they can be validated and
//! compared before any file is generated.

/// Parse a SPICE-style value with an optional SI scale factor.
///
/// Scale factors are case-insensitive: `T`, `G`, `MEG`, `K`, `M` (milli),
/// `MIL`, `U`, `N`, `P`, `F`. Letters following the scale factor are unit
/// names and are ignored, as ngspice does (`800ps` == `800p`).
pub fn parse_value(s: &str) -> Option<f64> {
    let s = s.trim().to_ascii_uppercase();

    if let Ok(v) = s.parse::<f64>() {
        return Some(v);
    }

    let num_end = numeric_prefix_len(&s);
    if num_end == 0 {
        return None;
    }

    let (num_str, rest) = s.split_at(num_end);
    let value: f64 = num_str.parse().ok()?;

    if !rest.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }

    let multiplier = if rest.starts_with("MEG") {
        1e6
    } else if rest.starts_with("MIL") {
        25.4e-6
    } else {
        match rest.chars().next() {
            Some('T') => 1e12,
            Some('G') => 1e9,
            Some('K') => 1e3,
            Some('M') => 1e-3,
            Some('U') => 1e-6,
            Some('N') => 1e-9,
            Some('P') => 1e-12,
            Some('F') => 1e-15,
            // Bare unit name ("1.8V", "2s").
            Some(_) | None => 1.0,
        }
    };

    Some(value * multiplier)
}

/// Length of the leading `[+-]digits[.digits][E[+-]digits]` run.
fn numeric_prefix_len(s: &str) -> usize {
    let bytes = s.as_bytes();
    let mut i = 0;

    if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
        i += 1;
    }
    let digits_start = i;
    while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'.') {
        i += 1;
    }
    if i == digits_start {
        return 0;
    }

    // Exponent only if followed by digits; otherwise `E` is not a suffix we know.
    if i < bytes.len() && bytes[i] == b'E' {
        let mut j = i + 1;
        if j < bytes.len() && (bytes[j] == b'+' || bytes[j] == b'-') {
            j += 1;
        }
        let exp_start = j;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if j > exp_start {
            i = j;
        }
    }

    i
}

/// Format a value with an SI prefix and unit, e.g. `1.2340pJ`.
pub fn format_value(value: f64, unit: &str) -> String {
    let abs_value = value.abs();

    let (scaled, prefix) = if abs_value == 0.0 {
        (0.0, "")
    } else if abs_value >= 1e3 {
        (value / 1e3, "k")
    } else if abs_value >= 1.0 {
        (value, "")
    } else if abs_value >= 1e-3 {
        (value * 1e3, "m")
    } else if abs_value >= 1e-6 {
        (value * 1e6, "u")
    } else if abs_value >= 1e-9 {
        (value * 1e9, "n")
    } else if abs_value >= 1e-12 {
        (value * 1e12, "p")
    } else if abs_value >= 1e-15 {
        (value * 1e15, "f")
    } else {
        (value, "")
    };

    format!("{:.4}{}{}", scaled, prefix, unit)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: Option<f64>, b: f64) -> bool {
        a.is_some_and(|v| (v - b).abs() < b.abs() * 1e-10 + 1e-20)
    }

    #[test]
    fn test_parse_plain_number() {
        assert_eq!(parse_value("1.5"), Some(1.5));
        assert_eq!(parse_value("-2.5"), Some(-2.5));
        assert_eq!(parse_value("1e-3"), Some(1e-3));
    }

    #[test]
    fn test_parse_time_suffixes() {
        assert!(approx_eq(parse_value("800p"), 800e-12));
        assert!(approx_eq(parse_value("1400P"), 1400e-12));
        assert!(approx_eq(parse_value("1.4n"), 1.4e-9));
        assert!(approx_eq(parse_value("800ps"), 800e-12));
        assert!(approx_eq(parse_value("10MEG"), 10e6));
        assert!(approx_eq(parse_value("10m"), 10e-3));
        assert!(approx_eq(parse_value("50fF"), 50e-15));
        assert!(approx_eq(parse_value("1.8V"), 1.8));
    }

    #[test]
    fn test_parse_invalid() {
        assert_eq!(parse_value("abc"), None);
        assert_eq!(parse_value(""), None);
        assert_eq!(parse_value("12p3"), None);
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(1.234e-12, "J"), "1.2340pJ");
        assert_eq!(format_value(0.001, "V"), "1.0000mV");
        assert_eq!(format_value(0.0, "J"), "0.0000J");
    }
}
