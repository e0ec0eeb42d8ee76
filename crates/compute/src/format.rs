//! Number and percentage formatting shared by analyzer detail lines.

/// Thousands-separated number; whole values print without decimals, others
/// with one. Currency values are whole yuan with a `¥` prefix.
pub fn format_number(value: f64, currency: bool) -> String {
    if currency {
        return format!("¥{}", group_thousands(value.round(), 0));
    }
    if value.fract() == 0.0 {
        group_thousands(value, 0)
    } else {
        group_thousands(value, 1)
    }
}

/// Signed percentage with one decimal, e.g. `+8.3%`, `-12.0%`, `0.0%`.
pub fn format_change(rate: f64) -> String {
    let sign = if rate > 0.0 { "+" } else { "" };
    format!("{sign}{rate:.1}%")
}

/// Signed percentage-point difference, e.g. `+2.0pp`.
pub fn format_pp(diff: f64) -> String {
    let sign = if diff > 0.0 { "+" } else { "" };
    format!("{sign}{diff:.1}pp")
}

fn group_thousands(value: f64, decimals: usize) -> String {
    let raw = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match raw.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (raw.as_str(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && raw.chars().any(|c| c != '0' && c != '.') {
        "-"
    } else {
        ""
    };
    match frac_part {
        Some(f) => format!("{sign}{grouped}.{f}"),
        None => format!("{sign}{grouped}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_are_grouped() {
        assert_eq!(format_number(1_300_000.0, false), "1,300,000");
        assert_eq!(format_number(999.0, false), "999");
        assert_eq!(format_number(1234.56, false), "1,234.6");
        assert_eq!(format_number(-45_000.0, false), "-45,000");
    }

    #[test]
    fn currency_is_whole_yuan() {
        assert_eq!(format_number(277_200.4, true), "¥277,200");
        assert_eq!(format_number(0.0, true), "¥0");
    }

    #[test]
    fn changes_carry_sign() {
        assert_eq!(format_change(8.33), "+8.3%");
        assert_eq!(format_change(-12.0), "-12.0%");
        assert_eq!(format_change(0.0), "0.0%");
        assert_eq!(format_pp(2.0), "+2.0pp");
        assert_eq!(format_pp(-0.56), "-0.6pp");
    }
}
