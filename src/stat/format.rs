use serde_json::Value;

use super::datatype::coerce_amount;

/// Human-readable decimal KB/MB label for a raw XP amount.
///
/// Below 1000 KB the label is a whole number of kilobytes; from there on it
/// switches to megabytes with one decimal. Display only: never compare or
/// sum these strings.
pub fn format_magnitude(raw: f64) -> String {
    let raw = if raw.is_finite() { raw } else { 0.0 };
    let kilo = raw / 1000.0;
    if kilo < 1000.0 {
        return format!("{} KB", format_grouped(kilo));
    }
    // tenths of a megabyte, halves up like the KB branch
    let tenths = (raw / 100_000.0 + 0.5).floor();
    let whole = (tenths / 10.0).trunc();
    let frac = tenths - whole * 10.0;
    format!("{}.{frac:.0} MB", group_digits(&format!("{whole:.0}")))
}

/// [`format_magnitude`] for an untyped amount, coerced the same way the
/// aggregation coerces it.
pub fn format_magnitude_value(raw: &Value) -> String {
    format_magnitude(coerce_amount(raw))
}

/// Whole number with `,` thousands separators. Halves round up.
pub fn format_grouped(n: f64) -> String {
    let n = if n.is_finite() { n } else { 0.0 };
    let rounded = (n + 0.5).floor();
    // avoid printing "-0"
    let rounded = if rounded == 0.0 { 0.0 } else { rounded };
    group_digits(&format!("{rounded:.0}"))
}

fn group_digits(int_part: &str) -> String {
    let (sign, digits) = match int_part.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", int_part),
    };
    let mut out = String::with_capacity(int_part.len() + digits.len() / 3);
    out.push_str(sign);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn kb_mb_boundary() {
        assert_eq!(format_magnitude(0.0), "0 KB");
        assert_eq!(format_magnitude(999_000.0), "999 KB");
        assert_eq!(format_magnitude(1_000_000.0), "1.0 MB");
        assert_eq!(format_magnitude(3_500_000.0), "3.5 MB");
        assert_eq!(format_magnitude(1_050_000.0), "1.1 MB");
        assert_eq!(format_magnitude(1_250_000.0), "1.3 MB");
        assert_eq!(format_magnitude(2_250_000.0), "2.3 MB");
        assert_eq!(format_magnitude(1_999_999.0), "2.0 MB");
    }

    #[test]
    fn kb_rounds_to_whole_units() {
        assert_eq!(format_magnitude(1_499.0), "1 KB");
        assert_eq!(format_magnitude(1_500.0), "2 KB");
        assert_eq!(format_magnitude(400.0), "0 KB");
        // rounds up to 1000 but stays in the KB branch
        assert_eq!(format_magnitude(999_999.0), "1,000 KB");
    }

    #[test]
    fn large_megabytes_are_grouped() {
        assert_eq!(format_magnitude(1_234_500_000.0), "1,234.5 MB");
    }

    #[test]
    fn negatives_are_not_guarded() {
        assert_eq!(format_magnitude(-5_000.0), "-5 KB");
        assert_eq!(format_magnitude(-5_000_000.0), "-5,000 KB");
        assert_eq!(format_magnitude(-100.0), "0 KB");
    }

    #[test]
    fn non_numeric_input_formats_as_zero() {
        assert_eq!(format_magnitude(f64::NAN), "0 KB");
        assert_eq!(format_magnitude_value(&json!("abc")), "0 KB");
        assert_eq!(format_magnitude_value(&json!(null)), "0 KB");
        assert_eq!(format_magnitude_value(&json!("2000000")), "2.0 MB");
    }

    #[test]
    fn grouped_counts() {
        assert_eq!(format_grouped(3_500_000.0), "3,500,000");
        assert_eq!(format_grouped(999.0), "999");
        assert_eq!(format_grouped(-1_000.0), "-1,000");
        assert_eq!(format_grouped(0.0), "0");
    }
}
