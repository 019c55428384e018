use std::fs;
use std::path::Path;

/// Scientific notation with a signed, two-digit exponent (`1.50000e+00`).
pub fn format_scientific_f64(value: f64, precision: usize) -> String {
    let raw = format!("{value:.precision$e}");
    let Some((mantissa, exponent)) = raw.split_once('e') else {
        return raw;
    };
    let Ok(exponent) = exponent.parse::<i32>() else {
        return raw;
    };
    let sign = if exponent < 0 { '-' } else { '+' };
    format!("{mantissa}e{sign}{:02}", exponent.unsigned_abs())
}

/// Shortest text that parses back to exactly `value`.
pub fn format_f64(value: f64) -> String {
    let magnitude = value.abs();
    if value != 0.0 && (magnitude < 1.0e-4 || magnitude >= 1.0e16) {
        format!("{value:e}")
    } else {
        format!("{value}")
    }
}

/// Writes each line of `content` terminated by `\n`, so tables assembled
/// with `\r\n` or without a final newline land on disk the same way.
pub fn write_table_text(path: &Path, content: &str) -> std::io::Result<()> {
    let rows: String = content.lines().flat_map(|row| [row, "\n"]).collect();
    fs::write(path, rows)
}

#[cfg(test)]
mod tests {
    use super::{format_f64, format_scientific_f64, write_table_text};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn scientific_format_uses_signed_two_digit_exponent() {
        assert_eq!(format_scientific_f64(1.0, 5), "1.00000e+00");
        assert_eq!(format_scientific_f64(0.0025, 5), "2.50000e-03");
        assert_eq!(format_scientific_f64(-123456.0, 2), "-1.23e+05");
        assert_eq!(format_scientific_f64(1.0e-120, 1), "1.0e-120");
    }

    #[test]
    fn scientific_format_with_eighteen_digits_round_trips() {
        for value in [0.1, 2.0 / 3.0, 1.0e-300, 6.02214076e23, -7.25] {
            let text = format_scientific_f64(value, 18);
            assert_eq!(text.parse::<f64>().expect("parsable"), value);
        }
    }

    #[test]
    fn shortest_format_is_lossless() {
        for value in [2.365, 0.5, 1.0e-10, 3.0e20, -0.00125, 0.0] {
            let text = format_f64(value);
            assert_eq!(text.parse::<f64>().expect("parsable"), value, "{text}");
        }
        assert_eq!(format_f64(2.365), "2.365");
        assert_eq!(format_f64(1.0e-10), "1e-10");
    }

    #[test]
    fn table_text_is_written_with_unix_row_endings() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("elastic.dat");

        write_table_text(&path, "0.5 1.2e-6\r\n0.75 3.4e-6").expect("write");
        assert_eq!(fs::read_to_string(&path).expect("read"), "0.5 1.2e-6\n0.75 3.4e-6\n");

        write_table_text(&path, "").expect("empty table");
        assert_eq!(fs::read_to_string(&path).expect("read"), "");
    }
}
