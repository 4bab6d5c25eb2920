//! Display formatting of slot values

/// `1234.5` -> `"1 234.50 DT"`
pub fn format_amount(amount: f64) -> String {
    let fixed = format!("{:.2}", amount.abs());
    let (integer, decimals) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let digits: Vec<char> = integer.chars().collect();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(*c);
    }

    let sign = if amount < 0.0 { "-" } else { "" };
    format!("{sign}{grouped}.{decimals} DT")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(1234.5), "1 234.50 DT");
        assert_eq!(format_amount(600.0), "600.00 DT");
        assert_eq!(format_amount(45.0), "45.00 DT");
        assert_eq!(format_amount(1_000_000.0), "1 000 000.00 DT");
        assert_eq!(format_amount(0.5), "0.50 DT");
        assert_eq!(format_amount(-1500.0), "-1 500.00 DT");
    }
}
