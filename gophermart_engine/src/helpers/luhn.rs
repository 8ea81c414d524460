//! Luhn (mod 10) checksums, used to reject mistyped order numbers before they are stored.

fn luhn_sum(digits: &[u8], double_first: bool) -> u32 {
    digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, d)| {
            let d = u32::from(*d);
            if (i % 2 == 0) == double_first {
                let doubled = d * 2;
                if doubled > 9 {
                    doubled - 9
                } else {
                    doubled
                }
            } else {
                d
            }
        })
        .sum()
}

fn to_digits(number: &str) -> Option<Vec<u8>> {
    if number.is_empty() {
        return None;
    }
    number.bytes().map(|b| b.is_ascii_digit().then(|| b - b'0')).collect()
}

/// Returns true if `number` consists only of ASCII digits and carries a valid Luhn check digit in its last position.
pub fn is_valid(number: &str) -> bool {
    match to_digits(number) {
        Some(digits) => luhn_sum(&digits, false) % 10 == 0,
        None => false,
    }
}

/// Calculates the check digit that must be appended to `payload` to make a Luhn-valid number.
/// Returns `None` if the payload is empty or contains anything other than digits.
pub fn check_digit(payload: &str) -> Option<u8> {
    let digits = to_digits(payload)?;
    let sum = luhn_sum(&digits, true);
    #[allow(clippy::cast_possible_truncation)]
    Some(((10 - sum % 10) % 10) as u8)
}
