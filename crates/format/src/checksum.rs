//! Check-digit algorithms shared by the type detector (validity scoring)
//! and the transformers (recomputing a valid checksum after FPE re-encodes
//! the payload digits).

/// Luhn checksum over a digit string (credit-card numbers). Returns `true`
/// if `digits` (ASCII `0`-`9` only) passes the Luhn check, including the
/// check digit itself.
#[must_use]
pub fn luhn_is_valid(digits: &[u8]) -> bool {
    luhn_sum(digits) % 10 == 0
}

/// Recomputes the trailing Luhn check digit for `payload` (all digits
/// except the last) and returns it as `b'0'..=b'9'`.
#[must_use]
pub fn luhn_check_digit(payload: &[u8]) -> u8 {
    // Append a placeholder 0 so the existing summation treats `payload` as
    // if it were the first n-1 digits of an n-digit number, then solve for
    // the check digit that makes the total a multiple of 10.
    let mut with_placeholder = payload.to_vec();
    with_placeholder.push(b'0');
    let sum = luhn_sum(&with_placeholder);
    let remainder = sum % 10;
    let check = if remainder == 0 { 0 } else { 10 - remainder };
    b'0' + check
}

fn luhn_sum(digits: &[u8]) -> u32 {
    let mut sum = 0u32;
    for (i, &d) in digits.iter().rev().enumerate() {
        let mut v = u32::from(d - b'0');
        if i % 2 == 1 {
            v *= 2;
            if v > 9 {
                v -= 9;
            }
        }
        sum += v;
    }
    sum
}

/// ISO 7064 MOD 97-10 validity check for an IBAN: move the first four
/// characters to the end, map letters to `A=10..Z=35`, and verify the
/// resulting decimal number mod 97 equals 1.
#[must_use]
pub fn iso7064_iban_is_valid(iban: &str) -> bool {
    iso7064_remainder(iban) == 1
}

/// Recomputes the two IBAN check-digit characters (positions 3-4) for an
/// IBAN whose country code (positions 0-1) and BBAN (positions 4..) are
/// already final. `iban_with_placeholder_check` must have `"00"` in
/// positions 2-3.
#[must_use]
pub fn iso7064_check_digits(iban_with_placeholder_check: &str) -> String {
    let remainder = iso7064_remainder(iban_with_placeholder_check);
    let check = 98 - remainder;
    format!("{check:02}")
}

fn iso7064_remainder(iban: &str) -> u32 {
    let rearranged: String = iban.chars().skip(4).chain(iban.chars().take(4)).collect();
    let mut remainder = 0u64;
    for c in rearranged.chars() {
        let value = if c.is_ascii_digit() {
            u64::from(c as u8 - b'0')
        } else {
            u64::from(c.to_ascii_uppercase() as u8 - b'A' + 10)
        };
        let digits = if value >= 10 { 2 } else { 1 };
        remainder = (remainder * 10u64.pow(digits) + value) % 97;
    }
    remainder as u32
}
