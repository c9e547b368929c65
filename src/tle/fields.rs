//! Fixed-column field extraction for element-set lines
//!
//! All column ranges here are zero-based, half-open byte ranges into a line
//! that has already been checked to be ASCII and at least 69 characters long.

use std::ops::Range;

use super::TleError;

/// Line 1 field columns
pub(crate) mod line1 {
    use std::ops::Range;

    pub const CATALOG_NUMBER: Range<usize> = 2..7;
    pub const CLASSIFICATION: usize = 7;
    pub const DESIGNATOR: Range<usize> = 9..17;
    pub const EPOCH_YEAR: Range<usize> = 18..20;
    pub const EPOCH_DAY: Range<usize> = 20..32;
    pub const MEAN_MOTION_DOT: Range<usize> = 33..43;
    pub const MEAN_MOTION_DDOT: Range<usize> = 44..52;
    pub const BSTAR: Range<usize> = 53..61;
    pub const EPHEMERIS_TYPE: usize = 62;
    pub const ELEMENT_SET_NUMBER: Range<usize> = 64..68;
}

/// Line 2 field columns
pub(crate) mod line2 {
    use std::ops::Range;

    pub const CATALOG_NUMBER: Range<usize> = 2..7;
    pub const INCLINATION: Range<usize> = 8..16;
    pub const RAAN: Range<usize> = 17..25;
    pub const ECCENTRICITY: Range<usize> = 26..33;
    pub const ARGUMENT_OF_PERIGEE: Range<usize> = 34..42;
    pub const MEAN_ANOMALY: Range<usize> = 43..51;
    pub const MEAN_MOTION: Range<usize> = 52..63;
    pub const REVOLUTION_NUMBER: Range<usize> = 63..68;
}

/// Number of characters covered by the checksum
pub const CHECKSUM_SPAN: usize = 68;

/// Minimum length of an element line (68 data columns plus the checksum)
pub const LINE_LENGTH: usize = 69;

/// Modulo-10 checksum of the first 68 columns of a line
///
/// Digits count at face value, `-` counts as one and every other character
/// (letters, `+`, `.`, spaces) counts as zero.
pub fn checksum(line: &str) -> u8 {
    let sum: u32 = line
        .bytes()
        .take(CHECKSUM_SPAN)
        .map(|b| match b {
            b'0'..=b'9' => (b - b'0') as u32,
            b'-' => 1,
            _ => 0,
        })
        .sum();
    (sum % 10) as u8
}

/// Borrow a column range from a line, rejecting out-of-range slices
pub fn column<'a>(line: &'a str, range: Range<usize>, field: &'static str) -> Result<&'a str, TleError> {
    line.get(range).ok_or_else(|| TleError::InvalidField {
        field,
        value: line.to_string(),
    })
}

/// Parse a plain decimal field, tolerating surrounding blanks
pub fn decimal(text: &str, field: &'static str) -> Result<f64, TleError> {
    let trimmed = text.trim();
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| invalid(field, text))
}

/// Parse an unsigned integer field; an all-blank field reads as zero
pub fn unsigned(text: &str, field: &'static str) -> Result<u32, TleError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(0);
    }
    trimmed.parse::<u32>().map_err(|_| invalid(field, text))
}

/// Parse an assumed-decimal exponential field such as `" 12345-3"`
///
/// The layout is an optional sign, mantissa digits read as `0.<digits>`, then
/// a signed single-digit power of ten. A blank field reads as zero. A blank
/// exponent sign is read as `+`.
pub fn assumed_decimal(text: &str, field: &'static str) -> Result<f64, TleError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(0.0);
    }

    let (sign, body) = match trimmed.as_bytes()[0] {
        b'-' => ("-", &trimmed[1..]),
        b'+' => ("", &trimmed[1..]),
        _ => ("", trimmed),
    };

    let bytes = body.as_bytes();
    if bytes.len() < 3 {
        return Err(invalid(field, text));
    }
    let exponent_digit = bytes[bytes.len() - 1];
    let exponent_sign = match bytes[bytes.len() - 2] {
        b'-' => '-',
        b'+' | b' ' => '+',
        _ => return Err(invalid(field, text)),
    };
    let mantissa = body[..bytes.len() - 2].trim();
    if !exponent_digit.is_ascii_digit()
        || mantissa.is_empty()
        || !mantissa.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(invalid(field, text));
    }

    format!(
        "{}0.{}e{}{}",
        sign, mantissa, exponent_sign, exponent_digit as char
    )
    .parse::<f64>()
    .map_err(|_| invalid(field, text))
}

/// Parse the eccentricity field, which carries an implied leading `0.`
pub fn implied_fraction(text: &str, field: &'static str) -> Result<f64, TleError> {
    let digits = text.trim();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid(field, text));
    }
    format!("0.{}", digits)
        .parse::<f64>()
        .map_err(|_| invalid(field, text))
}

/// Parse a five-column catalog number, including the Alpha-5 extension
///
/// Alpha-5 replaces the leading digit with a letter (I and O are skipped) so
/// that `A0000` is 100000 and `Z9999` is 339999.
pub fn catalog_number(text: &str, field: &'static str) -> Result<u32, TleError> {
    let trimmed = text.trim();
    let first = trimmed
        .bytes()
        .next()
        .ok_or_else(|| invalid(field, text))?;

    if first.is_ascii_digit() {
        return trimmed.parse::<u32>().map_err(|_| invalid(field, text));
    }

    let prefix = alpha5_value(first).ok_or_else(|| invalid(field, text))?;
    let rest = &trimmed[1..];
    if rest.len() != 4 || !rest.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid(field, text));
    }
    let tail = rest.parse::<u32>().map_err(|_| invalid(field, text))?;
    Ok(prefix * 10_000 + tail)
}

fn alpha5_value(letter: u8) -> Option<u32> {
    match letter {
        b'A'..=b'H' => Some((letter - b'A') as u32 + 10),
        b'J'..=b'N' => Some((letter - b'J') as u32 + 18),
        b'P'..=b'Z' => Some((letter - b'P') as u32 + 23),
        _ => None,
    }
}

fn invalid(field: &'static str, value: &str) -> TleError {
    TleError::InvalidField {
        field,
        value: value.to_string(),
    }
}
