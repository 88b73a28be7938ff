use crate::error::ConvertError;

/// Factor tokens in the order they are emitted.
pub const FACTOR_TOKENS: &[(u32, &str)] = &[(3, "Pling"), (5, "Plang"), (7, "Plong")];

// u32::MAX has ten decimal digits.
const MAX_DIGITS: usize = 10;

/// Tokens for every factor of `n`, in ascending factor order.
///
/// Empty when `n` has none of the factors. Zero matches all of them; callers
/// that care go through [`convert`] or [`write_sound`], which reject it.
pub fn sounds(n: u32) -> impl Iterator<Item = &'static str> {
    FACTOR_TOKENS
        .iter()
        .filter(move |(factor, _)| n % factor == 0)
        .map(|(_, token)| *token)
}

/// Convert `n` to its raindrop sound.
///
/// ```
/// assert_eq!(raindrops::convert(15).unwrap(), "PlingPlang");
/// assert_eq!(raindrops::convert(52).unwrap(), "52");
/// ```
pub fn convert(n: u32) -> Result<String, ConvertError> {
    if n == 0 {
        return Err(ConvertError::Zero);
    }
    let sound: String = sounds(n).collect();
    if sound.is_empty() {
        return Ok(n.to_string());
    }
    Ok(sound)
}

/// Write the sound of `n` into `buf` and return the number of bytes written.
///
/// Nothing is written unless the whole sound fits.
pub fn write_sound(n: u32, buf: &mut [u8]) -> Result<usize, ConvertError> {
    if n == 0 {
        return Err(ConvertError::Zero);
    }

    let needed: usize = sounds(n).map(str::len).sum();
    if needed > 0 {
        check_capacity(needed, buf.len())?;
        let mut cursor = 0;
        for token in sounds(n) {
            buf[cursor..cursor + token.len()].copy_from_slice(token.as_bytes());
            cursor += token.len();
        }
        return Ok(cursor);
    }

    // Digits come out least significant first; fill from the back.
    let mut digits = [0u8; MAX_DIGITS];
    let mut start = MAX_DIGITS;
    let mut rest = n;
    while rest > 0 {
        start -= 1;
        digits[start] = b'0' + (rest % 10) as u8;
        rest /= 10;
    }
    let rendered = &digits[start..];
    check_capacity(rendered.len(), buf.len())?;
    buf[..rendered.len()].copy_from_slice(rendered);
    Ok(rendered.len())
}

fn check_capacity(needed: usize, capacity: usize) -> Result<(), ConvertError> {
    if needed > capacity {
        return Err(ConvertError::BufferTooSmall { needed, capacity });
    }
    Ok(())
}
