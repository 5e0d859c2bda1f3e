//! Punycode identifiers as the mangler writes them.
//!
//! The mangler uses `_` as the delimiter and encodes the digits 26 to 35 as `A` to `J` instead of `0` to `9`. ASCII
//! characters that cannot appear in an identifier are encoded as code points `0xD800 + c`, which are mapped back
//! after decoding. Those code points are surrogates, so decoding works on raw code points instead of `char`s.

use std::borrow::Cow;

const BASE: u32 = 36;
const T_MIN: u32 = 1;
const T_MAX: u32 = 26;
const SKEW: u32 = 38;
const DAMP: u32 = 700;
const INITIAL_BIAS: u32 = 72;
const INITIAL_N: u32 = 128;

/// Code points in this range stand for the ASCII character `code point - 0xD800`.
const ESCAPED_ASCII: std::ops::Range<u32> = 0xD800..0xD880;

fn digit_value(c: u8) -> Option<u32> {
    match c {
        b'a'..=b'z' => Some(u32::from(c - b'a')),
        b'A'..=b'J' => Some(u32::from(c - b'A') + 26),
        _ => None,
    }
}

const fn adapt(mut delta: u32, num_points: u32, is_first: bool) -> u32 {
    delta /= if is_first { DAMP } else { 2 };
    delta += delta / num_points;

    let mut k = 0;

    while delta > ((BASE - T_MIN) * T_MAX) / 2 {
        delta /= BASE - T_MIN;
        k += BASE;
    }

    k + (((BASE - T_MIN + 1) * delta) / (delta + SKEW))
}

fn is_valid_code_point(code_point: u32) -> bool {
    code_point < ESCAPED_ASCII.end || (0xE000..=0x0010_FFFF).contains(&code_point)
}

fn decode_code_points(basic: &str, mut extended: &[u8]) -> Option<Vec<u32>> {
    let mut output = basic.chars().map(u32::from).collect::<Vec<_>>();
    let mut n = INITIAL_N;
    let mut i = 0_u32;
    let mut bias = INITIAL_BIAS;

    while !extended.is_empty() {
        let old_i = i;
        let mut weight = 1_u32;
        let mut k = BASE;

        loop {
            let (&c, rest) = extended.split_first()?;

            extended = rest;

            let digit = digit_value(c)?;

            i = i.checked_add(digit.checked_mul(weight)?)?;

            let threshold = if k <= bias {
                T_MIN
            } else if k >= bias + T_MAX {
                T_MAX
            } else {
                k - bias
            };

            if digit < threshold {
                break;
            }

            weight = weight.checked_mul(BASE - threshold)?;
            k += BASE;
        }

        let length = u32::try_from(output.len() + 1).ok()?;

        bias = adapt(i - old_i, length, old_i == 0);
        n = n.checked_add(i / length)?;
        i %= length;

        if !is_valid_code_point(n) {
            return None;
        }

        output.insert(usize::try_from(i).ok()?, n);
        i += 1;
    }

    Some(output)
}

/// Decodes a punycoded identifier into its Unicode text.
#[must_use]
pub fn decode_swift_punycode(input: &str) -> Option<Cow<'static, str>> {
    let (basic, extended) = match input.rfind('_') {
        Some(position) => (&input[..position], &input[position + 1..]),
        None => ("", input),
    };

    if !basic.is_ascii() {
        return None;
    }

    decode_code_points(basic, extended.as_bytes())?
        .into_iter()
        .map(|code_point| {
            if ESCAPED_ASCII.contains(&code_point) {
                char::from_u32(code_point - ESCAPED_ASCII.start)
            } else {
                char::from_u32(code_point)
            }
        })
        .collect::<Option<String>>()
        .map(Cow::Owned)
}

#[cfg(test)]
mod tests {
    #[track_caller]
    fn check(input: &str, expected: Option<&str>) {
        assert_eq!(super::decode_swift_punycode(input).as_deref(), expected);
    }

    /// Translates standard punycode into the mangler's alphabet.
    fn to_swift_alphabet(standard: &str) -> String {
        let (basic, extended) = match standard.rfind('-') {
            Some(position) => (&standard[..position], &standard[position + 1..]),
            None => ("", standard),
        };

        let mut result = basic.to_owned();

        if !basic.is_empty() {
            result.push('_');
        }

        result.extend(extended.bytes().map(|c| match c {
            b'0'..=b'9' => char::from(c - b'0' + b'A'),
            c => char::from(c),
        }));

        result
    }

    #[test]
    fn test_decode_swift_punycode() {
        check("ma_Aja", Some("mañ"));
        check("abc_!", None);
        check("ab_K", None);
        check("", Some(""));
    }

    #[test]
    fn test_escaped_ascii() {
        // `0xD82E` stands for `.`.
        check("ab_xhJk", Some("a.b"));
        check("scJbb", Some(".-"));

        // Surrogates past the escaped range are rejected.
        check("tiJb", None);
    }

    #[test]
    fn test_agrees_with_standard_punycode() {
        for text in ["mañana", "日本語", "Ünïcödé", "a→b", "emoji😀name"] {
            let standard = punycode::encode(text).unwrap();

            check(&to_swift_alphabet(&standard), Some(text));
        }
    }
}
