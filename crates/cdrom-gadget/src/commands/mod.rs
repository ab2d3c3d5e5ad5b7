pub mod exec;
#[cfg(feature = "functionfs")]
pub mod serve;

use anyhow::{Result, anyhow};

// allow user to pass hex formatted ids (the usual way vendor/product ids are written)
#[cfg(feature = "functionfs")]
pub fn num_parser(s: &str) -> Result<u16, &'static str> {
    match s.get(0..2) {
        Some("0x") => u16::from_str_radix(&s[2..], 16).map_err(|_| "invalid hex number"),
        _ => s.parse::<u16>().map_err(|_| "invalid decimal number"),
    }
}

/// Parses a hex string such as `"12 00 00 00 24 00"` or `"120000002400"`.
pub fn parse_hex(s: &str) -> Result<Vec<u8>> {
    let digits: String = s
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':')
        .collect();
    let digits = digits.strip_prefix("0x").unwrap_or(&digits);

    if digits.is_empty() {
        return Err(anyhow!("empty command block"));
    }
    if digits.len() % 2 != 0 {
        return Err(anyhow!("odd number of hex digits in {s:?}"));
    }

    (0..digits.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .map_err(|_| anyhow!("invalid hex byte {:?}", &digits[i..i + 2]))
        })
        .collect()
}

pub fn to_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    pub fn parses_spaced_and_packed_hex() {
        assert_eq!(parse_hex("12 00 00 00 24 00").unwrap(), [0x12, 0, 0, 0, 0x24, 0]);
        assert_eq!(parse_hex("0x250000").unwrap(), [0x25, 0, 0]);
        assert_eq!(parse_hex("be:00").unwrap(), [0xbe, 0]);
    }

    #[test]
    pub fn rejects_bad_hex() {
        assert!(parse_hex("").is_err());
        assert!(parse_hex("123").is_err());
        assert!(parse_hex("zz").is_err());
    }

    #[test]
    pub fn formats_hex() {
        assert_eq!(to_hex(&[0x05, 0x80, 0x00]), "05 80 00");
        assert_eq!(to_hex(&[]), "");
    }
}
