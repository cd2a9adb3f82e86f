//! Leaf value decoders (§4.1): given a substring, produce a [`Value`] or a
//! human-readable reason string that the caller wraps into a
//! [`crate::ParseError::InvalidValue`] with offset/key-path context.

use std::net::IpAddr;

use crate::value::{EthMask, IpMask, IpMaskKind, Masked, RangeKey, Width};
use crate::Value;

/// Decimal or `0x`/`0X`-prefixed hexadecimal, case-insensitive, unsigned only.
fn parse_uint_token(s: &str) -> Option<u128> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u128::from_str_radix(hex, 16).ok()
    } else {
        s.parse::<u128>().ok()
    }
}

pub fn looks_like_integer(s: &str) -> bool {
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => !hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit()),
        None => !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()),
    }
}

pub fn decode_integer(s: &str) -> Result<u64, String> {
    let n = parse_uint_token(s).ok_or_else(|| format!("invalid integer literal {s:?}"))?;
    u64::try_from(n).map_err(|_| format!("integer literal {s:?} too large for 64 bits"))
}

pub fn decode_masked(width: Width, s: &str) -> Result<Masked, String> {
    let (value_str, mask_str) = match s.split_once('/') {
        Some((v, m)) => (v, Some(m)),
        None => (s, None),
    };
    let value =
        parse_uint_token(value_str).ok_or_else(|| format!("invalid masked value {value_str:?}"))?;
    let mask = match mask_str {
        Some(m) => parse_uint_token(m).ok_or_else(|| format!("invalid mask {m:?}"))?,
        None => width.all_ones(),
    };
    if mask == 0 {
        return Err("mask must not be zero".to_string());
    }
    if !width.fits(mask) {
        return Err(format!("mask {mask:#x} does not fit in {} bits", width.bits()));
    }
    if !width.fits(value) {
        return Err(format!("value {value:#x} does not fit in {} bits", width.bits()));
    }
    Ok(Masked { width, value, mask })
}

pub fn looks_like_mac(s: &str) -> bool {
    let body = s.split('/').next().unwrap_or(s);
    let parts: Vec<&str> = body.split(':').collect();
    parts.len() == 6 && parts.iter().all(|p| p.len() == 2 && p.chars().all(|c| c.is_ascii_hexdigit()))
}

fn parse_mac(s: &str) -> Result<[u8; 6], String> {
    let mut out = [0u8; 6];
    let mut it = s.split(':');
    for slot in out.iter_mut() {
        let part = it.next().ok_or_else(|| format!("short MAC address {s:?}"))?;
        if part.len() != 2 {
            return Err(format!("invalid MAC octet {part:?}"));
        }
        *slot = u8::from_str_radix(part, 16).map_err(|_| format!("invalid MAC octet {part:?}"))?;
    }
    if it.next().is_some() {
        return Err(format!("long MAC address {s:?}"));
    }
    Ok(out)
}

pub fn decode_eth_mask(s: &str) -> Result<EthMask, String> {
    let (mac_str, mask_str) = match s.split_once('/') {
        Some((a, b)) => (a, Some(b)),
        None => (s, None),
    };
    let mac = parse_mac(mac_str)?;
    let mask = match mask_str {
        Some(m) => parse_mac(m)?,
        None => EthMask::ALL_ONES,
    };
    Ok(EthMask { mac, mask })
}

pub fn looks_like_ip(s: &str) -> bool {
    let body = s.split('/').next().unwrap_or(s);
    body.parse::<IpAddr>().is_ok()
}

pub fn decode_ip_address(s: &str) -> Result<IpAddr, String> {
    s.parse().map_err(|_| format!("invalid IP address {s:?}"))
}

pub fn decode_ip_mask(s: &str) -> Result<IpMask, String> {
    let (addr_str, mask_str) = match s.split_once('/') {
        Some((a, b)) => (a, Some(b)),
        None => (s, None),
    };
    let addr: IpAddr = addr_str
        .parse()
        .map_err(|_| format!("invalid IP address {addr_str:?}"))?;
    let mask = match mask_str {
        None => return Ok(IpMask::host(addr)),
        // Distinguish `/24` (prefix length) from `/255.255.255.0` (mask
        // address) by whether the token contains a dot or colon (§4.1).
        Some(m) if m.contains('.') || m.contains(':') => {
            let m: IpAddr = m.parse().map_err(|_| format!("invalid mask address {m:?}"))?;
            IpMaskKind::Explicit(m)
        }
        Some(m) => {
            let p: u8 = m.parse().map_err(|_| format!("invalid prefix length {m:?}"))?;
            IpMaskKind::Prefix(p)
        }
    };
    Ok(IpMask { addr, mask })
}

/// Element kind shared by both sides of a [`Value::Range`] (§4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeElement {
    Integer,
    Ip,
}

fn decode_range_element<'a>(s: &'a str, elem: RangeElement) -> Result<Value<'a>, String> {
    match elem {
        RangeElement::Integer => decode_integer(s).map(Value::Integer),
        RangeElement::Ip => decode_ip_address(s).map(Value::IpAddress),
    }
}

/// Splits `start-end`, stripping one level of matching `[[...]]` brackets
/// around an IPv6 literal when present (§4.1, §4.3 edge cases).
fn split_range(s: &str) -> Result<(&str, &str), String> {
    if let Some(rest) = s.strip_prefix("[[") {
        let end = rest.find("]]").ok_or("unterminated [[ ]] in range")?;
        let left = &rest[..end];
        let after = &rest[end + 2..];
        let after = after
            .strip_prefix('-')
            .ok_or("expected '-' after bracketed range start")?;
        let right = match after.strip_prefix("[[") {
            Some(r) => {
                let e2 = r.find("]]").ok_or("unterminated [[ ]] in range")?;
                &r[..e2]
            }
            None => after,
        };
        Ok((left, right))
    } else {
        let idx = s.find('-').ok_or("not a range: no '-' found")?;
        Ok((&s[..idx], &s[idx + 1..]))
    }
}

pub fn decode_range(s: &str, elem: RangeElement) -> Result<Value<'_>, String> {
    let (left, right) = split_range(s)?;
    let lv = decode_range_element(left, elem)?;
    let rv = decode_range_element(right, elem)?;
    match (lv.range_key(), rv.range_key()) {
        (Some(a), Some(b)) if a <= b => Ok(Value::Range(Box::new(lv), Box::new(rv))),
        (Some(RangeKey::Integer(_)), Some(RangeKey::Integer(_)))
        | (Some(RangeKey::Ip(_)), Some(RangeKey::Ip(_))) => {
            Err(format!("range start {left:?} is greater than end {right:?}"))
        }
        _ => Err("range endpoints are not the same element type".to_string()),
    }
}

/// Best-effort guess at whether `s` looks like a range (`a-b`) before
/// committing to the Range decoder, used by the nested-value dispatch
/// (§4.3, step 2).
pub fn looks_like_range(s: &str) -> bool {
    split_range(s).is_ok()
}
