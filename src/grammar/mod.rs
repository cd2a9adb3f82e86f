//! Concrete field tables and positional sub-grammars for the two flow
//! dialects (§4.6). [`openflow`] and [`datapath`] each expose a `MATCH`
//! and `ACTIONS` [`crate::schema::Schema`] plus the handful of actions
//! whose grammar is positional rather than `key=value` — those are
//! routed here through [`crate::schema::ValueForm::Custom`] and land in
//! [`dispatch_custom`].

use indexmap::IndexMap;

use crate::error::ParseError;
use crate::nested::Ctx;
use crate::Value;

pub mod datapath;
pub mod openflow;

/// Entry point for every `ValueForm::Custom(name)` schema entry. `text` is
/// the raw value text exactly as [`crate::nested::decode_raw`] would have
/// handed it to the generic dispatch; `abs`/`key_path` carry error context.
pub(crate) fn dispatch_custom<'a>(
    name: &'static str,
    text: &'a str,
    arrow: Option<&'a str>,
    key_path: &str,
    abs: usize,
    depth: usize,
    ctx: &Ctx,
) -> Result<Value<'a>, ParseError> {
    let result = match name {
        n if n.starts_with("of_") => openflow::dispatch(n, text, arrow, depth, ctx),
        n if n.starts_with("dp_") => datapath::dispatch(n, text, depth, ctx),
        other => Err(format!("unknown custom grammar {other:?}")),
    };
    result.map_err(|reason| ParseError::invalid_value(abs, key_path, reason))
}

/// Splits `{...}` groups separated by commas/whitespace, e.g. the TLV list
/// inside `options({...},{...})` or a bare `geneve({...})`. Returns each
/// group's interior text (braces stripped).
pub(crate) fn split_brace_groups(text: &str) -> Result<Vec<&str>, String> {
    let bytes = text.as_bytes();
    let len = bytes.len();
    let mut i = 0;
    let mut out = Vec::new();
    while i < len {
        while i < len && (bytes[i] == b' ' || bytes[i] == b',') {
            i += 1;
        }
        if i >= len {
            break;
        }
        if bytes[i] != b'{' {
            return Err(format!("expected '{{' at offset {i} in {text:?}"));
        }
        let start = i + 1;
        let mut depth = 1i32;
        let mut j = start;
        while j < len && depth > 0 {
            match bytes[j] {
                b'{' => depth += 1,
                b'}' => depth -= 1,
                _ => {}
            }
            j += 1;
        }
        if depth != 0 {
            return Err(format!("unterminated '{{' in {text:?}"));
        }
        out.push(&text[start..j - 1]);
        i = j;
    }
    Ok(out)
}

/// A single geneve/erspan-style TLV group: `class=..,type=..,len=..,<data>`
/// where the trailing bare token (no `=`) is the option payload, keyed
/// `data`.
pub(crate) fn parse_tlv_group(group: &str) -> Result<Value<'_>, String> {
    use crate::value::Width;
    let mut map = IndexMap::new();
    for tok in group.split(',') {
        let tok = tok.trim();
        if tok.is_empty() {
            continue;
        }
        match tok.split_once('=') {
            Some(("class", v)) => {
                map.insert("class".to_string(), Value::Masked(crate::decoders::decode_masked(Width::W16, v)?));
            }
            Some(("type", v)) => {
                map.insert("type".to_string(), Value::Masked(crate::decoders::decode_masked(Width::W8, v)?));
            }
            Some(("len", v)) => {
                map.insert("len".to_string(), Value::Masked(crate::decoders::decode_masked(Width::W8, v)?));
            }
            Some((k, v)) => {
                map.insert(k.to_string(), crate::nested::heuristic_infer(v)?);
            }
            None => {
                map.insert("data".to_string(), Value::Masked(crate::decoders::decode_masked(Width::W128, tok)?));
            }
        }
    }
    Ok(Value::Record(map))
}

pub(crate) fn parse_brace_tlv_list(text: &str) -> Result<Vec<Value<'_>>, String> {
    split_brace_groups(text)?.into_iter().map(parse_tlv_group).collect()
}

/// Parses an OpenFlow field reference: `field`, `field[n]`, or
/// `field[start..end]` (§4.6). A bare field (no brackets) carries no
/// `start`/`end` entries — it refers to the field's whole width.
pub(crate) fn parse_field_ref(text: &str) -> Result<Value<'_>, String> {
    let mut map = IndexMap::new();
    let (name, bracket) = match text.find('[') {
        Some(idx) => {
            let rest = &text[idx + 1..];
            let rest = rest
                .strip_suffix(']')
                .ok_or_else(|| format!("unterminated field range in {text:?}"))?;
            (&text[..idx], Some(rest))
        }
        None => (text, None),
    };
    map.insert("field".to_string(), Value::String(name));
    if let Some(range) = bracket {
        let (start, end) = match range.split_once("..") {
            Some((s, e)) => (
                s.parse::<u32>().map_err(|_| format!("bad range start {s:?}"))?,
                e.parse::<u32>().map_err(|_| format!("bad range end {e:?}"))?,
            ),
            None => {
                let n = range.parse::<u32>().map_err(|_| format!("bad range index {range:?}"))?;
                (n, n)
            }
        };
        map.insert("start".to_string(), Value::Integer(start as u64));
        map.insert("end".to_string(), Value::Integer(end as u64));
    }
    Ok(Value::Record(map))
}

/// Typed decode of a `set_field`-style left-hand value, keyed by the name
/// of the destination field it is bound for (§4.6). Falls back to a
/// generic heuristic for fields this table doesn't special-case.
pub(crate) fn decode_field_typed_value(field: &str, text: &str) -> Result<Value<'_>, String> {
    match field {
        "eth_src" | "eth_dst" | "dl_src" | "dl_dst" => crate::decoders::decode_eth_mask(text).map(Value::EthMask),
        "nw_src" | "nw_dst" | "ipv4_src" | "ipv4_dst" | "ip_src" | "ip_dst" | "ipv6_src" | "ipv6_dst" => {
            crate::decoders::decode_ip_mask(text).map(Value::IpMask)
        }
        _ => crate::nested::heuristic_infer(text),
    }
}
