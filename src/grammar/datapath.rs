//! `ovs-dpctl`/`ovs-appctl dpctl/dump-flows` grammar (§4.6): the
//! match-field and action tables for the datapath dialect, plus the
//! positional sub-grammars (`nat`, `clone`, `check_pkt_len`, the geneve/gre
//! tunnel headers) that don't fit a single `ValueForm` leaf.

use indexmap::IndexMap;

use crate::decoders::{self, RangeElement};
use crate::nested::{self, Ctx};
use crate::schema::{field, Schema, ValueForm};
use crate::tokenizer::{self, Shape};
use crate::value::Width;
use crate::Value;

use super::parse_brace_tlv_list;

const ETH: Schema = &[
    field("src", ValueForm::EthMask, false),
    field("dst", ValueForm::EthMask, false),
];

const IPV4: Schema = &[
    field("src", ValueForm::IpMask, false),
    field("dst", ValueForm::IpMask, false),
    field("proto", ValueForm::Masked(Width::W8), false),
    field("tos", ValueForm::Masked(Width::W8), false),
    field("ttl", ValueForm::Integer, false),
    field("frag", ValueForm::Enum, false),
];

const IPV6: Schema = &[
    field("src", ValueForm::IpMask, false),
    field("dst", ValueForm::IpMask, false),
    field("label", ValueForm::Integer, false),
    field("proto", ValueForm::Masked(Width::W8), false),
    field("tclass", ValueForm::Masked(Width::W8), false),
    field("hlimit", ValueForm::Integer, false),
    field("frag", ValueForm::Enum, false),
];

const VXLAN: Schema = &[
    field("flags", ValueForm::Integer, false),
    field("vni", ValueForm::Integer, false),
];

const ERSPAN: Schema = &[
    field("ver", ValueForm::Integer, false),
    field("dir", ValueForm::Integer, false),
    field("hwid", ValueForm::Integer, false),
    field("idx", ValueForm::Integer, false),
];

const UDP: Schema = &[
    field("src", ValueForm::Integer, false),
    field("dst", ValueForm::Integer, false),
    field("csum", ValueForm::Integer, false),
];

/// §C of SPEC_FULL.md, Open Question #2: `tun_id` stays a plain integer
/// (not masked) even though it's written in hex, matching the upstream
/// reference's decoder.
const TUNNEL: Schema = &[
    field("tun_id", ValueForm::Integer, false),
    field("src", ValueForm::IpMask, false),
    field("dst", ValueForm::IpMask, false),
    field("tos", ValueForm::Masked(Width::W8), false),
    field("ttl", ValueForm::Integer, false),
    field("tp_src", ValueForm::Integer, false),
    field("tp_dst", ValueForm::Integer, false),
    field("flags", ValueForm::Flags, false),
    field("geneve", ValueForm::Custom("dp_geneve"), false),
    field("vxlan", ValueForm::Record(VXLAN), false),
    field("erspan", ValueForm::Record(ERSPAN), false),
    field("gre", ValueForm::Custom("dp_gre"), false),
];

const HEADER: Schema = &[
    field("eth", ValueForm::Record(ETH), false),
    field("ipv4", ValueForm::Record(IPV4), false),
    field("ipv6", ValueForm::Record(IPV6), false),
    field("udp", ValueForm::Record(UDP), false),
    field("geneve", ValueForm::Custom("dp_geneve"), false),
    field("vxlan", ValueForm::Record(VXLAN), false),
    field("gre", ValueForm::Custom("dp_gre"), false),
];

const TNL_PUSH: Schema = &[
    field("tnl_port", ValueForm::Integer, false),
    field("out_port", ValueForm::Integer, false),
    field("header", ValueForm::Record(HEADER), false),
];

/// §C Open Question #2: `ct_zone` is a 16-bit masked field, `ct_mark` is
/// 32-bit, `ct_label` is the 128-bit CT label — widths replicated
/// verbatim from the upstream reference, inconsistency and all.
const CT: Schema = &[
    field("zone", ValueForm::Masked(Width::W16), false),
    field("mark", ValueForm::Masked(Width::W32), false),
    field("label", ValueForm::Masked(Width::W128), false),
    field("helper", ValueForm::String, false),
    field("timeout", ValueForm::String, false),
    field("commit", ValueForm::BoolFlag, true),
    field("force_commit", ValueForm::BoolFlag, true),
    field("nat", ValueForm::Custom("dp_nat"), true),
];

/// `encap(...)`'s inner fields are the same header fields a match can
/// carry directly, just nested one level (`test_odp.py`'s
/// `encap(eth_type(...),ipv4(...))` case decodes `eth_type` as the same
/// `Masked(16)` and `ipv4` as the same [`IPV4`] record the outer match
/// uses).
const ENCAP: Schema = &[
    field("eth_type", ValueForm::Masked(Width::W16), false),
    field("eth", ValueForm::Record(ETH), false),
    field("ipv4", ValueForm::Record(IPV4), false),
    field("ipv6", ValueForm::Record(IPV6), false),
];

/// Datapath match fields needing more than heuristic inference. §C Open
/// Question #2 fixes the width inconsistency the upstream tool itself
/// has between these four fields (`skb_priority`/`skb_mark` 32-bit,
/// `ct_zone` 16-bit, `recirc_id`/`dp_hash` left as plain integers) by
/// replicating it rather than "fixing" it.
pub(crate) const MATCH: Schema = &[
    field("skb_priority", ValueForm::Masked(Width::W32), false),
    field("skb_mark", ValueForm::Masked(Width::W32), false),
    field("recirc_id", ValueForm::Integer, false),
    field("dp_hash", ValueForm::Masked(Width::W32), false),
    field("ct_state", ValueForm::Flags, false),
    field("ct_zone", ValueForm::Masked(Width::W16), false),
    field("ct_mark", ValueForm::Masked(Width::W32), false),
    field("ct_label", ValueForm::Masked(Width::W128), false),
    field("in_port", ValueForm::Integer, false),
    field("eth_type", ValueForm::Masked(Width::W16), false),
    field("eth", ValueForm::Record(ETH), false),
    field("ipv4", ValueForm::Record(IPV4), false),
    field("ipv6", ValueForm::Record(IPV6), false),
    field("tunnel", ValueForm::Record(TUNNEL), false),
    field("encap", ValueForm::Record(ENCAP), false),
];

/// Standalone datapath action names that stay bare flags inside a nested
/// action list (`clone(...)`, `check_pkt_len`'s `gt`/`le`) — every other
/// bare token there is OpenFlow's `output{port}` shorthand, reused
/// verbatim since both dialects alias bare ports the same way (§4.4, §B
/// of SPEC_FULL.md).
const RESERVED_BARE_ACTIONS: &[&str] = &["drop", "ct"];

pub(crate) const ACTIONS: Schema = &[
    field("ct", ValueForm::Record(CT), true),
    field("tnl_push", ValueForm::Record(TNL_PUSH), true),
    field("tnl_pop", ValueForm::Custom("dp_tnl_pop"), true),
    field("clone", ValueForm::Custom("dp_clone"), true),
    field("check_pkt_len", ValueForm::Custom("dp_check_pkt_len"), true),
];

pub(crate) fn dispatch<'a>(name: &'static str, text: &'a str, depth: usize, ctx: &Ctx) -> Result<Value<'a>, String> {
    match name {
        "dp_nat" => dp_nat(text),
        "dp_geneve" => dp_geneve(text, depth, ctx),
        "dp_gre" => dp_gre(text, depth, ctx),
        "dp_tnl_pop" => Ok(Value::Integer(decoders::decode_integer(text)?)),
        "dp_clone" => dp_action_record(text, depth, ctx),
        "dp_check_pkt_len" => dp_check_pkt_len(text, depth, ctx),
        other => Err(format!("unhandled datapath custom grammar {other:?}")),
    }
}

/// Parses `text` as a nested action list merged into one record keyed by
/// action name, with the same bare-port reinterpretation OpenFlow's action
/// lists use (used by `clone(...)` and `check_pkt_len`'s `gt`/`le`
/// branches — `clone(1)` → `{output: {port: 1}}`, `gt(drop)` → `{drop:
/// true}`, per `test_odp.py`'s `clone`/`check_pkt_len` cases).
fn dp_action_record<'a>(text: &'a str, depth: usize, ctx: &Ctx) -> Result<Value<'a>, String> {
    if depth + 1 > ctx.max_depth {
        return Err("maximum nesting depth exceeded".to_string());
    }
    let raws = tokenizer::tokenize(text).map_err(|e| format!("{e:?}"))?;
    let mut map = IndexMap::new();
    for raw in raws {
        let is_port_shorthand =
            matches!(raw.shape, Shape::Bare) && !RESERVED_BARE_ACTIONS.contains(&raw.key);
        let (key, value) = if is_port_shorthand {
            ("output", crate::grammar::openflow::as_output_shorthand(raw.key))
        } else {
            let entry = crate::schema::lookup(ACTIONS, raw.key);
            let value = nested::decode_raw(&raw, entry.map(|e| e.form), raw.key, 0, depth + 1, ctx)
                .map_err(|e| e.to_string())?;
            (raw.key, value)
        };
        map.insert(key.to_string(), value);
    }
    Ok(Value::Record(map))
}

/// `check_pkt_len(size=N,gt(actions...),le(actions...))`.
fn dp_check_pkt_len<'a>(text: &'a str, depth: usize, ctx: &Ctx) -> Result<Value<'a>, String> {
    let mut map = IndexMap::new();
    for (part, _) in nested::split_top_level_commas(text) {
        if let Some(size) = part.strip_prefix("size=") {
            map.insert("size".to_string(), Value::Integer(decoders::decode_integer(size)?));
        } else if let Some(inner) = part.strip_prefix("gt(").and_then(|s| s.strip_suffix(')')) {
            map.insert("gt".to_string(), dp_action_record(inner, depth, ctx)?);
        } else if let Some(inner) = part.strip_prefix("le(").and_then(|s| s.strip_suffix(')')) {
            map.insert("le".to_string(), dp_action_record(inner, depth, ctx)?);
        } else {
            return Err(format!("check_pkt_len: unexpected argument {part:?}"));
        }
    }
    Ok(Value::Record(map))
}

/// `nat(src)`, `nat(dst)`, or `nat(src=addr[:port][-addr[:port]],flags...)`
/// (§B of SPEC_FULL.md). A single address with no range is still
/// represented as `start == end`, matching the upstream reference.
fn dp_nat(text: &str) -> Result<Value<'_>, String> {
    let mut map = IndexMap::new();
    if text.is_empty() {
        return Ok(Value::Record(map));
    }
    for raw in tokenizer::tokenize(text).map_err(|e| format!("{e:?}"))? {
        match raw.key {
            "src" | "dst" => {
                map.insert("type".to_string(), Value::Enum(raw.key));
                if let Some((value_text, _)) = raw.value {
                    let (addr_part, port_part) = split_nat_addr_port(value_text)?;
                    map.insert("addrs".to_string(), decode_addr_range(addr_part)?);
                    if let Some(p) = port_part {
                        map.insert("ports".to_string(), decode_port_range(p)?);
                    }
                }
            }
            other => {
                map.insert(other.to_string(), Value::Bool(true));
            }
        }
    }
    Ok(Value::Record(map))
}

fn split_nat_addr_port(text: &str) -> Result<(&str, Option<&str>), String> {
    if let Some(rest) = text.strip_prefix("[[") {
        let close1 = rest.find("]]").ok_or("nat: unterminated '[['")?;
        let mut end = 2 + close1 + 2;
        if let Some(after_first) = text[end..].strip_prefix("-[[") {
            let close2 = after_first.find("]]").ok_or("nat: unterminated '[['")?;
            end += 3 + close2 + 2;
        }
        let addr_part = &text[..end];
        let rest = &text[end..];
        match rest.strip_prefix(':') {
            Some(port) => Ok((addr_part, Some(port))),
            None => Ok((addr_part, None)),
        }
    } else if text.contains('.') {
        match text.rfind(':') {
            Some(idx) => Ok((&text[..idx], Some(&text[idx + 1..]))),
            None => Ok((text, None)),
        }
    } else {
        Ok((text, None))
    }
}

fn decode_addr_range(s: &str) -> Result<Value<'_>, String> {
    if decoders::looks_like_range(s) {
        decoders::decode_range(s, RangeElement::Ip)
    } else {
        let stripped = s.trim_start_matches("[[").trim_end_matches("]]");
        let a = decoders::decode_ip_address(stripped)?;
        Ok(Value::Range(Box::new(Value::IpAddress(a)), Box::new(Value::IpAddress(a))))
    }
}

fn decode_port_range(s: &str) -> Result<Value<'_>, String> {
    if s.contains('-') {
        decoders::decode_range(s, RangeElement::Integer)
    } else {
        let n = decoders::decode_integer(s)?;
        Ok(Value::Range(Box::new(Value::Integer(n)), Box::new(Value::Integer(n))))
    }
}

/// `geneve(oam,crit,vni=...,options({...}))`, or a bare TLV list
/// `geneve({...},{...})` when the whole value is brace-wrapped (§B).
fn dp_geneve<'a>(text: &'a str, depth: usize, ctx: &Ctx) -> Result<Value<'a>, String> {
    if depth + 1 > ctx.max_depth {
        return Err("maximum nesting depth exceeded".to_string());
    }
    if text.starts_with('{') {
        return Ok(Value::List(parse_brace_tlv_list(text)?));
    }
    let mut map = IndexMap::new();
    for raw in tokenizer::tokenize(text).map_err(|e| format!("{e:?}"))? {
        match raw.key {
            "oam" | "crit" => {
                map.insert(raw.key.to_string(), Value::Bool(true));
            }
            "vni" => {
                let (t, _) = raw.value.ok_or("geneve: 'vni' requires a value")?;
                map.insert("vni".to_string(), Value::Integer(decoders::decode_integer(t)?));
            }
            "options" => {
                let (t, _) = raw.value.ok_or("geneve: 'options' requires a value")?;
                map.insert("options".to_string(), Value::List(parse_brace_tlv_list(t)?));
            }
            other => {
                let value = match raw.value {
                    Some((t, _)) => nested::heuristic_infer(t)?,
                    None => Value::Bool(true),
                };
                map.insert(other.to_string(), value);
            }
        }
    }
    Ok(Value::Record(map))
}

/// `gre((flags=..,proto=..),csum=..,key=..)` — an anonymous leading
/// group of positional fields merged with trailing named ones.
fn dp_gre<'a>(text: &'a str, depth: usize, ctx: &Ctx) -> Result<Value<'a>, String> {
    if depth + 1 > ctx.max_depth {
        return Err("maximum nesting depth exceeded".to_string());
    }
    let mut map = IndexMap::new();
    let bytes = text.as_bytes();
    let rest = if bytes.first() == Some(&b'(') {
        let mut paren_depth = 1i32;
        let mut j = 1;
        while j < bytes.len() && paren_depth > 0 {
            match bytes[j] {
                b'(' => paren_depth += 1,
                b')' => paren_depth -= 1,
                _ => {}
            }
            j += 1;
        }
        if paren_depth != 0 {
            return Err(format!("gre: unterminated '(' in {text:?}"));
        }
        let inner = &text[1..j - 1];
        for raw in tokenizer::tokenize(inner).map_err(|e| format!("{e:?}"))? {
            let (vtext, _) = raw.value.ok_or("gre: expected key=value in anonymous group")?;
            map.insert(raw.key.to_string(), nested::heuristic_infer(vtext)?);
        }
        text[j..].trim_start_matches(',')
    } else {
        text
    };
    for raw in tokenizer::tokenize(rest).map_err(|e| format!("{e:?}"))? {
        let value = match raw.value {
            Some((t, _)) => nested::heuristic_infer(t)?,
            None => Value::Bool(true),
        };
        map.insert(raw.key.to_string(), value);
    }
    Ok(Value::Record(map))
}
