//! `ovs-ofctl dump-flows` grammar (§4.6): the match-field and action
//! tables, plus the handful of actions (`load`, `move`, `set_field`,
//! `bundle`, `enqueue`, `encap`, `check_pkt_larger`) whose grammar is
//! positional rather than `key=value` and so is routed through
//! [`crate::schema::ValueForm::Custom`].

use crate::decoders;
use crate::nested::Ctx;
use crate::schema::{field, Schema, ValueForm};
use crate::tokenizer::{self, Shape};
use crate::value::Width;
use crate::Value;

use super::{decode_field_typed_value, parse_field_ref};

/// Standalone action names that stay bare flags when they appear with no
/// value in the actions section. Every other bare token there is
/// OpenFlow's `output{port}` shorthand (`local,3,4,5,output:foo`, §4.4).
pub(crate) const RESERVED_BARE_ACTIONS: &[&str] = &[
    "drop",
    "flood",
    "normal",
    "in_port",
    "strip_vlan",
    "pop_vlan",
    "dec_ttl",
    "dec_mpls_ttl",
    "ct_clear",
];

/// Builds the `output{port: ...}` shape shared by the bare-token shorthand
/// and the explicit `output:foo`/`output(foo)` forms.
pub(crate) fn as_output_shorthand(port_text: &str) -> Value<'_> {
    let port = if decoders::looks_like_integer(port_text) {
        decoders::decode_integer(port_text)
            .map(Value::Integer)
            .unwrap_or(Value::String(port_text))
    } else {
        Value::String(port_text)
    };
    let mut map = indexmap::IndexMap::new();
    map.insert("port".to_string(), port);
    Value::Record(map)
}

/// Classifies one bare token from an actions list (§4.4, §B of
/// SPEC_FULL.md): `controller` aliases straight to `output` with its value
/// left as the bare string (it does *not* go through the `{port: ...}`
/// wrapping bare port numbers get), a reserved name stays a standalone
/// flag, and every other bare token is the `output{port}` shorthand.
/// Shared by the top-level assembler and `clone(...)`'s nested dispatch so
/// both apply the identical rule.
pub(crate) fn bare_action_kv(token: &str) -> (&str, Value<'_>) {
    if token == "controller" {
        ("output", Value::String(token))
    } else if RESERVED_BARE_ACTIONS.contains(&token) {
        (token, Value::Bool(true))
    } else {
        ("output", as_output_shorthand(token))
    }
}

/// OpenFlow match fields that need more than heuristic inference: masked
/// numeric bitfields (heuristic inference never guesses a width) and the
/// connection-tracking fields (§C of SPEC_FULL.md, Open Question #2:
/// widths are replicated verbatim from the upstream tool, inconsistency
/// and all). Everything else — `in_port`, `dl_src`, `nw_src`, `eth_type`
/// without a mask, ... — is recognised correctly by heuristic inference
/// and needs no entry here.
pub(crate) const MATCH: Schema = &[
    field("eth_type", ValueForm::Masked(Width::W16), false),
    field("vlan_tci", ValueForm::Masked(Width::W16), false),
    field("nw_tos", ValueForm::Masked(Width::W8), false),
    field("ip_dscp", ValueForm::Masked(Width::W8), false),
    field("nw_proto", ValueForm::Masked(Width::W8), false),
    field("nw_ecn", ValueForm::Masked(Width::W8), false),
    field("tp_src", ValueForm::Masked(Width::W16), false),
    field("tp_dst", ValueForm::Masked(Width::W16), false),
    field("tcp_flags", ValueForm::Masked(Width::W16), false),
    field("tun_id", ValueForm::Masked(Width::W64), false),
    field("tun_src", ValueForm::IpMask, false),
    field("tun_dst", ValueForm::IpMask, false),
    field("metadata", ValueForm::Masked(Width::W64), false),
    field("pkt_mark", ValueForm::Masked(Width::W32), false),
    field("ct_state", ValueForm::Flags, false),
    field("ct_zone", ValueForm::Masked(Width::W16), false),
    field("ct_mark", ValueForm::Masked(Width::W32), false),
    field("ct_label", ValueForm::Masked(Width::W128), false),
    field("reg0", ValueForm::Masked(Width::W32), false),
    field("reg1", ValueForm::Masked(Width::W32), false),
    field("reg2", ValueForm::Masked(Width::W32), false),
    field("reg3", ValueForm::Masked(Width::W32), false),
    field("reg4", ValueForm::Masked(Width::W32), false),
    field("reg5", ValueForm::Masked(Width::W32), false),
    field("reg6", ValueForm::Masked(Width::W32), false),
    field("reg7", ValueForm::Masked(Width::W32), false),
    field("xreg0", ValueForm::Masked(Width::W64), false),
    field("xreg1", ValueForm::Masked(Width::W64), false),
    field("xreg2", ValueForm::Masked(Width::W64), false),
    field("xreg3", ValueForm::Masked(Width::W64), false),
];

/// OpenFlow actions whose grammar can't be described by a single
/// `ValueForm` leaf. Simple actions (`output`, `mod_nw_dst`, `group`,
/// `push_vlan`, bare `strip_vlan`, ...) rely entirely on heuristic
/// inference and are intentionally absent here.
pub(crate) const ACTIONS: Schema = &[
    field("load", ValueForm::Custom("of_load"), true),
    field("move", ValueForm::Custom("of_move"), true),
    field("set_field", ValueForm::Custom("of_set_field"), true),
    field("bundle", ValueForm::Custom("of_bundle"), true),
    field("bundle_load", ValueForm::Custom("of_bundle_load"), true),
    field("enqueue", ValueForm::Custom("of_enqueue"), true),
    field("encap", ValueForm::Custom("of_encap"), true),
    field("check_pkt_larger", ValueForm::Custom("of_check_pkt_larger"), true),
    field("dec_ttl", ValueForm::List(&ValueForm::Integer), true),
    field("dec_mpls_ttl", ValueForm::BoolFlag, true),
    // `output:3`/`output(3)`/`output:foo` — the explicit forms of the bare
    // port shorthand the assembler reinterprets at the top level (§4.4).
    field("output", ValueForm::Custom("of_output"), true),
    // `clone(act,act,...)` — a nested action list, merged by key into a
    // single record rather than kept as an ordered list (§8 scenario S6).
    field("clone", ValueForm::Custom("of_clone"), true),
    // `controller:200` is always a record; the bare `controller` form
    // aliases to `output` instead and is handled by `bare_action_kv`.
    field("controller", ValueForm::Custom("of_controller"), true),
];

/// NSH header fields nested inside `encap(nsh(...))`: `tlv` is positional,
/// everything else (`md_type`, ...) is heuristically inferrable.
const NSH: Schema = &[field("tlv", ValueForm::Custom("of_tlv"), true)];

/// `encap(...)`'s nested-record shape. A bare packet-type integer doesn't
/// go through this table at all (`of_encap` special-cases it).
const ENCAP: Schema = &[field("nsh", ValueForm::Record(NSH), false)];

pub(crate) fn dispatch<'a>(name: &'static str, text: &'a str, arrow: Option<&'a str>, depth: usize, ctx: &Ctx) -> Result<Value<'a>, String> {
    match name {
        "of_load" => of_load(text),
        "of_move" => of_move(text),
        "of_set_field" => of_set_field(text),
        "of_bundle" => of_bundle(text, false),
        "of_bundle_load" => of_bundle(text, true),
        "of_enqueue" => of_enqueue(text),
        "of_encap" => of_encap(text, depth, ctx),
        "of_check_pkt_larger" => of_check_pkt_larger(text, arrow),
        "of_output" => Ok(as_output_shorthand(text)),
        "of_clone" => of_action_record(text, depth, ctx),
        "of_controller" => of_controller(text),
        "of_tlv" => of_tlv(text),
        other => Err(format!("unhandled OpenFlow custom grammar {other:?}")),
    }
}

/// `load:value->field[start..end]` — the left-hand value is always a
/// plain integer regardless of the destination field.
fn of_load(text: &str) -> Result<Value<'_>, String> {
    let (value_text, dst_text) = text
        .split_once("->")
        .ok_or_else(|| format!("load: missing '->' in {text:?}"))?;
    let mut map = indexmap::IndexMap::new();
    map.insert("value".to_string(), Value::Integer(decoders::decode_integer(value_text)?));
    map.insert("dst".to_string(), parse_field_ref(dst_text)?);
    Ok(Value::Record(map))
}

/// `move:src[s..e]->dst[s..e]` — no typed value, just two field refs.
fn of_move(text: &str) -> Result<Value<'_>, String> {
    let (src_text, dst_text) = text
        .split_once("->")
        .ok_or_else(|| format!("move: missing '->' in {text:?}"))?;
    let mut map = indexmap::IndexMap::new();
    map.insert("src".to_string(), parse_field_ref(src_text)?);
    map.insert("dst".to_string(), parse_field_ref(dst_text)?);
    Ok(Value::Record(map))
}

/// `set_field:value->field` — the value is typed by the destination
/// field and nested one level deeper, keyed by the field's own name.
fn of_set_field(text: &str) -> Result<Value<'_>, String> {
    let (value_text, dst_text) = text
        .split_once("->")
        .ok_or_else(|| format!("set_field: missing '->' in {text:?}"))?;
    let field_name = dst_text.split('[').next().unwrap_or(dst_text);
    let mut inner = indexmap::IndexMap::new();
    inner.insert(field_name.to_string(), decode_field_typed_value(field_name, value_text)?);
    let mut map = indexmap::IndexMap::new();
    map.insert("value".to_string(), Value::Record(inner));
    map.insert("dst".to_string(), parse_field_ref(dst_text)?);
    Ok(Value::Record(map))
}

/// `check_pkt_larger(pkt_len)->dst[range]`. Its value and arrow-suffix are
/// split by the tokeniser (the paren value ends before `->` begins).
fn of_check_pkt_larger<'a>(text: &'a str, arrow: Option<&'a str>) -> Result<Value<'a>, String> {
    let arrow = arrow.ok_or_else(|| format!("check_pkt_larger: missing '->dst' after {text:?}"))?;
    let mut map = indexmap::IndexMap::new();
    map.insert("pkt_len".to_string(), Value::Integer(decoders::decode_integer(text)?));
    map.insert("dst".to_string(), parse_field_ref(arrow)?);
    Ok(Value::Record(map))
}

/// `enqueue(port,queue)` or `enqueue:port:queue` — both forms carry two
/// positional values, separated by whichever punctuation the caller used.
fn of_enqueue(text: &str) -> Result<Value<'_>, String> {
    let sep = if text.contains(',') { ',' } else { ':' };
    let (port, queue) = text
        .split_once(sep)
        .ok_or_else(|| format!("enqueue: expected two arguments in {text:?}"))?;
    let mut map = indexmap::IndexMap::new();
    map.insert("port".to_string(), crate::nested::heuristic_infer(port)?);
    map.insert("queue".to_string(), crate::nested::heuristic_infer(queue)?);
    Ok(Value::Record(map))
}

/// `bundle(fields,basis,algorithm,selection,members:p,p,...)` and
/// `bundle_load(...,dst,members:p,p,...)`. `members:`'s own value uses
/// plain commas with no nesting, so the whole argument list is split on
/// plain commas and the fragments after `members:` are stitched back
/// together rather than treated as further positional arguments.
fn of_bundle(text: &str, has_dst: bool) -> Result<Value<'_>, String> {
    let parts: Vec<&str> = text.split(',').collect();
    let midx = parts
        .iter()
        .position(|p| p.starts_with("members:"))
        .ok_or_else(|| format!("bundle: missing 'members:' in {text:?}"))?;
    let positional = &parts[..midx];
    let expected = if has_dst { 5 } else { 4 };
    if positional.len() != expected {
        return Err(format!(
            "bundle: expected {expected} positional arguments before 'members:', found {}",
            positional.len()
        ));
    }
    let mut map = indexmap::IndexMap::new();
    map.insert("fields".to_string(), Value::String(positional[0]));
    map.insert("basis".to_string(), Value::Integer(decoders::decode_integer(positional[1])?));
    map.insert("algorithm".to_string(), Value::Enum(positional[2]));
    // positional[3] is the selection method ("ofport"); OVS only defines
    // one today so it isn't surfaced as a separate field.
    if has_dst {
        map.insert("dst".to_string(), parse_field_ref(positional[4])?);
    }
    let first_member = parts[midx]
        .strip_prefix("members:")
        .expect("position matched by starts_with above");
    let mut members = Vec::new();
    members.push(Value::Integer(decoders::decode_integer(first_member)?));
    for p in &parts[midx + 1..] {
        members.push(Value::Integer(decoders::decode_integer(p)?));
    }
    map.insert("members".to_string(), Value::List(members));
    Ok(Value::Record(map))
}

/// `encap(...)` — a bare packet-type integer (wrapped as `{ethernet: N}`),
/// or a nested header record (currently just `nsh(...)`, whose own `tlv`
/// field is positional and routed through [`of_tlv`]).
fn of_encap<'a>(text: &'a str, depth: usize, ctx: &Ctx) -> Result<Value<'a>, String> {
    if decoders::looks_like_integer(text) {
        let mut map = indexmap::IndexMap::new();
        map.insert("ethernet".to_string(), Value::Integer(decoders::decode_integer(text)?));
        return Ok(Value::Record(map));
    }
    crate::nested::decode_record(text, ENCAP, "encap", 0, depth + 1, ctx).map_err(|e| e.to_string())
}

/// `controller:N` — unlike the bare `controller` alias (handled by
/// [`bare_action_kv`]), the explicit form is always a record.
fn of_controller(text: &str) -> Result<Value<'_>, String> {
    let mut map = indexmap::IndexMap::new();
    map.insert("max_len".to_string(), Value::Integer(decoders::decode_integer(text)?));
    Ok(Value::Record(map))
}

/// `tlv(class,type,value)` — three positional integers, `encap(nsh(...))`'s
/// one irregular inner grammar.
fn of_tlv(text: &str) -> Result<Value<'_>, String> {
    let parts: Vec<&str> = text.split(',').map(str::trim).collect();
    if parts.len() != 3 {
        return Err(format!("tlv: expected 3 positional arguments, found {}", parts.len()));
    }
    let mut map = indexmap::IndexMap::new();
    map.insert("class".to_string(), Value::Integer(decoders::decode_integer(parts[0])?));
    map.insert("type".to_string(), Value::Integer(decoders::decode_integer(parts[1])?));
    map.insert("value".to_string(), Value::Integer(decoders::decode_integer(parts[2])?));
    Ok(Value::Record(map))
}

/// `clone(act,act,...)` — a nested list of actions, decoded against the
/// same [`ACTIONS`] table and the same bare-port reinterpretation the
/// assembler applies at the top level (§4.4, §8 scenario S6), merged into
/// one record keyed by action name rather than kept as an ordered list.
fn of_action_record<'a>(text: &'a str, depth: usize, ctx: &Ctx) -> Result<Value<'a>, String> {
    let raws = tokenizer::tokenize(text).map_err(|e| format!("{e:?}"))?;
    let mut map = indexmap::IndexMap::new();
    for raw in raws {
        let (key, value) = if matches!(raw.shape, Shape::Bare) {
            bare_action_kv(raw.key)
        } else {
            let entry = crate::schema::lookup(ACTIONS, raw.key);
            let value = crate::nested::decode_raw(&raw, entry.map(|e| e.form), raw.key, 0, depth + 1, ctx)
                .map_err(|e| e.to_string())?;
            (raw.key, value)
        };
        map.insert(key.to_string(), value);
    }
    Ok(Value::Record(map))
}
