use std::net::IpAddr;

use crate::value::{IpMaskKind, Width};
use crate::{parse_datapath, parse_openflow, Value};

#[cfg(feature = "serde")]
use serde_test::{assert_ser_tokens, Token};

fn match_value<'a>(flow: &'a crate::Flow<'_>, key: &str) -> &'a Value<'a> {
    &flow
        .match_kv()
        .iter()
        .find(|kv| kv.key == key)
        .unwrap_or_else(|| panic!("no match key {key:?}"))
        .value
}

fn record<'a>(v: &'a Value<'a>) -> &'a indexmap::IndexMap<String, Value<'a>> {
    match v {
        Value::Record(m) => m,
        other => panic!("expected Record, found {other:?}"),
    }
}

// §8 scenario S1: a datapath tunnel record.
#[test]
fn s1_datapath_tunnel_record() {
    let line = "tunnel(tun_id=0x7f10354,src=10.10.10.10,dst=20.20.20.20,ttl=64,flags(csum|key)) actions:drop";
    let flow = parse_datapath(line).unwrap();
    let tunnel = record(match_value(&flow, "tunnel"));

    assert_eq!(tunnel["tun_id"], Value::Integer(0x7f10354));
    assert_eq!(
        tunnel["src"],
        Value::IpMask(crate::value::IpMask::host("10.10.10.10".parse().unwrap()))
    );
    assert_eq!(
        tunnel["dst"],
        Value::IpMask(crate::value::IpMask::host("20.20.20.20".parse().unwrap()))
    );
    assert_eq!(tunnel["ttl"], Value::Integer(64));
    assert_eq!(tunnel["flags"], Value::Flags("csum|key"));
}

// §8 scenario S2: IPv4 CIDR plus masked proto/tos.
#[test]
fn s2_ipv4_cidr_and_masked_fields() {
    let line =
        "eth_type(0x800/0x006),ipv4(src=192.168.1.1/24,dst=192.168.0.0/16,proto=0x1,tos=0x2/0xf0) actions:drop";
    let flow = parse_datapath(line).unwrap();

    let eth_type = match_value(&flow, "eth_type");
    assert_eq!(
        *eth_type,
        Value::Masked(crate::value::Masked {
            width: Width::W16,
            value: 0x800,
            mask: 0x006,
        })
    );

    let ipv4 = record(match_value(&flow, "ipv4"));
    assert_eq!(
        ipv4["src"],
        Value::IpMask(crate::value::IpMask {
            addr: "192.168.1.1".parse().unwrap(),
            mask: IpMaskKind::Prefix(24),
        })
    );
    assert_eq!(
        ipv4["dst"],
        Value::IpMask(crate::value::IpMask {
            addr: "192.168.0.0".parse().unwrap(),
            mask: IpMaskKind::Prefix(16),
        })
    );
    assert_eq!(
        ipv4["proto"],
        Value::Masked(crate::value::Masked {
            width: Width::W8,
            value: 0x01,
            mask: 0xff,
        })
    );
    assert_eq!(
        ipv4["tos"],
        Value::Masked(crate::value::Masked {
            width: Width::W8,
            value: 0x02,
            mask: 0xf0,
        })
    );
}

// §8 scenario S3: NAT with an IPv6 range and a port range.
#[test]
fn s3_nat_ipv6_range_and_ports() {
    let line = "actions:ct(commit,nat(src=[[fe80::20c:29ff:fe88:1]]-[[fe80::20c:29ff:fe88:a18b]]:255-4096,random))";
    let flow = parse_datapath(line).unwrap();
    let ct = record(&flow.actions_kv()[0].value);
    let nat = record(&ct["nat"]);

    assert_eq!(nat["type"], Value::Enum("src"));
    let start: IpAddr = "fe80::20c:29ff:fe88:1".parse().unwrap();
    let end: IpAddr = "fe80::20c:29ff:fe88:a18b".parse().unwrap();
    assert_eq!(
        nat["addrs"],
        Value::Range(Box::new(Value::IpAddress(start)), Box::new(Value::IpAddress(end)))
    );
    assert_eq!(
        nat["ports"],
        Value::Range(Box::new(Value::Integer(255)), Box::new(Value::Integer(4096)))
    );
    assert_eq!(nat["random"], Value::Bool(true));
    assert_eq!(ct["commit"], Value::Bool(true));
}

// §8 scenario S4: the bare-port-list action shorthand. Every bare token
// (and the explicit `output:foo`) decodes to an `output{port}` KeyValue —
// none of them survive as plain bare flags.
#[test]
fn s4_openflow_output_shorthand() {
    let flow = parse_openflow("actions=local,3,4,5,output:foo").unwrap();
    let outputs: Vec<_> = flow.actions_kv().iter().collect();
    assert_eq!(outputs.len(), 5);
    for kv in &outputs {
        assert_eq!(kv.key, "output");
    }
    assert_eq!(record(&outputs[0].value)["port"], Value::String("local"));
    assert_eq!(record(&outputs[1].value)["port"], Value::Integer(3));
    assert_eq!(record(&outputs[2].value)["port"], Value::Integer(4));
    assert_eq!(record(&outputs[3].value)["port"], Value::Integer(5));
    assert_eq!(record(&outputs[4].value)["port"], Value::String("foo"));
}

// §8 scenario S5: `load` with a field-slice destination.
#[test]
fn s5_openflow_load_field_slice() {
    let flow = parse_openflow("actions=load:1->eth_src[1]").unwrap();
    let load = record(&flow.actions_kv()[0].value);
    assert_eq!(load["value"], Value::Integer(1));
    let dst = record(&load["dst"]);
    assert_eq!(dst["field"], Value::String("eth_src"));
    assert_eq!(dst["start"], Value::Integer(1));
    assert_eq!(dst["end"], Value::Integer(1));
}

// §8 scenario S6: recursive `clone`, merged by key at each level.
#[test]
fn s6_openflow_recursive_clone() {
    let flow = parse_openflow("actions=clone(clone(push_vlan(vid=12,pcp=0),2),1)").unwrap();
    let outer = record(&flow.actions_kv()[0].value);
    assert_eq!(record(&outer["output"])["port"], Value::Integer(1));

    let inner = record(&outer["clone"]);
    assert_eq!(record(&inner["output"])["port"], Value::Integer(2));
    let push_vlan = record(&inner["push_vlan"]);
    assert_eq!(push_vlan["vid"], Value::Integer(12));
    assert_eq!(push_vlan["pcp"], Value::Integer(0));
}

// Datapath `clone`/`check_pkt_len` merge into a record with the same
// bare-port reinterpretation OpenFlow's `clone` uses, not a list of
// single-key flag records.
#[test]
fn datapath_clone_and_check_pkt_len_merge_into_records() {
    let flow = parse_datapath(
        "actions:clone(1),clone(clone(push_vlan(vid=12,pcp=0),2),1),\
         check_pkt_len(size=200,gt(4),le(5)),\
         check_pkt_len(size=200,gt(drop),le(5)),\
         check_pkt_len(size=200,gt(ct(nat)),le(drop))",
    )
    .unwrap();
    let actions = flow.actions_kv();

    let clone1 = record(&actions[0].value);
    assert_eq!(record(&clone1["output"])["port"], Value::Integer(1));

    let clone2 = record(&actions[1].value);
    assert_eq!(record(&clone2["output"])["port"], Value::Integer(1));
    let inner = record(&clone2["clone"]);
    assert_eq!(record(&inner["output"])["port"], Value::Integer(2));
    assert_eq!(record(&inner["push_vlan"])["vid"], Value::Integer(12));

    let cpl1 = record(&actions[2].value);
    assert_eq!(cpl1["size"], Value::Integer(200));
    assert_eq!(record(&record(&cpl1["gt"])["output"])["port"], Value::Integer(4));
    assert_eq!(record(&record(&cpl1["le"])["output"])["port"], Value::Integer(5));

    let cpl2 = record(&actions[3].value);
    assert_eq!(record(&cpl2["gt"])["drop"], Value::Bool(true));

    let cpl3 = record(&actions[4].value);
    let gt = record(&cpl3["gt"]);
    assert_eq!(record(&gt["ct"])["nat"], Value::Bool(true));
    assert_eq!(record(&cpl3["le"])["drop"], Value::Bool(true));
}

// OpenFlow `controller`/`controller:N` — the bare form aliases straight to
// `output` with an unwrapped string value, unlike every other bare token.
#[test]
fn openflow_controller_bare_and_explicit() {
    let flow = parse_openflow("actions=controller,controller:200").unwrap();
    let actions = flow.actions_kv();
    assert_eq!(actions[0].key, "output");
    assert_eq!(actions[0].value, Value::String("controller"));
    assert_eq!(actions[1].key, "controller");
    assert_eq!(record(&actions[1].value)["max_len"], Value::Integer(200));
}

// OpenFlow `encap(...)` — a bare packet-type integer wraps as
// `{ethernet: N}`; a nested `nsh(...)` decodes its `tlv` positionally.
#[test]
fn openflow_encap_ethernet_and_nsh_tlv() {
    let flow = parse_openflow("actions=encap(0x0800)").unwrap();
    let encap = record(&flow.actions_kv()[0].value);
    assert_eq!(encap["ethernet"], Value::Integer(0x800));

    let flow = parse_openflow("actions=encap(nsh(md_type=2,tlv(0x1000,10,0x12345678)))").unwrap();
    let encap = record(&flow.actions_kv()[0].value);
    let nsh = record(&encap["nsh"]);
    assert_eq!(nsh["md_type"], Value::Integer(2));
    let tlv = record(&nsh["tlv"]);
    assert_eq!(tlv["class"], Value::Integer(0x1000));
    assert_eq!(tlv["type"], Value::Integer(10));
    assert_eq!(tlv["value"], Value::Integer(0x12345678));
}

// Datapath `encap(eth_type(...),ipv4(...))` — a masked scalar written
// with parens instead of `=`, nested inside a schema-declared `encap`.
#[test]
fn datapath_encap_nested_masked_and_record_fields() {
    let flow = parse_datapath(
        "encap(eth_type(0x800/0x006),ipv4(src=192.168.1.1/24,dst=192.168.0.0/16,proto=0x1,tos=0x2/0xf0)) actions:drop",
    )
    .unwrap();
    let encap = record(match_value(&flow, "encap"));
    assert_eq!(
        encap["eth_type"],
        Value::Masked(crate::value::Masked {
            width: Width::W16,
            value: 0x800,
            mask: 0x006,
        })
    );
    let ipv4 = record(&encap["ipv4"]);
    assert_eq!(
        ipv4["src"],
        Value::IpMask(crate::value::IpMask {
            addr: "192.168.1.1".parse().unwrap(),
            mask: IpMaskKind::Prefix(24),
        })
    );
}

// Invariant 1/2: kpos/kstring and vpos/vstring are substrings of the
// owning section's own `string`, not the whole input line.
#[test]
fn invariant_position_is_relative_to_section() {
    let flow = parse_openflow("priority=10,in_port=3 actions=drop").unwrap();
    let section = flow.section("match").unwrap();
    for kv in flow.match_kv() {
        assert_eq!(
            &section.string[kv.meta.kpos..kv.meta.kpos + kv.meta.kstring.len()],
            kv.meta.kstring
        );
        if kv.meta.has_value() {
            let vpos = kv.meta.vpos as usize;
            assert_eq!(&section.string[vpos..vpos + kv.meta.vstring.len()], kv.meta.vstring);
        }
    }
}

// Bare keys carry no value: `vpos == -1`, empty `vstring`, decoded `Bool(true)`.
#[test]
fn boundary_bare_key_has_no_value() {
    let flow = parse_openflow("actions=drop").unwrap();
    let kv = &flow.actions_kv()[0];
    assert_eq!(kv.key, "drop");
    assert_eq!(kv.value, Value::Bool(true));
    assert!(!kv.meta.has_value());
    assert_eq!(kv.meta.vpos, -1);
    assert_eq!(kv.meta.vstring, "");
}

// `key()` with empty parens decodes to an empty Record, not absence.
#[test]
fn boundary_empty_parens_is_empty_record() {
    let flow = parse_datapath("eth() actions:drop").unwrap();
    assert_eq!(*match_value(&flow, "eth"), Value::Record(indexmap::IndexMap::new()));
}

// A missing `/mask` decodes to the field's all-ones mask.
#[test]
fn boundary_missing_mask_is_all_ones() {
    let flow = parse_openflow("eth_type=0x800 actions=drop").unwrap();
    assert_eq!(
        *match_value(&flow, "eth_type"),
        Value::Masked(crate::value::Masked {
            width: Width::W16,
            value: 0x800,
            mask: Width::W16.all_ones(),
        })
    );
}

// An unrecognised inner key at record scope falls back to heuristic
// inference rather than erroring, with the default lenient `Parser`.
#[test]
fn boundary_unknown_inner_key_uses_heuristic_inference() {
    let flow = parse_datapath("tunnel(tun_id=5,some_future_field=10.0.0.1) actions:drop").unwrap();
    let tunnel = record(match_value(&flow, "tunnel"));
    assert_eq!(
        tunnel["some_future_field"],
        Value::IpMask(crate::value::IpMask::host("10.0.0.1".parse().unwrap()))
    );
}

// `strict_keys` turns that same fallback into an error.
#[test]
fn strict_keys_rejects_unrecognised_inner_key() {
    let parser = crate::Parser {
        strict_keys: true,
        ..Default::default()
    };
    let err = parser
        .parse_datapath("tunnel(tun_id=5,some_future_field=10.0.0.1) actions:drop")
        .unwrap_err();
    assert!(matches!(err, crate::ParseError::UnknownKey { .. }));
}

// `strict_sections` rejects a line with no `actions=`/`actions:` section.
#[test]
fn strict_sections_rejects_missing_actions() {
    let parser = crate::Parser {
        strict_sections: true,
        ..Default::default()
    };
    assert!(parser.parse_openflow("priority=10,in_port=3").is_err());
    assert!(parser.parse_openflow("priority=10,in_port=3 actions=drop").is_ok());
}

// A masked value's hex digits are case-insensitive on both sides of `/`.
#[test]
fn boundary_masked_hex_is_case_insensitive() {
    let flow = parse_openflow("eth_type=0X800/0XFFF actions=drop").unwrap();
    assert_eq!(
        *match_value(&flow, "eth_type"),
        Value::Masked(crate::value::Masked {
            width: Width::W16,
            value: 0x800,
            mask: 0xfff,
        })
    );
}

// Re-parsing the same line twice produces identical flows (determinism).
#[test]
fn invariant_parse_is_deterministic() {
    let line = "priority=10,ip,nw_src=10.0.0.0/8 actions=output:1";
    assert_eq!(parse_openflow(line).unwrap(), parse_openflow(line).unwrap());
}

// A decoder rejecting its substring bubbles all the way up with no
// partial Flow returned.
#[test]
fn error_invalid_value_bubbles_up() {
    let err = parse_openflow("eth_type=0x800/0x10000 actions=drop").unwrap_err();
    assert!(matches!(err, crate::ParseError::InvalidValue { .. }));
}

// Invariant 5: a Range's start must not exceed its end.
#[test]
fn invariant_range_start_must_not_exceed_end() {
    let err = parse_datapath("actions:ct(nat(src=10.0.0.1:600-100))").unwrap_err();
    assert!(matches!(err, crate::ParseError::InvalidValue { .. }));
}

#[cfg(feature = "serde")]
#[test]
fn value_integer_serializes_as_newtype_variant() {
    let v = Value::Integer(42);
    assert_ser_tokens(
        &v,
        &[Token::NewtypeVariant {
            name: "Value",
            variant: "Integer",
        }, Token::U64(42)],
    );
}

#[cfg(feature = "serde")]
#[test]
fn value_bool_serializes_as_newtype_variant() {
    let v = Value::Bool(true);
    assert_ser_tokens(
        &v,
        &[Token::NewtypeVariant {
            name: "Value",
            variant: "Bool",
        }, Token::Bool(true)],
    );
}
