//! Flow-line assembler (§4.5): splits a whole flow line into named
//! sections (`info`, `stats`, `match`, `actions`) before any section's
//! contents are decoded.
//!
//! Both dialects interleave info/stats fields with match fields in the
//! header portion of the line (OpenFlow: info/stats first, then match;
//! datapath: match first, then stats) — rather than hard-coding either
//! order, every header token is classified by key membership in a
//! per-dialect info/stats key set, with anything else falling to `match`.
//! `actions` always starts at the first top-level `actions=`/`actions:`
//! token and runs to the end of the line.

use crate::error::ParseError;
use crate::flow::{Flow, Section};
use crate::grammar::openflow;
use crate::nested::{self, Ctx};
use crate::schema::Schema;
use crate::tokenizer::{self, Shape};

fn push_section<'a>(flow: &mut Flow<'a>, name: &str, pos: usize, string: &'a str) {
    flow.sections.insert(name.to_string(), Section::new(pos, string));
}

/// Decodes `line` into a [`Flow`]. `match_schema`/`actions_schema` select
/// the dialect; `info_keys`/`stats_keys` classify header tokens that
/// aren't `actions`. `bare_port_reserved`, when `Some`, turns on
/// `openflow::bare_action_kv`'s bare-token reinterpretation (`output`
/// shorthand, the `controller` alias, the reserved-flag list) for this
/// line's actions section; datapath passes `None` and keeps every bare
/// action token a plain flag.
pub(crate) fn assemble<'a>(
    line: &'a str,
    match_schema: Schema,
    actions_schema: Schema,
    info_keys: &[&str],
    stats_keys: &[&str],
    bare_port_reserved: Option<&[&str]>,
    ctx: &Ctx,
) -> Result<Flow<'a>, ParseError> {
    let raws = tokenizer::tokenize(line).map_err(|e| tokenize_err(e))?;

    let mut header_end = line.len();
    let mut actions: Option<(usize, usize)> = None; // (pos, prefix_end)
    let mut header_raws = Vec::new();
    for raw in raws {
        if raw.key == "actions" && matches!(raw.shape, Shape::Eq | Shape::Colon) {
            if let Some((_, vstart)) = raw.value {
                header_end = raw.kpos;
                actions = Some((vstart, vstart));
                break;
            }
        }
        header_raws.push(raw);
    }

    let header_text = line[..header_end].trim_end_matches([',', ' ']);

    let mut flow = Flow::new();
    push_section(&mut flow, "info", 0, header_text);
    push_section(&mut flow, "stats", 0, header_text);
    push_section(&mut flow, "match", 0, header_text);

    for raw in header_raws {
        let bucket = if info_keys.contains(&raw.key) {
            "info"
        } else if stats_keys.contains(&raw.key) {
            "stats"
        } else {
            "match"
        };
        let entry = if bucket == "match" {
            crate::schema::lookup(match_schema, raw.key)
        } else {
            None
        };
        let value = nested::decode_raw(&raw, entry.map(|e| e.form), raw.key, 0, 1, ctx)?;
        let kv = crate::kv::KeyValue::new(
            raw.key,
            value,
            match raw.value {
                Some((vtext, vpos)) => crate::position::Position::with_value(raw.kpos, raw.key, vpos, vtext),
                None => crate::position::Position::no_value(raw.kpos, raw.key),
            },
        );
        flow.sections.get_mut(bucket).expect("section inserted above").kvs.push(kv);
    }

    if let Some((pos, _)) = actions {
        let actions_text = &line[pos..];
        push_section(&mut flow, "actions", pos, actions_text);
        for raw in tokenizer::tokenize(actions_text).map_err(|e| tokenize_err(e))? {
            let is_openflow_bare = matches!(raw.shape, Shape::Bare) && bare_port_reserved.is_some();
            let (key, value) = if is_openflow_bare {
                openflow::bare_action_kv(raw.key)
            } else {
                let entry = crate::schema::lookup(actions_schema, raw.key);
                (raw.key, nested::decode_raw(&raw, entry.map(|e| e.form), raw.key, pos, 1, ctx)?)
            };
            let kv = crate::kv::KeyValue::new(
                key,
                value,
                match raw.value {
                    Some((vtext, vpos)) => crate::position::Position::with_value(raw.kpos, raw.key, vpos, vtext),
                    None => crate::position::Position::no_value(raw.kpos, raw.key),
                },
            );
            flow.sections.get_mut("actions").expect("just inserted").kvs.push(kv);
        }
    }

    Ok(flow)
}

fn tokenize_err(e: tokenizer::TokenizeError) -> ParseError {
    match e {
        tokenizer::TokenizeError::Truncated { offset, reason } => ParseError::truncated(offset, "", reason),
        tokenizer::TokenizeError::InvalidStructure { offset, reason } => {
            ParseError::invalid_structure(offset, "", reason)
        }
    }
}
