//! Top-level entry points (§6, §A.3): [`parse_openflow`]/[`parse_datapath`]
//! wrap a default-configured [`Parser`], mirroring the free `parse()`
//! function the upstream tool offers alongside its configurable struct.
//!
//! A decoder failure anywhere in the line bubbles straight up through `?`
//! — there is no partial [`Flow`] returned on error; either the whole
//! line decodes or nothing does.

use crate::assembler;
use crate::error::ParseError;
use crate::flow::Flow;
use crate::grammar::{datapath, openflow};
use crate::nested::Ctx;

const OPENFLOW_INFO_KEYS: &[&str] = &["cookie", "table", "duration"];
const OPENFLOW_STATS_KEYS: &[&str] = &[
    "n_packets",
    "n_bytes",
    "idle_age",
    "hard_age",
    "idle_timeout",
    "hard_timeout",
    "send_flow_rem",
    "priority",
];

const DATAPATH_INFO_KEYS: &[&str] = &[];
const DATAPATH_STATS_KEYS: &[&str] = &["packets", "bytes", "used", "flags"];

/// Parser configuration (§A.3): how strictly unfamiliar input is treated.
/// The lenient defaults match the upstream tool's own tolerance for
/// forward-compatible fields — OVS adds match/action keys across
/// releases, and a parser that rejects every key it doesn't recognise
/// breaks on the next release before this crate catches up.
#[derive(Debug, Clone, Copy)]
pub struct Parser {
    /// Reject a line with no recognisable `actions=`/`actions:` section
    /// instead of returning a `Flow` with only `info`/`stats`/`match`.
    pub strict_sections: bool,
    /// Reject a key with no schema entry instead of falling back to
    /// heuristic type inference (§4.4, §9).
    pub strict_keys: bool,
    /// Nested-record recursion limit, guarding against pathological input
    /// (`foo(foo(foo(...)))`) rather than any real OVS grammar depth.
    pub max_depth: usize,
}

impl Default for Parser {
    fn default() -> Self {
        Parser {
            strict_sections: false,
            strict_keys: false,
            max_depth: 16,
        }
    }
}

impl Parser {
    fn ctx(&self) -> Ctx {
        Ctx {
            max_depth: self.max_depth,
            strict_keys: self.strict_keys,
        }
    }

    /// Parses one `ovs-ofctl dump-flows` line.
    pub fn parse_openflow<'a>(&self, input: &'a str) -> Result<Flow<'a>, ParseError> {
        let flow = assembler::assemble(
            input,
            openflow::MATCH,
            openflow::ACTIONS,
            OPENFLOW_INFO_KEYS,
            OPENFLOW_STATS_KEYS,
            Some(openflow::RESERVED_BARE_ACTIONS),
            &self.ctx(),
        )?;
        if self.strict_sections && flow.section("actions").is_none() {
            return Err(ParseError::UnknownSection {
                offset: input.len(),
                reason: "no 'actions=' section found".to_string(),
            });
        }
        Ok(flow)
    }

    /// Parses one `ovs-dpctl`/`ovs-appctl dpctl/dump-flows` line.
    pub fn parse_datapath<'a>(&self, input: &'a str) -> Result<Flow<'a>, ParseError> {
        let flow = assembler::assemble(
            input,
            datapath::MATCH,
            datapath::ACTIONS,
            DATAPATH_INFO_KEYS,
            DATAPATH_STATS_KEYS,
            None,
            &self.ctx(),
        )?;
        if self.strict_sections && flow.section("actions").is_none() {
            return Err(ParseError::UnknownSection {
                offset: input.len(),
                reason: "no 'actions:' section found".to_string(),
            });
        }
        Ok(flow)
    }
}

/// Parses one `ovs-ofctl dump-flows` line with default [`Parser`] settings.
pub fn parse_openflow(input: &str) -> Result<Flow<'_>, ParseError> {
    Parser::default().parse_openflow(input)
}

/// Parses one `ovs-dpctl`/`ovs-appctl dpctl/dump-flows` line with default
/// [`Parser`] settings.
pub fn parse_datapath(input: &str) -> Result<Flow<'_>, ParseError> {
    Parser::default().parse_datapath(input)
}
