use indexmap::IndexMap;

use crate::KeyValue;

/// A named top-level slice of a flow line (§3): `info`, `match`,
/// `actions`, `stats`, plus grammar-specific sections such as datapath's
/// `ufid`. `pos`/`string` are absolute — relative to the whole input line
/// — unlike a [`KeyValue`]'s `kpos`/`vpos`, which are relative to this
/// section's own `string` (invariant 3 vs. invariants 1–2).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Section<'a> {
    pub pos: usize,
    pub string: &'a str,
    pub kvs: Vec<KeyValue<'a>>,
}

impl<'a> Section<'a> {
    pub(crate) fn new(pos: usize, string: &'a str) -> Self {
        Section {
            pos,
            string,
            kvs: Vec::new(),
        }
    }
}

/// The result of parsing a single OVS flow line (§6): an ordered mapping
/// from section name to [`Section`]. Produced once from a single input
/// string and immutable thereafter (§3, Lifecycle) — every `&str` in the
/// tree borrows from the original input, never a copy of it.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Flow<'a> {
    pub sections: IndexMap<String, Section<'a>>,
}

impl<'a> Flow<'a> {
    pub(crate) fn new() -> Self {
        Flow {
            sections: IndexMap::new(),
        }
    }

    /// The section named `name`, if the flow line contained one.
    pub fn section(&self, name: &str) -> Option<&Section<'a>> {
        self.sections.get(name)
    }

    /// Key/value pairs of the `match` section, or an empty slice if absent.
    pub fn match_kv(&self) -> &[KeyValue<'a>] {
        self.section("match").map_or(&[], |s| s.kvs.as_slice())
    }

    /// Key/value pairs of the `actions` section, or an empty slice if absent.
    pub fn actions_kv(&self) -> &[KeyValue<'a>] {
        self.section("actions").map_or(&[], |s| s.kvs.as_slice())
    }
}
