//! Schema / decoder registry (§4.4): table-driven field-name → decoder
//! dispatch. Schemas are `&'static` data built at compile time and passed
//! by reference, per §9's design note — no global mutable state, no
//! registration-order hazards, trivially `Send + Sync` across callers.

use crate::decoders::RangeElement;
use crate::value::Width;

/// The declared shape of a field's value (§4.4).
#[derive(Debug, Clone, Copy)]
pub enum ValueForm {
    Masked(Width),
    EthMask,
    IpMask,
    Integer,
    Enum,
    Flags,
    Range(RangeElement),
    List(&'static ValueForm),
    Record(Schema),
    BoolFlag,
    String,
    /// Routed to a dedicated sub-parser instead of the generic dispatch
    /// (§4.3's field-reference sub-grammar, NAT records, `bundle`'s
    /// positional grammar, ...). The name is purely documentation; the
    /// actual dispatch lives in `grammar::openflow`/`grammar::datapath`.
    Custom(&'static str),
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSchema {
    pub name: &'static str,
    pub form: ValueForm,
    /// Whether this key may appear more than once in the same section
    /// (actions repeat; match keys normally don't).
    pub repeatable: bool,
}

pub const fn field(name: &'static str, form: ValueForm, repeatable: bool) -> FieldSchema {
    FieldSchema { name, form, repeatable }
}

/// A table of field schemas, e.g. the inner schema of a record or a whole
/// section. Declarative data only — §4.6: "implementers add new OVS
/// versions by editing these tables, never by touching parser logic."
pub type Schema = &'static [FieldSchema];

/// Looks up `key` in `schema`. Unknown keys are not an error at this
/// layer (§4.4: "Unknown key at record scope: accepted ... no error") —
/// callers fall back to heuristic type inference.
pub fn lookup(schema: Schema, key: &str) -> Option<FieldSchema> {
    schema.iter().find(|f| f.name == key).copied()
}
