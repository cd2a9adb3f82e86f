use thiserror::Error;

/// Kind of failure raised while parsing a flow line.
///
/// See the module-level documentation of [`crate::parser`] for the
/// propagation rules: a decoder fails locally and the failure bubbles up
/// through `?` to the top of `parse_openflow`/`parse_datapath` — no
/// partial [`crate::Flow`] is ever returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Input ended mid-token: unbalanced parentheses or brackets.
    #[error("{key_path} at offset {offset}: truncated input ({reason})")]
    Truncated {
        offset: usize,
        key_path: String,
        reason: String,
    },
    /// A decoder rejected its substring (bad hex, bad IP, mask too wide, ...).
    #[error("{key_path} at offset {offset}: invalid value ({reason})")]
    InvalidValue {
        offset: usize,
        key_path: String,
        reason: String,
    },
    /// Stray separator, or a missing `=` where the schema required one.
    #[error("{key_path} at offset {offset}: invalid structure ({reason})")]
    InvalidStructure {
        offset: usize,
        key_path: String,
        reason: String,
    },
    /// No section header matched. Only raised when [`crate::Parser::strict_sections`] is set.
    #[error("at offset {offset}: unknown section ({reason})")]
    UnknownSection { offset: usize, reason: String },
    /// An unrecognised key was found at record scope. Only raised when
    /// [`crate::Parser::strict_keys`] is set; the lenient default instead
    /// falls back to heuristic type inference (§4.4, §9).
    #[error("{key_path} at offset {offset}: unknown key")]
    UnknownKey { offset: usize, key_path: String },
}

impl ParseError {
    pub(crate) fn invalid_value(offset: usize, key_path: impl Into<String>, reason: impl Into<String>) -> Self {
        ParseError::InvalidValue {
            offset,
            key_path: key_path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_structure(
        offset: usize,
        key_path: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        ParseError::InvalidStructure {
            offset,
            key_path: key_path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn truncated(offset: usize, key_path: impl Into<String>, reason: impl Into<String>) -> Self {
        ParseError::Truncated {
            offset,
            key_path: key_path.into(),
            reason: reason.into(),
        }
    }
}
