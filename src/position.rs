/// Offset/text metadata captured for a single [`crate::KeyValue`] (§3).
///
/// `kpos`/`vpos` are offsets relative to the *owning section's* string,
/// not the raw input line — §8's invariant tests slice
/// `section.string[kpos..]`, not `input[kpos..]`. `vpos == -1` and an
/// empty `vstring` mark a bare flag key with no value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Position<'a> {
    pub kpos: usize,
    pub kstring: &'a str,
    pub vpos: isize,
    pub vstring: &'a str,
}

impl<'a> Position<'a> {
    pub(crate) fn no_value(kpos: usize, kstring: &'a str) -> Self {
        Position {
            kpos,
            kstring,
            vpos: -1,
            vstring: "",
        }
    }

    pub(crate) fn with_value(kpos: usize, kstring: &'a str, vpos: usize, vstring: &'a str) -> Self {
        Position {
            kpos,
            kstring,
            vpos: vpos as isize,
            vstring,
        }
    }

    /// `true` when this position describes a bare-flag key (§3: `vpos = -1`).
    pub fn has_value(&self) -> bool {
        self.vpos >= 0
    }
}
