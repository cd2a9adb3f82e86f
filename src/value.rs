use std::fmt::{self, Display};
use std::net::IpAddr;

#[cfg(feature = "serde")]
use serde::Serialize;

use indexmap::IndexMap;

/// Bit width of a [`Masked`] value. OVS only ever emits these five widths
/// (§4.1); `W128` is the one case that needs more than a native machine
/// word (CT labels), and `u128` covers it without arbitrary-precision
/// arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum Width {
    W8 = 8,
    W16 = 16,
    W32 = 32,
    W64 = 64,
    W128 = 128,
}

impl Width {
    pub fn bits(self) -> u32 {
        self as u32
    }

    /// The all-ones mask for this width; the default when a `/mask` is absent.
    pub fn all_ones(self) -> u128 {
        if self.bits() == 128 {
            u128::MAX
        } else {
            (1u128 << self.bits()) - 1
        }
    }

    pub fn fits(self, n: u128) -> bool {
        n <= self.all_ones()
    }
}

/// A fixed-width masked bitfield: `value` or `value/mask` in the source
/// text (§3). `mask` is never zero and always fits in `width` bits;
/// `value` is *not* reduced against `mask` — OVS emits unreduced values
/// verbatim and this type preserves them (invariant 4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Masked {
    pub width: Width,
    pub value: u128,
    pub mask: u128,
}

impl Display for Masked {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.mask == self.width.all_ones() {
            write!(f, "{:#x}", self.value)
        } else {
            write!(f, "{:#x}/{:#x}", self.value, self.mask)
        }
    }
}

/// A 48-bit Ethernet address with an optional mask (§4.1). A missing mask
/// in the source text decodes to all-ones, not `None` — callers that care
/// whether a mask was written at all have only the captured `vstring` to
/// go by, which is exactly what the position metadata is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct EthMask {
    pub mac: [u8; 6],
    pub mask: [u8; 6],
}

impl EthMask {
    pub const ALL_ONES: [u8; 6] = [0xff; 6];
}

impl Display for EthMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn fmt_mac(f: &mut fmt::Formatter<'_>, mac: &[u8; 6]) -> fmt::Result {
            for (i, b) in mac.iter().enumerate() {
                if i > 0 {
                    write!(f, ":")?;
                }
                write!(f, "{b:02x}")?;
            }
            Ok(())
        }
        fmt_mac(f, &self.mac)?;
        if self.mask != Self::ALL_ONES {
            write!(f, "/")?;
            fmt_mac(f, &self.mask)?;
        }
        Ok(())
    }
}

/// How an [`IpMask`]'s mask was spelled in the source text: a CIDR prefix
/// length (`/24`) or an explicit mask address (`/255.255.255.0`). The
/// decoder (§4.1) tells the two apart by whether the token after `/`
/// contains a `.` or `:`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum IpMaskKind {
    Prefix(u8),
    Explicit(IpAddr),
}

/// An IPv4 or IPv6 address with an optional prefix length or mask (§3).
/// A missing mask decodes to the host mask (all-ones) for the address's
/// family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct IpMask {
    pub addr: IpAddr,
    pub mask: IpMaskKind,
}

impl IpMask {
    pub fn host(addr: IpAddr) -> Self {
        let bits = match addr {
            IpAddr::V4(_) => 32,
            IpAddr::V6(_) => 128,
        };
        IpMask {
            addr,
            mask: IpMaskKind::Prefix(bits),
        }
    }
}

impl Display for IpMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.addr)?;
        match self.mask {
            IpMaskKind::Prefix(p) if (self.addr.is_ipv4() && p == 32) || (self.addr.is_ipv6() && p == 128) => {
                Ok(())
            }
            IpMaskKind::Prefix(p) => write!(f, "/{p}"),
            IpMaskKind::Explicit(m) => write!(f, "/{m}"),
        }
    }
}

/// A parsed key/value's value (§3). The variant set is a direct
/// transliteration of the data model: callers pattern-match on it instead
/// of walking a weakly-typed mapping.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum Value<'a> {
    /// Plain decimal or `0x`-prefixed hexadecimal number.
    Integer(u64),
    /// Fixed-width bitfield, optionally masked.
    Masked(Masked),
    /// 48-bit MAC address, optionally masked.
    EthMask(EthMask),
    /// IPv4/IPv6 address, optionally masked or with a CIDR prefix.
    IpMask(IpMask),
    /// Bare address with no mask, used for range endpoints.
    IpAddress(IpAddr),
    /// `start-end`, both ends sharing the element's natural total order.
    Range(Box<Value<'a>>, Box<Value<'a>>),
    /// Verbatim `|`-joined union of flag names.
    Flags(&'a str),
    /// A recognised identifier whose accepted set is named by the schema
    /// but not enforced (future OVS versions add enums; §4.1).
    Enum(&'a str),
    /// An arbitrary identifier (port name, helper name, ...).
    String(&'a str),
    /// Presence of a bare flag key. Always `true`; the parser never
    /// produces `Bool(false)`.
    Bool(bool),
    /// Ordered, typically-homogeneous list.
    List(Vec<Value<'a>>),
    /// Nested parenthesised sub-record. Key order is preserved for
    /// round-tripping metadata even though the logical model is a map.
    Record(IndexMap<String, Value<'a>>),
}

/// A comparable projection of the [`Value`] variants the §4.3 Range
/// dispatch accepts as elements ("both sides parse as the same element
/// type"). Used to check invariant 5 (`start <= end`) at construction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum RangeKey {
    Integer(u64),
    Ip(IpAddr),
}

impl Value<'_> {
    pub(crate) fn range_key(&self) -> Option<RangeKey> {
        match self {
            Value::Integer(n) => Some(RangeKey::Integer(*n)),
            Value::IpAddress(a) => Some(RangeKey::Ip(*a)),
            _ => None,
        }
    }
}
