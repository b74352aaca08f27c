//! Field layouts of the four dump responses and the generic line decoder.
//!
//! A layout is an immutable table of field names and how each field is
//! interpreted. [`decode_fields`] applies a layout to one line's tokens;
//! the record types then pick the fields they need by name.

use super::RecordKind;
use super::records::UNKNOWN;

/// How a positional field is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Kept verbatim.
    Text,
    /// Base-10 integer.
    Dec,
    /// Base-16 integer.
    Hex,
    /// Occupies a position but is not kept (the literal `port` tincd prints
    /// between an address and its port).
    Skip,
}

/// One positional field of a layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub kind: FieldKind,
}

const fn text(name: &'static str) -> Field {
    Field {
        name,
        kind: FieldKind::Text,
    }
}

const fn dec(name: &'static str) -> Field {
    Field {
        name,
        kind: FieldKind::Dec,
    }
}

const fn hex(name: &'static str) -> Field {
    Field {
        name,
        kind: FieldKind::Hex,
    }
}

const fn skip(name: &'static str) -> Field {
    Field {
        name,
        kind: FieldKind::Skip,
    }
}

/// Ordered fields of one dump response, after the two leading tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub kind: RecordKind,
    pub fields: &'static [Field],
}

impl Layout {
    fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

pub const SUBNETS: Layout = Layout {
    kind: RecordKind::Subnets,
    fields: &[text("subnet"), text("node")],
};

pub const EDGES: Layout = Layout {
    kind: RecordKind::Edges,
    fields: &[
        text("from"),
        text("to"),
        text("host"),
        skip("_port_marker"),
        dec("port"),
        text("local_host"),
        skip("_local_port_marker"),
        dec("local_port"),
        hex("options"),
        dec("weight"),
        dec("avg_rtt"),
    ],
};

pub const CONNECTIONS: Layout = Layout {
    kind: RecordKind::Connections,
    fields: &[
        text("node"),
        text("host"),
        skip("_port_marker"),
        dec("port"),
        hex("options"),
        text("socket"),
        hex("status"),
    ],
};

pub const NODES: Layout = Layout {
    kind: RecordKind::Nodes,
    fields: &[
        text("node"),
        text("id"),
        text("host"),
        skip("_port_marker"),
        dec("port"),
        hex("cipher"),
        hex("digest"),
        hex("maclength"),
        hex("compression"),
        hex("options"),
        hex("status"),
        text("nexthop"),
        text("via"),
        dec("distance"),
        dec("pmtu"),
        dec("minmtu"),
        dec("maxmtu"),
        dec("last_state_change"),
    ],
};

/// A decoded field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Value<'a> {
    Text(&'a str),
    Number(i64),
}

/// One line mapped onto a layout.
///
/// Fields past the end of a short line are absent; tokens past the end of
/// the layout are ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fields<'a> {
    layout: &'static Layout,
    key: &'a str,
    values: Vec<Option<Value<'a>>>,
}

impl<'a> Fields<'a> {
    /// The first field, which names the record.
    pub fn key(&self) -> &'a str {
        self.key
    }

    /// How many layout positions the line filled.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// A text field, if present.
    pub fn text(&self, name: &str) -> Option<&'a str> {
        match self.get(name)? {
            Value::Text(text) => Some(text),
            Value::Number(_) => None,
        }
    }

    /// A numeric field, if present. Unparsable values are [`UNKNOWN`].
    pub fn number(&self, name: &str) -> Option<i64> {
        match self.get(name)? {
            Value::Number(n) => Some(n),
            Value::Text(_) => None,
        }
    }

    fn get(&self, name: &str) -> Option<Value<'a>> {
        let pos = self.layout.position(name)?;
        self.values.get(pos).copied().flatten()
    }
}

/// Tokens of a dump line after the two leading ones, or `None` when
/// nothing is left (blank lines and end-of-dump markers).
pub fn payload(line: &str) -> Option<Vec<&str>> {
    let tokens: Vec<&str> = line.split_whitespace().skip(2).collect();
    (!tokens.is_empty()).then_some(tokens)
}

/// Map `tokens` positionally onto `layout`. Returns `None` for no tokens.
pub fn decode_fields<'a>(tokens: &[&'a str], layout: &'static Layout) -> Option<Fields<'a>> {
    let key = *tokens.first()?;
    let values = layout
        .fields
        .iter()
        .zip(tokens.iter().copied())
        .map(|(field, token)| match field.kind {
            FieldKind::Text => Some(Value::Text(token)),
            FieldKind::Dec => Some(Value::Number(parse_number(token, 10))),
            FieldKind::Hex => Some(Value::Number(parse_number(token, 16))),
            FieldKind::Skip => None,
        })
        .collect();

    Some(Fields {
        layout,
        key,
        values,
    })
}

/// Parse `token` in `radix`, or [`UNKNOWN`] if it is not a number.
pub fn parse_number(token: &str, radix: u32) -> i64 {
    i64::from_str_radix(token, radix).unwrap_or(UNKNOWN)
}
