//! Payload attribute walking.
//!
//! SPARTN payloads are self-describing only in combination with a per-message field
//! definition: the width of some fields and the number of repeats of some groups are
//! given by the values of fields decoded before them, e.g., a satellite bitmask
//! followed by one group of corrections per bit set.
//!
//! Definitions are declarative [Item] trees. No message dictionaries are built in; a
//! caller supplies the definition for the message identity it wants to decode.
//!
//! # Example
//! ```
//! use spartn::payload::{walk, Field, Item, Repeat, Value, Width};
//!
//! const SAT: &[Item] = &[Item::Field(Field::new("BIAS", Width::Fixed(4)))];
//! const DEF: &[Item] = &[
//!     Item::Field(Field::new("MASK", Width::Fixed(4))),
//!     Item::Group { repeat: Repeat::BitsSet("MASK"), items: SAT },
//! ];
//!
//! // mask 0b0101, bias 3, bias 9
//! let payload = walk(DEF, &[0x53, 0x90], false, "EXAMPLE").unwrap();
//! assert_eq!(payload.get("BIAS_02"), Some(&Value::Int(9)));
//! ```
use derive_more::From;

use crate::bits::{bits_bytes, bits_value, num_bits_set};
use crate::prelude::*;

/// Width of a single field in bits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Width {
    Fixed(usize),
    /// Width selected from `table` using the value of the earlier attribute `selector`.
    Lookup {
        selector: &'static str,
        table: &'static [usize],
    },
    /// Width is the value of an earlier attribute.
    Attribute(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Field {
    pub name: &'static str,
    pub width: Width,
    /// Value of one least significant bit, applied when scaling.
    pub resolution: Option<f64>,
}

impl Field {
    #[must_use]
    pub const fn new(name: &'static str, width: Width) -> Self {
        Field {
            name,
            width,
            resolution: None,
        }
    }

    #[must_use]
    pub const fn scaled(name: &'static str, width: Width, resolution: f64) -> Self {
        Field {
            name,
            width,
            resolution: Some(resolution),
        }
    }
}

/// Number of times a group occurs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Repeat {
    Fixed(usize),
    /// The value of an earlier attribute.
    Attribute(&'static str),
    /// The number of bits set in an earlier attribute.
    BitsSet(&'static str),
    /// Once if an earlier attribute equals the value, otherwise not at all.
    PresentIf(&'static str, u64),
    /// Once if an earlier attribute is one of the values, otherwise not at all.
    PresentIn(&'static str, &'static [u64]),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Item {
    Field(Field),
    Group {
        repeat: Repeat,
        items: &'static [Item],
    },
}

/// A payload definition for a single message identity.
pub type PayloadDefinition<'a> = &'a [Item];

/// Decoded attribute value.
#[derive(Debug, Clone, PartialEq, From)]
pub enum Value {
    Int(u64),
    /// Value with the field resolution applied.
    Scaled(f64),
    /// Fields wider than 64 bits, left aligned.
    Bits(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: &'static str,
    /// 1-based repeat index for each enclosing group, outermost first.
    pub indices: Vec<usize>,
    pub value: Value,
    raw: Option<u64>,
}

impl Attribute {
    /// Name qualified by group indices, e.g., `SF020_03` or `SF024_01_02`.
    #[must_use]
    pub fn key(&self) -> String {
        let mut key = self.name.to_string();
        for idx in &self.indices {
            key.push_str(&format!("_{idx:02}"));
        }
        key
    }

    /// The unscaled value, if the field fits in 64 bits.
    #[must_use]
    pub fn raw(&self) -> Option<u64> {
        self.raw
    }
}

/// Attributes decoded from a payload, in payload order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Payload {
    attributes: Vec<Attribute>,
    /// Number of payload bits consumed.
    pub bits: usize,
}

impl Payload {
    #[must_use]
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Value for an index-qualified key, see [Attribute::key].
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes
            .iter()
            .find(|a| a.key() == key)
            .map(|a| &a.value)
    }

    /// Find the attribute `name` visible from the group position `indices`, searching
    /// the innermost scope first.
    fn resolve(&self, name: &str, indices: &[usize]) -> Result<u64> {
        for depth in (0..=indices.len()).rev() {
            let scope = &indices[..depth];
            let found = self
                .attributes
                .iter()
                .rev()
                .find(|a| a.name == name && a.indices == scope);
            if let Some(attr) = found {
                return attr
                    .raw
                    .ok_or_else(|| Error::UndefinedAttribute(name.to_string()));
            }
        }
        Err(Error::UndefinedAttribute(name.to_string()))
    }
}

/// One level of group nesting in the walk.
struct Level<'d> {
    items: &'d [Item],
    next: usize,
    /// Current 1-based repeat, 0 for the top level.
    index: usize,
    count: usize,
}

fn width(field: &Field, payload: &Payload, indices: &[usize]) -> Result<usize> {
    match field.width {
        Width::Fixed(n) => Ok(n),
        Width::Lookup { selector, table } => {
            let value = payload.resolve(selector, indices)?;
            usize::try_from(value)
                .ok()
                .and_then(|i| table.get(i).copied())
                .ok_or(Error::LookupRange {
                    name: selector.to_string(),
                    value,
                })
        }
        Width::Attribute(name) => {
            let value = payload.resolve(name, indices)?;
            usize::try_from(value).map_err(|_| Error::LookupRange {
                name: name.to_string(),
                value,
            })
        }
    }
}

fn repeats(repeat: &Repeat, payload: &Payload, indices: &[usize]) -> Result<usize> {
    let count = match *repeat {
        Repeat::Fixed(n) => return Ok(n),
        Repeat::Attribute(name) => payload.resolve(name, indices)?,
        Repeat::BitsSet(name) => num_bits_set(payload.resolve(name, indices)?) as u64,
        Repeat::PresentIf(name, value) => u64::from(payload.resolve(name, indices)? == value),
        Repeat::PresentIn(name, values) => {
            u64::from(values.contains(&payload.resolve(name, indices)?))
        }
    };
    usize::try_from(count).map_err(|_| Error::LookupRange {
        name: format!("{repeat:?}"),
        value: count,
    })
}

/// Walk `dat` according to `definition`, producing its attributes.
///
/// `identity` is only used to describe errors.
///
/// # Errors
/// [Error::Attribute] wrapping the failure for the first attribute, or group
/// reference, that could not be decoded. Underlying errors are
/// [Error::NotEnoughData] if the payload ends early, [Error::UndefinedAttribute] if a
/// width or repeat references an attribute not yet decoded, and
/// [Error::LookupRange].
pub fn walk(
    definition: PayloadDefinition,
    dat: &[u8],
    scaling: bool,
    identity: &str,
) -> Result<Payload> {
    let attr_err = |name: String, err: Error| Error::Attribute {
        name,
        identity: identity.to_string(),
        source: Box::new(err),
    };

    let mut payload = Payload::default();
    let mut offset = 0usize;
    let mut stack = vec![Level {
        items: definition,
        next: 0,
        index: 0,
        count: 1,
    }];

    while let Some(level) = stack.last_mut() {
        if level.next == level.items.len() {
            if level.index > 0 && level.index < level.count {
                // next repeat of the same group
                level.index += 1;
                level.next = 0;
            } else {
                stack.pop();
            }
            continue;
        }
        let items = level.items;
        let item = &items[level.next];
        level.next += 1;
        let indices: Vec<usize> = stack[1..].iter().map(|l| l.index).collect();

        match item {
            Item::Field(field) => {
                let mut attr = Attribute {
                    name: field.name,
                    indices,
                    value: Value::Int(0),
                    raw: None,
                };
                let len = width(field, &payload, &attr.indices)
                    .map_err(|err| attr_err(attr.key(), err))?;
                // a width taken from a data value can be anything
                let minimum = offset
                    .checked_add(len)
                    .map_or(usize::MAX, |end| end.div_ceil(8));
                if minimum > dat.len() {
                    let err = Error::NotEnoughData {
                        actual: dat.len(),
                        minimum,
                    };
                    return Err(attr_err(attr.key(), err));
                }
                if len > 64 {
                    attr.value = bits_bytes(dat, offset, len).into();
                } else {
                    let raw = bits_value(dat, offset, len);
                    attr.raw = Some(raw);
                    #[allow(clippy::cast_precision_loss)]
                    let value = match (scaling, field.resolution) {
                        (true, Some(res)) => Value::Scaled(raw as f64 * res),
                        _ => raw.into(),
                    };
                    attr.value = value;
                }
                offset += len;
                payload.attributes.push(attr);
            }
            Item::Group {
                repeat,
                items: group,
            } => {
                let count = repeats(repeat, &payload, &indices)
                    .map_err(|err| attr_err(format!("{repeat:?}"), err))?;
                if count > 0 {
                    stack.push(Level {
                        items: group,
                        next: 0,
                        index: 1,
                        count,
                    });
                }
            }
        }
    }

    payload.bits = offset;
    Ok(payload)
}
