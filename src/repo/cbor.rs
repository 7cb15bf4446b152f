//! Canonical CBOR codec for commit values.
//!
//! The server and the client each encode the unsigned commit independently
//! and the bytes must agree exactly, so this codec admits one and only one
//! representation per logical value:
//!
//! - integer arguments use the shortest possible form;
//! - map keys are emitted shortest-first, then bytewise;
//! - content references are tag 42 wrapping a byte string of
//!   `0x00 ++ <binary cid>` (the identity-multibase prefix), which keeps them
//!   wire-distinguishable from free-form byte strings;
//! - "no previous commit" is an explicit null.
//!
//! The decoder rejects anything non-canonical rather than normalizing it.

use crate::error::EncodingError;
use cid::Cid;
use std::collections::BTreeMap;

const MAJOR_UINT: u8 = 0;
const MAJOR_NEGINT: u8 = 1;
const MAJOR_BYTES: u8 = 2;
const MAJOR_TEXT: u8 = 3;
const MAJOR_MAP: u8 = 5;
const MAJOR_TAG: u8 = 6;

const SIMPLE_NULL: u8 = 0xf6;
const TAG_CONTENT_REF: u64 = 42;

/// Multibase identity prefix carried inside tag-42 byte strings.
const RAW_REF_PREFIX: u8 = 0x00;

/// The value model the canonical codec operates on.
///
/// Maps are `BTreeMap`s so logical equality is independent of the order keys
/// were inserted in; the encoder re-sorts canonically on the way out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Null,
    Int(i64),
    Text(String),
    Ref(Cid),
    Map(BTreeMap<String, Value>),
}

impl Value {
    pub fn map<I: IntoIterator<Item = (String, Value)>>(entries: I) -> Self {
        Value::Map(entries.into_iter().collect())
    }
}

/// Parse a content reference from its canonical string form.
pub fn parse_ref(s: &str) -> Result<Cid, EncodingError> {
    Cid::try_from(s).map_err(|e| EncodingError::BadRef(format!("{s:?}: {e}")))
}

// ─── Encoding ────────────────────────────────────────────────────────────────

/// Deterministically encode a value. Identical logical input always yields
/// identical bytes.
pub fn encode(value: &Value) -> Vec<u8> {
    let mut out = Vec::with_capacity(128);
    encode_into(value, &mut out);
    out
}

fn encode_into(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Null => out.push(SIMPLE_NULL),
        Value::Int(n) => {
            if *n >= 0 {
                write_header(MAJOR_UINT, *n as u64, out);
            } else {
                write_header(MAJOR_NEGINT, -(n + 1) as u64, out);
            }
        }
        Value::Text(s) => {
            write_header(MAJOR_TEXT, s.len() as u64, out);
            out.extend_from_slice(s.as_bytes());
        }
        Value::Ref(cid) => {
            write_header(MAJOR_TAG, TAG_CONTENT_REF, out);
            let raw = cid.to_bytes();
            write_header(MAJOR_BYTES, (raw.len() + 1) as u64, out);
            out.push(RAW_REF_PREFIX);
            out.extend_from_slice(&raw);
        }
        Value::Map(entries) => {
            write_header(MAJOR_MAP, entries.len() as u64, out);
            let mut keys: Vec<&String> = entries.keys().collect();
            keys.sort_by(|a, b| canonical_key_order(a, b));
            for key in keys {
                write_header(MAJOR_TEXT, key.len() as u64, out);
                out.extend_from_slice(key.as_bytes());
                encode_into(&entries[key], out);
            }
        }
    }
}

/// Canonical map-key order: shortest key first, ties broken bytewise.
fn canonical_key_order(a: &str, b: &str) -> std::cmp::Ordering {
    a.len().cmp(&b.len()).then_with(|| a.as_bytes().cmp(b.as_bytes()))
}

fn write_header(major: u8, arg: u64, out: &mut Vec<u8>) {
    let major = major << 5;
    if arg < 24 {
        out.push(major | arg as u8);
    } else if arg <= u64::from(u8::MAX) {
        out.push(major | 24);
        out.push(arg as u8);
    } else if arg <= u64::from(u16::MAX) {
        out.push(major | 25);
        out.extend_from_slice(&(arg as u16).to_be_bytes());
    } else if arg <= u64::from(u32::MAX) {
        out.push(major | 26);
        out.extend_from_slice(&(arg as u32).to_be_bytes());
    } else {
        out.push(major | 27);
        out.extend_from_slice(&arg.to_be_bytes());
    }
}

// ─── Decoding ────────────────────────────────────────────────────────────────

/// Decode a single canonical value, rejecting trailing bytes and any
/// non-canonical form.
pub fn decode(bytes: &[u8]) -> Result<Value, EncodingError> {
    let mut dec = Decoder { buf: bytes, pos: 0 };
    let value = dec.value()?;
    if dec.pos != dec.buf.len() {
        return Err(EncodingError::Trailing);
    }
    Ok(value)
}

struct Decoder<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    fn value(&mut self) -> Result<Value, EncodingError> {
        let initial = self.byte()?;
        if initial == SIMPLE_NULL {
            return Ok(Value::Null);
        }
        let major = initial >> 5;
        let arg = self.argument(initial)?;
        match major {
            MAJOR_UINT => {
                let n = i64::try_from(arg)
                    .map_err(|_| self.err("integer out of range"))?;
                Ok(Value::Int(n))
            }
            MAJOR_NEGINT => {
                let n = i64::try_from(arg)
                    .map_err(|_| self.err("integer out of range"))?;
                Ok(Value::Int(-1 - n))
            }
            MAJOR_TEXT => self.text(arg).map(Value::Text),
            MAJOR_TAG => self.content_ref(arg).map(Value::Ref),
            MAJOR_MAP => self.map(arg),
            MAJOR_BYTES => Err(EncodingError::NonCanonical(
                "free-form byte string outside a content-reference tag".into(),
            )),
            _ => Err(self.err("unsupported major type")),
        }
    }

    fn content_ref(&mut self, tag: u64) -> Result<Cid, EncodingError> {
        if tag != TAG_CONTENT_REF {
            return Err(EncodingError::NonCanonical(format!(
                "unexpected tag {tag}"
            )));
        }
        let initial = self.byte()?;
        if initial >> 5 != MAJOR_BYTES {
            return Err(self.err("content-reference tag must wrap a byte string"));
        }
        let len = self.argument(initial)? as usize;
        let raw = self.take(len)?;
        let Some((&prefix, cid_bytes)) = raw.split_first() else {
            return Err(EncodingError::BadRef("empty content reference".into()));
        };
        if prefix != RAW_REF_PREFIX {
            return Err(EncodingError::BadRef(format!(
                "content reference prefix {prefix:#04x}, expected 0x00"
            )));
        }
        Cid::try_from(cid_bytes).map_err(|e| EncodingError::BadRef(e.to_string()))
    }

    fn map(&mut self, len: u64) -> Result<Value, EncodingError> {
        let mut entries = BTreeMap::new();
        let mut previous: Option<String> = None;
        for _ in 0..len {
            let initial = self.byte()?;
            if initial >> 5 != MAJOR_TEXT {
                return Err(self.err("map keys must be text"));
            }
            let klen = self.argument(initial)?;
            let key = self.text(klen)?;
            if let Some(prev) = &previous {
                if canonical_key_order(&key, prev) != std::cmp::Ordering::Greater {
                    return Err(EncodingError::NonCanonical(format!(
                        "map key {key:?} out of canonical order"
                    )));
                }
            }
            let value = self.value()?;
            previous = Some(key.clone());
            entries.insert(key, value);
        }
        Ok(Value::Map(entries))
    }

    fn text(&mut self, len: u64) -> Result<String, EncodingError> {
        let bytes = self.take(len as usize)?.to_vec();
        String::from_utf8(bytes).map_err(|_| self.err("invalid UTF-8 in text"))
    }

    /// Reads the argument for an initial byte, enforcing minimal-length form.
    fn argument(&mut self, initial: u8) -> Result<u64, EncodingError> {
        let info = initial & 0x1f;
        let arg = match info {
            0..=23 => u64::from(info),
            24 => u64::from(self.byte()?),
            25 => {
                let b = self.take(2)?;
                u64::from(u16::from_be_bytes([b[0], b[1]]))
            }
            26 => {
                let b = self.take(4)?;
                u64::from(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
            }
            27 => {
                let b = self.take(8)?;
                u64::from_be_bytes(b.try_into().expect("length checked"))
            }
            _ => return Err(self.err("indefinite or reserved length")),
        };
        // For immediates the minimal info is the argument itself.
        let minimal = match arg {
            0..=23 => arg as u8,
            24..=0xff => 24,
            0x100..=0xffff => 25,
            0x1_0000..=0xffff_ffff => 26,
            _ => 27,
        };
        if info != minimal {
            return Err(EncodingError::NonCanonical(format!(
                "argument {arg} not in shortest form"
            )));
        }
        Ok(arg)
    }

    fn byte(&mut self) -> Result<u8, EncodingError> {
        let b = *self.buf.get(self.pos).ok_or_else(|| self.err("unexpected end of input"))?;
        self.pos += 1;
        Ok(b)
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], EncodingError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&e| e <= self.buf.len())
            .ok_or_else(|| self.err("unexpected end of input"))?;
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn err(&self, message: &str) -> EncodingError {
        EncodingError::Decode {
            offset: self.pos,
            message: message.into(),
        }
    }
}
