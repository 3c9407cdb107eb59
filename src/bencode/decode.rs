use bytes::Bytes;
use std::ops::Range;

use crate::bencode::value::{Dictionary, Value};
use crate::error::{Error, Malformed, Result};

/// Deepest nesting of lists and dictionaries accepted by the decoder.
pub const MAX_DEPTH: usize = 64;

/// Decodes exactly one value spanning the whole buffer.
pub fn decode(data: &[u8]) -> Result<Value> {
    let (value, end) = decode_at(data, 0)?;
    if end != data.len() {
        return Err(Error::MalformedBencode {
            position: end,
            reason: Malformed::TrailingData,
        });
    }
    Ok(value)
}

/// Decodes the value starting at `pos`, returns it together with the position
/// just past it.
pub fn decode_at(data: &[u8], pos: usize) -> Result<(Value, usize)> {
    let mut decoder = Decoder { data, pos };
    let value = decoder.next_value(0)?;
    Ok((value, decoder.pos))
}

/// Locates the raw bytes of `key`'s value in the top level dictionary of
/// `data`, without re-encoding anything.
///
/// Returns `Ok(None)` if the dictionary has no such key.
pub fn dict_value_span(data: &[u8], key: &[u8]) -> Result<Option<Range<usize>>> {
    let mut decoder = Decoder { data, pos: 0 };
    match decoder.peek()? {
        b'd' => decoder.pos += 1,
        _ => {
            let (value, _) = decode_at(data, 0)?;
            return Err(Error::WrongFieldType {
                name: "<root>".to_owned(),
                expected: "dictionary",
                got: value.type_name(),
            });
        }
    }

    let mut span = None;
    loop {
        if decoder.peek()? == b'e' {
            return Ok(span);
        }
        let name = decoder.next_key()?;
        let start = decoder.pos;
        decoder.next_value(1)?;
        // the last duplicate wins, same as `decode`
        if &name[..] == key {
            span = Some(start..decoder.pos);
        }
    }
}

struct Decoder<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    fn peek(&self) -> Result<u8> {
        self.data
            .get(self.pos)
            .copied()
            .ok_or(Error::UnexpectedEndOfInput { position: self.pos })
    }

    fn malformed(&self, reason: Malformed) -> Error {
        Error::MalformedBencode {
            position: self.pos,
            reason,
        }
    }

    fn next_value(&mut self, depth: usize) -> Result<Value> {
        if depth > MAX_DEPTH {
            return Err(self.malformed(Malformed::NestingTooDeep));
        }
        match self.peek()? {
            b'i' => self.next_integer().map(Value::Integer),
            b'0'..=b'9' => self.next_bytes().map(Value::ByteString),
            b'l' => self.next_list(depth),
            b'd' => self.next_dict(depth),
            tag => Err(self.malformed(Malformed::UnknownTag(tag))),
        }
    }

    /// consumes a run of ascii digits, returns their range
    fn digits(&mut self) -> Range<usize> {
        let start = self.pos;
        while self.pos < self.data.len() && self.data[self.pos].is_ascii_digit() {
            self.pos += 1;
        }
        start..self.pos
    }

    fn next_integer(&mut self) -> Result<i64> {
        let start = self.pos;
        self.pos += 1;
        if self.peek()? == b'-' {
            self.pos += 1;
        }
        let digits = self.digits();
        match self.peek()? {
            b'e' => {}
            _ => return Err(self.malformed(Malformed::InvalidInteger)),
        }

        let invalid = Error::MalformedBencode {
            position: start,
            reason: Malformed::InvalidInteger,
        };
        let negative = digits.start > start + 1;
        let raw = &self.data[digits.clone()];
        if raw.is_empty() || (raw[0] == b'0' && (raw.len() > 1 || negative)) {
            return Err(invalid);
        }

        // out of range values fail to parse
        let value = std::str::from_utf8(&self.data[start + 1..digits.end])
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .ok_or(invalid)?;
        self.pos += 1;
        Ok(value)
    }

    fn next_bytes(&mut self) -> Result<Bytes> {
        let start = self.pos;
        let digits = self.digits();
        match self.peek()? {
            b':' => {}
            _ => return Err(self.malformed(Malformed::InvalidLength)),
        }

        let invalid = Error::MalformedBencode {
            position: start,
            reason: Malformed::InvalidLength,
        };
        let raw = &self.data[digits];
        if raw.len() > 1 && raw[0] == b'0' {
            return Err(invalid);
        }
        let len = std::str::from_utf8(raw)
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .ok_or(invalid)?;

        self.pos += 1;
        let remaining = self.data.len() - self.pos;
        if len > remaining {
            return Err(Error::UnexpectedEndOfInput {
                position: self.data.len(),
            });
        }
        let bytes = Bytes::copy_from_slice(&self.data[self.pos..self.pos + len]);
        self.pos += len;
        Ok(bytes)
    }

    fn next_key(&mut self) -> Result<Bytes> {
        match self.peek()? {
            b'0'..=b'9' => self.next_bytes(),
            _ => Err(self.malformed(Malformed::NonStringKey)),
        }
    }

    fn next_list(&mut self, depth: usize) -> Result<Value> {
        self.pos += 1;
        let mut list = Vec::new();
        while self.peek()? != b'e' {
            list.push(self.next_value(depth + 1)?);
        }
        self.pos += 1;
        Ok(Value::List(list))
    }

    fn next_dict(&mut self, depth: usize) -> Result<Value> {
        self.pos += 1;
        let mut dict = Dictionary::new();
        while self.peek()? != b'e' {
            let key = self.next_key()?;
            let value = self.next_value(depth + 1)?;
            dict.insert(key, value);
        }
        self.pos += 1;
        Ok(Value::Dictionary(dict))
    }
}
