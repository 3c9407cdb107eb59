use bytes::Bytes;
use std::collections::BTreeMap;
use std::fmt;

pub type Dictionary = BTreeMap<Bytes, Value>;

/// A decoded bencode value.
///
/// Dictionaries are kept in a `BTreeMap` keyed by the raw key bytes, so
/// iterating (and therefore encoding) always visits keys in ascending byte
/// order, whatever order they were inserted or decoded in.
#[derive(Clone, PartialEq, Eq)]
pub enum Value {
    Integer(i64),
    /// arbitrary bytes, not necessarily utf-8
    ByteString(Bytes),
    List(Vec<Value>),
    Dictionary(Dictionary),
}

impl Value {
    /// byte string from a utf-8 str
    pub fn string<T: AsRef<str>>(s: T) -> Self {
        Value::ByteString(Bytes::copy_from_slice(s.as_ref().as_bytes()))
    }

    pub fn bytes<T: AsRef<[u8]>>(b: T) -> Self {
        Value::ByteString(Bytes::copy_from_slice(b.as_ref()))
    }

    /// an empty dictionary, to be filled with [`Value::insert`]
    pub fn dict() -> Self {
        Value::Dictionary(Dictionary::new())
    }

    /// inserts into a dictionary, returns `false` if `self` is not one
    pub fn insert<K: AsRef<[u8]>, V: Into<Value>>(&mut self, key: K, value: V) -> bool {
        match self {
            Value::Dictionary(dict) => {
                dict.insert(Bytes::copy_from_slice(key.as_ref()), value.into());
                true
            }
            _ => false,
        }
    }

    /// builder flavoured [`Value::insert`]
    pub fn with<K: AsRef<[u8]>, V: Into<Value>>(mut self, key: K, value: V) -> Self {
        self.insert(key, value);
        self
    }

    #[inline]
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    #[inline]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::ByteString(b) => Some(&b[..]),
            _ => None,
        }
    }

    /// the byte string, if it is one and valid utf-8
    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        self.as_bytes().and_then(|b| std::str::from_utf8(b).ok())
    }

    #[inline]
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(l) => Some(&l[..]),
            _ => None,
        }
    }

    #[inline]
    pub fn as_dict(&self) -> Option<&Dictionary> {
        match self {
            Value::Dictionary(d) => Some(d),
            _ => None,
        }
    }

    /// dictionary lookup, `None` for missing keys and non dictionaries
    pub fn get<K: AsRef<[u8]>>(&self, key: K) -> Option<&Value> {
        self.as_dict().and_then(|d| d.get(key.as_ref()))
    }

    /// name of the variant, used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "integer",
            Value::ByteString(_) => "byte string",
            Value::List(_) => "list",
            Value::Dictionary(_) => "dictionary",
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Integer(i) => write!(f, "{}", i),
            Value::ByteString(b) => match std::str::from_utf8(b) {
                Ok(s) => write!(f, "{:?}", s),
                Err(_) => write!(f, "<{} bytes>", b.len()),
            },
            Value::List(l) => f.debug_list().entries(l.iter()).finish(),
            Value::Dictionary(d) => f
                .debug_map()
                .entries(d.iter().map(|(k, v)| (String::from_utf8_lossy(k), v)))
                .finish(),
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::ByteString(Bytes::from(s))
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::ByteString(Bytes::from(b))
    }
}

impl From<&[u8]> for Value {
    fn from(b: &[u8]) -> Self {
        Value::bytes(b)
    }
}

impl From<Bytes> for Value {
    fn from(b: Bytes) -> Self {
        Value::ByteString(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(l: Vec<Value>) -> Self {
        Value::List(l)
    }
}

impl From<Dictionary> for Value {
    fn from(d: Dictionary) -> Self {
        Value::Dictionary(d)
    }
}
