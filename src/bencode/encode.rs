use crate::bencode::value::Value;

/// Encodes `value` in canonical form.
///
/// Dictionary keys are written in ascending raw byte order and integers in
/// their minimal decimal form, so equal values always produce equal bytes.
pub fn encode(value: &Value) -> Vec<u8> {
    let mut buf = Vec::new();
    encode_into(value, &mut buf);
    buf
}

/// Appends the canonical encoding of `value` to `buf`.
pub fn encode_into(value: &Value, buf: &mut Vec<u8>) {
    match value {
        Value::Integer(i) => {
            buf.push(b'i');
            buf.extend_from_slice(i.to_string().as_bytes());
            buf.push(b'e');
        }
        Value::ByteString(bytes) => encode_bytes(bytes, buf),
        Value::List(list) => {
            buf.push(b'l');
            for item in list {
                encode_into(item, buf);
            }
            buf.push(b'e');
        }
        Value::Dictionary(dict) => {
            buf.push(b'd');
            // `BTreeMap<Bytes, _>` iterates in ascending byte order
            for (key, val) in dict {
                encode_bytes(key, buf);
                encode_into(val, buf);
            }
            buf.push(b'e');
        }
    }
}

fn encode_bytes(bytes: &[u8], buf: &mut Vec<u8>) {
    buf.extend_from_slice(bytes.len().to_string().as_bytes());
    buf.push(b':');
    buf.extend_from_slice(bytes);
}
