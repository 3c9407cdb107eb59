//! Bencode, the serialization format of `.torrent` files and tracker
//! responses.
//!
//! | Type | Format | Example |
//! |------|--------|---------|
//! | Integer | `i<number>e` | `i42e` |
//! | Byte string | `<length>:<bytes>` | `4:spam` |
//! | List | `l<values>e` | `l4:spami42ee` |
//! | Dictionary | `d<key><value>...e` | `d3:bar4:spam3:fooi42ee` |
//!
//! The decoder accepts dictionaries in any key order, the encoder always
//! writes them sorted by raw key bytes. Decoding a canonical buffer and
//! encoding the result reproduces the buffer byte for byte.

mod decode;
mod encode;
pub(crate) mod field;
mod value;

pub use self::decode::{decode, decode_at, dict_value_span, MAX_DEPTH};
pub use self::encode::{encode, encode_into};
pub use self::value::{Dictionary, Value};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Malformed};
    use bendy::encoding::ToBencode;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::collections::BTreeMap;

    fn malformed(data: &[u8]) -> Malformed {
        match decode(data) {
            Err(Error::MalformedBencode { reason, .. }) => reason,
            other => panic!("expected malformed error for {:?}, got {:?}", data, other),
        }
    }

    fn eof(data: &[u8]) -> bool {
        match decode(data) {
            Err(Error::UnexpectedEndOfInput { .. }) => true,
            _ => false,
        }
    }

    #[test]
    fn decode_integer() {
        assert_eq!(decode(b"i123e").unwrap(), Value::Integer(123));
        assert_eq!(decode(b"i-42e").unwrap(), Value::Integer(-42));
        assert_eq!(decode(b"i0e").unwrap(), Value::Integer(0));
        assert_eq!(
            decode(b"i-9223372036854775808e").unwrap(),
            Value::Integer(i64::min_value())
        );
        assert_eq!(encode(&decode(b"i123e").unwrap()), b"i123e");
    }

    #[test]
    fn decode_integer_invalid() {
        assert_eq!(malformed(b"i0123e"), Malformed::InvalidInteger);
        assert_eq!(malformed(b"i-0e"), Malformed::InvalidInteger);
        assert_eq!(malformed(b"i-01e"), Malformed::InvalidInteger);
        assert_eq!(malformed(b"ie"), Malformed::InvalidInteger);
        assert_eq!(malformed(b"i-e"), Malformed::InvalidInteger);
        assert_eq!(malformed(b"i12x4e"), Malformed::InvalidInteger);
        assert_eq!(
            malformed(b"i9223372036854775808e"),
            Malformed::InvalidInteger
        );
        assert!(eof(b"i12"));
    }

    #[test]
    fn decode_byte_string() {
        assert_eq!(decode(b"4:spam").unwrap(), Value::string("spam"));
        assert_eq!(decode(b"0:").unwrap(), Value::string(""));
        assert_eq!(
            decode(b"3:\xff\x00\x01").unwrap(),
            Value::bytes(b"\xff\x00\x01")
        );
    }

    #[test]
    fn decode_byte_string_invalid() {
        assert_eq!(malformed(b"4x:spam"), Malformed::InvalidLength);
        assert_eq!(malformed(b"04:spam"), Malformed::InvalidLength);
        assert_eq!(
            malformed(b"99999999999999999999999:a"),
            Malformed::InvalidLength
        );
        assert!(eof(b"10:spam"));
        assert!(eof(b"4"));
    }

    #[test]
    fn decode_dictionary() {
        let data = b"d3:bar4:spam3:fooi42ee";
        let value = decode(data).unwrap();
        assert_eq!(value.get("bar"), Some(&Value::string("spam")));
        assert_eq!(value.get("foo"), Some(&Value::Integer(42)));
        assert_eq!(value.as_dict().unwrap().len(), 2);
        assert_eq!(encode(&value), &data[..]);
    }

    #[test]
    fn decode_list() {
        let value = decode(b"l4:spami42ee").unwrap();
        assert_eq!(
            value.as_list().unwrap(),
            &[Value::string("spam"), Value::Integer(42)][..]
        );
        assert_eq!(decode(b"le").unwrap(), Value::List(vec![]));
        assert!(eof(b"l4:spam"));
    }

    #[test]
    fn rejects_non_string_keys() {
        assert_eq!(malformed(b"di1e3:fooe"), Malformed::NonStringKey);
        assert_eq!(malformed(b"dl1:ae3:fooe"), Malformed::NonStringKey);
        assert_eq!(malformed(b"d3:fooe3:bare"), Malformed::UnknownTag(b'e'));
    }

    #[test]
    fn rejects_bad_tags_and_trailing_data() {
        assert_eq!(malformed(b"e"), Malformed::UnknownTag(b'e'));
        assert_eq!(malformed(b"x"), Malformed::UnknownTag(b'x'));
        assert_eq!(malformed(b"i1ei2e"), Malformed::TrailingData);
        assert!(eof(b""));
    }

    #[test]
    fn rejects_deep_nesting() {
        let mut data = vec![b'l'; MAX_DEPTH + 2];
        data.extend(vec![b'e'; MAX_DEPTH + 2]);
        assert_eq!(malformed(&data), Malformed::NestingTooDeep);

        let mut data = vec![b'l'; MAX_DEPTH];
        data.extend(vec![b'e'; MAX_DEPTH]);
        assert!(decode(&data).is_ok());
    }

    #[test]
    fn decode_at_reports_next_position() {
        let data = b"i1e4:spamle";
        let (first, pos) = decode_at(data, 0).unwrap();
        assert_eq!((first, pos), (Value::Integer(1), 3));
        let (second, pos) = decode_at(data, pos).unwrap();
        assert_eq!((second, pos), (Value::string("spam"), 9));
        let (third, pos) = decode_at(data, pos).unwrap();
        assert_eq!((third, pos), (Value::List(vec![]), data.len()));
    }

    #[test]
    fn unsorted_input_is_sorted_on_encode() {
        let value = decode(b"d3:fooi1e3:bari2ee").unwrap();
        assert_eq!(encode(&value), b"d3:bari2e3:fooi1ee");

        let foo_first = Value::dict().with("foo", 1i64).with("bar", 2i64);
        let bar_first = Value::dict().with("bar", 2i64).with("foo", 1i64);
        assert_eq!(encode(&foo_first), encode(&bar_first));
        assert_eq!(encode(&foo_first), b"d3:bari2e3:fooi1ee");
    }

    #[test]
    fn keys_sort_by_raw_bytes() {
        // "Z" < "a" < "\xc3\xa5" (å) bytewise
        let value = Value::dict()
            .with("\u{e5}", 3i64)
            .with("a", 2i64)
            .with("Z", 1i64);
        assert_eq!(encode(&value), b"d1:Zi1e1:ai2e2:\xc3\xa5i3ee");
    }

    #[test]
    fn duplicate_keys_last_wins() {
        let value = decode(b"d1:ai1e1:ai2ee").unwrap();
        assert_eq!(value.get("a"), Some(&Value::Integer(2)));
    }

    #[test]
    fn locate_dict_value_span() {
        let data = b"d8:announce3:url4:infod4:name1:xe5:otheri1ee";
        let span = dict_value_span(data, b"info").unwrap().unwrap();
        assert_eq!(&data[span], b"d4:name1:xe");
        assert_eq!(dict_value_span(data, b"missing").unwrap(), None);
        assert!(dict_value_span(b"i1e", b"info").is_err());
    }

    #[test]
    fn agrees_with_bendy() {
        let mut map = BTreeMap::new();
        map.insert("zeta".to_owned(), vec![1i64, -2, 300]);
        map.insert("alpha".to_owned(), vec![]);
        map.insert("mid".to_owned(), vec![0]);
        let expected = map.to_bencode().unwrap();

        let ours = Value::dict()
            .with(
                "zeta",
                vec![Value::Integer(1), Value::Integer(-2), Value::Integer(300)],
            )
            .with("mid", vec![Value::Integer(0)])
            .with("alpha", Vec::<Value>::new());
        assert_eq!(encode(&ours), expected);
        assert_eq!(encode(&decode(&expected).unwrap()), expected);
    }

    fn random_value(rng: &mut StdRng, depth: usize) -> Value {
        let kind = if depth > 3 { rng.gen_range(0, 2) } else { rng.gen_range(0, 4) };
        match kind {
            0 => Value::Integer(rng.gen()),
            1 => {
                let len = rng.gen_range(0, 24);
                Value::from((0..len).map(|_| rng.gen::<u8>()).collect::<Vec<u8>>())
            }
            2 => Value::List(
                (0..rng.gen_range(0, 5))
                    .map(|_| random_value(rng, depth + 1))
                    .collect(),
            ),
            _ => {
                let mut dict = Value::dict();
                for _ in 0..rng.gen_range(0, 5) {
                    let key: Vec<u8> = (0..rng.gen_range(0, 6)).map(|_| rng.gen()).collect();
                    dict.insert(key, random_value(rng, depth + 1));
                }
                dict
            }
        }
    }

    #[test]
    fn random_trees_survive_a_round_trip() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        for _ in 0..200 {
            let value = random_value(&mut rng, 0);
            let encoded = encode(&value);
            let decoded = decode(&encoded).unwrap();
            assert_eq!(decoded, value);
            assert_eq!(encode(&decoded), encoded);
        }
    }
}
