use std::convert::TryInto;
use std::net::IpAddr;

use crate::bencode::field::{
    expect_bytes, expect_dict, expect_int, expect_list, expect_str, expect_u64, required,
};
use crate::bencode::{self, Value};
use crate::error::{Error, Result};
use crate::tracker::peer::{Peer, COMPACT_PEER_LEN};

/// A decoded tracker announce response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnnounceResponse {
    Success {
        /// Number of seconds the downloader should wait between regular
        /// rerequests.
        interval: u64,
        /// Re-announcing more often than this is not allowed.
        min_interval: Option<u64>,
        /// To be sent back on following announces.
        tracker_id: Option<String>,
        /// number of seeders
        complete: Option<u64>,
        /// number of leechers
        incomplete: Option<u64>,
        warning: Option<String>,
        /// The known peers for torrent.
        peers: Vec<Peer>,
    },
    Failure {
        /// Why the query failed.
        reason: String,
    },
}

impl AnnounceResponse {
    /// Decodes a response body.
    pub fn from_bytes(body: &[u8]) -> Result<Self> {
        Self::from_value(&bencode::decode(body)?)
    }

    pub fn from_value(value: &Value) -> Result<Self> {
        let dict = expect_dict(value, "response")?;

        if let Some(reason) = dict.get(&b"failure reason"[..]) {
            let reason = String::from_utf8_lossy(expect_bytes(reason, "failure reason")?);
            if !reason.is_empty() {
                return Ok(AnnounceResponse::Failure {
                    reason: reason.into_owned(),
                });
            }
        }

        let interval = expect_u64(required(dict, "interval")?, "interval")?;
        let peers = parse_peers(required(dict, "peers")?)?;

        let optional_u64 = |key: &str| -> Result<Option<u64>> {
            dict.get(key.as_bytes())
                .map(|value| expect_u64(value, key))
                .transpose()
        };
        let optional_str = |key: &str| -> Result<Option<String>> {
            dict.get(key.as_bytes())
                .map(|value| expect_str(value, key).map(str::to_owned))
                .transpose()
        };

        Ok(AnnounceResponse::Success {
            interval,
            min_interval: optional_u64("min interval")?,
            tracker_id: optional_str("tracker id")?,
            complete: optional_u64("complete")?,
            incomplete: optional_u64("incomplete")?,
            warning: optional_str("warning message")?,
            peers,
        })
    }
}

/// Decodes the `peers` value in either wire model, a list of dictionaries or
/// the compact byte string.
pub fn parse_peers(value: &Value) -> Result<Vec<Peer>> {
    match value {
        Value::ByteString(compact) => parse_compact_peers(compact),
        Value::List(_) => parse_peer_dicts(value),
        other => Err(Error::malformed_peers(format!(
            "expected list or byte string, got {}",
            other.type_name()
        ))),
    }
}

/// Splits the compact model into 6 byte records of big endian ip and port.
pub fn parse_compact_peers(compact: &[u8]) -> Result<Vec<Peer>> {
    if compact.len() % COMPACT_PEER_LEN != 0 {
        return Err(Error::malformed_peers(format!(
            "compact list of {} bytes is not a multiple of {}",
            compact.len(),
            COMPACT_PEER_LEN
        )));
    }
    compact
        .chunks_exact(COMPACT_PEER_LEN)
        .enumerate()
        .map(|(i, record)| {
            let record: &[u8; COMPACT_PEER_LEN] = record
                .try_into()
                .map_err(|_| Error::malformed_peers("truncated record"))?;
            Peer::from_compact(record)
                .map_err(|err| Error::malformed_peers(format!("peers[{}]: {}", i, err)))
        })
        .collect()
}

fn parse_peer_dicts(value: &Value) -> Result<Vec<Peer>> {
    expect_list(value, "peers")?
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            parse_peer_dict(entry, &format!("peers[{}]", i))
                .map_err(|err| Error::malformed_peers(err.to_string()))
        })
        .collect()
}

// `peer id` is ignored
fn parse_peer_dict(entry: &Value, name: &str) -> Result<Peer> {
    let dict = expect_dict(entry, name)?;
    let ip_name = format!("{}.ip", name);
    let ip: IpAddr = expect_str(required(dict, "ip")?, &ip_name)?
        .parse()
        .map_err(|_| Error::invalid(ip_name, "not an ip address"))?;
    let port = expect_int(required(dict, "port")?, &format!("{}.port", name))?;
    Peer::new(ip, port)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn peer(ip: &str, port: i64) -> Value {
        Value::dict()
            .with("ip", ip)
            .with("port", port)
            .with("peer id", "-XX0000-000000000000")
    }

    #[test]
    fn compact_peers() {
        let peers = parse_compact_peers(&[65, 66, 67, 68, 0x20, 0x41]).unwrap();
        assert_eq!(
            peers,
            vec![Peer {
                ip: Ipv4Addr::new(65, 66, 67, 68).into(),
                port: 8257
            }]
        );
        assert_eq!(parse_compact_peers(&[]).unwrap(), vec![]);
    }

    #[test]
    fn compact_length_must_be_a_multiple_of_six() {
        match parse_compact_peers(&[65, 66, 67, 68, 0x20]) {
            Err(Error::TrackerMalformedPeerList { .. }) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn compact_port_zero_rejects_the_list() {
        let compact = [1u8, 2, 3, 4, 0x1a, 0xe1, 5, 6, 7, 8, 0, 0];
        match parse_compact_peers(&compact) {
            Err(Error::TrackerMalformedPeerList { reason }) => assert!(reason.contains("peers[1]")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn dictionary_peers() {
        let value = Value::List(vec![peer("10.0.0.1", 6881), peer("::1", 51413)]);
        let peers = parse_peers(&value).unwrap();
        assert_eq!(peers.len(), 2);
        assert_eq!(peers[0].to_string(), "10.0.0.1:6881");
        assert_eq!(peers[1].to_string(), "[::1]:51413");
    }

    #[test]
    fn bad_dictionary_peers() {
        for value in vec![
            Value::List(vec![peer("10.0.0.1", 0)]),
            Value::List(vec![peer("10.0.0.1", 65536)]),
            Value::List(vec![peer("not an ip", 1)]),
            Value::List(vec![Value::dict().with("ip", "10.0.0.1")]),
            Value::List(vec![Value::Integer(1)]),
            Value::Integer(1),
        ] {
            match parse_peers(&value) {
                Err(Error::TrackerMalformedPeerList { .. }) => {}
                other => panic!("unexpected {:?} for {:?}", other, value),
            }
        }
    }

    #[test]
    fn success_response() {
        let body = bencode::encode(
            &Value::dict()
                .with("interval", 1800i64)
                .with("min interval", 60i64)
                .with("tracker id", "abc")
                .with("complete", 5i64)
                .with("incomplete", 7i64)
                .with("warning message", "slow down")
                .with("peers", Value::bytes(&[127u8, 0, 0, 1, 0x1a, 0xe1][..])),
        );
        assert_eq!(
            AnnounceResponse::from_bytes(&body).unwrap(),
            AnnounceResponse::Success {
                interval: 1800,
                min_interval: Some(60),
                tracker_id: Some("abc".to_owned()),
                complete: Some(5),
                incomplete: Some(7),
                warning: Some("slow down".to_owned()),
                peers: vec![Peer {
                    ip: Ipv4Addr::LOCALHOST.into(),
                    port: 6881
                }],
            }
        );
    }

    #[test]
    fn failure_reason_wins() {
        let body = b"d14:failure reason9:not founde";
        assert_eq!(
            AnnounceResponse::from_bytes(&body[..]).unwrap(),
            AnnounceResponse::Failure {
                reason: "not found".to_owned()
            }
        );

        // an empty reason is a success
        let body = b"d14:failure reason0:8:intervali10e5:peers0:e";
        match AnnounceResponse::from_bytes(&body[..]).unwrap() {
            AnnounceResponse::Success {
                interval, peers, ..
            } => {
                assert_eq!(interval, 10);
                assert!(peers.is_empty());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn required_fields() {
        match AnnounceResponse::from_bytes(b"d5:peers0:e") {
            Err(Error::MissingField { name }) => assert_eq!(name, "interval"),
            other => panic!("unexpected {:?}", other),
        }
        match AnnounceResponse::from_bytes(b"d8:intervali10ee") {
            Err(Error::MissingField { name }) => assert_eq!(name, "peers"),
            other => panic!("unexpected {:?}", other),
        }
        match AnnounceResponse::from_bytes(b"le") {
            Err(Error::WrongFieldType { name, .. }) => assert_eq!(name, "response"),
            other => panic!("unexpected {:?}", other),
        }
        assert!(AnnounceResponse::from_bytes(b"d8:intervali-1e5:peers0:e").is_err());
    }
}
