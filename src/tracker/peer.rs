use byteorder::{BigEndian, ByteOrder};
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::convert::{TryFrom, TryInto};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use crate::error::{Error, Result};

/// Length of a single peer in the compact peer list: 4 byte ip, 2 byte port.
pub const COMPACT_PEER_LEN: usize = 6;

/// Length of the peer id.
pub const PEER_ID_LEN: usize = 20;

/// A remote peer as reported by the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Peer {
    pub ip: IpAddr,
    pub port: u16,
}

impl Peer {
    /// Fails for port `0` and anything above `65535`.
    pub fn new<T: Into<IpAddr>>(ip: T, port: i64) -> Result<Self> {
        if port <= 0 || port > i64::from(u16::max_value()) {
            return Err(Error::InvalidPeer {
                reason: format!("port {} out of range", port),
            });
        }
        Ok(Self {
            ip: ip.into(),
            port: port as u16,
        })
    }

    /// Parses one record of the compact peer list, big endian ip and port.
    pub fn from_compact(record: &[u8; COMPACT_PEER_LEN]) -> Result<Self> {
        let ip = Ipv4Addr::new(record[0], record[1], record[2], record[3]);
        Self::new(ip, i64::from(BigEndian::read_u16(&record[4..])))
    }

    #[inline]
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.ip, self.port)
    }
}

impl fmt::Display for Peer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.socket_addr())
    }
}

/// The 20 byte id this client announces itself with.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct PeerId([u8; PEER_ID_LEN]);

impl PeerId {
    /// Client prefix of generated ids, Azureus style.
    pub const PREFIX: &'static [u8; 8] = b"-TC0001-";

    /// `-TC0001-` followed by 12 random alphanumerics
    pub fn random() -> Self {
        let mut id = [0u8; PEER_ID_LEN];
        id[..Self::PREFIX.len()].copy_from_slice(Self::PREFIX);
        let mut rng = rand::thread_rng();
        for byte in id[Self::PREFIX.len()..].iter_mut() {
            *byte = rng.sample(Alphanumeric) as u8;
        }
        PeerId(id)
    }
}

impl AsRef<[u8]> for PeerId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; PEER_ID_LEN]> for PeerId {
    fn from(id: [u8; PEER_ID_LEN]) -> Self {
        PeerId(id)
    }
}

impl TryFrom<&[u8]> for PeerId {
    type Error = ();

    fn try_from(value: &[u8]) -> std::result::Result<Self, Self::Error> {
        value.try_into().map(PeerId).map_err(|_| ())
    }
}

impl fmt::Debug for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "PeerId({})", String::from_utf8_lossy(&self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compact_record() {
        let peer = Peer::from_compact(&[65, 66, 67, 68, 0x20, 0x41]).unwrap();
        assert_eq!(peer.ip, IpAddr::V4(Ipv4Addr::new(65, 66, 67, 68)));
        assert_eq!(peer.port, (0x20 << 8) + 0x41);
        assert_eq!(peer.port, 8257);
        assert_eq!(peer.to_string(), "65.66.67.68:8257");
    }

    #[test]
    fn port_range() {
        let ip = Ipv4Addr::LOCALHOST;
        assert!(Peer::new(ip, 0).is_err());
        assert!(Peer::new(ip, -1).is_err());
        assert!(Peer::new(ip, 65_536).is_err());
        assert_eq!(Peer::new(ip, 65_535).unwrap().port, 65_535);
        assert_eq!(Peer::new(ip, 1).unwrap().port, 1);
        assert!(Peer::from_compact(&[1, 2, 3, 4, 0, 0]).is_err());
    }

    #[test]
    fn random_peer_id() {
        let id = PeerId::random();
        assert_eq!(&id.as_ref()[..8], &PeerId::PREFIX[..]);
        assert!(id.as_ref()[8..].iter().all(u8::is_ascii_alphanumeric));
        assert_ne!(PeerId::random(), id);
    }

    #[test]
    fn peer_id_from_slice() {
        assert!(PeerId::try_from(&[b'A'; 20][..]).is_ok());
        assert!(PeerId::try_from(&[b'A'; 19][..]).is_err());
    }
}
