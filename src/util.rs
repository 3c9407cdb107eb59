use sha1::Sha1;
use std::convert::{TryFrom, TryInto};
use std::fmt;

/// Length of a SHA-1 hash.
pub const SHA_HASH_LEN: usize = 20;

/// SHA-1 hash wrapper type for performing operations on the hash.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShaHash {
    hash: [u8; SHA_HASH_LEN],
}

/// The 20 byte SHA-1 hash of the bencoded `info` dictionary, the stable key of
/// a torrent.
pub type InfoHash = ShaHash;

impl ShaHash {
    /// Create a ShaHash by hashing the given bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            hash: Sha1::from(bytes).digest().bytes(),
        }
    }

    #[inline]
    pub fn len() -> usize {
        SHA_HASH_LEN
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8; SHA_HASH_LEN] {
        &self.hash
    }
}

impl AsRef<[u8]> for ShaHash {
    fn as_ref(&self) -> &[u8] {
        &self.hash
    }
}

impl Into<[u8; SHA_HASH_LEN]> for ShaHash {
    fn into(self) -> [u8; SHA_HASH_LEN] {
        self.hash
    }
}

impl From<[u8; SHA_HASH_LEN]> for ShaHash {
    fn from(sha_hash: [u8; SHA_HASH_LEN]) -> ShaHash {
        ShaHash { hash: sha_hash }
    }
}

impl TryFrom<&[u8]> for ShaHash {
    type Error = ();

    /// only exact 20 byte slices are accepted
    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        let hash: [u8; SHA_HASH_LEN] = value.try_into().map_err(|_| ())?;
        Ok(Self { hash })
    }
}

impl PartialEq<[u8]> for ShaHash {
    fn eq(&self, other: &[u8]) -> bool {
        self.hash[..] == *other
    }
}

impl fmt::Display for ShaHash {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&hex::encode(self.hash))
    }
}

impl fmt::Debug for ShaHash {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ShaHash({})", self)
    }
}
