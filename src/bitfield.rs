use bit_vec::BitVec;
use parking_lot::Mutex;
use std::fmt;

use crate::error::{Error, Result};

/// Thread safe record of which pieces are owned.
///
/// Bits follow the peer wire layout: piece `i` lives in byte `i / 8` at the
/// bit `7 - i % 8`, so the high bit of the first byte is piece 0. One lock
/// guards every operation.
pub struct Bitfield {
    amount_of_pieces: u32,
    inner: Mutex<BitVec>,
}

impl Bitfield {
    /// a bitfield with all `amount_of_pieces` bits unset
    pub fn new(amount_of_pieces: u32) -> Self {
        Self {
            amount_of_pieces,
            inner: Mutex::new(BitVec::from_elem(amount_of_pieces as usize, false)),
        }
    }

    /// Restores a bitfield from its wire form. Missing trailing bytes count as
    /// unset, spare bits past `amount_of_pieces` are dropped.
    pub fn from_bytes(bytes: &[u8], amount_of_pieces: u32) -> Self {
        let mut bits = BitVec::from_bytes(bytes);
        bits.truncate(amount_of_pieces as usize);
        bits.grow(amount_of_pieces as usize - bits.len(), false);
        Self {
            amount_of_pieces,
            inner: Mutex::new(bits),
        }
    }

    #[inline]
    pub fn amount_of_pieces(&self) -> u32 {
        self.amount_of_pieces
    }

    /// Sets the bit of piece `index`, returns whether it was unset before.
    pub fn set(&self, index: u32) -> Result<bool> {
        self.check(index)?;
        let mut bits = self.inner.lock();
        let was_set = bits[index as usize];
        bits.set(index as usize, true);
        Ok(!was_set)
    }

    /// Clears the bit of piece `index`, returns whether it was set before.
    pub fn unset(&self, index: u32) -> Result<bool> {
        self.check(index)?;
        let mut bits = self.inner.lock();
        let was_set = bits[index as usize];
        bits.set(index as usize, false);
        Ok(was_set)
    }

    pub fn is_set(&self, index: u32) -> Result<bool> {
        self.check(index)?;
        Ok(self.inner.lock()[index as usize])
    }

    /// number of owned pieces
    pub fn count_set(&self) -> u32 {
        self.inner.lock().iter().filter(|bit| *bit).count() as u32
    }

    /// whether every piece is owned
    pub fn is_complete(&self) -> bool {
        self.inner.lock().all()
    }

    /// returns the index of the first set bit
    pub fn first_set(&self) -> Option<u32> {
        self.inner
            .lock()
            .iter()
            .position(|bit| bit)
            .map(|i| i as u32)
    }

    /// returns the index of the first unset bit
    pub fn first_unset(&self) -> Option<u32> {
        self.inner
            .lock()
            .iter()
            .position(|bit| !bit)
            .map(|i| i as u32)
    }

    /// the wire form, `ceil(amount_of_pieces / 8)` bytes with spare bits zeroed
    pub fn to_bytes(&self) -> Vec<u8> {
        self.inner.lock().to_bytes()
    }

    fn check(&self, index: u32) -> Result<()> {
        if index >= self.amount_of_pieces {
            return Err(Error::IndexOutOfRange {
                index: index as u64,
                bound: self.amount_of_pieces as u64,
            });
        }
        Ok(())
    }
}

impl fmt::Debug for Bitfield {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Bitfield {{ amount_of_pieces: {}, bits: {:?} }}",
            self.amount_of_pieces,
            *self.inner.lock()
        )
    }
}

impl Clone for Bitfield {
    fn clone(&self) -> Self {
        Self {
            amount_of_pieces: self.amount_of_pieces,
            inner: Mutex::new(self.inner.lock().clone()),
        }
    }
}
