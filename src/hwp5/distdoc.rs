//! Distribution document stream layout.
//!
//! Body streams of distributable documents start with a DISTRIBUTE_DOC_DATA
//! record whose 256-byte payload hides the stream key; the remainder is
//! AES-128-ECB ciphertext of the (possibly compressed) record stream.
//! The cipher itself is left to a [`StreamDecryptor`].

use super::models::DISTRIBUTE_DOC_DATA_SIZE;
use super::record::{RecordHeader, TagId};
use crate::error::{Error, Result};
use bytes::Bytes;
use log::debug;

/// Offset of the ciphertext within a distribution stream.
pub const CIPHERTEXT_OFFSET: usize = RecordHeader::SIZE + DISTRIBUTE_DOC_DATA_SIZE;

/// Length of the hex-encoded SHA-1 text hidden in the head.
pub const SHA1_TEXT_SIZE: usize = 80;

/// Decrypts the body of a distribution stream.
pub trait StreamDecryptor {
    /// Decrypts `ciphertext` with the 16-byte key recovered from the head.
    fn decrypt(&self, key: &[u8; 16], ciphertext: &[u8]) -> Result<Vec<u8>>;
}

impl<F> StreamDecryptor for F
where
    F: Fn(&[u8; 16], &[u8]) -> Result<Vec<u8>>,
{
    fn decrypt(&self, key: &[u8; 16], ciphertext: &[u8]) -> Result<Vec<u8>> {
        self(key, ciphertext)
    }
}

/// A distribution stream split into its key material and ciphertext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistributionStream {
    /// Scrambled DISTRIBUTE_DOC_DATA payload.
    pub head: Bytes,
    pub ciphertext: Bytes,
}

impl DistributionStream {
    /// Splits a raw stream, checking the leading record header.
    pub fn parse(data: Bytes) -> Result<Self> {
        let (header, consumed) = RecordHeader::parse(&data)?;
        if header.tag() != TagId::DistributeDocData {
            return Err(Error::InvalidData(format!(
                "distribution stream starts with tag {} instead of DISTRIBUTE_DOC_DATA",
                header.tag_id
            )));
        }
        if consumed != RecordHeader::SIZE || header.size as usize != DISTRIBUTE_DOC_DATA_SIZE {
            return Err(Error::InvalidData(format!(
                "distribution head is {} bytes, expected {}",
                header.size, DISTRIBUTE_DOC_DATA_SIZE
            )));
        }
        if data.len() < CIPHERTEXT_OFFSET {
            return Err(Error::TruncatedStream {
                offset: RecordHeader::SIZE as u64,
                needed: DISTRIBUTE_DOC_DATA_SIZE,
                available: data.len() - RecordHeader::SIZE,
            });
        }

        Ok(Self {
            head: data.slice(RecordHeader::SIZE..CIPHERTEXT_OFFSET),
            ciphertext: data.slice(CIPHERTEXT_OFFSET..),
        })
    }

    /// Recovers the stream key and decrypts the body.
    pub fn decrypt(&self, decryptor: &dyn StreamDecryptor) -> Result<Vec<u8>> {
        let key = decode_head_to_key(&self.head)?;
        debug!("decrypting {} bytes of distribution stream", self.ciphertext.len());
        decryptor.decrypt(&key, &self.ciphertext)
    }
}

/// Linear congruential generator of the MSVC runtime's `rand()`.
struct MsvcRand {
    state: u32,
}

impl MsvcRand {
    fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    fn next(&mut self) -> u32 {
        self.state = self.state.wrapping_mul(214_013).wrapping_add(2_531_011);
        (self.state >> 16) & 0x7FFF
    }
}

/// Undoes the run-length XOR scrambling of a distribution head.
fn descramble(head: &[u8]) -> Result<(u32, Vec<u8>)> {
    if head.len() != DISTRIBUTE_DOC_DATA_SIZE {
        return Err(Error::InvalidData(format!(
            "distribution head is {} bytes, expected {}",
            head.len(),
            DISTRIBUTE_DOC_DATA_SIZE
        )));
    }
    let seed = u32::from_le_bytes([head[0], head[1], head[2], head[3]]);
    let data = head.iter().zip(key_stream(seed)).map(|(b, k)| b ^ k).collect();
    Ok((seed, data))
}

/// Extracts the hex-encoded SHA-1 text from a distribution head.
pub fn decode_head_to_sha1(head: &[u8]) -> Result<[u8; SHA1_TEXT_SIZE]> {
    let (seed, data) = descramble(head)?;
    let offset = 4 + (seed & 0xF) as usize;
    let mut sha1 = [0u8; SHA1_TEXT_SIZE];
    sha1.copy_from_slice(&data[offset..offset + SHA1_TEXT_SIZE]);
    Ok(sha1)
}

/// Recovers the AES-128 key of a distribution stream from its head.
pub fn decode_head_to_key(head: &[u8]) -> Result<[u8; 16]> {
    let sha1 = decode_head_to_sha1(head)?;
    let mut key = [0u8; 16];
    key.copy_from_slice(&sha1[..16]);
    Ok(key)
}

/// Key stream of the scrambling for `seed`, one byte per head byte.
fn key_stream(seed: u32) -> impl Iterator<Item = u8> {
    let mut rand = MsvcRand::new(seed);
    let mut key = 0u8;
    let mut run = 0;
    std::iter::from_fn(move || {
        if run == 0 {
            key = (rand.next() & 0xFF) as u8;
            run = (rand.next() & 0xF) + 1;
        }
        run -= 1;
        Some(key)
    })
}

#[cfg(test)]
pub(crate) fn scrambled_head(seed: u32, sha1: &[u8; SHA1_TEXT_SIZE]) -> Vec<u8> {
    let offset = 4 + (seed & 0xF) as usize;
    let mut plain = vec![0u8; DISTRIBUTE_DOC_DATA_SIZE];
    plain[offset..offset + SHA1_TEXT_SIZE].copy_from_slice(sha1);

    let mut head: Vec<u8> = plain.iter().zip(key_stream(seed)).map(|(b, k)| b ^ k).collect();
    head[..4].copy_from_slice(&seed.to_le_bytes());
    head
}
