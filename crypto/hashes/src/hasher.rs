use sha2::{Digest, Sha256};
use std::io::Write;

use crate::Hash;

/// Types with a canonical byte encoding that feeds a [`HashWriter`].
pub trait Hashable {
    fn hash_into(&self, writer: &mut HashWriter);

    /// Double SHA-256 of the canonical encoding.
    fn content_hash(&self) -> Hash {
        let mut writer = HashWriter::new();
        self.hash_into(&mut writer);
        writer.finalize_double()
    }
}

/// Compute SHA256(SHA256(data))
pub fn double_sha256(data: &[u8]) -> Hash {
    let first = Sha256::digest(data);
    let second = Sha256::digest(first);
    Hash::from_bytes(second.into())
}

/// Compute SHA256(data)
pub fn sha256(data: &[u8]) -> Hash {
    Hash::from_bytes(Sha256::digest(data).into())
}

/// HashWriter wraps a Sha256 hasher to implement Write trait
#[derive(Clone)]
pub struct HashWriter(Sha256);

impl HashWriter {
    pub fn new() -> Self {
        Self(Sha256::new())
    }

    pub fn update<A: AsRef<[u8]>>(&mut self, data: A) -> &mut Self {
        self.0.update(data.as_ref());
        self
    }

    pub fn write_u8(&mut self, v: u8) -> &mut Self {
        self.update([v])
    }

    pub fn write_u16(&mut self, v: u16) -> &mut Self {
        self.update(v.to_le_bytes())
    }

    pub fn write_u32(&mut self, v: u32) -> &mut Self {
        self.update(v.to_le_bytes())
    }

    pub fn write_u64(&mut self, v: u64) -> &mut Self {
        self.update(v.to_le_bytes())
    }

    /// Length-prefixed byte string (u64 little-endian length).
    pub fn write_var_bytes(&mut self, data: &[u8]) -> &mut Self {
        self.write_u64(data.len() as u64);
        self.update(data)
    }

    pub fn hash_object<T: Hashable>(&mut self, obj: &T) -> &mut Self {
        obj.hash_into(self);
        self
    }

    /// Single SHA-256 of everything written so far.
    pub fn finalize(self) -> Hash {
        Hash::from_bytes(self.0.finalize().into())
    }

    /// SHA-256 applied twice, the identifier hash for headers and transactions.
    pub fn finalize_double(self) -> Hash {
        let first = self.0.finalize();
        Hash::from_bytes(Sha256::digest(first).into())
    }
}

impl Write for HashWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl Default for HashWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_double_sha256() {
        let hash = double_sha256(b"hello");
        assert_eq!(
            hash.as_bytes(),
            &hex!("9595c9df90075148eb06860365df33584b75bff782a510c6cd4883a419833d50")
        );
    }

    #[test]
    fn test_hash_writer() {
        let mut writer = HashWriter::new();
        writer.write_all(b"hello").unwrap();
        let hash = writer.finalize();
        assert_eq!(
            hash.as_bytes(),
            &hex!("2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824")
        );
    }

    #[test]
    fn test_finalize_double_matches_double_sha256() {
        let mut writer = HashWriter::new();
        writer.update(b"hel").update(b"lo");
        assert_eq!(writer.finalize_double(), double_sha256(b"hello"));
    }
}
