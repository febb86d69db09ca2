use bytes::{Buf, BufMut};
use commonware_codec::{Error, ReadExt, Write};

use super::Hash;

/// Encoded size of a [Hash].
pub const HASH_SIZE: usize = 32;

/// Write a 32-byte hash without a length prefix.
pub fn write_hash(hash: &Hash, writer: &mut impl BufMut) {
    writer.put_slice(hash);
}

/// Read a 32-byte hash written by [write_hash].
pub fn read_hash(reader: &mut impl Buf) -> Result<Hash, Error> {
    if reader.remaining() < HASH_SIZE {
        return Err(Error::EndOfBuffer);
    }
    let mut hash = [0u8; HASH_SIZE];
    reader.copy_to_slice(&mut hash);
    Ok(hash)
}

/// Write a list of hashes as a u32 count followed by the raw bytes.
pub fn write_hashes(hashes: &[Hash], writer: &mut impl BufMut) {
    (hashes.len() as u32).write(writer);
    for hash in hashes {
        write_hash(hash, writer);
    }
}

/// Read a list of hashes written by [write_hashes], rejecting more than `max`.
pub fn read_hashes(reader: &mut impl Buf, max: usize) -> Result<Vec<Hash>, Error> {
    let len = u32::read(reader)? as usize;
    if len > max {
        return Err(Error::Invalid("Hashes", "too many"));
    }
    let needed = len.checked_mul(HASH_SIZE).ok_or(Error::EndOfBuffer)?;
    if reader.remaining() < needed {
        return Err(Error::EndOfBuffer);
    }
    let mut hashes = Vec::with_capacity(len);
    for _ in 0..len {
        hashes.push(read_hash(reader)?);
    }
    Ok(hashes)
}

/// Encoded size of a hash list.
pub fn hashes_encode_size(hashes: &[Hash]) -> usize {
    4 + hashes.len() * HASH_SIZE
}

/// Helper to write a string as length-prefixed UTF-8 bytes.
pub fn write_string(s: &str, writer: &mut impl BufMut) {
    let bytes = s.as_bytes();
    (bytes.len() as u32).write(writer);
    writer.put_slice(bytes);
}

/// Helper to read a string from length-prefixed UTF-8 bytes.
pub fn read_string(reader: &mut impl Buf, max_len: usize) -> Result<String, Error> {
    let len = u32::read(reader)? as usize;
    if len > max_len {
        return Err(Error::Invalid("String", "too long"));
    }
    if reader.remaining() < len {
        return Err(Error::EndOfBuffer);
    }
    let mut bytes = vec![0u8; len];
    reader.copy_to_slice(&mut bytes);
    String::from_utf8(bytes).map_err(|_| Error::Invalid("String", "invalid UTF-8"))
}

/// Helper to get encode size of a string.
pub fn string_encode_size(s: &str) -> usize {
    4 + s.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;
    use rand::{rngs::StdRng, RngCore, SeedableRng};

    #[test]
    fn read_hash_rejects_truncated_buffers() {
        let buf = [7u8; HASH_SIZE - 1];
        let mut reader = &buf[..];
        let err = read_hash(&mut reader).expect_err("should reject truncated hash");
        assert!(matches!(err, Error::EndOfBuffer));
    }

    #[test]
    fn read_hashes_rejects_oversized_lists() {
        let mut buf = BytesMut::new();
        write_hashes(&[[1u8; 32], [2u8; 32], [3u8; 32]], &mut buf);

        let mut reader = buf.as_ref();
        let err = read_hashes(&mut reader, 2).expect_err("should reject too many hashes");
        assert!(matches!(err, Error::Invalid("Hashes", "too many")));

        let mut reader = buf.as_ref();
        let hashes = read_hashes(&mut reader, 3).expect("three hashes fit");
        assert_eq!(hashes, vec![[1u8; 32], [2u8; 32], [3u8; 32]]);
        assert_eq!(buf.len(), hashes_encode_size(&hashes));
    }

    #[test]
    fn read_hashes_rejects_count_larger_than_buffer() {
        let mut buf = BytesMut::new();
        (2u32).write(&mut buf);
        buf.extend_from_slice(&[9u8; HASH_SIZE]);

        let mut reader = buf.as_ref();
        let err = read_hashes(&mut reader, 8).expect_err("should reject missing hash");
        assert!(matches!(err, Error::EndOfBuffer));
    }

    #[test]
    fn read_string_rejects_too_long() {
        let mut buf = BytesMut::new();
        write_string("linear", &mut buf);

        let mut reader = buf.as_ref();
        let err = read_string(&mut reader, 4).expect_err("should reject too-long string");
        assert!(matches!(err, Error::Invalid("String", "too long")));
    }

    #[test]
    fn read_string_rejects_invalid_utf8() {
        let mut buf = BytesMut::new();
        (2u32).write(&mut buf);
        buf.extend_from_slice(&[0xff, 0xff]);

        let mut reader = buf.as_ref();
        let err = read_string(&mut reader, 10).expect_err("should reject invalid UTF-8");
        assert!(matches!(err, Error::Invalid("String", "invalid UTF-8")));
    }

    #[test]
    fn readers_handle_malformed_inputs() {
        let mut rng = StdRng::seed_from_u64(0x5eed_c0de);
        for _ in 0..500 {
            let len = (rng.next_u32() as usize) % 512;
            let mut buf = vec![0u8; len];
            rng.fill_bytes(&mut buf);

            let mut reader = buf.as_slice();
            if let Ok(hashes) = read_hashes(&mut reader, 4) {
                assert!(hashes.len() <= 4);
            }
            let mut reader = buf.as_slice();
            if let Ok(s) = read_string(&mut reader, 64) {
                assert!(s.len() <= 64);
            }
        }
    }
}
