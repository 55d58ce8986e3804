//! NPK/EXPK container header, index, and NXFN name table.
//!
//! Parses the fixed-size header and index table once per container;
//! entries are handed to `crate::pipeline` for per-record unwrapping.
//! Nothing here reads entry payloads - only the metadata needed to find
//! them.

use std::io::{Read, Seek, SeekFrom};

use crate::crypto::Cipher;
use crate::utils::{bytesv, le_u16, le_u32, signature};
use crate::{Error, Result};

const RECORD_SIZE: u64 = 28;
/// `index_offset + file_count*28 + 16` is the start of the NXFN table;
/// the extra 16 bytes are a trailing header block this format always
/// carries and must be skipped exactly.
const NXFN_TABLE_SKIP: u64 = 16;
const NXFN_ENCRYPTION_MODE: u32 = 256;

/// Container signature. `Expk` containers wrap their index and payloads
/// in an additional [`Cipher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Magic {
    Nxpk,
    Expk,
}

impl Magic {
    fn from_bytes(bytes: [u8; 4]) -> Result<Self> {
        match &bytes {
            b"NXPK" => Ok(Magic::Nxpk),
            b"EXPK" => Ok(Magic::Expk),
            _ => Err(Error::InvalidSignature(bytes)),
        }
    }
}

/// The 24-byte fixed header that follows the 4-byte signature.
#[derive(Debug, Clone, Copy)]
pub struct Header {
    pub magic: Magic,
    pub file_count: u32,
    pub unknown: u32,
    pub encryption_mode: u32,
    pub hash_mode: u32,
    pub index_offset: u32,
}

/// One 28-byte index record.
#[derive(Debug, Clone, Copy)]
pub struct IndexRecord {
    pub sign: u32,
    pub offset: u32,
    pub length: u32,
    pub original_length: u32,
    pub zcrc: u32,
    pub crc: u32,
    pub compression: u16,
    pub flag: u16,
}

/// A container entry: its index record plus the relative path it should
/// be written at, if one was recovered from the NXFN table.
#[derive(Debug, Clone)]
pub struct Entry {
    pub index: usize,
    pub record: IndexRecord,
    pub name: Option<String>,
}

/// Parsed container metadata: header, every entry, ready for the
/// pipeline to read and unwrap payloads.
#[derive(Debug)]
pub struct Container {
    pub header: Header,
    pub entries: Vec<Entry>,
}

impl Container {
    /// Parse the header and index table from `r`, which must be
    /// positioned at the start of the container's 4-byte signature.
    ///
    /// `cipher` is only consulted for `EXPK` containers, to decrypt the
    /// raw index block once before decoding records.
    pub fn parse<R: Read + Seek>(r: &mut R, cipher: Option<&dyn Cipher>) -> Result<Self> {
        let sig = signature(r)?;
        let magic = Magic::from_bytes(sig)?;

        let file_count = le_u32(r)?;
        let unknown = le_u32(r)?;
        let encryption_mode = le_u32(r)?;
        let hash_mode = le_u32(r)?;
        let index_offset = le_u32(r)?;

        let header = Header {
            magic,
            file_count,
            unknown,
            encryption_mode,
            hash_mode,
            index_offset,
        };

        // §9 open question 1: the 0x28-byte record layout is detected but
        // not supported; refuse rather than silently read only the first
        // 28 bytes of a record the format says is longer.
        if header.unknown != 0 && header.hash_mode != 0 {
            return Err(Error::Parse(
                "0x28-byte index records are not supported",
            ));
        }

        let file_size = r.seek(SeekFrom::End(0))?;
        let index_bytes_len = (file_count as u64)
            .checked_mul(RECORD_SIZE)
            .ok_or(Error::InvalidRange)?;
        let index_end = (index_offset as u64)
            .checked_add(index_bytes_len)
            .ok_or(Error::InvalidRange)?;
        if index_end > file_size {
            return Err(Error::InvalidRange);
        }

        r.seek(SeekFrom::Start(index_offset as u64))?;
        let mut raw_index = bytesv(r, index_bytes_len as usize)?;

        if header.magic == Magic::Expk {
            let cipher = cipher.ok_or(Error::IndexDecryptFailure)?;
            raw_index = cipher.decrypt(&raw_index)?;
            if raw_index.len() != index_bytes_len as usize {
                return Err(Error::IndexDecryptFailure);
            }
        }

        let mut records = Vec::with_capacity(file_count as usize);
        {
            let mut cursor = std::io::Cursor::new(&raw_index);
            for _ in 0..file_count {
                records.push(IndexRecord {
                    sign: le_u32(&mut cursor)?,
                    offset: le_u32(&mut cursor)?,
                    length: le_u32(&mut cursor)?,
                    original_length: le_u32(&mut cursor)?,
                    zcrc: le_u32(&mut cursor)?,
                    crc: le_u32(&mut cursor)?,
                    compression: le_u16(&mut cursor)?,
                    flag: le_u16(&mut cursor)?,
                });
            }
        }

        for record in &records {
            let end = (record.offset as u64)
                .checked_add(record.length as u64)
                .ok_or(Error::InvalidRange)?;
            if end > file_size {
                return Err(Error::InvalidRange);
            }
        }

        let names = if header.encryption_mode == NXFN_ENCRYPTION_MODE {
            let nxfn_start = index_offset as u64 + index_bytes_len + NXFN_TABLE_SKIP;
            if nxfn_start > file_size {
                Vec::new()
            } else {
                r.seek(SeekFrom::Start(nxfn_start))?;
                let raw = bytesv(r, (file_size - nxfn_start) as usize)?;
                split_nxfn(&raw)
            }
        } else {
            Vec::new()
        };

        let entries = records
            .into_iter()
            .enumerate()
            .map(|(index, record)| Entry {
                index,
                record,
                name: names.get(index).cloned(),
            })
            .collect();

        Ok(Container { header, entries })
    }
}

/// Split a NUL-delimited NXFN blob into names, dropping empty segments
/// and normalizing backslashes to forward slashes.
fn split_nxfn(raw: &[u8]) -> Vec<String> {
    raw.split(|&b| b == 0)
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            String::from_utf8_lossy(segment)
                .replace('\\', "/")
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn le32(v: u32) -> [u8; 4] {
        v.to_le_bytes()
    }
    fn le16(v: u16) -> [u8; 2] {
        v.to_le_bytes()
    }

    fn record_bytes(r: &IndexRecord) -> Vec<u8> {
        let mut v = Vec::new();
        v.extend_from_slice(&le32(r.sign));
        v.extend_from_slice(&le32(r.offset));
        v.extend_from_slice(&le32(r.length));
        v.extend_from_slice(&le32(r.original_length));
        v.extend_from_slice(&le32(r.zcrc));
        v.extend_from_slice(&le32(r.crc));
        v.extend_from_slice(&le16(r.compression));
        v.extend_from_slice(&le16(r.flag));
        v
    }

    fn build_container(header_extra: (u32, u32, u32), records: &[IndexRecord], tail: &[u8]) -> Vec<u8> {
        let (unknown, encryption_mode, hash_mode) = header_extra;
        let index_offset = 0x18u32;
        let mut buf = Vec::new();
        buf.extend_from_slice(b"NXPK");
        buf.extend_from_slice(&le32(records.len() as u32));
        buf.extend_from_slice(&le32(unknown));
        buf.extend_from_slice(&le32(encryption_mode));
        buf.extend_from_slice(&le32(hash_mode));
        buf.extend_from_slice(&le32(index_offset));
        for r in records {
            buf.extend_from_slice(&record_bytes(r));
        }
        buf.extend_from_slice(tail);
        buf
    }

    #[test]
    fn empty_container_roundtrips_header() {
        let bytes = build_container((0, 0, 0), &[], &[]);
        let mut cursor = Cursor::new(bytes);
        let container = Container::parse(&mut cursor, None).unwrap();
        assert_eq!(container.header.file_count, 0);
        assert_eq!(container.header.index_offset, 0x18);
        assert!(container.entries.is_empty());
    }

    #[test]
    fn rejects_0x28_record_mode() {
        let bytes = build_container((1, 0, 1), &[], &[]);
        let mut cursor = Cursor::new(bytes);
        assert!(matches!(
            Container::parse(&mut cursor, None),
            Err(Error::Parse(_))
        ));
    }

    #[test]
    fn single_record_offset_within_file_size() {
        let record = IndexRecord {
            sign: 1,
            offset: 0x20,
            length: 5,
            original_length: 5,
            zcrc: 0,
            crc: 0,
            compression: 0,
            flag: 0,
        };
        let mut tail = vec![0u8; 0x20 - 0x18 - 28];
        tail.extend_from_slice(b"hello");
        let bytes = build_container((0, 0, 0), &[record], &tail);
        let mut cursor = Cursor::new(bytes);
        let container = Container::parse(&mut cursor, None).unwrap();
        assert_eq!(container.entries.len(), 1);
        assert_eq!(container.entries[0].record.offset, 0x20);
        assert_eq!(container.entries[0].name, None);
    }

    #[test]
    fn nxfn_names_pair_with_records_in_order() {
        let record = IndexRecord {
            sign: 1,
            offset: 0x50,
            length: 4,
            original_length: 4,
            zcrc: 0,
            crc: 0,
            compression: 0,
            flag: 0,
        };
        let mut tail = vec![0u8; NXFN_TABLE_SKIP as usize];
        tail.extend_from_slice(b"a\\b\\c.png\0");
        let mut bytes = build_container((0, 256, 0), &[record], &tail);
        bytes.resize(0x54, 0);
        let mut cursor = Cursor::new(bytes);
        let container = Container::parse(&mut cursor, None).unwrap();
        assert_eq!(container.entries[0].name.as_deref(), Some("a/b/c.png"));
    }

    #[test]
    fn out_of_range_record_is_rejected() {
        let record = IndexRecord {
            sign: 1,
            offset: 0,
            length: 0xFFFF_FFFF,
            original_length: 0,
            zcrc: 0,
            crc: 0,
            compression: 0,
            flag: 0,
        };
        let bytes = build_container((0, 0, 0), &[record], &[]);
        let mut cursor = Cursor::new(bytes);
        assert!(matches!(
            Container::parse(&mut cursor, None),
            Err(Error::InvalidRange)
        ));
    }

    #[test]
    fn split_nxfn_drops_empty_segments() {
        let raw = b"a.png\0\0b.png\0";
        assert_eq!(split_nxfn(raw), vec!["a.png".to_string(), "b.png".to_string()]);
    }

    #[test]
    fn split_nxfn_normalizes_backslashes() {
        let raw = b"a\\b\\c.png\0";
        assert_eq!(split_nxfn(raw), vec!["a/b/c.png".to_string()]);
    }
}
