//! MP4 metadata atom reading.
//!
//! Walks the `moov/udta/meta/ilst` atom chain and returns the embedded
//! iTunes-style tag set. Freeform `----` tags are named
//! `----:<mean>:<name>` to keep vendor tags addressable.

use reelmeta_common::{Error, Result};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

/// Maximum tag payload read into memory; larger payloads (cover art and
/// the like) are skipped.
const MAX_TAG_DATA_SIZE: u64 = 1024 * 1024;

/// A decoded tag value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagValue {
    Text(String),
    Int(i64),
    Bytes(Vec<u8>),
}

impl TagValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            TagValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            TagValue::Int(n) => Some(*n),
            _ => None,
        }
    }
}

/// Parsed atom header.
#[derive(Debug, Clone)]
struct Atom {
    name: [u8; 4],
    size: u64,
    data_offset: u64,
    header_size: u8,
}

impl Atom {
    fn data_size(&self) -> u64 {
        self.size.saturating_sub(self.header_size as u64)
    }

    fn data_end(&self) -> u64 {
        self.data_offset.saturating_add(self.data_size())
    }
}

/// Read the embedded tag set of an MP4/QuickTime file.
pub fn read_tags(path: &Path) -> Result<Vec<(String, TagValue)>> {
    let file = File::open(path)?;
    let len = file.metadata()?.len();
    read_tags_from(file, len)
}

/// Read tags from any seekable stream of the given length.
pub fn read_tags_from<R: Read + Seek>(mut reader: R, len: u64) -> Result<Vec<(String, TagValue)>> {
    let moov = find_atom(&mut reader, 0, len, b"moov")?
        .ok_or_else(|| Error::unsupported("no moov atom"))?;
    let udta = match find_atom(&mut reader, moov.data_offset, moov.data_end(), b"udta")? {
        Some(atom) => atom,
        None => return Ok(Vec::new()),
    };
    let meta = match find_atom(&mut reader, udta.data_offset, udta.data_end(), b"meta")? {
        Some(atom) => atom,
        None => return Ok(Vec::new()),
    };
    // The meta atom carries a 4-byte version/flags prefix before children.
    let ilst = match find_atom(&mut reader, meta.data_offset + 4, meta.data_end(), b"ilst")? {
        Some(atom) => atom,
        None => return Ok(Vec::new()),
    };

    let mut tags = Vec::new();
    for tag_atom in read_atoms(&mut reader, ilst.data_offset, ilst.data_end())? {
        if let Some(entry) = read_tag(&mut reader, &tag_atom)? {
            tags.push(entry);
        }
    }
    Ok(tags)
}

fn read_tag<R: Read + Seek>(reader: &mut R, atom: &Atom) -> Result<Option<(String, TagValue)>> {
    let children = read_atoms(reader, atom.data_offset, atom.data_end())?;

    if atom.name == *b"----" {
        let mean = read_tagged_string(reader, &children, b"mean")?;
        let name = read_tagged_string(reader, &children, b"name")?;
        let (Some(mean), Some(name)) = (mean, name) else {
            return Ok(None);
        };
        let Some(value) = read_first_data(reader, &children)? else {
            return Ok(None);
        };
        return Ok(Some((format!("----:{mean}:{name}"), value)));
    }

    let Some(value) = read_first_data(reader, &children)? else {
        return Ok(None);
    };
    let name = atom.name.iter().map(|&b| b as char).collect();
    Ok(Some((name, value)))
}

/// Read the string payload of a `mean` or `name` child atom.
fn read_tagged_string<R: Read + Seek>(
    reader: &mut R,
    children: &[Atom],
    name: &[u8; 4],
) -> Result<Option<String>> {
    let Some(atom) = children.iter().find(|a| a.name == *name) else {
        return Ok(None);
    };
    let data = read_atom_data(reader, atom)?;
    if data.len() < 4 {
        return Ok(None);
    }
    Ok(Some(String::from_utf8_lossy(&data[4..]).into_owned()))
}

/// Decode the first `data` child atom of a tag.
fn read_first_data<R: Read + Seek>(reader: &mut R, children: &[Atom]) -> Result<Option<TagValue>> {
    let Some(atom) = children.iter().find(|a| a.name == *b"data") else {
        return Ok(None);
    };
    if atom.data_size() > MAX_TAG_DATA_SIZE {
        return Ok(None);
    }
    let data = read_atom_data(reader, atom)?;
    if data.len() < 8 {
        return Ok(None);
    }
    // Version byte plus 3-byte type flag, then a 4-byte locale.
    let type_flag = u32::from_be_bytes([data[0], data[1], data[2], data[3]]) & 0x00ff_ffff;
    let value = &data[8..];
    let decoded = match type_flag {
        1 => TagValue::Text(String::from_utf8_lossy(value).into_owned()),
        21 | 22 => match value.len() {
            1 => TagValue::Int(value[0] as i64),
            2 => TagValue::Int(u16::from_be_bytes([value[0], value[1]]) as i64),
            4 => TagValue::Int(u32::from_be_bytes([value[0], value[1], value[2], value[3]]) as i64),
            8 => TagValue::Int(i64::from_be_bytes(value.try_into().expect("8 bytes"))),
            _ => TagValue::Bytes(value.to_vec()),
        },
        _ => TagValue::Bytes(value.to_vec()),
    };
    Ok(Some(decoded))
}

/// Read atoms between `start` and `end`.
fn read_atoms<R: Read + Seek>(reader: &mut R, start: u64, end: u64) -> Result<Vec<Atom>> {
    let mut atoms = Vec::new();
    let mut pos = start;

    // Sizes come straight from the file; a declared size near u64::MAX
    // must stop the walk, not wrap `pos` back into atoms already read.
    loop {
        let header_end = match pos.checked_add(8) {
            Some(n) if n <= end => n,
            _ => break,
        };
        reader.seek(SeekFrom::Start(pos))?;
        let mut header = [0u8; 8];
        if reader.read_exact(&mut header).is_err() {
            break;
        }

        let size = u32::from_be_bytes([header[0], header[1], header[2], header[3]]) as u64;
        let name = [header[4], header[5], header[6], header[7]];

        let (actual_size, header_size) = if size == 1 {
            let mut ext = [0u8; 8];
            reader.read_exact(&mut ext)?;
            (u64::from_be_bytes(ext), 16u8)
        } else if size == 0 {
            (end - pos, 8u8)
        } else {
            (size, 8u8)
        };

        if actual_size < header_size as u64 {
            break;
        }
        let next = match pos.checked_add(actual_size) {
            Some(n) => n,
            None => break,
        };

        atoms.push(Atom {
            name,
            size: actual_size,
            data_offset: header_end.saturating_add(header_size as u64 - 8),
            header_size,
        });

        pos = next;
    }

    Ok(atoms)
}

fn find_atom<R: Read + Seek>(
    reader: &mut R,
    start: u64,
    end: u64,
    name: &[u8; 4],
) -> Result<Option<Atom>> {
    Ok(read_atoms(reader, start, end)?
        .into_iter()
        .find(|a| a.name == *name))
}

fn read_atom_data<R: Read + Seek>(reader: &mut R, atom: &Atom) -> Result<Vec<u8>> {
    let size = atom.data_size().min(MAX_TAG_DATA_SIZE);
    reader.seek(SeekFrom::Start(atom.data_offset))?;
    let mut data = vec![0u8; size as usize];
    reader.read_exact(&mut data)?;
    Ok(data)
}
