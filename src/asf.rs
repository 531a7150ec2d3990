//! ASF header-object reading for DVR-MS/WMV metadata.
//!
//! Only the two descriptive objects matter here: the Content Description
//! Object (title, author, copyright, description, rating) and the Extended
//! Content Description Object carrying the `WM/*` attributes. Everything
//! else in the header is skipped.

use reelmeta_common::{Error, Result};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

/// ASF Header Object GUID, as laid out on disk.
const HEADER_OBJECT: [u8; 16] = [
    0x30, 0x26, 0xb2, 0x75, 0x8e, 0x66, 0xcf, 0x11, 0xa6, 0xd9, 0x00, 0xaa, 0x00, 0x62, 0xce, 0x6c,
];

/// Content Description Object GUID.
const CONTENT_DESCRIPTION: [u8; 16] = [
    0x33, 0x26, 0xb2, 0x75, 0x8e, 0x66, 0xcf, 0x11, 0xa6, 0xd9, 0x00, 0xaa, 0x00, 0x62, 0xce, 0x6c,
];

/// Extended Content Description Object GUID.
const EXT_CONTENT_DESCRIPTION: [u8; 16] = [
    0x40, 0xa4, 0xd0, 0xd2, 0x07, 0xe3, 0xd2, 0x11, 0x97, 0xf0, 0x00, 0xa0, 0xc9, 0x5e, 0xa8, 0x50,
];

/// Read the descriptive attributes of an ASF container as name/value text
/// pairs.
pub fn read_attributes(path: &Path) -> Result<Vec<(String, String)>> {
    read_attributes_from(File::open(path)?)
}

/// Read attributes from any seekable ASF stream.
pub fn read_attributes_from<R: Read + Seek>(mut reader: R) -> Result<Vec<(String, String)>> {
    let mut top = [0u8; 30];
    reader.read_exact(&mut top)?;
    if top[..16] != HEADER_OBJECT {
        return Err(Error::unsupported("not an ASF header"));
    }
    let object_count = u32::from_le_bytes([top[24], top[25], top[26], top[27]]);

    let mut attrs = Vec::new();
    let mut pos = 30u64;
    for _ in 0..object_count {
        reader.seek(SeekFrom::Start(pos))?;
        let mut header = [0u8; 24];
        if reader.read_exact(&mut header).is_err() {
            break;
        }
        let guid: [u8; 16] = header[..16].try_into().expect("16 bytes");
        let size = u64::from_le_bytes(header[16..24].try_into().expect("8 bytes"));
        if size < 24 {
            break;
        }

        if guid == CONTENT_DESCRIPTION || guid == EXT_CONTENT_DESCRIPTION {
            let mut payload = vec![0u8; (size - 24) as usize];
            reader.read_exact(&mut payload)?;
            if guid == CONTENT_DESCRIPTION {
                parse_content_description(&payload, &mut attrs);
            } else {
                parse_extended_description(&payload, &mut attrs);
            }
        }
        pos += size;
    }
    Ok(attrs)
}

/// Five length-prefixed UTF-16LE strings in fixed order.
fn parse_content_description(payload: &[u8], attrs: &mut Vec<(String, String)>) {
    const NAMES: [&str; 5] = ["Title", "Author", "Copyright", "Description", "Rating"];

    if payload.len() < 10 {
        return;
    }
    let mut lengths = [0usize; 5];
    for (i, len) in lengths.iter_mut().enumerate() {
        *len = u16::from_le_bytes([payload[i * 2], payload[i * 2 + 1]]) as usize;
    }

    let mut cursor = 10usize;
    for (name, len) in NAMES.iter().zip(lengths) {
        let Some(raw) = payload.get(cursor..cursor + len) else {
            return;
        };
        cursor += len;
        let value = utf16le_string(raw);
        if !value.is_empty() {
            attrs.push((name.to_string(), value));
        }
    }
}

/// Count-prefixed descriptor list: UTF-16LE name, value type, value.
fn parse_extended_description(payload: &[u8], attrs: &mut Vec<(String, String)>) {
    let Some(count) = payload.get(..2) else {
        return;
    };
    let count = u16::from_le_bytes([count[0], count[1]]);

    let mut cursor = 2usize;
    for _ in 0..count {
        let Some(name_len) = read_u16(payload, cursor) else {
            return;
        };
        cursor += 2;
        let Some(name_raw) = payload.get(cursor..cursor + name_len as usize) else {
            return;
        };
        cursor += name_len as usize;
        let name = utf16le_string(name_raw);

        let (Some(value_type), Some(value_len)) =
            (read_u16(payload, cursor), read_u16(payload, cursor + 2))
        else {
            return;
        };
        cursor += 4;
        let Some(raw) = payload.get(cursor..cursor + value_len as usize) else {
            return;
        };
        cursor += value_len as usize;

        let value = match value_type {
            0 => utf16le_string(raw),
            2 if raw.len() >= 4 => {
                let b = u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]);
                (b != 0).to_string()
            }
            3 if raw.len() >= 4 => u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]).to_string(),
            4 if raw.len() >= 8 => {
                u64::from_le_bytes(raw[..8].try_into().expect("8 bytes")).to_string()
            }
            5 if raw.len() >= 2 => u16::from_le_bytes([raw[0], raw[1]]).to_string(),
            // Raw byte arrays carry no descriptive text.
            _ => continue,
        };
        if !name.is_empty() && !value.is_empty() {
            attrs.push((name, value));
        }
    }
}

fn read_u16(payload: &[u8], at: usize) -> Option<u16> {
    let raw = payload.get(at..at + 2)?;
    Some(u16::from_le_bytes([raw[0], raw[1]]))
}

/// Decode UTF-16LE, dropping the trailing NUL terminator.
fn utf16le_string(raw: &[u8]) -> String {
    let units: Vec<u16> = raw
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    let text: String = char::decode_utf16(units)
        .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect();
    text.trim_end_matches('\0').to_string()
}
