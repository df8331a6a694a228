//! Object-stream serialization
//!
//! Writes a PDF 1.5+ file where every non-stream object with generation 0
//! is packed into Flate-compressed object streams and the cross-reference
//! table is itself a compressed stream. Visual content is unchanged; only
//! the file structure gets smaller.

use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::{Dictionary, Object, StringFormat};

use crate::error::Result;

/// Objects packed into one object stream
const OBJECTS_PER_STREAM: usize = 100;

/// Byte widths of the xref stream fields: type, offset/stream, generation/index
const XREF_WIDTHS: [usize; 3] = [1, 4, 2];

const HEADER: &[u8] = b"%PDF-1.7\n%\xE2\xE3\xCF\xD3\n";

/// Trailer entries carried into the xref stream dictionary
const TRAILER_KEYS: [&[u8]; 3] = [b"Root", b"Info", b"ID"];

#[derive(Debug, Clone, Copy)]
enum XrefEntry {
    Free,
    Direct { offset: usize, generation: u16 },
    Packed { stream: u32, index: usize },
}

pub(crate) fn write_compact(doc: &lopdf::Document) -> Result<Vec<u8>> {
    let (packable, direct): (Vec<_>, Vec<_>) = doc
        .objects
        .iter()
        .partition(|(id, object)| id.1 == 0 && !matches!(object, Object::Stream(_)));

    let mut next_id = doc.objects.keys().map(|id| id.0).max().unwrap_or(0).max(doc.max_id) + 1;
    let mut entries: Vec<(u32, XrefEntry)> = Vec::with_capacity(doc.objects.len() + 8);
    let mut out = Vec::with_capacity(64 * 1024);
    out.extend_from_slice(HEADER);

    for (&(number, generation), object) in direct {
        entries.push((
            number,
            XrefEntry::Direct {
                offset: out.len(),
                generation,
            },
        ));
        writeln!(out, "{} {} obj", number, generation)?;
        write_object(&mut out, object)?;
        out.extend_from_slice(b"\nendobj\n");
    }

    for chunk in packable.chunks(OBJECTS_PER_STREAM) {
        let stream_number = next_id;
        next_id += 1;

        let mut offsets = Vec::new();
        let mut body = Vec::new();
        for (index, &(&(number, _), object)) in chunk.iter().enumerate() {
            write!(offsets, "{} {} ", number, body.len())?;
            write_object(&mut body, object)?;
            body.push(b'\n');
            entries.push((
                number,
                XrefEntry::Packed {
                    stream: stream_number,
                    index,
                },
            ));
        }

        let first = offsets.len();
        offsets.extend_from_slice(&body);
        let data = deflate(&offsets)?;

        entries.push((
            stream_number,
            XrefEntry::Direct {
                offset: out.len(),
                generation: 0,
            },
        ));
        let mut dict = Dictionary::new();
        dict.set("Type", Object::Name(b"ObjStm".to_vec()));
        dict.set("N", chunk.len() as i64);
        dict.set("First", first as i64);
        dict.set("Filter", Object::Name(b"FlateDecode".to_vec()));
        write_stream_object(&mut out, stream_number, dict, &data)?;
    }

    let xref_number = next_id;
    let xref_offset = out.len();
    entries.push((
        xref_number,
        XrefEntry::Direct {
            offset: xref_offset,
            generation: 0,
        },
    ));

    let size = xref_number + 1;
    let mut table = vec![XrefEntry::Free; size as usize];
    for (number, entry) in entries {
        table[number as usize] = entry;
    }
    let data = deflate(&encode_xref_rows(&table))?;

    let mut dict = Dictionary::new();
    dict.set("Type", Object::Name(b"XRef".to_vec()));
    dict.set("Size", size as i64);
    dict.set(
        "W",
        XREF_WIDTHS
            .iter()
            .map(|&w| Object::Integer(w as i64))
            .collect::<Vec<_>>(),
    );
    dict.set("Index", vec![Object::Integer(0), Object::Integer(size as i64)]);
    for key in TRAILER_KEYS {
        if let Ok(value) = doc.trailer.get(key) {
            dict.set(key.to_vec(), value.clone());
        }
    }
    dict.set("Filter", Object::Name(b"FlateDecode".to_vec()));
    write_stream_object(&mut out, xref_number, dict, &data)?;

    write!(out, "startxref\n{}\n%%EOF\n", xref_offset)?;
    Ok(out)
}

fn encode_xref_rows(table: &[XrefEntry]) -> Vec<u8> {
    let row_len: usize = XREF_WIDTHS.iter().sum();
    let mut rows = Vec::with_capacity(table.len() * row_len);
    for (number, entry) in table.iter().enumerate() {
        let (kind, field2, field3) = match *entry {
            // Object 0 heads the free list with generation 65535
            XrefEntry::Free if number == 0 => (0u64, 0u64, 0xFFFFu64),
            XrefEntry::Free => (0, 0, 0),
            XrefEntry::Direct { offset, generation } => (1, offset as u64, generation as u64),
            XrefEntry::Packed { stream, index } => (2, stream as u64, index as u64),
        };
        for (value, width) in [kind, field2, field3].into_iter().zip(XREF_WIDTHS) {
            rows.extend_from_slice(&value.to_be_bytes()[8 - width..]);
        }
    }
    rows
}

fn deflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

fn write_stream_object(out: &mut Vec<u8>, number: u32, mut dict: Dictionary, data: &[u8]) -> Result<()> {
    dict.set("Length", data.len() as i64);
    writeln!(out, "{} 0 obj", number)?;
    write_dictionary(out, &dict)?;
    out.extend_from_slice(b"\nstream\n");
    out.extend_from_slice(data);
    out.extend_from_slice(b"\nendstream\nendobj\n");
    Ok(())
}

fn write_object(out: &mut Vec<u8>, object: &Object) -> std::io::Result<()> {
    match object {
        Object::Null => out.write_all(b"null"),
        Object::Boolean(b) => write!(out, "{}", b),
        Object::Integer(i) => write!(out, "{}", i),
        Object::Real(r) => write_real(out, *r),
        Object::Name(name) => write_name(out, name),
        Object::String(bytes, format) => write_string(out, bytes, *format),
        Object::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b' ');
                }
                write_object(out, item)?;
            }
            out.write_all(b"]")
        }
        Object::Dictionary(dict) => write_dictionary(out, dict),
        Object::Stream(stream) => {
            let mut dict = stream.dict.clone();
            dict.set("Length", stream.content.len() as i64);
            write_dictionary(out, &dict)?;
            out.write_all(b"\nstream\n")?;
            out.write_all(&stream.content)?;
            out.write_all(b"\nendstream")
        }
        Object::Reference((number, generation)) => write!(out, "{} {} R", number, generation),
    }
}

fn write_dictionary(out: &mut Vec<u8>, dict: &Dictionary) -> std::io::Result<()> {
    out.write_all(b"<<")?;
    for (key, value) in dict.iter() {
        write_name(out, key)?;
        out.push(b' ');
        write_object(out, value)?;
    }
    out.write_all(b">>")
}

/// Fixed-point, no exponent, trailing zeros trimmed
fn write_real(out: &mut Vec<u8>, value: f32) -> std::io::Result<()> {
    if !value.is_finite() {
        return out.write_all(b"0");
    }
    if value.fract() == 0.0 && value.abs() < 1e15 {
        return write!(out, "{}", value as i64);
    }
    let formatted = format!("{:.5}", value);
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    match trimmed {
        "" | "-" | "-0" => out.write_all(b"0"),
        other => out.write_all(other.as_bytes()),
    }
}

fn write_name(out: &mut Vec<u8>, name: &[u8]) -> std::io::Result<()> {
    out.push(b'/');
    for &byte in name {
        let regular = (0x21..=0x7E).contains(&byte)
            && !matches!(
                byte,
                b'#' | b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
            );
        if regular {
            out.push(byte);
        } else {
            write!(out, "#{:02X}", byte)?;
        }
    }
    Ok(())
}

fn write_string(out: &mut Vec<u8>, bytes: &[u8], format: StringFormat) -> std::io::Result<()> {
    let printable = bytes
        .iter()
        .all(|&b| matches!(b, b'\n' | b'\r' | b'\t') || (0x20..=0x7E).contains(&b));

    if format == StringFormat::Hexadecimal || !printable {
        out.push(b'<');
        for byte in bytes {
            write!(out, "{:02X}", byte)?;
        }
        return out.write_all(b">");
    }

    out.push(b'(');
    for &byte in bytes {
        match byte {
            b'(' => out.write_all(b"\\(")?,
            b')' => out.write_all(b"\\)")?,
            b'\\' => out.write_all(b"\\\\")?,
            b'\n' => out.write_all(b"\\n")?,
            b'\r' => out.write_all(b"\\r")?,
            b'\t' => out.write_all(b"\\t")?,
            _ => out.push(byte),
        }
    }
    out.write_all(b")")
}
