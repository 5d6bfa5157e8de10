//! Serialization of parsed objects back into PDF syntax
//!
//! Incremental updates re-emit a handful of existing objects (page,
//! AcroForm, catalog, a reused widget) alongside the new ones. lopdf's
//! writer only saves whole documents, so this module renders single
//! objects instead.

use lopdf::{Dictionary, Object, ObjectId};

/// Append an indirect object and return its byte offset.
pub fn push_indirect(
    out: &mut Vec<u8>,
    entries: &mut Vec<(u32, u16, usize)>,
    id: ObjectId,
    obj: &Object,
) -> usize {
    let offset = out.len();
    entries.push((id.0, id.1, offset));
    out.extend_from_slice(format!("{} {} obj\n", id.0, id.1).as_bytes());
    serialize_object(out, obj);
    out.extend_from_slice(b"\nendobj\n");
    offset
}

pub fn serialize_object(out: &mut Vec<u8>, obj: &Object) {
    match obj {
        Object::Null => out.extend_from_slice(b"null"),
        Object::Boolean(b) => out.extend_from_slice(if *b { b"true" } else { b"false" }),
        Object::Integer(i) => out.extend_from_slice(i.to_string().as_bytes()),
        Object::Real(r) => out.extend_from_slice(format_real(*r).as_bytes()),
        Object::Name(name) => write_name(out, name),
        // Strings are re-emitted hexadecimal; that is valid for any byte
        // content and sidesteps literal-string escaping.
        Object::String(bytes, _) => {
            out.push(b'<');
            out.extend_from_slice(hex::encode_upper(bytes).as_bytes());
            out.push(b'>');
        }
        Object::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b' ');
                }
                serialize_object(out, item);
            }
            out.push(b']');
        }
        Object::Dictionary(dict) => serialize_dictionary(out, dict),
        Object::Stream(stream) => {
            serialize_dictionary(out, &stream.dict);
            out.extend_from_slice(b"\nstream\n");
            out.extend_from_slice(&stream.content);
            out.extend_from_slice(b"\nendstream");
        }
        Object::Reference((num, gen)) => {
            out.extend_from_slice(format!("{} {} R", num, gen).as_bytes());
        }
    }
}

pub fn serialize_dictionary(out: &mut Vec<u8>, dict: &Dictionary) {
    out.extend_from_slice(b"<<");
    for (key, value) in dict.iter() {
        out.push(b' ');
        write_name(out, key);
        out.push(b' ');
        serialize_object(out, value);
    }
    out.extend_from_slice(b" >>");
}

fn write_name(out: &mut Vec<u8>, name: &[u8]) {
    out.push(b'/');
    for &b in name {
        let delimiter = matches!(
            b,
            b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%' | b'#'
        );
        if delimiter || b <= b' ' || b > b'~' {
            out.extend_from_slice(format!("#{:02X}", b).as_bytes());
        } else {
            out.push(b);
        }
    }
}

/// Reals must stay decimal; PDF has no exponent notation.
fn format_real(value: f32) -> String {
    let mut s = format!("{:.4}", value);
    while s.ends_with('0') {
        s.pop();
    }
    if s.ends_with('.') {
        s.pop();
    }
    s
}

/// Escape a string for emission as a PDF literal string `(...)`.
/// Non-ASCII characters fall back to `?`; the stamp font is
/// WinAnsi-encoded and cannot carry arbitrary Unicode.
pub fn escape_literal(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '(' | ')' | '\\' => {
                escaped.push('\\');
                escaped.push(c);
            }
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            c if c.is_ascii() => escaped.push(c),
            _ => escaped.push('?'),
        }
    }
    escaped
}
