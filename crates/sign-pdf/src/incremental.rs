//! One incremental signing step
//!
//! Takes the bytes of the current revision and appends exactly one
//! incremental update containing the signature field (new or reused),
//! its visual stamp, the signature dictionary, and a classic xref
//! section chained to the previous one with /Prev. The input bytes are
//! the literal prefix of the output, so earlier signatures keep
//! covering exactly the bytes they were computed over.

use chrono::{DateTime, Utc};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use sign_crypto::SigningCredential;

use crate::error::PdfError;
use crate::fields::SignatureFieldRef;
use crate::stamp::{self, StampStyle};
use crate::writer;

/// Hex digits reserved for /Contents. A PKCS#7 with a moderate chain
/// fits in half of this.
const CONTENTS_HEX_LEN: usize = 16384;

/// Width-stable placeholder; the real values are patched in place and
/// space-padded to the same length.
const BYTERANGE_PLACEHOLDER: &str = "/ByteRange [0 0000000000 0000000000 0000000000]";

/// Where the new signature field goes.
#[derive(Debug, Clone)]
pub struct FieldPlacement<'a> {
    pub name: &'a str,
    /// (x0, y0, x1, y1) in page units.
    pub rect: (f64, f64, f64, f64),
}

/// Append one signed revision to `input`.
///
/// `doc` must be the parse of `input`. When `reuse` is given, the
/// existing unsigned widget is re-emitted with a value instead of a new
/// field being created; page, AcroForm and catalog then stay untouched.
pub fn sign_revision(
    input: &[u8],
    doc: &Document,
    placement: &FieldPlacement<'_>,
    reuse: Option<&SignatureFieldRef>,
    credential: &SigningCredential,
    style: &StampStyle,
    signing_time: DateTime<Utc>,
) -> Result<Vec<u8>, PdfError> {
    let root_id = doc
        .trailer
        .get(b"Root")
        .ok()
        .and_then(|r| r.as_reference().ok())
        .ok_or_else(|| PdfError::Parse("document has no Root".to_string()))?;
    let catalog = doc
        .get_dictionary(root_id)
        .map_err(|e| PdfError::Parse(e.to_string()))?;
    let page_id = *doc
        .get_pages()
        .values()
        .next()
        .ok_or_else(|| PdfError::Parse("document has no pages".to_string()))?;
    let prev_startxref = previous_startxref(input)?;

    let mut next_id = doc.max_id + 1;
    let mut alloc = || {
        let id = next_id;
        next_id += 1;
        id
    };

    // Stamp appearance for this step, rendered at this step's instant.
    let rect = reuse.map(|f| f.rect).unwrap_or(placement.rect);
    let (width, height) = (rect.2 - rect.0, rect.3 - rect.1);
    let image = stamp::prepare_image(&style.background)?;
    let rendered = style.render_text(
        &credential.signer_name(),
        &signing_time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    );

    let mut out = input.to_vec();
    if out.last() != Some(&b'\n') {
        out.push(b'\n');
    }
    let mut entries: Vec<(u32, u16, usize)> = Vec::new();

    // Background image XObject.
    let image_id = (alloc(), 0);
    writer::push_indirect(
        &mut out,
        &mut entries,
        image_id,
        &Object::Stream(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => image.width as i64,
                "Height" => image.height as i64,
                "ColorSpace" => image.color_space,
                "BitsPerComponent" => 8,
                "Filter" => image.filter,
            },
            image.data.clone(),
        )),
    );

    // Stamp text font.
    let font_id = (alloc(), 0);
    writer::push_indirect(
        &mut out,
        &mut entries,
        font_id,
        &Object::Dictionary(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        }),
    );

    // Appearance form XObject covering the field box.
    let appearance_id = (alloc(), 0);
    writer::push_indirect(
        &mut out,
        &mut entries,
        appearance_id,
        &Object::Stream(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Form",
                "BBox" => vec![
                    0.into(),
                    0.into(),
                    Object::Real(width as f32),
                    Object::Real(height as f32),
                ],
                "Resources" => dictionary! {
                    "XObject" => dictionary! { "Img0" => Object::Reference(image_id) },
                    "Font" => dictionary! { "Helv" => Object::Reference(font_id) },
                },
            },
            stamp::appearance_stream(&rendered, width, height),
        )),
    );

    // Signature dictionary. ByteRange and Contents are emitted as fixed
    // width placeholders and patched once the revision is complete.
    let sig_id = (alloc(), 0);
    let sig_offset = out.len();
    entries.push((sig_id.0, sig_id.1, sig_offset));
    let mut head = format!(
        "{} 0 obj\n<<\n/Type /Sig\n/Filter /Adobe.PPKLite\n/SubFilter /adbe.pkcs7.detached\n",
        sig_id.0
    );
    head.push_str(&format!(
        "/Name ({})\n/M (D:{}Z)\n",
        writer::escape_literal(&credential.signer_name()),
        signing_time.format("%Y%m%d%H%M%S")
    ));
    let byterange_at = out.len() + head.len();
    head.push_str(BYTERANGE_PLACEHOLDER);
    head.push_str("\n/Contents ");
    let contents_at = out.len() + head.len();
    out.extend_from_slice(head.as_bytes());
    out.push(b'<');
    out.resize(out.len() + CONTENTS_HEX_LEN, b'0');
    out.extend_from_slice(b">\n>>\nendobj\n");

    // Widget annotation: either brand new or the existing placeholder
    // re-emitted with its value and appearance filled in.
    let widget_id = reuse.map(|f| f.object_id).unwrap_or_else(|| (alloc(), 0));
    let widget_page = reuse.and_then(|f| f.page).unwrap_or(page_id);
    writer::push_indirect(
        &mut out,
        &mut entries,
        widget_id,
        &Object::Dictionary(dictionary! {
            "Type" => "Annot",
            "Subtype" => "Widget",
            "FT" => "Sig",
            "Rect" => vec![
                Object::Real(rect.0 as f32),
                Object::Real(rect.1 as f32),
                Object::Real(rect.2 as f32),
                Object::Real(rect.3 as f32),
            ],
            "T" => Object::String(placement.name.as_bytes().to_vec(), lopdf::StringFormat::Literal),
            "F" => 132,
            "P" => Object::Reference(widget_page),
            "V" => Object::Reference(sig_id),
            "AP" => dictionary! { "N" => Object::Reference(appearance_id) },
        }),
    );

    if reuse.is_none() {
        append_page_annotation(doc, &mut out, &mut entries, page_id, widget_id)?;
        append_form_field(
            doc,
            &mut out,
            &mut entries,
            catalog,
            root_id,
            widget_id,
            &mut alloc,
        )?;
    }

    // Cross-reference section and trailer for this revision.
    let size = next_id;
    let xref_offset = out.len();
    write_xref(&mut out, &mut entries);
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root {} {} R /Prev {} >>\nstartxref\n{}\n%%EOF\n",
            size, root_id.0, root_id.1, prev_startxref, xref_offset
        )
        .as_bytes(),
    );

    // Patch the ByteRange now that the revision length is known.
    let contents_end = contents_at + CONTENTS_HEX_LEN + 2;
    let byte_range = format!(
        "/ByteRange [0 {} {} {}]",
        contents_at,
        contents_end,
        out.len() - contents_end
    );
    if byte_range.len() > BYTERANGE_PLACEHOLDER.len() {
        return Err(PdfError::Write("ByteRange exceeds placeholder".to_string()));
    }
    let padded = format!(
        "{}{}",
        byte_range,
        " ".repeat(BYTERANGE_PLACEHOLDER.len() - byte_range.len())
    );
    out[byterange_at..byterange_at + padded.len()].copy_from_slice(padded.as_bytes());

    // Sign the two covered ranges and embed the PKCS#7 as hex.
    let mut to_sign = Vec::with_capacity(out.len() - CONTENTS_HEX_LEN);
    to_sign.extend_from_slice(&out[..contents_at]);
    to_sign.extend_from_slice(&out[contents_end..]);
    let signature = credential.sign_detached(&to_sign)?;
    let signature_hex = hex::encode(&signature);
    if signature_hex.len() > CONTENTS_HEX_LEN {
        return Err(PdfError::Write(format!(
            "signature needs {} hex digits, placeholder holds {}",
            signature_hex.len(),
            CONTENTS_HEX_LEN
        )));
    }
    out[contents_at + 1..contents_at + 1 + signature_hex.len()]
        .copy_from_slice(signature_hex.as_bytes());

    tracing::debug!(
        field = placement.name,
        reused = reuse.is_some(),
        revision_len = out.len(),
        "appended signed revision"
    );
    Ok(out)
}

/// Re-emit the page (or its Annots array) with the widget appended.
fn append_page_annotation(
    doc: &Document,
    out: &mut Vec<u8>,
    entries: &mut Vec<(u32, u16, usize)>,
    page_id: ObjectId,
    widget_id: ObjectId,
) -> Result<(), PdfError> {
    let mut page = doc
        .get_dictionary(page_id)
        .map_err(|e| PdfError::Parse(e.to_string()))?
        .clone();

    match page.get(b"Annots").ok().cloned() {
        // Indirect Annots array: re-emitting just the array leaves the
        // page object itself untouched.
        Some(Object::Reference(annots_id)) => {
            let mut annots = doc
                .get_object(annots_id)
                .and_then(|o| o.as_array())
                .map_err(|e| PdfError::Parse(e.to_string()))?
                .clone();
            annots.push(Object::Reference(widget_id));
            writer::push_indirect(out, entries, annots_id, &Object::Array(annots));
        }
        Some(Object::Array(mut annots)) => {
            annots.push(Object::Reference(widget_id));
            page.set("Annots", Object::Array(annots));
            writer::push_indirect(out, entries, page_id, &Object::Dictionary(page));
        }
        _ => {
            page.set("Annots", vec![Object::Reference(widget_id)]);
            writer::push_indirect(out, entries, page_id, &Object::Dictionary(page));
        }
    }
    Ok(())
}

/// Register the widget in the AcroForm, creating the form (and pointing
/// the catalog at it) when the document has none yet.
fn append_form_field(
    doc: &Document,
    out: &mut Vec<u8>,
    entries: &mut Vec<(u32, u16, usize)>,
    catalog: &Dictionary,
    root_id: ObjectId,
    widget_id: ObjectId,
    alloc: &mut impl FnMut() -> u32,
) -> Result<(), PdfError> {
    let updated_form = |form: &Dictionary| -> Dictionary {
        let mut fields = match form.get(b"Fields").ok() {
            Some(Object::Array(a)) => a.clone(),
            Some(Object::Reference(id)) => doc
                .get_object(*id)
                .ok()
                .and_then(|o| o.as_array().ok())
                .cloned()
                .unwrap_or_default(),
            _ => Vec::new(),
        };
        fields.push(Object::Reference(widget_id));
        let mut form = form.clone();
        form.set("Fields", fields);
        form.set("SigFlags", 3);
        form
    };

    match catalog.get(b"AcroForm").ok() {
        Some(Object::Reference(form_id)) => {
            let form = doc
                .get_dictionary(*form_id)
                .map_err(|e| PdfError::Parse(e.to_string()))?;
            writer::push_indirect(
                out,
                entries,
                *form_id,
                &Object::Dictionary(updated_form(form)),
            );
        }
        Some(Object::Dictionary(form)) => {
            // Inline form moves into its own object; the catalog is
            // re-emitted to reference it.
            let form_id = (alloc(), 0);
            writer::push_indirect(
                out,
                entries,
                form_id,
                &Object::Dictionary(updated_form(form)),
            );
            let mut catalog = catalog.clone();
            catalog.set("AcroForm", Object::Reference(form_id));
            writer::push_indirect(out, entries, root_id, &Object::Dictionary(catalog));
        }
        _ => {
            let form_id = (alloc(), 0);
            writer::push_indirect(
                out,
                entries,
                form_id,
                &Object::Dictionary(dictionary! {
                    "Fields" => vec![Object::Reference(widget_id)],
                    "SigFlags" => 3,
                }),
            );
            let mut catalog = catalog.clone();
            catalog.set("AcroForm", Object::Reference(form_id));
            writer::push_indirect(out, entries, root_id, &Object::Dictionary(catalog));
        }
    }
    Ok(())
}

/// Classic xref section with contiguous runs grouped into subsections.
fn write_xref(out: &mut Vec<u8>, entries: &mut Vec<(u32, u16, usize)>) {
    entries.sort_by_key(|(num, _, _)| *num);

    out.extend_from_slice(b"xref\n0 1\n0000000000 65535 f \n");
    let mut i = 0;
    while i < entries.len() {
        let mut run = 1;
        while i + run < entries.len() && entries[i + run].0 == entries[i].0 + run as u32 {
            run += 1;
        }
        out.extend_from_slice(format!("{} {}\n", entries[i].0, run).as_bytes());
        for (_, gen, offset) in &entries[i..i + run] {
            out.extend_from_slice(format!("{:010} {:05} n \n", offset, gen).as_bytes());
        }
        i += run;
    }
}

/// Offset of the previous revision's xref, taken from the last
/// `startxref` in the input bytes.
fn previous_startxref(input: &[u8]) -> Result<usize, PdfError> {
    let marker = b"startxref";
    let pos = input
        .windows(marker.len())
        .rposition(|w| w == marker)
        .ok_or_else(|| PdfError::Parse("document has no startxref".to_string()))?;
    let tail = &input[pos + marker.len()..];
    let digits: String = tail
        .iter()
        .map(|&b| b as char)
        .skip_while(|c| c.is_whitespace())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits
        .parse()
        .map_err(|_| PdfError::Parse("malformed startxref offset".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn finds_last_startxref_offset() {
        let bytes = b"%PDF-1.7\n...startxref\n123\n%%EOF\nstartxref\n4567\n%%EOF\n";
        assert_eq!(previous_startxref(bytes).unwrap(), 4567);
    }

    #[test]
    fn missing_startxref_is_parse_error() {
        assert!(matches!(
            previous_startxref(b"no trailer here"),
            Err(PdfError::Parse(_))
        ));
    }

    #[test]
    fn xref_groups_contiguous_runs() {
        let mut out = Vec::new();
        let mut entries = vec![(7, 0, 10), (5, 0, 20), (6, 0, 30), (12, 0, 40)];
        write_xref(&mut out, &mut entries);
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("xref\n0 1\n0000000000 65535 f \n"));
        assert!(text.contains("5 3\n"));
        assert!(text.contains("12 1\n"));
    }
}
