//! Signature field enumeration
//!
//! Walks Catalog -> AcroForm -> Fields of a parsed revision and reports
//! every signature field by name, together with whether it already holds
//! a signature value. The pipeline consults this before each field-add
//! step to decide between creating a field and reusing a placeholder.

use lopdf::{Dictionary, Document, Object, ObjectId};

/// An existing signature field found in the current revision.
#[derive(Debug, Clone)]
pub struct SignatureFieldRef {
    pub object_id: ObjectId,
    pub name: String,
    pub rect: (f64, f64, f64, f64),
    /// Page the widget is placed on, when the field records one.
    pub page: Option<ObjectId>,
    /// True when the field already carries a signature value (/V).
    pub signed: bool,
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        other => other,
    }
}

fn acro_form(doc: &Document) -> Option<&Dictionary> {
    let catalog = doc.catalog().ok()?;
    let form = catalog.get(b"AcroForm").ok()?;
    resolve(doc, form).as_dict().ok()
}

fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(*r as f64),
        _ => None,
    }
}

fn field_rect(dict: &Dictionary) -> (f64, f64, f64, f64) {
    let coords: Vec<f64> = dict
        .get(b"Rect")
        .ok()
        .and_then(|r| r.as_array().ok())
        .map(|arr| arr.iter().filter_map(number).collect())
        .unwrap_or_default();
    match coords.as_slice() {
        [x0, y0, x1, y1] => (*x0, *y0, *x1, *y1),
        _ => (0.0, 0.0, 0.0, 0.0),
    }
}

/// All signature fields of the revision, in Fields-array order.
pub fn signature_fields(doc: &Document) -> Vec<SignatureFieldRef> {
    let mut found = Vec::new();
    let Some(form) = acro_form(doc) else {
        return found;
    };
    let Some(entries) = form
        .get(b"Fields")
        .ok()
        .and_then(|f| resolve(doc, f).as_array().ok())
    else {
        return found;
    };

    for entry in entries {
        let Object::Reference(object_id) = entry else {
            continue;
        };
        let Ok(dict) = doc.get_dictionary(*object_id) else {
            continue;
        };
        let is_signature = dict
            .get(b"FT")
            .ok()
            .and_then(|ft| ft.as_name().ok())
            .map(|ft| ft == b"Sig")
            .unwrap_or(false);
        if !is_signature {
            continue;
        }
        let Some(name) = dict.get(b"T").ok().and_then(|t| match resolve(doc, t) {
            Object::String(bytes, _) => Some(String::from_utf8_lossy(bytes).into_owned()),
            _ => None,
        }) else {
            continue;
        };

        let page = dict.get(b"P").ok().and_then(|p| p.as_reference().ok());

        found.push(SignatureFieldRef {
            object_id: *object_id,
            name,
            rect: field_rect(dict),
            page,
            signed: dict.has(b"V"),
        });
    }
    found
}

/// Names of all signature fields in the revision.
pub fn enumerate_signature_fields(doc: &Document) -> Vec<String> {
    signature_fields(doc).into_iter().map(|f| f.name).collect()
}

/// Look up one signature field by its exact name.
pub fn find_signature_field(doc: &Document, name: &str) -> Option<SignatureFieldRef> {
    signature_fields(doc).into_iter().find(|f| f.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;
    use pretty_assertions::assert_eq;

    /// One-page document with an AcroForm holding the given signature
    /// fields; `signed` fields get a dummy /V.
    fn doc_with_fields(fields: &[(&str, bool)]) -> Document {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(pages_id),
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(page_id)],
                "Count" => 1,
            }),
        );

        let mut refs = Vec::new();
        for (name, signed) in fields {
            let mut dict = dictionary! {
                "Type" => "Annot",
                "Subtype" => "Widget",
                "FT" => "Sig",
                "Rect" => vec![
                    50.into(), 70.into(), 250.into(), 130.into(),
                ],
                "T" => Object::String(name.as_bytes().to_vec(), lopdf::StringFormat::Literal),
                "P" => Object::Reference(page_id),
            };
            if *signed {
                let value_id = doc.add_object(dictionary! { "Type" => "Sig" });
                dict.set("V", Object::Reference(value_id));
            }
            refs.push(Object::Reference(doc.add_object(dict)));
        }

        let form_id = doc.add_object(dictionary! {
            "Fields" => refs,
            "SigFlags" => 3,
        });
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(pages_id),
            "AcroForm" => Object::Reference(form_id),
        });
        doc.trailer.set("Root", Object::Reference(catalog_id));
        doc
    }

    #[test]
    fn empty_document_has_no_fields() {
        let doc = doc_with_fields(&[]);
        assert_eq!(enumerate_signature_fields(&doc), Vec::<String>::new());
    }

    #[test]
    fn enumerates_fields_in_order() {
        let doc = doc_with_fields(&[("InchargeSignature1", false), ("InchargeSignature2", true)]);
        assert_eq!(
            enumerate_signature_fields(&doc),
            vec!["InchargeSignature1", "InchargeSignature2"]
        );
    }

    #[test]
    fn reports_signed_state_and_rect() {
        let doc = doc_with_fields(&[("InchargeSignature1", false)]);
        let field = find_signature_field(&doc, "InchargeSignature1").unwrap();
        assert!(!field.signed);
        assert_eq!(field.rect, (50.0, 70.0, 250.0, 130.0));
        assert!(field.page.is_some());

        let doc = doc_with_fields(&[("InchargeSignature1", true)]);
        let field = find_signature_field(&doc, "InchargeSignature1").unwrap();
        assert!(field.signed);
    }

    #[test]
    fn lookup_misses_unknown_name() {
        let doc = doc_with_fields(&[("OwnerSignature1", false)]);
        assert!(find_signature_field(&doc, "OwnerSignature2").is_none());
    }
}
