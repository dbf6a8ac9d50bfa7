use crate::error::WatermarkError;
use crate::geometry::paged_placements;
use crate::logo::WatermarkLogo;
use docmark_core::models::WatermarkSpec;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use std::io::Write;

/// US Letter, used when no MediaBox is found anywhere in the page tree.
const DEFAULT_MEDIA_BOX: [f32; 4] = [0.0, 0.0, 612.0, 792.0];
/// Guard against cycles in malformed page trees.
const MAX_TREE_DEPTH: usize = 32;

const XOBJECT_NAME_PREFIX: &str = "DocmarkWm";
const EXTGSTATE_NAME_PREFIX: &str = "DocmarkGs";

pub struct PagedWatermark;

impl PagedWatermark {
    /// Watermark every page of a PDF. Page count, order and sizes are kept.
    pub fn apply(
        input: &[u8],
        logo: &WatermarkLogo,
        spec: &WatermarkSpec,
    ) -> Result<Vec<u8>, WatermarkError> {
        let start = std::time::Instant::now();

        let mut doc = Document::load_mem(input).map_err(corrupt)?;
        if doc.is_encrypted() {
            return Err(WatermarkError::CorruptDocument(
                "encrypted documents are not supported".to_string(),
            ));
        }

        let pages = doc.get_pages();
        if pages.is_empty() {
            return Err(WatermarkError::CorruptDocument(
                "document has no pages".to_string(),
            ));
        }

        let xobject_id = embed_logo(&mut doc, logo)?;
        let gs_id = doc.add_object(dictionary! {
            "Type" => "ExtGState",
            "ca" => Object::Real(spec.opacity),
            "CA" => Object::Real(spec.opacity),
        });

        let (logo_w, logo_h) = logo.dimensions();
        for &page_id in pages.values() {
            stamp_page(&mut doc, page_id, xobject_id, gs_id, (logo_w, logo_h), spec)?;
        }

        let mut output = Vec::new();
        doc.save_to(&mut output).map_err(|e| WatermarkError::Encode(e.to_string()))?;

        tracing::debug!(
            pages = pages.len(),
            input_bytes = input.len(),
            output_bytes = output.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Paged watermark applied"
        );

        Ok(output)
    }
}

fn corrupt(err: lopdf::Error) -> WatermarkError {
    WatermarkError::CorruptDocument(err.to_string())
}

fn stamp_page(
    doc: &mut Document,
    page_id: ObjectId,
    xobject_id: ObjectId,
    gs_id: ObjectId,
    (logo_w, logo_h): (u32, u32),
    spec: &WatermarkSpec,
) -> Result<(), WatermarkError> {
    let [llx, lly, urx, ury] = effective_media_box(doc, page_id);
    let (page_w, page_h) = (urx - llx, ury - lly);
    let (mark_w, mark_h) = spec.size.resolve(logo_w, logo_h, page_w, page_h);

    let mut resources = effective_resources(doc, page_id)?;
    let wm_name = add_named_resource(doc, &mut resources, b"XObject", XOBJECT_NAME_PREFIX, xobject_id)?;
    let gs_name = add_named_resource(doc, &mut resources, b"ExtGState", EXTGSTATE_NAME_PREFIX, gs_id)?;

    let mut overlay = vec![Operation::new("Q", vec![])];
    for (x, y) in paged_placements(page_w, page_h, mark_w, mark_h, spec.placement, spec.spacing) {
        overlay.extend([
            Operation::new("q", vec![]),
            Operation::new("gs", vec![Object::Name(gs_name.clone())]),
            Operation::new(
                "cm",
                vec![
                    Object::Real(mark_w),
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(mark_h),
                    Object::Real(llx + x),
                    Object::Real(lly + y),
                ],
            ),
            Operation::new("Do", vec![Object::Name(wm_name.clone())]),
            Operation::new("Q", vec![]),
        ]);
    }

    let prefix = Content {
        operations: vec![Operation::new("q", vec![])],
    };
    let suffix = Content { operations: overlay };
    let prefix_id = doc.add_object(Stream::new(dictionary! {}, prefix.encode().map_err(corrupt)?));
    let suffix_id = doc.add_object(Stream::new(dictionary! {}, suffix.encode().map_err(corrupt)?));

    let mut contents = vec![Object::Reference(prefix_id)];
    contents.extend(existing_contents(doc, page_id)?);
    contents.push(Object::Reference(suffix_id));

    let page = doc
        .get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(corrupt)?;
    page.set("Resources", Object::Dictionary(resources));
    page.set("Contents", Object::Array(contents));
    Ok(())
}

/// Logo as an RGB image XObject with its alpha channel in an SMask.
fn embed_logo(doc: &mut Document, logo: &WatermarkLogo) -> Result<ObjectId, WatermarkError> {
    let image = logo.image();
    let (width, height) = image.dimensions();
    let pixel_count = (width as usize) * (height as usize);

    let mut rgb = Vec::with_capacity(pixel_count * 3);
    let mut alpha = Vec::with_capacity(pixel_count);
    for pixel in image.pixels() {
        rgb.extend_from_slice(&pixel.0[..3]);
        alpha.push(pixel.0[3]);
    }

    let smask_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => i64::from(width),
            "Height" => i64::from(height),
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => 8,
            "Filter" => "FlateDecode",
        },
        deflate(&alpha)?,
    ));

    Ok(doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => i64::from(width),
            "Height" => i64::from(height),
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => "FlateDecode",
            "SMask" => smask_id,
        },
        deflate(&rgb)?,
    )))
}

fn deflate(data: &[u8]) -> Result<Vec<u8>, WatermarkError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .and_then(|_| encoder.finish())
        .map_err(|e| WatermarkError::Encode(e.to_string()))
}

/// Follow references until a direct object is reached.
fn resolve<'a>(doc: &'a Document, mut obj: &'a Object) -> Option<&'a Object> {
    for _ in 0..MAX_TREE_DEPTH {
        match obj {
            Object::Reference(id) => obj = doc.get_object(*id).ok()?,
            other => return Some(other),
        }
    }
    None
}

/// An inheritable page attribute, looked up through the `Parent` chain.
fn inherited_attribute<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut node = doc.get_object(page_id).ok()?.as_dict().ok()?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = node.get(key) {
            return resolve(doc, value);
        }
        let parent = node.get(b"Parent").ok()?;
        node = resolve(doc, parent)?.as_dict().ok()?;
    }
    None
}

fn as_number(doc: &Document, obj: &Object) -> Option<f32> {
    match resolve(doc, obj)? {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// `[llx, lly, urx, ury]` of the page, normalized so `ll < ur`.
pub(crate) fn effective_media_box(doc: &Document, page_id: ObjectId) -> [f32; 4] {
    let parsed = inherited_attribute(doc, page_id, b"MediaBox")
        .and_then(|obj| obj.as_array().ok())
        .filter(|values| values.len() == 4)
        .and_then(|values| {
            let nums: Option<Vec<f32>> = values.iter().map(|v| as_number(doc, v)).collect();
            nums
        });

    match parsed {
        Some(n) => [
            n[0].min(n[2]),
            n[1].min(n[3]),
            n[0].max(n[2]),
            n[1].max(n[3]),
        ],
        None => DEFAULT_MEDIA_BOX,
    }
}

/// The page's resources as an owned dictionary, inherited if needed.
fn effective_resources(doc: &Document, page_id: ObjectId) -> Result<Dictionary, WatermarkError> {
    match inherited_attribute(doc, page_id, b"Resources") {
        None => Ok(Dictionary::new()),
        Some(Object::Dictionary(dict)) => Ok(dict.clone()),
        Some(_) => Err(WatermarkError::CorruptDocument(
            "page resources are not a dictionary".to_string(),
        )),
    }
}

/// Register `target` in the `category` sub-dictionary under a fresh name.
fn add_named_resource(
    doc: &Document,
    resources: &mut Dictionary,
    category: &[u8],
    prefix: &str,
    target: ObjectId,
) -> Result<Vec<u8>, WatermarkError> {
    let mut entries = match resources.get(category).ok().and_then(|o| resolve(doc, o)) {
        None => Dictionary::new(),
        Some(Object::Dictionary(dict)) => dict.clone(),
        Some(_) => {
            return Err(WatermarkError::CorruptDocument(format!(
                "/{} resource is not a dictionary",
                String::from_utf8_lossy(category)
            )))
        }
    };

    let name = (0..)
        .map(|i| format!("{}{}", prefix, i).into_bytes())
        .find(|candidate| !entries.has(candidate))
        .unwrap_or_else(|| prefix.as_bytes().to_vec());

    entries.set(name.clone(), Object::Reference(target));
    resources.set(category.to_vec(), Object::Dictionary(entries));
    Ok(name)
}

/// Existing content stream references of a page, in drawing order.
fn existing_contents(doc: &Document, page_id: ObjectId) -> Result<Vec<Object>, WatermarkError> {
    let page = doc
        .get_object(page_id)
        .and_then(Object::as_dict)
        .map_err(corrupt)?;

    let Ok(contents) = page.get(b"Contents") else {
        return Ok(Vec::new());
    };

    match contents {
        Object::Reference(id) => match doc.get_object(*id).map_err(corrupt)? {
            // Indirect array of streams
            Object::Array(items) => Ok(items.clone()),
            _ => Ok(vec![Object::Reference(*id)]),
        },
        Object::Array(items) => Ok(items.clone()),
        Object::Null => Ok(Vec::new()),
        _ => Err(WatermarkError::CorruptDocument(
            "page contents are neither a stream nor an array".to_string(),
        )),
    }
}
