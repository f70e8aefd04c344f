//! lopdf-backed page source and part builder.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::Path;
use std::sync::Arc;

use lopdf::{dictionary, Dictionary, Document as LopdfDocument, Object, ObjectId};

use crate::detect::{detect_format_from_bytes, detect_format_from_path};
use crate::error::{Error, Result};
use crate::options::MeasureMode;

use super::scratch::Scratch;
use super::{PageSource, PartBuilder};

/// A page of a loaded PDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PdfPage {
    /// 1-indexed page number in the source document
    pub number: u32,
    /// Page object id
    pub id: ObjectId,
}

/// A decoded PDF document, shared read-only by every builder of one run.
pub struct PdfSource {
    doc: Arc<LopdfDocument>,
    pages: Vec<PdfPage>,
    name: String,
    measure: MeasureMode,
}

impl PdfSource {
    /// Load from a file path.
    ///
    /// Load failures are reported with the path of the document.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        Self::load_path(path).map_err(|e| e.in_document(&path.display().to_string()))
    }

    fn load_path(path: &Path) -> Result<Self> {
        detect_format_from_path(path).map_err(|e| match e {
            Error::IoAt { source, .. } if source.kind() == std::io::ErrorKind::NotFound => {
                Error::NotFound(path.to_path_buf())
            }
            other => other,
        })?;

        let doc = LopdfDocument::load(path).map_err(|e| match e {
            lopdf::Error::IO(io) => Error::io_at(path, io),
            other => Error::from(other),
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::from_document(doc, name)
    }

    /// Load from an in-memory byte slice.
    pub fn from_bytes(data: &[u8], name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        detect_format_from_bytes(data).map_err(|e| e.in_document(&name))?;
        let doc = LopdfDocument::load_mem(data).map_err(|e| Error::from(e).in_document(&name))?;
        Self::from_document(doc, name)
    }

    /// Load from a reader.
    pub fn from_reader<R: Read>(mut reader: R, name: impl Into<String>) -> Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::from_bytes(&data, name)
    }

    /// Wrap an already decoded document.
    pub fn from_document(doc: LopdfDocument, name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if doc.is_encrypted() {
            return Err(Error::Encrypted.in_document(&name));
        }
        let pages = doc
            .get_pages()
            .into_iter()
            .map(|(number, id)| PdfPage { number, id })
            .collect::<Vec<_>>();
        log::debug!("Loaded {} ({} pages, PDF {})", name, pages.len(), doc.version);

        Ok(Self {
            doc: Arc::new(doc),
            pages,
            name,
            measure: MeasureMode::default(),
        })
    }

    /// Choose where builders serialize when measuring.
    pub fn with_measure_mode(mut self, mode: MeasureMode) -> Self {
        self.measure = mode;
        self
    }

    /// PDF version string of the source.
    pub fn version(&self) -> &str {
        &self.doc.version
    }

    /// Direct access to the underlying `lopdf::Document`.
    pub fn raw_doc(&self) -> &LopdfDocument {
        &self.doc
    }
}

impl PageSource for PdfSource {
    type Page = PdfPage;
    type Builder = PdfPartBuilder;

    fn name(&self) -> &str {
        &self.name
    }

    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_at(&self, index: usize) -> Result<PdfPage> {
        self.pages
            .get(index)
            .copied()
            .ok_or(Error::PageOutOfRange(index, self.pages.len()))
    }

    fn new_builder(&self) -> Result<PdfPartBuilder> {
        Ok(PdfPartBuilder {
            doc: Arc::clone(&self.doc),
            pages: Vec::new(),
            scratch: Scratch::new(&self.measure)?,
            measured: None,
        })
    }
}

/// Builds one part from the objects its pages reach.
///
/// Page content, fonts and images are written as they are in the source;
/// nothing is re-encoded. Objects shared by several held pages are written
/// once.
pub struct PdfPartBuilder {
    doc: Arc<LopdfDocument>,
    pages: Vec<PdfPage>,
    scratch: Scratch,
    /// (page count, bytes) of the last measurement
    measured: Option<(usize, u64)>,
}

impl PdfPartBuilder {
    /// Page numbers held, in order.
    pub fn page_numbers(&self) -> Vec<u32> {
        self.pages.iter().map(|p| p.number).collect()
    }
}

impl PartBuilder for PdfPartBuilder {
    type Page = PdfPage;

    fn append(&mut self, page: PdfPage) {
        self.pages.push(page);
    }

    fn measure(&mut self) -> Result<u64> {
        if let Some((count, bytes)) = self.measured {
            if count == self.pages.len() {
                return Ok(bytes);
            }
        }
        let (doc, pages) = (&self.doc, &self.pages);
        let bytes = self.scratch.measure(|out| render_subset(doc, pages, out))?;
        self.measured = Some((self.pages.len(), bytes));
        Ok(bytes)
    }

    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn finalize(self) -> Result<Vec<u8>> {
        let mut content = Vec::new();
        render_subset(&self.doc, &self.pages, &mut content)?;
        Ok(content)
    }
}

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITED: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Serialize the given pages of `source` as a standalone document.
///
/// Only objects reachable from the held pages and the document Info
/// dictionary are copied, and they are renumbered densely, so the work is
/// proportional to the part rather than to the source. `Parent` links are
/// not followed: each page gets its inherited attributes copied in and
/// hangs off a fresh page tree root. References to objects outside the part,
/// such as link targets on other pages, become null.
fn render_subset<W: Write + ?Sized>(
    source: &LopdfDocument,
    pages: &[PdfPage],
    out: &mut W,
) -> Result<()> {
    let pages_id: ObjectId = (1, 0);
    let catalog_id: ObjectId = (2, 0);
    let mut subset = Subset::new(source, 3);

    let mut held = Vec::with_capacity(pages.len());
    for page in pages {
        let mut dict = source.get_dictionary(page.id)?.clone();
        inherit_attributes(source, &mut dict);
        dict.remove(b"Parent");
        let id = subset.assign(page.id);
        held.push((id, dict));
    }
    for (_, dict) in &held {
        for (_, value) in dict.iter() {
            subset.discover(value);
        }
    }
    let info = source.trailer.get(b"Info").ok();
    if let Some(info) = info {
        subset.discover(info);
    }

    let mut doc = LopdfDocument::with_version(source.version.clone());
    let mut kids: Vec<Object> = Vec::with_capacity(held.len());
    for (id, dict) in &held {
        let mut page = subset.remap_dictionary(dict);
        page.set("Parent", pages_id);
        doc.objects.insert(*id, Object::Dictionary(page));
        kids.push((*id).into());
    }
    for (old, new) in &subset.copied {
        if let Some(object) = source.objects.get(old) {
            doc.objects.insert(*new, subset.remap(object));
        }
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => held.len() as i64,
        }),
    );
    doc.objects.insert(
        catalog_id,
        Object::Dictionary(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        }),
    );
    doc.max_id = subset.next - 1;
    doc.trailer.set("Root", catalog_id);
    if let Some(info) = info {
        doc.trailer.set("Info", subset.remap(info));
    }

    let mut out = out;
    doc.save_to(&mut out).map_err(Error::Io)
}

/// Objects of the source copied into one part, with their new ids.
struct Subset<'a> {
    source: &'a LopdfDocument,
    ids: HashMap<ObjectId, ObjectId>,
    /// Non-page objects in discovery order, as (source id, part id)
    copied: Vec<(ObjectId, ObjectId)>,
    next: u32,
}

impl<'a> Subset<'a> {
    fn new(source: &'a LopdfDocument, first_id: u32) -> Self {
        Self {
            source,
            ids: HashMap::new(),
            copied: Vec::new(),
            next: first_id,
        }
    }

    fn assign(&mut self, old: ObjectId) -> ObjectId {
        let id = (self.next, 0);
        self.next += 1;
        self.ids.insert(old, id);
        id
    }

    /// Assign ids to everything reachable from `root`, stopping at page
    /// nodes and objects missing from the source.
    fn discover(&mut self, root: &Object) {
        let mut pending = Vec::new();
        collect_references(root, &mut pending);
        while let Some(old) = pending.pop() {
            if self.ids.contains_key(&old) {
                continue;
            }
            let Some(object) = self.source.objects.get(&old) else {
                continue;
            };
            if is_page_node(object) {
                continue;
            }
            let id = self.assign(old);
            self.copied.push((old, id));
            collect_references(object, &mut pending);
        }
    }

    fn remap(&self, object: &Object) -> Object {
        match object {
            Object::Reference(old) => match self.ids.get(old) {
                Some(id) => Object::Reference(*id),
                None => Object::Null,
            },
            Object::Array(items) => Object::Array(items.iter().map(|o| self.remap(o)).collect()),
            Object::Dictionary(dict) => Object::Dictionary(self.remap_dictionary(dict)),
            Object::Stream(stream) => {
                let mut stream = stream.clone();
                stream.dict = self.remap_dictionary(&stream.dict);
                Object::Stream(stream)
            }
            other => other.clone(),
        }
    }

    fn remap_dictionary(&self, dict: &Dictionary) -> Dictionary {
        let mut out = Dictionary::new();
        for (key, value) in dict.iter() {
            out.set(key.clone(), self.remap(value));
        }
        out
    }
}

/// Copy attributes inherited through the page tree into the page itself.
fn inherit_attributes(source: &LopdfDocument, page: &mut Dictionary) {
    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
    // Malformed trees can loop.
    let mut depth = 0;
    while let Some(id) = parent {
        let Ok(node) = source.get_dictionary(id) else {
            break;
        };
        for key in INHERITED {
            if !page.has(key) {
                if let Ok(value) = node.get(key) {
                    page.set(key, value.clone());
                }
            }
        }
        depth += 1;
        if depth >= MAX_TREE_DEPTH {
            break;
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
    }
}

const MAX_TREE_DEPTH: usize = 64;

fn is_page_node(object: &Object) -> bool {
    match object {
        Object::Dictionary(dict) => matches!(
            dict.get(b"Type").and_then(Object::as_name),
            Ok(b"Page") | Ok(b"Pages")
        ),
        _ => false,
    }
}

/// Push every object id referenced directly by `object`.
fn collect_references(object: &Object, out: &mut Vec<ObjectId>) {
    match object {
        Object::Reference(id) => out.push(*id),
        Object::Array(items) => {
            for item in items {
                collect_references(item, out);
            }
        }
        Object::Dictionary(dict) => {
            for (_, value) in dict.iter() {
                collect_references(value, out);
            }
        }
        Object::Stream(stream) => {
            for (_, value) in stream.dict.iter() {
                collect_references(value, out);
            }
        }
        _ => {}
    }
}
