//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::io;
use std::rc::Rc;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use pdfsplit::{Error, PageSource, PartBuilder, Result};

/// Build a PDF with one page per entry of `filler`, each page carrying
/// `Page N` followed by that many bytes of text. When `shared_image` is
/// non-zero every page draws the same image XObject of that size.
pub fn sample_pdf(filler: &[usize], shared_image: usize) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut resources = dictionary! {};
    if shared_image > 0 {
        let pixels: Vec<u8> = (0..shared_image).map(|i| (i * 31 % 251) as u8).collect();
        let image_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => shared_image as i64,
                "Height" => 1,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
            },
            pixels,
        ));
        resources.set("XObject", dictionary! { "Im1" => image_id });
    }
    let resources_id = doc.add_object(resources);

    let mut kids: Vec<Object> = Vec::new();
    for (i, &len) in filler.iter().enumerate() {
        let body: String = (0..len)
            .map(|j| (b'a' + ((i * 7 + j) % 26) as u8) as char)
            .collect();
        let mut operations = vec![
            Operation::new("BT", vec![]),
            Operation::new("Td", vec![72.into(), 720.into()]),
            Operation::new(
                "Tj",
                vec![Object::string_literal(format!("Page {} {}", i + 1, body))],
            ),
            Operation::new("ET", vec![]),
        ];
        if shared_image > 0 {
            operations.push(Operation::new("Do", vec![Object::Name(b"Im1".to_vec())]));
        }
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        kids.push(page_id.into());
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => filler.len() as i64,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}

/// `Page N` labels of every page in a serialized part, in order.
pub fn page_labels(pdf: &[u8]) -> Vec<u32> {
    let doc = Document::load_mem(pdf).unwrap();
    doc.get_pages()
        .values()
        .map(|&id| {
            let content = doc.get_page_content(id).unwrap();
            let text = String::from_utf8_lossy(&content).into_owned();
            let start = text.find("Page ").expect("page label") + 5;
            let digits: String = text[start..]
                .chars()
                .take_while(|c| c.is_ascii_digit())
                .collect();
            digits.parse().unwrap()
        })
        .collect()
}

/// Synthetic source: each page adds a fixed weight, every page in
/// `shared` adds `shared_cost` once per part that holds any of them, and
/// each part pays `overhead`.
#[derive(Clone)]
pub struct WeightedSource {
    pub weights: Vec<u64>,
    pub overhead: u64,
    pub shared: Vec<usize>,
    pub shared_cost: u64,
    /// Fail `measure()` once the builder holds this page index
    pub fail_on: Option<usize>,
    pub stats: Rc<BuilderStats>,
}

#[derive(Default)]
pub struct BuilderStats {
    pub live: Cell<usize>,
    pub created: Cell<usize>,
    pub measures: Cell<usize>,
    pub appended: RefCell<Vec<usize>>,
}

impl WeightedSource {
    pub fn uniform(pages: usize, weight: u64) -> Self {
        Self::new(vec![weight; pages])
    }

    pub fn new(weights: Vec<u64>) -> Self {
        Self {
            weights,
            overhead: 0,
            shared: Vec::new(),
            shared_cost: 0,
            fail_on: None,
            stats: Rc::new(BuilderStats::default()),
        }
    }

    pub fn with_overhead(mut self, overhead: u64) -> Self {
        self.overhead = overhead;
        self
    }

    pub fn with_shared(mut self, pages: Vec<usize>, cost: u64) -> Self {
        self.shared = pages;
        self.shared_cost = cost;
        self
    }

    pub fn failing_on(mut self, page: usize) -> Self {
        self.fail_on = Some(page);
        self
    }
}

pub struct WeightedBuilder {
    source: WeightedSource,
    pages: Vec<usize>,
}

impl Drop for WeightedBuilder {
    fn drop(&mut self) {
        let stats = &self.source.stats;
        stats.live.set(stats.live.get() - 1);
    }
}

impl PageSource for WeightedSource {
    type Page = usize;
    type Builder = WeightedBuilder;

    fn name(&self) -> &str {
        "weighted.pdf"
    }

    fn page_count(&self) -> usize {
        self.weights.len()
    }

    fn page_at(&self, index: usize) -> Result<usize> {
        if index < self.weights.len() {
            Ok(index)
        } else {
            Err(Error::PageOutOfRange(index, self.weights.len()))
        }
    }

    fn new_builder(&self) -> Result<WeightedBuilder> {
        self.stats.live.set(self.stats.live.get() + 1);
        self.stats.created.set(self.stats.created.get() + 1);
        Ok(WeightedBuilder {
            source: self.clone(),
            pages: Vec::new(),
        })
    }
}

impl WeightedBuilder {
    fn size(&self) -> u64 {
        let own: u64 = self.pages.iter().map(|&p| self.source.weights[p]).sum();
        let shared = if self.pages.iter().any(|p| self.source.shared.contains(p)) {
            self.source.shared_cost
        } else {
            0
        };
        self.source.overhead + own + shared
    }
}

impl PartBuilder for WeightedBuilder {
    type Page = usize;

    fn append(&mut self, page: usize) {
        self.source.stats.appended.borrow_mut().push(page);
        self.pages.push(page);
    }

    fn measure(&mut self) -> Result<u64> {
        let stats = &self.source.stats;
        stats.measures.set(stats.measures.get() + 1);
        if let Some(bad) = self.source.fail_on {
            if self.pages.contains(&bad) {
                return Err(Error::Io(io::Error::new(
                    io::ErrorKind::Other,
                    "scratch disk full",
                )));
            }
        }
        Ok(self.size())
    }

    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn finalize(self) -> Result<Vec<u8>> {
        Ok(vec![0u8; self.size() as usize])
    }
}
