//! The set of render targets a dashboard draws into.
//!
//! Element ids follow the page generator's convention: chart surfaces are
//! `chart-<field>` and optional companion text elements are `latest-<field>`.

use crate::config::FieldConfig;
use crate::models::FieldId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    /// Area a chart is drawn into.
    Surface,
    /// Plain text, e.g. a latest-value indicator.
    Text,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub id: String,
    pub kind: ElementKind,
    pub title: Option<String>,
    pub text: String,
}

impl Element {
    pub fn surface<S: Into<String>>(id: S) -> Self {
        Self {
            id: id.into(),
            kind: ElementKind::Surface,
            title: None,
            text: String::new(),
        }
    }

    pub fn text<S: Into<String>>(id: S) -> Self {
        Self {
            id: id.into(),
            kind: ElementKind::Text,
            title: None,
            text: String::new(),
        }
    }

    pub fn with_title<S: Into<String>>(mut self, title: S) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// A discovered render target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    pub field: FieldId,
    pub surface: String,
}

/// Elements in insertion order, ids unique.
#[derive(Debug, Clone, Default)]
pub struct Page {
    elements: Vec<Element>,
}

impl Page {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fields(fields: &[FieldConfig]) -> Self {
        let mut page = Page::new();
        for field in fields {
            let id = field.field_id();
            page.insert(Element::surface(id.chart_id()).with_title(field.display_title()));
            if field.latest {
                page.insert(Element::text(id.latest_id()));
            }
        }
        page
    }

    /// Adds an element, replacing any element with the same id in place.
    pub fn insert(&mut self, element: Element) {
        match self.elements.iter_mut().find(|e| e.id == element.id) {
            Some(existing) => *existing = element,
            None => self.elements.push(element),
        }
    }

    pub fn element(&self, id: &str) -> Option<&Element> {
        self.elements.iter().find(|e| e.id == id)
    }

    pub fn element_mut(&mut self, id: &str) -> Option<&mut Element> {
        self.elements.iter_mut().find(|e| e.id == id)
    }

    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.elements.iter()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Every surface whose id names a field, in page order. Elements that do
    /// not follow the convention are skipped.
    pub fn placeholders(&self) -> Vec<Placeholder> {
        self.elements
            .iter()
            .filter(|e| e.kind == ElementKind::Surface)
            .filter_map(|e| {
                FieldId::from_chart_id(&e.id).map(|field| Placeholder {
                    field,
                    surface: e.id.clone(),
                })
            })
            .collect()
    }
}
