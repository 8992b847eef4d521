use std::collections::BTreeMap;

use scraper::{ElementRef, Html, Selector};

use crate::error::AppError;
use crate::selector::ElementSelector;
use crate::traits::DocumentExtractor;

/// Owned snapshot of one matched element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Lower-case tag name.
    pub tag: String,
    /// Concatenated text of the element and its descendants, untrimmed.
    pub text: String,
    pub attributes: BTreeMap<String, String>,
    /// Outer markup, so the element can be searched again on its own.
    pub html: String,
}

impl Element {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Outer markup wrapped in whatever parents the HTML parser needs to keep
    /// it intact when parsed on its own. Table parts outside a table are
    /// otherwise dropped by the parser.
    pub fn standalone_html(&self) -> String {
        let (open, close) = match self.tag.as_str() {
            "tr" => ("<table><tbody>", "</tbody></table>"),
            "td" | "th" => ("<table><tbody><tr>", "</tr></tbody></table>"),
            "thead" | "tbody" | "tfoot" | "caption" | "colgroup" => ("<table>", "</table>"),
            "col" => ("<table><colgroup>", "</colgroup></table>"),
            _ => return self.html.clone(),
        };
        format!("{open}{}{close}", self.html)
    }

    fn from_ref(element: ElementRef<'_>) -> Self {
        Self {
            tag: element.value().name().to_ascii_lowercase(),
            text: element.text().collect(),
            attributes: element
                .value()
                .attrs()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            html: element.html(),
        }
    }
}

/// [`DocumentExtractor`] backed by the `scraper` HTML parser.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlDocumentExtractor;

impl HtmlDocumentExtractor {
    pub fn new() -> Self {
        Self
    }

    fn compile(selector: &ElementSelector) -> Result<Selector, AppError> {
        let css = selector.to_css();
        Selector::parse(&css)
            .map_err(|e| AppError::ConfigError(format!("Invalid selector '{css}': {e:?}")))
    }
}

impl DocumentExtractor for HtmlDocumentExtractor {
    type Document = Html;

    fn parse(&self, raw: &str) -> Result<Html, AppError> {
        Ok(Html::parse_document(raw))
    }

    fn find(&self, document: &Html, selector: &ElementSelector) -> Result<Option<Element>, AppError> {
        let compiled = Self::compile(selector)?;
        Ok(document.select(&compiled).next().map(Element::from_ref))
    }

    fn find_all(&self, document: &Html, selector: &ElementSelector) -> Result<Vec<Element>, AppError> {
        let compiled = Self::compile(selector)?;
        Ok(document.select(&compiled).map(Element::from_ref).collect())
    }
}
