// src/utils/html.rs

//! Turning configured HTML snippets into page elements.

use scraper::{ElementRef, Html};

use crate::page::{ElementId, Page};

/// Owned copy of the first element in an HTML fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentElement {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    pub inner_html: String,
}

/// Parse `html` and return its first element, if any.
pub fn first_element(html: &str) -> Option<FragmentElement> {
    let fragment = Html::parse_fragment(html);
    let element = fragment
        .root_element()
        .children()
        .find_map(ElementRef::wrap)?;

    Some(FragmentElement {
        tag: element.value().name().to_string(),
        attrs: element
            .value()
            .attrs()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        inner_html: element.inner_html(),
    })
}

/// Build a page element from the first element of `html`.
pub fn element_from_html(page: &Page, html: &str) -> Option<ElementId> {
    let parsed = first_element(html)?;
    let id = page.create_element(&parsed.tag);
    for (name, value) in &parsed.attrs {
        if name == "class" {
            for class in value.split_whitespace() {
                page.add_class(id, class);
            }
        } else {
            page.set_attr(id, name, value.clone());
        }
    }
    page.set_inner_html(id, parsed.inner_html);
    Some(id)
}

/// Wrap raw text in a new `tag` element.
pub fn element_from_text(page: &Page, text: &str, tag: &str) -> ElementId {
    let id = page.create_element(tag);
    page.set_inner_html(id, text);
    id
}
