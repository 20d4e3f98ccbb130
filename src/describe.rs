use crate::config::PERSON_ROUTE;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static PARAGRAPH_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"%[\r\n]*|(?:\r?\n){2,}|\r\n").unwrap());

static CLIPPINGS_HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:Un)?[Ii]dentified Clippings:").unwrap());

static PERSON_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\|\s*([^|\[\]]+?)\s*\[\s*(\d+)\s*\]\s*\|").unwrap());

/// Turns a page description into its display form.
pub trait DescriptionFormatter {
    fn format(&self, text: &str) -> String;
}

impl<F> DescriptionFormatter for F
where
    F: Fn(&str) -> String,
{
    fn format(&self, text: &str) -> String {
        self(text)
    }
}

/// Leaves descriptions exactly as exported.
#[derive(Debug, Clone, Copy, Default)]
pub struct Verbatim;

impl DescriptionFormatter for Verbatim {
    fn format(&self, text: &str) -> String {
        text.to_string()
    }
}

/// HTML paragraphs with emphasised clipping headings and linked person tags.
///
/// Paragraphs break on `%` markers, blank lines and CRLF line ends. Blank
/// paragraphs are dropped, so an empty description stays empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkupFormatter;

impl DescriptionFormatter for MarkupFormatter {
    fn format(&self, text: &str) -> String {
        PARAGRAPH_BREAK
            .split(text)
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(|p| format!("<p class=\"desc_paragraph\">{}</p>", link_people(&emphasise(p))))
            .collect()
    }
}

fn emphasise(paragraph: &str) -> String {
    CLIPPINGS_HEADING
        .replace_all(paragraph, |caps: &Captures| {
            format!(
                "<span style=\"font-weight: bold;\"><span style=\"font-style: italic;\">{}</span></span>",
                &caps[0]
            )
        })
        .into_owned()
}

/// `|Name [id]|` → anchor to the person's page.
fn link_people(paragraph: &str) -> String {
    PERSON_TAG
        .replace_all(paragraph, |caps: &Captures| {
            format!("<a href='{}/{}'>{}</a>", PERSON_ROUTE, &caps[2], &caps[1])
        })
        .into_owned()
}
