//! Text extraction for fetched bodies.
//!
//! The fetcher decides a [`ContentType`] from a file extension or an HTTP
//! `Content-Type` header; this module turns the raw bytes into the plain
//! text that gets cached.

use std::io::Read;
use std::path::Path;

use context_vacuum_core::FetchError;

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_DOCX: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Maximum decompressed bytes read from `word/document.xml` (zip-bomb guard).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Text,
    Html,
    Pdf,
    Docx,
}

impl ContentType {
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("pdf") => ContentType::Pdf,
            Some("docx") => ContentType::Docx,
            Some("html") | Some("htm") | Some("xhtml") => ContentType::Html,
            _ => ContentType::Text,
        }
    }

    /// From a `Content-Type` header value; parameters are ignored.
    pub fn from_mime(mime: &str) -> Self {
        let essence = mime
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            "text/html" | "application/xhtml+xml" => ContentType::Html,
            MIME_PDF => ContentType::Pdf,
            MIME_DOCX => ContentType::Docx,
            _ => ContentType::Text,
        }
    }
}

/// Decode `bytes` as `content_type`.
///
/// With `lossy` unset, [`ContentType::Text`] bodies must be valid UTF-8.
pub fn extract_text(
    bytes: &[u8],
    content_type: ContentType,
    lossy: bool,
) -> Result<String, FetchError> {
    match content_type {
        ContentType::Text if lossy => Ok(String::from_utf8_lossy(bytes).into_owned()),
        ContentType::Text => std::str::from_utf8(bytes)
            .map(str::to_string)
            .map_err(|e| FetchError::Decode(format!("not valid UTF-8: {}", e))),
        ContentType::Html => Ok(html_to_text(&String::from_utf8_lossy(bytes))),
        ContentType::Pdf => pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| FetchError::Decode(format!("PDF extraction failed: {}", e))),
        ContentType::Docx => extract_docx(bytes),
    }
}

/// Readable text of an HTML page: one trimmed text node per line, with
/// `<script>` and `<style>` bodies dropped.
pub fn html_to_text(html: &str) -> String {
    let html = drop_raw_text_elements(html);
    match html_text_nodes(&html) {
        Ok(lines) => lines.join("\n"),
        Err(e) => {
            tracing::debug!(error = %e, "HTML is not well-formed, stripping tags instead");
            strip_tags(&html).join("\n")
        }
    }
}

/// Remove `<script>` and `<style>` elements with their bodies. Their
/// contents are not markup, so the reader below must never see them.
fn drop_raw_text_elements(html: &str) -> String {
    let lower = html.to_ascii_lowercase();
    let mut out = String::with_capacity(html.len());
    let mut pos = 0;
    while let Some((start, name)) = next_raw_text_open(&lower, pos) {
        out.push_str(&html[pos..start]);
        let close = format!("</{}", name);
        pos = match lower[start..].find(&close) {
            Some(at) => {
                let after = start + at;
                match lower[after..].find('>') {
                    Some(gt) => after + gt + 1,
                    None => html.len(),
                }
            }
            None => html.len(),
        };
    }
    out.push_str(&html[pos..]);
    out
}

fn next_raw_text_open(lower: &str, from: usize) -> Option<(usize, &'static str)> {
    ["script", "style"]
        .into_iter()
        .filter_map(|name| {
            let needle = format!("<{}", name);
            let mut search = from;
            while let Some(at) = lower[search..].find(&needle) {
                let start = search + at;
                let next = lower[start + needle.len()..].chars().next();
                if matches!(next, Some(c) if c == '>' || c == '/' || c.is_ascii_whitespace()) {
                    return Some((start, name));
                }
                search = start + needle.len();
            }
            None
        })
        .min_by_key(|(start, _)| *start)
}

fn html_text_nodes(html: &str) -> Result<Vec<String>, quick_xml::Error> {
    use quick_xml::events::Event;

    let mut reader = quick_xml::Reader::from_str(html);
    reader.config_mut().trim_text(true);
    reader.config_mut().check_end_names = false;

    let mut lines = Vec::new();
    loop {
        match reader.read_event()? {
            Event::Text(t) => push_line(&mut lines, &String::from_utf8_lossy(&t)),
            Event::CData(t) => push_line(&mut lines, &String::from_utf8_lossy(&t)),
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(lines)
}

fn push_line(lines: &mut Vec<String>, raw: &str) {
    let text = decode_entities(raw.trim());
    let text = text.trim();
    if !text.is_empty() {
        lines.push(text.to_string());
    }
}

/// Tag stripper for markup the XML reader rejects.
fn strip_tags(html: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut rest = html;
    while let Some(open) = rest.find('<') {
        push_line(&mut lines, &rest[..open]);
        rest = match rest[open..].find('>') {
            Some(close) => &rest[open + close + 1..],
            None => "",
        };
    }
    push_line(&mut lines, rest);
    lines
}

/// Resolves numeric and HTML5 named character references. Text with a
/// malformed reference (a bare `&`, say) is kept as written.
pub(crate) fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    match quick_xml::escape::unescape_with(text, quick_xml::escape::resolve_html5_entity) {
        Ok(decoded) => decoded.replace('\u{a0}', " "),
        Err(_) => text.to_string(),
    }
}

fn extract_docx(bytes: &[u8]) -> Result<String, FetchError> {
    let ooxml =
        |e: &dyn std::fmt::Display| FetchError::Decode(format!("DOCX extraction failed: {}", e));

    let mut archive =
        zip::ZipArchive::new(std::io::Cursor::new(bytes)).map_err(|e| ooxml(&e))?;
    let entry = archive.by_name("word/document.xml").map_err(|e| ooxml(&e))?;
    let mut xml = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut xml)
        .map_err(|e| ooxml(&e))?;
    if xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(ooxml(&"word/document.xml exceeds size limit"));
    }
    docx_paragraphs(&xml).map_err(|e| ooxml(&e))
}

/// `w:t` runs joined per `w:p` paragraph, one paragraph per line.
fn docx_paragraphs(xml: &[u8]) -> Result<String, quick_xml::Error> {
    use quick_xml::events::Event;

    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut paragraphs: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut in_text = false;
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.local_name().as_ref() == b"t" => in_text = true,
            Event::End(e) if e.local_name().as_ref() == b"t" => in_text = false,
            Event::End(e) if e.local_name().as_ref() == b"p" => {
                if !current.trim().is_empty() {
                    paragraphs.push(std::mem::take(&mut current));
                }
                current.clear();
            }
            Event::Text(t) if in_text => {
                current.push_str(&t.unescape().unwrap_or_default());
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    if !current.trim().is_empty() {
        paragraphs.push(current);
    }
    Ok(paragraphs.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn content_type_from_extension_and_mime() {
        assert_eq!(ContentType::from_path(Path::new("a/B.PDF")), ContentType::Pdf);
        assert_eq!(ContentType::from_path(Path::new("notes.docx")), ContentType::Docx);
        assert_eq!(ContentType::from_path(Path::new("index.htm")), ContentType::Html);
        assert_eq!(ContentType::from_path(Path::new("main.rs")), ContentType::Text);
        assert_eq!(ContentType::from_path(Path::new("Makefile")), ContentType::Text);

        assert_eq!(ContentType::from_mime("text/html; charset=utf-8"), ContentType::Html);
        assert_eq!(ContentType::from_mime("application/pdf"), ContentType::Pdf);
        assert_eq!(ContentType::from_mime("text/plain"), ContentType::Text);
        assert_eq!(ContentType::from_mime(""), ContentType::Text);
    }

    #[test]
    fn html_drops_scripts_and_styles() {
        let html = r#"<html><head><title>Docs</title>
            <style>body { color: red; }</style>
            <script>var x = 1;</script></head>
            <body><h1>Hello</h1><p>  first   para </p><p>a &amp; b</p></body></html>"#;
        assert_eq!(html_to_text(html), "Docs\nHello\nfirst   para\na & b");
    }

    #[test]
    fn numeric_and_named_references_are_decoded() {
        let html = "<p>It&#8217;s &mdash; ok &#x27;q&#x27; &copy;</p>";
        assert_eq!(html_to_text(html), "It\u{2019}s \u{2014} ok 'q' \u{a9}");
        assert_eq!(decode_entities("AT&T"), "AT&T");
        assert_eq!(decode_entities("a&nbsp;b"), "a b");
    }

    #[test]
    fn malformed_html_falls_back_to_stripping() {
        let html = "<p>one<br>two</p><script>if (a < b) { go(); }</script><div class=x>three &nbsp;</div>";
        let text = html_to_text(html);
        assert!(text.contains("one"));
        assert!(text.contains("two"));
        assert!(text.contains("three"));
        assert!(!text.contains("go()"));
    }

    #[test]
    fn strict_text_rejects_invalid_utf8() {
        let bytes = [0x66, 0x6f, 0xff, 0x6f];
        let err = extract_text(&bytes, ContentType::Text, false).unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
        assert_eq!(
            extract_text(&bytes, ContentType::Text, true).unwrap(),
            "fo\u{fffd}o"
        );
    }

    #[test]
    fn invalid_pdf_is_a_decode_error() {
        let err = extract_text(b"not a pdf", ContentType::Pdf, false).unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
    }

    #[test]
    fn invalid_zip_is_a_decode_error() {
        let err = extract_text(b"not a zip", ContentType::Docx, false).unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
    }

    #[test]
    fn docx_paragraphs_become_lines() {
        let document = r#"<?xml version="1.0" encoding="UTF-8"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    <w:p><w:r><w:t>Hello</w:t></w:r><w:r><w:t xml:space="preserve"> world</w:t></w:r></w:p>
    <w:p><w:r><w:t>Fish &amp; chips</w:t></w:r></w:p>
  </w:body>
</w:document>"#;

        let mut bytes = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut bytes));
            let options = zip::write::SimpleFileOptions::default();
            zip.start_file("word/document.xml", options).unwrap();
            zip.write_all(document.as_bytes()).unwrap();
            zip.finish().unwrap();
        }

        let text = extract_text(&bytes, ContentType::Docx, false).unwrap();
        assert_eq!(text, "Hello world\nFish & chips");
    }
}
