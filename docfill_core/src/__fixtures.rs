//! Shared helpers for the crate tests.

use std::io::Cursor;
use std::io::Write;

use serde_json::Map;
use serde_json::Value;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// Collapse whitespace differences so structural comparisons ignore
/// serialization cosmetics.
pub fn compact(s: &str) -> String {
	s.replace(['\r', '\n'], "").replace(' ', "")
}

/// One table cell with the given text content.
pub fn cell(text: &str) -> String {
	format!("<w:tc><w:p><w:t>{text}</w:t></w:p></w:tc>")
}

/// One table row from cell texts.
pub fn row(cells: &[&str]) -> String {
	let cells: String = cells.iter().map(|c| cell(c)).collect();
	format!("<w:tr>{cells}</w:tr>")
}

/// A whole table from row markup.
pub fn table(rows: &[String]) -> String {
	format!("<w:tbl>{}</w:tbl>", rows.join(""))
}

/// A body data map from key/value pairs.
pub fn data(pairs: &[(&str, Value)]) -> Map<String, Value> {
	pairs
		.iter()
		.map(|(k, v)| ((*k).to_string(), v.clone()))
		.collect()
}

/// A minimal in-memory `.docx` package with the given body markup.
pub fn docx_bytes(document_xml: &str) -> Vec<u8> {
	let mut cursor = Cursor::new(Vec::new());
	let mut zip = ZipWriter::new(&mut cursor);
	zip.start_file("word/document.xml", SimpleFileOptions::default())
		.expect("start entry");
	zip.write_all(document_xml.as_bytes()).expect("write entry");
	zip.finish().expect("finish zip");
	cursor.into_inner()
}

/// The multi-element document used by the fragment extraction tests.
pub const FRAGMENT_DOC: &str = "\
<w:document>\
<w:body>\
<w:p>AAA</w:p>\
<w:tbl>TABLE1</w:tbl>\
<w:p>BBB</w:p>\
<w:tbl>TABLE2</w:tbl>\
<w:p>CCC</w:p>\
</w:body>\
</w:document>";
