use std::io::Cursor;
use std::io::Write;
use std::path::Path;

use assert_cmd::Command;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

pub fn docfill_cmd() -> Command {
	let mut cmd = Command::cargo_bin("docfill").expect("binary built");
	cmd.env("NO_COLOR", "1");
	cmd
}

/// Write a minimal `.docx` (a zip with `word/document.xml`) to `path`.
pub fn write_docx(path: &Path, document_xml: &str) {
	let mut cursor = Cursor::new(Vec::new());
	let mut zip = ZipWriter::new(&mut cursor);
	zip.start_file("word/document.xml", SimpleFileOptions::default())
		.expect("start entry");
	zip.write_all(document_xml.as_bytes()).expect("write entry");
	zip.finish().expect("finish zip");
	std::fs::write(path, cursor.into_inner()).expect("write docx");
}
