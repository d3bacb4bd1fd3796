//! The `.docx` package: a zip archive of XML parts. The document is held
//! fully in memory as a part map; rendering rewrites the body and any
//! attached header/footer parts, and saving re-zips everything.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Cursor;
use std::io::Read;
use std::io::Seek;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use serde_json::Map;
use serde_json::Value;
use tracing::debug;
use zip::CompressionMethod;
use zip::ZipArchive;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::engine::render_part;
use crate::error::DocfillError;
use crate::error::DocfillResult;
use crate::include::Fragment;
use crate::include::IncludeResolver;
use crate::include::IncludeSpec;
use crate::include::body_fragment;
use crate::include::paragraph_n;
use crate::include::table_n;
use crate::paragraph::unwrap_star_tags;
use crate::repair::repair_tags;

const DOCUMENT_PART: &str = "word/document.xml";

/// An unpacked `.docx` document.
pub struct Document {
	parts: BTreeMap<String, Vec<u8>>,
	/// Directory of the source file; include directives resolve against it.
	source_dir: Option<PathBuf>,
}

/// Normalize a part name the way callers spell it: `document` and
/// `header1.xml` both land on their `word/…xml` paths.
fn part_path(part: &str) -> String {
	let mut path = part.to_string();
	if !path.starts_with("word/") {
		path = format!("word/{path}");
	}
	if !path.ends_with(".xml") {
		path.push_str(".xml");
	}
	path
}

impl Document {
	/// Open a `.docx` file. The body part is repaired and block markers are
	/// unwrapped immediately so later inspection sees whole markers.
	pub fn open(path: impl AsRef<Path>) -> DocfillResult<Self> {
		let path = path.as_ref();
		let file = File::open(path)?;
		let mut doc = Self::from_seekable(file)?;
		doc.source_dir = path.parent().map(Path::to_path_buf);
		Ok(doc)
	}

	/// Open a `.docx` from an in-memory buffer.
	pub fn from_bytes(bytes: Vec<u8>) -> DocfillResult<Self> {
		Self::from_seekable(Cursor::new(bytes))
	}

	fn from_seekable<R: Read + Seek>(reader: R) -> DocfillResult<Self> {
		let mut archive =
			ZipArchive::new(reader).map_err(|e| DocfillError::Archive(e.to_string()))?;

		let mut parts = BTreeMap::new();
		for i in 0..archive.len() {
			let mut entry = archive
				.by_index(i)
				.map_err(|e| DocfillError::Archive(e.to_string()))?;
			if entry.is_dir() {
				continue;
			}
			let mut data = Vec::with_capacity(entry.size() as usize);
			entry.read_to_end(&mut data)?;
			parts.insert(entry.name().to_string(), data);
		}

		let mut doc = Document {
			parts,
			source_dir: None,
		};

		// reassemble markers the editor fragmented before anything reads them
		let body = doc.content_part("document")?;
		let body = unwrap_star_tags(&repair_tags(&body));
		doc.update_content_part("document", &body);

		Ok(doc)
	}

	/// Raw bytes of an archive entry.
	pub fn part(&self, name: &str) -> Option<&[u8]> {
		self.parts.get(name).map(Vec::as_slice)
	}

	/// Insert or overwrite an archive entry.
	pub fn set_part(&mut self, name: &str, data: Vec<u8>) {
		let name = name.trim_start_matches('/').replace('\\', "/");
		self.parts.insert(name, data);
	}

	/// The body markup (`word/document.xml`).
	pub fn content(&self) -> DocfillResult<String> {
		self.content_part("document")
	}

	/// The markup of a named part: `document`, `header1`, `footer2`, …
	pub fn content_part(&self, part: &str) -> DocfillResult<String> {
		let path = part_path(part);
		let data = self
			.parts
			.get(&path)
			.ok_or_else(|| DocfillError::MissingPart(path.clone()))?;
		Ok(String::from_utf8_lossy(data).into_owned())
	}

	/// Replace the markup of a named part.
	pub fn update_content_part(&mut self, part: &str, content: &str) {
		self.parts
			.insert(part_path(part), content.as_bytes().to_vec());
	}

	/// Names of the header/footer parts actually referenced by the body,
	/// joined through the relationships part.
	pub fn list_header_footer_parts(&self) -> Vec<String> {
		static REFERENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
			Regex::new(r#"<w:(?:headerReference|footerReference)[^>]+r:id="([^"]+)""#)
				.expect("reference pattern")
		});

		let (Some(doc), Some(rels)) = (
			self.parts.get(DOCUMENT_PART),
			self.parts.get("word/_rels/document.xml.rels"),
		) else {
			return Vec::new();
		};

		let doc = String::from_utf8_lossy(doc);
		let rels = String::from_utf8_lossy(rels);
		let Ok(relationships) = quick_xml::de::from_str::<Relationships>(&rels) else {
			return Vec::new();
		};

		let mut parts = Vec::new();
		for captures in REFERENCE_RE.captures_iter(&doc) {
			let id = &captures[1];
			for rel in &relationships.items {
				if rel.id == *id
					&& (rel.r#type.contains("/header") || rel.r#type.contains("/footer"))
				{
					let name = rel
						.target
						.rsplit('/')
						.next()
						.unwrap_or(&rel.target)
						.trim_end_matches(".xml")
						.to_string();
					parts.push(name);
				}
			}
		}
		parts
	}

	/// Render the document against `data`: the body plus every attached
	/// header and footer part runs through the full pipeline.
	pub fn execute(&mut self, data: &Map<String, Value>) -> DocfillResult<()> {
		let resolver = self.source_dir.clone().map(DirIncludeResolver::new);
		let resolver_ref = resolver
			.as_ref()
			.map(|r| r as &dyn IncludeResolver);

		let mut targets = self.list_header_footer_parts();
		targets.push("document".to_string());

		for part in targets {
			let content = match self.content_part(&part) {
				Ok(content) => content,
				Err(err) => {
					if part == "document" {
						return Err(err);
					}
					// a dangling reference is not worth failing the render
					continue;
				}
			};

			debug!(part = %part, "rendering part");
			let rendered = render_part(&content, data, resolver_ref)?;
			self.update_content_part(&part, &rendered);
		}

		Ok(())
	}

	/// Write the package to a file.
	pub fn save(&self, path: impl AsRef<Path>) -> DocfillResult<()> {
		let file = File::create(path)?;
		self.write_to(file)
	}

	/// Write the package to any seekable sink (a response body buffer, a
	/// temp file, …).
	pub fn write_to<W: Write + Seek>(&self, writer: W) -> DocfillResult<()> {
		let mut zip = ZipWriter::new(writer);
		let options =
			SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

		for (name, data) in &self.parts {
			let name = name.trim_start_matches('/').replace('\\', "/");
			if name.trim().is_empty() {
				continue;
			}
			zip.start_file(name, options)
				.map_err(|e| DocfillError::Archive(e.to_string()))?;
			zip.write_all(data)?;
		}

		zip.finish()
			.map_err(|e| DocfillError::Archive(e.to_string()))?;
		Ok(())
	}
}

#[derive(Debug, Deserialize)]
struct Relationships {
	#[serde(rename = "Relationship", default)]
	items: Vec<Relationship>,
}

#[derive(Debug, Deserialize)]
struct Relationship {
	#[serde(rename = "@Id")]
	id: String,
	#[serde(rename = "@Type")]
	r#type: String,
	#[serde(rename = "@Target")]
	target: String,
}

/// Resolves `[include/…]` directives against sibling documents on disk,
/// refusing paths that escape the template's directory.
pub struct DirIncludeResolver {
	base: PathBuf,
}

impl DirIncludeResolver {
	pub fn new(base: PathBuf) -> Self {
		Self { base }
	}
}

impl IncludeResolver for DirIncludeResolver {
	fn resolve(&self, spec: &IncludeSpec) -> DocfillResult<String> {
		let base = self.base.canonicalize()?;
		let joined = base.join(&spec.file);
		let resolved = joined.canonicalize()?;
		if !resolved.starts_with(&base) {
			return Err(DocfillError::ForbiddenInclude(spec.file.clone()));
		}

		let child = Document::open(&resolved)?;
		let content = child.content()?;

		match spec.fragment {
			Fragment::Body => body_fragment(&content),
			Fragment::Table => table_n(&content, spec.index),
			Fragment::Paragraph => paragraph_n(&content, spec.index),
		}
	}
}
