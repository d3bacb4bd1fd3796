//! WordprocessingML tokens and string-level helpers shared by every pipeline
//! stage. The engine never builds a full DOM for the document body; stages
//! work on paragraph-sized spans located with these helpers.

/// `<w:p>` opening tag (paragraphs are matched without attributes, the way
/// word processors serialize body paragraphs).
pub const PARAGRAPH_OPEN: &str = "<w:p>";
/// `</w:p>` closing tag.
pub const PARAGRAPH_CLOSE: &str = "</w:p>";

/// `<w:tbl>` opening tag.
pub const TABLE_OPEN: &str = "<w:tbl>";
/// `</w:tbl>` closing tag.
pub const TABLE_CLOSE: &str = "</w:tbl>";

/// `<w:tr>` opening tag.
pub const TABLE_ROW_OPEN: &str = "<w:tr>";
/// `</w:tr>` closing tag.
pub const TABLE_ROW_CLOSE: &str = "</w:tr>";
/// Bare row token used when sifting split parts for actual rows.
pub const TABLE_ROW_PART: &str = "w:tr>";

/// `<w:body>` opening tag.
pub const BODY_OPEN: &str = "<w:body>";
/// `</w:body>` closing tag.
pub const BODY_CLOSE: &str = "</w:body>";

/// The byte span of one paragraph, `start..end`, end exclusive and covering
/// the closing tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParagraphSpan {
	pub start: usize,
	pub end: usize,
}

impl ParagraphSpan {
	pub fn slice<'a>(&self, body: &'a str) -> &'a str {
		&body[self.start..self.end]
	}
}

/// Find the next `<w:p>…</w:p>` span at or after `from`, tolerating
/// attributes on the opening tag. Returns `None` when no further complete
/// paragraph exists. `<w:pPr>` and self-closing `<w:p/>` do not match.
pub fn next_paragraph(body: &str, from: usize) -> Option<ParagraphSpan> {
	let mut search = from;
	loop {
		let start = body[search..].find("<w:p")? + search;
		let next = body.as_bytes().get(start + "<w:p".len()).copied();
		if !matches!(next, Some(b'>') | Some(b' ') | Some(b'\t') | Some(b'\r') | Some(b'\n')) {
			search = start + "<w:p".len();
			continue;
		}
		let close = body[start..].find(PARAGRAPH_CLOSE)? + start;
		return Some(ParagraphSpan {
			start,
			end: close + PARAGRAPH_CLOSE.len(),
		});
	}
}

/// Pull the visible text out of a paragraph by concatenating its `<w:t>`
/// nodes. Attributes on `<w:t>` (e.g. `xml:space="preserve"`) are tolerated;
/// nothing else contributes text.
pub fn paragraph_text(paragraph: &str) -> String {
	let mut out = String::new();
	let mut rest = paragraph;

	while let Some(at) = rest.find("<w:t") {
		let after = &rest[at + "<w:t".len()..];
		// Reject `<w:tbl>`, `<w:tab/>` and friends: the next byte must close
		// the tag or start an attribute list.
		let mut bytes = after.bytes();
		match bytes.next() {
			Some(b'>') => {
				let content = &after[1..];
				let Some(end) = content.find("</w:t>") else {
					break;
				};
				out.push_str(&content[..end]);
				rest = &content[end + "</w:t>".len()..];
			}
			Some(b' ') | Some(b'\t') => {
				let Some(gt) = after.find('>') else { break };
				if after[..gt].ends_with('/') {
					// self-closing <w:t .../> carries no text
					rest = &after[gt + 1..];
					continue;
				}
				let content = &after[gt + 1..];
				let Some(end) = content.find("</w:t>") else {
					break;
				};
				out.push_str(&content[..end]);
				rest = &content[end + "</w:t>".len()..];
			}
			_ => {
				rest = &after[..];
			}
		}
	}

	out
}

/// Escape `&`, `<`, `>` and both quote characters for insertion into markup.
pub fn xml_escape(s: &str) -> String {
	let mut out = String::with_capacity(s.len());
	for ch in s.chars() {
		match ch {
			'&' => out.push_str("&amp;"),
			'<' => out.push_str("&lt;"),
			'>' => out.push_str("&gt;"),
			'"' => out.push_str("&quot;"),
			'\'' => out.push_str("&apos;"),
			_ => out.push(ch),
		}
	}
	out
}

/// Wrap plain text in a minimal paragraph with preserved spacing.
pub fn text_paragraph(text: &str) -> String {
	format!(
		"<w:p><w:r><w:t xml:space=\"preserve\">{}</w:t></w:r></w:p>",
		xml_escape(text)
	)
}
