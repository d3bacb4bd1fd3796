//! Paragraph-granular marker replacement. Block content (a rendered table,
//! an included fragment) must not end up nested inside a `<w:p>`, so the
//! replacement deletes or splits the host paragraph instead of splicing into
//! it.

use crate::markup;

/// Replace the paragraph-level occurrence of `tag` with `content`.
///
/// Three shapes, decided per paragraph by its extracted text:
/// - text trimmed equals `tag` — the paragraph wrapper is deleted and
///   `content` spliced in verbatim;
/// - text contains `tag` amid other text — split into up to three parts:
///   a paragraph with the pre-text (dropped when empty after trimming),
///   `content` unwrapped, a paragraph with the post-text (same rule);
/// - no occurrence — the paragraph passes through unchanged.
pub fn replace_tag_with_paragraph(body: &str, tag: &str, content: &str) -> String {
	let mut out = String::with_capacity(body.len());
	let mut pos = 0;

	while let Some(span) = markup::next_paragraph(body, pos) {
		let paragraph = span.slice(body);
		let text = markup::paragraph_text(paragraph);

		if !text.contains(tag) {
			out.push_str(&body[pos..span.end]);
			pos = span.end;
			continue;
		}

		if text.trim() == tag {
			out.push_str(&body[pos..span.start]);
			out.push_str(content);
			pos = span.end;
			continue;
		}

		let (before, after) = text.split_once(tag).unwrap_or((text.as_str(), ""));
		out.push_str(&body[pos..span.start]);

		if !before.trim().is_empty() {
			out.push_str(&markup::text_paragraph(before.trim()));
		}
		out.push_str(content);
		if !after.trim().is_empty() {
			out.push_str(&markup::text_paragraph(after.trim()));
		}

		pos = span.end;
	}

	out.push_str(&body[pos..]);
	out
}

/// [`replace_tag_with_paragraph`] with an inline fallback: when the tag sits
/// outside any paragraph the plain first occurrence is replaced instead, so
/// drivers looping on marker discovery always make progress.
pub(crate) fn replace_tag_lenient(body: &str, tag: &str, content: &str) -> String {
	let replaced = replace_tag_with_paragraph(body, tag, content);
	if replaced == body {
		body.replacen(tag, content, 1)
	} else {
		replaced
	}
}

/// Expand every `{*name*}` marker to a plain `{name}` field, eliminating the
/// enclosing paragraph so block-scoped markers become ordinary inline fields.
pub fn unwrap_star_tags(body: &str) -> String {
	let mut body = body.to_string();

	loop {
		let Some(start) = body.find("{*") else {
			return body;
		};
		let Some(end_rel) = body[start..].find("*}") else {
			return body;
		};

		let star_tag = body[start..start + end_rel + 2].to_string();
		let name = body[start + 2..start + end_rel].trim().to_string();
		let replaced = replace_tag_with_paragraph(&body, &star_tag, &format!("{{{name}}}"));

		if replaced == body {
			// marker sits outside any paragraph: nothing to unwrap
			return body;
		}
		body = replaced;
	}
}
