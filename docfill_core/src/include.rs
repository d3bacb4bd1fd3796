//! `[include/…]` directives: parsing, fragment extraction, and the
//! resolution driver.
//!
//! Directive forms, all 1-based:
//!
//! - `[include/chapter.docx]` — the child's whole body
//! - `[include/chapter.docx/body]` — the same, spelled out
//! - `[include/chapter.docx/table/2]` — the child's second table
//! - `[include/chapter.docx/p/3]` — the child's third paragraph
//!
//! What a path resolves *to* is the caller's business via
//! [`IncludeResolver`]; this module owns the grammar and the splicing.

use crate::error::DocfillError;
use crate::error::DocfillResult;
use crate::markup::BODY_CLOSE;
use crate::markup::BODY_OPEN;
use crate::paragraph::replace_tag_lenient;

/// Which piece of the included document to splice in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fragment {
	Body,
	Table,
	Paragraph,
}

/// A parsed `[include/…]` directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludeSpec {
	/// The directive exactly as it appeared, used for splicing.
	pub raw: String,
	/// Relative path of the included document.
	pub file: String,
	pub fragment: Fragment,
	/// 1-based table/paragraph index; `1` when not given.
	pub index: usize,
}

/// Parse one `[include/…]` directive. No regular expressions: the directive
/// is split on `/` and the file path is re-assembled up to the first segment
/// with a document extension.
pub fn parse_include_directive(tag: &str) -> DocfillResult<IncludeSpec> {
	let raw = tag.to_string();
	let tag = tag.trim();

	let inner = tag
		.strip_prefix('[')
		.and_then(|s| s.strip_suffix(']'))
		.ok_or_else(|| DocfillError::BadInclude(raw.clone()))?;

	let parts: Vec<&str> = inner.split('/').collect();
	if parts.len() < 2 || parts[0] != "include" {
		return Err(DocfillError::BadInclude(raw));
	}

	let doc_idx = parts[1..]
		.iter()
		.position(|segment| {
			let lower = segment.to_lowercase();
			lower.ends_with(".docx") || lower.ends_with(".dotx")
		})
		.map(|i| i + 1)
		.ok_or_else(|| DocfillError::BadInclude(raw.clone()))?;

	let file = parts[1..=doc_idx]
		.iter()
		.filter(|segment| !segment.is_empty() && **segment != ".")
		.copied()
		.collect::<Vec<_>>()
		.join("/");
	if file.is_empty() {
		return Err(DocfillError::BadInclude(raw));
	}

	let mut spec = IncludeSpec {
		raw: raw.clone(),
		file,
		fragment: Fragment::Body,
		index: 1,
	};

	let rest = &parts[doc_idx + 1..];
	if rest.is_empty() {
		return Ok(spec);
	}

	let parse_index = |segment: Option<&&str>| -> DocfillResult<usize> {
		match segment {
			None => Ok(1),
			Some(s) => {
				match s.trim().parse::<usize>() {
					Ok(n) if n > 0 => Ok(n),
					_ => Err(DocfillError::BadInclude(raw.clone())),
				}
			}
		}
	};

	match rest[0].trim().to_lowercase().as_str() {
		"body" => spec.fragment = Fragment::Body,
		"table" => {
			spec.fragment = Fragment::Table;
			spec.index = parse_index(rest.get(1))?;
		}
		"p" | "paragraph" => {
			spec.fragment = Fragment::Paragraph;
			spec.index = parse_index(rest.get(1))?;
		}
		_ => return Err(DocfillError::BadInclude(raw)),
	}

	Ok(spec)
}

/// The markup between `<w:body>` and `</w:body>`.
pub fn body_fragment(content: &str) -> DocfillResult<String> {
	let after = content
		.split_once(BODY_OPEN)
		.ok_or_else(|| DocfillError::MissingFragment("body open".into()))?
		.1;
	let body = after
		.split_once(BODY_CLOSE)
		.ok_or_else(|| DocfillError::MissingFragment("body close".into()))?
		.0;
	Ok(body.to_string())
}

/// The `n`-th (1-based) element delimited by `part` tokens — the alternating
/// split puts element bodies at the odd positions.
fn part_n(content: &str, part: &str, open: &str, n: usize) -> Option<String> {
	if n == 0 {
		return None;
	}
	let parts: Vec<&str> = content.split(part).collect();
	let idx = n * 2 - 1;
	parts
		.get(idx)
		.map(|inner| format!("{open}{inner}{part}"))
}

/// The `n`-th table of a document part, 1-based.
pub fn table_n(content: &str, n: usize) -> DocfillResult<String> {
	part_n(content, "w:tbl>", "<w:tbl>", n)
		.ok_or_else(|| DocfillError::MissingFragment(format!("table {n}")))
}

/// The `n`-th paragraph of a document part, 1-based.
pub fn paragraph_n(content: &str, n: usize) -> DocfillResult<String> {
	part_n(content, "w:p>", "<w:p>", n)
		.ok_or_else(|| DocfillError::MissingFragment(format!("paragraph {n}")))
}

/// Resolves a parsed directive to the markup fragment it names.
pub trait IncludeResolver {
	fn resolve(&self, spec: &IncludeSpec) -> DocfillResult<String>;
}

/// A resolver that refuses everything; directives are then stripped, which
/// is the documented fallback.
pub struct NoIncludes;

impl IncludeResolver for NoIncludes {
	fn resolve(&self, spec: &IncludeSpec) -> DocfillResult<String> {
		Err(DocfillError::MissingFragment(spec.raw.clone()))
	}
}

/// Resolve every `[include/…]` directive in the body. A directive that fails
/// to parse or resolve is deleted; a resolved fragment replaces its host
/// paragraph via the block-replace rules.
pub fn resolve_includes(body: &str, resolver: &dyn IncludeResolver) -> String {
	let mut body = body.to_string();

	loop {
		let Some(start) = body.find("[include/") else {
			break;
		};
		let Some(end_rel) = body[start..].find(']') else {
			break;
		};
		let end = start + end_rel + 1;
		let raw = body[start..end].to_string();

		let fragment = parse_include_directive(&raw).and_then(|spec| resolver.resolve(&spec));
		match fragment {
			Ok(markup) => {
				body = replace_tag_lenient(&body, &raw, &markup);
			}
			Err(_) => {
				body.replace_range(start..end, "");
			}
		}
	}

	body
}
