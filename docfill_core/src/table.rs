//! Smart table rendering.
//!
//! A table template is a small library of row forms. The dataset dictates the
//! output: every item, in arrival order, is matched against the forms and
//! produces exactly one row from its bound form. Rows before the first form
//! are the header, rows after the last are the footer; both are emitted
//! verbatim exactly once.
//!
//! Matching runs in three passes: bind by score (recording group bindings),
//! retry the wait set once group bindings exist, then compute the field-name
//! union per bucket so sparse items can blank out fields their siblings
//! carry.

use std::collections::HashMap;
use std::collections::HashSet;
use std::ops::Range;

use logos::Logos;
use serde_json::Map;
use serde_json::Value;
use tracing::debug;

use crate::data::DataItem;
use crate::data::collect_local_keys;
use crate::data::normalize_item;
use crate::data::scalar_to_string;
use crate::error::DocfillError;
use crate::error::DocfillResult;
use crate::markup::TABLE_CLOSE;
use crate::markup::TABLE_OPEN;
use crate::markup::TABLE_ROW_CLOSE;
use crate::markup::TABLE_ROW_PART;
use crate::paragraph::replace_tag_lenient;
use crate::paragraph::replace_tag_with_paragraph;

/// Marker tokens recognized inside a row's markup. Everything the lexer does
/// not match is copied through untouched.
#[derive(Logos, Debug, PartialEq)]
enum RowToken {
	/// `` {`literal`|mod:…} `` — a pipeline whose subject is a quoted
	/// literal; positional placeholders inside the literal are resolved
	/// before the pipeline runs.
	#[regex(r"\{[ \t]*`[^`]*`[ \t]*\|[^}]*\}")]
	LiteralPipeline,
	/// `{name|mod:…}`
	#[regex(r"\{[ \t]*[A-Za-z0-9_.]+[ \t]*\|[^}]*\}")]
	FieldPipeline,
	/// `{name}`
	#[regex(r"\{[ \t]*[A-Za-z0-9_.]+[ \t]*\}")]
	Field,
}

/// The field name of a `{name}` / `{name|…}` token slice.
fn marker_name(slice: &str) -> &str {
	let body = &slice[1..slice.len() - 1];
	let end = body.find(['|', '}']).unwrap_or(body.len());
	body[..end].trim()
}

/// The pipeline tail of a `{…|tail}` token slice, without the braces.
fn pipeline_tail(slice: &str) -> &str {
	let body = &slice[1..slice.len() - 1];
	match body.find('|') {
		Some(pipe) => body[pipe + 1..].trim(),
		None => "",
	}
}

/// The quoted content of a `` {`literal`|tail} `` token slice.
fn literal_content(slice: &str) -> &str {
	let Some(open) = slice.find('`') else {
		return "";
	};
	let rest = &slice[open + 1..];
	match rest.find('`') {
		Some(close) => &rest[..close],
		None => rest,
	}
}

/// `%[N]s` occurrences: byte range and 1-based index. Spaces inside the
/// brackets are tolerated.
fn placeholders(s: &str) -> Vec<(Range<usize>, usize)> {
	let bytes = s.as_bytes();
	let mut out = Vec::new();
	let mut i = 0;

	while let Some(at) = s[i..].find("%[") {
		let start = i + at;
		let mut j = start + 2;
		while j < bytes.len() && (bytes[j] == b' ' || bytes[j] == b'\t') {
			j += 1;
		}
		let digits_start = j;
		while j < bytes.len() && bytes[j].is_ascii_digit() {
			j += 1;
		}
		let digits_end = j;
		while j < bytes.len() && (bytes[j] == b' ' || bytes[j] == b'\t') {
			j += 1;
		}
		if digits_end > digits_start && s[j..].starts_with("]s") {
			if let Ok(n) = s[digits_start..digits_end].parse::<usize>() {
				out.push((start..j + 2, n));
				i = j + 2;
				continue;
			}
		}
		i = start + 2;
	}

	out
}

/// Substitute every `%[N]s` from `values` (1-based); indices outside the
/// value list become the empty string, padding within the row.
fn replace_placeholders(s: &str, values: &[Value]) -> String {
	let mut out = String::with_capacity(s.len());
	let mut last = 0;

	for (range, n) in placeholders(s) {
		out.push_str(&s[last..range.start]);
		if n >= 1 {
			if let Some(value) = values.get(n - 1) {
				out.push_str(&scalar_to_string(value));
			}
		}
		last = range.end;
	}

	out.push_str(&s[last..]);
	out
}

/// Names and placeholder count observed in one row's markup.
#[derive(Debug, Default, Clone)]
struct RowMeta {
	names: Vec<String>,
	placeholder_count: usize,
}

fn parse_row_meta(row: &str) -> RowMeta {
	let mut meta = RowMeta {
		placeholder_count: placeholders(row).len(),
		..RowMeta::default()
	};

	for (token, span) in RowToken::lexer(row).spanned() {
		if let Ok(RowToken::Field | RowToken::FieldPipeline) = token {
			let name = marker_name(&row[span]);
			if !name.is_empty() {
				meta.names.push(name.to_string());
			}
		}
	}

	meta
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FormKind {
	/// Holds `%[N]s` placeholders; consumes slice items.
	Positional,
	/// Holds locally-known `{name}` markers; consumes map items.
	Named,
}

/// One row of the form library.
struct FormRow {
	xml: String,
	meta: RowMeta,
	kind: FormKind,
}

fn strip_outer_table(s: &str) -> &str {
	let trimmed = s.trim();
	trimmed
		.strip_prefix(TABLE_OPEN)
		.and_then(|inner| inner.strip_suffix(TABLE_CLOSE))
		.unwrap_or(trimmed)
}

fn extract_rows(tbl: &str) -> Vec<String> {
	tbl.trim()
		.split(TABLE_ROW_CLOSE)
		.filter(|part| part.to_lowercase().contains(TABLE_ROW_PART))
		.map(|part| format!("{part}{TABLE_ROW_CLOSE}"))
		.collect()
}

/// Best-scoring form for an item, first form winning ties. `None` when no
/// form scores above zero.
fn try_match(item: &DataItem, forms: &[FormRow]) -> Option<usize> {
	let mut best_score = 0i64;
	let mut best = None;

	for (i, form) in forms.iter().enumerate() {
		let score = match (item, form.kind) {
			(DataItem::Map { fields, .. }, FormKind::Named) => {
				form.meta
					.names
					.iter()
					.filter(|name| fields.contains_key(*name))
					.count() as i64
			}
			(DataItem::Slice { values, .. }, FormKind::Positional) => {
				let seen = form.meta.placeholder_count as i64;
				let len = values.len() as i64;
				if seen == len {
					1000 + seen
				} else {
					100 - (seen - len).abs()
				}
			}
			_ => 0,
		};
		if score > best_score {
			best_score = score;
			best = Some(i);
		}
	}

	best
}

/// Substitute a named form row for one map item.
///
/// Per-marker precedence: the item's own field; the empty string when the
/// field name appears elsewhere in the bucket; otherwise the marker stays
/// as-is for global-scope resolution. Pipeline markers are re-emitted with
/// the value as a quoted literal so the transform stage rewrites them
/// uniformly.
fn render_named(
	xml: &str,
	fields: &Map<String, Value>,
	union: &HashSet<String>,
) -> String {
	let mut out = String::with_capacity(xml.len());
	let mut last = 0;

	for (token, span) in RowToken::lexer(xml).spanned() {
		let Ok(token) = token else { continue };
		let slice = &xml[span.clone()];
		out.push_str(&xml[last..span.start]);
		last = span.end;

		match token {
			RowToken::Field => {
				let name = marker_name(slice);
				if let Some(value) = fields.get(name) {
					out.push_str(&scalar_to_string(value));
				} else if union.contains(name) {
					// blank: a sibling in the bucket carries this field
				} else {
					out.push_str(slice);
				}
			}
			RowToken::FieldPipeline => {
				let name = marker_name(slice);
				let tail = pipeline_tail(slice);
				if let Some(value) = fields.get(name) {
					out.push_str(&format!("{{`{}`|{tail}}}", scalar_to_string(value)));
				} else if union.contains(name) {
					out.push_str(&format!("{{``|{tail}}}"));
				} else {
					out.push_str(slice);
				}
			}
			RowToken::LiteralPipeline => out.push_str(slice),
		}
	}

	out.push_str(&xml[last..]);
	out
}

/// Substitute a positional form row for one slice item: quoted literals have
/// their placeholders resolved first, then the bare placeholders across the
/// row.
fn render_positional(xml: &str, values: &[Value]) -> String {
	let mut out = String::with_capacity(xml.len());
	let mut last = 0;

	for (token, span) in RowToken::lexer(xml).spanned() {
		let Ok(RowToken::LiteralPipeline) = token else {
			continue;
		};
		let slice = &xml[span.clone()];
		out.push_str(&xml[last..span.start]);
		last = span.end;

		let resolved = replace_placeholders(literal_content(slice), values);
		let tail = pipeline_tail(slice);
		out.push_str(&format!("{{`{resolved}`|{tail}}}"));
	}
	out.push_str(&xml[last..]);

	replace_placeholders(&out, values)
}

/// Render one table template against an ordered dataset.
///
/// Returns [`DocfillError::NoTableRows`] when the markup holds no rows at
/// all; a table without any form rows is returned unmodified.
pub fn render_table(table_xml: &str, items: &[Value]) -> DocfillResult<String> {
	let inner = strip_outer_table(table_xml);
	let rows = extract_rows(inner);
	if rows.is_empty() {
		return Err(DocfillError::NoTableRows);
	}

	let local_keys = collect_local_keys(items);

	// classify rows, find the form region
	let mut kinds: Vec<Option<FormKind>> = Vec::with_capacity(rows.len());
	let mut metas: Vec<RowMeta> = Vec::with_capacity(rows.len());
	let mut first_form = None;
	let mut last_form = None;
	for (i, row) in rows.iter().enumerate() {
		let meta = parse_row_meta(row);
		let kind = if meta.placeholder_count > 0 {
			Some(FormKind::Positional)
		} else if meta.names.iter().any(|n| local_keys.contains(n)) {
			Some(FormKind::Named)
		} else {
			None
		};
		if kind.is_some() {
			first_form.get_or_insert(i);
			last_form = Some(i);
		}
		kinds.push(kind);
		metas.push(meta);
	}

	let (Some(first), Some(last)) = (first_form, last_form) else {
		// no form rows: static table, reproduce as-is
		return Ok(format!("{TABLE_OPEN}{inner}{TABLE_CLOSE}"));
	};

	let header = &rows[..first];
	let footer = &rows[last + 1..];

	let mut forms: Vec<FormRow> = Vec::new();
	for (i, row) in rows.iter().enumerate() {
		if let Some(kind) = kinds[i] {
			forms.push(FormRow {
				xml: row.clone(),
				meta: metas[i].clone(),
				kind,
			});
		}
	}

	let nitems: Vec<DataItem> = items
		.iter()
		.map(normalize_item)
		.filter(|item| !matches!(item, DataItem::Other))
		.collect();

	if nitems.is_empty() {
		let mut out = String::from(TABLE_OPEN);
		out.extend(header.iter().map(String::as_str));
		out.extend(footer.iter().map(String::as_str));
		out.push_str(TABLE_CLOSE);
		return Ok(out);
	}

	// pass 1: score in arrival order, pinning group keys
	let mut binding: HashMap<String, usize> = HashMap::new();
	let mut assigned: Vec<Option<usize>> = vec![None; nitems.len()];
	let mut buckets: Vec<Vec<usize>> = vec![Vec::new(); forms.len()];
	let mut wait = Vec::new();

	let bind = |idx: usize,
	                form: usize,
	                assigned: &mut Vec<Option<usize>>,
	                buckets: &mut Vec<Vec<usize>>,
	                binding: &mut HashMap<String, usize>| {
		assigned[idx] = Some(form);
		buckets[form].push(idx);
		if let Some(gk) = nitems[idx].group_key() {
			binding.entry(gk.to_string()).or_insert(form);
		}
	};

	for (idx, item) in nitems.iter().enumerate() {
		if let Some(gk) = item.group_key() {
			if let Some(&form) = binding.get(gk) {
				assigned[idx] = Some(form);
				buckets[form].push(idx);
				continue;
			}
		}
		match try_match(item, &forms) {
			Some(form) => bind(idx, form, &mut assigned, &mut buckets, &mut binding),
			None => wait.push(idx),
		}
	}

	// pass 2: the wait set retries once, now that group bindings exist;
	// still-unmatched items are skipped
	for idx in wait {
		if let Some(gk) = nitems[idx].group_key() {
			if let Some(&form) = binding.get(gk) {
				assigned[idx] = Some(form);
				buckets[form].push(idx);
				continue;
			}
		}
		if let Some(form) = try_match(&nitems[idx], &forms) {
			bind(idx, form, &mut assigned, &mut buckets, &mut binding);
		}
	}

	// pass 3: field-name union per named bucket
	let mut unions: Vec<HashSet<String>> = vec![HashSet::new(); forms.len()];
	for (form_idx, bucket) in buckets.iter().enumerate() {
		if forms[form_idx].kind != FormKind::Named {
			continue;
		}
		for &item_idx in bucket {
			if let DataItem::Map { fields, .. } = &nitems[item_idx] {
				unions[form_idx].extend(fields.keys().cloned());
			}
		}
	}

	debug!(
		rows = rows.len(),
		forms = forms.len(),
		items = nitems.len(),
		"smart table matched"
	);

	// render: header, one row per item in arrival order, footer
	let mut out = String::from(TABLE_OPEN);
	out.extend(header.iter().map(String::as_str));

	let no_values: Vec<Value> = Vec::new();
	let no_fields = Map::new();
	for (idx, item) in nitems.iter().enumerate() {
		let Some(form_idx) = assigned[idx] else {
			continue;
		};
		let form = &forms[form_idx];
		match form.kind {
			FormKind::Positional => {
				let values = match item {
					DataItem::Slice { values, .. } => values.as_slice(),
					_ => no_values.as_slice(),
				};
				out.push_str(&render_positional(&form.xml, values));
			}
			FormKind::Named => {
				let fields = match item {
					DataItem::Map { fields, .. } => fields,
					_ => &no_fields,
				};
				out.push_str(&render_named(&form.xml, fields, &unions[form_idx]));
			}
		}
	}

	out.extend(footer.iter().map(String::as_str));
	out.push_str(TABLE_CLOSE);
	Ok(out)
}

/// Remove the paragraph hosting `tag`; falls back to deleting the bare tag
/// when it sits outside any paragraph, so the driver always makes progress.
fn remove_tag(body: &str, tag: &str) -> String {
	replace_tag_lenient(body, tag, "")
}

/// Locate `[table/name] … [/table]` regions and render each against
/// `data[name]`.
///
/// A missing or malformed dataset leaves the original table in place and
/// strips only the bracket markers; a present dataset replaces the table and
/// the opening-marker paragraph with the rendered result and discards the
/// closing-marker paragraph along with the original table markup.
pub fn resolve_tables(body: &str, data: &Map<String, Value>) -> String {
	const OPEN_PREFIX: &str = "[table/";
	const CLOSE_TAG: &str = "[/table]";

	let mut body = body.to_string();

	loop {
		let Some(start) = body.find(OPEN_PREFIX) else {
			break;
		};

		let Some(open_end_rel) = body[start..].find(']') else {
			// broken markup: drop the marker paragraph, if any, and stop
			let tail = body[start..].to_string();
			body = replace_tag_with_paragraph(&body, &tail, "");
			break;
		};
		let open_end = start + open_end_rel + 1;
		let open_tag = body[start..open_end].to_string();
		let name = open_tag
			.strip_prefix(OPEN_PREFIX)
			.and_then(|s| s.strip_suffix(']'))
			.unwrap_or("")
			.to_string();

		let Some(close_rel) = body[open_end..].find(CLOSE_TAG) else {
			body = remove_tag(&body, &open_tag);
			break;
		};
		let close_pos = open_end + close_rel;
		let inner = &body[open_end..close_pos];

		let table_xml = match (inner.find("<w:tbl"), inner.find(TABLE_CLOSE)) {
			(Some(tbl_start), Some(tbl_end)) if tbl_start < tbl_end => {
				inner[tbl_start..tbl_end + TABLE_CLOSE.len()].to_string()
			}
			_ => {
				// no table between the markers: strip both and move on
				body = remove_tag(&body, CLOSE_TAG);
				body = remove_tag(&body, &open_tag);
				continue;
			}
		};

		// the closing marker paragraph is never needed
		body = remove_tag(&body, CLOSE_TAG);

		let Some(Value::Array(items)) = data.get(&name) else {
			// absent or unusable dataset: keep the table, strip the marker
			body = remove_tag(&body, &open_tag);
			continue;
		};

		match render_table(&table_xml, items) {
			Ok(rendered) if !rendered.trim().is_empty() => {
				body = body.replacen(&table_xml, "", 1);
				body = replace_tag_lenient(&body, &open_tag, &rendered);
			}
			_ => {
				debug!(table = %name, "table render fell back to original");
				body = remove_tag(&body, &open_tag);
			}
		}
	}

	body
}
