//! Structural whitespace trimming around `{~…~}` / `{-…-}` markers.
//!
//! Paragraph content is modelled as runs of atomic text nodes; `<w:tab/>` and
//! `<w:br/>` take part as single-character `"\t"` / `"\n"` nodes and convert
//! back on output. Each side of a decorated marker eats adjacent whitespace
//! nodes outward until the first non-eatable node or the run boundary.

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::BytesStart;
use quick_xml::events::BytesText;
use quick_xml::events::Event;

use crate::markup;

/// Whitespace class of one text node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WsKind {
	/// Carries something other than whitespace.
	None,
	/// Spaces and tabs only.
	SpacesTabs,
	/// Whitespace including at least one line break.
	HasNewline,
}

/// Eating strength of one marker side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TrimSide {
	None,
	/// `-`: spaces and tabs.
	SpacesTabs,
	/// `~`: spaces, tabs and line breaks.
	SpacesTabsNewline,
}

fn classify_ws(s: &str) -> WsKind {
	if s == "\t" {
		return WsKind::SpacesTabs;
	}
	if s == "\n" {
		return WsKind::HasNewline;
	}
	if s.chars().all(|c| c == ' ' || c == '\t') {
		return WsKind::SpacesTabs;
	}
	if s.chars().all(|c| c == ' ' || c == '\t' || c == '\n') {
		if s.contains('\n') {
			return WsKind::HasNewline;
		}
		return WsKind::SpacesTabs;
	}
	WsKind::None
}

/// Left/right strengths requested by the decorations inside `tag_text`,
/// decided independently per side.
fn compute_masks(tag_text: &str) -> (TrimSide, TrimSide) {
	let left = if tag_text.contains("{~") {
		TrimSide::SpacesTabsNewline
	} else if tag_text.contains("{-") {
		TrimSide::SpacesTabs
	} else {
		TrimSide::None
	};
	let right = if tag_text.contains("~}") {
		TrimSide::SpacesTabsNewline
	} else if tag_text.contains("-}") {
		TrimSide::SpacesTabs
	} else {
		TrimSide::None
	};
	(left, right)
}

fn can_eat(kind: WsKind, side: TrimSide) -> bool {
	match side {
		TrimSide::None => false,
		TrimSide::SpacesTabs => kind == WsKind::SpacesTabs,
		TrimSide::SpacesTabsNewline => {
			kind == WsKind::SpacesTabs || kind == WsKind::HasNewline
		}
	}
}

/// `{~…~}` / `{-…-}` → `{…}` once the surrounding whitespace is handled.
fn strip_decorations(s: &str) -> String {
	s.replace("{~", "{")
		.replace("{-", "{")
		.replace("~}", "}")
		.replace("-}", "}")
}

fn has_decorations(s: &str) -> bool {
	s.contains("{~") || s.contains("~}") || s.contains("{-") || s.contains("-}")
}

/// One atomic text-bearing node inside a run.
struct TextNode {
	/// The original `<w:t …>` start tag; `None` for converted tab/break
	/// elements.
	start: Option<BytesStart<'static>>,
	text: String,
	run: usize,
}

/// Parsed paragraph: text nodes interleaved with opaque events reproduced
/// verbatim.
enum Item {
	Node(TextNode),
	Raw(Event<'static>),
}

fn parse_paragraph(xml: &str) -> Option<Vec<Item>> {
	let mut reader = Reader::from_str(xml);
	reader.config_mut().check_end_names = false;

	let mut items = Vec::new();
	let mut run_depth = 0usize;
	let mut run_id = 0usize;

	loop {
		match reader.read_event() {
			Err(_) => return None,
			Ok(Event::Eof) => break,
			Ok(Event::Start(e)) => {
				let name = e.name().as_ref().to_vec();
				if name == b"w:r" {
					run_depth += 1;
					run_id += 1;
					items.push(Item::Raw(Event::Start(e.into_owned())));
				} else if run_depth > 0 && name == b"w:t" {
					let mut text = String::new();
					loop {
						match reader.read_event() {
							Err(_) => return None,
							Ok(Event::Text(t)) => {
								text.push_str(&t.unescape().ok()?);
							}
							Ok(Event::CData(c)) => {
								text.push_str(std::str::from_utf8(c.as_ref()).ok()?);
							}
							Ok(Event::End(end)) if end.name().as_ref() == b"w:t" => break,
							Ok(Event::Eof) => return None,
							Ok(_) => return None,
						}
					}
					items.push(Item::Node(TextNode {
						start: Some(e.into_owned()),
						text,
						run: run_id,
					}));
				} else {
					items.push(Item::Raw(Event::Start(e.into_owned())));
				}
			}
			Ok(Event::Empty(e)) => {
				let name = e.name().as_ref().to_vec();
				if run_depth > 0 && name == b"w:tab" {
					items.push(Item::Node(TextNode {
						start: None,
						text: "\t".to_string(),
						run: run_id,
					}));
				} else if run_depth > 0 && name == b"w:br" {
					items.push(Item::Node(TextNode {
						start: None,
						text: "\n".to_string(),
						run: run_id,
					}));
				} else {
					items.push(Item::Raw(Event::Empty(e.into_owned())));
				}
			}
			Ok(Event::End(e)) => {
				if e.name().as_ref() == b"w:r" {
					run_depth = run_depth.saturating_sub(1);
				}
				items.push(Item::Raw(Event::End(e.into_owned())));
			}
			Ok(other) => items.push(Item::Raw(other.into_owned())),
		}
	}

	Some(items)
}

fn write_paragraph(items: &[Item], removed: &[bool]) -> Option<String> {
	let mut writer = Writer::new(Vec::new());

	for (idx, item) in items.iter().enumerate() {
		if removed[idx] {
			continue;
		}
		match item {
			Item::Raw(event) => writer.write_event(event.clone()).ok()?,
			Item::Node(node) => {
				if node.text == "\t" {
					writer
						.write_event(Event::Empty(BytesStart::new("w:tab")))
						.ok()?;
				} else if node.text == "\n" {
					writer
						.write_event(Event::Empty(BytesStart::new("w:br")))
						.ok()?;
				} else {
					let start = node
						.start
						.clone()
						.unwrap_or_else(|| BytesStart::new("w:t"));
					let end = start.to_end().into_owned();
					writer.write_event(Event::Start(start)).ok()?;
					writer
						.write_event(Event::Text(BytesText::new(&node.text)))
						.ok()?;
					writer.write_event(Event::End(end)).ok()?;
				}
			}
		}
	}

	String::from_utf8(writer.into_inner()).ok()
}

/// Trim one parsed paragraph in place. Returns `true` when anything changed.
fn trim_items(items: &mut [Item], removed: &mut [bool]) -> bool {
	// indices of text nodes, in document order
	let text_idx: Vec<usize> = items
		.iter()
		.enumerate()
		.filter(|(_, item)| matches!(item, Item::Node(_)))
		.map(|(i, _)| i)
		.collect();

	let node = |items: &[Item], i: usize| -> (String, usize) {
		match &items[i] {
			Item::Node(n) => (n.text.clone(), n.run),
			Item::Raw(_) => unreachable!("text_idx only holds nodes"),
		}
	};

	let mut changed = false;

	for (pos, &idx) in text_idx.iter().enumerate() {
		if removed[idx] {
			continue;
		}
		let (text, run) = node(items, idx);
		if !has_decorations(&text) {
			continue;
		}

		let (left_mask, right_mask) = compute_masks(&text);

		// walk left
		for &li in text_idx[..pos].iter().rev() {
			if removed[li] {
				continue;
			}
			let (t, r) = node(items, li);
			if r != run || !can_eat(classify_ws(&t), left_mask) {
				break;
			}
			removed[li] = true;
			changed = true;
		}

		// walk right
		for &ri in &text_idx[pos + 1..] {
			if removed[ri] {
				continue;
			}
			let (t, r) = node(items, ri);
			if r != run || !can_eat(classify_ws(&t), right_mask) {
				break;
			}
			removed[ri] = true;
			changed = true;
		}

		if let Item::Node(n) = &mut items[idx] {
			n.text = strip_decorations(&n.text);
		}
		changed = true;
	}

	changed
}

/// Remove whitespace around decorated markers across the whole body. Only
/// paragraphs carrying at least one decoration are parsed; paragraphs that
/// fail to parse pass through untouched.
pub fn trim_tags(body: &str) -> String {
	let mut out = String::with_capacity(body.len());
	let mut pos = 0;

	while let Some(span) = markup::next_paragraph(body, pos) {
		out.push_str(&body[pos..span.start]);
		let paragraph = span.slice(body);
		pos = span.end;

		if !has_decorations(paragraph) {
			out.push_str(paragraph);
			continue;
		}

		let Some(mut items) = parse_paragraph(paragraph) else {
			out.push_str(paragraph);
			continue;
		};
		let mut removed = vec![false; items.len()];

		if !trim_items(&mut items, &mut removed) {
			out.push_str(paragraph);
			continue;
		}

		match write_paragraph(&items, &removed) {
			Some(rebuilt) => out.push_str(&rebuilt),
			None => out.push_str(paragraph),
		}
	}

	out.push_str(&body[pos..]);
	out
}
