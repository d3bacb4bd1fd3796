//! Rewrites the field-marker DSL into minijinja syntax.
//!
//! `{fio}` becomes `{{ fio }}`, `{price|money:2}` becomes
//! `{{ price | money(2) }}`, and a backtick-quoted argument — which may
//! contain unbalanced `}`, `:` or `|` — becomes a quoted string literal.
//! Markers already written in minijinja's own syntax pass through untouched.

/// One token of a marker body.
enum MarkerToken {
	/// Bare text between separators: a field path, filter name, or raw
	/// argument.
	Plain(String),
	/// A closed backtick span, passed through as one string literal.
	Literal(String),
}

/// Split a marker body on `|` and `:`, honouring backtick spans.
fn tokenize_marker(body: &str) -> Vec<MarkerToken> {
	let mut tokens = Vec::new();
	let mut buf = String::new();
	let mut in_literal = false;

	for ch in body.chars() {
		match ch {
			'`' => {
				if in_literal {
					tokens.push(MarkerToken::Literal(std::mem::take(&mut buf)));
					in_literal = false;
				} else {
					in_literal = true;
					buf.clear();
				}
			}
			'|' | ':' if !in_literal => {
				if !buf.is_empty() {
					tokens.push(MarkerToken::Plain(std::mem::take(&mut buf)));
				}
			}
			_ => buf.push(ch),
		}
	}
	if !buf.is_empty() {
		if in_literal {
			// unterminated literal: keep what we saw
			tokens.push(MarkerToken::Literal(buf));
		} else {
			tokens.push(MarkerToken::Plain(buf));
		}
	}

	tokens
}

fn quote(s: &str) -> String {
	let mut out = String::with_capacity(s.len() + 2);
	out.push('"');
	for ch in s.chars() {
		match ch {
			'"' => out.push_str("\\\""),
			'\\' => out.push_str("\\\\"),
			_ => out.push(ch),
		}
	}
	out.push('"');
	out
}

/// Convert one complete `{…}` marker into a minijinja expression.
///
/// The first token is the field path (or, for table-substituted values, a
/// string literal); the second is the filter name; remaining tokens are
/// positional arguments — literals stay quoted, numeric-parseable tokens go
/// through as numbers, everything else is quoted.
pub fn transform_marker(tag: &str) -> String {
	let body = tag
		.strip_prefix('{')
		.unwrap_or(tag)
		.strip_suffix('}')
		.unwrap_or(tag);
	let tokens = tokenize_marker(body);

	let mut iter = tokens.iter();
	let Some(first) = iter.next() else {
		return tag.to_string();
	};

	let mut out = String::from("{{ ");
	match first {
		MarkerToken::Plain(name) => out.push_str(name.trim()),
		MarkerToken::Literal(lit) => out.push_str(&quote(lit)),
	}

	if let Some(filter) = iter.next() {
		out.push_str(" | ");
		match filter {
			MarkerToken::Plain(name) => out.push_str(name.trim()),
			MarkerToken::Literal(lit) => out.push_str(lit.trim()),
		}

		let args: Vec<String> = iter
			.map(|token| {
				match token {
					MarkerToken::Literal(lit) => quote(lit),
					MarkerToken::Plain(arg) => {
						if arg.parse::<f64>().is_ok() {
							arg.clone()
						} else {
							quote(arg)
						}
					}
				}
			})
			.collect();
		if !args.is_empty() {
			out.push('(');
			out.push_str(&args.join(", "));
			out.push(')');
		}
	}

	out.push_str(" }}");
	out
}

/// A marker is already in the evaluator's native syntax when its body starts
/// with the second delimiter character: `{` (expression), `%` (statement) or
/// `#` (comment).
fn is_native(tag: &str) -> bool {
	let body = tag
		.strip_prefix('{')
		.unwrap_or(tag)
		.strip_suffix('}')
		.unwrap_or(tag)
		.trim_start();
	body.starts_with('{') || body.starts_with('%') || body.starts_with('#')
}

/// Rewrite every non-native marker in `input`, copying everything else
/// verbatim. The scan tracks brace nesting (so native `{{ … }}` markers are
/// taken whole) and backtick spans (so a `}` inside a quoted literal does not
/// close the marker). An unterminated trailing marker is flushed as literal
/// text.
pub fn transform_body(input: &str) -> String {
	let mut out = String::with_capacity(input.len());
	let mut token = String::new();
	let mut depth = 0usize;
	let mut in_literal = false;

	for ch in input.chars() {
		if depth == 0 {
			if ch == '{' {
				depth = 1;
				in_literal = false;
				token.clear();
				token.push(ch);
			} else {
				out.push(ch);
			}
			continue;
		}

		token.push(ch);
		match ch {
			'`' => in_literal = !in_literal,
			'{' if !in_literal => depth += 1,
			'}' if !in_literal => {
				depth -= 1;
				if depth == 0 {
					if is_native(&token) {
						out.push_str(&token);
					} else {
						out.push_str(&transform_marker(&token));
					}
					token.clear();
				}
			}
			_ => {}
		}
	}

	if depth > 0 {
		out.push_str(&token);
	}

	out
}

/// Collect the distinct non-native `{…}` markers and `[table/…]` /
/// `[include/…]` directives in a body, in first-appearance order. Used by
/// template inspection tooling.
pub fn collect_markers(body: &str) -> Vec<String> {
	let mut found = Vec::new();
	let mut push = |s: String| {
		if !found.contains(&s) {
			found.push(s);
		}
	};

	let mut token = String::new();
	let mut depth = 0usize;
	let mut in_literal = false;
	for ch in body.chars() {
		if depth == 0 {
			if ch == '{' {
				depth = 1;
				in_literal = false;
				token.clear();
				token.push(ch);
			}
			continue;
		}
		token.push(ch);
		match ch {
			'`' => in_literal = !in_literal,
			'{' if !in_literal => depth += 1,
			'}' if !in_literal => {
				depth -= 1;
				if depth == 0 && !is_native(&token) {
					push(std::mem::take(&mut token));
				}
			}
			_ => {}
		}
	}

	for prefix in ["[table/", "[include/", "[/table]"] {
		let mut rest = body;
		while let Some(at) = rest.find(prefix) {
			let tail = &rest[at..];
			match tail.find(']') {
				Some(end) => {
					push(tail[..=end].to_string());
					rest = &tail[end + 1..];
				}
				None => break,
			}
		}
	}

	found
}
