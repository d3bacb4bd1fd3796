//! The scalar modifier registry.
//!
//! Modifiers are a closed set of fixed-arity functions registered as
//! minijinja filters; the template transform turns `{sum|money:`int`}` into
//! `{{ sum | money("int") }}` before evaluation. Values arrive as
//! [`minijinja::Value`] so undefined fields degrade to the empty string
//! instead of failing the render.

use std::sync::LazyLock;

use chrono::DateTime;
use chrono::NaiveDate;
use chrono::NaiveDateTime;
use minijinja::Environment;
use minijinja::State;
use minijinja::value::Rest;
use minijinja::value::Value;
use regex::Regex;

/// Non-breaking space.
const NBSP: char = '\u{00A0}';
/// Narrow non-breaking space.
const NNBSP: char = '\u{202F}';

/// The subject of a filter as plain text; undefined and none become empty.
fn text(value: &Value) -> String {
	if value.is_undefined() || value.is_none() {
		return String::new();
	}
	match value.as_str() {
		Some(s) => s.to_string(),
		None => value.to_string(),
	}
}

fn number(value: &Value) -> Option<f64> {
	if let Ok(i) = i64::try_from(value.clone()) {
		return Some(i as f64);
	}
	if let Ok(f) = f64::try_from(value.clone()) {
		return Some(f);
	}
	value
		.as_str()
		.and_then(|s| s.trim().replace(',', ".").parse::<f64>().ok())
}

fn integer(value: &Value) -> Option<i64> {
	number(value).map(|f| f as i64)
}

/// Prepend `p` when the value is non-blank.
fn prefix(value: Value, p: String) -> String {
	let s = text(&value);
	if s.trim().is_empty() {
		return String::new();
	}
	format!("{p}{s}")
}

/// Prepend `p` unless the value already starts with it (case-insensitive).
fn uniq_prefix(value: Value, p: String) -> String {
	let s = text(&value);
	if s.trim().is_empty() {
		return String::new();
	}
	if s.trim()
		.to_lowercase()
		.starts_with(&p.trim().to_lowercase())
	{
		return s;
	}
	format!("{p}{s}")
}

/// Append `p` when the value is non-blank.
fn postfix(value: Value, p: String) -> String {
	let s = text(&value);
	if s.trim().is_empty() {
		return String::new();
	}
	format!("{s}{p}")
}

/// Append `p` unless the value already ends with it (case-insensitive).
fn uniq_postfix(value: Value, p: String) -> String {
	let s = text(&value);
	if s.trim().is_empty() {
		return String::new();
	}
	if s.trim().to_lowercase().ends_with(&p.trim().to_lowercase()) {
		return s;
	}
	format!("{s}{p}")
}

/// The fallback value when the subject is blank.
fn default_value(value: Value, def: String) -> String {
	let s = text(&value);
	if s.trim().is_empty() { def } else { s }
}

/// `out` when the subject is present and non-empty, otherwise empty. Used
/// for conditional captions ("passport: —").
fn filled(value: Value, out: String) -> String {
	if value.is_undefined() || value.is_none() {
		return String::new();
	}
	if let Some(s) = value.as_str() {
		if s.is_empty() {
			return String::new();
		}
	}
	out
}

fn replace(value: Value, old: String, new: String) -> String {
	text(&value).replace(&old, &new)
}

/// Cut to `n` characters, appending `suffix` when something was cut.
fn truncate(value: Value, n: usize, suffix: Option<String>) -> String {
	let s = text(&value);
	if n == 0 {
		return String::new();
	}
	if s.chars().count() <= n {
		return s;
	}
	let cut: String = s.chars().take(n).collect();
	format!("{cut}{}", suffix.unwrap_or_default())
}

fn word_reverse(value: Value) -> String {
	let s = text(&value);
	let mut words: Vec<&str> = s.split_whitespace().collect();
	words.reverse();
	words.join(" ")
}

/// Replace spaces with non-breaking spaces; for short codes and numbers.
fn nowrap(value: Value) -> String {
	text(&value).replace(' ', &NBSP.to_string())
}

/// Replace spaces with narrow non-breaking spaces; for phones and document
/// numbers.
fn compact(value: Value) -> String {
	text(&value).replace(' ', &NNBSP.to_string())
}

static ABBR_RE: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"(?i)((?:(?:^|\s)[a-zа-яё.\-]{1,5}\.?){1,2})\s+").expect("abbr pattern")
});

/// Glue abbreviations and initials to the following word with non-breaking
/// spaces, so "г. Москва" and "И. И. Иванов" never break across lines.
fn abbr(value: Value) -> String {
	let s = text(&value);
	ABBR_RE
		.replace_all(&s, |caps: &regex::Captures<'_>| {
			caps[0].replace(' ', &NBSP.to_string())
		})
		.into_owned()
}

/// Group an integer's digits by thousands with spaces; sign-aware because it
/// works on the formatted string.
fn group_thousands(n: i64) -> String {
	let mut digits = n.to_string();
	let mut parts: Vec<String> = Vec::new();
	while digits.len() > 3 {
		let tail = digits.split_off(digits.len() - 3);
		parts.insert(0, tail);
	}
	parts.insert(0, digits);
	parts.join(" ")
}

/// Monetary formatting: thousands-grouped integer part, two-digit fraction.
///
/// `money` → `1 234,56`; `money("int")` → `1 234`; a `%`-template option
/// substitutes `%s` with the grouped part and `%02d` with the fraction.
fn money(value: Value, opts: Rest<String>) -> String {
	let Some(f) = number(&value) else {
		return text(&value);
	};

	let int_part = f as i64;
	let frac_part = ((f - int_part as f64) * 100.0).round() as i64;
	let main = group_thousands(int_part);

	if let Some(format) = opts.first() {
		let format = format.trim();
		match format.to_lowercase().as_str() {
			"int" | "целое" => return main,
			_ => {
				if format.contains('%') {
					let mut out = format.replace("%s", &main);
					out = out.replace("%02d", &format!("{frac_part:02}"));
					out = out.replace("%d", &frac_part.to_string());
					return out;
				}
			}
		}
	}

	format!("{main},{frac_part:02}")
}

/// Prefix positive numbers with `+`.
fn sign(value: Value) -> String {
	let Some(f) = number(&value) else {
		return text(&value);
	};
	if f > 0.0 { format!("+{f}") } else { format!("{f}") }
}

fn pad_left(value: Value, length: usize, ch: String) -> String {
	let mut s = text(&value);
	while s.chars().count() < length {
		s = format!("{ch}{s}");
	}
	s
}

fn pad_right(value: Value, length: usize, ch: String) -> String {
	let mut s = text(&value);
	while s.chars().count() < length {
		s.push_str(&ch);
	}
	s
}

/// Roman numerals; empty for non-positive or non-numeric input.
fn roman(value: Value) -> String {
	let Some(mut n) = integer(&value) else {
		return String::new();
	};
	if n <= 0 {
		return String::new();
	}

	const VALS: [i64; 13] = [1000, 900, 500, 400, 100, 90, 50, 40, 10, 9, 5, 4, 1];
	const SYMS: [&str; 13] = [
		"M", "CM", "D", "CD", "C", "XC", "L", "XL", "X", "IX", "V", "IV", "I",
	];

	let mut out = String::new();
	for (val, sym) in VALS.iter().zip(SYMS.iter()) {
		while n >= *val {
			n -= val;
			out.push_str(sym);
		}
	}
	out
}

/// Pick the noun form matching a count: `plural("день", "дня", "дней")`.
/// Two forms extend to three; the slavic one/few/many rule applies.
fn plural(value: Value, forms: Rest<String>) -> String {
	let Some(n) = integer(&value) else {
		return String::new();
	};

	let forms: Vec<String> = match forms.len() {
		0 => {
			vec![
				"сотрудник".to_string(),
				"сотрудника".to_string(),
				"сотрудников".to_string(),
			]
		}
		2 => vec![forms[0].clone(), forms[1].clone(), forms[1].clone()],
		_ => forms.to_vec(),
	};

	let n = n.abs();
	let idx = if n % 10 == 1 && n % 100 != 11 {
		0
	} else if (2..=4).contains(&(n % 10)) && !(10..20).contains(&(n % 100)) {
		1
	} else {
		2
	};

	forms.get(idx).cloned().unwrap_or_default()
}

/// Accepted textual date shapes, tried in order.
const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d %H:%M:%S", "%d.%m.%Y %H:%M", "%Y-%m-%dT%H:%M:%S", "%d.%m.%Y"];
const DAY_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d.%m.%Y", "%Y/%m/%d"];

fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
	if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
		return Some(dt.naive_local());
	}
	for fmt in DATE_FORMATS {
		if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
			return Some(dt);
		}
	}
	for fmt in DAY_FORMATS {
		if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
			return d.and_hms_opt(0, 0, 0);
		}
	}
	None
}

/// Format a date value with a strftime layout:
/// `{{ deadline | date_format("%d.%m.%Y") }}`. Strings are parsed from the
/// common wire shapes, numbers are unix timestamps; unrecognized input comes
/// back unchanged.
fn date_format(value: Value, layout: String) -> String {
	if value.is_undefined() || value.is_none() {
		return String::new();
	}

	if let Some(s) = value.as_str() {
		let s = s.trim();
		if s.is_empty() {
			return String::new();
		}
		return match parse_datetime(s) {
			Some(dt) => dt.format(&layout).to_string(),
			None => s.to_string(),
		};
	}

	if let Some(ts) = integer(&value) {
		if let Some(dt) = DateTime::from_timestamp(ts, 0) {
			return dt.naive_utc().format(&layout).to_string();
		}
	}

	text(&value)
}

/// Turn embedded line breaks into `<w:br/>` run breaks.
fn nl(value: Value) -> String {
	text(&value).replace('\n', "<w:br/>")
}

/// Join the value with other fields (resolved from the render context by
/// name) or literal text; the last argument is the separator.
fn concat(state: &State<'_, '_>, value: Value, parts: Rest<String>) -> String {
	let base = text(&value);
	if parts.is_empty() {
		return base;
	}

	let sep = parts[parts.len() - 1].clone();
	let mut chunks = vec![base];
	for part in &parts[..parts.len() - 1] {
		match state.lookup(part) {
			Some(v) if !v.is_undefined() && !v.is_none() => chunks.push(text(&v)),
			_ => chunks.push(part.clone()),
		}
	}

	chunks.retain(|c| !c.trim().is_empty());
	chunks.join(&sep)
}

/// Register the full modifier set on an environment.
pub fn register_filters(env: &mut Environment<'_>) {
	env.add_filter("prefix", prefix);
	env.add_filter("uniq_prefix", uniq_prefix);
	env.add_filter("postfix", postfix);
	env.add_filter("uniq_postfix", uniq_postfix);
	env.add_filter("default", default_value);
	env.add_filter("filled", filled);
	env.add_filter("replace", replace);
	env.add_filter("truncate", truncate);
	env.add_filter("word_reverse", word_reverse);
	env.add_filter("nowrap", nowrap);
	env.add_filter("compact", compact);
	env.add_filter("abbr", abbr);
	env.add_filter("money", money);
	env.add_filter("sign", sign);
	env.add_filter("pad_left", pad_left);
	env.add_filter("pad_right", pad_right);
	env.add_filter("roman", roman);
	env.add_filter("plural", plural);
	env.add_filter("date_format", date_format);
	env.add_filter("concat", concat);
	env.add_filter("nl", nl);
	env.add_filter("br", nl);
}
