//! Tag repair: word processors routinely split a `{marker}` the user typed
//! across several runs (`<w:r><w:t>{fi</w:t></w:r><w:r><w:t>o}</w:t></w:r>`),
//! interleaving it with formatting boundary tags. This stage reassembles the
//! marker by consuming those boundary tags while a marker is open, and leaves
//! everything outside markers untouched.

/// Formatting-boundary closers that may legally interrupt a marker.
const BOUNDARY_CLOSERS: [&str; 3] = ["</w:t>", "</w:r>", "</w:rPr>"];

/// Reassemble `{…}` and `[…]` markers fragmented across runs.
///
/// A single left-to-right scan with two independent "inside marker" flags,
/// one per delimiter family — the families never nest in this grammar.
/// Inside a marker any `<w:…>` tag is dropped up to its closing `>`; an
/// unterminated tag or marker leaves the remainder as-is. The scan never
/// errors and never loses non-boundary content.
pub fn repair_tags(body: &str) -> String {
	let bytes = body.as_bytes();
	let mut out = String::with_capacity(body.len());
	let mut flush_from = 0;
	let mut in_curly = false;
	let mut in_square = false;
	let mut i = 0;

	while i < bytes.len() {
		if !in_curly && !in_square {
			match bytes[i] {
				// an opener with no closer ahead can never be a marker:
				// leave the remainder untouched
				b'{' if body[i + 1..].contains('}') => in_curly = true,
				b'[' if body[i + 1..].contains(']') => in_square = true,
				_ => {}
			}
			i += 1;
			continue;
		}

		// byte-wise prefix checks: `i` may sit inside a multi-byte character
		let rest = &bytes[i..];
		if rest.starts_with(b"<w:")
			|| BOUNDARY_CLOSERS
				.iter()
				.any(|t| rest.starts_with(t.as_bytes()))
		{
			if let Some(gt) = rest.iter().position(|&b| b == b'>') {
				out.push_str(&body[flush_from..i]);
				i += gt + 1;
				flush_from = i;
				continue;
			}
			// no closing `>` anywhere ahead: keep the bytes as ordinary content
		}

		if in_curly && bytes[i] == b'}' {
			in_curly = false;
		} else if in_square && bytes[i] == b']' {
			in_square = false;
		}
		i += 1;
	}

	out.push_str(&body[flush_from..]);
	out
}
