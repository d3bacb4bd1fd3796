//! The rendering pipeline for one document part.
//!
//! Every stage is a pure string→string pass; the part is repaired, includes
//! and tables are resolved, block markers are unwrapped, whitespace is
//! trimmed, the marker DSL is rewritten, and the result goes through the
//! expression evaluator exactly once.

use minijinja::Environment;
use minijinja::UndefinedBehavior;
use serde_json::Map;
use serde_json::Value;
use tracing::debug;

use crate::error::DocfillError;
use crate::error::DocfillResult;
use crate::filters::register_filters;
use crate::include::IncludeResolver;
use crate::include::NoIncludes;
use crate::include::resolve_includes;
use crate::paragraph::unwrap_star_tags;
use crate::repair::repair_tags;
use crate::table::resolve_tables;
use crate::transform::transform_body;
use crate::trim::trim_tags;

/// Build the expression environment the way every render uses it: trailing
/// newlines kept, undefined values chainable, the full modifier registry.
pub fn environment<'source>() -> Environment<'source> {
	let mut env = Environment::new();
	env.set_keep_trailing_newline(true);
	env.set_undefined_behavior(UndefinedBehavior::Chainable);
	register_filters(&mut env);
	env
}

/// Run the whole pipeline over one document part.
///
/// `data` is the render environment: scalars and maps resolve field markers,
/// arrays feed `[table/…]` regions. Pass an [`IncludeResolver`] to honour
/// `[include/…]` directives; without one they are stripped, which is the
/// documented fallback.
pub fn render_part(
	body: &str,
	data: &Map<String, Value>,
	includes: Option<&dyn IncludeResolver>,
) -> DocfillResult<String> {
	let repaired = repair_tags(body);
	debug!(len = repaired.len(), "tags repaired");

	let with_includes = match includes {
		Some(resolver) => resolve_includes(&repaired, resolver),
		None => resolve_includes(&repaired, &NoIncludes),
	};

	let with_tables = resolve_tables(&with_includes, data);

	// included fragments may carry fragmented or block markers of their own
	let body = repair_tags(&with_tables);
	let body = unwrap_star_tags(&body);
	let body = trim_tags(&body);
	let body = transform_body(&body);
	debug!(len = body.len(), "markers transformed");

	let mut env = environment();
	env.add_template("part", &body)
		.map_err(|e| DocfillError::TemplateRender(e.to_string()))?;
	let template = env
		.get_template("part")
		.map_err(|e| DocfillError::TemplateRender(e.to_string()))?;

	let ctx = minijinja::Value::from_serialize(data);
	template
		.render(ctx)
		.map_err(|e| DocfillError::TemplateRender(e.to_string()))
}
