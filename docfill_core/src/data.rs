//! Normalization of weakly-typed dataset items.
//!
//! Table datasets arrive as JSON arrays of heterogeneous entries. Each entry
//! is folded once into a [`DataItem`]; every downstream consumer matches
//! exhaustively on the variants and never inspects raw JSON again.

use std::collections::HashSet;

use serde_json::Map;
use serde_json::Value;

/// One normalized dataset record.
#[derive(Debug, Clone, PartialEq)]
pub enum DataItem {
	/// A record with named fields, bound to named form rows.
	Map {
		/// The wrapping label from `{label: {…}}`, when present. Repeated
		/// items of one group are pinned to the form chosen for the first.
		group_key: Option<String>,
		fields: Map<String, Value>,
	},
	/// An ordered record, bound to positional form rows.
	Slice {
		group_key: Option<String>,
		values: Vec<Value>,
	},
	/// Anything the table engine ignores (bare scalars, maps that mix in
	/// collections).
	Other,
}

impl DataItem {
	pub fn group_key(&self) -> Option<&str> {
		match self {
			DataItem::Map { group_key, .. } | DataItem::Slice { group_key, .. } => {
				group_key.as_deref()
			}
			DataItem::Other => None,
		}
	}
}

/// Fold one raw entry into a [`DataItem`].
///
/// Shapes, in order: `{label: {…}}` → grouped map, `{label: […]}` → grouped
/// slice, a flat map without collection values → ungrouped map, a bare array
/// → ungrouped slice. Everything else is [`DataItem::Other`].
pub fn normalize_item(value: &Value) -> DataItem {
	if let Value::Object(outer) = value {
		if let Some((label, inner)) = single_entry(outer) {
			match inner {
				Value::Object(fields) => {
					return DataItem::Map {
						group_key: Some(label.clone()),
						fields: fields.clone(),
					};
				}
				Value::Array(values) => {
					return DataItem::Slice {
						group_key: Some(label.clone()),
						values: values.clone(),
					};
				}
				_ => {}
			}
		}

		if outer.values().any(|v| matches!(v, Value::Array(_))) {
			return DataItem::Other;
		}
		return DataItem::Map {
			group_key: None,
			fields: outer.clone(),
		};
	}

	if let Value::Array(values) = value {
		return DataItem::Slice {
			group_key: None,
			values: values.clone(),
		};
	}

	DataItem::Other
}

/// The sole entry of a single-key map, if that is what `outer` is.
fn single_entry(outer: &Map<String, Value>) -> Option<(&String, &Value)> {
	if outer.len() == 1 {
		outer.iter().next()
	} else {
		None
	}
}

/// Field names known locally to a dataset: the inner keys of `{label: {…}}`
/// entries plus the keys of flat maps. A template name outside this set never
/// classifies a row as a form.
pub fn collect_local_keys(items: &[Value]) -> HashSet<String> {
	let mut keys = HashSet::new();

	for item in items {
		let Value::Object(outer) = item else {
			continue;
		};

		if outer.len() == 1 {
			if let Some(Value::Object(inner)) = outer.values().next() {
				keys.extend(inner.keys().cloned());
			}
			continue;
		}

		if outer.values().any(|v| matches!(v, Value::Array(_))) {
			continue;
		}
		keys.extend(outer.keys().cloned());
	}

	keys
}

/// The single value→text conversion used for substitutions.
pub fn scalar_to_string(value: &Value) -> String {
	match value {
		Value::Null => String::new(),
		Value::String(s) => s.clone(),
		Value::Bool(b) => b.to_string(),
		Value::Number(n) => n.to_string(),
		other => other.to_string(),
	}
}
