//! `docfill_core` fills WordprocessingML templates with application data.
//! Markers typed into the document survive the editor's habit of splitting
//! them across formatting runs, and tables are populated from heterogeneous
//! datasets with no fixed schema.
//!
//! ## Processing Pipeline
//!
//! ```text
//! word/document.xml
//!   → Tag repair (reassemble markers fragmented across runs)
//!   → Includes ([include/…] directives spliced at paragraph granularity)
//!   → Smart tables ([table/…] regions rendered from datasets)
//!   → Block unwrap ({*name*} markers freed from their paragraphs)
//!   → Whitespace trim ({~…~} / {-…-} decorations eat adjacent space)
//!   → Transform ({name|mod:arg} rewritten to {{ name | mod("arg") }})
//!   → Evaluation (minijinja with the modifier registry)
//! ```
//!
//! ## Marker grammar
//!
//! - `{name}` — field, dotted paths allowed
//! - `{name|mod:arg:`literal`}` — field with a modifier pipeline; backtick
//!   literals may contain `:`, `|` and `}`
//! - `{~name~}` / `{-name-}` — whitespace-trim decorations, strong and weak,
//!   sides independent
//! - `{*name*}` — block marker, unwrapped from its paragraph
//! - `[include/file.docx/table/2]` — fragment include
//! - `[table/name] … [/table]` — smart table region
//! - `%[1]s` — positional placeholder in table rows
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use docfill_core::Document;
//! use serde_json::Map;
//! use serde_json::json;
//!
//! let mut doc = Document::open("contract.docx").unwrap();
//! let mut data = Map::new();
//! data.insert("fio".into(), json!("Ivanova A. P."));
//! data.insert(
//! 	"items".into(),
//! 	json!([{"row": {"n": 1, "price": 1234.5}}]),
//! );
//! doc.execute(&data).unwrap();
//! doc.save("contract-filled.docx").unwrap();
//! ```

pub use data::*;
pub use docx::*;
pub use engine::*;
pub use error::*;
pub use include::*;
pub use markup::*;
pub use paragraph::*;
pub use repair::*;
pub use table::*;
pub use transform::*;
pub use trim::*;

pub mod data;
mod docx;
mod engine;
mod error;
pub mod filters;
mod include;
pub mod markup;
mod paragraph;
mod repair;
mod table;
mod transform;
mod trim;

#[cfg(test)]
mod __fixtures;
