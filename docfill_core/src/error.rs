use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum DocfillError {
	#[error(transparent)]
	#[diagnostic(code(docfill::io_error))]
	Io(#[from] std::io::Error),

	#[error("failed to read document archive: {0}")]
	#[diagnostic(
		code(docfill::archive),
		help("the file must be a valid .docx (zip) package")
	)]
	Archive(String),

	#[error("document part `{0}` not found in package")]
	#[diagnostic(
		code(docfill::missing_part),
		help("a .docx package always carries word/document.xml")
	)]
	MissingPart(String),

	#[error("smart table has no rows")]
	#[diagnostic(code(docfill::no_table_rows))]
	NoTableRows,

	#[error("invalid include directive: {0}")]
	#[diagnostic(
		code(docfill::bad_include),
		help("expected `[include/<file>.docx[/body|/table/<n>|/p/<n>]]`")
	)]
	BadInclude(String),

	#[error("include fragment not found: {0}")]
	#[diagnostic(code(docfill::missing_fragment))]
	MissingFragment(String),

	#[error("forbidden include path: `{0}`")]
	#[diagnostic(
		code(docfill::forbidden_include),
		help("include paths must stay inside the template's directory")
	)]
	ForbiddenInclude(String),

	#[error("template rendering failed: {0}")]
	#[diagnostic(code(docfill::template_render))]
	TemplateRender(String),

	#[error("failed to load data file `{path}`: {reason}")]
	#[diagnostic(code(docfill::data_file))]
	DataFile { path: String, reason: String },
}

pub type DocfillResult<T> = Result<T, DocfillError>;
pub type AnyError = Box<dyn std::error::Error>;
pub type AnyResult<T> = Result<T, AnyError>;
