use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;

#[derive(Parser)]
#[command(
	author,
	version,
	about = "Fill WordprocessingML document templates from JSON data.",
	long_about = "docfill renders .docx templates against a JSON data file.\n\nMarkers typed \
	              straight into the document — {fio}, {sum|money}, {~trimmed~}, [table/items] — \
	              survive the editor's run fragmentation, feed smart table rendering, and run \
	              through a modifier pipeline before the final document is written.\n\nQuick \
	              start:\n  docfill tags contract.docx             List the markers a template \
	              expects\n  docfill render contract.docx -d data.json -o out.docx"
)]
pub struct DocfillCli {
	#[command(subcommand)]
	pub command: Option<Commands>,

	/// Enable verbose output.
	#[arg(long, short, global = true, default_value_t = false)]
	pub verbose: bool,

	/// Disable colored output.
	#[arg(long, global = true, default_value_t = false)]
	pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
	/// Render a template against a JSON data file.
	///
	/// Opens the template, repairs fragmented markers, resolves
	/// `[include/…]` and `[table/…]` regions, trims decorated whitespace,
	/// and evaluates every marker with the modifier registry. The result is
	/// written as a new `.docx` next to the template unless `--output` names
	/// a destination.
	Render {
		/// The `.docx` template to fill.
		template: PathBuf,

		/// JSON file with the data environment: an object whose scalar and
		/// map entries resolve field markers and whose array entries feed
		/// `[table/…]` regions.
		#[arg(long, short)]
		data: Option<PathBuf>,

		/// Where to write the rendered document.
		#[arg(long, short)]
		output: Option<PathBuf>,
	},
	/// List the markers and bracket directives a template contains.
	///
	/// Repairs fragmented markers first, so the listing reflects what the
	/// render would actually see. Useful for building the matching data
	/// file.
	Tags {
		/// The `.docx` template to inspect.
		template: PathBuf,
	},
}
