use std::path::Path;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use docfill_cli::Commands;
use docfill_cli::DocfillCli;
use docfill_core::DocfillError;
use docfill_core::Document;
use docfill_core::collect_markers;
use owo_colors::OwoColorize;
use owo_colors::Stream;

fn main() {
	let args = DocfillCli::parse();

	let use_color = !args.no_color && std::env::var_os("NO_COLOR").is_none();

	if args.verbose {
		tracing_subscriber::fmt()
			.with_env_filter(
				tracing_subscriber::EnvFilter::try_from_default_env()
					.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
			)
			.with_writer(std::io::stderr)
			.init();
	}

	// Install miette's fancy handler for rich error diagnostics.
	miette::set_hook(Box::new(move |_| {
		Box::new(
			miette::MietteHandlerOpts::new()
				.color(use_color)
				.unicode(use_color)
				.build(),
		)
	}))
	.ok();

	let result = match args.command {
		Some(Commands::Render {
			template,
			data,
			output,
		}) => run_render(&template, data.as_deref(), output),
		Some(Commands::Tags { template }) => run_tags(&template),
		None => {
			eprintln!("No subcommand specified. Run `docfill --help` for usage.");
			process::exit(1);
		}
	};

	if let Err(err) = result {
		let report: miette::Report = err.into();
		eprintln!("{report:?}");
		process::exit(2);
	}
}

fn load_data(path: Option<&Path>) -> Result<serde_json::Map<String, serde_json::Value>, DocfillError> {
	let Some(path) = path else {
		return Ok(serde_json::Map::new());
	};

	let raw = std::fs::read_to_string(path)?;
	let value: serde_json::Value =
		serde_json::from_str(&raw).map_err(|e| {
			DocfillError::DataFile {
				path: path.display().to_string(),
				reason: e.to_string(),
			}
		})?;

	match value {
		serde_json::Value::Object(map) => Ok(map),
		_ => {
			Err(DocfillError::DataFile {
				path: path.display().to_string(),
				reason: "top level must be a JSON object".to_string(),
			})
		}
	}
}

fn run_render(
	template: &Path,
	data: Option<&Path>,
	output: Option<PathBuf>,
) -> Result<(), DocfillError> {
	let data = load_data(data)?;
	let mut doc = Document::open(template)?;
	doc.execute(&data)?;

	let output = output.unwrap_or_else(|| template.with_extension("out.docx"));
	doc.save(&output)?;

	println!(
		"{} {} → {}",
		"rendered".if_supports_color(Stream::Stdout, |t| t.green()),
		template.display(),
		output.display()
	);
	Ok(())
}

fn run_tags(template: &Path) -> Result<(), DocfillError> {
	let doc = Document::open(template)?;
	let body = doc.content()?;

	let markers = collect_markers(&body);
	if markers.is_empty() {
		println!("no markers found");
		return Ok(());
	}

	for marker in &markers {
		println!("{marker}");
	}
	println!();
	println!(
		"{} marker(s)",
		markers
			.len()
			.if_supports_color(Stream::Stdout, |t| t.bold())
	);
	Ok(())
}
