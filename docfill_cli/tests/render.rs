mod common;

use docfill_core::AnyResult;
use docfill_core::Document;
use predicates::prelude::PredicateBooleanExt;

#[test]
fn render_fills_fields_from_json_data() -> AnyResult<()> {
	let tmp = tempfile::tempdir()?;
	let template = tmp.path().join("contract.docx");
	let output = tmp.path().join("out.docx");

	common::write_docx(
		&template,
		"<w:document><w:body><w:p><w:r><w:t>Уважаемый {f</w:t></w:r><w:r><w:t>io}!</w:t></w:r></w:p></w:body></w:document>",
	);
	std::fs::write(
		tmp.path().join("data.json"),
		r#"{"fio": "Иванов Иван Иванович"}"#,
	)?;

	common::docfill_cmd()
		.arg("render")
		.arg(&template)
		.arg("--data")
		.arg(tmp.path().join("data.json"))
		.arg("--output")
		.arg(&output)
		.assert()
		.success()
		.stdout(predicates::str::contains("rendered"));

	let doc = Document::open(&output)?;
	let content = doc.content()?;
	assert!(content.contains("Уважаемый Иванов Иван Иванович!"), "{content}");

	Ok(())
}

#[test]
fn render_populates_table_regions() -> AnyResult<()> {
	let tmp = tempfile::tempdir()?;
	let template = tmp.path().join("report.docx");
	let output = tmp.path().join("out.docx");

	common::write_docx(
		&template,
		"<w:document><w:body>\
		 <w:p><w:r><w:t>[table/goods]</w:t></w:r></w:p>\
		 <w:tbl><w:tr><w:tc><w:p><w:t>№</w:t></w:p></w:tc></w:tr>\
		 <w:tr><w:tc><w:p><w:t>{name}</w:t></w:p></w:tc></w:tr></w:tbl>\
		 <w:p><w:r><w:t>[/table]</w:t></w:r></w:p>\
		 </w:body></w:document>",
	);
	std::fs::write(
		tmp.path().join("data.json"),
		r#"{"goods": [{"g": {"name": "Болт"}}, {"g": {"name": "Гайка"}}]}"#,
	)?;

	common::docfill_cmd()
		.arg("render")
		.arg(&template)
		.arg("--data")
		.arg(tmp.path().join("data.json"))
		.arg("--output")
		.arg(&output)
		.assert()
		.success();

	let content = Document::open(&output)?.content()?;
	assert!(!content.contains("[table/"), "{content}");
	assert!(content.contains("Болт") && content.contains("Гайка"), "{content}");

	Ok(())
}

#[test]
fn render_without_data_keeps_static_text() -> AnyResult<()> {
	let tmp = tempfile::tempdir()?;
	let template = tmp.path().join("plain.docx");
	let output = tmp.path().join("out.docx");

	common::write_docx(
		&template,
		"<w:document><w:body><w:p><w:r><w:t>static text</w:t></w:r></w:p></w:body></w:document>",
	);

	common::docfill_cmd()
		.arg("render")
		.arg(&template)
		.arg("--output")
		.arg(&output)
		.assert()
		.success();

	let content = Document::open(&output)?.content()?;
	assert!(content.contains("static text"), "{content}");

	Ok(())
}

#[test]
fn render_fails_on_missing_template() {
	common::docfill_cmd()
		.arg("render")
		.arg("does-not-exist.docx")
		.assert()
		.failure();
}

#[test]
fn tags_lists_markers_after_repair() -> AnyResult<()> {
	let tmp = tempfile::tempdir()?;
	let template = tmp.path().join("inspect.docx");

	common::write_docx(
		&template,
		"<w:document><w:body>\
		 <w:p><w:r><w:t>{f</w:t></w:r><w:r><w:t>io}</w:t></w:r></w:p>\
		 <w:p><w:r><w:t>{sum|money}</w:t></w:r></w:p>\
		 <w:p><w:r><w:t>[table/goods]</w:t></w:r></w:p>\
		 </w:body></w:document>",
	);

	common::docfill_cmd()
		.arg("tags")
		.arg(&template)
		.assert()
		.success()
		.stdout(
			predicates::str::contains("{fio}")
				.and(predicates::str::contains("{sum|money}"))
				.and(predicates::str::contains("[table/goods]")),
		);

	Ok(())
}
