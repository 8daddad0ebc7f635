//! Offline checks on a downloaded, transformed dataset.
//!
//! Compares the CSV the app produced against the messy input fixture with
//! bounded, deterministic heuristics: schema, row count after de-duplication,
//! trimmed names, lowercased emails, parseable dates, and numeric amounts.

use std::fmt;
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::error::{Error, Result};

pub const EXPECTED_COLUMNS: [&str; 6] = ["id", "name", "email", "signup_date", "amount", "notes"];

/// Minimum share of rows that must pass each soft check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
	pub lowercase_emails: f64,
	pub parsed_dates: f64,
	pub numeric_amounts: f64,
}

impl Default for Thresholds {
	fn default() -> Self {
		Self {
			lowercase_emails: 0.80,
			parsed_dates: 0.60,
			numeric_amounts: 0.60,
		}
	}
}

/// Outcome of a passing validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationReport {
	pub input_rows: usize,
	pub output_rows: usize,
	pub lowercase_email_rate: f64,
	pub date_parse_rate: f64,
	pub amount_numeric_rate: f64,
}

impl fmt::Display for ValidationReport {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"Input rows: {}, Output rows: {}, Date parse rate: {:.2}, Amount numeric rate: {:.2}",
			self.input_rows, self.output_rows, self.date_parse_rate, self.amount_numeric_rate
		)
	}
}

/// A CSV file read into memory.
#[derive(Debug, Clone, Default)]
pub struct Table {
	headers: Vec<String>,
	rows: Vec<csv::StringRecord>,
}

impl Table {
	pub fn read(path: &Path) -> Result<Self> {
		let reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
		Self::from_reader(reader)
	}

	pub fn parse(text: &str) -> Result<Self> {
		Self::from_reader(csv::ReaderBuilder::new().flexible(true).from_reader(text.as_bytes()))
	}

	fn from_reader<R: std::io::Read>(mut reader: csv::Reader<R>) -> Result<Self> {
		let headers = reader.headers()?.iter().map(|h| h.trim().to_string()).collect();
		let rows = reader.records().collect::<std::result::Result<Vec<_>, _>>()?;
		Ok(Self { headers, rows })
	}

	pub fn headers(&self) -> &[String] {
		&self.headers
	}

	pub fn len(&self) -> usize {
		self.rows.len()
	}

	pub fn is_empty(&self) -> bool {
		self.rows.is_empty()
	}

	/// Values of `name`, with missing trailing cells read as empty.
	pub fn column(&self, name: &str) -> Option<Vec<&str>> {
		let index = self.headers.iter().position(|h| h == name)?;
		Some(self.rows.iter().map(|row| row.get(index).unwrap_or("")).collect())
	}
}

/// Validates the files at `input` and `output`.
pub fn validate_files(input: &Path, output: &Path) -> Result<ValidationReport> {
	if !input.exists() {
		return Err(Error::Validation(format!("Missing input file: {}", input.display())));
	}
	if !output.exists() {
		return Err(Error::Validation(format!(
			"Missing output file: {}. Run the UI flow first to download the transformed dataset.",
			output.display()
		)));
	}
	validate(&Table::read(input)?, &Table::read(output)?, Thresholds::default())
}

/// Runs every check; the first failure wins.
pub fn validate(input: &Table, output: &Table, thresholds: Thresholds) -> Result<ValidationReport> {
	let missing: Vec<&str> = EXPECTED_COLUMNS
		.iter()
		.copied()
		.filter(|c| !output.headers.iter().any(|h| h == c))
		.collect();
	if !missing.is_empty() {
		return Err(Error::Validation(format!("Output missing expected columns: {missing:?}")));
	}

	let (in_rows, out_rows) = (input.len(), output.len());
	if out_rows > in_rows {
		return Err(Error::Validation(format!(
			"Output row count ({out_rows}) should not exceed input ({in_rows})."
		)));
	}
	if out_rows != in_rows && out_rows + 1 != in_rows {
		return Err(Error::Validation(format!(
			"Unexpected output rows: got {out_rows}, expected {in_rows} or {}.",
			in_rows.saturating_sub(1)
		)));
	}

	let column = |name: &str| output.column(name).unwrap_or_default();

	if let Some(name) = column("name").into_iter().find(|n| n.trim() != *n) {
		return Err(Error::Validation(format!(
			"Found name values with leading/trailing whitespace (trim expected): {name:?}"
		)));
	}

	let lowercase_email_rate = rate(&column("email"), |e| e == e.to_lowercase());
	if lowercase_email_rate < thresholds.lowercase_emails {
		return Err(Error::Validation(format!(
			"Expected most emails lowercased; lowercase ratio={lowercase_email_rate:.2}"
		)));
	}

	let date_parse_rate = rate(&column("signup_date"), parses_as_date);
	if date_parse_rate < thresholds.parsed_dates {
		return Err(Error::Validation(format!(
			"Date parse rate too low ({date_parse_rate:.2}). Expected >= {:.2} after cleaning.",
			thresholds.parsed_dates
		)));
	}

	let amount_numeric_rate = rate(&column("amount"), parses_as_number);
	if amount_numeric_rate < thresholds.numeric_amounts {
		return Err(Error::Validation(format!(
			"Amount numeric rate too low ({amount_numeric_rate:.2}). Expected >= {:.2}.",
			thresholds.numeric_amounts
		)));
	}

	Ok(ValidationReport {
		input_rows: in_rows,
		output_rows: out_rows,
		lowercase_email_rate,
		date_parse_rate,
		amount_numeric_rate,
	})
}

/// Share of `values` satisfying `pred`; an empty column passes vacuously.
fn rate(values: &[&str], pred: impl Fn(&str) -> bool) -> f64 {
	if values.is_empty() {
		return 1.0;
	}
	values.iter().filter(|v| pred(v)).count() as f64 / values.len() as f64
}

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d", "%d-%m-%Y", "%b %d, %Y", "%B %d, %Y", "%d %b %Y"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%m/%d/%Y %H:%M"];

/// Whether `value` reads as a calendar date in one of the common layouts.
pub fn parses_as_date(value: &str) -> bool {
	let value = value.trim();
	if value.is_empty() {
		return false;
	}
	DateTime::parse_from_rfc3339(value).is_ok()
		|| DATE_FORMATS.iter().any(|f| NaiveDate::parse_from_str(value, f).is_ok())
		|| DATETIME_FORMATS.iter().any(|f| NaiveDateTime::parse_from_str(value, f).is_ok())
}

/// Whether `value` is a plain finite number literal once trimmed.
///
/// Currency symbols and thousands separators make a value unparsed; a cleaned
/// amount column holds bare numbers.
pub fn parses_as_number(value: &str) -> bool {
	value.trim().parse::<f64>().is_ok_and(f64::is_finite)
}
