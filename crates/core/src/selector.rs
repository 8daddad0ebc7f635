//! Element selectors and name matchers.

use std::fmt;

use regex::RegexBuilder;
use serde_json::{Value, json};

/// Matches an accessible name or label text.
///
/// Text is whitespace-normalized before comparison on both sides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextMatcher {
	/// Case-insensitive substring; what a plain string means.
	Contains(String),
	/// Case-sensitive equality.
	Exact(String),
	/// JavaScript-compatible regular expression.
	Pattern { source: String, ignore_case: bool },
}

impl TextMatcher {
	/// Case-insensitive substring match.
	pub fn text(text: impl Into<String>) -> Self {
		Self::Contains(text.into())
	}

	pub fn exact(text: impl Into<String>) -> Self {
		Self::Exact(text.into())
	}

	/// Case-insensitive regex, the `/.../i` form.
	pub fn regex_ignore_case(source: impl Into<String>) -> Self {
		Self::Pattern {
			source: source.into(),
			ignore_case: true,
		}
	}

	pub fn regex(source: impl Into<String>) -> Self {
		Self::Pattern {
			source: source.into(),
			ignore_case: false,
		}
	}

	/// Evaluates the matcher locally.
	///
	/// Mirrors what the page-side resolver does; an invalid pattern never matches.
	pub fn matches(&self, text: &str) -> bool {
		let text = normalize_whitespace(text);
		match self {
			Self::Contains(want) => text.to_lowercase().contains(&normalize_whitespace(want).to_lowercase()),
			Self::Exact(want) => text == normalize_whitespace(want),
			Self::Pattern { source, ignore_case } => RegexBuilder::new(source)
				.case_insensitive(*ignore_case)
				.build()
				.map(|re| re.is_match(&text))
				.unwrap_or(false),
		}
	}

	pub(crate) fn to_json(&self) -> Value {
		match self {
			Self::Contains(text) => json!({ "text": text, "exact": false }),
			Self::Exact(text) => json!({ "text": text, "exact": true }),
			Self::Pattern { source, ignore_case } => json!({
				"pattern": source,
				"flags": if *ignore_case { "i" } else { "" },
			}),
		}
	}
}

impl fmt::Display for TextMatcher {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Contains(text) => write!(f, "{text:?}i"),
			Self::Exact(text) => write!(f, "{text:?}s"),
			Self::Pattern { source, ignore_case } => {
				write!(f, "/{source}/{}", if *ignore_case { "i" } else { "" })
			}
		}
	}
}

impl From<&str> for TextMatcher {
	fn from(text: &str) -> Self {
		Self::text(text)
	}
}

/// Collapses runs of whitespace and trims.
pub fn normalize_whitespace(text: &str) -> String {
	text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// How elements are found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectorKind {
	Css(String),
	/// ARIA role, optionally filtered by accessible name.
	Role { role: String, name: Option<TextMatcher> },
	/// Form control whose label matches.
	Label(TextMatcher),
}

/// A lazily-resolved element query.
///
/// Without an index the query acts on its first match; [`Selector::first`] and
/// [`Selector::nth`] make the choice explicit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
	pub kind: SelectorKind,
	pub index: Option<usize>,
}

impl Selector {
	pub fn css(selector: impl Into<String>) -> Self {
		Self::from_kind(SelectorKind::Css(selector.into()))
	}

	pub fn role(role: impl Into<String>, name: Option<TextMatcher>) -> Self {
		Self::from_kind(SelectorKind::Role {
			role: role.into(),
			name,
		})
	}

	pub fn label(text: impl Into<TextMatcher>) -> Self {
		Self::from_kind(SelectorKind::Label(text.into()))
	}

	fn from_kind(kind: SelectorKind) -> Self {
		Self { kind, index: None }
	}

	pub fn first(self) -> Self {
		self.nth(0)
	}

	pub fn nth(mut self, index: usize) -> Self {
		self.index = Some(index);
		self
	}

	pub(crate) fn resolved_index(&self) -> usize {
		self.index.unwrap_or(0)
	}

	/// JSON spec consumed by the page-side resolver.
	pub(crate) fn to_json(&self) -> Value {
		match &self.kind {
			SelectorKind::Css(selector) => json!({ "kind": "css", "selector": selector }),
			SelectorKind::Role { role, name } => json!({
				"kind": "role",
				"role": role,
				"name": name.as_ref().map(TextMatcher::to_json),
			}),
			SelectorKind::Label(text) => json!({ "kind": "label", "text": text.to_json() }),
		}
	}
}

impl fmt::Display for Selector {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match &self.kind {
			SelectorKind::Css(selector) => write!(f, "css={selector}")?,
			SelectorKind::Role { role, name: Some(name) } => write!(f, "role={role}[name={name}]")?,
			SelectorKind::Role { role, name: None } => write!(f, "role={role}")?,
			SelectorKind::Label(text) => write!(f, "label={text}")?,
		}
		if let Some(index) = self.index {
			write!(f, " >> nth={index}")?;
		}
		Ok(())
	}
}

/// Element state awaited by `wait_for`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitState {
	/// Present in the DOM.
	Attached,
	/// Present with a non-empty box and not `visibility: hidden`.
	Visible,
	/// Absent or not visible.
	Hidden,
}

impl fmt::Display for WaitState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			WaitState::Attached => "attached",
			WaitState::Visible => "visible",
			WaitState::Hidden => "hidden",
		})
	}
}
