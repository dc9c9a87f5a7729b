use std::sync::OnceLock;

use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;

fn regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
	cell.get_or_init(|| Regex::new(pattern).expect("Static pattern must compile."))
}

/// Strips markdown decoration from generated prose so responses read as plain
/// text: bold/italic markers, code fences, inline code, headers, rules.
pub fn clean_markdown(text: &str) -> String {
	static BOLD: OnceLock<Regex> = OnceLock::new();
	static BOLD_UNDERSCORE: OnceLock<Regex> = OnceLock::new();
	static ITALIC: OnceLock<Regex> = OnceLock::new();
	static ITALIC_UNDERSCORE: OnceLock<Regex> = OnceLock::new();
	static FENCE: OnceLock<Regex> = OnceLock::new();
	static INLINE_CODE: OnceLock<Regex> = OnceLock::new();
	static HEADER: OnceLock<Regex> = OnceLock::new();
	static RULE: OnceLock<Regex> = OnceLock::new();
	static EXTRA_NEWLINES: OnceLock<Regex> = OnceLock::new();

	let mut out = text.to_string();

	out = regex(&FENCE, r"(?s)```(?:[a-zA-Z0-9_-]*\n)?(.*?)```").replace_all(&out, "$1").into_owned();
	out = regex(&INLINE_CODE, r"`([^`]*)`").replace_all(&out, "$1").into_owned();
	out = regex(&BOLD, r"\*\*(.*?)\*\*").replace_all(&out, "$1").into_owned();
	out = regex(&BOLD_UNDERSCORE, r"__(.*?)__").replace_all(&out, "$1").into_owned();
	out = regex(&ITALIC, r"\*(.*?)\*").replace_all(&out, "$1").into_owned();
	out = regex(&ITALIC_UNDERSCORE, r"_(.*?)_").replace_all(&out, "$1").into_owned();
	out = regex(&HEADER, r"(?m)^#+\s*").replace_all(&out, "").into_owned();
	out = regex(&RULE, r"(?m)^[-*]{3,}\s*$").replace_all(&out, "").into_owned();
	out = regex(&EXTRA_NEWLINES, r"\n\s*\n\s*\n").replace_all(&out, "\n\n").into_owned();

	out.trim().to_string()
}

/// Cleans markdown and makes sure prose ends with sentence punctuation.
pub fn humanize(text: &str) -> String {
	let mut out = clean_markdown(text);

	if !out.is_empty() && !out.ends_with(['.', '!', '?']) {
		out.push('.');
	}

	out
}

/// Grapheme-aware truncation with an ellipsis when the text is cut.
pub fn truncate_graphemes(text: &str, max: usize) -> String {
	let mut graphemes = text.graphemes(true);
	let head: String = graphemes.by_ref().take(max).collect();

	if graphemes.next().is_some() { format!("{head}...") } else { head }
}
