use std::{borrow::Cow, sync::LazyLock};

use regex_lite::Regex;

use super::{
    extract::{TagKind, inline_blocks},
    process::GrammarMinifier,
};
use crate::error::Diagnostic;

static SCRIPT_CLOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</(script)").expect("valid script pattern"));
static STYLE_CLOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</(style)").expect("valid style pattern"));

/// Turns `</kind` inside minified code into `<\/kind` so the element is not
/// closed early. Both JS and CSS strings read `\/` as a plain `/`.
fn escape_closing_tags(code: &str, kind: TagKind) -> Cow<'_, str> {
    let pattern = match kind {
        TagKind::Script => &*SCRIPT_CLOSE,
        TagKind::Style => &*STYLE_CLOSE,
    };
    pattern.replace_all(code, r"<\/$1")
}

/// Replaces every candidate inline block of `kind` with a bare
/// `<kind>minified</kind>` element.
///
/// Attributes of the original opening tag are not carried over. Text outside
/// the replaced blocks is copied verbatim. The first fragment the minifier
/// rejects aborts the whole rewrite.
pub fn rewrite(
    html: &str,
    kind: TagKind,
    minifier: &dyn GrammarMinifier,
) -> Result<String, Diagnostic> {
    let name = kind.name();
    let mut out = String::with_capacity(html.len());
    let mut last = 0;

    for block in inline_blocks(html, kind) {
        let minified = minifier.minify(block.inner())?;

        out.push_str(&html[last..block.span.start]);
        // Appended as-is, `$` and `\` in the fragment carry no special meaning
        out.push('<');
        out.push_str(name);
        out.push('>');
        out.push_str(&escape_closing_tags(&minified, kind));
        out.push_str("</");
        out.push_str(name);
        out.push('>');

        last = block.span.end;
    }

    out.push_str(&html[last..]);
    Ok(out)
}
