//! Locates inline `<script>` and `<style>` blocks in HTML text.
//!
//! This is a narrow scanner, not an HTML parser. A block ends at the first
//! literal closing tag, so a script containing the text `</script>` inside a
//! string literal is cut short at that point.

use std::{ops::Range, sync::LazyLock};

use regex_lite::Regex;

static SCRIPT_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<script(\s[^>]*)?>").expect("valid script pattern"));
static STYLE_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<style(\s[^>]*)?>").expect("valid style pattern"));

/// Attributes that keep a script out of inline minification: external
/// sources and templating engine directives
static SCRIPT_EXCLUDED_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bsrc\b|\bth:[^\s=]+").expect("valid attribute pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    Script,
    Style,
}

impl TagKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Script => "script",
            Self::Style => "style",
        }
    }

    fn opening(self) -> &'static Regex {
        match self {
            Self::Script => &*SCRIPT_OPEN,
            Self::Style => &*STYLE_OPEN,
        }
    }

    fn closing(self) -> &'static str {
        match self {
            Self::Script => "</script>",
            Self::Style => "</style>",
        }
    }

    /// Whether an opening tag with these attributes must be left untouched
    fn excludes(self, attrs: &str) -> bool {
        match self {
            Self::Script => SCRIPT_EXCLUDED_ATTR.is_match(attrs),
            Self::Style => false,
        }
    }
}

/// A located inline block. Offsets are only valid for the text it was found in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineBlock<'a> {
    pub kind: TagKind,
    /// From `<` of the opening tag to `>` of the closing tag
    pub span: Range<usize>,
    /// The fragment between the tags
    pub content: Range<usize>,
    source: &'a str,
}

impl<'a> InlineBlock<'a> {
    pub fn inner(&self) -> &'a str {
        &self.source[self.content.clone()]
    }
}

/// Left-to-right iterator over the candidate blocks of one tag kind
#[derive(Debug, Clone)]
pub struct InlineBlocks<'a> {
    html: &'a str,
    kind: TagKind,
    pos: usize,
}

pub fn inline_blocks(html: &str, kind: TagKind) -> InlineBlocks<'_> {
    InlineBlocks { html, kind, pos: 0 }
}

impl<'a> Iterator for InlineBlocks<'a> {
    type Item = InlineBlock<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.pos < self.html.len() {
            let Some(caps) = self.kind.opening().captures_at(self.html, self.pos) else {
                self.pos = self.html.len();
                return None;
            };
            let Some(open) = caps.get(0) else {
                self.pos = self.html.len();
                return None;
            };
            let (start, content_start) = (open.start(), open.end());
            let attrs = caps.get(1).map_or("", |m| m.as_str());

            let closing = self.kind.closing();
            let Some(len) = self.html[content_start..].find(closing) else {
                // Unterminated block, nothing after it can match either
                self.pos = self.html.len();
                return None;
            };
            let content_end = content_start + len;
            let end = content_end + closing.len();
            self.pos = end;

            if self.kind.excludes(attrs) {
                continue;
            }

            return Some(InlineBlock {
                kind: self.kind,
                span: start..end,
                content: content_start..content_end,
                source: self.html,
            });
        }
        None
    }
}

impl std::iter::FusedIterator for InlineBlocks<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn inners(html: &str, kind: TagKind) -> Vec<&str> {
        inline_blocks(html, kind).map(|b| b.inner()).collect()
    }

    #[test]
    fn finds_bare_and_attributed_scripts() {
        let html = r#"<p>a</p><script>one()</script><b>x</b><script type="module">two()</script>"#;
        assert_eq!(inners(html, TagKind::Script), ["one()", "two()"]);
    }

    #[test]
    fn spans_cover_whole_element() {
        let html = "<div><style>.a{}</style></div>";
        let block = inline_blocks(html, TagKind::Style).next().unwrap();
        assert_eq!(&html[block.span.clone()], "<style>.a{}</style>");
        assert_eq!(block.span, 5..24);
        assert_eq!(block.content, 12..16);
    }

    #[test]
    fn multi_line_content() {
        let html = "<script>\nvar a = 1;\nvar b = 2;\n</script>";
        assert_eq!(inners(html, TagKind::Script), ["\nvar a = 1;\nvar b = 2;\n"]);
    }

    #[test]
    fn external_scripts_are_skipped() {
        let html = r#"<script src="x.js">ignored</script><script>kept()</script>"#;
        assert_eq!(inners(html, TagKind::Script), ["kept()"]);
    }

    #[test]
    fn templating_scripts_are_skipped() {
        let html = r#"<script th:inline="javascript">var x = [[${x}]];</script>"#;
        assert!(inners(html, TagKind::Script).is_empty());
    }

    #[test]
    fn excluded_block_is_skipped_as_a_whole() {
        // The skipped block's text must not be rescanned for another opening tag
        let html = r#"<script src="a.js">"<script>"</script><script>b()</script>"#;
        assert_eq!(inners(html, TagKind::Script), ["b()"]);
    }

    #[test]
    fn src_must_be_a_whole_word() {
        let html = r#"<script data-source="x">a()</script>"#;
        assert_eq!(inners(html, TagKind::Script), ["a()"]);
    }

    #[test]
    fn th_inside_a_value_is_not_a_directive() {
        let html = r#"<script style="width:1px">a()</script>"#;
        assert_eq!(inners(html, TagKind::Script), ["a()"]);
    }

    #[test]
    fn styles_have_no_exclusions() {
        let html = r#"<style media="print" th:attr="x">.a{}</style>"#;
        assert_eq!(inners(html, TagKind::Style), [".a{}"]);
    }

    #[test]
    fn similar_tag_names_do_not_match() {
        let html = "<scripts>x</scripts><styles>y</styles>";
        assert!(inners(html, TagKind::Script).is_empty());
        assert!(inners(html, TagKind::Style).is_empty());
    }

    #[test]
    fn first_closing_tag_wins() {
        let html = r#"<script>var s = "</script>"; run();</script>"#;
        let blocks: Vec<_> = inline_blocks(html, TagKind::Script).collect();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].inner(), r#"var s = ""#);
    }

    #[test]
    fn unterminated_block_ends_the_scan() {
        let html = "<script>a()</script><script>never closed";
        let mut blocks = inline_blocks(html, TagKind::Script);
        assert_eq!(blocks.next().map(|b| b.inner()), Some("a()"));
        assert!(blocks.next().is_none());
        assert!(blocks.next().is_none());
    }

    #[test]
    fn iteration_is_restartable() {
        let html = "<style>a{}</style><style>b{}</style>";
        let blocks = inline_blocks(html, TagKind::Style);
        assert_eq!(blocks.clone().count(), 2);
        assert_eq!(blocks.count(), 2);
    }
}
