use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use oxc::{
    allocator::Allocator,
    codegen::{Codegen, CodegenOptions},
    minifier::{Minifier, MinifierOptions},
    parser::Parser,
    span::SourceType,
};

use crate::error::Diagnostic;

/// Compresses source text written in one specific grammar
pub trait GrammarMinifier: Send + Sync {
    fn minify(&self, source: &str) -> Result<String, Diagnostic>;
}

/// Minifies a whole HTML document (comments and whitespace)
pub trait DocumentMinifier: Send + Sync {
    fn minify(&self, html: &str) -> Result<String, Diagnostic>;
}

/// Document minifier backed by `minify-html`.
///
/// Its own JS/CSS minification is turned off: inline fragments are only
/// touched by the dedicated rewrite stages.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlMinifier;

impl DocumentMinifier for HtmlMinifier {
    fn minify(&self, html: &str) -> Result<String, Diagnostic> {
        String::from_utf8(minify_html::minify(
            html.as_bytes(),
            &minify_html::Cfg {
                keep_closing_tags: true,
                keep_comments: false,
                // Templates are served as written, leave their skeleton alone
                do_not_minify_doctype: true,
                keep_html_and_head_opening_tags: true,
                minify_css: false,
                minify_js: false,
                ..Default::default()
            },
        ))
        .map_err(|e| Diagnostic::new(format!("minified document is not valid UTF-8: {e}")))
    }
}

/// JavaScript minifier backed by oxc
#[derive(Debug, Clone, Copy)]
pub struct JsMinifier {
    /// Rename local bindings
    pub mangle: bool,
}

impl Default for JsMinifier {
    fn default() -> Self {
        Self { mangle: true }
    }
}

impl GrammarMinifier for JsMinifier {
    fn minify(&self, source: &str) -> Result<String, Diagnostic> {
        let allocator = Allocator::default();
        // Inline scripts share the global scope, so never treat them as modules
        let source_type = SourceType::default().with_script(true);
        let parsed = Parser::new(&allocator, source, source_type).parse();

        if parsed.panicked || !parsed.errors.is_empty() {
            let Some(first_error) = parsed.errors.first() else {
                return Err(Diagnostic::new("JavaScript compilation error: parser panicked"));
            };
            let diag = Diagnostic::new(format!("JavaScript compilation error: {first_error}"));
            let offset = first_error
                .labels
                .as_ref()
                .and_then(|labels| labels.first())
                .map(|label| label.offset());
            return Err(match offset {
                Some(offset) => {
                    let (line, column) = line_column(source, offset);
                    diag.with_location(line, column)
                }
                None => diag,
            });
        }

        let mut program = parsed.program;
        // Fragments share a page with non-strict scripts, drop the pragma
        program
            .directives
            .retain(|d| d.directive.as_str() != "use strict");
        let mut options = MinifierOptions::default();
        if !self.mangle {
            options.mangle = None;
        }
        let minified = Minifier::new(options).minify(&allocator, &mut program);

        let code = Codegen::new()
            .with_options(CodegenOptions::minify())
            .with_scoping(minified.scoping)
            .build(&program)
            .code;

        Ok(code.trim().to_string())
    }
}

/// One-based line and column of a byte offset
fn line_column(source: &str, offset: usize) -> (u32, u32) {
    let mut end = offset.min(source.len());
    while !source.is_char_boundary(end) {
        end -= 1;
    }
    let before = &source[..end];
    let line = before.matches('\n').count() + 1;
    let column = before
        .rsplit('\n')
        .next()
        .map_or(0, |last| last.chars().count())
        + 1;
    (line as u32, column as u32)
}

/// CSS minifier backed by lightningcss
#[derive(Debug, Clone, Copy, Default)]
pub struct CssMinifier;

impl GrammarMinifier for CssMinifier {
    fn minify(&self, source: &str) -> Result<String, Diagnostic> {
        let mut sheet = StyleSheet::parse(source, ParserOptions::default())
            .map_err(|e| css_diagnostic(e.to_string(), e.loc.as_ref()))?;
        sheet
            .minify(MinifyOptions::default())
            .map_err(|e| css_diagnostic(e.to_string(), e.loc.as_ref()))?;
        sheet
            .to_css(PrinterOptions {
                minify: true,
                ..PrinterOptions::default()
            })
            .map(|s| s.code)
            .map_err(|e| css_diagnostic(e.to_string(), e.loc.as_ref()))
    }
}

fn css_diagnostic(message: String, loc: Option<&lightningcss::error::ErrorLocation>) -> Diagnostic {
    let diag = Diagnostic::new(format!("CSS error: {message}"));
    match loc {
        // lightningcss lines are zero based
        Some(loc) => diag.with_location(loc.line + 1, loc.column),
        None => diag,
    }
}
