use crate::{
    error::{Error, Result, Stage},
    html::{
        extract::TagKind,
        process::{CssMinifier, DocumentMinifier, GrammarMinifier, HtmlMinifier, JsMinifier},
        rewrite::rewrite,
    },
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineOptions {
    pub minify_inline_scripts: bool,
    pub minify_inline_styles: bool,
}

/// Per-document minification: whole document first, then inline scripts,
/// then inline styles. Every stage re-scans the text produced by the one
/// before it.
pub struct MinificationPipeline {
    document: Box<dyn DocumentMinifier>,
    script: Box<dyn GrammarMinifier>,
    style: Box<dyn GrammarMinifier>,
    options: PipelineOptions,
}

impl MinificationPipeline {
    pub fn new(options: PipelineOptions) -> Self {
        Self::with_minifiers(
            options,
            Box::new(HtmlMinifier),
            Box::new(JsMinifier::default()),
            Box::new(CssMinifier),
        )
    }

    pub fn with_minifiers(
        options: PipelineOptions,
        document: Box<dyn DocumentMinifier>,
        script: Box<dyn GrammarMinifier>,
        style: Box<dyn GrammarMinifier>,
    ) -> Self {
        Self {
            document,
            script,
            style,
            options,
        }
    }

    pub fn process(&self, source: &str) -> Result<String> {
        let mut text = self
            .document
            .minify(source)
            .map_err(|d| Error::grammar(Stage::Document, d))?;

        if self.options.minify_inline_scripts {
            text = rewrite(&text, TagKind::Script, self.script.as_ref())
                .map_err(|d| Error::grammar(Stage::Script, d))?;
        }

        if self.options.minify_inline_styles {
            text = rewrite(&text, TagKind::Style, self.style.as_ref())
                .map_err(|d| Error::grammar(Stage::Style, d))?;
        }

        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::{error::Diagnostic, html::extract::inline_blocks};

    /// Records the order in which stages run
    #[derive(Clone, Default)]
    struct Trace(Arc<Mutex<Vec<String>>>);

    struct Tagged(&'static str, Trace);

    impl DocumentMinifier for Tagged {
        fn minify(&self, html: &str) -> Result<String, Diagnostic> {
            self.1.0.lock().unwrap().push(self.0.to_string());
            Ok(html.to_string())
        }
    }

    impl GrammarMinifier for Tagged {
        fn minify(&self, source: &str) -> Result<String, Diagnostic> {
            self.1.0.lock().unwrap().push(format!("{}:{source}", self.0));
            Ok(source.trim().to_string())
        }
    }

    struct Failing;

    impl GrammarMinifier for Failing {
        fn minify(&self, _: &str) -> Result<String, Diagnostic> {
            Err(Diagnostic::new("nope"))
        }
    }

    fn traced(options: PipelineOptions, trace: &Trace) -> MinificationPipeline {
        MinificationPipeline::with_minifiers(
            options,
            Box::new(Tagged("doc", trace.clone())),
            Box::new(Tagged("js", trace.clone())),
            Box::new(Tagged("css", trace.clone())),
        )
    }

    const PAGE: &str = "<style> s </style><script> j </script>";

    #[test]
    fn stages_run_in_fixed_order() {
        let trace = Trace::default();
        let pipeline = traced(
            PipelineOptions {
                minify_inline_scripts: true,
                minify_inline_styles: true,
            },
            &trace,
        );
        let out = pipeline.process(PAGE).unwrap();
        assert_eq!(out, "<style>s</style><script>j</script>");
        assert_eq!(*trace.0.lock().unwrap(), ["doc", "js: j ", "css: s "]);
    }

    #[test]
    fn disabled_stages_do_not_run() {
        let trace = Trace::default();
        let out = traced(PipelineOptions::default(), &trace)
            .process(PAGE)
            .unwrap();
        assert_eq!(out, PAGE);
        assert_eq!(*trace.0.lock().unwrap(), ["doc"]);
    }

    #[test]
    fn only_styles() {
        let trace = Trace::default();
        let pipeline = traced(
            PipelineOptions {
                minify_inline_scripts: false,
                minify_inline_styles: true,
            },
            &trace,
        );
        let out = pipeline.process(PAGE).unwrap();
        assert_eq!(out, "<style>s</style><script> j </script>");
    }

    #[test]
    fn failing_fragment_reports_its_stage() {
        let trace = Trace::default();
        let pipeline = MinificationPipeline::with_minifiers(
            PipelineOptions {
                minify_inline_scripts: true,
                minify_inline_styles: true,
            },
            Box::new(Tagged("doc", trace.clone())),
            Box::new(Tagged("js", trace.clone())),
            Box::new(Failing),
        );
        let err = pipeline.process(PAGE).unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Style));
    }

    #[test]
    fn end_to_end_with_real_minifiers() {
        let pipeline = MinificationPipeline::new(PipelineOptions {
            minify_inline_scripts: false,
            minify_inline_styles: true,
        });
        let out = pipeline
            .process("<!-- c --><div>  <p>Hi</p>  </div><style>  .a  {color: red;}  </style>")
            .unwrap();
        assert!(!out.contains("<!--"), "{out}");
        assert!(out.contains("<div><p>Hi</p></div>"), "{out}");
        assert!(out.contains("<style>.a{color:red}</style>"), "{out}");
    }

    #[test]
    fn unescaped_closing_tag_cannot_end_the_style_early() {
        let pipeline = MinificationPipeline::new(PipelineOptions {
            minify_inline_scripts: false,
            minify_inline_styles: true,
        });
        let out = pipeline
            .process(r#"<style>.a::after { content: "<\/style><b>x" }</style><p>after</p>"#)
            .unwrap();
        assert!(out.ends_with("</style><p>after</p>"), "{out}");
        let styles: Vec<_> = inline_blocks(&out, TagKind::Style).collect();
        assert_eq!(styles.len(), 1);
        assert!(styles[0].inner().contains("<b>x"), "{out}");
    }

    #[test]
    fn inline_script_is_minified() {
        let pipeline = MinificationPipeline::new(PipelineOptions {
            minify_inline_scripts: true,
            minify_inline_styles: false,
        });
        let out = pipeline.process("<script>var   x   =   1;</script>").unwrap();
        assert!(out.contains("<script>var x=1"), "{out}");
        assert!(!out.contains("   "), "{out}");
    }

    #[test]
    fn invalid_script_fails_the_document() {
        let pipeline = MinificationPipeline::new(PipelineOptions {
            minify_inline_scripts: true,
            minify_inline_styles: false,
        });
        let err = pipeline.process("<p>x</p><script>function( { </script>").unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Script));
    }
}
