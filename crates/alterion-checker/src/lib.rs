//! Alterion Checker
//!
//! Gradual, structural type checking for parsed Alterion programs, plus
//! [`analyze`], which runs the whole front end (lex, parse, check) over one
//! source unit and gathers every stage's diagnostics in order.
//!
//! # Example
//!
//! ```
//! use alterion_checker::{analyze, AnalyzeOptions, Type};
//!
//! let analysis = analyze(
//!     "component Counter { count = 0\n render: <p>{count}</p> }",
//!     &AnalyzeOptions::default(),
//! );
//! assert!(!analysis.has_errors());
//! let counter = analysis.check.component("Counter").unwrap();
//! assert_eq!(counter.state, vec![("count".to_string(), Type::INT)]);
//! ```

pub mod checker;
pub mod env;
pub mod prelude;
pub mod types;

use std::collections::HashMap;

use alterion_lexer::{LexMode, LexerConfig, Scanner, Token};
use alterion_parser::Program;

pub use alterion_lexer::{Diagnostic, Stage};
pub use checker::{check, CheckResult, ComponentSummary, TypeChecker};
pub use env::TypeEnv;
pub use types::{Primitive, Type};

/// Options for [`analyze`].
#[derive(Debug, Clone, Default)]
pub struct AnalyzeOptions {
    pub lexer: LexerConfig,
    /// Types of `!name` value bindings; unlisted bindings are `any`.
    pub bindings: HashMap<String, Type>,
    /// Name of the unit (usually a file path), carried into the result.
    pub label: Option<String>,
}

/// Output of every front-end stage for one unit.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub label: Option<String>,
    pub tokens: Vec<Token>,
    /// Lexer mode stack at end of input.
    pub modes: Vec<LexMode>,
    pub program: Program,
    /// Lex, then parse, then type diagnostics.
    pub diagnostics: Vec<Diagnostic>,
    pub check: CheckResult,
}

impl Analysis {
    pub fn has_errors(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    pub fn diagnostics_for(&self, stage: Stage) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(move |d| d.stage == stage)
    }
}

/// Lex, parse and type check `source`.
pub fn analyze(source: &str, options: &AnalyzeOptions) -> Analysis {
    run(Scanner::new(source), options)
}

/// Like [`analyze`] for raw bytes; invalid UTF-8 is reported by the lexer.
pub fn analyze_bytes(bytes: &[u8], options: &AnalyzeOptions) -> Analysis {
    run(Scanner::from_bytes(bytes), options)
}

fn run(scanner: Scanner, options: &AnalyzeOptions) -> Analysis {
    let lexed = scanner.with_config(options.lexer.clone()).scan();
    let mut diagnostics = lexed.diagnostics();
    log::debug!(
        "{}: {} tokens, {} lex diagnostics",
        options.label.as_deref().unwrap_or("<input>"),
        lexed.tokens.len(),
        diagnostics.len()
    );

    let parsed = alterion_parser::parse(lexed.tokens.clone());
    diagnostics.extend(parsed.diagnostics);

    let check = TypeChecker::new()
        .with_bindings(options.bindings.clone())
        .check_program(&parsed.program);
    diagnostics.extend(check.diagnostics.iter().cloned());

    Analysis {
        label: options.label.clone(),
        tokens: lexed.tokens,
        modes: lexed.modes,
        program: parsed.program,
        diagnostics,
        check,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alterion_lexer::{KeywordCase, NumberKind, TokenKind};
    use alterion_parser::{ExprKind, Markup, StmtKind};
    use pretty_assertions::assert_eq;

    const COUNTER: &str = r#"component Counter {
    count = 0
    step = !step

    increment {
        count = count + step
    }

    render:
        <div class="counter">
            <span>{count}</span>
            <button @click={increment}>+</button>
        </div>
}
"#;

    #[test]
    fn test_counter_end_to_end() {
        let analysis = analyze(COUNTER, &AnalyzeOptions::default());

        assert_eq!(analysis.diagnostics, vec![]);
        assert_eq!(analysis.modes, vec![LexMode::Normal]);
        assert_eq!(analysis.check.external_bindings, vec!["step"]);

        let counter = &analysis.program.components[0];
        assert_eq!(counter.name, "Counter");
        assert_eq!(counter.statements.len(), 3);
        assert_eq!(counter.body.len(), 1);

        let summary = analysis.check.component("Counter").cloned();
        assert_eq!(
            summary.map(|s| s.state),
            Some(vec![("count".to_string(), Type::INT), ("step".to_string(), Type::Any)])
        );
    }

    #[test]
    fn test_bound_value_types_flow_into_state() {
        let options = AnalyzeOptions {
            bindings: HashMap::from([("step".to_string(), Type::STRING)]),
            ..AnalyzeOptions::default()
        };
        let analysis = analyze(COUNTER, &options);

        // count: Int, step: String, so `count = count + step` stores a String.
        let messages: Vec<_> = analysis.diagnostics.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(messages, vec!["Cannot assign String to Int"]);
        assert_eq!(analysis.diagnostics[0].stage, Stage::Type);
    }

    #[test]
    fn test_interpolation_types_are_recorded() {
        let analysis = analyze(COUNTER, &AnalyzeOptions::default());
        let Markup::Tag(div) = &analysis.program.components[0].body[0] else {
            panic!("Expected div");
        };
        let Markup::Tag(span) = &div.children[0] else {
            panic!("Expected span");
        };
        let Markup::Expr(count) = &span.children[0] else {
            panic!("Expected interpolation");
        };
        assert_eq!(analysis.check.type_of(count.id), Some(&Type::INT));
    }

    #[test]
    fn test_numeric_classification_through_pipeline() {
        let cases = [
            ("let a = 42", NumberKind::Int, Type::INT),
            ("let a = 3.14", NumberKind::Float, Type::FLOAT),
            ("let a = 0xFF", NumberKind::Int, Type::INT),
        ];
        for (source, kind, ty) in cases {
            let analysis = analyze(source, &AnalyzeOptions::default());
            let numbers: Vec<_> = analysis
                .tokens
                .iter()
                .filter_map(|t| match t.kind {
                    TokenKind::Number(kind) => Some(kind),
                    _ => None,
                })
                .collect();
            assert_eq!(numbers, vec![kind], "{source}");

            let StmtKind::Variable(decl) = &analysis.program.statements[0].kind else {
                panic!("Expected variable in {source}");
            };
            let init = decl.init.as_ref().map(|e| e.id);
            assert_eq!(init.and_then(|id| analysis.check.type_of(id)), Some(&ty));
        }
    }

    #[test]
    fn test_arithmetic_widening() {
        let analysis = analyze("let a = 1 + 2\nlet b = 1 + 2.0", &AnalyzeOptions::default());
        let types: Vec<_> = analysis
            .program
            .statements
            .iter()
            .filter_map(|s| match &s.kind {
                StmtKind::Variable(decl) => decl.init.as_ref(),
                _ => None,
            })
            .map(|init| {
                assert!(matches!(init.kind, ExprKind::Binary { .. }));
                analysis.check.type_of(init.id).cloned()
            })
            .collect();
        assert_eq!(types, vec![Some(Type::INT), Some(Type::FLOAT)]);
    }

    #[test]
    fn test_diagnostics_keep_stage_order() {
        let source = "let a = 1 #\nlet b = 2 *\nlet c: Int = \"x\"";
        let analysis = analyze(source, &AnalyzeOptions::default());

        let stages: Vec<Stage> = analysis.diagnostics.iter().map(|d| d.stage).collect();
        assert_eq!(stages, vec![Stage::Lex, Stage::Parse, Stage::Type]);
        assert_eq!(analysis.diagnostics_for(Stage::Type).count(), 1);
        // The statements around the broken one still parse.
        assert_eq!(analysis.program.statements.len(), 3);
    }

    #[test]
    fn test_invalid_utf8_is_a_lex_diagnostic() {
        let analysis = analyze_bytes(b"let s = \"a\xFFb\"\nlet n = 1", &AnalyzeOptions::default());
        assert_eq!(analysis.diagnostics_for(Stage::Lex).count(), 1);
        assert_eq!(analysis.diagnostics_for(Stage::Type).count(), 0);
    }

    #[test]
    fn test_lexer_options_are_applied() {
        let options = AnalyzeOptions {
            lexer: LexerConfig {
                keyword_case: KeywordCase::Insensitive,
                ..LexerConfig::default()
            },
            label: Some("upper.alt".into()),
            ..AnalyzeOptions::default()
        };
        let analysis = analyze("LET x = 1", &options);
        assert_eq!(analysis.diagnostics, vec![]);
        assert_eq!(analysis.label.as_deref(), Some("upper.alt"));
        assert!(matches!(analysis.program.statements[0].kind, StmtKind::Variable(_)));
    }
}
