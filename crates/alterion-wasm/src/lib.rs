//! WASM bindings for the Alterion front end.
//!
//! Exposes `tokenize()`, `check()` and `analyze()` to JavaScript via
//! wasm-bindgen. Tokens and diagnostics cross the boundary as plain JS
//! objects built by serde-wasm-bindgen.

use alterion_checker::{AnalyzeOptions, Analysis, Diagnostic};
use alterion_lexer::{Scanner, Token};
use wasm_bindgen::prelude::*;

fn lex(source: &str) -> Vec<Token> {
    Scanner::tokenize(source).tokens
}

fn run(source: &str) -> Analysis {
    alterion_checker::analyze(source, &AnalyzeOptions::default())
}

fn diagnostics(source: &str) -> Vec<Diagnostic> {
    run(source).diagnostics
}

fn to_js<T: serde::Serialize + ?Sized>(value: &T) -> Result<JsValue, JsError> {
    serde_wasm_bindgen::to_value(value).map_err(|e| JsError::new(&e.to_string()))
}

fn set(target: &js_sys::Object, key: &str, value: &JsValue) -> Result<(), JsError> {
    js_sys::Reflect::set(target, &key.into(), value)
        .map(|_| ())
        .map_err(|_| JsError::new(&format!("Failed to set {key} property")))
}

/// Tokenize Alterion source.
///
/// Returns an array of `{ kind, lexeme, span, error }` objects ending with
/// an `Eof` token. Lexical errors appear as `Error` tokens; this never throws
/// for bad input.
#[wasm_bindgen]
pub fn tokenize(source: &str) -> Result<JsValue, JsError> {
    to_js(&lex(source))
}

/// Run lexer, parser and type checker.
///
/// Returns an array of `{ message, line, column, stage }` diagnostics; empty
/// when the source is clean.
#[wasm_bindgen]
pub fn check(source: &str) -> Result<JsValue, JsError> {
    to_js(&diagnostics(source))
}

/// Like `check`, plus what the checker learned.
///
/// Returns `{ diagnostics, components, bindings }` where `components` holds
/// each component's state and method types and `bindings` lists the `!name`
/// values the source reads.
#[wasm_bindgen]
pub fn analyze(source: &str) -> Result<JsValue, JsError> {
    let analysis = run(source);

    let js_obj = js_sys::Object::new();
    set(&js_obj, "diagnostics", &to_js(&analysis.diagnostics)?)?;
    set(&js_obj, "components", &to_js(&analysis.check.components)?)?;
    set(&js_obj, "bindings", &to_js(&analysis.check.external_bindings)?)?;

    Ok(js_obj.into())
}

/// Get the compiler version.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use alterion_checker::{Stage, Type};
    use alterion_lexer::TokenKind;
    use pretty_assertions::assert_eq;

    // =========================================================================
    // Native tests (non-WASM): the functions behind the exports
    // =========================================================================

    #[test]
    fn test_empty_source() {
        let tokens = lex("");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Eof);
        assert_eq!(diagnostics(""), vec![]);
    }

    #[test]
    fn test_tokens_include_errors() {
        let tokens = lex("let x = #");
        assert!(tokens.iter().any(|t| t.kind == TokenKind::Error));
        assert_eq!(tokens.last().map(|t| t.kind), Some(TokenKind::Eof));
    }

    #[test]
    fn test_counter_is_clean() {
        let analysis = run(
            "component Counter {\n  count = 0\n  increment { count = count + 1 }\n  render: <button @click={increment}>{count}</button>\n}",
        );
        assert_eq!(analysis.diagnostics, vec![]);
        assert_eq!(
            analysis.check.components[0].state,
            vec![("count".to_string(), Type::INT)]
        );
    }

    #[test]
    fn test_diagnostics_from_every_stage() {
        let found = diagnostics("let a = 1 #\nlet b: Int = \"x\"\ncomponent { }");
        let stages: Vec<Stage> = found.iter().map(|d| d.stage).collect();
        assert!(stages.contains(&Stage::Lex));
        assert!(stages.contains(&Stage::Parse));
        assert!(stages.contains(&Stage::Type));
    }

    #[test]
    fn test_version() {
        let v = version();
        assert!(!v.is_empty());
        assert!(v.contains('.'));
    }

    #[test]
    fn test_multiple_runs_share_nothing() {
        let first = run("component A { x = 1 }");
        let second = run("component B { y = \"s\" }");
        assert_eq!(first.check.components.len(), 1);
        assert_eq!(first.check.components[0].name, "A");
        assert_eq!(second.check.components[0].name, "B");
        assert_eq!(second.check.components[0].state[0].1, Type::STRING);
    }
}
