//! The `style:` shorthand.
//!
//! `<p style: color: red; margin: 0 auto>` arrives from the lexer as one
//! StyleProperty token holding `color: red; margin: 0 auto`.

use crate::ast::StyleDecl;

/// Split raw `key: value; ...` text into declarations.
///
/// Declarations are separated by `;`, property and value by the first `:`.
/// Both sides are trimmed; empty entries and entries without a property are
/// dropped.
pub fn parse_style(text: &str) -> Vec<StyleDecl> {
    text.split(';')
        .filter_map(|decl| {
            let (property, value) = decl.split_once(':')?;
            let property = property.trim();
            if property.is_empty() {
                return None;
            }
            Some(StyleDecl {
                property: property.to_string(),
                value: value.trim().to_string(),
            })
        })
        .collect()
}
