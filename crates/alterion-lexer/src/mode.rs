use serde::Serialize;

/// Lexical mode: decides how the scanner reads the next character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum LexMode {
    /// Ordinary code: statements, declarations, expressions.
    #[default]
    Normal,
    /// Between `<name` and `>`/`/>`: attribute names, values, `style:`.
    TagAttribute,
    /// Between `>` and the closing tag: text, nested tags, `{expr}`.
    TagContent,
    /// Inside a `{...}` opened from markup; `}` returns to the markup.
    Expression,
    /// The raw text following `style:` inside a tag.
    StyleValue,
}

/// Stack of lexical modes. Never empty; the bottom is always `Normal`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeStack {
    modes: Vec<LexMode>,
}

impl ModeStack {
    pub fn new() -> Self {
        Self {
            modes: vec![LexMode::Normal],
        }
    }

    pub fn current(&self) -> LexMode {
        self.modes.last().copied().unwrap_or_default()
    }

    pub fn push(&mut self, mode: LexMode) {
        log::trace!("lexer mode push {mode:?} (depth {})", self.modes.len());
        self.modes.push(mode);
    }

    /// Pop the current mode. Popping the bottom frame resets it to `Normal`
    /// instead of underflowing.
    pub fn pop(&mut self) -> LexMode {
        let popped = if self.modes.len() > 1 {
            self.modes.pop().unwrap_or_default()
        } else {
            let bottom = self.current();
            self.modes = vec![LexMode::Normal];
            bottom
        };
        log::trace!("lexer mode pop {popped:?} (depth {})", self.modes.len());
        popped
    }

    /// Swap the current mode in place (`<tag ... >` turns TagAttribute into TagContent).
    pub fn replace(&mut self, mode: LexMode) {
        if self.modes.len() > 1 {
            if let Some(top) = self.modes.last_mut() {
                *top = mode;
            }
        } else {
            self.push(mode);
        }
    }

    pub fn into_vec(self) -> Vec<LexMode> {
        self.modes
    }
}

impl Default for ModeStack {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_starts_normal() {
        let stack = ModeStack::new();
        assert_eq!(stack.current(), LexMode::Normal);
        assert_eq!(stack.into_vec(), vec![LexMode::Normal]);
    }

    #[test]
    fn test_push_pop() {
        let mut stack = ModeStack::new();
        stack.push(LexMode::TagAttribute);
        stack.push(LexMode::Expression);
        assert_eq!(stack.pop(), LexMode::Expression);
        assert_eq!(stack.current(), LexMode::TagAttribute);
        assert_eq!(stack.pop(), LexMode::TagAttribute);
        assert_eq!(stack.into_vec(), vec![LexMode::Normal]);
    }

    #[test]
    fn test_pop_past_bottom_is_noop() {
        let mut stack = ModeStack::new();
        stack.pop();
        stack.pop();
        assert_eq!(stack.into_vec(), vec![LexMode::Normal]);
    }

    #[test]
    fn test_replace_top() {
        let mut stack = ModeStack::new();
        stack.push(LexMode::TagAttribute);
        stack.replace(LexMode::TagContent);
        assert_eq!(stack.into_vec(), vec![LexMode::Normal, LexMode::TagContent]);
    }

    #[test]
    fn test_replace_never_overwrites_bottom() {
        let mut stack = ModeStack::new();
        stack.replace(LexMode::TagContent);
        assert_eq!(stack.into_vec(), vec![LexMode::Normal, LexMode::TagContent]);
    }
}
