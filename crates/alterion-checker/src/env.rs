use crate::types::Type;

/// Lexical scopes mapping names to types.
///
/// The global scope is created with the environment and is never popped.
#[derive(Debug, Clone)]
pub struct TypeEnv {
    scopes: Vec<Vec<(String, Type)>>,
}

impl TypeEnv {
    pub fn new() -> Self {
        Self {
            scopes: vec![Vec::new()],
        }
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(Vec::new());
        log::trace!("enter scope (depth {})", self.depth());
    }

    /// Leave the innermost scope. Does nothing at global scope.
    pub fn pop_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
            log::trace!("leave scope (depth {})", self.depth());
        }
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Bind `name` in the innermost scope, replacing an earlier binding in
    /// that same scope.
    pub fn define(&mut self, name: impl Into<String>, ty: Type) {
        let name = name.into();
        let Some(scope) = self.scopes.last_mut() else {
            return;
        };
        match scope.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = ty,
            None => scope.push((name, ty)),
        }
    }

    /// Innermost binding of `name`.
    pub fn lookup(&self, name: &str) -> Option<&Type> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.iter().find(|(n, _)| n == name).map(|(_, ty)| ty))
    }

    /// Replace the type of the innermost existing binding of `name`.
    /// Returns `false` if `name` is unbound.
    pub fn update(&mut self, name: &str, ty: Type) -> bool {
        for scope in self.scopes.iter_mut().rev() {
            if let Some(slot) = scope.iter_mut().find(|(n, _)| n == name) {
                slot.1 = ty;
                return true;
            }
        }
        false
    }

    /// Bindings of the innermost scope, in definition order.
    pub fn current_scope(&self) -> &[(String, Type)] {
        self.scopes.last().map(Vec::as_slice).unwrap_or_default()
    }
}

impl Default for TypeEnv {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_lookup_prefers_innermost() {
        let mut env = TypeEnv::new();
        env.define("x", Type::INT);
        env.push_scope();
        env.define("x", Type::STRING);
        assert_eq!(env.lookup("x"), Some(&Type::STRING));
        env.pop_scope();
        assert_eq!(env.lookup("x"), Some(&Type::INT));
    }

    #[test]
    fn test_global_scope_survives_extra_pops() {
        let mut env = TypeEnv::new();
        env.define("g", Type::BOOL);
        env.pop_scope();
        env.pop_scope();
        assert_eq!(env.depth(), 1);
        assert_eq!(env.lookup("g"), Some(&Type::BOOL));
    }

    #[test]
    fn test_update_reaches_outer_scope() {
        let mut env = TypeEnv::new();
        env.define("count", Type::Unknown);
        env.push_scope();
        assert!(env.update("count", Type::INT));
        assert!(!env.update("missing", Type::INT));
        env.pop_scope();
        assert_eq!(env.lookup("count"), Some(&Type::INT));
        assert_eq!(env.lookup("missing"), None);
    }

    #[test]
    fn test_scope_keeps_definition_order() {
        let mut env = TypeEnv::new();
        env.push_scope();
        env.define("b", Type::INT);
        env.define("a", Type::STRING);
        env.define("b", Type::FLOAT);
        let names: Vec<_> = env.current_scope().iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["b", "a"]);
        assert_eq!(env.lookup("b"), Some(&Type::FLOAT));
    }
}
