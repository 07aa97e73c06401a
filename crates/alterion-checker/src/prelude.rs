//! Globals every unit can use without declaring them.

use crate::env::TypeEnv;
use crate::types::Type;

pub fn builtins() -> Vec<(&'static str, Type)> {
    vec![
        (
            "console",
            Type::object([("log", Type::function(vec![Type::Any], Type::NULL))]),
        ),
        (
            "Math",
            Type::object([
                ("sqrt", Type::function(vec![Type::FLOAT], Type::FLOAT)),
                ("pow", Type::function(vec![Type::FLOAT, Type::FLOAT], Type::FLOAT)),
                ("floor", Type::function(vec![Type::FLOAT], Type::INT)),
                ("abs", Type::function(vec![Type::FLOAT], Type::FLOAT)),
            ]),
        ),
    ]
}

/// Define the builtins in the environment's current scope.
pub fn install(env: &mut TypeEnv) {
    for (name, ty) in builtins() {
        env.define(name, ty);
    }
}
