//! The type language and its assignability relation.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Primitive {
    Int,
    Float,
    Bool,
    String,
    Null,
}

/// A type. Compared structurally; two separately built `Array<Int>` are the
/// same type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "of")]
pub enum Type {
    Primitive(Primitive),
    Array(Box<Type>),
    /// Fields in declaration order.
    Object(Vec<(String, Type)>),
    Function {
        params: Vec<Type>,
        ret: Box<Type>,
        is_async: bool,
    },
    /// Never empty; build through [`Type::union`].
    Union(Vec<Type>),
    Optional(Box<Type>),
    Component(String),
    /// Opts out of checking: assignable to and from everything.
    Any,
    /// The result of an expression that already failed to check.
    Unknown,
}

impl Type {
    pub const INT: Type = Type::Primitive(Primitive::Int);
    pub const FLOAT: Type = Type::Primitive(Primitive::Float);
    pub const BOOL: Type = Type::Primitive(Primitive::Bool);
    pub const STRING: Type = Type::Primitive(Primitive::String);
    pub const NULL: Type = Type::Primitive(Primitive::Null);

    pub fn array(element: Type) -> Type {
        Type::Array(Box::new(element))
    }

    pub fn optional(inner: Type) -> Type {
        Type::Optional(Box::new(inner))
    }

    pub fn function(params: Vec<Type>, ret: Type) -> Type {
        Type::Function {
            params,
            ret: Box::new(ret),
            is_async: false,
        }
    }

    pub fn object<'a>(fields: impl IntoIterator<Item = (&'a str, Type)>) -> Type {
        Type::Object(
            fields
                .into_iter()
                .map(|(name, ty)| (name.to_string(), ty))
                .collect(),
        )
    }

    /// Union of `members`, flattening nested unions and dropping duplicates.
    /// A single distinct member is returned as itself; no members gives
    /// `Unknown`.
    pub fn union(members: impl IntoIterator<Item = Type>) -> Type {
        let mut flat: Vec<Type> = Vec::new();
        for member in members {
            let nested = match member {
                Type::Union(inner) => inner,
                other => vec![other],
            };
            for ty in nested {
                if !flat.contains(&ty) {
                    flat.push(ty);
                }
            }
        }

        match flat.len() {
            0 => Type::Unknown,
            1 => flat.remove(0),
            _ => Type::Union(flat),
        }
    }

    /// `Int`, `Float`, or a union made only of those.
    pub fn is_numeric(&self) -> bool {
        match self {
            Type::Primitive(Primitive::Int | Primitive::Float) => true,
            Type::Union(members) => members.iter().all(Type::is_numeric),
            _ => false,
        }
    }

    pub fn is_any(&self) -> bool {
        matches!(self, Type::Any)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Type::Unknown)
    }

    /// Field type of an object type.
    pub fn field(&self, name: &str) -> Option<&Type> {
        match self {
            Type::Object(fields) => fields.iter().find(|(n, _)| n == name).map(|(_, ty)| ty),
            _ => None,
        }
    }

    /// Whether a value of type `self` may be stored where `target` is
    /// expected.
    pub fn is_assignable_to(&self, target: &Type) -> bool {
        if self == target {
            return true;
        }

        match (self, target) {
            (Type::Any, _) | (_, Type::Any) => true,
            (Type::Unknown, _) | (_, Type::Unknown) => false,

            (Type::Union(members), _) => members.iter().all(|m| m.is_assignable_to(target)),
            (_, Type::Union(members)) => members.iter().any(|m| self.is_assignable_to(m)),

            (Type::Optional(inner), Type::Optional(target_inner)) => {
                inner.is_assignable_to(target_inner)
            }
            (_, Type::Optional(inner)) => *self == Type::NULL || self.is_assignable_to(inner),
            (Type::Optional(inner), _) => inner.is_assignable_to(target),

            (Type::Primitive(Primitive::Int), Type::Primitive(Primitive::Float)) => true,

            (Type::Array(element), Type::Array(target_element)) => {
                element.is_assignable_to(target_element)
            }

            // The source needs every field the target asks for.
            (Type::Object(_), Type::Object(required)) => required
                .iter()
                .all(|(name, ty)| self.field(name).is_some_and(|f| f.is_assignable_to(ty))),

            (
                Type::Function { params, ret, .. },
                Type::Function {
                    params: target_params,
                    ret: target_ret,
                    ..
                },
            ) => {
                params.len() == target_params.len()
                    && target_params
                        .iter()
                        .zip(params)
                        .all(|(target_param, param)| target_param.is_assignable_to(param))
                    && ret.is_assignable_to(target_ret)
            }

            (Type::Component(name), Type::Component(target_name)) => name == target_name,

            _ => false,
        }
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Primitive::Int => "Int",
            Primitive::Float => "Float",
            Primitive::Bool => "Bool",
            Primitive::String => "String",
            Primitive::Null => "Null",
        })
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Primitive(primitive) => write!(f, "{primitive}"),
            Type::Array(element) => write!(f, "Array<{element}>"),
            Type::Object(fields) => {
                f.write_str("{")?;
                for (i, (name, ty)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{name}: {ty}")?;
                }
                f.write_str("}")
            }
            Type::Function {
                params,
                ret,
                is_async,
            } => {
                if *is_async {
                    f.write_str("async ")?;
                }
                f.write_str("(")?;
                for (i, param) in params.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{param}")?;
                }
                write!(f, ") => {ret}")
            }
            Type::Union(members) => {
                for (i, member) in members.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" | ")?;
                    }
                    write!(f, "{member}")?;
                }
                Ok(())
            }
            Type::Optional(inner) => write!(f, "{inner}?"),
            Type::Component(name) => write!(f, "Component<{name}>"),
            Type::Any => f.write_str("any"),
            Type::Unknown => f.write_str("unknown"),
        }
    }
}
