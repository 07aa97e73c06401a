//! Type inference and checking over a parsed program.
//!
//! The checker only reads the tree. Inferred expression types go into a side
//! table keyed by [`NodeId`], and every problem becomes a `Stage::Type`
//! diagnostic. An expression that fails to check gets type `Unknown`, which
//! is accepted silently by everything downstream so one mistake is reported
//! once.

use std::collections::{HashMap, HashSet};

use alterion_lexer::{Diagnostic, NumberKind, Span, Stage};
use alterion_parser::ast::{
    AssignOp, BinaryOp, Block, CatchClause, Component, Export, ExportItem, Expr, ExprKind,
    Function, Import, Literal, Markup, NodeId, Program, PropertyKey, Stmt, StmtKind, Tag,
    TypeExpr, TypeExprKind, UnaryOp, VariableDecl,
};
use alterion_parser::visit::value_bindings;
use serde::Serialize;

use crate::env::TypeEnv;
use crate::prelude;
use crate::types::{Primitive, Type};

/// State and method types of one component.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentSummary {
    pub name: String,
    pub state: Vec<(String, Type)>,
    pub methods: Vec<(String, Type)>,
}

/// Everything the checker learned about a program.
#[derive(Debug, Clone, Default)]
pub struct CheckResult {
    pub diagnostics: Vec<Diagnostic>,
    /// Inferred type of every checked expression.
    pub types: HashMap<NodeId, Type>,
    pub components: Vec<ComponentSummary>,
    /// `!name` bindings the program reads, in first-use order.
    pub external_bindings: Vec<String>,
}

impl CheckResult {
    pub fn type_of(&self, id: NodeId) -> Option<&Type> {
        self.types.get(&id)
    }

    pub fn component(&self, name: &str) -> Option<&ComponentSummary> {
        self.components.iter().find(|c| c.name == name)
    }
}

/// Return types seen while checking one function body.
struct ReturnFrame {
    declared: Option<Type>,
    seen: Vec<Type>,
}

pub struct TypeChecker {
    env: TypeEnv,
    bindings: HashMap<String, Type>,
    components: HashSet<String>,
    returns: Vec<ReturnFrame>,
    diagnostics: Vec<Diagnostic>,
    types: HashMap<NodeId, Type>,
    summaries: Vec<ComponentSummary>,
}

impl TypeChecker {
    pub fn new() -> Self {
        let mut env = TypeEnv::new();
        prelude::install(&mut env);

        Self {
            env,
            bindings: HashMap::new(),
            components: HashSet::new(),
            returns: Vec::new(),
            diagnostics: Vec::new(),
            types: HashMap::new(),
            summaries: Vec::new(),
        }
    }

    /// Types for `!name` value bindings. Bindings not listed are `any`.
    pub fn with_bindings(mut self, bindings: HashMap<String, Type>) -> Self {
        self.bindings = bindings;
        self
    }

    pub fn check_program(mut self, program: &Program) -> CheckResult {
        for import in &program.imports {
            self.check_import(import);
        }

        // Components and functions are visible before their declarations.
        let components = program.components.iter().chain(program.exports.iter().filter_map(
            |export| match &export.item {
                ExportItem::Component(component) => Some(component),
                _ => None,
            },
        ));
        for component in components {
            self.components.insert(component.name.clone());
            self.env
                .define(&component.name, Type::Component(component.name.clone()));
        }

        let functions = program.functions.iter().chain(program.exports.iter().filter_map(
            |export| match &export.item {
                ExportItem::Function(function) => Some(function),
                _ => None,
            },
        ));
        for function in functions {
            let signature = self.signature(function);
            self.env.define(&function.name, signature);
        }

        // Function bodies may read top-level variables; their types are
        // settled when the declaring statement is checked.
        for stmt in &program.statements {
            if let StmtKind::Variable(decl) = &stmt.kind {
                self.env.define(&decl.name, Type::Unknown);
            }
        }

        for function in &program.functions {
            self.check_function(function);
        }
        for stmt in &program.statements {
            self.check_stmt(stmt);
        }
        for export in &program.exports {
            self.check_export(export);
        }
        for component in &program.components {
            self.check_component(component);
        }

        log::debug!(
            "type checked {} components, {} functions ({} diagnostics)",
            program.components.len(),
            program.functions.len(),
            self.diagnostics.len()
        );

        CheckResult {
            diagnostics: self.diagnostics,
            types: self.types,
            components: self.summaries,
            external_bindings: value_bindings(program),
        }
    }

    // =========================================================================
    // Declarations
    // =========================================================================

    fn check_import(&mut self, import: &Import) {
        for name in import.names.iter().chain(&import.default) {
            self.env.define(name, Type::Any);
        }
    }

    fn check_export(&mut self, export: &Export) {
        match &export.item {
            ExportItem::Function(function) => {
                self.check_function(function);
            }
            ExportItem::Component(component) => self.check_component(component),
            ExportItem::Statement(stmt) => self.check_stmt(stmt),
        }
    }

    fn param_types(&mut self, function: &Function) -> Vec<Type> {
        function
            .params
            .iter()
            .map(|p| p.ty.as_ref().map_or(Type::Any, |ty| self.resolve(ty)))
            .collect()
    }

    /// Function type from annotations alone. Unannotated parameters and
    /// returns are `any` until the body has been checked.
    fn signature(&mut self, function: &Function) -> Type {
        let params = self.param_types(function);
        let ret = match &function.return_type {
            Some(ty) => self.resolve(ty),
            None => Type::Any,
        };

        Type::Function {
            params,
            ret: Box::new(ret),
            is_async: function.is_async,
        }
    }

    /// Check a function body and bind the function's final type in the
    /// current scope.
    fn check_function(&mut self, function: &Function) -> Type {
        let params = self.param_types(function);
        let declared = function.return_type.as_ref().map(|ty| self.resolve(ty));

        // Recursive calls see the annotated signature.
        self.env.define(
            &function.name,
            Type::Function {
                params: params.clone(),
                ret: Box::new(declared.clone().unwrap_or(Type::Any)),
                is_async: function.is_async,
            },
        );

        self.env.push_scope();
        for (param, ty) in function.params.iter().zip(&params) {
            self.env.define(&param.name, ty.clone());
        }
        self.returns.push(ReturnFrame {
            declared: declared.clone(),
            seen: Vec::new(),
        });
        self.check_statements(&function.body.statements);
        let frame = self.returns.pop();
        self.env.pop_scope();

        let ret = declared.unwrap_or_else(|| match frame {
            Some(frame) if !frame.seen.is_empty() => Type::union(frame.seen),
            _ => Type::NULL,
        });
        let signature = Type::Function {
            params,
            ret: Box::new(ret),
            is_async: function.is_async,
        };
        self.env.define(&function.name, signature.clone());
        signature
    }

    fn check_component(&mut self, component: &Component) {
        self.env.push_scope();

        // Methods first, so state initializers and markup can reference them.
        let mut methods = Vec::new();
        for stmt in &component.statements {
            if let StmtKind::Function(function) = &stmt.kind {
                let signature = self.signature(function);
                self.env.define(&function.name, signature);
                methods.push(function);
            }
        }

        let mut state = Vec::new();
        for stmt in &component.statements {
            match &stmt.kind {
                StmtKind::Function(_) => {}
                StmtKind::Assignment {
                    target:
                        target @ Expr {
                            kind: ExprKind::Identifier(name),
                            ..
                        },
                    op: AssignOp::Assign,
                    value,
                } if !self.env.current_scope().iter().any(|(n, _)| n == name) => {
                    let ty = self.check_expr(value);
                    self.types.insert(target.id, ty.clone());
                    self.env.define(name, ty);
                    state.push(name.clone());
                }
                StmtKind::Variable(decl) => {
                    self.check_variable(decl, stmt.span);
                    state.push(decl.name.clone());
                }
                _ => self.check_stmt(stmt),
            }
        }

        let method_types: Vec<(String, Type)> = methods
            .into_iter()
            .map(|function| (function.name.clone(), self.check_function(function)))
            .collect();

        for markup in &component.body {
            self.check_markup(markup);
        }

        let state = state
            .into_iter()
            .filter_map(|name| {
                let ty = self.env.lookup(&name)?.clone();
                Some((name, ty))
            })
            .collect();
        self.summaries.push(ComponentSummary {
            name: component.name.clone(),
            state,
            methods: method_types,
        });

        self.env.pop_scope();
    }

    // =========================================================================
    // Statements
    // =========================================================================

    fn check_statements(&mut self, statements: &[Stmt]) {
        for stmt in statements {
            self.check_stmt(stmt);
        }
    }

    fn check_block(&mut self, block: &Block) {
        self.env.push_scope();
        self.check_statements(&block.statements);
        self.env.pop_scope();
    }

    fn check_stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Expression(expr) | StmtKind::Throw(expr) => {
                self.check_expr(expr);
            }
            StmtKind::Block(block) => self.check_block(block),
            StmtKind::Variable(decl) => self.check_variable(decl, stmt.span),
            StmtKind::Assignment { target, op, value } => self.check_assignment(target, *op, value),
            StmtKind::If {
                test,
                consequent,
                alternate,
            } => {
                self.check_expr(test);
                self.check_block(consequent);
                if let Some(alternate) = alternate {
                    self.check_stmt(alternate);
                }
            }
            StmtKind::While { test, body } => {
                self.check_expr(test);
                self.check_block(body);
            }
            StmtKind::For {
                init,
                test,
                update,
                body,
            } => {
                self.env.push_scope();
                if let Some(init) = init {
                    self.check_stmt(init);
                }
                if let Some(test) = test {
                    self.check_expr(test);
                }
                if let Some(update) = update {
                    self.check_stmt(update);
                }
                self.check_block(body);
                self.env.pop_scope();
            }
            StmtKind::ForIn {
                variable,
                iterable,
                body,
            } => {
                let iterable_ty = self.check_expr(iterable);
                let element = match iterable_ty {
                    Type::Array(element) => *element,
                    Type::Primitive(Primitive::String) => Type::STRING,
                    Type::Unknown => Type::Unknown,
                    _ => Type::Any,
                };
                self.env.push_scope();
                self.env.define(variable, element);
                self.check_block(body);
                self.env.pop_scope();
            }
            StmtKind::Return(value) => {
                let ty = match value {
                    Some(value) => self.check_expr(value),
                    None => Type::NULL,
                };
                let span = value.as_ref().map_or(stmt.span, |v| v.span);
                self.record_return(ty, span);
            }
            StmtKind::Break | StmtKind::Continue | StmtKind::Error(_) => {}
            StmtKind::Try {
                block,
                catch,
                finally,
            }
            | StmtKind::Async {
                block,
                catch,
                finally,
            } => {
                self.check_block(block);
                if let Some(catch) = catch {
                    self.check_catch(catch);
                }
                if let Some(finally) = finally {
                    self.check_block(finally);
                }
            }
            StmtKind::Function(function) => {
                self.check_function(function);
            }
            StmtKind::Import(import) => self.check_import(import),
            StmtKind::Export(export) => self.check_export(export),
        }
    }

    fn check_catch(&mut self, catch: &CatchClause) {
        self.env.push_scope();
        if let Some(param) = &catch.param {
            self.env.define(param, Type::Any);
        }
        self.check_block(&catch.body);
        self.env.pop_scope();
    }

    fn check_variable(&mut self, decl: &VariableDecl, span: Span) {
        let annotated = decl.ty.as_ref().map(|ty| self.resolve(ty));
        let init = decl.init.as_ref().map(|init| (self.check_expr(init), init.span));

        let ty = match (annotated, init) {
            (Some(annotated), Some((init_ty, init_span))) => {
                self.expect_assignable(&init_ty, &annotated, init_span);
                annotated
            }
            (Some(annotated), None) => annotated,
            (None, Some((init_ty, _))) => init_ty,
            (None, None) => Type::Unknown,
        };
        log::trace!("{} : {ty} (line {})", decl.name, span.line);
        self.env.define(&decl.name, ty);
    }

    fn check_assignment(&mut self, target: &Expr, op: AssignOp, value: &Expr) {
        let target_ty = match &target.kind {
            ExprKind::Identifier(name) => match self.env.lookup(name).cloned() {
                Some(ty) => {
                    self.types.insert(target.id, ty.clone());
                    ty
                }
                None => {
                    self.error(format!("Undefined variable: {name}"), target.span);
                    self.types.insert(target.id, Type::Unknown);
                    Type::Unknown
                }
            },
            _ => self.check_expr(target),
        };
        let value_ty = self.check_expr(value);

        let result = match op.binary() {
            Some(binary) => self.binary_type(binary, &target_ty, &value_ty, value.span),
            None => value_ty,
        };

        // A variable declared without a type takes the first type stored in it.
        if target_ty.is_unknown() {
            if let ExprKind::Identifier(name) = &target.kind {
                if self.env.lookup(name).is_some() && !result.is_unknown() {
                    self.env.update(name, result);
                }
            }
            return;
        }

        self.expect_assignable(&result, &target_ty, value.span);
    }

    fn record_return(&mut self, ty: Type, span: Span) {
        let Some(frame) = self.returns.last_mut() else {
            return;
        };
        frame.seen.push(ty.clone());
        let declared = frame.declared.clone();

        if let Some(declared) = declared {
            if !ty.is_unknown() && !ty.is_assignable_to(&declared) {
                self.error(
                    format!("Cannot return {ty} from a function declared to return {declared}"),
                    span,
                );
            }
        }
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    /// Infer the type of `expr` and record it in the side table.
    fn check_expr(&mut self, expr: &Expr) -> Type {
        let ty = self.infer(expr);
        self.types.insert(expr.id, ty.clone());
        ty
    }

    fn infer(&mut self, expr: &Expr) -> Type {
        match &expr.kind {
            ExprKind::Literal(literal) => match literal {
                Literal::Number {
                    kind: NumberKind::Int,
                    ..
                } => Type::INT,
                Literal::Number {
                    kind: NumberKind::Float,
                    ..
                } => Type::FLOAT,
                Literal::String(_) => Type::STRING,
                Literal::Bool(_) => Type::BOOL,
                Literal::Null => Type::NULL,
            },

            ExprKind::Identifier(name) => match self.env.lookup(name).cloned() {
                Some(ty) => ty,
                None => {
                    self.error(format!("Undefined variable: {name}"), expr.span);
                    Type::Unknown
                }
            },

            ExprKind::ValueBinding(name) => self.bindings.get(name).cloned().unwrap_or(Type::Any),

            ExprKind::Binary { left, op, right } => {
                let left_ty = self.check_expr(left);
                let right_ty = self.check_expr(right);
                self.binary_type(*op, &left_ty, &right_ty, expr.span)
            }

            ExprKind::Unary { op, operand } => {
                let operand_ty = self.check_expr(operand);
                match op {
                    UnaryOp::Not => Type::BOOL,
                    UnaryOp::Neg | UnaryOp::Plus => {
                        if operand_ty.is_numeric() || operand_ty.is_any() || operand_ty.is_unknown()
                        {
                            operand_ty
                        } else {
                            self.error(
                                format!("Unary {op} requires numeric type, got {operand_ty}"),
                                expr.span,
                            );
                            Type::Unknown
                        }
                    }
                }
            }

            ExprKind::Await(operand) => self.check_expr(operand),

            ExprKind::Call { callee, arguments } => self.check_call(callee, arguments, expr.span),

            ExprKind::Member { object, property } => {
                let object_ty = self.check_expr(object);
                self.member_type(&object_ty, property, expr.span)
            }

            ExprKind::Index { object, index } => {
                let object_ty = self.check_expr(object);
                let index_ty = self.check_expr(index);
                self.index_type(&object_ty, &index_ty, expr.span)
            }

            ExprKind::Array(items) => {
                if items.is_empty() {
                    return Type::array(Type::Unknown);
                }
                let element_types: Vec<Type> =
                    items.iter().map(|item| self.check_expr(item)).collect();
                Type::array(Type::union(element_types))
            }

            ExprKind::Object(properties) => {
                let mut fields: Vec<(String, Type)> = Vec::new();
                for property in properties {
                    let value_ty = self.check_expr(&property.value);
                    match &property.key {
                        PropertyKey::Named(name) => {
                            match fields.iter_mut().find(|(n, _)| n == name) {
                                Some(slot) => slot.1 = value_ty,
                                None => fields.push((name.clone(), value_ty)),
                            }
                        }
                        PropertyKey::Computed(key) => {
                            self.check_expr(key);
                        }
                    }
                }
                Type::Object(fields)
            }

            ExprKind::Conditional {
                test,
                consequent,
                alternate,
            } => {
                self.check_expr(test);
                let a = self.check_expr(consequent);
                let b = self.check_expr(alternate);
                Type::union([a, b])
            }

            ExprKind::Tag(tag) => {
                self.check_tag(tag);
                if tag.is_component() && self.components.contains(&tag.name) {
                    Type::Component(tag.name.clone())
                } else {
                    Type::Any
                }
            }
        }
    }

    fn binary_type(&mut self, op: BinaryOp, left: &Type, right: &Type, span: Span) -> Type {
        if op == BinaryOp::And || op == BinaryOp::Or {
            return Type::BOOL;
        }
        if left.is_unknown() || right.is_unknown() {
            return if op.is_comparison() {
                Type::BOOL
            } else {
                Type::Unknown
            };
        }

        if op.is_comparison() {
            if !left.is_assignable_to(right) && !right.is_assignable_to(left) {
                self.error(
                    format!("Cannot compare incompatible types: {left} and {right}"),
                    span,
                );
            }
            return Type::BOOL;
        }

        if op == BinaryOp::Add && (*left == Type::STRING || *right == Type::STRING) {
            return Type::STRING;
        }
        if left.is_any() || right.is_any() {
            return Type::Any;
        }
        if left.is_numeric() && right.is_numeric() {
            return if *left == Type::INT && *right == Type::INT {
                Type::INT
            } else {
                Type::FLOAT
            };
        }

        self.error(
            format!("Incompatible types for operator {op}: {left} and {right}"),
            span,
        );
        Type::Unknown
    }

    fn check_call(&mut self, callee: &Expr, arguments: &[Expr], span: Span) -> Type {
        let callee_ty = self.check_expr(callee);
        let argument_types: Vec<Type> = arguments.iter().map(|a| self.check_expr(a)).collect();

        match callee_ty {
            Type::Function { params, ret, .. } => {
                if params.len() != arguments.len() {
                    self.error(
                        format!(
                            "Function expects {} arguments, got {}",
                            params.len(),
                            arguments.len()
                        ),
                        span,
                    );
                }
                for (i, ((param, argument_ty), argument)) in
                    params.iter().zip(&argument_types).zip(arguments).enumerate()
                {
                    if !argument_ty.is_unknown() && !argument_ty.is_assignable_to(param) {
                        self.error(
                            format!(
                                "Argument {} type mismatch: expected {param}, got {argument_ty}",
                                i + 1
                            ),
                            argument.span,
                        );
                    }
                }
                *ret
            }
            Type::Any => Type::Any,
            Type::Unknown => Type::Unknown,
            other => {
                self.error(format!("Cannot call non-function value of type {other}"), span);
                Type::Unknown
            }
        }
    }

    fn member_type(&mut self, object: &Type, property: &str, span: Span) -> Type {
        match object {
            Type::Any | Type::Component(_) => Type::Any,
            Type::Unknown => Type::Unknown,
            Type::Optional(inner) => self.member_type(inner, property, span),
            Type::Object(_) => match object.field(property) {
                Some(ty) => ty.clone(),
                None => {
                    self.error(
                        format!("Property '{property}' does not exist on type {object}"),
                        span,
                    );
                    Type::Unknown
                }
            },
            Type::Array(_) | Type::Primitive(Primitive::String)
                if property == "length" =>
            {
                Type::INT
            }
            Type::Array(_) => {
                self.error(format!("Unknown array property: {property}"), span);
                Type::Unknown
            }
            Type::Primitive(Primitive::String) => {
                self.error(format!("Unknown string property: {property}"), span);
                Type::Unknown
            }
            other => {
                self.error(
                    format!("Cannot access property '{property}' of non-object type {other}"),
                    span,
                );
                Type::Unknown
            }
        }
    }

    fn index_type(&mut self, object: &Type, index: &Type, span: Span) -> Type {
        let numeric_index = index.is_numeric() || index.is_any() || index.is_unknown();
        match object {
            Type::Any => Type::Any,
            Type::Unknown => Type::Unknown,
            Type::Object(_) => Type::Any,
            Type::Array(element) if numeric_index => (**element).clone(),
            Type::Primitive(Primitive::String) if numeric_index => Type::STRING,
            Type::Array(_) | Type::Primitive(Primitive::String) => {
                self.error(format!("Index must be numeric, got {index}"), span);
                Type::Unknown
            }
            other => {
                self.error(format!("Cannot index value of type {other}"), span);
                Type::Unknown
            }
        }
    }

    // =========================================================================
    // Markup
    // =========================================================================

    fn check_markup(&mut self, markup: &Markup) {
        match markup {
            Markup::Tag(tag) => self.check_tag(tag),
            Markup::Text(_) => {}
            Markup::Expr(expr) => {
                self.check_expr(expr);
            }
        }
    }

    fn check_tag(&mut self, tag: &Tag) {
        // Imported components are bound as `any`.
        let known = self.components.contains(&tag.name) || self.env.lookup(&tag.name).is_some();
        if tag.is_component() && !known {
            self.error(format!("Unknown component <{}>", tag.name), tag.span);
        }
        for attribute in &tag.attributes {
            if let Some(value) = &attribute.value {
                self.check_expr(value);
            }
        }
        for child in &tag.children {
            self.check_markup(child);
        }
    }

    // =========================================================================
    // Annotations
    // =========================================================================

    /// The type an annotation names.
    fn resolve(&mut self, ty: &TypeExpr) -> Type {
        match &ty.kind {
            TypeExprKind::Named(name) => match name.as_str() {
                "Int" | "int" | "number" => Type::INT,
                "Float" | "float" => Type::FLOAT,
                "Bool" | "bool" | "boolean" => Type::BOOL,
                "String" | "string" => Type::STRING,
                "Null" | "null" => Type::NULL,
                "any" | "Any" => Type::Any,
                "unknown" => Type::Unknown,
                "Array" => Type::array(Type::Any),
                _ if self.components.contains(name) => Type::Component(name.clone()),
                _ => {
                    self.error(format!("Unknown type: {name}"), ty.span);
                    Type::Unknown
                }
            },
            TypeExprKind::Array(element) => Type::array(self.resolve(element)),
            TypeExprKind::Optional(inner) => Type::optional(self.resolve(inner)),
            TypeExprKind::Union(members) => {
                let members: Vec<Type> = members.iter().map(|m| self.resolve(m)).collect();
                Type::union(members)
            }
        }
    }

    // =========================================================================
    // Diagnostics
    // =========================================================================

    /// Report unless either side is `Unknown`, which was reported upstream.
    fn expect_assignable(&mut self, value: &Type, target: &Type, span: Span) {
        if value.is_unknown() || target.is_unknown() {
            return;
        }
        if !value.is_assignable_to(target) {
            self.error(format!("Cannot assign {value} to {target}"), span);
        }
    }

    fn error(&mut self, message: String, span: Span) {
        log::trace!("type error at {}:{}: {message}", span.line, span.column);
        let diagnostic = Diagnostic::new(Stage::Type, message, span);
        // Annotations are resolved more than once for hoisted functions.
        if !self.diagnostics.contains(&diagnostic) {
            self.diagnostics.push(diagnostic);
        }
    }
}

impl Default for TypeChecker {
    fn default() -> Self {
        Self::new()
    }
}

/// Type check `program` and return only the diagnostics.
pub fn check(program: &Program) -> Vec<Diagnostic> {
    TypeChecker::new().check_program(program).diagnostics
}
