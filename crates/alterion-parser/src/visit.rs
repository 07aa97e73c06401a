//! Read-only traversal of the syntax tree.
//!
//! Each `visit_*` method defaults to the matching `walk_*` function, which
//! visits the node's children in source order. Override a method to act on a
//! node; call the `walk_*` function from the override to keep descending.

use crate::ast::*;

pub trait Visitor {
    fn visit_program(&mut self, program: &Program) {
        walk_program(self, program);
    }

    fn visit_import(&mut self, _import: &Import) {}

    fn visit_export(&mut self, export: &Export) {
        walk_export(self, export);
    }

    fn visit_component(&mut self, component: &Component) {
        walk_component(self, component);
    }

    fn visit_function(&mut self, function: &Function) {
        walk_function(self, function);
    }

    fn visit_block(&mut self, block: &Block) {
        walk_block(self, block);
    }

    fn visit_stmt(&mut self, stmt: &Stmt) {
        walk_stmt(self, stmt);
    }

    fn visit_expr(&mut self, expr: &Expr) {
        walk_expr(self, expr);
    }

    fn visit_identifier(&mut self, _name: &str, _expr: &Expr) {}

    fn visit_value_binding(&mut self, _name: &str, _expr: &Expr) {}

    fn visit_markup(&mut self, markup: &Markup) {
        walk_markup(self, markup);
    }

    fn visit_tag(&mut self, tag: &Tag) {
        walk_tag(self, tag);
    }

    fn visit_attribute(&mut self, attribute: &Attribute) {
        walk_attribute(self, attribute);
    }

    fn visit_text(&mut self, _text: &Text) {}
}

pub fn walk_program<V: Visitor + ?Sized>(v: &mut V, program: &Program) {
    for import in &program.imports {
        v.visit_import(import);
    }
    for export in &program.exports {
        v.visit_export(export);
    }
    for function in &program.functions {
        v.visit_function(function);
    }
    for component in &program.components {
        v.visit_component(component);
    }
    for stmt in &program.statements {
        v.visit_stmt(stmt);
    }
}

pub fn walk_export<V: Visitor + ?Sized>(v: &mut V, export: &Export) {
    match &export.item {
        ExportItem::Function(function) => v.visit_function(function),
        ExportItem::Component(component) => v.visit_component(component),
        ExportItem::Statement(stmt) => v.visit_stmt(stmt),
    }
}

pub fn walk_component<V: Visitor + ?Sized>(v: &mut V, component: &Component) {
    for stmt in &component.statements {
        v.visit_stmt(stmt);
    }
    for markup in &component.body {
        v.visit_markup(markup);
    }
}

pub fn walk_function<V: Visitor + ?Sized>(v: &mut V, function: &Function) {
    v.visit_block(&function.body);
}

pub fn walk_block<V: Visitor + ?Sized>(v: &mut V, block: &Block) {
    for stmt in &block.statements {
        v.visit_stmt(stmt);
    }
}

pub fn walk_stmt<V: Visitor + ?Sized>(v: &mut V, stmt: &Stmt) {
    match &stmt.kind {
        StmtKind::Expression(expr) | StmtKind::Throw(expr) => v.visit_expr(expr),
        StmtKind::Block(block) => v.visit_block(block),
        StmtKind::Variable(decl) => {
            if let Some(init) = &decl.init {
                v.visit_expr(init);
            }
        }
        StmtKind::Assignment { target, value, .. } => {
            v.visit_expr(target);
            v.visit_expr(value);
        }
        StmtKind::If {
            test,
            consequent,
            alternate,
        } => {
            v.visit_expr(test);
            v.visit_block(consequent);
            if let Some(alternate) = alternate {
                v.visit_stmt(alternate);
            }
        }
        StmtKind::While { test, body } => {
            v.visit_expr(test);
            v.visit_block(body);
        }
        StmtKind::For {
            init,
            test,
            update,
            body,
        } => {
            if let Some(init) = init {
                v.visit_stmt(init);
            }
            if let Some(test) = test {
                v.visit_expr(test);
            }
            if let Some(update) = update {
                v.visit_stmt(update);
            }
            v.visit_block(body);
        }
        StmtKind::ForIn { iterable, body, .. } => {
            v.visit_expr(iterable);
            v.visit_block(body);
        }
        StmtKind::Return(value) => {
            if let Some(value) = value {
                v.visit_expr(value);
            }
        }
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
            v.visit_block(block);
            if let Some(catch) = catch {
                v.visit_block(&catch.body);
            }
            if let Some(finally) = finally {
                v.visit_block(finally);
            }
        }
        StmtKind::Function(function) => v.visit_function(function),
        StmtKind::Import(import) => v.visit_import(import),
        StmtKind::Export(export) => v.visit_export(export),
        StmtKind::Break | StmtKind::Continue | StmtKind::Error(_) => {}
    }
}

pub fn walk_expr<V: Visitor + ?Sized>(v: &mut V, expr: &Expr) {
    match &expr.kind {
        ExprKind::Literal(_) => {}
        ExprKind::Identifier(name) => v.visit_identifier(name, expr),
        ExprKind::ValueBinding(name) => v.visit_value_binding(name, expr),
        ExprKind::Binary { left, right, .. } => {
            v.visit_expr(left);
            v.visit_expr(right);
        }
        ExprKind::Unary { operand, .. } | ExprKind::Await(operand) => v.visit_expr(operand),
        ExprKind::Call { callee, arguments } => {
            v.visit_expr(callee);
            for argument in arguments {
                v.visit_expr(argument);
            }
        }
        ExprKind::Member { object, .. } => v.visit_expr(object),
        ExprKind::Index { object, index } => {
            v.visit_expr(object);
            v.visit_expr(index);
        }
        ExprKind::Array(items) => {
            for item in items {
                v.visit_expr(item);
            }
        }
        ExprKind::Object(properties) => {
            for property in properties {
                if let PropertyKey::Computed(key) = &property.key {
                    v.visit_expr(key);
                }
                v.visit_expr(&property.value);
            }
        }
        ExprKind::Conditional {
            test,
            consequent,
            alternate,
        } => {
            v.visit_expr(test);
            v.visit_expr(consequent);
            v.visit_expr(alternate);
        }
        ExprKind::Tag(tag) => v.visit_tag(tag),
    }
}

pub fn walk_markup<V: Visitor + ?Sized>(v: &mut V, markup: &Markup) {
    match markup {
        Markup::Tag(tag) => v.visit_tag(tag),
        Markup::Text(text) => v.visit_text(text),
        Markup::Expr(expr) => v.visit_expr(expr),
    }
}

pub fn walk_tag<V: Visitor + ?Sized>(v: &mut V, tag: &Tag) {
    for attribute in &tag.attributes {
        v.visit_attribute(attribute);
    }
    for child in &tag.children {
        v.visit_markup(child);
    }
}

pub fn walk_attribute<V: Visitor + ?Sized>(v: &mut V, attribute: &Attribute) {
    if let Some(value) = &attribute.value {
        v.visit_expr(value);
    }
}

/// Names of all `!name` value bindings in the program, in first-use order,
/// without duplicates.
pub fn value_bindings(program: &Program) -> Vec<String> {
    struct Collector(Vec<String>);

    impl Visitor for Collector {
        fn visit_value_binding(&mut self, name: &str, _expr: &Expr) {
            if !self.0.iter().any(|n| n == name) {
                self.0.push(name.to_string());
            }
        }
    }

    let mut collector = Collector(Vec::new());
    collector.visit_program(program);
    collector.0
}
