use tree_sitter::{Node, Parser};

use crate::domain::{
    Capture, CallSite, DefinitionKind, Definition, DomainError, ExtractedRecord, HeritageClause,
    HeritageKind, ImportStatement, Language,
};

/// Globally-bound names that are never worth resolving against the
/// symbol table (spec.md §4.6 "noise filter") — standard library entry
/// points and language builtins that show up in nearly every file and
/// never match a project-defined symbol.
///
/// `call_callee_name` only ever extracts the right-hand identifier of a
/// member/attribute call (`console.log(...)` -> `"log"`, `Math.max(...)`
/// -> `"max"`), never the object it hangs off of, so the blocklist has
/// to carry that same granularity rather than the object names.
fn is_noise(name: &str) -> bool {
    const BLOCKLIST: &[&str] = &[
        // Bare identifiers called directly.
        "require", "parseInt", "parseFloat", "setTimeout", "setInterval", "print", "len", "str",
        "int", "float", "range", "super", "isinstance", "type", "enumerate", "zip",
        // Property/attribute names of common built-in objects — `console.*`,
        // `Math.*`, `JSON.*`, `Array.prototype.*`, `Object.*`, `Promise.*`,
        // `Map`/`Set.*`.
        "log", "warn", "error", "info", "debug", "trace", "max", "min", "floor", "ceil", "round",
        "random", "abs", "pow", "sqrt", "parse", "stringify", "map", "filter", "reduce",
        "forEach", "push", "pop", "shift", "unshift", "slice", "splice", "concat", "join",
        "includes", "indexOf", "find", "some", "every", "keys", "values", "entries", "assign",
        "freeze", "create", "isArray", "resolve", "reject", "all", "race", "then", "catch",
        "finally", "has", "get", "set", "delete",
    ];
    BLOCKLIST.contains(&name)
}

/// Walk state threaded through the recursive descent (spec.md §4.4
/// "Enclosing-function resolution"): the nearest enclosing
/// function/method name (for call attribution) and the nearest
/// enclosing class/interface name (for method membership), plus whether
/// the node currently being visited sits under an `export` wrapper.
#[derive(Default, Clone)]
struct WalkContext {
    enclosing_function: Option<String>,
    enclosing_class: Option<String>,
    exported: bool,
}

/// Tree-sitter-backed single-pass extractor (spec.md §4.4). Parses once
/// per file and walks the tree with an explicit ancestor-aware
/// recursion, rather than declarative queries, so enclosing-scope
/// attribution for calls and methods can be computed in the same pass.
pub struct TreeSitterExtractor;

impl TreeSitterExtractor {
    pub fn grammar_for(language: Language) -> Option<tree_sitter::Language> {
        match language {
            Language::TypeScript => Some(tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()),
            Language::JavaScript => Some(tree_sitter_javascript::LANGUAGE.into()),
            Language::Python => Some(tree_sitter_python::LANGUAGE.into()),
            Language::Unknown => None,
        }
    }

    pub fn extract(
        parser: &mut Parser,
        language: Language,
        file_path: &str,
        source: &str,
    ) -> Result<ExtractedRecord, DomainError> {
        let tree = Self::parse(parser, language, file_path, source)?;
        Ok(Self::walk(&tree, language, file_path, source))
    }

    /// Parse-only half of [`Self::extract`], split out so callers that
    /// keep a per-thread [`super::ast_cache::AstCache`] (spec.md §4.4
    /// "worker pool") can check the cache before paying for a re-parse.
    pub fn parse(
        parser: &mut Parser,
        language: Language,
        file_path: &str,
        source: &str,
    ) -> Result<tree_sitter::Tree, DomainError> {
        let grammar = Self::grammar_for(language)
            .ok_or_else(|| DomainError::invalid_input(format!("unsupported language for {file_path}")))?;
        parser
            .set_language(&grammar)
            .map_err(|e| DomainError::internal(format!("failed to set grammar: {e}")))?;

        parser
            .parse(source, None)
            .ok_or_else(|| DomainError::internal(format!("tree-sitter failed to parse {file_path}")))
    }

    /// Walk-only half of [`Self::extract`]: turns an already-parsed tree
    /// into an [`ExtractedRecord`].
    pub fn walk(tree: &tree_sitter::Tree, language: Language, file_path: &str, source: &str) -> ExtractedRecord {
        let mut captures = Vec::new();
        let mut context = WalkContext::default();
        match language {
            Language::Python => walk_python(tree.root_node(), source, &mut context, &mut captures),
            Language::TypeScript | Language::JavaScript => {
                walk_js_like(tree.root_node(), source, language, &mut context, &mut captures)
            }
            Language::Unknown => {}
        }

        ExtractedRecord::from_captures(file_path.to_string(), captures)
    }
}

fn text<'a>(node: Node, source: &'a str) -> &'a str {
    source.get(node.byte_range()).unwrap_or_default()
}

fn line_span(node: Node) -> (u32, u32) {
    (node.start_position().row as u32 + 1, node.end_position().row as u32 + 1)
}

fn visit_children(node: Node, source: &str, language: Language, ctx: &WalkContext, out: &mut Vec<Capture>, f: fn(Node, &str, Language, &mut WalkContext, &mut Vec<Capture>)) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        let mut child_ctx = ctx.clone();
        f(child, source, language, &mut child_ctx, out);
    }
}

fn walk_js_like(node: Node, source: &str, language: Language, ctx: &mut WalkContext, out: &mut Vec<Capture>) {
    match node.kind() {
        "export_statement" => {
            let mut child_ctx = ctx.clone();
            child_ctx.exported = true;
            visit_children(node, source, language, &child_ctx, out, walk_js_like);
            return;
        }
        "function_declaration" => {
            if let Some(name_node) = node.child_by_field_name("name") {
                let (start, end) = line_span(node);
                let name = text(name_node, source).to_string();
                out.push(Capture::Definition(
                    definition(DefinitionKind::Function, &name, start, end, ctx.exported, None),
                ));
                let mut child_ctx = ctx.clone();
                child_ctx.enclosing_function = Some(name);
                child_ctx.exported = false;
                visit_children(node, source, language, &child_ctx, out, walk_js_like);
                return;
            }
        }
        "method_definition" => {
            if let Some(name_node) = node.child_by_field_name("name") {
                let (start, end) = line_span(node);
                let name = text(name_node, source).to_string();
                out.push(Capture::Definition(definition(
                    DefinitionKind::Method,
                    &name,
                    start,
                    end,
                    ctx.exported,
                    ctx.enclosing_class.clone(),
                )));
                let mut child_ctx = ctx.clone();
                child_ctx.enclosing_function = Some(name);
                child_ctx.exported = false;
                visit_children(node, source, language, &child_ctx, out, walk_js_like);
                return;
            }
        }
        "class_declaration" => {
            if let Some(name_node) = node.child_by_field_name("name") {
                let (start, end) = line_span(node);
                let name = text(name_node, source).to_string();
                out.push(Capture::Definition(
                    definition(DefinitionKind::Class, &name, start, end, ctx.exported, None),
                ));

                if let Some(heritage) = node.child_by_field_name("heritage") {
                    collect_heritage(heritage, source, language, &name, out);
                }

                let mut child_ctx = ctx.clone();
                child_ctx.enclosing_class = Some(name);
                child_ctx.exported = false;
                visit_children(node, source, language, &child_ctx, out, walk_js_like);
                return;
            }
        }
        "interface_declaration" if language == Language::TypeScript => {
            if let Some(name_node) = node.child_by_field_name("name") {
                let (start, end) = line_span(node);
                let name = text(name_node, source).to_string();
                out.push(Capture::Definition(definition(
                    DefinitionKind::Interface,
                    &name,
                    start,
                    end,
                    ctx.exported,
                    None,
                )));
            }
        }
        "enum_declaration" if language == Language::TypeScript => {
            if let Some(name_node) = node.child_by_field_name("name") {
                let (start, end) = line_span(node);
                let name = text(name_node, source).to_string();
                out.push(Capture::Definition(definition(DefinitionKind::Enum, &name, start, end, ctx.exported, None)));
            }
        }
        "type_alias_declaration" if language == Language::TypeScript => {
            if let Some(name_node) = node.child_by_field_name("name") {
                let (start, end) = line_span(node);
                let name = text(name_node, source).to_string();
                out.push(Capture::Definition(definition(DefinitionKind::Type, &name, start, end, ctx.exported, None)));
            }
        }
        "variable_declarator" => {
            if let Some(name_node) = node.child_by_field_name("name") {
                if name_node.kind() == "identifier" {
                    let (start, end) = line_span(node);
                    let name = text(name_node, source).to_string();
                    out.push(Capture::Definition(definition(
                        DefinitionKind::Variable,
                        &name,
                        start,
                        end,
                        ctx.exported,
                        ctx.enclosing_class.clone(),
                    )));
                }
            }
        }
        "decorator" => {
            let (start, end) = line_span(node);
            if let Some(name) = decorator_name(node, source) {
                out.push(Capture::Definition(definition(DefinitionKind::Decorator, &name, start, end, false, None)));
            }
        }
        "import_statement" => {
            if let Some(source_node) = node.child_by_field_name("source") {
                let raw = text(source_node, source);
                out.push(Capture::Import(ImportStatement::new(strip_quotes(raw))));
            }
        }
        "call_expression" => {
            if let Some(function_node) = node.child_by_field_name("function") {
                if let Some(name) = call_callee_name(function_node, source) {
                    if !is_noise(&name) {
                        let start = node.start_position();
                        out.push(Capture::Call(
                            CallSite::new(name, start.row as u32 + 1, start.column as u32)
                                .with_enclosing_function(ctx.enclosing_function.clone().unwrap_or_default()),
                        ));
                    }
                }
            }
        }
        _ => {}
    }

    visit_children(node, source, language, ctx, out, walk_js_like);
}

fn walk_python(node: Node, source: &str, ctx: &mut WalkContext, out: &mut Vec<Capture>) {
    match node.kind() {
        "function_definition" => {
            if let Some(name_node) = node.child_by_field_name("name") {
                let (start, end) = line_span(node);
                let name = text(name_node, source).to_string();
                let kind = if ctx.enclosing_class.is_some() { DefinitionKind::Method } else { DefinitionKind::Function };
                out.push(Capture::Definition(definition(
                    kind,
                    &name,
                    start,
                    end,
                    !name.starts_with('_'),
                    ctx.enclosing_class.clone(),
                )));
                let mut child_ctx = ctx.clone();
                child_ctx.enclosing_function = Some(name);
                visit_children_py(node, source, &child_ctx, out);
                return;
            }
        }
        "class_definition" => {
            if let Some(name_node) = node.child_by_field_name("name") {
                let (start, end) = line_span(node);
                let name = text(name_node, source).to_string();
                out.push(Capture::Definition(definition(
                    DefinitionKind::Class,
                    &name,
                    start,
                    end,
                    !name.starts_with('_'),
                    None,
                )));

                if let Some(bases) = node.child_by_field_name("superclasses") {
                    let mut cursor = bases.walk();
                    for base in bases.children(&mut cursor) {
                        if let Some(parent_name) = identifier_text(base, source) {
                            out.push(Capture::Heritage(HeritageClause::new(&name, parent_name, HeritageKind::Extends)));
                        }
                    }
                }

                let mut child_ctx = ctx.clone();
                child_ctx.enclosing_class = Some(name);
                visit_children_py(node, source, &child_ctx, out);
                return;
            }
        }
        "import_statement" | "import_from_statement" => {
            if let Some(source_text) = python_import_source(node, source) {
                out.push(Capture::Import(ImportStatement::new(source_text)));
            }
        }
        "call" => {
            if let Some(function_node) = node.child_by_field_name("function") {
                if let Some(name) = call_callee_name(function_node, source) {
                    if !is_noise(&name) {
                        let start = node.start_position();
                        out.push(Capture::Call(
                            CallSite::new(name, start.row as u32 + 1, start.column as u32)
                                .with_enclosing_function(ctx.enclosing_function.clone().unwrap_or_default()),
                        ));
                    }
                }
            }
        }
        "decorator" => {
            if let Some(name) = decorator_name(node, source) {
                let (start, end) = line_span(node);
                out.push(Capture::Definition(definition(DefinitionKind::Decorator, &name, start, end, false, None)));
            }
        }
        _ => {}
    }

    visit_children_py(node, source, ctx, out);
}

fn visit_children_py(node: Node, source: &str, ctx: &WalkContext, out: &mut Vec<Capture>) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        let mut child_ctx = ctx.clone();
        walk_python(child, source, &mut child_ctx, out);
    }
}

fn definition(kind: DefinitionKind, name: &str, start: u32, end: u32, exported: bool, enclosing_scope: Option<String>) -> Definition {
    let mut def = Definition::new(kind, name, start, end);
    if exported {
        def = def.exported();
    }
    if let Some(scope) = enclosing_scope {
        def = def.with_enclosing_scope(scope);
    }
    def
}

fn collect_heritage(heritage_node: Node, source: &str, language: Language, child_name: &str, out: &mut Vec<Capture>) {
    let mut cursor = heritage_node.walk();
    for clause in heritage_node.children(&mut cursor) {
        let kind = match clause.kind() {
            "extends_clause" => Some(HeritageKind::Extends),
            "implements_clause" if language == Language::TypeScript => Some(HeritageKind::Implements),
            _ => None,
        };
        let Some(kind) = kind else { continue };

        let mut inner = clause.walk();
        for part in clause.children(&mut inner) {
            if let Some(parent_name) = identifier_text(part, source) {
                out.push(Capture::Heritage(HeritageClause::new(child_name, parent_name, kind)));
            }
        }
    }
}

fn identifier_text<'a>(node: Node, source: &'a str) -> Option<&'a str> {
    match node.kind() {
        "identifier" | "type_identifier" => Some(text(node, source)),
        _ => None,
    }
}

fn decorator_name(node: Node, source: &str) -> Option<String> {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "identifier" => return Some(text(child, source).to_string()),
            "call_expression" | "call" => {
                if let Some(function_node) = child.child_by_field_name("function") {
                    return call_callee_name(function_node, source);
                }
            }
            _ => {}
        }
    }
    None
}

fn call_callee_name(function_node: Node, source: &str) -> Option<String> {
    match function_node.kind() {
        "identifier" => Some(text(function_node, source).to_string()),
        "member_expression" | "attribute" => function_node
            .child_by_field_name("property")
            .or_else(|| function_node.child_by_field_name("attribute"))
            .map(|n| text(n, source).to_string()),
        _ => None,
    }
}

fn python_import_source(node: Node, source: &str) -> Option<String> {
    if let Some(module_name) = node.child_by_field_name("module_name") {
        return Some(text(module_name, source).to_string());
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() == "dotted_name" || child.kind() == "aliased_import" {
            return Some(text(child, source).to_string());
        }
    }
    None
}

fn strip_quotes(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.len() >= 2 && (trimmed.starts_with('"') || trimmed.starts_with('\'')) {
        trimmed[1..trimmed.len() - 1].to_string()
    } else {
        trimmed.to_string()
    }
}
