// src/skim/graph.rs
// Second-pass AST traversal: imports, functions with outgoing calls,
// classes, and the per-function connectivity rating

use tree_sitter::{Node, Parser};

use super::language::{Language, NodeTypes};
use super::transform::{MAX_AST_DEPTH, MAX_AST_NODES, node_text};
use crate::error::{DevToolsError, Result};

#[derive(Debug, Clone, Default)]
pub struct FileGraph {
    /// Distinct module names in first-seen order.
    pub imports: Vec<String>,
    /// Every function and method in the file, in source order.
    pub functions: Vec<FunctionInfo>,
    pub classes: Vec<ClassInfo>,
}

#[derive(Debug, Clone)]
pub struct FunctionInfo {
    pub name: String,
    pub signature: String,
    /// 1-based starting line.
    pub start_line: usize,
    /// Distinct outgoing call names in first-seen order.
    pub calls: Vec<String>,
    /// Outgoing calls + same-file callers, computed after collection.
    pub connectivity: usize,
    /// True when the function is a method of some class.
    pub is_method: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ClassInfo {
    pub name: String,
    pub extends: Option<String>,
    pub implements: Vec<String>,
    pub methods: Vec<String>,
}

/// Extract the file graph used by sigil output.
pub fn extract_graph(source: &str, lang: Language) -> Result<FileGraph> {
    let mut parser = Parser::new();
    parser
        .set_language(&lang.grammar())
        .map_err(|e| DevToolsError::Parse(format!("failed to load {lang} grammar: {e}")))?;
    let tree = parser
        .parse(source, None)
        .ok_or_else(|| DevToolsError::Parse(format!("{lang} parse produced no tree")))?;

    let mut walker = GraphWalker {
        source: source.as_bytes(),
        types: lang.node_types(),
        graph: FileGraph::default(),
        nodes: 0,
    };
    walker.visit(tree.root_node(), 1, None, None)?;

    let mut graph = walker.graph;
    rate_connectivity(&mut graph.functions);
    Ok(graph)
}

/// connectivity(f) = |distinct outgoing calls| + |other functions calling f|.
/// Call names are matched by bare name; overloads are not disambiguated.
fn rate_connectivity(functions: &mut [FunctionInfo]) {
    let incoming: Vec<usize> = functions
        .iter()
        .map(|f| {
            functions
                .iter()
                .filter(|g| g.name != f.name && g.calls.iter().any(|c| c == &f.name))
                .count()
        })
        .collect();
    for (function, callers) in functions.iter_mut().zip(incoming) {
        function.connectivity = function.calls.len() + callers;
    }
}

struct GraphWalker<'a> {
    source: &'a [u8],
    types: &'static NodeTypes,
    graph: FileGraph,
    nodes: usize,
}

impl GraphWalker<'_> {
    fn visit(
        &mut self,
        node: Node,
        depth: usize,
        class_idx: Option<usize>,
        func_idx: Option<usize>,
    ) -> Result<()> {
        if depth > MAX_AST_DEPTH {
            return Err(DevToolsError::AstTooDeep(MAX_AST_DEPTH));
        }
        self.nodes += 1;
        if self.nodes > MAX_AST_NODES {
            return Err(DevToolsError::AstTooLarge(MAX_AST_NODES));
        }

        let kind = node.kind();
        if self.types.imports.contains(&kind) {
            self.collect_imports(node);
            return Ok(());
        }
        if self.types.functions.contains(&kind) {
            let new_func = self.collect_function(node, class_idx);
            for child in node.children(&mut node.walk()) {
                self.visit(child, depth + 1, class_idx, new_func.or(func_idx))?;
            }
            return Ok(());
        }
        if self.types.classes.contains(&kind) {
            let new_class = self.collect_class(node);
            for child in node.children(&mut node.walk()) {
                self.visit(child, depth + 1, new_class.or(class_idx), None)?;
            }
            return Ok(());
        }
        if self.types.calls.contains(&kind)
            && let Some(fi) = func_idx
            && let Some(callee) = callee_name(node, self.types, self.source)
        {
            let calls = &mut self.graph.functions[fi].calls;
            if !calls.contains(&callee) {
                calls.push(callee);
            }
        }
        for child in node.children(&mut node.walk()) {
            self.visit(child, depth + 1, class_idx, func_idx)?;
        }
        Ok(())
    }

    fn collect_function(&mut self, node: Node, class_idx: Option<usize>) -> Option<usize> {
        let name = super::transform::item_name_of(node, self.source)?;
        let signature = signature_text(node, self.types, self.source);
        if let Some(ci) = class_idx {
            self.graph.classes[ci].methods.push(name.clone());
        }
        self.graph.functions.push(FunctionInfo {
            name,
            signature,
            start_line: node.start_position().row + 1,
            calls: Vec::new(),
            connectivity: 0,
            is_method: class_idx.is_some(),
        });
        Some(self.graph.functions.len() - 1)
    }

    fn collect_class(&mut self, node: Node) -> Option<usize> {
        let name = super::transform::item_name_of(node, self.source)?;
        let mut info = ClassInfo {
            name,
            ..ClassInfo::default()
        };
        collect_heritage(node, self.source, &mut info);
        self.graph.classes.push(info);
        Some(self.graph.classes.len() - 1)
    }

    fn collect_imports(&mut self, node: Node) {
        let mut names = Vec::new();
        import_names(node, self.source, &mut names);
        for name in names {
            if !self.graph.imports.contains(&name) {
                self.graph.imports.push(name);
            }
        }
    }
}

/// Module names from an import-ish node, by node kind.
fn import_names(node: Node, source: &[u8], out: &mut Vec<String>) {
    match node.kind() {
        // Python
        "import_statement" => {
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                match child.kind() {
                    "dotted_name" | "identifier" | "string" => {
                        out.push(trim_import(&node_text(child, source)));
                    }
                    "aliased_import" => {
                        if let Some(name) = child.child_by_field_name("name") {
                            out.push(trim_import(&node_text(name, source)));
                        }
                    }
                    _ => {}
                }
            }
        }
        "import_from_statement" => {
            if let Some(module) = node.child_by_field_name("module_name") {
                out.push(trim_import(&node_text(module, source)));
            }
        }
        // Go: grouped `import (...)` blocks recurse into import_spec_list.
        "import_declaration" | "import_spec_list" => {
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                match child.kind() {
                    "import_spec_list" => import_names(child, source, out),
                    "import_spec" => {
                        if let Some(path) = child.child_by_field_name("path") {
                            out.push(trim_import(&node_text(path, source)));
                        }
                    }
                    // Java/Swift: import_declaration wraps a plain identifier path.
                    "scoped_identifier" | "identifier" => {
                        out.push(trim_import(&node_text(child, source)));
                    }
                    _ => {}
                }
            }
        }
        // C/C++
        "preproc_include" => {
            if let Some(path) = node.child_by_field_name("path") {
                out.push(trim_import(&node_text(path, source)));
            }
        }
        "use_declaration" => {
            if let Some(arg) = node.child_by_field_name("argument") {
                let text = node_text(arg, source);
                let root = text.split("::").next().unwrap_or(&text);
                out.push(root.to_string());
            }
        }
        _ => {
            if let Some(src) = node.child_by_field_name("source") {
                out.push(trim_import(&node_text(src, source)));
            }
        }
    }
}

fn trim_import(raw: &str) -> String {
    raw.trim_matches(|c| c == '"' || c == '\'' || c == '<' || c == '>')
        .to_string()
}

/// Signature: node text up to the body, whitespace collapsed to one line.
fn signature_text(node: Node, types: &NodeTypes, source: &[u8]) -> String {
    let end = node
        .child_by_field_name("body")
        .filter(|b| types.bodies.contains(&b.kind()))
        .map(|b| b.start_byte())
        .unwrap_or_else(|| node.end_byte());
    let text = std::str::from_utf8(&source[node.start_byte()..end]).unwrap_or("");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// extends / implements across grammars.
fn collect_heritage(node: Node, source: &[u8], info: &mut ClassInfo) {
    // Python: first superclass extends, the rest implements.
    if let Some(supers) = node.child_by_field_name("superclasses") {
        let mut cursor = supers.walk();
        for child in supers.named_children(&mut cursor) {
            push_heritage(info, node_text(child, source));
        }
        return;
    }
    // Java
    if let Some(superclass) = node.child_by_field_name("superclass") {
        let mut cursor = superclass.walk();
        if let Some(ty) = superclass.named_children(&mut cursor).last() {
            info.extends = Some(node_text(ty, source));
        }
    }
    if let Some(interfaces) = node.child_by_field_name("interfaces") {
        for ty in named_descendants_of_kind(interfaces, "type_identifier") {
            info.implements.push(node_text(ty, source));
        }
    }
    // JS/TS class_heritage, C++ base_class_clause, Swift inheritance.
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "class_heritage" => {
                let mut hc = child.walk();
                for part in child.named_children(&mut hc) {
                    match part.kind() {
                        "extends_clause" => {
                            let mut pc = part.walk();
                            if let Some(value) = part.named_children(&mut pc).next() {
                                info.extends = Some(node_text(value, source));
                            }
                        }
                        "implements_clause" => {
                            let mut pc = part.walk();
                            for ty in part.named_children(&mut pc) {
                                info.implements.push(node_text(ty, source));
                            }
                        }
                        // Plain JS: the heritage child is the expression itself.
                        _ => {
                            if info.extends.is_none() {
                                info.extends = Some(node_text(part, source));
                            }
                        }
                    }
                }
            }
            "base_class_clause" | "inheritance_specifier" => {
                let mut hc = child.walk();
                for ty in child.named_children(&mut hc) {
                    push_heritage(info, node_text(ty, source));
                }
            }
            _ => {}
        }
    }
}

fn push_heritage(info: &mut ClassInfo, name: String) {
    if info.extends.is_none() {
        info.extends = Some(name);
    } else {
        info.implements.push(name);
    }
}

fn named_descendants_of_kind<'t>(node: Node<'t>, kind: &str) -> Vec<Node<'t>> {
    let mut out = Vec::new();
    let mut stack = vec![node];
    while let Some(current) = stack.pop() {
        let mut cursor = current.walk();
        for child in current.named_children(&mut cursor) {
            if child.kind() == kind {
                out.push(child);
            }
            stack.push(child);
        }
    }
    out
}

/// Callee name of a call node: direct identifiers directly; the language's
/// member-chain node yields the last identifier in the chain.
fn callee_name(node: Node, types: &'static NodeTypes, source: &[u8]) -> Option<String> {
    let target = node
        .child_by_field_name("function")
        .or_else(|| node.child_by_field_name("name"))
        .or_else(|| node.child_by_field_name("macro"))
        .or_else(|| node.named_child(0))?;
    last_identifier(target, types, source, 0)
}

fn last_identifier(
    node: Node,
    types: &'static NodeTypes,
    source: &[u8],
    depth: usize,
) -> Option<String> {
    if depth > 32 {
        return None;
    }
    let kind = node.kind();
    if Some(kind) == types.member {
        return member_tail(node, types, source, depth);
    }
    // Scoped/qualified paths (HashMap::new, ns::f) resolve through their
    // name field; a bare identifier-ish node is already the answer.
    if kind.contains("scoped") || kind.contains("qualified") {
        if let Some(name) = node.child_by_field_name("name") {
            return last_identifier(name, types, source, depth + 1);
        }
    }
    if kind.ends_with("identifier") || kind == "word" || kind == "command_name" {
        return Some(node_text(node, source).trim_end_matches('!').to_string());
    }
    // Wrapper nodes (parenthesized, awaited, ...) fall through to their
    // trailing child.
    let count = node.named_child_count();
    if count > 0 {
        return last_identifier(node.named_child(count - 1)?, types, source, depth + 1);
    }
    None
}

/// Last identifier of the per-language member chain, located by the field
/// name its grammar uses (python `attribute`, js `property`, go/rust/c
/// `field`, swift `suffix`).
fn member_tail(
    node: Node,
    types: &'static NodeTypes,
    source: &[u8],
    depth: usize,
) -> Option<String> {
    for field in ["attribute", "property", "field", "suffix"] {
        if let Some(child) = node.child_by_field_name(field) {
            return last_identifier(child, types, source, depth + 1);
        }
    }
    let count = node.named_child_count();
    last_identifier(node.named_child(count.checked_sub(1)?)?, types, source, depth + 1)
}
