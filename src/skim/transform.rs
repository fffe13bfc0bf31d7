// src/skim/transform.rs
// AST-based body stripping: parse, mark byte ranges, emit skimmed source

use std::collections::BTreeMap;

use tree_sitter::{Node, Parser};

use super::filter::FilterSet;
use super::language::{Language, NodeTypes};
use crate::error::{DevToolsError, Result};

/// Traversal caps. Depth equal to the cap is fine; one frame more fails.
pub const MAX_AST_DEPTH: usize = 500;
pub const MAX_AST_NODES: usize = 100_000;

/// Replaces every stripped body.
pub const BODY_PLACEHOLDER: &str = " { /* ... */ }";

#[derive(Debug, Clone)]
pub struct TransformResult {
    pub text: String,
    /// Items considered: stripped bodies plus filter-removed items.
    pub total_items: usize,
    /// Items that survived the filter (equals stripped-body count).
    pub matched_items: usize,
    /// Items removed entirely by the filter.
    pub filtered_items: usize,
}

/// Parse `source` and strip function/method bodies, optionally removing
/// whole items that fail the filter.
pub fn skim_source(source: &str, lang: Language, filter: &FilterSet) -> Result<TransformResult> {
    let mut parser = Parser::new();
    parser
        .set_language(&lang.grammar())
        .map_err(|e| DevToolsError::Parse(format!("failed to load {lang} grammar: {e}")))?;
    let tree = parser
        .parse(source, None)
        .ok_or_else(|| DevToolsError::Parse(format!("{lang} parse produced no tree")))?;

    let mut walker = Walker {
        source: source.as_bytes(),
        types: lang.node_types(),
        filter,
        replacements: BTreeMap::new(),
        total: 0,
        matched: 0,
        filtered: 0,
        nodes: 0,
    };
    walker.visit(tree.root_node(), 1)?;

    let text = assemble(source, &walker.replacements)?;
    Ok(TransformResult {
        text,
        total_items: walker.total,
        matched_items: walker.matched,
        filtered_items: walker.filtered,
    })
}

struct Walker<'a> {
    source: &'a [u8],
    types: &'static NodeTypes,
    filter: &'a FilterSet,
    /// byte range -> replacement text (empty string = whole-node removal)
    replacements: BTreeMap<(usize, usize), String>,
    total: usize,
    matched: usize,
    filtered: usize,
    nodes: usize,
}

impl Walker<'_> {
    fn visit(&mut self, node: Node, depth: usize) -> Result<()> {
        if depth > MAX_AST_DEPTH {
            return Err(DevToolsError::AstTooDeep(MAX_AST_DEPTH));
        }
        self.nodes += 1;
        if self.nodes > MAX_AST_NODES {
            return Err(DevToolsError::AstTooLarge(MAX_AST_NODES));
        }

        let kind = node.kind();
        if self.types.functions.contains(&kind) {
            return self.visit_function(node, depth);
        }
        if self.types.classes.contains(&kind) && self.remove_if_filtered(node) {
            return Ok(());
        }
        for child in node.children(&mut node.walk()) {
            self.visit(child, depth + 1)?;
        }
        Ok(())
    }

    fn visit_function(&mut self, node: Node, depth: usize) -> Result<()> {
        if self.remove_if_filtered(node) {
            return Ok(());
        }
        let body = find_body(node, self.types);
        if let Some(body) = body {
            self.total += 1;
            self.matched += 1;
            self.replacements.insert(
                (body.start_byte(), body.end_byte()),
                BODY_PLACEHOLDER.to_string(),
            );
        }
        // Nested items live inside the stripped body; skip it so counts and
        // emitted placeholders stay in lockstep.
        let body_id = body.map(|b| b.id());
        for child in node.children(&mut node.walk()) {
            if Some(child.id()) == body_id {
                continue;
            }
            self.visit(child, depth + 1)?;
        }
        Ok(())
    }

    /// Under an active filter, mark a non-matching named item for removal.
    /// Returns true when the node was removed (callers stop descending).
    fn remove_if_filtered(&mut self, node: Node) -> bool {
        if self.filter.is_empty() {
            return false;
        }
        let Some(name) = item_name_of(node, self.source) else {
            return false;
        };
        if self.filter.matches(&name) {
            return false;
        }
        self.total += 1;
        self.filtered += 1;
        self.replacements
            .insert((node.start_byte(), node.end_byte()), String::new());
        true
    }
}

/// Locate the body child of a function node: the `body` field when the
/// grammar has one, else the first named child with a body node type.
fn find_body<'t>(node: Node<'t>, types: &NodeTypes) -> Option<Node<'t>> {
    if let Some(body) = node.child_by_field_name("body")
        && types.bodies.contains(&body.kind())
    {
        return Some(body);
    }
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .find(|child| types.bodies.contains(&child.kind()))
}

/// Extract the name of a function/method/class node across grammars.
pub(crate) fn item_name_of(node: Node, source: &[u8]) -> Option<String> {
    if let Some(name) = node.child_by_field_name("name") {
        return Some(node_text(name, source));
    }
    // C/C++: the name hides inside a declarator chain.
    if let Some(mut decl) = node.child_by_field_name("declarator") {
        loop {
            if decl.kind().ends_with("identifier") {
                return Some(node_text(decl, source));
            }
            match decl.child_by_field_name("declarator") {
                Some(inner) => decl = inner,
                None => break,
            }
        }
    }
    // Anonymous functions pick up the name they are bound to.
    let parent = node.parent()?;
    match parent.kind() {
        "variable_declarator" => parent
            .child_by_field_name("name")
            .map(|n| node_text(n, source)),
        "pair" => parent
            .child_by_field_name("key")
            .map(|n| node_text(n, source)),
        "assignment_expression" => parent
            .child_by_field_name("left")
            .map(|n| node_text(n, source)),
        _ => None,
    }
}

/// Helper to extract text from a tree-sitter node
pub fn node_text(node: Node, source: &[u8]) -> String {
    std::str::from_utf8(&source[node.byte_range()])
        .unwrap_or("")
        .to_string()
}

/// Emit the source with replacements applied. Ranges are validated; inner
/// ranges overlapped by an earlier replacement are skipped. Whole-node
/// removals also eat the trailing newline and a pure-whitespace line prefix
/// so no blank line is left behind.
fn assemble(source: &str, replacements: &BTreeMap<(usize, usize), String>) -> Result<String> {
    let bytes = source.as_bytes();
    let mut out = String::with_capacity(source.len());
    let mut pos = 0usize;

    for (&(start, end), replacement) in replacements {
        if end < start || end > bytes.len() {
            return Err(DevToolsError::Parse(format!(
                "invalid replacement range {start}..{end} (source length {})",
                bytes.len()
            )));
        }
        if start < pos {
            continue;
        }
        let (mut start, mut end) = (start, end);
        if replacement.is_empty() {
            if end < bytes.len() && bytes[end] == b'\n' {
                end += 1;
            } else if end + 1 < bytes.len() && bytes[end] == b'\r' && bytes[end + 1] == b'\n' {
                end += 2;
            }
            let line_start = source[..start].rfind('\n').map(|i| i + 1).unwrap_or(0);
            if source[line_start..start]
                .chars()
                .all(|c| c == ' ' || c == '\t')
            {
                start = line_start.max(pos);
                // The node occupied whole lines; swallow one separator
                // newline so no blank hole marks where it stood.
                if end < bytes.len() && bytes[end] == b'\n' {
                    end += 1;
                }
            }
        }
        out.push_str(&source[pos..start]);
        out.push_str(replacement);
        pos = end;
    }
    out.push_str(&source[pos..]);
    Ok(out)
}
