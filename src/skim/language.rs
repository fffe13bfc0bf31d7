// src/skim/language.rs
// Supported languages, extension mapping, and per-language AST node tables

use std::collections::HashMap;

use once_cell::sync::Lazy;
use std::path::Path;
use strum::{Display, EnumIter};

/// Languages the skim engine can parse. `.tsx` dispatches to its own grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum Language {
    Python,
    Go,
    Javascript,
    Typescript,
    Tsx,
    Rust,
    C,
    Cpp,
    Bash,
    Html,
    Css,
    Swift,
    Java,
    Yaml,
    Hcl,
}

/// Extension (lowercase) -> language. The key set doubles as the fixed
/// supported-extension set used by source resolution.
static EXTENSIONS: Lazy<HashMap<&'static str, Language>> = Lazy::new(|| {
    use Language::*;
    let mut map = HashMap::new();
    for (exts, lang) in [
        (&["py"][..], Python),
        (&["go"][..], Go),
        (&["js", "jsx", "mjs", "cjs"][..], Javascript),
        (&["ts"][..], Typescript),
        (&["tsx"][..], Tsx),
        (&["rs"][..], Rust),
        (&["c", "h"][..], C),
        (&["cpp", "cc", "cxx", "hpp", "hh"][..], Cpp),
        (&["sh", "bash"][..], Bash),
        (&["html", "htm"][..], Html),
        (&["css"][..], Css),
        (&["swift"][..], Swift),
        (&["java"][..], Java),
        (&["yaml", "yml"][..], Yaml),
        (&["hcl", "tf"][..], Hcl),
    ] {
        for ext in exts {
            map.insert(*ext, lang);
        }
    }
    map
});

impl Language {
    /// Detect a language from a file path's extension (case-insensitive).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        EXTENSIONS.get(ext.as_str()).copied()
    }

    /// Whether an extension (without the dot) belongs to a supported language.
    pub fn supports_extension(ext: &str) -> bool {
        EXTENSIONS.contains_key(ext.to_lowercase().as_str())
    }

    /// The tree-sitter grammar for this language.
    pub fn grammar(&self) -> tree_sitter::Language {
        match self {
            Language::Python => tree_sitter_python::LANGUAGE.into(),
            Language::Go => tree_sitter_go::LANGUAGE.into(),
            Language::Javascript => tree_sitter_javascript::LANGUAGE.into(),
            Language::Typescript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Language::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
            Language::Rust => tree_sitter_rust::LANGUAGE.into(),
            Language::C => tree_sitter_c::LANGUAGE.into(),
            Language::Cpp => tree_sitter_cpp::LANGUAGE.into(),
            Language::Bash => tree_sitter_bash::LANGUAGE.into(),
            Language::Html => tree_sitter_html::LANGUAGE.into(),
            Language::Css => tree_sitter_css::LANGUAGE.into(),
            Language::Swift => tree_sitter_swift::LANGUAGE.into(),
            Language::Java => tree_sitter_java::LANGUAGE.into(),
            Language::Yaml => tree_sitter_yaml::LANGUAGE.into(),
            Language::Hcl => tree_sitter_hcl::LANGUAGE.into(),
        }
    }

    pub fn node_types(&self) -> &'static NodeTypes {
        match self {
            Language::Python => &PYTHON,
            Language::Go => &GO,
            Language::Javascript => &JAVASCRIPT,
            Language::Typescript | Language::Tsx => &TYPESCRIPT,
            Language::Rust => &RUST,
            Language::C => &C_LANG,
            Language::Cpp => &CPP,
            Language::Bash => &BASH,
            Language::Html => &EMPTY,
            Language::Css => &EMPTY,
            Language::Swift => &SWIFT,
            Language::Java => &JAVA,
            Language::Yaml => &EMPTY,
            // HCL is declarative: blocks and attributes, no function or
            // class bodies to strip.
            Language::Hcl => &EMPTY,
        }
    }
}

/// Concrete AST node-type names for each semantic role. Body node types are
/// a list because several node kinds may represent a body in one grammar.
pub struct NodeTypes {
    /// Function and method definition nodes whose bodies get stripped.
    pub functions: &'static [&'static str],
    /// Class-like container nodes; traversed, filterable, never stripped.
    pub classes: &'static [&'static str],
    /// Node kinds that count as a body child of a function node.
    pub bodies: &'static [&'static str],
    /// Import/include statement nodes.
    pub imports: &'static [&'static str],
    /// Call-site nodes.
    pub calls: &'static [&'static str],
    /// Member/attribute chain node whose last identifier names the callee.
    pub member: Option<&'static str>,
}

static EMPTY: NodeTypes = NodeTypes {
    functions: &[],
    classes: &[],
    bodies: &[],
    imports: &[],
    calls: &[],
    member: None,
};

static PYTHON: NodeTypes = NodeTypes {
    functions: &["function_definition"],
    classes: &["class_definition"],
    bodies: &["block"],
    imports: &["import_statement", "import_from_statement"],
    calls: &["call"],
    member: Some("attribute"),
};

static GO: NodeTypes = NodeTypes {
    functions: &["function_declaration", "method_declaration"],
    classes: &[],
    bodies: &["block"],
    imports: &["import_declaration"],
    calls: &["call_expression"],
    member: Some("selector_expression"),
};

static JAVASCRIPT: NodeTypes = NodeTypes {
    functions: &[
        "function_declaration",
        "generator_function_declaration",
        "method_definition",
        "arrow_function",
        "function_expression",
    ],
    classes: &["class_declaration"],
    bodies: &["statement_block"],
    imports: &["import_statement"],
    calls: &["call_expression"],
    member: Some("member_expression"),
};

static TYPESCRIPT: NodeTypes = NodeTypes {
    functions: &[
        "function_declaration",
        "generator_function_declaration",
        "method_definition",
        "arrow_function",
        "function_expression",
    ],
    classes: &["class_declaration", "abstract_class_declaration"],
    bodies: &["statement_block"],
    imports: &["import_statement"],
    calls: &["call_expression"],
    member: Some("member_expression"),
};

static RUST: NodeTypes = NodeTypes {
    functions: &["function_item"],
    classes: &["struct_item", "enum_item", "trait_item"],
    bodies: &["block"],
    imports: &["use_declaration"],
    calls: &["call_expression", "macro_invocation"],
    member: Some("field_expression"),
};

static C_LANG: NodeTypes = NodeTypes {
    functions: &["function_definition"],
    classes: &[],
    bodies: &["compound_statement"],
    imports: &["preproc_include"],
    calls: &["call_expression"],
    member: Some("field_expression"),
};

static CPP: NodeTypes = NodeTypes {
    functions: &["function_definition"],
    classes: &["class_specifier", "struct_specifier"],
    bodies: &["compound_statement"],
    imports: &["preproc_include"],
    calls: &["call_expression"],
    member: Some("field_expression"),
};

static BASH: NodeTypes = NodeTypes {
    functions: &["function_definition"],
    classes: &[],
    bodies: &["compound_statement"],
    imports: &[],
    calls: &["command"],
    member: None,
};

static SWIFT: NodeTypes = NodeTypes {
    functions: &["function_declaration", "init_declaration"],
    classes: &["class_declaration", "protocol_declaration"],
    bodies: &["function_body"],
    imports: &["import_declaration"],
    calls: &["call_expression"],
    member: Some("navigation_expression"),
};

static JAVA: NodeTypes = NodeTypes {
    functions: &["method_declaration", "constructor_declaration"],
    classes: &["class_declaration", "interface_declaration"],
    bodies: &["block", "constructor_body"],
    imports: &["import_declaration"],
    calls: &["method_invocation"],
    member: Some("field_access"),
};
