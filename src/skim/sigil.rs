// src/skim/sigil.rs
// Compact line-oriented notation for a file graph:
//   # path [lang]     file header
//   !imp              imports
//   $Class < Parent & Iface
//     #method()
//   #fn() -> #callee ★N

use super::graph::FileGraph;
use super::language::Language;

pub fn format_sigil(path: &str, lang: Language, graph: &FileGraph) -> String {
    let mut out = String::new();
    out.push_str(&format!("# {path} [{lang}]\n"));

    if !graph.imports.is_empty() {
        let imports: Vec<String> = graph.imports.iter().map(|i| format!("!{i}")).collect();
        out.push_str(&imports.join(" "));
        out.push('\n');
    }

    for class in &graph.classes {
        out.push_str(&format!("${}", class.name));
        if let Some(extends) = &class.extends {
            out.push_str(&format!(" < {extends}"));
        }
        for iface in &class.implements {
            out.push_str(&format!(" & {iface}"));
        }
        out.push('\n');
        for method in &class.methods {
            out.push_str(&format!("  #{method}()\n"));
        }
    }

    for function in graph.functions.iter().filter(|f| !f.is_method) {
        out.push_str(&format!("#{}()", function.name));
        if !function.calls.is_empty() {
            out.push_str(" ->");
            for call in &function.calls {
                out.push_str(&format!(" #{call}"));
            }
        }
        out.push_str(&format!(" ★{}\n", function.connectivity));
    }

    out
}
