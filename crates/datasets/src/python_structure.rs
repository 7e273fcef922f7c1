//! Python function extraction via tree-sitter
//!
//! Builds the function-level candidate pool for SWE-Bench datasets: every
//! module-level function and class method in a file, with 1-based line spans
//! for mapping patch hunks onto enclosing functions.

use codebench_core::error::{Error, Result};
use tree_sitter::{Node, Parser};

/// A Python function or method with its source span
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PyFunction {
    /// Stable identifier: `{file}/{Class}/{func}` or `{file}/{func}`
    pub qualified_id: String,
    /// Function name
    pub name: String,
    /// Enclosing class, if this is a method
    pub class_name: Option<String>,
    /// First line of the definition (1-based)
    pub start_line: u32,
    /// Last line of the definition (1-based, inclusive)
    pub end_line: u32,
    /// Full source text of the definition
    pub text: String,
}

/// Extract module-level functions and class methods from Python source.
///
/// Functions nested inside other functions are not extracted; they are part
/// of their enclosing function's text.
pub fn extract_functions(file: &str, source: &str) -> Result<Vec<PyFunction>> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_python::LANGUAGE.into())
        .map_err(|e| Error::parse(file.to_string(), format!("Failed to load grammar: {e}")))?;

    let tree = parser
        .parse(source, None)
        .ok_or_else(|| Error::parse(file.to_string(), "Parse returned no tree".to_string()))?;

    let mut functions = Vec::new();
    collect_functions(tree.root_node(), source, file, None, &mut functions);
    Ok(functions)
}

fn collect_functions(
    node: Node,
    source: &str,
    file: &str,
    class_name: Option<&str>,
    out: &mut Vec<PyFunction>,
) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "function_definition" => {
                if let Some(name) = node_field_text(child, "name", source) {
                    let qualified_id = match class_name {
                        Some(class) => format!("{file}/{class}/{name}"),
                        None => format!("{file}/{name}"),
                    };
                    out.push(PyFunction {
                        qualified_id,
                        name: name.to_string(),
                        class_name: class_name.map(str::to_string),
                        start_line: child.start_position().row as u32 + 1,
                        end_line: child.end_position().row as u32 + 1,
                        text: source[child.byte_range()].to_string(),
                    });
                }
                // Do not descend: nested defs stay part of the parent
            }
            "class_definition" => {
                let class = node_field_text(child, "name", source);
                if let Some(body) = child.child_by_field_name("body") {
                    collect_functions(body, source, file, class, out);
                }
            }
            "decorated_definition" => {
                // Unwrap the decorator and handle the inner definition
                collect_functions(child, source, file, class_name, out);
            }
            _ => {
                // Recurse into block-level constructs (if/try at module scope)
                if child.child_count() > 0 && class_name.is_none() {
                    collect_functions(child, source, file, None, out);
                }
            }
        }
    }
}

fn node_field_text<'a>(node: Node, field: &str, source: &'a str) -> Option<&'a str> {
    node.child_by_field_name(field)
        .and_then(|n| source.get(n.byte_range()))
}

/// Identify functions whose span intersects any changed region.
///
/// A zero-length region (pure insertion) is treated as touching the line it
/// starts at, so insertions inside a function body still mark that function.
pub fn changed_function_ids(
    functions: &[PyFunction],
    regions: &[(u32, u32)],
) -> Vec<String> {
    let mut changed = Vec::new();
    for func in functions {
        let touched = regions.iter().any(|&(start, lines)| {
            let end = start + lines.max(1) - 1;
            start <= func.end_line && end >= func.start_line
        });
        if touched {
            changed.push(func.qualified_id.clone());
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SOURCE: &str = "\
import os

def top_level(a, b):
    def inner(x):
        return x
    return inner(a) + b

class Widget:
    def render(self):
        return '<div>'

    @property
    def size(self):
        return 0

if os.name == 'posix':
    def posix_only():
        pass
";

    #[test]
    fn test_extracts_top_level_and_methods() {
        let functions = extract_functions("src/widget.py", SOURCE).expect("parse");
        let ids: Vec<&str> = functions.iter().map(|f| f.qualified_id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "src/widget.py/top_level",
                "src/widget.py/Widget/render",
                "src/widget.py/Widget/size",
                "src/widget.py/posix_only",
            ]
        );
    }

    #[test]
    fn test_nested_functions_not_extracted() {
        let functions = extract_functions("src/widget.py", SOURCE).expect("parse");
        assert!(!functions.iter().any(|f| f.name == "inner"));
    }

    #[test]
    fn test_spans_are_one_based() {
        let functions = extract_functions("src/widget.py", SOURCE).expect("parse");
        let top = &functions[0];
        assert_eq!(top.start_line, 3);
        assert!(top.end_line >= 5);
        assert!(top.text.starts_with("def top_level"));
    }

    #[test]
    fn test_changed_function_ids_intersection() {
        let functions = extract_functions("src/widget.py", SOURCE).expect("parse");
        let render_span = functions
            .iter()
            .find(|f| f.name == "render")
            .map(|f| (f.start_line, 1))
            .expect("render present");

        let changed = changed_function_ids(&functions, &[render_span]);
        assert_eq!(changed, vec!["src/widget.py/Widget/render".to_string()]);
    }

    #[test]
    fn test_zero_length_region_marks_enclosing_function() {
        let functions = extract_functions("src/widget.py", SOURCE).expect("parse");
        let top = functions.iter().find(|f| f.name == "top_level").expect("fn");
        let changed = changed_function_ids(&functions, &[(top.start_line + 1, 0)]);
        assert!(changed.contains(&top.qualified_id));
    }
}
