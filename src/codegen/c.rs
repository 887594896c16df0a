//! C code printer for the loop AST.

use super::CodegenOptions;
use crate::isl::AstNode;
use crate::utils::pretty::CodeFormatter;

/// Print `ast` as C.
///
/// A block prints as a brace block, so an empty schedule yields `{\n}\n`.
/// Loop and branch bodies share the braces of their header.
pub fn print_c(ast: &AstNode, options: &CodegenOptions) -> String {
    let mut f = CodeFormatter::new(&options.indent);
    CPrinter { options }.node(&mut f, ast);
    f.finish()
}

struct CPrinter<'a> {
    options: &'a CodegenOptions,
}

impl CPrinter<'_> {
    fn node(&self, f: &mut CodeFormatter, node: &AstNode) {
        match node {
            AstNode::Block(_) => f.block("", |f| self.body(f, node)),
            AstNode::For {
                iterator,
                init,
                cond,
                inc,
                body,
                parallel,
            } => {
                if *parallel && !self.options.parallel_pragma.is_empty() {
                    f.writeln(&self.options.parallel_pragma);
                }
                let header = format!("for (int {} = {}; {}; {})", iterator, init, cond, inc);
                f.block(&header, |f| self.body(f, body));
            }
            AstNode::If { cond, then, otherwise } => {
                f.block(&format!("if ({})", cond), |f| self.body(f, then));
                if let Some(otherwise) = otherwise {
                    f.block("else", |f| self.body(f, otherwise));
                }
            }
            AstNode::User { call } => f.writeln(&format!("{};", call)),
            AstNode::Mark { id, body } => {
                f.writeln(&format!("// {}", id));
                self.node(f, body);
            }
        }
    }

    /// Children of a block, or a single node, without surrounding braces.
    fn body(&self, f: &mut CodeFormatter, node: &AstNode) {
        match node {
            AstNode::Block(children) => children.iter().for_each(|c| self.node(f, c)),
            other => self.node(f, other),
        }
    }
}
