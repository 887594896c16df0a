//! Loop AST read back from iscc's generated C code.
//!
//! iscc prints its AST as C: `for`, `if`/`else`, brace blocks, statement
//! calls, and marks as `// id` comments. Expressions stay opaque strings.

use super::{IslError, IslResult};
use std::collections::BTreeSet;

/// A node of the generated loop AST.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AstNode {
    /// Sequence of nodes
    Block(Vec<AstNode>),
    /// `for (int iterator = init; cond; inc) body`
    For {
        iterator: String,
        init: String,
        cond: String,
        inc: String,
        body: Box<AstNode>,
        parallel: bool,
    },
    /// `if (cond) then else otherwise`
    If {
        cond: String,
        then: Box<AstNode>,
        otherwise: Option<Box<AstNode>>,
    },
    /// Statement instance, e.g. `statement_0(c1, c2)`
    User { call: String },
    /// Annotated subtree
    Mark { id: String, body: Box<AstNode> },
}

impl AstNode {
    /// True for a block with no children.
    pub fn is_empty(&self) -> bool {
        matches!(self, AstNode::Block(v) if v.is_empty())
    }

    /// Mark every `for` whose iterator is `c<d>` with `d` in `dimensions`.
    ///
    /// Only loop headers are inspected, so parameters never match.
    pub fn mark_parallel(&mut self, dimensions: &BTreeSet<usize>) {
        match self {
            AstNode::Block(children) => children
                .iter_mut()
                .for_each(|c| c.mark_parallel(dimensions)),
            AstNode::For {
                iterator,
                body,
                parallel,
                ..
            } => {
                if let Some(d) = coordinate_index(iterator, "c") {
                    if dimensions.contains(&d) {
                        *parallel = true;
                    }
                }
                body.mark_parallel(dimensions);
            }
            AstNode::If { then, otherwise, .. } => {
                then.mark_parallel(dimensions);
                if let Some(o) = otherwise {
                    o.mark_parallel(dimensions);
                }
            }
            AstNode::Mark { body, .. } => body.mark_parallel(dimensions),
            AstNode::User { .. } => {}
        }
    }

    /// Rename the loop iterators `c<d>` to `<prefix><d>`, wherever a `for`
    /// binding them is in scope. Parameters keep their names.
    pub fn rename_iterators(&mut self, prefix: &str) {
        if prefix == "c" {
            return;
        }
        self.rename_in_scope(prefix, &mut Vec::new());
    }

    fn rename_in_scope(&mut self, prefix: &str, bound: &mut Vec<String>) {
        match self {
            AstNode::Block(children) => children
                .iter_mut()
                .for_each(|c| c.rename_in_scope(prefix, bound)),
            AstNode::For {
                iterator,
                init,
                cond,
                inc,
                body,
                ..
            } => {
                // the initializer is evaluated outside the loop's own scope
                *init = rename_coordinates(init, prefix, bound);
                bound.push(iterator.clone());
                *iterator = rename_coordinates(iterator, prefix, bound);
                *cond = rename_coordinates(cond, prefix, bound);
                *inc = rename_coordinates(inc, prefix, bound);
                body.rename_in_scope(prefix, bound);
                bound.pop();
            }
            AstNode::If { cond, then, otherwise } => {
                *cond = rename_coordinates(cond, prefix, bound);
                then.rename_in_scope(prefix, bound);
                if let Some(o) = otherwise {
                    o.rename_in_scope(prefix, bound);
                }
            }
            AstNode::User { call } => *call = rename_coordinates(call, prefix, bound),
            AstNode::Mark { body, .. } => body.rename_in_scope(prefix, bound),
        }
    }

    /// Number of `for` nodes in the tree.
    pub fn loop_count(&self) -> usize {
        self.fold(0, &|acc, n| acc + matches!(n, AstNode::For { .. }) as usize)
    }

    /// Iterators of parallel loops, outermost first.
    pub fn parallel_iterators(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.visit(&mut |n| {
            if let AstNode::For {
                iterator,
                parallel: true,
                ..
            } = n
            {
                out.push(iterator.clone());
            }
        });
        out
    }

    /// Statement calls in execution order.
    pub fn user_calls(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.visit(&mut |n| {
            if let AstNode::User { call } = n {
                out.push(call.clone());
            }
        });
        out
    }

    fn fold<T>(&self, init: T, f: &dyn Fn(T, &AstNode) -> T) -> T {
        let acc = f(init, self);
        match self {
            AstNode::Block(children) => children.iter().fold(acc, |a, c| c.fold(a, f)),
            AstNode::For { body, .. } | AstNode::Mark { body, .. } => body.fold(acc, f),
            AstNode::If { then, otherwise, .. } => {
                let acc = then.fold(acc, f);
                match otherwise {
                    Some(o) => o.fold(acc, f),
                    None => acc,
                }
            }
            AstNode::User { .. } => acc,
        }
    }

    fn visit(&self, f: &mut dyn FnMut(&AstNode)) {
        f(self);
        match self {
            AstNode::Block(children) => children.iter().for_each(|c| c.visit(f)),
            AstNode::For { body, .. } | AstNode::Mark { body, .. } => body.visit(f),
            AstNode::If { then, otherwise, .. } => {
                then.visit(f);
                if let Some(o) = otherwise {
                    o.visit(f);
                }
            }
            AstNode::User { .. } => {}
        }
    }
}

/// `Some(d)` when `name` is `prefix` followed only by decimal digits.
pub(crate) fn coordinate_index(name: &str, prefix: &str) -> Option<usize> {
    let digits = name.strip_prefix(prefix)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Rename the identifiers of `text` that are in `bound` and shaped `c<d>`.
fn rename_coordinates(text: &str, prefix: &str, bound: &[String]) -> String {
    let mut out = String::with_capacity(text.len());
    let mut word = String::new();
    let flush = |word: &mut String, out: &mut String| {
        let is_bound = bound.iter().any(|b| b == word.as_str());
        match coordinate_index(word, "c").filter(|_| is_bound) {
            Some(d) => out.push_str(&format!("{}{}", prefix, d)),
            None => out.push_str(word),
        }
        word.clear();
    };
    for c in text.chars() {
        if is_ident_char(c) {
            word.push(c);
        } else {
            flush(&mut word, &mut out);
            out.push(c);
        }
    }
    flush(&mut word, &mut out);
    out
}

/// Parse the C code printed by an iscc `codegen` command.
///
/// Empty output parses to an empty block.
pub fn parse_iscc_output(text: &str) -> IslResult<AstNode> {
    let mut parser = Parser {
        src: text.as_bytes(),
        pos: 0,
    };
    let mut nodes = Vec::new();
    loop {
        parser.skip_ws();
        if parser.at_end() {
            break;
        }
        nodes.push(parser.statement()?);
    }
    Ok(match nodes.len() {
        1 => nodes.remove(0),
        _ => AstNode::Block(nodes),
    })
}

struct Parser<'a> {
    src: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    /// Trimmed source text between `start` and the cursor.
    fn text_from(&self, start: usize) -> String {
        String::from_utf8_lossy(&self.src[start..self.pos]).trim().to_string()
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b) if b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn error(&self, what: &str) -> IslError {
        let line = self.src[..self.pos.min(self.src.len())]
            .iter()
            .filter(|&&b| b == b'\n')
            .count()
            + 1;
        IslError::ParseError(format!("{} at line {}", what, line))
    }

    fn starts_with_keyword(&self, kw: &str) -> bool {
        let rest = &self.src[self.pos..];
        rest.starts_with(kw.as_bytes())
            && rest
                .get(kw.len())
                .map_or(true, |&b| !is_ident_char(b as char))
    }

    fn expect(&mut self, b: u8) -> IslResult<()> {
        self.skip_ws();
        if self.peek() == Some(b) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(&format!("expected '{}'", b as char)))
        }
    }

    /// Text up to the `)` matching an already consumed `(`.
    fn parenthesized(&mut self) -> IslResult<String> {
        let start = self.pos;
        let mut depth = 1usize;
        while let Some(b) = self.peek() {
            match b {
                b'(' => depth += 1,
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        let inner = self.text_from(start);
                        self.pos += 1;
                        return Ok(inner);
                    }
                }
                _ => {}
            }
            self.pos += 1;
        }
        Err(self.error("unbalanced parenthesis"))
    }

    fn statement(&mut self) -> IslResult<AstNode> {
        self.skip_ws();
        match self.peek() {
            None => Err(self.error("unexpected end of input")),
            Some(b'{') => {
                self.pos += 1;
                let mut children = Vec::new();
                loop {
                    self.skip_ws();
                    match self.peek() {
                        Some(b'}') => {
                            self.pos += 1;
                            return Ok(AstNode::Block(children));
                        }
                        None => return Err(self.error("unterminated block")),
                        _ => children.push(self.statement()?),
                    }
                }
            }
            Some(b'/') if self.src[self.pos..].starts_with(b"//") => {
                self.pos += 2;
                let start = self.pos;
                while !matches!(self.peek(), None | Some(b'\n')) {
                    self.pos += 1;
                }
                let id = self.text_from(start);
                let body = self.statement()?;
                Ok(AstNode::Mark {
                    id,
                    body: Box::new(body),
                })
            }
            _ if self.starts_with_keyword("for") => self.for_loop(),
            _ if self.starts_with_keyword("if") => self.conditional(),
            _ => self.user(),
        }
    }

    fn for_loop(&mut self) -> IslResult<AstNode> {
        self.pos += "for".len();
        self.expect(b'(')?;
        let header = self.parenthesized()?;
        let parts: Vec<&str> = header.split(';').map(str::trim).collect();
        if parts.len() != 3 {
            return Err(self.error("malformed for header"));
        }
        let (decl, init) = parts[0]
            .split_once('=')
            .ok_or_else(|| self.error("for loop without initializer"))?;
        let iterator = decl
            .split_whitespace()
            .last()
            .ok_or_else(|| self.error("for loop without iterator"))?
            .to_string();
        let body = self.statement()?;
        Ok(AstNode::For {
            iterator,
            init: init.trim().to_string(),
            cond: parts[1].to_string(),
            inc: parts[2].to_string(),
            body: Box::new(body),
            parallel: false,
        })
    }

    fn conditional(&mut self) -> IslResult<AstNode> {
        self.pos += "if".len();
        self.expect(b'(')?;
        let cond = self.parenthesized()?;
        let then = self.statement()?;
        self.skip_ws();
        let otherwise = if self.starts_with_keyword("else") {
            self.pos += "else".len();
            Some(Box::new(self.statement()?))
        } else {
            None
        };
        Ok(AstNode::If {
            cond,
            then: Box::new(then),
            otherwise,
        })
    }

    fn user(&mut self) -> IslResult<AstNode> {
        let start = self.pos;
        let mut depth = 0i32;
        while let Some(b) = self.peek() {
            match b {
                b'(' => depth += 1,
                b')' => depth -= 1,
                b';' if depth == 0 => {
                    let call = self.text_from(start);
                    self.pos += 1;
                    return Ok(AstNode::User { call });
                }
                b'{' | b'}' if depth == 0 => break,
                _ => {}
            }
            self.pos += 1;
        }
        Err(self.error("statement without terminating ';'"))
    }
}
