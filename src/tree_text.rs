use crate::syntax::{SyntaxKind, SyntaxTree, TreeBuilder};
use thiserror::Error;

/// Parses the parenthesized tree notation into a [`SyntaxTree`].
///
/// The notation is one s-expression per document: `(kind child...)` for an
/// interior node and `(kind "text")` for a token. Kind names are the
/// snake_case names of [`SyntaxKind`]. Token spans are assigned by
/// concatenation order, so two files with the same token texts in the same
/// order produce identical spans.
///
/// ```text
/// (compilation_unit
///   (method_declaration
///     (keyword_token "void") (identifier_token "Main")
///     (parameter_list (punctuation_token "(") (punctuation_token ")"))
///     (block (punctuation_token "{") (punctuation_token "}"))))
/// ```
pub fn parse_tree_text(input: &str) -> Result<SyntaxTree, TreeTextError> {
    let mut lexer = Lexer::new(input);
    let mut builder = TreeBuilder::new();

    // The builder already keeps the open-node stack; the parser only needs
    // to count depth to know when the root closes.
    let mut depth = 0usize;
    loop {
        match lexer.next_token()? {
            Some(Token::Open) => {
                let (name, offset) = match lexer.next_token()? {
                    Some(Token::Ident(name, offset)) => (name, offset),
                    _ => return Err(TreeTextError::ExpectedKind(lexer.line())),
                };
                let kind = SyntaxKind::from_name(name)
                    .ok_or_else(|| TreeTextError::UnknownKind(name.to_owned(), offset))?;
                if kind.is_token() {
                    let text = match lexer.next_token()? {
                        Some(Token::Str(text)) => text,
                        _ => return Err(TreeTextError::MissingTokenText(kind.name())),
                    };
                    match lexer.next_token()? {
                        Some(Token::Close) => {}
                        _ => return Err(TreeTextError::UnclosedToken(kind.name())),
                    }
                    if depth == 0 {
                        return Err(TreeTextError::TokenAtRoot(kind.name()));
                    }
                    builder.token(kind, &text);
                } else {
                    builder.open(kind);
                    depth += 1;
                }
            }
            Some(Token::Close) => {
                if depth == 0 {
                    return Err(TreeTextError::Unbalanced(lexer.line()));
                }
                builder.close();
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            Some(Token::Ident(name, offset)) => {
                return Err(TreeTextError::UnknownKind(name.to_owned(), offset))
            }
            Some(Token::Str(_)) => return Err(TreeTextError::StrayText(lexer.line())),
            None => {
                return Err(if depth == 0 {
                    TreeTextError::Empty
                } else {
                    TreeTextError::Unbalanced(lexer.line())
                })
            }
        }
    }
    match lexer.next_token()? {
        None => Ok(builder.finish()),
        Some(_) => Err(TreeTextError::TrailingInput(lexer.line())),
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TreeTextError {
    #[error("empty input, expected one tree")]
    Empty,
    #[error("unknown node kind `{0}` at offset {1}")]
    UnknownKind(String, usize),
    #[error("expected a node kind after `(` on line {0}")]
    ExpectedKind(usize),
    #[error("token `{0}` requires a quoted text")]
    MissingTokenText(&'static str),
    #[error("token `{0}` takes exactly one quoted text")]
    UnclosedToken(&'static str),
    #[error("a token cannot be the root of a tree: `{0}`")]
    TokenAtRoot(&'static str),
    #[error("unbalanced parentheses on line {0}")]
    Unbalanced(usize),
    #[error("quoted text outside a token on line {0}")]
    StrayText(usize),
    #[error("unexpected input after the tree on line {0}")]
    TrailingInput(usize),
    #[error("unexpected character `{0}` on line {1}")]
    UnexpectedChar(char, usize),
    #[error("unterminated quoted text on line {0}")]
    UnterminatedString(usize),
}

enum Token<'a> {
    Open,
    Close,
    Ident(&'a str, usize),
    Str(String),
}

struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    line: usize,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Lexer {
            input,
            pos: 0,
            line: 1,
        }
    }

    fn line(&self) -> usize {
        self.line
    }

    fn bump(&mut self, c: char) {
        if c == '\n' {
            self.line += 1;
        }
        self.pos += c.len_utf8();
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn next_token(&mut self) -> Result<Option<Token<'a>>, TreeTextError> {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => self.bump(c),
                // Line comments let fixtures annotate themselves.
                Some(';') => {
                    while let Some(c) = self.peek() {
                        self.bump(c);
                        if c == '\n' {
                            break;
                        }
                    }
                }
                _ => break,
            }
        }
        let Some(c) = self.peek() else {
            return Ok(None);
        };
        match c {
            '(' => {
                self.bump(c);
                Ok(Some(Token::Open))
            }
            ')' => {
                self.bump(c);
                Ok(Some(Token::Close))
            }
            '"' => {
                self.bump(c);
                let mut text = String::new();
                loop {
                    let Some(c) = self.peek() else {
                        return Err(TreeTextError::UnterminatedString(self.line));
                    };
                    self.bump(c);
                    match c {
                        '"' => return Ok(Some(Token::Str(text))),
                        '\\' => {
                            let Some(escaped) = self.peek() else {
                                return Err(TreeTextError::UnterminatedString(self.line));
                            };
                            self.bump(escaped);
                            match escaped {
                                'n' => text.push('\n'),
                                't' => text.push('\t'),
                                other => text.push(other),
                            }
                        }
                        other => text.push(other),
                    }
                }
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = self.pos;
                while let Some(c) = self.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        self.bump(c);
                    } else {
                        break;
                    }
                }
                Ok(Some(Token::Ident(&self.input[start..self.pos], start)))
            }
            other => Err(TreeTextError::UnexpectedChar(other, self.line)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::Span;

    #[test]
    fn parses_a_small_unit() {
        let tree = parse_tree_text(
            r#"(compilation_unit
                 (class_declaration
                   (keyword_token "class") (identifier_token "C")))"#,
        )
        .unwrap();
        let root = tree.root();
        assert_eq!(tree.kind(root), SyntaxKind::CompilationUnit);
        assert_eq!(tree.children(root).len(), 1);
        assert_eq!(tree.token_count(), 2);
        // "class" occupies [0..5), "C" follows at [5..6).
        let class = tree.children(root)[0];
        assert_eq!(tree.span(class), Span::new(0, 6));
    }

    #[test]
    fn comments_and_escapes() {
        let tree = parse_tree_text(
            "; a fixture\n(block (literal_token \"say \\\"hi\\\"\"))",
        )
        .unwrap();
        let token = tree.children(tree.root())[0];
        assert_eq!(tree.text(token), Some("say \"hi\""));
    }

    #[test]
    fn rejects_unknown_kind() {
        assert!(matches!(
            parse_tree_text("(frobnicator)"),
            Err(TreeTextError::UnknownKind(name, 1)) if name == "frobnicator"
        ));
    }

    #[test]
    fn rejects_trailing_tree() {
        assert!(matches!(
            parse_tree_text("(block) (block)"),
            Err(TreeTextError::TrailingInput(1))
        ));
    }

    #[test]
    fn rejects_token_without_text() {
        assert!(matches!(
            parse_tree_text("(block (identifier_token))"),
            Err(TreeTextError::MissingTokenText("identifier_token"))
        ));
    }
}
