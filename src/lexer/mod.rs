pub mod token;
pub use token::{is_keyword, Token};

use logos::Logos;
use crate::diagnostics::UnbedError;
use crate::span::{Span, Spanned};

/// Tokenize `source`, dropping comments and turning statement-ending newlines
/// into `Token::Semi`. Spans are stamped with `file_id`.
pub fn lex(source: &str, file_id: u32) -> Result<Vec<Spanned<Token>>, UnbedError> {
    let mut tokens: Vec<Spanned<Token>> = Vec::new();
    let mut lexer = Token::lexer(source);

    // Newline handling: a semicolon is inserted when the last significant
    // token can end a statement.
    let insert_semi = |tokens: &mut Vec<Spanned<Token>>, at: Span| {
        if let Some(last) = tokens.last() {
            if last.node.ends_statement() {
                tokens.push(Spanned::new(Token::Semi, at));
            }
        }
    };

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        let at = Span::with_file(span.start, span.end, file_id);
        match result {
            Ok(Token::LineComment) => {}
            Ok(Token::BlockComment) => {
                if lexer.slice().contains('\n') {
                    insert_semi(&mut tokens, at);
                }
            }
            Ok(Token::Newline) => insert_semi(&mut tokens, at),
            Ok(tok) => tokens.push(Spanned::new(tok, at)),
            Err(()) => {
                let text = &source[span.start..span.end];
                let msg = match text.chars().next() {
                    Some('"') | Some('`') => "string literal not terminated".to_string(),
                    Some('\'') => "rune literal not terminated".to_string(),
                    Some('/') if text.starts_with("/*") => "comment not terminated".to_string(),
                    _ => format!("unexpected character '{text}'"),
                };
                return Err(UnbedError::syntax(msg, at));
            }
        }
    }

    let eof = Span::with_file(source.len(), source.len(), file_id);
    insert_semi(&mut tokens, eof);

    Ok(tokens)
}
