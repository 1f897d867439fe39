#![no_main]
use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

/// Fragments of the subject language, so inputs get past the lexer often.
#[derive(Arbitrary, Debug)]
enum Fragment {
    Ident,
    Int,
    Str,
    Dot,
    Star,
    Amp,
    Plus,
    Assign,
    Define,
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Newline,
    Func,
    Type,
    Struct,
    Var,
    Return,
    If,
    For,
    Range,
}

impl Fragment {
    fn text(&self) -> &'static str {
        match self {
            Fragment::Ident => "x",
            Fragment::Int => "42",
            Fragment::Str => "\"s\"",
            Fragment::Dot => ".",
            Fragment::Star => "*",
            Fragment::Amp => "&",
            Fragment::Plus => "+",
            Fragment::Assign => "=",
            Fragment::Define => ":=",
            Fragment::LParen => "(",
            Fragment::RParen => ")",
            Fragment::LBrace => "{",
            Fragment::RBrace => "}",
            Fragment::LBracket => "[",
            Fragment::RBracket => "]",
            Fragment::Comma => ",",
            Fragment::Newline => "\n",
            Fragment::Func => "func",
            Fragment::Type => "type",
            Fragment::Struct => "struct",
            Fragment::Var => "var",
            Fragment::Return => "return",
            Fragment::If => "if",
            Fragment::For => "for",
            Fragment::Range => "range",
        }
    }
}

#[derive(Arbitrary, Debug)]
struct Input {
    fragments: Vec<Fragment>,
}

fuzz_target!(|input: Input| {
    let mut source = String::from("package p\n");
    for f in &input.fragments {
        source.push_str(f.text());
        source.push(' ');
    }

    // Parsing and checking should never panic
    if let Ok(file) = unbed::parser::parse_file(&source, 0) {
        let mut types = unbed::typeck::types::Types::new();
        let _ = unbed::typeck::check_package(&mut types, &Default::default(), "p", &[&file]);
    }
});
