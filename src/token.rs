use num_bigint::{BigInt, BigUint};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
}

impl Span {
    /// Degenerate location for synthesized nodes.
    pub const NOWHERE: Span = Span {
        start: 0,
        end: 0,
        line: 0,
        column: 0,
    };
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind<'a> {
    Identifier(&'a str),
    /// Signed decimal integer literal, including a lexed leading minus.
    Int(BigInt),
    /// Unsigned integer literal from a `0x` hex run.
    Uint(BigUint),
    Float(f64),
    /// String literal with escapes already resolved.
    Str(String),
    Char(char),

    // Keywords
    All,
    And,
    Break,
    Continue,
    Default,
    Display,
    Do,
    Else,
    Elseif,
    Emptylist,
    Emptymap,
    Endif,
    Exists,
    False,
    Help,
    History,
    If,
    Let,
    List,
    Listof,
    Load,
    Mapof,
    Mod,
    Not,
    Or,
    Print,
    Step,
    Then,
    True,
    Typeof,
    Unlet,
    Var,
    Variables,
    Watch,
    Xor,

    // Delimiters
    Assign,        // :=
    PlusAssign,    // +=
    MinusAssign,   // -=
    StarAssign,    // *=
    SlashAssign,   // /=
    PercentAssign, // %=
    ShlAssign,     // <<=
    ShrAssign,     // >>=
    AmpAssign,     // &=
    PipeAssign,    // |=
    CaretAssign,   // ^=
    EqualEqual,    // ==
    NotEqual,      // !=
    LessEqual,     // <=
    GreaterEqual,  // >=
    Less,          // <
    Greater,       // >
    Shl,           // <<
    Shr,           // >>
    Plus,          // +
    Minus,         // -
    Star,          // *
    Slash,         // /
    Percent,       // %
    Equal,         // =
    LParen,        // (
    RParen,        // )
    LBracket,      // [
    RBracket,      // ]
    LBrace,        // {
    RBrace,        // }
    Comma,         // ,
    Dot,           // .
    DotDot,        // ..
    Colon,         // :
    ColonColon,    // ::
    Semicolon,     // ;
    At,            // @
    Tilde,         // ~
    Amp,           // &
    Pipe,          // |
    Caret,         // ^
    Bang,          // !

    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token<'a> {
    pub kind: TokenKind<'a>,
    pub span: Span,
}

impl<'a> Token<'a> {
    pub fn new(kind: TokenKind<'a>, span: Span) -> Self {
        Self { kind, span }
    }
}

/// Keyword table, sorted for binary search. Case-sensitive.
static KEYWORDS: &[(&str, TokenKind<'static>)] = &[
    ("all", TokenKind::All),
    ("and", TokenKind::And),
    ("break", TokenKind::Break),
    ("continue", TokenKind::Continue),
    ("default", TokenKind::Default),
    ("display", TokenKind::Display),
    ("do", TokenKind::Do),
    ("else", TokenKind::Else),
    ("elseif", TokenKind::Elseif),
    ("emptylist", TokenKind::Emptylist),
    ("emptymap", TokenKind::Emptymap),
    ("endif", TokenKind::Endif),
    ("exists", TokenKind::Exists),
    ("false", TokenKind::False),
    ("help", TokenKind::Help),
    ("history", TokenKind::History),
    ("if", TokenKind::If),
    ("let", TokenKind::Let),
    ("list", TokenKind::List),
    ("listof", TokenKind::Listof),
    ("load", TokenKind::Load),
    ("mapof", TokenKind::Mapof),
    ("mod", TokenKind::Mod),
    ("not", TokenKind::Not),
    ("or", TokenKind::Or),
    ("print", TokenKind::Print),
    ("step", TokenKind::Step),
    ("then", TokenKind::Then),
    ("true", TokenKind::True),
    ("typeof", TokenKind::Typeof),
    ("unlet", TokenKind::Unlet),
    ("var", TokenKind::Var),
    ("variables", TokenKind::Variables),
    ("watch", TokenKind::Watch),
    ("xor", TokenKind::Xor),
];

pub(crate) fn lookup_keyword<'a>(text: &str) -> Option<TokenKind<'a>> {
    KEYWORDS
        .binary_search_by_key(&text, |(word, _)| word)
        .ok()
        .map(|index| KEYWORDS[index].1.clone())
}

/// Delimiter table ordered by decreasing pattern length so that the scanner's
/// first match is always the longest match (`<<=` before `<<` before `<`).
static DELIMITERS: &[(&str, TokenKind<'static>)] = &[
    ("<<=", TokenKind::ShlAssign),
    (">>=", TokenKind::ShrAssign),
    (":=", TokenKind::Assign),
    ("+=", TokenKind::PlusAssign),
    ("-=", TokenKind::MinusAssign),
    ("*=", TokenKind::StarAssign),
    ("/=", TokenKind::SlashAssign),
    ("%=", TokenKind::PercentAssign),
    ("&=", TokenKind::AmpAssign),
    ("|=", TokenKind::PipeAssign),
    ("^=", TokenKind::CaretAssign),
    ("==", TokenKind::EqualEqual),
    ("!=", TokenKind::NotEqual),
    ("<=", TokenKind::LessEqual),
    (">=", TokenKind::GreaterEqual),
    ("<<", TokenKind::Shl),
    (">>", TokenKind::Shr),
    ("::", TokenKind::ColonColon),
    ("..", TokenKind::DotDot),
    ("+", TokenKind::Plus),
    ("-", TokenKind::Minus),
    ("*", TokenKind::Star),
    ("/", TokenKind::Slash),
    ("%", TokenKind::Percent),
    ("=", TokenKind::Equal),
    ("<", TokenKind::Less),
    (">", TokenKind::Greater),
    ("(", TokenKind::LParen),
    (")", TokenKind::RParen),
    ("[", TokenKind::LBracket),
    ("]", TokenKind::RBracket),
    ("{", TokenKind::LBrace),
    ("}", TokenKind::RBrace),
    (",", TokenKind::Comma),
    (".", TokenKind::Dot),
    (":", TokenKind::Colon),
    (";", TokenKind::Semicolon),
    ("@", TokenKind::At),
    ("~", TokenKind::Tilde),
    ("&", TokenKind::Amp),
    ("|", TokenKind::Pipe),
    ("^", TokenKind::Caret),
    ("!", TokenKind::Bang),
];

pub(crate) fn match_delimiter<'a>(rest: &str) -> Option<(&'static str, TokenKind<'a>)> {
    DELIMITERS
        .iter()
        .find(|(pattern, _)| rest.starts_with(pattern))
        .map(|(pattern, kind)| (*pattern, kind.clone()))
}

/// Names used for payload-carrying terminal classes in syntax errors. The
/// parser refers to these directly when it cannot name a concrete token.
pub mod names {
    pub const IDENTIFIER: &str = "an identifier";
    pub const INT: &str = "an integer literal";
    pub const UINT: &str = "an unsigned integer literal";
    pub const FLOAT: &str = "a float literal";
    pub const STRING: &str = "a string literal";
    pub const CHAR: &str = "a character literal";
    pub const EOF: &str = "end of input";
}

/// Human-readable terminal name used in syntax-error messages. One entry per
/// terminal; the exact strings are part of the command-language surface.
pub fn terminal_name(kind: &TokenKind) -> &'static str {
    match kind {
        TokenKind::Identifier(_) => names::IDENTIFIER,
        TokenKind::Int(_) => names::INT,
        TokenKind::Uint(_) => names::UINT,
        TokenKind::Float(_) => names::FLOAT,
        TokenKind::Str(_) => names::STRING,
        TokenKind::Char(_) => names::CHAR,
        TokenKind::All => "'all'",
        TokenKind::And => "'and'",
        TokenKind::Break => "'break'",
        TokenKind::Continue => "'continue'",
        TokenKind::Default => "'default'",
        TokenKind::Display => "'display'",
        TokenKind::Do => "'do'",
        TokenKind::Else => "'else'",
        TokenKind::Elseif => "'elseif'",
        TokenKind::Emptylist => "'emptylist'",
        TokenKind::Emptymap => "'emptymap'",
        TokenKind::Endif => "'endif'",
        TokenKind::Exists => "'exists'",
        TokenKind::False => "'false'",
        TokenKind::Help => "'help'",
        TokenKind::History => "'history'",
        TokenKind::If => "'if'",
        TokenKind::Let => "'let'",
        TokenKind::List => "'list'",
        TokenKind::Listof => "'listof'",
        TokenKind::Load => "'load'",
        TokenKind::Mapof => "'mapof'",
        TokenKind::Mod => "'mod'",
        TokenKind::Not => "'not'",
        TokenKind::Or => "'or'",
        TokenKind::Print => "'print'",
        TokenKind::Step => "'step'",
        TokenKind::Then => "'then'",
        TokenKind::True => "'true'",
        TokenKind::Typeof => "'typeof'",
        TokenKind::Unlet => "'unlet'",
        TokenKind::Var => "'var'",
        TokenKind::Variables => "'variables'",
        TokenKind::Watch => "'watch'",
        TokenKind::Xor => "'xor'",
        TokenKind::Assign => "':='",
        TokenKind::PlusAssign => "'+='",
        TokenKind::MinusAssign => "'-='",
        TokenKind::StarAssign => "'*='",
        TokenKind::SlashAssign => "'/='",
        TokenKind::PercentAssign => "'%='",
        TokenKind::ShlAssign => "'<<='",
        TokenKind::ShrAssign => "'>>='",
        TokenKind::AmpAssign => "'&='",
        TokenKind::PipeAssign => "'|='",
        TokenKind::CaretAssign => "'^='",
        TokenKind::EqualEqual => "'=='",
        TokenKind::NotEqual => "'!='",
        TokenKind::LessEqual => "'<='",
        TokenKind::GreaterEqual => "'>='",
        TokenKind::Less => "'<'",
        TokenKind::Greater => "'>'",
        TokenKind::Shl => "'<<'",
        TokenKind::Shr => "'>>'",
        TokenKind::Plus => "'+'",
        TokenKind::Minus => "'-'",
        TokenKind::Star => "'*'",
        TokenKind::Slash => "'/'",
        TokenKind::Percent => "'%'",
        TokenKind::Equal => "'='",
        TokenKind::LParen => "'('",
        TokenKind::RParen => "')'",
        TokenKind::LBracket => "'['",
        TokenKind::RBracket => "']'",
        TokenKind::LBrace => "'{'",
        TokenKind::RBrace => "'}'",
        TokenKind::Comma => "','",
        TokenKind::Dot => "'.'",
        TokenKind::DotDot => "'..'",
        TokenKind::Colon => "':'",
        TokenKind::ColonColon => "'::'",
        TokenKind::Semicolon => "';'",
        TokenKind::At => "'@'",
        TokenKind::Tilde => "'~'",
        TokenKind::Amp => "'&'",
        TokenKind::Pipe => "'|'",
        TokenKind::Caret => "'^'",
        TokenKind::Bang => "'!'",
        TokenKind::Eof => names::EOF,
    }
}

/// Description of a concrete token for the "got ..." half of a syntax error.
pub fn describe(kind: &TokenKind) -> String {
    match kind {
        TokenKind::Identifier(name) => format!("identifier '{name}'"),
        TokenKind::Int(value) => format!("integer '{value}'"),
        TokenKind::Uint(value) => format!("integer '{value}'"),
        TokenKind::Float(value) => format!("float '{value}'"),
        TokenKind::Str(value) => format!("string \"{value}\""),
        TokenKind::Char(value) => format!("character '{value}'"),
        TokenKind::Eof => names::EOF.to_string(),
        other => terminal_name(other).to_string(),
    }
}
