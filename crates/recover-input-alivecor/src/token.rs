//! Token classification for content-stream scanning.
//!
//! The decoded content stream is split on whitespace; each word is either a
//! numeric operand or an operator keyword. Operands precede their operator.

/// One whitespace-delimited item of a content stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Token<'a> {
    Integer(i64),
    Real(f64),
    Operator(&'a str),
}

impl Token<'_> {
    /// Numeric value of an operand token, if it is one.
    pub fn numeric(&self) -> Option<f64> {
        match *self {
            Token::Integer(v) => Some(v as f64),
            Token::Real(v) => Some(v),
            Token::Operator(_) => None,
        }
    }
}

/// Classify a single word: integer parse first, then float, and anything
/// else is an operator keyword.
pub fn classify(word: &str) -> Token<'_> {
    if let Ok(v) = word.parse::<i64>() {
        Token::Integer(v)
    } else if let Ok(v) = word.parse::<f64>() {
        Token::Real(v)
    } else {
        Token::Operator(word)
    }
}

/// Tokenize a decoded content stream on whitespace.
pub fn tokenize(stream: &str) -> impl Iterator<Item = Token<'_>> {
    stream.split_whitespace().map(classify)
}
