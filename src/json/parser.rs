//! Two-stage JSON decoder: a byte-level lexer feeding recursive descent.
//!
//! The lexer treats `" { } [ ] , :` and ASCII whitespace as delimiters and
//! emits maximal non-delimiter runs as atoms (numbers, `true`, `false`,
//! `null`). String literals get dedicated scanning with backslash-parity
//! tracking so that `\\"` reads as an escaped backslash followed by the
//! closing quote, not an escaped quote.
//!
//! Malformed input anywhere yields [`JsonValue::Null`]; there is no error
//! channel, by contract (see the module docs in `json`). String contents are
//! stored exactly as they appear on the wire; unescaping is the consumer's
//! explicit call.

use std::borrow::Cow;

use super::value::JsonValue;

/// Decode `text` into a document tree, or [`JsonValue::Null`] on any
/// malformation. Trailing bytes after the first complete value are ignored;
/// the framer hands this function exactly one message body.
pub fn parse(text: &str) -> JsonValue {
    let mut lexer = Lexer::new(text);
    parse_value(&mut lexer).unwrap_or(JsonValue::Null)
}

#[derive(Debug, PartialEq)]
enum Token<'a> {
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Colon,
    /// Literal contents between the quotes, escapes left intact.
    Str(&'a str),
    /// Maximal non-delimiter run: a number or keyword.
    Atom(&'a str),
}

struct Lexer<'a> {
    input: &'a str,
    pos: usize,
}

fn is_delimiter(b: u8) -> bool {
    matches!(b, b'"' | b'{' | b'}' | b'[' | b']' | b',' | b':') || b.is_ascii_whitespace()
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Lexer { input, pos: 0 }
    }

    /// Next token, or `None` at end of input / on an unterminated string.
    fn next_token(&mut self) -> Option<Token<'a>> {
        let bytes = self.input.as_bytes();
        while self.pos < bytes.len() && bytes[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
        if self.pos >= bytes.len() {
            return None;
        }
        match bytes[self.pos] {
            b'{' => {
                self.pos += 1;
                Some(Token::LBrace)
            }
            b'}' => {
                self.pos += 1;
                Some(Token::RBrace)
            }
            b'[' => {
                self.pos += 1;
                Some(Token::LBracket)
            }
            b']' => {
                self.pos += 1;
                Some(Token::RBracket)
            }
            b',' => {
                self.pos += 1;
                Some(Token::Comma)
            }
            b':' => {
                self.pos += 1;
                Some(Token::Colon)
            }
            b'"' => self.scan_string(),
            _ => self.scan_atom(),
        }
    }

    /// Scan forward from an opening quote to the first unescaped `"`.
    ///
    /// The `escaped` flag toggles off after consuming the escaped character,
    /// which is what makes `\\"` terminate the literal.
    fn scan_string(&mut self) -> Option<Token<'a>> {
        let bytes = self.input.as_bytes();
        let start = self.pos + 1;
        let mut i = start;
        let mut escaped = false;
        while i < bytes.len() {
            let b = bytes[i];
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                self.pos = i + 1;
                // Both boundaries sit on ASCII quotes, so the slice is
                // guaranteed to fall on char boundaries.
                return Some(Token::Str(&self.input[start..i]));
            }
            i += 1;
        }
        None
    }

    fn scan_atom(&mut self) -> Option<Token<'a>> {
        let bytes = self.input.as_bytes();
        let start = self.pos;
        let mut i = self.pos;
        while i < bytes.len() && !is_delimiter(bytes[i]) {
            i += 1;
        }
        self.pos = i;
        Some(Token::Atom(&self.input[start..i]))
    }
}

fn parse_value(lexer: &mut Lexer<'_>) -> Option<JsonValue> {
    match lexer.next_token()? {
        Token::LBrace => parse_object(lexer),
        Token::LBracket => parse_array(lexer),
        Token::Str(s) => Some(JsonValue::Str(Cow::Owned(s.to_string()))),
        Token::Atom(a) => parse_atom(a),
        // A structural token where a value belongs is a malformation.
        _ => None,
    }
}

fn parse_atom(atom: &str) -> Option<JsonValue> {
    match atom {
        "true" => Some(JsonValue::Bool(true)),
        "false" => Some(JsonValue::Bool(false)),
        "null" => Some(JsonValue::Null),
        _ => {
            if atom.contains('.') || atom.contains(&['e', 'E'][..]) {
                atom.parse::<f64>().ok().map(JsonValue::Float)
            } else {
                atom.parse::<i64>().ok().map(JsonValue::Int)
            }
        }
    }
}

fn parse_object(lexer: &mut Lexer<'_>) -> Option<JsonValue> {
    let mut obj = JsonValue::object();
    loop {
        let key = match lexer.next_token()? {
            Token::RBrace => return Some(obj),
            Token::Str(k) => k.to_string(),
            _ => return None,
        };
        if lexer.next_token()? != Token::Colon {
            return None;
        }
        let value = parse_value(lexer)?;
        // Duplicate keys replace in place, same as explicit set().
        obj.set(key, value);
        match lexer.next_token()? {
            Token::Comma => continue,
            Token::RBrace => return Some(obj),
            _ => return None,
        }
    }
}

fn parse_array(lexer: &mut Lexer<'_>) -> Option<JsonValue> {
    let mut arr = JsonValue::array();
    loop {
        let save = lexer.pos;
        match lexer.next_token()? {
            Token::RBracket => return Some(arr),
            _ => lexer.pos = save,
        }
        let value = parse_value(lexer)?;
        arr.push(value);
        match lexer.next_token()? {
            Token::Comma => continue,
            Token::RBracket => return Some(arr),
            _ => return None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json::JsonKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_scalars() {
        assert_eq!(parse("42"), JsonValue::Int(42));
        assert_eq!(parse("-7"), JsonValue::Int(-7));
        assert_eq!(parse("2.5"), JsonValue::Float(2.5));
        assert_eq!(parse("1e3"), JsonValue::Float(1000.0));
        assert_eq!(parse("true"), JsonValue::Bool(true));
        assert_eq!(parse("false"), JsonValue::Bool(false));
        assert_eq!(parse("null"), JsonValue::Null);
        assert_eq!(parse("\"hi\""), JsonValue::string("hi"));
    }

    #[test]
    fn test_parse_nested_document() {
        let doc = parse(r#"{"jsonrpc":"2.0","id":1,"result":{"capabilities":{},"serverInfo":{"name":"srv","version":"0.1"}}}"#);
        assert_eq!(doc.kind(), JsonKind::Object);
        assert_eq!(doc.get("id").and_then(JsonValue::as_i64), Some(1));
        let info = doc.get("result").and_then(|r| r.get("serverInfo")).unwrap();
        assert_eq!(info.get("name").and_then(JsonValue::as_str), Some("srv"));
    }

    #[test]
    fn test_parse_preserves_member_order() {
        let doc = parse(r#"{"z":1,"a":2,"m":3}"#);
        let keys: Vec<&str> = doc.members().iter().map(|(k, _)| k.as_ref()).collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_parse_duplicate_key_replaces() {
        let doc = parse(r#"{"k":1,"k":2}"#);
        assert_eq!(doc.len(), 1);
        assert_eq!(doc.get("k").and_then(JsonValue::as_i64), Some(2));
    }

    #[test]
    fn test_parse_heterogeneous_array() {
        let doc = parse(r#"[1,"two",true,null,{"k":[]}]"#);
        assert_eq!(doc.len(), 5);
        assert_eq!(doc.at(0).and_then(JsonValue::as_i64), Some(1));
        assert_eq!(doc.at(1).and_then(JsonValue::as_str), Some("two"));
        assert_eq!(doc.at(4).unwrap().kind(), JsonKind::Object);
    }

    #[test]
    fn test_string_contents_kept_verbatim() {
        // The parser must not unescape; that is the consumer's explicit call.
        let doc = parse(r#"{"msg":"line\none"}"#);
        assert_eq!(doc.get("msg").and_then(JsonValue::as_str), Some("line\\none"));
    }

    #[test]
    fn test_escaped_backslash_then_quote_terminates() {
        // \\" is a literal backslash followed by the closing quote.
        let doc = parse(r#""tail\\""#);
        assert_eq!(doc.as_str(), Some("tail\\\\"));
    }

    #[test]
    fn test_escaped_quote_does_not_terminate() {
        let doc = parse(r#""say \"hi\" now""#);
        assert_eq!(doc.as_str(), Some(r#"say \"hi\" now"#));
    }

    #[test]
    fn test_malformed_yields_null() {
        assert!(parse("").is_null());
        assert!(parse("{").is_null());
        assert!(parse(r#"{"k""#).is_null());
        assert!(parse(r#"{"k":}"#).is_null());
        assert!(parse(r#"{"k" 1}"#).is_null());
        assert!(parse("[1,").is_null());
        assert!(parse(r#""unterminated"#).is_null());
        assert!(parse("bogus").is_null());
        assert!(parse("12x").is_null());
    }

    #[test]
    fn test_empty_containers() {
        assert_eq!(parse("{}"), JsonValue::object());
        assert_eq!(parse("[]"), JsonValue::array());
        assert_eq!(parse("[ ]"), JsonValue::array());
    }

    #[test]
    fn test_whitespace_tolerated() {
        let doc = parse(" {\r\n  \"k\" :\t[ 1 , 2 ]\n} ");
        assert_eq!(doc.get("k").map(JsonValue::len), Some(2));
    }
}
