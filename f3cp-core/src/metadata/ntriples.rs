//! Line-oriented N-Triples reader.
//!
//! Handles the full term grammar (IRIs, blank nodes, literals with language
//! tags or datatypes, `\u`/`\U` and string escapes) one statement per line.
//! Comments and blank lines are skipped.

use std::str::Lines;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term {
    Iri(String),
    BlankNode(String),
    Literal {
        value: String,
        language: Option<String>,
        datatype: Option<String>,
    },
}

impl Term {
    /// Plain string form: the IRI itself, `_:label` for blank nodes, the
    /// lexical value for literals.
    pub fn value(&self) -> String {
        match self {
            Term::Iri(iri) => iri.clone(),
            Term::BlankNode(label) => format!("_:{label}"),
            Term::Literal { value, .. } => value.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub subject: Term,
    pub predicate: Term,
    pub object: Term,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("N-Triples line {line}: {message}")]
pub struct TripleParseError {
    pub line: usize,
    pub message: String,
}

/// Iterator over the statements of an N-Triples document.
pub struct TripleReader<'a> {
    lines: Lines<'a>,
    line: usize,
}

impl<'a> TripleReader<'a> {
    pub fn new(input: &'a str) -> Self {
        TripleReader {
            lines: input.lines(),
            line: 0,
        }
    }
}

impl Iterator for TripleReader<'_> {
    type Item = Result<Statement, TripleParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let text = self.lines.next()?;
            self.line += 1;
            let mut cursor = Cursor::new(text);
            cursor.skip_ws();
            if cursor.at_end() || cursor.peek() == Some('#') {
                continue;
            }
            return Some(parse_statement(&mut cursor).map_err(|message| TripleParseError {
                line: self.line,
                message,
            }));
        }
    }
}

fn parse_statement(cursor: &mut Cursor<'_>) -> Result<Statement, String> {
    let subject = match cursor.peek() {
        Some('<') => Term::Iri(cursor.iri()?),
        Some('_') => Term::BlankNode(cursor.blank_node()?),
        other => return Err(format!("expected subject, found {other:?}")),
    };
    cursor.skip_ws();
    let predicate = match cursor.peek() {
        Some('<') => Term::Iri(cursor.iri()?),
        other => return Err(format!("expected predicate IRI, found {other:?}")),
    };
    cursor.skip_ws();
    let object = match cursor.peek() {
        Some('<') => Term::Iri(cursor.iri()?),
        Some('_') => Term::BlankNode(cursor.blank_node()?),
        Some('"') => cursor.literal()?,
        other => return Err(format!("expected object, found {other:?}")),
    };
    cursor.skip_ws();
    if cursor.bump() != Some('.') {
        return Err("expected '.' at end of statement".to_string());
    }
    cursor.skip_ws();
    if !cursor.at_end() && cursor.peek() != Some('#') {
        return Err("unexpected text after '.'".to_string());
    }
    Ok(Statement {
        subject,
        predicate,
        object,
    })
}

struct Cursor<'a> {
    rest: &'a str,
}

impl<'a> Cursor<'a> {
    fn new(text: &'a str) -> Self {
        Cursor { rest: text }
    }

    fn peek(&self) -> Option<char> {
        self.rest.chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.rest = &self.rest[ch.len_utf8()..];
        Some(ch)
    }

    fn at_end(&self) -> bool {
        self.rest.is_empty()
    }

    fn skip_ws(&mut self) {
        self.rest = self.rest.trim_start_matches([' ', '\t', '\r']);
    }

    fn expect(&mut self, expected: char) -> Result<(), String> {
        match self.bump() {
            Some(ch) if ch == expected => Ok(()),
            other => Err(format!("expected {expected:?}, found {other:?}")),
        }
    }

    fn iri(&mut self) -> Result<String, String> {
        self.expect('<')?;
        let mut iri = String::new();
        loop {
            match self.bump() {
                Some('>') => return Ok(iri),
                Some('\\') => iri.push(self.unicode_escape()?),
                Some(ch) if ch == ' ' || ch == '<' || ch == '"' => {
                    return Err(format!("invalid character {ch:?} in IRI"))
                }
                Some(ch) => iri.push(ch),
                None => return Err("unterminated IRI".to_string()),
            }
        }
    }

    fn blank_node(&mut self) -> Result<String, String> {
        self.expect('_')?;
        self.expect(':')?;
        let end = self
            .rest
            .find(|c: char| c.is_whitespace() || c == '<' || c == '"' || c == '#')
            .unwrap_or(self.rest.len());
        let mut label = &self.rest[..end];
        // a label may not end with '.', which then terminates the statement
        while let Some(stripped) = label.strip_suffix('.') {
            label = stripped;
        }
        if label.is_empty() {
            return Err("empty blank node label".to_string());
        }
        let label = label.to_string();
        self.rest = &self.rest[label.len()..];
        Ok(label)
    }

    fn literal(&mut self) -> Result<Term, String> {
        self.expect('"')?;
        let mut value = String::new();
        loop {
            match self.bump() {
                Some('"') => break,
                Some('\\') => value.push(self.string_escape()?),
                Some(ch) => value.push(ch),
                None => return Err("unterminated literal".to_string()),
            }
        }

        let mut language = None;
        let mut datatype = None;
        match self.peek() {
            Some('@') => {
                self.bump();
                let end = self
                    .rest
                    .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-'))
                    .unwrap_or(self.rest.len());
                if end == 0 {
                    return Err("empty language tag".to_string());
                }
                language = Some(self.rest[..end].to_string());
                self.rest = &self.rest[end..];
            }
            Some('^') => {
                self.expect('^')?;
                self.expect('^')?;
                datatype = Some(self.iri()?);
            }
            _ => {}
        }
        Ok(Term::Literal {
            value,
            language,
            datatype,
        })
    }

    fn string_escape(&mut self) -> Result<char, String> {
        match self.peek() {
            Some('t') => self.simple(b'\t'),
            Some('b') => self.simple(0x08),
            Some('n') => self.simple(b'\n'),
            Some('r') => self.simple(b'\r'),
            Some('f') => self.simple(0x0c),
            Some('"') => self.simple(b'"'),
            Some('\'') => self.simple(b'\''),
            Some('\\') => self.simple(b'\\'),
            _ => self.unicode_escape(),
        }
    }

    fn simple(&mut self, byte: u8) -> Result<char, String> {
        self.bump();
        Ok(byte as char)
    }

    fn unicode_escape(&mut self) -> Result<char, String> {
        let digits = match self.bump() {
            Some('u') => 4,
            Some('U') => 8,
            other => return Err(format!("invalid escape {other:?}")),
        };
        if self.rest.len() < digits || !self.rest.is_char_boundary(digits) {
            return Err("truncated unicode escape".to_string());
        }
        let hex = &self.rest[..digits];
        let code = u32::from_str_radix(hex, 16).map_err(|_| format!("invalid hex {hex:?}"))?;
        self.rest = &self.rest[digits..];
        char::from_u32(code).ok_or_else(|| format!("invalid code point U+{code:X}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_all(input: &str) -> Result<Vec<Statement>, TripleParseError> {
        TripleReader::new(input).collect()
    }

    #[test]
    fn parses_iris_literals_and_blank_nodes() {
        let input = r#"
# leading comment
<info:fedora/und:1> <http://purl.org/dc/terms/title> "A \"quoted\" title"@en .
<info:fedora/und:1> <http://purl.org/dc/terms/creator> _:b0 .
_:b0 <http://xmlns.com/foaf/0.1/name> "Jane\nDoe" .
<info:fedora/und:1> <http://purl.org/dc/terms/date> "2014-02-03"^^<http://www.w3.org/2001/XMLSchema#date> . # trailing
"#;
        let statements = parse_all(input).unwrap();
        assert_eq!(statements.len(), 4);
        assert_eq!(statements[0].subject.value(), "info:fedora/und:1");
        assert_eq!(
            statements[0].object,
            Term::Literal {
                value: "A \"quoted\" title".into(),
                language: Some("en".into()),
                datatype: None
            }
        );
        assert_eq!(statements[1].object, Term::BlankNode("b0".into()));
        assert_eq!(statements[2].subject.value(), "_:b0");
        assert_eq!(statements[2].object.value(), "Jane\nDoe");
        assert_eq!(statements[3].object.value(), "2014-02-03");
    }

    #[test]
    fn decodes_unicode_escapes() {
        let input = "<http://e.org/s> <http://e.org/p> \"caf\\u00E9 \\U0001F600\" .";
        let statements = parse_all(input).unwrap();
        assert_eq!(statements[0].object.value(), "café 😀");
    }

    #[test]
    fn blank_node_directly_before_the_dot() {
        let input = "<http://e.org/s> <http://e.org/p> _:x1.";
        let statements = parse_all(input).unwrap();
        assert_eq!(statements[0].object, Term::BlankNode("x1".into()));
    }

    #[test]
    fn reports_the_failing_line() {
        let input = "<http://e.org/s> <http://e.org/p> \"ok\" .\n<http://e.org/s> \"p\" \"bad\" .\n";
        let mut reader = TripleReader::new(input);
        assert!(reader.next().unwrap().is_ok());
        let err = reader.next().unwrap().unwrap_err();
        assert_eq!(err.line, 2);
    }

    #[test]
    fn missing_terminator_is_an_error() {
        assert!(parse_all("<http://e.org/s> <http://e.org/p> <http://e.org/o>").is_err());
        assert!(parse_all("<http://e.org/s> <http://e.org/p> \"open").is_err());
    }
}
