//! Strict decoder for the prompt expander's response format: a literal
//! list of single-element lists of strings, e.g.
//! `[["a glowing forest, wide shot"], ["an astronaut under the stars"]]`.
//!
//! The backend's text is never evaluated; this is a recursive-descent
//! parser that accepts exactly the documented shape (double- or
//! single-quoted strings, standard escapes, optional trailing commas)
//! and rejects everything else with a positioned [`ParseError`].

use crate::error::ParseError;

/// Removes code-fence and language-tag decoration that text models wrap
/// around otherwise well-formed answers.
pub fn strip_decoration(raw: &str) -> &str {
    let mut s = raw.trim();
    if let Some(rest) = s.strip_prefix("```") {
        // Drop the fence plus any info string on the same line.
        s = match rest.find('\n') {
            Some(i) => &rest[i + 1..],
            None => rest,
        };
        s = s.trim_start();
    }
    if let Some(rest) = s.strip_suffix("```") {
        s = rest.trim_end();
    }
    for tag in ["python", "json"] {
        if let Some(head) = s.get(..tag.len()) {
            if head.eq_ignore_ascii_case(tag) {
                let rest = &s[tag.len()..];
                if rest.starts_with(|c: char| c.is_whitespace() || c == '[') {
                    s = rest.trim_start();
                    break;
                }
            }
        }
    }
    s
}

/// Parses a decorated backend response into one group of strings per
/// scene. Each group must contain at least one string and the first
/// string of each group must be non-empty.
pub fn parse_prompt_groups(raw: &str) -> Result<Vec<Vec<String>>, ParseError> {
    let input = strip_decoration(raw);
    let mut cur = Cursor::new(input);
    cur.skip_ws();
    cur.expect('[', "'['")?;
    let mut groups: Vec<Vec<String>> = Vec::new();
    cur.skip_ws();
    if !cur.eat(']') {
        loop {
            let group = parse_group(&mut cur, groups.len())?;
            groups.push(group);
            cur.skip_ws();
            if cur.eat(',') {
                cur.skip_ws();
                if cur.eat(']') {
                    break;
                }
                continue;
            }
            if cur.eat(']') {
                break;
            }
            return Err(ParseError::Unexpected {
                expected: "',' or ']'",
                offset: cur.pos,
            });
        }
    }
    cur.skip_ws();
    if !cur.at_end() {
        return Err(ParseError::Trailing { offset: cur.pos });
    }
    Ok(groups)
}

fn parse_group(cur: &mut Cursor<'_>, index: usize) -> Result<Vec<String>, ParseError> {
    cur.expect('[', "'[' opening a scene group")?;
    let mut strings = Vec::new();
    cur.skip_ws();
    if cur.eat(']') {
        return Err(ParseError::EmptyGroup { index });
    }
    loop {
        strings.push(parse_string(cur)?);
        cur.skip_ws();
        if cur.eat(',') {
            cur.skip_ws();
            if cur.eat(']') {
                break;
            }
            continue;
        }
        if cur.eat(']') {
            break;
        }
        return Err(ParseError::Unexpected {
            expected: "',' or ']' in scene group",
            offset: cur.pos,
        });
    }
    if strings[0].trim().is_empty() {
        return Err(ParseError::EmptyPrompt { index });
    }
    Ok(strings)
}

fn parse_string(cur: &mut Cursor<'_>) -> Result<String, ParseError> {
    let start = cur.pos;
    let quote = match cur.peek() {
        Some(q @ ('"' | '\'')) => {
            cur.bump();
            q
        }
        _ => {
            return Err(ParseError::Unexpected {
                expected: "a quoted string",
                offset: cur.pos,
            })
        }
    };
    let mut out = String::new();
    loop {
        match cur.bump() {
            Some(c) if c == quote => return Ok(out),
            Some('\\') => match cur.bump() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('r') => out.push('\r'),
                Some(c) => out.push(c),
                None => return Err(ParseError::UnterminatedString { offset: start }),
            },
            Some(c) => out.push(c),
            None => return Err(ParseError::UnterminatedString { offset: start }),
        }
    }
}

struct Cursor<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, c: char, expected: &'static str) -> Result<(), ParseError> {
        if self.eat(c) {
            Ok(())
        } else {
            Err(ParseError::Unexpected {
                expected,
                offset: self.pos,
            })
        }
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.bump();
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }
}
