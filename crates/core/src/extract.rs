//! Placeholder scanning for query templates.
//!
//! Two placeholder syntaxes are recognised:
//!
//! - `:name`  -- a value placeholder, bound as a driver parameter;
//! - `:name:` -- an identifier placeholder, replaced verbatim in the text.
//!
//! A name is `[A-Za-z_][A-Za-z0-9_]*`. The Postgres cast operator `::` never
//! starts a placeholder, so `:id::int` is the value placeholder `id` followed
//! by a cast. Scanning is purely textual: placeholders inside string literals
//! or comments are still placeholders.

/// One piece of a scanned template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    /// Literal SQL text, copied through unchanged.
    Text(&'a str),
    /// `:name`
    Value(&'a str),
    /// `:name:`
    Identifier(&'a str),
}

/// Placeholder names found in a template, deduplicated in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedParameters {
    pub values: Vec<String>,
    pub identifiers: Vec<String>,
    /// Names used both as `:name` and `:name:`. They are left out of
    /// `values` and `identifiers`, which are therefore always disjoint.
    pub conflicting: Vec<String>,
}

impl ExtractedParameters {
    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.identifiers.is_empty() && self.conflicting.is_empty()
    }
}

fn is_name_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_name_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Split template text into literal text and placeholder tokens.
///
/// Concatenating the tokens back with [`render`] reproduces the input exactly.
pub fn tokenize(text: &str) -> Vec<Token<'_>> {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut literal_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b':' {
            i += 1;
            continue;
        }
        // Cast operator.
        if bytes.get(i + 1) == Some(&b':') {
            i += 2;
            continue;
        }
        let name_start = i + 1;
        if !bytes.get(name_start).is_some_and(|b| is_name_start(*b)) {
            i += 1;
            continue;
        }
        let mut name_end = name_start + 1;
        while name_end < bytes.len() && is_name_char(bytes[name_end]) {
            name_end += 1;
        }

        if literal_start < i {
            tokens.push(Token::Text(&text[literal_start..i]));
        }
        let name = &text[name_start..name_end];
        let closes_identifier =
            bytes.get(name_end) == Some(&b':') && bytes.get(name_end + 1) != Some(&b':');
        if closes_identifier {
            tokens.push(Token::Identifier(name));
            i = name_end + 1;
        } else {
            tokens.push(Token::Value(name));
            i = name_end;
        }
        literal_start = i;
    }

    if literal_start < bytes.len() {
        tokens.push(Token::Text(&text[literal_start..]));
    }
    tokens
}

/// Reassemble tokens into template text.
pub fn render(tokens: &[Token<'_>]) -> String {
    let mut out = String::new();
    for token in tokens {
        match token {
            Token::Text(text) => out.push_str(text),
            Token::Value(name) => {
                out.push(':');
                out.push_str(name);
            }
            Token::Identifier(name) => {
                out.push(':');
                out.push_str(name);
                out.push(':');
            }
        }
    }
    out
}

/// Collect the distinct value and identifier names used in `text`.
pub fn extract_parameters(text: &str) -> ExtractedParameters {
    let mut values: Vec<String> = Vec::new();
    let mut identifiers: Vec<String> = Vec::new();

    for token in tokenize(text) {
        match token {
            Token::Value(name) if !values.iter().any(|v| v == name) => {
                values.push(name.to_string());
            }
            Token::Identifier(name) if !identifiers.iter().any(|v| v == name) => {
                identifiers.push(name.to_string());
            }
            _ => {}
        }
    }

    let conflicting: Vec<String> = values
        .iter()
        .filter(|name| identifiers.contains(name))
        .cloned()
        .collect();
    if !conflicting.is_empty() {
        values.retain(|name| !conflicting.contains(name));
        identifiers.retain(|name| !conflicting.contains(name));
    }

    ExtractedParameters {
        values,
        identifiers,
        conflicting,
    }
}
