//! Argument tokenization and extraction.
//!
//! [`Arguments`] is the parsed form of everything after the command prefix.
//! Tokenization splits on whitespace except inside double-quoted spans,
//! which collapse (quotes stripped) into a single token. On top of the
//! token list it offers:
//!
//! - total positional access ([`get`](Arguments::get) never fails; out of
//!   range yields `""`)
//! - per-token mention extraction (`<@id>` / `<@!id>` / `<@&id>` / `<#id>`)
//! - extraction of one fenced or inline code block from the raw text
//! - [`remove`](Arguments::remove), which re-derives the raw string as the
//!   space-joined remaining tokens — command resolution relies on this to
//!   descend into subcommands.

/// Splits raw text into whitespace-delimited tokens, collapsing
/// double-quoted spans into single tokens with the quotes stripped.
///
/// An unterminated quote runs to the end of the input.
pub fn tokenize(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in input.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
            }
            c if c.is_whitespace() && !in_quotes => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }

    if !current.is_empty() {
        tokens.push(current);
    }

    tokens
}

/// A code block extracted from a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    /// Language tag of a fenced block, when present and recognized.
    pub language: Option<String>,
    /// The code itself, fences stripped.
    pub content: String,
}

/// Language tags accepted on a fenced code block. Anything else is treated
/// as the first line of the content.
const KNOWN_LANGUAGES: &[&str] = &[
    "bash", "c", "cpp", "cs", "css", "go", "hs", "html", "java", "javascript", "js", "json", "kt",
    "lua", "md", "php", "py", "python", "rb", "ruby", "rs", "rust", "sh", "sql", "swift", "toml",
    "ts", "txt", "xml", "yaml", "yml",
];

/// The parsed argument list of one invocation.
///
/// Immutable after construction apart from [`remove`](Arguments::remove),
/// whose raw-string re-derivation is an observable contract: resolution
/// removes the matched token at each level and re-tokenizes what is left.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arguments {
    tokens: Vec<String>,
    raw: String,
}

impl Arguments {
    /// Tokenizes `input` into an argument list, keeping the original text.
    pub fn parse(input: &str) -> Self {
        Self {
            tokens: tokenize(input),
            raw: input.trim().to_string(),
        }
    }

    /// The original (or re-derived, after removals) unsplit text.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Number of tokens.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Whether there are no tokens.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// All tokens in order.
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Returns the nth token, or `""` when out of range. Indexing is total.
    pub fn get(&self, n: usize) -> &str {
        self.tokens.get(n).map(String::as_str).unwrap_or("")
    }

    /// Removes the nth token (no-op when out of range) and re-derives the
    /// raw string as the space-joined remaining tokens, trimmed.
    pub fn remove(&mut self, n: usize) {
        if n < self.tokens.len() {
            self.tokens.remove(n);
            self.raw = self.tokens.join(" ").trim().to_string();
        }
    }

    /// Extracts the user id from the nth token if it is a user mention
    /// (`<@123>` or `<@!123>`).
    pub fn user_mention(&self, n: usize) -> Option<&str> {
        let token = self.get(n);
        let body = token.strip_prefix("<@")?.strip_suffix('>')?;
        digits(body.strip_prefix('!').unwrap_or(body))
    }

    /// Extracts the role id from the nth token if it is a role mention
    /// (`<@&123>`).
    pub fn role_mention(&self, n: usize) -> Option<&str> {
        digits(self.get(n).strip_prefix("<@&")?.strip_suffix('>')?)
    }

    /// Extracts the channel id from the nth token if it is a channel
    /// mention (`<#123>`).
    pub fn channel_mention(&self, n: usize) -> Option<&str> {
        digits(self.get(n).strip_prefix("<#")?.strip_suffix('>')?)
    }

    /// Extracts a single fenced code block (preferred) or inline code span
    /// from the raw text.
    ///
    /// Fenced blocks may carry a language tag on the fence line; tags not
    /// in the known-language list are folded back into the content.
    pub fn code_block(&self) -> Option<CodeBlock> {
        fenced_block(&self.raw).or_else(|| inline_code(&self.raw))
    }
}

/// Returns `body` when it is all ASCII digits and non-empty.
fn digits(body: &str) -> Option<&str> {
    if !body.is_empty() && body.bytes().all(|b| b.is_ascii_digit()) {
        Some(body)
    } else {
        None
    }
}

fn fenced_block(raw: &str) -> Option<CodeBlock> {
    let start = raw.find("```")?;
    let rest = &raw[start + 3..];
    let end = rest.find("```")?;
    let body = &rest[..end];

    // First line is a language tag only when it reads as one.
    if let Some((first, tail)) = body.split_once('\n') {
        let tag = first.trim();
        if KNOWN_LANGUAGES.contains(&tag) {
            return Some(CodeBlock {
                language: Some(tag.to_string()),
                content: tail.trim_matches('\n').to_string(),
            });
        }
    }

    Some(CodeBlock {
        language: None,
        content: body.trim_matches('\n').to_string(),
    })
}

fn inline_code(raw: &str) -> Option<CodeBlock> {
    let start = raw.find('`')?;
    let rest = &raw[start + 1..];
    let end = rest.find('`')?;
    let content = &rest[..end];
    if content.is_empty() {
        return None;
    }
    Some(CodeBlock {
        language: None,
        content: content.to_string(),
    })
}
