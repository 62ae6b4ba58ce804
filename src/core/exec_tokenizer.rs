//! # Exec Tokenizer
//!
//! Turns the raw value of a desktop entry `Exec` key into an argument vector.
//!
//! Three passes run in order:
//! 1. [`expand_escapes`] undoes the string-level escapes of the desktop entry format.
//! 2. [`tokenize`] splits the result into arguments, honouring double quotes and
//!    rejecting anything that would need a shell to interpret.
//! 3. [`strip_fields`] removes the `%f`-style field codes, which never make sense for
//!    a terminal launched on behalf of another program.
//!
//! [`parse_exec`] chains the three.

use thiserror::Error;

/// Characters that may only appear inside double quotes.
const RESERVED_CHARS: &[char] = &[
    '`', '$', '\\', '\'', '>', '<', '~', '|', '&', ';', '*', '?', '#', '(', ')',
];

/// Field codes that are deprecated and dropped without complaint.
const DEPRECATED_FIELDS: &[char] = &['d', 'D', 'n', 'N', 'v', 'm'];

/// File and URL field codes; at most one of them may appear in a template.
const FILE_FIELDS: &[char] = &['f', 'F', 'u', 'U'];

/// Icon and translated-name field codes, dropped silently.
const INFO_FIELDS: &[char] = &['i', 'c'];

/// Errors produced while turning an `Exec` value into arguments.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenizeError {
    /// A reserved character appeared outside of double quotes.
    #[error("Reserved character '{ch}' outside of quotes at position {pos}.")]
    UnquotedReserved {
        /// The offending character.
        ch: char,
        /// Character index in the expanded string.
        pos: usize,
    },
    /// A backtick or dollar sign appeared unescaped inside double quotes.
    #[error("Unescaped '{ch}' inside quotes at position {pos}.")]
    UnescapedInQuotes {
        /// The offending character.
        ch: char,
        /// Character index in the expanded string.
        pos: usize,
    },
    /// A backslash inside quotes was the last character of the input.
    #[error("Dangling backslash at end of input.")]
    DanglingBackslash,
    /// The input ended while a double quote was still open.
    #[error("Unterminated double quote.")]
    UnterminatedQuote,
    /// More than one of `%f %F %u %U` appeared.
    #[error("More than one file or URL field code ('%{0}' is the second).")]
    DuplicateFileField(char),
    /// A `%` followed by a character that is not a known field code.
    #[error("Unknown field code '%{0}'.")]
    UnknownField(char),
    /// A `%` at the very end of an argument.
    #[error("Incomplete field code at end of argument '{0}'.")]
    IncompleteField(String),
}

/// Expands the string-level escape sequences of a desktop entry value.
///
/// `\s`, `\n`, `\t`, `\r` and `\\` are recognized. For any other character the
/// backslash is dropped and the character kept as is; a trailing lone backslash
/// is dropped.
pub fn expand_escapes(value: &str) -> String {
    let mut expanded = String::with_capacity(value.len());
    let mut chars = value.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            expanded.push(c);
            continue;
        }
        match chars.next() {
            Some('s') => expanded.push(' '),
            Some('n') => expanded.push('\n'),
            Some('t') => expanded.push('\t'),
            Some('r') => expanded.push('\r'),
            Some('\\') => expanded.push('\\'),
            Some(other) => expanded.push(other),
            None => {}
        }
    }
    expanded
}

/// Splits an (already escape-expanded) command template into arguments.
///
/// Outside quotes, whitespace separates arguments and the characters in
/// `RESERVED_CHARS` are rejected. Inside double quotes everything is literal except
/// an unescaped backtick or dollar sign (rejected) and a backslash, which takes the
/// following character literally.
///
/// # Errors
///
/// Returns a [`TokenizeError`] for reserved characters, a dangling backslash or an
/// unterminated quote. Nothing is returned partially.
pub fn tokenize(command: &str) -> Result<Vec<String>, TokenizeError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    // An argument exists once anything, even an empty `""`, was seen.
    let mut started = false;
    let mut in_quotes = false;
    let mut chars = command.chars().enumerate();

    while let Some((pos, c)) = chars.next() {
        if in_quotes {
            match c {
                '"' => in_quotes = false,
                '`' | '$' => return Err(TokenizeError::UnescapedInQuotes { ch: c, pos }),
                '\\' => match chars.next() {
                    Some((_, escaped)) => current.push(escaped),
                    None => return Err(TokenizeError::DanglingBackslash),
                },
                _ => current.push(c),
            }
            continue;
        }

        match c {
            '"' => {
                in_quotes = true;
                started = true;
            }
            c if c.is_whitespace() => {
                if started {
                    tokens.push(std::mem::take(&mut current));
                    started = false;
                }
            }
            c if RESERVED_CHARS.contains(&c) => {
                return Err(TokenizeError::UnquotedReserved { ch: c, pos });
            }
            _ => {
                current.push(c);
                started = true;
            }
        }
    }

    if in_quotes {
        return Err(TokenizeError::UnterminatedQuote);
    }
    if started {
        tokens.push(current);
    }
    Ok(tokens)
}

/// Removes field codes from tokenized arguments.
///
/// An argument carrying any field code is removed as a whole. `%%` is the only
/// escape and becomes a literal `%` in arguments that are kept.
///
/// # Errors
///
/// Fails on a second file/URL code anywhere in the template, on an unknown code,
/// and on a `%` ending an argument.
pub fn strip_fields(tokens: Vec<String>) -> Result<Vec<String>, TokenizeError> {
    let mut file_fields_seen = 0usize;
    let mut kept = Vec::with_capacity(tokens.len());

    for token in tokens {
        if !token.contains('%') {
            kept.push(token);
            continue;
        }

        let mut unescaped = String::with_capacity(token.len());
        let mut drop_token = false;
        let mut chars = token.chars();

        while let Some(c) = chars.next() {
            if c != '%' {
                unescaped.push(c);
                continue;
            }
            match chars.next() {
                Some('%') => unescaped.push('%'),
                Some(code) if FILE_FIELDS.contains(&code) => {
                    file_fields_seen += 1;
                    if file_fields_seen > 1 {
                        return Err(TokenizeError::DuplicateFileField(code));
                    }
                    drop_token = true;
                }
                Some(code) if DEPRECATED_FIELDS.contains(&code) || INFO_FIELDS.contains(&code) => {
                    drop_token = true;
                }
                Some(code) => return Err(TokenizeError::UnknownField(code)),
                None => return Err(TokenizeError::IncompleteField(token.clone())),
            }
        }

        if drop_token {
            log::trace!("Dropping argument '{}' carrying a field code.", token);
        } else {
            kept.push(unescaped);
        }
    }

    Ok(kept)
}

/// Full pipeline for a raw `Exec` value: escape expansion, tokenization and field
/// stripping.
pub fn parse_exec(raw: &str) -> Result<Vec<String>, TokenizeError> {
    let expanded = expand_escapes(raw);
    let tokens = tokenize(&expanded)?;
    strip_fields(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    // --- Escape expansion ---

    #[test]
    fn test_expand_known_escapes() {
        assert_eq!(expand_escapes(r"a\sb\tc\nd\re\\f"), "a b\tc\nd\re\\f");
    }

    #[test]
    fn test_expand_unknown_escape_drops_backslash() {
        assert_eq!(expand_escapes(r"\x\;\ "), "x; ");
        assert_eq!(expand_escapes(r"trailing\"), "trailing");
    }

    // --- Tokenizer ---

    #[test]
    fn test_tokenize_simple_and_whitespace_runs() {
        assert_eq!(
            tokenize("  myterm   --flag\tvalue  ").unwrap(),
            strings(&["myterm", "--flag", "value"])
        );
        assert!(tokenize("   ").unwrap().is_empty());
    }

    #[test]
    fn test_tokenize_quotes_keep_whitespace_and_reserved() {
        assert_eq!(
            tokenize(r#""foo" "bar baz" pre"mid dle"post "a;b|c""#).unwrap(),
            strings(&["foo", "bar baz", "premid dlepost", "a;b|c"])
        );
    }

    #[test]
    fn test_tokenize_empty_quotes_produce_empty_argument() {
        assert_eq!(tokenize(r#"term "" x"#).unwrap(), strings(&["term", "", "x"]));
    }

    #[test]
    fn test_tokenize_backslash_inside_quotes() {
        assert_eq!(
            tokenize(r#"term "say \"hi\" \$HOME \`x\` \\""#).unwrap(),
            strings(&["term", r#"say "hi" $HOME `x` \"#])
        );
    }

    #[test]
    fn test_tokenize_rejects_unterminated_quote() {
        assert_eq!(tokenize(r#"echo "hello"#), Err(TokenizeError::UnterminatedQuote));
    }

    #[test]
    fn test_tokenize_rejects_dangling_backslash() {
        assert_eq!(tokenize(r#"echo "abc\"#), Err(TokenizeError::DanglingBackslash));
    }

    #[test]
    fn test_tokenize_rejects_unquoted_reserved() {
        assert_eq!(
            tokenize("echo $HOME"),
            Err(TokenizeError::UnquotedReserved { ch: '$', pos: 5 })
        );
        for input in ["a>b", "a'b'", "~/bin/term", "x && y", "term #c", "(sub)", r"a\b"] {
            assert!(
                matches!(tokenize(input), Err(TokenizeError::UnquotedReserved { .. })),
                "input {:?} should be rejected",
                input
            );
        }
    }

    #[test]
    fn test_tokenize_rejects_dollar_and_backtick_in_quotes() {
        assert_eq!(
            tokenize(r#"term "$x""#),
            Err(TokenizeError::UnescapedInQuotes { ch: '$', pos: 6 })
        );
        assert!(matches!(
            tokenize(r#"term "`id`""#),
            Err(TokenizeError::UnescapedInQuotes { ch: '`', .. })
        ));
    }

    // --- Field stripping ---

    #[test]
    fn test_strip_removes_file_field_token() {
        let tokens = tokenize(r#""foo" "bar baz" %f"#).unwrap();
        let stripped = strip_fields(tokens.clone()).unwrap();
        assert_eq!(stripped, strings(&["foo", "bar baz"]));
        // Same input, same output.
        assert_eq!(strip_fields(tokens).unwrap(), stripped);
        assert_eq!(strip_fields(stripped.clone()).unwrap(), stripped);
    }

    #[test]
    fn test_strip_rejects_two_file_fields() {
        let tokens = strings(&["term", "%u", "--file=%f"]);
        assert_eq!(strip_fields(tokens), Err(TokenizeError::DuplicateFileField('f')));
        assert!(strip_fields(strings(&["term", "%F%U"])).is_err());
    }

    #[test]
    fn test_strip_drops_deprecated_and_info_fields() {
        let tokens = strings(&["term", "%d", "%D", "%n", "%N", "%v", "%m", "--icon=%i", "%c", "x"]);
        assert_eq!(strip_fields(tokens).unwrap(), strings(&["term", "x"]));
    }

    #[test]
    fn test_strip_unescapes_percent() {
        assert_eq!(
            strip_fields(strings(&["term", "100%%", "%%f"])).unwrap(),
            strings(&["term", "100%", "%f"])
        );
    }

    #[test]
    fn test_strip_rejects_unknown_and_incomplete_fields() {
        assert_eq!(
            strip_fields(strings(&["term", "%k"])),
            Err(TokenizeError::UnknownField('k'))
        );
        assert_eq!(
            strip_fields(strings(&["term", "50%"])),
            Err(TokenizeError::IncompleteField("50%".to_string()))
        );
    }

    // --- Pipeline ---

    #[test]
    fn test_parse_exec_pipeline() {
        assert_eq!(
            parse_exec(r#"myterm\s--class "two words" %U"#).unwrap(),
            strings(&["myterm", "--class", "two words"])
        );
        // `\\` becomes a single backslash, which is reserved outside quotes.
        assert!(parse_exec(r"myterm \\n").is_err());
        // Inside quotes it escapes the next character.
        assert_eq!(parse_exec(r#"myterm "a\\"b""#).unwrap(), strings(&["myterm", r#"a"b"#]));
    }
}
