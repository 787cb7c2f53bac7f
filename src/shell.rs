// ABOUTME: POSIX shell quoting for remotely executed command lines.
// ABOUTME: Single point of truth so call sites never hand-roll escaping.

/// Quote one token for a POSIX shell.
///
/// Tokens made of safe characters pass through unchanged; anything else is
/// wrapped in single quotes with embedded single quotes rewritten as `'\''`.
/// The Colima path joins quoted tokens into the command line handed to
/// `colima ssh`, which runs it through the VM's shell.
pub fn quote(token: &str) -> String {
    if !token.is_empty() && token.chars().all(is_safe) {
        return token.to_string();
    }
    let mut quoted = String::with_capacity(token.len() + 2);
    quoted.push('\'');
    for c in token.chars() {
        if c == '\'' {
            quoted.push_str("'\\''");
        } else {
            quoted.push(c);
        }
    }
    quoted.push('\'');
    quoted
}

/// Quote and join a full argument vector into one command line.
pub fn join(tokens: impl IntoIterator<Item = impl AsRef<str>>) -> String {
    tokens
        .into_iter()
        .map(|t| quote(t.as_ref()))
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_safe(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | ':' | ',' | '=' | '@' | '+' | '%')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_tokens_pass_through() {
        assert_eq!(quote("nerdctl"), "nerdctl");
        assert_eq!(quote("--name"), "--name");
        assert_eq!(quote("/bin/sleep"), "/bin/sleep");
        assert_eq!(quote("k=v"), "k=v");
    }

    #[test]
    fn empty_token_becomes_empty_quotes() {
        assert_eq!(quote(""), "''");
    }

    #[test]
    fn whitespace_is_quoted() {
        assert_eq!(quote("a b"), "'a b'");
        assert_eq!(quote("a\tb"), "'a\tb'");
    }

    #[test]
    fn metacharacters_are_quoted() {
        for token in ["a;b", "a&b", "a|b", "a>b", "a<b", "a$(b)", "a`b`", "a*b", "a?b", "a(b)", "a\"b", "a\\b", "a#b", "a~b", "a!b"] {
            let quoted = quote(token);
            assert!(quoted.starts_with('\''), "{token} must be quoted, got {quoted}");
        }
    }

    #[test]
    fn single_quote_is_escaped() {
        assert_eq!(quote("it's"), "'it'\\''s'");
    }

    #[test]
    fn join_builds_a_command_line() {
        let line = join(["nerdctl", "run", "--name", "dvm-api-main", "sh", "-c", "echo hi"]);
        assert_eq!(line, "nerdctl run --name dvm-api-main sh -c 'echo hi'");
    }
}
