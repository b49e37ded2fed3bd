//! Echo and comment compilation
//!
//! Both delimiter pairs are configurable. When one open tag is a prefix of
//! the other (`{{` and `{{{` by default) the pair with the longer open tag
//! has to be resolved first, otherwise the shorter pattern would swallow
//! one brace of the longer one.

use super::raw_blocks::ECHO_PLACEHOLDER;
use super::state::CompileState;
use crate::config::TagPair;
use crate::error::Result;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// `$expr or 'default'`
static ECHO_DEFAULT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^(\$.+?)\s+or\s+(.+?)$").expect("Echo default pattern must compile")
});

/// Which pair an echo pattern belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EchoKind {
    Regular,
    Escaped,
}

/// Regexes derived from the configured tags
#[derive(Debug, Clone)]
pub struct EchoPatterns {
    literal: Regex,
    regular: Regex,
    escaped: Regex,
    comment: Regex,
    echo_format: String,
    escaped_first: bool,
}

fn echo_pattern(tags: &TagPair) -> Result<Regex> {
    Ok(Regex::new(&format!(
        r"(?s){}\s*(.+?)\s*{}(\r?\n)?",
        regex::escape(&tags.open),
        regex::escape(&tags.close)
    ))?)
}

/// `@` followed by either pair, the longer open tag tried first
fn literal_pattern(first: &TagPair, second: &TagPair) -> Result<Regex> {
    Ok(Regex::new(&format!(
        r"(?s)@({}.+?{}|{}.+?{})",
        regex::escape(&first.open),
        regex::escape(&first.close),
        regex::escape(&second.open),
        regex::escape(&second.close)
    ))?)
}

impl EchoPatterns {
    pub fn new(content: &TagPair, escaped: &TagPair, echo_format: &str) -> Result<Self> {
        let comment = Regex::new(&format!(
            r"(?s){}--(.*?)--{}",
            regex::escape(&content.open),
            regex::escape(&content.close)
        ))?;

        let escaped_first = escaped.open.len() >= content.open.len();
        let literal = if escaped_first {
            literal_pattern(escaped, content)?
        } else {
            literal_pattern(content, escaped)?
        };

        Ok(Self {
            literal,
            regular: echo_pattern(content)?,
            escaped: echo_pattern(escaped)?,
            comment,
            echo_format: echo_format.to_string(),
            escaped_first,
        })
    }

    /// Resolution order of the two passes
    pub fn order(&self) -> [EchoKind; 2] {
        if self.escaped_first {
            [EchoKind::Escaped, EchoKind::Regular]
        } else {
            [EchoKind::Regular, EchoKind::Escaped]
        }
    }

    /// `{{-- text --}}` becomes a PHP comment keeping the text
    pub fn compile_comments(&self, value: &str) -> String {
        self.comment
            .replace_all(value, |caps: &Captures| {
                format!("<?php /*{}*/ ?>", caps[1].replace("*/", "* /"))
            })
            .into_owned()
    }

    pub fn compile_echoes(&self, value: &str, state: &mut CompileState) -> String {
        let value = self.park_literals(value, state);
        let [first, second] = self.order();
        let value = self.compile_pass(first, &value);
        self.compile_pass(second, &value)
    }

    /// `@{{ $x }}` prints the tags themselves; park the literal so neither
    /// pass can pick it up
    fn park_literals(&self, value: &str, state: &mut CompileState) -> String {
        self.literal
            .replace_all(value, |caps: &Captures| {
                state.echo_literals.push(caps[1].to_string());
                ECHO_PLACEHOLDER.to_string()
            })
            .into_owned()
    }

    fn compile_pass(&self, kind: EchoKind, value: &str) -> String {
        let pattern = match kind {
            EchoKind::Regular => &self.regular,
            EchoKind::Escaped => &self.escaped,
        };

        pattern
            .replace_all(value, |caps: &Captures| {
                let newline = caps.get(2).map(|m| m.as_str()).unwrap_or("");
                let expression = compile_echo_defaults(&caps[1]);
                let printed = match kind {
                    EchoKind::Regular => expression,
                    EchoKind::Escaped => self.echo_format.replace("%s", &expression),
                };

                // PHP swallows the newline after `?>`, so emit it twice
                format!("<?php echo {}; ?>{}{}", printed, newline, newline)
            })
            .into_owned()
    }
}

/// Rewrite `$name or 'default'` into an isset ternary
pub fn compile_echo_defaults(value: &str) -> String {
    ECHO_DEFAULT
        .replace(value, "isset($1) ? $1 : $2")
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_patterns() -> EchoPatterns {
        EchoPatterns::new(
            &TagPair::new("{{", "}}"),
            &TagPair::new("{{{", "}}}"),
            "e(%s)",
        )
        .unwrap()
    }

    fn echoes(value: &str) -> String {
        let mut state = CompileState::new(None);
        default_patterns().compile_echoes(value, &mut state)
    }

    #[test]
    fn test_regular_and_escaped() {
        assert_eq!(echoes("{{ $name }}"), "<?php echo $name; ?>");
        assert_eq!(echoes("{{{ $name }}}"), "<?php echo e($name); ?>");
        assert_eq!(
            echoes("{{{ $a }}} and {{ $b }}"),
            "<?php echo e($a); ?> and <?php echo $b; ?>"
        );
    }

    #[test]
    fn test_multiline_expression() {
        assert_eq!(
            echoes("{{\n    $user->name\n}}"),
            "<?php echo $user->name; ?>"
        );
    }

    #[test]
    fn test_trailing_newline_doubled() {
        assert_eq!(echoes("{{ $a }}\nnext"), "<?php echo $a; ?>\n\nnext");
    }

    #[test]
    fn test_defaults_shorthand() {
        assert_eq!(compile_echo_defaults("$name or 'Guest'"), "isset($name) ? $name : 'Guest'");
        assert_eq!(compile_echo_defaults("$a or $b or 'c'"), "isset($a) ? $a : $b or 'c'");
        assert_eq!(compile_echo_defaults("name() or 'x'"), "name() or 'x'");
        assert_eq!(
            echoes("{{{ $name or 'Guest' }}}"),
            "<?php echo e(isset($name) ? $name : 'Guest'); ?>"
        );
    }

    #[test]
    fn test_at_escape_is_parked() {
        let patterns = default_patterns();
        let mut state = CompileState::new(None);

        let compiled = patterns.compile_echoes("@{{ $a }} @{{{ $b }}}", &mut state);
        assert_eq!(compiled, format!("{0} {0}", ECHO_PLACEHOLDER));
        assert_eq!(
            state.echo_literals,
            vec!["{{ $a }}".to_string(), "{{{ $b }}}".to_string()]
        );
    }

    #[test]
    fn test_longer_content_tags_resolved_first() {
        let patterns = EchoPatterns::new(
            &TagPair::new("{{{", "}}}"),
            &TagPair::new("{{", "}}"),
            "e(%s)",
        )
        .unwrap();
        assert_eq!(patterns.order(), [EchoKind::Regular, EchoKind::Escaped]);

        let mut state = CompileState::new(None);
        assert_eq!(
            patterns.compile_echoes("{{{ $raw }}} {{ $safe }}", &mut state),
            "<?php echo $raw; ?> <?php echo e($safe); ?>"
        );
    }

    #[test]
    fn test_comments() {
        let patterns = default_patterns();
        assert_eq!(
            patterns.compile_comments("a{{-- note @if($x) --}}b"),
            "a<?php /* note @if($x) */ ?>b"
        );
        assert_eq!(
            patterns.compile_comments("{{-- a */ b --}}"),
            "<?php /* a * / b */ ?>"
        );
    }
}
