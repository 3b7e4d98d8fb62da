//! `CALL_FUNCTION` argument lists.

use smallvec::SmallVec;

/// One argument as written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Argument {
    /// `"..."` or `'...'`; always text.
    Quoted(String),
    /// Anything else: a number, a `{variable}`, or bare text.
    Bare(String),
}

pub type Arguments = SmallVec<[Argument; 4]>;

/// Split on commas that are not inside quotes or braces. An empty list has no arguments.
#[must_use]
pub fn split_arguments(list: &str) -> Arguments {
    let mut args = Arguments::new();
    if list.trim().is_empty() {
        return args;
    }

    let mut current = String::new();
    let mut quoted = false;
    let mut quote: Option<char> = None;
    let mut depth = 0u32;

    for c in list.chars() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), c) => current.push(c),
            (None, '"' | '\'') if current.trim().is_empty() => {
                current.clear();
                quote = Some(c);
                quoted = true;
            }
            (None, '{') => {
                depth += 1;
                current.push(c);
            }
            (None, '}') => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            (None, ',') if depth == 0 => {
                args.push(finish(&mut current, quoted));
                quoted = false;
            }
            (None, c) => {
                if !(quoted && c.is_whitespace()) {
                    current.push(c);
                }
            }
        }
    }
    args.push(finish(&mut current, quoted));
    args
}

fn finish(current: &mut String, quoted: bool) -> Argument {
    let text = std::mem::take(current);
    if quoted {
        Argument::Quoted(text)
    } else {
        Argument::Bare(text.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare(s: &str) -> Argument {
        Argument::Bare(s.into())
    }

    #[test]
    fn test_plain_list() {
        assert_eq!(split_arguments("1, 2").as_slice(), [bare("1"), bare("2")]);
        assert!(split_arguments("   ").is_empty());
    }

    #[test]
    fn test_quotes_and_braces_group() {
        let args = split_arguments(r#""a, b", {x,y}, 'single', plain text"#);
        assert_eq!(
            args.as_slice(),
            [
                Argument::Quoted("a, b".into()),
                bare("{x,y}"),
                Argument::Quoted("single".into()),
                bare("plain text"),
            ]
        );
    }

    #[test]
    fn test_empty_slots_are_kept() {
        assert_eq!(split_arguments("a,,b").len(), 3);
    }
}
