/// Byte offset where the member-access chain ending at `cursor` begins.
///
/// Walks backwards over names, variables, `->`, `?->`, `::` and balanced
/// `(...)`/`[...]` groups. Whitespace is crossed only when it separates a
/// chain continued on the next line (`$a\n    ->b`).
pub(crate) fn completion_target_start(source: &str, cursor: usize) -> Option<usize> {
    let bytes = source.as_bytes().get(..cursor)?;
    let mut index = bytes.len();
    while let Some(&byte) = index.checked_sub(1).and_then(|at| bytes.get(at)) {
        if is_name_byte(byte) || byte == b'$' || byte == b'\\' {
            index -= 1;
        } else if byte == b'>' && preceded_by(bytes, index - 1, b'-') {
            index -= 2;
            if preceded_by(bytes, index, b'?') {
                index -= 1;
            }
        } else if byte == b':' && preceded_by(bytes, index - 1, b':') {
            index -= 2;
        } else if byte == b')' || byte == b']' {
            index = matching_open(bytes, index - 1)?;
        } else if byte.is_ascii_whitespace() && continues_chain(bytes, index) {
            index -= 1;
        } else {
            break;
        }
    }
    Some(index)
}

fn is_name_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_' || byte >= 0x80
}

fn preceded_by(bytes: &[u8], index: usize, expected: u8) -> bool {
    index
        .checked_sub(1)
        .and_then(|at| bytes.get(at))
        .is_some_and(|&byte| byte == expected)
}

fn continues_chain(bytes: &[u8], index: usize) -> bool {
    let rest = bytes.get(index..).unwrap_or_default();
    let rest = rest.trim_ascii_start();
    rest.starts_with(b"->") || rest.starts_with(b"?->") || rest.starts_with(b"::")
}

fn matching_open(bytes: &[u8], close: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut index = close + 1;
    while index > 0 {
        index -= 1;
        match bytes.get(index)? {
            b')' | b']' => depth += 1,
            b'(' | b'[' => {
                depth -= 1;
                if depth == 0 {
                    return Some(index);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn target(source: &str) -> Option<&str> {
        let start = completion_target_start(source, source.len())?;
        source.get(start..)
    }

    #[test]
    fn stops_at_operators_and_keywords() {
        assert_eq!(target("return $this->fo"), Some("$this->fo"));
        assert_eq!(target("$x = new Abst"), Some("Abst"));
        assert_eq!(target("!Foo::"), Some("Foo::"));
    }

    #[test]
    fn crosses_balanced_calls() {
        assert_eq!(
            target("$a = $b->c($d, [1, 2])->e()?->"),
            Some("$b->c($d, [1, 2])->e()?->")
        );
    }

    #[test]
    fn follows_chain_across_lines() {
        assert_eq!(
            target("$x = $builder\n    ->where()\n    ->"),
            Some("$builder\n    ->where()\n    ->")
        );
    }

    #[test]
    fn unbalanced_group_has_no_target() {
        assert_eq!(completion_target_start("foo)->", 6), None);
    }
}
