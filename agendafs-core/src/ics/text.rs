//! TEXT value escaping and content line folding (RFC 5545 §3.1, §3.3.11).

/// Content lines longer than this many octets are folded
const FOLD_OCTETS: usize = 75;

pub fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            ';' => out.push_str("\\;"),
            ',' => out.push_str("\\,"),
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out
}

pub fn unescape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => out.push('\n'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Split a multi-valued TEXT property on commas that are not escaped.
pub fn split_unescaped_commas(s: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut escaped = false;

    for c in s.chars() {
        if escaped {
            current.push('\\');
            current.push(c);
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == ',' {
            parts.push(unescape_text(&current));
            current.clear();
        } else {
            current.push(c);
        }
    }
    if escaped {
        current.push('\\');
    }
    parts.push(unescape_text(&current));
    parts
}

/// Append one content line to `out`, folded and CRLF terminated.
pub fn push_folded_line(out: &mut String, line: &str) {
    let mut width = 0;
    for c in line.chars() {
        let len = c.len_utf8();
        if width + len > FOLD_OCTETS {
            out.push_str("\r\n ");
            width = 1;
        }
        out.push(c);
        width += len;
    }
    out.push_str("\r\n");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_unescape_special_characters() {
        let raw = "a;b,c\\d\ne";
        let escaped = escape_text(raw);
        assert_eq!(escaped, "a\\;b\\,c\\\\d\\ne");
        assert_eq!(unescape_text(&escaped), raw);
    }

    #[test]
    fn test_split_keeps_escaped_commas() {
        assert_eq!(split_unescaped_commas("a,b\\,c"), vec!["a", "b,c"]);
        assert_eq!(split_unescaped_commas("single"), vec!["single"]);
    }

    #[test]
    fn test_long_lines_fold_at_75_octets() {
        let mut out = String::new();
        push_folded_line(&mut out, &format!("DESCRIPTION:{}", "x".repeat(100)));

        let lines: Vec<&str> = out.split("\r\n").filter(|l| !l.is_empty()).collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].len(), 75);
        assert!(lines[1].starts_with(' '));
        assert_eq!(out.replace("\r\n ", "").trim_end(), format!("DESCRIPTION:{}", "x".repeat(100)));
    }

    #[test]
    fn test_folding_never_splits_multibyte_characters() {
        let mut out = String::new();
        push_folded_line(&mut out, &"é".repeat(60));
        for line in out.split("\r\n") {
            assert!(line.len() <= 75);
        }
        assert_eq!(out.replace("\r\n ", "").trim_end(), "é".repeat(60));
    }
}
