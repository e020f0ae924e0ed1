/// Expand `${NAME}` and `$NAME` references in raw config text.
///
/// Unset variables expand to the empty string. `$$` is a literal `$`.
pub fn substitute_env(input: &str) -> String {
    substitute_with(input, |name| std::env::var(name).ok())
}

/// Same as [`substitute_env`] but resolves names through `lookup`.
pub fn substitute_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' {
            result.push(ch);
            continue;
        }

        match chars.peek() {
            Some('$') => {
                chars.next();
                result.push('$');
            },
            Some('{') => {
                chars.next(); // consume '{'
                let mut var_name = String::new();
                let mut closed = false;
                for c in chars.by_ref() {
                    if c == '}' {
                        closed = true;
                        break;
                    }
                    var_name.push(c);
                }
                if closed && !var_name.is_empty() {
                    result.push_str(&lookup(&var_name).unwrap_or_default());
                } else {
                    // Malformed, emit literal.
                    result.push_str("${");
                    result.push_str(&var_name);
                    if closed {
                        result.push('}');
                    }
                }
            },
            Some(c) if is_name_start(*c) => {
                let mut var_name = String::new();
                while let Some(c) = chars.peek() {
                    if !is_name_char(*c) {
                        break;
                    }
                    var_name.push(*c);
                    chars.next();
                }
                result.push_str(&lookup(&var_name).unwrap_or_default());
            },
            _ => result.push('$'),
        }
    }

    result
}

fn is_name_start(c: char) -> bool {
    c == '_' || c.is_ascii_alphabetic()
}

fn is_name_char(c: char) -> bool {
    c == '_' || c.is_ascii_alphanumeric()
}
