/// Replace `${ENV_VAR}` placeholders in settings file contents.
///
/// Unresolvable variables are left as-is.
pub fn substitute_env(input: &str) -> String {
    substitute_env_with(input, |name| std::env::var(name).ok())
}

/// Same as [`substitute_env`] with an injectable lookup.
fn substitute_env_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) if end > 0 => {
                let name = &after[..end];
                match lookup(name) {
                    Some(value) => out.push_str(&value),
                    None => {
                        out.push_str("${");
                        out.push_str(name);
                        out.push('}');
                    },
                }
                rest = &after[end + 1..];
            },
            // `${}` or an unterminated placeholder: emit literally.
            _ => {
                out.push_str("${");
                rest = after;
            },
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(name: &str) -> Option<String> {
        match name {
            "SKM_HOME" => Some("/home/dev".to_string()),
            _ => None,
        }
    }

    #[test]
    fn substitutes_known_var() {
        assert_eq!(
            substitute_env_with("path = \"${SKM_HOME}/skills\"", lookup),
            "path = \"/home/dev/skills\""
        );
    }

    #[test]
    fn leaves_unknown_var_untouched() {
        assert_eq!(substitute_env_with("${NOPE}/x", lookup), "${NOPE}/x");
    }

    #[test]
    fn malformed_placeholders_are_literal() {
        assert_eq!(substitute_env_with("a ${ b", lookup), "a ${ b");
        assert_eq!(substitute_env_with("${}", lookup), "${}");
    }

    #[test]
    fn plain_dollar_signs_pass_through() {
        assert_eq!(substitute_env_with("cost: $5", lookup), "cost: $5");
    }
}
