/// Replace `${ENV_VAR}` and `${ENV_VAR:-fallback}` placeholders in raw config text.
///
/// A variable that is unset (or set but empty, for the `:-` form) takes the
/// fallback; without a fallback the placeholder is left as-is.
pub fn substitute_env(input: &str) -> String {
    substitute_with(input, |name| std::env::var(name).ok())
}

fn substitute_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            // Unterminated: emit the remainder literally.
            result.push_str(&rest[start..]);
            return result;
        };

        let body = &after[..end];
        let (name, fallback) = match body.split_once(":-") {
            Some((name, fallback)) => (name, Some(fallback)),
            None => (body, None),
        };

        match (lookup(name).filter(|v| fallback.is_none() || !v.is_empty()), fallback) {
            _ if name.is_empty() => {
                result.push_str("${");
                result.push_str(body);
                result.push('}');
            },
            (Some(value), _) => result.push_str(&value),
            (None, Some(fallback)) => result.push_str(fallback),
            (None, None) => {
                result.push_str("${");
                result.push_str(body);
                result.push('}');
            },
        }
        rest = &after[end + 1..];
    }

    result.push_str(rest);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(name: &str) -> Option<String> {
        match name {
            "MERIDIAN_API" => Some("https://api.example.com".into()),
            "EMPTY" => Some(String::new()),
            _ => None,
        }
    }

    #[test]
    fn substitutes_known_var() {
        assert_eq!(
            substitute_with("base_url = \"${MERIDIAN_API}/api\"", env),
            "base_url = \"https://api.example.com/api\""
        );
    }

    #[test]
    fn leaves_unknown_var() {
        assert_eq!(
            substitute_with("${MERIDIAN_NONEXISTENT_XYZ}", env),
            "${MERIDIAN_NONEXISTENT_XYZ}"
        );
    }

    #[test]
    fn fallback_applies_to_unset_and_empty() {
        assert_eq!(substitute_with("${NOPE:-4000}", env), "4000");
        assert_eq!(substitute_with("${EMPTY:-x}", env), "x");
        assert_eq!(substitute_with("${MERIDIAN_API:-x}", env), "https://api.example.com");
    }

    #[test]
    fn malformed_is_literal() {
        assert_eq!(substitute_with("a ${UNCLOSED", env), "a ${UNCLOSED");
        assert_eq!(substitute_with("${}", env), "${}");
    }

    #[test]
    fn reads_process_env() {
        assert_eq!(substitute_env("plain text"), "plain text");
    }
}
