//! Built-in placeholder functions
//!
//! Placeholders that are neither supplied values nor required names are
//! evaluated as small call expressions:
//!
//! - `formattedDateNow('yyyy/MM/dd/HH')` - local time in a Java-style date pattern
//! - `env('NAME')` - environment variable (no value when unset)
//! - `cwd()` - current working directory
//! - `#name` - reference to a supplied value

use chrono::Local;
use std::collections::HashMap;
use thiserror::Error;

/// Failure while evaluating a placeholder expression
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExpressionError {
    /// The expression is not a call or variable reference
    #[error("unknown placeholder '{0}'")]
    UnknownPlaceholder(String),

    /// Syntax error in the expression
    #[error("cannot parse expression '{expression}': {message}")]
    Parse { expression: String, message: String },

    /// The function is not one of the built-ins
    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    /// Wrong number of arguments
    #[error("function '{function}' expects {expected} argument(s), got {found}")]
    Arity {
        function: String,
        expected: usize,
        found: usize,
    },

    /// Date pattern could not be converted
    #[error("invalid date format '{pattern}': {message}")]
    InvalidDateFormat { pattern: String, message: String },

    /// Working directory lookup failed
    #[error("cannot determine working directory: {0}")]
    WorkingDirectory(String),
}

/// Evaluates `expression` against the built-in functions
///
/// `Ok(None)` means the expression evaluated to no value (e.g. an unset
/// environment variable).
pub fn evaluate(
    expression: &str,
    values: &HashMap<String, Option<String>>,
) -> Result<Option<String>, ExpressionError> {
    let expression = expression.trim();

    if let Some(name) = expression.strip_prefix('#') {
        return Ok(values.get(name.trim()).cloned().flatten());
    }

    let Some(open) = expression.find('(') else {
        return Err(ExpressionError::UnknownPlaceholder(expression.to_string()));
    };
    if !expression.ends_with(')') {
        return Err(ExpressionError::Parse {
            expression: expression.to_string(),
            message: "missing closing parenthesis".to_string(),
        });
    }

    let function = expression[..open].trim();
    let args = parse_arguments(expression, &expression[open + 1..expression.len() - 1])?;

    match function {
        "formattedDateNow" => {
            expect_arity(function, 1, &args)?;
            formatted_date_now(&args[0]).map(Some)
        }
        "env" => {
            expect_arity(function, 1, &args)?;
            Ok(std::env::var(&args[0]).ok())
        }
        "cwd" => {
            expect_arity(function, 0, &args)?;
            std::env::current_dir()
                .map(|dir| Some(dir.display().to_string()))
                .map_err(|e| ExpressionError::WorkingDirectory(e.to_string()))
        }
        other => Err(ExpressionError::UnknownFunction(other.to_string())),
    }
}

fn expect_arity(function: &str, expected: usize, args: &[String]) -> Result<(), ExpressionError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(ExpressionError::Arity {
            function: function.to_string(),
            expected,
            found: args.len(),
        })
    }
}

/// Parses a comma-separated list of quoted string literals
///
/// Single- and double-quoted literals are accepted; a doubled quote inside
/// a literal stands for one quote character.
fn parse_arguments(expression: &str, raw: &str) -> Result<Vec<String>, ExpressionError> {
    let parse_error = |message: &str| ExpressionError::Parse {
        expression: expression.to_string(),
        message: message.to_string(),
    };

    let mut args = Vec::new();
    let mut chars = raw.chars().peekable();

    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        let Some(quote) = chars.next() else {
            break;
        };
        if quote != '\'' && quote != '"' {
            return Err(parse_error("arguments must be quoted string literals"));
        }

        let mut literal = String::new();
        loop {
            match chars.next() {
                Some(c) if c == quote => {
                    if chars.next_if_eq(&quote).is_some() {
                        literal.push(quote);
                    } else {
                        break;
                    }
                }
                Some(c) => literal.push(c),
                None => return Err(parse_error("unterminated string literal")),
            }
        }
        args.push(literal);

        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        match chars.next() {
            None => break,
            Some(',') => continue,
            Some(_) => return Err(parse_error("expected ',' between arguments")),
        }
    }

    Ok(args)
}

/// Formats the current local time with a Java-style date pattern
pub fn formatted_date_now(pattern: &str) -> Result<String, ExpressionError> {
    if pattern.is_empty() {
        return Err(ExpressionError::InvalidDateFormat {
            pattern: pattern.to_string(),
            message: "Date format must not be null or empty".to_string(),
        });
    }
    let strftime = java_pattern_to_strftime(pattern)?;
    Ok(Local::now().format(&strftime).to_string())
}

/// Converts a `SimpleDateFormat` pattern into a chrono strftime string
///
/// Supported letters: `y M d H h m s S a E D Z z`. Text inside single quotes
/// is literal and `''` is a literal quote.
pub fn java_pattern_to_strftime(pattern: &str) -> Result<String, ExpressionError> {
    let invalid = |message: String| ExpressionError::InvalidDateFormat {
        pattern: pattern.to_string(),
        message,
    };

    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '\'' {
            if chars.get(i + 1) == Some(&'\'') {
                out.push('\'');
                i += 2;
                continue;
            }
            let mut j = i + 1;
            loop {
                match chars.get(j) {
                    None => return Err(invalid("Unterminated quote".to_string())),
                    Some('\'') if chars.get(j + 1) == Some(&'\'') => {
                        out.push('\'');
                        j += 2;
                    }
                    Some('\'') => break,
                    Some(&literal) => {
                        push_literal(&mut out, literal);
                        j += 1;
                    }
                }
            }
            i = j + 1;
            continue;
        }

        if !c.is_ascii_alphabetic() {
            push_literal(&mut out, c);
            i += 1;
            continue;
        }

        let run = chars[i..].iter().take_while(|&&other| other == c).count();
        let spec = match (c, run) {
            ('y', 2) => "%y",
            ('y', _) => "%Y",
            ('M', 1) => "%-m",
            ('M', 2) => "%m",
            ('M', 3) => "%b",
            ('M', _) => "%B",
            ('d', 1) => "%-d",
            ('d', _) => "%d",
            ('H', 1) => "%-H",
            ('H', _) => "%H",
            ('h', 1) => "%-I",
            ('h', _) => "%I",
            ('m', 1) => "%-M",
            ('m', _) => "%M",
            ('s', 1) => "%-S",
            ('s', _) => "%S",
            ('S', 1..=3) => "%3f",
            ('S', 4..=6) => "%6f",
            ('S', _) => "%9f",
            ('a', _) => "%p",
            ('E', 1..=3) => "%a",
            ('E', _) => "%A",
            ('D', _) => "%j",
            ('Z', _) => "%z",
            ('z', _) => "%Z",
            (other, _) => return Err(invalid(format!("Illegal pattern character '{other}'"))),
        };
        out.push_str(spec);
        i += run;
    }

    Ok(out)
}

fn push_literal(out: &mut String, c: char) {
    if c == '%' {
        out.push_str("%%");
    } else {
        out.push(c);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_values() -> HashMap<String, Option<String>> {
        HashMap::new()
    }

    #[test]
    fn test_java_pattern_conversion() {
        assert_eq!(java_pattern_to_strftime("yyyy/MM/dd/HH").unwrap(), "%Y/%m/%d/%H");
        assert_eq!(
            java_pattern_to_strftime("yyyyMMddHHmmss").unwrap(),
            "%Y%m%d%H%M%S"
        );
        assert_eq!(
            java_pattern_to_strftime("yyyy-MM-dd'T'HH:mm:ss.SSS").unwrap(),
            "%Y-%m-%dT%H:%M:%S.%3f"
        );
        assert_eq!(java_pattern_to_strftime("'at' h a").unwrap(), "at %-I %p");
        assert_eq!(java_pattern_to_strftime("''100%").unwrap(), "'100%%");
    }

    #[test]
    fn test_java_pattern_rejects_unknown_letters() {
        assert!(java_pattern_to_strftime("yyyy-QQ").is_err());
        assert!(java_pattern_to_strftime("'open").is_err());
    }

    #[test]
    fn test_formatted_date_now_matches_chrono() {
        let expected = Local::now().format("%Y/%m/%d").to_string();
        let actual = evaluate("formattedDateNow('yyyy/MM/dd')", &no_values())
            .unwrap()
            .unwrap();
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_formatted_date_now_empty_pattern() {
        assert!(evaluate("formattedDateNow('')", &no_values()).is_err());
    }

    #[test]
    fn test_env_lookup() {
        std::env::set_var("NEXUS_INTERPOLATE_TEST_VAR", "from-env");
        assert_eq!(
            evaluate("env('NEXUS_INTERPOLATE_TEST_VAR')", &no_values()).unwrap(),
            Some("from-env".to_string())
        );
        std::env::remove_var("NEXUS_INTERPOLATE_TEST_VAR");
        assert_eq!(
            evaluate("env(\"NEXUS_INTERPOLATE_TEST_VAR\")", &no_values()).unwrap(),
            None
        );
    }

    #[test]
    fn test_cwd() {
        let expected = std::env::current_dir().unwrap().display().to_string();
        assert_eq!(evaluate(" cwd() ", &no_values()).unwrap(), Some(expected));
    }

    #[test]
    fn test_variable_reference() {
        let mut values = HashMap::new();
        values.insert("artifactId".to_string(), Some("abc".to_string()));
        assert_eq!(
            evaluate("#artifactId", &values).unwrap(),
            Some("abc".to_string())
        );
        assert_eq!(evaluate("#missing", &values).unwrap(), None);
    }

    #[test]
    fn test_errors() {
        assert_eq!(
            evaluate("unknownName", &no_values()),
            Err(ExpressionError::UnknownPlaceholder("unknownName".to_string()))
        );
        assert_eq!(
            evaluate("launchMissiles()", &no_values()),
            Err(ExpressionError::UnknownFunction("launchMissiles".to_string()))
        );
        assert!(matches!(
            evaluate("cwd('x')", &no_values()),
            Err(ExpressionError::Arity { .. })
        ));
        assert!(matches!(
            evaluate("env(NAME)", &no_values()),
            Err(ExpressionError::Parse { .. })
        ));
        assert!(matches!(
            evaluate("env('a' 'b')", &no_values()),
            Err(ExpressionError::Parse { .. })
        ));
    }

    #[test]
    fn test_escaped_quote_in_literal() {
        let args = parse_arguments("f('it''s')", "'it''s'").unwrap();
        assert_eq!(args, vec!["it's".to_string()]);
    }
}
