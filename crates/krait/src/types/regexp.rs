//! RegExp compilation.
//!
//! JavaScript regex source is translated to `fancy-regex` syntax, which
//! covers backreferences and lookaround. Flags become inline modifiers where
//! possible; `g`/`y` affect matching protocol (lastIndex), not the compiled
//! pattern.

use fancy_regex::Regex;

/// Compiled regex plus parsed flags.
#[derive(Debug)]
pub(crate) struct RegExpData {
    pub source: String,
    pub flags: String,
    pub global: bool,
    pub ignore_case: bool,
    pub multiline: bool,
    pub dot_all: bool,
    pub sticky: bool,
    pub unicode: bool,
    pub regex: Regex,
}

impl RegExpData {
    /// Compiles `source` with `flags`; returns a message on failure suitable
    /// for a `SyntaxError`.
    pub fn compile(source: &str, flags: &str) -> Result<Self, String> {
        let mut global = false;
        let mut ignore_case = false;
        let mut multiline = false;
        let mut dot_all = false;
        let mut sticky = false;
        let mut unicode = false;
        for flag in flags.chars() {
            let slot = match flag {
                'g' => &mut global,
                'i' => &mut ignore_case,
                'm' => &mut multiline,
                's' => &mut dot_all,
                'y' => &mut sticky,
                'u' => &mut unicode,
                other => return Err(format!("invalid regular expression flag '{other}'")),
            };
            if *slot {
                return Err(format!("duplicate regular expression flag '{flag}'"));
            }
            *slot = true;
        }
        let mut pattern = String::new();
        if ignore_case {
            pattern.push_str("(?i)");
        }
        if multiline {
            pattern.push_str("(?m)");
        }
        if dot_all {
            pattern.push_str("(?s)");
        }
        pattern.push_str(&translate_pattern(source));
        let regex = Regex::new(&pattern).map_err(|e| format!("invalid regular expression: {e}"))?;
        Ok(Self {
            source: source.to_owned(),
            flags: flags.to_owned(),
            global,
            ignore_case,
            multiline,
            dot_all,
            sticky,
            unicode,
            regex,
        })
    }
}

/// Translates the handful of JS escapes `fancy-regex` spells differently.
fn translate_pattern(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            // `\cX` control escapes are rare; keep them literal.
            Some('c') => {
                out.push_str("\\x");
                if let Some(&next) = chars.peek() {
                    let code = (next.to_ascii_uppercase() as u32) % 32;
                    out.push_str(&format!("{code:02x}"));
                    chars.next();
                }
            }
            // `\uXXXX` → `\x{XXXX}`.
            Some('u') => {
                if chars.peek() == Some(&'{') {
                    chars.next();
                    out.push_str("\\x{");
                    for c in chars.by_ref() {
                        if c == '}' {
                            break;
                        }
                        out.push(c);
                    }
                    out.push('}');
                } else {
                    let mut hex = String::new();
                    for _ in 0..4 {
                        if let Some(&next) = chars.peek() {
                            if next.is_ascii_hexdigit() {
                                hex.push(next);
                                chars.next();
                                continue;
                            }
                        }
                        break;
                    }
                    if hex.len() == 4 {
                        out.push_str("\\x{");
                        out.push_str(&hex);
                        out.push('}');
                    } else {
                        out.push_str("\\u");
                        out.push_str(&hex);
                    }
                }
            }
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_parse() {
        let re = RegExpData::compile("a+", "gi").unwrap();
        assert!(re.global && re.ignore_case && !re.sticky);
        assert!(re.regex.is_match("AAA").unwrap());
    }

    #[test]
    fn duplicate_flag_rejected() {
        assert!(RegExpData::compile("a", "gg").is_err());
    }

    #[test]
    fn unicode_escape_translation() {
        let re = RegExpData::compile("\\u0041+", "").unwrap();
        assert!(re.regex.is_match("AA").unwrap());
    }

    #[test]
    fn backreference_supported() {
        let re = RegExpData::compile("(ab)\\1", "").unwrap();
        assert!(re.regex.is_match("abab").unwrap());
    }
}
