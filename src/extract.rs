//! Locates and repairs a JSON payload embedded in free-form model output.
//!
//! Models wrap JSON in prose, code fences, and leave trailing commas behind.
//! This pass is best-effort by design: a near-valid string is still returned
//! so a downstream consumer can decide whether to trust or re-prompt.

/// Result of an extraction pass. `Parsed` means the repaired slice is valid
/// JSON; `BestEffort` means it is the most plausible substring but did not
/// parse cleanly. Both carry text — extraction never fails outright.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Parsed(String),
    BestEffort(String),
}

impl Extraction {
    pub fn text(&self) -> &str {
        match self {
            Self::Parsed(t) | Self::BestEffort(t) => t,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Self::Parsed(t) | Self::BestEffort(t) => t,
        }
    }

    pub fn is_parsed(&self) -> bool {
        matches!(self, Self::Parsed(_))
    }
}

/// Extract the most plausible JSON substring from `input`.
///
/// Idempotent: running the extractor on its own output yields the same
/// string.
pub fn extract_json(input: &str) -> Extraction {
    let defenced = if input.contains("```") {
        input.replace("```json", "").replace("```", "")
    } else {
        input.to_string()
    };

    let first = defenced.find('{');
    let last = defenced.rfind('}');

    let candidate = match (first, last) {
        (Some(first), Some(last)) if last > first => {
            remove_trailing_commas(&defenced[first..=last])
        }
        // Not JSON-shaped; hand back the trimmed original unchanged.
        _ => defenced.trim().to_string(),
    };

    match serde_json::from_str::<serde::de::IgnoredAny>(&candidate) {
        Ok(_) => Extraction::Parsed(candidate),
        Err(_) => Extraction::BestEffort(candidate),
    }
}

/// Drop commas that directly precede (modulo whitespace) a closing `]` or
/// `}`, skipping string literals so embedded text is untouched.
fn remove_trailing_commas(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in input.char_indices() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            ',' => {
                // Trailing comma: drop it, keep the whitespace run.
                let next = input[i + 1..].trim_start().chars().next();
                if !matches!(next, Some('}' | ']')) {
                    out.push(c);
                }
            }
            _ => out.push(c),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_fences_and_trailing_commas() {
        let input = "Here is your result: ```json\n{\"a\":1,}\n```";
        let extraction = extract_json(input);
        assert_eq!(extraction, Extraction::Parsed("{\"a\":1}".to_string()));
    }

    #[test]
    fn slices_between_first_and_last_brace() {
        let extraction = extract_json("prefix {\"nodes\":[]} suffix");
        assert_eq!(extraction.text(), "{\"nodes\":[]}");
        assert!(extraction.is_parsed());
    }

    #[test]
    fn non_json_text_passes_through_trimmed() {
        let extraction = extract_json("  I could not generate a workflow.  ");
        assert_eq!(
            extraction,
            Extraction::BestEffort("I could not generate a workflow.".to_string())
        );
    }

    #[test]
    fn nested_trailing_commas_are_removed() {
        let extraction = extract_json("{\"a\":[1,2,],\"b\":{\"c\":3,},}");
        assert_eq!(extraction.text(), "{\"a\":[1,2],\"b\":{\"c\":3}}");
        assert!(extraction.is_parsed());
    }

    #[test]
    fn commas_inside_strings_survive() {
        let extraction = extract_json("{\"a\":\",}\"}");
        assert_eq!(extraction.text(), "{\"a\":\",}\"}");
        assert!(extraction.is_parsed());
    }

    #[test]
    fn non_ascii_content_passes_through_intact() {
        let extraction = extract_json("{\"name\":\"café, gâteau\",}");
        assert_eq!(extraction.text(), "{\"name\":\"café, gâteau\"}");
        assert!(extraction.is_parsed());
    }

    #[test]
    fn near_valid_json_is_returned_best_effort() {
        let extraction = extract_json("{\"a\": unquoted}");
        assert_eq!(extraction.text(), "{\"a\": unquoted}");
        assert!(!extraction.is_parsed());
    }

    #[test]
    fn extraction_is_idempotent() {
        let inputs = [
            "Here is your result: ```json\n{\"a\":1,}\n```",
            "prefix {\"nodes\":[]} suffix",
            "plain prose, no json here",
            "{\"a\":[1,2,],\"b\":{\"c\":3,},}",
            "```{\"x\": {\"y\": [],}}```",
            "",
        ];
        for input in inputs {
            let once = extract_json(input).into_text();
            let twice = extract_json(&once).into_text();
            assert_eq!(once, twice, "not idempotent for {input:?}");
        }
    }
}
