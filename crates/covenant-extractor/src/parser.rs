//! Parse LLM output into an obligation set

use crate::error::ExtractorError;
use covenant_domain::{ObligationCandidate, ObligationSet, Party};
use serde_json::{Map, Value};

/// A successfully parsed model response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedResponse {
    /// The model answered `null`: nothing to extract
    NoObligations,

    /// Parties with their obligations, exactly as the model reported them
    Parties(ObligationSet),
}

/// Parse the raw LLM response
///
/// A trimmed, case-insensitive `null` (bare or inside a code fence) means
/// the chunk holds no obligations. Anything else must be a JSON object whose
/// `parties` entries each carry a string `name`, and whose obligations each
/// carry a string `obligation_text`. A missing or null `parties` or
/// `obligations` is read as empty.
pub fn parse_llm_response(response: &str) -> Result<ParsedResponse, ExtractorError> {
    if is_null(response) {
        return Ok(ParsedResponse::NoObligations);
    }

    // LLMs sometimes wrap JSON in markdown code blocks
    let json_str = extract_json(response)?;
    if is_null(&json_str) {
        return Ok(ParsedResponse::NoObligations);
    }

    let json: Value = serde_json::from_str(&json_str)?;
    let obj = json
        .as_object()
        .ok_or_else(|| ExtractorError::InvalidFormat("Expected JSON object".to_string()))?;

    let parties = match obj.get("parties") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(idx, item)| {
                parse_party(item)
                    .map_err(|e| ExtractorError::InvalidFormat(format!("party {}: {}", idx, e)))
            })
            .collect::<Result<Vec<_>, _>>()?,
        Some(_) => {
            return Err(ExtractorError::InvalidFormat(
                "'parties' is not an array".to_string(),
            ))
        }
    };

    Ok(ParsedResponse::Parties(ObligationSet::new(parties)))
}

fn is_null(text: &str) -> bool {
    text.trim().eq_ignore_ascii_case("null")
}

/// Extract JSON from response, handling markdown code blocks
fn extract_json(response: &str) -> Result<String, ExtractorError> {
    let trimmed = response.trim();

    if trimmed.starts_with("```") {
        let lines: Vec<&str> = trimmed.lines().collect();
        if lines.len() < 2 {
            return Err(ExtractorError::InvalidFormat("Empty code block".to_string()));
        }

        // Skip the opening fence, and the closing one when present
        let end = if lines[lines.len() - 1].trim_start().starts_with("```") {
            lines.len() - 1
        } else {
            lines.len()
        };
        Ok(lines[1..end].join("\n"))
    } else {
        Ok(trimmed.to_string())
    }
}

fn parse_party(json: &Value) -> Result<Party, String> {
    let obj = json
        .as_object()
        .ok_or_else(|| "not a JSON object".to_string())?;

    let name = obj
        .get("name")
        .and_then(|v| v.as_str())
        .ok_or_else(|| "missing or invalid 'name'".to_string())?
        .to_string();

    let obligations = match obj.get("obligations") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(idx, item)| parse_obligation(item).map_err(|e| format!("obligation {}: {}", idx, e)))
            .collect::<Result<Vec<_>, _>>()?,
        Some(_) => return Err("'obligations' is not an array".to_string()),
    };

    Ok(Party { name, obligations })
}

fn parse_obligation(json: &Value) -> Result<ObligationCandidate, String> {
    let obj = json
        .as_object()
        .ok_or_else(|| "not a JSON object".to_string())?;

    let obligation_text = obj
        .get("obligation_text")
        .and_then(|v| v.as_str())
        .ok_or_else(|| "missing or invalid 'obligation_text'".to_string())?
        .to_string();

    Ok(ObligationCandidate {
        obligation_text,
        deadline: optional_text(obj, "deadline"),
        section: optional_text(obj, "section").unwrap_or_default(),
        page_number: None,
    })
}

/// Strings pass through, null or absent is `None`, other scalars are
/// rendered as JSON text
fn optional_text(obj: &Map<String, Value>, key: &str) -> Option<String> {
    match obj.get(key) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parties(response: &str) -> ObligationSet {
        match parse_llm_response(response).unwrap() {
            ParsedResponse::Parties(set) => set,
            ParsedResponse::NoObligations => panic!("expected parties"),
        }
    }

    #[test]
    fn test_parse_valid_json() {
        let response = r#"{"parties":[{"name":"Buyer","obligations":[
            {"obligation_text":"Pay $100 within 30 days","deadline":"30 days","section":"4"}
        ]}]}"#;

        let set = parties(response);
        assert_eq!(set.parties.len(), 1);
        assert_eq!(set.parties[0].name, "Buyer");
        let ob = &set.parties[0].obligations[0];
        assert_eq!(ob.obligation_text, "Pay $100 within 30 days");
        assert_eq!(ob.deadline.as_deref(), Some("30 days"));
        assert_eq!(ob.section, "4");
    }

    #[test]
    fn test_null_variants() {
        for response in ["null", "NULL", "  Null\n", "```\nnull\n```"] {
            assert_eq!(
                parse_llm_response(response).unwrap(),
                ParsedResponse::NoObligations,
                "response {:?}",
                response
            );
        }
    }

    #[test]
    fn test_parse_json_with_markdown_wrapper() {
        let response = "```json\n{\"parties\":[{\"name\":\"Seller\",\"obligations\":[{\"obligation_text\":\"Deliver\"}]}]}\n```";
        let set = parties(response);
        assert_eq!(set.parties[0].name, "Seller");
        assert_eq!(set.parties[0].obligations[0].deadline, None);
    }

    #[test]
    fn test_missing_collections_are_empty() {
        assert!(parties("{}").parties.is_empty());
        assert!(parties(r#"{"parties":null}"#).parties.is_empty());

        let set = parties(r#"{"parties":[{"name":"Buyer"}]}"#);
        assert_eq!(set.parties[0].name, "Buyer");
        assert!(set.parties[0].obligations.is_empty());
    }

    #[test]
    fn test_non_string_deadline_is_rendered() {
        let set = parties(r#"{"parties":[{"name":"Buyer","obligations":[
            {"obligation_text":"Pay","deadline":30,"section":null}
        ]}]}"#);
        let ob = &set.parties[0].obligations[0];
        assert_eq!(ob.deadline.as_deref(), Some("30"));
        assert_eq!(ob.section, "");
    }

    #[test]
    fn test_parse_invalid_json() {
        let result = parse_llm_response("This is not JSON");
        assert!(matches!(result, Err(ExtractorError::JsonParse(_))));
    }

    #[test]
    fn test_parse_json_not_object() {
        let result = parse_llm_response(r#"[{"name":"Buyer"}]"#);
        assert!(matches!(result, Err(ExtractorError::InvalidFormat(_))));
    }

    #[test]
    fn test_party_missing_name() {
        let result = parse_llm_response(r#"{"parties":[{"obligations":[]}]}"#);
        assert!(matches!(result, Err(ExtractorError::InvalidFormat(_))));
    }

    #[test]
    fn test_obligation_missing_text() {
        let result = parse_llm_response(
            r#"{"parties":[{"name":"Buyer","obligations":[{"deadline":"soon"}]}]}"#,
        );
        match result {
            Err(ExtractorError::InvalidFormat(msg)) => {
                assert!(msg.contains("obligation_text"), "{}", msg)
            }
            other => panic!("expected InvalidFormat, got {:?}", other),
        }
    }

    #[test]
    fn test_parties_not_array() {
        let result = parse_llm_response(r#"{"parties":"Buyer"}"#);
        assert!(matches!(result, Err(ExtractorError::InvalidFormat(_))));
    }
}
