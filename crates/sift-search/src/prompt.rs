use crate::llm::CompletionRequest;

const SYSTEM_PROMPT: &str = "\
You are a semantic search engine. Given a query and a body of text, find every \
passage in the body that is relevant to the query, including passages that \
match by meaning rather than by exact wording.

For each match report:
- text: the exact excerpt copied from the body (a meaningful passage, not a single word)
- relevanceScore: a number from 0.0 to 1.0, where 1.0 is a perfect match
- startIndex / endIndex: character offsets of the excerpt in the body, counting \
from 0, with endIndex exclusive
- reasoning: one short sentence on why the passage matches

Order matches from most to least relevant.

Respond with ONLY a JSON object, no text before or after it:
{
  \"matches\": [
    {
      \"text\": \"excerpt from the body\",
      \"relevanceScore\": 0.85,
      \"startIndex\": 120,
      \"endIndex\": 180,
      \"reasoning\": \"why this matches\"
    }
  ],
  \"totalMatches\": 1,
  \"queryProcessed\": \"the query exactly as given\"
}

If nothing matches, return an empty matches array with totalMatches 0.";

/// Build the system prompt for the search LLM.
///
/// # Examples
///
/// ```
/// use sift_search::prompt::build_system_prompt;
///
/// let prompt = build_system_prompt();
/// assert!(prompt.contains("relevanceScore"));
/// ```
pub fn build_system_prompt() -> String {
    SYSTEM_PROMPT.to_string()
}

/// Build the user prompt embedding the query and the full body.
///
/// The query is JSON-quoted so embedded quotes cannot break out of it. The
/// body is sent untruncated; its size is the caller's concern.
///
/// # Examples
///
/// ```
/// use sift_search::prompt::build_search_prompt;
///
/// let prompt = build_search_prompt("refund policy", "Refunds take 30 days.");
/// assert!(prompt.contains("\"refund policy\""));
/// assert!(prompt.contains("Refunds take 30 days."));
/// ```
pub fn build_search_prompt(query: &str, body: &str) -> String {
    let quoted = serde_json::Value::from(query).to_string();
    format!(
        "Query: {quoted}\n\n\
         Body ({} characters) between the markers:\n\
         <<<BODY\n{body}\nBODY>>>\n\n\
         Find all semantic matches for the query and return only the JSON object.",
        body.chars().count()
    )
}

/// Assemble the complete backend request for one search.
pub fn build_request(query: &str, body: &str) -> CompletionRequest {
    CompletionRequest {
        system: build_system_prompt(),
        prompt: build_search_prompt(query, body),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_prompt_describes_schema() {
        let prompt = build_system_prompt();
        assert!(prompt.contains("matches"));
        assert!(prompt.contains("startIndex"));
        assert!(prompt.contains("endIndex"));
        assert!(prompt.contains("totalMatches"));
        assert!(prompt.contains("queryProcessed"));
    }

    #[test]
    fn search_prompt_includes_body_verbatim() {
        let body = "line one\n  line two with {braces}\n";
        let prompt = build_search_prompt("q", body);
        assert!(prompt.contains(body));
    }

    #[test]
    fn query_quotes_are_escaped() {
        let prompt = build_search_prompt(r#"say "hi""#, "body");
        assert!(prompt.contains(r#"Query: "say \"hi\"""#));
    }

    #[test]
    fn search_prompt_reports_character_count() {
        let prompt = build_search_prompt("q", "héllo");
        assert!(prompt.contains("(5 characters)"));
    }

    #[test]
    fn request_carries_both_prompts() {
        let request = build_request("refund policy", "body text");
        assert_eq!(request.system, build_system_prompt());
        assert!(request.prompt.contains("refund policy"));
        assert!(request.prompt.contains("body text"));
    }
}
