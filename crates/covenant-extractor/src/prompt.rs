//! LLM prompt for obligation extraction

use crate::types::Chunk;
use covenant_domain::traits::CompletionRequest;

/// Builds the request sent to the LLM for one chunk
pub struct PromptBuilder<'a> {
    chunk: &'a Chunk,
}

impl<'a> PromptBuilder<'a> {
    /// Create a new prompt builder
    pub fn new(chunk: &'a Chunk) -> Self {
        Self { chunk }
    }

    /// User message: the chunk's location followed by its text
    pub fn build_user_content(&self) -> String {
        format!(
            "Context: {}\n\nContent:\n{}",
            self.chunk.context, self.chunk.text
        )
    }

    /// Complete request with the system policy, in JSON mode
    pub fn build_request(&self, temperature: f32) -> CompletionRequest {
        CompletionRequest::new(SYSTEM_PROMPT, self.build_user_content())
            .with_temperature(temperature)
            .json()
    }
}

/// System policy sent with every chunk
pub const SYSTEM_PROMPT: &str = r#"You extract legal obligations from contract text. Extract ONLY genuine, material obligations that bind a specific party, grouped by the responsible party.

An obligation qualifies only if it:
1. Creates a clear, binding duty for an identifiable party
2. Uses directive language (shall, must, will, is required to, is responsible for, shall not)
3. Is specific and actionable
4. Has business or legal significance if breached

Do NOT extract:
- Recitals, whereas clauses, background or descriptive text
- Definitions and interpretation provisions
- Statements of fact or intent
- Permissions using "may" or "might" that impose no duty on anyone
- Routine administrative details

Prioritize performance and delivery duties, payment terms, compliance with laws, confidentiality and data protection, termination duties, insurance, indemnification, warranties, and notices of material events.

Party names:
- Use Title Case (e.g. "Service Provider", "First Party")
- Standardize variations ("The Company" becomes "Company")
- Use a party's full name consistently once it is known

Output a single JSON object:
{
  "parties": [
    {
      "name": "string",
      "obligations": [
        {
          "obligation_text": "string",
          "deadline": "string or null",
          "section": "string"
        }
      ]
    }
  ]
}

Each obligation_text holds the complete obligation with its essential context. Give the deadline or duration when the text states one, otherwise null.

If the text contains no qualifying obligation, respond with null.

When in doubt, leave a borderline statement out."#;
