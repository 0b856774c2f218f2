// Copyright 2026 Muvon Un Limited
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

/// Substituted for the context when retrieval found nothing
pub const NO_CONTEXT_SENTINEL: &str =
    "(No directly relevant content was found in the knowledge base)";

/// Used as slide context when retrieval found nothing
pub const NO_SLIDE_CONTEXT: &str =
    "No specific internal data found. Use general consulting knowledge.";

const CONTEXT_PLACEHOLDER: &str = "{context}";

const RAG_TEMPLATE: &str = r#"You are a top-tier strategy consultant (Associate @ MBB).
You have access to an internal, confidential document about NYCHA (New York City Housing Authority).

[Chain of thought requirements]
Before answering the user, strictly follow these steps:
1. **Context Check**: Review the [Reference document excerpts] below.
2. **Fact Matching**: When the user asks for specific figures (backlog size, funding gap, ...), you must use the numbers from the document.
3. **Citation**: Whenever you quote a figure, name its source in parentheses, e.g. "(Source: P22 Data)".
4. **Honesty**: If the document does not cover it, say plainly "The document has no data on this, should we work with an assumption?". Never make numbers up.

[Reference document excerpts (RAG Context)]:
{context}

[Your persona]
- Tone: professional, crisp, with a hint of the fatigue that comes from too many late nights.
- Format: when several figures are involved, present them as a Markdown table.
"#;

const PARTNER_PROMPT: &str = "You are a senior Partner at a top strategy consulting firm. \
You think in terms of the client's agenda, the storyline and the 'so what'. \
Answer briefly and decisively, challenge weak logic, and push for the one insight that matters.";

const ENGAGEMENT_MANAGER_PROMPT: &str = "You are the Engagement Manager on a strategy consulting project. \
You own the workplan, the deck storyline and the team's deliverables. \
Answer in a structured way (issue tree, next steps, owners) and keep the discussion on schedule.";

const BUSINESS_ANALYST_PROMPT: &str = "You are a Business Analyst at a strategy consulting firm. \
You build the data models and benchmarks behind the deck. \
Answer with concrete numbers, explain your assumptions and flag anomalies in the data.";

const GENERIC_PROMPT: &str = "You are an AI assistant.";

/// Personas the chat operation knows about. Closed set; anything else falls
/// back to the generic assistant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persona {
    /// The only persona grounded in the knowledge base
    Associate,
    Partner,
    EngagementManager,
    BusinessAnalyst,
    Generic,
}

impl Persona {
    pub fn from_role(role: &str) -> Self {
        match role {
            "Associate" => Persona::Associate,
            "Partner" => Persona::Partner,
            "EM" => Persona::EngagementManager,
            "BA" => Persona::BusinessAnalyst,
            _ => Persona::Generic,
        }
    }

    /// Whether chat for this persona needs retrieved context
    pub fn uses_knowledge_base(self) -> bool {
        self == Persona::Associate
    }
}

/// Build the system message for `role`.
///
/// Only the Associate gets the retrieval template; an empty context becomes
/// [`NO_CONTEXT_SENTINEL`]. Other roles get their fixed persona prompt.
pub fn compose(role: &str, retrieved_context: &str) -> String {
    match Persona::from_role(role) {
        Persona::Associate => {
            let context = if retrieved_context.trim().is_empty() {
                NO_CONTEXT_SENTINEL
            } else {
                retrieved_context
            };
            RAG_TEMPLATE.replace(CONTEXT_PLACEHOLDER, context)
        }
        Persona::Partner => PARTNER_PROMPT.to_string(),
        Persona::EngagementManager => ENGAGEMENT_MANAGER_PROMPT.to_string(),
        Persona::BusinessAnalyst => BUSINESS_ANALYST_PROMPT.to_string(),
        Persona::Generic => GENERIC_PROMPT.to_string(),
    }
}

/// User prompt asking the model for slide content as strict JSON
pub fn slide_request(topic: &str, role: &str, context: &str) -> String {
    let context = if context.trim().is_empty() {
        NO_SLIDE_CONTEXT
    } else {
        context
    };

    format!(
        r#"Based on the context below, generate content for a consulting slide about "{topic}".
The role is {role}.

Context: {context}

Return STRICT JSON format ONLY (no markdown backticks around it if possible):
{{
  "title": "Slide Title",
  "points": ["Key Insight 1", "Key Insight 2", "Key Insight 3"],
  "chart_data": {{
    "type": "bar",
    "categories": ["Cat A", "Cat B"],
    "values": [10, 20]
  }}
}}
"#
    )
}
