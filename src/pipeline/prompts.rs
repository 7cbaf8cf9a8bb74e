// Prompt templates for every LLM step of the answer pipeline.

use crate::llm::ChatMessage;

const DECISION_PROMPT: &str = r#"Your task is to evaluate if the context fully answers the question about gaming. Consider:
1. Are all key elements of the question addressed?
2. Is the context specific to the game being asked about?
3. Are there any contradictions between context and question?

Context: {context}
Question: {question}

YOUR ANSWER MUST BE EXACTLY ONE CHARACTER:
Return ONLY the digit `1` if the context satisfactorily answers the question.
Return ONLY the digit `0` if the context fails to adequately answer.
DO NOT include any explanation, analysis, or other text in your response."#;

const SYSTEM_PROMPT: &str = r#"You are an AI assistant embedded in an in-game overlay. Your goal is to provide concise, game-specific assistance in a structured format.

- Keep responses brief and to the point (2-3 sentences).
- Prioritize actionable information like item locations, enemy weaknesses, and quest guidance.
- Avoid unnecessary explanations, only provide what is needed for the player to make progress.
- If the game is unknown, offer general gaming tips instead.
- For unclear or malformed queries, ask for clarification instead of guessing.
- If the query is gibberish or completely invalid, respond with a polite request to rephrase.

Response Format:
[Tip] "Use fire attacks to weaken this enemy."
[Location] "The Dectus Medallion (Left) is in Fort Haight, southeast of Mistwood."
[General] "If you're lost, check for landmarks or quest markers on the map."
[Clarification] "I'm not sure what you're asking. Could you please rephrase your question?"

Only provide answers relevant to the context, and ensure accuracy based on available data.

Context: {context}"#;

const USER_PROMPT: &str = r#"Question: {question}

Additional Instructions:
1. Focus on the most relevant parts of the provided context.
2. Ask for clarification if the question is unclear.
3. Use game-specific terminology whenever possible.
4. Respond based solely on the provided context, and do not include information outside of it.

Answer:"#;

const EXPANSION_PROMPT: &str = r#"Generate 3 search variations for: {question}
Focus on game-specific terms and common misunderstandings.
Return as bullet points:"#;

const STRATEGY_PROMPT: &str = r#"Analyze this gaming question and determine the best search strategy.
Return only one of these options:
- local_first: If the question seems specific to documented game mechanics
- web_first: If the question likely needs up-to-date information
- hybrid: If both local context and web information are needed

Question: {question}"#;

const REASONING_PROMPT: &str = r#"Analyze this gaming question step-by-step:
1. Identify key game elements
2. List required mechanics
3. Match with context
4. Identify knowledge gaps

Question: {question}
Context: {context}"#;

const SUFFICIENCY_PROMPT: &str = r#"Based on the following:
Question: {question}
Current Context: {context}
Current Reasoning: {reasoning}

Is more information needed to provide a complete answer?
Return only 1 (more info needed) or 0 (sufficient info)."#;

const SUB_QUERY_PROMPT: &str = r#"Based on this question and reasoning, generate 2-3 specific sub-queries
to fill knowledge gaps. Format as a list, each on a new line.

Question: {question}
Reasoning: {reasoning}"#;

const VALIDATION_PROMPT: &str = r#"Verify if this answer is fully supported by context (1=yes/0=no):
Context: {context}
Response: {response}"#;

const SCORING_PROMPT: &str = r#"Evaluate this response on a scale of 1-10 based on:
- Relevance to the question
- Use of context
- Completeness
- Gaming expertise demonstrated

Question: {question}
Context: {context}
Response: {response}

Return only a single number from 1-10."#;

const REFINE_PROMPT: &str = r#"Refine this gaming response to improve quality. Add relevant details from the context,
improve structure, and ensure it addresses all aspects of the question.

Original Question: {question}
Context: {context}
Reasoning: {reasoning}
Current Response: {response}

Improved Response:"#;

/// Substitute `{name}` placeholders in one pass, so values that themselves
/// contain braces are left alone.
fn fill(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len() + values.iter().map(|(_, v)| v.len()).sum::<usize>());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let replaced = after.find('}').and_then(|close| {
            let key = &after[..close];
            values
                .iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| (*value, close))
        });
        match replaced {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

pub fn decision(context: &str, question: &str) -> Vec<ChatMessage> {
    vec![ChatMessage::system(fill(
        DECISION_PROMPT,
        &[("context", context), ("question", question)],
    ))]
}

pub fn synthesis(context: &str, question: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(fill(SYSTEM_PROMPT, &[("context", context)])),
        ChatMessage::user(fill(USER_PROMPT, &[("question", question)])),
    ]
}

pub fn expansion(question: &str) -> Vec<ChatMessage> {
    vec![ChatMessage::user(fill(EXPANSION_PROMPT, &[("question", question)]))]
}

pub fn strategy(question: &str) -> Vec<ChatMessage> {
    vec![ChatMessage::user(fill(STRATEGY_PROMPT, &[("question", question)]))]
}

pub fn reasoning(question: &str, context: &str) -> Vec<ChatMessage> {
    vec![ChatMessage::system(fill(
        REASONING_PROMPT,
        &[("question", question), ("context", context)],
    ))]
}

pub fn sufficiency(question: &str, context: &str, reasoning: &str) -> Vec<ChatMessage> {
    vec![ChatMessage::user(fill(
        SUFFICIENCY_PROMPT,
        &[("question", question), ("context", context), ("reasoning", reasoning)],
    ))]
}

pub fn sub_queries(question: &str, reasoning: &str) -> Vec<ChatMessage> {
    vec![ChatMessage::user(fill(
        SUB_QUERY_PROMPT,
        &[("question", question), ("reasoning", reasoning)],
    ))]
}

pub fn validation(response: &str, context: &str) -> Vec<ChatMessage> {
    vec![ChatMessage::system(fill(
        VALIDATION_PROMPT,
        &[("context", context), ("response", response)],
    ))]
}

pub fn scoring(response: &str, context: &str, question: &str) -> Vec<ChatMessage> {
    vec![ChatMessage::user(fill(
        SCORING_PROMPT,
        &[("question", question), ("context", context), ("response", response)],
    ))]
}

pub fn refinement(response: &str, context: &str, question: &str, reasoning: &str) -> Vec<ChatMessage> {
    vec![ChatMessage::user(fill(
        REFINE_PROMPT,
        &[
            ("question", question),
            ("context", context),
            ("reasoning", reasoning),
            ("response", response),
        ],
    ))]
}
