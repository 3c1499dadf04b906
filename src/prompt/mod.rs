// Prompt templates
// `{name}` placeholders, with `{{` and `}}` for literal braces


use tracing::debug;

use crate::{RagError, Result};

/// Question-answering prompt used unless a custom template is supplied
pub const DEFAULT_QA_TEMPLATE: &str = "Based on this context: {context} Answer the question: {question}. \
     If you do not know the answer, just say that you do not know. \
     Do not try to make up an answer.";

const CONDENSE_QUESTION_TEMPLATE: &str = "Given the following conversation and a follow up question, \
     rephrase the follow up question to be a standalone question, in its original language.\n\n\
     Chat History:\n{chat_history}\nFollow Up Input: {question}\nStandalone question:";

const EXTRACTION_TEMPLATE: &str = "Given the following question and context, extract any part of the \
     context *AS IS* that is relevant to answer the question. If none of the context is relevant \
     return NO_OUTPUT. \n\nRemember, *DO NOT* edit the extracted parts of the context.\n\n\
     > Question: {question}\n> Context:\n>>>\n{context}\n>>>\nExtracted relevant parts:";

/// Marker the extraction prompt asks the model to answer with when nothing is relevant
pub const NO_OUTPUT: &str = "NO_OUTPUT";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Variable(String),
}

/// A text template with named placeholders
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    template: String,
    segments: Vec<Segment>,
    input_variables: Vec<String>,
}

impl PromptTemplate {
    /// Parse `template`, failing on unbalanced braces or empty placeholder names
    #[inline]
    pub fn new(template: impl Into<String>) -> Result<Self> {
        let template = template.into();
        let segments = parse(&template)?;

        let mut input_variables: Vec<String> = Vec::new();
        for segment in &segments {
            if let Segment::Variable(name) = segment {
                if !input_variables.contains(name) {
                    input_variables.push(name.clone());
                }
            }
        }

        Ok(Self {
            template,
            segments,
            input_variables,
        })
    }

    #[inline]
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Placeholder names in order of first appearance
    #[inline]
    pub fn input_variables(&self) -> &[String] {
        &self.input_variables
    }

    /// Substitute every placeholder; a placeholder without a value is an error
    #[inline]
    pub fn format(&self, values: &[(&str, &str)]) -> Result<String> {
        let mut output = String::with_capacity(self.template.len());

        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => output.push_str(text),
                Segment::Variable(name) => {
                    let value = values
                        .iter()
                        .find(|(key, _)| key == name)
                        .map(|(_, value)| *value)
                        .ok_or_else(|| {
                            RagError::Config(format!("Missing value for prompt variable '{}'", name))
                        })?;
                    output.push_str(value);
                }
            }
        }

        Ok(output)
    }
}

fn parse(template: &str) -> Result<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                literal.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                literal.push('}');
            }
            '{' => {
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some('{') | None => {
                            return Err(RagError::Config(format!(
                                "Unclosed placeholder in prompt template: {{{}",
                                name
                            )));
                        }
                        Some(ch) => name.push(ch),
                    }
                }

                let name = name.trim().to_string();
                if name.is_empty() {
                    return Err(RagError::Config(
                        "Empty placeholder in prompt template".to_string(),
                    ));
                }

                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Variable(name));
            }
            '}' => {
                return Err(RagError::Config(
                    "Unmatched '}' in prompt template".to_string(),
                ));
            }
            other => literal.push(other),
        }
    }

    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }

    Ok(segments)
}

/// The question-answering prompt: `template` when given, else [`DEFAULT_QA_TEMPLATE`].
///
/// A custom template must use exactly the `context` and `question` variables.
#[inline]
pub fn get_prompt(template: Option<&str>) -> Result<PromptTemplate> {
    let prompt = PromptTemplate::new(template.unwrap_or(DEFAULT_QA_TEMPLATE))?;

    let mut variables: Vec<&str> = prompt.input_variables().iter().map(String::as_str).collect();
    variables.sort_unstable();
    if variables != ["context", "question"] {
        return Err(RagError::Config(format!(
            "Prompt template must use the variables {{context}} and {{question}}, found {:?}",
            prompt.input_variables()
        )));
    }

    debug!(
        "Using {} QA prompt",
        if template.is_some() { "custom" } else { "default" }
    );
    Ok(prompt)
}

/// Rephrases a follow-up into a standalone question given the chat history
#[inline]
pub fn condense_question_prompt() -> Result<PromptTemplate> {
    PromptTemplate::new(CONDENSE_QUESTION_TEMPLATE)
}

/// Asks the model to copy out the parts of a context relevant to a question
#[inline]
pub fn extraction_prompt() -> Result<PromptTemplate> {
    PromptTemplate::new(EXTRACTION_TEMPLATE)
}
