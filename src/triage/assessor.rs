//! Complexity assessors
//!
//! Each assessor casts one vote for a task. The heuristic assessors are
//! pure functions of the task text; [`ModelAssessor`] asks a language
//! model through the narrow [`CompletionClient`] seam.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

use super::types::{ComplexityTier, TriageVote};
use crate::utils::{contains_any, normalize_text, truncate_str};

/// A source of complexity votes
#[async_trait]
pub trait Assessor: Send + Sync {
    fn name(&self) -> &str;

    async fn assess(&self, task: &str) -> Result<TriageVote>;
}

/// The built-in assessors, in voting order
pub fn heuristic_assessors() -> Vec<Arc<dyn Assessor>> {
    vec![
        Arc::new(KeywordAssessor),
        Arc::new(ScopeAssessor),
        Arc::new(StructureAssessor),
    ]
}

// ============================================================================
// Keyword assessor
// ============================================================================

const VERY_COMPLEX_KEYWORDS: &[&str] = &[
    "from scratch",
    "entire system",
    "entire codebase",
    "whole codebase",
    "rearchitect",
    "re-architect",
    "distributed",
    "microservice",
    "platform",
];

const COMPLEX_KEYWORDS: &[&str] = &[
    "refactor",
    "migrate",
    "migration",
    "redesign",
    "architecture",
    "restructure",
    "rewrite",
    "overhaul",
    "integrate",
    "security",
    "performance",
    "concurren",
];

const MEDIUM_KEYWORDS: &[&str] = &[
    "implement",
    "feature",
    "create",
    "build",
    "endpoint",
    "support",
    "extend",
    "develop",
];

const SIMPLE_KEYWORDS: &[&str] = &[
    "typo", "rename", "fix", "update", "bump", "comment", "readme", "docs", "tweak",
];

/// Classifies by the strongest verb/noun signal in the task
pub struct KeywordAssessor;

pub fn keyword_vote(task: &str) -> TriageVote {
    let text = normalize_text(task);

    if contains_any(&text, VERY_COMPLEX_KEYWORDS) {
        TriageVote::new(ComplexityTier::VeryComplex, 0.8, "system-wide keywords")
    } else if contains_any(&text, COMPLEX_KEYWORDS) {
        TriageVote::new(ComplexityTier::Complex, 0.75, "structural change keywords")
    } else if contains_any(&text, MEDIUM_KEYWORDS) {
        TriageVote::new(ComplexityTier::Medium, 0.6, "feature work keywords")
    } else if contains_any(&text, SIMPLE_KEYWORDS) {
        TriageVote::new(ComplexityTier::Simple, 0.7, "small change keywords")
    } else {
        TriageVote::new(ComplexityTier::Medium, 0.4, "no keyword signal")
    }
}

#[async_trait]
impl Assessor for KeywordAssessor {
    fn name(&self) -> &str {
        "keyword"
    }

    async fn assess(&self, task: &str) -> Result<TriageVote> {
        Ok(keyword_vote(task))
    }
}

// ============================================================================
// Scope assessor
// ============================================================================

const BREADTH_KEYWORDS: &[&str] = &[
    "all ",
    "every",
    "across",
    "multiple",
    "each ",
    "entire",
    "throughout",
];

/// Estimates how much of the codebase a task touches
pub struct ScopeAssessor;

fn looks_like_path(word: &str) -> bool {
    let word =
        word.trim_matches(|c: char| matches!(c, ',' | ';' | ':' | '(' | ')' | '`' | '"' | '\''));
    let has_extension = word.rsplit_once('.').is_some_and(|(stem, ext)| {
        !stem.is_empty()
            && (1..=5).contains(&ext.len())
            && ext.chars().all(|c| c.is_ascii_alphanumeric())
    });
    word.contains('/') || has_extension
}

pub fn scope_vote(task: &str) -> TriageVote {
    let text = normalize_text(task);
    let words = text.split_whitespace().count();
    let files = task.split_whitespace().filter(|w| looks_like_path(w)).count();
    let clauses =
        text.matches(',').count() + text.matches(';').count() + text.matches(" and ").count();
    let breadth = BREADTH_KEYWORDS.iter().filter(|k| text.contains(*k)).count();

    let score = words / 12 + files + clauses + breadth * 2;
    let tier = match score {
        0..=1 => ComplexityTier::Simple,
        2..=3 => ComplexityTier::Medium,
        4..=6 => ComplexityTier::Complex,
        _ => ComplexityTier::VeryComplex,
    };

    TriageVote::new(
        tier,
        0.6,
        format!(
            "scope score {} ({} words, {} files, {} clauses)",
            score, words, files, clauses
        ),
    )
}

#[async_trait]
impl Assessor for ScopeAssessor {
    fn name(&self) -> &str {
        "scope"
    }

    async fn assess(&self, task: &str) -> Result<TriageVote> {
        Ok(scope_vote(task))
    }
}

// ============================================================================
// Structure assessor
// ============================================================================

const SEQUENCE_WORDS: &[&str] = &[
    "then ",
    "after that",
    "before ",
    "finally",
    "first ",
    "next ",
    "once ",
];

const STAGE_KEYWORDS: &[&str] = &[
    "research",
    "investigate",
    "design",
    "test",
    "benchmark",
    "review",
    "document",
    "deploy",
];

/// Counts explicit steps and distinct work stages
pub struct StructureAssessor;

fn is_enumerated(line: &str) -> bool {
    let line = line.trim_start();
    if line.starts_with("- ") || line.starts_with("* ") {
        return true;
    }
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    digits > 0 && matches!(line[digits..].chars().next(), Some('.') | Some(')'))
}

pub fn structure_vote(task: &str) -> TriageVote {
    let text = normalize_text(task);
    let enumerated = task.lines().filter(|l| is_enumerated(l)).count();
    let sequenced = SEQUENCE_WORDS.iter().filter(|w| text.contains(*w)).count();
    let stages = STAGE_KEYWORDS.iter().filter(|k| text.contains(*k)).count();

    let score = enumerated + sequenced + stages;
    let tier = match score {
        0 => ComplexityTier::Simple,
        1..=2 => ComplexityTier::Medium,
        3..=4 => ComplexityTier::Complex,
        _ => ComplexityTier::VeryComplex,
    };

    TriageVote::new(
        tier,
        0.5,
        format!("{} steps, {} stages", enumerated + sequenced, stages),
    )
}

#[async_trait]
impl Assessor for StructureAssessor {
    fn name(&self) -> &str {
        "structure"
    }

    async fn assess(&self, task: &str) -> Result<TriageVote> {
        Ok(structure_vote(task))
    }
}

// ============================================================================
// Model assessor
// ============================================================================

/// Minimal text completion interface a model provider implements
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String>;
}

const TRIAGE_SYSTEM_PROMPT: &str = r#"You assess the complexity of software engineering tasks.

Classify the task into exactly one tier:
- simple: a single well-scoped change
- medium: a few related changes
- complex: cross-cutting work that needs design
- very_complex: a large effort spanning several phases

Respond with ONLY a JSON object:
{"tier": "simple|medium|complex|very_complex", "confidence": 0.0-1.0, "rationale": "one sentence"}"#;

#[derive(Debug, Deserialize)]
struct VoteResponse {
    tier: String,
    #[serde(default = "default_confidence")]
    confidence: f64,
    #[serde(default)]
    rationale: String,
}

fn default_confidence() -> f64 {
    0.5
}

/// Asks a language model for a vote
pub struct ModelAssessor {
    client: Arc<dyn CompletionClient>,
}

impl ModelAssessor {
    pub fn new(client: Arc<dyn CompletionClient>) -> Self {
        Self { client }
    }

    /// Extract the vote object, tolerating markdown fences and preambles
    fn parse_vote_json(text: &str) -> Result<TriageVote> {
        let text = text.trim();
        let start = text.find('{').unwrap_or(0);
        let end = text.rfind('}').map(|i| i + 1).unwrap_or(text.len());
        let json_str = text.get(start..end).unwrap_or(text);

        let response: VoteResponse = serde_json::from_str(json_str).with_context(|| {
            format!("Failed to parse triage vote. Response was: {}", truncate_str(text, 200))
        })?;
        let tier = response
            .tier
            .parse::<ComplexityTier>()
            .map_err(|e| anyhow::anyhow!(e))?;

        Ok(TriageVote::new(tier, response.confidence, response.rationale))
    }
}

#[async_trait]
impl Assessor for ModelAssessor {
    fn name(&self) -> &str {
        "model"
    }

    async fn assess(&self, task: &str) -> Result<TriageVote> {
        let prompt = format!("Task:\n{}", task);
        let response = self.client.complete(TRIAGE_SYSTEM_PROMPT, &prompt).await?;
        Self::parse_vote_json(&response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedClient(&'static str);

    #[async_trait]
    impl CompletionClient for FixedClient {
        async fn complete(&self, _system: &str, _prompt: &str) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    #[test]
    fn test_keyword_vote() {
        assert_eq!(keyword_vote("Fix typo in README").tier, ComplexityTier::Simple);
        assert_eq!(keyword_vote("Implement CSV export").tier, ComplexityTier::Medium);
        assert_eq!(keyword_vote("Refactor the auth module").tier, ComplexityTier::Complex);
        assert_eq!(
            keyword_vote("Rebuild the billing platform from scratch").tier,
            ComplexityTier::VeryComplex
        );
    }

    #[test]
    fn test_scope_vote() {
        assert_eq!(scope_vote("Fix typo in README").tier, ComplexityTier::Simple);

        let broad =
            "Update logging across all services, the gateway, the worker and src/db/pool.rs";
        assert!(scope_vote(broad).tier >= ComplexityTier::Complex);
    }

    #[test]
    fn test_structure_vote() {
        assert_eq!(structure_vote("Fix typo in README").tier, ComplexityTier::Simple);

        let staged =
            "1. Research the options\n2. Design the schema\n3. Implement it\nthen test and document";
        assert!(structure_vote(staged).tier >= ComplexityTier::Complex);
    }

    #[test]
    fn test_path_detection() {
        assert!(looks_like_path("src/main.rs"));
        assert!(looks_like_path("`config.toml`,"));
        assert!(!looks_like_path("end."));
        assert!(!looks_like_path("hello"));
    }

    #[test]
    fn test_parse_vote_json_variants() {
        let clean = r#"{"tier": "complex", "confidence": 0.9, "rationale": "touches auth"}"#;
        let vote = ModelAssessor::parse_vote_json(clean).unwrap();
        assert_eq!(vote.tier, ComplexityTier::Complex);
        assert_eq!(vote.confidence, 0.9);

        let fenced = "```json\n{\"tier\": \"very_complex\"}\n```";
        let vote = ModelAssessor::parse_vote_json(fenced).unwrap();
        assert_eq!(vote.tier, ComplexityTier::VeryComplex);
        assert_eq!(vote.confidence, 0.5);

        assert!(ModelAssessor::parse_vote_json("no idea").is_err());
        assert!(ModelAssessor::parse_vote_json(r#"{"tier": "enormous"}"#).is_err());
    }

    #[tokio::test]
    async fn test_model_assessor() {
        let assessor = ModelAssessor::new(Arc::new(FixedClient(
            r#"Sure: {"tier": "medium", "confidence": 0.7, "rationale": "a few files"}"#,
        )));
        let vote = assessor.assess("add a flag").await.unwrap();
        assert_eq!(vote.tier, ComplexityTier::Medium);
        assert_eq!(vote.rationale, "a few files");
    }
}
