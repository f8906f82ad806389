use serde::{Serialize, Deserialize};
use chrono::{DateTime, Utc};
use uuid::Uuid;
use std::{collections::HashSet, fmt, str::FromStr};

use crate::error::PatternError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Craft {
    Knitting,
    Crochet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Item {
    Scarf,
    Vest,
    Kippah,
    Basket,
    Beanie,
    Blanket,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl Craft {
    pub const ALL: [Craft; 2] = [Craft::Knitting, Craft::Crochet];

    pub fn as_str(self) -> &'static str {
        match self {
            Craft::Knitting => "knitting",
            Craft::Crochet => "crochet",
        }
    }
}

impl Item {
    pub const ALL: [Item; 6] = [Item::Scarf, Item::Vest, Item::Kippah, Item::Basket, Item::Beanie, Item::Blanket];

    pub fn as_str(self) -> &'static str {
        match self {
            Item::Scarf => "scarf",
            Item::Vest => "vest",
            Item::Kippah => "kippah",
            Item::Basket => "basket",
            Item::Beanie => "beanie",
            Item::Blanket => "blanket",
        }
    }
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Beginner, Difficulty::Intermediate, Difficulty::Advanced];

    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
        }
    }
}

// Selector values arrive as free strings; anything outside the closed set is rejected, never coerced.
fn parse_choice<T: Copy>(field: &str, raw: &str, all: &[T], name: fn(T) -> &'static str) -> Result<T, PatternError> {
    let wanted = raw.trim().to_ascii_lowercase();
    all.iter()
        .copied()
        .find(|v| name(*v) == wanted)
        .ok_or_else(|| PatternError::InvalidArgument(format!("unknown {field} '{raw}'")))
}

impl FromStr for Craft {
    type Err = PatternError;
    fn from_str(s: &str) -> Result<Self, Self::Err> { parse_choice("craft", s, &Craft::ALL, Craft::as_str) }
}

impl FromStr for Item {
    type Err = PatternError;
    fn from_str(s: &str) -> Result<Self, Self::Err> { parse_choice("item", s, &Item::ALL, Item::as_str) }
}

impl FromStr for Difficulty {
    type Err = PatternError;
    fn from_str(s: &str) -> Result<Self, Self::Err> { parse_choice("difficulty", s, &Difficulty::ALL, Difficulty::as_str) }
}

impl fmt::Display for Craft {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// One validated submission from the pattern form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationRequest {
    pub item: Item,
    pub craft: Craft,
    pub difficulty: Difficulty,
    pub yarn: Option<String>,
    pub notes: Option<String>,
}

impl GenerationRequest {
    pub fn new(item: Item, craft: Craft, difficulty: Difficulty) -> Self {
        Self { item, craft, difficulty, yarn: None, notes: None }
    }

    pub fn with_yarn(mut self, yarn: impl Into<String>) -> Self {
        self.yarn = Some(yarn.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Yarn with blank input treated as absent.
    pub fn yarn(&self) -> Option<&str> {
        self.yarn.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

/// Raw body of `POST /api/patterns`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GenerateBody {
    pub item: String,
    pub craft: String,
    pub difficulty: String,
    #[serde(default)]
    pub yarn: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub session: Option<String>, // identifies a form instance so stale results can be dropped
}

impl TryFrom<GenerateBody> for GenerationRequest {
    type Error = PatternError;

    fn try_from(body: GenerateBody) -> Result<Self, Self::Error> {
        Ok(Self {
            item: body.item.parse()?,
            craft: body.craft.parse()?,
            difficulty: body.difficulty.parse()?,
            yarn: body.yarn,
            notes: body.notes,
        })
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Abbreviation {
    pub term: String,
    pub explanation: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Phase {
    pub phase: String,
    pub instructions: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Pattern {
    pub title: String,
    pub description: String,
    pub difficulty: String,
    pub time_estimate: String,
    pub materials: Vec<String>,
    pub tools: Vec<String>,
    pub abbreviations: Vec<Abbreviation>,
    pub steps: Vec<Phase>,
    pub tips: Vec<String>,
}

pub const PHASE_SETUP: &str = "Setup";
pub const PHASE_BODY: &str = "Body";
pub const PHASE_FINISHING: &str = "Finishing";

impl Pattern {
    /// Structural checks every pattern must pass before it reaches a caller.
    pub fn check_invariants(&self) -> Result<(), PatternError> {
        let invalid = |msg: &str| Err(PatternError::InvalidArgument(msg.to_string()));

        if self.title.trim().is_empty() || self.description.trim().is_empty() {
            return invalid("pattern is missing a title or description");
        }
        let phases: Vec<&str> = self.steps.iter().map(|p| p.phase.as_str()).collect();
        if phases != [PHASE_SETUP, PHASE_BODY, PHASE_FINISHING] {
            return invalid("pattern must have Setup, Body and Finishing phases in order");
        }
        if self.steps.iter().any(|p| p.instructions.is_empty()) {
            return invalid("every phase needs at least one instruction");
        }
        if self.materials.is_empty() || self.tools.is_empty() || self.abbreviations.is_empty() || self.tips.is_empty() {
            return invalid("materials, tools, abbreviations and tips must not be empty");
        }
        let mut seen = HashSet::new();
        if !self.abbreviations.iter().all(|a| seen.insert(a.term.as_str())) {
            return invalid("abbreviation terms must be unique");
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SavedPattern {
    pub id: Uuid,
    pub saved_at: DateTime<Utc>,
    #[serde(flatten)]
    pub pattern: Pattern,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SharedPattern {
    pub id: String,
    pub shared_at: DateTime<Utc>,
    #[serde(flatten)]
    pub pattern: Pattern,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ShareLink {
    pub id: String,
    pub url: String,
    pub shared_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChatMessage {
    pub id: String,
    pub role: ChatRole,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn model(text: impl Into<String>) -> Self {
        Self { id: Uuid::new_v4().to_string(), role: ChatRole::Model, text: text.into(), timestamp: Utc::now() }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChatRequest {
    #[serde(default)]
    pub history: Vec<ChatMessage>,
    pub message: String,
}
