use std::fmt;
use nh_core::{Classification, Error, Result, ZeroShotClassifier};

pub mod huggingface;

pub use huggingface::HuggingFaceClassifier;

const KEYWORDS: &[(&str, &[&str])] = &[
    ("sports", &["match", "game", "team", "season", "coach", "league", "cup", "player", "goal", "win", "football", "cricket", "tennis"]),
    ("finance", &["market", "shares", "stock", "bank", "interest", "rates", "inflation", "economy", "investors", "profit", "dollar", "asx"]),
    ("lifestyle", &["travel", "food", "recipe", "fashion", "home", "wellbeing", "style", "holiday", "restaurant", "family"]),
    ("music", &["album", "song", "band", "concert", "tour", "singer", "festival", "single", "chart", "music"]),
    ("technology", &["software", "ai", "app", "startup", "chip", "cyber", "data", "tech", "device", "launch", "electric"]),
    ("politics", &["election", "minister", "government", "parliament", "vote", "policy", "senate", "party", "premier", "campaign"]),
    ("health", &["hospital", "doctor", "patients", "health", "disease", "vaccine", "medical", "virus", "mental", "cancer"]),
    ("education", &["school", "students", "university", "teachers", "education", "exam", "curriculum", "campus", "degree"]),
];

/// Local classifier scoring labels by keyword hits. Labels without a
/// keyword list score zero; ties keep the candidate order.
#[derive(Default)]
pub struct KeywordClassifier;

impl fmt::Debug for KeywordClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeywordClassifier").finish()
    }
}

impl KeywordClassifier {
    pub fn new() -> Self {
        Self
    }

    fn hits(label: &str, tokens: &[String]) -> usize {
        KEYWORDS
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(label))
            .map(|(_, keywords)| tokens.iter().filter(|t| keywords.contains(&t.as_str())).count())
            .unwrap_or(0)
    }
}

#[async_trait::async_trait]
impl ZeroShotClassifier for KeywordClassifier {
    fn name(&self) -> &str {
        "Keyword"
    }

    async fn classify(&self, text: &str, candidate_labels: &[String]) -> Result<Classification> {
        if candidate_labels.is_empty() {
            return Err(Error::Collaborator("No candidate labels given".to_string()));
        }
        let tokens: Vec<String> = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase)
            .collect();

        let counts: Vec<usize> = candidate_labels.iter().map(|label| Self::hits(label, &tokens)).collect();
        let total: usize = counts.iter().sum();
        let labels = candidate_labels
            .iter()
            .zip(counts)
            .map(|(label, count)| {
                let score = if total == 0 {
                    1.0 / candidate_labels.len() as f32
                } else {
                    count as f32 / total as f32
                };
                (label.clone(), score)
            })
            .collect();

        Ok(Classification::ranked(labels))
    }
}
