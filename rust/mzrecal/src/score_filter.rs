use crate::errors::ConfigError;
use crate::models::Score;
use crate::utils::parse_float_range;
use regex::Regex;
use std::collections::HashMap;

/// PeptideShaker PSM score, Comet expectation value, SEQUEST expectation value.
pub const DEFAULT_SCORE_FILTER: &str = "MS:1002466(0.99:)MS:1002257(0.0:1e-2)MS:1001159(0.0:1e-2)";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreRange {
    pub min_score: f64,
    pub max_score: f64,
    /// Position in the filter expression, lowest is best.
    pub priority: usize,
}

impl ScoreRange {
    pub fn contains(&self, score: f64) -> bool {
        score >= self.min_score && score <= self.max_score
    }
}

/// Accepted score ranges keyed by CV accession or score name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreFilter {
    ranges: HashMap<String, ScoreRange>,
}

impl ScoreFilter {
    /// Parses `<CVterm1|scorename1>([<minscore1>]:[<maxscore1>])...`
    pub fn parse(input: &str) -> Result<Self, ConfigError> {
        let re = Regex::new(r"([^\(]+)\(([^\)]*)\)").map_err(|_| ConfigError::MalformedScoreFilter {
            input: input.to_string(),
        })?;

        let mut ranges = HashMap::new();
        let mut consumed = 0;
        for (priority, caps) in re.captures_iter(input).enumerate() {
            let (Some(all), Some(name), Some(range)) = (caps.get(0), caps.get(1), caps.get(2)) else {
                return Err(ConfigError::MalformedScoreFilter {
                    input: input.to_string(),
                });
            };
            if !input[consumed..all.start()].trim().is_empty() {
                return Err(ConfigError::MalformedScoreFilter {
                    input: input.to_string(),
                });
            }
            consumed = all.end();

            let name = name.as_str().trim().to_string();
            if ranges.contains_key(&name) {
                return Err(ConfigError::DuplicateScoreName { name });
            }
            let bounds = parse_float_range(range.as_str(), f64::MIN, f64::MAX)
                .map_err(|_| ConfigError::InvalidScoreRange { name: name.clone() })?;
            ranges.insert(
                name,
                ScoreRange {
                    min_score: bounds.start(),
                    max_score: bounds.end(),
                    priority,
                },
            );
        }
        if !input[consumed..].trim().is_empty() {
            return Err(ConfigError::MalformedScoreFilter {
                input: input.to_string(),
            });
        }

        Ok(Self { ranges })
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&ScoreRange> {
        self.ranges.get(key)
    }

    /// Looks up a score by accession first, then by name.
    fn lookup(&self, score: &Score) -> Option<&ScoreRange> {
        score
            .accession
            .as_deref()
            .and_then(|a| self.ranges.get(a))
            .or_else(|| score.name.as_deref().and_then(|n| self.ranges.get(n)))
    }

    /// True when the highest priority score present lies in its range.
    pub fn accepts(&self, scores: &[Score]) -> bool {
        let mut best: Option<(usize, bool)> = None;
        for score in scores {
            if let Some(range) = self.lookup(score) {
                if best.map_or(true, |(priority, _)| range.priority < priority) {
                    best = Some((range.priority, range.contains(score.value)));
                }
            }
        }
        matches!(best, Some((_, true)))
    }
}
