//! Enumerated values shared across the pipeline modules.
//!
//! Stages, temperature levels, log entry types and sentiments are stored as
//! TEXT in Postgres (backed by CHECK constraints) and validated here at the
//! API boundary.

use serde::{Deserialize, Serialize};

/// The seven pipeline stages a client can be in.
///
/// The machine enforces membership only: any stage may follow any other,
/// including re-entering the current one. `deposited` is conventionally
/// terminal but nothing blocks a transition out of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    NewLead,
    InitialContact,
    Nurturing,
    HighIntent,
    JoinedGroup,
    OpenedAccount,
    Deposited,
}

impl Stage {
    pub const ALL: [Stage; 7] = [
        Stage::NewLead,
        Stage::InitialContact,
        Stage::Nurturing,
        Stage::HighIntent,
        Stage::JoinedGroup,
        Stage::OpenedAccount,
        Stage::Deposited,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::NewLead => "new_lead",
            Stage::InitialContact => "initial_contact",
            Stage::Nurturing => "nurturing",
            Stage::HighIntent => "high_intent",
            Stage::JoinedGroup => "joined_group",
            Stage::OpenedAccount => "opened_account",
            Stage::Deposited => "deposited",
        }
    }

    pub fn parse(value: &str) -> Option<Stage> {
        Stage::ALL.iter().copied().find(|s| s.as_str() == value)
    }

    /// Position of this stage in the pipeline, used only by the
    /// `pipeline` list-ordering comparator.
    pub fn pipeline_position(&self) -> usize {
        Stage::ALL.iter().position(|s| s == self).unwrap_or(0)
    }
}

impl Default for Stage {
    fn default() -> Self {
        Stage::NewLead
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Categorical engagement label, stored independently of
/// `temperature_score` (no derivation rule exists between the two).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemperatureLevel {
    Hot,
    Warm,
    Neutral,
    Cold,
}

impl TemperatureLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemperatureLevel::Hot => "hot",
            TemperatureLevel::Warm => "warm",
            TemperatureLevel::Neutral => "neutral",
            TemperatureLevel::Cold => "cold",
        }
    }

    pub fn parse(value: &str) -> Option<TemperatureLevel> {
        match value {
            "hot" => Some(TemperatureLevel::Hot),
            "warm" => Some(TemperatureLevel::Warm),
            "neutral" => Some(TemperatureLevel::Neutral),
            "cold" => Some(TemperatureLevel::Cold),
            _ => None,
        }
    }
}

impl Default for TemperatureLevel {
    fn default() -> Self {
        TemperatureLevel::Neutral
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogEntryType {
    Interaction,
    StageChange,
    SystemAlert,
}

impl LogEntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogEntryType::Interaction => "interaction",
            LogEntryType::StageChange => "stage_change",
            LogEntryType::SystemAlert => "system_alert",
        }
    }

    pub fn parse(value: &str) -> Option<LogEntryType> {
        match value {
            "interaction" => Some(LogEntryType::Interaction),
            "stage_change" => Some(LogEntryType::StageChange),
            "system_alert" => Some(LogEntryType::SystemAlert),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Neutral => "neutral",
            Sentiment::Negative => "negative",
        }
    }

    pub fn parse(value: &str) -> Option<Sentiment> {
        match value {
            "positive" => Some(Sentiment::Positive),
            "neutral" => Some(Sentiment::Neutral),
            "negative" => Some(Sentiment::Negative),
            _ => None,
        }
    }
}

impl Default for Sentiment {
    fn default() -> Self {
        Sentiment::Neutral
    }
}

/// Comparator selection for client listing.
///
/// The historic behavior sorts by the raw stage string (lexical). The
/// pipeline-positional order is available as an explicit opt-in via the
/// `[pipeline]` config section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageOrder {
    Lexical,
    Pipeline,
}

impl Default for StageOrder {
    fn default() -> Self {
        StageOrder::Lexical
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_round_trips_all_seven_values() {
        for stage in Stage::ALL {
            assert_eq!(Stage::parse(stage.as_str()), Some(stage));
        }
        assert_eq!(Stage::parse("closed_won"), None);
        assert_eq!(Stage::parse(""), None);
    }

    #[test]
    fn pipeline_position_follows_declaration_order() {
        assert_eq!(Stage::NewLead.pipeline_position(), 0);
        assert_eq!(Stage::Deposited.pipeline_position(), 6);
        assert!(
            Stage::JoinedGroup.pipeline_position()
                < Stage::OpenedAccount.pipeline_position()
        );
    }

    #[test]
    fn lexical_order_differs_from_pipeline_order() {
        // "deposited" sorts lexically before "new_lead" even though it is
        // the last pipeline stage; the list comparator must honor whichever
        // order was configured.
        assert!(Stage::Deposited.as_str() < Stage::NewLead.as_str());
        assert!(Stage::Deposited.pipeline_position() > Stage::NewLead.pipeline_position());
    }

    #[test]
    fn temperature_and_sentiment_reject_unknown_values() {
        assert_eq!(TemperatureLevel::parse("lukewarm"), None);
        assert_eq!(Sentiment::parse("angry"), None);
        assert_eq!(LogEntryType::parse("note"), None);
    }
}
