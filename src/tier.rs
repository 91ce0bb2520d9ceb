/// Skill tier earned by how fast the word was completed
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum Tier {
    Expert,
    Intermediate,
    Beginner,
    Unranked,
}

impl Tier {
    /// Each cut is inclusive on the faster tier.
    pub fn from_secs(duration_secs: f64) -> Self {
        if duration_secs <= 40.0 {
            Tier::Expert
        } else if duration_secs <= 70.0 {
            Tier::Intermediate
        } else if duration_secs <= 100.0 {
            Tier::Beginner
        } else {
            Tier::Unranked
        }
    }

    /// Label shown on the results line
    pub fn level_label(&self) -> &'static str {
        match self {
            Tier::Expert => "Level 3 (Expert)",
            Tier::Intermediate => "Level 2 (Intermediate)",
            Tier::Beginner => "Level 1 (Beginner)",
            Tier::Unranked => "Unranked",
        }
    }
}

pub fn tier(duration_secs: f64) -> Tier {
    Tier::from_secs(duration_secs)
}
