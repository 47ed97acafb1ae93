use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Letter tiers, evaluated top-down on the win probability (inclusive lower bounds).
const LETTER_TIERS: [(f64, Grade); 5] = [
    (0.70, Grade::APlus),
    (0.65, Grade::A),
    (0.60, Grade::B),
    (0.55, Grade::C),
    (0.50, Grade::D),
];

const STRONG_MIN: f64 = 0.65;
const MODERATE_MIN: f64 = 0.55;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Grade {
    #[serde(rename = "A+")]
    APlus,
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    pub fn as_str(self) -> &'static str {
        match self {
            Grade::APlus => "A+",
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Grade {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim() {
            "A+" => Ok(Grade::APlus),
            "A" => Ok(Grade::A),
            "B" => Ok(Grade::B),
            "C" => Ok(Grade::C),
            "D" => Ok(Grade::D),
            "F" => Ok(Grade::F),
            other => Err(format!("unknown grade {other:?}")),
        }
    }
}

/// Grade for a win probability in `[0, 1]`. Total: NaN falls through to `F`.
pub fn grade_for(win_probability: f64) -> Grade {
    LETTER_TIERS
        .iter()
        .find(|(min, _)| win_probability >= *min)
        .map(|(_, grade)| *grade)
        .unwrap_or(Grade::F)
}

/// Coarser presentation of the same win probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strength {
    Strong,
    Moderate,
    Weak,
}

impl Strength {
    pub fn as_str(self) -> &'static str {
        match self {
            Strength::Strong => "Strong",
            Strength::Moderate => "Moderate",
            Strength::Weak => "Weak",
        }
    }
}

pub fn strength_for(win_probability: f64) -> Strength {
    if win_probability >= STRONG_MIN {
        Strength::Strong
    } else if win_probability >= MODERATE_MIN {
        Strength::Moderate
    } else {
        Strength::Weak
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TierScheme {
    #[default]
    Letter,
    Strength,
}

impl TierScheme {
    pub fn toggle(self) -> Self {
        match self {
            TierScheme::Letter => TierScheme::Strength,
            TierScheme::Strength => TierScheme::Letter,
        }
    }

    pub fn label(self, win_probability: f64) -> &'static str {
        match self {
            TierScheme::Letter => grade_for(win_probability).as_str(),
            TierScheme::Strength => strength_for(win_probability).as_str(),
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "letter" | "grade" => Some(TierScheme::Letter),
            "strength" | "three" => Some(TierScheme::Strength),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundaries_take_the_higher_tier() {
        assert_eq!(grade_for(0.70), Grade::APlus);
        assert_eq!(grade_for(0.65), Grade::A);
        assert_eq!(grade_for(0.60), Grade::B);
        assert_eq!(grade_for(0.55), Grade::C);
        assert_eq!(grade_for(0.50), Grade::D);
        assert_eq!(grade_for(0.4999), Grade::F);
    }

    #[test]
    fn just_below_boundary_drops_a_tier() {
        assert_eq!(grade_for(0.6999), Grade::A);
        assert_eq!(grade_for(0.6499), Grade::B);
        assert_eq!(grade_for(0.5999), Grade::C);
        assert_eq!(grade_for(0.5499), Grade::D);
    }

    #[test]
    fn extremes_and_nan() {
        assert_eq!(grade_for(1.0), Grade::APlus);
        assert_eq!(grade_for(0.0), Grade::F);
        assert_eq!(grade_for(f64::NAN), Grade::F);
    }

    #[test]
    fn grade_strings_parse_back() {
        for g in [Grade::APlus, Grade::A, Grade::B, Grade::C, Grade::D, Grade::F] {
            assert_eq!(g.as_str().parse::<Grade>().unwrap(), g);
        }
        assert!("E".parse::<Grade>().is_err());
    }

    #[test]
    fn strength_remaps_same_probability() {
        assert_eq!(strength_for(0.65), Strength::Strong);
        assert_eq!(strength_for(0.6499), Strength::Moderate);
        assert_eq!(strength_for(0.55), Strength::Moderate);
        assert_eq!(strength_for(0.5), Strength::Weak);
        assert_eq!(TierScheme::Strength.label(0.72), "Strong");
        assert_eq!(TierScheme::Letter.label(0.72), "A+");
    }
}
