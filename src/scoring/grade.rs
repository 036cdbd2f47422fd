//! Letter grades for quality scores

use serde::{Deserialize, Serialize};

/// Letter grade, best first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let letter = match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        };
        f.write_str(letter)
    }
}

/// Lower bound (inclusive) of each passing grade
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradeBands {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
}

impl Default for GradeBands {
    fn default() -> Self {
        Self {
            a: 90.0,
            b: 75.0,
            c: 50.0,
            d: 25.0,
        }
    }
}

impl GradeBands {
    /// Bands must be strictly descending for grading to be a step function
    pub fn is_descending(&self) -> bool {
        self.a > self.b && self.b > self.c && self.c > self.d
    }

    pub fn grade(&self, score: f64) -> Grade {
        if score.is_nan() {
            Grade::F
        } else if score >= self.a {
            Grade::A
        } else if score >= self.b {
            Grade::B
        } else if score >= self.c {
            Grade::C
        } else if score >= self.d {
            Grade::D
        } else {
            Grade::F
        }
    }
}
