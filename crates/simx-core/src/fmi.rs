//! FMI variable classification and the rules deciding when a variable may be set.
//!
//! Causality and variability together select one cell of the FMI 2.0 default
//! initial table (section 2.2.7). The cell tells whether the combination is
//! legal at all and which `initial` attribute applies when the model does not
//! declare one. The set-legality check combines that with the point in time at
//! which the value would be written.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// FMI causality of a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Causality {
    Parameter,
    #[serde(alias = "calculatedParameter")]
    CalculatedParameter,
    Input,
    Output,
    Local,
    Independent,
}

impl Causality {
    fn column(self) -> usize {
        match self {
            Causality::Parameter => 0,
            Causality::CalculatedParameter => 1,
            Causality::Input => 2,
            Causality::Output => 3,
            Causality::Local => 4,
            Causality::Independent => 5,
        }
    }
}

impl fmt::Display for Causality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Causality::Parameter => write!(f, "parameter"),
            Causality::CalculatedParameter => write!(f, "calculated_parameter"),
            Causality::Input => write!(f, "input"),
            Causality::Output => write!(f, "output"),
            Causality::Local => write!(f, "local"),
            Causality::Independent => write!(f, "independent"),
        }
    }
}

/// FMI variability of a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variability {
    Constant,
    Fixed,
    Tunable,
    Discrete,
    Continuous,
}

impl Variability {
    fn row(self) -> usize {
        match self {
            Variability::Constant => 0,
            Variability::Fixed => 1,
            Variability::Tunable => 2,
            Variability::Discrete => 3,
            Variability::Continuous => 4,
        }
    }
}

impl fmt::Display for Variability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variability::Constant => write!(f, "constant"),
            Variability::Fixed => write!(f, "fixed"),
            Variability::Tunable => write!(f, "tunable"),
            Variability::Discrete => write!(f, "discrete"),
            Variability::Continuous => write!(f, "continuous"),
        }
    }
}

/// FMI `initial` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Initial {
    Exact,
    Approx,
    Calculated,
}

impl fmt::Display for Initial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Initial::Exact => write!(f, "exact"),
            Initial::Approx => write!(f, "approx"),
            Initial::Calculated => write!(f, "calculated"),
        }
    }
}

/// One cell of the default initial table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitialRule {
    /// Combination not allowed; the letter names the footnote in the standard.
    Forbidden(char),
    /// Only `exact`.
    Exact,
    /// `calculated` by default, `approx` allowed.
    Calculated,
    /// `calculated` by default, `exact` and `approx` allowed.
    Open,
    /// No `initial` attribute may be given.
    Unspecified,
}

// Cell codes from the FMI 2.0 table. Negative codes are forbidden combinations.
const INITIAL_TABLE: [[i8; 6]; 5] = [
    [-1, -1, -1, 7, 10, -3],
    [1, 3, -4, -5, 11, -3],
    [2, 4, -4, -5, 12, -3],
    [-2, -2, 5, 8, 13, -3],
    [-2, -2, 6, 9, 14, 15],
];

impl InitialRule {
    pub fn lookup(causality: Causality, variability: Variability) -> Self {
        let code = INITIAL_TABLE[variability.row()][causality.column()];
        match code {
            c if c < 0 => InitialRule::Forbidden(char::from(b'a' + (-c - 1) as u8)),
            1 | 2 | 7 | 10 => InitialRule::Exact,
            3 | 4 | 11 | 12 => InitialRule::Calculated,
            8 | 9 | 13 | 14 => InitialRule::Open,
            _ => InitialRule::Unspecified,
        }
    }

    /// The `initial` value applied when the model declares none.
    pub fn default_initial(self) -> Option<Initial> {
        match self {
            InitialRule::Exact => Some(Initial::Exact),
            InitialRule::Calculated | InitialRule::Open => Some(Initial::Calculated),
            InitialRule::Forbidden(_) | InitialRule::Unspecified => None,
        }
    }
}

/// Effective `initial` of a variable: the declared one, else the table default.
pub fn effective_initial(
    causality: Causality,
    variability: Variability,
    declared: Option<Initial>,
) -> Option<Initial> {
    declared.or_else(|| InitialRule::lookup(causality, variability).default_initial())
}

/// Check whether variable `name` may be set at `time` (user time units).
///
/// Negative times are before initialization, zero is during initialization and
/// positive times are communication points.
pub fn check_set(
    name: &str,
    causality: Causality,
    variability: Variability,
    initial: Option<Initial>,
    time: f64,
) -> Result<()> {
    let initial = effective_initial(causality, variability, initial);
    let not_constant = variability != Variability::Constant;
    let (allowed, phase) = if time < 0.0 {
        (
            not_constant && matches!(initial, Some(Initial::Exact | Initial::Approx)),
            "before initialization",
        )
    } else if time == 0.0 {
        (
            not_constant && (initial == Some(Initial::Exact) || causality == Causality::Input),
            "during initialization",
        )
    } else {
        (
            (causality == Causality::Parameter && variability == Variability::Tunable)
                || causality == Causality::Input,
            "at communication point",
        )
    };
    if allowed {
        Ok(())
    } else {
        Err(CoreError::Illegal(format!(
            "change of {name} {phase} (causality {causality}, variability {variability})"
        )))
    }
}
