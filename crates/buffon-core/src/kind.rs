//! Simulation kinds and their renderer command-line grammar
//!
//! Each kind maps to exactly one renderer script and declares its
//! parameters in the order the renderer expects them. That order is
//! shared by argument construction and output-file naming.
//!
//! Flags the renderer requires but the request does not vary (plot mode,
//! the needle sweep step) are fixed arguments and never appear in the
//! output file name.

use std::fmt;
use std::str::FromStr;

use crate::error::BuildError;

/// Expected type of a query parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    /// Signed decimal integer (trial counts)
    Integer,
    /// Finite real number (dimensions, steps, axis bounds)
    Real,
}

/// One parameter of a kind's command-line grammar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamSpec {
    /// Query-string key
    pub name: &'static str,
    /// Renderer flag emitted before the value
    pub flag: &'static str,
    /// Expected type
    pub ty: ParamType,
}

const fn int(name: &'static str, flag: &'static str) -> ParamSpec {
    ParamSpec { name, flag, ty: ParamType::Integer }
}

const fn real(name: &'static str, flag: &'static str) -> ParamSpec {
    ParamSpec { name, flag, ty: ParamType::Real }
}

const TRIALS: ParamSpec = int("trials", "-t");
const STEP: ParamSpec = real("step", "-s");
const RADIUS: ParamSpec = real("radius", "-r");
const LENGTH: ParamSpec = real("length", "-l");
const GAP: ParamSpec = real("gap", "-g");
const XMIN: ParamSpec = real("xmin", "-xmin");
const XMAX: ParamSpec = real("xmax", "-xmax");

const COIN_PARAMS: &[ParamSpec] = &[TRIALS, STEP, RADIUS, GAP];
const COIN_PHY_PARAMS: &[ParamSpec] = &[TRIALS, STEP, RADIUS, GAP];
const NEEDLE_PARAMS: &[ParamSpec] = &[TRIALS, LENGTH, GAP];
const NEEDLE_ANGLE_PARAMS: &[ParamSpec] = &[TRIALS, STEP, LENGTH, GAP];
const AGGREGATE_PARAMS: &[ParamSpec] = &[XMIN, XMAX];

/// Sweep step handed to `needle-graph.py`, which requires one
pub const NEEDLE_STEP: &str = "0.5";

/// Enumerated plot kinds served by `/build`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimulationKind {
    /// Coin touching a square grid, radius against gap
    CoinToss,
    /// Coin balancing on the grid lines
    CoinBalance,
    /// Needle crossing parallel lines
    NeedleDrop,
    /// Needle dropped at a fixed angle, swept over angles
    NeedleAngle,
    /// All three experiments, varying length/diameter
    AggregateLength,
    /// All three experiments, varying gap width
    AggregateGapWidth,
}

impl SimulationKind {
    /// Every kind, in declaration order
    pub const ALL: [SimulationKind; 6] = [
        Self::CoinToss,
        Self::CoinBalance,
        Self::NeedleDrop,
        Self::NeedleAngle,
        Self::AggregateLength,
        Self::AggregateGapWidth,
    ];

    /// Wire identifier, also the first component of the output file name
    #[must_use]
    pub const fn id(self) -> &'static str {
        match self {
            Self::CoinToss => "coin",
            Self::CoinBalance => "coin_phy",
            Self::NeedleDrop => "needle",
            Self::NeedleAngle => "needle_angle",
            Self::AggregateLength => "length",
            Self::AggregateGapWidth => "gap_width",
        }
    }

    /// Renderer script, relative to the renderer directory
    #[must_use]
    pub const fn renderer(self) -> &'static str {
        match self {
            Self::CoinToss => "coin-graph.py",
            Self::CoinBalance => "coin_phy_graph.py",
            Self::NeedleDrop => "needle-graph.py",
            Self::NeedleAngle => "needle-angle-graph.py",
            Self::AggregateLength | Self::AggregateGapWidth => "all.py",
        }
    }

    /// Arguments emitted before the parameters
    #[must_use]
    pub const fn fixed_args(self) -> &'static [&'static str] {
        match self {
            // radius against P(E)
            Self::CoinBalance => &["-m", "1"],
            // length against P(E)
            Self::NeedleDrop => &["-m", "0", "-s", NEEDLE_STEP],
            Self::AggregateLength => &["-m", "l"],
            Self::AggregateGapWidth => &["-m", "w"],
            _ => &[],
        }
    }

    /// Required parameters in canonical order
    #[must_use]
    pub const fn params(self) -> &'static [ParamSpec] {
        match self {
            Self::CoinToss => COIN_PARAMS,
            Self::CoinBalance => COIN_PHY_PARAMS,
            Self::NeedleDrop => NEEDLE_PARAMS,
            Self::NeedleAngle => NEEDLE_ANGLE_PARAMS,
            Self::AggregateLength | Self::AggregateGapWidth => AGGREGATE_PARAMS,
        }
    }
}

impl FromStr for SimulationKind {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.id() == s)
            .ok_or_else(|| BuildError::UnsupportedKind(s.to_string()))
    }
}

impl fmt::Display for SimulationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Problems served by the textual `/api` estimate endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EstimateProblem {
    /// Buffon's coin
    Coin,
    /// Buffon's needle
    Needle,
    /// Coin, swept over a range
    CoinVar,
    /// Needle, swept over a range
    NeedleVar,
}

impl EstimateProblem {
    /// Every problem, in declaration order
    pub const ALL: [EstimateProblem; 4] = [Self::Coin, Self::Needle, Self::CoinVar, Self::NeedleVar];

    /// Renderer script handling `run` requests
    pub const RENDERER: &'static str = "buffon.py";

    /// First positional parameter: needle length or coin diameter
    pub const LENGTH: ParamSpec = real("length", "");

    /// Second positional parameter: gap width
    pub const GAP: ParamSpec = real("gap", "");

    /// Trial count, emitted as `--trials <n>`
    pub const TRIALS: ParamSpec = int("trials", "--trials");

    /// Wire identifier
    #[must_use]
    pub const fn id(self) -> &'static str {
        match self {
            Self::Coin => "coin",
            Self::Needle => "needle",
            Self::CoinVar => "coin_var",
            Self::NeedleVar => "needle_var",
        }
    }
}

impl FromStr for EstimateProblem {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|problem| problem.id() == s)
            .ok_or_else(|| BuildError::UnsupportedKind(s.to_string()))
    }
}

impl fmt::Display for EstimateProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}
