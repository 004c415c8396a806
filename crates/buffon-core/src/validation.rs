//! Parameter validation
//!
//! Structural checks only: the kind must be an enumerated identifier and
//! every parameter it declares must be present and parse as its type.
//! Domain legality (negative trial counts, zero gaps, ...) is left to the
//! renderer, which is the authority on it.

use std::collections::HashMap;
use std::fmt;

use crate::error::BuildError;
use crate::kind::{EstimateProblem, ParamSpec, ParamType, SimulationKind};

/// Query key carrying the kind
pub const KIND_KEY: &str = "simulation";

/// Alternate query key accepted when [`KIND_KEY`] is absent
pub const KIND_ALIAS_KEY: &str = "type";

/// Query key carrying the estimate problem
pub const PROBLEM_KEY: &str = "problem";

/// A parsed parameter value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamValue {
    /// Integer parameter
    Integer(i64),
    /// Finite real parameter
    Real(f64),
}

/// Smallest magnitude rendered in positional notation
const POSITIONAL_MIN: f64 = 1e-6;

/// Magnitudes from here up are rendered with an exponent
const POSITIONAL_MAX: f64 = 1e15;

impl fmt::Display for ParamValue {
    /// Shortest round-trip form; reals outside `[1e-6, 1e15)` use an
    /// exponent so that every rendering stays a short file-name component.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Integer(v) => write!(f, "{v}"),
            Self::Real(v) if v == 0.0 || (POSITIONAL_MIN..POSITIONAL_MAX).contains(&v.abs()) => {
                write!(f, "{v}")
            }
            Self::Real(v) => write!(f, "{v:e}"),
        }
    }
}

/// A validated build request
///
/// `values` is aligned with `kind.params()`.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationRequest {
    kind: SimulationKind,
    values: Vec<ParamValue>,
}

impl SimulationRequest {
    /// Requested kind
    #[inline]
    #[must_use]
    pub fn kind(&self) -> SimulationKind {
        self.kind
    }

    /// Parameters paired with their values, in canonical order
    pub fn params(&self) -> impl Iterator<Item = (&'static ParamSpec, ParamValue)> + '_ {
        self.kind.params().iter().zip(self.values.iter().copied())
    }

    /// Value of a named parameter
    #[must_use]
    pub fn get(&self, name: &str) -> Option<ParamValue> {
        self.params().find(|(spec, _)| spec.name == name).map(|(_, v)| v)
    }
}

/// A validated `/api` estimate request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EstimateRequest {
    /// Requested problem
    pub problem: EstimateProblem,
    /// Needle length or coin diameter
    pub length: ParamValue,
    /// Gap width
    pub gap: ParamValue,
    /// Trial count
    pub trials: ParamValue,
}

/// Validate a build request from its raw query parameters.
///
/// The kind is resolved first; no parameter is read for an unknown kind.
///
/// # Errors
/// - `UnsupportedKind` if `kind` is not an enumerated identifier
/// - `MissingOrInvalidParameter` naming the first absent or malformed parameter
pub fn validate(
    kind: &str,
    raw: &HashMap<String, String>,
) -> Result<SimulationRequest, BuildError> {
    let kind: SimulationKind = kind.parse()?;
    let values = kind
        .params()
        .iter()
        .map(|spec| parse_param(spec, raw))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(SimulationRequest { kind, values })
}

/// Validate a build request whose kind is carried in the query itself.
///
/// Reads [`KIND_KEY`], falling back to [`KIND_ALIAS_KEY`].
///
/// # Errors
/// As [`validate`]; a query without a kind fails on [`KIND_KEY`].
pub fn validate_query(raw: &HashMap<String, String>) -> Result<SimulationRequest, BuildError> {
    let kind = raw
        .get(KIND_KEY)
        .or_else(|| raw.get(KIND_ALIAS_KEY))
        .ok_or(BuildError::MissingOrInvalidParameter { name: KIND_KEY })?;
    validate(kind, raw)
}

/// Validate an `/api` estimate request.
///
/// # Errors
/// Same taxonomy as [`validate`], keyed on [`PROBLEM_KEY`].
pub fn validate_estimate(raw: &HashMap<String, String>) -> Result<EstimateRequest, BuildError> {
    let problem: EstimateProblem = raw
        .get(PROBLEM_KEY)
        .ok_or(BuildError::MissingOrInvalidParameter { name: PROBLEM_KEY })?
        .parse()?;
    Ok(EstimateRequest {
        problem,
        length: parse_param(&EstimateProblem::LENGTH, raw)?,
        gap: parse_param(&EstimateProblem::GAP, raw)?,
        trials: parse_param(&EstimateProblem::TRIALS, raw)?,
    })
}

fn parse_param(
    spec: &ParamSpec,
    raw: &HashMap<String, String>,
) -> Result<ParamValue, BuildError> {
    let invalid = || BuildError::MissingOrInvalidParameter { name: spec.name };
    let text = raw.get(spec.name).ok_or_else(invalid)?;
    match spec.ty {
        ParamType::Integer => text.parse::<i64>().map(ParamValue::Integer).map_err(|_| invalid()),
        ParamType::Real => match text.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(ParamValue::Real(v)),
            _ => Err(invalid()),
        },
    }
}
