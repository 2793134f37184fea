//! Hyperparameter grids and the candidate parameter sets they expand to.

use crate::error::MlError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single hyperparameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl ParamValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ParamValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Integers widen to floats.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            ParamValue::Float(v) => Some(*v),
            ParamValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Str(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ParamValue::Bool(_) => "bool",
            ParamValue::Int(_) => "int",
            ParamValue::Float(_) => "float",
            ParamValue::Str(_) => "string",
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(v) => write!(f, "{v}"),
            ParamValue::Int(v) => write!(f, "{v}"),
            ParamValue::Float(v) => f.write_str(&float_repr(*v)),
            ParamValue::Str(v) => write!(f, "{v:?}"),
        }
    }
}

/// Shortest round-trip form with a decimal point on whole numbers. Values
/// below 1e-4 or from 1e16 up use a signed exponent of at least two digits
/// (`1e-05`, `2.5e+16`).
fn float_repr(v: f64) -> String {
    if v.is_nan() {
        return "nan".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let sci = format!("{v:e}");
    let (mantissa, exp) = sci.split_once('e').unwrap_or((&sci, "0"));
    let exp: i32 = exp.parse().unwrap_or(0);
    if (-4..16).contains(&exp) {
        let plain = v.to_string();
        if plain.contains('.') {
            plain
        } else {
            format!("{plain}.0")
        }
    } else {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{mantissa}e{sign}{:02}", exp.abs())
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        ParamValue::Int(v.into())
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Str(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Str(v)
    }
}

/// One concrete assignment of hyperparameters, i.e. one grid candidate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamSet(BTreeMap<String, ParamValue>);

impl ParamSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: impl Into<ParamValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: &str, value: impl Into<ParamValue>) -> Option<ParamValue> {
        self.0.insert(name.to_string(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<ParamValue> {
        self.0.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn get_int(&self, name: &str) -> Result<i64, MlError> {
        self.typed(name, "int", ParamValue::as_int)
    }

    pub fn get_float(&self, name: &str) -> Result<f64, MlError> {
        self.typed(name, "float", ParamValue::as_float)
    }

    pub fn get_str(&self, name: &str) -> Result<&str, MlError> {
        self.typed(name, "string", ParamValue::as_str)
    }

    pub fn get_bool(&self, name: &str) -> Result<bool, MlError> {
        self.typed(name, "bool", ParamValue::as_bool)
    }

    pub fn int_or(&self, name: &str, default: i64) -> Result<i64, MlError> {
        self.typed_or(name, default, "int", ParamValue::as_int)
    }

    pub fn float_or(&self, name: &str, default: f64) -> Result<f64, MlError> {
        self.typed_or(name, default, "float", ParamValue::as_float)
    }

    pub fn str_or<'a>(&'a self, name: &str, default: &'a str) -> Result<&'a str, MlError> {
        self.typed_or(name, default, "string", ParamValue::as_str)
    }

    pub fn bool_or(&self, name: &str, default: bool) -> Result<bool, MlError> {
        self.typed_or(name, default, "bool", ParamValue::as_bool)
    }

    fn typed<'a, T>(
        &'a self,
        name: &str,
        expected: &str,
        extract: impl Fn(&'a ParamValue) -> Option<T>,
    ) -> Result<T, MlError> {
        let value = self
            .get(name)
            .ok_or_else(|| MlError::invalid_parameter(format!("missing parameter '{name}'")))?;
        extract(value).ok_or_else(|| {
            MlError::invalid_parameter(format!(
                "parameter '{name}' must be {expected}, got {} ({value})",
                value.kind()
            ))
        })
    }

    fn typed_or<'a, T>(
        &'a self,
        name: &str,
        default: T,
        expected: &str,
        extract: impl Fn(&'a ParamValue) -> Option<T>,
    ) -> Result<T, MlError> {
        if self.contains(name) {
            self.typed(name, expected, extract)
        } else {
            Ok(default)
        }
    }
}

impl fmt::Display for ParamSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (name, value)) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{name}: {value}")?;
        }
        write!(f, "}}")
    }
}

impl<K: Into<String>, V: Into<ParamValue>> FromIterator<(K, V)> for ParamSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// A sub-grid: parameter name to the candidate values to try.
pub type SubGrid = BTreeMap<String, Vec<ParamValue>>;

/// Accepts either a single table or a list of tables when deserializing.
#[derive(Deserialize)]
#[serde(untagged)]
enum GridRepr {
    Many(Vec<SubGrid>),
    One(SubGrid),
}

/// A parameter grid, possibly a union of several sub-grids.
///
/// Each sub-grid expands to the cartesian product of its value lists, with
/// keys in sorted order and the first key varying slowest. Sub-grids are
/// expanded in the order they were added.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "GridRepr", into = "Vec<SubGrid>")]
pub struct ParamGrid {
    grids: Vec<SubGrid>,
}

impl From<GridRepr> for ParamGrid {
    fn from(repr: GridRepr) -> Self {
        match repr {
            GridRepr::Many(grids) => Self { grids },
            GridRepr::One(grid) => Self { grids: vec![grid] },
        }
    }
}

impl From<ParamGrid> for Vec<SubGrid> {
    fn from(grid: ParamGrid) -> Self {
        grid.grids
    }
}

impl From<SubGrid> for ParamGrid {
    fn from(grid: SubGrid) -> Self {
        Self { grids: vec![grid] }
    }
}

impl From<Vec<SubGrid>> for ParamGrid {
    fn from(grids: Vec<SubGrid>) -> Self {
        Self { grids }
    }
}

impl ParamGrid {
    /// A grid holding a single empty sub-grid.
    pub fn new() -> Self {
        Self {
            grids: vec![SubGrid::new()],
        }
    }

    /// Set the candidate values of `name` in the last sub-grid.
    pub fn with<V, I>(mut self, name: &str, values: I) -> Self
    where
        V: Into<ParamValue>,
        I: IntoIterator<Item = V>,
    {
        if self.grids.is_empty() {
            self.grids.push(SubGrid::new());
        }
        if let Some(grid) = self.grids.last_mut() {
            grid.insert(
                name.to_string(),
                values.into_iter().map(Into::into).collect(),
            );
        }
        self
    }

    /// Start a new sub-grid; following `with` calls fill it.
    pub fn or(mut self) -> Self {
        self.grids.push(SubGrid::new());
        self
    }

    pub fn sub_grids(&self) -> &[SubGrid] {
        &self.grids
    }

    /// Number of candidates the grid expands to.
    pub fn len(&self) -> usize {
        self.grids
            .iter()
            .map(|grid| grid.values().map(Vec::len).product::<usize>())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Expand every sub-grid into its candidates.
    pub fn candidates(&self) -> Result<Vec<ParamSet>, MlError> {
        let mut candidates = Vec::with_capacity(self.len());
        for grid in &self.grids {
            if let Some((name, _)) = grid.iter().find(|(_, values)| values.is_empty()) {
                return Err(MlError::invalid_parameter(format!(
                    "parameter grid for '{name}' needs a non-empty sequence of values"
                )));
            }
            let entries: Vec<(&String, &Vec<ParamValue>)> = grid.iter().collect();
            candidates.extend(cartesian_product(&entries));
        }
        Ok(candidates)
    }
}

fn cartesian_product(entries: &[(&String, &Vec<ParamValue>)]) -> Vec<ParamSet> {
    let Some(((name, values), rest)) = entries.split_first() else {
        return vec![ParamSet::new()];
    };
    let rest_sets = cartesian_product(rest);

    values
        .iter()
        .flat_map(|value| {
            rest_sets.iter().map(move |set| {
                let mut set = set.clone();
                set.insert(name, value.clone());
                set
            })
        })
        .collect()
}
