//! The joint search space and its sampled records.
//!
//! A [`SearchSpace`] is an ordered collection of [`Parameter`]s with unique
//! names. Joint samples are [`Sample`] records keyed by parameter name whose
//! iteration order is the declaration order; every generated and persisted
//! row shares this schema exactly.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::parameter::{ParamValue, Parameter};

/// One joint draw from a [`SearchSpace`]: an ordered `name → value` record.
///
/// Entries appear in the space's declaration order. The decoded form keeps
/// the original value types; the encoded form (`Vec<f64>`) is produced by
/// [`SearchSpace::encode`] and consumed by classifiers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    entries: Vec<(String, ParamValue)>,
}

impl Sample {
    pub(crate) fn new(entries: Vec<(String, ParamValue)>) -> Self {
        Self { entries }
    }

    /// Returns the value for `name`, if present.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Returns the numeric value for `name`, if present and numeric.
    #[must_use]
    pub fn f64(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(ParamValue::as_f64)
    }

    /// Iterates entries in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the sample has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (name, value)) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{name}={value}")?;
        }
        write!(f, "}}")
    }
}

/// An ordered, immutable collection of parameters with unique names.
///
/// # Examples
///
/// ```
/// use shac::{Parameter, SearchSpace};
///
/// let space = SearchSpace::new(vec![
///     Parameter::uniform("x", -5.0, 5.0),
///     Parameter::uniform("y", -2.0, 2.0),
/// ])
/// .unwrap();
///
/// let mut rng = fastrand::Rng::with_seed(0);
/// let sample = space.sample(&mut rng);
/// let encoded = space.encode(&sample).unwrap();
/// assert_eq!(encoded.len(), 2);
/// assert_eq!(space.decode(&encoded).unwrap(), sample);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Parameter>", into = "Vec<Parameter>")]
pub struct SearchSpace {
    params: Vec<Parameter>,
}

impl SearchSpace {
    /// Creates a search space from parameters in declaration order.
    ///
    /// # Errors
    ///
    /// Returns an error if any parameter fails [`Parameter::validate`] or if
    /// two parameters share a name.
    pub fn new(params: Vec<Parameter>) -> Result<Self> {
        for (i, param) in params.iter().enumerate() {
            param.validate()?;
            if params[..i].iter().any(|p| p.name() == param.name()) {
                return Err(Error::DuplicateParameter {
                    name: param.name().to_owned(),
                });
            }
        }
        Ok(Self { params })
    }

    /// The parameters in declaration order.
    #[must_use]
    pub fn params(&self) -> &[Parameter] {
        &self.params
    }

    /// Parameter names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.params.iter().map(Parameter::name)
    }

    /// Looks up a parameter by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.params.iter().find(|p| p.name() == name)
    }

    /// Number of dimensions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Whether the space has no dimensions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Draws one value per parameter independently.
    #[must_use]
    pub fn sample(&self, rng: &mut fastrand::Rng) -> Sample {
        Sample::new(
            self.params
                .iter()
                .map(|p| (p.name().to_owned(), p.sample(rng)))
                .collect(),
        )
    }

    /// Encodes a sample into the real vector consumed by classifiers.
    ///
    /// The vector length equals the space arity and follows declaration
    /// order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SchemaMismatch`] if the sample's entries do not
    /// match this space's names and order, or an encoding error from the
    /// offending parameter.
    pub fn encode(&self, sample: &Sample) -> Result<Vec<f64>> {
        if sample.len() != self.params.len() {
            return Err(Error::DimensionMismatch {
                expected: self.params.len(),
                got: sample.len(),
            });
        }
        self.params
            .iter()
            .zip(sample.iter())
            .map(|(param, (name, value))| {
                if param.name() != name {
                    return Err(Error::SchemaMismatch(format!(
                        "expected parameter '{}' but sample has '{name}'",
                        param.name()
                    )));
                }
                param.encode(value)
            })
            .collect()
    }

    /// Decodes an encoded vector back into a sample.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if the vector length does not
    /// equal the space arity.
    pub fn decode(&self, encoded: &[f64]) -> Result<Sample> {
        if encoded.len() != self.params.len() {
            return Err(Error::DimensionMismatch {
                expected: self.params.len(),
                got: encoded.len(),
            });
        }
        Ok(Sample::new(
            self.params
                .iter()
                .zip(encoded)
                .map(|(param, &x)| (param.name().to_owned(), param.decode(x)))
                .collect(),
        ))
    }
}

impl TryFrom<Vec<Parameter>> for SearchSpace {
    type Error = Error;

    fn try_from(params: Vec<Parameter>) -> Result<Self> {
        SearchSpace::new(params)
    }
}

impl From<SearchSpace> for Vec<Parameter> {
    fn from(space: SearchSpace) -> Self {
        space.params
    }
}
