//! Search-space dimensions and their sampled values.
//!
//! A [`Parameter`] declares one dimension of the search space and knows how
//! to draw from it, how to [`encode`](Parameter::encode) a value into the
//! real vector consumed by classifiers, and how to
//! [`decode`](Parameter::decode) such a real back into a value. Three kinds
//! are supported:
//!
//! | Kind | Sampler | Encoding |
//! |------|---------|----------|
//! | [`Discrete`](Parameter::Discrete) | uniform choice over the value list | 0-based index in the declared list |
//! | [`Uniform`](Parameter::Uniform) | uniform on `[low, high)` | identity |
//! | [`Normal`](Parameter::Normal) | `N(mean, std_dev²)`, unclipped | identity |
//!
//! # Example
//!
//! ```
//! use shac::{ParamValue, Parameter};
//!
//! let lr = Parameter::uniform("lr", 1e-4, 1e-1);
//! let units = Parameter::discrete("units", vec![64.into(), 128.into(), 256.into()]);
//!
//! let mut rng = fastrand::Rng::with_seed(0);
//! let value = units.sample(&mut rng);
//! let encoded = units.encode(&value).unwrap();
//! assert_eq!(units.decode(encoded), value);
//! # let _ = lr;
//! ```

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::rng_util;

/// A sampled parameter value.
///
/// Values are stored in their user-facing form; classifiers only ever see
/// the encoded real obtained through [`Parameter::encode`]. Variant order
/// matters for deserialization: JSON integers parse as `Int`, other numbers
/// as `Float`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// An integer value.
    Int(i64),
    /// A floating-point value.
    Float(f64),
    /// A string value.
    Str(String),
}

/// The kind of a [`ParamValue`], used to check discrete lists for uniformity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ValueKind {
    Int,
    Float,
    Str,
}

impl ParamValue {
    pub(crate) fn kind(&self) -> ValueKind {
        match self {
            ParamValue::Int(_) => ValueKind::Int,
            ParamValue::Float(_) => ValueKind::Float,
            ParamValue::Str(_) => ValueKind::Str,
        }
    }

    /// Returns the value as an `f64` if it is numeric.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            #[allow(clippy::cast_precision_loss)]
            ParamValue::Int(v) => Some(*v as f64),
            ParamValue::Float(v) => Some(*v),
            ParamValue::Str(_) => None,
        }
    }

    /// Returns the value as an `i64` if it is an integer.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ParamValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the value as a string slice if it is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Str(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{v}"),
            ParamValue::Float(v) => write!(f, "{v}"),
            ParamValue::Str(v) => write!(f, "{v}"),
        }
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Str(v.to_owned())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Str(v)
    }
}

/// One dimension of a search space.
///
/// Dispatch is a plain enum match; the three kinds share the capability set
/// `sample` / `encode` / `decode`. Parameters serialize as tagged JSON for
/// the schema file (`parameters.json`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Parameter {
    /// An ordered list of values of one kind; sampling is a uniform choice.
    Discrete {
        /// Unique name within the search space.
        name: String,
        /// The candidate values, in declaration order.
        values: Vec<ParamValue>,
    },
    /// A continuous value drawn uniformly from `[low, high)`.
    Uniform {
        /// Unique name within the search space.
        name: String,
        /// Lower bound (inclusive).
        low: f64,
        /// Upper bound (exclusive for sampling).
        high: f64,
    },
    /// A continuous value drawn from a normal distribution. Draws are not
    /// clipped to any bounding box.
    Normal {
        /// Unique name within the search space.
        name: String,
        /// Mean of the distribution.
        mean: f64,
        /// Standard deviation of the distribution.
        std_dev: f64,
    },
}

impl Parameter {
    /// Creates a discrete parameter over the given values.
    #[must_use]
    pub fn discrete(name: impl Into<String>, values: Vec<ParamValue>) -> Self {
        Parameter::Discrete {
            name: name.into(),
            values,
        }
    }

    /// Creates a uniform continuous parameter on `[low, high)`.
    #[must_use]
    pub fn uniform(name: impl Into<String>, low: f64, high: f64) -> Self {
        Parameter::Uniform {
            name: name.into(),
            low,
            high,
        }
    }

    /// Creates a normally distributed continuous parameter.
    #[must_use]
    pub fn normal(name: impl Into<String>, mean: f64, std_dev: f64) -> Self {
        Parameter::Normal {
            name: name.into(),
            mean,
            std_dev,
        }
    }

    /// Returns the parameter's name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Parameter::Discrete { name, .. }
            | Parameter::Uniform { name, .. }
            | Parameter::Normal { name, .. } => name,
        }
    }

    /// Validates the parameter configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a discrete list is empty or mixes value kinds, if
    /// uniform bounds are inverted, or if a standard deviation is not
    /// positive.
    pub fn validate(&self) -> Result<()> {
        match self {
            Parameter::Discrete { name, values } => {
                let Some(first) = values.first() else {
                    return Err(Error::EmptyValues);
                };
                if values.iter().any(|v| v.kind() != first.kind()) {
                    return Err(Error::MixedValueKinds { name: name.clone() });
                }
                Ok(())
            }
            Parameter::Uniform { low, high, .. } => {
                if low > high {
                    return Err(Error::InvalidBounds {
                        low: *low,
                        high: *high,
                    });
                }
                Ok(())
            }
            Parameter::Normal { std_dev, .. } => {
                if *std_dev <= 0.0 {
                    return Err(Error::InvalidStdDev(*std_dev));
                }
                Ok(())
            }
        }
    }

    /// Draws one value from this parameter's distribution.
    #[must_use]
    pub fn sample(&self, rng: &mut fastrand::Rng) -> ParamValue {
        match self {
            Parameter::Discrete { values, .. } => values[rng.usize(0..values.len())].clone(),
            Parameter::Uniform { low, high, .. } => {
                ParamValue::Float(rng_util::f64_range(rng, *low, *high))
            }
            Parameter::Normal { mean, std_dev, .. } => {
                ParamValue::Float(rng_util::normal(rng, *mean, *std_dev))
            }
        }
    }

    /// Encodes a value into the real used by classifiers.
    ///
    /// Numeric kinds encode as themselves; discrete values encode as their
    /// 0-based index in the declared list (equality is by index).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidValue`] if the value is not a member of a
    /// discrete list or has the wrong kind for a continuous parameter.
    pub fn encode(&self, value: &ParamValue) -> Result<f64> {
        match self {
            Parameter::Discrete { name, values } => values
                .iter()
                .position(|v| v == value)
                .map(|idx| {
                    #[allow(clippy::cast_precision_loss)]
                    let encoded = idx as f64;
                    encoded
                })
                .ok_or_else(|| Error::InvalidValue {
                    name: name.clone(),
                    value: value.to_string(),
                }),
            Parameter::Uniform { name, .. } | Parameter::Normal { name, .. } => {
                value.as_f64().ok_or_else(|| Error::InvalidValue {
                    name: name.clone(),
                    value: value.to_string(),
                })
            }
        }
    }

    /// Decodes an encoded real back into a value.
    ///
    /// The inverse of [`encode`](Self::encode) on continuous kinds. For
    /// discrete kinds the real is rounded to the nearest ordinal index and
    /// clamped to `[0, len - 1]`.
    #[must_use]
    pub fn decode(&self, encoded: f64) -> ParamValue {
        match self {
            Parameter::Discrete { values, .. } => {
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let idx = (encoded.round().max(0.0) as usize).min(values.len() - 1);
                values[idx].clone()
            }
            Parameter::Uniform { .. } | Parameter::Normal { .. } => ParamValue::Float(encoded),
        }
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Parameter::Discrete { name, values } => {
                write!(f, "{name}: discrete({} values)", values.len())
            }
            Parameter::Uniform { name, low, high } => {
                write!(f, "{name}: uniform[{low}, {high})")
            }
            Parameter::Normal {
                name,
                mean,
                std_dev,
            } => write!(f, "{name}: normal({mean}, {std_dev})"),
        }
    }
}
