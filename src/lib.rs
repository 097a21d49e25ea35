//! A Successive Halving and Classification (SHAC) engine for black-box optimization.
//!
//! This library provides a budgeted, parallel optimizer over mixed
//! discrete/continuous parameter spaces. Instead of modeling the objective,
//! it iteratively refines a posterior over "good" samples by training a
//! cascade of binary classifiers, each on an increasingly selective subset
//! of the search space, and rejection-samples new candidates through that
//! cascade. It supports:
//!
//! - Discrete, uniform-continuous, and normal-continuous parameter types
//! - Parallel generation and evaluation with stable worker ids
//! - Deterministic runs under a fixed seed, independent of worker count
//! - Durable checkpoints with resume
//!
//! # Quick Start
//!
//! ```no_run
//! use shac::{Direction, Parameter, SearchSpace, ShacConfig, ShacEngine};
//!
//! // Search for (x, y) with 2x - y close to 4
//! let space = SearchSpace::new(vec![
//!     Parameter::uniform("x", -5.0, 5.0),
//!     Parameter::uniform("y", -2.0, 2.0),
//! ])
//! .unwrap();
//!
//! let config = ShacConfig::new(100, 10)
//!     .objective(Direction::Minimize)
//!     .seed(0);
//!
//! let mut engine: ShacEngine = ShacEngine::new(space, config);
//! engine
//!     .fit(|_worker_id, sample| {
//!         let x = sample.f64("x").unwrap();
//!         let y = sample.f64("y").unwrap();
//!         Ok::<_, shac::Error>((2.0 * x - y - 4.0).powi(2))
//!     })
//!     .unwrap();
//!
//! // Draw promising candidates through the trained cascade
//! let candidates = engine.predict(20).unwrap();
//! println!("best so far: {:?}", engine.best());
//! # let _ = candidates;
//! ```
//!
//! # Declaring a Search Space
//!
//! A [`SearchSpace`] is an ordered list of [`Parameter`]s with unique names;
//! samples and persisted rows follow the declaration order exactly:
//!
//! ```
//! use shac::{Parameter, SearchSpace};
//!
//! let space = SearchSpace::new(vec![
//!     Parameter::discrete("units", vec![64.into(), 128.into(), 256.into()]),
//!     Parameter::discrete("optimizer", vec!["sgd".into(), "adam".into()]),
//!     Parameter::uniform("lr", 1e-4, 1e-1),
//!     Parameter::normal("init_scale", 0.0, 0.02),
//! ])
//! .unwrap();
//! # let _ = space;
//! ```
//!
//! # How Training Works
//!
//! Each epoch the engine:
//!
//! 1. generates one batch of samples accepted by every classifier trained
//!    so far (rejection sampling),
//! 2. evaluates the batch in parallel with the user function,
//! 3. labels the best half of the batch accepted,
//! 4. trains one more binary classifier on those labels and appends it to
//!    the cascade,
//! 5. checkpoints the dataset and cascade atomically.
//!
//! Every classifier rejects roughly half of the samples that survive its
//! predecessors, so the cascade concentrates sampling on the best
//! `2^-cascade_len` fraction of the space while evaluation spreads the
//! remaining budget over it.
//!
//! # Checkpoints
//!
//! The engine writes its dataset (`dataset.csv`), schema
//! (`parameters.json`), serialized cascade (`classifiers/`), and run state
//! (`meta.json`) to a checkpoint directory at every epoch end, and
//! [`ShacEngine::restore`] resumes from it:
//!
//! ```no_run
//! use shac::ShacEngine;
//!
//! let engine: ShacEngine = ShacEngine::restore("shac").unwrap();
//! let more = engine.predict(50).unwrap();
//! # let _ = more;
//! ```

mod cancel;
mod classifier;
mod dataset;
mod engine;
mod error;
mod evaluator;
mod generator;
mod parameter;
mod persist;
mod rng_util;
mod space;
mod types;

pub use cancel::CancelToken;
pub use classifier::forest::{ForestClassifier, ForestConfig};
pub use classifier::{Classifier, ClassifierMeta};
pub use dataset::{Dataset, Record, stratified_kfold};
pub use engine::{ShacConfig, ShacEngine};
pub use error::{Error, Result};
pub use evaluator::Backend;
pub use parameter::{ParamValue, Parameter};
pub use space::{Sample, SearchSpace};
pub use types::Direction;
