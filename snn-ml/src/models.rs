//! Model architectures.
//!
//! An [`Architecture`] describes a network by its input shape and class count
//! and knows how to build a fresh [`Trainable`] instance. Concrete
//! architectures implement [`Architecture::build`]; [`BaseModel`] is the bare
//! descriptor with no network behind it.

use crate::error::MlError;
use crate::estimator::Trainable;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Input shape and class count of a model, fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub input_shape: Vec<usize>,
    pub num_classes: usize,
}

impl ModelDescriptor {
    pub fn new(input_shape: impl Into<Vec<usize>>, num_classes: usize) -> Self {
        Self {
            input_shape: input_shape.into(),
            num_classes,
        }
    }
}

/// A buildable model architecture.
pub trait Architecture {
    fn descriptor(&self) -> &ModelDescriptor;

    fn input_shape(&self) -> &[usize] {
        &self.descriptor().input_shape
    }

    fn num_classes(&self) -> usize {
        self.descriptor().num_classes
    }

    /// Construct an untrained model, or `None` if this architecture has no
    /// network definition.
    fn build(&self) -> Option<Box<dyn Trainable>> {
        None
    }

    /// Like [`Architecture::build`], failing with `NotImplemented` when there
    /// is nothing to build.
    fn try_build(&self) -> Result<Box<dyn Trainable>, MlError> {
        self.build().ok_or_else(|| {
            MlError::NotImplemented(format!("{} does not define build()", self.name()))
        })
    }

    /// Short name of the implementing type, e.g. `BaseModel`.
    fn name(&self) -> String {
        short_type_name(std::any::type_name::<Self>()).to_string()
    }
}

/// Strip the module path and generic arguments from a type name.
fn short_type_name(full: &str) -> &str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

impl fmt::Display for dyn Architecture + '_ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Architecture with a descriptor and no network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseModel {
    descriptor: ModelDescriptor,
}

impl BaseModel {
    pub fn new(input_shape: impl Into<Vec<usize>>, num_classes: usize) -> Self {
        Self {
            descriptor: ModelDescriptor::new(input_shape, num_classes),
        }
    }
}

impl Architecture for BaseModel {
    fn descriptor(&self) -> &ModelDescriptor {
        &self.descriptor
    }
}

impl fmt::Display for BaseModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}
