//! Empirical variant scoring (EVS) model training.

mod error;
pub use error::EvsError;

pub mod dataset;
pub use dataset::{Dataset, Label, LoadOptions, Row};

pub mod features;
pub use features::{FeatureSet, resolve_features};

pub mod model;
pub use model::{EvsModel, TrainingSet};

pub mod train;
pub use train::{TrainConfig, TrainReport};
