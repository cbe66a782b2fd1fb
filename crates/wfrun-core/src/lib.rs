pub mod error;
pub use error::{CoreError, EstimationError, ResolveError, StoreError};

pub mod host;
pub use host::{HostEstimator, ResourceEstimator, StaticEstimator};

pub mod mail;
pub use mail::{MailRelay, SmtpProbe, StaticRelay};

pub mod store;

pub mod resolve;
pub use resolve::{RawRunArgs, ResolveContext};

pub mod version;

pub mod workflow;
pub use workflow::{EngineRunRequest, Workflow, WorkflowClass, WorkflowError};

pub mod controller;
pub use controller::{Interrupt, InterruptFuture, RunController, RunPhase, ctrl_c_interrupt};

pub mod script;
pub use script::{GenerateRequest, GeneratedScript};
