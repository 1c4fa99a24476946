// ABOUTME: Deploy pipeline using the type state pattern.
// ABOUTME: Credentials, connect, provision, publish, record rollback, hand off desired state.

mod connector;
mod context;
mod desired_state;
mod error;
mod identity;
mod overlay;
mod provisioner;
mod publisher;
mod report;
mod rollback;
mod run;
mod state;
mod transitions;

pub use connector::{ClusterSummary, ConnectError};
pub use context::ExecutionContext;
pub use desired_state::{ManifestChange, ManifestError, commit_message};
pub use error::{PipelineError, PipelineErrorKind};
pub use identity::{BuildIdentity, IdentityError, SHORT_COMMIT_LEN, short_commit, version_tag};
pub use overlay::{ImagePin, Overlay, OverlayError};
pub use provisioner::{ComponentOutcome, ProvisionAction, ProvisioningReport};
pub use publisher::build_request;
pub use report::{FailureReport, RunSummary};
pub use rollback::RollbackRecord;
pub use run::Pipeline;
pub use state::{Connected, HandedOff, Loaded, Provisioned, Published, Recorded};
