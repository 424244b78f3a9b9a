//! Toolchain version resolution.
//!
//! The resolver runs an ordered chain of discovery sources over a candidate
//! pool assembled from the upstream release listings. Declarative sources
//! (workspace pin, `required_version`, version files, environment) win
//! outright; the backend constraint table narrows the pool; and when nothing
//! declarative exists, the remote-state guesser probes candidate binaries
//! against the live state. The last resort is the latest release remaining
//! in the pool.

mod backend_hcl;
mod backends;
mod candidates;
mod cloud;
mod guess;
mod resolver;
mod sources;
mod stderr;

pub use backend_hcl::dump_backend_hcl;
pub use backends::{BackendKnowledge, backend_constraints, fingerprint_inputs, lookup};
pub use candidates::{CandidatesError, assemble_candidates, merge_for_opentofu};
pub use cloud::{CloudClient, CloudError, WorkspaceAttributes};
pub use guess::{CommandProbe, ProbeOutcome, StateGuesser, StateProbe};
pub use resolver::{Resolution, Resolver};
pub use sources::{
    AsdfSource, BackendConstraintsSource, EnvConstraintSource, LocalStateSource,
    RemoteStateSource, RemoteWorkspaceSource, RequiredVersionSource, TfenvSource, TfswitchSource,
};
pub use stderr::{ProbeMessage, classify};
