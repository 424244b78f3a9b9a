//! The discovery source chain, one stage per module, in priority order.

mod asdf;
mod backend;
mod env;
mod local_state;
mod remote_state;
mod remote_workspace;
mod required_version;
mod tfenv;
mod tfswitch;

pub use asdf::AsdfSource;
pub use backend::BackendConstraintsSource;
pub use env::EnvConstraintSource;
pub use local_state::LocalStateSource;
pub use remote_state::RemoteStateSource;
pub use remote_workspace::RemoteWorkspaceSource;
pub use required_version::RequiredVersionSource;
pub use tfenv::TfenvSource;
pub use tfswitch::TfswitchSource;
