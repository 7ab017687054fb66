//! Cross-agent coordination state
//!
//! The registry is the single owner of which agents are active, which
//! files each of them is editing and what results they have shared.
//! Every mutation is serialized through one lock and never waits on I/O
//! while holding it.

pub mod registry;
pub mod similarity;
pub mod types;

pub use registry::CoordinationRegistry;
pub use similarity::{token_overlap, tokenize};
pub use types::{AgentWorkState, DuplicateMatch, RegistrySnapshot, SharedArtifact};
