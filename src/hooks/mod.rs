//! Hook Router
//!
//! Agent processes report lifecycle events (before a command, around an
//! edit, around spawning a sub-agent). Each event is audited, checked
//! against the coordination registry and answered with a proceed/block
//! decision. Only a duplicate sub-agent spawn can block; everything else
//! proceeds and reports problems through metadata.

pub mod audit;
pub mod denylist;
pub mod router;
pub mod types;

pub use audit::{AuditLog, AuditRecord};
pub use denylist::DangerousCommandDetector;
pub use router::HookRouter;
pub use types::{HookDecision, HookKind, HookPayload, ToolInput, BLOCK_EXIT_CODE};
