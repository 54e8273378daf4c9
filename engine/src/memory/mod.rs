//! Memory
//!
//! Durable episodic and semantic stores behind the audited `MemoryRouter`,
//! plus the per-run `WorkingMemory` that is never persisted on its own.

pub mod episodic;
pub mod events;
pub mod router;
pub mod semantic;
pub mod working;

pub use events::{EventType, MemoryEvent, StoreKind};
pub use router::MemoryRouter;
pub use working::WorkingMemory;
