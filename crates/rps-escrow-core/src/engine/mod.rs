//! The escrow engine and its supporting state: clock, ledger, registry, and
//! the event log.

mod clock;
mod escrow;
mod events;
mod ledger;
mod registry;

pub use clock::Clock;
pub use escrow::{EscrowEngine, MAX_WINDOW_MINUTES};
pub use events::EscrowEvent;
pub use ledger::BalanceLedger;
pub use registry::GameRegistry;
