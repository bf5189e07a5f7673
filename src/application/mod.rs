//! Workflows over the state schema: migration, injection, and the pieces
//! they share.

pub mod guard;
pub mod injection;
pub mod migration;
pub mod watch;

pub use guard::{Fingerprint, GuardVerdict};
pub use injection::{
    CapitalInjection, InjectionObserver, InjectionOutcome, InjectionReport, InjectionRequest,
    RestartPolicy,
};
pub use migration::{MigrationOutcome, MigrationReport, UnknownSidePolicy};
pub use watch::{TargetBand, WatchOutcome, Watcher};
