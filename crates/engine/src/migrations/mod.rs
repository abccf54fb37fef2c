//! Migration system
//!
//! Discovery of `*.sql` files, the ledger of applied migrations, stub
//! generation and the runner that ties them together.

pub mod definitions;
pub mod discovery;
pub mod generator;
pub mod ledger;
pub mod runner;

pub use definitions::*;
pub use discovery::discover;
pub use generator::{generate, migration_file_name};
pub use ledger::{MigrationLedger, LEDGER_TABLE};
pub use runner::{MigrationRunner, RunnerOptions};
