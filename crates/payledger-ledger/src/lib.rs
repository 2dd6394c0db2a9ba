//! # payledger-ledger
//!
//! **Ledger plane**: durable transaction records and the balance view built
//! on top of them.
//!
//! ## Architecture
//!
//! 1. **LedgerStore**: point lookups plus all-or-nothing [`UnitOfWork`] commits
//! 2. **LedgerWrite**: the closed set of mutations a unit may contain; guarded
//!    writes (status transitions, balance requirements) reject the whole unit
//!    when the record moved on concurrently
//! 3. **InMemoryLedger**: reference backend used by the server and tests
//! 4. **BalanceCache**: per-user memoized [`BalanceSnapshot`], invalidated by
//!    every write path
//!
//! ## Write Flow
//!
//! ```text
//! Settlement → UnitOfWork::new(label).push(..) → LedgerStore::commit()
//!            → BalanceCache::invalidate_cache(user)
//! ```
//!
//! [`BalanceSnapshot`]: payledger_types::BalanceSnapshot

pub mod balance_cache;
pub mod memory;
pub mod store;
pub mod unit_of_work;

pub use balance_cache::{BalanceCache, InMemoryBalanceCache};
pub use memory::InMemoryLedger;
pub use store::LedgerStore;
pub use unit_of_work::{LedgerWrite, UnitOfWork};
