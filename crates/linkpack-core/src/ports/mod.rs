//! Ports - 抽象化レイヤー
//!
//! Hexagonal Architecture の「ポート」を定義します。
//! オーケストレーター（app）はここの trait にだけ依存し、
//! 実装（impls）は起動時に差し込みます。

pub mod archiver;
pub mod clock;
pub mod id_generator;
pub mod link_fetcher;
pub mod task_store;

pub use self::archiver::{ArchiveLocation, Archiver};
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::link_fetcher::LinkFetcher;
pub use self::task_store::TaskStore;
