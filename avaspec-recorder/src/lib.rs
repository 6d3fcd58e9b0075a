//! Непрерывная запись спектров с AvaSpec в файл `.avsr`.
//!
//! Поток захвата опрашивает прибор и передаёт сканы через ограниченный
//! канал в поток записи, который ведёт [`ScanWriter`](avaspec_core::ScanWriter).

pub mod config;
pub mod error;
pub mod metrics;
pub mod pipeline;

pub use config::*;
pub use error::*;
pub use metrics::*;
pub use pipeline::*;
