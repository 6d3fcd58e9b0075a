//! Драйверы спектрометров AvaSpec AS5216.
//!
//! [`AvsDriver`] - типизированная обёртка над функциями библиотеки
//! производителя. Бэкенды:
//!
//! - [`SimulatedDriver`] (фича `sim`, по умолчанию) - симулятор в процессе;
//! - `As5216Driver` (фича `as5216`) - вызовы библиотеки через `avaspec-sys`.
//!
//! Поверх драйвера работают RAII сессии [`Avs`] и [`Spectrometer`].
//!
//! ```no_run
//! use avaspec_hal::{Avs, SimulatedDriver};
//! use avaspec_types::InitPort;
//!
//! let avs = Avs::open(Box::new(SimulatedDriver::new()), InitPort::Usb)?;
//! let mut spec = avs.activate_first()?;
//! let scope = spec.expose(20.0)?;
//! println!("{} pixels, time label {}", scope.values.len(), scope.time_label);
//! # Ok::<(), avaspec_types::AvsError>(())
//! ```

#[cfg(feature = "as5216")]
pub mod as5216;
pub mod driver;
pub mod session;
#[cfg(feature = "sim")]
pub mod sim;

#[cfg(feature = "as5216")]
pub use as5216::As5216Driver;
pub use driver::*;
pub use session::*;
#[cfg(feature = "sim")]
pub use sim::{SimDevice, SimulatedDriver};
