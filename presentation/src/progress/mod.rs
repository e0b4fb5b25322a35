//! [`EngineProgressPort`](conduct_application::ports::progress::EngineProgressPort)
//! implementations.

pub mod reporter;

pub use reporter::IndicatifProgress;
