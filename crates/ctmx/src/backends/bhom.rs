//! 📣 BMC Helix Operations Manager: one alert, one event, one priority.

mod bhom_sink;

pub use bhom_sink::BhomSinkConfig;
pub(crate) use bhom_sink::BhomSink;
