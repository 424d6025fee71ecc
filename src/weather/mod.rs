//! Weather sampling: one-shot provider lookups on a cancellable timer,
//! normalized into presentation snapshots.

mod provider;
mod sampler;
mod snapshot;

pub use provider::{OpenWeatherMap, ProviderError, WeatherProvider};
pub use sampler::WeatherSampler;
pub use snapshot::{WeatherReading, WeatherSnapshot};
