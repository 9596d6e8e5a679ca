use std::{collections::BTreeMap, fmt::Debug, sync::Mutex};

/// Hook invoked once per successful lookup, keyed by the normalized city name.
pub trait SearchObserver: Send + Sync + Debug {
    fn record_search(&self, city: &str);
}

/// Normalization applied to city names before they reach an observer.
pub fn normalize_city(city: &str) -> String {
    city.trim().to_lowercase()
}

/// In-memory per-city search counter.
#[derive(Debug, Default)]
pub struct CitySearchCounter {
    counts: Mutex<BTreeMap<String, u64>>,
}

impl CitySearchCounter {
    pub const METRIC_NAME: &'static str = "weather_city_searches_total";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, city: &str) -> u64 {
        self.lock().get(city).copied().unwrap_or(0)
    }

    /// Counts sorted by city name.
    pub fn snapshot(&self) -> Vec<(String, u64)> {
        self.lock()
            .iter()
            .map(|(city, count)| (city.clone(), *count))
            .collect()
    }

    /// Render the counters in the Prometheus text exposition format.
    pub fn render(&self) -> String {
        let mut out = format!(
            "# HELP {name} Total number of weather searches per city\n# TYPE {name} counter\n",
            name = Self::METRIC_NAME
        );
        for (city, count) in self.snapshot() {
            out.push_str(&format!(
                "{}{{city=\"{}\"}} {}\n",
                Self::METRIC_NAME,
                escape_label(&city),
                count
            ));
        }
        out
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, u64>> {
        // A poisoned counter map is still a valid map.
        self.counts.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl SearchObserver for CitySearchCounter {
    fn record_search(&self, city: &str) {
        *self.lock().entry(city.to_string()).or_insert(0) += 1;
    }
}

fn escape_label(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}
