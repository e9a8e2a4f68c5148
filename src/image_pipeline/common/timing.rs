//! Wall-clock timing of pipeline stages.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tracing::info;

#[derive(Debug, Clone)]
pub struct StepTiming {
    pub name: String,
    pub duration: Duration,
}

/// Ordered record of the stages one enhancement ran through.
#[derive(Debug, Default)]
pub struct PipelineTimings {
    steps: Vec<StepTiming>,
    step_map: HashMap<String, Duration>,
}

impl PipelineTimings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_step(&mut self, name: impl Into<String>, duration: Duration) {
        let name = name.into();
        *self.step_map.entry(name.clone()).or_insert(Duration::ZERO) += duration;
        self.steps.push(StepTiming { name, duration });
    }

    /// Run `f`, record its duration under `name` and hand back its output.
    pub fn measure<T>(&mut self, name: &str, f: impl FnOnce() -> T) -> T {
        let timer = Timer::start(name);
        let out = f();
        let (name, duration) = timer.stop();
        self.add_step(name, duration);
        out
    }

    pub fn total_duration(&self) -> Duration {
        self.steps.iter().map(|s| s.duration).sum()
    }

    pub fn get_step(&self, name: &str) -> Option<Duration> {
        self.step_map.get(name).copied()
    }

    pub fn steps(&self) -> &[StepTiming] {
        &self.steps
    }

    pub fn log_summary(&self) {
        let total = self.total_duration();
        for step in &self.steps {
            let percentage = if total.as_secs_f64() > 0.0 {
                (step.duration.as_secs_f64() / total.as_secs_f64()) * 100.0
            } else {
                0.0
            };
            info!(
                step = %step.name,
                ms = step.duration.as_secs_f64() * 1000.0,
                percent = percentage,
                "Stage timing"
            );
        }
        info!(ms = total.as_secs_f64() * 1000.0, "Total enhancement time");
    }
}

pub struct Timer {
    start: Instant,
    name: String,
}

impl Timer {
    pub fn start(name: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            name: name.into(),
        }
    }

    pub fn stop(self) -> (String, Duration) {
        (self.name, self.start.elapsed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_steps_accumulate() {
        let mut timings = PipelineTimings::new();
        timings.add_step("retinex", Duration::from_millis(5));
        timings.add_step("dehaze", Duration::from_millis(3));
        timings.add_step("retinex", Duration::from_millis(2));

        assert_eq!(timings.steps().len(), 3);
        assert_eq!(timings.get_step("retinex"), Some(Duration::from_millis(7)));
        assert_eq!(timings.total_duration(), Duration::from_millis(10));
        assert_eq!(timings.get_step("clahe"), None);
    }

    #[test]
    fn test_measure_returns_closure_output() {
        let mut timings = PipelineTimings::new();
        let value = timings.measure("sum", || (1..=4).sum::<u32>());
        assert_eq!(value, 10);
        assert_eq!(timings.steps()[0].name, "sum");
    }
}
