#![deny(clippy::unwrap_used)]

/// Build options, threaded explicitly into the builder and into every task
/// execution instead of living in process-global state.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Include address-sanitizer flags where the toolchain supports them.
    pub asan: bool,
    /// Treat every object file as stale and recompile everything.
    pub clean: bool,
    /// Echo the commands being run.
    pub verbose: bool,
    /// Worker count override. Defaults to the number of logical CPUs.
    pub jobs: Option<usize>,
}

impl BuildOptions {
    pub fn worker_count(&self) -> usize {
        self.jobs.unwrap_or_else(num_cpus::get).max(1)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn worker_count_defaults_to_cpus() {
        let options = BuildOptions::default();
        assert!(options.worker_count() >= 1);
    }

    #[test]
    fn worker_count_honors_jobs_override() {
        let options = BuildOptions {
            jobs: Some(3),
            ..Default::default()
        };
        assert_eq!(options.worker_count(), 3);
    }

    #[test]
    fn worker_count_never_zero() {
        let options = BuildOptions {
            jobs: Some(0),
            ..Default::default()
        };
        assert_eq!(options.worker_count(), 1);
    }
}
