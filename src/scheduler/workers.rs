//! Worker-count auto-tuning (§4.9, §6.7).
//!
//! Three axes pick a worker count: the kind of work (CPU-bound rendering,
//! I/O-bound postprocess writes, a mixed build), the environment (CI boxes
//! are typically throttled to a fixed core count; production build
//! machines can be pushed harder; a laptop should leave headroom for the
//! rest of the desktop), and the actual task count, which can make the
//! whole question moot below a threshold.

/// CI indicator environment variables consulted, in order, when
/// `CRUCIBLE_ENV` isn't set. Any one present (to any value) is enough.
const CI_INDICATOR_VARS: &[&str] = &[
    "CI",
    "GITHUB_ACTIONS",
    "GITLAB_CI",
    "CIRCLECI",
    "TRAVIS",
    "JENKINS_URL",
    "BUILDKITE",
    "CODEBUILD_BUILD_ID",
    "TF_BUILD",
    "APPVEYOR",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Ci,
    Local,
    Production,
}

impl Environment {
    /// `CRUCIBLE_ENV` override first (`ci`/`local`/`production`, any case);
    /// otherwise any CI indicator variable present means `Ci`; otherwise
    /// `Local`.
    pub fn detect() -> Self {
        if let Ok(v) = std::env::var("CRUCIBLE_ENV") {
            match v.to_lowercase().as_str() {
                "ci" => return Environment::Ci,
                "local" => return Environment::Local,
                "production" => return Environment::Production,
                _ => {}
            }
        }
        if CI_INDICATOR_VARS.iter().any(|v| std::env::var_os(v).is_some()) {
            return Environment::Ci;
        }
        Environment::Local
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkloadType {
    CpuBound,
    IoBound,
    Mixed,
}

struct Tuning {
    threshold: usize,
    min: usize,
    max: usize,
    cpu_fraction: f64,
}

fn tuning_for(workload: WorkloadType, env: Environment) -> Tuning {
    match (workload, env) {
        (WorkloadType::CpuBound, Environment::Ci) => Tuning { threshold: 5, min: 2, max: 2, cpu_fraction: 1.0 },
        (WorkloadType::CpuBound, Environment::Local) => Tuning { threshold: 5, min: 2, max: 4, cpu_fraction: 0.5 },
        (WorkloadType::CpuBound, Environment::Production) => Tuning { threshold: 5, min: 2, max: 8, cpu_fraction: 0.5 },
        (WorkloadType::IoBound, Environment::Ci) => Tuning { threshold: 20, min: 2, max: 4, cpu_fraction: 1.0 },
        (WorkloadType::IoBound, Environment::Local) => Tuning { threshold: 20, min: 2, max: 8, cpu_fraction: 0.75 },
        (WorkloadType::IoBound, Environment::Production) => Tuning { threshold: 20, min: 2, max: 10, cpu_fraction: 0.75 },
        (WorkloadType::Mixed, Environment::Ci) => Tuning { threshold: 5, min: 2, max: 2, cpu_fraction: 1.0 },
        (WorkloadType::Mixed, Environment::Local) => Tuning { threshold: 5, min: 2, max: 6, cpu_fraction: 0.5 },
        (WorkloadType::Mixed, Environment::Production) => Tuning { threshold: 5, min: 2, max: 10, cpu_fraction: 0.5 },
    }
}

/// `None` means "run sequentially" — `task_count` didn't clear the
/// workload's threshold, so spinning up a pool would cost more than it
/// saves. `Some(n)` is always in `[1, task_count]`.
pub fn worker_count(workload: WorkloadType, task_count: usize, cpus: usize, override_count: usize) -> Option<usize> {
    if task_count == 0 {
        return None;
    }
    if override_count > 0 {
        return Some(override_count.clamp(1, task_count));
    }

    let env = Environment::detect();
    let tuning = tuning_for(workload, env);
    if task_count < tuning.threshold {
        return None;
    }

    let raw = (cpus as f64 * tuning.cpu_fraction).round() as usize;
    let workers = raw.clamp(tuning.min, tuning.max);
    Some(workers.clamp(1, task_count))
}
