//! Scout thread (§4.9, §9 "scout usefulness bound"): warms the template
//! cache ahead of the render workers so the first page of each template
//! group never pays a cold-compile cost on the critical path.
//!
//! Deliberately throttled: racing arbitrarily far ahead of the workers'
//! actual progress would spend time warming templates that won't be
//! needed for minutes, while contending with the workers for the
//! template engine's internal locks. `lookahead` bounds how many pages'
//! worth of attention-order progress the scout is allowed to get ahead by.

use crate::collaborators::template::TemplateEngine;
use crate::snapshot::ScoutHint;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Precompile `hints` in descending priority order, pausing whenever the
/// scout has gotten more than `lookahead` pages ahead of `attention_progress`
/// (the count of pages the workers have finished, in attention order).
pub fn run(engine: &dyn TemplateEngine, hints: &[ScoutHint], attention_progress: &AtomicUsize, lookahead: usize) {
    let mut ordered: Vec<&ScoutHint> = hints.iter().collect();
    ordered.sort_by(|a, b| b.priority.cmp(&a.priority));

    let mut pages_warmed = 0usize;
    for hint in ordered {
        while pages_warmed > attention_progress.load(Ordering::Relaxed) + lookahead {
            std::thread::sleep(POLL_INTERVAL);
        }
        let mut names = Vec::with_capacity(1 + hint.partial_paths.len());
        names.push(hint.template_path.clone());
        names.extend(hint.partial_paths.iter().cloned());
        engine.precompile_templates(&names);
        pages_warmed += hint.pages_using;
    }
}

/// Spawn the scout as a background thread. The returned handle should be
/// joined after the render wave completes; a scout that's still warming
/// templates nobody asked for should simply run to completion rather than
/// be killed mid-compile.
pub fn spawn(engine: Arc<dyn TemplateEngine>, hints: Vec<ScoutHint>, attention_progress: Arc<AtomicUsize>, lookahead: usize) -> JoinHandle<()> {
    std::thread::spawn(move || run(engine.as_ref(), &hints, &attention_progress, lookahead))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingEngine {
        precompiled: Mutex<Vec<Vec<String>>>,
    }

    impl TemplateEngine for RecordingEngine {
        fn render_template(&self, _name: &str, _context: &serde_json::Value) -> anyhow::Result<String> {
            Ok(String::new())
        }
        fn template_exists(&self, _name: &str) -> bool {
            true
        }
        fn precompile_templates(&self, names: &[String]) -> usize {
            self.precompiled.lock().unwrap().push(names.to_vec());
            names.len()
        }
        fn get_dependencies_of(&self, _name: &str) -> Vec<String> {
            Vec::new()
        }
    }

    #[test]
    fn warms_highest_priority_template_first() {
        let engine = RecordingEngine { precompiled: Mutex::new(Vec::new()) };
        let hints = vec![
            ScoutHint { template_path: "low.html".into(), partial_paths: vec![], pages_using: 1, priority: 1 },
            ScoutHint { template_path: "high.html".into(), partial_paths: vec!["base.html".into()], pages_using: 5, priority: 5 },
        ];
        let progress = Arc::new(AtomicUsize::new(usize::MAX / 2));
        run(&engine, &hints, &progress, 1000);

        let calls = engine.precompiled.lock().unwrap();
        assert_eq!(calls[0], vec!["high.html".to_string(), "base.html".to_string()]);
        assert_eq!(calls[1], vec!["low.html".to_string()]);
    }

    #[test]
    fn empty_hints_warms_nothing() {
        let engine = RecordingEngine { precompiled: Mutex::new(Vec::new()) };
        let progress = Arc::new(AtomicUsize::new(0));
        run(&engine, &[], &progress, 10);
        assert!(engine.precompiled.lock().unwrap().is_empty());
    }
}
