//! Wave scheduler (§4.9): turns a frozen [`crate::snapshot::SiteSnapshot`]
//! and a set of page indices into rendered HTML, in parallel, under one of
//! two ordering strategies, with the scout thread warming templates ahead
//! of whichever worker reaches them first.

pub mod scout;
pub mod workers;

use crate::collaborators::template::TemplateEngine;
use crate::config::{SchedulerStrategy, StrictMode};
use crate::primitives::SourcePath;
use crate::snapshot::SiteSnapshot;
use rayon::prelude::*;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};

/// One rendered page, or one rendering failure, keyed by its position in
/// [`SiteSnapshot::pages`].
pub struct RenderResult {
    pub rendered: Vec<(usize, String)>,
    pub errors: Vec<(SourcePath, String)>,
}

/// Page indices in the order the scheduler intends to render them.
///
/// `TemplateFirst` (the default, §4.9) batches same-template pages
/// together, largest batch first (ties broken by template name), so the
/// hottest template warms the compiled-template cache before anything
/// else competes for it; `Topological` instead follows the snapshot's
/// precomputed waves, which matters once a future version introduces
/// inter-page render dependencies.
pub fn render_order(snapshot: &SiteSnapshot, strategy: SchedulerStrategy) -> Vec<usize> {
    match strategy {
        SchedulerStrategy::TemplateFirst => {
            let mut templates: Vec<&String> = snapshot.template_groups.keys().collect();
            templates.sort_by(|a, b| snapshot.template_groups[*b].len().cmp(&snapshot.template_groups[*a].len()).then_with(|| a.cmp(b)));
            templates.into_iter().flat_map(|t| snapshot.template_groups[t].iter().copied()).collect()
        }
        SchedulerStrategy::Topological => snapshot.waves.iter().flatten().copied().collect(),
    }
}

/// Render every index in `indices`, in whatever order the caller already
/// sorted them into, using up to `workers` threads (`None` runs
/// sequentially on the calling thread — the planner decided the task
/// count didn't clear the parallelism threshold). `progress` is shared
/// with the scout thread so it can throttle its lookahead against actual
/// render completions.
///
/// Error policy: `StrictMode::Error` aborts on the first render failure;
/// `Warn`/`Off` collect every failure into `RenderResult::errors` and keep
/// going, so one broken page never blocks the rest of the site (§7).
pub fn render_wave(
    snapshot: &SiteSnapshot,
    indices: &[usize],
    engine: &dyn TemplateEngine,
    context_for: impl Fn(&crate::snapshot::PageSnapshot) -> Value + Sync,
    workers: Option<usize>,
    strict: StrictMode,
    progress: &AtomicUsize,
) -> anyhow::Result<RenderResult> {
    let build_one = |&i: &usize| -> (usize, Result<String, (SourcePath, String)>) {
        let page = &snapshot.pages[i];
        let ctx = context_for(page);
        let outcome = engine.render_template(&page.template, &ctx).map_err(|e| (page.source_path.clone(), e.to_string()));
        progress.fetch_add(1, Ordering::Relaxed);
        (i, outcome)
    };

    let outputs: Vec<(usize, Result<String, (SourcePath, String)>)> = match workers {
        Some(n) if n > 1 => {
            let pool = rayon::ThreadPoolBuilder::new().num_threads(n).build()?;
            pool.install(|| indices.par_iter().map(build_one).collect())
        }
        _ => indices.iter().map(build_one).collect(),
    };

    let mut rendered = Vec::with_capacity(outputs.len());
    let mut errors = Vec::new();
    for (i, outcome) in outputs {
        match outcome {
            Ok(html) => rendered.push((i, html)),
            Err((path, message)) => {
                if strict == StrictMode::Error {
                    return Err(anyhow::anyhow!(crate::error::BuildError::Render { path, message }));
                }
                errors.push((path, message));
            }
        }
    }
    Ok(RenderResult { rendered, errors })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::template::ReferenceTemplateEngine;
    use crate::content::page::{Page, PageHandle};
    use crate::content::page_core::PageCore;
    use crate::site::Site;

    fn page(path: &str, template: Option<&str>) -> PageHandle {
        let core = PageCore::from_frontmatter(crate::primitives::SourcePath::new(path), &serde_json::json!({"title": path}), None);
        let mut p = Page::new(core, String::new());
        if let Some(t) = template {
            p.metadata.insert("template".into(), Value::String(t.to_string()));
        }
        PageHandle::Loaded(p)
    }

    fn snapshot_with(pages: Vec<PageHandle>) -> SiteSnapshot {
        let mut site = Site::new(Default::default(), Default::default(), Default::default());
        site.top_level_page_indices = (0..pages.len()).collect();
        site.pages = pages;
        let engine = ReferenceTemplateEngine::new(std::env::temp_dir());
        crate::snapshot::build(&site, &engine, "default")
    }

    #[test]
    fn template_first_order_groups_by_batch_size_not_name() {
        // "b.html" has two pages, "a.html" only one: despite sorting after
        // "a.html" alphabetically, the bigger batch must render first.
        let snapshot = snapshot_with(vec![page("a.md", Some("b.html")), page("c.md", Some("a.html")), page("d.md", Some("b.html"))]);
        let order = render_order(&snapshot, SchedulerStrategy::Topological);
        assert_eq!(order.len(), 3);
        let tf_order = render_order(&snapshot, SchedulerStrategy::TemplateFirst);
        assert_eq!(snapshot.pages[tf_order[0]].template, "b.html");
        assert_eq!(snapshot.pages[tf_order[1]].template, "b.html");
        assert_eq!(snapshot.pages[tf_order[2]].template, "a.html");
    }

    #[test]
    fn template_first_order_breaks_ties_by_name() {
        let snapshot = snapshot_with(vec![page("a.md", Some("b.html")), page("c.md", Some("a.html"))]);
        let tf_order = render_order(&snapshot, SchedulerStrategy::TemplateFirst);
        assert_eq!(snapshot.pages[tf_order[0]].template, "a.html");
        assert_eq!(snapshot.pages[tf_order[1]].template, "b.html");
    }

    #[test]
    fn sequential_render_collects_errors_without_aborting() {
        struct FailingEngine;
        impl TemplateEngine for FailingEngine {
            fn render_template(&self, name: &str, _ctx: &Value) -> anyhow::Result<String> {
                if name == "fail.html" {
                    anyhow::bail!("boom")
                }
                Ok(format!("ok:{name}"))
            }
            fn template_exists(&self, _name: &str) -> bool {
                true
            }
            fn precompile_templates(&self, _names: &[String]) -> usize {
                0
            }
            fn get_dependencies_of(&self, _name: &str) -> Vec<String> {
                Vec::new()
            }
        }

        let snapshot = snapshot_with(vec![page("a.md", Some("ok.html")), page("b.md", Some("fail.html"))]);
        let progress = AtomicUsize::new(0);
        let result = render_wave(&snapshot, &[0, 1], &FailingEngine, |_| Value::Null, None, StrictMode::Off, &progress).unwrap();
        assert_eq!(result.rendered.len(), 1);
        assert_eq!(result.errors.len(), 1);
    }

    #[test]
    fn strict_mode_aborts_on_first_error() {
        struct AlwaysFails;
        impl TemplateEngine for AlwaysFails {
            fn render_template(&self, _name: &str, _ctx: &Value) -> anyhow::Result<String> {
                anyhow::bail!("boom")
            }
            fn template_exists(&self, _name: &str) -> bool {
                true
            }
            fn precompile_templates(&self, _names: &[String]) -> usize {
                0
            }
            fn get_dependencies_of(&self, _name: &str) -> Vec<String> {
                Vec::new()
            }
        }

        let snapshot = snapshot_with(vec![page("a.md", Some("fail.html"))]);
        let progress = AtomicUsize::new(0);
        let result = render_wave(&snapshot, &[0], &AlwaysFails, |_| Value::Null, None, StrictMode::Error, &progress);
        assert!(result.is_err());
    }
}
