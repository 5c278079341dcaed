//! End-to-end incremental build scenarios: each test drives a real
//! [`crucible::Orchestrator`] over a tempdir content tree and inspects the
//! returned [`crucible::BuildStats`] rather than the generator internals,
//! mirroring how a caller of the crate would actually observe rebuild
//! behavior across successive builds.

use crucible::Orchestrator;
use std::fs;
use std::path::Path;
use std::time::Duration;

fn write(path: &Path, contents: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn page_template(root: &Path) {
    write(&root.join("templates/page.html"), "<html><head><title>{{ page.title }}</title></head><body>{{ page.content }}</body></html>");
    write(&root.join("templates/tag_listing.html"), "<html><body><h1>{{ page.title }}</h1></body></html>");
    write(&root.join("templates/tag_index.html"), "<html><body><h1>{{ page.title }}</h1></body></html>");
}

fn post(root: &Path, name: &str, title: &str, tags: &str, body: &str) {
    write(
        &root.join(format!("content/{name}.md")),
        &format!("---\ntitle: {title}\ndate: 2024-01-01T00:00:00Z\ntags: [{tags}]\n---\n{body}\n"),
    );
}

/// Bumping a file's mtime without touching its bytes must not be mistaken
/// for a content change on the next incremental build.
fn touch(path: &Path) {
    let contents = fs::read(path).unwrap();
    std::thread::sleep(Duration::from_millis(10));
    fs::write(path, contents).unwrap();
}

/// S1: a cold build renders everything; a second build with nothing
/// touched renders nothing and pulls every page from cache.
#[test]
fn cold_build_then_fully_cached_rebuild() {
    let dir = tempfile::TempDir::new().unwrap();
    let root = dir.path();
    page_template(root);
    post(root, "post-1", "First post", "rust", "Hello from the first post.");
    post(root, "post-2", "Second post", "rust, tools", "Hello from the second post.");

    let first = Orchestrator::new(root.to_path_buf(), true).unwrap().build().unwrap();
    assert!(first.full_rebuild);
    assert_eq!(first.pages_built, 2);
    assert_eq!(first.pages_cached, 0);
    assert!(root.join("public/post-1/index.html").exists());
    assert!(root.join("public/post-2/index.html").exists());
    assert!(root.join("public/search-index.json").exists());

    let second = Orchestrator::new(root.to_path_buf(), true).unwrap().build().unwrap();
    assert!(!second.full_rebuild);
    assert_eq!(second.pages_built, 0);
    assert_eq!(second.pages_cached, 2);
}

/// S2: editing one page's body rebuilds exactly that page; its sibling is
/// served from the parsed-content and rendered-output caches.
#[test]
fn body_edit_rebuilds_exactly_one_page() {
    let dir = tempfile::TempDir::new().unwrap();
    let root = dir.path();
    page_template(root);
    post(root, "post-1", "First post", "rust", "Original body.");
    post(root, "post-2", "Second post", "rust", "Untouched body.");

    Orchestrator::new(root.to_path_buf(), true).unwrap().build().unwrap();

    post(root, "post-1", "First post", "rust", "Edited body with new words.");
    let stats = Orchestrator::new(root.to_path_buf(), true).unwrap().build().unwrap();

    assert!(!stats.full_rebuild);
    assert_eq!(stats.pages_built, 1);
    assert_eq!(stats.pages_cached, 1);
    let html = fs::read_to_string(root.join("public/post-1/index.html")).unwrap();
    assert!(html.contains("Edited body"));
}

/// S3: editing a page's tags changes taxonomy membership, so the affected
/// tag listing page regenerates alongside the edited post.
#[test]
fn tag_change_regenerates_tag_listing() {
    let dir = tempfile::TempDir::new().unwrap();
    let root = dir.path();
    page_template(root);
    post(root, "post-1", "First post", "rust", "Body one.");
    post(root, "post-2", "Second post", "tools", "Body two.");

    let first = Orchestrator::new(root.to_path_buf(), true).unwrap().build().unwrap();
    assert!(first.full_rebuild);
    assert!(root.join("public/tags/rust/index.html").exists());
    assert!(root.join("public/tags/tools/index.html").exists());

    post(root, "post-2", "Second post", "tools, rust", "Body two.");
    let stats = Orchestrator::new(root.to_path_buf(), true).unwrap().build().unwrap();

    assert!(!stats.full_rebuild);
    let tags_page = fs::read_to_string(root.join("public/tags/rust/index.html")).unwrap();
    assert!(tags_page.contains("rust"));
    assert!(root.join("public/tags/tools/index.html").exists());
}

/// S4: editing a shared template invalidates rendered output for every page
/// using it, but leaves the parsed-content cache alone — only rendering
/// re-runs, not markdown parsing.
#[test]
fn template_edit_hits_every_dependent_page() {
    let dir = tempfile::TempDir::new().unwrap();
    let root = dir.path();
    page_template(root);
    post(root, "post-1", "First post", "rust", "Body one.");
    post(root, "post-2", "Second post", "rust", "Body two.");

    Orchestrator::new(root.to_path_buf(), true).unwrap().build().unwrap();

    write(&root.join("templates/page.html"), "<html><body><article>{{ page.content }}</article></body></html>");
    let stats = Orchestrator::new(root.to_path_buf(), true).unwrap().build().unwrap();

    assert!(!stats.full_rebuild);
    assert_eq!(stats.pages_built, 2);
    let html = fs::read_to_string(root.join("public/post-1/index.html")).unwrap();
    assert!(html.contains("<article>"));
}

/// S5: changing an asset's bytes changes the asset manifest's content hash,
/// which invalidates every rendered-output entry on the next build even
/// though no page source changed.
#[test]
fn asset_change_invalidates_rendered_output() {
    let dir = tempfile::TempDir::new().unwrap();
    let root = dir.path();
    page_template(root);
    post(root, "post-1", "First post", "rust", "Body one.");
    write(&root.join("assets/style.css"), "body { color: black; }");

    let first = Orchestrator::new(root.to_path_buf(), true).unwrap().build().unwrap();
    assert_eq!(first.pages_built, 1);

    write(&root.join("assets/style.css"), "body { color: blue; }");
    let stats = Orchestrator::new(root.to_path_buf(), true).unwrap().build().unwrap();

    assert!(!stats.full_rebuild);
    assert_eq!(stats.pages_built, 1);
    assert_eq!(stats.pages_cached, 0);
}

/// S6: rewriting a file with identical bytes (a touch) changes mtime but
/// not the content hash, so the next incremental build renders nothing.
#[test]
fn touch_without_change_causes_no_rebuild() {
    let dir = tempfile::TempDir::new().unwrap();
    let root = dir.path();
    page_template(root);
    post(root, "post-1", "First post", "rust", "Body one.");

    Orchestrator::new(root.to_path_buf(), true).unwrap().build().unwrap();
    touch(&root.join("content/post-1.md"));
    let stats = Orchestrator::new(root.to_path_buf(), true).unwrap().build().unwrap();

    assert!(!stats.full_rebuild);
    assert_eq!(stats.pages_built, 0);
    assert_eq!(stats.pages_cached, 1);
}
