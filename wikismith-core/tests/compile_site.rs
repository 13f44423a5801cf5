//! End-to-end compilation against a directory on disk.

use chrono::{TimeZone, Utc};
use std::fs;
use std::path::Path;
use tempfile::tempdir;
use wikismith_core::{CompileError, Compiler, Config, FsLoader, FsSaver, PageError};

const TEMPLATE: &str = "<html><head><title>Wiki{{prefixedtitle}}</title></head>\n\
<body><h1>{{title}}</h1>\n{{body}}<footer>{{generatedate}}</footer></body></html>\n";

fn write(root: &Path, path: &str, content: &str) {
    let target = root.join(path);
    fs::create_dir_all(target.parent().unwrap()).unwrap();
    fs::write(target, content).unwrap();
}

fn sample_site(root: &Path) {
    write(root, "_template.html", TEMPLATE);
    write(root, "_nav.html", "<span class=\"nav\">[[Index|{{#1|Home}}]]</span>");
    write(
        root,
        "index.md",
        "#title Start\n{{nav}}\n\n#toc\n\n# Intro\n\nSee [[Rust Safety#memory]].\n\n## Details\n",
    );
    write(
        root,
        "Rust Safety.md",
        "{{nav|Back}}\n\nLinks to [[Nowhere]] and [[Index]].\n",
    );
    write(root, "404.md", "Page not found.\n");
    write(root, "css/site.css", "body { margin: 0 }\n");
    fs::write(root.join("logo.png"), [0x89, b'P', b'N', b'G']).unwrap();
    write(root, "notes.txt", "not a page");
}

#[test]
fn test_compile_directory() {
    let input = tempdir().unwrap();
    let output = tempdir().unwrap();
    sample_site(input.path());

    let loader = FsLoader::new(input.path());
    let saver = FsSaver::new(output.path());
    let report = Compiler::new(Config::default(), &loader, &saver)
        .with_generated_at(Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap())
        .compile()
        .unwrap();

    let ids: Vec<&str> = report.pages.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["404", "rust-safety", "index"]);
    assert_eq!(report.assets, vec!["css/site.css", "logo.png"]);
    assert_eq!(report.broken_links, 1);

    let index = fs::read_to_string(output.path().join("index.html")).unwrap();
    assert!(index.starts_with("<html><head><title>Wiki - Start</title></head>\n<body><h1>Start</h1>\n"));
    assert!(index.contains(
        "<p><span class=\"nav\"><a href=\"index.html\" class=\"wiki-link\">Home</a></span></p>\n"
    ));
    assert!(index.contains(
        "<ol class=\"table-of-contents\">\n<li><a href=\"#intro\">Intro</a></li>\n</ol>\n"
    ));
    assert!(index.contains("<h1 id=\"intro\">Intro</h1>\n"));
    assert!(index.contains(
        "<a href=\"rust-safety.html#memory\" class=\"wiki-link\">Rust Safety</a>"
    ));
    assert!(index.ends_with("<footer>Sun, 18 Oct 2026 12:00:00 GMT</footer></body></html>\n"));

    let safety = fs::read_to_string(output.path().join("rust-safety.html")).unwrap();
    assert!(safety.contains("<title>Wiki - rust-safety</title>"));
    assert!(safety.contains("<a href=\"index.html\" class=\"wiki-link\">Back</a>"));
    assert!(safety.contains(
        "<a href=\"404.html#Nowhere\" class=\"wiki-link broken\">Nowhere</a>"
    ));

    assert_eq!(
        fs::read_to_string(output.path().join("css/site.css")).unwrap(),
        "body { margin: 0 }\n"
    );
    assert_eq!(
        fs::read(output.path().join("logo.png")).unwrap(),
        vec![0x89, b'P', b'N', b'G']
    );
    assert!(!output.path().join("notes.html").exists());
    assert!(!output.path().join("_nav.html").exists());
}

#[test]
fn test_output_folder_is_recreated() {
    let input = tempdir().unwrap();
    let output = tempdir().unwrap();
    write(input.path(), "_template.html", "{{body}}");
    write(input.path(), "a.md", "a");
    write(output.path(), "stale.html", "old");

    let loader = FsLoader::new(input.path());
    let saver = FsSaver::new(output.path());
    Compiler::new(Config::default(), &loader, &saver)
        .compile()
        .unwrap();

    assert!(!output.path().join("stale.html").exists());
    assert_eq!(
        fs::read_to_string(output.path().join("a.html")).unwrap(),
        "<p>a</p>\n"
    );
}

#[test]
fn test_failed_run_keeps_previous_output() {
    let input = tempdir().unwrap();
    let output = tempdir().unwrap();
    write(input.path(), "_template.html", "{{body}}");
    write(input.path(), "a.md", "first");

    let loader = FsLoader::new(input.path());
    let saver = FsSaver::new(output.path());
    Compiler::new(Config::default(), &loader, &saver)
        .compile()
        .unwrap();

    write(input.path(), "a.md", "second {{missing}}");
    let err = Compiler::new(Config::default(), &loader, &saver)
        .compile()
        .unwrap_err();

    match err {
        CompileError::Page { path, source } => {
            assert_eq!(path, "a.md");
            assert!(matches!(source, PageError::Include(_)));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(
        fs::read_to_string(output.path().join("a.html")).unwrap(),
        "<p>first</p>\n"
    );
}

#[test]
fn test_output_inside_input() {
    let input = tempdir().unwrap();
    write(input.path(), "_template.html", "{{body}}");
    write(input.path(), "a.md", "a");
    write(input.path(), "style.css", "x");
    write(input.path(), "site/old.css", "y");

    let loader = FsLoader::new(input.path()).excluding("site");
    let saver = FsSaver::new(input.path().join("site"));
    let report = Compiler::new(Config::default(), &loader, &saver)
        .compile()
        .unwrap();

    assert_eq!(report.assets, vec!["style.css"]);
    assert!(input.path().join("site/a.html").exists());
    assert!(!input.path().join("site/old.css").exists());
}

#[test]
fn test_custom_config() {
    let input = tempdir().unwrap();
    let output = tempdir().unwrap();
    write(input.path(), "layout/page.html", "[{{title}}]{{body}}");
    write(input.path(), "notes/one.md", "#title One\n[[two]]");
    write(input.path(), "notes/two.md", "two");
    write(input.path(), "skipped.md", "not selected");

    let config = Config::from_yaml(
        "template: layout/page.html\npages: \"notes/*.md\"\nassets: []\n",
    )
    .unwrap();
    let loader = FsLoader::new(input.path());
    let saver = FsSaver::new(output.path());
    let report = Compiler::new(config, &loader, &saver).compile().unwrap();

    assert_eq!(report.pages.len(), 2);
    assert!(report.assets.is_empty());
    assert_eq!(
        fs::read_to_string(output.path().join("one.html")).unwrap(),
        "[One]<p><a href=\"two.html\" class=\"wiki-link\">two</a></p>\n"
    );
    assert!(!output.path().join("skipped.html").exists());
}
