//! Compilation orchestration: discovers pages, renders them and writes the site.
//!
//! Everything is read and rendered before the output folder is touched, so
//! a failing run leaves the previous output in place.

use crate::config::Config;
use crate::include::{IncludeCache, IncludeError, IncludeExpander};
use crate::loader::{LoadError, Loader};
use crate::markdown::{MarkdownEngine, RenderEnv, TocGenerator, Token, TokenKind};
use crate::page::Page;
use crate::pragma::extract_pragmas;
use crate::saver::{SaveError, Saver};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;

/// `generatedate` marker format, e.g. `Sun, 18 Oct 2026 12:00:00 GMT`
const DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

#[derive(Error, Debug)]
pub enum PageError {
    #[error("Failed to load page: {0}")]
    Load(#[from] LoadError),

    #[error("Include expansion failed: {0}")]
    Include(#[from] IncludeError),
}

#[derive(Error, Debug)]
pub enum CompileError {
    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    #[error("Save error: {0}")]
    Save(#[from] SaveError),

    #[error("Duplicate page id '{id}' ({first} and {second})")]
    DuplicatePage {
        id: String,
        first: String,
        second: String,
    },

    #[error("Failed to compile {path}: {source}")]
    Page {
        path: String,
        #[source]
        source: PageError,
    },
}

/// State shared by all pages of one run. Built fresh for every run.
#[derive(Debug, Default)]
pub struct CompileContext {
    /// Ids of every page in the run
    pub env: RenderEnv,
    pub includes: IncludeCache,
}

impl CompileContext {
    pub fn new(pages: &[Page]) -> Self {
        Self {
            env: RenderEnv::new(pages.iter().map(|p| p.id.clone())),
            includes: IncludeCache::new(),
        }
    }
}

/// Output of a single page, before template substitution
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub body: String,
    pub broken_links: usize,
}

/// Summary of a finished run
#[derive(Debug, Clone, Serialize)]
pub struct CompileReport {
    pub pages: Vec<Page>,
    pub assets: Vec<String>,
    pub broken_links: usize,
}

/// Site compiler
pub struct Compiler<'a> {
    config: Config,
    loader: &'a dyn Loader,
    saver: &'a dyn Saver,
    engine: MarkdownEngine,
    generated_at: Option<DateTime<Utc>>,
}

impl<'a> Compiler<'a> {
    pub fn new(config: Config, loader: &'a dyn Loader, saver: &'a dyn Saver) -> Self {
        Self {
            config,
            loader,
            saver,
            engine: MarkdownEngine::wiki(),
            generated_at: None,
        }
    }

    /// Fix the time stamped into `{{generatedate}}` (defaults to now)
    pub fn with_generated_at(mut self, at: DateTime<Utc>) -> Self {
        self.generated_at = Some(at);
        self
    }

    /// Run one compilation
    pub fn compile(&self) -> Result<CompileReport, CompileError> {
        let generated_at = self.generated_at.unwrap_or_else(Utc::now);
        let template = self.loader.load(&self.config.template)?;

        let mut pages = self.discover_pages()?;
        tracing::info!("Found {} pages", pages.len());

        let mut ctx = CompileContext::new(&pages);
        let mut outputs = Vec::with_capacity(pages.len());
        let mut broken_links = 0;

        for page in &mut pages {
            tracing::debug!("Compiling {} ({})", page.id, page.source_path);
            let rendered =
                self.compile_page(page, &mut ctx)
                    .map_err(|source| CompileError::Page {
                        path: page.source_path.clone(),
                        source,
                    })?;
            broken_links += rendered.broken_links;
            let html = fill_template(&template, &page.title, &rendered.body, &generated_at);
            outputs.push((page.output_path(), html));
        }

        let assets = self.load_assets()?;

        self.saver.recreate_folder()?;
        for (path, html) in &outputs {
            self.saver.save(path, html)?;
        }
        for (path, bytes) in &assets {
            tracing::debug!("Copying asset {}", path);
            self.saver.save_binary(path, bytes)?;
        }

        tracing::info!(
            "Compiled {} pages and {} assets ({} broken links)",
            pages.len(),
            assets.len(),
            broken_links
        );

        Ok(CompileReport {
            pages,
            assets: assets.into_iter().map(|(path, _)| path).collect(),
            broken_links,
        })
    }

    /// Create a page record for every source file, before any is read
    pub fn discover_pages(&self) -> Result<Vec<Page>, CompileError> {
        let mut pages: Vec<Page> = Vec::new();
        let mut seen: HashMap<String, usize> = HashMap::new();

        for path in self.loader.glob(&self.config.pages)? {
            let page = Page::from_filename(&path);
            if let Some(&idx) = seen.get(&page.id) {
                return Err(CompileError::DuplicatePage {
                    id: page.id,
                    first: pages[idx].source_path.clone(),
                    second: path,
                });
            }
            seen.insert(page.id.clone(), pages.len());
            pages.push(page);
        }

        Ok(pages)
    }

    /// Load, expand and render one page. Sets the page's source, processed
    /// text and title along the way.
    pub fn compile_page(
        &self,
        page: &mut Page,
        ctx: &mut CompileContext,
    ) -> Result<RenderedPage, PageError> {
        let raw = self.loader.load(&page.source_path)?;
        let expanded = IncludeExpander::new(&mut ctx.includes)
            .with_limit(self.config.include_limit)
            .expand(&raw, self.loader)?;
        page.raw_source = Some(raw);

        let (text, pragmas) = extract_pragmas(&expanded);
        if let Some(title) = pragmas.title {
            page.title = title;
        }

        let tokens = self.engine.tokenize(&text, &ctx.env);
        let tokens = TocGenerator::new(&self.engine).rewrite(&tokens, &ctx.env);
        page.processed_text = Some(text);

        Ok(RenderedPage {
            broken_links: count_broken_links(&tokens),
            body: self.engine.render(&tokens),
        })
    }

    fn load_assets(&self) -> Result<Vec<(String, Vec<u8>)>, CompileError> {
        let mut assets: Vec<(String, Vec<u8>)> = Vec::new();
        for pattern in &self.config.assets {
            for path in self.loader.glob(pattern)? {
                if assets.iter().any(|(existing, _)| *existing == path) {
                    continue;
                }
                let bytes = self.loader.load_binary(&path)?;
                assets.push((path, bytes));
            }
        }
        Ok(assets)
    }
}

/// Substitute the page template markers. `{{body}}` goes last so page
/// content is never scanned for markers.
pub fn fill_template(
    template: &str,
    title: &str,
    body: &str,
    generated_at: &DateTime<Utc>,
) -> String {
    let date = generated_at.format(DATE_FORMAT).to_string();
    template
        .replace("{{prefixedtitle}}", &format!(" - {title}"))
        .replace("{{title}}", title)
        .replace("{{generatedate}}", &date)
        .replace("{{body}}", body)
}

fn count_broken_links(tokens: &[Token]) -> usize {
    tokens
        .iter()
        .filter_map(|token| token.children.as_deref())
        .flatten()
        .filter(|child| {
            child.kind == TokenKind::LinkOpen
                && child
                    .attr_get("class")
                    .is_some_and(|class| class.split_whitespace().any(|c| c == "broken"))
        })
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::expand_braces;
    use chrono::TimeZone;
    use glob::Pattern;
    use std::cell::RefCell;
    use std::collections::BTreeMap;

    struct MemoryLoader {
        files: BTreeMap<String, String>,
    }

    impl MemoryLoader {
        fn new(files: &[(&str, &str)]) -> Self {
            Self {
                files: files
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            }
        }
    }

    impl Loader for MemoryLoader {
        fn load(&self, path: &str) -> Result<String, LoadError> {
            self.files.get(path).cloned().ok_or_else(|| LoadError::NotFound {
                path: path.to_string(),
            })
        }

        fn load_binary(&self, path: &str) -> Result<Vec<u8>, LoadError> {
            self.load(path).map(String::into_bytes)
        }

        fn glob(&self, pattern: &str) -> Result<Vec<String>, LoadError> {
            let patterns: Vec<Pattern> = expand_braces(pattern)
                .iter()
                .map(|p| Pattern::new(p).unwrap())
                .collect();
            Ok(self
                .files
                .keys()
                .filter(|path| patterns.iter().any(|p| p.matches(path)))
                .cloned()
                .collect())
        }
    }

    #[derive(Default)]
    struct MemorySaver {
        files: RefCell<BTreeMap<String, Vec<u8>>>,
        recreated: RefCell<usize>,
    }

    impl MemorySaver {
        fn text(&self, path: &str) -> String {
            String::from_utf8(self.files.borrow()[path].clone()).unwrap()
        }
    }

    impl Saver for MemorySaver {
        fn save(&self, path: &str, content: &str) -> Result<(), SaveError> {
            self.save_binary(path, content.as_bytes())
        }

        fn save_binary(&self, path: &str, content: &[u8]) -> Result<(), SaveError> {
            self.files
                .borrow_mut()
                .insert(path.to_string(), content.to_vec());
            Ok(())
        }

        fn recreate_folder(&self) -> Result<(), SaveError> {
            self.files.borrow_mut().clear();
            *self.recreated.borrow_mut() += 1;
            Ok(())
        }
    }

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap()
    }

    fn compile(files: &[(&str, &str)]) -> (Result<CompileReport, CompileError>, MemorySaver) {
        let loader = MemoryLoader::new(files);
        let saver = MemorySaver::default();
        let result = Compiler::new(Config::default(), &loader, &saver)
            .with_generated_at(fixed_time())
            .compile();
        (result, saver)
    }

    #[test]
    fn test_fill_template() {
        let out = fill_template(
            "<title>Wiki{{prefixedtitle}}</title><h1>{{title}}</h1>{{body}}<p>{{generatedate}}</p>",
            "Home",
            "<p>{{title}}</p>",
            &fixed_time(),
        );
        assert_eq!(
            out,
            "<title>Wiki - Home</title><h1>Home</h1><p>{{title}}</p><p>Sun, 18 Oct 2026 12:00:00 GMT</p>"
        );
    }

    #[test]
    fn test_compile_site() {
        let (result, saver) = compile(&[
            ("_template.html", "<title>{{title}}</title>\n{{body}}"),
            ("_nav.html", "[[Home]] | [[{{#1|About}}]]"),
            ("Home.md", "#title Welcome\n\n{{nav}}\n"),
            ("about.md", "See [[Missing]]."),
            ("style.css", "body {}"),
        ]);
        let report = result.unwrap();

        let ids: Vec<&str> = report.pages.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["home", "about"]);
        assert_eq!(report.assets, vec!["style.css"]);
        assert_eq!(report.broken_links, 1);

        assert_eq!(
            saver.text("home.html"),
            "<title>Welcome</title>\n<p><a href=\"home.html\" class=\"wiki-link\">Home</a> | \
             <a href=\"about.html\" class=\"wiki-link\">About</a></p>\n"
        );
        assert_eq!(
            saver.text("about.html"),
            "<title>about</title>\n<p>See <a href=\"missing.html\" class=\"wiki-link broken\">Missing</a>.</p>\n"
        );
        assert_eq!(saver.text("style.css"), "body {}");
        assert_eq!(*saver.recreated.borrow(), 1);
    }

    #[test]
    fn test_broken_links_use_404_page() {
        let (result, saver) = compile(&[
            ("_template.html", "{{body}}"),
            ("404.md", "Not here"),
            ("index.md", "[[Gone]]"),
        ]);
        assert_eq!(result.unwrap().broken_links, 1);
        assert_eq!(
            saver.text("index.html"),
            "<p><a href=\"404.html#Gone\" class=\"wiki-link broken\">Gone</a></p>\n"
        );
    }

    #[test]
    fn test_page_error_leaves_output_untouched() {
        let (result, saver) = compile(&[
            ("_template.html", "{{body}}"),
            ("a.md", "fine"),
            ("b.md", "{{missing}}"),
        ]);
        match result {
            Err(CompileError::Page { path, source }) => {
                assert_eq!(path, "b.md");
                assert!(matches!(
                    source,
                    PageError::Include(IncludeError::Load(LoadError::NotFound { .. }))
                ));
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(*saver.recreated.borrow(), 0);
        assert!(saver.files.borrow().is_empty());
    }

    #[test]
    fn test_include_cycle_is_fatal() {
        let (result, _) = compile(&[
            ("_template.html", "{{body}}"),
            ("_loop.html", "{{loop}}"),
            ("a.md", "{{loop}}"),
        ]);
        assert!(matches!(
            result,
            Err(CompileError::Page {
                source: PageError::Include(IncludeError::Overflow { limit: 500 }),
                ..
            })
        ));
    }

    #[test]
    fn test_missing_template() {
        let (result, _) = compile(&[("a.md", "x")]);
        assert!(matches!(
            result,
            Err(CompileError::Load(LoadError::NotFound { ref path })) if path == "_template.html"
        ));
    }

    #[test]
    fn test_duplicate_page_ids() {
        let (result, _) = compile(&[
            ("_template.html", "{{body}}"),
            ("My Page.md", "one"),
            ("my-page.md", "two"),
        ]);
        assert!(matches!(
            result,
            Err(CompileError::DuplicatePage { ref id, .. }) if id == "my-page"
        ));
    }

    #[test]
    fn test_compile_page_updates_page() {
        let loader = MemoryLoader::new(&[("a.md", "#title Alpha\n# Head\n#toc\n")]);
        let saver = MemorySaver::default();
        let compiler = Compiler::new(Config::default(), &loader, &saver);

        let mut page = Page::from_filename("a.md");
        let mut ctx = CompileContext::new(std::slice::from_ref(&page));
        let rendered = compiler.compile_page(&mut page, &mut ctx).unwrap();

        assert_eq!(page.title, "Alpha");
        assert_eq!(page.raw_source.as_deref(), Some("#title Alpha\n# Head\n#toc\n"));
        assert_eq!(page.processed_text.as_deref(), Some("\n# Head\n#toc\n"));
        assert_eq!(
            rendered.body,
            "<h1 id=\"head\">Head</h1>\n<p>\n<ol class=\"table-of-contents\">\n\
             <li><a href=\"#head\">Head</a></li>\n</ol>\n</p>\n"
        );
        assert_eq!(rendered.broken_links, 0);
    }
}
