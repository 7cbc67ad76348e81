use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, trace};

use super::codegen::CodeGenerator;
use super::node::build_markup_tree;
use super::normalization::{NormalizedLine, Normalizer};
use super::registry::{FilterRegistry, TextBlockRegistry};
use super::runtime::{identity_translation, object_attributes, FunctionRegistry, HostRuntime, TeraRuntime};
use super::{Bindings, MarkupError};
use crate::cache::{ArtifactCache, TimestampCache};
use crate::config::MarkupConfig;
use crate::tree::TreeBuiltHook;

static BETWEEN_TAGS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r">\s+<").expect("valid compress regex"));

/// Host template code produced by the compiler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledTemplate {
    /// Name the runtime knows the template by (the source path, or `inline`)
    pub name: String,
    pub code: String,
    /// `F<n>:` listing of the normalized source, present in debug mode
    pub listing: Option<String>,
}

/// Compiles markup and renders the result through a [HostRuntime].
///
/// An engine owns its configuration, registries and bindings; clones are independent.
#[derive(Clone)]
pub struct MarkupEngine {
    config: MarkupConfig,
    root: PathBuf,
    blocks: TextBlockRegistry,
    filters: FilterRegistry,
    functions: FunctionRegistry,
    bindings: Bindings,
    runtime: Arc<dyn HostRuntime>,
    on_tree_built: Option<TreeBuiltHook>,
    include_depth: usize,
}

impl MarkupEngine {
    /// Engine resolving templates and includes under `root`.
    pub fn new(config: MarkupConfig, root: impl Into<PathBuf>) -> Self {
        MarkupEngine {
            config,
            root: root.into(),
            blocks: TextBlockRegistry::with_defaults(),
            filters: FilterRegistry::new(),
            functions: FunctionRegistry::new(),
            bindings: Bindings::new(),
            runtime: Arc::new(TeraRuntime),
            on_tree_built: None,
            include_depth: 0,
        }
    }

    pub fn with_runtime(mut self, runtime: impl HostRuntime + 'static) -> Self {
        self.runtime = Arc::new(runtime);
        self
    }

    /// Call `hook` every time a source is actually compiled (i.e. on cache misses).
    pub fn on_tree_built(mut self, hook: TreeBuiltHook) -> Self {
        self.on_tree_built = Some(hook);
        self
    }

    pub fn config(&self) -> &MarkupConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut MarkupConfig {
        &mut self.config
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    pub fn bindings_mut(&mut self) -> &mut Bindings {
        &mut self.bindings
    }

    /// Bind `name` for every later render.
    pub fn assign(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.bindings.assign(name, value);
        self
    }

    pub fn text_blocks(&self) -> &TextBlockRegistry {
        &self.blocks
    }

    pub fn register_block<F>(&mut self, name: impl Into<String>, transform: F) -> &mut Self
    where
        F: Fn(&str) -> Result<String, String> + Send + Sync + 'static,
    {
        self.blocks.register(name, transform);
        self
    }

    pub fn unregister_block(&mut self, name: &str) -> bool {
        self.blocks.unregister(name)
    }

    pub fn register_filter<F>(&mut self, name: impl Into<String>, filter: F) -> &mut Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.filters.register(name, filter);
        self
    }

    pub fn unregister_filter(&mut self, name: &str) -> bool {
        self.filters.unregister(name)
    }

    /// Make a function callable from template code.
    pub fn register_function<F>(&mut self, name: impl Into<String>, function: F) -> &mut Self
    where
        F: Fn(&HashMap<String, Value>) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.functions.register(name, function);
        self
    }

    /// Install the function behind `$` translations.
    pub fn set_translator<F>(&mut self, translate: F) -> &mut Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        let name = self.config.translate_function.clone();
        self.functions.register(name, move |args| {
            let text = args.get("text").and_then(Value::as_str).unwrap_or_default();
            Ok(Value::String(translate(text)))
        });
        self
    }

    /// Compile markup source that does not come from a file.
    pub fn compile(&self, source: &str) -> Result<CompiledTemplate, MarkupError> {
        self.compile_named("inline", source)
    }

    /// Compile a template file, reusing the compiled artifact while it is newer than the
    /// source. Debug mode and `no_cache` always recompile.
    pub fn compile_file(&self, path: impl AsRef<Path>) -> Result<CompiledTemplate, MarkupError> {
        let path = self.resolve(path.as_ref())?;
        let name = path.display().to_string();
        let cache = self.cache();
        if let Some(cache) = &cache {
            if let Some(code) = cache.lookup(&path)? {
                return Ok(CompiledTemplate {
                    name,
                    code,
                    listing: None,
                });
            }
        }

        let source = std::fs::read_to_string(&path).map_err(|source| MarkupError::Io {
            path: path.clone(),
            source,
        })?;
        let template = self.compile_named(&name, &source)?;
        if let Some(cache) = &cache {
            cache.store(&path, &template.code)?;
        }
        Ok(template)
    }

    /// Run compiled code with `bindings`.
    pub fn render(
        &self,
        template: &CompiledTemplate,
        bindings: &Bindings,
    ) -> Result<String, MarkupError> {
        let functions = self.render_functions(bindings);
        let mut output =
            self.runtime
                .execute(&template.name, &template.code, bindings, &functions)?;
        if self.config.compress {
            output = BETWEEN_TAGS.replace_all(&output, "><").into_owned();
        }
        if let Some(listing) = &template.listing {
            output.push('\n');
            output.push_str(listing);
        }
        Ok(output)
    }

    /// Compile and render source text with the engine's bindings.
    pub fn render_source(&self, source: &str) -> Result<String, MarkupError> {
        self.render(&self.compile(source)?, &self.bindings)
    }

    /// Compile and render a template file with the engine's bindings.
    pub fn fetch(&self, path: impl AsRef<Path>) -> Result<String, MarkupError> {
        self.fetch_with(path.as_ref(), &self.bindings)
    }

    /// Delete every compiled artifact, returning how many were removed.
    pub fn clear_compiled(&self) -> Result<usize, MarkupError> {
        Ok(self.timestamp_cache().clear()?)
    }

    /// Path of the compiled artifact for a template file.
    pub fn compiled_path(&self, path: impl AsRef<Path>) -> Result<PathBuf, MarkupError> {
        let path = self.resolve(path.as_ref())?;
        Ok(self.timestamp_cache().artifact_path(&path))
    }

    /// Locate a template: as given, then under the root, then under the root with the
    /// template extension added.
    pub fn resolve(&self, path: &Path) -> Result<PathBuf, MarkupError> {
        let candidates = [
            path.to_path_buf(),
            self.root.join(path),
            self.root
                .join(format!("{}.{}", path.display(), self.config.extension)),
        ];
        candidates
            .iter()
            .find(|candidate| candidate.is_file())
            .cloned()
            .ok_or_else(|| MarkupError::SourceNotFound {
                path: self.root.join(path),
            })
    }

    fn fetch_with(&self, path: &Path, bindings: &Bindings) -> Result<String, MarkupError> {
        let template = self.compile_file(path)?;
        self.render(&template, bindings)
    }

    fn compile_named(&self, name: &str, source: &str) -> Result<CompiledTemplate, MarkupError> {
        let normalizer = Normalizer {
            root: &self.root,
            unit: self.config.indent,
            extension: &self.config.extension,
            debug: self.config.debug,
            max_passes: self.config.max_passes,
        };
        let lines = normalizer.normalize(source)?;
        let tree = build_markup_tree(&lines, self.config.indent);
        if let Some(hook) = &self.on_tree_built {
            hook();
        }
        let code = CodeGenerator::new(&tree, &lines, &self.config, &self.blocks).generate()?;
        let code = self.filters.apply(&code);
        debug!(name, nodes = tree.len(), "markup compiled");

        Ok(CompiledTemplate {
            name: name.to_string(),
            code,
            listing: self.config.debug.then(|| listing(&lines)),
        })
    }

    fn timestamp_cache(&self) -> TimestampCache {
        TimestampCache::new(
            &self.root,
            self.config.cache_root(),
            &self.config.compiled_extension,
        )
    }

    fn cache(&self) -> Option<TimestampCache> {
        (!self.config.no_cache && !self.config.debug).then(|| self.timestamp_cache())
    }

    /// Functions visible to one render: the caller's, plus `include`,
    /// `object_attributes` and a pass-through translator unless one was set.
    fn render_functions(&self, bindings: &Bindings) -> FunctionRegistry {
        let mut functions = self.functions.clone();
        if !functions.has(&self.config.translate_function) {
            functions.register(self.config.translate_function.clone(), identity_translation);
        }
        functions.register("object_attributes", object_attributes);

        let mut nested = self.clone();
        nested.include_depth += 1;
        let bindings = bindings.clone();
        functions.register("include", move |args| {
            let name = args
                .get("name")
                .and_then(Value::as_str)
                .ok_or("include requires a string `name` argument")?;
            let indent = args.get("indent").and_then(Value::as_u64).unwrap_or(0) as usize;
            if nested.include_depth > nested.config.max_passes {
                return Err(format!("include depth exceeded while including '{name}'"));
            }
            trace!(name, indent, depth = nested.include_depth, "dynamic include");
            let output = nested
                .fetch_with(Path::new(name), &bindings)
                .map_err(|err| err.to_string())?;
            Ok(Value::String(indent_lines(&output, indent)))
        });
        functions
    }
}

impl fmt::Debug for MarkupEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MarkupEngine")
            .field("config", &self.config)
            .field("root", &self.root)
            .field("blocks", &self.blocks)
            .field("filters", &self.filters)
            .field("functions", &self.functions)
            .field("bindings", &self.bindings)
            .finish_non_exhaustive()
    }
}

fn listing(lines: &[NormalizedLine]) -> String {
    lines
        .iter()
        .enumerate()
        .map(|(idx, line)| format!("F{}:\t{}\n", idx + 1, line.text))
        .collect()
}

/// Indent rendered output by `levels` steps of two spaces, one line at a time.
fn indent_lines(text: &str, levels: usize) -> String {
    let pad = "  ".repeat(levels);
    text.trim_end_matches('\n')
        .split('\n')
        .map(|line| format!("{pad}{line}\n"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::BuildCounter;
    use serde_json::json;

    fn engine(root: &Path) -> MarkupEngine {
        let config = MarkupConfig {
            cache_dir: Some(root.join("compiled")),
            ..MarkupConfig::default()
        };
        MarkupEngine::new(config, root)
    }

    #[test]
    fn test_render_source_with_bindings() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine(dir.path());
        engine.assign("name", "Ada");
        assert_eq!(
            engine.render_source("%p Hello {{ name }}").unwrap(),
            "<p>Hello Ada</p>\n"
        );
    }

    #[test]
    fn test_loops_and_conditionals() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine(dir.path());
        engine.assign("items", json!(["a", "b"]));
        let source = "%ul\n\t- for item in items\n\t\t%li= item\n\t- if items | length > 5\n\t\t%li more";
        assert_eq!(
            engine.render_source(source).unwrap(),
            "<ul>\n  <li>a</li>\n  <li>b</li>\n</ul>\n"
        );
    }

    #[test]
    fn test_translation() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine(dir.path());
        assert_eq!(engine.render_source("%p$ Hello").unwrap(), "<p>Hello</p>\n");
        engine.set_translator(|text| format!("[{text}]"));
        assert_eq!(engine.render_source("%p$ Hello").unwrap(), "<p>[Hello]</p>\n");
    }

    #[test]
    fn test_object_attributes_in_render() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine(dir.path());
        engine.assign("post", json!({"type": "Post", "id": 3}));
        assert_eq!(
            engine.render_source("%div[post] x").unwrap(),
            "<div class=\"post\" id=\"post_3\">x</div>\n"
        );
    }

    #[test]
    fn test_compress_and_filters() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine(dir.path());
        engine.config_mut().compress = true;
        engine.register_filter("upper", |code| code.replace("hi", "HI"));
        assert_eq!(
            engine.render_source("%div\n\t%p hi").unwrap(),
            "<div><p>HI</p></div>\n"
        );
    }

    #[test]
    fn test_dynamic_include() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("item.haml"), "%p= label").unwrap();
        let mut engine = engine(dir.path());
        engine.assign("part", "item").assign("label", "deep");
        assert_eq!(
            engine.render_source("%div\n\t!!= part").unwrap(),
            "<div>\n  <p>deep</p>\n</div>\n"
        );
    }

    #[test]
    fn test_self_including_template_fails() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("again.haml"), "%p\n\t!!= \"again\"").unwrap();
        let err = engine(dir.path()).fetch("again").unwrap_err();
        assert!(matches!(err, MarkupError::Render { .. }));
    }

    #[test]
    fn test_compile_file_uses_cache_until_source_changes() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("page.haml");
        std::fs::write(&source, "%p one").unwrap();
        let counter = BuildCounter::new();
        let engine = engine(dir.path()).on_tree_built(counter.hook());

        let first = engine.compile_file("page").unwrap();
        let artifact = engine.compiled_path("page").unwrap();
        assert!(artifact.is_file());
        let past = std::time::SystemTime::now() - std::time::Duration::from_secs(60);
        crate::testing::set_modified(&source, past).unwrap();

        let second = engine.compile_file("page").unwrap();
        assert_eq!(first.code, second.code);
        assert_eq!(counter.count(), 1);

        std::fs::write(&source, "%p two").unwrap();
        assert_eq!(engine.fetch("page").unwrap(), "<p>two</p>\n");
        assert_eq!(counter.count(), 2);
        assert_eq!(engine.clear_compiled().unwrap(), 1);
    }

    #[test]
    fn test_debug_mode_adds_listing_and_skips_cache() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("page.haml"), "%p x").unwrap();
        let mut engine = engine(dir.path());
        engine.config_mut().debug = true;
        assert_eq!(engine.fetch("page").unwrap(), "1:\t<p>x</p>\n\nF1:\t%p x\n");
        assert!(!engine.compiled_path("page").unwrap().exists());
    }

    #[test]
    fn test_missing_template() {
        let dir = tempfile::tempdir().unwrap();
        let err = engine(dir.path()).fetch("nope").unwrap_err();
        assert!(matches!(err, MarkupError::SourceNotFound { .. }));
    }

    #[test]
    fn test_clones_have_independent_registries() {
        let dir = tempfile::tempdir().unwrap();
        let mut first = engine(dir.path());
        let second = first.clone();
        first.register_block("shout", |text| Ok(text.to_uppercase()));
        assert!(first.text_blocks().has("shout"));
        assert!(!second.text_blocks().has("shout"));
    }

    #[test]
    fn test_indent_lines() {
        assert_eq!(indent_lines("a\nb\n", 1), "  a\n  b\n");
    }
}
