//! Scan runner: file discovery, parallel analysis and finding derivation.

use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use walkdir::WalkDir;

use crate::analysis::{analyze_with, FileAnalysis, LanguageAnalyzer, LanguageId, Registry};
use crate::config::Config;

use super::{
    filter_suppressed, parse_suppressions, Finding, Rule, ScanResult, Severity, SkippedFile,
    SuppressedFinding,
};

/// Directories never descended into.
const SKIPPED_DIRS: &[&str] = &["vendor", "node_modules", "__pycache__", "venv", "site-packages"];

/// Directories holding tests, skipped unless test files are included.
const TEST_DIRS: &[&str] = &["tests", "test", "__tests__", "testdata", "test_data"];

/// What happened to one file.
enum Outcome {
    Analyzed {
        analysis: FileAnalysis,
        findings: Vec<Finding>,
        suppressed: Vec<SuppressedFinding>,
    },
    Skipped(SkippedFile),
    Failed(SkippedFile),
}

/// Analyzes a set of files with one configuration.
pub struct Runner {
    base_dir: PathBuf,
    config: Config,
    registry: &'static Registry,
    language: Option<LanguageId>,
}

impl Runner {
    /// Create a runner over the standard language registry.
    pub fn new<P: AsRef<Path>>(base_dir: P, config: Config) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
            config,
            registry: crate::registry(),
            language: None,
        }
    }

    /// Analyze every file as `language`. A single-file base ignores its
    /// extension; directory walks only pick up files of the same family.
    pub fn with_language(mut self, language: Option<LanguageId>) -> Self {
        self.language = language;
        self
    }

    /// Walk the base directory for files this runner can analyze.
    pub fn collect_files(&self) -> anyhow::Result<Vec<PathBuf>> {
        if self.base_dir.is_file() {
            return Ok(vec![self.base_dir.clone()]);
        }

        let excluded = self.config.exclusion_set()?;
        let include_tests = self.config.include_test_files;
        let mut files = Vec::new();

        for entry in WalkDir::new(&self.base_dir)
            .follow_links(true)
            .into_iter()
            .filter_entry(|e| {
                if e.depth() == 0 || !e.file_type().is_dir() {
                    return true;
                }
                let name = e.file_name().to_string_lossy();
                !(name.starts_with('.')
                    || SKIPPED_DIRS.contains(&name.as_ref())
                    || (!include_tests && TEST_DIRS.contains(&name.as_ref())))
            })
        {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if !self.walk_accepts(path) {
                continue;
            }
            if !include_tests && is_test_file(path) {
                continue;
            }
            let relative = path.strip_prefix(&self.base_dir).unwrap_or(path);
            if excluded.is_match(relative) {
                tracing::debug!(path = %relative.display(), "excluded by config");
                continue;
            }
            files.push(path.to_path_buf());
        }

        files.sort();
        Ok(files)
    }

    /// Analyze `files` in parallel and derive findings.
    pub fn run(&self, files: &[PathBuf]) -> anyhow::Result<ScanResult> {
        if let Some(id) = self.language {
            self.registry.analyzer(id)?;
        }

        let outcomes: Vec<Outcome> = files.par_iter().map(|p| self.analyze_file(p)).collect();

        let mut result = ScanResult::new();
        for outcome in outcomes {
            match outcome {
                Outcome::Analyzed {
                    analysis,
                    findings,
                    suppressed,
                } => {
                    result.scanned += 1;
                    result.files.push(analysis);
                    result.findings.extend(findings);
                    result.suppressed.extend(suppressed);
                }
                Outcome::Skipped(skipped) => result.skipped_files.push(skipped),
                Outcome::Failed(failed) => result.failed.push(failed),
            }
        }

        result.files.sort_by(|a, b| a.path.cmp(&b.path));
        result
            .findings
            .sort_by(|a, b| (&a.file, a.line, &a.code).cmp(&(&b.file, b.line, &b.code)));
        result.suppressed.sort_by(|a, b| {
            (&a.finding.file, a.finding.line).cmp(&(&b.finding.file, b.finding.line))
        });

        tracing::info!(
            scanned = result.scanned,
            skipped = result.skipped_files.len(),
            failed = result.failed.len(),
            findings = result.findings.len(),
            "scan complete"
        );
        Ok(result)
    }

    /// Directory walks keep extension filtering even with a language override.
    fn walk_accepts(&self, path: &Path) -> bool {
        let Some(detected) = LanguageId::from_path(path) else {
            return false;
        };
        match self.language {
            Some(id) => id.shares_family(detected) && self.registry.get(id).is_some(),
            None => self.registry.get(detected).is_some(),
        }
    }

    fn analyzer_for(&self, path: &Path) -> Option<&dyn LanguageAnalyzer> {
        match self.language {
            Some(id) => self.registry.get(id),
            None => self.registry.for_path(path),
        }
    }

    fn display_path(&self, path: &Path) -> String {
        path.strip_prefix(&self.base_dir)
            .ok()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(path)
            .to_string_lossy()
            .into_owned()
    }

    fn analyze_file(&self, path: &Path) -> Outcome {
        let rel_path = self.display_path(path);
        let skip = |reason: String| SkippedFile {
            path: rel_path.clone(),
            reason,
        };

        let Some(analyzer) = self.analyzer_for(path) else {
            tracing::debug!(path = %rel_path, "no analyzer for file");
            return Outcome::Skipped(skip("unsupported language".to_string()));
        };

        match fs::metadata(path) {
            Ok(meta) if meta.len() > self.config.limits.max_file_bytes => {
                tracing::warn!(
                    path = %rel_path,
                    bytes = meta.len(),
                    limit = self.config.limits.max_file_bytes,
                    "file too large; skipping"
                );
                return Outcome::Skipped(skip(format!(
                    "{} bytes exceeds limit of {}",
                    meta.len(),
                    self.config.limits.max_file_bytes
                )));
            }
            Ok(_) => {}
            Err(e) => return Outcome::Failed(skip(e.to_string())),
        }

        let source = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(path = %rel_path, error = %e, "failed to read file");
                return Outcome::Failed(skip(e.to_string()));
            }
        };

        let analysis = match analyze_with(analyzer, &rel_path, &source, &self.config) {
            Ok(analysis) => analysis,
            Err(e) => {
                tracing::warn!(path = %rel_path, error = %e, "analysis failed");
                return Outcome::Failed(skip(e.to_string()));
            }
        };

        let suppressions = parse_suppressions(&rel_path, &String::from_utf8_lossy(&source));
        let (findings, suppressed) = filter_suppressed(derive_findings(&analysis), &suppressions);

        Outcome::Analyzed {
            analysis,
            findings,
            suppressed,
        }
    }
}

/// Turn smells, pattern matches and dead-code candidates into findings.
pub fn derive_findings(analysis: &FileAnalysis) -> Vec<Finding> {
    let file = &analysis.path;
    let mut findings = Vec::new();

    for function in &analysis.functions {
        for smell in &function.smells {
            findings.push(Finding {
                rule: Rule::from(smell.kind),
                code: smell.kind.as_str().to_string(),
                message: smell.message(function.record.display_name()),
                file: file.clone(),
                line: function.record.line(),
                column: Some(function.record.span.start_col),
                severity: Severity::Warning,
            });
        }
    }

    for m in &analysis.pattern_matches {
        findings.push(Finding {
            rule: Rule::Pattern,
            code: m.pattern_id.clone(),
            message: m.description.clone(),
            file: file.clone(),
            line: m.line,
            column: Some(m.column),
            severity: m.severity,
        });
    }

    for candidate in &analysis.dead_code {
        findings.push(Finding {
            rule: Rule::DeadCode,
            code: Rule::DeadCode.as_str().to_string(),
            message: format!(
                "{} '{}' is never referenced in this file ({} confidence)",
                candidate.kind, candidate.name, candidate.confidence
            ),
            file: file.clone(),
            line: candidate.line,
            column: None,
            severity: Severity::Info,
        });
    }

    findings
}

fn is_test_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let stem = name.split('.').next().unwrap_or("");
    stem.starts_with("test_")
        || stem.ends_with("_test")
        || name.contains(".test.")
        || name.contains(".spec.")
        || name == "conftest.py"
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, rel: &str, content: &str) -> PathBuf {
        let path = dir.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_collect_files_skips_tests_vendor_and_excluded() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "app.py", "x = 1\n");
        write(temp.path(), "web/index.ts", "let a = 1;\n");
        write(temp.path(), "README.md", "# readme\n");
        write(temp.path(), "test_app.py", "x = 1\n");
        write(temp.path(), "web/index.spec.ts", "let a = 1;\n");
        write(temp.path(), "node_modules/lib/index.js", "var a;\n");
        write(temp.path(), ".cache/gen.py", "x = 1\n");
        write(temp.path(), "migrations/0001.py", "x = 1\n");

        let config = Config {
            excluded_paths: vec!["**/migrations/**".to_string()],
            ..Config::default()
        };
        let runner = Runner::new(temp.path(), config);
        let files: Vec<_> = runner
            .collect_files()
            .unwrap()
            .into_iter()
            .map(|p| runner.display_path(&p).replace('\\', "/"))
            .collect();
        assert_eq!(files, vec!["app.py", "web/index.ts"]);
    }

    #[test]
    fn test_include_test_files() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "test_app.py", "x = 1\n");
        write(temp.path(), "tests/helpers.py", "x = 1\n");
        let config = Config {
            include_test_files: true,
            ..Config::default()
        };
        let files = Runner::new(temp.path(), config).collect_files().unwrap();
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn test_run_derives_and_suppresses_findings() {
        let temp = TempDir::new().unwrap();
        let app = write(
            temp.path(),
            "app.py",
            "def helper():\n    eval(\"1\")  # gnarl:ignore eval_exec_calls - Fixture\n\ndef orphan():\n    pass\n\nhelper()\n",
        );
        let result = Runner::new(temp.path(), Config::default())
            .run(&[app])
            .unwrap();

        assert_eq!(result.scanned, 1);
        assert_eq!(result.suppressed_count(), 1);
        assert_eq!(result.suppressed[0].finding.code, "eval_exec_calls");
        assert!(!result.has_errors());

        let dead: Vec<_> = result
            .findings
            .iter()
            .filter(|f| f.rule == Rule::DeadCode)
            .collect();
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].line, 4);
        assert!(dead[0].message.contains("'orphan'"));
    }

    #[test]
    fn test_run_reports_errors_and_skips_large_files() {
        let temp = TempDir::new().unwrap();
        let bad = write(temp.path(), "bad.js", "eval(input);\n");
        let big = write(temp.path(), "big.py", &"x = 1\n".repeat(100));
        let notes = write(temp.path(), "notes.txt", "hello\n");

        let mut config = Config::default();
        config.limits.max_file_bytes = 200;
        let result = Runner::new(temp.path(), config)
            .run(&[bad, big, notes])
            .unwrap();

        assert_eq!(result.scanned, 1);
        assert!(result.has_errors());
        assert_eq!(result.findings[0].code, "eval_call");
        assert_eq!(result.skipped_files.len(), 2);
    }

    #[test]
    fn test_language_override() {
        let temp = TempDir::new().unwrap();
        let script = write(temp.path(), "build", "def run():\n    pass\n");
        let result = Runner::new(temp.path(), Config::default())
            .with_language(Some(LanguageId::Python))
            .run(&[script])
            .unwrap();
        assert_eq!(result.scanned, 1);
        assert_eq!(result.files[0].language, LanguageId::Python);
        assert!(result.files[0].function("run").is_some());
    }

    #[test]
    fn test_language_override_keeps_extension_filter_in_walks() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "app.py", "x = 1\n");
        write(temp.path(), "README.md", "# readme\n");
        write(temp.path(), "data.json", "{}\n");
        write(temp.path(), "web/view.jsx", "let a = 1;\n");
        write(temp.path(), "web/index.ts", "let b = 2;\n");

        let runner = Runner::new(temp.path(), Config::default())
            .with_language(Some(LanguageId::Python));
        let files = runner.collect_files().unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("app.py"));
        let result = runner.run(&files).unwrap();
        assert_eq!(result.scanned, 1);
        assert!(!result.files[0].has_parse_errors);

        let runner = Runner::new(temp.path(), Config::default())
            .with_language(Some(LanguageId::Tsx));
        let files: Vec<_> = runner
            .collect_files()
            .unwrap()
            .into_iter()
            .map(|p| runner.display_path(&p).replace('\\', "/"))
            .collect();
        assert_eq!(files, vec!["web/index.ts", "web/view.jsx"]);
    }

    #[test]
    fn test_language_override_applies_to_single_file_base() {
        let temp = TempDir::new().unwrap();
        let script = write(temp.path(), "build", "def run():\n    pass\n");
        let runner =
            Runner::new(&script, Config::default()).with_language(Some(LanguageId::Python));
        let files = runner.collect_files().unwrap();
        assert_eq!(files, vec![script]);
        assert_eq!(runner.run(&files).unwrap().scanned, 1);
    }

    #[test]
    fn test_parameter_smell_and_pattern_suppress_separately() {
        let temp = TempDir::new().unwrap();
        let app = write(
            temp.path(),
            "app.py",
            "def wide(a, b, c, d, e, f):  # gnarl:ignore too_many_parameters\n    return a\n\nwide(1, 2, 3, 4, 5, 6)\n",
        );
        let result = Runner::new(temp.path(), Config::default())
            .run(&[app])
            .unwrap();

        let codes: Vec<_> = result.findings.iter().map(|f| f.code.as_str()).collect();
        assert!(codes.contains(&"long_parameter_list"));
        assert!(!codes.contains(&"too_many_parameters"));
        assert_eq!(result.suppressed_count(), 1);
        assert_eq!(result.suppressed[0].finding.code, "too_many_parameters");
    }

    #[test]
    fn test_is_test_file() {
        assert!(is_test_file(Path::new("test_models.py")));
        assert!(is_test_file(Path::new("models_test.py")));
        assert!(is_test_file(Path::new("app.test.ts")));
        assert!(is_test_file(Path::new("app.spec.js")));
        assert!(!is_test_file(Path::new("contest.py")));
    }
}
