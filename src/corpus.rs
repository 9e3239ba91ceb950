use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use rayon::prelude::*;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// One source file, loaded once and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct Document {
    pub path: String,
    pub raw_text: String,
    pub plain_text: String,
}

impl Document {
    pub fn new(path: impl Into<String>, raw_text: String) -> Self {
        let plain_text = strip_markup(&raw_text);
        Document {
            path: path.into(),
            raw_text,
            plain_text,
        }
    }
}

/// A file (or the root itself) that could not be loaded.
#[derive(Debug, Clone)]
pub struct Skipped {
    pub path: String,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct CorpusOptions {
    /// Extensions without the leading dot, matched as `**/*.<ext>`
    pub extensions: Vec<String>,
    /// Extra globset patterns, relative to the root
    pub exclude: Vec<String>,
}

impl Default for CorpusOptions {
    fn default() -> Self {
        CorpusOptions {
            extensions: vec!["html".to_string(), "md".to_string()],
            exclude: Vec::new(),
        }
    }
}

/// Documents in lexical path order. Everything downstream refers to a
/// document by its index in `documents`.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    pub root: PathBuf,
    pub documents: Vec<Document>,
    pub skipped: Vec<Skipped>,
}

impl Corpus {
    pub fn from_documents(documents: Vec<Document>) -> Self {
        Corpus {
            root: PathBuf::new(),
            documents,
            skipped: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Recursively load every matching file under `root`.
    ///
    /// Unreadable files end up in `skipped` instead of failing the batch, and
    /// a missing root yields an empty corpus. Only malformed glob patterns
    /// are errors.
    pub fn load(
        root: &Path,
        options: &CorpusOptions,
    ) -> Result<Corpus, Box<dyn std::error::Error>> {
        let include = build_globset(
            &options
                .extensions
                .iter()
                .map(|ext| format!("**/*.{}", ext.trim().trim_start_matches('.')))
                .collect::<Vec<_>>(),
        )?;
        let exclude = build_globset(&options.exclude)?;

        let mut corpus = Corpus {
            root: root.to_path_buf(),
            ..Corpus::default()
        };

        if !root.is_dir() {
            corpus.skipped.push(Skipped {
                path: root.display().to_string(),
                reason: "root directory not found".to_string(),
            });
            return Ok(corpus);
        }

        let mut builder = WalkBuilder::new(root);
        builder
            .hidden(true)
            .ignore(false)
            .parents(false)
            .git_ignore(false)
            .git_global(false)
            .git_exclude(false)
            .follow_links(false)
            .sort_by_file_name(|a, b| a.cmp(b));

        let mut paths: Vec<PathBuf> = Vec::new();
        for entry in builder.build() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = walk_error_path(&e).unwrap_or(root);
                    corpus.skipped.push(Skipped {
                        path: path.display().to_string(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            let path = entry.path();
            let relative = path.strip_prefix(root).unwrap_or(path);
            if exclude.is_match(relative) || !include.is_match(relative) {
                continue;
            }

            match entry.file_type() {
                Some(ft) if ft.is_file() => {}
                // Links to files are read through; directory links are not walked.
                Some(ft) if ft.is_symlink() => match fs::metadata(path) {
                    Ok(meta) if meta.is_file() => {}
                    Ok(_) => continue,
                    Err(e) => {
                        corpus.skipped.push(Skipped {
                            path: path.display().to_string(),
                            reason: format!("broken symlink: {}", e),
                        });
                        continue;
                    }
                },
                _ => continue,
            }
            paths.push(path.to_path_buf());
        }

        let loaded: Vec<(String, std::io::Result<String>)> = paths
            .par_iter()
            .map(|p| (p.to_string_lossy().into_owned(), fs::read_to_string(p)))
            .collect();

        for (path, result) in loaded {
            match result {
                Ok(raw) => corpus.documents.push(Document::new(path, raw)),
                Err(e) => corpus.skipped.push(Skipped {
                    path,
                    reason: e.to_string(),
                }),
            }
        }

        corpus.documents.sort_by(|a, b| a.path.cmp(&b.path));

        Ok(corpus)
    }
}

/// The entry a walk error is about, when the error carries one.
fn walk_error_path(err: &ignore::Error) -> Option<&Path> {
    match err {
        ignore::Error::WithPath { path, .. } => Some(path.as_path()),
        ignore::Error::Loop { child, .. } => Some(child.as_path()),
        ignore::Error::WithDepth { err, .. } | ignore::Error::WithLineNumber { err, .. } => {
            walk_error_path(err)
        }
        ignore::Error::Partial(errs) => errs.iter().find_map(walk_error_path),
        _ => None,
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet, Box<dyn std::error::Error>> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

fn block_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // An unterminated block runs to end of input.
    RE.get_or_init(|| {
        Regex::new(concat!(
            r"(?is)<script\b[^>]*>.*?(?:</script\s*>|\z)",
            r"|<style\b[^>]*>.*?(?:</style\s*>|\z)",
            r"|<!--.*?(?:-->|\z)",
        ))
        .expect("block pattern is valid")
    })
}

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[a-zA-Z/!?][^>]*(?:>|\z)").expect("tag pattern is valid"))
}

/// Reduce HTML or Markdown to plain text: drop script, style and comment
/// blocks, replace tags with spaces, decode common entities and collapse
/// whitespace.
pub fn strip_markup(raw: &str) -> String {
    let text = block_re().replace_all(raw, " ");
    let text = tag_re().replace_all(&text, " ");
    let text = decode_entities(&text);
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    // &amp; last so "&amp;lt;" stays "&lt;"
    text.replace("&nbsp;", " ")
        .replace("&#160;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&rsquo;", "\u{2019}")
        .replace("&amp;", "&")
}
