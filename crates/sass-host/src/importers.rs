//! User importers and the per-compilation importer registry.
//!
//! Importers are numbered `0, 1, 2, ...` in registration order; the wire
//! entries on the compile request reference those numbers, and inbound
//! canonicalize/import/file-import requests quote them back.

use crate::options::Syntax;
use crate::{Error, Result};
use proto_sass::inbound_message::{
    canonicalize_response, compile_request, file_import_response, import_response,
    CanonicalizeResponse, FileImportResponse, ImportResponse,
};
use proto_sass::outbound_message::{CanonicalizeRequest, FileImportRequest, ImportRequest};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use url::Url;

/// Context passed to canonicalize and find-file-url callbacks.
pub struct CanonicalizeContext {
    from_import: bool,
    containing_url: Option<Url>,
    accessed: AtomicBool,
}

impl CanonicalizeContext {
    fn new(from_import: bool, containing_url: Option<Url>) -> Self {
        Self {
            from_import,
            containing_url,
            accessed: AtomicBool::new(false),
        }
    }

    /// Whether the load originated from an `@import` rule.
    pub fn from_import(&self) -> bool {
        self.from_import
    }

    /// The canonical URL of the stylesheet containing the load, if known.
    ///
    /// Reading it is reported back to the compiler, which then refrains
    /// from caching this canonicalization across containing URLs.
    pub fn containing_url(&self) -> Option<&Url> {
        self.accessed.store(true, Ordering::Relaxed);
        self.containing_url.as_ref()
    }

    fn containing_url_unused(&self) -> bool {
        !self.accessed.load(Ordering::Relaxed)
    }
}

/// A stylesheet loaded by an importer.
pub struct ImporterResult {
    pub contents: String,
    pub syntax: Syntax,
    /// An absolute, browser-accessible URL to use for `contents` in source
    /// maps. Absolute by construction: relative URLs don't parse as [`Url`].
    pub source_map_url: Option<Url>,
}

/// An importer that resolves URLs with a canonicalize/load callback pair.
#[async_trait::async_trait]
pub trait Importer: Send + Sync {
    /// Resolve `url` to a canonical URL, or `None` if this importer
    /// doesn't recognize it.
    async fn canonicalize(
        &self,
        url: &str,
        context: &CanonicalizeContext,
    ) -> anyhow::Result<Option<Url>>;

    /// Load the contents of a canonical URL previously returned by
    /// [`Importer::canonicalize`].
    async fn load(&self, canonical_url: &Url) -> anyhow::Result<Option<ImporterResult>>;

    /// URL schemes for which `canonicalize` is known to return `None`,
    /// letting the compiler skip the round trip.
    fn non_canonical_schemes(&self) -> Vec<String> {
        Vec::new()
    }
}

/// An importer that redirects URLs to `file:` URLs loaded by the compiler.
#[async_trait::async_trait]
pub trait FileImporter: Send + Sync {
    /// Resolve `url` to an absolute `file:` URL, or `None` to pass the
    /// load to the next importer.
    async fn find_file_url(
        &self,
        url: &str,
        context: &CanonicalizeContext,
    ) -> anyhow::Result<Option<Url>>;
}

/// [`Importer`] for the synchronous compiler: same contract, no suspension.
pub trait SyncImporter: Send + Sync {
    fn canonicalize(
        &self,
        url: &str,
        context: &CanonicalizeContext,
    ) -> anyhow::Result<Option<Url>>;

    fn load(&self, canonical_url: &Url) -> anyhow::Result<Option<ImporterResult>>;

    fn non_canonical_schemes(&self) -> Vec<String> {
        Vec::new()
    }
}

/// [`FileImporter`] for the synchronous compiler.
pub trait SyncFileImporter: Send + Sync {
    fn find_file_url(
        &self,
        url: &str,
        context: &CanonicalizeContext,
    ) -> anyhow::Result<Option<Url>>;
}

/// One importer bound to a compilation of the asynchronous compiler.
#[derive(Clone)]
pub enum SassImporter {
    Canonical(Arc<dyn Importer>),
    File(Arc<dyn FileImporter>),
    /// Resolves `pkg:` URLs from a package root directory, entirely inside
    /// the compiler.
    Package { entry_point_directory: PathBuf },
}

/// One importer bound to a compilation of the synchronous compiler.
#[derive(Clone)]
pub enum SyncSassImporter {
    Canonical(Arc<dyn SyncImporter>),
    File(Arc<dyn SyncFileImporter>),
    Package { entry_point_directory: PathBuf },
}

/// Registry of the importers for one asynchronous compilation.
pub(crate) struct ImporterRegistry {
    canonical: HashMap<u32, Arc<dyn Importer>>,
    file: HashMap<u32, Arc<dyn FileImporter>>,
    entries: Vec<compile_request::Importer>,
    next_id: u32,
}

impl ImporterRegistry {
    pub fn new(importers: &[SassImporter], load_paths: &[PathBuf]) -> Result<Self> {
        let mut registry = Self {
            canonical: HashMap::new(),
            file: HashMap::new(),
            entries: Vec::new(),
            next_id: 0,
        };
        for importer in importers {
            let entry = registry.register(importer)?;
            registry.entries.push(entry);
        }
        append_load_paths(&mut registry.entries, load_paths)?;
        Ok(registry)
    }

    /// Register an importer, returning the wire entry that references it.
    /// Used for the options list and for a string input's own importer.
    pub fn register(&mut self, importer: &SassImporter) -> Result<compile_request::Importer> {
        use compile_request::importer::Importer as Entry;

        match importer {
            SassImporter::Canonical(importer) => {
                let schemes = importer.non_canonical_schemes();
                validate_schemes(&schemes)?;
                let id = self.next_id;
                self.next_id += 1;
                self.canonical.insert(id, Arc::clone(importer));
                Ok(compile_request::Importer {
                    importer: Some(Entry::ImporterId(id)),
                    non_canonical_scheme: schemes,
                })
            }
            SassImporter::File(importer) => {
                let id = self.next_id;
                self.next_id += 1;
                self.file.insert(id, Arc::clone(importer));
                Ok(compile_request::Importer {
                    importer: Some(Entry::FileImporterId(id)),
                    non_canonical_scheme: Vec::new(),
                })
            }
            SassImporter::Package {
                entry_point_directory,
            } => Ok(package_entry(entry_point_directory)?),
        }
    }

    /// The wire entries for the compile request's importer list.
    pub fn entries(&self) -> Vec<compile_request::Importer> {
        self.entries.clone()
    }

    pub async fn canonicalize(&self, request: &CanonicalizeRequest) -> Result<CanonicalizeResponse> {
        let importer = self.canonical.get(&request.importer_id).ok_or_else(|| {
            Error::CompilerProtocol(format!(
                "unknown CanonicalizeRequest.importer_id {}",
                request.importer_id
            ))
        })?;
        let context = CanonicalizeContext::new(
            request.from_import,
            parse_containing_url(request.containing_url.as_deref())?,
        );
        let outcome = importer.canonicalize(&request.url, &context).await;
        Ok(canonicalize_response(request.id, outcome, &context))
    }

    pub async fn import(&self, request: &ImportRequest) -> Result<ImportResponse> {
        let importer = self.canonical.get(&request.importer_id).ok_or_else(|| {
            Error::CompilerProtocol(format!(
                "unknown ImportRequest.importer_id {}",
                request.importer_id
            ))
        })?;
        let url = parse_canonical_url(&request.url)?;
        let outcome = importer.load(&url).await;
        Ok(import_response(request.id, outcome))
    }

    pub async fn file_import(&self, request: &FileImportRequest) -> Result<FileImportResponse> {
        let importer = self.file.get(&request.importer_id).ok_or_else(|| {
            Error::CompilerProtocol(format!(
                "unknown FileImportRequest.importer_id {}",
                request.importer_id
            ))
        })?;
        let context = CanonicalizeContext::new(
            request.from_import,
            parse_containing_url(request.containing_url.as_deref())?,
        );
        let outcome = importer.find_file_url(&request.url, &context).await;
        Ok(file_import_response(request.id, outcome, &context))
    }
}

/// Registry of the importers for one synchronous compilation.
pub(crate) struct SyncImporterRegistry {
    canonical: HashMap<u32, Arc<dyn SyncImporter>>,
    file: HashMap<u32, Arc<dyn SyncFileImporter>>,
    entries: Vec<compile_request::Importer>,
    next_id: u32,
}

impl SyncImporterRegistry {
    pub fn new(importers: &[SyncSassImporter], load_paths: &[PathBuf]) -> Result<Self> {
        let mut registry = Self {
            canonical: HashMap::new(),
            file: HashMap::new(),
            entries: Vec::new(),
            next_id: 0,
        };
        for importer in importers {
            let entry = registry.register(importer)?;
            registry.entries.push(entry);
        }
        append_load_paths(&mut registry.entries, load_paths)?;
        Ok(registry)
    }

    pub fn register(&mut self, importer: &SyncSassImporter) -> Result<compile_request::Importer> {
        use compile_request::importer::Importer as Entry;

        match importer {
            SyncSassImporter::Canonical(importer) => {
                let schemes = importer.non_canonical_schemes();
                validate_schemes(&schemes)?;
                let id = self.next_id;
                self.next_id += 1;
                self.canonical.insert(id, Arc::clone(importer));
                Ok(compile_request::Importer {
                    importer: Some(Entry::ImporterId(id)),
                    non_canonical_scheme: schemes,
                })
            }
            SyncSassImporter::File(importer) => {
                let id = self.next_id;
                self.next_id += 1;
                self.file.insert(id, Arc::clone(importer));
                Ok(compile_request::Importer {
                    importer: Some(Entry::FileImporterId(id)),
                    non_canonical_scheme: Vec::new(),
                })
            }
            SyncSassImporter::Package {
                entry_point_directory,
            } => Ok(package_entry(entry_point_directory)?),
        }
    }

    pub fn entries(&self) -> Vec<compile_request::Importer> {
        self.entries.clone()
    }

    pub fn canonicalize(&self, request: &CanonicalizeRequest) -> Result<CanonicalizeResponse> {
        let importer = self.canonical.get(&request.importer_id).ok_or_else(|| {
            Error::CompilerProtocol(format!(
                "unknown CanonicalizeRequest.importer_id {}",
                request.importer_id
            ))
        })?;
        let context = CanonicalizeContext::new(
            request.from_import,
            parse_containing_url(request.containing_url.as_deref())?,
        );
        let outcome = importer.canonicalize(&request.url, &context);
        Ok(canonicalize_response(request.id, outcome, &context))
    }

    pub fn import(&self, request: &ImportRequest) -> Result<ImportResponse> {
        let importer = self.canonical.get(&request.importer_id).ok_or_else(|| {
            Error::CompilerProtocol(format!(
                "unknown ImportRequest.importer_id {}",
                request.importer_id
            ))
        })?;
        let url = parse_canonical_url(&request.url)?;
        let outcome = importer.load(&url);
        Ok(import_response(request.id, outcome))
    }

    pub fn file_import(&self, request: &FileImportRequest) -> Result<FileImportResponse> {
        let importer = self.file.get(&request.importer_id).ok_or_else(|| {
            Error::CompilerProtocol(format!(
                "unknown FileImportRequest.importer_id {}",
                request.importer_id
            ))
        })?;
        let context = CanonicalizeContext::new(
            request.from_import,
            parse_containing_url(request.containing_url.as_deref())?,
        );
        let outcome = importer.find_file_url(&request.url, &context);
        Ok(file_import_response(request.id, outcome, &context))
    }
}

// Response construction is shared between the async and sync registries:
// only the callback invocation differs.

fn canonicalize_response(
    id: u32,
    outcome: anyhow::Result<Option<Url>>,
    context: &CanonicalizeContext,
) -> CanonicalizeResponse {
    use canonicalize_response::Result as WireResult;

    CanonicalizeResponse {
        id,
        result: match outcome {
            Ok(Some(url)) => Some(WireResult::Url(url.to_string())),
            Ok(None) => None,
            Err(err) => Some(WireResult::Error(format!("{err:#}"))),
        },
        containing_url_unused: context.containing_url_unused(),
    }
}

fn import_response(id: u32, outcome: anyhow::Result<Option<ImporterResult>>) -> ImportResponse {
    use import_response::Result as WireResult;

    ImportResponse {
        id,
        result: match outcome {
            Ok(Some(result)) => Some(WireResult::Success(import_response::ImportSuccess {
                contents: result.contents,
                syntax: result.syntax.to_proto() as i32,
                source_map_url: result.source_map_url.map(|url| url.to_string()),
            })),
            Ok(None) => None,
            Err(err) => Some(WireResult::Error(format!("{err:#}"))),
        },
    }
}

fn file_import_response(
    id: u32,
    outcome: anyhow::Result<Option<Url>>,
    context: &CanonicalizeContext,
) -> FileImportResponse {
    use file_import_response::Result as WireResult;

    FileImportResponse {
        id,
        result: match outcome {
            Ok(Some(url)) if url.scheme() != "file" => Some(WireResult::Error(format!(
                "The findFileUrl callback must return a file: URL, returned {url}"
            ))),
            Ok(Some(url)) => Some(WireResult::FileUrl(url.to_string())),
            Ok(None) => None,
            Err(err) => Some(WireResult::Error(format!("{err:#}"))),
        },
        containing_url_unused: context.containing_url_unused(),
    }
}

fn package_entry(entry_point_directory: &Path) -> Result<compile_request::Importer> {
    Ok(compile_request::Importer {
        importer: Some(compile_request::importer::Importer::PackageImporter(
            compile_request::PackageImporter {
                entry_point_directory: absolute_path(entry_point_directory)?,
            },
        )),
        non_canonical_scheme: Vec::new(),
    })
}

fn append_load_paths(
    entries: &mut Vec<compile_request::Importer>,
    load_paths: &[PathBuf],
) -> Result<()> {
    for load_path in load_paths {
        entries.push(compile_request::Importer {
            importer: Some(compile_request::importer::Importer::Path(absolute_path(
                load_path,
            )?)),
            non_canonical_scheme: Vec::new(),
        });
    }
    Ok(())
}

pub(crate) fn absolute_path(path: &Path) -> Result<String> {
    let path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    Ok(path.to_string_lossy().into_owned())
}

fn parse_containing_url(containing_url: Option<&str>) -> Result<Option<Url>> {
    containing_url
        .map(|url| {
            Url::parse(url).map_err(|err| {
                Error::CompilerProtocol(format!("invalid containing_url {url:?}: {err}"))
            })
        })
        .transpose()
}

fn parse_canonical_url(url: &str) -> Result<Url> {
    Url::parse(url)
        .map_err(|err| Error::CompilerProtocol(format!("invalid canonical URL {url:?}: {err}")))
}

fn validate_schemes(schemes: &[String]) -> Result<()> {
    for scheme in schemes {
        let mut bytes = scheme.bytes();
        let valid = bytes.next().map_or(false, |b| b.is_ascii_lowercase())
            && bytes.all(|b| {
                b.is_ascii_lowercase() || b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.')
            });
        if !valid {
            return Err(Error::InvalidOption(format!(
                "{scheme:?} isn't a valid URL scheme (for example \"file\")"
            )));
        }
    }
    Ok(())
}
