//! # pdfium-loader
//!
//! Finds a usable PDFium shared library for `pdfium-render` and binds to it.
//!
//! Resolution order, first hit wins:
//!
//! 1. an explicit path handed to [`locate_library`] (from the host's config),
//! 2. `PDFIUM_LIB_PATH`,
//! 3. the on-disk cache at [`cache_root`]`/<lib name>`,
//! 4. a fresh download of the platform archive from
//!    [bblanchon/pdfium-binaries](https://github.com/bblanchon/pdfium-binaries),
//!    extracted into the cache.
//!
//! Every function here blocks. Async hosts call them from
//! `tokio::task::spawn_blocking` and are responsible for making sure only one
//! caller at a time reaches the download step.
//!
//! ```rust,no_run
//! let pdfium = pdfium_loader::bind(None).expect("PDFium unavailable");
//! ```

use std::ffi::OsString;
use std::io::Read;
use std::path::{Path, PathBuf};

use pdfium_render::prelude::Pdfium;
use thiserror::Error;
use tracing::{debug, info, warn};

/// pdfium-binaries release tag (`chromium/<n>`) used for downloads and as the
/// cache sub-directory name.
pub const PDFIUM_RELEASE: &str = "7690";

const RELEASE_BASE_URL: &str = "https://github.com/bblanchon/pdfium-binaries/releases/download";

/// Environment variable pointing at an existing library file.
pub const LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Environment variable overriding the cache root.
pub const CACHE_DIR_ENV: &str = "RESUMIND_PDFIUM_CACHE";

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("No PDFium build published for {os}/{arch}")]
    UnsupportedPlatform { os: String, arch: String },

    #[error("PDFium library not found at '{path}'")]
    MissingLibrary { path: PathBuf },

    #[error("Cannot prepare cache directory '{path}': {source}")]
    Cache {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Download of '{url}' failed: {reason}")]
    Download { url: String, reason: String },

    #[error("Archive does not contain '{entry}': {reason}")]
    Extract { entry: String, reason: String },

    #[error("Failed to bind PDFium from '{path}': {reason}")]
    Bind { path: PathBuf, reason: String },
}

/// Where a platform's library lives inside the release archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformAsset {
    pub archive: &'static str,
    pub entry: &'static str,
    pub lib_name: &'static str,
}

// (os, arch, archive, entry inside archive, file name on disk)
const ASSETS: &[(&str, &str, &str, &str, &str)] = &[
    ("macos", "aarch64", "pdfium-mac-arm64.tgz", "lib/libpdfium.dylib", "libpdfium.dylib"),
    ("macos", "x86_64", "pdfium-mac-x64.tgz", "lib/libpdfium.dylib", "libpdfium.dylib"),
    ("linux", "x86_64", "pdfium-linux-x64.tgz", "lib/libpdfium.so", "libpdfium.so"),
    ("linux", "aarch64", "pdfium-linux-arm64.tgz", "lib/libpdfium.so", "libpdfium.so"),
    ("windows", "x86_64", "pdfium-win-x64.tgz", "bin/pdfium.dll", "pdfium.dll"),
    ("windows", "aarch64", "pdfium-win-arm64.tgz", "bin/pdfium.dll", "pdfium.dll"),
    ("windows", "x86", "pdfium-win-x86.tgz", "bin/pdfium.dll", "pdfium.dll"),
];

/// Look up the release asset for an `(os, arch)` pair as reported by
/// `std::env::consts`.
pub fn asset_for(os: &str, arch: &str) -> Result<PlatformAsset, LoaderError> {
    ASSETS
        .iter()
        .find(|(o, a, ..)| *o == os && *a == arch)
        .map(|&(_, _, archive, entry, lib_name)| PlatformAsset {
            archive,
            entry,
            lib_name,
        })
        .ok_or_else(|| LoaderError::UnsupportedPlatform {
            os: os.to_string(),
            arch: arch.to_string(),
        })
}

/// Asset for the running platform.
pub fn current_asset() -> Result<PlatformAsset, LoaderError> {
    asset_for(std::env::consts::OS, std::env::consts::ARCH)
}

/// Per-release cache directory, honouring [`CACHE_DIR_ENV`].
pub fn cache_root() -> PathBuf {
    cache_root_from(std::env::var_os(CACHE_DIR_ENV))
}

fn cache_root_from(override_dir: Option<OsString>) -> PathBuf {
    let release_dir = format!("pdfium-{PDFIUM_RELEASE}");
    match override_dir {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir).join(release_dir),
        _ => dirs::cache_dir()
            .or_else(|| dirs::home_dir().map(|h| h.join(".cache")))
            .unwrap_or_else(std::env::temp_dir)
            .join("resumind")
            .join(release_dir),
    }
}

/// How the library path was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LibrarySource {
    Explicit(PathBuf),
    Environment(PathBuf),
    Cached(PathBuf),
    Downloaded(PathBuf),
}

impl LibrarySource {
    pub fn path(&self) -> &Path {
        match self {
            LibrarySource::Explicit(p)
            | LibrarySource::Environment(p)
            | LibrarySource::Cached(p)
            | LibrarySource::Downloaded(p) => p,
        }
    }
}

/// True when a library can be bound without touching the network.
pub fn is_available_offline() -> bool {
    if let Some(p) = std::env::var_os(LIB_PATH_ENV) {
        if Path::new(&p).exists() {
            return true;
        }
    }
    current_asset()
        .map(|asset| cache_root().join(asset.lib_name).exists())
        .unwrap_or(false)
}

/// Resolve the library path, downloading it into the cache if nothing else
/// matches. An explicit path that does not exist is an error rather than a
/// silent fallback.
pub fn locate_library(explicit: Option<&Path>) -> Result<LibrarySource, LoaderError> {
    if let Some(path) = explicit {
        if path.exists() {
            return Ok(LibrarySource::Explicit(path.to_path_buf()));
        }
        return Err(LoaderError::MissingLibrary {
            path: path.to_path_buf(),
        });
    }

    if let Some(env_path) = std::env::var_os(LIB_PATH_ENV) {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(LibrarySource::Environment(path));
        }
        warn!(
            "{} points to '{}' which does not exist; falling back to cache",
            LIB_PATH_ENV,
            path.display()
        );
    }

    let asset = current_asset()?;
    let cache = cache_root();
    let lib_path = cache.join(asset.lib_name);
    if lib_path.exists() {
        debug!("PDFium found in cache: {}", lib_path.display());
        return Ok(LibrarySource::Cached(lib_path));
    }

    std::fs::create_dir_all(&cache).map_err(|source| LoaderError::Cache {
        path: cache.clone(),
        source,
    })?;

    let url = format!(
        "{}/chromium%2F{}/{}",
        RELEASE_BASE_URL, PDFIUM_RELEASE, asset.archive
    );
    info!("Downloading PDFium from {}", url);
    let archive = download(&url)?;
    install_from_archive(&archive, asset.entry, &lib_path)?;
    info!("PDFium installed at {}", lib_path.display());

    Ok(LibrarySource::Downloaded(lib_path))
}

/// Locate the library and bind `pdfium-render` to it.
pub fn bind(explicit: Option<&Path>) -> Result<Pdfium, LoaderError> {
    let source = locate_library(explicit)?;
    bind_path(source.path())
}

/// Bind to a library at a known path, bypassing resolution.
pub fn bind_path(path: &Path) -> Result<Pdfium, LoaderError> {
    Pdfium::bind_to_library(path)
        .map(Pdfium::new)
        .map_err(|e| LoaderError::Bind {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

fn download(url: &str) -> Result<Vec<u8>, LoaderError> {
    let fail = |reason: String| LoaderError::Download {
        url: url.to_string(),
        reason,
    };

    let client = reqwest::blocking::Client::builder()
        .user_agent(concat!("pdfium-loader/", env!("CARGO_PKG_VERSION")))
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()
        .map_err(|e| fail(e.to_string()))?;

    let mut response = client.get(url).send().map_err(|e| fail(e.to_string()))?;
    if !response.status().is_success() {
        return Err(fail(format!("HTTP {}", response.status())));
    }

    let mut bytes = Vec::with_capacity(response.content_length().unwrap_or(0) as usize);
    response
        .read_to_end(&mut bytes)
        .map_err(|e| fail(e.to_string()))?;
    debug!("Downloaded {} bytes", bytes.len());
    Ok(bytes)
}

/// Extract `entry` from a gzipped tarball and move it to `dest` atomically,
/// so a concurrent process never observes a half-written library.
fn install_from_archive(archive: &[u8], entry: &str, dest: &Path) -> Result<(), LoaderError> {
    use flate2::read::GzDecoder;
    use tar::Archive;

    let extract_err = |reason: String| LoaderError::Extract {
        entry: entry.to_string(),
        reason,
    };

    let mut tarball = Archive::new(GzDecoder::new(archive));
    let entries = tarball.entries().map_err(|e| extract_err(e.to_string()))?;

    for item in entries {
        let mut item = item.map_err(|e| extract_err(e.to_string()))?;
        let matches = item
            .path()
            .map(|p| p.to_string_lossy().trim_start_matches("./") == entry)
            .map_err(|e| extract_err(e.to_string()))?;
        if !matches {
            continue;
        }

        let staging = dest.with_extension("partial");
        item.unpack(&staging)
            .map_err(|e| extract_err(format!("unpack: {e}")))?;
        std::fs::rename(&staging, dest).map_err(|source| LoaderError::Cache {
            path: dest.to_path_buf(),
            source,
        })?;
        return Ok(());
    }

    Err(extract_err("entry missing".into()))
}
