// Copyright (c) 2024-2026, Daily
// SPDX-License-Identifier: BSD-2-Clause

//! Model asset download and caching.
//!
//! Assets are stored under `~/.cache/visavis/models/` and reused across
//! runs. The `download-files` CLI subcommand prefetches everything so a
//! later `start` never blocks on a download.

use std::path::PathBuf;

use crate::error::AssetError;

/// URL for the Silero VAD ONNX model.
pub const SILERO_VAD_URL: &str =
    "https://github.com/snakers4/silero-vad/raw/master/src/silero_vad/data/silero_vad.onnx";

/// Local filename for the cached Silero VAD model.
pub const SILERO_VAD_FILENAME: &str = "silero_vad_v5.onnx";

/// Manages downloading and caching of model assets.
pub struct AssetManager;

impl AssetManager {
    /// Get an asset from cache or download it.
    ///
    /// Returns the local path. A file already present in the cache is
    /// returned immediately; otherwise it is downloaded from `url` and
    /// stored under `filename`.
    pub async fn fetch(filename: &str, url: &str) -> Result<PathBuf, AssetError> {
        let cache_dir = Self::cache_dir()?;
        let asset_path = cache_dir.join(filename);

        if asset_path.exists() {
            return Ok(asset_path);
        }

        tracing::info!(asset = filename, url, "downloading model asset");
        Self::download(url, &asset_path).await?;
        Ok(asset_path)
    }

    /// Get the Silero VAD model, downloading it on first use.
    pub async fn silero_vad() -> Result<PathBuf, AssetError> {
        Self::fetch(SILERO_VAD_FILENAME, SILERO_VAD_URL).await
    }

    /// Prefetch every asset the assistant can use at runtime.
    pub async fn prefetch_all() -> Result<Vec<PathBuf>, AssetError> {
        let paths = vec![Self::silero_vad().await?];
        Ok(paths)
    }

    /// Return the cache directory, creating it if necessary.
    fn cache_dir() -> Result<PathBuf, AssetError> {
        let home = Self::home_dir()?;
        let cache = home.join(".cache").join("visavis").join("models");
        std::fs::create_dir_all(&cache)?;
        Ok(cache)
    }

    /// Resolve the user's home directory via the `HOME` environment variable.
    fn home_dir() -> Result<PathBuf, AssetError> {
        std::env::var("HOME")
            .map(PathBuf::from)
            .map_err(|_| AssetError::NoHomeDir)
    }

    /// Download a file from `url` and write it to `dest` atomically.
    ///
    /// The file is first written to a `.tmp` sibling and then renamed into
    /// place so that concurrent readers never see a partial file.
    async fn download(url: &str, dest: &std::path::Path) -> Result<(), AssetError> {
        let response = reqwest::get(url).await?.error_for_status()?;
        let bytes = response.bytes().await?;

        let tmp = dest.with_extension("tmp");
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, dest).await?;

        tracing::info!(dest = %dest.display(), "downloaded model asset");
        Ok(())
    }
}
