use std::{fs, path::PathBuf};

use anyhow::Result;
use hf_hub::{
    api::sync::{Api, ApiBuilder, ApiRepo},
    Repo, RepoType,
};
use serde::Deserialize;
use tracing::info;

use crate::tokens::{get_token, TokenSource};

/// Pipeline class recorded in a diffusers-style `model_index.json`.
#[derive(Clone, Debug, Deserialize)]
struct ModelIndex {
    #[serde(rename = "_class_name")]
    name: String,
}

/// Resolves the files of one model repository through the Hugging Face Hub
/// API and its local cache.
pub(crate) struct ModelSource {
    api: Api,
    repo: ApiRepo,
    model_id: String,
}

impl ModelSource {
    pub(crate) fn new(
        model_id: &str,
        revision: Option<String>,
        silent: bool,
        token: TokenSource,
    ) -> Result<Self> {
        let api = ApiBuilder::new()
            .with_progress(!silent)
            .with_token(get_token(&token)?)
            .build()?;
        let revision = revision.unwrap_or("main".to_string());
        let repo = api.repo(Repo::with_revision(
            model_id.to_string(),
            RepoType::Model,
            revision,
        ));

        Ok(Self {
            api,
            repo,
            model_id: model_id.to_string(),
        })
    }

    /// Fetch and parse `model_index.json`, yielding the pipeline class name.
    pub(crate) fn pipeline_class(&self) -> Result<String> {
        let path = self.get("model_index.json")?;
        let ModelIndex { name } = serde_json::from_str(&fs::read_to_string(path)?)?;
        Ok(name)
    }

    /// Fetch one file from the model repository.
    pub(crate) fn get(&self, name: &str) -> Result<PathBuf> {
        info!("fetching `{name}` from {}", self.model_id);
        self.repo
            .get(name)
            .map_err(|e| anyhow::Error::msg(e.to_string()))
    }

    /// Fetch one file from an auxiliary repository. The CLIP tokenizers and
    /// the f16-safe VAE live outside the pipeline repo.
    pub(crate) fn get_from(&self, repo_id: &str, name: &str) -> Result<PathBuf> {
        info!("fetching `{name}` from {repo_id}");
        self.api
            .model(repo_id.to_string())
            .get(name)
            .map_err(|e| anyhow::Error::msg(e.to_string()))
    }
}
