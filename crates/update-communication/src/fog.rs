//! Online backend: acquires a token via [`fog_auth`], POSTs the
//! `CheckUpdateRequest`, and GETs each referenced artifact via
//! [`downloader`].

use crate::backend::CheckUpdateBackend;
use crate::error::Error;
use crate::model::{
    CheckUpdateRequest, CheckUpdateResponse, WireCheckUpdateRequest, WireCheckUpdateResponse,
};
use crate::Result;
use async_trait::async_trait;
use downloader::Downloader;
use fog_auth::FogAuthenticator;
use orchestration_tools::SELECTED_CHECKSUM_TYPE;
use std::path::PathBuf;
use std::sync::Arc;

/// Checks for updates and fetches artifacts directly against the fog.
pub struct FogBackend {
    client: reqwest::Client,
    fog_address: String,
    authenticator: Arc<FogAuthenticator>,
    downloader: Downloader,
}

impl FogBackend {
    /// Build a Fog backend sharing `authenticator` with the rest of the
    /// process (it must already have completed [`FogAuthenticator::establish`]).
    pub fn new(
        fog_address: impl Into<String>,
        authenticator: Arc<FogAuthenticator>,
        download_dir: impl Into<PathBuf>,
    ) -> Self {
        let fog_address = fog_address.into();
        Self {
            client: reqwest::Client::new(),
            downloader: Downloader::new(fog_address.clone(), download_dir),
            fog_address,
            authenticator,
        }
    }

    fn bearer_token(&self) -> Result<String> {
        self.authenticator
            .access_token()
            .ok_or(fog_auth::Error::NoAccessToken)
            .map_err(Error::from)
    }
}

#[async_trait]
impl CheckUpdateBackend for FogBackend {
    async fn check_update(&self, request: &CheckUpdateRequest) -> Result<CheckUpdateResponse> {
        let token = self.bearer_token()?;
        let wire = WireCheckUpdateRequest::from(request);

        let response = self
            .client
            .post(format!(
                "{}/agents/checkUpdate",
                self.fog_address.trim_end_matches('/')
            ))
            .bearer_auth(&token)
            .json(&wire)
            .send()
            .await
            .map_err(|e| Error::CheckUpdateFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::CheckUpdateFailed(format!(
                "fog returned status {}",
                response.status()
            )));
        }

        let wire_response: WireCheckUpdateResponse = response
            .json()
            .await
            .map_err(|e| Error::CheckUpdateFailed(e.to_string()))?;
        Ok(wire_response.into())
    }

    async fn fetch(&self, download_path: &str, checksum: &str) -> Result<PathBuf> {
        let token = self.bearer_token()?;
        Ok(self
            .downloader
            .download_from_fog(&token, download_path, checksum, SELECTED_CHECKSUM_TYPE)
            .await?)
    }
}
