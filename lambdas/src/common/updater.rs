use thiserror::Error;
use tokio::time::sleep;
use tracing::{error, info};
use uuid::Uuid;

use crate::common::config::PollSettings;
use crate::common::esper::models::{CommandRequest, CommandState};
use crate::common::esper::{ApiError, EsperClient};
use crate::common::validation::UpdateRequest;
use crate::common::versions::{latest_version, LatestVersion};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PushFailure {
    #[error("{0}")]
    Rejected(String),
    #[error("Failed to install app on device")]
    InstallFailed,
    #[error("No response from device")]
    DeviceTimeOut,
    #[error("Command was cancelled")]
    Cancelled,
    #[error("Failed to get status")]
    StatusUnavailable,
    #[error("Timed out waiting for command status")]
    PollExhausted,
}

/// Failures reported back to the caller; `Display` is the client-facing message.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UpdateError {
    #[error("Failed to acquire application ID for pkg {pkg}")]
    AppNotFound { pkg: String },
    #[error("Unable to acquire device GUID for device {device_id}")]
    DeviceNotFound { device_id: String },
    #[error("No versions available for pkg {pkg}")]
    NoVersions { pkg: String },
    #[error("Unable to push {pkg}. {reason}")]
    Push { pkg: String, reason: PushFailure },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    UpToDate { pkg: String, latest: u64 },
    Updated { pkg: String, build_number: u64 },
}

impl UpdateOutcome {
    pub fn message(&self) -> String {
        match self {
            UpdateOutcome::UpToDate { pkg, .. } => format!("No need to update pkg {}", pkg),
            UpdateOutcome::Updated { pkg, build_number } => {
                format!("Updated pkg {} to build {}", pkg, build_number)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppUpdater {
    client: EsperClient,
    poll: PollSettings,
}

impl AppUpdater {
    pub fn new(client: EsperClient, poll: PollSettings) -> Self {
        Self { client, poll }
    }

    pub async fn push_latest_app_version_if_needed(
        &self,
        request: &UpdateRequest,
    ) -> Result<UpdateOutcome, UpdateError> {
        let UpdateRequest {
            device_id,
            pkg,
            build_number,
        } = request;

        let application_id = self.application_id(pkg).await?;
        info!(
            "Received application id from Esper: {} ({})",
            application_id, pkg
        );

        let device_guid = self.device_guid(device_id).await?;
        info!(
            "Received device GUID from Esper: {} ({})",
            device_guid, device_id
        );

        let latest = self.latest_app_version(application_id, pkg).await?;
        if latest.build_number <= *build_number {
            info!(
                "Device is on build {}, latest is {}. No update needed",
                build_number, latest.build_number
            );
            return Ok(UpdateOutcome::UpToDate {
                pkg: pkg.clone(),
                latest: latest.build_number,
            });
        }

        info!("Update needed. Requesting update");
        self.push_app_to_device(device_guid, latest.version.id)
            .await
            .map_err(|reason| UpdateError::Push {
                pkg: pkg.clone(),
                reason,
            })?;

        Ok(UpdateOutcome::Updated {
            pkg: pkg.clone(),
            build_number: latest.build_number,
        })
    }

    async fn application_id(&self, pkg: &str) -> Result<Uuid, UpdateError> {
        let not_found = || UpdateError::AppNotFound { pkg: pkg.to_string() };

        let applications = self.client.list_applications(pkg).await.map_err(|err| {
            error!("Exception when listing applications: {}", err);
            not_found()
        })?;

        let mut matches = applications.into_iter().filter(|app| app.package_name == pkg);
        match (matches.next(), matches.next()) {
            (Some(app), None) => {
                if let Some(name) = &app.application_name {
                    info!("Matched application {}", name);
                }
                Ok(app.id)
            }
            (None, _) => {
                error!("No application matches {}", pkg);
                Err(not_found())
            }
            (Some(_), Some(_)) => {
                error!("Several applications match {}", pkg);
                Err(not_found())
            }
        }
    }

    async fn device_guid(&self, device_id: &str) -> Result<Uuid, UpdateError> {
        let not_found = || UpdateError::DeviceNotFound {
            device_id: device_id.to_string(),
        };

        let devices = self.client.list_devices(device_id).await.map_err(|err| {
            error!("Exception when listing devices: {}", err);
            not_found()
        })?;

        let mut matches = devices.into_iter().filter(|device| device.device_name == device_id);
        match (matches.next(), matches.next()) {
            (Some(device), None) => Ok(device.id),
            (None, _) => {
                error!("No device named {}", device_id);
                Err(not_found())
            }
            (Some(_), Some(_)) => {
                error!("Several devices named {}", device_id);
                Err(not_found())
            }
        }
    }

    async fn latest_app_version(
        &self,
        application_id: Uuid,
        pkg: &str,
    ) -> Result<LatestVersion, UpdateError> {
        let no_versions = || UpdateError::NoVersions { pkg: pkg.to_string() };

        let versions = self
            .client
            .list_app_versions(application_id)
            .await
            .map_err(|err| {
                error!("Exception when listing app versions: {}", err);
                no_versions()
            })?;

        let latest = latest_version(versions).ok_or_else(no_versions)?;
        let version = &latest.version;
        info!("Latest version of the app has build number: {}", latest.build_number);
        info!(
            id = %version.id,
            version_code = version.version_code.as_deref().unwrap_or_default(),
            created_on = version.created_on.as_deref().unwrap_or_default(),
            release_comments = version.release_comments.as_deref().unwrap_or_default(),
            "Latest version details"
        );

        Ok(latest)
    }

    async fn push_app_to_device(
        &self,
        device_guid: Uuid,
        app_version: Uuid,
    ) -> Result<(), PushFailure> {
        let request = CommandRequest::install(device_guid, app_version);
        let command = self.client.create_command(&request).await.map_err(|err| {
            error!("Exception when creating command: {}", err);
            match err {
                ApiError::Status { message, .. } => PushFailure::Rejected(message),
                other => PushFailure::Rejected(other.to_string()),
            }
        })?;
        info!("Push successful, command id: {}", command.id);

        self.await_command(command.id).await
    }

    /// Polls the command status until the device reports a terminal state or
    /// the attempts run out.
    async fn await_command(&self, command_id: Uuid) -> Result<(), PushFailure> {
        let max_attempts = self.poll.max_attempts;

        for attempt in 1..=max_attempts {
            let statuses = self.client.command_status(command_id).await.map_err(|err| {
                error!("Exception when fetching command status: {}", err);
                PushFailure::StatusUnavailable
            })?;

            match statuses.into_iter().next().map(|status| status.state) {
                Some(CommandState::Success) => return Ok(()),
                Some(CommandState::Failure) => return Err(PushFailure::InstallFailed),
                Some(CommandState::TimeOut) => return Err(PushFailure::DeviceTimeOut),
                Some(CommandState::Cancelled) => return Err(PushFailure::Cancelled),
                Some(CommandState::Pending(state)) => {
                    info!("Awaiting response from device on command status: {}", state)
                }
                None => info!("Command status not reported yet"),
            }

            if attempt < max_attempts {
                sleep(self.poll.interval).await;
            }
        }

        error!("Command {} still pending after {} polls", command_id, max_attempts);
        Err(PushFailure::PollExhausted)
    }
}
