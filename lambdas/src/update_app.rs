use lambda_http::http::StatusCode;
use lambda_http::{
    run, service_fn, Error as LambdaError, Request as LambdaRequest, Response as LambdaResponse,
};
use tracing::{error, info};

mod common;
use crate::common::config::{Config, ConfigError};
use crate::common::errors::Error;
use crate::common::esper::{build_http_client, EsperClient};
use crate::common::updater::AppUpdater;
use crate::common::utils::{extract_request, failure, json_response, MessageBody};
use crate::common::validation::{RawRequest, UpdateRequest};
use crate::common::{REQUEST_FAILED, REQUEST_SUCCEEDED};

#[tracing::instrument(skip(updater))]
async fn process_request(
    request: LambdaRequest,
    updater: &Result<AppUpdater, ConfigError>,
) -> Result<LambdaResponse<String>, Error> {
    let updater = updater.as_ref().map_err(|err| {
        error!("{}", err);
        failure(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string())
    })?;

    let raw = extract_request::<RawRequest>(&request)?;
    let request = UpdateRequest::try_from(raw)
        .map_err(|err| failure(StatusCode::BAD_REQUEST, &err.to_string()))?;
    info!(
        "POST: device_id - {}, pkg - {}, build_number - {}",
        request.device_id, request.pkg, request.build_number
    );

    let response = match updater.push_latest_app_version_if_needed(&request).await {
        Ok(outcome) => {
            let msg = outcome.message();
            info!("{}", msg);
            json_response(
                StatusCode::OK,
                &MessageBody {
                    status: REQUEST_SUCCEEDED,
                    msg: &msg,
                },
            )?
        }
        Err(err) => {
            let msg = err.to_string();
            error!("{}", msg);
            json_response(
                StatusCode::BAD_REQUEST,
                &MessageBody {
                    status: REQUEST_FAILED,
                    msg: &msg,
                },
            )?
        }
    };

    Ok(response)
}

#[tokio::main]
async fn main() -> Result<(), LambdaError> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_ansi(false)
        .without_time() // CloudWatch will add the ingestion time
        .with_target(false)
        .init();

    // Missing env is reported per request rather than failing the cold start.
    let updater = match Config::from_env() {
        Ok(config) => {
            let http_client = build_http_client(&config)?;
            Ok(AppUpdater::new(
                EsperClient::new(&config, &http_client),
                config.poll.clone(),
            ))
        }
        Err(err) => Err(err),
    };

    run(service_fn(|request: LambdaRequest| async {
        let result = process_request(request, &updater).await;

        match result {
            Ok(val) => Ok(val),
            Err(Error::HttpError(val)) => Ok(val),
            Err(Error::LambdaError(err)) => Err(err),
        }
    }))
    .await
}
