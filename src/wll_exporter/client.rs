// wll_exporter - Poller and Prometheus metrics exporter for Davis WeatherLink Live
//
// Copyright 2022 Nick Pillitteri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.
//

use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::{Client, StatusCode};
use std::error;
use std::fmt;
use std::future::Future;

#[derive(Debug)]
pub enum ClientError {
    Internal(reqwest::Error),
    Unexpected(StatusCode, String),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Internal(e) => write!(f, "{}", e),
            Self::Unexpected(status, url) => write!(f, "unexpected status {} for {}", status, url),
        }
    }
}

impl error::Error for ClientError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Self::Internal(e) => Some(e),
            _ => None,
        }
    }
}

/// Something that can fetch the raw body of a current conditions response.
pub trait ConditionsSource {
    fn current_conditions(&self) -> impl Future<Output = Result<String, ClientError>> + Send;
}

/// Client for the local HTTP API of a WeatherLink Live.
#[derive(Debug)]
pub struct WeatherLinkClient {
    client: Client,
    url: String,
}

impl WeatherLinkClient {
    const USER_AGENT: &'static str = concat!("wll_exporter/", env!("CARGO_PKG_VERSION"));
    const JSON_RESPONSE: &'static str = "application/json";

    /// Create a client for the given endpoint URL. The URL isn't validated until the
    /// first request so that a misconfigured station shows up as failed polls.
    pub fn new<S: Into<String>>(client: Client, url: S) -> Self {
        WeatherLinkClient { client, url: url.into() }
    }
}

impl ConditionsSource for WeatherLinkClient {
    fn current_conditions(&self) -> impl Future<Output = Result<String, ClientError>> + Send {
        async move {
            tracing::debug!(message = "making current conditions request", url = %self.url);

            let res = self
                .client
                .get(self.url.as_str())
                .header(USER_AGENT, Self::USER_AGENT)
                .header(ACCEPT, Self::JSON_RESPONSE)
                .send()
                .await
                .map_err(ClientError::Internal)?;

            let status = res.status();
            if status == StatusCode::OK {
                res.text().await.map_err(ClientError::Internal)
            } else {
                Err(ClientError::Unexpected(status, self.url.clone()))
            }
        }
    }
}
