/*!
 * Directory client for the gorzdrav upstream API
 *
 * Issues GET requests against the public schedule API, unwraps the response
 * envelope and turns `success = false` answers into classified
 * [`FailureCondition`](crate::classify::FailureCondition)s. Transport
 * failures are retried with exponential backoff; upstream business failures
 * are returned as-is.
 */

#[cfg(feature = "client")]
use std::sync::Arc;
#[cfg(feature = "client")]
use std::time::Duration;

#[cfg(feature = "client")]
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, REFERER};
#[cfg(feature = "client")]
use serde::de::DeserializeOwned;
#[cfg(feature = "client")]
use tokio::sync::Semaphore;
#[cfg(feature = "client")]
use tracing::{debug, warn};
#[cfg(feature = "client")]
use url::Url;

#[cfg(feature = "client")]
use crate::{
    config::GorzdravConfig,
    error::RequestContext,
    link,
    models::*,
};
use crate::{GorzdravError, Result};

/// Async client over the gorzdrav directory API.
///
/// Cheap to clone; clones share the connection pool and the in-flight limit.
#[cfg(feature = "client")]
#[derive(Debug, Clone)]
pub struct DirectoryClient {
    config: Arc<GorzdravConfig>,
    http: reqwest::Client,
    in_flight: Arc<Semaphore>,
}

#[cfg(feature = "client")]
impl DirectoryClient {
    /// Create a client from the global configuration
    pub fn new() -> Result<Self> {
        Self::with_config(crate::config::global_config())
    }

    /// Create a client with custom configuration
    pub fn with_config(config: GorzdravConfig) -> Result<Self> {
        config.validate()?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT_LANGUAGE, header_value(&config.accept_language)?);
        headers.insert(REFERER, header_value(&config.referer)?);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs_f64(config.timeout_seconds))
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .build()
            .map_err(|e| GorzdravError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
                suggestion: Some("Check your network configuration".to_string()),
            })?;

        Ok(Self {
            in_flight: Arc::new(Semaphore::new(config.pool_size)),
            config: Arc::new(config),
            http,
        })
    }

    pub fn config(&self) -> &GorzdravConfig {
        &self.config
    }

    /// All districts
    pub async fn districts(&self) -> Result<Vec<District>> {
        self.get_list(&self.endpoint(&["shared", "districts"])?).await
    }

    /// Institutions, optionally restricted to one district
    pub async fn lpus(&self, district_id: Option<&str>) -> Result<Vec<Lpu>> {
        let url = match district_id {
            Some(district) if !district.is_empty() => {
                self.endpoint(&["shared", "district", district, "lpus"])?
            }
            _ => self.endpoint(&["shared", "lpus"])?,
        };
        self.get_list(&url).await
    }

    /// A single institution
    pub async fn lpu(&self, lpu_id: i64) -> Result<Lpu> {
        let url = self.endpoint(&["shared", "lpu", &lpu_id.to_string()])?;
        self.get_result::<Lpu>(&url)
            .await?
            .ok_or_else(|| missing_result(&url))
    }

    /// Specialties of an institution; empty when the upstream reports none
    pub async fn specialties(&self, lpu_id: i64) -> Result<Vec<Specialty>> {
        let url = self.endpoint(&["schedule", "lpu", &lpu_id.to_string(), "specialties"])?;
        empty_on_no_results(self.get_list(&url).await)
    }

    /// Doctors of a specialty; empty when the upstream reports none
    pub async fn doctors(&self, lpu_id: i64, specialty_id: &str) -> Result<Vec<ApiDoctor>> {
        let url = self.endpoint(&[
            "schedule",
            "lpu",
            &lpu_id.to_string(),
            "speciality",
            specialty_id,
            "doctors",
        ])?;
        empty_on_no_results(self.get_list(&url).await)
    }

    /// Find one doctor within a specialty
    pub async fn doctor(
        &self,
        lpu_id: i64,
        specialty_id: &str,
        doctor_id: &str,
        district_id: Option<&str>,
    ) -> Result<Option<Doctor>> {
        let doctors = self.doctors(lpu_id, specialty_id).await?;
        Ok(doctors
            .into_iter()
            .find(|doctor| doctor.id == doctor_id)
            .map(|doctor| Doctor::new(doctor, lpu_id, specialty_id, district_id.map(str::to_string))))
    }

    /// Resolve the doctor a booking link points at.
    ///
    /// Links without a doctor resolve to `None`.
    pub async fn doctor_by_link(&self, url: &str) -> Result<Option<Doctor>> {
        let ids = link::parse(url)?;
        match (ids.lpu_id, ids.specialty_id.as_deref(), ids.doctor_id.as_deref()) {
            (Some(lpu), Some(specialty), Some(doctor)) => {
                self.doctor(lpu, specialty, doctor, ids.district_id.as_deref()).await
            }
            _ => Ok(None),
        }
    }

    /// Timetable days of a doctor
    pub async fn timetable(&self, lpu_id: i64, doctor_id: &str) -> Result<Vec<Timetable>> {
        let url = self.endpoint(&["schedule", "lpu", &lpu_id.to_string(), "doctor", doctor_id, "timetable"])?;
        self.get_list(&url).await
    }

    /// Free appointment slots of a doctor; empty when no tickets are left
    pub async fn appointments(&self, lpu_id: i64, doctor_id: &str) -> Result<Vec<Appointment>> {
        let url = self.endpoint(&["schedule", "lpu", &lpu_id.to_string(), "doctor", doctor_id, "appointments"])?;
        empty_on_no_results(self.get_list(&url).await)
    }

    /// Versioned API root with `segments` appended, each one percent-encoded
    /// as a single path segment.
    fn endpoint(&self, segments: &[&str]) -> Result<String> {
        if let Some(bad) = segments.iter().find(|s| matches!(**s, "" | "." | "..")) {
            return Err(GorzdravError::InvalidIdentifiers {
                message: format!("'{}' is not a usable identifier", bad),
            });
        }

        let base = self.config.versioned_api_url();
        let not_a_base = || GorzdravError::Configuration {
            message: format!("api_url cannot carry a path: {}", base),
            suggestion: Some("Use https://gorzdrav.spb.ru/_api/api".to_string()),
        };
        let mut url = Url::parse(&base).map_err(|_| not_a_base())?;
        url.path_segments_mut()
            .map_err(|_| not_a_base())?
            .pop_if_empty()
            .extend(segments);
        Ok(url.into())
    }

    async fn get_list<T: DeserializeOwned>(&self, url: &str) -> Result<Vec<T>> {
        Ok(self.get_result::<Vec<T>>(url).await?.unwrap_or_default())
    }

    /// GET `url` and unwrap the envelope, retrying transport failures.
    async fn get_result<T: DeserializeOwned>(&self, url: &str) -> Result<Option<T>> {
        let _permit = self
            .in_flight
            .acquire()
            .await
            .map_err(|e| GorzdravError::Network {
                message: format!("Client is shut down: {}", e),
                context: RequestContext::new(url, 0),
            })?;

        let attempts = self.config.retry_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            if self.config.request_delay > 0.0 {
                tokio::time::sleep(Duration::from_secs_f64(self.config.request_delay)).await;
            }

            debug!(url, attempt, "GET");
            match self.fetch_once::<T>(url, attempt).await {
                Err(err) if attempt < attempts && is_retryable(&err) => {
                    let backoff = backoff_delay(self.config.retry_initial_delay, attempt);
                    warn!(url, attempt, error = %err, backoff_secs = backoff.as_secs_f64(), "retrying upstream request");
                    tokio::time::sleep(backoff).await;
                }
                Err(GorzdravError::Upstream(condition)) => {
                    debug!(url, code = condition.code(), condition = condition.name(), "upstream reported failure");
                    return Err(GorzdravError::Upstream(condition));
                }
                other => return other,
            }
        }
    }

    async fn fetch_once<T: DeserializeOwned>(&self, url: &str, attempt: u32) -> Result<Option<T>> {
        let response = self.http.get(url).send().await.map_err(|e| GorzdravError::Network {
            message: e.to_string(),
            context: RequestContext::new(url, attempt),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(GorzdravError::Http {
                status: status.as_u16(),
                context: RequestContext::new(url, attempt),
            });
        }

        let body = response.bytes().await.map_err(|e| GorzdravError::Network {
            message: e.to_string(),
            context: RequestContext::new(url, attempt),
        })?;

        decode_envelope(&body, url, attempt)
    }
}

/// Parse an envelope body and unwrap or classify it
#[cfg(feature = "client")]
fn decode_envelope<T: DeserializeOwned>(body: &[u8], url: &str, attempt: u32) -> Result<Option<T>> {
    let envelope: ApiResponse<T> =
        serde_json::from_slice(body).map_err(|e| GorzdravError::ResponseValidation {
            message: e.to_string(),
            context: RequestContext::new(url, attempt),
        })?;
    Ok(envelope.into_result()?)
}

#[cfg(feature = "client")]
fn is_retryable(err: &GorzdravError) -> bool {
    matches!(err, GorzdravError::Http { .. } | GorzdravError::Network { .. })
}

/// `initial * 2^(attempt - 1)`
#[cfg(feature = "client")]
fn backoff_delay(initial_secs: f64, attempt: u32) -> Duration {
    let factor = 2f64.powi(attempt.saturating_sub(1).min(16) as i32);
    Duration::from_secs_f64((initial_secs * factor).max(0.0))
}

#[cfg(feature = "client")]
fn empty_on_no_results<T>(result: Result<Vec<T>>) -> Result<Vec<T>> {
    match result {
        Err(GorzdravError::Upstream(condition)) if condition.is_empty_result() => Ok(Vec::new()),
        other => other,
    }
}

#[cfg(feature = "client")]
fn missing_result(url: &str) -> GorzdravError {
    GorzdravError::ResponseValidation {
        message: "successful response carried no result".to_string(),
        context: RequestContext {
            url: Some(url.to_string()),
            attempts: None,
        },
    }
}

#[cfg(feature = "client")]
fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|e| GorzdravError::Configuration {
        message: format!("Invalid header value '{}': {}", value, e),
        suggestion: Some("Header values must be visible ASCII".to_string()),
    })
}

// Placeholder type when the feature is off, for better error messages
#[cfg(not(feature = "client"))]
pub struct DirectoryClient;

#[cfg(not(feature = "client"))]
impl DirectoryClient {
    pub fn new() -> Result<Self> {
        Err(GorzdravError::feature_required("client"))
    }
}
