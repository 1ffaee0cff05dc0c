//! Stubbed service client.
//!
//! The dispatch hook: with stubbing enabled every invocation is answered
//! from the client's own stub queues; otherwise it goes to the transport.
//! Either way wire responses go through the same protocol parser.

use crate::adapter::StubAdapter;
use crate::config::{GlobalSettings, StubConfig};
use crate::error::{Result, StubError};
use crate::generator::StubGenerator;
use crate::model::ServiceModel;
use crate::protocol::protocol_for;
use crate::store::StubStore;
use crate::stub::{HttpResponse, StubEntry, StubSpec};
use crate::validator::Validator;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

/// Performs real network calls when stubbing is disabled.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `operation` with `params` and return the raw wire response.
    async fn send(&self, operation: &str, params: &Value) -> Result<HttpResponse>;
}

/// A recorded stubbed invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiRequest {
    pub operation: String,
    pub params: Value,
}

/// What a stubbed invocation should do.
#[derive(Debug)]
pub enum Resolution {
    /// Fail the invocation with this error.
    Raise(StubError),
    /// Return this data.
    Data(Value),
    /// Parse this wire response as if it came from the network.
    Wire(HttpResponse),
}

/// A service client whose responses can be stubbed.
pub struct StubbedClient {
    model: Arc<ServiceModel>,
    stubs: Option<StubStore>,
    settings: GlobalSettings,
    transport: Option<Arc<dyn Transport>>,
    api_requests: Mutex<Vec<ApiRequest>>,
}

impl StubbedClient {
    /// Create a client; stubs in `config` are registered immediately.
    pub fn new(model: Arc<ServiceModel>, config: &StubConfig) -> Result<Self> {
        let stubs = config
            .stub_responses
            .then(|| StubStore::new(Arc::clone(&model)));

        let client = Self {
            model,
            stubs,
            settings: config.settings.clone(),
            transport: None,
            api_requests: Mutex::new(Vec::new()),
        };

        for (operation, specs) in &config.stubs {
            client.stub_responses(operation, specs.iter().cloned().map(StubSpec::from))?;
        }

        info!(
            service = %client.model.metadata.service_id,
            stubbing = client.stubbing_enabled(),
            operations = config.stubs.len(),
            "Stubbed client initialized"
        );
        Ok(client)
    }

    /// Create a client with stubbing enabled and default settings.
    pub fn stubbed(model: Arc<ServiceModel>) -> Self {
        Self {
            stubs: Some(StubStore::new(Arc::clone(&model))),
            model,
            settings: GlobalSettings::default(),
            transport: None,
            api_requests: Mutex::new(Vec::new()),
        }
    }

    /// Use `transport` for invocations while stubbing is disabled.
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn model(&self) -> &ServiceModel {
        &self.model
    }

    pub fn stubbing_enabled(&self) -> bool {
        self.stubs.is_some()
    }

    fn store(&self) -> Result<&StubStore> {
        self.stubs.as_ref().ok_or(StubError::StubbingDisabled)
    }

    /// Replace the stubs served for `operation`.
    ///
    /// Every specification is resolved before the queue is touched; if any
    /// fails, the previous queue stays in place.
    pub fn stub_responses<I, S>(&self, operation: &str, specs: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<StubSpec>,
    {
        let store = self.store()?;
        let entries = StubAdapter::new(&self.model)
            .resolve_all(operation, specs.into_iter().map(Into::into))?;
        store.configure(operation, entries);
        Ok(())
    }

    /// Generate output data for `operation` from partial `data`.
    pub fn stub_data(&self, operation: &str, data: Option<&Value>) -> Result<Value> {
        StubGenerator::new(&self.model).stub_operation(operation, data)
    }

    /// Stubbed invocations made so far, oldest first.
    pub fn api_requests(&self) -> Result<Vec<ApiRequest>> {
        self.store()?;
        Ok(self.api_requests.lock().clone())
    }

    /// Decide how the next invocation of `operation` is answered.
    pub fn resolve(&self, operation: &str) -> Result<Resolution> {
        let entry = self.store()?.next(operation)?;

        if self.settings.log_resolutions {
            info!(operation = %operation, kind = entry.kind(), "Resolved stub");
        }

        Ok(match entry {
            StubEntry::Data(data) => Resolution::Data(data),
            StubEntry::Error(err) => Resolution::Raise(StubError::Stubbed(err)),
            StubEntry::HttpResponse(response) => Resolution::Wire(response),
        })
    }

    /// Invoke `operation`.
    pub async fn send(&self, operation: &str, params: Value) -> Result<Value> {
        let op = self.model.operation(operation)?;
        if self.settings.validate_params {
            if let Some(input) = &op.input {
                Validator::new(&self.model).validate(input, &params)?;
            }
        }

        let response = match &self.stubs {
            Some(_) => {
                if self.settings.record_requests {
                    self.api_requests.lock().push(ApiRequest {
                        operation: operation.to_string(),
                        params,
                    });
                }
                match self.resolve(operation)? {
                    Resolution::Raise(err) => return Err(err),
                    Resolution::Data(data) => return Ok(data),
                    Resolution::Wire(response) => response,
                }
            }
            None => {
                let transport = self.transport.as_ref().ok_or(StubError::NoTransport)?;
                debug!(operation = %operation, "Sending request");
                transport.send(operation, &params).await?
            }
        };

        protocol_for(&self.model)?.parse_response(&self.model, operation, &response)
    }
}
