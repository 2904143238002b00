//! Service registry with async handlers
//!
//! Devices expose their commands here (`fan.set_percentage`,
//! `light.turn_on`, ...) and the controller exposes its own
//! (`smart_vent.set_mode`, `smart_vent.force_boost`). The registry routes a
//! call to its handler and awaits it, so callers get blocking semantics.

use async_trait::async_trait;
use dashmap::DashMap;
use jsonschema::JSONSchema;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use sv_core::{Context, ServiceCall, ServiceCaller, SupportsResponse};
use tracing::{debug, instrument, warn};

pub use sv_core::ServiceError;

/// Result type for service calls
pub type ServiceResult = Result<Option<serde_json::Value>, ServiceError>;

/// Future type for async service handlers
pub type ServiceFuture = Pin<Box<dyn Future<Output = ServiceResult> + Send>>;

/// Service handler function type
pub type ServiceHandler = Arc<dyn Fn(ServiceCall) -> ServiceFuture + Send + Sync>;

/// Information about a registered service
#[derive(Debug, Clone)]
pub struct ServiceDescription {
    pub domain: String,
    pub service: String,
    /// Human-readable name
    pub name: Option<String>,
    /// Description of what the service does
    pub description: Option<String>,
    /// JSON schema the service data must satisfy
    pub schema: Option<serde_json::Value>,
    pub supports_response: SupportsResponse,
}

impl ServiceDescription {
    /// A description with no schema and no response
    pub fn new(domain: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            service: service.into(),
            name: None,
            description: None,
            schema: None,
            supports_response: SupportsResponse::None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_schema(mut self, schema: serde_json::Value) -> Self {
        self.schema = Some(schema);
        self
    }
}

struct RegisteredService {
    handler: ServiceHandler,
    description: ServiceDescription,
    validator: Option<Arc<JSONSchema>>,
}

/// All registered services, keyed by "domain.service"
pub struct ServiceRegistry {
    services: DashMap<String, RegisteredService>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self {
            services: DashMap::new(),
        }
    }

    /// Register a service, replacing any existing one with the same key
    ///
    /// A schema that fails to compile is dropped with a warning and the
    /// service is registered without data validation.
    #[instrument(skip(self, handler), fields(domain = %description.domain, service = %description.service))]
    pub fn register<F, Fut>(&self, description: ServiceDescription, handler: F)
    where
        F: Fn(ServiceCall) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ServiceResult> + Send + 'static,
    {
        let key = format!("{}.{}", description.domain, description.service);
        debug!("Registering service");

        let validator = description.schema.as_ref().and_then(|schema| {
            match JSONSchema::compile(schema) {
                Ok(compiled) => Some(Arc::new(compiled)),
                Err(e) => {
                    warn!(error = %e, "Ignoring invalid service schema");
                    None
                }
            }
        });

        let handler: ServiceHandler =
            Arc::new(move |call| Box::pin(handler(call)) as ServiceFuture);

        self.services.insert(
            key,
            RegisteredService {
                handler,
                description,
                validator,
            },
        );
    }

    /// Call a service and wait for its handler to finish
    #[instrument(skip(self, service_data, context))]
    pub async fn call(
        &self,
        domain: &str,
        service: &str,
        service_data: serde_json::Value,
        context: Context,
        return_response: bool,
    ) -> ServiceResult {
        let key = format!("{}.{}", domain, service);

        let (handler, validator) = {
            let registered = self.services.get(&key).ok_or_else(|| {
                warn!("Service not found");
                ServiceError::NotFound {
                    domain: domain.to_string(),
                    service: service.to_string(),
                }
            })?;

            if return_response
                && registered.description.supports_response == SupportsResponse::None
            {
                return Err(ServiceError::ResponseNotSupported);
            }

            // Release the map guard before awaiting the handler
            (registered.handler.clone(), registered.validator.clone())
        };

        if let Some(validator) = validator {
            if let Err(errors) = validator.validate(&service_data) {
                let reason = errors
                    .map(|e| e.to_string())
                    .collect::<Vec<_>>()
                    .join("; ");
                warn!(%reason, "Rejected service data");
                return Err(ServiceError::InvalidData(reason));
            }
        }

        debug!("Calling service");
        let result = handler(ServiceCall::new(domain, service, service_data, context)).await?;

        Ok(if return_response { result } else { None })
    }

    pub fn has_service(&self, domain: &str, service: &str) -> bool {
        self.services.contains_key(&format!("{}.{}", domain, service))
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ServiceCaller for ServiceRegistry {
    async fn call_service(
        &self,
        domain: &str,
        service: &str,
        service_data: serde_json::Value,
        context: Context,
    ) -> Result<(), ServiceError> {
        self.call(domain, service, service_data, context, false)
            .await
            .map(|_| ())
    }
}
