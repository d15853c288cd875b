use std::sync::Arc;

use anyhow::Result;
use palaver_domain::{Provider, Services};

use crate::provider::PalaverProviderService;
use crate::tool_service::PalaverToolService;

/// Application container handing the orchestrator its inference client and
/// tool registry.
#[derive(Clone)]
pub struct PalaverServices {
    tool_service: Arc<PalaverToolService>,
    provider_service: Arc<PalaverProviderService>,
}

impl PalaverServices {
    pub fn new(provider: Provider) -> Result<Self> {
        let tool_service = Arc::new(PalaverToolService::new());
        let provider_service = Arc::new(PalaverProviderService::new(provider)?);
        Ok(Self { tool_service, provider_service })
    }
}

impl Services for PalaverServices {
    type ProviderService = PalaverProviderService;
    type ToolService = PalaverToolService;

    fn provider_service(&self) -> &Self::ProviderService {
        &self.provider_service
    }

    fn tool_service(&self) -> &Self::ToolService {
        &self.tool_service
    }
}
