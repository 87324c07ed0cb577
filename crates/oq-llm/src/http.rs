use crate::{GeneratePlanRequest, GeneratedPlan, LlmError, PlanGenerator};
use async_trait::async_trait;
use serde::Deserialize;

/// Calls a configurable HTTP endpoint that is expected to return a
/// `GeneratedPlan`-shaped JSON body. Prompting, model choice, and any
/// JSON-repair logic live entirely on the other side of this HTTP call.
#[derive(Debug, Clone)]
pub struct HttpPlanGenerator {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpPlanGenerator {
    pub fn new(endpoint: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint,
        }
    }
}

#[async_trait]
impl PlanGenerator for HttpPlanGenerator {
    async fn generate_plan(
        &self,
        request: &GeneratePlanRequest,
    ) -> Result<GeneratedPlan, LlmError> {
        let resp = self
            .http
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| LlmError::Request(e.to_string()))?;

        let status = resp.status();
        let body: HttpPlanResponse = resp
            .json()
            .await
            .map_err(|e| LlmError::Decode(e.to_string()))?;

        if !status.is_success() {
            return Err(LlmError::Request(format!(
                "http status={} message={}",
                status.as_u16(),
                body.error.unwrap_or_else(|| "unknown".to_string())
            )));
        }

        body.plan
            .ok_or_else(|| LlmError::Decode("response carried no plan".to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct HttpPlanResponse {
    #[serde(default)]
    plan: Option<GeneratedPlan>,
    #[serde(default)]
    error: Option<String>,
}
