//! Harvest, explain and diagram a repository.

use crate::config::{HarvestSettings, ModelSettings};
use crate::error::{Result, ServiceError};
use crate::harvest::document::truncate_chars;
use crate::harvest::{GitHubHarvester, HarvestDocument, HarvestOptions, RepositoryReference};
use crate::llm::{extract_generated_text, InferenceEndpoint, TextGenerator};
use crate::prompts;
use log::info;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

/// Stage names reported with pipeline failures
pub const FETCH_STAGE: &str = "Failed to fetch repository";
/// Stage name for inference endpoint failures
pub const INFERENCE_STAGE: &str = "Failed to call Trainium model";
/// Stage name for diagram generation failures
pub const DIAGRAM_STAGE: &str = "Failed to generate diagram";

/// Result of a full repository analysis
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analysis {
    /// URL the caller asked about
    pub repo_url: String,
    /// Explanation produced by the inference endpoint
    pub explanation: String,
    /// Mermaid flowchart source
    pub mermaid: String,
}

/// Wires the harvester to the two model services
#[derive(Clone)]
pub struct DiagramPipeline {
    harvester: GitHubHarvester,
    generator: Arc<dyn TextGenerator>,
    endpoint: Arc<dyn InferenceEndpoint>,
    options: HarvestOptions,
    harvest: HarvestSettings,
    model: ModelSettings,
}

impl DiagramPipeline {
    /// Creates a pipeline.
    ///
    /// Per-call harvest options are derived from `harvest` and `auth_token`.
    pub fn new(
        harvester: GitHubHarvester,
        generator: Arc<dyn TextGenerator>,
        endpoint: Arc<dyn InferenceEndpoint>,
        harvest: HarvestSettings,
        model: ModelSettings,
        auth_token: Option<String>,
    ) -> Self {
        Self {
            harvester,
            generator,
            endpoint,
            options: harvest.options(auth_token),
            harvest,
            model,
        }
    }

    /// Options used for every harvest this pipeline runs
    pub fn harvest_options(&self) -> &HarvestOptions {
        &self.options
    }

    /// Asks the text model for a Mermaid flowchart of `explanation`
    pub async fn diagram_from_explanation(&self, explanation: &str) -> Result<String> {
        let prompt = prompts::render(prompts::MERMAID_DIAGRAM, explanation);
        let reply = self.generator.generate(&prompt).await?;
        Ok(strip_code_fences(&reply))
    }

    /// Harvests the first listable fallback branch of `url`
    pub async fn harvest_with_fallback(&self, url: &str) -> Result<HarvestDocument> {
        let branches = &self.harvest.fallback_branches;
        let first = branches.first().map(String::as_str).unwrap_or("main");
        let reference = RepositoryReference::parse(url, first)?;

        let mut last_error = None;
        for branch in branches {
            let attempt = reference.with_branch(branch);
            match self.harvester.harvest_reference(&attempt, &self.options).await {
                Ok(document) => return Ok(document),
                Err(e @ ServiceError::TreeFetch { .. }) => {
                    info!("Branch '{}' unavailable ({}), trying next", branch, e);
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        match last_error {
            Some(e) => Err(e),
            None => self.harvester.harvest_reference(&reference, &self.options).await,
        }
    }

    /// Runs the explanation model over a harvest of `url` and diagrams the result
    pub async fn analyze_repository(&self, url: &str) -> Result<Analysis> {
        info!("Analyzing repository: {}", url);

        let document = self
            .harvest_with_fallback(url)
            .await
            .map_err(|e| ServiceError::in_stage(FETCH_STAGE, e))?;
        let code = document.to_string();
        info!("Fetched {} characters of code", code.chars().count());

        let context = truncate_chars(&code, self.harvest.max_context_chars);
        if context.len() < code.len() {
            info!("Truncated to {} characters", self.harvest.max_context_chars);
        }

        let explanation = self
            .explain(&context)
            .await
            .map_err(|e| ServiceError::in_stage(INFERENCE_STAGE, e))?;
        info!("Generated explanation: {} characters", explanation.chars().count());

        let mermaid = self
            .diagram_from_explanation(&explanation)
            .await
            .map_err(|e| ServiceError::in_stage(DIAGRAM_STAGE, e))?;
        info!("Analysis complete for {}", url);

        Ok(Analysis {
            repo_url: url.to_string(),
            explanation,
            mermaid,
        })
    }

    async fn explain(&self, code: &str) -> Result<String> {
        let payload = self.inference_payload(code);
        let reply = self.endpoint.invoke(&payload).await?;
        Ok(extract_generated_text(&reply))
    }

    fn inference_payload(&self, code: &str) -> Value {
        json!({
            "inputs": prompts::render(prompts::CODE_ANALYSIS, code),
            "parameters": {
                "max_new_tokens": self.model.max_new_tokens,
                "temperature": self.model.temperature,
                "do_sample": true
            }
        })
    }
}

/// Removes Markdown code fences around a model reply.
///
/// Replies opening with a Mermaid fence lose every "```mermaid" and "```";
/// replies opening with a bare fence lose every "```".
pub fn strip_code_fences(reply: &str) -> String {
    let code = reply.trim();
    if code.starts_with("```mermaid") {
        code.replace("```mermaid", "").replace("```", "").trim().to_string()
    } else if code.starts_with("```") {
        code.replace("```", "").trim().to_string()
    } else {
        code.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{MockInferenceEndpoint, MockTextGenerator};
    use wiremock::matchers::{method, path, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn pipeline(
        server: &MockServer,
        generator: MockTextGenerator,
        endpoint: MockInferenceEndpoint,
    ) -> DiagramPipeline {
        pipeline_with(server, generator, endpoint, HarvestSettings::default())
    }

    fn pipeline_with(
        server: &MockServer,
        generator: MockTextGenerator,
        endpoint: MockInferenceEndpoint,
        settings: HarvestSettings,
    ) -> DiagramPipeline {
        DiagramPipeline::new(
            GitHubHarvester::with_base_urls(server.uri(), server.uri()).unwrap(),
            Arc::new(generator),
            Arc::new(endpoint),
            settings,
            ModelSettings::default(),
            None,
        )
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```mermaid\ngraph TB\nA --> B\n```"), "graph TB\nA --> B");
        assert_eq!(strip_code_fences("```\ngraph TB\n```\n"), "graph TB");
        assert_eq!(strip_code_fences("  graph TB\nA --> B  "), "graph TB\nA --> B");
    }

    #[tokio::test]
    async fn test_diagram_from_explanation() {
        let server = MockServer::start().await;
        let mut generator = MockTextGenerator::new();
        generator
            .expect_generate()
            .withf(|prompt: &str| prompt.contains("Codebase Explanation:\nA REST API"))
            .times(1)
            .returning(|_| Ok("```mermaid\ngraph TB\nAPI --> DB[(Postgres)]\n```".to_string()));

        let pipeline = pipeline(&server, generator, MockInferenceEndpoint::new());
        let mermaid = pipeline.diagram_from_explanation("A REST API").await.unwrap();
        assert_eq!(mermaid, "graph TB\nAPI --> DB[(Postgres)]");
    }

    #[tokio::test]
    async fn test_analyze_falls_back_to_master() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/widget/git/trees/main"))
            .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/widget/git/trees/master"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "tree": [{"path": "app.py", "type": "blob"}]
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/acme/widget/master/app.py"))
            .respond_with(ResponseTemplate::new(200).set_body_string("print('hi')\n"))
            .mount(&server)
            .await;

        let mut endpoint = MockInferenceEndpoint::new();
        endpoint
            .expect_invoke()
            .withf(|payload: &Value| {
                let inputs = payload["inputs"].as_str().unwrap_or_default();
                inputs.contains("---> app.py\n     print('hi')")
                    && payload["parameters"]["max_new_tokens"] == json!(150)
                    && payload["parameters"]["do_sample"] == json!(true)
            })
            .times(1)
            .returning(|_| Ok(json!([{"generated_text": "Prints a greeting."}])));

        let mut generator = MockTextGenerator::new();
        generator
            .expect_generate()
            .withf(|prompt: &str| prompt.contains("Prints a greeting."))
            .times(1)
            .returning(|_| Ok("graph TB\nA --> B".to_string()));

        let pipeline = pipeline(&server, generator, endpoint);
        let analysis = pipeline
            .analyze_repository("https://github.com/acme/widget")
            .await
            .unwrap();

        assert_eq!(analysis.repo_url, "https://github.com/acme/widget");
        assert_eq!(analysis.explanation, "Prints a greeting.");
        assert_eq!(analysis.mermaid, "graph TB\nA --> B");
    }

    #[tokio::test]
    async fn test_analyze_truncates_context() {
        let server = MockServer::start().await;
        let tree: Vec<Value> = (0..40)
            .map(|i| json!({"path": format!("pkg/module_{}.py", i), "type": "blob"}))
            .collect();
        Mock::given(method("GET"))
            .and(path("/repos/acme/big/git/trees/main"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "tree": tree })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path_regex(r"^/acme/big/main/pkg/.*\.py$"))
            .respond_with(ResponseTemplate::new(200).set_body_string("x = 1\n"))
            .mount(&server)
            .await;

        let mut endpoint = MockInferenceEndpoint::new();
        endpoint
            .expect_invoke()
            .withf(|payload: &Value| {
                let inputs = payload["inputs"].as_str().unwrap_or_default();
                let code = inputs
                    .strip_prefix("Code analysis:\n\n")
                    .and_then(|rest| rest.strip_suffix("\n\nExplain: what does this code do?"))
                    .unwrap_or_default();
                code.chars().count() == 500
            })
            .times(1)
            .returning(|_| Ok(json!({"generated_text": "Many modules."})));

        let mut generator = MockTextGenerator::new();
        generator
            .expect_generate()
            .returning(|_| Ok("graph TB".to_string()));

        let pipeline = pipeline(&server, generator, endpoint);
        let analysis = pipeline.analyze_repository("https://github.com/acme/big").await.unwrap();
        assert_eq!(analysis.explanation, "Many modules.");
    }

    #[tokio::test]
    async fn test_analyze_reports_fetch_stage() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path_regex(r"^/repos/acme/gone/git/trees/.*$"))
            .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
            .expect(2)
            .mount(&server)
            .await;

        let pipeline = pipeline(&server, MockTextGenerator::new(), MockInferenceEndpoint::new());
        let error = pipeline
            .analyze_repository("https://github.com/acme/gone")
            .await
            .unwrap_err();

        assert_eq!(
            error.to_string(),
            "Failed to fetch repository: Could not fetch repo tree: 404 Not Found"
        );
        assert!(matches!(error.root(), ServiceError::TreeFetch { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_analyze_rejects_malformed_url() {
        let server = MockServer::start().await;
        let pipeline = pipeline(&server, MockTextGenerator::new(), MockInferenceEndpoint::new());

        let error = pipeline.analyze_repository("https://github.com").await.unwrap_err();
        assert!(error.is_client_error());
    }

    #[tokio::test]
    async fn test_analyze_reports_inference_stage() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/widget/git/trees/main"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"tree": []})))
            .mount(&server)
            .await;

        let mut endpoint = MockInferenceEndpoint::new();
        endpoint
            .expect_invoke()
            .returning(|_| Err(ServiceError::Inference("endpoint not found".into())));

        let pipeline = pipeline(&server, MockTextGenerator::new(), endpoint);
        let error = pipeline
            .analyze_repository("https://github.com/acme/widget")
            .await
            .unwrap_err();
        assert!(error.to_string().starts_with(INFERENCE_STAGE));
        assert_eq!(error.status_code(), 500);
    }

    #[test]
    fn test_harvest_options_follow_settings() {
        let server_uri = "http://127.0.0.1:9";
        let settings = HarvestSettings {
            max_file_size: 4_096,
            file_timeout_secs: 3,
            include_extensions: Some(vec![".rs".into()]),
            ..HarvestSettings::default()
        };
        let pipeline = DiagramPipeline::new(
            GitHubHarvester::with_base_urls(server_uri, server_uri).unwrap(),
            Arc::new(MockTextGenerator::new()),
            Arc::new(MockInferenceEndpoint::new()),
            settings,
            ModelSettings::default(),
            Some("ghp_token".into()),
        );

        let options = pipeline.harvest_options();
        assert_eq!(options.max_file_size, 4_096);
        assert_eq!(options.file_timeout, std::time::Duration::from_secs(3));
        assert_eq!(options.auth_token.as_deref(), Some("ghp_token"));
        assert!(options.allowed_extensions().contains(".rs"));
        assert!(!options.allowed_extensions().contains(".py"));
    }

    #[test]
    fn test_default_pipeline_limit_is_settings_default() {
        let server_uri = "http://127.0.0.1:9";
        let pipeline = DiagramPipeline::new(
            GitHubHarvester::with_base_urls(server_uri, server_uri).unwrap(),
            Arc::new(MockTextGenerator::new()),
            Arc::new(MockInferenceEndpoint::new()),
            HarvestSettings::default(),
            ModelSettings::default(),
            None,
        );
        assert_eq!(
            pipeline.harvest_options().max_file_size,
            HarvestSettings::default().max_file_size
        );
    }

    #[tokio::test]
    async fn test_analyze_applies_configured_size_limit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/widget/git/trees/main"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "tree": [{"path": "big.py", "type": "blob"}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/acme/widget/main/big.py"))
            .respond_with(ResponseTemplate::new(200).set_body_string("y = 2\n".repeat(10)))
            .mount(&server)
            .await;

        let mut endpoint = MockInferenceEndpoint::new();
        endpoint
            .expect_invoke()
            .withf(|payload: &Value| {
                let inputs = payload["inputs"].as_str().unwrap_or_default();
                inputs.contains("[Skipped big.py: size 60 bytes > 16]") && !inputs.contains("y = 2")
            })
            .times(1)
            .returning(|_| Ok(json!({"generated_text": "Too big to read."})));

        let mut generator = MockTextGenerator::new();
        generator
            .expect_generate()
            .returning(|_| Ok("graph TB".to_string()));

        let settings = HarvestSettings {
            max_file_size: 16,
            ..HarvestSettings::default()
        };
        let pipeline = pipeline_with(&server, generator, endpoint, settings);
        let analysis = pipeline
            .analyze_repository("https://github.com/acme/widget")
            .await
            .unwrap();
        assert_eq!(analysis.explanation, "Too big to read.");
    }
}
