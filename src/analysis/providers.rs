//! Remote captioning providers (Hugging Face Inference API).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use serde_json::{json, Value};

use super::{DescriptionProvider, ImageInput, ProviderError};

pub const DEFAULT_HF_BASE_URL: &str = "https://api-inference.huggingface.co/models";

const QWEN_VL_MODEL: &str = "Qwen/Qwen2-VL-2B-Instruct";
const BLIP2_MODEL: &str = "Salesforce/blip2-opt-2.7b";
const BLIP_LARGE_MODEL: &str = "Salesforce/blip-image-captioning-large";

const QWEN_VL_TIMEOUT: Duration = Duration::from_secs(18);
const BLIP_TIMEOUT: Duration = Duration::from_secs(15);

const CAPTION_PROMPT: &str = "Describe the image succinctly.";

#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub base_url: String,
    /// Optional bearer token; requests go out anonymously without it.
    pub token: Option<String>,
    pub remote_enabled: bool,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_HF_BASE_URL.to_string(),
            token: None,
            remote_enabled: true,
        }
    }
}

/// How the image is sent to the model.
#[derive(Debug, Clone)]
pub enum RequestStyle {
    /// JSON chat message with the image as a data URL.
    VisionChat { prompt: String },
    /// The raw image bytes as the request body.
    RawImage,
}

pub struct HuggingFaceProvider {
    name: String,
    model: String,
    style: RequestStyle,
    timeout: Duration,
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HuggingFaceProvider {
    pub fn new(
        client: reqwest::Client,
        settings: &ProviderSettings,
        name: &str,
        model: &str,
        style: RequestStyle,
        timeout: Duration,
    ) -> Self {
        Self {
            name: name.to_string(),
            model: model.to_string(),
            style,
            timeout,
            client,
            base_url: settings.base_url.clone(),
            token: settings.token.clone(),
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), self.model)
    }
}

fn image_data_url(image: &ImageInput) -> String {
    let b64 = base64::engine::general_purpose::STANDARD.encode(&image.bytes);
    format!("data:{};base64,{}", image.mime_type, b64)
}

pub fn chat_payload(image: &ImageInput, prompt: &str) -> Value {
    json!({
        "inputs": [
            {
                "role": "user",
                "content": [
                    { "type": "image", "image": image_data_url(image) },
                    { "type": "text", "text": prompt }
                ]
            }
        ],
        "parameters": { "max_new_tokens": 200, "temperature": 0.1 }
    })
}

/// Caption text from either `[{"generated_text": ..}]` or `{"generated_text": ..}`.
pub fn extract_generated_text(body: &Value) -> Option<String> {
    body.pointer("/0/generated_text")
        .or_else(|| body.get("generated_text"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[async_trait]
impl DescriptionProvider for HuggingFaceProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn describe(&self, image: &ImageInput) -> Result<String, ProviderError> {
        let mut req = self.client.post(self.endpoint()).timeout(self.timeout);
        if let Some(token) = self.token.as_deref() {
            req = req.header("Authorization", format!("Bearer {}", token));
        }

        req = match &self.style {
            RequestStyle::VisionChat { prompt } => req.json(&chat_payload(image, prompt)),
            RequestStyle::RawImage => req
                .header("Content-Type", "application/octet-stream")
                .body(image.bytes.clone()),
        };

        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ProviderError::Status(status.as_u16()));
        }

        let body: Value = resp
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;
        extract_generated_text(&body).ok_or(ProviderError::EmptyOutput)
    }
}

/// Qwen2-VL first, then BLIP-2, then BLIP large.
pub fn default_chain(settings: &ProviderSettings) -> Vec<Arc<dyn DescriptionProvider>> {
    let client = reqwest::Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_default();

    vec![
        Arc::new(HuggingFaceProvider::new(
            client.clone(),
            settings,
            "qwen2-vl",
            QWEN_VL_MODEL,
            RequestStyle::VisionChat {
                prompt: CAPTION_PROMPT.to_string(),
            },
            QWEN_VL_TIMEOUT,
        )),
        Arc::new(HuggingFaceProvider::new(
            client.clone(),
            settings,
            "blip2",
            BLIP2_MODEL,
            RequestStyle::RawImage,
            BLIP_TIMEOUT,
        )),
        Arc::new(HuggingFaceProvider::new(
            client,
            settings,
            "blip-large",
            BLIP_LARGE_MODEL,
            RequestStyle::RawImage,
            BLIP_TIMEOUT,
        )),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};

    fn input() -> ImageInput {
        ImageInput {
            original_name: "cat.png".to_string(),
            mime_type: "image/png".to_string(),
            bytes: vec![1, 2, 3],
        }
    }

    /// Serve `router` on an ephemeral local port and return its base URL.
    async fn spawn_stub(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });
        format!("http://{}/models", addr)
    }

    fn provider(base_url: String, style: RequestStyle) -> HuggingFaceProvider {
        let settings = ProviderSettings {
            base_url,
            token: Some("secret".to_string()),
            remote_enabled: true,
        };
        HuggingFaceProvider::new(
            reqwest::Client::new(),
            &settings,
            "stub",
            "org/model",
            style,
            Duration::from_secs(5),
        )
    }

    #[test]
    fn generated_text_from_array_or_object() {
        assert_eq!(
            extract_generated_text(&json!([{ "generated_text": " a cat " }])),
            Some("a cat".to_string())
        );
        assert_eq!(
            extract_generated_text(&json!({ "generated_text": "a dog" })),
            Some("a dog".to_string())
        );
        assert_eq!(extract_generated_text(&json!([{ "generated_text": "" }])), None);
        assert_eq!(extract_generated_text(&json!({ "error": "loading" })), None);
    }

    #[test]
    fn chat_payload_embeds_data_url() {
        let payload = chat_payload(&input(), CAPTION_PROMPT);
        assert_eq!(
            payload["inputs"][0]["content"][0]["image"],
            "data:image/png;base64,AQID"
        );
        assert_eq!(payload["inputs"][0]["content"][1]["text"], CAPTION_PROMPT);
        assert_eq!(payload["parameters"]["max_new_tokens"], 200);
    }

    #[test]
    fn endpoint_joins_base_and_model() {
        let p = provider("http://localhost:9/models/".to_string(), RequestStyle::RawImage);
        assert_eq!(p.endpoint(), "http://localhost:9/models/org/model");
    }

    #[test]
    fn default_chain_order() {
        let chain = default_chain(&ProviderSettings::default());
        let names: Vec<&str> = chain.iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["qwen2-vl", "blip2", "blip-large"]);
    }

    #[tokio::test]
    async fn raw_image_provider_reads_caption() {
        let router = Router::new().route(
            "/models/org/model",
            post(|headers: HeaderMap, body: axum::body::Bytes| async move {
                assert_eq!(headers["authorization"], "Bearer secret");
                assert_eq!(headers["content-type"], "application/octet-stream");
                assert_eq!(body.as_ref(), &[1u8, 2, 3][..]);
                Json(json!([{ "generated_text": "a cat on a sofa" }]))
            }),
        );
        let base = spawn_stub(router).await;

        let text = provider(base, RequestStyle::RawImage)
            .describe(&input())
            .await
            .unwrap();
        assert_eq!(text, "a cat on a sofa");
    }

    #[tokio::test]
    async fn vision_chat_provider_sends_json() {
        let router = Router::new().route(
            "/models/org/model",
            post(|Json(body): Json<Value>| async move {
                let text = body["inputs"][0]["content"][1]["text"]
                    .as_str()
                    .unwrap_or_default()
                    .to_string();
                Json(json!({ "generated_text": format!("echo: {}", text) }))
            }),
        );
        let base = spawn_stub(router).await;

        let style = RequestStyle::VisionChat {
            prompt: "hello".to_string(),
        };
        let text = provider(base, style).describe(&input()).await.unwrap();
        assert_eq!(text, "echo: hello");
    }

    #[tokio::test]
    async fn error_status_is_a_provider_error() {
        let router = Router::new().route(
            "/models/org/model",
            post(|| async { (StatusCode::SERVICE_UNAVAILABLE, "model loading") }),
        );
        let base = spawn_stub(router).await;

        let err = provider(base, RequestStyle::RawImage)
            .describe(&input())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Status(503)));
    }
}
