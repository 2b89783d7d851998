// SPDX-FileCopyrightText: 2026 Astra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! [`ChatGateway`] implementation backed by the Gemini family of models.
//!
//! Assembles the system instruction (persona, suggestion tag convention,
//! personality overlay), maps conversation turns onto the wire format, and
//! dispatches each operation to the model configured for it.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use tracing::debug;

use astra_config::model::ApiConfig;
use astra_core::{
    AspectRatio, AstraError, AttachmentData, ChatGateway, ChatStream, ChatTurn, ImageEdit,
    Personality, TurnRole,
};

use crate::client::GeminiClient;
use crate::types::{
    Content, GenerateContentRequest, GenerationConfig, Part, PredictInstance, PredictParameters,
    PredictRequest, SpeechConfig, Tool,
};

/// Base persona shared by every personality. The suggestion tag convention
/// is part of the contract with the session layer, which strips the tags
/// out of the finished reply.
const BASE_INSTRUCTION: &str = "You are Astra, a helpful AI assistant. \
Format responses with markdown where it improves readability. \
After your main response, suggest up to three short follow-up prompts the \
user might send next, each wrapped in [SUGGESTION] and [/SUGGESTION] tags.";

fn personality_overlay(personality: Personality) -> &'static str {
    match personality {
        Personality::Friendly => {
            "Adopt a warm, friendly, and encouraging tone. Use everyday language."
        }
        Personality::Professional => {
            "Adopt a precise, professional tone. Be concise and avoid filler."
        }
        Personality::Humorous => {
            "Adopt a light-hearted, witty tone. Feel free to include tasteful humor."
        }
    }
}

/// Gateway to the Generative Language API.
pub struct GeminiGateway {
    client: GeminiClient,
    config: ApiConfig,
}

impl GeminiGateway {
    /// Builds a gateway from API configuration.
    ///
    /// A missing API key is a configuration error here rather than at load
    /// time, so purely local features keep working without one.
    pub fn from_config(config: &ApiConfig) -> Result<Self, AstraError> {
        let api_key = config
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| AstraError::Config("api.api_key is not set".into()))?;
        let client = GeminiClient::new(api_key, &config.base_url)?;
        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    fn system_instruction(personality: Personality) -> String {
        format!("{BASE_INSTRUCTION}\n\n{}", personality_overlay(personality))
    }

    /// Maps conversation turns onto wire contents. An attachment rides as an
    /// inline-data part ahead of the text of the latest user turn.
    fn build_contents(turns: Vec<ChatTurn>, attachment: Option<AttachmentData>) -> Vec<Content> {
        let mut contents: Vec<Content> = turns
            .into_iter()
            .map(|turn| {
                let role = match turn.role {
                    TurnRole::User => "user",
                    TurnRole::Assistant => "model",
                };
                Content::text(role, turn.text)
            })
            .collect();

        if let Some(attachment) = attachment {
            if let Some(last) = contents
                .iter_mut()
                .rev()
                .find(|content| content.role.as_deref() == Some("user"))
            {
                last.parts.insert(
                    0,
                    Part::inline_data(attachment.mime_type, attachment.data),
                );
            }
        }

        contents
    }
}

#[async_trait]
impl ChatGateway for GeminiGateway {
    async fn stream_chat(
        &self,
        turns: Vec<ChatTurn>,
        personality: Personality,
        use_search: bool,
        attachment: Option<AttachmentData>,
    ) -> Result<ChatStream, AstraError> {
        let request = GenerateContentRequest {
            contents: Self::build_contents(turns, attachment),
            system_instruction: Some(Content::system(Self::system_instruction(personality))),
            tools: use_search.then(|| vec![Tool::google_search()]),
            generation_config: None,
        };
        debug!(model = %self.config.chat_model, use_search, "starting chat stream");
        self.client
            .stream_generate(&self.config.chat_model, &request)
            .await
    }

    async fn generate_image(
        &self,
        prompt: &str,
        aspect_ratio: AspectRatio,
    ) -> Result<String, AstraError> {
        let request = PredictRequest {
            instances: vec![PredictInstance {
                prompt: prompt.to_string(),
            }],
            parameters: PredictParameters {
                sample_count: 1,
                aspect_ratio: aspect_ratio.as_str().to_string(),
                output_mime_type: "image/png".to_string(),
            },
        };
        let response = self.client.predict(&self.config.image_model, &request).await?;

        response
            .predictions
            .into_iter()
            .find_map(|prediction| prediction.bytes_base64_encoded)
            .map(|b64| format!("data:image/png;base64,{b64}"))
            .ok_or_else(|| {
                AstraError::InvalidResponse("Image generation failed to return an image.".into())
            })
    }

    async fn edit_image(
        &self,
        prompt: &str,
        image_b64: &str,
        mime_type: &str,
    ) -> Result<ImageEdit, AstraError> {
        let instruction = format!(
            "{prompt}\n\nAfter editing, also reply with a one-sentence description of the change."
        );
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![
                    Part::inline_data(mime_type, image_b64),
                    Part::text(instruction),
                ],
            }],
            system_instruction: None,
            tools: None,
            generation_config: Some(GenerationConfig {
                response_modalities: Some(vec!["IMAGE".to_string(), "TEXT".to_string()]),
                speech_config: None,
            }),
        };
        let response = self
            .client
            .generate(&self.config.image_edit_model, &request)
            .await?;

        let image_data_url = response.inline_data().map(|data| {
            format!("data:{};base64,{}", data.mime_type, data.data)
        });
        let Some(image_data_url) = image_data_url else {
            return Err(AstraError::InvalidResponse(
                "Image editing failed to return an image.".into(),
            ));
        };
        let description = response
            .text()
            .unwrap_or_else(|| "Here is the edited image.".to_string());

        Ok(ImageEdit {
            image_data_url,
            description,
        })
    }

    async fn synthesize_speech(&self, text: &str) -> Result<Vec<u8>, AstraError> {
        let request = GenerateContentRequest {
            contents: vec![Content::text("user", text)],
            system_instruction: None,
            tools: None,
            generation_config: Some(GenerationConfig {
                response_modalities: Some(vec!["AUDIO".to_string()]),
                speech_config: Some(SpeechConfig::prebuilt_voice(self.config.tts_voice.clone())),
            }),
        };
        let response = self.client.generate(&self.config.tts_model, &request).await?;

        let data = response.inline_data().ok_or_else(|| {
            AstraError::InvalidResponse("The AI returned no audio for this message.".into())
        })?;
        BASE64
            .decode(&data.data)
            .map_err(|e| AstraError::InvalidResponse(format!("invalid audio payload: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    fn test_config(base_url: &str) -> ApiConfig {
        ApiConfig {
            api_key: Some("test-api-key".into()),
            base_url: base_url.to_string(),
            ..ApiConfig::default()
        }
    }

    fn test_gateway(server: &MockServer) -> GeminiGateway {
        GeminiGateway::from_config(&test_config(&server.uri())).unwrap()
    }

    #[test]
    fn missing_api_key_is_a_config_error() {
        let config = ApiConfig::default();
        let result = GeminiGateway::from_config(&config);
        assert!(matches!(result, Err(AstraError::Config(_))));

        let config = ApiConfig {
            api_key: Some("   ".into()),
            ..ApiConfig::default()
        };
        assert!(matches!(
            GeminiGateway::from_config(&config),
            Err(AstraError::Config(_))
        ));
    }

    #[test]
    fn attachment_rides_ahead_of_the_latest_user_text() {
        let turns = vec![
            ChatTurn {
                role: TurnRole::User,
                text: "earlier".into(),
            },
            ChatTurn {
                role: TurnRole::Assistant,
                text: "reply".into(),
            },
            ChatTurn {
                role: TurnRole::User,
                text: "what is in this image?".into(),
            },
        ];
        let attachment = AttachmentData {
            name: "photo.png".into(),
            mime_type: "image/png".into(),
            data: "cGl4ZWxz".into(),
        };

        let contents = GeminiGateway::build_contents(turns, Some(attachment));
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[1].role.as_deref(), Some("model"));

        let last = &contents[2];
        assert_eq!(last.parts.len(), 2);
        assert_eq!(
            last.parts[0].inline_data.as_ref().unwrap().mime_type,
            "image/png"
        );
        assert_eq!(last.parts[1].text.as_deref(), Some("what is in this image?"));
    }

    #[tokio::test]
    async fn stream_chat_sends_persona_and_search_tool() {
        let server = MockServer::start().await;
        let sse = "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"hi\"}]}}]}\n\n";

        Mock::given(method("POST"))
            .and(path("/models/gemini-2.5-flash:streamGenerateContent"))
            .respond_with(move |request: &Request| {
                let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
                let instruction = body["systemInstruction"]["parts"][0]["text"]
                    .as_str()
                    .unwrap();
                assert!(instruction.contains("Astra"));
                assert!(instruction.contains("[SUGGESTION]"));
                assert!(instruction.contains("witty"));
                assert!(body["tools"][0]["googleSearch"].is_object());
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(sse)
            })
            .mount(&server)
            .await;

        let gateway = test_gateway(&server);
        let mut stream = gateway
            .stream_chat(
                vec![ChatTurn {
                    role: TurnRole::User,
                    text: "hello".into(),
                }],
                Personality::Humorous,
                true,
                None,
            )
            .await
            .unwrap();
        let event = stream.next().await.unwrap().unwrap();
        assert_eq!(event.text.as_deref(), Some("hi"));
    }

    #[tokio::test]
    async fn stream_chat_omits_tools_without_search() {
        let server = MockServer::start().await;
        let sse = "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"ok\"}]}}]}\n\n";

        Mock::given(method("POST"))
            .and(path("/models/gemini-2.5-flash:streamGenerateContent"))
            .respond_with(move |request: &Request| {
                let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
                assert!(body.get("tools").is_none());
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(sse)
            })
            .mount(&server)
            .await;

        let gateway = test_gateway(&server);
        let result = gateway
            .stream_chat(
                vec![ChatTurn {
                    role: TurnRole::User,
                    text: "hello".into(),
                }],
                Personality::Friendly,
                false,
                None,
            )
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn generate_image_returns_a_data_url() {
        let server = MockServer::start().await;
        let body = serde_json::json!({
            "predictions": [{"bytesBase64Encoded": "aW1hZ2U=", "mimeType": "image/png"}]
        });

        Mock::given(method("POST"))
            .and(path("/models/imagen-4.0-generate-001:predict"))
            .and(body_partial_json(serde_json::json!({
                "parameters": {"sampleCount": 1, "aspectRatio": "16:9"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .mount(&server)
            .await;

        let gateway = test_gateway(&server);
        let url = gateway
            .generate_image("a sunset", AspectRatio::Landscape)
            .await
            .unwrap();
        assert_eq!(url, "data:image/png;base64,aW1hZ2U=");
    }

    #[tokio::test]
    async fn generate_image_without_prediction_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/imagen-4.0-generate-001:predict"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"predictions": []})),
            )
            .mount(&server)
            .await;

        let gateway = test_gateway(&server);
        let result = gateway.generate_image("a sunset", AspectRatio::Square).await;
        assert!(matches!(result, Err(AstraError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn edit_image_returns_image_and_description() {
        let server = MockServer::start().await;
        let body = serde_json::json!({
            "candidates": [{"content": {"parts": [
                {"inlineData": {"mimeType": "image/png", "data": "ZWRpdGVk"}},
                {"text": "Added a red hat."}
            ]}}]
        });

        Mock::given(method("POST"))
            .and(path("/models/gemini-2.5-flash-image:generateContent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .mount(&server)
            .await;

        let gateway = test_gateway(&server);
        let edit = gateway
            .edit_image("add a red hat", "b3JpZ2luYWw=", "image/png")
            .await
            .unwrap();
        assert_eq!(edit.image_data_url, "data:image/png;base64,ZWRpdGVk");
        assert_eq!(edit.description, "Added a red hat.");
    }

    #[tokio::test]
    async fn edit_image_without_image_part_is_invalid_response() {
        let server = MockServer::start().await;
        let body = serde_json::json!({
            "candidates": [{"content": {"parts": [{"text": "I cannot edit that."}]}}]
        });

        Mock::given(method("POST"))
            .and(path("/models/gemini-2.5-flash-image:generateContent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .mount(&server)
            .await;

        let gateway = test_gateway(&server);
        let result = gateway
            .edit_image("add a hat", "b3JpZ2luYWw=", "image/png")
            .await;
        assert!(matches!(result, Err(AstraError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn synthesize_speech_decodes_audio_payload() {
        let server = MockServer::start().await;
        let pcm = vec![1u8, 2, 3, 4];
        let body = serde_json::json!({
            "candidates": [{"content": {"parts": [
                {"inlineData": {"mimeType": "audio/L16;rate=24000", "data": BASE64.encode(&pcm)}}
            ]}}]
        });

        Mock::given(method("POST"))
            .and(path("/models/gemini-2.5-flash-preview-tts:generateContent"))
            .and(body_partial_json(serde_json::json!({
                "generationConfig": {
                    "responseModalities": ["AUDIO"],
                    "speechConfig": {"voiceConfig": {"prebuiltVoiceConfig": {"voiceName": "Puck"}}}
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .mount(&server)
            .await;

        let gateway = test_gateway(&server);
        let audio = gateway.synthesize_speech("read this aloud").await.unwrap();
        assert_eq!(audio, pcm);
    }

    #[tokio::test]
    async fn synthesize_speech_without_audio_is_invalid_response() {
        let server = MockServer::start().await;
        let body = serde_json::json!({
            "candidates": [{"content": {"parts": [{"text": "no audio here"}]}}]
        });

        Mock::given(method("POST"))
            .and(path("/models/gemini-2.5-flash-preview-tts:generateContent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .mount(&server)
            .await;

        let gateway = test_gateway(&server);
        let result = gateway.synthesize_speech("read this aloud").await;
        assert!(matches!(result, Err(AstraError::InvalidResponse(_))));
    }
}
