//! OpenAI chat-completions request -> internal Gemini envelope.

use crate::convert::{
    ScratchCaches, clean_tool_schema, resolve_thinking_budget, sanitize_tool_name,
    thinking_enabled, validate_tool_schema,
};
use serde_json::{Value, json};
use std::collections::HashMap;
use tracing::{debug, warn};
use uuid::Uuid;
use vega_schema::antigravity::{AntigravityRequestBody, RequestMeta};
use vega_schema::gemini::{
    Content, FileData, FunctionCall, FunctionDeclaration, FunctionResponse, GeminiRequest,
    GenerationConfig, InlineData, Part, ThinkingConfig, Tool, ToolConfig,
};
use vega_schema::openai::{ChatCompletionRequest, ChatMessage, MessageContent};
use vega_thoughtsig::ModelFamily;

pub const STREAM_URL_SUFFIX: &str = "/v1internal:streamGenerateContent?alt=sse";
pub const NO_STREAM_URL_SUFFIX: &str = "/v1internal:generateContent";

const DEFAULT_STOP_SEQUENCES: &[&str] = &[
    "<|user|>",
    "<|bot|>",
    "<|context_request|>",
    "<|endoftext|>",
    "<|end_of_turn|>",
];

/// Image models are served by the non-streaming upstream endpoint and get a
/// stripped-down request.
pub fn is_image_model(model: &str) -> bool {
    model.to_ascii_lowercase().ends_with("-image")
}

/// Per-request linkage from `tool_call_id` to the sanitized name and thought
/// signature recorded while walking assistant turns; consumed when the
/// matching `tool` message arrives later in the same request.
struct ToolCallLink {
    safe_name: String,
    thought_signature: Option<String>,
}

/// Convert an OpenAI chat-completions request into the upstream envelope.
///
/// Returns the envelope plus the URL suffix of the endpoint it must be sent
/// to.
pub fn openai_to_internal(
    req: &ChatCompletionRequest,
    project_id: &str,
    session_id: &str,
    caches: &ScratchCaches,
) -> (AntigravityRequestBody, &'static str) {
    let model = req.model.as_str();
    let image = is_image_model(model);
    let thinking = thinking_enabled(model);
    let family = ModelFamily::of(model);
    let session = (!session_id.is_empty()).then_some(session_id);

    let mut links: HashMap<String, ToolCallLink> = HashMap::new();
    let mut system_texts: Vec<String> = Vec::new();
    let mut collecting_system = true;
    let mut contents: Vec<Content> = Vec::new();

    for msg in &req.messages {
        if msg.role == "system" && collecting_system {
            collect_system_text(msg, &mut system_texts);
            continue;
        }
        collecting_system = false;

        match msg.role.as_str() {
            "assistant" => {
                contents.push(convert_assistant_message(
                    msg, model, session, thinking, family, caches, &mut links,
                ));
            }
            "tool" => {
                let part = convert_tool_message(msg, &links);
                attach_function_response(&mut contents, part);
            }
            // `user`, late `system`, and anything unrecognized all land on
            // the user role.
            _ => contents.push(Content::user(content_to_parts(msg.content.as_ref()))),
        }
    }

    let system_instruction = (!system_texts.is_empty()).then(|| Content {
        role: None,
        parts: vec![Part::text(system_texts.join("\n\n"))],
        ..Content::default()
    });

    let generation_config = build_generation_config(req, thinking, family);
    let (tools, tool_config) = convert_tools(req, model, session, caches);

    let request = GeminiRequest {
        contents,
        session_id: session.map(str::to_string),
        system_instruction,
        generation_config: Some(generation_config),
        tools,
        tool_config,
        extra: Default::default(),
    };

    let mut body = RequestMeta {
        project: project_id.to_string(),
        request_id: format!("agent-{}", Uuid::new_v4()),
        model: model.to_string(),
    }
    .into_request(request);

    if image {
        // Image generation takes a bare prompt: no instruction, no tools,
        // and a single candidate.
        body.request_type = Some(AntigravityRequestBody::REQUEST_TYPE_IMAGE_GEN.to_string());
        body.request.system_instruction = None;
        body.request.tools = None;
        body.request.tool_config = None;
        body.request.generation_config = Some(GenerationConfig {
            candidate_count: Some(1),
            ..GenerationConfig::default()
        });
    }

    debug!(
        model,
        stream = req.stream,
        image,
        thinking,
        contents = body.request.contents.len(),
        "Converted OpenAI request"
    );

    let url_suffix = if req.stream && !image {
        STREAM_URL_SUFFIX
    } else {
        NO_STREAM_URL_SUFFIX
    };
    (body, url_suffix)
}

fn collect_system_text(msg: &ChatMessage, system_texts: &mut Vec<String>) {
    match msg.content.as_ref() {
        Some(MessageContent::Text(text)) => system_texts.push(text.clone()),
        Some(MessageContent::Parts(parts)) => {
            for part in parts {
                if part.kind.as_deref() == Some("text") {
                    let text = extract_text_value(part.text.as_ref());
                    if !text.is_empty() {
                        system_texts.push(text);
                    }
                }
            }
        }
        Some(MessageContent::Other(value)) => {
            let text = extract_text_value(Some(value));
            if !text.is_empty() {
                system_texts.push(text);
            }
        }
        None => {}
    }
}

fn convert_assistant_message(
    msg: &ChatMessage,
    model: &str,
    session: Option<&str>,
    thinking: bool,
    family: ModelFamily,
    caches: &ScratchCaches,
    links: &mut HashMap<String, ToolCallLink>,
) -> Content {
    let mut parts = content_to_parts(msg.content.as_ref());

    if thinking {
        // The upstream requires every model turn to open with a thought
        // marker plus an echoed signature; synthesize them when the client
        // supplied none.
        let reasoning_text = msg
            .reasoning_content
            .as_deref()
            .filter(|text| !text.is_empty())
            .unwrap_or(" ");
        let signature = msg
            .thought_signature
            .clone()
            .or_else(|| {
                caches
                    .signatures
                    .get_reasoning(session, model)
                    .map(|sig| sig.to_string())
            })
            .unwrap_or_else(|| family.reasoning_fallback().to_string());

        parts.insert(
            0,
            Part {
                text: Some(" ".to_string()),
                thought_signature: Some(signature),
                ..Part::default()
            },
        );
        parts.insert(
            0,
            Part {
                text: Some(reasoning_text.to_string()),
                thought: Some(true),
                ..Part::default()
            },
        );
    }

    for tool_call in msg.tool_calls.as_deref().unwrap_or_default() {
        if tool_call.kind.as_deref().is_some_and(|kind| kind != "function") {
            continue;
        }
        let Some(name) = tool_call.function.name.as_deref().filter(|n| !n.is_empty()) else {
            continue;
        };

        let safe_name = sanitize_tool_name(name);
        caches.tool_names.set(session, model, &safe_name, name);

        let args = parse_tool_arguments(tool_call.function.arguments.as_ref());
        let signature = thinking.then(|| {
            tool_call
                .thought_signature
                .clone()
                .or_else(|| {
                    caches
                        .signatures
                        .get_tool(session, model)
                        .map(|sig| sig.to_string())
                })
                .unwrap_or_else(|| family.tool_fallback().to_string())
        });

        if let Some(id) = tool_call.id.as_deref() {
            links.insert(
                id.to_string(),
                ToolCallLink {
                    safe_name: safe_name.clone(),
                    thought_signature: signature.clone(),
                },
            );
        }

        parts.push(Part {
            function_call: Some(FunctionCall {
                id: tool_call.id.clone(),
                name: safe_name,
                args,
                thought_signature: None,
                extra: Default::default(),
            }),
            thought_signature: signature,
            ..Part::default()
        });
    }

    Content::model(parts)
}

fn convert_tool_message(msg: &ChatMessage, links: &HashMap<String, ToolCallLink>) -> Part {
    let link = msg.tool_call_id.as_deref().and_then(|id| links.get(id));

    let name = link
        .map(|link| link.safe_name.clone())
        .or_else(|| {
            msg.name
                .as_deref()
                .filter(|n| !n.is_empty())
                .map(sanitize_tool_name)
        })
        .unwrap_or_else(|| {
            warn!("Tool message missing a resolvable function name");
            "unknown_function".to_string()
        });

    let output = match msg.content.as_ref() {
        Some(MessageContent::Text(text)) => text.clone(),
        Some(MessageContent::Parts(parts)) => {
            serde_json::to_string(parts).unwrap_or_default()
        }
        Some(MessageContent::Other(value)) => value.to_string(),
        None => String::new(),
    };

    let signature = msg
        .thought_signature
        .clone()
        .or_else(|| link.and_then(|link| link.thought_signature.clone()));

    Part {
        function_response: Some(FunctionResponse {
            id: msg.tool_call_id.clone(),
            name,
            response: json!({"output": output}),
            extra: Default::default(),
        }),
        thought_signature: signature,
        ..Part::default()
    }
}

/// A `tool` message joins the preceding user entry when that entry already
/// ends in a function response (parallel tool results), otherwise it opens a
/// new user entry of its own.
fn attach_function_response(contents: &mut Vec<Content>, part: Part) {
    if let Some(last) = contents.last_mut()
        && last.role.as_deref() == Some("user")
        && last
            .parts
            .last()
            .is_some_and(|p| p.function_response.is_some())
    {
        last.parts.push(part);
        return;
    }
    contents.push(Content::user(vec![part]));
}

fn content_to_parts(content: Option<&MessageContent>) -> Vec<Part> {
    match content {
        Some(MessageContent::Text(text)) => vec![Part::text(text.clone())],
        Some(MessageContent::Parts(items)) => {
            let mut parts = Vec::new();
            for item in items {
                match item.kind.as_deref() {
                    Some("text") => {
                        parts.push(Part::text(extract_text_value(item.text.as_ref())));
                    }
                    Some("image_url") => {
                        let url = item
                            .image_url
                            .as_ref()
                            .map(|u| u.url.as_str())
                            .unwrap_or_default();
                        if let Some(part) = image_url_to_part(url) {
                            parts.push(part);
                        }
                    }
                    _ => {}
                }
            }
            if parts.is_empty() {
                parts.push(Part::text(""));
            }
            parts
        }
        Some(MessageContent::Other(value)) => {
            vec![Part::text(extract_text_value(Some(value)))]
        }
        None => vec![Part::text("")],
    }
}

fn image_url_to_part(url: &str) -> Option<Part> {
    if url.is_empty() {
        return None;
    }
    if let Some(rest) = url.strip_prefix("data:image/") {
        // data:image/png;base64,iVBORw0...
        let (header, data) = rest.split_once(',')?;
        let mime_type = format!("image/{}", header.split(';').next().unwrap_or_default());
        return Some(Part {
            inline_data: Some(InlineData {
                mime_type,
                data: data.to_string(),
                extra: Default::default(),
            }),
            ..Part::default()
        });
    }
    Some(Part {
        file_data: Some(FileData {
            file_uri: url.to_string(),
            mime_type: None,
            extra: Default::default(),
        }),
        ..Part::default()
    })
}

/// Some clients stuff `{ "text": ... }` / `{ "value": ... }` wrappers where
/// a string belongs.
fn extract_text_value(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Object(map)) => {
            extract_text_value(map.get("text").or_else(|| map.get("value")))
        }
        _ => String::new(),
    }
}

/// `arguments` is a JSON-encoded string in well-formed requests. Raw objects
/// pass through; unparseable strings degrade to a `query` wrapper.
fn parse_tool_arguments(arguments: Option<&Value>) -> Value {
    match arguments {
        Some(Value::String(raw)) => {
            serde_json::from_str(raw).unwrap_or_else(|_| json!({"query": raw}))
        }
        Some(Value::Object(map)) => Value::Object(map.clone()),
        _ => json!({}),
    }
}

fn build_generation_config(
    req: &ChatCompletionRequest,
    thinking: bool,
    family: ModelFamily,
) -> GenerationConfig {
    let stop_sequences = match req.stop.clone() {
        Some(stop) => stop.into_vec(),
        None => DEFAULT_STOP_SEQUENCES
            .iter()
            .map(ToString::to_string)
            .collect(),
    };

    let response_mime_type = req
        .response_format
        .as_ref()
        .filter(|format| format.kind == "json_object")
        .map(|_| "application/json".to_string());

    // Claude thinking rejects topP.
    let top_p = if thinking && family == ModelFamily::Claude {
        None
    } else {
        req.top_p
    };

    GenerationConfig {
        temperature: req.temperature,
        top_p,
        top_k: req.top_k,
        max_output_tokens: req.max_tokens,
        frequency_penalty: req.frequency_penalty,
        presence_penalty: req.presence_penalty,
        candidate_count: req.n,
        stop_sequences: Some(stop_sequences),
        response_mime_type,
        thinking_config: Some(ThinkingConfig {
            include_thoughts: thinking,
            thinking_budget: resolve_thinking_budget(req, thinking),
        }),
        extra: Default::default(),
    }
}

fn convert_tools(
    req: &ChatCompletionRequest,
    model: &str,
    session: Option<&str>,
    caches: &ScratchCaches,
) -> (Option<Vec<Tool>>, Option<ToolConfig>) {
    let Some(tools) = req.tools.as_deref() else {
        return (None, None);
    };

    let mut declarations = Vec::new();
    for tool in tools {
        if tool.kind != "function" {
            continue;
        }

        let mut parameters = tool
            .function
            .parameters
            .clone()
            .unwrap_or_else(|| json!({}));
        clean_tool_schema(&mut parameters);

        let safe_name = sanitize_tool_name(&tool.function.name);
        if let Err(err) = validate_tool_schema(&parameters, &safe_name) {
            warn!("Skipping tool {safe_name} due to invalid schema: {err}");
            continue;
        }
        caches
            .tool_names
            .set(session, model, &safe_name, &tool.function.name);

        declarations.push(FunctionDeclaration {
            name: safe_name,
            description: tool.function.description.clone().unwrap_or_default(),
            parameters: Some(parameters),
            extra: Default::default(),
        });
    }

    if declarations.is_empty() {
        return (None, None);
    }

    (
        Some(vec![Tool {
            function_declarations: Some(declarations),
            extra: Default::default(),
        }]),
        Some(ToolConfig::validated()),
    )
}
