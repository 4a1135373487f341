//! LLM 服务 - 业务能力层
//!
//! 只负责"把一段文本变成候选模型"的能力，不关心批次和流程
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 支持自定义 API 端点和模型
//! - 兼容 OpenAI API 的服务（如 Azure, Gemini, Doubao 等）

use anyhow::Result;
use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use regex::Regex;
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::GenerationError;
use crate::infrastructure::ModelGenerator;
use crate::models::{CandidateModel, GenerationSettings};
use crate::utils::truncate_text;

const SYSTEM_MESSAGE: &str = "你是一个专业的文档起草助手，擅长从已有文档中提炼可以反复使用的内容模型（模板、条款、段落范式）。\
                              你只输出 JSON，不输出任何解释。";

/// LLM 服务
///
/// 职责：
/// - 调用 LLM API 从文本生成候选模型
/// - 解析并校验返回的 JSON
/// - 只处理单个文件的文本
/// - 不做重试，失败原样返回给调用方
pub struct LlmService {
    client: Client<OpenAIConfig>,
    max_text_chars: usize,
    fenced_block: Regex,
}

impl LlmService {
    /// 创建新的 LLM 服务
    pub fn new(config: &Config) -> Result<Self> {
        // 配置 OpenAI 客户端（兼容 OpenAI API 的服务）
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        Ok(Self {
            client: Client::with_config(openai_config),
            max_text_chars: config.max_text_chars,
            fenced_block: Regex::new(r"(?s)```(?:json|JSON)?\s*(.*?)```")?,
        })
    }

    /// 通用的 LLM 调用函数
    ///
    /// # 参数
    /// - `user_message`: 用户消息内容
    /// - `system_message`: 系统消息（可选）
    /// - `settings`: 生成参数（模型、温度、最大 token）
    ///
    /// # 返回
    /// 返回 LLM 的响应内容（字符串）
    pub async fn send_to_llm(
        &self,
        user_message: &str,
        system_message: Option<&str>,
        settings: &GenerationSettings,
    ) -> Result<String> {
        debug!(
            "调用 LLM API，提供方: {}, 模型: {}",
            settings.provider, settings.model_name
        );
        debug!("用户消息长度: {} 字符", user_message.len());

        // 构建消息列表
        let mut messages = Vec::new();

        // 添加系统消息（如果提供）
        if let Some(sys_msg) = system_message {
            let system_msg = ChatCompletionRequestSystemMessageArgs::default()
                .content(sys_msg)
                .build()?;
            messages.push(ChatCompletionRequestMessage::System(system_msg));
        }

        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(user_message)
            .build()?;
        messages.push(ChatCompletionRequestMessage::User(user_msg));

        // 构建请求
        let request = CreateChatCompletionRequestArgs::default()
            .model(&settings.model_name)
            .messages(messages)
            .temperature(settings.temperature)
            .max_tokens(settings.max_tokens)
            .build()?;

        // 调用 API
        let response = self.client.chat().create(request).await.map_err(|e| {
            warn!("LLM API 调用失败: {}", e);
            GenerationError::ApiCallFailed {
                model: settings.model_name.clone(),
                message: e.to_string(),
            }
        })?;

        debug!("LLM API 调用成功");

        // 提取响应内容
        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| GenerationError::EmptyContent {
                model: settings.model_name.clone(),
            })?;

        Ok(content.trim().to_string())
    }

    /// 构建生成提示词
    fn build_prompt(&self, text: &str, settings: &GenerationSettings) -> String {
        let document = truncate_text(text, self.max_text_chars);
        let style = if settings.style_hints.is_empty() {
            "无特殊要求".to_string()
        } else {
            settings.style_hints.join("、")
        };

        format!(
            r#"请阅读下面的文档，提炼出最多 {} 个可以在今后起草文书时复用的内容模型。

【要求】
- 每个模型必须独立完整，可以直接套用
- 文档中的具体人名、金额、日期等替换为占位符，例如【甲方名称】
- 风格要求：{}
- 如果文档中没有值得复用的内容，返回空数组 []

【输出格式】
只返回 JSON 数组，每个元素包含：
  "title": 模型标题
  "content": 模型正文
  "category": 分类（如 合同、通知、报告）
  "keywords": 关键词数组

【文档内容】
{}"#,
            settings.max_models_per_file, style, document
        )
    }

    /// 解析生成结果
    ///
    /// 接受裸 JSON 数组、```json 代码块，或 `{"models": [...]}` 形式
    pub fn parse_models(
        &self,
        response: &str,
        max_models: usize,
    ) -> Result<Vec<CandidateModel>, GenerationError> {
        let malformed = |message: String| GenerationError::MalformedResponse { message };

        let body = match self.fenced_block.captures(response) {
            Some(caps) => caps.get(1).map(|m| m.as_str()).unwrap_or_default(),
            None => response,
        }
        .trim();

        let value: JsonValue = serde_json::from_str(body)
            .or_else(|_| {
                // 模型有时会在 JSON 前后附带说明文字
                match (body.find('['), body.rfind(']')) {
                    (Some(start), Some(end)) if start < end => {
                        serde_json::from_str(&body[start..=end])
                    }
                    _ => serde_json::from_str(body),
                }
            })
            .map_err(|e| malformed(format!("不是合法的 JSON: {}", e)))?;

        let items = match value {
            JsonValue::Array(items) => items,
            JsonValue::Object(mut map) => match map.remove("models") {
                Some(JsonValue::Array(items)) => items,
                _ => return Err(malformed("JSON 对象中缺少 models 数组".to_string())),
            },
            other => return Err(malformed(format!("期望 JSON 数组，实际为: {}", other))),
        };

        let mut models = Vec::with_capacity(items.len());
        for (i, item) in items.into_iter().enumerate() {
            let candidate: CandidateModel = serde_json::from_value(item)
                .map_err(|e| malformed(format!("第 {} 个模型格式错误: {}", i + 1, e)))?;
            if candidate.title.trim().is_empty() || candidate.content.trim().is_empty() {
                return Err(malformed(format!("第 {} 个模型缺少标题或正文", i + 1)));
            }
            models.push(candidate);
        }

        if models.len() > max_models {
            warn!(
                "生成结果有 {} 个模型，超过上限 {}，只保留前 {} 个",
                models.len(),
                max_models,
                max_models
            );
            models.truncate(max_models);
        }

        Ok(models)
    }
}

#[async_trait]
impl ModelGenerator for LlmService {
    async fn generate(
        &self,
        text: &str,
        settings: &GenerationSettings,
    ) -> Result<Vec<CandidateModel>> {
        let prompt = self.build_prompt(text, settings);
        let response = self
            .send_to_llm(&prompt, Some(SYSTEM_MESSAGE), settings)
            .await?;
        let models = self.parse_models(&response, settings.max_models_per_file)?;
        debug!("LLM 生成了 {} 个候选模型", models.len());
        Ok(models)
    }
}
