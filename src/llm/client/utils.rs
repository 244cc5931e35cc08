use crate::config::LLMConfig;

/// 提示词总长度超过该值时直接使用高质量模型
const EFFICIENT_MODEL_PROMPT_LIMIT: usize = 32 * 1024;

/// 按提示词长度选择模型，返回 (首选模型, 兜底模型)
pub fn evaluate_befitting_model(
    llm_config: &LLMConfig,
    system_prompt: &str,
    user_prompt: &str,
) -> (String, Option<String>) {
    if system_prompt.len() + user_prompt.len() <= EFFICIENT_MODEL_PROMPT_LIMIT
        && llm_config.model_efficient != llm_config.model_powerful
    {
        return (
            llm_config.model_efficient.clone(),
            Some(llm_config.model_powerful.clone()),
        );
    }
    (llm_config.model_powerful.clone(), None)
}
