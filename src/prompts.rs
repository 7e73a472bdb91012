use std::sync::LazyLock;

use regex::Regex;

use crate::suggest::SuggestError;
use crate::types::{AiSuggestion, MAX_MILESTONES};

const SUGGESTIONS_PROMPT: &str = r#"我是一个 INFJ 人格类型，正在进行一个名为 "{project}" 的项目。
请帮我将其拆解为 3 到 5 个可管理的里程碑，以保持我的能量水平。
对于每个里程碑，建议一个具体的“微激励”或“微型节日”奖励。

{location}

奖励必须严格满足以下条件：
1. **尽量无成本或非常低成本**（例如：免费的自然景观、去附近的公园散步、在家可做的冥想/阅读、一杯热茶、逛便利店）。
2. 非工作相关，且容易执行。
3. 具有感官享受和恢复性（Si/Se 补充）。
4. 情感上令人满足。

请以 JSON 对象格式返回，包含一个 'milestones' 列表，每个元素包含 'title'（里程碑名称）和 'reward'（奖励内容）。
请确保所有返回内容均为**简体中文**。"#;

const LOCATION_CONTEXT: &str = "用户当前居住在: {city}。请结合该城市的特色（例如地标、生活方式、气候），推荐一些本地化的、适合的活动。";

const REWARD_IDEAS_PROMPT: &str = r#"用户位于"{city}"。请列出 8 个**无成本或极低成本**的“微型奖励”灵感，用于自我关怀。

要求：
1. 结合"{city}"的本地特色（如适合散步的特定街道、公园、景观，或当地的生活方式）。
2. 如果城市不明确，则提供通用的高质量低成本奖励。
3. 每个灵感不超过 12 个字。
4. 包含适量的 Emoji。
5. 风格：治愈、放松、INFJ 友好（独处、感官享受）。

例如：
- 去外滩吹吹晚风 🌊
- 在安福路买束花 💐
- 煮一杯热红酒 🍷"#;

pub fn suggestions_prompt(project_name: &str, city: Option<&str>) -> String {
    let location = match city.map(str::trim) {
        Some(city) if !city.is_empty() => LOCATION_CONTEXT.replace("{city}", city),
        _ => String::new(),
    };
    SUGGESTIONS_PROMPT
        .replace("{project}", project_name)
        .replace("{location}", &location)
}

pub fn reward_ideas_prompt(city: &str) -> String {
    REWARD_IDEAS_PROMPT.replace("{city}", city.trim())
}

static FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^\s*```(?:json)?\s*(.*?)\s*```\s*$").expect("fence pattern is valid")
});

/// Strip a surrounding ```json fence if the model added one.
fn unfence(text: &str) -> &str {
    match FENCE.captures(text).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str(),
        None => text.trim(),
    }
}

pub fn parse_suggestion(text: &str) -> Result<AiSuggestion, SuggestError> {
    let mut suggestion: AiSuggestion = serde_json::from_str(unfence(text))
        .map_err(|e| SuggestError::Malformed(e.to_string()))?;
    suggestion
        .milestones
        .retain(|m| !m.title.trim().is_empty() || !m.reward.trim().is_empty());
    if suggestion.milestones.is_empty() {
        return Err(SuggestError::Malformed("no milestones in response".to_string()));
    }
    suggestion.milestones.truncate(MAX_MILESTONES);
    Ok(suggestion)
}

pub fn parse_reward_ideas(text: &str) -> Result<Vec<String>, SuggestError> {
    let ideas: Vec<String> =
        serde_json::from_str(unfence(text)).map_err(|e| SuggestError::Malformed(e.to_string()))?;
    Ok(ideas
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn city_context_only_when_city_given() {
        let with_city = suggestions_prompt("写作", Some("京都"));
        assert!(with_city.contains("\"写作\""));
        assert!(with_city.contains("用户当前居住在: 京都"));

        let blank_city = suggestions_prompt("写作", Some("  "));
        assert!(!blank_city.contains("用户当前居住在"));
        assert!(!blank_city.contains("{location}"));
    }

    #[test]
    fn reward_prompt_names_city_twice() {
        let prompt = reward_ideas_prompt(" 上海 ");
        assert_eq!(prompt.matches("\"上海\"").count(), 2);
    }

    #[test]
    fn parses_fenced_suggestion_and_caps_length() {
        let text = "```json\n{\"milestones\":[{\"title\":\"a\",\"reward\":\"1\"},{\"title\":\"b\",\"reward\":\"2\"},{\"title\":\"c\",\"reward\":\"3\"},{\"title\":\"d\",\"reward\":\"4\"},{\"title\":\"e\",\"reward\":\"5\"},{\"title\":\"f\",\"reward\":\"6\"}]}\n```";
        let suggestion = parse_suggestion(text).unwrap();
        assert_eq!(suggestion.milestones.len(), 5);
        assert_eq!(suggestion.milestones[4].title, "e");
    }

    #[test]
    fn unfence_handles_bare_and_plain_fenced_text() {
        assert_eq!(unfence("  [\"a\"]\n"), "[\"a\"]");
        assert_eq!(unfence("```\n[\"a\"]\n```"), "[\"a\"]");
        assert_eq!(unfence("```json[\"b\"]```"), "[\"b\"]");
    }

    #[test]
    fn rejects_empty_or_invalid_suggestion() {
        assert!(matches!(
            parse_suggestion(r#"{"milestones":[]}"#),
            Err(SuggestError::Malformed(_))
        ));
        assert!(matches!(parse_suggestion("sorry"), Err(SuggestError::Malformed(_))));
    }

    #[test]
    fn parses_reward_ideas() {
        let ideas = parse_reward_ideas(r#"["去外滩吹吹晚风 🌊", " ", "煮一杯热红酒 🍷"]"#).unwrap();
        assert_eq!(ideas, vec!["去外滩吹吹晚风 🌊", "煮一杯热红酒 🍷"]);
    }
}
