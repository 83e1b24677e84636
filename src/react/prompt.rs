//! PromptAssembler：为一轮对话确定性地拼装有序消息
//!
//! 顺序固定：人格文档 → 记忆摘要（若调用方首条为 system，则紧随其后）→ 调用方消息 →
//! 技能目录 → 睡眠指令。可选输入缺失时跳过对应步骤，拼装永不失败。

use crate::memory::{render_summary, ChatMessage, Message, Role, RollingSummary};
use crate::skills::SkillCatalog;

/// 模型判断用户要去睡觉、结束对话时输出的标记
pub const SLEEP_MARKER: &str = "[SLEEP]";

fn sleep_instruction() -> String {
    format!(
        "If you judge from the conversation that the user is ending the conversation in order to go to sleep \
         (for example saying good night), include the literal token {} somewhere in your reply. \
         Otherwise never output that token.",
        SLEEP_MARKER
    )
}

fn skill_instruction(skill_list: &str) -> String {
    format!(
        "The following skills are available. A skill is a predefined procedure for a task; \
         call the `skill_use` tool with the skill name to get its steps.\n{}",
        skill_list
    )
}

/// 一轮的 prompt 拼装器
#[derive(Debug, Default, Clone, Copy)]
pub struct PromptAssembler<'a> {
    persona: Option<&'a str>,
    summary: Option<&'a RollingSummary>,
    skills: Option<&'a SkillCatalog>,
}

impl<'a> PromptAssembler<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// 人格文档（ELIZA.md 内容）；空白文本视为不存在
    pub fn with_persona(mut self, persona: Option<&'a str>) -> Self {
        self.persona = persona;
        self
    }

    /// 记忆摘要；仅在启用记忆时传入，空摘要视为不存在
    pub fn with_summary(mut self, summary: Option<&'a RollingSummary>) -> Self {
        self.summary = summary;
        self
    }

    pub fn with_skills(mut self, skills: &'a SkillCatalog) -> Self {
        self.skills = Some(skills);
        self
    }

    pub fn assemble(&self, caller: &[ChatMessage]) -> Vec<Message> {
        let mut out = Vec::with_capacity(caller.len() + 4);

        if let Some(persona) = self.persona.map(str::trim).filter(|p| !p.is_empty()) {
            out.push(Message::system(persona));
        }

        let mut memory = self
            .summary
            .filter(|s| !s.is_empty())
            .map(|s| Message::system(render_summary(s)));

        let leading_system = caller.first().map(|m| m.role == "system").unwrap_or(false);
        if !leading_system {
            out.extend(memory.take());
        }

        for (i, msg) in caller.iter().enumerate() {
            let Some(role) = Role::from_caller(&msg.role) else {
                tracing::debug!(role = %msg.role, "dropping message with unrecognized role");
                continue;
            };
            out.push(Message::new(role, msg.content.clone()));
            if i == 0 && leading_system {
                out.extend(memory.take());
            }
        }

        if let Some(skills) = self.skills.filter(|s| !s.is_empty()) {
            out.push(Message::system(skill_instruction(&skills.summary_list())));
        }

        out.push(Message::system(sleep_instruction()));
        out
    }
}

/// 最终回复中是否包含睡眠标记
pub fn detect_sleep(content: &str) -> bool {
    content.contains(SLEEP_MARKER)
}
