//! Agent 构建器：从 AppConfig 组装网关、记忆、技能与工具
//!
//! 网关与记忆存储可被替换（测试中使用 MockGateway / InMemoryStore）。

use std::sync::Arc;

use crate::agent::{Agent, TurnOptions};
use crate::config::AppConfig;
use crate::core::{AgentError, RetryShell, TaskScheduler};
use crate::llm::{CompletionGateway, OpenAiGateway};
use crate::memory::{FileMemoryStore, Memory, MemoryStore};
use crate::skills::{SkillCatalog, SkillLoader};
use crate::tools::{MemoryGrepTool, ServerSideTool, SkillUseTool, ToolExecutor, ToolRegistry};

pub struct AgentBuilder {
    config: AppConfig,
    gateway: Option<Arc<dyn CompletionGateway>>,
    store: Option<Arc<dyn MemoryStore>>,
}

impl AgentBuilder {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            gateway: None,
            store: None,
        }
    }

    /// 替换补全网关（默认按 [llm] 创建 OpenAiGateway）
    pub fn with_gateway(mut self, gateway: Arc<dyn CompletionGateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    /// 替换记忆存储（默认为 [memory].dir 下的文件存储）
    pub fn with_store(mut self, store: Arc<dyn MemoryStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// 加载技能目录；失败时记录警告并视为无技能
    pub fn build_skills(&self) -> SkillCatalog {
        match SkillLoader::new(&self.config.skills.dir).load_all() {
            Ok(catalog) => catalog,
            Err(e) => {
                tracing::warn!("Failed to load skills: {}", e);
                SkillCatalog::default()
            }
        }
    }

    /// 构建工具注册表：memory_grep、skill_use（有技能时）、服务端工具占位
    pub fn build_tool_registry(&self, memory: &Memory, skills: &SkillCatalog) -> ToolRegistry {
        let mut tools = ToolRegistry::new();
        tools.register(
            MemoryGrepTool::new(memory.log()).with_default_limit(self.config.memory.grep_default_limit),
        );
        if !skills.is_empty() {
            tools.register(SkillUseTool::new(skills.clone()));
        }
        for name in &self.config.tools.server_side {
            tools.register(ServerSideTool::new(name.clone()));
        }
        tools
    }

    pub fn build(self) -> Result<Agent, AgentError> {
        let gateway: Arc<dyn CompletionGateway> = match self.gateway.clone() {
            Some(g) => g,
            None => Arc::new(OpenAiGateway::from_config(&self.config)?),
        };
        let store: Arc<dyn MemoryStore> = match self.store.clone() {
            Some(s) => s,
            None => Arc::new(FileMemoryStore::new(&self.config.memory.dir)),
        };

        let memory = Memory::with_settings(store, gateway.clone(), &self.config.memory);
        let skills = self.build_skills();
        let tools = self.build_tool_registry(&memory, &skills);
        tracing::info!(tools = ?tools.tool_names(), skills = skills.len(), "agent built");

        let agent_cfg = &self.config.agent;
        let persona_path = Some(agent_cfg.persona_path.clone()).filter(|p| !p.as_os_str().is_empty());

        Ok(Agent {
            gateway,
            executor: ToolExecutor::new(tools, agent_cfg.tool_timeout_secs),
            memory: Arc::new(memory),
            skills,
            persona_path,
            retry: RetryShell::new(agent_cfg.max_attempts),
            scheduler: TaskScheduler::new(),
            defaults: TurnOptions {
                use_memory: agent_cfg.use_memory,
                model: self.config.llm.model.clone(),
                max_tool_loops: agent_cfg.max_tool_loops,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockGateway;
    use crate::memory::InMemoryStore;
    use std::io::Write;

    fn config_with_skills(dir: &std::path::Path) -> AppConfig {
        let mut cfg = AppConfig::default();
        cfg.skills.dir = dir.to_path_buf();
        cfg.agent.persona_path = dir.join("missing-persona.md");
        cfg
    }

    #[tokio::test]
    async fn test_registers_memory_and_server_side_tools() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config_with_skills(dir.path());
        cfg.tools.server_side = vec!["web_search".to_string()];

        let agent = AgentBuilder::new(cfg)
            .with_gateway(Arc::new(MockGateway::replying("ok")))
            .with_store(Arc::new(InMemoryStore::new()))
            .build()
            .unwrap();

        assert_eq!(agent.tool_names(), vec!["memory_grep".to_string(), "web_search".to_string()]);
        assert_eq!(agent.default_options().max_tool_loops, 5);
    }

    #[tokio::test]
    async fn test_server_side_tools_not_sent_as_functions() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config_with_skills(dir.path());
        cfg.tools.server_side = vec!["web_search".to_string()];
        let gateway = Arc::new(MockGateway::replying("ok"));

        let agent = AgentBuilder::new(cfg)
            .with_gateway(gateway.clone())
            .with_store(Arc::new(InMemoryStore::new()))
            .build()
            .unwrap();
        let out = agent
            .run_turn(&[crate::memory::ChatMessage::user("news?")], &agent.default_options())
            .await
            .unwrap();

        assert_eq!(out.content, "ok");
        let sessions = gateway.sessions();
        let sent: Vec<_> = sessions[0].tools().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(sent, vec!["memory_grep"]);
    }

    #[tokio::test]
    async fn test_skill_tool_registered_when_skills_exist() {
        let dir = tempfile::tempdir().unwrap();
        let mut f = std::fs::File::create(dir.path().join("bedtime.md")).unwrap();
        writeln!(f, "---\nname: bedtime\ndescription: good night routine\n---\nDim the lights.").unwrap();

        let agent = AgentBuilder::new(config_with_skills(dir.path()))
            .with_gateway(Arc::new(MockGateway::replying("ok")))
            .with_store(Arc::new(InMemoryStore::new()))
            .build()
            .unwrap();

        assert!(agent.tool_names().contains(&"skill_use".to_string()));
    }

    #[test]
    fn test_missing_api_key_is_config_error() {
        let mut cfg = AppConfig::default();
        cfg.llm.api_key = None;
        cfg.llm.api_key_env = "ELIZA_BUILDER_TEST_KEY_NEVER_SET".to_string();
        let err = AgentBuilder::new(cfg)
            .with_store(Arc::new(InMemoryStore::new()))
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, AgentError::Config(_)));
    }
}
