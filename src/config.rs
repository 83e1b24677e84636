//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `ELIZA__*` 覆盖（双下划线表示嵌套，如 `ELIZA__LLM__MODEL=grok-4`）。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerSection,
    pub llm: LlmSection,
    pub agent: AgentSection,
    pub memory: MemorySection,
    pub skills: SkillsSection,
    pub tools: ToolsSection,
}

/// [server] 段：HTTP 监听地址
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 9096,
        }
    }
}

/// [llm] 段：OpenAI 兼容接口地址、默认模型、凭据与超时
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    pub base_url: String,
    pub model: String,
    /// 直接写入的 API Key；为空时读取 api_key_env 指定的环境变量
    pub api_key: Option<String>,
    pub api_key_env: String,
    pub timeouts: LlmTimeoutsSection,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            base_url: "https://api.x.ai/v1".to_string(),
            model: "grok-4-1-fast".to_string(),
            api_key: None,
            api_key_env: "XAI_API_KEY".to_string(),
            timeouts: LlmTimeoutsSection::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmTimeoutsSection {
    /// 单次补全请求超时（秒）
    pub request: u64,
}

impl Default for LlmTimeoutsSection {
    fn default() -> Self {
        Self { request: 60 }
    }
}

/// [agent] 段：人格文档、工具循环预算、整轮重试次数
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentSection {
    pub persona_path: PathBuf,
    pub max_tool_loops: usize,
    /// 整轮最多尝试次数（含首次）
    pub max_attempts: usize,
    /// 单次工具调用超时（秒）
    pub tool_timeout_secs: u64,
    /// 请求未指定 use_memory 时的默认值
    pub use_memory: bool,
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            persona_path: PathBuf::from("ELIZA.md"),
            max_tool_loops: 5,
            max_attempts: 3,
            tool_timeout_secs: 30,
            use_memory: true,
        }
    }
}

/// [memory] 段：日志与摘要目录、摘要窗口、解析失败时的截断长度
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MemorySection {
    pub dir: PathBuf,
    /// 重新生成摘要时读取的最近日志条数
    pub summary_window: usize,
    pub compress_fallback_chars: usize,
    pub summary_fallback_chars: usize,
    /// memory_grep 未指定 limit 时的默认返回条数
    pub grep_default_limit: usize,
}

impl Default for MemorySection {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(".memory"),
            summary_window: 100,
            compress_fallback_chars: 200,
            summary_fallback_chars: 500,
            grep_default_limit: 10,
        }
    }
}

/// [skills] 段：技能 Markdown 目录
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SkillsSection {
    pub dir: PathBuf,
}

impl Default for SkillsSection {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./skill"),
        }
    }
}

/// [tools] 段：由模型服务端执行的工具名（本地注册为占位，调用结果缺省）
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ToolsSection {
    pub server_side: Vec<String>,
}

/// 从 config 目录加载配置，环境变量 ELIZA__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 ELIZA__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("ELIZA")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}
