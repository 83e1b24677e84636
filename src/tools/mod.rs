//! 工具箱：Tool trait、精确名称注册表、带超时的执行器，以及与记忆 / 技能相关的内置工具
//!
//! 家居控制、天气、视频搜索、剪贴板、浏览器、Shell 等具体工具通过实现 Tool 接入。

pub mod executor;
pub mod memory_grep;
pub mod registry;
pub mod schema;
pub mod server_side;
pub mod skill;

pub use executor::ToolExecutor;
pub use memory_grep::MemoryGrepTool;
pub use registry::{Tool, ToolRegistry, ToolSpec};
pub use schema::args_schema;
pub use server_side::ServerSideTool;
pub use skill::SkillUseTool;
