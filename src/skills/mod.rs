//! 技能系统
//!
//! 技能（Skill）是比工具更高一层的「做事步骤」：一个 Markdown 文件，frontmatter 给出名称与描述，
//! 正文是分解为工具调用的步骤。技能目录会被列进 system prompt，模型通过 `skill_use` 工具取回正文。
//!
//! 目录结构：
//! ```text
//! skill/
//! ├── bedtime.md
//! └── morning.md
//! ```

mod loader;

pub use loader::{Skill, SkillCatalog, SkillLoader};
