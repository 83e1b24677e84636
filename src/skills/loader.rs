//! 技能加载器
//!
//! 从技能目录读取 `*.md`：`---` 包裹的 frontmatter 中取 `name:` 与 `description:`，
//! 其余正文作为 instruction。缺少 name 或 description 的文件跳过。

use std::path::{Path, PathBuf};

/// 单个技能
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skill {
    pub name: String,
    pub description: String,
    pub instruction: String,
    pub path: PathBuf,
}

impl Skill {
    /// 用于技能目录 system 消息的一行摘要
    pub fn summary(&self) -> String {
        format!("- {}: {}", self.name, self.description)
    }
}

/// 启动时加载的技能目录（按文件名排序）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkillCatalog {
    skills: Vec<Skill>,
}

impl SkillCatalog {
    pub fn new(skills: Vec<Skill>) -> Self {
        Self { skills }
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }

    pub fn len(&self) -> usize {
        self.skills.len()
    }

    pub fn skills(&self) -> &[Skill] {
        &self.skills
    }

    pub fn find(&self, name: &str) -> Option<&Skill> {
        self.skills.iter().find(|s| s.name == name)
    }

    /// 全部技能的摘要列表（每行一个）
    pub fn summary_list(&self) -> String {
        self.skills
            .iter()
            .map(Skill::summary)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// 技能加载器
pub struct SkillLoader {
    skills_dir: PathBuf,
}

impl SkillLoader {
    pub fn new(skills_dir: impl AsRef<Path>) -> Self {
        Self {
            skills_dir: skills_dir.as_ref().to_path_buf(),
        }
    }

    /// 加载全部技能；目录不存在时返回空目录
    pub fn load_all(&self) -> anyhow::Result<SkillCatalog> {
        if !self.skills_dir.exists() {
            return Ok(SkillCatalog::default());
        }

        let pattern = format!(
            "{}/*.md",
            glob::Pattern::escape(&self.skills_dir.to_string_lossy())
        );
        let mut paths: Vec<PathBuf> = glob::glob(&pattern)?.flatten().collect();
        paths.sort();

        let skills: Vec<Skill> = paths.iter().filter_map(|p| load_skill(p)).collect();
        tracing::info!("Loaded {} skills", skills.len());
        Ok(SkillCatalog::new(skills))
    }
}

fn load_skill(path: &Path) -> Option<Skill> {
    let content = std::fs::read_to_string(path).ok()?;
    let (name, description, instruction) = parse_skill_md(&content);
    if name.is_empty() || description.is_empty() {
        tracing::debug!(path = %path.display(), "skill file without name/description, skipped");
        return None;
    }
    Some(Skill {
        name,
        description,
        instruction,
        path: path.to_path_buf(),
    })
}

/// 解析 frontmatter，返回 (name, description, instruction)
fn parse_skill_md(content: &str) -> (String, String, String) {
    let mut name = String::new();
    let mut description = String::new();

    let Some(rest) = content.strip_prefix("---") else {
        return (name, description, content.to_string());
    };
    let Some(end) = rest.find("---") else {
        return (name, description, content.to_string());
    };

    for line in rest[..end].trim().lines() {
        if let Some(v) = line.strip_prefix("name:") {
            name = v.trim().to_string();
        } else if let Some(v) = line.strip_prefix("description:") {
            description = v.trim().to_string();
        }
    }
    let instruction = rest[end + 3..].trim().to_string();
    (name, description, instruction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_frontmatter() {
        let (name, desc, body) =
            parse_skill_md("---\nname: morning\ndescription: morning routine\n---\n1. turn on lights\n");
        assert_eq!(name, "morning");
        assert_eq!(desc, "morning routine");
        assert_eq!(body, "1. turn on lights");
    }

    #[test]
    fn test_parse_without_frontmatter() {
        let (name, desc, body) = parse_skill_md("just text");
        assert!(name.is_empty());
        assert!(desc.is_empty());
        assert_eq!(body, "just text");
    }

    #[test]
    fn test_load_all_sorted_and_filtered() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("b.md"),
            "---\nname: bedtime\ndescription: lights off\n---\nturn off",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("a.md"),
            "---\nname: alarm\ndescription: set alarm\n---\nset it",
        )
        .unwrap();
        std::fs::write(dir.path().join("c.md"), "no frontmatter").unwrap();
        std::fs::write(dir.path().join("d.txt"), "---\nname: x\ndescription: y\n---\n").unwrap();

        let catalog = SkillLoader::new(dir.path()).load_all().unwrap();
        let names: Vec<_> = catalog.skills().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["alarm", "bedtime"]);
        assert_eq!(catalog.summary_list(), "- alarm: set alarm\n- bedtime: lights off");
        assert_eq!(catalog.find("bedtime").unwrap().instruction, "turn off");
    }

    #[test]
    fn test_missing_dir_is_empty() {
        let catalog = SkillLoader::new("/nonexistent/skill/dir").load_all().unwrap();
        assert!(catalog.is_empty());
    }
}
