//! skill_use 工具：取回某个技能的完整步骤

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::skills::SkillCatalog;
use crate::tools::{args_schema, Tool};

#[derive(Debug, Deserialize, JsonSchema)]
struct SkillUseArgs {
    /// Name of the skill to use
    skill_name: String,
}

pub struct SkillUseTool {
    catalog: SkillCatalog,
    description: String,
}

impl SkillUseTool {
    pub fn new(catalog: SkillCatalog) -> Self {
        let description = format!(
            "Fetch the procedure (Skill) for carrying out a specific task.\n\
             A Skill is an abstraction over tools that defines the steps for a task.\n\
             Available skills:\n\n{}\n\n\
             To use a skill, call this tool to get its procedure.",
            catalog.summary_list()
        );
        Self {
            catalog,
            description,
        }
    }
}

#[async_trait]
impl Tool for SkillUseTool {
    fn name(&self) -> &str {
        "skill_use"
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters_schema(&self) -> Value {
        args_schema::<SkillUseArgs>()
    }

    async fn invoke(&self, args: Map<String, Value>) -> Result<Option<Value>, String> {
        let args: SkillUseArgs =
            serde_json::from_value(Value::Object(args)).map_err(|e| e.to_string())?;
        let result = match self.catalog.find(&args.skill_name) {
            Some(skill) => json!({
                "name": skill.name,
                "instruction": skill.instruction,
                "next_step": "Break this procedure down into tool calls and carry it out.",
            }),
            None => json!({"error": format!("Skill '{}' not found", args.skill_name)}),
        };
        Ok(Some(result))
    }
}
