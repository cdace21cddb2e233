//! Prompt template loading and rendering via `minijinja`.
//!
//! Four templates make up a decision prompt: `system.j2` (the persona)
//! becomes the system message; `situation.j2`, `memory.j2` and
//! `actions.j2` are joined into the user message. The built-in set is
//! compiled into the binary; a templates directory on disk overrides it so
//! operators can tune agents without recompiling.

use minijinja::Environment;
use serde::Serialize;

use crate::error::RunnerError;

/// Template names, in the order the user message is assembled.
const USER_SECTIONS: [&str; 3] = ["situation", "memory", "actions"];

const BUILTIN: [(&str, &str); 4] = [
    ("system", include_str!("../templates/system.j2")),
    ("situation", include_str!("../templates/situation.j2")),
    ("memory", include_str!("../templates/memory.j2")),
    ("actions", include_str!("../templates/actions.j2")),
];

/// Loaded prompt templates.
#[derive(Debug)]
pub struct PromptEngine {
    env: Environment<'static>,
}

/// The complete rendered prompt ready to send to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPrompt {
    /// Persona and ground rules.
    pub system: String,
    /// Situation, memory and the action menu.
    pub user: String,
}

impl RenderedPrompt {
    /// Both messages as one text, for call logs.
    pub fn joined(&self) -> String {
        format!("{}\n\n{}", self.system, self.user)
    }
}

impl PromptEngine {
    /// An engine using the templates compiled into the crate.
    pub fn with_defaults() -> Result<Self, RunnerError> {
        let mut env = Environment::new();
        for (name, source) in BUILTIN {
            env.add_template(name, source)
                .map_err(|e| RunnerError::Template(format!("failed to add {name} template: {e}")))?;
        }
        Ok(Self { env })
    }

    /// An engine loading every template from `templates_dir`.
    ///
    /// The directory must contain `system.j2`, `situation.j2`, `memory.j2`
    /// and `actions.j2`.
    pub fn new(templates_dir: &str) -> Result<Self, RunnerError> {
        let mut env = Environment::new();
        for (name, _) in BUILTIN {
            let source = load_template(templates_dir, &format!("{name}.j2"))?;
            env.add_template_owned(name, source)
                .map_err(|e| RunnerError::Template(format!("failed to add {name} template: {e}")))?;
        }
        Ok(Self { env })
    }

    /// From disk when a directory is given, built-in otherwise.
    pub fn from_dir(templates_dir: Option<&str>) -> Result<Self, RunnerError> {
        templates_dir.map_or_else(Self::with_defaults, Self::new)
    }

    /// Render the decision prompt for a serialized context.
    pub fn render(&self, context: &impl Serialize) -> Result<RenderedPrompt, RunnerError> {
        let system = self.render_one("system", context)?;
        let sections = USER_SECTIONS
            .iter()
            .map(|name| self.render_one(name, context).map(|s| s.trim().to_owned()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(RenderedPrompt {
            system: system.trim().to_owned(),
            user: sections.join("\n\n"),
        })
    }

    fn render_one(&self, name: &str, context: &impl Serialize) -> Result<String, RunnerError> {
        self.env
            .get_template(name)
            .map_err(|e| RunnerError::Template(format!("missing {name} template: {e}")))?
            .render(context)
            .map_err(|e| RunnerError::Template(format!("{name} render failed: {e}")))
    }
}

/// Read a template file from disk.
fn load_template(dir: &str, filename: &str) -> Result<String, RunnerError> {
    let path = format!("{dir}/{filename}");
    std::fs::read_to_string(&path)
        .map_err(|e| RunnerError::Template(format!("failed to read {path}: {e}")))
}
