use std::collections::BTreeMap;

use serde_json::Value;

use super::registry::{
    CommandSpec, DOWNLOAD_COMMAND, IMAGE_ID_COMMANDS, NO_ARG_COMMANDS, STYLE_COMMAND,
};

/// One line of studio input, classified.
///
/// Plain text becomes `generate` with `prompt` set; slash commands carry
/// their arguments in `args`.
#[derive(Debug, Clone, PartialEq)]
pub struct StudioCommand {
    pub action: String,
    pub raw: String,
    pub prompt: Option<String>,
    pub args: BTreeMap<String, Value>,
}

impl StudioCommand {
    fn new(action: &str, raw: &str) -> Self {
        Self {
            action: action.to_string(),
            raw: raw.to_string(),
            prompt: None,
            args: BTreeMap::new(),
        }
    }

    pub fn arg_str(&self, key: &str) -> Option<&str> {
        self.args
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}

fn find_action(command: &str, specs: &[CommandSpec]) -> Option<&'static str> {
    specs
        .iter()
        .find(|spec| spec.command == command)
        .map(|spec| spec.action)
}

fn split_args(arg: &str) -> Vec<String> {
    if arg.trim().is_empty() {
        return Vec::new();
    }
    match shell_words::split(arg) {
        Ok(parts) => parts
            .into_iter()
            .filter(|value| !value.is_empty())
            .collect(),
        Err(_) => arg
            .split_whitespace()
            .map(str::to_string)
            .filter(|value| !value.is_empty())
            .collect(),
    }
}

pub fn parse_command(text: &str) -> StudioCommand {
    let raw_trimmed = text.trim();
    if raw_trimmed.is_empty() {
        return StudioCommand::new("noop", text);
    }

    if let Some(slash_tail) = raw_trimmed.strip_prefix('/') {
        let command_len = slash_tail
            .chars()
            .take_while(|ch| ch.is_ascii_alphanumeric() || *ch == '_')
            .count();
        if command_len > 0 {
            let command = slash_tail[..command_len].to_ascii_lowercase();
            let arg = slash_tail[command_len..].trim();

            if command == STYLE_COMMAND.command {
                let mut parsed = StudioCommand::new(STYLE_COMMAND.action, text);
                parsed.args.insert(
                    "style".to_string(),
                    Value::String(arg.to_ascii_lowercase()),
                );
                return parsed;
            }

            if let Some(action) = find_action(&command, IMAGE_ID_COMMANDS) {
                let mut parsed = StudioCommand::new(action, text);
                let id = split_args(arg).into_iter().next().unwrap_or_default();
                parsed.args.insert("id".to_string(), Value::String(id));
                return parsed;
            }

            if command == DOWNLOAD_COMMAND.command {
                let mut parsed = StudioCommand::new(DOWNLOAD_COMMAND.action, text);
                let mut parts = split_args(arg).into_iter();
                parsed.args.insert(
                    "id".to_string(),
                    Value::String(parts.next().unwrap_or_default()),
                );
                let rest = parts.collect::<Vec<String>>();
                parsed.args.insert(
                    "path".to_string(),
                    if rest.is_empty() {
                        Value::Null
                    } else {
                        Value::String(rest.join(" "))
                    },
                );
                return parsed;
            }

            if let Some(action) = find_action(&command, NO_ARG_COMMANDS) {
                return StudioCommand::new(action, text);
            }

            let mut parsed = StudioCommand::new("unknown", text);
            parsed
                .args
                .insert("command".to_string(), Value::String(command));
            parsed
                .args
                .insert("arg".to_string(), Value::String(arg.to_string()));
            return parsed;
        }
    }

    // Plain text is the prompt exactly as typed, minus the line ending.
    let mut parsed = StudioCommand::new("generate", text);
    parsed.prompt = Some(text.trim_end_matches(['\n', '\r']).to_string());
    parsed
}
