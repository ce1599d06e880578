//! Rendering provider settings into each tool's file formats

use serde_json::{Map, Value};

/// Key path of the provider map inside an additive app's live file
pub const OPENCODE_PROVIDERS: &[&str] = &["provider"];
pub const OPENCLAW_PROVIDERS: &[&str] = &["models", "providers"];

/// Render failure, turned into a reconciliation error by the caller
pub type RenderResult<T> = Result<T, String>;

/// Claude `settings.json`: the settings object verbatim
///
/// # Errors
/// Returns an error if the settings are not a JSON object
pub fn render_claude(settings: &Value) -> RenderResult<String> {
    if !settings.is_object() {
        return Err("Claude settings must be a JSON object".into());
    }
    pretty(settings)
}

/// Codex `auth.json` and `config.toml` contents
///
/// # Errors
/// Returns an error if `auth` is not an object or `config` is not valid TOML
pub fn render_codex(settings: &Value) -> RenderResult<(String, String)> {
    let auth = settings.get("auth").cloned().unwrap_or_else(|| Value::Object(Map::new()));
    if !auth.is_object() {
        return Err("Codex 'auth' must be a JSON object".into());
    }

    let config = match settings.get("config") {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(_) => return Err("Codex 'config' must be a TOML string".into()),
    };
    if !config.trim().is_empty() {
        config
            .parse::<toml::Table>()
            .map_err(|e| format!("Invalid Codex config.toml: {e}"))?;
    }

    Ok((pretty(&auth)?, config))
}

/// Gemini `.env` and optional `settings.json` contents
///
/// # Errors
/// Returns an error if `env` holds anything but strings
pub fn render_gemini(settings: &Value) -> RenderResult<(String, Option<String>)> {
    let mut env = String::new();
    if let Some(vars) = settings.get("env") {
        let vars = vars
            .as_object()
            .ok_or_else(|| "Gemini 'env' must be a JSON object".to_string())?;
        for (key, value) in vars {
            let value = value
                .as_str()
                .ok_or_else(|| format!("Gemini env value for '{key}' must be a string"))?;
            if key.is_empty() || key.contains('=') || key.contains('\n') || value.contains('\n') {
                return Err(format!("Invalid Gemini env entry '{key}'"));
            }
            env.push_str(key);
            env.push('=');
            env.push_str(value);
            env.push('\n');
        }
    }

    let config = match settings.get("config") {
        None | Some(Value::Null) => None,
        Some(config @ Value::Object(_)) => Some(pretty(config)?),
        Some(_) => return Err("Gemini 'config' must be a JSON object".into()),
    };

    Ok((env, config))
}

/// Parse a `.env` file into a JSON object, skipping comments and blanks
#[must_use]
pub fn parse_env(content: &str) -> Map<String, Value> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.trim().to_string(), Value::String(value.trim().to_string())))
        .collect()
}

/// Insert `entry` under `path.id`, creating intermediate objects
///
/// # Errors
/// Returns an error if something along the path is not an object
pub fn upsert_keyed(root: &mut Value, path: &[&str], id: &str, entry: Value) -> RenderResult<()> {
    let mut node = root;
    for key in path {
        let object = node
            .as_object_mut()
            .ok_or_else(|| format!("Expected an object above '{key}'"))?;
        node = object
            .entry((*key).to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    node.as_object_mut()
        .ok_or_else(|| format!("Expected an object at '{}'", path.join(".")))?
        .insert(id.to_string(), entry);
    Ok(())
}

/// Remove `path.id`; returns whether anything was removed
pub fn remove_keyed(root: &mut Value, path: &[&str], id: &str) -> bool {
    let mut node = root;
    for key in path {
        match node.get_mut(*key) {
            Some(next) => node = next,
            None => return false,
        }
    }
    node.as_object_mut()
        .is_some_and(|object| object.remove(id).is_some())
}

/// Parse a live JSON file, treating empty content as `{}`
///
/// # Errors
/// Returns an error if the content is not a JSON object
pub fn parse_object(content: &str) -> RenderResult<Value> {
    if content.trim().is_empty() {
        return Ok(Value::Object(Map::new()));
    }
    let value: Value = serde_json::from_str(content).map_err(|e| e.to_string())?;
    if value.is_object() {
        Ok(value)
    } else {
        Err("Live config must be a JSON object".into())
    }
}

fn pretty(value: &Value) -> RenderResult<String> {
    let mut out = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
    out.push('\n');
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_codex_validates_toml() {
        let settings = json!({
            "auth": {"OPENAI_API_KEY": "sk-1"},
            "config": "model = \"gpt-5\"\n"
        });
        let (auth, config) = render_codex(&settings).unwrap();
        assert!(auth.contains("sk-1"));
        assert_eq!(config, "model = \"gpt-5\"\n");

        let broken = json!({"auth": {}, "config": "model = "});
        assert!(render_codex(&broken).is_err());
    }

    #[test]
    fn test_render_gemini_env() {
        let settings = json!({"env": {"GEMINI_API_KEY": "g-1", "GEMINI_MODEL": "pro"}});
        let (env, config) = render_gemini(&settings).unwrap();
        assert!(env.contains("GEMINI_API_KEY=g-1\n"));
        assert!(env.contains("GEMINI_MODEL=pro\n"));
        assert!(config.is_none());

        let parsed = parse_env(&format!("# comment\n\n{env}"));
        assert_eq!(parsed.get("GEMINI_MODEL"), Some(&json!("pro")));
    }

    #[test]
    fn test_render_gemini_rejects_non_string() {
        assert!(render_gemini(&json!({"env": {"GEMINI_API_KEY": 1}})).is_err());
    }

    #[test]
    fn test_render_claude_requires_object() {
        assert!(render_claude(&json!({"env": {}})).is_ok());
        assert!(render_claude(&json!("nope")).is_err());
    }

    #[test]
    fn test_keyed_upsert_and_remove() {
        let mut root = json!({"$schema": "x"});
        upsert_keyed(&mut root, OPENCLAW_PROVIDERS, "a", json!({"k": 1})).unwrap();
        upsert_keyed(&mut root, OPENCLAW_PROVIDERS, "b", json!({"k": 2})).unwrap();
        assert_eq!(root["models"]["providers"]["a"]["k"], 1);
        assert_eq!(root["$schema"], "x");

        assert!(remove_keyed(&mut root, OPENCLAW_PROVIDERS, "a"));
        assert!(!remove_keyed(&mut root, OPENCLAW_PROVIDERS, "a"));
        assert!(root["models"]["providers"].get("a").is_none());
        assert_eq!(root["models"]["providers"]["b"]["k"], 2);
    }

    #[test]
    fn test_upsert_keyed_rejects_non_object_path() {
        let mut root = json!({"provider": []});
        assert!(upsert_keyed(&mut root, OPENCODE_PROVIDERS, "a", json!({})).is_err());
    }
}
