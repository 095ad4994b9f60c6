use std::{env, path::PathBuf};

use crate::error::{PathError, PathResult};

/// Returns the user's home directory.
///
/// Checks `HOME` first and falls back to `/home/{USER}`.
pub fn home_dir() -> PathBuf {
    env::var("HOME").map(PathBuf::from).unwrap_or_else(|_| {
        let user = env::var("USER").unwrap_or_else(|_| "root".to_string());
        PathBuf::from(format!("/home/{user}"))
    })
}

/// Resolves a path that may contain environment variables.
///
/// Expands `$VAR` and `${VAR}`, turns a leading `~` into the home directory
/// and makes relative paths absolute against the current directory.
///
/// # Errors
///
/// * [`PathError::Empty`] if the path is empty
/// * [`PathError::CurrentDir`] if the current directory cannot be determined
/// * [`PathError::MissingEnvVar`] if a referenced variable is undefined
/// * [`PathError::UnclosedVariable`] for `${` without a closing brace
pub fn resolve_path(path: &str) -> PathResult<PathBuf> {
    let path = path.trim();
    if path.is_empty() {
        return Err(PathError::Empty);
    }

    let path_buf = PathBuf::from(expand_variables(path)?);
    if path_buf.is_absolute() {
        Ok(path_buf)
    } else {
        env::current_dir()
            .map(|cwd| cwd.join(path_buf))
            .map_err(|err| PathError::CurrentDir { source: err })
    }
}

fn expand_variables(path: &str) -> PathResult<String> {
    let mut result = String::with_capacity(path.len());
    let mut chars = path.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '$' if chars.peek() == Some(&'{') => {
                chars.next();
                let mut var_name = String::new();
                let mut closed = false;
                for c in chars.by_ref() {
                    if c == '}' {
                        closed = true;
                        break;
                    }
                    var_name.push(c);
                }
                if !closed {
                    return Err(PathError::UnclosedVariable {
                        input: format!("${{{var_name}"),
                    });
                }
                push_env_var(&var_name, &mut result, path)?;
            }
            '$' => {
                let mut var_name = String::new();
                while let Some(&c) = chars.peek() {
                    if !(c.is_alphanumeric() || c == '_') {
                        break;
                    }
                    var_name.push(c);
                    chars.next();
                }
                if var_name.is_empty() {
                    result.push('$');
                } else {
                    push_env_var(&var_name, &mut result, path)?;
                }
            }
            '~' if result.is_empty() => result.push_str(&home_dir().to_string_lossy()),
            _ => result.push(c),
        }
    }

    Ok(result)
}

fn push_env_var(var_name: &str, result: &mut String, original: &str) -> PathResult<()> {
    if var_name == "HOME" {
        result.push_str(&home_dir().to_string_lossy());
        return Ok(());
    }
    let value = env::var(var_name).map_err(|_| {
        PathError::MissingEnvVar {
            var: var_name.into(),
            input: original.into(),
        }
    })?;
    result.push_str(&value);
    Ok(())
}
