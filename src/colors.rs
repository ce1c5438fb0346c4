/// Color support with `--color` and the NO_COLOR / CLICOLOR conventions
///
/// `--color always|never` wins outright. With `auto` (the default):
/// - `NO_COLOR`: If set (to any value), disable colors
/// - `CLICOLOR_FORCE`: If set to non-zero, force colors even when not a TTY
/// - `CLICOLOR`: If set to 0, disable colors
/// - otherwise colors follow whether stdout is a terminal
use clap::ValueEnum;
use colored::control;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ColorChoice {
    #[default]
    Auto,
    Always,
    Never,
}

/// Resolve whether to emit colors, given an environment lookup.
pub fn should_colorize(
    choice: ColorChoice,
    env: impl Fn(&str) -> Option<String>,
    is_tty: bool,
) -> bool {
    match choice {
        ColorChoice::Always => return true,
        ColorChoice::Never => return false,
        ColorChoice::Auto => {}
    }

    // https://no-color.org/
    if env("NO_COLOR").is_some() {
        return false;
    }

    if env("CLICOLOR_FORCE").is_some_and(|v| v != "0") {
        return true;
    }

    if env("CLICOLOR").is_some_and(|v| v == "0") {
        return false;
    }

    is_tty
}

/// Call early in main() to configure color output for the whole run.
pub fn init_colors(choice: ColorChoice) {
    let is_tty = std::io::IsTerminal::is_terminal(&std::io::stdout());
    control::set_override(should_colorize(choice, |k| std::env::var(k).ok(), is_tty));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_explicit_choice_wins() {
        assert!(should_colorize(ColorChoice::Always, env_of(&[("NO_COLOR", "1")]), false));
        assert!(!should_colorize(ColorChoice::Never, env_of(&[]), true));
    }

    #[test]
    fn test_auto_follows_environment() {
        assert!(!should_colorize(ColorChoice::Auto, env_of(&[("NO_COLOR", "")]), true));
        assert!(should_colorize(ColorChoice::Auto, env_of(&[("CLICOLOR_FORCE", "1")]), false));
        assert!(!should_colorize(ColorChoice::Auto, env_of(&[("CLICOLOR", "0")]), true));
        assert!(should_colorize(ColorChoice::Auto, env_of(&[]), true));
        assert!(!should_colorize(ColorChoice::Auto, env_of(&[]), false));
    }
}
