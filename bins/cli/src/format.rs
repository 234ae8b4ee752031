//! Output mode handling.

use clap::Args;
use serde::Serialize;

/// Output selection shared by all subcommands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Args)]
pub struct OutputArgs {
    /// Emit machine-readable JSON instead of text.
    #[arg(long, global = true)]
    pub json: bool,
}

/// Render a payload in the selected mode.
pub fn render<T: Serialize>(
    output: OutputArgs,
    payload: &T,
    text: impl FnOnce(&T) -> String,
) -> Result<String, serde_json::Error> {
    if output.json {
        serde_json::to_string_pretty(payload)
    } else {
        Ok(text(payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_mode_renders_json() -> Result<(), serde_json::Error> {
        let rendered = render(OutputArgs { json: true }, &42u32, |_| String::new())?;
        assert_eq!(rendered, "42");
        Ok(())
    }

    #[test]
    fn text_mode_uses_the_formatter() -> Result<(), serde_json::Error> {
        let rendered = render(OutputArgs { json: false }, &42u32, |value| {
            format!("value: {value}")
        })?;
        assert_eq!(rendered, "value: 42");
        Ok(())
    }
}
