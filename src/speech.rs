//! Text-to-speech output.

use anyhow::{anyhow, Context, Result};
use std::process::{Command, Stdio};

/// Speaks feedback to the user.
pub trait Speaker: Send {
    fn say(&mut self, text: &str) -> Result<()>;
}

/// Runs an external TTS program with the text as its last argument.
#[derive(Clone, Debug)]
pub struct CommandSpeaker {
    program: String,
    args: Vec<String>,
}

impl CommandSpeaker {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Result<Self> {
        let program = program.into();
        if program.trim().is_empty() {
            return Err(anyhow!("speech command must not be empty"));
        }
        Ok(Self { program, args })
    }
}

impl Speaker for CommandSpeaker {
    fn say(&mut self, text: &str) -> Result<()> {
        log::info!("saying: {}", text);
        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .status()
            .with_context(|| format!("failed to run speech command '{}'", self.program))?;
        if !status.success() {
            return Err(anyhow!(
                "speech command '{}' exited with {}",
                self.program,
                status
            ));
        }
        Ok(())
    }
}

/// Logs instead of speaking.
#[derive(Clone, Debug, Default)]
pub struct LogSpeaker;

impl Speaker for LogSpeaker {
    fn say(&mut self, text: &str) -> Result<()> {
        log::info!("[speech] {}", text);
        Ok(())
    }
}

/// Build a speaker from a configured command; `None` or an empty command logs only.
pub fn speaker_from_command(command: Option<&str>, args: &[String]) -> Result<Box<dyn Speaker>> {
    match command.map(str::trim) {
        Some(program) if !program.is_empty() => {
            Ok(Box::new(CommandSpeaker::new(program, args.to_vec())?))
        }
        _ => Ok(Box::new(LogSpeaker)),
    }
}
