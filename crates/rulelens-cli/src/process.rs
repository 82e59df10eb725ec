use rulelens_core::generation::{Prompt, TextGenerator};
use rulelens_core::GenerationError;
use std::future::Future;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Text generator backed by an external command.
///
/// The prompt is written to the command's stdin; whatever it prints on stdout
/// is the response. The command is killed when the timeout elapses.
#[derive(Debug, Clone)]
pub struct ProcessGenerator {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl ProcessGenerator {
    /// Split `command_line` on whitespace into program and arguments.
    pub fn from_command_line(command_line: &str, timeout: Duration) -> Result<Self, GenerationError> {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .ok_or_else(|| GenerationError::collaborator("generator command is empty"))?;
        Ok(Self {
            program,
            args: parts.collect(),
            timeout,
        })
    }

    async fn run(&self, input: String) -> Result<String, GenerationError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| GenerationError::collaborator(format!("failed to start {}: {e}", self.program)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(input.as_bytes())
                .await
                .map_err(|e| GenerationError::collaborator(format!("failed to send prompt: {e}")))?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| GenerationError::collaborator(format!("failed to read response: {e}")))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GenerationError::collaborator(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl TextGenerator for ProcessGenerator {
    fn complete(&self, prompt: &Prompt) -> impl Future<Output = Result<String, GenerationError>> + Send {
        let input = prompt.to_text();
        async move {
            tracing::debug!(program = %self.program, "requesting rule from generator");
            match tokio::time::timeout(self.timeout, self.run(input)).await {
                Ok(result) => result,
                Err(_) => Err(GenerationError::Timeout { after: self.timeout }),
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use rulelens_core::generation::build_prompt;
    use rulelens_core::{Engine, GenerationError};

    fn generator(command: &str, millis: u64) -> ProcessGenerator {
        ProcessGenerator::from_command_line(command, Duration::from_millis(millis)).expect("command")
    }

    #[tokio::test]
    async fn echoed_prompt_yields_the_worked_example() {
        // `cat` answers with the prompt itself, whose only JSON object is the example rule.
        let rule = Engine::default()
            .generate(&generator("cat", 5_000), "age over 18 in the USA")
            .await
            .expect("rule");
        assert_eq!(rule.node.tag(), Some("and"));
    }

    #[tokio::test]
    async fn failing_command_is_collaborator_error() {
        let err = generator("false", 5_000)
            .complete(&build_prompt("x"))
            .await
            .expect_err("non-zero exit");
        assert_eq!(err.code(), "collaborator");
    }

    #[tokio::test]
    async fn slow_command_times_out() {
        let err = generator("sleep 5", 100)
            .complete(&build_prompt("x"))
            .await
            .expect_err("timeout");
        assert_eq!(
            err,
            GenerationError::Timeout {
                after: Duration::from_millis(100)
            }
        );
        assert!(err.to_string().ends_with("timed out after 100ms"), "{err}");
    }

    #[tokio::test]
    async fn unknown_program_is_collaborator_error() {
        let err = generator("rulelens-no-such-generator", 1_000)
            .complete(&build_prompt("x"))
            .await
            .expect_err("spawn fails");
        assert!(err.to_string().contains("failed to start"));
    }

    #[test]
    fn empty_command_is_rejected() {
        assert!(ProcessGenerator::from_command_line("   ", Duration::from_secs(1)).is_err());
    }
}
