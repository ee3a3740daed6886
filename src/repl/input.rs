//! Line input for the terminal front end
//!
//! Interactive use goes through a rustyline editor on its own thread, since
//! `readline` blocks. Tests feed scripted `Lines` instead.

use async_trait::async_trait;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::io;
use std::sync::mpsc as std_mpsc;
use tokio::io::{AsyncBufRead, Lines};
use tokio::sync::mpsc;

/// Source of user input, one line per prompt
#[async_trait]
pub trait LineSource: Send {
    /// Next line without its newline; `None` at end of input
    async fn next_line(&mut self, prompt: &str) -> io::Result<Option<String>>;
}

#[async_trait]
impl<R> LineSource for Lines<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    async fn next_line(&mut self, _prompt: &str) -> io::Result<Option<String>> {
        Lines::next_line(self).await
    }
}

type LineResult = io::Result<Option<String>>;

/// Line editor with history, driven from a dedicated thread
pub struct ReadlineInput {
    prompts: std_mpsc::Sender<String>,
    lines: mpsc::Receiver<LineResult>,
}

impl ReadlineInput {
    pub fn spawn() -> io::Result<Self> {
        let (prompt_tx, prompt_rx) = std_mpsc::channel();
        let (line_tx, line_rx) = mpsc::channel(1);

        std::thread::Builder::new()
            .name("readline".to_string())
            .spawn(move || read_lines(&prompt_rx, &line_tx))?;

        Ok(Self {
            prompts: prompt_tx,
            lines: line_rx,
        })
    }
}

#[async_trait]
impl LineSource for ReadlineInput {
    async fn next_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        // A stopped editor thread still leaves its last result queued
        let _ = self.prompts.send(prompt.to_string());
        self.lines.recv().await.unwrap_or(Ok(None))
    }
}

fn read_lines(prompts: &std_mpsc::Receiver<String>, lines: &mpsc::Sender<LineResult>) {
    let mut editor = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(e) => {
            let _ = lines.blocking_send(Err(into_io(e)));
            return;
        }
    };

    while let Ok(prompt) = prompts.recv() {
        let result = match editor.readline(&prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let _ = editor.add_history_entry(line.as_str());
                }
                Ok(Some(line))
            }
            // Ctrl-C clears the line, like an empty entry
            Err(ReadlineError::Interrupted) => Ok(Some(String::new())),
            Err(ReadlineError::Eof) => Ok(None),
            Err(e) => Err(into_io(e)),
        };

        let finished = !matches!(result, Ok(Some(_)));
        if lines.blocking_send(result).is_err() || finished {
            break;
        }
    }

    tracing::debug!("Readline thread finished");
}

fn into_io(error: ReadlineError) -> io::Error {
    match error {
        ReadlineError::Io(e) => e,
        other => io::Error::other(other),
    }
}
