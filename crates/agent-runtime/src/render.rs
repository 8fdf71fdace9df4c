//! Console rendering of agent output

use crate::executor::ExecutorEventHandler;
use async_trait::async_trait;
use serde_json::Value;
use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};
use termimad::{FmtText, MadSkin};

/// Markdown text waiting for the end of its line
struct MarkdownLines {
    skin: MadSkin,
    pending: String,
}

impl MarkdownLines {
    fn render(&self, line: &str) -> String {
        let mut rendered = FmtText::from(&self.skin, line, None).to_string();
        if !rendered.ends_with('\n') {
            rendered.push('\n');
        }
        rendered
    }
}

struct Sink<W> {
    out: W,
    error: Option<io::Error>,
    at_line_start: bool,
    markdown: Option<MarkdownLines>,
}

impl<W: Write> Sink<W> {
    fn write(&mut self, text: &str) {
        if self.error.is_some() || text.is_empty() {
            return;
        }
        if let Err(e) = self
            .out
            .write_all(text.as_bytes())
            .and_then(|()| self.out.flush())
        {
            self.error = Some(e);
            return;
        }
        self.at_line_start = text.ends_with('\n');
    }

    /// Answer text: raw, or rendered a complete line at a time
    fn text(&mut self, delta: &str) {
        let Some(markdown) = &mut self.markdown else {
            self.write(delta);
            return;
        };
        markdown.pending.push_str(delta);

        let mut rendered = String::new();
        while let Some(end) = markdown.pending.find('\n') {
            let line: String = markdown.pending.drain(..=end).collect();
            rendered.push_str(&markdown.render(line.trim_end_matches(['\r', '\n'])));
        }
        self.write(&rendered);
    }

    /// Render a trailing partial markdown line
    fn flush_pending(&mut self) {
        let Some(markdown) = &mut self.markdown else {
            return;
        };
        if markdown.pending.is_empty() {
            return;
        }
        let line = std::mem::take(&mut markdown.pending);
        let rendered = markdown.render(&line);
        self.write(rendered.trim_end_matches('\n'));
    }

    /// A line of its own, never glued to preceding answer text
    fn line(&mut self, text: &str) {
        self.flush_pending();
        if !self.at_line_start {
            self.write("\n");
        }
        self.write(text);
    }
}

/// Writes tool calls and answer text to a console as they happen
///
/// Text deltas are written verbatim and flushed one by one so the answer
/// appears while it streams in. With `show_tool_calls` each tool invocation
/// is announced on its own line before it runs.
///
/// [`with_markdown`](Self::with_markdown) switches to terminal rendering:
/// answer text is styled with a termimad skin one complete line at a time.
///
/// Event callbacks cannot fail, so the first write error is kept and
/// reported by [`finish`](Self::finish).
pub struct ConsoleRenderer<W> {
    sink: Mutex<Sink<W>>,
    show_tool_calls: bool,
}

impl<W: Write + Send> ConsoleRenderer<W> {
    /// Render into `out`
    pub fn new(out: W, show_tool_calls: bool) -> Self {
        Self {
            sink: Mutex::new(Sink {
                out,
                error: None,
                at_line_start: true,
                markdown: None,
            }),
            show_tool_calls,
        }
    }

    /// Style answer text as markdown with `skin`
    pub fn with_markdown(mut self, skin: MadSkin) -> Self {
        self.sink
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .markdown = Some(MarkdownLines {
            skin,
            pending: String::new(),
        });
        self
    }

    fn with_sink(&self, f: impl FnOnce(&mut Sink<W>)) {
        f(&mut self.sink.lock().unwrap_or_else(PoisonError::into_inner));
    }

    /// Surface the first write error, if any
    pub fn finish(self) -> io::Result<W> {
        let mut sink = self
            .sink
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        sink.flush_pending();
        match sink.error {
            Some(e) => Err(e),
            None => Ok(sink.out),
        }
    }
}

/// `name(key=value, ...)` for a tool invocation
fn format_call(name: &str, input: &Value) -> String {
    let args = match input {
        Value::Object(map) => map
            .iter()
            .map(|(key, value)| match value {
                Value::String(s) => format!("{key}={s}"),
                other => format!("{key}={other}"),
            })
            .collect::<Vec<_>>()
            .join(", "),
        Value::Null => String::new(),
        other => other.to_string(),
    };
    format!("{name}({args})")
}

#[async_trait]
impl<W: Write + Send> ExecutorEventHandler for ConsoleRenderer<W> {
    async fn on_tool_start(&self, _id: &str, name: &str, input: &Value) {
        if self.show_tool_calls {
            let call = format!(" - Running: {}\n\n", format_call(name, input));
            self.with_sink(|sink| sink.line(&call));
        }
    }

    async fn on_text_delta(&self, delta: &str) {
        self.with_sink(|sink| sink.text(delta));
    }
}
