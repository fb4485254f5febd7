use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::{self, BufRead, BufReader, Read};
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};

/// What the output reader thread sees on the ghci output stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputEvent {
    Line(String),
    /// The sentinel prompt: ghci finished answering and waits for input.
    Prompt,
    Closed,
}

// While stopped ghci puts the current span (`[A.hs:3:12-20] `, or
// `... [span] ` inside the history) in front of any prompt.
static CONTEXT_PREFIX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\.\.\. )?\[[^\[\]]*\] $").expect("must compile")
});
// Default prompts seen before the sentinel is installed: `ghci> `, `Prelude> `, `*Main> `.
static DEFAULT_PROMPT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\w.* ]*> $").expect("must compile"));

/// Text in front of the sentinel with prompt decorations removed.
fn strip_prompt_prefix(before: &str) -> &str {
    let before = match CONTEXT_PREFIX_RE.find(before) {
        Some(m) => &before[..m.start()],
        None => before,
    };
    if DEFAULT_PROMPT_RE.is_match(before) {
        ""
    } else {
        before
    }
}

/// Split a raw output line into the events it carries. Ghci prints the prompt
/// right after output that does not end in a newline, so text in front of the
/// sentinel is still output unless it is part of the prompt itself.
pub fn classify_line(line: &str, sentinel: &str) -> Vec<OutputEvent> {
    let line = line.trim_end_matches(['\r', '\n']);
    match line.find(sentinel) {
        Some(idx) => {
            let mut events = Vec::with_capacity(2);
            let before = strip_prompt_prefix(&line[..idx]);
            if !before.trim().is_empty() {
                events.push(OutputEvent::Line(before.to_string()));
            }
            events.push(OutputEvent::Prompt);
            events
        }
        None => vec![OutputEvent::Line(line.to_string())],
    }
}

/// Read `source` line by line on a dedicated thread until EOF or until the
/// receiving side goes away.
pub fn spawn_reader<R>(source: R, sentinel: String, events: Sender<OutputEvent>) -> io::Result<JoinHandle<()>>
where
    R: Read + Send + 'static,
{
    thread::Builder::new()
        .name("ghci-output".to_string())
        .spawn(move || {
            let mut reader = BufReader::new(source);
            let mut line = String::new();
            loop {
                line.clear();
                match reader.read_line(&mut line) {
                    Ok(0) => {
                        debug!("ghci output closed");
                        break;
                    }
                    Ok(_) => {
                        for event in classify_line(&line, &sentinel) {
                            if events.send(event).is_err() {
                                return;
                            }
                        }
                    }
                    Err(e) => {
                        warn!("cannot read ghci output: {e}");
                        break;
                    }
                }
            }
            let _ = events.send(OutputEvent::Closed);
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::mpsc;

    const SENTINEL: &str = "<<ghci-debugger>>";

    #[test]
    fn test_classify_line() {
        assert_eq!(
            classify_line("x :: Int\n", SENTINEL),
            vec![OutputEvent::Line("x :: Int".to_string())]
        );
        assert_eq!(
            classify_line("<<ghci-debugger>>\r\n", SENTINEL),
            vec![OutputEvent::Prompt]
        );
        assert_eq!(
            classify_line("ghci> <<ghci-debugger>>\n", SENTINEL),
            vec![OutputEvent::Prompt]
        );
        assert_eq!(
            classify_line("no newline<<ghci-debugger>>\n", SENTINEL),
            vec![
                OutputEvent::Line("no newline".to_string()),
                OutputEvent::Prompt
            ]
        );
    }

    #[test]
    fn test_classify_line_drops_stop_context() {
        assert_eq!(
            classify_line("[A.hs:3:12-20] <<ghci-debugger>>\n", SENTINEL),
            vec![OutputEvent::Prompt]
        );
        assert_eq!(
            classify_line("... [A.hs:(3,1)-(4,20)] <<ghci-debugger>>\n", SENTINEL),
            vec![OutputEvent::Prompt]
        );
        assert_eq!(
            classify_line("*Main> <<ghci-debugger>>\n", SENTINEL),
            vec![OutputEvent::Prompt]
        );
        assert_eq!(
            classify_line("done[A.hs:3:12-20] <<ghci-debugger>>\n", SENTINEL),
            vec![
                OutputEvent::Line("done".to_string()),
                OutputEvent::Prompt
            ]
        );
    }

    #[test]
    fn test_reader_thread_events() {
        let (tx, rx) = mpsc::channel();
        let source = Cursor::new(b"banner\n<<ghci-debugger>>\n\"2\"\n<<ghci-debugger>>\n".to_vec());
        let handle = spawn_reader(source, SENTINEL.to_string(), tx).unwrap();
        handle.join().unwrap();

        let events: Vec<_> = rx.iter().collect();
        assert_eq!(
            events,
            vec![
                OutputEvent::Line("banner".to_string()),
                OutputEvent::Prompt,
                OutputEvent::Line("\"2\"".to_string()),
                OutputEvent::Prompt,
                OutputEvent::Closed,
            ]
        );
    }
}
