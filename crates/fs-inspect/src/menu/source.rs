use std::collections::VecDeque;
use std::io::BufRead;

use tracing::warn;

/// Supplies whitespace-delimited tokens to interactive sessions.
pub trait CommandSource: Send {
    /// Next token, or `None` once input is exhausted.
    fn next_token(&mut self) -> Option<String>;
}

impl<F> CommandSource for F
where
    F: FnMut() -> Option<String> + Send,
{
    fn next_token(&mut self) -> Option<String> {
        self()
    }
}

/// Splits a buffered reader (usually stdin) into tokens, the way `scanf("%s")` does.
pub struct ReaderSource<R> {
    reader: R,
    pending: VecDeque<String>,
}

impl<R: BufRead + Send> ReaderSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            pending: VecDeque::new(),
        }
    }
}

impl ReaderSource<std::io::BufReader<std::io::Stdin>> {
    pub fn stdin() -> Self {
        Self::new(std::io::BufReader::new(std::io::stdin()))
    }
}

impl<R: BufRead + Send> CommandSource for ReaderSource<R> {
    fn next_token(&mut self) -> Option<String> {
        loop {
            if let Some(token) = self.pending.pop_front() {
                return Some(token);
            }
            let mut line = Vec::new();
            match self.reader.read_until(b'\n', &mut line) {
                Ok(0) => return None,
                Ok(_) => {
                    // Undecodable bytes become U+FFFD and fail validation later.
                    self.pending.extend(
                        String::from_utf8_lossy(&line)
                            .split_whitespace()
                            .map(str::to_string),
                    );
                }
                Err(e) => {
                    warn!(error = %e, "reading option input failed, treating as end of input");
                    return None;
                }
            }
        }
    }
}

/// A fixed queue of tokens.
#[derive(Debug, Default, Clone)]
pub struct ScriptedSource {
    tokens: VecDeque<String>,
}

impl ScriptedSource {
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.tokens.len()
    }
}

impl CommandSource for ScriptedSource {
    fn next_token(&mut self) -> Option<String> {
        self.tokens.pop_front()
    }
}
