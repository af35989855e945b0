//! Output rendering for streamed responses.
//!
//! This module provides a trait-based rendering abstraction. The decoder
//! hands every sink update the full accumulated markdown so far, so a
//! renderer is free to redraw the whole response each time (a live terminal
//! markdown view would) or, like [`PlainTextRenderer`], print only the
//! unseen suffix.

use std::io::{self, Stdout, Write};

/// ANSI escape code for red text (used for errors).
const ANSI_RED: &str = "\x1b[31m";

/// ANSI escape code for green text (used for informational messages).
const ANSI_GREEN: &str = "\x1b[32m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// Trait for rendering chat output.
///
/// `update` is called incrementally during streaming; each call carries the
/// complete accumulation so far, never something shorter than the previous
/// call, and the final call reflects the complete response.
pub trait Renderer: Send {
    /// Render the accumulated response so far.
    fn update(&mut self, markdown: &str);

    /// Called when a response is complete (with or without the sentinel).
    ///
    /// Used to ensure proper newlines and cleanup after streaming.
    fn finish_response(&mut self);

    /// Print an informational message.
    fn print_info(&mut self, info: &str);

    /// Print an error message.
    fn print_error(&mut self, error: &str);
}

/// Plain text renderer with optional ANSI styling.
///
/// Prints the unseen suffix of each update directly to stdout, which keeps
/// the terminal display identical to redrawing the full accumulation.
pub struct PlainTextRenderer {
    stdout: Stdout,
    use_color: bool,
    printed: usize,
}

impl PlainTextRenderer {
    /// Creates a new PlainTextRenderer with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new PlainTextRenderer with the specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self {
            stdout: io::stdout(),
            use_color,
            printed: 0,
        }
    }

    /// Flushes stdout to ensure immediate display of streamed content.
    fn flush(&mut self) {
        let _ = self.stdout.flush();
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for PlainTextRenderer {
    fn update(&mut self, markdown: &str) {
        // Updates within one response are prefix extensions, so the suffix
        // split lands on the boundary of the previous update. If the offset
        // no longer lines up with the accumulation (a new response after an
        // aborted one), redraw from the start instead of slicing.
        match markdown.get(self.printed..) {
            Some("") => {}
            Some(suffix) => {
                print!("{suffix}");
                self.printed = markdown.len();
                self.flush();
            }
            None => {
                print!("{markdown}");
                self.printed = markdown.len();
                self.flush();
            }
        }
    }

    fn finish_response(&mut self) {
        self.printed = 0;
        println!();
        self.flush();
    }

    fn print_info(&mut self, info: &str) {
        if self.use_color {
            println!("{ANSI_GREEN}{info}{ANSI_RESET}");
        } else {
            println!("{info}");
        }
    }

    fn print_error(&mut self, error: &str) {
        if self.use_color {
            eprintln!("{ANSI_RED}Error:{ANSI_RESET} {error}");
        } else {
            eprintln!("Error: {error}");
        }
    }
}

/// Test renderer that records every sink interaction.
#[cfg(test)]
pub struct RecordingRenderer {
    /// Every `update` call, in order.
    pub updates: Vec<String>,
    /// Number of `finish_response` calls.
    pub finished: usize,
    /// Every info line.
    pub infos: Vec<String>,
    /// Every error line.
    pub errors: Vec<String>,
}

#[cfg(test)]
impl RecordingRenderer {
    pub fn new() -> Self {
        Self {
            updates: Vec::new(),
            finished: 0,
            infos: Vec::new(),
            errors: Vec::new(),
        }
    }
}

#[cfg(test)]
impl Renderer for RecordingRenderer {
    fn update(&mut self, markdown: &str) {
        self.updates.push(markdown.to_string());
    }

    fn finish_response(&mut self) {
        self.finished += 1;
    }

    fn print_info(&mut self, info: &str) {
        self.infos.push(info.to_string());
    }

    fn print_error(&mut self, error: &str) {
        self.errors.push(error.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renderer_default_has_color() {
        let renderer = PlainTextRenderer::new();
        assert!(renderer.use_color);
    }

    #[test]
    fn renderer_without_color() {
        let renderer = PlainTextRenderer::with_color(false);
        assert!(!renderer.use_color);
    }

    #[test]
    fn update_tracks_prefix_extensions() {
        let mut renderer = PlainTextRenderer::with_color(false);
        renderer.update("Hel");
        renderer.update("Hello");
        assert_eq!(renderer.printed, 5);
        renderer.finish_response();
        assert_eq!(renderer.printed, 0);
    }

    #[test]
    fn update_recovers_from_a_stale_offset() {
        let mut renderer = PlainTextRenderer::with_color(false);
        renderer.update("aaa");
        // A response cut off without finish_response leaves the offset
        // behind; the next accumulation need not share its byte boundaries.
        renderer.update("ééé");
        assert_eq!(renderer.printed, "ééé".len());
        renderer.update("bb");
        assert_eq!(renderer.printed, 2);
    }
}
