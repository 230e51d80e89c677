//! Index page rendering.

use ledbridge::{Action, Command, LedId, LedSnapshot};
use std::fmt::Write as _;

/// Everything the index page shows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexPage {
    /// Status or result text.
    pub message: Option<String>,
    /// Command the message is the result of.
    pub last_command: Option<String>,
    /// LED indicators.
    pub led_states: LedSnapshot,
}

impl IndexPage {
    /// Banner text: the bare message, or the message framed as a command result.
    pub fn banner(&self) -> Option<String> {
        match (&self.last_command, &self.message) {
            (Some(command), Some(message)) => Some(format!("Command '{command}' result: {message}")),
            (None, Some(message)) => Some(message.clone()),
            (_, None) => None,
        }
    }

    /// Render the full HTML document.
    pub fn render(&self) -> String {
        let mut html = String::from(HEAD);

        if let Some(banner) = self.banner() {
            let _ = writeln!(html, "<p class=\"message\">{}</p>", escape_html(&banner));
        }

        html.push_str("<div class=\"leds\">\n");
        for led in LedId::ALL {
            let lit = self.led_states.get(led);
            let _ = writeln!(
                html,
                "<div class=\"led\">\n<span class=\"lamp {class}\"></span>\n<h2>LED {led}</h2>\n<p>{state}</p>\n<form method=\"post\" action=\"/\">\n{on}\n{off}\n</form>\n</div>",
                class = if lit { "on" } else { "off" },
                state = if lit { "ON" } else { "OFF" },
                on = button(Command::new(Action::On, led), "Turn on"),
                off = button(Command::new(Action::Off, led), "Turn off"),
            );
        }
        html.push_str("</div>\n");
        html.push_str(TAIL);
        html
    }
}

fn button(command: Command, label: &str) -> String {
    format!("<button type=\"submit\" name=\"command\" value=\"{command}\">{label}</button>")
}

/// Escape text for HTML element and attribute content.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

const HEAD: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Arduino LED Control</title>
<style>
body { font-family: sans-serif; max-width: 40rem; margin: 2rem auto; }
.message { padding: 0.5rem 1rem; background: #eef; border-radius: 4px; }
.leds { display: flex; gap: 1rem; }
.led { flex: 1; text-align: center; border: 1px solid #ccc; border-radius: 4px; padding: 1rem; }
.lamp { display: inline-block; width: 2rem; height: 2rem; border-radius: 50%; }
.lamp.on { background: #f5c400; }
.lamp.off { background: #555; }
button { margin: 0.25rem; }
</style>
</head>
<body>
<h1>Arduino LED Control</h1>
"#;

const TAIL: &str = "</body>\n</html>\n";
