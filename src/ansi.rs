//! ANSI SGR color codec.
//!
//! Formatters thread color through their output as inline escape codes; the
//! replay console decodes that flat stream back into discrete
//! `(text, colors)` writes. Encode and decode live here so the translation
//! happens exactly once per record.

/// The 16 console colors addressable through SGR codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    Black,
    DarkBlue,
    DarkGreen,
    DarkCyan,
    DarkRed,
    DarkMagenta,
    DarkYellow,
    Gray,
    DarkGray,
    Blue,
    Green,
    Cyan,
    Red,
    Magenta,
    Yellow,
    White,
}

/// Resets the foreground color and the bold attribute set by bright colors.
pub const DEFAULT_FOREGROUND: &str = "\x1b[39m\x1b[22m";

/// Resets the background color.
pub const DEFAULT_BACKGROUND: &str = "\x1b[49m";

/// Escape sequence selecting `color` as foreground; `None` resets.
///
/// Dark colors use SGR 30-37; bright colors are the bold-prefixed compound
/// form `ESC[1m` + `ESC[3Xm`.
pub fn foreground_code(color: Option<Color>) -> &'static str {
    match color {
        Some(Color::Black) => "\x1b[30m",
        Some(Color::DarkRed) => "\x1b[31m",
        Some(Color::DarkGreen) => "\x1b[32m",
        Some(Color::DarkYellow) => "\x1b[33m",
        Some(Color::DarkBlue) => "\x1b[34m",
        Some(Color::DarkMagenta) => "\x1b[35m",
        Some(Color::DarkCyan) => "\x1b[36m",
        Some(Color::Gray) => "\x1b[37m",
        Some(Color::DarkGray) => "\x1b[1m\x1b[30m",
        Some(Color::Red) => "\x1b[1m\x1b[31m",
        Some(Color::Green) => "\x1b[1m\x1b[32m",
        Some(Color::Yellow) => "\x1b[1m\x1b[33m",
        Some(Color::Blue) => "\x1b[1m\x1b[34m",
        Some(Color::Magenta) => "\x1b[1m\x1b[35m",
        Some(Color::Cyan) => "\x1b[1m\x1b[36m",
        Some(Color::White) => "\x1b[1m\x1b[37m",
        None => DEFAULT_FOREGROUND,
    }
}

/// Escape sequence selecting `color` as background; `None` resets.
///
/// Dark colors use SGR 40-47, bright colors SGR 100-107.
pub fn background_code(color: Option<Color>) -> &'static str {
    match color {
        Some(Color::Black) => "\x1b[40m",
        Some(Color::DarkRed) => "\x1b[41m",
        Some(Color::DarkGreen) => "\x1b[42m",
        Some(Color::DarkYellow) => "\x1b[43m",
        Some(Color::DarkBlue) => "\x1b[44m",
        Some(Color::DarkMagenta) => "\x1b[45m",
        Some(Color::DarkCyan) => "\x1b[46m",
        Some(Color::Gray) => "\x1b[47m",
        Some(Color::DarkGray) => "\x1b[100m",
        Some(Color::Red) => "\x1b[101m",
        Some(Color::Green) => "\x1b[102m",
        Some(Color::Yellow) => "\x1b[103m",
        Some(Color::Blue) => "\x1b[104m",
        Some(Color::Magenta) => "\x1b[105m",
        Some(Color::Cyan) => "\x1b[106m",
        Some(Color::White) => "\x1b[107m",
        None => DEFAULT_BACKGROUND,
    }
}

/// Append `text` to `buf` wrapped in color codes.
///
/// Background is applied before foreground; each is reset afterwards only
/// when it was set.
pub fn write_colored(buf: &mut String, text: &str, background: Option<Color>, foreground: Option<Color>) {
    if background.is_some() {
        buf.push_str(background_code(background));
    }
    if foreground.is_some() {
        buf.push_str(foreground_code(foreground));
    }
    buf.push_str(text);
    if foreground.is_some() {
        buf.push_str(DEFAULT_FOREGROUND);
    }
    if background.is_some() {
        buf.push_str(DEFAULT_BACKGROUND);
    }
}

/// One run of text plus the colors in effect when it was emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColoredSpan {
    pub text: String,
    pub background: Option<Color>,
    pub foreground: Option<Color>,
}

impl ColoredSpan {
    pub fn plain(text: impl Into<String>) -> Self {
        ColoredSpan {
            text: text.into(),
            background: None,
            foreground: None,
        }
    }

    pub fn colored(text: impl Into<String>, background: Option<Color>, foreground: Option<Color>) -> Self {
        ColoredSpan {
            text: text.into(),
            background,
            foreground,
        }
    }
}

enum Sgr {
    Foreground(Option<Color>),
    Background(Option<Color>),
}

/// Decode the color escape sequence at the start of `bytes`, which begins
/// with ESC. Returns the matched length and effect, or `None` when the
/// sequence is not one this codec emits.
fn match_escape(bytes: &[u8]) -> Option<(usize, Sgr)> {
    const FG_RESET: &[u8] = b"\x1b[39m\x1b[22m";
    const BG_RESET: &[u8] = b"\x1b[49m";

    if bytes.len() < 2 || bytes[1] != b'[' {
        return None;
    }
    if bytes.starts_with(FG_RESET) {
        return Some((FG_RESET.len(), Sgr::Foreground(None)));
    }
    if bytes.starts_with(BG_RESET) {
        return Some((BG_RESET.len(), Sgr::Background(None)));
    }
    // Bold compound: ESC[1m ESC[3Xm selects a bright foreground.
    if bytes.len() >= 9
        && &bytes[..4] == b"\x1b[1m"
        && &bytes[4..6] == b"\x1b["
        && bytes[6] == b'3'
        && bytes[8] == b'm'
    {
        if let Some(color) = bright_color(bytes[7]) {
            return Some((9, Sgr::Foreground(Some(color))));
        }
    }
    if bytes.len() >= 5 && bytes[4] == b'm' {
        if bytes[2] == b'3' {
            if let Some(color) = dark_color(bytes[3]) {
                return Some((5, Sgr::Foreground(Some(color))));
            }
        }
        if bytes[2] == b'4' {
            if let Some(color) = dark_color(bytes[3]) {
                return Some((5, Sgr::Background(Some(color))));
            }
        }
    }
    if bytes.len() >= 6 && bytes[2] == b'1' && bytes[3] == b'0' && bytes[5] == b'm' {
        if let Some(color) = bright_color(bytes[4]) {
            return Some((6, Sgr::Background(Some(color))));
        }
    }
    None
}

fn dark_color(digit: u8) -> Option<Color> {
    match digit {
        b'0' => Some(Color::Black),
        b'1' => Some(Color::DarkRed),
        b'2' => Some(Color::DarkGreen),
        b'3' => Some(Color::DarkYellow),
        b'4' => Some(Color::DarkBlue),
        b'5' => Some(Color::DarkMagenta),
        b'6' => Some(Color::DarkCyan),
        b'7' => Some(Color::Gray),
        _ => None,
    }
}

fn bright_color(digit: u8) -> Option<Color> {
    match digit {
        b'0' => Some(Color::DarkGray),
        b'1' => Some(Color::Red),
        b'2' => Some(Color::Green),
        b'3' => Some(Color::Yellow),
        b'4' => Some(Color::Blue),
        b'5' => Some(Color::Magenta),
        b'6' => Some(Color::Cyan),
        b'7' => Some(Color::White),
        _ => None,
    }
}

/// Scan `text` once left to right, decoding inline color escapes.
///
/// `visit` receives `(content, background, foreground)` for each run of
/// plain content, carrying the colors in effect when that run was emitted.
/// A recognized escape first flushes the pending content with the colors in
/// effect *before* the escape, then updates state. Escape sequences this
/// codec does not recognize stay in the content stream verbatim; they are
/// never dropped. Trailing content is flushed once with the last-known
/// colors.
pub fn parse(text: &str, mut visit: impl FnMut(&str, Option<Color>, Option<Color>)) {
    let bytes = text.as_bytes();
    let mut foreground: Option<Color> = None;
    let mut background: Option<Color> = None;
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == 0x1b {
            if let Some((len, effect)) = match_escape(&bytes[i..]) {
                if start < i {
                    visit(&text[start..i], background, foreground);
                }
                match effect {
                    Sgr::Foreground(color) => foreground = color,
                    Sgr::Background(color) => background = color,
                }
                i += len;
                start = i;
                continue;
            }
        }
        i += 1;
    }
    if start < bytes.len() {
        visit(&text[start..], background, foreground);
    }
}
