//! Terminal presentation shell
//!
//! Renders session snapshots as single status lines and parses the line
//! commands the CLI accepts. Pure projection: nothing here touches the
//! session.

use crate::error::{Error, Result};
use crate::playback::PlayerCommand;
use dualtrack_common::events::{LoadState, SessionSnapshot};
use dualtrack_common::{RenditionId, Track};

/// One line typed at the prompt
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShellCommand {
    Player(PlayerCommand),
    Status,
    Json,
    Help,
    Quit,
}

pub const HELP: &str = "\
commands:
  play | pause | toggle       transport
  seek <0..1>                 jump to a fraction of the track
  restart                     back to 0:00
  select <compressed|lossless> (or: mp3, lossless) switch rendition
  retry                       reload after a load error
  status | json               show the session
  quit";

/// Parse a prompt line
pub fn parse_command(line: &str) -> Result<ShellCommand> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(ShellCommand::Status);
    };
    let argument = words.next();

    let command = match verb.to_ascii_lowercase().as_str() {
        "play" => ShellCommand::Player(PlayerCommand::Play),
        "pause" => ShellCommand::Player(PlayerCommand::Pause),
        "toggle" | "p" => ShellCommand::Player(PlayerCommand::Toggle),
        "restart" | "back" => ShellCommand::Player(PlayerCommand::Restart),
        "retry" => ShellCommand::Player(PlayerCommand::Retry),
        "seek" => {
            let raw = argument
                .ok_or_else(|| Error::InvalidInput("seek needs a fraction".to_string()))?;
            let fraction: f64 = raw
                .parse()
                .map_err(|_| Error::InvalidInput(format!("'{}' is not a number", raw)))?;
            ShellCommand::Player(PlayerCommand::SeekToFraction(fraction))
        }
        "select" => {
            let raw = argument
                .ok_or_else(|| Error::InvalidInput("select needs a rendition".to_string()))?;
            ShellCommand::Player(PlayerCommand::SelectRendition(raw.parse()?))
        }
        "mp3" | "compressed" => {
            ShellCommand::Player(PlayerCommand::SelectRendition(RenditionId::Compressed))
        }
        "lossless" | "flac" => {
            ShellCommand::Player(PlayerCommand::SelectRendition(RenditionId::Lossless))
        }
        "status" | "s" => ShellCommand::Status,
        "json" => ShellCommand::Json,
        "help" | "?" => ShellCommand::Help,
        "quit" | "exit" | "q" => ShellCommand::Quit,
        other => {
            return Err(Error::InvalidInput(format!(
                "Unknown command '{}', try 'help'",
                other
            )))
        }
    };

    Ok(command)
}

/// Why `command` is disabled in the current state, if it is
pub fn disabled_reason(command: PlayerCommand, snapshot: &SessionSnapshot) -> Option<&'static str> {
    match command {
        PlayerCommand::Play
        | PlayerCommand::SeekToFraction(_)
        | PlayerCommand::Restart
            if !snapshot.controls_enabled() =>
        {
            Some("controls are disabled after a load error, 'retry' or 'select' to reload")
        }
        PlayerCommand::Restart if !snapshot.restart_enabled() => {
            Some("nothing loaded yet, 'play' first")
        }
        _ => None,
    }
}

/// "Title - Artist"
pub fn render_header(track: &Track) -> String {
    match track.artist() {
        Some(artist) => format!("{} - {}", track.title(), artist),
        None => track.title().to_string(),
    }
}

/// Rendition tabs, the active one bracketed: `[MP3]  Lossless`
pub fn render_tabs(track: &Track, snapshot: &SessionSnapshot) -> String {
    track
        .renditions()
        .map(|(id, _)| {
            if id == snapshot.active_rendition {
                format!("[{}]", id.label())
            } else {
                id.label().to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("  ")
}

/// `▶ 1:05 / 4:10 [26%] compressed ready`
pub fn render_status(snapshot: &SessionSnapshot) -> String {
    let symbol = if snapshot.playing { "▶" } else { "⏸" };
    let mut line = format!(
        "{} {} / {} [{:.0}%] {} {}",
        symbol,
        snapshot.position_text(),
        snapshot.duration_text(),
        snapshot.percentage(),
        snapshot.active_rendition,
        snapshot.load_state
    );
    if snapshot.load_state == LoadState::Error {
        line.push_str(" (controls disabled, 'retry' or 'select' to reload)");
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> SessionSnapshot {
        SessionSnapshot {
            active_rendition: RenditionId::Compressed,
            playing: true,
            position: 65.0,
            duration: Some(250.0),
            load_state: LoadState::Ready,
            generation: 0,
        }
    }

    #[test]
    fn test_parse_transport_commands() {
        assert_eq!(
            parse_command("play").unwrap(),
            ShellCommand::Player(PlayerCommand::Play)
        );
        assert_eq!(
            parse_command("  Pause ").unwrap(),
            ShellCommand::Player(PlayerCommand::Pause)
        );
        assert_eq!(parse_command("").unwrap(), ShellCommand::Status);
        assert_eq!(parse_command("q").unwrap(), ShellCommand::Quit);
    }

    #[test]
    fn test_parse_seek() {
        assert_eq!(
            parse_command("seek 0.5").unwrap(),
            ShellCommand::Player(PlayerCommand::SeekToFraction(0.5))
        );
        assert!(parse_command("seek").is_err());
        assert!(parse_command("seek half").is_err());
    }

    #[test]
    fn test_parse_select() {
        assert_eq!(
            parse_command("select lossless").unwrap(),
            ShellCommand::Player(PlayerCommand::SelectRendition(RenditionId::Lossless))
        );
        assert_eq!(
            parse_command("mp3").unwrap(),
            ShellCommand::Player(PlayerCommand::SelectRendition(RenditionId::Compressed))
        );
        assert!(parse_command("select opus").is_err());
    }

    #[test]
    fn test_unknown_command() {
        assert!(matches!(
            parse_command("rewind"),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_render_status() {
        assert_eq!(render_status(&snapshot()), "▶ 1:05 / 4:10 [26%] compressed ready");
    }

    #[test]
    fn test_render_status_error() {
        let mut snap = snapshot();
        snap.playing = false;
        snap.load_state = LoadState::Error;
        let line = render_status(&snap);
        assert!(line.starts_with("⏸ "));
        assert!(line.contains("controls disabled"));
    }

    #[test]
    fn test_transport_disabled_after_error() {
        let mut snap = snapshot();
        snap.load_state = LoadState::Error;
        assert!(disabled_reason(PlayerCommand::SeekToFraction(0.5), &snap).is_some());
        assert!(disabled_reason(PlayerCommand::Restart, &snap).is_some());
        assert!(disabled_reason(PlayerCommand::Play, &snap).is_some());
        assert!(disabled_reason(PlayerCommand::Pause, &snap).is_none());
        assert!(disabled_reason(PlayerCommand::Retry, &snap).is_none());
        assert!(
            disabled_reason(PlayerCommand::SelectRendition(RenditionId::Lossless), &snap).is_none()
        );
        assert!(disabled_reason(PlayerCommand::SeekToFraction(0.5), &snapshot()).is_none());
    }

    #[test]
    fn test_restart_disabled_while_idle() {
        let mut snap = snapshot();
        snap.load_state = LoadState::Idle;
        assert!(disabled_reason(PlayerCommand::Restart, &snap).is_some());
        assert!(disabled_reason(PlayerCommand::Play, &snap).is_none());
    }

    #[test]
    fn test_render_tabs_and_header() {
        let track = Track::new("Harbour Lights")
            .with_artist("The Fog Signals")
            .with_rendition(RenditionId::Compressed, "a.mp3")
            .with_rendition(RenditionId::Lossless, "a.flac");
        assert_eq!(render_tabs(&track, &snapshot()), "[MP3]  Lossless");
        assert_eq!(render_header(&track), "Harbour Lights - The Fog Signals");
    }
}
