//! Narration synthesis and playback
//!
//! Speech is produced by an external text-to-speech program and played by an
//! external audio player. Both are plain child processes.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use thiserror::Error;

use crate::cache::CacheEntry;

/// Text narrated when an entry has neither title nor explanation
pub const PLACEHOLDER_TEXT: &str = "No description available.";

/// Errors that can occur while producing or playing narration
#[derive(Debug, Error)]
pub enum NarrationError {
    /// The synthesizer could not be started or exited unsuccessfully
    #[error("Speech synthesis failed: {0}")]
    Synthesis(String),

    /// The audio player could not be started
    #[error("Failed to start audio player '{program}': {source}")]
    Playback {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Turns text into an audio file
pub trait Synthesizer {
    /// Writes `text` spoken with `voice` to `output`
    fn synthesize(&self, text: &str, voice: &str, output: &Path) -> Result<(), NarrationError>;
}

/// Synthesizer backed by an `edge-tts` compatible command
///
/// Invoked as `<program> --voice <voice> --text <text> --write-media <output>`.
#[derive(Debug, Clone)]
pub struct CommandSynthesizer {
    program: String,
}

impl CommandSynthesizer {
    /// Creates a synthesizer that runs `program`
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Synthesizer for CommandSynthesizer {
    fn synthesize(&self, text: &str, voice: &str, output: &Path) -> Result<(), NarrationError> {
        tracing::info!(program = %self.program, voice, output = %output.display(), "synthesizing narration");

        let result = Command::new(&self.program)
            .arg("--voice")
            .arg(voice)
            .arg("--text")
            .arg(text)
            .arg("--write-media")
            .arg(output)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| NarrationError::Synthesis(format!("could not run {}: {}", self.program, e)))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(NarrationError::Synthesis(format!(
                "{} exited with {}: {}",
                self.program,
                result.status,
                stderr.trim()
            )));
        }

        if !output.exists() {
            return Err(NarrationError::Synthesis(format!(
                "{} did not produce {}",
                self.program,
                output.display()
            )));
        }

        Ok(())
    }
}

/// The text narrated for an entry: title followed by explanation
pub fn narration_text(entry: &CacheEntry) -> String {
    let title = entry.title.trim();
    let explanation = entry.explanation.trim();

    match (title.is_empty(), explanation.is_empty()) {
        (true, true) => PLACEHOLDER_TEXT.to_string(),
        (false, true) => title.to_string(),
        (true, false) => explanation.to_string(),
        (false, false) => format!("{}. {}", title.trim_end_matches('.'), explanation),
    }
}

/// Where the narration for an entry lives: the image path with an `mp3` extension
pub fn audio_path_for(image_path: &Path) -> PathBuf {
    image_path.with_extension("mp3")
}

/// Starts `player` on `audio` without waiting for it to finish
///
/// `player` is the program followed by any arguments. Output is discarded.
pub fn play_detached(audio: &Path, player: &[String]) -> Result<(), NarrationError> {
    let (program, args) = player
        .split_first()
        .ok_or_else(|| NarrationError::Playback {
            program: String::new(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "no player configured"),
        })?;

    tracing::info!(program = %program, audio = %audio.display(), "starting audio playback");

    Command::new(program)
        .args(args)
        .arg(audio)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|source| NarrationError::Playback {
            program: program.clone(),
            source,
        })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(title: &str, explanation: &str) -> CacheEntry {
        CacheEntry {
            title: title.to_string(),
            explanation: explanation.to_string(),
            url: String::new(),
            img: "/tmp/apod/pic.jpg".to_string(),
            mp3: None,
        }
    }

    #[test]
    fn test_narration_text_joins_title_and_explanation() {
        let text = narration_text(&entry("The Horsehead Nebula", "A dark cloud of dust."));
        assert_eq!(text, "The Horsehead Nebula. A dark cloud of dust.");
    }

    #[test]
    fn test_narration_text_placeholder_when_empty() {
        assert_eq!(narration_text(&entry("", "  ")), PLACEHOLDER_TEXT);
    }

    #[test]
    fn test_narration_text_single_part() {
        assert_eq!(narration_text(&entry("Only Title", "")), "Only Title");
        assert_eq!(narration_text(&entry("", "Only text.")), "Only text.");
    }

    #[test]
    fn test_audio_path_replaces_extension() {
        assert_eq!(
            audio_path_for(Path::new("/a/b/pic.jpg")),
            PathBuf::from("/a/b/pic.mp3")
        );
        assert_eq!(
            audio_path_for(Path::new("/a/b/noext")),
            PathBuf::from("/a/b/noext.mp3")
        );
    }

    #[test]
    fn test_missing_synthesizer_program_is_an_error() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let synth = CommandSynthesizer::new("cosmowall-no-such-tts-program");

        let result = synth.synthesize("hi", "en-US-GuyNeural", &temp_dir.path().join("a.mp3"));

        assert!(matches!(result, Err(NarrationError::Synthesis(_))));
    }

    #[test]
    fn test_play_detached_requires_player() {
        let result = play_detached(Path::new("/tmp/a.mp3"), &[]);
        assert!(matches!(result, Err(NarrationError::Playback { .. })));
    }
}
