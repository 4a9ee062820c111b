//! Desktop integration: wallpaper and external image viewer
//!
//! The desktop environment is looked up once and represented as a
//! `DesktopEnv`. Setting the wallpaper shells out to the environment's own
//! configuration tool (`gsettings` for GNOME, `xfconf-query` for XFCE).

use std::path::Path;
use std::process::{Command, Stdio};
use thiserror::Error;

/// GSettings schema holding the background keys
const GNOME_BACKGROUND_SCHEMA: &str = "org.gnome.desktop.background";

/// Xfconf channel of the desktop plugin
const XFCE_DESKTOP_CHANNEL: &str = "xfce4-desktop";

/// Errors that can occur while talking to desktop tools
#[derive(Debug, Error)]
pub enum DesktopError {
    /// The tool could not be started
    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The tool ran but reported failure
    #[error("{command} exited with {status}")]
    Failed { command: String, status: String },
}

/// The desktop environment wallpaper changes are sent to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DesktopEnv {
    Gnome,
    Xfce,
    /// No supported environment; setting the wallpaper does nothing
    Unsupported,
}

impl DesktopEnv {
    /// Detects the running desktop environment
    ///
    /// Checks `XDG_CURRENT_DESKTOP` first, then whether an `xfce4-session`
    /// process is running.
    pub fn detect() -> Self {
        let current = std::env::var("XDG_CURRENT_DESKTOP").ok();
        Self::from_env(current.as_deref(), xfce_session_running)
    }

    /// Classifies an `XDG_CURRENT_DESKTOP` value
    ///
    /// `xfce_running` is only consulted when the variable does not decide.
    pub fn from_env(current_desktop: Option<&str>, xfce_running: impl FnOnce() -> bool) -> Self {
        let desktops: Vec<String> = current_desktop
            .unwrap_or_default()
            .split(':')
            .map(|d| d.trim().to_ascii_uppercase())
            .collect();

        if desktops.iter().any(|d| d == "GNOME") {
            DesktopEnv::Gnome
        } else if desktops.iter().any(|d| d == "XFCE") || xfce_running() {
            DesktopEnv::Xfce
        } else {
            DesktopEnv::Unsupported
        }
    }

    /// Sets `image` as the wallpaper
    ///
    /// # Returns
    /// * `Ok(true)` if the wallpaper was applied
    /// * `Ok(false)` for `Unsupported`, where nothing is done
    /// * `Err(DesktopError)` if a configuration command failed
    pub fn set_wallpaper(&self, image: &Path) -> Result<bool, DesktopError> {
        match self {
            DesktopEnv::Gnome => {
                for args in gnome_commands(image) {
                    let args: Vec<&str> = args.iter().map(String::as_str).collect();
                    run("gsettings", &args)?;
                }
                Ok(true)
            }
            DesktopEnv::Xfce => {
                let listing = run_capture("xfconf-query", &["-c", XFCE_DESKTOP_CHANNEL, "-l"])?;
                let image = image.to_string_lossy();
                for prop in xfce_last_image_props(&listing) {
                    run(
                        "xfconf-query",
                        &["-c", XFCE_DESKTOP_CHANNEL, "-p", prop, "-s", &*image],
                    )?;
                }
                Ok(true)
            }
            DesktopEnv::Unsupported => {
                tracing::debug!("no supported desktop environment; wallpaper left unchanged");
                Ok(false)
            }
        }
    }
}

/// `gsettings` argument lists that make `image` the GNOME background
pub fn gnome_commands(image: &Path) -> Vec<Vec<String>> {
    let uri = format!("file://{}", image.display());
    [
        ("picture-uri", uri.as_str()),
        ("picture-uri-dark", uri.as_str()),
        ("picture-options", "scaled"),
        ("primary-color", "#000000"),
        ("color-shading-type", "solid"),
    ]
    .into_iter()
    .map(|(key, value)| {
        vec![
            "set".to_string(),
            GNOME_BACKGROUND_SCHEMA.to_string(),
            key.to_string(),
            value.to_string(),
        ]
    })
    .collect()
}

/// The `last-image` properties in an `xfconf-query -l` listing
///
/// There is one per monitor and workspace, e.g.
/// `/backdrop/screen0/monitor0/workspace0/last-image`.
pub fn xfce_last_image_props(listing: &str) -> Vec<&str> {
    listing
        .lines()
        .map(str::trim)
        .filter(|line| line.contains("last-image"))
        .collect()
}

/// Arguments that show `image` fullscreen in `feh`, zoomed to fit
pub fn feh_args(image: &Path) -> Vec<String> {
    vec![
        "--fullscreen".to_string(),
        "--auto-zoom".to_string(),
        image.to_string_lossy().into_owned(),
    ]
}

/// Opens `image` in `feh`, blocking until the viewer is closed
pub fn show_with_feh(image: &Path) -> Result<(), DesktopError> {
    let args = feh_args(image);
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    run("feh", &args)
}

/// Whether an `xfce4-session` process exists
fn xfce_session_running() -> bool {
    Command::new("pgrep")
        .args(["-x", "xfce4-session"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Runs `program` with `args`, failing on a non-zero exit
fn run(program: &str, args: &[&str]) -> Result<(), DesktopError> {
    tracing::debug!(program, ?args, "running desktop command");

    let status = Command::new(program)
        .args(args)
        .status()
        .map_err(|source| DesktopError::Spawn {
            program: program.to_string(),
            source,
        })?;

    if !status.success() {
        return Err(DesktopError::Failed {
            command: format!("{} {}", program, args.join(" ")),
            status: status.to_string(),
        });
    }
    Ok(())
}

/// Runs `program` with `args` and returns its standard output
fn run_capture(program: &str, args: &[&str]) -> Result<String, DesktopError> {
    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|source| DesktopError::Spawn {
            program: program.to_string(),
            source,
        })?;

    if !output.status.success() {
        return Err(DesktopError::Failed {
            command: format!("{} {}", program, args.join(" ")),
            status: output.status.to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_ubuntu_gnome() {
        let env = DesktopEnv::from_env(Some("ubuntu:GNOME"), || panic!("should not probe"));
        assert_eq!(env, DesktopEnv::Gnome);
    }

    #[test]
    fn test_detect_xfce_from_variable() {
        assert_eq!(DesktopEnv::from_env(Some("XFCE"), || false), DesktopEnv::Xfce);
    }

    #[test]
    fn test_detect_xfce_from_running_session() {
        assert_eq!(DesktopEnv::from_env(None, || true), DesktopEnv::Xfce);
    }

    #[test]
    fn test_detect_unsupported() {
        assert_eq!(DesktopEnv::from_env(Some("KDE"), || false), DesktopEnv::Unsupported);
        assert_eq!(DesktopEnv::from_env(None, || false), DesktopEnv::Unsupported);
    }

    #[test]
    fn test_unsupported_set_wallpaper_is_noop() {
        let applied = DesktopEnv::Unsupported
            .set_wallpaper(Path::new("/tmp/apod/pic.jpg"))
            .expect("Unsupported should not fail");
        assert!(!applied);
    }

    #[test]
    fn test_gnome_commands() {
        let cmds = gnome_commands(Path::new("/home/me/Pictures/apod/2024-01-01/pic.jpg"));

        assert_eq!(cmds.len(), 5);
        assert_eq!(
            cmds[0],
            vec![
                "set",
                "org.gnome.desktop.background",
                "picture-uri",
                "file:///home/me/Pictures/apod/2024-01-01/pic.jpg"
            ]
        );
        assert_eq!(cmds[1][2], "picture-uri-dark");
        assert_eq!(cmds[2][3], "scaled");
        assert_eq!(cmds[3][3], "#000000");
        assert_eq!(cmds[4][3], "solid");
    }

    #[test]
    fn test_feh_args_are_always_fullscreen() {
        let args = feh_args(Path::new("/tmp/apod/pic.jpg"));

        assert_eq!(args, vec!["--fullscreen", "--auto-zoom", "/tmp/apod/pic.jpg"]);
    }

    #[test]
    fn test_xfce_last_image_props() {
        let listing = "/backdrop/screen0/monitor0/image-style\n\
                       /backdrop/screen0/monitor0/workspace0/last-image\n\
                       /backdrop/screen0/monitorHDMI-1/workspace0/last-image\n\
                       /desktop-icons/style\n";

        let props = xfce_last_image_props(listing);

        assert_eq!(
            props,
            vec![
                "/backdrop/screen0/monitor0/workspace0/last-image",
                "/backdrop/screen0/monitorHDMI-1/workspace0/last-image",
            ]
        );
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let result = run("cosmowall-no-such-program", &["--version"]);
        assert!(matches!(result, Err(DesktopError::Spawn { .. })));
    }
}
