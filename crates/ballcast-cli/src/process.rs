//! External processes: the manifest proxy and the streamlink player

use ballcast_core::{Error, ProxyConfig, Result, StreamRecord, USER_AGENT};
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

const PROXY_CANDIDATES: &[&str] = &[
    "go-mlbam-proxy",
    "go-mlbam-proxy/go-mlbam-proxy",
    "/usr/local/bin/go-mlbam-proxy",
];

const STREAMLINK_CANDIDATES: &[&str] = &["streamlink", "/usr/local/bin/streamlink"];

const PLAYER_CANDIDATES: &[&str] = &[
    "cvlc",
    "vlc",
    "/Applications/VLC.app/Contents/MacOS/VLC",
];

/// Port streamlink serves the stream on with `--http`
const EXTERNAL_HTTP_PORT: u16 = 6789;

/// Find the first candidate that resolves to an executable
pub fn locate(program: &str, candidates: &[&str]) -> Result<PathBuf> {
    candidates
        .iter()
        .find_map(|c| which::which(c).ok())
        .ok_or_else(|| Error::ProgramNotFound {
            program: program.to_string(),
        })
}

/// Local proxy that lets the player fetch playlists over plain HTTP
pub struct Proxy {
    path: PathBuf,
    config: ProxyConfig,
    child: Option<Child>,
}

impl Proxy {
    pub fn locate(config: &ProxyConfig) -> Result<Self> {
        let path = locate("go-mlbam-proxy", PROXY_CANDIDATES)?;
        debug!(path = %path.display(), domain = %config.domain, port = config.port, "Found proxy");
        Ok(Self {
            path,
            config: config.clone(),
            child: None,
        })
    }

    fn args(&self) -> Vec<String> {
        vec![
            "-d".to_string(),
            self.config.domain.clone(),
            "-p".to_string(),
            self.config.port.to_string(),
            "-s".to_string(),
            self.config.source_domains.clone(),
        ]
    }

    pub fn start(&mut self) -> Result<()> {
        if self.child.is_some() {
            return Ok(());
        }

        let child = Command::new(&self.path)
            .args(self.args())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::process(format!("unable to start proxy: {}", e)))?;

        info!(path = %self.path.display(), args = ?self.args(), "Started proxy");
        self.child = Some(child);
        Ok(())
    }

    pub async fn stop(&mut self) -> Result<()> {
        if let Some(mut child) = self.child.take() {
            child.kill().await?;
            debug!("Stopped proxy");
        }
        Ok(())
    }
}

/// How a playback session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackEnd {
    /// streamlink reported the end of the stream
    Ended,
    /// streamlink exited on its own
    Exited,
    Cancelled,
}

/// What a line of streamlink output means for the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PlayerSignal {
    Forbidden,
    Ended,
}

fn classify_output(line: &str) -> Option<PlayerSignal> {
    if line.contains("403 Client Error: Forbidden") {
        Some(PlayerSignal::Forbidden)
    } else if line.contains("Stream ended") {
        Some(PlayerSignal::Ended)
    } else {
        None
    }
}

/// streamlink launcher
pub struct Player {
    streamlink: PathBuf,
    player: Option<PathBuf>,
    proxy_port: u16,
    external_http: bool,
}

impl Player {
    pub fn locate(proxy_port: u16, external_http: bool) -> Result<Self> {
        let streamlink = locate("streamlink", STREAMLINK_CANDIDATES)?;
        let player = if external_http {
            None
        } else {
            locate("vlc", PLAYER_CANDIDATES).ok()
        };

        debug!(streamlink = %streamlink.display(), player = ?player, "Found player");

        Ok(Self {
            streamlink,
            player,
            proxy_port,
            external_http,
        })
    }

    fn args(&self, stream: &StreamRecord) -> Vec<String> {
        let mut args = vec![
            format!("hls://{} name_key=bitrate verify=False", stream.playlist),
            "best".to_string(),
            "--http-header".to_string(),
            format!("User-Agent={}", USER_AGENT),
            "--hls-segment-threads=4".to_string(),
            "--https-proxy".to_string(),
            format!("https://127.0.0.1:{}", self.proxy_port),
        ];

        if self.external_http {
            args.extend([
                "--player-external-http".to_string(),
                "--player-external-http-port".to_string(),
                EXTERNAL_HTTP_PORT.to_string(),
            ]);
        } else if let Some(player) = &self.player {
            args.extend(["--player".to_string(), player.display().to_string()]);
        }

        args
    }

    /// Run streamlink until the stream ends, it exits, or `token` is cancelled
    pub async fn play(&self, stream: &StreamRecord, token: &CancellationToken) -> Result<PlaybackEnd> {
        let mut child = Command::new(&self.streamlink)
            .args(self.args(stream))
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::process(format!("unable to start streamlink: {}", e)))?;

        info!(feed = %stream.feed_id, label = %stream.label, "Started streamlink");

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Internal("streamlink stdout not captured".into()))?;
        let mut lines = BufReader::new(stdout).lines();

        loop {
            let line = tokio::select! {
                _ = token.cancelled() => {
                    child.kill().await?;
                    return Ok(PlaybackEnd::Cancelled);
                }
                line = lines.next_line() => line?,
            };

            let Some(line) = line else {
                child.wait().await?;
                return Ok(PlaybackEnd::Exited);
            };

            debug!(output = %line, "streamlink");

            match classify_output(&line) {
                Some(PlayerSignal::Forbidden) => {
                    child.kill().await?;
                    return Err(Error::process("Stream is not available"));
                }
                Some(PlayerSignal::Ended) => {
                    child.kill().await?;
                    return Ok(PlaybackEnd::Ended);
                }
                None => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ballcast_core::{EventId, FeedId};

    fn stream() -> StreamRecord {
        StreamRecord {
            event_id: EventId(1),
            feed_id: FeedId(101),
            playlist: "http://example/stream.m3u8".into(),
            kind: "HOME".into(),
            label: "WGN".into(),
        }
    }

    fn player(external_http: bool) -> Player {
        Player {
            streamlink: PathBuf::from("/usr/bin/streamlink"),
            player: Some(PathBuf::from("/usr/bin/vlc")),
            proxy_port: 9876,
            external_http,
        }
    }

    #[test]
    fn test_classify_output() {
        assert_eq!(
            classify_output("error: Unable to open URL: 403 Client Error: Forbidden for url"),
            Some(PlayerSignal::Forbidden)
        );
        assert_eq!(classify_output("[cli][info] Stream ended"), Some(PlayerSignal::Ended));
        assert_eq!(classify_output("[cli][info] Opening stream: 720p"), None);
    }

    #[test]
    fn test_player_args() {
        let args = player(false).args(&stream());
        assert_eq!(args[0], "hls://http://example/stream.m3u8 name_key=bitrate verify=False");
        assert!(args.contains(&"https://127.0.0.1:9876".to_string()));
        assert!(args.contains(&"--player".to_string()));
        assert!(!args.contains(&"--player-external-http".to_string()));

        let args = player(true).args(&stream());
        assert!(args.contains(&"--player-external-http".to_string()));
        assert!(args.contains(&"6789".to_string()));
        assert!(!args.contains(&"--player".to_string()));
    }

    #[test]
    fn test_proxy_args() {
        let proxy = Proxy {
            path: PathBuf::from("/usr/local/bin/go-mlbam-proxy"),
            config: ProxyConfig {
                domain: "cdn.example".into(),
                source_domains: "a.example,b.example".into(),
                port: 9876,
            },
            child: None,
        };
        assert_eq!(
            proxy.args(),
            vec!["-d", "cdn.example", "-p", "9876", "-s", "a.example,b.example"]
        );
    }

    #[test]
    fn test_locate_missing_program() {
        let err = locate("nothing", &["/nonexistent/ballcast-test-binary"]).unwrap_err();
        assert!(matches!(err, Error::ProgramNotFound { .. }));
    }
}
